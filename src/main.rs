//! Edge IP Tester - Main CLI Application
//!
//! Ranks CDN edge addresses by packet loss, latency and download speed.

use clap::Parser;
use edge_ip_tester::{
    app::{wait_for_exit, App},
    cli::Cli,
    config::{display_config_summary, ConfigParser, ConfigValidator, EnvManager},
    error::{AppError, ErrorReporter, Result},
    updater::UpdateChecker,
    PKG_NAME,
};
use std::path::Path;
use std::process;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(99);
    }));

    let cli = Cli::parse();

    if cli.should_show_topic_help() {
        println!("{}", cli.display_help());
        return;
    }

    if let Err(message) = cli.validate() {
        let err = AppError::validation(message);
        ErrorReporter::new(cli.use_colors(), cli.verbose).report_error(&err);
        process::exit(err.exit_code());
    }

    let use_color = cli.use_colors();
    let verbose = cli.verbose;
    if let Err(err) = run_application(cli).await {
        ErrorReporter::new(use_color, verbose).report_error(&err);
        process::exit(err.exit_code());
    }
}

async fn run_application(cli: Cli) -> Result<()> {
    if cli.check_update {
        return check_update().await;
    }

    if cli.check_env {
        return check_env();
    }

    if let Some(path) = &cli.env_example {
        EnvManager::save_example_env_file(Path::new(path))?;
        println!("Wrote example configuration to {}", path);
        return Ok(());
    }

    if cli.debug {
        eprintln!("{} {}", PKG_NAME, edge_ip_tester::build_info());
        eprintln!("Debug mode enabled");
    }

    let config = ConfigParser::new(cli).parse()?;

    let warnings = ConfigValidator::validate_comprehensive(&config)?;
    for warning in &warnings {
        eprintln!("{}", warning.format(config.enable_color));
    }

    if config.debug {
        eprintln!("\nConfiguration Summary:\n{}\n", display_config_summary(&config));
    }

    let app = App::new(config);
    app.run().await?;
    wait_for_exit(app.config());

    Ok(())
}

async fn check_update() -> Result<()> {
    println!("{} {}", PKG_NAME, edge_ip_tester::build_info());
    println!("Checking for a newer release...");

    let status = UpdateChecker::new()?.check().await?;
    println!("{}", status.message());
    Ok(())
}

fn check_env() -> Result<()> {
    let findings = EnvManager::audit(Path::new(".env"))?;
    if findings.is_empty() {
        println!("Environment configuration is valid");
        return Ok(());
    }

    for finding in &findings {
        eprintln!("{}", finding);
    }
    Err(AppError::config(format!("{} problem(s) in .env or the environment", findings.len())))
}
