//! Topic help with options, examples and detailed guidance

use crate::config::env::EnvManager;
use colored::*;

const TOPICS: [&str; 7] = ["input", "probing", "download", "filters", "output", "env", "examples"];

/// Help text renderer for the main screen and per-topic pages
pub struct HelpSystem {
    platform: String,
}

impl HelpSystem {
    pub fn new() -> Self {
        Self {
            platform: std::env::consts::OS.to_string(),
        }
    }

    pub fn topic_names() -> &'static [&'static str] {
        &TOPICS
    }

    /// Display the main help message with all available options
    pub fn display_main_help(&self, use_colors: bool) -> String {
        let mut help = String::new();

        help.push_str(&self.format_header(use_colors));
        help.push('\n');
        help.push_str(&self.format_usage_section(use_colors));
        help.push('\n');
        help.push_str(&self.format_options_section(use_colors));
        help.push('\n');
        help.push_str(&self.format_examples_section(use_colors));
        help.push('\n');
        help.push_str(&self.format_environment_section(use_colors));
        help.push('\n');
        help.push_str(&self.format_footer(use_colors));

        help
    }

    /// Display quick help for specific topics
    pub fn display_topic_help(&self, topic: &str, use_colors: bool) -> Option<String> {
        match topic.to_lowercase().as_str() {
            "input" | "ranges" => Some(self.format_input_help(use_colors)),
            "probing" | "probe" | "httping" => Some(self.format_probing_help(use_colors)),
            "download" | "speed" => Some(self.format_download_help(use_colors)),
            "filters" | "filter" => Some(self.format_filters_help(use_colors)),
            "output" | "csv" => Some(self.format_output_help(use_colors)),
            "env" | "environment" | "config" => Some(self.format_environment_section(use_colors)),
            "examples" => Some(self.format_examples_section(use_colors)),
            _ => None,
        }
    }

    fn section_header(&self, title: &str, use_colors: bool) -> String {
        if use_colors {
            title.bright_green().bold().to_string()
        } else {
            title.to_string()
        }
    }

    fn format_header(&self, use_colors: bool) -> String {
        let title = "Edge IP Tester";
        let subtitle = "Ranks CDN edge addresses by packet loss, latency and download speed";
        let version = env!("CARGO_PKG_VERSION");

        if use_colors {
            format!(
                "{}\n{}\nVersion: {} | Platform: {}\n",
                title.bright_cyan().bold(),
                subtitle.bright_blue(),
                version.green(),
                self.platform.yellow()
            )
        } else {
            format!("{}\n{}\nVersion: {} | Platform: {}\n", title, subtitle, version, self.platform)
        }
    }

    fn format_usage_section(&self, use_colors: bool) -> String {
        let mut usage = format!("{}\n", self.section_header("USAGE:", use_colors));
        for pattern in [
            "eit [OPTIONS]",
            "eit --file <FILE> [OPTIONS]",
            "eit --ip <LIST> [OPTIONS]",
            "eit --help-topic <TOPIC>",
        ] {
            if use_colors {
                usage.push_str(&format!("  {}\n", pattern.bright_white()));
            } else {
                usage.push_str(&format!("  {}\n", pattern));
            }
        }
        usage
    }

    fn format_options_section(&self, use_colors: bool) -> String {
        let options = [
            OptionHelp {
                short: Some("n"),
                long: "routines",
                value: "<N>",
                description: "Latency probing concurrency, default 200, max 1000",
                example: None,
            },
            OptionHelp {
                short: Some("t"),
                long: "ping-times",
                value: "<N>",
                description: "Probe attempts per address, default 4",
                example: None,
            },
            OptionHelp {
                short: Some("d"),
                long: "download-count",
                value: "<N>",
                description: "Addresses the download test must qualify, default 10",
                example: None,
            },
            OptionHelp {
                short: Some("D"),
                long: "download-time",
                value: "<SECS>",
                description: "Download budget per address, default 10",
                example: None,
            },
            OptionHelp {
                short: Some("P"),
                long: "port",
                value: "<PORT>",
                description: "Port for probing and downloading, default 443",
                example: None,
            },
            OptionHelp {
                short: Some("u"),
                long: "url",
                value: "<URL>",
                description: "Download test URL, also the HTTP probe target",
                example: Some("--url https://speed.example.com/100mb.bin"),
            },
            OptionHelp {
                short: None,
                long: "httping",
                value: "",
                description: "Probe with HTTP HEAD instead of TCP connect",
                example: None,
            },
            OptionHelp {
                short: None,
                long: "httping-code",
                value: "<CODE>",
                description: "Status an HTTP probe must return, default 200/301/302",
                example: None,
            },
            OptionHelp {
                short: None,
                long: "cfcolo",
                value: "<CODES>",
                description: "Edge locations to keep (HTTP probing only)",
                example: Some("--httping --cfcolo HKG,KHH,NRT"),
            },
            OptionHelp {
                short: None,
                long: "locations",
                value: "<FILE>",
                description: "Location directory adding region and city columns (HTTP probing only)",
                example: Some("--httping --locations locations.json"),
            },
            OptionHelp {
                short: None,
                long: "max-delay",
                value: "<MS>",
                description: "Upper mean-delay bound, default 9999",
                example: None,
            },
            OptionHelp {
                short: None,
                long: "min-delay",
                value: "<MS>",
                description: "Lower mean-delay bound, default 0",
                example: None,
            },
            OptionHelp {
                short: None,
                long: "max-loss-rate",
                value: "<RATE>",
                description: "Upper loss-rate bound 0.00-1.00, default 1.00",
                example: None,
            },
            OptionHelp {
                short: None,
                long: "min-speed",
                value: "<MB/S>",
                description: "Download speed floor, default 0.00",
                example: None,
            },
            OptionHelp {
                short: Some("p"),
                long: "print-num",
                value: "<N>",
                description: "Results to print, 0 prints nothing, default 10",
                example: None,
            },
            OptionHelp {
                short: Some("f"),
                long: "file",
                value: "<FILE>",
                description: "IP/CIDR file, one token per line, default ip.txt",
                example: None,
            },
            OptionHelp {
                short: None,
                long: "ip",
                value: "<LIST>",
                description: "Inline comma-separated IPs/CIDRs, overrides --file",
                example: Some("--ip 1.1.1.1,2606:4700::/96"),
            },
            OptionHelp {
                short: Some("o"),
                long: "output",
                value: "<FILE>",
                description: "CSV output file, empty disables, default result.csv",
                example: None,
            },
            OptionHelp {
                short: None,
                long: "disable-download",
                value: "",
                description: "Skip the download test, rank by delay",
                example: None,
            },
            OptionHelp {
                short: None,
                long: "all-ip",
                value: "",
                description: "Test every address of each IPv4 /24",
                example: None,
            },
            OptionHelp {
                short: None,
                long: "seed",
                value: "<SEED>",
                description: "Fixed seed for reproducible sampling",
                example: None,
            },
            OptionHelp {
                short: None,
                long: "check-update",
                value: "",
                description: "Check for a newer release and exit (UPDATE_URL overrides the source)",
                example: None,
            },
            OptionHelp {
                short: None,
                long: "check-env",
                value: "",
                description: "Report invalid values in .env and the environment, then exit",
                example: None,
            },
            OptionHelp {
                short: None,
                long: "env-example",
                value: "<FILE>",
                description: "Write a commented example .env and exit",
                example: Some("--env-example .env"),
            },
            OptionHelp {
                short: None,
                long: "verbose",
                value: "",
                description: "Log phase timings and download results",
                example: None,
            },
            OptionHelp {
                short: None,
                long: "debug",
                value: "",
                description: "Structured debug logging of every probe attempt",
                example: None,
            },
            OptionHelp {
                short: None,
                long: "no-color",
                value: "",
                description: "Disable colored output",
                example: None,
            },
        ];

        let mut output = format!("{}\n", self.section_header("OPTIONS:", use_colors));
        for option in options {
            output.push_str(&option.format(use_colors));
            output.push('\n');
        }
        output
    }

    fn format_examples_section(&self, use_colors: bool) -> String {
        let examples = [
            ExampleHelp {
                title: "Default run",
                command: "eit",
                description: "Sample ip.txt, probe over TCP, download-test the best 10 and write result.csv",
            },
            ExampleHelp {
                title: "Latency only",
                command: "eit --disable-download -p 20",
                description: "Skip the download test and print the 20 lowest-delay addresses",
            },
            ExampleHelp {
                title: "Strict filters with a speed floor",
                command: "eit --max-delay 200 --max-loss-rate 0.2 --min-speed 5",
                description: "Keep addresses under 200 ms with at most 20% loss, then look for 5 MB/s",
            },
            ExampleHelp {
                title: "HTTP probing pinned to locations",
                command: "eit --httping --cfcolo HKG,NRT -P 80 -u http://speed.example.com/file",
                description: "Only keep addresses served from Hong Kong or Tokyo",
            },
            ExampleHelp {
                title: "Single address, no file output",
                command: "eit --ip 1.1.1.1 -o \"\"",
                description: "Probe one address and print the result only",
            },
        ];

        let mut output = format!("{}\n", self.section_header("EXAMPLES:", use_colors));
        for example in examples {
            output.push_str(&example.format(use_colors));
            output.push('\n');
        }
        output
    }

    fn format_environment_section(&self, use_colors: bool) -> String {
        let mut output = format!("{}\n", self.section_header("ENVIRONMENT VARIABLES:", use_colors));
        output.push_str("Configuration priority: CLI arguments > Environment variables > .env file > Defaults\n\n");

        for (var_name, description, _example) in EnvManager::get_supported_env_vars() {
            if use_colors {
                output.push_str(&format!("  {}: {}\n", var_name.bright_yellow().bold(), description.white()));
            } else {
                output.push_str(&format!("  {}: {}\n", var_name, description));
            }
        }

        output.push_str("\nExample .env file:\n");
        for line in ["ROUTINES=400", "MAX_DELAY_MS=250", "CF_COLO=HKG,SJC", "OUTPUT_FILE=best.csv"] {
            if use_colors {
                output.push_str(&format!("  {}\n", line.bright_blue()));
            } else {
                output.push_str(&format!("  {}\n", line));
            }
        }

        output
    }

    fn format_footer(&self, use_colors: bool) -> String {
        let line = format!("More help: eit --help-topic <{}>", TOPICS.join("|"));
        if use_colors {
            format!("{}\n", line.bright_black())
        } else {
            format!("{}\n", line)
        }
    }

    fn format_input_help(&self, use_colors: bool) -> String {
        let mut help = format!("{}\n\n", self.section_header("Input ranges", use_colors));
        help.push_str("Each token is a bare address (1.1.1.1, 2606:4700::1) or a CIDR range.\n");
        help.push_str("Tokens come from --ip (comma-separated) or, when it is absent, --file\n");
        help.push_str("(one per line, blank lines ignored). A malformed token stops the run.\n\n");
        help.push_str("IPv4 ranges yield one random address per /24; --all-ip yields every\n");
        help.push_str("address instead. IPv6 ranges are always sampled sparsely by randomising\n");
        help.push_str("the low bytes and stepping upwards; samples may repeat.\n");
        help
    }

    fn format_probing_help(&self, use_colors: bool) -> String {
        let mut help = format!("{}\n\n", self.section_header("Latency probing", use_colors));
        help.push_str("TCP (default): each attempt opens a fresh connection to address:port and\n");
        help.push_str("times the handshake, with a 1 s connect timeout.\n\n");
        help.push_str("HTTP (--httping): the test URL is requested with HEAD through a connection\n");
        help.push_str("pinned to the address. The first response must carry an accepted status\n");
        help.push_str("and, with --cfcolo, an edge-location code from the allowed list. The\n");
        help.push_str("following --ping-times requests are timed. Redirects are not followed.\n\n");
        help.push_str("The edge-location code is kept for the report. With --locations FILE the\n");
        help.push_str("code is looked up for a region and city; a missing FILE is downloaded\n");
        help.push_str("once from --locations-url and saved.\n\n");
        help.push_str("Failed attempts only lower the received count.\n");
        help
    }

    fn format_download_help(&self, use_colors: bool) -> String {
        let mut help = format!("{}\n\n", self.section_header("Download test", use_colors));
        help.push_str("Addresses are download-tested one at a time, in filter order, each for at\n");
        help.push_str("most --download-time seconds. The speed is a moving average over 100 time\n");
        help.push_str("slices. Testing stops when --download-count addresses reach --min-speed.\n");
        help.push_str("If none do, every filtered address is reported in delay order.\n");
        help
    }

    fn format_filters_help(&self, use_colors: bool) -> String {
        let mut help = format!("{}\n\n", self.section_header("Filters", use_colors));
        help.push_str("Probe results are sorted by loss rate, then mean delay. Results above\n");
        help.push_str("--max-loss-rate are dropped, then results outside --min-delay..--max-delay.\n");
        help.push_str("The default bounds (loss 1.00, delay 0..9999 ms) filter nothing.\n\n");
        help.push_str("Tip: with --min-speed set, lower --max-delay too, or the download test may\n");
        help.push_str("keep going through a very large pool.\n");
        help
    }

    fn format_output_help(&self, use_colors: bool) -> String {
        let mut help = format!("{}\n\n", self.section_header("Output", use_colors));
        help.push_str("Columns: IP Address, Sent, Received, Loss Rate, Average Delay (ms),\n");
        help.push_str("Download Speed (MB/s), then Colo, Region and City when an HTTP probe\n");
        help.push_str("reported a location. All ranked results go to the CSV file; the first\n");
        help.push_str("--print-num rows are printed. Nothing is written for an empty result.\n");
        help
    }
}

impl Default for HelpSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper struct for formatting individual options
struct OptionHelp {
    short: Option<&'static str>,
    long: &'static str,
    value: &'static str,
    description: &'static str,
    example: Option<&'static str>,
}

impl OptionHelp {
    fn format(&self, use_colors: bool) -> String {
        let mut option_str = String::new();

        if let Some(short) = self.short {
            if use_colors {
                option_str.push_str(&format!("  {}, ", format!("-{}", short).bright_cyan()));
            } else {
                option_str.push_str(&format!("  -{}, ", short));
            }
        } else {
            option_str.push_str("      ");
        }

        let long_with_value = if self.value.is_empty() {
            format!("--{}", self.long)
        } else {
            format!("--{} {}", self.long, self.value)
        };

        if use_colors {
            option_str.push_str(&format!("{:<30} {}", long_with_value.bright_cyan(), self.description.white()));
        } else {
            option_str.push_str(&format!("{:<30} {}", long_with_value, self.description));
        }

        if let Some(example) = self.example {
            if use_colors {
                option_str.push_str(&format!(
                    "\n{}{}",
                    " ".repeat(36),
                    format!("Example: {}", example).bright_blue().italic()
                ));
            } else {
                option_str.push_str(&format!("\n{}Example: {}", " ".repeat(36), example));
            }
        }

        option_str
    }
}

/// Helper struct for formatting examples
struct ExampleHelp {
    title: &'static str,
    command: &'static str,
    description: &'static str,
}

impl ExampleHelp {
    fn format(&self, use_colors: bool) -> String {
        if use_colors {
            format!(
                "  {}:\n    {}\n    {}\n",
                self.title.bright_yellow().bold(),
                self.command.bright_white(),
                self.description.bright_blue().italic()
            )
        } else {
            format!("  {}:\n    {}\n    {}\n", self.title, self.command, self.description)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_help_display() {
        let help_system = HelpSystem::new();
        let plain_help = help_system.display_main_help(false);

        assert!(plain_help.contains("Edge IP Tester"));
        assert!(plain_help.contains("USAGE:"));
        assert!(plain_help.contains("OPTIONS:"));
        assert!(plain_help.contains("EXAMPLES:"));
        assert!(plain_help.contains("--max-loss-rate"));
        assert!(plain_help.contains(&format!("Platform: {}", std::env::consts::OS)));
    }

    #[test]
    fn test_every_topic_renders() {
        let help_system = HelpSystem::new();
        for topic in HelpSystem::topic_names() {
            assert!(help_system.display_topic_help(topic, false).is_some(), "topic {}", topic);
        }
        assert!(help_system.display_topic_help("FILTERS", false).is_some());
        assert!(help_system.display_topic_help("dns", false).is_none());
    }

    #[test]
    fn test_environment_section_lists_keys() {
        let help = HelpSystem::new().display_topic_help("env", false).unwrap();
        assert!(help.contains("CF_COLO"));
        assert!(help.contains("MAX_LOSS_RATE"));
    }

    #[test]
    fn test_option_help_formatting() {
        let option = OptionHelp {
            short: Some("p"),
            long: "print-num",
            value: "<N>",
            description: "Results to print",
            example: Some("-p 5"),
        };
        let plain = option.format(false);
        assert!(plain.starts_with("  -p, --print-num <N>"));
        assert!(plain.contains("Example: -p 5"));
    }
}
