//! Reads IP/CIDR tokens from the inline list or the input file

use super::{AddressBlock, CandidateSampler};
use crate::error::ErrorContext;
use crate::models::{Candidate, Config};
use crate::types::Result;

/// Collect raw tokens: the inline list wins over the file
pub fn read_tokens(config: &Config) -> Result<Vec<String>> {
    if let Some(text) = config.ip_text.as_deref().filter(|t| !t.trim().is_empty()) {
        return Ok(split_tokens(text, ','));
    }

    let path = if config.ip_file.trim().is_empty() {
        crate::defaults::DEFAULT_IP_FILE
    } else {
        config.ip_file.as_str()
    };

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read IP range file '{}'", path))?;
    Ok(split_tokens(&contents, '\n'))
}

fn split_tokens(text: &str, separator: char) -> Vec<String> {
    text.split(separator)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

/// Parse every token and expand it into candidates
///
/// The first malformed token aborts the whole load.
pub fn load_candidates(config: &Config, sampler: &mut CandidateSampler) -> Result<Vec<Candidate>> {
    let tokens = read_tokens(config)?;
    let mut candidates = Vec::new();
    for token in &tokens {
        let block = AddressBlock::parse(token)?;
        candidates.extend(sampler.sample(&block));
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranges::SamplingPolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sampler() -> CandidateSampler {
        CandidateSampler::with_seed(SamplingPolicy::Sparse, 443, 0)
    }

    #[test]
    fn test_inline_list_takes_precedence() {
        let mut config = Config::default();
        config.ip_file = "/definitely/not/here.txt".to_string();
        config.ip_text = Some(" 1.1.1.1, ,1.0.0.1/32,,".to_string());

        let tokens = read_tokens(&config).unwrap();
        assert_eq!(tokens, vec!["1.1.1.1", "1.0.0.1/32"]);

        let candidates = load_candidates(&config, &mut sampler()).unwrap();
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_file_tokens_skip_blank_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "173.245.48.0/24").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  2606:4700::1  ").unwrap();
        writeln!(file, "\r").unwrap();

        let mut config = Config::default();
        config.ip_file = file.path().to_string_lossy().to_string();

        let tokens = read_tokens(&config).unwrap();
        assert_eq!(tokens, vec!["173.245.48.0/24", "2606:4700::1"]);

        let candidates = load_candidates(&config, &mut sampler()).unwrap();
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| c.port == 443));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let mut config = Config::default();
        config.ip_file = "/definitely/not/here.txt".to_string();

        let error = read_tokens(&config).unwrap_err();
        assert_eq!(error.category(), "IO");
        assert!(error.to_string().contains("/definitely/not/here.txt"));
    }

    #[test]
    fn test_bad_token_is_fatal() {
        let mut config = Config::default();
        config.ip_text = Some("1.1.1.1,1.1.1.300/24".to_string());

        let error = load_candidates(&config, &mut sampler()).unwrap_err();
        assert_eq!(error.category(), "PARSE");
        assert!(error.to_string().contains("1.1.1.300/24"));
    }

    #[test]
    fn test_empty_input_yields_no_candidates() {
        let mut config = Config::default();
        config.ip_text = Some(" , ,".to_string());
        assert!(load_candidates(&config, &mut sampler()).unwrap().is_empty());
    }
}
