//! Configuration types for the CLI.

use std::path::{Path, PathBuf};

use boardscan::core::config::{
    ConfigError, ConfigValidator, OrtSessionConfig, ParallelPolicy, PipelineConfig,
};

/// Inputs shared by every subcommand.
#[derive(Clone, Debug)]
pub struct ScanConfig {
    pub file: PathBuf,
    pub model: PathBuf,
    pub pages: Option<String>,
    pub pipeline_config: Option<PathBuf>,
    pub threads: Option<usize>,
    pub sessions: usize,
    pub device: String,
}

impl ScanConfig {
    pub fn pipeline(&self) -> Result<PipelineConfig, ConfigError> {
        load_pipeline(self.pipeline_config.as_deref())
    }

    pub fn session(&self) -> Result<Option<OrtSessionConfig>, ConfigError> {
        let session = OrtSessionConfig::from_device(&self.device)?;
        Ok(match (session, self.threads) {
            (Some(session), Some(threads)) => Some(session.with_intra_threads(threads)),
            (None, Some(threads)) => Some(OrtSessionConfig::new().with_intra_threads(threads)),
            (session, None) => session,
        })
    }

    pub fn parallel(&self) -> ParallelPolicy {
        ParallelPolicy::new().with_max_threads(self.threads)
    }
}

/// Loads the pipeline configuration from `path`, or validated defaults.
pub fn load_pipeline(path: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    match path {
        Some(path) => PipelineConfig::from_json_file(path),
        None => {
            let config = PipelineConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Parses a 1-based page selection such as `"1,3-5"` into sorted,
/// de-duplicated 0-based indices.
pub fn parse_pages(spec: &str, page_count: usize) -> Result<Vec<usize>, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidConfig(format!("--pages: {message}"));
    let number = |text: &str| -> Result<usize, ConfigError> {
        let value: usize = text
            .trim()
            .parse()
            .map_err(|_| invalid(format!("'{}' is not a page number", text.trim())))?;
        if value == 0 || value > page_count {
            return Err(invalid(format!(
                "page {value} is outside 1-{page_count}"
            )));
        }
        Ok(value - 1)
    };

    let mut pages = Vec::new();
    for part in spec.split(',').filter(|part| !part.trim().is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (number(start)?, number(end)?);
                if start > end {
                    return Err(invalid(format!("range '{}' is reversed", part.trim())));
                }
                pages.extend(start..=end);
            }
            None => pages.push(number(part)?),
        }
    }
    if pages.is_empty() {
        return Err(invalid("no pages selected".to_string()));
    }
    pages.sort_unstable();
    pages.dedup();
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pages() {
        assert_eq!(parse_pages("1,3-5", 10).unwrap(), vec![0, 2, 3, 4]);
        assert_eq!(parse_pages(" 2 , 2, 1-2 ", 3).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_parse_pages_rejects_bad_input() {
        assert!(parse_pages("0", 3).is_err());
        assert!(parse_pages("4", 3).is_err());
        assert!(parse_pages("3-1", 3).is_err());
        assert!(parse_pages("a", 3).is_err());
        assert!(parse_pages("", 3).is_err());
    }

    #[test]
    fn test_threads_apply_to_cpu_session() {
        let config = ScanConfig {
            file: PathBuf::from("book.pdf"),
            model: PathBuf::from("chssnet.onnx"),
            pages: None,
            pipeline_config: None,
            threads: Some(2),
            sessions: 1,
            device: "cpu".to_string(),
        };
        let session = config.session().unwrap().unwrap();
        assert_eq!(session.intra_threads, Some(2));
        assert_eq!(config.parallel().max_threads, Some(2));
    }
}
