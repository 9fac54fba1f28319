//! ONNX Runtime session configuration.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Graph optimization levels for ONNX Runtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum OrtGraphOptimizationLevel {
    /// Disable all optimizations.
    DisableAll,
    /// Enable basic optimizations.
    #[default]
    Level1,
    /// Enable extended optimizations.
    Level2,
    /// Enable all optimizations.
    Level3,
}

/// Execution providers the classifier session can be placed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum OrtExecutionProvider {
    /// CPU execution provider (always available)
    #[default]
    CPU,
    /// NVIDIA CUDA execution provider
    CUDA {
        /// CUDA device ID (default: 0)
        device_id: Option<i32>,
    },
    /// CoreML execution provider (macOS/iOS only)
    CoreML {
        /// Restrict execution to CPU and the Apple Neural Engine
        ane_only: Option<bool>,
        /// Enable CoreML on subgraphs
        subgraphs: Option<bool>,
    },
}

/// Configuration for ONNX Runtime sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrtSessionConfig {
    /// Number of threads used to parallelize execution within nodes
    pub intra_threads: Option<usize>,
    /// Number of threads used to parallelize execution across nodes
    pub inter_threads: Option<usize>,
    /// Graph optimization level
    pub optimization_level: Option<OrtGraphOptimizationLevel>,
    /// Execution providers in order of preference
    pub execution_providers: Option<Vec<OrtExecutionProvider>>,
}

impl OrtSessionConfig {
    /// Creates a new OrtSessionConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of intra-op threads.
    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = Some(threads);
        self
    }

    /// Sets the number of inter-op threads.
    pub fn with_inter_threads(mut self, threads: usize) -> Self {
        self.inter_threads = Some(threads);
        self
    }

    /// Sets the graph optimization level.
    pub fn with_optimization_level(mut self, level: OrtGraphOptimizationLevel) -> Self {
        self.optimization_level = Some(level);
        self
    }

    /// Replaces the execution providers.
    pub fn with_execution_providers(mut self, providers: Vec<OrtExecutionProvider>) -> Self {
        self.execution_providers = Some(providers);
        self
    }

    /// Appends a single execution provider.
    pub fn add_execution_provider(mut self, provider: OrtExecutionProvider) -> Self {
        self.execution_providers
            .get_or_insert_with(Vec::new)
            .push(provider);
        self
    }

    /// Builds a session configuration from a device string.
    ///
    /// Accepted forms are `cpu`, `cuda`, `cuda:N` and `coreml`. Accelerated
    /// providers always get a CPU fallback appended. `cpu` yields `None`
    /// since the CPU provider is the runtime default.
    pub fn from_device(device: &str) -> Result<Option<Self>, ConfigError> {
        let device_lower = device.trim().to_lowercase();

        let provider = match device_lower.as_str() {
            "cpu" => return Ok(None),
            "coreml" => OrtExecutionProvider::CoreML {
                ane_only: None,
                subgraphs: None,
            },
            "cuda" => OrtExecutionProvider::CUDA { device_id: Some(0) },
            other => match other.strip_prefix("cuda:") {
                Some(id) => {
                    let device_id = id.parse::<i32>().map_err(|_| {
                        ConfigError::InvalidConfig(format!(
                            "invalid CUDA device ID in '{device}', expected 'cuda' or 'cuda:N'"
                        ))
                    })?;
                    OrtExecutionProvider::CUDA {
                        device_id: Some(device_id),
                    }
                }
                None => {
                    return Err(ConfigError::InvalidConfig(format!(
                        "unsupported device '{device}', expected cpu, cuda, cuda:N or coreml"
                    )));
                }
            },
        };

        Ok(Some(Self::new().with_execution_providers(vec![
            provider,
            OrtExecutionProvider::CPU,
        ])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ort_session_config_builder() {
        let config = OrtSessionConfig::new()
            .with_intra_threads(4)
            .with_inter_threads(2)
            .with_optimization_level(OrtGraphOptimizationLevel::Level2)
            .add_execution_provider(OrtExecutionProvider::CPU);

        assert_eq!(config.intra_threads, Some(4));
        assert_eq!(config.inter_threads, Some(2));
        assert_eq!(
            config.optimization_level,
            Some(OrtGraphOptimizationLevel::Level2)
        );
        assert_eq!(
            config.execution_providers,
            Some(vec![OrtExecutionProvider::CPU])
        );
    }

    #[test]
    fn test_from_device() {
        assert!(OrtSessionConfig::from_device("cpu").unwrap().is_none());

        let cuda = OrtSessionConfig::from_device("CUDA:1").unwrap().unwrap();
        assert_eq!(
            cuda.execution_providers,
            Some(vec![
                OrtExecutionProvider::CUDA { device_id: Some(1) },
                OrtExecutionProvider::CPU
            ])
        );

        assert!(OrtSessionConfig::from_device("cuda:x").is_err());
        assert!(OrtSessionConfig::from_device("tpu").is_err());
    }
}
