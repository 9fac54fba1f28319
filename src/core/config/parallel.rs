//! Thread pool configuration for region classification.

use serde::{Deserialize, Serialize};

/// Controls the rayon pool that classification fan-out runs on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParallelPolicy {
    /// Maximum number of threads to use for parallel classification.
    /// If None, rayon will use the default thread pool size (typically number of CPU cores).
    #[serde(default)]
    pub max_threads: Option<usize>,
}

impl ParallelPolicy {
    /// Create a new ParallelPolicy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of threads.
    pub fn with_max_threads(mut self, max_threads: Option<usize>) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Install the global rayon thread pool with the configured number of threads.
    ///
    /// Call once at startup, before any detection job runs.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if the thread pool was configured
    /// - `Ok(false)` if `max_threads` is None
    /// - `Err` if the global pool has already been initialized
    pub fn install_global_thread_pool(&self) -> Result<bool, rayon::ThreadPoolBuildError> {
        if let Some(num_threads) = self.max_threads {
            rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .thread_name(|index| format!("boardscan-classify-{index}"))
                .build_global()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_threads_means_no_install() {
        let policy = ParallelPolicy::new();
        assert_eq!(policy.install_global_thread_pool().ok(), Some(false));
    }
}
