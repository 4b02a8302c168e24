//! Engine configuration (spec §6).
//!
//! Constructed explicitly by the caller; no env/file loading lives
//! here (that's the excluded config-manager glue).

use std::time::Duration;

use crate::error::{Error, Result};

/// Recognised engine options, each with the default from spec §6.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Concurrent enrichment worker threads (>= 1).
    pub num_workers: usize,
    /// Bounded enrichment queue capacity (>= 1).
    pub queue_size: usize,
    /// Pipeline retries per job (>= 0).
    pub max_retries: u32,
    /// Max wait for workers to drain on shutdown.
    pub shutdown_timeout: Duration,
    /// Rows per recovery scan (>= 1).
    pub recovery_batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_workers: 4,
            queue_size: 1_000,
            max_retries: 3,
            shutdown_timeout: Duration::from_secs(30),
            recovery_batch_size: 1_000,
        }
    }
}

impl Config {
    /// Validate the documented constraints, failing construction the
    /// way spec §6 requires ("Invalid values fail at construction").
    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(Error::InvalidArgument(
                "num_workers must be >= 1".to_string(),
            ));
        }
        if self.queue_size == 0 {
            return Err(Error::InvalidArgument(
                "queue_size must be >= 1".to_string(),
            ));
        }
        if self.recovery_batch_size == 0 {
            return Err(Error::InvalidArgument(
                "recovery_batch_size must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_workers_rejected() {
        let config = Config {
            num_workers: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn zero_queue_size_rejected() {
        let config = Config {
            queue_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn zero_max_retries_is_allowed() {
        let config = Config {
            max_retries: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
