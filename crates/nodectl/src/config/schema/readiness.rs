use super::{ConfigSchemaError, Validate};
use serde::{Deserialize, Serialize};
use std::time::Duration;

///
/// Defaults
///

mod defaults {
    pub const fn poll_interval_secs() -> u64 {
        10
    }
}

pub const MAX_POLL_INTERVAL_SECS: u64 = 3_600;

///
/// ReadinessConfig
///

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReadinessConfig {
    #[serde(default = "defaults::poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// No deadline when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ReadinessConfig {
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: defaults::poll_interval_secs(),
            timeout_secs: None,
        }
    }
}

impl Validate for ReadinessConfig {
    fn validate(&self) -> Result<(), ConfigSchemaError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigSchemaError::ValidationError(
                "readiness.poll_interval_secs must be greater than zero".into(),
            ));
        }

        if self.poll_interval_secs > MAX_POLL_INTERVAL_SECS {
            return Err(ConfigSchemaError::ValidationError(format!(
                "readiness.poll_interval_secs {} exceeds max {MAX_POLL_INTERVAL_SECS}",
                self.poll_interval_secs
            )));
        }

        if self.timeout_secs == Some(0) {
            return Err(ConfigSchemaError::ValidationError(
                "readiness.timeout_secs must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

///
/// TESTS
///
