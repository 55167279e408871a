pub mod schema;

use crate::ThisError;
use schema::{ConfigSchemaError, Validate};
use std::sync::{Arc, LazyLock, OnceLock};

pub use schema::ConfigModel;

//
// CONFIG
//
// Installed once per process. Facades for different nodes are commonly driven
// from separate threads, so the model is shared behind an Arc.
//

static CONFIG: OnceLock<Arc<ConfigModel>> = OnceLock::new();
static DEFAULT_CONFIG: LazyLock<Arc<ConfigModel>> =
    LazyLock::new(|| Arc::new(ConfigModel::default()));

/// Errors related to configuration lifecycle and parsing.
#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("config has already been initialized")]
    AlreadyInitialized,

    /// TOML could not be parsed into the expected structure.
    #[error("toml error: {0}")]
    CannotParseToml(String),

    /// Wrapper for data schema-level errors.
    #[error(transparent)]
    ConfigSchema(#[from] ConfigSchemaError),
}

///
/// Config
///

pub struct Config {}

impl Config {
    /// Return the installed configuration, or the defaults if none was installed.
    #[must_use]
    pub fn get() -> Arc<ConfigModel> {
        Self::try_get().unwrap_or_else(|| DEFAULT_CONFIG.clone())
    }

    #[must_use]
    pub fn try_get() -> Option<Arc<ConfigModel>> {
        CONFIG.get().cloned()
    }

    /// Parse, validate and install the process-wide configuration.
    pub fn init_from_toml(config_str: &str) -> Result<(), ConfigError> {
        let config = ConfigModel::from_toml(config_str)?;

        CONFIG
            .set(Arc::new(config))
            .map_err(|_| ConfigError::AlreadyInitialized)
    }
}

impl ConfigModel {
    /// Parse and validate a model without installing it.
    pub fn from_toml(config_str: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(config_str).map_err(|e| ConfigError::CannotParseToml(e.to_string()))?;

        // validate
        config.validate().map_err(ConfigError::from)?;

        Ok(config)
    }
}

///
/// TESTS
///
