//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{GatewayError, Result};

/// Plain environment variables mapped onto config keys
const ENV_OVERRIDES: [(&str, &str); 7] = [
    ("BITGET_API_KEY", "venue.api_key"),
    ("BITGET_API_SECRET", "venue.api_secret"),
    ("BITGET_API_PASSPHRASE", "venue.api_passphrase"),
    ("BITGET_REST_URL", "venue.rest_url"),
    ("BITGET_ENVIRONMENT", "venue.environment"),
    ("BITGET_API_VERSION", "venue.api_version"),
    ("ORDER_SIZE", "trading.default_order_size"),
];

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. `BITGET_*` venue variables and `ORDER_SIZE`
/// 2. Environment variables (prefixed with APP_, nested with `__`)
/// 3. Configuration file (TOML format)
/// 4. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    for (env_name, key) in ENV_OVERRIDES {
        if let Ok(value) = std::env::var(env_name) {
            let value = match key {
                "venue.environment" | "venue.api_version" => value.trim().to_lowercase(),
                _ => value,
            };
            builder = builder
                .set_override(key, value)
                .map_err(|e| GatewayError::Configuration(e.to_string()))?;
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("APP")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| GatewayError::Configuration(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| GatewayError::Configuration(e.to_string()))
}
