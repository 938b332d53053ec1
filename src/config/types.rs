//! Configuration types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::common::errors::{GatewayError, Result};
use crate::venue::auth::SignatureEncoding;
use crate::venue::profile::{QuerySigning, VenueProfile};
use crate::venue::retry::RetryPolicy;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Venue connection and signing configuration
    #[serde(default)]
    pub venue: VenueConfig,
    /// Order sizing
    #[serde(default)]
    pub trading: TradingConfig,
    /// Webhook listener configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

/// Live trading or the venue's paper-trading environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueEnvironment {
    #[default]
    Live,
    Demo,
}

/// Venue REST API generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    #[default]
    V1,
    V2,
}

/// Venue platform configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    /// API key for authenticated requests
    #[serde(default)]
    pub api_key: Option<String>,
    /// API secret for signing requests
    #[serde(default)]
    pub api_secret: Option<String>,
    /// API passphrase
    #[serde(default)]
    pub api_passphrase: Option<String>,
    /// Live or demo trading
    #[serde(default)]
    pub environment: VenueEnvironment,
    /// Which REST API generation to talk to
    #[serde(default)]
    pub api_version: ApiVersion,
    /// Overrides the profile's base URL
    #[serde(default)]
    pub rest_url: Option<String>,
    /// Overrides the profile's product type
    #[serde(default)]
    pub product_type: Option<String>,
    /// Margin coin for positions and orders
    #[serde(default = "default_margin_coin")]
    pub margin_coin: String,
    /// Include the query string in the signed path of GET requests
    #[serde(default = "default_sign_query_string")]
    pub sign_query_string: bool,
    /// Signature transport encoding
    #[serde(default)]
    pub signature_encoding: SignatureEncoding,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            api_passphrase: None,
            environment: VenueEnvironment::default(),
            api_version: ApiVersion::default(),
            rest_url: None,
            product_type: None,
            margin_coin: default_margin_coin(),
            sign_query_string: default_sign_query_string(),
            signature_encoding: SignatureEncoding::default(),
        }
    }
}

impl VenueConfig {
    /// Credentials for signing, failing if any secret is missing
    pub fn credentials(&self) -> Result<ApiCredentials> {
        fn required(value: &Option<String>, name: &str) -> Result<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| GatewayError::Configuration(format!("missing venue {}", name)))
        }

        Ok(ApiCredentials::new(
            required(&self.api_key, "api_key")?,
            required(&self.api_secret, "api_secret")?,
            required(&self.api_passphrase, "api_passphrase")?,
        ))
    }

    /// Build the venue profile with this configuration's overrides applied
    pub fn profile(&self) -> VenueProfile {
        let mut profile = match self.api_version {
            ApiVersion::V1 => VenueProfile::mix_v1(self.environment),
            ApiVersion::V2 => VenueProfile::mix_v2(self.environment),
        };

        if let Some(url) = &self.rest_url {
            profile.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(product_type) = &self.product_type {
            profile.product_type = product_type.clone();
        }
        profile.margin_coin = self.margin_coin.clone();
        profile.signature_encoding = self.signature_encoding;
        profile.query_signing = if self.sign_query_string {
            QuerySigning::IncludeQuery
        } else {
            QuerySigning::PathOnly
        };
        profile
    }
}

fn default_margin_coin() -> String {
    "USDT".to_string()
}

fn default_sign_query_string() -> bool {
    true
}

/// Order sizing. Sizes are fixed per symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Size used for entries on symbols without an override
    #[serde(default = "default_order_size")]
    pub default_order_size: Decimal,
    /// Per-symbol sizes keyed by the user-facing symbol (uppercase)
    #[serde(default, deserialize_with = "uppercase_keys")]
    pub order_sizes: HashMap<String, Decimal>,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            default_order_size: default_order_size(),
            order_sizes: HashMap::new(),
        }
    }
}

impl TradingConfig {
    /// Entry size for a user-facing symbol
    pub fn size_for(&self, symbol: &str) -> Decimal {
        let wanted = symbol.trim().to_uppercase();
        self.order_sizes
            .get(&wanted)
            .or_else(|| {
                self.order_sizes
                    .iter()
                    .find(|(key, _)| key.trim().eq_ignore_ascii_case(&wanted))
                    .map(|(_, size)| size)
            })
            .copied()
            .unwrap_or(self.default_order_size)
    }
}

/// Config sources lowercase map keys; symbols are stored uppercase
fn uppercase_keys<'de, D>(deserializer: D) -> std::result::Result<HashMap<String, Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = HashMap::<String, Decimal>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(symbol, size)| (symbol.trim().to_uppercase(), size))
        .collect())
}

fn default_order_size() -> Decimal {
    Decimal::ONE
}

/// Webhook listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the webhook listener binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Route that receives signals
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
    /// Answer rejected signals with 200 for senders that retry on 4xx
    #[serde(default)]
    pub rejections_as_ok: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            webhook_path: default_webhook_path(),
            rejections_as_ok: false,
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Retries for GET requests (POST is never retried)
    #[serde(default)]
    pub get_max_retries: u32,
    /// First retry delay in milliseconds
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,
    /// Contract list cache lifetime (0 = fetch on every signal)
    #[serde(default)]
    pub contract_cache_ttl_seconds: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            request_timeout_seconds: default_request_timeout(),
            get_max_retries: 0,
            retry_base_delay_ms: default_retry_base_delay(),
            contract_cache_ttl_seconds: 0,
        }
    }
}

impl AppSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.max(1))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.get_max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            ..RetryPolicy::default()
        }
    }

    pub fn contract_cache_ttl(&self) -> Option<Duration> {
        match self.contract_cache_ttl_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_retry_base_delay() -> u64 {
    250
}

/// API credentials for authenticated requests
#[derive(Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: String,
}

impl ApiCredentials {
    pub fn new(api_key: String, api_secret: String, passphrase: String) -> Self {
        Self {
            api_key,
            api_secret,
            passphrase,
        }
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .finish()
    }
}
