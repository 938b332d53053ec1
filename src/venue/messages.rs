//! Venue-specific message types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope wrapping every venue response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope {
    /// Venue status code, `"00000"` on success
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub code: Option<String>,
    #[serde(default, alias = "message")]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(default, rename = "requestTime")]
    pub request_time: Option<i64>,
}

/// String or numeric scalar as a string; any other type becomes `None`.
///
/// The venue sends `code` and order ids as strings, some paths as numbers.
fn scalar_as_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// One listed contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractInfo {
    /// Canonical symbol used by the trading endpoints
    pub symbol: String,
    #[serde(default)]
    pub base_coin: Option<String>,
    #[serde(default)]
    pub quote_coin: Option<String>,
    /// Symbol without product suffix (v1 only)
    #[serde(default)]
    pub symbol_name: Option<String>,
}

impl ContractInfo {
    /// Symbol with any `_PRODUCT` suffix removed
    pub fn base_symbol(&self) -> &str {
        match &self.symbol_name {
            Some(name) if !name.is_empty() => name,
            _ => self
                .symbol
                .split_once('_')
                .map(|(head, _)| head)
                .unwrap_or(&self.symbol),
        }
    }

    /// `baseCoin + quoteCoin`, when both are reported
    pub fn pair(&self) -> Option<String> {
        match (&self.base_coin, &self.quote_coin) {
            (Some(base), Some(quote)) => Some(format!("{}{}", base, quote).to_uppercase()),
            _ => None,
        }
    }
}

/// Data payload of a successful order placement
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderData {
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub order_id: Option<String>,
    #[serde(default, alias = "clientOrderId", deserialize_with = "scalar_as_string")]
    pub client_oid: Option<String>,
}
