//! Request signing for the venue API

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::common::errors::{GatewayError, Result};
use crate::common::traits::HttpMethod;
use crate::config::types::ApiCredentials;

type HmacSha256 = Hmac<Sha256>;

/// How the raw HMAC digest is encoded for the `ACCESS-SIGN` header.
///
/// The two are not interchangeable: the venue silently rejects a
/// signature in the wrong encoding as an authentication failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureEncoding {
    #[default]
    Base64,
    Hex,
}

/// Build the pre-hash string: `timestamp + METHOD + path + body`
pub fn prehash(timestamp: i64, method: &str, request_path: &str, body: &str) -> String {
    format!("{}{}{}{}", timestamp, method.to_uppercase(), request_path, body)
}

/// Generate HMAC-SHA256 signature for API requests
///
/// # Arguments
/// * `secret` - API secret, used verbatim as the HMAC key
/// * `timestamp` - Unix timestamp in milliseconds
/// * `method` - HTTP method (GET, POST, etc.)
/// * `request_path` - API endpoint path, including `?query` when signed
/// * `body` - Exact request body bytes (empty string for GET requests)
/// * `encoding` - Header encoding of the digest
pub fn sign_request(
    secret: &str,
    timestamp: i64,
    method: &str,
    request_path: &str,
    body: &str,
    encoding: SignatureEncoding,
) -> Result<String> {
    let message = prehash(timestamp, method, request_path, body);

    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| GatewayError::Internal(format!("Failed to create HMAC: {}", e)))?;
    mac.update(message.as_bytes());
    let digest = mac.finalize().into_bytes();

    Ok(match encoding {
        SignatureEncoding::Base64 => BASE64.encode(digest),
        SignatureEncoding::Hex => hex::encode(digest),
    })
}

/// A request with its freshly computed authentication material.
///
/// Built once per HTTP call and never reused: the venue rejects stale
/// timestamps.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub method: HttpMethod,
    /// Path exactly as signed (with query string when the profile signs it)
    pub signed_path: String,
    pub body: String,
    pub timestamp: i64,
    pub signature: String,
}

impl SignedRequest {
    /// Sign at an explicit timestamp
    pub fn build(
        credentials: &ApiCredentials,
        method: HttpMethod,
        signed_path: &str,
        body: &str,
        timestamp: i64,
        encoding: SignatureEncoding,
    ) -> Result<Self> {
        let signature = sign_request(
            &credentials.api_secret,
            timestamp,
            method.as_str(),
            signed_path,
            body,
            encoding,
        )?;

        Ok(Self {
            method,
            signed_path: signed_path.to_string(),
            body: body.to_string(),
            timestamp,
            signature,
        })
    }

    /// Sign at the current time
    pub fn now(
        credentials: &ApiCredentials,
        method: HttpMethod,
        signed_path: &str,
        body: &str,
        encoding: SignatureEncoding,
    ) -> Result<Self> {
        let timestamp = chrono::Utc::now().timestamp_millis();
        Self::build(credentials, method, signed_path, body, timestamp, encoding)
    }

    /// Add authentication headers to a reqwest RequestBuilder
    pub fn apply_to_request(
        &self,
        credentials: &ApiCredentials,
        request: reqwest::RequestBuilder,
    ) -> reqwest::RequestBuilder {
        request
            .header("ACCESS-KEY", &credentials.api_key)
            .header("ACCESS-SIGN", &self.signature)
            .header("ACCESS-TIMESTAMP", self.timestamp.to_string())
            .header("ACCESS-PASSPHRASE", &credentials.passphrase)
            .header("Content-Type", "application/json")
    }
}
