//! Signed REST client for the venue API

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::auth::SignedRequest;
use super::messages::ApiEnvelope;
use super::profile::{QuerySigning, VenueProfile};
use super::retry::{with_retry, RetryPolicy};
use crate::common::errors::{GatewayError, Result};
use crate::common::traits::{HttpMethod, VenueRequest, VenueTransport};
use crate::config::types::ApiCredentials;

/// Signed REST client for one venue profile.
///
/// Cheap to share: the inner connection pool is reference counted and safe
/// for concurrent use.
#[derive(Debug, Clone)]
pub struct VenueHttpClient {
    /// HTTP client
    client: Client,
    /// Endpoint and signing conventions
    profile: VenueProfile,
    /// Key, secret and passphrase
    credentials: ApiCredentials,
    /// Applied to GET requests only
    retry: RetryPolicy,
}

impl VenueHttpClient {
    /// Create a new client with the default 10 second timeout
    pub fn new(profile: VenueProfile, credentials: ApiCredentials) -> Result<Self> {
        Self::with_timeout(profile, credentials, Duration::from_secs(10))
    }

    /// Create a new client with custom timeout
    pub fn with_timeout(
        profile: VenueProfile,
        credentials: ApiCredentials,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            profile,
            credentials,
            retry: RetryPolicy::none(),
        })
    }

    /// Set the retry policy used for GET requests
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Encode query parameters in the given order
    fn query_string(query: &[(String, String)]) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish()
    }

    /// Path fed to the signer, per the profile's query-signing convention
    fn signed_path(&self, path: &str, query_string: &str) -> String {
        match self.profile.query_signing {
            QuerySigning::IncludeQuery if !query_string.is_empty() => {
                format!("{}?{}", path, query_string)
            }
            _ => path.to_string(),
        }
    }

    /// One signed attempt, no retries
    async fn execute(&self, request: &VenueRequest) -> Result<Value> {
        let query_string = Self::query_string(&request.query);
        let body = match &request.body {
            Some(value) => serde_json::to_string(value)?,
            None => String::new(),
        };

        let url = if query_string.is_empty() {
            format!("{}{}", self.profile.base_url, request.path)
        } else {
            format!("{}{}?{}", self.profile.base_url, request.path, query_string)
        };

        // Fresh timestamp per attempt
        let signed = SignedRequest::now(
            &self.credentials,
            request.method,
            &self.signed_path(&request.path, &query_string),
            &body,
            self.profile.signature_encoding,
        )?;

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url).body(body),
        };
        builder = signed.apply_to_request(&self.credentials, builder);
        for (name, value) in &self.profile.extra_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        debug!("Sending {} {}", request.method, url);
        let response = builder.send().await?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let text = response.text().await?;

        self.interpret(status, retry_after, &text)
    }

    /// Turn a raw HTTP answer into the data payload or a typed failure
    fn interpret(&self, status: StatusCode, retry_after: Option<u64>, text: &str) -> Result<Value> {
        let envelope = serde_json::from_str::<ApiEnvelope>(text).ok();
        let code = envelope.as_ref().and_then(|e| e.code.clone());
        let message = envelope
            .as_ref()
            .and_then(|e| e.msg.clone())
            .unwrap_or_else(|| text.chars().take(200).collect());

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GatewayError::RateLimit {
                message,
                retry_after_seconds: retry_after,
            });
        }

        let auth_rejected = matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
            || code.as_deref().is_some_and(|c| self.profile.is_auth_error(c));
        if auth_rejected {
            return Err(GatewayError::Authentication {
                code: code.unwrap_or_else(|| status.as_u16().to_string()),
                message,
            });
        }

        if !status.is_success() {
            return Err(GatewayError::Venue {
                code: code.unwrap_or_else(|| status.as_u16().to_string()),
                message,
            });
        }

        match envelope {
            Some(ApiEnvelope {
                code: Some(code), ..
            }) if code != self.profile.success_code => {
                warn!(%code, %message, "venue rejected request with HTTP {}", status);
                Err(GatewayError::Venue { code, message })
            }
            Some(ApiEnvelope {
                code: Some(_),
                data,
                ..
            }) => Ok(data),
            // Success is only ever signalled by the envelope code
            _ if serde_json::from_str::<Value>(text).is_ok() => Err(GatewayError::InvalidResponse(
                format!("HTTP {} body without status code: {}", status, message),
            )),
            _ => Err(GatewayError::InvalidResponse(format!(
                "non-JSON body with HTTP {}: {}",
                status, message
            ))),
        }
    }
}

#[async_trait]
impl VenueTransport for VenueHttpClient {
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn call(&self, request: VenueRequest) -> Result<Value> {
        match request.method {
            HttpMethod::Get => with_retry(&self.retry, || self.execute(&request)).await,
            // Order placement is never replayed
            HttpMethod::Post => self.execute(&request).await,
        }
    }

    fn profile(&self) -> &VenueProfile {
        &self.profile
    }
}
