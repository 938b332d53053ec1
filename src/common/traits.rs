//! Trait definitions for venue access

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::errors::Result;
use crate::venue::profile::VenueProfile;

/// HTTP verbs used against the venue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single call against the venue's REST API, before signing
#[derive(Debug, Clone, PartialEq)]
pub struct VenueRequest {
    pub method: HttpMethod,
    /// Path without host or query string
    pub path: String,
    /// Query parameters, sent in this order
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl VenueRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Value of a query parameter, if present
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Authenticated access to a trading venue.
///
/// Implementations sign every request, enforce a timeout and turn venue
/// rejections into typed errors, so callers only ever see the `data`
/// payload of a successful response.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VenueTransport: Send + Sync {
    /// Execute a request and return the response's data payload
    async fn call(&self, request: VenueRequest) -> Result<Value>;

    /// Endpoint paths and conventions of the venue behind this transport
    fn profile(&self) -> &VenueProfile;
}

/// Transport shared between the gateway components
pub type SharedTransport = Arc<dyn VenueTransport>;
