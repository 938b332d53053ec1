//! Error types for the gateway

use thiserror::Error;

/// Result type alias using our GatewayError
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Why a user-supplied symbol could not be mapped to a listed contract
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// Nothing in the contract list matches
    #[error("symbol not listed on venue: {0}")]
    NotFound(String),

    /// More than one contract matches equally well
    #[error("symbol {symbol} is ambiguous, candidates: {candidates:?}")]
    Ambiguous {
        symbol: String,
        candidates: Vec<String>,
    },
}

/// Main error type for gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Network level failure (DNS, connection reset, TLS)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Outbound call exceeded its timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Signature, timestamp or key rejected by the venue
    #[error("Authentication error [{code}]: {message}")]
    Authentication { code: String, message: String },

    /// Well-formed rejection from the venue
    #[error("Venue rejected request [{code}]: {message}")]
    Venue { code: String, message: String },

    /// Rate limiting errors
    #[error("Rate limit exceeded: {message}, retry after {retry_after_seconds:?} seconds")]
    RateLimit {
        message: String,
        retry_after_seconds: Option<u64>,
    },

    /// Symbol resolution failures
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Signal kind outside the supported set
    #[error("Unknown signal: {0}")]
    UnknownSignal(String),

    /// Order that must not be sent (zero size, empty symbol)
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// Invalid API response
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Short machine-readable name used in webhook responses
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Transport(_) => "transport",
            GatewayError::Timeout(_) => "timeout",
            GatewayError::Authentication { .. } => "authentication",
            GatewayError::Venue { .. } => "venue",
            GatewayError::RateLimit { .. } => "rate_limit",
            GatewayError::Resolution(_) => "resolution",
            GatewayError::UnknownSignal(_) => "unknown_signal",
            GatewayError::InvalidOrder(_) => "invalid_order",
            GatewayError::InvalidResponse(_) => "invalid_response",
            GatewayError::JsonParse(_) => "json",
            GatewayError::Configuration(_) => "configuration",
            GatewayError::Internal(_) => "internal",
        }
    }

    /// Failed before a venue answer was received
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Transport(_) | GatewayError::Timeout(_))
    }

    /// Safe to try again for idempotent requests
    pub fn is_retryable(&self) -> bool {
        self.is_transport() || matches!(self, GatewayError::RateLimit { .. })
    }

    /// Caused by the caller's input rather than by the venue or the network
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GatewayError::Resolution(_)
                | GatewayError::UnknownSignal(_)
                | GatewayError::InvalidOrder(_)
        )
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}
