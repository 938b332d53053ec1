//! SignalGateway Library
//!
//! Turns charting-alert webhook signals into signed market orders on a
//! futures venue. Positions are read from the venue before every exit, so
//! the gateway itself keeps no trading state.

pub mod common;
pub mod config;
pub mod gateway;
pub mod server;
pub mod venue;

// Re-export commonly used types
pub use common::errors::{GatewayError, ResolutionError, Result};
pub use common::traits::{HttpMethod, SharedTransport, VenueRequest, VenueTransport};
pub use common::types::{
    CanonicalSymbol, Direction, OrderAck, OrderRequest, Position, PositionSet, PositionSide, Side,
};
pub use config::types::AppConfig;
pub use gateway::{Outcome, ResultStatus, Signal, SignalKind, SignalResult, SignalRouter};
pub use venue::{VenueHttpClient, VenueProfile};
