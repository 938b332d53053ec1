//! Inbound signals and the results returned for them

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::common::errors::GatewayError;
use crate::common::types::{OrderAck, PositionSet, PositionSide};

/// Message received from the alerting system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    /// Signal kind as sent, e.g. `ENTRY_LONG`
    pub signal: String,
    /// Instrument as the sender names it, e.g. `SOLUSDT`
    #[serde(default, alias = "ticker")]
    pub symbol: String,
}

impl Signal {
    pub fn new(signal: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            signal: signal.into(),
            symbol: symbol.into(),
        }
    }

    pub fn kind(&self) -> Result<SignalKind, GatewayError> {
        self.signal.parse()
    }
}

/// The closed set of supported signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    EntryLong,
    EntryShort,
    ExitConfirmed,
    ExitLongTp,
    ExitLongSl,
    ExitShortTp,
    ExitShortSl,
    ListPositions,
}

impl SignalKind {
    /// Side opened by an entry signal
    pub fn entry_side(self) -> Option<PositionSide> {
        match self {
            SignalKind::EntryLong => Some(PositionSide::Long),
            SignalKind::EntryShort => Some(PositionSide::Short),
            _ => None,
        }
    }

    /// Sides an exit signal may close
    pub fn exit_sides(self) -> &'static [PositionSide] {
        match self {
            SignalKind::ExitConfirmed => &[PositionSide::Long, PositionSide::Short],
            SignalKind::ExitLongTp | SignalKind::ExitLongSl => &[PositionSide::Long],
            SignalKind::ExitShortTp | SignalKind::ExitShortSl => &[PositionSide::Short],
            _ => &[],
        }
    }

    pub fn is_exit(self) -> bool {
        !self.exit_sides().is_empty()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::EntryLong => "ENTRY_LONG",
            SignalKind::EntryShort => "ENTRY_SHORT",
            SignalKind::ExitConfirmed => "EXIT_CONFIRMED",
            SignalKind::ExitLongTp => "EXIT_LONG_TP",
            SignalKind::ExitLongSl => "EXIT_LONG_SL",
            SignalKind::ExitShortTp => "EXIT_SHORT_TP",
            SignalKind::ExitShortSl => "EXIT_SHORT_SL",
            SignalKind::ListPositions => "LIST_POSITIONS",
        }
    }
}

impl FromStr for SignalKind {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();

        match normalized.as_str() {
            "ENTRY_LONG" => Ok(SignalKind::EntryLong),
            "ENTRY_SHORT" => Ok(SignalKind::EntryShort),
            "EXIT_CONFIRMED" => Ok(SignalKind::ExitConfirmed),
            "EXIT_LONG_TP" => Ok(SignalKind::ExitLongTp),
            "EXIT_LONG_SL" => Ok(SignalKind::ExitLongSl),
            "EXIT_SHORT_TP" => Ok(SignalKind::ExitShortTp),
            "EXIT_SHORT_SL" => Ok(SignalKind::ExitShortSl),
            "LIST_POSITIONS" => Ok(SignalKind::ListPositions),
            _ => Err(GatewayError::UnknownSignal(s.to_string())),
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level status reported to the webhook sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Ok,
    Error,
    NoPosition,
}

/// How a signal ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Entry order accepted
    Opened,
    /// Every targeted open side closed
    Closed,
    /// Exit signal on a flat symbol
    NoPosition,
    /// Read-only position listing
    Positions,
    /// Refused before anything was sent (bad input)
    Rejected,
    /// The venue or the network failed
    Failed,
}

/// Result of handling one signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub status: ResultStatus,
    pub outcome: Outcome,
    pub signal: String,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_symbol: Option<String>,
    /// Orders the venue acknowledged, even when a later step failed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orders: Vec<OrderAck>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub positions: Vec<PositionSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl SignalResult {
    fn base(signal: &Signal, status: ResultStatus, outcome: Outcome) -> Self {
        Self {
            status,
            outcome,
            signal: signal.signal.clone(),
            symbol: signal.symbol.clone(),
            canonical_symbol: None,
            orders: Vec::new(),
            positions: Vec::new(),
            message: None,
            error_kind: None,
        }
    }

    pub fn opened(signal: &Signal, ack: OrderAck) -> Self {
        let mut result = Self::base(signal, ResultStatus::Ok, Outcome::Opened);
        result.canonical_symbol = Some(ack.symbol.to_string());
        result.orders.push(ack);
        result
    }

    pub fn closed(signal: &Signal, canonical: String, acks: Vec<OrderAck>) -> Self {
        let mut result = Self::base(signal, ResultStatus::Ok, Outcome::Closed);
        result.canonical_symbol = Some(canonical);
        result.orders = acks;
        result
    }

    pub fn no_position(signal: &Signal, canonical: String) -> Self {
        let mut result = Self::base(signal, ResultStatus::NoPosition, Outcome::NoPosition);
        result.canonical_symbol = Some(canonical);
        result.message = Some("no open position to close".to_string());
        result
    }

    pub fn positions(signal: &Signal, canonical: Option<String>, positions: Vec<PositionSet>) -> Self {
        let mut result = Self::base(signal, ResultStatus::Ok, Outcome::Positions);
        result.canonical_symbol = canonical;
        result.positions = positions;
        result
    }

    /// Failure result. Client-side errors become `Rejected`, the rest `Failed`.
    pub fn from_error(signal: &Signal, error: &GatewayError) -> Self {
        let outcome = if error.is_client_error() {
            Outcome::Rejected
        } else {
            Outcome::Failed
        };
        let mut result = Self::base(signal, ResultStatus::Error, outcome);
        result.message = Some(error.to_string());
        result.error_kind = Some(error.kind().to_string());
        result
    }

    pub fn with_canonical(mut self, canonical: Option<String>) -> Self {
        if canonical.is_some() {
            self.canonical_symbol = canonical;
        }
        self
    }

    pub fn with_orders(mut self, orders: Vec<OrderAck>) -> Self {
        self.orders = orders;
        self
    }

    /// HTTP status for the webhook shim: 200 for handled signals including
    /// no-ops, 400 for rejected input, 500 for venue or network failures
    pub fn http_status(&self) -> u16 {
        match self.outcome {
            Outcome::Opened | Outcome::Closed | Outcome::NoPosition | Outcome::Positions => 200,
            Outcome::Rejected => 400,
            Outcome::Failed => 500,
        }
    }
}
