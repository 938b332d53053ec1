//! Domain types shared by the venue client and the gateway

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Side of an open position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// Order direction that reduces a position on this side
    pub fn closing_direction(self) -> Direction {
        match self {
            PositionSide::Long => Direction::CloseLong,
            PositionSide::Short => Direction::CloseShort,
        }
    }

    /// Order direction that opens a position on this side
    pub fn opening_direction(self) -> Direction {
        match self {
            PositionSide::Long => Direction::OpenLong,
            PositionSide::Short => Direction::OpenShort,
        }
    }
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionSide::Long => write!(f, "long"),
            PositionSide::Short => write!(f, "short"),
        }
    }
}

/// Buy or sell, as the venue's matching engine sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// What an order does to the account's positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    OpenLong,
    OpenShort,
    CloseLong,
    CloseShort,
}

impl Direction {
    /// Matching-engine side of the order.
    ///
    /// Closing a long sells, closing a short buys.
    pub fn order_side(self) -> Side {
        match self {
            Direction::OpenLong | Direction::CloseShort => Side::Buy,
            Direction::OpenShort | Direction::CloseLong => Side::Sell,
        }
    }

    /// Position side the order acts on
    pub fn position_side(self) -> PositionSide {
        match self {
            Direction::OpenLong | Direction::CloseLong => PositionSide::Long,
            Direction::OpenShort | Direction::CloseShort => PositionSide::Short,
        }
    }

    pub fn is_close(self) -> bool {
        matches!(self, Direction::CloseLong | Direction::CloseShort)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::OpenLong => "open_long",
            Direction::OpenShort => "open_short",
            Direction::CloseLong => "close_long",
            Direction::CloseShort => "close_short",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Venue-recognized contract identifier, e.g. `SOLUSDT_UMCBL`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalSymbol(String);

impl CanonicalSymbol {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanonicalSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One side of one symbol, as reported by the venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: PositionSide,
    /// Size that can be closed right now
    pub available_size: Decimal,
}

impl Position {
    pub fn new(symbol: impl Into<String>, side: PositionSide, available_size: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            available_size,
        }
    }

    pub fn is_open(&self) -> bool {
        self.available_size > Decimal::ZERO
    }
}

/// Zero, one or two positions for a symbol.
///
/// Hedge-mode accounts may hold a long and a short at the same time, so
/// each side is tracked separately instead of as one signed quantity.
/// Sides with no available size are never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionSet {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short: Option<Position>,
}

impl PositionSet {
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            long: None,
            short: None,
        }
    }

    /// Add size to a side. Non-positive sizes are ignored.
    pub fn add(&mut self, side: PositionSide, available_size: Decimal) {
        if available_size <= Decimal::ZERO {
            return;
        }
        let slot = match side {
            PositionSide::Long => &mut self.long,
            PositionSide::Short => &mut self.short,
        };
        match slot {
            Some(existing) => existing.available_size += available_size,
            None => *slot = Some(Position::new(self.symbol.clone(), side, available_size)),
        }
    }

    pub fn side(&self, side: PositionSide) -> Option<&Position> {
        match side {
            PositionSide::Long => self.long.as_ref(),
            PositionSide::Short => self.short.as_ref(),
        }
    }

    /// Positions with size that can be closed, long first
    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.long
            .iter()
            .chain(self.short.iter())
            .filter(|p| p.is_open())
    }

    pub fn is_flat(&self) -> bool {
        self.open_positions().next().is_none()
    }
}

/// Order type sent to the venue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
}

/// A market order ready for submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: CanonicalSymbol,
    pub direction: Direction,
    pub size: Decimal,
    pub order_type: OrderType,
}

impl OrderRequest {
    pub fn market(symbol: CanonicalSymbol, direction: Direction, size: Decimal) -> Self {
        Self {
            symbol,
            direction,
            size,
            order_type: OrderType::Market,
        }
    }

    /// Orders flagged to only decrease an existing position
    pub fn reduce_only(&self) -> bool {
        self.direction.is_close()
    }
}

/// Venue acknowledgement of a submitted order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub symbol: CanonicalSymbol,
    pub direction: Direction,
    pub size: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
}
