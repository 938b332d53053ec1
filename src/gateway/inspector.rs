//! Position queries and response normalization.
//!
//! Position endpoints have answered in three shapes across API versions:
//! a list of per-side records, a single record, and an object with nested
//! `long`/`short` records. [`PositionPayload::classify`] names the shape
//! explicitly; anything else is an `InvalidResponse`.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::common::errors::{GatewayError, Result};
use crate::common::traits::SharedTransport;
use crate::common::types::{CanonicalSymbol, PositionSet, PositionSide};

const SIDE_FIELDS: [&str; 3] = ["holdSide", "posSide", "side"];
const AVAILABLE_FIELDS: [&str; 3] = ["available", "availableSize", "available_size"];

/// Recognized position response shapes
#[derive(Debug, PartialEq)]
pub enum PositionPayload<'a> {
    /// `null`, `[]` or `{}`
    Empty,
    /// `[{holdSide, available, ...}, ...]`
    List(&'a [Value]),
    /// `{holdSide, available, ...}`
    Record(&'a Map<String, Value>),
    /// `{long: {...}, short: {...}}`
    Nested {
        long: Option<&'a Value>,
        short: Option<&'a Value>,
    },
}

impl<'a> PositionPayload<'a> {
    pub fn classify(data: &'a Value) -> Result<Self> {
        match data {
            Value::Null => Ok(PositionPayload::Empty),
            Value::Array(items) if items.is_empty() => Ok(PositionPayload::Empty),
            Value::Array(items) => Ok(PositionPayload::List(items)),
            Value::Object(map) if map.is_empty() => Ok(PositionPayload::Empty),
            Value::Object(map) if SIDE_FIELDS.iter().any(|f| map.contains_key(*f)) => {
                Ok(PositionPayload::Record(map))
            }
            Value::Object(map) if map.contains_key("long") || map.contains_key("short") => {
                Ok(PositionPayload::Nested {
                    long: map.get("long"),
                    short: map.get("short"),
                })
            }
            other => Err(GatewayError::InvalidResponse(format!(
                "unrecognized position payload: {}",
                other
            ))),
        }
    }
}

/// One side of a position as parsed from a record
#[derive(Debug, Clone, PartialEq)]
struct RawPosition {
    symbol: Option<String>,
    side: PositionSide,
    available: Decimal,
}

/// Decimal from a JSON string or number; `null` and absent count as zero
fn decimal_value(value: Option<&Value>) -> Result<Decimal> {
    match value {
        None | Some(Value::Null) => Ok(Decimal::ZERO),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(Decimal::ZERO),
        Some(Value::String(s)) => Decimal::from_str(s.trim())
            .or_else(|_| Decimal::from_scientific(s.trim()))
            .map_err(|e| GatewayError::InvalidResponse(format!("invalid size {:?}: {}", s, e))),
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .map_err(|e| GatewayError::InvalidResponse(format!("invalid size {}: {}", n, e))),
        Some(other) => Err(GatewayError::InvalidResponse(format!(
            "size is not a number: {}",
            other
        ))),
    }
}

fn parse_side(raw: &str) -> Result<PositionSide> {
    match raw.trim().to_lowercase().as_str() {
        "long" => Ok(PositionSide::Long),
        "short" => Ok(PositionSide::Short),
        other => Err(GatewayError::InvalidResponse(format!(
            "unknown position side: {}",
            other
        ))),
    }
}

/// Parse one record. `side_hint` comes from the nested shape's key.
fn parse_record(value: &Value, side_hint: Option<PositionSide>) -> Result<Option<RawPosition>> {
    let map = match value {
        Value::Null => return Ok(None),
        Value::Object(map) if map.is_empty() => return Ok(None),
        Value::Object(map) => map,
        other => {
            return Err(GatewayError::InvalidResponse(format!(
                "position record is not an object: {}",
                other
            )))
        }
    };

    let side = match side_hint {
        Some(side) => side,
        None => {
            let raw = SIDE_FIELDS
                .iter()
                .find_map(|f| map.get(*f).and_then(Value::as_str))
                .ok_or_else(|| {
                    GatewayError::InvalidResponse(format!("position record without side: {:?}", map))
                })?;
            parse_side(raw)?
        }
    };

    let available = decimal_value(AVAILABLE_FIELDS.iter().find_map(|f| map.get(*f)))?;
    let symbol = map
        .get("symbol")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(Some(RawPosition {
        symbol,
        side,
        available,
    }))
}

fn parse_payload(data: &Value) -> Result<Vec<RawPosition>> {
    let records = match PositionPayload::classify(data)? {
        PositionPayload::Empty => Vec::new(),
        PositionPayload::List(items) => items
            .iter()
            .map(|item| parse_record(item, None))
            .collect::<Result<Vec<_>>>()?,
        PositionPayload::Record(map) => {
            vec![parse_record(&Value::Object(map.clone()), None)?]
        }
        PositionPayload::Nested { long, short } => {
            let mut records = Vec::with_capacity(2);
            if let Some(long) = long {
                records.push(parse_record(long, Some(PositionSide::Long))?);
            }
            if let Some(short) = short {
                records.push(parse_record(short, Some(PositionSide::Short))?);
            }
            records
        }
    };
    Ok(records.into_iter().flatten().collect())
}

/// Normalize a single-symbol position response.
///
/// Records for other symbols are ignored. Zero and missing sizes leave the
/// side empty.
pub fn normalize_positions(symbol: &CanonicalSymbol, data: &Value) -> Result<PositionSet> {
    let mut set = PositionSet::empty(symbol.as_str());
    for raw in parse_payload(data)? {
        if let Some(other) = &raw.symbol {
            if !other.eq_ignore_ascii_case(symbol.as_str()) {
                continue;
            }
        }
        set.add(raw.side, raw.available);
    }
    Ok(set)
}

/// Normalize an all-positions response into one set per symbol
pub fn normalize_position_list(data: &Value) -> Result<Vec<PositionSet>> {
    let mut by_symbol: BTreeMap<String, PositionSet> = BTreeMap::new();
    for raw in parse_payload(data)? {
        let symbol = raw.symbol.ok_or_else(|| {
            GatewayError::InvalidResponse("position record without symbol".to_string())
        })?;
        by_symbol
            .entry(symbol.clone())
            .or_insert_with(|| PositionSet::empty(symbol))
            .add(raw.side, raw.available);
    }
    Ok(by_symbol
        .into_values()
        .filter(|set| !set.is_flat())
        .collect())
}

/// Reads the venue's authoritative position state
pub struct PositionInspector {
    transport: SharedTransport,
}

impl PositionInspector {
    pub fn new(transport: SharedTransport) -> Self {
        Self { transport }
    }

    /// Long and/or short position on one symbol
    #[instrument(skip(self, symbol), fields(symbol = %symbol))]
    pub async fn get_position(&self, symbol: &CanonicalSymbol) -> Result<PositionSet> {
        let request = self.transport.profile().single_position_request(symbol);
        let data = self.transport.call(request).await?;
        let set = normalize_positions(symbol, &data)?;

        debug!(
            long = ?set.long.as_ref().map(|p| p.available_size),
            short = ?set.short.as_ref().map(|p| p.available_size),
            "position state"
        );
        Ok(set)
    }

    /// Every symbol with an open position
    #[instrument(skip(self))]
    pub async fn list_positions(&self) -> Result<Vec<PositionSet>> {
        let request = self.transport.profile().all_positions_request();
        let data = self.transport.call(request).await?;
        normalize_position_list(&data)
    }
}
