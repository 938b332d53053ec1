//! Signal dispatch
//!
//! Each signal runs through a short, stateless chain:
//!
//! ```text
//! RECEIVED → RESOLVING_SYMBOL ─┬─ entry ──────────────────────────→ EXECUTING_ENTRY ─┬→ DONE
//!                              ├─ exit ─→ INSPECTING_POSITION ───→ EXECUTING_EXIT  ─┤
//!                              └─ list ─→ INSPECTING_POSITION ──────────────────────┤
//!                                                                                   └→ REJECTED
//! ```
//!
//! Nothing is shared between signals except the transport. Exits read the
//! venue's position state right before closing, so a repeated exit on a
//! flat symbol ends as `no_position` instead of a second order.

use std::time::Duration;

use tracing::{error, info, instrument, warn};

use super::executor::OrderExecutor;
use super::inspector::PositionInspector;
use super::resolver::{normalize_symbol, SymbolResolver};
use super::signal::{ResultStatus, Signal, SignalKind, SignalResult};
use crate::common::errors::{GatewayError, ResolutionError, Result};
use crate::common::traits::SharedTransport;
use crate::common::types::{CanonicalSymbol, Position, PositionSide};
use crate::config::types::TradingConfig;

/// Turns signals into venue orders
pub struct SignalRouter {
    resolver: SymbolResolver,
    inspector: PositionInspector,
    executor: OrderExecutor,
    trading: TradingConfig,
}

impl SignalRouter {
    pub fn new(transport: SharedTransport, trading: TradingConfig) -> Self {
        Self {
            resolver: SymbolResolver::new(transport.clone()),
            inspector: PositionInspector::new(transport.clone()),
            executor: OrderExecutor::new(transport),
            trading,
        }
    }

    /// Cache the contract list for `ttl` (`None` fetches it per signal)
    pub fn with_contract_cache(mut self, ttl: Option<Duration>) -> Self {
        self.resolver = self.resolver.with_cache_ttl(ttl);
        self
    }

    /// Handle one signal. Never fails: every error becomes a result.
    #[instrument(skip(self, signal), fields(signal = %signal.signal, symbol = %signal.symbol))]
    pub async fn handle(&self, signal: &Signal) -> SignalResult {
        let kind = match signal.kind() {
            Ok(kind) => kind,
            Err(e) => {
                warn!("Rejecting signal: {}", e);
                return SignalResult::from_error(signal, &e);
            }
        };

        let result = match kind {
            SignalKind::ListPositions => self.handle_list(signal).await,
            kind => match kind.entry_side() {
                Some(side) => self.handle_entry(signal, side).await,
                None => self.handle_exit(signal, kind).await,
            },
        };

        match result.status {
            ResultStatus::Error => {
                error!(outcome = ?result.outcome, message = ?result.message, "signal failed")
            }
            _ => info!(outcome = ?result.outcome, orders = result.orders.len(), "signal handled"),
        }
        result
    }

    /// Resolve or fail with `ResolutionError::NotFound`
    async fn resolve(&self, user_symbol: &str) -> Result<CanonicalSymbol> {
        self.resolver
            .resolve(user_symbol)
            .await?
            .ok_or_else(|| ResolutionError::NotFound(user_symbol.trim().to_string()).into())
    }

    async fn handle_entry(&self, signal: &Signal, side: PositionSide) -> SignalResult {
        let symbol = match self.resolve(&signal.symbol).await {
            Ok(symbol) => symbol,
            Err(e) => return SignalResult::from_error(signal, &e),
        };

        let size = self.trading.size_for(&normalize_symbol(&signal.symbol));
        match self
            .executor
            .open(&symbol, side.opening_direction(), size)
            .await
        {
            Ok(ack) => SignalResult::opened(signal, ack),
            Err(e) => SignalResult::from_error(signal, &e).with_canonical(Some(symbol.to_string())),
        }
    }

    async fn handle_exit(&self, signal: &Signal, kind: SignalKind) -> SignalResult {
        let symbol = match self.resolve(&signal.symbol).await {
            Ok(symbol) => symbol,
            Err(e) => return SignalResult::from_error(signal, &e),
        };
        let canonical = Some(symbol.to_string());

        let positions = match self.inspector.get_position(&symbol).await {
            Ok(positions) => positions,
            Err(e) => return SignalResult::from_error(signal, &e).with_canonical(canonical),
        };

        let targets: Vec<Position> = kind
            .exit_sides()
            .iter()
            .filter_map(|side| positions.side(*side))
            .filter(|p| p.is_open())
            .cloned()
            .collect();

        if targets.is_empty() {
            info!("No open {} position on {}", sides_label(kind), symbol);
            return SignalResult::no_position(signal, symbol.to_string());
        }

        // Close every targeted side even if one fails, then report
        let mut acks = Vec::with_capacity(targets.len());
        let mut first_error: Option<GatewayError> = None;
        for position in targets {
            match self
                .executor
                .close(&symbol, position.side, position.available_size)
                .await
            {
                Ok(ack) => acks.push(ack),
                Err(e) => {
                    warn!(side = %position.side, "close failed: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            None => SignalResult::closed(signal, symbol.to_string(), acks),
            Some(e) => SignalResult::from_error(signal, &e)
                .with_canonical(canonical)
                .with_orders(acks),
        }
    }

    async fn handle_list(&self, signal: &Signal) -> SignalResult {
        if signal.symbol.trim().is_empty() {
            return match self.inspector.list_positions().await {
                Ok(sets) => SignalResult::positions(signal, None, sets),
                Err(e) => SignalResult::from_error(signal, &e),
            };
        }

        let symbol = match self.resolve(&signal.symbol).await {
            Ok(symbol) => symbol,
            Err(e) => return SignalResult::from_error(signal, &e),
        };
        match self.inspector.get_position(&symbol).await {
            Ok(set) => SignalResult::positions(signal, Some(symbol.to_string()), vec![set]),
            Err(e) => SignalResult::from_error(signal, &e).with_canonical(Some(symbol.to_string())),
        }
    }
}

fn sides_label(kind: SignalKind) -> &'static str {
    match kind.exit_sides() {
        [PositionSide::Long] => "long",
        [PositionSide::Short] => "short",
        _ => "long or short",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::traits::{HttpMethod, MockVenueTransport, VenueRequest};
    use crate::common::types::Direction;
    use crate::config::types::VenueEnvironment;
    use crate::gateway::signal::{Outcome, ResultStatus};
    use crate::venue::profile::VenueProfile;
    use mockall::Sequence;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use std::sync::Arc;

    const CONTRACTS: &str = "/api/mix/v1/market/contracts";
    const POSITION: &str = "/api/mix/v1/position/singlePosition-v2";
    const ORDER: &str = "/api/mix/v1/order/placeOrder";

    fn is(path: &'static str) -> impl Fn(&VenueRequest) -> bool {
        move |r| r.path == path
    }

    fn contracts() -> Value {
        json!([
            {"symbol": "BTCUSDT_UMCBL", "baseCoin": "BTC", "quoteCoin": "USDT", "symbolName": "BTCUSDT"},
            {"symbol": "SOLUSDT_UMCBL", "baseCoin": "SOL", "quoteCoin": "USDT", "symbolName": "SOLUSDT"}
        ])
    }

    fn base_mock() -> MockVenueTransport {
        let mut mock = MockVenueTransport::new();
        mock.expect_profile()
            .return_const(VenueProfile::mix_v1(VenueEnvironment::Live));
        mock
    }

    fn router(mock: MockVenueTransport) -> SignalRouter {
        let mut trading = TradingConfig::default();
        trading.order_sizes.insert("SOLUSDT".into(), dec!(3));
        SignalRouter::new(Arc::new(mock), trading)
    }

    #[tokio::test]
    async fn test_entry_long_opens_resolved_symbol() {
        let mut mock = base_mock();
        mock.expect_call()
            .withf(is(CONTRACTS))
            .times(1)
            .returning(|_| Ok(contracts()));
        mock.expect_call()
            .withf(is(POSITION))
            .never();
        mock.expect_call()
            .withf(|r| {
                let body = r.body.as_ref().unwrap();
                r.path == ORDER
                    && body["symbol"] == "SOLUSDT_UMCBL"
                    && body["side"] == "open_long"
                    && body["size"] == "3"
            })
            .times(1)
            .returning(|_| Ok(json!({"orderId": "1"})));

        let result = router(mock).handle(&Signal::new("ENTRY_LONG", "SOLUSDT")).await;

        assert_eq!(result.outcome, Outcome::Opened);
        assert_eq!(result.canonical_symbol.as_deref(), Some("SOLUSDT_UMCBL"));
        assert_eq!(result.orders[0].direction, Direction::OpenLong);
    }

    #[tokio::test]
    async fn test_entry_short_uses_default_size() {
        let mut mock = base_mock();
        mock.expect_call()
            .withf(is(CONTRACTS))
            .returning(|_| Ok(contracts()));
        mock.expect_call()
            .withf(|r| {
                let body = r.body.as_ref().unwrap();
                r.path == ORDER && body["side"] == "open_short" && body["size"] == "1"
            })
            .times(1)
            .returning(|_| Ok(json!({"orderId": "2"})));

        let result = router(mock).handle(&Signal::new("entry_short", "BTCUSDT")).await;
        assert_eq!(result.status, ResultStatus::Ok);
    }

    #[tokio::test]
    async fn test_exit_closes_only_sides_with_size() {
        let mut mock = base_mock();
        mock.expect_call()
            .withf(is(CONTRACTS))
            .returning(|_| Ok(contracts()));
        mock.expect_call()
            .withf(is(POSITION))
            .times(1)
            .returning(|_| {
                Ok(json!([
                    {"symbol": "SOLUSDT_UMCBL", "holdSide": "long", "available": "2.5"},
                    {"symbol": "SOLUSDT_UMCBL", "holdSide": "short", "available": "0"}
                ]))
            });
        mock.expect_call()
            .withf(|r| {
                let body = r.body.as_ref().unwrap();
                r.path == ORDER && body["side"] == "close_long" && body["size"] == "2.5"
            })
            .times(1)
            .returning(|_| Ok(json!({"orderId": "3"})));
        mock.expect_call()
            .withf(|r| r.path == ORDER && r.body.as_ref().unwrap()["side"] == "close_short")
            .never();

        let result = router(mock).handle(&Signal::new("EXIT_CONFIRMED", "SOLUSDT")).await;

        assert_eq!(result.outcome, Outcome::Closed);
        assert_eq!(result.orders.len(), 1);
        assert_eq!(result.orders[0].size, dec!(2.5));
    }

    #[tokio::test]
    async fn test_exit_on_flat_symbol_is_no_position() {
        let mut mock = base_mock();
        mock.expect_call()
            .withf(is(CONTRACTS))
            .returning(|_| Ok(contracts()));
        mock.expect_call()
            .withf(is(POSITION))
            .returning(|_| {
                Ok(json!([
                    {"holdSide": "long", "available": "0"},
                    {"holdSide": "short", "available": "0"}
                ]))
            });
        mock.expect_call().withf(is(ORDER)).never();

        let result = router(mock).handle(&Signal::new("EXIT_CONFIRMED", "SOLUSDT")).await;

        assert_eq!(result.status, ResultStatus::NoPosition);
        assert_eq!(result.http_status(), 200);
        assert!(result.orders.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_exit_yields_no_position() {
        let mut seq = Sequence::new();
        let mut mock = base_mock();
        mock.expect_call()
            .withf(is(CONTRACTS))
            .returning(|_| Ok(contracts()));
        mock.expect_call()
            .withf(is(POSITION))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(json!([{"holdSide": "short", "available": "1"}])));
        mock.expect_call()
            .withf(is(ORDER))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(json!({"orderId": "4"})));
        mock.expect_call()
            .withf(is(POSITION))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(json!([])));

        let router = router(mock);
        let signal = Signal::new("EXIT_CONFIRMED", "SOLUSDT");

        assert_eq!(router.handle(&signal).await.outcome, Outcome::Closed);
        assert_eq!(router.handle(&signal).await.outcome, Outcome::NoPosition);
    }

    #[tokio::test]
    async fn test_side_specific_exit_leaves_other_side() {
        let mut mock = base_mock();
        mock.expect_call()
            .withf(is(CONTRACTS))
            .returning(|_| Ok(contracts()));
        mock.expect_call()
            .withf(is(POSITION))
            .returning(|_| {
                Ok(json!({
                    "long": {"available": "1"},
                    "short": {"available": "2"}
                }))
            });
        mock.expect_call()
            .withf(|r| r.path == ORDER && r.body.as_ref().unwrap()["side"] == "close_short")
            .times(1)
            .returning(|_| Ok(json!({"orderId": "5"})));

        let result = router(mock).handle(&Signal::new("EXIT_SHORT_SL", "SOLUSDT")).await;
        assert_eq!(result.orders.len(), 1);
        assert_eq!(result.orders[0].direction, Direction::CloseShort);
    }

    #[tokio::test]
    async fn test_unresolvable_symbol_rejected_without_downstream_calls() {
        let mut mock = base_mock();
        mock.expect_call()
            .withf(is(CONTRACTS))
            .times(1)
            .returning(|_| Ok(contracts()));
        mock.expect_call()
            .withf(|r| r.path != CONTRACTS)
            .never();

        let result = router(mock).handle(&Signal::new("EXIT_CONFIRMED", "XYZ")).await;

        assert_eq!(result.outcome, Outcome::Rejected);
        assert_eq!(result.http_status(), 400);
        assert_eq!(result.error_kind.as_deref(), Some("resolution"));
    }

    #[tokio::test]
    async fn test_ambiguous_symbol_rejected_without_downstream_calls() {
        let mut mock = base_mock();
        mock.expect_call()
            .withf(is(CONTRACTS))
            .times(1)
            .returning(|_| {
                Ok(json!([
                    {"symbol": "SOLUSDT_UMCBL", "symbolName": "SOLUSDT"},
                    {"symbol": "SOLUSDTPERP_UMCBL", "symbolName": "SOLUSDTPERP"}
                ]))
            });
        mock.expect_call()
            .withf(|r| r.path != CONTRACTS)
            .never();

        let result = router(mock).handle(&Signal::new("ENTRY_LONG", "SOL")).await;

        assert_eq!(result.outcome, Outcome::Rejected);
        assert_eq!(result.http_status(), 400);
        assert_eq!(result.error_kind.as_deref(), Some("resolution"));
        assert!(result.message.as_deref().is_some_and(|m| m.contains("ambiguous")));
    }

    #[tokio::test]
    async fn test_unknown_signal_rejected() {
        let mut mock = base_mock();
        mock.expect_call().never();

        let result = router(mock).handle(&Signal::new("MOON", "SOLUSDT")).await;

        assert_eq!(result.status, ResultStatus::Error);
        assert_eq!(result.outcome, Outcome::Rejected);
        assert_eq!(result.error_kind.as_deref(), Some("unknown_signal"));
    }

    #[tokio::test]
    async fn test_partial_exit_failure_reports_error_with_acks() {
        let mut mock = base_mock();
        mock.expect_call()
            .withf(is(CONTRACTS))
            .returning(|_| Ok(contracts()));
        mock.expect_call()
            .withf(is(POSITION))
            .returning(|_| {
                Ok(json!([
                    {"holdSide": "long", "available": "1"},
                    {"holdSide": "short", "available": "1"}
                ]))
            });
        mock.expect_call()
            .withf(|r| r.path == ORDER && r.body.as_ref().unwrap()["side"] == "close_long")
            .times(1)
            .returning(|_| Ok(json!({"orderId": "6"})));
        mock.expect_call()
            .withf(|r| r.path == ORDER && r.body.as_ref().unwrap()["side"] == "close_short")
            .times(1)
            .returning(|_| Err(GatewayError::Timeout("order".into())));

        let result = router(mock).handle(&Signal::new("EXIT_CONFIRMED", "SOLUSDT")).await;

        assert_eq!(result.outcome, Outcome::Failed);
        assert_eq!(result.http_status(), 500);
        assert_eq!(result.orders.len(), 1);
    }

    #[tokio::test]
    async fn test_list_positions_is_read_only() {
        let mut mock = base_mock();
        mock.expect_call()
            .withf(|r| r.path == "/api/mix/v1/position/allPosition-v2")
            .times(1)
            .returning(|_| {
                Ok(json!([
                    {"symbol": "SOLUSDT_UMCBL", "holdSide": "long", "available": "2"}
                ]))
            });
        mock.expect_call()
            .withf(|r| r.method == HttpMethod::Post)
            .never();

        let result = router(mock).handle(&Signal::new("LIST_POSITIONS", "")).await;

        assert_eq!(result.outcome, Outcome::Positions);
        assert_eq!(result.positions.len(), 1);
    }
}
