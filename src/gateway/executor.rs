//! Order submission

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::common::errors::{GatewayError, Result};
use crate::common::traits::SharedTransport;
use crate::common::types::{CanonicalSymbol, Direction, OrderAck, OrderRequest, PositionSide};
use crate::venue::messages::PlaceOrderData;

/// Build the order that closes `side`.
///
/// A long is closed by selling and a short by buying; the request is
/// always reduce-only. Zero or negative sizes are refused.
pub fn close_order(symbol: &CanonicalSymbol, side: PositionSide, size: Decimal) -> Result<OrderRequest> {
    build_order(symbol, side.closing_direction(), size)
}

/// Build a market order, refusing sizes that would be a no-op or invalid
pub fn build_order(symbol: &CanonicalSymbol, direction: Direction, size: Decimal) -> Result<OrderRequest> {
    if size <= Decimal::ZERO {
        return Err(GatewayError::InvalidOrder(format!(
            "{} {} with size {}",
            direction, symbol, size
        )));
    }
    if symbol.as_str().trim().is_empty() {
        return Err(GatewayError::InvalidOrder(format!("{} without symbol", direction)));
    }
    Ok(OrderRequest::market(symbol.clone(), direction, size))
}

/// Submits market orders and interprets the venue's answer
pub struct OrderExecutor {
    transport: SharedTransport,
}

impl OrderExecutor {
    pub fn new(transport: SharedTransport) -> Self {
        Self { transport }
    }

    /// Open a position on the side `direction` names
    #[instrument(skip(self, symbol), fields(symbol = %symbol))]
    pub async fn open(
        &self,
        symbol: &CanonicalSymbol,
        direction: Direction,
        size: Decimal,
    ) -> Result<OrderAck> {
        if direction.is_close() {
            return Err(GatewayError::InvalidOrder(format!(
                "{} is not an opening direction",
                direction
            )));
        }
        let order = build_order(symbol, direction, size)?;
        self.submit(order).await
    }

    /// Close `size` of the position held on `side`
    #[instrument(skip(self, symbol), fields(symbol = %symbol))]
    pub async fn close(
        &self,
        symbol: &CanonicalSymbol,
        side: PositionSide,
        size: Decimal,
    ) -> Result<OrderAck> {
        let order = close_order(symbol, side, size)?;
        self.submit(order).await
    }

    /// Send an order. Never retried: a duplicate is a real trade.
    pub async fn submit(&self, order: OrderRequest) -> Result<OrderAck> {
        let request = self.transport.profile().place_order_request(&order);

        let data = match self.transport.call(request).await {
            Ok(data) => data,
            Err(e) => {
                warn!(direction = %order.direction, size = %order.size, error = %e, "order failed");
                return Err(e);
            }
        };

        // Acceptance is settled by the envelope code; the ack is informational
        let placed: PlaceOrderData = if data.is_null() {
            PlaceOrderData::default()
        } else {
            serde_json::from_value(data.clone()).unwrap_or_else(|e| {
                warn!(error = %e, ack = %data, "unrecognized order ack");
                PlaceOrderData::default()
            })
        };

        info!(
            direction = %order.direction,
            size = %order.size,
            order_id = ?placed.order_id,
            "order accepted"
        );

        Ok(OrderAck {
            symbol: order.symbol,
            direction: order.direction,
            size: order.size,
            order_id: placed.order_id,
            client_order_id: placed.client_oid,
        })
    }
}
