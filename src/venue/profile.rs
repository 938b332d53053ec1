//! Per-venue conventions: endpoints, signing quirks and order encoding

use rust_decimal::Decimal;
use serde_json::{json, Value};

use super::auth::SignatureEncoding;
use crate::common::traits::VenueRequest;
use crate::common::types::{CanonicalSymbol, OrderRequest};
use crate::config::types::VenueEnvironment;

const DEFAULT_BASE_URL: &str = "https://api.bitget.com";

/// Whether the query string is part of the signed path for GET requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerySigning {
    /// Sign `path?query`, exactly as sent
    IncludeQuery,
    /// Sign the bare path even when a query string is sent
    PathOnly,
}

/// How open/close intent is expressed in an order body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStyle {
    /// `side` carries the full intent (`open_long`, `close_short`, ...)
    Directional,
    /// `side` is buy/sell, `tradeSide` is open/close, closes add `reduceOnly`
    SideWithTradeSide,
}

/// REST paths for the three endpoint families
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub contracts: String,
    pub single_position: String,
    pub all_positions: String,
    pub place_order: String,
}

/// Everything that differs between venue API generations.
#[derive(Debug, Clone, PartialEq)]
pub struct VenueProfile {
    pub name: String,
    pub base_url: String,
    pub signature_encoding: SignatureEncoding,
    pub query_signing: QuerySigning,
    /// Embedded `code` of a successful response
    pub success_code: String,
    /// Embedded codes that mean the signature, key or timestamp was rejected
    pub auth_error_codes: Vec<String>,
    pub endpoints: Endpoints,
    pub product_type: String,
    pub margin_coin: String,
    pub order_style: OrderStyle,
    /// Position queries also carry `productType`
    pub scope_positions_by_product: bool,
    /// Sent on every request (e.g. paper trading flag)
    pub extra_headers: Vec<(String, String)>,
}

fn auth_codes() -> Vec<String> {
    [
        "40001", "40002", "40003", "40004", "40005", "40006", "40008", "40009", "40011",
        "40012", "40037",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

fn demo_headers(environment: VenueEnvironment) -> Vec<(String, String)> {
    match environment {
        VenueEnvironment::Live => Vec::new(),
        VenueEnvironment::Demo => vec![("paptrading".to_string(), "1".to_string())],
    }
}

impl VenueProfile {
    /// Mix (futures) API v1: symbols carry a product suffix (`SOLUSDT_UMCBL`)
    pub fn mix_v1(environment: VenueEnvironment) -> Self {
        Self {
            name: "bitget-mix-v1".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            signature_encoding: SignatureEncoding::Base64,
            query_signing: QuerySigning::IncludeQuery,
            success_code: "00000".to_string(),
            auth_error_codes: auth_codes(),
            endpoints: Endpoints {
                contracts: "/api/mix/v1/market/contracts".to_string(),
                single_position: "/api/mix/v1/position/singlePosition-v2".to_string(),
                all_positions: "/api/mix/v1/position/allPosition-v2".to_string(),
                place_order: "/api/mix/v1/order/placeOrder".to_string(),
            },
            product_type: match environment {
                VenueEnvironment::Live => "umcbl",
                VenueEnvironment::Demo => "sumcbl",
            }
            .to_string(),
            margin_coin: "USDT".to_string(),
            order_style: OrderStyle::Directional,
            scope_positions_by_product: false,
            extra_headers: demo_headers(environment),
        }
    }

    /// Mix API v2: plain symbols, product type passed explicitly
    pub fn mix_v2(environment: VenueEnvironment) -> Self {
        Self {
            name: "bitget-mix-v2".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            signature_encoding: SignatureEncoding::Base64,
            query_signing: QuerySigning::IncludeQuery,
            success_code: "00000".to_string(),
            auth_error_codes: auth_codes(),
            endpoints: Endpoints {
                contracts: "/api/v2/mix/market/contracts".to_string(),
                single_position: "/api/v2/mix/position/single-position".to_string(),
                all_positions: "/api/v2/mix/position/all-position".to_string(),
                place_order: "/api/v2/mix/order/place-order".to_string(),
            },
            product_type: match environment {
                VenueEnvironment::Live => "USDT-FUTURES",
                VenueEnvironment::Demo => "SUSDT-FUTURES",
            }
            .to_string(),
            margin_coin: "USDT".to_string(),
            order_style: OrderStyle::SideWithTradeSide,
            scope_positions_by_product: true,
            extra_headers: demo_headers(environment),
        }
    }

    /// Point the profile at another host (mock servers, proxies)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn is_auth_error(&self, code: &str) -> bool {
        self.auth_error_codes.iter().any(|c| c == code)
    }

    /// Contract listing for the configured product type
    pub fn contracts_request(&self) -> VenueRequest {
        VenueRequest::get(self.endpoints.contracts.clone())
            .with_query("productType", self.product_type.clone())
    }

    /// Positions held on one symbol
    pub fn single_position_request(&self, symbol: &CanonicalSymbol) -> VenueRequest {
        let request = VenueRequest::get(self.endpoints.single_position.clone())
            .with_query("symbol", symbol.as_str());
        let request = if self.scope_positions_by_product {
            request.with_query("productType", self.product_type.clone())
        } else {
            request
        };
        request.with_query("marginCoin", self.margin_coin.clone())
    }

    /// Every open position for the product type
    pub fn all_positions_request(&self) -> VenueRequest {
        VenueRequest::get(self.endpoints.all_positions.clone())
            .with_query("productType", self.product_type.clone())
            .with_query("marginCoin", self.margin_coin.clone())
    }

    /// Market order submission
    pub fn place_order_request(&self, order: &OrderRequest) -> VenueRequest {
        VenueRequest::post(self.endpoints.place_order.clone(), self.order_body(order))
    }

    /// Encode an order as this venue's request body
    pub fn order_body(&self, order: &OrderRequest) -> Value {
        let size = format_size(order.size);
        match self.order_style {
            OrderStyle::Directional => json!({
                "symbol": order.symbol.as_str(),
                "marginCoin": self.margin_coin,
                "size": size,
                "side": order.direction.as_str(),
                "orderType": "market",
            }),
            OrderStyle::SideWithTradeSide => {
                let mut body = json!({
                    "symbol": order.symbol.as_str(),
                    "productType": self.product_type,
                    "marginMode": "crossed",
                    "marginCoin": self.margin_coin,
                    "size": size,
                    "side": order.direction.order_side().to_string(),
                    "tradeSide": if order.reduce_only() { "close" } else { "open" },
                    "orderType": "market",
                });
                if order.reduce_only() {
                    body["reduceOnly"] = json!("YES");
                }
                body
            }
        }
    }
}

/// Sizes go over the wire as plain decimal strings without trailing zeros
fn format_size(size: Decimal) -> String {
    size.normalize().to_string()
}
