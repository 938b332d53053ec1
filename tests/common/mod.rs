//! Common test utilities and fixtures

#![allow(dead_code)]

use serde_json::{json, Value};
use signal_gateway::config::types::{ApiCredentials, VenueEnvironment};
use signal_gateway::venue::auth::{sign_request, SignatureEncoding};
use signal_gateway::{VenueHttpClient, VenueProfile};
use wiremock::{Match, MockServer, Request, ResponseTemplate};

pub const API_KEY: &str = "test-key";
pub const API_SECRET: &str = "test-secret";
pub const PASSPHRASE: &str = "test-passphrase";

pub const CONTRACTS_PATH: &str = "/api/mix/v1/market/contracts";
pub const POSITION_PATH: &str = "/api/mix/v1/position/singlePosition-v2";
pub const ALL_POSITIONS_PATH: &str = "/api/mix/v1/position/allPosition-v2";
pub const ORDER_PATH: &str = "/api/mix/v1/order/placeOrder";

pub fn credentials() -> ApiCredentials {
    ApiCredentials::new(API_KEY.into(), API_SECRET.into(), PASSPHRASE.into())
}

/// v1 profile pointed at the mock server
pub fn profile(server: &MockServer, environment: VenueEnvironment) -> VenueProfile {
    VenueProfile::mix_v1(environment).with_base_url(&server.uri())
}

pub fn client(server: &MockServer) -> VenueHttpClient {
    VenueHttpClient::new(profile(server, VenueEnvironment::Live), credentials())
        .expect("Failed to create venue client")
}

/// Successful venue envelope around `data`
pub fn envelope(data: Value) -> Value {
    json!({
        "code": "00000",
        "msg": "success",
        "requestTime": 1704067200000i64,
        "data": data
    })
}

pub fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(envelope(data))
}

/// Failure envelope delivered with HTTP 200
pub fn embedded_error(code: &str, msg: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "code": code,
        "msg": msg,
        "requestTime": 1704067200000i64,
        "data": null
    }))
}

pub fn contracts() -> Value {
    json!([
        {"symbol": "BTCUSDT_UMCBL", "baseCoin": "BTC", "quoteCoin": "USDT", "symbolName": "BTCUSDT"},
        {"symbol": "ETHUSDT_UMCBL", "baseCoin": "ETH", "quoteCoin": "USDT", "symbolName": "ETHUSDT"},
        {"symbol": "SOLUSDT_UMCBL", "baseCoin": "SOL", "quoteCoin": "USDT", "symbolName": "SOLUSDT"}
    ])
}

pub fn position(side: &str, available: &str) -> Value {
    json!({
        "symbol": "SOLUSDT_UMCBL",
        "marginCoin": "USDT",
        "holdSide": side,
        "available": available,
        "total": available
    })
}

fn header<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|v| v.to_str().ok())
}

/// Recomputes `ACCESS-SIGN` from the request as received
pub struct ValidSignature {
    pub secret: String,
    pub include_query: bool,
}

impl ValidSignature {
    pub fn new() -> Self {
        Self {
            secret: API_SECRET.to_string(),
            include_query: true,
        }
    }

    pub fn path_only() -> Self {
        Self {
            include_query: false,
            ..Self::new()
        }
    }
}

impl Match for ValidSignature {
    fn matches(&self, request: &Request) -> bool {
        let (Some(signature), Some(timestamp)) = (
            header(request, "ACCESS-SIGN"),
            header(request, "ACCESS-TIMESTAMP"),
        ) else {
            return false;
        };
        let Ok(timestamp) = timestamp.parse::<i64>() else {
            return false;
        };
        if header(request, "ACCESS-KEY") != Some(API_KEY)
            || header(request, "ACCESS-PASSPHRASE") != Some(PASSPHRASE)
        {
            return false;
        }

        let mut request_path = request.url.path().to_string();
        if let Some(query) = request.url.query().filter(|_| self.include_query) {
            request_path = format!("{}?{}", request_path, query);
        }
        let Ok(body) = std::str::from_utf8(&request.body) else {
            return false;
        };

        match sign_request(
            &self.secret,
            timestamp,
            request.method.as_str(),
            &request_path,
            body,
            SignatureEncoding::Base64,
        ) {
            Ok(expected) => expected == signature,
            Err(_) => false,
        }
    }
}

/// Matches a JSON body field by exact value
pub struct BodyField(pub &'static str, pub Value);

impl Match for BodyField {
    fn matches(&self, request: &Request) -> bool {
        serde_json::from_slice::<Value>(&request.body)
            .map(|body| body.get(self.0) == Some(&self.1))
            .unwrap_or(false)
    }
}
