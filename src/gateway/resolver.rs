//! Maps user-facing instrument names to the venue's listed contracts.
//!
//! Matching order, first hit wins:
//!
//! 1. exact canonical symbol (`SOLUSDT_UMCBL`)
//! 2. exact base symbol or `baseCoin + quoteCoin` (`SOLUSDT`)
//! 3. longest prefix overlap between the input and a contract's base symbol
//!
//! A step that yields more than one contract is an error, never a guess.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::common::errors::{GatewayError, ResolutionError, Result};
use crate::common::traits::SharedTransport;
use crate::common::types::CanonicalSymbol;
use crate::venue::messages::ContractInfo;

/// Contract list snapshot with its fetch time
type Snapshot = (Instant, Arc<Vec<ContractInfo>>);

/// Resolves symbols against a fresh (or briefly cached) contract list
pub struct SymbolResolver {
    transport: SharedTransport,
    cache_ttl: Option<Duration>,
    cache: RwLock<Option<Snapshot>>,
}

impl SymbolResolver {
    /// Resolver that fetches the contract list on every call
    pub fn new(transport: SharedTransport) -> Self {
        Self {
            transport,
            cache_ttl: None,
            cache: RwLock::new(None),
        }
    }

    /// Reuse a fetched contract list for up to `ttl`
    pub fn with_cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.cache_ttl = ttl.filter(|t| !t.is_zero());
        self
    }

    /// Resolve a user symbol.
    ///
    /// `Ok(None)` when nothing matches, `Err(Resolution(Ambiguous))` when
    /// several contracts match equally well.
    #[instrument(skip(self))]
    pub async fn resolve(&self, user_symbol: &str) -> Result<Option<CanonicalSymbol>> {
        let contracts = self.contracts().await?;
        let resolved = match_symbol(user_symbol, &contracts)?;

        match &resolved {
            Some(symbol) => debug!("Resolved {} to {}", user_symbol, symbol),
            None => info!("No listed contract for {}", user_symbol),
        }
        Ok(resolved)
    }

    /// Current contract list, served from cache while fresh
    pub async fn contracts(&self) -> Result<Arc<Vec<ContractInfo>>> {
        if let Some(ttl) = self.cache_ttl {
            if let Some((fetched_at, contracts)) = self.cache.read().await.as_ref() {
                if fetched_at.elapsed() < ttl {
                    return Ok(Arc::clone(contracts));
                }
            }
        }

        let contracts = Arc::new(self.fetch_contracts().await?);

        if self.cache_ttl.is_some() {
            *self.cache.write().await = Some((Instant::now(), Arc::clone(&contracts)));
        }
        Ok(contracts)
    }

    async fn fetch_contracts(&self) -> Result<Vec<ContractInfo>> {
        let request = self.transport.profile().contracts_request();
        let data = self.transport.call(request).await?;
        if !data.is_array() {
            return Err(GatewayError::InvalidResponse(format!(
                "contract list is not an array: {}",
                data
            )));
        }

        let contracts: Vec<ContractInfo> = serde_json::from_value(data)?;
        debug!("Fetched {} contracts", contracts.len());
        Ok(contracts)
    }
}

/// Strip exchange prefixes, perpetual markers and separators, uppercase.
///
/// `BINANCE:SOLUSDT.P`, `sol/usdt` and `SOL-USDT` all become `SOLUSDT`.
pub fn normalize_symbol(raw: &str) -> String {
    let raw = raw.trim();
    let raw = raw.rsplit_once(':').map(|(_, s)| s).unwrap_or(raw);
    let upper = raw.to_uppercase();
    let upper = upper.strip_suffix(".P").unwrap_or(upper.as_str());
    upper
        .chars()
        .filter(|c| !matches!(c, '/' | '-' | ' '))
        .collect()
}

/// Pick the single contract matching `user_symbol`
pub fn match_symbol(
    user_symbol: &str,
    contracts: &[ContractInfo],
) -> std::result::Result<Option<CanonicalSymbol>, ResolutionError> {
    let wanted = normalize_symbol(user_symbol);
    if wanted.is_empty() {
        return Ok(None);
    }

    let exact: Vec<&ContractInfo> = contracts
        .iter()
        .filter(|c| c.symbol.eq_ignore_ascii_case(&wanted))
        .collect();
    if let Some(found) = single(&wanted, exact)? {
        return Ok(Some(found));
    }

    let by_key: Vec<&ContractInfo> = contracts
        .iter()
        .filter(|c| {
            c.base_symbol().eq_ignore_ascii_case(&wanted)
                || c.pair().as_deref() == Some(wanted.as_str())
        })
        .collect();
    if let Some(found) = single(&wanted, by_key)? {
        return Ok(Some(found));
    }

    let mut best = 0usize;
    let mut by_prefix: Vec<&ContractInfo> = Vec::new();
    for contract in contracts {
        let key = contract.base_symbol().to_uppercase();
        let overlap = if key.starts_with(&wanted) {
            wanted.len()
        } else if wanted.starts_with(&key) {
            key.len()
        } else {
            continue;
        };
        if overlap == 0 {
            continue;
        }

        if overlap > best {
            best = overlap;
            by_prefix.clear();
        }
        if overlap == best {
            by_prefix.push(contract);
        }
    }
    single(&wanted, by_prefix)
}

/// One distinct symbol, nothing, or an ambiguity error
fn single(
    wanted: &str,
    candidates: Vec<&ContractInfo>,
) -> std::result::Result<Option<CanonicalSymbol>, ResolutionError> {
    let mut symbols: Vec<String> = candidates.into_iter().map(|c| c.symbol.clone()).collect();
    symbols.sort();
    symbols.dedup();

    match symbols.len() {
        0 => Ok(None),
        1 => Ok(symbols.pop().map(CanonicalSymbol::new)),
        _ => Err(ResolutionError::Ambiguous {
            symbol: wanted.to_string(),
            candidates: symbols,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::traits::MockVenueTransport;
    use crate::config::types::VenueEnvironment;
    use crate::venue::profile::VenueProfile;
    use serde_json::json;

    fn contract(symbol: &str) -> ContractInfo {
        ContractInfo {
            symbol: symbol.to_string(),
            base_coin: None,
            quote_coin: None,
            symbol_name: None,
        }
    }

    fn listed() -> Vec<ContractInfo> {
        vec![
            contract("BTCUSDT_UMCBL"),
            contract("SOLUSDT_UMCBL"),
            contract("ETHUSDT_UMCBL"),
        ]
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol("BINANCE:SOLUSDT.P"), "SOLUSDT");
        assert_eq!(normalize_symbol(" sol/usdt "), "SOLUSDT");
        assert_eq!(normalize_symbol("SOL-USDT"), "SOLUSDT");
        assert_eq!(normalize_symbol("solusdt_umcbl"), "SOLUSDT_UMCBL");
    }

    #[test]
    fn test_base_symbol_match() {
        let resolved = match_symbol("SOLUSDT", &listed()).unwrap();
        assert_eq!(resolved, Some(CanonicalSymbol::new("SOLUSDT_UMCBL")));
    }

    #[test]
    fn test_exact_canonical_match() {
        let resolved = match_symbol("btcusdt_umcbl", &listed()).unwrap();
        assert_eq!(resolved, Some(CanonicalSymbol::new("BTCUSDT_UMCBL")));
    }

    #[test]
    fn test_exact_beats_prefix() {
        let contracts = vec![contract("SOLUSDT"), contract("SOLUSDTPERP")];
        let resolved = match_symbol("SOLUSDT", &contracts).unwrap();
        assert_eq!(resolved, Some(CanonicalSymbol::new("SOLUSDT")));
    }

    #[test]
    fn test_ambiguous_prefix_fails() {
        let contracts = vec![contract("SOLUSDT"), contract("SOLUSDTPERP")];
        let err = match_symbol("SOL", &contracts).unwrap_err();
        assert_eq!(
            err,
            ResolutionError::Ambiguous {
                symbol: "SOL".into(),
                candidates: vec!["SOLUSDT".into(), "SOLUSDTPERP".into()],
            }
        );
    }

    #[test]
    fn test_longest_prefix_wins() {
        let contracts = vec![contract("SOL_UMCBL"), contract("SOLUSDT_UMCBL")];
        let resolved = match_symbol("SOLUSDTPERP", &contracts).unwrap();
        assert_eq!(resolved, Some(CanonicalSymbol::new("SOLUSDT_UMCBL")));
    }

    #[test]
    fn test_empty_base_key_never_matches() {
        let contracts = vec![contract("_X"), contract("BTCUSDT_UMCBL")];
        assert_eq!(match_symbol("XYZ", &contracts).unwrap(), None);
    }

    #[test]
    fn test_unlisted_symbol() {
        assert_eq!(match_symbol("XYZ", &listed()).unwrap(), None);
        assert_eq!(match_symbol("   ", &listed()).unwrap(), None);
    }

    #[test]
    fn test_pair_match() {
        let contracts = vec![ContractInfo {
            symbol: "SOLPERP_X".into(),
            base_coin: Some("SOL".into()),
            quote_coin: Some("USDT".into()),
            symbol_name: Some("SOLPERP".into()),
        }];
        let resolved = match_symbol("SOL/USDT", &contracts).unwrap();
        assert_eq!(resolved, Some(CanonicalSymbol::new("SOLPERP_X")));
    }

    fn mock_with_contracts(times: usize) -> MockVenueTransport {
        let mut mock = MockVenueTransport::new();
        mock.expect_profile()
            .return_const(VenueProfile::mix_v1(VenueEnvironment::Live));
        mock.expect_call()
            .withf(|r| {
                r.path == "/api/mix/v1/market/contracts"
                    && r.query_value("productType") == Some("umcbl")
            })
            .times(times)
            .returning(|_| Ok(json!([{"symbol": "SOLUSDT_UMCBL", "baseCoin": "SOL", "quoteCoin": "USDT"}])));
        mock
    }

    #[tokio::test]
    async fn test_resolve_fetches_every_time_without_cache() {
        let resolver = SymbolResolver::new(Arc::new(mock_with_contracts(2)));
        assert!(resolver.resolve("SOLUSDT").await.unwrap().is_some());
        assert!(resolver.resolve("BTCUSDT").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_uses_cache_within_ttl() {
        let resolver = SymbolResolver::new(Arc::new(mock_with_contracts(1)))
            .with_cache_ttl(Some(Duration::from_secs(60)));
        assert!(resolver.resolve("SOLUSDT").await.unwrap().is_some());
        assert!(resolver.resolve("SOLUSDT").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cache_expires_after_ttl() {
        let resolver = SymbolResolver::new(Arc::new(mock_with_contracts(2)))
            .with_cache_ttl(Some(Duration::from_millis(1)));
        assert!(resolver.resolve("SOLUSDT").await.unwrap().is_some());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(resolver.resolve("SOLUSDT").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_non_array_contract_list_rejected() {
        let mut mock = MockVenueTransport::new();
        mock.expect_profile()
            .return_const(VenueProfile::mix_v1(VenueEnvironment::Live));
        mock.expect_call().returning(|_| Ok(json!({"unexpected": true})));

        let err = SymbolResolver::new(Arc::new(mock))
            .resolve("SOLUSDT")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResponse(_)));
    }
}
