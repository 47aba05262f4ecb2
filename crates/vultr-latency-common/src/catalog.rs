//! Region to exchange endpoint catalog
//!
//! The catalog is an immutable table built once at startup and handed to the
//! components that need it. Each region lists the centralized (CEX) and
//! decentralized (DEX) exchange APIs that are measured from that region.

use std::collections::BTreeMap;

use thiserror::Error;

/// Exchange category
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Category {
    /// Centralized exchange
    #[strum(serialize = "CEX")]
    Cex,
    /// Decentralized exchange
    #[strum(serialize = "DEX")]
    Dex,
}

/// A named latency target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub name: String,
    pub url: String,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// One deployable region and the exchanges measured from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionEntry {
    /// Provider region code (e.g., "nrt")
    pub code: String,
    /// Human readable name (e.g., "Tokyo")
    pub name: String,
    /// Centralized exchange endpoints
    pub cex: Vec<Endpoint>,
    /// Decentralized exchange endpoints
    pub dex: Vec<Endpoint>,
}

impl RegionEntry {
    /// Merge CEX and DEX endpoints into the `name -> url` mapping sent to the probe.
    ///
    /// A DEX entry with the same name as a CEX entry replaces its URL.
    pub fn endpoint_map(&self) -> BTreeMap<String, String> {
        self.cex
            .iter()
            .chain(self.dex.iter())
            .map(|e| (e.name.clone(), e.url.clone()))
            .collect()
    }

    /// Category of an exchange in this region. CEX wins when a name is in both lists.
    pub fn category_of(&self, exchange: &str) -> Option<Category> {
        if self.cex.iter().any(|e| e.name == exchange) {
            Some(Category::Cex)
        } else if self.dex.iter().any(|e| e.name == exchange) {
            Some(Category::Dex)
        } else {
            None
        }
    }
}

/// Catalog lookup errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Unknown region code '{0}' (known: {1})")]
    UnknownRegion(String, String),

    #[error("No regions selected")]
    Empty,
}

/// Immutable region table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    regions: Vec<RegionEntry>,
}

impl Catalog {
    pub fn new(regions: Vec<RegionEntry>) -> Self {
        Self { regions }
    }

    /// Regions in deployment order
    pub fn regions(&self) -> &[RegionEntry] {
        &self.regions
    }

    pub fn get(&self, code: &str) -> Option<&RegionEntry> {
        self.regions.iter().find(|r| r.code == code)
    }

    pub fn codes(&self) -> Vec<&str> {
        self.regions.iter().map(|r| r.code.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Restrict the catalog to the given codes, keeping catalog order.
    pub fn select(&self, codes: &[String]) -> Result<Catalog, CatalogError> {
        if codes.is_empty() {
            return Err(CatalogError::Empty);
        }
        for code in codes {
            if self.get(code).is_none() {
                return Err(CatalogError::UnknownRegion(
                    code.clone(),
                    self.codes().join(", "),
                ));
            }
        }
        Ok(Catalog::new(
            self.regions
                .iter()
                .filter(|r| codes.iter().any(|c| c == &r.code))
                .cloned()
                .collect(),
        ))
    }

    /// The built-in measurement catalog
    pub fn default_catalog() -> Self {
        fn to_endpoints(list: &[(&str, &str)]) -> Vec<Endpoint> {
            list.iter()
                .map(|(name, url)| Endpoint::new(*name, *url))
                .collect()
        }

        fn region(code: &str, name: &str, cex: &[(&str, &str)], dex: &[(&str, &str)]) -> RegionEntry {
            RegionEntry {
                code: code.to_string(),
                name: name.to_string(),
                cex: to_endpoints(cex),
                dex: to_endpoints(dex),
            }
        }

        const UNISWAP: &str = "https://api.thegraph.com/subgraphs/name/uniswap/uniswap-v3";
        const KRAKEN: &str = "https://api.kraken.com/0/public/Time";

        Self::new(vec![
            region(
                "nrt",
                "Tokyo",
                &[
                    ("binance", "https://api.binance.com/api/v3/ping"),
                    ("okx", "https://www.okx.com/api/v5/public/time"),
                    ("bitflyer", "https://api.bitflyer.com/v1/getmarkets"),
                    ("gmo", "https://api.coin.z.com/public/v1/status"),
                ],
                &[("sushiswap", "https://api.sushi.com/"), ("uniswap", UNISWAP)],
            ),
            region(
                "sgp",
                "Singapore",
                &[
                    ("bybit", "https://api.bybit.com/v5/market/time"),
                    ("kucoin", "https://api.kucoin.com/api/v1/timestamp"),
                    ("crypto.com", "https://api.crypto.com/v2/public/get-ticker"),
                    ("huobi", "https://api.huobi.pro/v1/common/timestamp"),
                ],
                &[
                    (
                        "pancakeswap",
                        "https://api.thegraph.com/subgraphs/name/pancakeswap/exchange",
                    ),
                    ("dydx", "https://api.dydx.exchange/v3/candles/BTC-USD"),
                ],
            ),
            region(
                "fra",
                "Frankfurt",
                &[
                    ("kraken", KRAKEN),
                    ("bitstamp", "https://www.bitstamp.net/api/v2/ticker/btcusd/"),
                    ("bitfinex", "https://api-pub.bitfinex.com/v2/platform/status"),
                ],
                &[
                    ("uniswap", UNISWAP),
                    ("curve", "https://api.curve.fi/api/getPools"),
                ],
            ),
            region(
                "ewr",
                "New York",
                &[
                    ("coinbase", "https://api.coinbase.com/v2/time"),
                    ("gemini", "https://api.gemini.com/v1/pubticker/btcusd"),
                    ("kraken", KRAKEN),
                ],
                &[("uniswap", UNISWAP)],
            ),
            region(
                "icn",
                "Seoul",
                &[
                    ("upbit", "https://api.upbit.com/v1/ticker?markets=KRW-BTC"),
                    ("bithumb", "https://api.bithumb.com/public/ticker/BTC_KRW"),
                    (
                        "korbit",
                        "https://api.korbit.co.kr/v1/ticker?currency_pair=btc_krw",
                    ),
                ],
                &[("klayswap", "https://s.klayswap.com/stat/klayswapInfo.json")],
            ),
        ])
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::default_catalog()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_order() {
        let catalog = Catalog::default_catalog();
        assert_eq!(catalog.codes(), vec!["nrt", "sgp", "fra", "ewr", "icn"]);
        assert_eq!(catalog.get("ewr").unwrap().name, "New York");
    }

    #[test]
    fn test_endpoint_map_merges_categories() {
        let catalog = Catalog::default_catalog();
        let tokyo = catalog.get("nrt").unwrap();
        let map = tokyo.endpoint_map();
        assert_eq!(map.len(), 6);
        assert_eq!(map["binance"], "https://api.binance.com/api/v3/ping");
        assert!(map.contains_key("uniswap"));
    }

    #[test]
    fn test_category_of() {
        let catalog = Catalog::default_catalog();
        let fra = catalog.get("fra").unwrap();
        assert_eq!(fra.category_of("kraken"), Some(Category::Cex));
        assert_eq!(fra.category_of("curve"), Some(Category::Dex));
        assert_eq!(fra.category_of("binance"), None);
    }

    #[test]
    fn test_category_prefers_cex_on_name_clash() {
        let entry = RegionEntry {
            code: "x".into(),
            name: "X".into(),
            cex: vec![Endpoint::new("dup", "https://a")],
            dex: vec![Endpoint::new("dup", "https://b")],
        };
        assert_eq!(entry.category_of("dup"), Some(Category::Cex));
        assert_eq!(entry.endpoint_map()["dup"], "https://b");
        assert_eq!(entry.endpoint_map().len(), 1);
    }

    #[test]
    fn test_select_keeps_catalog_order() {
        let catalog = Catalog::default_catalog();
        let selected = catalog
            .select(&["icn".to_string(), "nrt".to_string()])
            .unwrap();
        assert_eq!(selected.codes(), vec!["nrt", "icn"]);
    }

    #[test]
    fn test_select_rejects_unknown() {
        let catalog = Catalog::default_catalog();
        let err = catalog.select(&["lax".to_string()]).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownRegion(ref c, _) if c == "lax"));
        assert_eq!(catalog.select(&[]).unwrap_err(), CatalogError::Empty);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(Category::Cex.to_string(), "CEX");
        assert_eq!("dex".parse::<Category>().unwrap(), Category::Dex);
    }
}
