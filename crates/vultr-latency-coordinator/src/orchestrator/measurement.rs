//! Measurement records and the pure transformations over them
//!
//! One pass probes every ready region and yields one `Measurement` per
//! endpoint with a usable average. Records accumulate across passes in a flat
//! list; the pivot, ranking and per-region summary are computed from it.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};
use vultr_latency_common::{Catalog, Category, LatencyStats};

use super::prober::RemoteProbe;

/// One endpoint's average latency from one region in one pass
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Catalog region code
    pub region: String,
    /// Region display name
    pub region_name: String,
    pub exchange: String,
    pub category: Category,
    /// Average round-trip in milliseconds, rounded to 2 decimals
    pub latency_ms: f64,
    pub timestamp: DateTime<Utc>,
    /// 1-based pass number
    pub pass: u32,
}

/// Round to 2 decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Probe every ready region once, in catalog order.
///
/// `hosts` holds `(region code, ip)` pairs. Regions without a host are
/// skipped; a failed probe is logged and yields no records.
pub async fn run_pass<P: RemoteProbe>(
    prober: &P,
    catalog: &Catalog,
    hosts: &[(String, String)],
    pass: u32,
) -> Vec<Measurement> {
    let mut records = Vec::new();

    for region in catalog.regions() {
        let Some((_, ip)) = hosts.iter().find(|(code, _)| *code == region.code) else {
            continue;
        };

        info!(region = %region.code, name = %region.name, pass, "Probing region");
        let endpoints = region.endpoint_map();
        let report = match prober.probe(&region.code, ip, &endpoints).await {
            Ok(report) => report,
            Err(e) => {
                error!(region = %region.code, ip = %ip, error = %e, "Probe failed");
                continue;
            }
        };

        let timestamp = Utc::now();
        for (exchange, stats) in report.iter() {
            if !stats.has_valid_avg() {
                debug!(region = %region.code, exchange = %exchange, "Discarding invalid average");
                continue;
            }
            let Some(category) = region.category_of(exchange) else {
                debug!(region = %region.code, exchange = %exchange, "Ignoring unknown endpoint");
                continue;
            };
            records.push(Measurement {
                region: region.code.clone(),
                region_name: region.name.clone(),
                exchange: exchange.clone(),
                category,
                latency_ms: round2(stats.avg),
                timestamp,
                pass,
            });
        }
    }

    records
}

/// Mean latency per (exchange, region), exchanges as rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PivotTable {
    /// Row labels, alphabetical
    pub exchanges: Vec<String>,
    /// Column labels (region display names), alphabetical
    pub regions: Vec<String>,
    cells: BTreeMap<(String, String), f64>,
}

impl PivotTable {
    /// Mean latency for a cell, `None` if nothing was measured there
    pub fn get(&self, exchange: &str, region: &str) -> Option<f64> {
        self.cells
            .get(&(exchange.to_string(), region.to_string()))
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Build the exchange × region table of mean latencies
pub fn pivot(records: &[Measurement]) -> PivotTable {
    let mut sums: BTreeMap<(String, String), (f64, usize)> = BTreeMap::new();
    let mut exchanges = BTreeSet::new();
    let mut regions = BTreeSet::new();

    for record in records {
        exchanges.insert(record.exchange.clone());
        regions.insert(record.region_name.clone());
        let entry = sums
            .entry((record.exchange.clone(), record.region_name.clone()))
            .or_insert((0.0, 0));
        entry.0 += record.latency_ms;
        entry.1 += 1;
    }

    PivotTable {
        exchanges: exchanges.into_iter().collect(),
        regions: regions.into_iter().collect(),
        cells: sums
            .into_iter()
            .map(|(key, (sum, count))| (key, sum / count as f64))
            .collect(),
    }
}

/// The `n` lowest-latency records, ascending
pub fn top_n(records: &[Measurement], n: usize) -> Vec<&Measurement> {
    let mut sorted: Vec<&Measurement> = records.iter().collect();
    sorted.sort_by(|a, b| a.latency_ms.total_cmp(&b.latency_ms));
    sorted.truncate(n);
    sorted
}

/// Latency statistics per region display name
pub fn region_summary(records: &[Measurement]) -> BTreeMap<String, LatencyStats> {
    let mut samples: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in records {
        samples
            .entry(record.region_name.clone())
            .or_default()
            .push(record.latency_ms);
    }
    samples
        .into_iter()
        .map(|(region, values)| (region, LatencyStats::from_samples(&values)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::prober::{MockRemoteProbe, ProbeError};
    use vultr_latency_common::{Endpoint, ProbeReport, ProbeStats, RegionEntry};

    fn record(exchange: &str, region_name: &str, latency_ms: f64) -> Measurement {
        Measurement {
            region: region_name.to_lowercase(),
            region_name: region_name.to_string(),
            exchange: exchange.to_string(),
            category: Category::Cex,
            latency_ms,
            timestamp: Utc::now(),
            pass: 1,
        }
    }

    fn catalog() -> Catalog {
        let region = |code: &str, name: &str| RegionEntry {
            code: code.to_string(),
            name: name.to_string(),
            cex: vec![Endpoint::new("Binance", "https://api.binance.com/api/v3/ping")],
            dex: vec![Endpoint::new("Uniswap", "https://api.uniswap.org/v1/ping")],
        };
        Catalog::new(vec![
            region("nrt", "Tokyo"),
            region("sgp", "Singapore"),
            region("fra", "Frankfurt"),
        ])
    }

    fn stats(avg: f64) -> ProbeStats {
        ProbeStats {
            min: avg,
            avg,
            max: avg,
        }
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(12.345_6), 12.35);
        assert_eq!(round2(0.004), 0.0);
    }

    #[test]
    fn test_pivot_cell_is_mean() {
        let records = vec![
            record("Binance", "Tokyo", 10.0),
            record("Binance", "Tokyo", 20.0),
            record("Binance", "Frankfurt", 200.0),
            record("OKX", "Tokyo", 5.0),
        ];
        let table = pivot(&records);
        assert_eq!(table.exchanges, vec!["Binance", "OKX"]);
        assert_eq!(table.regions, vec!["Frankfurt", "Tokyo"]);
        assert_eq!(table.get("Binance", "Tokyo"), Some(15.0));
        assert_eq!(table.get("Binance", "Frankfurt"), Some(200.0));
        assert_eq!(table.get("OKX", "Frankfurt"), None);
    }

    #[test]
    fn test_pivot_empty() {
        assert!(pivot(&[]).is_empty());
    }

    #[test]
    fn test_top_n_ascending_and_bounded() {
        let records: Vec<_> = [40.0, 10.0, 30.0, 20.0]
            .iter()
            .map(|v| record("X", "Tokyo", *v))
            .collect();
        let top = top_n(&records, 3);
        let values: Vec<f64> = top.iter().map(|r| r.latency_ms).collect();
        assert_eq!(values, vec![10.0, 20.0, 30.0]);
        assert_eq!(top_n(&records, 10).len(), 4);
        assert!(top_n(&records, 0).is_empty());
    }

    #[test]
    fn test_region_summary() {
        let records = vec![
            record("A", "Tokyo", 10.0),
            record("B", "Tokyo", 30.0),
            record("A", "Seoul", 5.0),
        ];
        let summary = region_summary(&records);
        assert_eq!(summary["Tokyo"].avg, 20.0);
        assert_eq!(summary["Tokyo"].count, 2);
        assert_eq!(summary["Seoul"].min, 5.0);
    }

    #[tokio::test]
    async fn test_run_pass_three_regions_two_endpoints() {
        let mut mock = MockRemoteProbe::new();
        mock.expect_probe().times(3).returning(|_, _, endpoints| {
            Ok(endpoints
                .keys()
                .map(|name| (name.clone(), stats(12.346)))
                .collect::<ProbeReport>())
        });

        let hosts = vec![
            ("fra".to_string(), "10.0.0.3".to_string()),
            ("nrt".to_string(), "10.0.0.1".to_string()),
            ("sgp".to_string(), "10.0.0.2".to_string()),
        ];
        let records = run_pass(&mock, &catalog(), &hosts, 1).await;

        assert_eq!(records.len(), 6);
        // Catalog order, not host order
        assert_eq!(records[0].region, "nrt");
        assert_eq!(records[5].region, "fra");
        assert!(records.iter().all(|r| r.latency_ms == 12.35));
        let uniswap = records.iter().find(|r| r.exchange == "Uniswap").unwrap();
        assert_eq!(uniswap.category, Category::Dex);
    }

    #[tokio::test]
    async fn test_run_pass_skips_unready_and_failed_regions() {
        let mut mock = MockRemoteProbe::new();
        mock.expect_probe().returning(|region, ip, _| {
            assert_ne!(region, "sgp", "unready region must not be probed");
            if region == "fra" {
                Err(ProbeError::ShellUnreachable {
                    ip: ip.to_string(),
                    attempts: 10,
                })
            } else {
                let mut report = ProbeReport::new();
                report.insert("Binance", stats(8.0));
                report.insert("Uniswap", stats(f64::NAN));
                Ok(report)
            }
        });

        let hosts = vec![
            ("nrt".to_string(), "10.0.0.1".to_string()),
            ("fra".to_string(), "10.0.0.3".to_string()),
        ];
        let records = run_pass(&mock, &catalog(), &hosts, 2).await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].exchange, "Binance");
        assert_eq!(records[0].pass, 2);
        assert!(records.iter().all(|r| r.region != "sgp"));
    }
}
