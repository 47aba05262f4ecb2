//! Integration tests for vultr-latency-probe
//!
//! Runs the sampler against a local HTTP stub, so no network access is needed.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use vultr_latency_probe::config::ProbeSettings;
use vultr_latency_probe::probe::{build_client, collect_samples, run_probe};

/// Start a minimal HTTP/1.1 server answering every request with `status`.
///
/// When `delay` is set, the server waits that long before responding.
async fn start_stub(status: &'static str, delay: Option<Duration>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                if let Some(d) = delay {
                    tokio::time::sleep(d).await;
                }
                let body = "{\"serverTime\":0}";
                let response = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}/ping")
}

/// Reserve a port and release it so connections are refused
async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/")
}

fn test_settings(samples: u32) -> ProbeSettings {
    ProbeSettings {
        samples,
        interval: Duration::from_millis(5),
        request_timeout: Duration::from_millis(300),
    }
}

#[tokio::test]
async fn test_probe_reports_reachable_endpoints() {
    let ok = start_stub("200 OK", None).await;
    let refused = closed_port_url().await;

    let mut endpoints = BTreeMap::new();
    endpoints.insert("stub".to_string(), ok);
    endpoints.insert("refused".to_string(), refused);

    let client = build_client().unwrap();
    let report = run_probe(&client, &endpoints, &test_settings(3)).await;

    assert_eq!(report.len(), 1, "unreachable endpoint must be omitted");
    let stats = report.get("stub").unwrap();
    assert!(stats.min > 0.0);
    assert!(stats.min <= stats.avg && stats.avg <= stats.max);
}

#[tokio::test]
async fn test_non_success_status_still_counts() {
    let not_found = start_stub("404 Not Found", None).await;

    let mut endpoints = BTreeMap::new();
    endpoints.insert("missing".to_string(), not_found);

    let client = build_client().unwrap();
    let samples = collect_samples(&client, &endpoints, &test_settings(2)).await;
    assert_eq!(samples["missing"].len(), 2);
}

#[tokio::test]
async fn test_slow_endpoint_is_discarded() {
    let slow = start_stub("200 OK", Some(Duration::from_secs(2))).await;

    let mut endpoints = BTreeMap::new();
    endpoints.insert("slow".to_string(), slow);

    let client = build_client().unwrap();
    let report = run_probe(&client, &endpoints, &test_settings(1)).await;
    assert!(report.is_empty());
}

#[tokio::test]
async fn test_report_json_matches_contract() {
    let ok = start_stub("200 OK", None).await;

    let mut endpoints = BTreeMap::new();
    endpoints.insert("binance".to_string(), ok);

    let client = build_client().unwrap();
    let report = run_probe(&client, &endpoints, &test_settings(2)).await;

    let json: serde_json::Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
    let entry = &json["binance"];
    assert!(entry["min"].is_number());
    assert!(entry["avg"].is_number());
    assert!(entry["max"].is_number());
}
