//! Integration tests for the Vultr client against a local HTTP stub
//!
//! Each test starts a one-shot HTTP server on an ephemeral port that answers
//! with a canned status and body and records the request it received.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use vultr_latency_coordinator::vultr::{LaunchInstanceConfig, VultrClient, VultrError};

/// Request as seen by the stub
#[derive(Debug, Default, Clone)]
struct Captured {
    request_line: String,
    headers: String,
    body: String,
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        202 => "Accepted",
        204 => "No Content",
        401 => "Unauthorized",
        404 => "Not Found",
        _ => "Status",
    }
}

/// Serve `responses` in order, one per connection. Returns the base URL.
async fn start_stub(responses: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<Captured>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured = Arc::new(Mutex::new(Vec::new()));
    let log = captured.clone();

    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().await.unwrap();

            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let header_end = loop {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break buf.len();
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };

            let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
            let content_length = head
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            while buf.len() < header_end + content_length {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }

            let (request_line, headers) = head.split_once("\r\n").unwrap_or((&head, ""));
            log.lock().unwrap().push(Captured {
                request_line: request_line.to_string(),
                headers: headers.to_lowercase(),
                body: String::from_utf8_lossy(&buf[header_end..]).to_string(),
            });

            let response = format!(
                "HTTP/1.1 {status} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                reason(status),
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
        }
    });

    (format!("http://{addr}/v2"), captured)
}

#[tokio::test]
async fn test_create_instance_accepted() {
    let (url, captured) = start_stub(vec![(
        202,
        r#"{"instance":{"id":"cb676a46-66fd-4dfb-b839-443f2e6c0b60","region":"nrt","status":"pending","power_status":"stopped","main_ip":"0.0.0.0"}}"#,
    )])
    .await;

    let client = VultrClient::with_base_url("secret-key", url).unwrap();
    let config = LaunchInstanceConfig::new("nrt", "latency-nrt-abcd1234", "#!/bin/bash\necho hi\n")
        .with_ssh_keys(vec!["key-1".to_string()]);
    let id = client.create_instance(&config).await.unwrap();
    assert_eq!(id, "cb676a46-66fd-4dfb-b839-443f2e6c0b60");

    let captured = captured.lock().unwrap();
    let request = &captured[0];
    assert_eq!(request.request_line, "POST /v2/instances HTTP/1.1");
    assert!(request.headers.contains("authorization: bearer secret-key"));

    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["region"], "nrt");
    assert_eq!(body["label"], "latency-nrt-abcd1234");
    assert_eq!(body["hostname"], "latency-nrt-abcd1234");
    assert_eq!(body["backups"], "disabled");
    assert_eq!(body["enable_ipv6"], true);
    assert_eq!(body["sshkey_ids"][0], "key-1");
    // user-data travels base64 encoded
    assert_eq!(body["user_data"], "IyEvYmluL2Jhc2gKZWNobyBoaQo=");
}

#[tokio::test]
async fn test_create_instance_ok_is_not_accepted() {
    let (url, _) = start_stub(vec![(200, r#"{"instance":{"id":"x"}}"#)]).await;

    let client = VultrClient::with_base_url("k", url).unwrap();
    let err = client
        .create_instance(&LaunchInstanceConfig::new("nrt", "l", ""))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        VultrError::UnexpectedStatus {
            expected: 202,
            status: 200,
            ..
        }
    ));
}

#[tokio::test]
async fn test_get_instance_ready() {
    let (url, captured) = start_stub(vec![(
        200,
        r#"{"instance":{"id":"abc","region":"sgp","status":"active","power_status":"running","main_ip":"203.0.113.7","extra":"ignored"}}"#,
    )])
    .await;

    let client = VultrClient::with_base_url("k", url).unwrap();
    let info = client.get_instance("abc").await.unwrap();
    assert_eq!(info.ready_ip(), Some("203.0.113.7"));
    assert_eq!(
        captured.lock().unwrap()[0].request_line,
        "GET /v2/instances/abc HTTP/1.1"
    );
}

#[tokio::test]
async fn test_delete_instance_no_content() {
    let (url, captured) = start_stub(vec![(204, ""), (404, r#"{"error":"Invalid instance-id."}"#)]).await;

    let client = VultrClient::with_base_url("k", url).unwrap();
    client.delete_instance("abc").await.unwrap();
    assert_eq!(
        captured.lock().unwrap()[0].request_line,
        "DELETE /v2/instances/abc HTTP/1.1"
    );

    let err = client.delete_instance("abc").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_unauthorized_has_suggestion() {
    let (url, _) = start_stub(vec![(401, r#"{"error":"Invalid API token."}"#)]).await;

    let client = VultrClient::with_base_url("bad", url).unwrap();
    let err = client.list_regions().await.unwrap_err();
    assert!(matches!(err, VultrError::Unauthorized { status: 401, .. }));
    assert!(err.suggestion().is_some());
}

#[tokio::test]
async fn test_list_regions() {
    let (url, captured) = start_stub(vec![(
        200,
        r#"{"regions":[{"id":"nrt","city":"Tokyo","country":"JP","continent":"Asia","options":[]},{"id":"ewr","city":"New Jersey","country":"US","continent":"North America"}],"meta":{"total":2}}"#,
    )])
    .await;

    let client = VultrClient::with_base_url("k", url).unwrap();
    let regions = client.list_regions().await.unwrap();
    assert_eq!(regions.len(), 2);
    assert_eq!(regions[0].id, "nrt");
    assert_eq!(regions[1].city, "New Jersey");
    assert_eq!(
        captured.lock().unwrap()[0].request_line,
        "GET /v2/regions?per_page=500 HTTP/1.1"
    );
}
