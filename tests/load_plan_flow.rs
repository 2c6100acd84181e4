//! End-to-end load-plan flow against a local stand-in for the planning service.

use std::net::SocketAddr;
use std::time::Instant;

use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use uld_viewer::client::{LoadPlanClient, LoadPlanError};
use uld_viewer::package::random_package;
use uld_viewer::uld::UldDescriptor;
use uld_viewer::views::ContainerView;
use uld_viewer::views::plan::BACKEND_ERROR_MESSAGE;

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Accept one request, answer it with `status` and `body`, and hand back the
/// request's JSON body.
async fn serve_once(status: &'static str, body: String) -> (SocketAddr, JoinHandle<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = find(&buf, b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        assert!(headers.starts_with("post /loadplan/execute"), "{headers}");
        let len = headers
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .map(|v| v.trim().parse::<usize>().unwrap())
            .unwrap_or(0);

        while buf.len() < header_end + len {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending the body");
            buf.extend_from_slice(&chunk[..n]);
        }
        let request: Value = serde_json::from_slice(&buf[header_end..header_end + len]).unwrap();

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
        request
    });

    (addr, handle)
}

fn client_for(addr: SocketAddr) -> LoadPlanClient {
    LoadPlanClient::with_endpoint(format!("http://{addr}/LoadPlan/execute"))
}

fn container_with(n: usize) -> ContainerView {
    let mut view = ContainerView::new(UldDescriptor::akc(), 800.0, Instant::now());
    for _ in 0..n {
        view.add_package(random_package());
    }
    view
}

#[tokio::test]
async fn successful_plan_is_applied() {
    let body = json!({
        "positions": [
            {"id": "PKG-1", "x": 0.0, "y": 0.1, "z": 0.0, "width": 0.3, "height": 0.2, "length": 0.4},
            {"id": "PKG-2", "x": 0.5, "y": 0.1, "z": 0.2, "width": 0.3, "height": 0.2, "length": 0.4}
        ]
    });
    let (addr, server) = serve_once("200 OK", body.to_string()).await;

    let mut view = container_with(2);
    let ticket = view.execute_load_plan().unwrap();
    assert!(view.is_executing());

    let outcome = client_for(addr).execute(&ticket.uld, &ticket.packages).await;
    assert!(view.complete_load_plan(ticket.token, outcome));

    assert!(!view.is_executing());
    assert_eq!(view.placement_count(), 2);
    let first = view.placement("PKG-1").unwrap();
    assert_eq!(first.transform.translation.to_array(), [0.0, 0.1, 0.0]);

    let request = server.await.unwrap();
    assert_eq!(request["uld"]["code"], "AKC");
    let top_width = request["uld"]["topWidth"].as_f64().unwrap();
    assert!((top_width - 2.3368).abs() < 1e-6);
    let sent = request["packages"].as_array().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0]["id"], view.packages()[0].id.as_str());
    assert!(sent[0].get("deliveryOrder").is_some());
}

#[tokio::test]
async fn server_error_keeps_placements_and_reports() {
    let (addr, server) = serve_once(
        "500 Internal Server Error",
        json!({"title": "planner exploded"}).to_string(),
    )
    .await;

    let mut view = container_with(1);
    let before = view.placement_count();
    let ticket = view.execute_load_plan().unwrap();

    let outcome = client_for(addr).execute(&ticket.uld, &ticket.packages).await;
    match &outcome {
        Err(LoadPlanError::Api { status, message }) => {
            assert_eq!(*status, 500);
            assert_eq!(message, "planner exploded");
        }
        other => panic!("expected an API error, got {other:?}"),
    }

    assert!(!view.complete_load_plan(ticket.token, outcome));
    assert_eq!(view.last_load_plan_message(), Some(BACKEND_ERROR_MESSAGE));
    assert_eq!(view.placement_count(), before);
    assert!(!view.is_executing());
    server.await.unwrap();
}

#[tokio::test]
async fn unexpected_body_is_an_empty_plan() {
    let (addr, server) = serve_once("200 OK", json!({"status": "queued"}).to_string()).await;

    let mut view = container_with(1);
    let ticket = view.execute_load_plan().unwrap();
    let outcome = client_for(addr).execute(&ticket.uld, &ticket.packages).await;
    assert!(outcome.as_ref().unwrap().positions.is_empty());

    assert!(view.complete_load_plan(ticket.token, outcome));
    assert_eq!(view.placement_count(), 0);
    assert!(view.last_load_plan_message().is_none());
    server.await.unwrap();
}

#[tokio::test]
async fn response_after_teardown_is_dropped() {
    let body = json!({"positions": [
        {"id": "PKG-9", "x": 0, "y": 0, "z": 0, "width": 0.3, "height": 0.2, "length": 0.4}
    ]});
    let (addr, server) = serve_once("200 OK", body.to_string()).await;

    let mut view = container_with(1);
    let ticket = view.execute_load_plan().unwrap();
    let report = view.teardown().unwrap();
    assert!(report.stats.is_balanced());

    let outcome = client_for(addr).execute(&ticket.uld, &ticket.packages).await;
    assert!(outcome.is_ok());
    assert!(!view.complete_load_plan(ticket.token, outcome));
    assert_eq!(view.placement_count(), 0);
    assert_eq!(view.arena().live_geometries(), 0);
    server.await.unwrap();
}
