use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::{Json, Router};
use log_groups::config::{BackendType, IngestionConfig};
use log_groups::ingestion::{HttpClient, IngestError, IngestionClient, LogBatch};
use log_groups::shipper::{BackgroundTransport, HttpRequestInfo, LogEntry, Severity, WorkerConfig};
use log_groups::shutdown::ShutdownRegistry;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Captured {
    authorization: Option<String>,
    body: Value,
}

struct CaptureState {
    status: StatusCode,
    requests: Mutex<Vec<Captured>>,
}

async fn capture(
    State(state): State<Arc<CaptureState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.requests.lock().unwrap().push(Captured { authorization, body });
    state.status
}

/// Serve a capturing ingestion endpoint on its own runtime thread, so the
/// blocking client under test never runs inside an async context.
fn spawn_capture_server(status: StatusCode) -> (String, Arc<CaptureState>) {
    let state = Arc::new(CaptureState {
        status,
        requests: Mutex::new(Vec::new()),
    });
    let (addr_tx, addr_rx) = std::sync::mpsc::channel();

    let server_state = state.clone();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            addr_tx.send(listener.local_addr().unwrap()).unwrap();
            let app = Router::new().fallback(capture).with_state(server_state);
            axum::serve(listener, app).await.unwrap();
        });
    });

    let addr = addr_rx.recv().unwrap();
    (format!("http://{}/v2/entries:write", addr), state)
}

fn ingestion_config(endpoint: &str) -> IngestionConfig {
    IngestionConfig {
        backend: BackendType::Http,
        endpoint: endpoint.to_string(),
        project_id: Some("demo".to_string()),
        access_token: Some("token".to_string()),
        timeout: Duration::from_secs(5),
    }
}

#[test]
fn test_commit_posts_entries_write_body() {
    let (endpoint, state) = spawn_capture_server(StatusCode::OK);
    let client = HttpClient::new(&ingestion_config(&endpoint)).unwrap();

    let http = HttpRequestInfo {
        request_method: "GET".to_string(),
        request_url: "http://localhost:8080/".to_string(),
        status: 200,
        response_size: Some(2),
        latency: "0.01000s".to_string(),
        remote_ip: Some("10.0.0.7".to_string()),
        request_size: None,
        user_agent: None,
        referer: None,
    };
    let text = LogEntry::text("hello", Severity::Info).with_trace(Some("abc".to_string()), Some("7".to_string()));
    let summary = LogEntry::summary(Severity::Error, http).with_trace(Some("abc".to_string()), None);

    let mut batch = client.logger("request").batch();
    batch.add_text(text.message, text.metadata.clone());
    batch.add_structured(json!({"title": "Ozymandias"}), text.metadata.clone());
    batch.add_structured(json!(5), text.metadata);
    batch.add_text(None, summary.metadata);
    batch.commit().unwrap();

    let requests = state.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer token"));

    let body = &requests[0].body;
    assert_eq!(body["logName"], "projects/demo/logs/request");
    assert_eq!(body["partialSuccess"], false);

    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 4);

    assert_eq!(entries[0]["textPayload"], "hello");
    assert_eq!(entries[0]["severity"], "INFO");
    assert_eq!(entries[0]["trace"], "projects/demo/traces/abc");
    assert_eq!(entries[0]["spanId"], "7");
    assert_eq!(entries[0]["resource"]["type"], "global");
    assert!(entries[0]["insertId"].is_string());

    assert_eq!(entries[1]["jsonPayload"]["title"], "Ozymandias");
    assert_eq!(entries[2]["jsonPayload"]["value"], 5);

    assert!(entries[3].get("textPayload").is_none());
    assert!(entries[3].get("jsonPayload").is_none());
    assert_eq!(entries[3]["severity"], "ERROR");
    assert_eq!(entries[3]["httpRequest"]["status"], 200);
    assert_eq!(entries[3]["httpRequest"]["remoteIp"], "10.0.0.7");
    assert_eq!(entries[3]["httpRequest"]["latency"], "0.01000s");
}

#[test]
fn test_error_status_becomes_backend_error() {
    let (endpoint, _state) = spawn_capture_server(StatusCode::SERVICE_UNAVAILABLE);
    let client = HttpClient::new(&ingestion_config(&endpoint)).unwrap();

    let entry = LogEntry::text("hello", Severity::Info);
    let mut batch = client.logger("application").batch();
    batch.add_text(entry.message, entry.metadata);

    match batch.commit() {
        Err(IngestError::Backend { status, .. }) => assert_eq!(status, 503),
        other => panic!("expected backend error, got {:?}", other),
    }
}

#[test]
fn test_transport_ships_through_http_backend() {
    let (endpoint, state) = spawn_capture_server(StatusCode::OK);
    let client = HttpClient::new(&ingestion_config(&endpoint)).unwrap();
    let registry = ShutdownRegistry::new();

    let transport = BackgroundTransport::new(
        "application",
        client.logger("application"),
        WorkerConfig::default(),
        registry.clone(),
    )
    .unwrap();

    for i in 0..12 {
        transport.send(LogEntry::text(format!("line {}", i), Severity::Info));
    }
    transport.flush();

    let shipped: usize = state
        .requests
        .lock()
        .unwrap()
        .iter()
        .map(|captured| captured.body["entries"].as_array().map_or(0, Vec::len))
        .sum();
    assert_eq!(shipped, 12);

    registry.run();
    assert!(!transport.worker().is_alive());
}

#[test]
fn test_failed_http_commit_keeps_worker_running() {
    let (endpoint, state) = spawn_capture_server(StatusCode::INTERNAL_SERVER_ERROR);
    let client = HttpClient::new(&ingestion_config(&endpoint)).unwrap();

    let transport = BackgroundTransport::new(
        "request",
        client.logger("request"),
        WorkerConfig::default(),
        ShutdownRegistry::new(),
    )
    .unwrap();

    transport.send(LogEntry::text("dropped", Severity::Info));
    transport.flush();

    assert_eq!(state.requests.lock().unwrap().len(), 1);
    assert!(transport.worker().is_alive());
    assert!(transport.worker().stop(Some(Duration::from_secs(5))));
}
