//! End-to-end integration tests
//!
//! Runs real publish cycles against a local stand-in for the price API.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use btc_price_feed::cycle::{CycleError, FeedCycle};
use btc_price_feed::feed::{read_history, FeedMeta, FEED_FILE_NAME, HTML_FILE_NAME};
use btc_price_feed::price::{CoinGeckoConfig, CoinGeckoSource, FetchError, PriceSource};
use btc_price_feed::publish::Publisher;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct StubState {
    responses: Arc<Mutex<VecDeque<(StatusCode, String)>>>,
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    delay: Option<Duration>,
}

async fn simple_price(
    State(state): State<StubState>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    state.queries.lock().unwrap().push(query);
    if let Some(delay) = state.delay {
        tokio::time::sleep(delay).await;
    }
    let next = state.responses.lock().unwrap().pop_front();
    next.unwrap_or((StatusCode::SERVICE_UNAVAILABLE, "exhausted".to_string()))
}

/// Start the stub and return its endpoint URL
async fn spawn_price_api(state: StubState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new()
        .route("/api/v3/simple/price", get(simple_price))
        .with_state(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/v3/simple/price", addr)
}

fn stub(responses: &[(StatusCode, &str)]) -> StubState {
    StubState {
        responses: Arc::new(Mutex::new(
            responses
                .iter()
                .map(|(status, body)| (*status, body.to_string()))
                .collect(),
        )),
        ..Default::default()
    }
}

fn source_for(url: String, timeout: Duration) -> CoinGeckoSource {
    CoinGeckoSource::with_config(CoinGeckoConfig {
        url,
        timeout,
        ..Default::default()
    })
    .unwrap()
}

fn feed_cycle(url: String, dir: &Path, max_entries: usize) -> FeedCycle<CoinGeckoSource> {
    FeedCycle::new(
        source_for(url, Duration::from_secs(5)),
        Publisher::new(dir),
        FeedMeta::new("http://localhost:8000", 1800),
        max_entries,
    )
}

fn item_titles(xml: &str) -> Vec<String> {
    xml.split("<item>")
        .skip(1)
        .filter_map(|item| {
            let start = item.find("<title>")? + "<title>".len();
            let end = item.find("</title>")?;
            Some(item[start..end].to_string())
        })
        .collect()
}

#[tokio::test]
async fn test_two_cycles_newest_first() {
    let state = stub(&[
        (StatusCode::OK, r#"{"bitcoin":{"usd":42123.45}}"#),
        (StatusCode::OK, r#"{"bitcoin":{"usd":42200.00}}"#),
    ]);
    let url = spawn_price_api(state.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let cycle = feed_cycle(url, dir.path(), 10);

    let first = cycle.run_once().await.unwrap();
    assert_eq!(first.entries, 1);
    let xml = std::fs::read_to_string(dir.path().join(FEED_FILE_NAME)).unwrap();
    assert_eq!(item_titles(&xml), vec!["Bitcoin Price: $42,123.45"]);

    let second = cycle.run_once().await.unwrap();
    assert_eq!(second.entries, 2);
    assert_eq!(second.history_len, 1);
    let xml = std::fs::read_to_string(dir.path().join(FEED_FILE_NAME)).unwrap();
    assert_eq!(
        item_titles(&xml),
        vec!["Bitcoin Price: $42,200.00", "Bitcoin Price: $42,123.45"]
    );

    let html = std::fs::read_to_string(dir.path().join(HTML_FILE_NAME)).unwrap();
    assert!(html.contains("$42,200.00 USD"));
    assert!(!html.contains("42,123.45"));

    let queries = state.queries.lock().unwrap();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0].get("ids").map(String::as_str), Some("bitcoin"));
    assert_eq!(queries[0].get("vs_currencies").map(String::as_str), Some("usd"));
}

#[tokio::test]
async fn test_feed_without_sidecar_still_carries_history() {
    let state = stub(&[
        (StatusCode::OK, r#"{"bitcoin":{"usd":100}}"#),
        (StatusCode::OK, r#"{"bitcoin":{"usd":200}}"#),
    ]);
    let url = spawn_price_api(state).await;
    let dir = tempfile::tempdir().unwrap();
    let cycle = feed_cycle(url, dir.path(), 10);

    cycle.run_once().await.unwrap();
    std::fs::remove_file(dir.path().join("bitcoin_price_history.json")).unwrap();

    let report = cycle.run_once().await.unwrap();
    assert_eq!(report.history_len, 1);
    let history = read_history(&dir.path().join(FEED_FILE_NAME)).await;
    assert_eq!(
        history.iter().map(|r| r.price).collect::<Vec<_>>(),
        vec![dec!(200), dec!(100)]
    );
}

#[tokio::test]
async fn test_corrupt_feed_discards_history_but_publishes() {
    let state = stub(&[(StatusCode::OK, r#"{"bitcoin":{"usd":300}}"#)]);
    let url = spawn_price_api(state).await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(FEED_FILE_NAME), "<rss><channel><it").unwrap();

    let report = feed_cycle(url, dir.path(), 10).run_once().await.unwrap();
    assert_eq!(report.history_len, 0);
    assert_eq!(report.entries, 1);
}

#[tokio::test]
async fn test_upstream_error_status() {
    let state = stub(&[(StatusCode::TOO_MANY_REQUESTS, "slow down")]);
    let url = spawn_price_api(state).await;

    let err = source_for(url, Duration::from_secs(5)).fetch().await.unwrap_err();
    match err {
        FetchError::Status { status, body } => {
            assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
            assert_eq!(body, "slow down");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_upstream_missing_field() {
    let state = stub(&[(StatusCode::OK, r#"{"bitcoin":{}}"#)]);
    let url = spawn_price_api(state).await;

    let err = source_for(url, Duration::from_secs(5)).fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::MissingField(_)));
}

#[tokio::test]
async fn test_upstream_malformed_body() {
    let state = stub(&[(StatusCode::OK, "<html>oops</html>")]);
    let url = spawn_price_api(state).await;

    let err = source_for(url, Duration::from_secs(5)).fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Http(_)));
}

#[tokio::test]
async fn test_request_timeout_bounds_a_hung_upstream() {
    let mut state = stub(&[(StatusCode::OK, r#"{"bitcoin":{"usd":1}}"#)]);
    state.delay = Some(Duration::from_secs(5));
    let url = spawn_price_api(state).await;

    let err = source_for(url, Duration::from_millis(200)).fetch().await.unwrap_err();
    match err {
        FetchError::Http(e) => assert!(e.is_timeout()),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_fetch_keeps_published_feed() {
    let state = stub(&[
        (StatusCode::OK, r#"{"bitcoin":{"usd":42123.45}}"#),
        (StatusCode::INTERNAL_SERVER_ERROR, "boom"),
    ]);
    let url = spawn_price_api(state).await;
    let dir = tempfile::tempdir().unwrap();
    let cycle = feed_cycle(url, dir.path(), 10);

    cycle.run_once().await.unwrap();
    let before = std::fs::read(dir.path().join(FEED_FILE_NAME)).unwrap();

    let err = cycle.run_once().await.unwrap_err();
    assert!(matches!(err, CycleError::Fetch(FetchError::Status { .. })));
    assert_eq!(std::fs::read(dir.path().join(FEED_FILE_NAME)).unwrap(), before);
}

#[tokio::test]
async fn test_retention_drops_oldest() {
    let bodies: Vec<String> = (1..=6)
        .map(|i| format!(r#"{{"bitcoin":{{"usd":{}}}}}"#, 1000 + i))
        .collect();
    let responses: Vec<(StatusCode, &str)> =
        bodies.iter().map(|b| (StatusCode::OK, b.as_str())).collect();
    let url = spawn_price_api(stub(&responses)).await;
    let dir = tempfile::tempdir().unwrap();
    let cycle = feed_cycle(url, dir.path(), 3);

    for expected in [1, 2, 3, 3, 3, 3] {
        let report = cycle.run_once().await.unwrap();
        assert_eq!(report.entries, expected);
    }

    let xml = std::fs::read_to_string(dir.path().join(FEED_FILE_NAME)).unwrap();
    assert_eq!(
        item_titles(&xml),
        vec![
            "Bitcoin Price: $1,006.00",
            "Bitcoin Price: $1,005.00",
            "Bitcoin Price: $1,004.00"
        ]
    );
}
