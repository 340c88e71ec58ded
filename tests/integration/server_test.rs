//! Integration tests for the static file server

use btc_price_feed::server::serve_on;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

async fn start(dir: &std::path::Path) -> (SocketAddr, oneshot::Sender<()>, tokio::task::JoinHandle<std::io::Result<()>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    let dir = dir.to_path_buf();
    let handle = tokio::spawn(async move {
        serve_on(listener, dir, async {
            let _ = rx.await;
        })
        .await
    });
    (addr, tx, handle)
}

#[tokio::test]
async fn test_serves_feed_over_tcp_with_cors() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bitcoin_price_feed.xml"), "<rss version=\"2.0\"/>").unwrap();
    std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
    let (addr, shutdown, handle) = start(dir.path()).await;

    let response = reqwest::get(format!("http://{}/bitcoin_price_feed.xml", addr))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
    assert_eq!(response.text().await.unwrap(), "<rss version=\"2.0\"/>");

    let index = reqwest::get(format!("http://{}/", addr)).await.unwrap();
    assert_eq!(index.status(), reqwest::StatusCode::OK);
    assert_eq!(index.text().await.unwrap(), "<html></html>");

    shutdown.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_missing_file_returns_404_with_cors() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, shutdown, handle) = start(dir.path()).await;

    let response = reqwest::get(format!("http://{}/missing.xml", addr)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );

    shutdown.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_serves_files_published_after_start() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, shutdown, handle) = start(dir.path()).await;

    let before = reqwest::get(format!("http://{}/index.html", addr)).await.unwrap();
    assert_eq!(before.status(), reqwest::StatusCode::NOT_FOUND);

    std::fs::write(dir.path().join("index.html"), "fresh").unwrap();
    let after = reqwest::get(format!("http://{}/index.html", addr)).await.unwrap();
    assert_eq!(after.text().await.unwrap(), "fresh");

    shutdown.send(()).unwrap();
    handle.await.unwrap().unwrap();
}
