//! Integration tests for atomic publishing

use btc_price_feed::feed::{FEED_FILE_NAME, HTML_FILE_NAME};
use btc_price_feed::publish::{publish, temp_path, Artifacts};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Version `n` is self-describing so a reader can tell if it is complete
fn version(n: usize) -> Artifacts {
    let padding = "x".repeat(1_000 + (n * 7919) % 50_000);
    let body = format!("v{}:{}:{}:end", n, padding.len(), padding);
    Artifacts {
        feed: body.clone().into_bytes(),
        html: body,
        sidecar: None,
    }
}

fn is_complete(content: &str) -> bool {
    let mut parts = content.splitn(4, ':');
    let (Some(_), Some(len), Some(padding), Some(tail)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    tail == "end" && len.parse::<usize>().ok() == Some(padding.len())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_reader_never_sees_partial_files() {
    let dir = tempfile::tempdir().unwrap();
    publish(&version(0), dir.path()).await.unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let reads = Arc::new(AtomicUsize::new(0));
    let reader = {
        let stop = stop.clone();
        let reads = reads.clone();
        let feed = dir.path().join(FEED_FILE_NAME);
        let html = dir.path().join(HTML_FILE_NAME);
        std::thread::spawn(move || {
            let mut torn = Vec::new();
            while !stop.load(Ordering::Relaxed) {
                for path in [&feed, &html] {
                    let content = std::fs::read_to_string(path).unwrap();
                    if !is_complete(&content) {
                        torn.push(content.len());
                    }
                    reads.fetch_add(1, Ordering::Relaxed);
                }
            }
            torn
        })
    };

    for n in 1..=200 {
        publish(&version(n), dir.path()).await.unwrap();
    }
    stop.store(true, Ordering::Relaxed);

    let torn = reader.join().unwrap();
    assert!(torn.is_empty(), "reader saw {} partial files", torn.len());
    assert!(reads.load(Ordering::Relaxed) > 0);

    let last = std::fs::read_to_string(dir.path().join(FEED_FILE_NAME)).unwrap();
    assert!(last.starts_with("v200:"));
}

#[tokio::test]
async fn test_leftover_temp_file_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    publish(&version(1), dir.path()).await.unwrap();

    let tmp = temp_path(&dir.path().join(FEED_FILE_NAME));
    std::fs::write(&tmp, "v2:5000:xx").unwrap();
    let published = std::fs::read_to_string(dir.path().join(FEED_FILE_NAME)).unwrap();
    assert!(is_complete(&published));
    assert!(published.starts_with("v1:"));

    publish(&version(3), dir.path()).await.unwrap();
    assert!(!tmp.exists());
    let published = std::fs::read_to_string(dir.path().join(FEED_FILE_NAME)).unwrap();
    assert!(published.starts_with("v3:"));
}

#[test]
fn test_complete_marker() {
    assert!(is_complete("v1:3:xxx:end"));
    assert!(!is_complete("v1:3:xxx:en"));
    assert!(!is_complete("v1:4:xxx:end"));
    assert!(!is_complete("v1:3:xx"));
}
