//! Static file server for the published directory
//!
//! Every response, including 404s, carries `Access-Control-Allow-Origin: *`.

use axum::http::{header, HeaderValue};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Build the router serving `dir`; `/` resolves to `index.html`
pub fn router(dir: impl AsRef<Path>) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(dir.as_ref()))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve `dir` until `shutdown` resolves
pub async fn serve<F>(addr: SocketAddr, dir: impl AsRef<Path>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, dir, shutdown).await
}

/// Serve `dir` on an already bound listener until `shutdown` resolves
pub async fn serve_on<F>(listener: TcpListener, dir: impl AsRef<Path>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let dir = dir.as_ref();
    let app = router(dir);

    tracing::info!(
        addr = %listener.local_addr()?,
        dir = ?dir,
        "Serving published feed"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
