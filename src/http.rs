//! HTTP integration.
//!
//! - [`filter_request`]: axum middleware running [`BlacklistFilter::decide`]
//! - [`run_metrics_server`]: Prometheus `/metrics` endpoint on its own port

use crate::security::BlacklistFilter;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Router, routing::get};
use std::net::SocketAddr;

/// Middleware: reject blacklisted clients with a bodiless 403, forward the rest.
///
/// The accounting task started for an allowed request is detached; the
/// response never waits for it.
pub async fn filter_request(State(filter): State<BlacklistFilter>, req: Request, next: Next) -> Response {
    let url = request_url(&req);
    // The body is not `Sync`, so only the parts are borrowed across the lookup.
    let (parts, body) = req.into_parts();
    let decision = filter.decide(&parts.headers, &url).await;

    if decision.verdict.is_rejected() {
        return StatusCode::FORBIDDEN.into_response();
    }

    next.run(Request::from_parts(parts, body)).await
}

/// Install [`filter_request`] in front of every route of `router`.
pub fn protect<S>(router: Router<S>, filter: BlacklistFilter) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(filter, filter_request))
}

/// Path and query as sent by the client, the key requests are counted under.
fn request_url(req: &Request) -> String {
    req.uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().to_string())
}

/// Handler for GET /metrics - returns Prometheus metrics in text format.
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

/// Run the HTTP server for Prometheus metrics.
///
/// Binds to `0.0.0.0:port` and serves the `/metrics` endpoint.
/// This is a long-running task that should be spawned in the background.
pub async fn run_metrics_server(port: u16) {
    let app = Router::new().route("/metrics", get(metrics_handler));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Prometheus HTTP server listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind HTTP server on {}: {}", addr, e);
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("HTTP server error: {}", e);
    }
}
