//! Minimal Axum adapter demonstrating how a hosting HTTP server wires
//! requests into `slack_bolt_core::App`. Not part of the library's public
//! contract — the core is deliberately HTTP-server-agnostic (see lib.rs).
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{prelude::*, EnvFilter};

use slack_bolt_core::app::RawRequest;
use slack_bolt_core::App;

async fn slack_endpoint(
    State(app): State<Arc<App>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let raw = RawRequest {
        method: method.to_string(),
        path: uri.to_string(),
        headers,
        body: body.to_vec(),
        cancellation: None,
    };

    match app.run(raw).await {
        Ok(resp) => {
            let mut builder = axum::response::Response::builder().status(resp.status_code);
            if let Some(headers_mut) = builder.headers_mut() {
                *headers_mut = resp.headers;
                headers_mut.insert(
                    axum::http::header::CONTENT_TYPE,
                    resp.content_type.parse().unwrap_or_else(|_| {
                        axum::http::HeaderValue::from_static("text/plain")
                    }),
                );
            }
            builder
                .body(axum::body::Body::from(resp.body))
                .unwrap_or_else(|_| {
                    axum::response::Response::new(axum::body::Body::from("internal error"))
                })
        }
        Err(e) => {
            tracing::error!(error = %e, "handler raised an error");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = slack_bolt_core::AppConfig::from_env()?;
    let app = Arc::new(App::new(config));
    app.start();

    let router = Router::new()
        .route("/slack/events", post(slack_endpoint))
        .route("/slack/commands", post(slack_endpoint))
        .route("/slack/interactions", post(slack_endpoint))
        .route("/slack/install", get(slack_endpoint))
        .route("/slack/oauth_redirect", get(slack_endpoint))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "slack-bolt-demo listening");
    axum::serve(listener, router).await?;

    Ok(())
}
