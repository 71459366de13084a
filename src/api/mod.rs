//! HTTP transport adapter.
//!
//! A pure translation layer: handlers decode the wire request, call the
//! session engine, and encode the reply. The only state threaded through is
//! the engine itself, injected as an extension at construction.

pub(crate) mod auth;
pub(crate) mod handlers;
mod openapi;

pub use auth::AuthUser;

use crate::session::Engine;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Method, Request},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use std::net::SocketAddr;
use tokio::{net::TcpListener, sync::watch};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

/// Build the API router around an engine.
#[must_use]
pub fn router(engine: Engine) -> Router {
    let authenticated = Router::new()
        .route("/logout", post(handlers::logout))
        .route("/validate", post(handlers::validate))
        .route_layer(middleware::from_fn(auth::require_token));

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any);

    Router::new()
        .route("/login", post(handlers::login))
        .route("/user", post(handlers::create))
        .merge(authenticated)
        .route("/health", get(handlers::health))
        .route("/openapi.json", get(openapi::serve))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(engine)),
        )
}

pub struct Server {
    listener: TcpListener,
}

impl Server {
    /// Bind the HTTP listener. Failing to bind is fatal before serving.
    ///
    /// # Errors
    ///
    /// Returns an error if neither the dual-stack nor the IPv4 socket can
    /// be bound.
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = match TcpListener::bind(format!("[::]:{port}")).await {
            Ok(listener) => listener,
            // Dual-stack sockets are unavailable in v6-less containers.
            Err(_) => TcpListener::bind(format!("0.0.0.0:{port}"))
                .await
                .with_context(|| format!("Failed to bind HTTP listener on port {port}"))?,
        };
        Ok(Self { listener })
    }

    /// # Errors
    ///
    /// Returns an error if the bound address cannot be read back.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` flips, then let in-flight requests drain.
    ///
    /// # Errors
    ///
    /// Returns an error if the accept loop terminates unexpectedly.
    pub async fn serve(self, engine: Engine, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let addr = self.listener.local_addr()?;
        info!("HTTP listening on {addr}");

        let app = router(engine);
        axum::serve(self.listener, app.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
                info!("HTTP server shutting down");
            })
            .await?;

        Ok(())
    }
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
