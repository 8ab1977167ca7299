mod auth;
mod context;
mod docs;
mod errors;
mod health;
mod register;
mod schemas;
mod serialized;
mod sounds;
mod statistics;
mod users;

use std::net::{Ipv6Addr, SocketAddr};

use axum::http::{header, HeaderValue, Method};
use log::info;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use url::Url;

pub use context::ServerContext;
pub use errors::{ServerError, ServerResult};

pub type Router = axum::Router<ServerContext>;

#[derive(Debug, Error)]
pub enum RunServerError {
    #[error("Could not listen on port {port}: {source}")]
    Bind {
        port: u16,
        source: std::io::Error,
    },
    #[error("PUBLIC_URL {0} has no usable origin")]
    InvalidOrigin(String),
    #[error(transparent)]
    Serve(std::io::Error),
}

/// Builds the router serving every dashboard route
pub fn router(context: ServerContext) -> axum::Router {
    Router::new()
        .merge(sounds::router())
        .merge(auth::router())
        .merge(register::router())
        .merge(users::router())
        .merge(statistics::router())
        .merge(health::router())
        .merge(docs::router())
        .with_state(context)
}

/// Only the dashboard's own origin may make credentialed requests
fn cors(public_url: &str) -> Result<CorsLayer, RunServerError> {
    let invalid = || RunServerError::InvalidOrigin(public_url.to_string());

    let origin = Url::parse(public_url).map_err(|_| invalid())?.origin();

    if !origin.is_tuple() {
        return Err(invalid());
    }

    let origin = HeaderValue::from_str(&origin.ascii_serialization()).map_err(|_| invalid())?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]))
}

/// Starts the dashboard server
pub async fn run_server(context: ServerContext) -> Result<(), RunServerError> {
    let port = context.config.port;
    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let cors = cors(&context.config.public_url)?;

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| RunServerError::Bind { port, source })?;

    info!("Listening on port {}", port);

    axum::serve(listener, router(context).layer(cors).into_make_service())
        .await
        .map_err(RunServerError::Serve)
}
