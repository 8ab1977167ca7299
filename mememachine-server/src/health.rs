use axum::{extract::State, http::StatusCode, routing::get, Json};
use log::warn;

use crate::{context::ServerContext, serialized::Health, Router};

#[utoipa::path(
    get,
    path = "/healthcheck",
    tag = "health",
    responses(
        (status = 200, body = Health),
        (status = 500, body = Health)
    )
)]
async fn healthcheck(State(context): State<ServerContext>) -> (StatusCode, Json<Health>) {
    // If we can make a HEAD request to ourselves, we're good
    let result = context
        .http
        .head(format!("http://localhost:{}/", context.config.port))
        .send()
        .await
        .and_then(|response| response.error_for_status());

    match result {
        Ok(_) => (StatusCode::OK, Json(Health::new("ok"))),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Health::new("unhealthy")),
            )
        }
    }
}

pub fn router() -> Router {
    Router::new().route("/healthcheck", get(healthcheck))
}
