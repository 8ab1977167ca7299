use axum::{extract::State, routing::get, Json};

use crate::{
    context::ServerContext,
    errors::ServerResult,
    serialized::{StatisticsPage, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "statistics",
    responses(
        (status = 200, body = StatisticsPage)
    )
)]
async fn dashboard(State(context): State<ServerContext>) -> ServerResult<Json<StatisticsPage>> {
    let overview = context.admin.statistics.overview().await?;

    Ok(Json(overview.to_serialized()))
}

pub fn router() -> Router {
    Router::new().route("/dashboard", get(dashboard))
}
