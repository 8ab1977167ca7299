use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    routing::{get, post},
    Json,
};
use log::warn;
use mememachine_admin::Action;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::{ErrorBody, ServerError, ServerResult},
    schemas::{DeleteSoundSchema, PageQuery, UploadSchema, ValidatedForm},
    serialized::{SoundsPage, Success, Uploaded},
    Router,
};

/// Name of the multipart field carrying the sounds
const UPLOAD_FIELD: &str = "sound";

#[utoipa::path(
    get,
    path = "/",
    tag = "sounds",
    params(PageQuery),
    security(
        ("SessionCookie" = [])
    ),
    responses(
        (status = 200, body = SoundsPage),
        (status = 303, description = "Not logged in")
    )
)]
async fn list_sounds(
    session: Session,
    State(context): State<ServerContext>,
    Query(query): Query<PageQuery>,
) -> ServerResult<Json<SoundsPage>> {
    session.require(Action::ViewSounds)?;

    let page = context.admin.sounds.list(query.page.unwrap_or(1)).await?;
    let is_admin = session.user.role.permits(Action::DeleteSounds);

    Ok(Json(SoundsPage::new(&session.user, is_admin, page)))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "sounds",
    request_body(content = DeleteSoundSchema, content_type = "application/x-www-form-urlencoded"),
    security(
        ("SessionCookie" = [])
    ),
    responses(
        (status = 200, body = Success),
        (status = 303, description = "Not logged in, or not an admin"),
        (status = 500, body = ErrorBody)
    )
)]
async fn delete_sound(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedForm(body): ValidatedForm<DeleteSoundSchema>,
) -> ServerResult<Json<Success>> {
    session.require(Action::DeleteSounds)?;

    context.admin.sounds.delete(&body.file).await?;

    Ok(Json(Success::new()))
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "sounds",
    request_body(content = UploadSchema, content_type = "multipart/form-data"),
    security(
        ("SessionCookie" = [])
    ),
    responses(
        (status = 200, body = Uploaded),
        (status = 303, description = "Not logged in"),
        (status = 400, body = ErrorBody),
        (status = 413, body = ErrorBody, description = "A sound exceeds the maximum upload size")
    )
)]
async fn upload_sounds(
    session: Session,
    State(context): State<ServerContext>,
    mut multipart: Multipart,
) -> ServerResult<Json<Uploaded>> {
    session.require(Action::UploadSounds)?;

    let mut uploaded = Vec::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::Malformed(e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let Some(file_name) = field.file_name().map(|name| name.to_string()) else {
            continue;
        };

        let mut writer = context.admin.sounds.upload(&file_name).await?;

        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    warn!("Upload of {} was interrupted: {}", file_name, e);
                    writer.abort().await?;
                    return Err(ServerError::Malformed(e.body_text()));
                }
            };

            // Dropping an unfinished writer removes its partial file
            writer.write(&chunk).await?;
        }

        uploaded.push(writer.finish().await?);
    }

    if uploaded.is_empty() {
        return Err(ServerError::field(UPLOAD_FIELD, "No sound was uploaded"));
    }

    Ok(Json(Uploaded::new(uploaded)))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_sounds).post(delete_sound))
        .route(
            "/upload",
            post(upload_sounds).layer(DefaultBodyLimit::disable()),
        )
}
