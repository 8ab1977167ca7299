use axum::{extract::State, routing::get, Json};

use crate::{
    auth::AdminSession,
    context::ServerContext,
    errors::{ErrorBody, ServerResult},
    schemas::{UsersActionSchema, ValidatedForm},
    serialized::{Success, UsersPage},
    Router,
};

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(
        ("SessionCookie" = [])
    ),
    responses(
        (status = 200, body = UsersPage),
        (status = 303, description = "Not logged in, or not an admin")
    )
)]
async fn list_users(
    AdminSession(session): AdminSession,
    State(context): State<ServerContext>,
) -> ServerResult<Json<UsersPage>> {
    let overview = context.admin.invitations.overview().await?;

    Ok(Json(UsersPage::new(&session.user, &overview)))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body(content = UsersActionSchema, content_type = "application/x-www-form-urlencoded"),
    security(
        ("SessionCookie" = [])
    ),
    responses(
        (status = 200, body = Success),
        (status = 303, description = "Not logged in, or not an admin"),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody, description = "The invitation to resend doesn't exist"),
        (status = 409, body = ErrorBody, description = "The email already has an account or invitation"),
        (status = 500, body = ErrorBody)
    )
)]
async fn manage_invitations(
    _session: AdminSession,
    State(context): State<ServerContext>,
    ValidatedForm(action): ValidatedForm<UsersActionSchema>,
) -> ServerResult<Json<Success>> {
    let invitations = &context.admin.invitations;

    match action {
        UsersActionSchema::CreateInvitation { email } => {
            invitations.create(&email).await?;
        }
        UsersActionSchema::ResendInvitation { id } => invitations.resend(&id).await?,
        UsersActionSchema::DeleteInvitation { id } => invitations.delete(&id).await?,
    }

    Ok(Json(Success::new()))
}

pub fn router() -> Router {
    Router::new().route("/users", get(list_users).post(manage_invitations))
}
