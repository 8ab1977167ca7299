use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json,
};
use mememachine_admin::InvitationError;
use url::form_urlencoded;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::{ErrorBody, ServerResult},
    schemas::{RegisterQuery, RegisterSchema, ValidatedForm},
    serialized::RegisterPage,
    Router,
};

#[utoipa::path(
    get,
    path = "/register",
    tag = "auth",
    params(RegisterQuery),
    responses(
        (status = 200, body = RegisterPage),
        (status = 303, description = "Already logged in, or the token is missing or unknown")
    )
)]
async fn register_page(
    session: Option<Session>,
    State(context): State<ServerContext>,
    Query(query): Query<RegisterQuery>,
) -> ServerResult<Response> {
    let Some(token) = query.token.filter(|_| session.is_none()) else {
        return Ok(Redirect::to("/").into_response());
    };

    match context.admin.invitations.pending(&token).await {
        Ok(invitation) => Ok(Json(RegisterPage {
            email: invitation.email,
            token: invitation.id,
        })
        .into_response()),
        Err(InvitationError::InvalidToken) => Ok(Redirect::to("/").into_response()),
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    request_body(content = RegisterSchema, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Registered, continue at the login page"),
        (status = 400, body = ErrorBody),
        (status = 500, body = ErrorBody)
    )
)]
async fn register(
    State(context): State<ServerContext>,
    ValidatedForm(body): ValidatedForm<RegisterSchema>,
) -> ServerResult<Redirect> {
    let user = match context
        .admin
        .invitations
        .accept(&body.token, &body.password)
        .await
    {
        Ok(user) => user,
        Err(InvitationError::InvalidToken) => return Ok(Redirect::to("/")),
        Err(e) => return Err(e.into()),
    };

    let email: String = form_urlencoded::byte_serialize(user.email.as_bytes()).collect();

    Ok(Redirect::to(&format!("/login?email={email}")))
}

pub fn router() -> Router {
    Router::new().route("/register", get(register_page).post(register))
}
