use axum::{
    async_trait,
    extract::{FromRequestParts, Query, State},
    http::{header, request::Parts, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json,
};
use log::info;
use mememachine_admin::{Action, Credentials, DatabaseError, SessionKeys, UserData};

use crate::{
    context::ServerContext,
    errors::{ErrorBody, ServerError, ServerResult},
    schemas::{LoginQuery, LoginSchema, ValidatedForm},
    serialized::LoginPage,
    Router,
};

/// The user behind a valid session cookie
pub struct Session {
    pub user: UserData,
}

impl Session {
    /// Fails closed, sending the caller back to the sound list
    pub fn require(&self, action: Action) -> ServerResult<()> {
        if self.user.role.permits(action) {
            Ok(())
        } else {
            Err(ServerError::Forbidden)
        }
    }
}

#[async_trait]
impl FromRequestParts<ServerContext> for Session {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        context: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        let value = session_cookie(&parts.headers).ok_or(ServerError::Unauthenticated)?;

        let user_id = context
            .admin
            .sessions
            .verify(&value)
            .ok_or(ServerError::Unauthenticated)?;

        let user = context
            .admin
            .auth
            .identity(&user_id)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => ServerError::Unauthenticated,
                e => e.into(),
            })?;

        Ok(Self { user })
    }
}

/// A session whose user may manage other users
pub struct AdminSession(pub Session);

#[async_trait]
impl FromRequestParts<ServerContext> for AdminSession {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        context: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, context).await?;
        session.require(Action::ManageUsers)?;

        Ok(Self(session))
    }
}

/// Finds the session cookie among the request's cookies
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SessionKeys::COOKIE_NAME)
        .map(|(_, value)| value.to_string())
}

pub(crate) fn set_session_cookie(value: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SessionKeys::COOKIE_NAME,
        value
    );

    if secure {
        cookie.push_str("; Secure");
    }

    cookie
}

pub(crate) fn clear_session_cookie(secure: bool) -> String {
    format!("{}; Max-Age=0", set_session_cookie("", secure))
}

#[utoipa::path(
    get,
    path = "/login",
    tag = "auth",
    params(LoginQuery),
    responses(
        (status = 200, body = LoginPage),
        (status = 303, description = "Already logged in")
    )
)]
async fn login_page(session: Option<Session>, Query(query): Query<LoginQuery>) -> Response {
    if session.is_some() {
        return Redirect::to("/").into_response();
    }

    Json(LoginPage { email: query.email }).into_response()
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body(content = LoginSchema, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Logged in, the session cookie is set"),
        (status = 400, body = ErrorBody),
        (status = 401, body = ErrorBody)
    )
)]
async fn login(
    State(context): State<ServerContext>,
    ValidatedForm(body): ValidatedForm<LoginSchema>,
) -> ServerResult<impl IntoResponse> {
    let user = context
        .admin
        .auth
        .login(Credentials {
            email: body.email,
            password: body.password,
        })
        .await?;

    let value = context
        .admin
        .sessions
        .sign(&user.id)
        .map_err(|e| ServerError::Unknown(e.to_string()))?;

    info!("{} logged in", user.email);

    Ok((
        [(
            header::SET_COOKIE,
            set_session_cookie(&value, context.config.is_production()),
        )],
        Redirect::to("/"),
    ))
}

#[utoipa::path(
    post,
    path = "/logout",
    tag = "auth",
    responses(
        (status = 303, description = "Logged out, the session cookie is cleared")
    )
)]
async fn logout(State(context): State<ServerContext>) -> impl IntoResponse {
    (
        [(
            header::SET_COOKIE,
            clear_session_cookie(context.config.is_production()),
        )],
        Redirect::to("/login"),
    )
}

pub fn router() -> Router {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/logout", post(logout))
}

#[cfg(test)]
mod test {
    use axum::http::{header, HeaderMap, HeaderValue};

    use super::{clear_session_cookie, session_cookie, set_session_cookie};

    #[test]
    fn finds_the_session_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(
            header::COOKIE,
            HeaderValue::from_static("a=1; _session=abc.def; b=2"),
        );

        assert_eq!(session_cookie(&headers).as_deref(), Some("abc.def"));
        assert_eq!(session_cookie(&HeaderMap::new()), None);
    }

    #[test]
    fn cookies_are_only_secure_in_production() {
        assert_eq!(
            set_session_cookie("v", false),
            "_session=v; Path=/; HttpOnly; SameSite=Lax"
        );
        assert!(set_session_cookie("v", true).ends_with("; Secure"));
        assert!(clear_session_cookie(false).ends_with("Max-Age=0"));
    }
}
