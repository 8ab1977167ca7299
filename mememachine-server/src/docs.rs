use axum::{response::IntoResponse, routing::get, Json};
use mememachine_admin::SessionKeys;
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

use crate::{
    errors::ErrorBody,
    schemas::{DeleteSoundSchema, LoginSchema, RegisterSchema, UploadSchema, UsersActionSchema},
    serialized::{
        Health, Invitation, LoginPage, PlayCount, RegisterPage, SoundsPage, StatisticsPage,
        Success, Uploaded, User, UsersPage,
    },
    Router,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::auth::login_page,
        crate::auth::login,
        crate::auth::logout,
        crate::register::register_page,
        crate::register::register,
        crate::sounds::list_sounds,
        crate::sounds::delete_sound,
        crate::sounds::upload_sounds,
        crate::users::list_users,
        crate::users::manage_invitations,
        crate::statistics::dashboard,
        crate::health::healthcheck,
    ),
    components(schemas(
        ErrorBody,
        LoginSchema,
        RegisterSchema,
        DeleteSoundSchema,
        UploadSchema,
        UsersActionSchema,
        User,
        Invitation,
        UsersPage,
        SoundsPage,
        PlayCount,
        StatisticsPage,
        LoginPage,
        RegisterPage,
        Success,
        Uploaded,
        Health,
    )),
    modifiers(&Security),
    info(
        description = "The mememachine dashboard manages the soundboard's sounds and users"
    )
)]
pub struct ApiDoc;

struct Security;

impl Modify for Security {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            let scheme = ApiKey::Cookie(ApiKeyValue::new(SessionKeys::COOKIE_NAME));

            components.add_security_scheme("SessionCookie", SecurityScheme::ApiKey(scheme))
        }
    }
}

async fn docs() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

pub fn router() -> Router {
    Router::new().route("/api.json", get(docs))
}
