use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use log::error;
use mememachine_admin::{AuthError, DatabaseError, InvitationError, SoundError};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

pub type ServerResult<T> = Result<T, ServerError>;

/// Messages keyed by the form field they belong to
pub type FieldErrors = BTreeMap<String, String>;

/// Key used for errors that don't belong to a single field
pub const ROOT_FIELD: &str = "root";

#[derive(Debug, Error)]
pub enum ServerError {
    /// No valid session, the caller is sent to the login page
    #[error("Not logged in")]
    Unauthenticated,
    /// The caller's role doesn't permit the action
    #[error("Not allowed")]
    Forbidden,
    #[error("Invalid input")]
    Validation(FieldErrors),
    #[error("{field}: {message}")]
    Conflict {
        field: &'static str,
        message: String,
    },
    #[error("Incorrect email or password. Please try again.")]
    InvalidCredentials,
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    TooLarge(String),
    #[error("Malformed request: {0}")]
    Malformed(String),
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

/// The body sent along with every failed request
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    errors: FieldErrors,
}

impl ServerError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::from([(field.to_string(), message.into())]))
    }

    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::Forbidden => StatusCode::SEE_OTHER,
            Self::Validation(_) | Self::Malformed(_) => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_body(self) -> ErrorBody {
        let (message, errors) = match self {
            Self::Validation(errors) => (None, errors),
            Self::Conflict { field, message } => {
                (None, FieldErrors::from([(field.to_string(), message)]))
            }
            Self::InvalidCredentials => (
                None,
                FieldErrors::from([(
                    ROOT_FIELD.to_string(),
                    ServerError::InvalidCredentials.to_string(),
                )]),
            ),
            Self::Unknown(_) => (None, FieldErrors::new()),
            e => (Some(e.to_string()), FieldErrors::new()),
        };

        ErrorBody {
            success: false,
            message,
            errors,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => return Redirect::to("/login").into_response(),
            Self::Forbidden => return Redirect::to("/").into_response(),
            Self::Unknown(ref details) => error!("Request failed: {}", details),
            _ => {}
        }

        (self.as_status_code(), Json(self.into_body())).into_response()
    }
}

impl From<ValidationErrors> for ServerError {
    fn from(value: ValidationErrors) -> Self {
        let errors = value
            .field_errors()
            .into_iter()
            .filter_map(|(field, errors)| {
                let message = errors.first()?.message.as_ref().map(|m| m.to_string());
                Some((field.to_string(), message.unwrap_or_else(|| format!("Invalid {field}"))))
            })
            .collect();

        Self::Validation(errors)
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::Db(e) => e.into(),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound { resource, .. } => Self::NotFound(resource.to_string()),
            DatabaseError::Conflict { field, .. } => Self::Conflict {
                field,
                message: "Already exists".to_string(),
            },
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<InvitationError> for ServerError {
    fn from(value: InvitationError) -> Self {
        match value {
            InvitationError::Validation { field, message } => Self::field(field, message),
            InvitationError::Conflict { field, message } => Self::Conflict { field, message },
            InvitationError::NotFound(id) => Self::NotFound(format!("Invitation {id}")),
            InvitationError::InvalidToken => Self::NotFound("Invitation".to_string()),
            InvitationError::Infrastructure(e) => Self::Unknown(e),
        }
    }
}

impl From<SoundError> for ServerError {
    fn from(value: SoundError) -> Self {
        match value {
            SoundError::TooLarge { .. } => Self::TooLarge(value.to_string()),
            SoundError::InvalidName(_) | SoundError::UnsupportedType(_) => {
                Self::field("sound", value.to_string())
            }
            SoundError::Io(e) => Self::Unknown(e.to_string()),
        }
    }
}
