use std::borrow::Cow;

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Form,
};
use mememachine_admin::{is_valid_email, is_valid_id};
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::errors::ServerError;

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct LoginSchema {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct RegisterSchema {
    #[validate(length(min = 1, message = "Missing registration token"))]
    pub token: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct DeleteSoundSchema {
    #[validate(length(min = 1, message = "Missing sound name"))]
    pub file: String,
}

/// The multipart body of an upload, `sound` may be repeated
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadSchema {
    #[schema(value_type = String, format = Binary)]
    sound: Vec<u8>,
}

/// The user management form, dispatched on its `intent` field
#[derive(Debug, ToSchema, Deserialize)]
#[serde(tag = "intent", rename_all = "kebab-case")]
pub enum UsersActionSchema {
    CreateInvitation { email: String },
    ResendInvitation { id: String },
    DeleteInvitation { id: String },
}

impl Validate for UsersActionSchema {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        match self {
            Self::CreateInvitation { email } => {
                if !is_valid_email(email.trim()) {
                    errors.add("email", invalid("email", "Invalid email"));
                }
            }
            Self::ResendInvitation { id } | Self::DeleteInvitation { id } => {
                if !is_valid_id(id) {
                    errors.add("id", invalid("id", "Invalid invitation"));
                }
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));

    error
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// The page of sounds to show, starting at 1
    pub page: Option<usize>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoginQuery {
    /// Prefills the login form after registering
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RegisterQuery {
    /// The invitation id from the registration link
    pub token: Option<String>,
}

/// A url-encoded form body that has passed its validation rules
pub struct ValidatedForm<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(form) = Form::<T>::from_request(req, state)
            .await
            .map_err(|e| ServerError::Malformed(e.body_text()))?;

        form.validate()?;

        Ok(Self(form))
    }
}
