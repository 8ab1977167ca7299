use async_trait::async_trait;
use thiserror::Error;

use crate::InvitationNotifier;

mod data;
pub use data::*;

mod sqlite;
pub use sqlite::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    /// Turns a unique index violation into a conflict error
    fn conflict_or(self, resource: &'static str, field: &'static str, value: &str)
        -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(e) => match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => Ok(()),
                e => Err(e),
            },
        }
    }
}

/// Represents a type that can store and fetch dashboard data
#[async_trait]
pub trait Database: Send + Sync {
    async fn count_users(&self) -> Result<i64>;
    async fn user_by_id(&self, user_id: &str) -> Result<UserData>;
    /// Looks up a user by the exact stored (lowercased) email
    async fn user_by_email(&self, email: &str) -> Result<UserData>;
    async fn list_users(&self) -> Result<Vec<UserData>>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;

    async fn invitation_by_id(&self, invitation_id: &str) -> Result<InvitationData>;
    async fn list_invitations(&self) -> Result<Vec<InvitationData>>;
    /// Creates the invitation and dispatches its notification as a single unit.
    /// If the notifier fails, no invitation is left behind.
    async fn create_invitation(
        &self,
        new_invitation: NewInvitation,
        notifier: &dyn InvitationNotifier,
    ) -> Result<InvitationData>;
    /// Returns the number of deleted rows
    async fn delete_invitation(&self, invitation_id: &str) -> Result<u64>;
    /// Creates an editor from the invitation and consumes it, atomically
    async fn accept_invitation(&self, acceptance: InvitationAcceptance) -> Result<UserData>;

    async fn record_play(&self, new_play: NewPlay) -> Result<()>;
    async fn play_counts(&self, filter: PlayFilter) -> Result<Vec<PlayCount>>;
}

#[derive(Debug)]
pub struct NewUser {
    pub id: PrimaryKey,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug)]
pub struct NewInvitation {
    pub id: PrimaryKey,
    pub email: String,
}

#[derive(Debug)]
pub struct InvitationAcceptance {
    /// The invitation id from the registration link
    pub token: String,
    /// The id of the user that will be created
    pub user_id: PrimaryKey,
    pub password_hash: String,
}

#[derive(Debug)]
pub struct NewPlay {
    pub sound_name: String,
    pub is_random: bool,
}
