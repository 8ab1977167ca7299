use std::sync::Arc;

use log::{error, info};
use thiserror::Error;

use crate::{
    auth::Auth,
    util::{is_valid_email, new_id},
    AuthError, Database, DatabaseError, InvitationAcceptance, InvitationData, InvitationNotifier,
    NewInvitation, UserData,
};

/// Minimum length of a password chosen during registration
pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Error)]
pub enum InvitationError {
    /// The input is malformed
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    /// The email is already taken by a user or another invitation
    #[error("{field}: {message}")]
    Conflict {
        field: &'static str,
        message: String,
    },
    #[error("Invitation {0} does not exist")]
    NotFound(String),
    /// The registration token does not refer to a pending invitation
    #[error("The registration link is invalid or has expired")]
    InvalidToken,
    /// Database or notifier failure, details are only logged
    #[error("{0}")]
    Infrastructure(String),
}

impl InvitationError {
    fn infrastructure(context: &str, error: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, error);
        Self::Infrastructure(format!("{context}: {error}"))
    }
}

/// Everything shown on the user management page
#[derive(Debug)]
pub struct UsersOverview {
    pub users: Vec<UserData>,
    pub invitations: Vec<InvitationData>,
}

/// Creates, resends, revokes and redeems invitations
pub struct Invitations<Db> {
    db: Arc<Db>,
    auth: Arc<Auth<Db>>,
    notifier: Arc<dyn InvitationNotifier>,
}

impl<Db> Invitations<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>, auth: &Arc<Auth<Db>>, notifier: Arc<dyn InvitationNotifier>) -> Self {
        Self {
            db: db.clone(),
            auth: auth.clone(),
            notifier,
        }
    }

    /// Invites a new editor and sends them the registration link
    pub async fn create(&self, email: &str) -> Result<InvitationData, InvitationError> {
        let email = email.trim().to_lowercase();

        if !is_valid_email(&email) {
            return Err(InvitationError::Validation {
                field: "email",
                message: "Invalid email".to_string(),
            });
        }

        let invitation = self
            .db
            .create_invitation(
                NewInvitation {
                    id: new_id(),
                    email,
                },
                self.notifier.as_ref(),
            )
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict { resource, .. } => conflict(resource),
                e => InvitationError::infrastructure("Failed to create invitation", e),
            })?;

        info!("Created invitation {} for {}", invitation.id, invitation.email);
        Ok(invitation)
    }

    /// Sends the registration link again, leaving the invitation untouched
    pub async fn resend(&self, invitation_id: &str) -> Result<(), InvitationError> {
        let invitation = self
            .db
            .invitation_by_id(invitation_id)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => {
                    InvitationError::NotFound(invitation_id.to_string())
                }
                e => InvitationError::infrastructure("Failed to look up invitation", e),
            })?;

        self.notifier
            .notify(&invitation)
            .await
            .map_err(|e| InvitationError::infrastructure("Failed to resend invitation", e))
    }

    /// Revokes an invitation. Revoking one that doesn't exist is not an error.
    pub async fn delete(&self, invitation_id: &str) -> Result<(), InvitationError> {
        let deleted = self
            .db
            .delete_invitation(invitation_id)
            .await
            .map_err(|e| InvitationError::infrastructure("Failed to delete invitation", e))?;

        if deleted > 0 {
            info!("Revoked invitation {}", invitation_id);
        }

        Ok(())
    }

    /// Returns the invitation a registration token refers to
    pub async fn pending(&self, token: &str) -> Result<InvitationData, InvitationError> {
        self.db.invitation_by_id(token).await.map_err(|e| match e {
            DatabaseError::NotFound { .. } => InvitationError::InvalidToken,
            e => InvitationError::infrastructure("Failed to look up invitation", e),
        })
    }

    /// Registers the invitee as an editor, consuming the invitation
    pub async fn accept(&self, token: &str, password: &str) -> Result<UserData, InvitationError> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(InvitationError::Validation {
                field: "password",
                message: format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
            });
        }

        let password_hash = self
            .auth
            .hash_password(password)
            .await
            .map_err(|e: AuthError| InvitationError::infrastructure("Failed to hash password", e))?;

        let user = self
            .db
            .accept_invitation(InvitationAcceptance {
                token: token.to_string(),
                user_id: new_id(),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => InvitationError::InvalidToken,
                DatabaseError::Conflict { resource, .. } => conflict(resource),
                e => InvitationError::infrastructure("Failed to accept invitation", e),
            })?;

        info!("{} registered through invitation {}", user.email, token);
        Ok(user)
    }

    pub async fn overview(&self) -> Result<UsersOverview, InvitationError> {
        let (users, invitations) = tokio::try_join!(self.db.list_users(), self.db.list_invitations())
            .map_err(|e| InvitationError::infrastructure("Failed to list users", e))?;

        Ok(UsersOverview { users, invitations })
    }
}

fn conflict(resource: &str) -> InvitationError {
    let message = match resource {
        "user" => "User already exists",
        _ => "Invitation already exists",
    };

    InvitationError::Conflict {
        field: "email",
        message: message.to_string(),
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use async_trait::async_trait;

    use super::{InvitationError, Invitations};
    use crate::{
        auth::Auth, Credentials, Database, InvitationData, InvitationNotifier, NotifyError, Role,
        SqliteDatabase,
    };

    #[derive(Default)]
    struct CountingNotifier {
        sent: AtomicUsize,
    }

    #[async_trait]
    impl InvitationNotifier for CountingNotifier {
        async fn notify(&self, _invitation: &InvitationData) -> Result<(), NotifyError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl InvitationNotifier for FailingNotifier {
        async fn notify(&self, _invitation: &InvitationData) -> Result<(), NotifyError> {
            Err(NotifyError::Delivery("mail server is down".to_string()))
        }
    }

    struct Setup {
        db: Arc<SqliteDatabase>,
        auth: Arc<Auth<SqliteDatabase>>,
        invitations: Invitations<SqliteDatabase>,
    }

    async fn setup(notifier: Arc<dyn InvitationNotifier>) -> Setup {
        let db = Arc::new(SqliteDatabase::in_memory().await.unwrap());
        let auth = Arc::new(Auth::new(&db));
        let invitations = Invitations::new(&db, &auth, notifier);

        Setup {
            db,
            auth,
            invitations,
        }
    }

    fn conflict_message(error: InvitationError) -> String {
        match error {
            InvitationError::Conflict { field, message } => {
                assert_eq!(field, "email");
                message
            }
            e => panic!("expected a conflict, got {e:?}"),
        }
    }

    #[tokio::test]
    async fn inviting_the_same_email_twice_conflicts() {
        let notifier = Arc::new(CountingNotifier::default());
        let setup = setup(notifier.clone()).await;

        setup.invitations.create("honk@example.com").await.unwrap();
        let second = setup
            .invitations
            .create("HONK@example.com")
            .await
            .unwrap_err();

        assert_eq!(conflict_message(second), "Invitation already exists");
        assert_eq!(setup.db.list_invitations().await.unwrap().len(), 1);
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn existing_users_cannot_be_invited_in_any_case() {
        let setup = setup(Arc::new(CountingNotifier::default())).await;

        setup
            .auth
            .create_user("boom@example.com", "hunter22", Role::Admin)
            .await
            .unwrap();

        for email in ["boom@example.com", "Boom@Example.COM"] {
            let error = setup.invitations.create(email).await.unwrap_err();
            assert_eq!(conflict_message(error), "User already exists");
        }

        assert!(setup.db.list_invitations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_emails_are_rejected() {
        let setup = setup(Arc::new(CountingNotifier::default())).await;

        let error = setup.invitations.create("not an email").await.unwrap_err();
        assert!(matches!(
            error,
            InvitationError::Validation { field: "email", .. }
        ));
    }

    #[tokio::test]
    async fn accepting_twice_only_creates_one_user() {
        let setup = setup(Arc::new(CountingNotifier::default())).await;
        let invitation = setup.invitations.create("Zap@Example.com").await.unwrap();

        let user = setup
            .invitations
            .accept(&invitation.id, "long enough")
            .await
            .unwrap();
        assert_eq!(user.email, "zap@example.com");
        assert_eq!(user.role, Role::Editor);

        let again = setup.invitations.accept(&invitation.id, "long enough").await;
        assert!(matches!(again, Err(InvitationError::InvalidToken)));

        assert_eq!(setup.db.count_users().await.unwrap(), 1);
        assert!(setup.db.list_invitations().await.unwrap().is_empty());

        let logged_in = setup
            .auth
            .login(Credentials {
                email: "zap@example.com".to_string(),
                password: "long enough".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn short_registration_passwords_are_rejected() {
        let setup = setup(Arc::new(CountingNotifier::default())).await;
        let invitation = setup.invitations.create("zap@example.com").await.unwrap();

        let result = setup.invitations.accept(&invitation.id, "short").await;

        assert!(matches!(
            result,
            Err(InvitationError::Validation {
                field: "password",
                ..
            })
        ));
        assert!(setup.invitations.pending(&invitation.id).await.is_ok());
    }

    #[tokio::test]
    async fn deleting_is_idempotent() {
        let setup = setup(Arc::new(CountingNotifier::default())).await;
        let invitation = setup.invitations.create("zap@example.com").await.unwrap();

        setup.invitations.delete(&invitation.id).await.unwrap();
        setup.invitations.delete(&invitation.id).await.unwrap();
        setup.invitations.delete("never-existed").await.unwrap();

        assert!(matches!(
            setup.invitations.pending(&invitation.id).await,
            Err(InvitationError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn resending_notifies_without_touching_the_invitation() {
        let notifier = Arc::new(CountingNotifier::default());
        let setup = setup(notifier.clone()).await;
        let invitation = setup.invitations.create("zap@example.com").await.unwrap();

        setup.invitations.resend(&invitation.id).await.unwrap();

        let stored = setup.invitations.pending(&invitation.id).await.unwrap();
        assert_eq!(stored.updated_at, invitation.updated_at);
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 2);

        assert!(matches!(
            setup.invitations.resend("missing").await,
            Err(InvitationError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn failed_notifications_leave_no_invitation_behind() {
        let setup = setup(Arc::new(FailingNotifier)).await;

        let result = setup.invitations.create("zap@example.com").await;

        assert!(matches!(result, Err(InvitationError::Infrastructure(_))));
        assert!(setup.db.list_invitations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn overview_lists_users_and_invitations() {
        let setup = setup(Arc::new(CountingNotifier::default())).await;

        setup
            .auth
            .create_user("admin@example.com", "hunter22", Role::Admin)
            .await
            .unwrap();
        setup.invitations.create("first@example.com").await.unwrap();
        setup.invitations.create("second@example.com").await.unwrap();

        let overview = setup.invitations.overview().await.unwrap();
        let mut emails: Vec<_> = overview.invitations.iter().map(|i| i.email.as_str()).collect();
        emails.sort();

        assert_eq!(overview.users.len(), 1);
        assert_eq!(emails, vec!["first@example.com", "second@example.com"]);
    }
}
