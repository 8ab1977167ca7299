use chrono::NaiveDateTime;
use sqlx::FromRow;

/// The type used for primary keys in the database.
/// Keys are time-ordered UUIDs stored as text, so they sort by creation.
pub type PrimaryKey = String;

/// What a user is allowed to do on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including user management
    Admin,
    /// Created through an invitation, can browse and upload sounds
    Editor,
}

/// Something a [Role] may or may not be permitted to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewSounds,
    UploadSounds,
    DeleteSounds,
    ManageUsers,
}

impl Role {
    pub fn permits(&self, action: Action) -> bool {
        match action {
            Action::ViewSounds | Action::UploadSounds => true,
            Action::DeleteSounds | Action::ManageUsers => matches!(self, Role::Admin),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
        }
    }
}

/// A dashboard account
#[derive(Debug, Clone, FromRow)]
pub struct UserData {
    pub id: PrimaryKey,
    /// Always stored lowercased
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A pending invitation to create an editor account.
/// The id doubles as the single-use registration token.
#[derive(Debug, Clone, FromRow)]
pub struct InvitationData {
    pub id: PrimaryKey,
    pub email: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// The number of times a sound has been played
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PlayCount {
    pub sound_name: String,
    pub plays: i64,
}

/// Which play events to count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayFilter {
    /// Every recorded play
    All,
    /// Plays picked by the random command
    Random,
    /// Plays explicitly requested by name
    Dedicated,
}

impl PlayFilter {
    pub(crate) fn condition(&self) -> &'static str {
        match self {
            PlayFilter::All => "",
            PlayFilter::Random => "WHERE is_random = 1",
            PlayFilter::Dedicated => "WHERE is_random = 0",
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Action, Role};

    #[test]
    fn only_admins_manage_users_and_delete_sounds() {
        assert!(Role::Admin.permits(Action::ManageUsers));
        assert!(Role::Admin.permits(Action::DeleteSounds));

        assert!(!Role::Editor.permits(Action::ManageUsers));
        assert!(!Role::Editor.permits(Action::DeleteSounds));
        assert!(Role::Editor.permits(Action::UploadSounds));
        assert!(Role::Editor.permits(Action::ViewSounds));
    }
}
