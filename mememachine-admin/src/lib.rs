mod auth;
mod config;
mod db;
mod invitations;
mod notify;
mod session;
mod sounds;
mod statistics;
mod util;

use std::sync::Arc;

pub use auth::*;
pub use config::*;
pub use db::*;
pub use invitations::*;
pub use notify::*;
pub use session::*;
pub use sounds::*;
pub use statistics::*;
pub use util::{is_valid_email, is_valid_id};

/// The mememachine admin system: accounts, invitations, play statistics and sounds.
///
/// Constructed once at startup and shared by every request handler.
pub struct Admin<Db> {
    pub auth: Arc<Auth<Db>>,
    pub invitations: Invitations<Db>,
    pub statistics: Statistics<Db>,
    pub sounds: SoundLibrary,
    pub sessions: SessionKeys,
}

impl<Db> Admin<Db>
where
    Db: Database,
{
    pub fn new(
        config: &Config,
        database: Db,
        notifier: Arc<dyn InvitationNotifier>,
    ) -> std::result::Result<Self, SessionError> {
        let database = Arc::new(database);
        let auth = Arc::new(Auth::new(&database));

        Ok(Self {
            invitations: Invitations::new(&database, &auth, notifier),
            statistics: Statistics::new(&database),
            sounds: SoundLibrary::new(&config.sounds_path, config.max_upload_size),
            sessions: SessionKeys::new(&config.session_secrets)?,
            auth,
        })
    }
}
