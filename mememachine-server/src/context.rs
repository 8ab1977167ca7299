use std::sync::Arc;

use axum::extract::FromRef;
use mememachine_admin::{Admin, Config, SqliteDatabase};

/// State shared by every handler, constructed once at startup
#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub admin: Arc<Admin<SqliteDatabase>>,
    pub config: Arc<Config>,
    /// Used by the health check to reach the server itself
    pub http: reqwest::Client,
}

impl ServerContext {
    pub fn new(admin: Admin<SqliteDatabase>, config: Config) -> Self {
        Self {
            admin: Arc::new(admin),
            config: Arc::new(config),
            http: reqwest::Client::new(),
        }
    }
}
