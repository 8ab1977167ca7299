use std::sync::Arc;

use colored::Colorize;
use log::{error, info};
use mememachine_admin::{
    Admin, AuthError, Config, ConfigError, DatabaseError, LogNotifier, NotifyError,
    SessionError, SoundError, SqliteDatabase,
};
use mememachine_server::{run_server, RunServerError, ServerContext};
use thiserror::Error;
use tokio::runtime::{self, Runtime};

mod logging;

/// The dashboard process: configuration, database and server, set up once
struct Mememachine {
    context: ServerContext,
    runtime: Runtime,
}

#[derive(Debug, Error)]
enum MememachineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not initialize database: {0}")]
    Database(#[from] DatabaseError),

    #[error("Could not set up sessions: {0}")]
    Session(#[from] SessionError),

    #[error("Could not set up invitations: {0}")]
    Notify(#[from] NotifyError),

    #[error("Could not create the admin user: {0}")]
    Auth(#[from] AuthError),

    #[error("Could not prepare the sound directory: {0}")]
    Sounds(#[from] SoundError),

    #[error("Server stopped: {0}")]
    Server(#[from] RunServerError),

    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl Mememachine {
    fn new() -> Result<Self, MememachineError> {
        info!("Loading configuration...");
        let config = Config::from_env()?;

        info!("Building async runtime...");
        let runtime = runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("mememachine-async")
            .build()
            .map_err(|e| MememachineError::Fatal(e.to_string()))?;

        info!("Opening database at {}...", config.database_path);
        let database = runtime.block_on(SqliteDatabase::new(&config.database_path))?;

        let notifier = Arc::new(LogNotifier::new(&config.public_url)?);
        let admin = Admin::new(&config, database, notifier)?;

        runtime.block_on(async {
            admin.sounds.prepare().await?;
            admin
                .auth
                .seed_admin(&config.admin_email, &config.admin_password)
                .await?;

            Ok::<_, MememachineError>(())
        })?;

        Ok(Self {
            context: ServerContext::new(admin, config),
            runtime,
        })
    }

    fn run(&self) -> Result<(), MememachineError> {
        self.runtime
            .block_on(run_server(self.context.clone()))
            .map_err(Into::into)
    }
}

impl MememachineError {
    fn hint(&self) -> String {
        match self {
            MememachineError::Config(_) => "Check the environment variables. DATABASE_PATH, SESSION_SECRET, ADMIN_EMAIL and ADMIN_PASSWORD are required.".to_string(),
            MememachineError::Database(_) => "This is a database error. Make sure DATABASE_PATH points to a writable location, then try again.".to_string(),
            MememachineError::Session(_) => "SESSION_SECRET must contain at least one non-empty secret.".to_string(),
            MememachineError::Notify(_) => "PUBLIC_URL must be an absolute url, like https://memes.example.com.".to_string(),
            MememachineError::Auth(_) => "The admin user could not be created. Check ADMIN_EMAIL and ADMIN_PASSWORD.".to_string(),
            MememachineError::Sounds(_) => "Make sure SOUNDS_PATH points to a directory that can be written to.".to_string(),
            MememachineError::Server(_) => "Make sure MEMEMACHINE_PORT is free and PUBLIC_URL is a valid url.".to_string(),
            MememachineError::Fatal(_) => "This error is fatal, and should not happen.".to_string(),
        }
    }
}

fn main() {
    logging::init_logger();

    let result = Mememachine::new().and_then(|mememachine| {
        info!("Initialized successfully.");
        mememachine.run()
    });

    if let Err(error) = result {
        error!("{} Read the error below to troubleshoot the issue. If you think this might be a bug, please report it by making a GitHub issue.", "Mememachine failed!".bold().red());
        error!("{}", error);
        error!("{}", format!("Hint: {}", error.hint()).dimmed().italic());

        std::process::exit(1);
    }
}
