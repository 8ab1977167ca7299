use argon2::{
    password_hash::{Error as HashError, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use log::{error, info};
use rand::rngs::OsRng;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::spawn_blocking;

use crate::{util::new_id, Database, DatabaseError, NewUser, Role, UserData};

pub struct Auth<Db> {
    db: Arc<Db>,
    argon: Argon2<'static>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Email or password is incorrect
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
    #[error("HashError: {0}")]
    HashError(String),
}

impl<Db> Auth<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self {
            db: db.clone(),
            argon: Argon2::default(),
        }
    }

    /// Checks the credentials, returning the user they belong to.
    ///
    /// An unknown email and a wrong password are indistinguishable to the caller.
    pub async fn login(&self, credentials: Credentials) -> Result<UserData, AuthError> {
        let user = self
            .db
            .user_by_email(&credentials.email)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => AuthError::InvalidCredentials,
                err => AuthError::Db(err),
            })?;

        match self
            .verify_password(&credentials.password, &user.password_hash)
            .await
        {
            Ok(true) => Ok(user),
            Ok(false) => Err(AuthError::InvalidCredentials),
            Err(e) => {
                error!("Error during password verification for user {}: {}", user.id, e);
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Resolves the identity a session refers to
    pub async fn identity(&self, user_id: &str) -> Result<UserData, DatabaseError> {
        self.db.user_by_id(user_id).await
    }

    /// Creates a user with the given role
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<UserData, AuthError> {
        let password_hash = self.hash_password(password).await?;

        self.db
            .create_user(NewUser {
                id: new_id(),
                email: email.to_string(),
                password_hash,
                role,
            })
            .await
            .map_err(AuthError::Db)
    }

    /// Creates the admin user if nobody has an account yet.
    /// Returns true if the admin was created.
    pub async fn seed_admin(&self, email: &str, password: &str) -> Result<bool, AuthError> {
        let user_count = self.db.count_users().await.map_err(AuthError::Db)?;

        if user_count != 0 {
            info!("Users already exist, not adding admin user again.");
            return Ok(false);
        }

        info!("No users in database, creating admin user...");
        self.create_user(email, password, Role::Admin).await?;
        info!("Admin user successfully created!");

        Ok(true)
    }

    /// Hashes a password into a PHC string, off the async runtime
    pub async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let argon = self.argon.clone();
        let password = password.to_string();

        spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);

            argon
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| AuthError::HashError(e.to_string()))
        })
        .await
        .map_err(|e| AuthError::HashError(e.to_string()))?
    }

    /// Returns Ok(false) on a mismatch, and an error if the stored hash is unusable
    pub async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let argon = self.argon.clone();
        let password = password.to_string();
        let hash = hash.to_string();

        spawn_blocking(move || {
            let stored = PasswordHash::new(&hash).map_err(|e| AuthError::HashError(e.to_string()))?;

            match argon.verify_password(password.as_bytes(), &stored) {
                Ok(()) => Ok(true),
                Err(HashError::Password) => Ok(false),
                Err(e) => Err(AuthError::HashError(e.to_string())),
            }
        })
        .await
        .map_err(|e| AuthError::HashError(e.to_string()))?
    }
}

pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use sqlx::query;

    use super::{Auth, AuthError, Credentials};
    use crate::{Database, Role, SqliteDatabase};

    async fn auth_with_user(email: &str, password: &str) -> (Arc<SqliteDatabase>, Auth<SqliteDatabase>) {
        let db = Arc::new(SqliteDatabase::in_memory().await.unwrap());
        let auth = Auth::new(&db);

        auth.create_user(email, password, Role::Editor).await.unwrap();

        (db, auth)
    }

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn correct_credentials_log_in() {
        let (_, auth) = auth_with_user("editor@example.com", "correct horse").await;

        let user = auth
            .login(credentials("editor@example.com", "correct horse"))
            .await
            .unwrap();

        assert_eq!(user.email, "editor@example.com");
        assert_ne!(user.password_hash, "correct horse");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let (_, auth) = auth_with_user("editor@example.com", "correct horse").await;

        let wrong_password = auth
            .login(credentials("editor@example.com", "battery staple"))
            .await
            .unwrap_err();
        let unknown_email = auth
            .login(credentials("nobody@example.com", "correct horse"))
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn corrupted_hashes_never_log_in() {
        let db = Arc::new(SqliteDatabase::in_memory().await.unwrap());
        let auth = Auth::new(&db);

        query("INSERT INTO users (id, email, password_hash, role) VALUES ('1', 'broken@example.com', 'not-a-phc-string', 'editor')")
            .execute(db.pool())
            .await
            .unwrap();

        let result = auth
            .login(credentials("broken@example.com", "not-a-phc-string"))
            .await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn admin_is_only_seeded_into_an_empty_database() {
        let db = Arc::new(SqliteDatabase::in_memory().await.unwrap());
        let auth = Auth::new(&db);

        assert!(auth.seed_admin("Admin@Example.com", "hunter22").await.unwrap());
        assert!(!auth.seed_admin("other@example.com", "hunter22").await.unwrap());

        let users = db.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "admin@example.com");
        assert_eq!(users[0].role, Role::Admin);
    }
}
