use std::str::FromStr;

use async_trait::async_trait;
use log::warn;
use sqlx::{
    pool::PoolConnection,
    query, query_as, query_scalar,
    sqlite::{
        SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    },
    Error as SqlxError, Sqlite,
};

use crate::{
    Database, DatabaseError, DatabaseResult, IntoDatabaseError, InvitationAcceptance,
    InvitationData, InvitationNotifier, NewInvitation, NewPlay, NewUser, PlayCount, PlayFilter,
    Result, Role, UserData,
};

/// An SQLite database implementation for the dashboard.
/// The bot writes play events into the same file.
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Opens (or creates) the database file and runs pending migrations
    pub async fn new(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| e.any())?;

        let database = Self { pool };
        database.migrate().await?;

        Ok(database)
    }

    /// A private database that lives as long as the returned value.
    /// It is limited to a single connection, since every connection
    /// to `:memory:` opens its own database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| e.any())?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| e.any())?;

        let database = Self { pool };
        database.migrate().await?;

        Ok(database)
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn count_users(&self) -> Result<i64> {
        query_scalar("SELECT count(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn user_by_id(&self, user_id: &str) -> Result<UserData> {
        query_as("SELECT * FROM users WHERE id = ?1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "id"))
    }

    async fn user_by_email(&self, email: &str) -> Result<UserData> {
        query_as("SELECT * FROM users WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "email"))
    }

    async fn list_users(&self) -> Result<Vec<UserData>> {
        query_as("SELECT * FROM users ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        let email = new_user.email.to_lowercase();

        query("SELECT id FROM users WHERE lower(email) = ?1")
            .bind(&email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "email"))
            .conflict_or_ok("user", "email", &email)?;

        query_as(
            "INSERT INTO users (id, email, password_hash, role) VALUES (?1, ?2, ?3, ?4) RETURNING *",
        )
        .bind(&new_user.id)
        .bind(&email)
        .bind(&new_user.password_hash)
        .bind(new_user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.conflict_or("user", "email", &email))
    }

    async fn invitation_by_id(&self, invitation_id: &str) -> Result<InvitationData> {
        query_as("SELECT * FROM invitations WHERE id = ?1")
            .bind(invitation_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("invitation", "id"))
    }

    async fn list_invitations(&self) -> Result<Vec<InvitationData>> {
        query_as("SELECT * FROM invitations ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn create_invitation(
        &self,
        new_invitation: NewInvitation,
        notifier: &dyn InvitationNotifier,
    ) -> Result<InvitationData> {
        let mut tx = WriteTransaction::begin(&self.pool).await?;
        let result = insert_invitation(tx.conn()?, new_invitation, notifier).await;

        // Rolling back also discards the insert when the notifier fails
        tx.finish(result).await
    }

    async fn delete_invitation(&self, invitation_id: &str) -> Result<u64> {
        query("DELETE FROM invitations WHERE id = ?1")
            .bind(invitation_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|r| r.rows_affected())
    }

    async fn accept_invitation(&self, acceptance: InvitationAcceptance) -> Result<UserData> {
        let mut tx = WriteTransaction::begin(&self.pool).await?;
        let result = redeem_invitation(tx.conn()?, acceptance).await;

        tx.finish(result).await
    }

    async fn record_play(&self, new_play: NewPlay) -> Result<()> {
        query("INSERT INTO sound_plays (sound_name, is_random) VALUES (?1, ?2)")
            .bind(&new_play.sound_name)
            .bind(new_play.is_random)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn play_counts(&self, filter: PlayFilter) -> Result<Vec<PlayCount>> {
        let sql = format!(
            "SELECT sound_name, count(*) AS plays FROM sound_plays {} GROUP BY sound_name ORDER BY sound_name ASC",
            filter.condition()
        );

        query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())
    }
}

/// A transaction holding SQLite's write lock from the start.
///
/// Deferred transactions that read before writing fail with `SQLITE_BUSY`
/// when another writer commits first. `BEGIN IMMEDIATE` makes concurrent
/// writers wait on the busy timeout instead, so their checks see the
/// committed rows.
struct WriteTransaction {
    conn: Option<PoolConnection<Sqlite>>,
}

impl WriteTransaction {
    async fn begin(pool: &SqlitePool) -> Result<Self> {
        let mut conn = pool.acquire().await.map_err(|e| e.any())?;

        query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .map_err(|e| e.any())?;

        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> Result<&mut SqliteConnection> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| DatabaseError::Internal("Transaction is already finished".into()))
    }

    /// Commits if the work succeeded, rolls back otherwise
    async fn finish<T>(mut self, result: Result<T>) -> Result<T> {
        let statement = if result.is_ok() { "COMMIT" } else { "ROLLBACK" };
        let outcome = query(statement).execute(self.conn()?).await;

        match outcome {
            Ok(_) => {
                self.conn = None;
                result
            }
            Err(e) if result.is_ok() => Err(e.any()),
            Err(e) => {
                warn!("Could not roll back transaction: {}", e);
                result
            }
        }
    }
}

impl Drop for WriteTransaction {
    fn drop(&mut self) {
        // Closing the connection makes SQLite discard the unfinished transaction
        if let Some(conn) = self.conn.take() {
            drop(conn.detach());
        }
    }
}

async fn insert_invitation(
    conn: &mut SqliteConnection,
    new_invitation: NewInvitation,
    notifier: &dyn InvitationNotifier,
) -> Result<InvitationData> {
    let email = new_invitation.email.to_lowercase();

    // An invitee must not already have an account
    query("SELECT id FROM users WHERE lower(email) = ?1")
        .bind(&email)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| e.not_found_or("user", "email"))
        .conflict_or_ok("user", "email", &email)?;

    query("SELECT id FROM invitations WHERE lower(email) = ?1")
        .bind(&email)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| e.not_found_or("invitation", "email"))
        .conflict_or_ok("invitation", "email", &email)?;

    let invitation: InvitationData =
        query_as("INSERT INTO invitations (id, email) VALUES (?1, ?2) RETURNING *")
            .bind(&new_invitation.id)
            .bind(&email)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| e.conflict_or("invitation", "email", &email))?;

    notifier
        .notify(&invitation)
        .await
        .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

    Ok(invitation)
}

async fn redeem_invitation(
    conn: &mut SqliteConnection,
    acceptance: InvitationAcceptance,
) -> Result<UserData> {
    let invitation: InvitationData = query_as("SELECT * FROM invitations WHERE id = ?1")
        .bind(&acceptance.token)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| e.not_found_or("invitation", "token"))?;

    let user: UserData = query_as(
        "INSERT INTO users (id, email, password_hash, role) VALUES (?1, ?2, ?3, ?4) RETURNING *",
    )
    .bind(&acceptance.user_id)
    .bind(&invitation.email)
    .bind(&acceptance.password_hash)
    .bind(Role::Editor)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| e.conflict_or("user", "email", &invitation.email))?;

    query("DELETE FROM invitations WHERE id = ?1")
        .bind(&invitation.id)
        .execute(&mut *conn)
        .await
        .map_err(|e| e.any())?;

    Ok(user)
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }

    fn conflict_or(self, resource: &'static str, field: &'static str, value: &str) -> DatabaseError {
        match self {
            SqlxError::Database(e) if e.is_unique_violation() => DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            },
            e => Self::any(e),
        }
    }
}
