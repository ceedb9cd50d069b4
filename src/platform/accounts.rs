use async_trait::async_trait;
use rand::Rng;
use rusqlite::{params, OptionalExtension};

use super::{timestamp_now, unique_id, AccountService, PlatformError, PlatformResult};
use crate::db::models::{Account, Session};
use crate::state::DbPool;

const MIN_PASSWORD_LEN: usize = 8;

/// Accounts with bcrypt password hashes and random session secrets.
pub struct SqliteAccountService {
    pool: DbPool,
    session_hours: u64,
    bcrypt_cost: u32,
}

impl SqliteAccountService {
    pub fn new(pool: DbPool, session_hours: u64, bcrypt_cost: u32) -> Self {
        Self {
            pool,
            session_hours,
            bcrypt_cost,
        }
    }
}

/// Generate a cryptographically random 32-byte hex token.
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

fn validate_email(email: &str) -> PlatformResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(PlatformError::Invalid(format!("invalid email: {}", email)))
    }
}

#[async_trait]
impl AccountService for SqliteAccountService {
    async fn create(
        &self,
        account_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> PlatformResult<Account> {
        if account_id.is_empty() {
            return Err(PlatformError::Invalid("account id is required".into()));
        }
        validate_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PlatformError::Invalid(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let email = email.trim().to_lowercase();
        let password = password.to_string();
        let cost = self.bcrypt_cost;
        let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| PlatformError::Unavailable(format!("password hashing task: {}", e)))?
            .map_err(|e| PlatformError::Unavailable(format!("password hashing failed: {}", e)))?;
        let created_at = timestamp_now();

        let conn = self.pool.get()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO accounts (id, email, name, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![account_id, email, name, password_hash, created_at],
        )?;

        if inserted == 0 {
            return Err(PlatformError::Conflict(
                "an account with the same id or email already exists".into(),
            ));
        }

        tracing::info!("Created account {}", account_id);
        Ok(Account {
            id: account_id.to_string(),
            email,
            name: name.to_string(),
            created_at,
        })
    }

    async fn create_email_password_session(
        &self,
        email: &str,
        password: &str,
    ) -> PlatformResult<Session> {
        let email = email.trim().to_lowercase();

        let row: Option<(String, String)> = self
            .pool
            .get()?
            .query_row(
                "SELECT id, password_hash FROM accounts WHERE email = ?1",
                params![email],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (account_id, password_hash) = match row {
            Some(row) => row,
            None => return Err(PlatformError::Unauthorized("invalid credentials".into())),
        };

        let password = password.to_string();
        let verified =
            tokio::task::spawn_blocking(move || bcrypt::verify(password, &password_hash))
                .await
                .map_err(|e| {
                    PlatformError::Unavailable(format!("password check task failed: {}", e))
                })?
                .unwrap_or(false);
        if !verified {
            return Err(PlatformError::Unauthorized("invalid credentials".into()));
        }

        let session = Session {
            id: unique_id(),
            account_id,
            secret: generate_token(),
            expires_at: (chrono::Utc::now() + chrono::Duration::hours(self.session_hours as i64))
                .to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
        };

        self.pool.get()?.execute(
            "INSERT INTO sessions (id, account_id, token, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.id,
                session.account_id,
                session.secret,
                session.expires_at,
                timestamp_now()
            ],
        )?;

        Ok(session)
    }

    async fn get(&self, session_secret: &str) -> PlatformResult<Account> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT a.id, a.email, a.name, a.created_at FROM sessions s
             JOIN accounts a ON a.id = s.account_id
             WHERE s.token = ?1 AND s.expires_at > ?2",
            params![session_secret, timestamp_now()],
            |row| {
                Ok(Account {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    name: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| PlatformError::Unauthorized("no active session".into()))
    }

    async fn delete_session(&self, session_secret: &str) -> PlatformResult<()> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "DELETE FROM sessions WHERE token = ?1",
            params![session_secret],
        )?;
        if rows == 0 {
            return Err(PlatformError::NotFound("session".into()));
        }
        Ok(())
    }
}
