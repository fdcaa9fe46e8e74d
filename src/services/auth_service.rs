//! SQLite-backed auth service.
//!
//! Passwords are stored as Argon2id PHC strings. Sessions are opaque random
//! tokens. Every sign-in and
//! sign-out is broadcast to current subscribers.

use crate::{
    errors::{RemoteError, RemoteResult},
    models::session::{Credentials, Session, User},
    services::ports::{AuthEvent, AuthEventKind, AuthService, AuthSubscription},
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 64;
const INVALID_LOGIN: &str = "Invalid login credentials";

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
}

#[derive(FromRow)]
struct SessionRow {
    token: String,
    user_id: Uuid,
    email: String,
    created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SqliteAuthService {
    db: Arc<SqlitePool>,
    events: broadcast::Sender<AuthEvent>,
}

impl SqliteAuthService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { db, events }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    fn publish(&self, kind: AuthEventKind, session: Option<Session>) {
        // No subscribers is not an error.
        let delivered = self.events.send(AuthEvent { kind, session }).unwrap_or(0);
        debug!("auth event {:?} delivered to {} subscribers", kind, delivered);
    }

    async fn issue_session(&self, user: User) -> RemoteResult<Session> {
        let session = Session {
            token: format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()),
            user,
            created_at: Utc::now(),
        };
        sqlx::query("INSERT INTO sessions (token, user_id, created_at) VALUES (?, ?, ?)")
            .bind(&session.token)
            .bind(session.user.id)
            .bind(session.created_at)
            .execute(&*self.db)
            .await
            .map_err(auth_error)?;
        self.publish(AuthEventKind::SignedIn, Some(session.clone()));
        Ok(session)
    }
}

fn auth_error(err: sqlx::Error) -> RemoteError {
    RemoteError::Auth(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn hash_password(password: &str) -> RemoteResult<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|err| RemoteError::Auth(err.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| RemoteError::Auth(err.to_string()))
}

fn verify_password(password: &str, phc: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            warn!("stored password hash is unreadable: {}", err);
            false
        }
    }
}

/// Argon2 is CPU-bound; keep it off the async workers.
async fn blocking<T: Send + 'static>(
    work: impl FnOnce() -> T + Send + 'static,
) -> RemoteResult<T> {
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| RemoteError::Auth(err.to_string()))
}

#[async_trait]
impl AuthService for SqliteAuthService {
    async fn sign_up(&self, credentials: &Credentials) -> RemoteResult<Session> {
        let user = User {
            id: Uuid::new_v4(),
            email: credentials.email().to_string(),
        };
        let password = credentials.password().to_string();
        let phc = blocking(move || hash_password(&password)).await??;

        match sqlx::query(
            "INSERT INTO users (id, email, password_hash, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&phc)
        .bind(Utc::now())
        .execute(&*self.db)
        .await
        {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(RemoteError::Auth("User already registered".into()));
            }
            Err(err) => return Err(auth_error(err)),
        }

        info!("registered user {}", user.id);
        self.issue_session(user).await
    }

    async fn sign_in(&self, credentials: &Credentials) -> RemoteResult<Session> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash FROM users WHERE email = ?",
        )
        .bind(credentials.email())
        .fetch_optional(&*self.db)
        .await
        .map_err(auth_error)?
        .ok_or_else(|| RemoteError::Auth(INVALID_LOGIN.into()))?;

        let password = credentials.password().to_string();
        let phc = row.password_hash.clone();
        if !blocking(move || verify_password(&password, &phc)).await? {
            return Err(RemoteError::Auth(INVALID_LOGIN.into()));
        }

        self.issue_session(User {
            id: row.id,
            email: row.email,
        })
        .await
    }

    async fn current_session(&self, token: &str) -> RemoteResult<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT s.token, s.user_id, u.email, s.created_at
             FROM sessions s JOIN users u ON u.id = s.user_id
             WHERE s.token = ?",
        )
        .bind(token)
        .fetch_optional(&*self.db)
        .await
        .map_err(auth_error)?;

        Ok(row.map(|row| Session {
            token: row.token,
            user: User {
                id: row.user_id,
                email: row.email,
            },
            created_at: row.created_at,
        }))
    }

    async fn sign_out(&self, token: &str) -> RemoteResult<()> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&*self.db)
            .await
            .map_err(auth_error)?;
        if result.rows_affected() > 0 {
            self.publish(AuthEventKind::SignedOut, None);
        }
        Ok(())
    }

    fn subscribe(&self) -> AuthSubscription {
        AuthSubscription::new(self.events.subscribe())
    }
}
