//! Authentication collaborator.
//!
//! `AuthProvider` is the surface the application consumes: session lookup,
//! provider sign-in, sign-out and a session-change stream. The local
//! implementation keeps the single active session in SQLite.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

use crate::database::connection::Database;
use crate::types::errors::AuthError;
use crate::types::session::{Session, User};

/// Providers the local auth accepts.
pub const SUPPORTED_PROVIDERS: &[&str] = &["google", "github", "email"];

/// Trait defining the authentication operations the application relies on.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn current_session(&self) -> Result<Option<Session>, AuthError>;
    async fn sign_in_with_provider(&self, provider: &str, email: &str) -> Result<Session, AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
    /// Stream of session changes; the current value is the latest session.
    fn subscribe(&self) -> watch::Receiver<Option<Session>>;
}

/// Auth provider that persists the active session in the local database.
pub struct LocalAuthProvider {
    db: Arc<Database>,
    sender: watch::Sender<Option<Session>>,
}

impl LocalAuthProvider {
    /// Creates the provider, seeding the change stream with any stored session.
    pub fn new(db: Arc<Database>) -> Result<Self, AuthError> {
        let stored = Self::load_session(&db)?;
        let (sender, _) = watch::channel(stored);
        Ok(Self { db, sender })
    }

    /// Stable user id for an identity: the same provider and email always map
    /// to the same id, so a returning user sees their own records.
    pub fn user_id_for(provider: &str, email: &str) -> String {
        let name = format!("{}:{}", provider, email.trim().to_lowercase());
        Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()).to_string()
    }

    fn load_session(db: &Database) -> Result<Option<Session>, AuthError> {
        let conn = db.connection();
        let session = conn
            .query_row(
                "SELECT user_id, email, provider, created_at FROM auth_session WHERE id = 'default'",
                [],
                |row| {
                    let created_ms: i64 = row.get(3)?;
                    Ok(Session {
                        user: User {
                            id: row.get(0)?,
                            email: row.get(1)?,
                            provider: row.get(2)?,
                        },
                        created_at: DateTime::<Utc>::from_timestamp_millis(created_ms)
                            .unwrap_or_default(),
                    })
                },
            )
            .optional()?;
        Ok(session)
    }
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        Self::load_session(&self.db)
    }

    async fn sign_in_with_provider(&self, provider: &str, email: &str) -> Result<Session, AuthError> {
        let provider = provider.trim().to_lowercase();
        if !SUPPORTED_PROVIDERS.contains(&provider.as_str()) {
            return Err(AuthError::UnsupportedProvider(provider));
        }
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::SignInFailed(format!("invalid email: {:?}", email)));
        }

        let now = Utc::now();
        let session = Session {
            user: User {
                id: Self::user_id_for(&provider, email),
                email: email.to_string(),
                provider: provider.clone(),
            },
            created_at: DateTime::<Utc>::from_timestamp_millis(now.timestamp_millis())
                .unwrap_or(now),
        };

        self.db.connection().execute(
            "INSERT OR REPLACE INTO auth_session (id, user_id, email, provider, created_at) \
             VALUES ('default', ?1, ?2, ?3, ?4)",
            params![
                session.user.id,
                session.user.email,
                session.user.provider,
                session.created_at.timestamp_millis(),
            ],
        )?;

        info!(user_id = %session.user.id, provider = %provider, "signed in");
        self.sender.send_replace(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.db
            .connection()
            .execute("DELETE FROM auth_session", [])?;
        info!("signed out");
        self.sender.send_replace(None);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.sender.subscribe()
    }
}
