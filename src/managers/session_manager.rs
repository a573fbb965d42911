//! Session Manager for ReMarkable.
//!
//! Holds the process-wide session state: initialised from a session lookup
//! at startup, then kept current by following the auth provider's
//! session-change stream until shutdown.

use std::sync::{Arc, RwLock};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::services::auth_service::AuthProvider;
use crate::types::errors::AuthError;
use crate::types::session::{Session, User};

/// Process-wide session state.
pub struct SessionManager {
    current: Arc<RwLock<Option<Session>>>,
    follower: Option<JoinHandle<()>>,
}

impl SessionManager {
    /// Looks up the current session and starts following session changes.
    ///
    /// The change stream is subscribed before the lookup and left unmarked,
    /// so a sign-in or sign-out landing while the lookup runs still wakes the
    /// follower and overwrites whatever the lookup returned.
    pub async fn start(auth: Arc<dyn AuthProvider>) -> Result<Self, AuthError> {
        let mut changes = auth.subscribe();
        let initial = auth.current_session().await?;

        info!(
            signed_in = initial.is_some(),
            "session state initialised"
        );

        let current = Arc::new(RwLock::new(initial));
        let shared = Arc::clone(&current);
        let follower = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let session = changes.borrow_and_update().clone();
                debug!(signed_in = session.is_some(), "session changed");
                *shared.write().unwrap_or_else(|p| p.into_inner()) = session;
            }
        });

        Ok(Self {
            current,
            follower: Some(follower),
        })
    }

    pub fn current_session(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Records a session the caller already holds, ahead of the follower
    /// catching up with the same change.
    pub fn set_current(&self, session: Option<Session>) {
        *self.current.write().unwrap_or_else(|p| p.into_inner()) = session;
    }

    pub fn current_user(&self) -> Option<User> {
        self.current_session().map(|session| session.user)
    }

    /// Returns whether session changes are still being followed.
    pub fn is_running(&self) -> bool {
        self.follower
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops following session changes. The last known session is kept.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.follower.take() {
            handle.abort();
            debug!("session follower stopped");
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
