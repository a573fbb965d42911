use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub provider: String,
}

impl User {
    /// The local part of the email address, used as a short display name.
    pub fn display_name(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }
}

/// The active sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    pub created_at: DateTime<Utc>,
}
