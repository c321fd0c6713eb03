use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Sessions this close to expiry are treated as already expired.
const EXPIRY_SKEW_SECONDS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Display name captured at registration (stored as user metadata).
    #[serde(default)]
    pub name: Option<String>,
}

impl AuthUser {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("User")
    }

    pub fn email_or_empty(&self) -> &str {
        self.email.as_deref().unwrap_or("")
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds).
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now().timestamp() + EXPIRY_SKEW_SECONDS
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Process-wide authentication state, owned by the session provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Not yet known: a restore is in progress.
    #[default]
    Unknown,
    SignedOut,
    SignedIn(AuthSession),
}

impl SessionState {
    pub fn session(&self) -> Option<&AuthSession> {
        match self {
            SessionState::SignedIn(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Unknown)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    /// The backend created the account but wants the email confirmed first.
    ConfirmationRequired,
}
