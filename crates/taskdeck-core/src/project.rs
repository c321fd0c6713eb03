use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::TaskdeckError;

/// A row of the `projects` table. Only ever visible to `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `projects`. `id` and `created_at` are assigned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateProject {
    pub title: String,
    pub description: Option<String>,
    pub user_id: String,
}

impl CreateProject {
    /// Build an insert payload from raw form input.
    ///
    /// The title is trimmed and must not be empty. A description that trims to
    /// nothing becomes `None` so the backend stores null instead of `""`.
    pub fn new(user_id: &str, title: &str, description: &str) -> Result<Self, TaskdeckError> {
        let title = required_text(title, "Please enter a project title")?;
        Ok(Self {
            title,
            description: optional_text(description),
            user_id: user_id.to_string(),
        })
    }
}

pub(crate) fn required_text(raw: &str, message: &str) -> Result<String, TaskdeckError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TaskdeckError::InvalidInput(message.to_string()));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn optional_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
