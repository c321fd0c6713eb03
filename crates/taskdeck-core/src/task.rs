use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::project::required_text;
use crate::TaskdeckError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    pub project_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub project_id: String,
}

impl CreateTask {
    pub fn new(project_id: &str, title: &str) -> Result<Self, TaskdeckError> {
        Ok(Self {
            title: required_text(title, "Please enter a task title")?,
            project_id: project_id.to_string(),
        })
    }
}

/// Partial update for `tasks`. Unset fields are left out of the request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTask {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl UpdateTask {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Default::default()
        }
    }
}

/// Completed/total counts, derived from whatever list is currently held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskProgress {
    pub completed: usize,
    pub total: usize,
}

impl TaskProgress {
    pub fn of(tasks: &[Task]) -> Self {
        Self {
            completed: tasks.iter().filter(|t| t.completed).count(),
            total: tasks.len(),
        }
    }
}

impl std::fmt::Display for TaskProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.completed, self.total)
    }
}

/// Replace the completed flag of the task with `id`. Returns false if no task matched.
pub fn patch_completed(tasks: &mut [Task], id: &str, completed: bool) -> bool {
    match tasks.iter_mut().find(|t| t.id == id) {
        Some(task) => {
            task.completed = completed;
            true
        }
        None => false,
    }
}

/// Put a freshly inserted task at the head of a newest-first list.
/// A task already present (same id) is replaced instead of duplicated.
pub fn insert_newest(tasks: &mut Vec<Task>, task: Task) {
    tasks.retain(|t| t.id != task.id);
    tasks.insert(0, task);
}
