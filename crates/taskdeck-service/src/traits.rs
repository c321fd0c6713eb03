use async_trait::async_trait;
use taskdeck_core::project::{CreateProject, Project};
use taskdeck_core::session::{AuthSession, SignUpOutcome};
use taskdeck_core::task::{CreateTask, Task, UpdateTask};
use taskdeck_core::TaskdeckError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// The message as the backend (or local validation) phrased it.
    pub fn message(&self) -> &str {
        match self {
            ServiceError::NotFound(msg)
            | ServiceError::InvalidInput(msg)
            | ServiceError::Unauthorized(msg)
            | ServiceError::Internal(msg) => msg,
        }
    }
}

impl From<TaskdeckError> for ServiceError {
    fn from(e: TaskdeckError) -> Self {
        match e {
            TaskdeckError::NotFound(msg) => ServiceError::NotFound(msg),
            TaskdeckError::InvalidInput(msg) => ServiceError::InvalidInput(msg),
        }
    }
}

/// Identity issuance: email/password accounts and their token pairs.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError>;
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<SignUpOutcome, ServiceError>;
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, ServiceError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), ServiceError>;
}

/// Project and task rows, always read and written on behalf of a signed-in user.
///
/// The terminal app programs against this trait through `BlockingHttpService`.
#[async_trait]
pub trait TaskService: Send + Sync {
    // -- Projects --
    /// Projects owned by the session's user, newest first.
    async fn list_projects(&self, session: &AuthSession) -> Result<Vec<Project>, ServiceError>;
    /// A single project, filtered on both id and owner. Someone else's project is `NotFound`.
    async fn get_project(&self, session: &AuthSession, id: &str)
        -> Result<Project, ServiceError>;
    async fn create_project(
        &self,
        session: &AuthSession,
        input: &CreateProject,
    ) -> Result<Project, ServiceError>;

    // -- Tasks --
    /// Tasks of one project, newest first.
    async fn list_tasks(
        &self,
        session: &AuthSession,
        project_id: &str,
    ) -> Result<Vec<Task>, ServiceError>;
    async fn create_task(
        &self,
        session: &AuthSession,
        input: &CreateTask,
    ) -> Result<Task, ServiceError>;
    async fn update_task(
        &self,
        session: &AuthSession,
        id: &str,
        update: &UpdateTask,
    ) -> Result<Task, ServiceError>;
}
