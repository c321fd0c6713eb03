use std::future::Future;

use taskdeck_core::project::{CreateProject, Project};
use taskdeck_core::session::AuthSession;
use taskdeck_core::task::{CreateTask, Task, UpdateTask};
use tokio::runtime::Runtime;

use crate::{BackendConfig, HttpService, ServiceError, TaskService};

/// Blocking wrapper around the async `HttpService`.
///
/// Creates an internal tokio runtime and uses `block_on()` for each call.
/// Designed for sync callers like the TUI.
pub struct BlockingHttpService {
    inner: HttpService,
    rt: Runtime,
}

impl BlockingHttpService {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            inner: HttpService::new(config),
            rt: Runtime::new().expect("failed to create tokio runtime"),
        }
    }

    /// The async client, for callers that drive it through [`Self::block_on`]
    /// (the session provider holds its own clone).
    pub fn inner(&self) -> &HttpService {
        &self.inner
    }

    /// Run any future on the wrapper's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.rt.block_on(future)
    }

    pub fn health_check(&self) -> Result<(), ServiceError> {
        self.rt.block_on(self.inner.health_check())
    }

    // -- Trait method delegates --

    pub fn list_projects(&self, session: &AuthSession) -> Result<Vec<Project>, ServiceError> {
        self.rt.block_on(self.inner.list_projects(session))
    }

    pub fn get_project(&self, session: &AuthSession, id: &str) -> Result<Project, ServiceError> {
        self.rt.block_on(self.inner.get_project(session, id))
    }

    pub fn create_project(
        &self,
        session: &AuthSession,
        input: &CreateProject,
    ) -> Result<Project, ServiceError> {
        self.rt.block_on(self.inner.create_project(session, input))
    }

    pub fn list_tasks(
        &self,
        session: &AuthSession,
        project_id: &str,
    ) -> Result<Vec<Task>, ServiceError> {
        self.rt.block_on(self.inner.list_tasks(session, project_id))
    }

    pub fn create_task(
        &self,
        session: &AuthSession,
        input: &CreateTask,
    ) -> Result<Task, ServiceError> {
        self.rt.block_on(self.inner.create_task(session, input))
    }

    pub fn update_task(
        &self,
        session: &AuthSession,
        id: &str,
        update: &UpdateTask,
    ) -> Result<Task, ServiceError> {
        self.rt.block_on(self.inner.update_task(session, id, update))
    }
}
