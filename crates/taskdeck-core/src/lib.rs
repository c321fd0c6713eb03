pub mod credentials;
pub mod error;
pub mod project;
pub mod session;
pub mod task;

pub use error::TaskdeckError;
pub use project::Project;
pub use session::{AuthSession, AuthUser, SessionState};
pub use task::{Task, TaskProgress};
