mod blocking;
mod config;
mod http;
mod query;
mod session;
mod traits;

pub use blocking::BlockingHttpService;
pub use config::BackendConfig;
pub use http::HttpService;
pub use query::{SortOrder, TableQuery};
pub use session::{FileSessionStore, MemorySessionStore, SessionPersistence, SessionProvider};
pub use traits::{AuthService, ServiceError, TaskService};
