use std::sync::Arc;

use taskdeck_core::session::{AuthSession, SessionState, SignUpOutcome};
use taskdeck_service::{
    BackendConfig, BlockingHttpService, HttpService, ServiceError, SessionPersistence,
    SessionProvider,
};

/// Everything the screens share: the blocking data client and the one
/// session provider for this process.
pub struct AppContext {
    pub service: BlockingHttpService,
    pub session: SessionProvider<HttpService>,
}

impl AppContext {
    pub fn new(config: BackendConfig, store: Arc<dyn SessionPersistence>) -> Self {
        let service = BlockingHttpService::new(config);
        let session = SessionProvider::new(service.inner().clone(), store);
        Self { service, session }
    }

    pub fn restore(&mut self) -> &SessionState {
        self.service.block_on(self.session.restore())
    }

    pub fn sign_in(&mut self, email: &str, password: &str) -> Result<(), ServiceError> {
        self.service
            .block_on(self.session.sign_in(email, password))
            .map(|_| ())
    }

    pub fn sign_up(
        &mut self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<SignUpOutcome, ServiceError> {
        self.service
            .block_on(self.session.sign_up(email, password, name))
    }

    pub fn sign_out(&mut self) {
        self.service.block_on(self.session.sign_out())
    }

    /// Renew a lapsed access token ahead of the next backend call. Returns
    /// whether a session is still held afterwards.
    pub fn ensure_fresh_session(&mut self) -> bool {
        let state = self.service.block_on(self.session.ensure_fresh());
        matches!(state, SessionState::SignedIn(_))
    }

    /// The signed-in session, or `Unauthorized` when there is none.
    pub fn require_session(&self) -> Result<&AuthSession, ServiceError> {
        self.session
            .session()
            .ok_or_else(|| ServiceError::Unauthorized("Not signed in".into()))
    }
}
