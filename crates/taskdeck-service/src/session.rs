use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use taskdeck_core::session::{AuthSession, AuthUser, SessionState, SignUpOutcome};

use crate::{AuthService, ServiceError};

/// Where the current token pair survives between runs (or doesn't).
pub trait SessionPersistence: Send + Sync {
    fn load_session(&self) -> Result<Option<AuthSession>, ServiceError>;
    fn save_session(&self, session: &AuthSession) -> Result<(), ServiceError>;
    fn clear_session(&self) -> Result<(), ServiceError>;
}

/// Keeps the session in process memory only. Nothing survives a restart.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    slot: Arc<Mutex<Option<AuthSession>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<AuthSession>>, ServiceError> {
        self.slot
            .lock()
            .map_err(|e| ServiceError::Internal(format!("session store poisoned: {e}")))
    }
}

impl SessionPersistence for MemorySessionStore {
    fn load_session(&self) -> Result<Option<AuthSession>, ServiceError> {
        Ok(self.lock()?.clone())
    }

    fn save_session(&self, session: &AuthSession) -> Result<(), ServiceError> {
        *self.lock()? = Some(session.clone());
        Ok(())
    }

    fn clear_session(&self) -> Result<(), ServiceError> {
        *self.lock()? = None;
        Ok(())
    }
}

/// Persists the session as JSON in a single file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionPersistence for FileSessionStore {
    fn load_session(&self) -> Result<Option<AuthSession>, ServiceError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ServiceError::Internal(format!("read session file: {e}"))),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| ServiceError::Internal(format!("parse session file: {e}")))
    }

    fn save_session(&self, session: &AuthSession) -> Result<(), ServiceError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ServiceError::Internal(format!("create session dir: {e}")))?;
        }
        let raw = serde_json::to_string(session)
            .map_err(|e| ServiceError::Internal(format!("encode session: {e}")))?;
        write_private(&self.path, raw.as_bytes())
            .map_err(|e| ServiceError::Internal(format!("write session file: {e}")))
    }

    fn clear_session(&self) -> Result<(), ServiceError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ServiceError::Internal(format!("remove session file: {e}"))),
        }
    }
}

/// The file holds live tokens, so it is readable by its owner only.
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // `mode` only applies on creation; tighten a file left by an older run.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents)
}

/// Holds the current identity and performs sign-in, sign-up and sign-out.
///
/// Owned by the application context and passed to whoever needs the session;
/// there is exactly one per process.
pub struct SessionProvider<A> {
    auth: A,
    store: Arc<dyn SessionPersistence>,
    state: SessionState,
}

impl<A: AuthService> SessionProvider<A> {
    /// Starts in `SessionState::Unknown`; call [`Self::restore`] once at startup.
    pub fn new(auth: A, store: Arc<dyn SessionPersistence>) -> Self {
        Self {
            auth,
            store,
            state: SessionState::Unknown,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session(&self) -> Option<&AuthSession> {
        self.state.session()
    }

    pub fn identity(&self) -> Option<&AuthUser> {
        self.session().map(|s| &s.user)
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    /// Silent restore from the persistence layer, refreshing an expired token pair.
    /// Never fails: anything unusable ends in `SignedOut`.
    pub async fn restore(&mut self) -> &SessionState {
        self.state = SessionState::Unknown;
        let stored = match self.store.load_session() {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("failed to load persisted session: {e}");
                None
            }
        };

        self.state = match stored {
            Some(session) => SessionState::SignedIn(session),
            None => SessionState::SignedOut,
        };
        self.ensure_fresh().await;
        tracing::info!(signed_in = self.session().is_some(), "session restored");
        &self.state
    }

    /// Trade a lapsed access token for a new pair before it is used again.
    /// A session that cannot be renewed is dropped, leaving `SignedOut`.
    pub async fn ensure_fresh(&mut self) -> &SessionState {
        let lapsed = self
            .session()
            .filter(|s| s.is_expired())
            .map(|s| s.refresh_token.clone());
        if let Some(refresh_token) = lapsed {
            self.state = match self.auth.refresh_session(&refresh_token).await {
                Ok(refreshed) => {
                    self.persist(&refreshed);
                    tracing::info!(user_id = %refreshed.user.id, "session refreshed");
                    SessionState::SignedIn(refreshed)
                }
                Err(e) => {
                    tracing::warn!("failed to refresh session: {e}");
                    self.forget();
                    SessionState::SignedOut
                }
            };
        }
        &self.state
    }

    /// On failure the previous state is kept and the error is returned untouched.
    pub async fn sign_in(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<&AuthSession, ServiceError> {
        let session = self.auth.sign_in(email, password).await?;
        self.persist(&session);
        tracing::info!(user_id = %session.user.id, "signed in");
        self.state = SessionState::SignedIn(session);
        self.session()
            .ok_or_else(|| ServiceError::Internal("session vanished after sign-in".into()))
    }

    pub async fn sign_up(
        &mut self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<SignUpOutcome, ServiceError> {
        let outcome = self.auth.sign_up(email, password, name).await?;
        if let SignUpOutcome::SignedIn(session) = &outcome {
            self.persist(session);
            tracing::info!(user_id = %session.user.id, "signed up");
            self.state = SessionState::SignedIn(session.clone());
        }
        Ok(outcome)
    }

    /// Local state and the persisted copy are cleared before the remote
    /// revocation is attempted, so callers may navigate as soon as this returns.
    pub async fn sign_out(&mut self) {
        let previous = std::mem::replace(&mut self.state, SessionState::SignedOut);
        self.forget();
        tracing::info!("signed out");
        if let SessionState::SignedIn(session) = previous {
            if let Err(e) = self.auth.sign_out(&session.access_token).await {
                tracing::warn!("remote sign-out failed: {e}");
            }
        }
    }

    fn persist(&self, session: &AuthSession) {
        if let Err(e) = self.store.save_session(session) {
            tracing::warn!("failed to persist session: {e}");
        }
    }

    fn forget(&self) {
        if let Err(e) = self.store.clear_session() {
            tracing::warn!("failed to clear persisted session: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;

    #[derive(Default)]
    struct FakeAuth {
        fail_refresh: bool,
        fail_sign_out: bool,
        refreshes: AtomicUsize,
        sign_outs: AtomicUsize,
    }

    fn session_expiring_at(expires_at: i64) -> AuthSession {
        AuthSession {
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            expires_at,
            user: AuthUser {
                id: "u1".into(),
                email: Some("alice@x.com".into()),
                name: Some("Alice".into()),
            },
        }
    }

    fn fresh_session() -> AuthSession {
        session_expiring_at(Utc::now().timestamp() + 3600)
    }

    #[async_trait]
    impl AuthService for FakeAuth {
        async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError> {
            if email == "alice@x.com" && password == "secret1" {
                Ok(fresh_session())
            } else {
                Err(ServiceError::InvalidInput("Invalid login credentials".into()))
            }
        }

        async fn sign_up(
            &self,
            email: &str,
            _password: &str,
            _name: &str,
        ) -> Result<SignUpOutcome, ServiceError> {
            if email.ends_with("@confirm.me") {
                Ok(SignUpOutcome::ConfirmationRequired)
            } else {
                Ok(SignUpOutcome::SignedIn(fresh_session()))
            }
        }

        async fn refresh_session(&self, _token: &str) -> Result<AuthSession, ServiceError> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            if self.fail_refresh {
                Err(ServiceError::Unauthorized("Invalid Refresh Token".into()))
            } else {
                let mut s = fresh_session();
                s.access_token = "refreshed".into();
                Ok(s)
            }
        }

        async fn sign_out(&self, _token: &str) -> Result<(), ServiceError> {
            self.sign_outs.fetch_add(1, Ordering::SeqCst);
            if self.fail_sign_out {
                Err(ServiceError::Internal("connection failed".into()))
            } else {
                Ok(())
            }
        }
    }

    fn provider(auth: FakeAuth, store: &MemorySessionStore) -> SessionProvider<FakeAuth> {
        SessionProvider::new(auth, Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn starts_loading_then_signed_out_when_nothing_stored() {
        let store = MemorySessionStore::new();
        let mut p = provider(FakeAuth::default(), &store);
        assert!(p.is_loading());
        assert_eq!(p.restore().await, &SessionState::SignedOut);
        assert!(!p.is_loading());
    }

    #[tokio::test]
    async fn restore_uses_unexpired_session_as_is() {
        let store = MemorySessionStore::new();
        store.save_session(&fresh_session()).unwrap();
        let mut p = provider(FakeAuth::default(), &store);
        p.restore().await;
        assert_eq!(p.identity().map(|u| u.id.as_str()), Some("u1"));
        assert_eq!(p.auth.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn restore_refreshes_expired_session() {
        let store = MemorySessionStore::new();
        store.save_session(&session_expiring_at(0)).unwrap();
        let mut p = provider(FakeAuth::default(), &store);
        p.restore().await;
        assert_eq!(p.session().unwrap().access_token, "refreshed");
        assert_eq!(
            store.load_session().unwrap().unwrap().access_token,
            "refreshed"
        );
    }

    #[tokio::test]
    async fn restore_failed_refresh_signs_out_and_clears_store() {
        let store = MemorySessionStore::new();
        store.save_session(&session_expiring_at(0)).unwrap();
        let auth = FakeAuth {
            fail_refresh: true,
            ..Default::default()
        };
        let mut p = provider(auth, &store);
        assert_eq!(p.restore().await, &SessionState::SignedOut);
        assert!(store.load_session().unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_sign_in_stays_signed_out() {
        let store = MemorySessionStore::new();
        let mut p = provider(FakeAuth::default(), &store);
        p.restore().await;
        let err = p.sign_in("alice@x.com", "wrong").await.unwrap_err();
        assert_eq!(err.message(), "Invalid login credentials");
        assert_eq!(p.state(), &SessionState::SignedOut);
        assert!(store.load_session().unwrap().is_none());
    }

    #[tokio::test]
    async fn sign_in_persists_session() {
        let store = MemorySessionStore::new();
        let mut p = provider(FakeAuth::default(), &store);
        let email = p
            .sign_in("alice@x.com", "secret1")
            .await
            .unwrap()
            .user
            .email
            .clone();
        assert_eq!(email.as_deref(), Some("alice@x.com"));
        assert!(store.load_session().unwrap().is_some());
    }

    #[tokio::test]
    async fn sign_up_awaiting_confirmation_does_not_sign_in() {
        let store = MemorySessionStore::new();
        let mut p = provider(FakeAuth::default(), &store);
        p.restore().await;
        let outcome = p.sign_up("bob@confirm.me", "secret1", "Bob").await.unwrap();
        assert_eq!(outcome, SignUpOutcome::ConfirmationRequired);
        assert!(p.session().is_none());

        p.sign_up("carol@x.com", "secret1", "Carol").await.unwrap();
        assert!(p.session().is_some());
    }

    #[tokio::test]
    async fn sign_out_clears_locally_even_when_remote_fails() {
        let store = MemorySessionStore::new();
        let auth = FakeAuth {
            fail_sign_out: true,
            ..Default::default()
        };
        let mut p = provider(auth, &store);
        p.sign_in("alice@x.com", "secret1").await.unwrap();
        p.sign_out().await;
        assert_eq!(p.state(), &SessionState::SignedOut);
        assert!(store.load_session().unwrap().is_none());
        assert_eq!(p.auth.sign_outs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sign_out_when_signed_out_skips_remote_call() {
        let store = MemorySessionStore::new();
        let mut p = provider(FakeAuth::default(), &store);
        p.restore().await;
        p.sign_out().await;
        assert_eq!(p.auth.sign_outs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested").join("session.json"));
        assert!(store.load_session().unwrap().is_none());

        let session = fresh_session();
        store.save_session(&session).unwrap();
        assert_eq!(store.load_session().unwrap(), Some(session));

        store.clear_session().unwrap();
        assert!(store.load_session().unwrap().is_none());
        store.clear_session().unwrap();
    }

    #[tokio::test]
    async fn ensure_fresh_renews_lapsed_session() {
        let store = MemorySessionStore::new();
        let mut p = provider(FakeAuth::default(), &store);
        p.state = SessionState::SignedIn(session_expiring_at(0));

        p.ensure_fresh().await;
        assert_eq!(p.session().unwrap().access_token, "refreshed");
        assert!(!p.session().unwrap().is_expired());
        assert_eq!(
            store.load_session().unwrap().unwrap().access_token,
            "refreshed"
        );
        assert_eq!(p.auth.refreshes.load(Ordering::SeqCst), 1);

        // A renewed session is left alone.
        p.ensure_fresh().await;
        assert_eq!(p.auth.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ensure_fresh_signs_out_when_renewal_fails() {
        let store = MemorySessionStore::new();
        let auth = FakeAuth {
            fail_refresh: true,
            ..Default::default()
        };
        let mut p = provider(auth, &store);
        let lapsed = session_expiring_at(0);
        store.save_session(&lapsed).unwrap();
        p.state = SessionState::SignedIn(lapsed);

        assert_eq!(p.ensure_fresh().await, &SessionState::SignedOut);
        assert!(store.load_session().unwrap().is_none());
    }

    #[tokio::test]
    async fn ensure_fresh_is_a_no_op_when_signed_out() {
        let store = MemorySessionStore::new();
        let mut p = provider(FakeAuth::default(), &store);
        p.restore().await;
        assert_eq!(p.ensure_fresh().await, &SessionState::SignedOut);
        assert_eq!(p.auth.refreshes.load(Ordering::SeqCst), 0);
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_private_to_its_owner() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        FileSessionStore::new(path.clone())
            .save_session(&fresh_session())
            .unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(FileSessionStore::new(path).load_session().is_err());
    }
}
