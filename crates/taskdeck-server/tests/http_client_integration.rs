//! Integration tests for HttpService + BlockingHttpService against a real server.
//!
//! Each test spawns an in-process axum server on 127.0.0.1:0 with empty in-memory
//! stores, then exercises the HTTP client layer through the full request/response cycle.

use std::sync::Arc;

use taskdeck_core::project::CreateProject;
use taskdeck_core::session::{AuthSession, SessionState, SignUpOutcome};
use taskdeck_core::task::{CreateTask, TaskProgress, UpdateTask};
use taskdeck_service::{
    AuthService, BackendConfig, HttpService, MemorySessionStore, ServiceError,
    SessionPersistence, SessionProvider, TaskService,
};

async fn spawn_server() -> HttpService {
    let server = taskdeck_server::test_helpers::spawn_test_server().await;
    HttpService::new(BackendConfig::new(&server.base_url, "").unwrap())
}

async fn signed_up(svc: &HttpService, email: &str, name: &str) -> AuthSession {
    match svc.sign_up(email, "secret1", name).await.unwrap() {
        SignUpOutcome::SignedIn(session) => session,
        SignUpOutcome::ConfirmationRequired => panic!("dev server never asks for confirmation"),
    }
}

// ---- Async HttpService tests ----

#[tokio::test]
async fn health_check_via_http() {
    let svc = spawn_server().await;
    svc.health_check().await.unwrap();
}

#[tokio::test]
async fn sign_up_then_sign_in_via_http() {
    let svc = spawn_server().await;
    let created = signed_up(&svc, "alice@x.com", "Alice").await;
    assert_eq!(created.user.display_name(), "Alice");

    let session = svc.sign_in("alice@x.com", "secret1").await.unwrap();
    assert_eq!(session.user_id(), created.user_id());
    assert_eq!(session.user.email.as_deref(), Some("alice@x.com"));
    assert!(!session.is_expired());

    let user = svc.current_user(&session.access_token).await.unwrap();
    assert_eq!(user.id, created.user.id);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let svc = spawn_server().await;
    signed_up(&svc, "alice@x.com", "Alice").await;

    let err = svc.sign_in("alice@x.com", "wrong-password").await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)), "got {err:?}");
    assert_eq!(err.message(), "Invalid login credentials");
}

#[tokio::test]
async fn duplicate_sign_up_surfaces_backend_message() {
    let svc = spawn_server().await;
    signed_up(&svc, "alice@x.com", "Alice").await;
    let err = svc.sign_up("alice@x.com", "secret1", "Alice").await.unwrap_err();
    assert_eq!(err.message(), "User already registered");
}

#[tokio::test]
async fn project_create_and_fetch_via_http() {
    let svc = spawn_server().await;
    let session = signed_up(&svc, "alice@x.com", "Alice").await;

    let input = CreateProject::new(session.user_id(), "  Trip  ", "   ").unwrap();
    let project = svc.create_project(&session, &input).await.unwrap();
    assert_eq!(project.title, "Trip");
    assert_eq!(project.description, None);
    assert_eq!(project.user_id, session.user_id());

    let fetched = svc.get_project(&session, &project.id).await.unwrap();
    assert_eq!(fetched, project);

    let all = svc.list_projects(&session).await.unwrap();
    assert_eq!(all, vec![project]);
}

#[tokio::test]
async fn projects_are_listed_newest_first() {
    let svc = spawn_server().await;
    let session = signed_up(&svc, "alice@x.com", "Alice").await;

    for title in ["first", "second", "third"] {
        let input = CreateProject::new(session.user_id(), title, "").unwrap();
        svc.create_project(&session, &input).await.unwrap();
    }

    let titles: Vec<_> = svc
        .list_projects(&session)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.title)
        .collect();
    assert_eq!(titles, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn tasks_toggle_and_progress_via_http() {
    let svc = spawn_server().await;
    let session = signed_up(&svc, "alice@x.com", "Alice").await;
    let project = svc
        .create_project(
            &session,
            &CreateProject::new(session.user_id(), "Trip", "Summer").unwrap(),
        )
        .await
        .unwrap();

    svc.create_task(&session, &CreateTask::new(&project.id, "Pack bags").unwrap())
        .await
        .unwrap();
    let flights = svc
        .create_task(&session, &CreateTask::new(&project.id, "Book flights").unwrap())
        .await
        .unwrap();
    assert!(!flights.completed);

    let tasks = svc.list_tasks(&session, &project.id).await.unwrap();
    assert_eq!(tasks[0].title, "Book flights");
    assert_eq!(tasks.len(), 2);

    let done = svc
        .update_task(&session, &flights.id, &UpdateTask::completed(true))
        .await
        .unwrap();
    assert!(done.completed);

    let tasks = svc.list_tasks(&session, &project.id).await.unwrap();
    assert_eq!(TaskProgress::of(&tasks).to_string(), "1/2");

    // Toggling twice restores the original value.
    let undone = svc
        .update_task(&session, &flights.id, &UpdateTask::completed(false))
        .await
        .unwrap();
    assert!(!undone.completed);
}

#[tokio::test]
async fn tasks_are_scoped_to_their_project() {
    let svc = spawn_server().await;
    let session = signed_up(&svc, "alice@x.com", "Alice").await;
    let mut ids = Vec::new();
    for title in ["A", "B"] {
        let p = svc
            .create_project(&session, &CreateProject::new(session.user_id(), title, "").unwrap())
            .await
            .unwrap();
        ids.push(p.id);
    }

    svc.create_task(&session, &CreateTask::new(&ids[0], "only in A").unwrap())
        .await
        .unwrap();

    assert_eq!(svc.list_tasks(&session, &ids[0]).await.unwrap().len(), 1);
    assert!(svc.list_tasks(&session, &ids[1]).await.unwrap().is_empty());
}

#[tokio::test]
async fn another_users_project_is_not_found() {
    let svc = spawn_server().await;
    let alice = signed_up(&svc, "alice@x.com", "Alice").await;
    let bob = signed_up(&svc, "bob@x.com", "Bob").await;

    let project = svc
        .create_project(&alice, &CreateProject::new(alice.user_id(), "Secret", "").unwrap())
        .await
        .unwrap();

    let err = svc.get_project(&bob, &project.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)), "got {err:?}");
    assert!(svc.list_projects(&bob).await.unwrap().is_empty());
    assert!(svc.list_tasks(&bob, &project.id).await.unwrap().is_empty());

    let err = svc
        .create_task(&bob, &CreateTask::new(&project.id, "sneaky").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)), "got {err:?}");
}

#[tokio::test]
async fn update_of_unknown_task_is_not_found() {
    let svc = spawn_server().await;
    let session = signed_up(&svc, "alice@x.com", "Alice").await;
    let err = svc
        .update_task(&session, "does-not-exist", &UpdateTask::completed(true))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn signed_out_token_is_unauthorized() {
    let svc = spawn_server().await;
    let session = signed_up(&svc, "alice@x.com", "Alice").await;
    svc.sign_out(&session.access_token).await.unwrap();

    let err = svc.list_projects(&session).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)), "got {err:?}");

    // Revoking an already revoked token is not an error.
    svc.sign_out(&session.access_token).await.unwrap();
}

#[tokio::test]
async fn anon_key_is_sent_with_every_request() {
    let server = taskdeck_server::test_helpers::spawn_test_server_with_anon_key().await;
    let key = server.anon_key.clone().unwrap();

    let keyless = HttpService::new(BackendConfig::new(&server.base_url, "").unwrap());
    let err = keyless.sign_up("alice@x.com", "secret1", "Alice").await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)), "got {err:?}");

    let svc = HttpService::new(BackendConfig::new(&server.base_url, &key).unwrap());
    let session = signed_up(&svc, "alice@x.com", "Alice").await;
    assert!(svc.list_projects(&session).await.unwrap().is_empty());
}

// ---- Session provider against the real backend ----

#[tokio::test]
async fn provider_restores_and_refreshes_expired_session() {
    let svc = spawn_server().await;
    let store = Arc::new(MemorySessionStore::new());

    let mut provider = SessionProvider::new(svc.clone(), store.clone());
    provider.sign_in("alice@x.com", "secret1").await.unwrap_err();
    assert!(matches!(provider.state(), SessionState::Unknown));

    provider.sign_up("alice@x.com", "secret1", "Alice").await.unwrap();
    let original = provider.session().unwrap().clone();

    // Pretend the stored access token has lapsed.
    let mut expired = original.clone();
    expired.expires_at = 0;
    store.save_session(&expired).unwrap();

    let mut restarted = SessionProvider::new(svc.clone(), store.clone());
    restarted.restore().await;
    let refreshed = restarted.session().unwrap();
    assert_eq!(refreshed.user_id(), original.user_id());
    assert_ne!(refreshed.access_token, original.access_token);
    assert!(!refreshed.is_expired());

    // The spent refresh token cannot be reused.
    let err = svc.refresh_session(&original.refresh_token).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)), "got {err:?}");
}

#[tokio::test]
async fn provider_sign_out_clears_state_and_store() {
    let svc = spawn_server().await;
    let store = Arc::new(MemorySessionStore::new());
    let mut provider = SessionProvider::new(svc.clone(), store.clone());
    provider.sign_up("alice@x.com", "secret1", "Alice").await.unwrap();
    let token = provider.session().unwrap().access_token.clone();

    provider.sign_out().await;
    assert!(matches!(provider.state(), SessionState::SignedOut));
    assert!(store.load_session().unwrap().is_none());
    assert!(svc.current_user(&token).await.is_err());
}

// ---- Blocking HttpService tests ----

// BlockingHttpService creates its own tokio runtime, so we must
// spawn the server on a separate thread to avoid nested runtime panics.
fn spawn_blocking_server() -> String {
    let (tx, rx) = std::sync::mpsc::sync_channel(1);
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let server = taskdeck_server::test_helpers::spawn_test_server().await;
            tx.send(server.base_url.clone()).unwrap();
            std::future::pending::<()>().await;
        });
    });
    rx.recv().unwrap()
}

#[test]
fn blocking_project_and_task_flow() {
    let url = spawn_blocking_server();
    let svc = taskdeck_service::BlockingHttpService::new(BackendConfig::new(&url, "").unwrap());
    svc.health_check().unwrap();

    let session = match svc
        .block_on(svc.inner().sign_up("alice@x.com", "secret1", "Alice"))
        .unwrap()
    {
        SignUpOutcome::SignedIn(session) => session,
        SignUpOutcome::ConfirmationRequired => panic!("unexpected confirmation"),
    };

    let project = svc
        .create_project(
            &session,
            &CreateProject::new(session.user_id(), "Blocking", "desc").unwrap(),
        )
        .unwrap();
    assert_eq!(project.description.as_deref(), Some("desc"));
    assert_eq!(svc.get_project(&session, &project.id).unwrap().id, project.id);
    assert_eq!(svc.list_projects(&session).unwrap().len(), 1);

    let task = svc
        .create_task(&session, &CreateTask::new(&project.id, "Blocking task").unwrap())
        .unwrap();
    let updated = svc
        .update_task(&session, &task.id, &UpdateTask::completed(true))
        .unwrap();
    assert!(updated.completed);
    assert_eq!(svc.list_tasks(&session, &project.id).unwrap(), vec![updated]);
}
