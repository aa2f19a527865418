use super::*;
use crate::request::MockHttpClient;
use crate::token::make_jwt;
use edusync_shared::Role;
use edusync_shared::protocol::HttpMethod;
use serde_json::json;

const BASE: &str = "http://api.test";

fn url(path: &str) -> String {
    format!("{}{}", BASE, path)
}

fn future_token() -> String {
    make_jwt(Utc::now().timestamp() + 3600)
}

fn setup(store: MemorySessionStore) -> (MockHttpClient, Session<MockHttpClient, MemorySessionStore>) {
    let mock = MockHttpClient::new();
    let api = ApiClient::new(BASE, mock.clone());
    let session = Session::new(api, store, &ClientConfig::default());
    (mock, session)
}

fn student_json() -> Value {
    json!({"id": 7, "name": "Ada", "email": "ada@school.edu", "role": "student"})
}

#[tokio::test]
async fn hydrate_without_token_settles_immediately() {
    let (mock, session) = setup(MemorySessionStore::new());

    assert_eq!(session.hydrate().await, SessionStatus::Unauthenticated);
    assert_eq!(mock.request_count(), 0);
    assert!(session.token().is_none());
}

#[tokio::test]
async fn hydrate_verifies_persisted_token() {
    let token = future_token();
    let (mock, session) = setup(MemorySessionStore::new().with_item("token", &token));
    mock.mock_response(HttpMethod::Get, &url("/auth/check"), 200, json!({"user": student_json()}));

    assert_eq!(session.hydrate().await, SessionStatus::Authenticated);

    let state = session.snapshot();
    assert!(state.is_authenticated());
    assert_eq!(state.token.as_deref(), Some(token.as_str()));
    assert_eq!(state.user.unwrap().role, Role::Student);

    let req = &mock.requests()[0];
    assert_eq!(req.header("Authorization"), Some(format!("Bearer {}", token).as_str()));
    assert!(session.store().get("user").is_some());
}

#[tokio::test]
async fn hydrate_failure_clears_persisted_token() {
    let (mock, session) = setup(
        MemorySessionStore::new()
            .with_item("token", &future_token())
            .with_item("user", "{}"),
    );
    mock.mock_response(HttpMethod::Get, &url("/auth/check"), 401, json!({"message": "invalid token"}));

    assert_eq!(session.hydrate().await, SessionStatus::Unauthenticated);
    assert!(session.store().is_empty());
    assert_eq!(session.snapshot(), SessionState::default());
}

#[tokio::test]
async fn hydrate_skips_backend_for_expired_token() {
    let expired = make_jwt(Utc::now().timestamp() - 60);
    let (mock, session) = setup(MemorySessionStore::new().with_item("token", &expired));

    assert_eq!(session.hydrate().await, SessionStatus::Unauthenticated);
    assert_eq!(mock.request_count(), 0);
    assert!(session.store().is_empty());
}

#[tokio::test]
async fn login_persists_token_and_user() {
    let (mock, session) = setup(MemorySessionStore::new());
    mock.mock_response(
        HttpMethod::Post,
        &url("/login"),
        200,
        json!({"token": "abc", "user": {"id": 3, "name": "T", "email": "t@s.edu", "role": "teacher"}}),
    );

    let user = session.login("t@s.edu", "secret").await.unwrap();
    assert_eq!(user.role, Role::Teacher);
    assert_eq!(session.status(), SessionStatus::Authenticated);
    assert_eq!(session.store().get("token").as_deref(), Some("abc"));

    let stored: User = serde_json::from_str(&session.store().get("user").unwrap()).unwrap();
    assert_eq!(stored, user);

    let req = &mock.requests()[0];
    assert_eq!(req.header("Authorization"), None);
    assert_eq!(req.json_body(), Some(json!({"email": "t@s.edu", "password": "secret"})));
}

#[tokio::test]
async fn login_without_role_is_rejected_and_persists_nothing() {
    let (mock, session) = setup(MemorySessionStore::new());
    mock.mock_response(
        HttpMethod::Post,
        &url("/login"),
        200,
        json!({"token": "abc", "user": {"id": 3, "name": "T"}}),
    );

    let err = session.login("t@s.edu", "secret").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
    assert!(session.store().is_empty());
    assert_eq!(session.status(), SessionStatus::Unauthenticated);
}

#[tokio::test]
async fn login_without_token_is_rejected() {
    let (mock, session) = setup(MemorySessionStore::new());
    mock.mock_response(HttpMethod::Post, &url("/login"), 200, json!({"user": student_json()}));

    let err = session.login("a@b.c", "pw").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
    assert!(session.store().is_empty());
}

#[tokio::test]
async fn login_validates_before_network() {
    let (mock, session) = setup(MemorySessionStore::new());

    let err = session.login("  ", "pw").await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn login_surfaces_server_message() {
    let (mock, session) = setup(MemorySessionStore::new());
    mock.mock_response(HttpMethod::Post, &url("/login"), 401, json!({"message": "Invalid credentials"}));

    let err = session.login("a@b.c", "pw").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid credentials (Status: 401)");
}

#[tokio::test]
async fn logout_clears_both_copies() {
    let (mock, session) = setup(MemorySessionStore::new());
    mock.mock_response(HttpMethod::Post, &url("/login"), 200, json!({"token": "abc", "user": student_json()}));
    session.login("a@b.c", "pw").await.unwrap();

    session.logout();

    assert!(session.store().is_empty());
    assert_eq!(session.snapshot(), SessionState::default());
}

#[tokio::test]
async fn expired_token_forces_logout_before_calls() {
    let expired = make_jwt(1_000);
    let (mock, session) = setup(MemorySessionStore::new());
    mock.mock_response(HttpMethod::Post, &url("/login"), 200, json!({"token": expired, "user": student_json()}));
    session.login("a@b.c", "pw").await.unwrap();

    let err = session.valid_token().unwrap_err();
    assert_eq!(err, ApiError::SessionExpired);
    assert_eq!(session.status(), SessionStatus::Unauthenticated);
    assert!(session.store().is_empty());
}

#[tokio::test]
async fn unauthorized_response_forces_logout() {
    let (mock, session) = setup(MemorySessionStore::new());
    mock.mock_response(HttpMethod::Post, &url("/login"), 200, json!({"token": "abc", "user": student_json()}));
    session.login("a@b.c", "pw").await.unwrap();

    let forbidden = ApiError::Http {
        status: 403,
        message: "nope".into(),
    };
    assert!(!session.handle_error(&forbidden));
    assert!(session.token().is_some());

    let unauthorized = ApiError::Http {
        status: 401,
        message: "expired".into(),
    };
    assert!(session.handle_error(&unauthorized));
    assert!(session.token().is_none());
}

#[test]
fn auth_failure_without_session_is_left_to_caller() {
    let (_mock, session) = setup(MemorySessionStore::new());
    let unauthorized = ApiError::Http {
        status: 401,
        message: "expired".into(),
    };

    assert!(!session.handle_error(&unauthorized));
    assert!(!session.handle_error(&ApiError::Unauthenticated));
}

#[tokio::test]
async fn logout_during_profile_refresh_is_not_undone() {
    let (mock, session) = setup(MemorySessionStore::new());
    mock.mock_response(HttpMethod::Post, &url("/login"), 200, json!({"token": "abc", "user": student_json()}));
    mock.mock_response(HttpMethod::Get, &url("/profile"), 200, student_json());
    session.login("ada@school.edu", "pw").await.unwrap();

    let (refreshed, ()) = futures::join!(session.refresh_profile(), async { session.logout() });

    assert_eq!(refreshed.unwrap_err(), ApiError::Unauthenticated);
    assert!(session.store().is_empty());
    assert!(session.user().is_none());
}

#[tokio::test]
async fn update_profile_falls_back_to_local_input() {
    let (mock, session) = setup(MemorySessionStore::new());
    mock.mock_response(HttpMethod::Post, &url("/login"), 200, json!({"token": "abc", "user": student_json()}));
    mock.mock_raw(HttpMethod::Put, &url("/student/profile"), 200, "");
    session.login("ada@school.edu", "pw").await.unwrap();

    let user = session.update_profile("Ada L.", "ada@new.edu").await.unwrap();
    assert_eq!(user.name, "Ada L.");
    assert_eq!(user.id, 7);
    assert_eq!(session.user().unwrap().email, "ada@new.edu");
}

#[tokio::test]
async fn update_profile_rejects_bad_email_locally() {
    let (mock, session) = setup(MemorySessionStore::new());

    let err = session.update_profile("Ada", "nope").await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn refresh_profile_accepts_bare_user() {
    let (mock, session) = setup(MemorySessionStore::new());
    mock.mock_response(HttpMethod::Post, &url("/login"), 200, json!({"token": "abc", "user": student_json()}));
    mock.mock_response(
        HttpMethod::Get,
        &url("/profile"),
        200,
        json!({"id": 7, "name": "Ada Lovelace", "email": "ada@school.edu", "role": "student"}),
    );
    session.login("ada@school.edu", "pw").await.unwrap();

    let user = session.refresh_profile().await.unwrap();
    assert_eq!(user.name, "Ada Lovelace");
}

#[tokio::test]
async fn register_does_not_log_in() {
    let (mock, session) = setup(MemorySessionStore::new());
    mock.mock_response(HttpMethod::Post, &url("/register"), 201, json!({"message": "ok"}));

    let req = RegisterRequest {
        name: "New".into(),
        email: "new@s.edu".into(),
        password: "pw".into(),
        role: Role::Student,
    };
    session.register(&req).await.unwrap();
    assert_eq!(session.status(), SessionStatus::Unauthenticated);
    assert!(session.store().is_empty());
}
