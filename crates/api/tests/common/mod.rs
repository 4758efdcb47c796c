//! Shared fixtures for the HTTP-level tests.
//!
//! The app runs over the in-process [`MemoryStore`] with a recording mailer,
//! so no database or SMTP server is needed.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use warden_api::config::ServerConfig;
use warden_api::mail::{AuthMail, EmailError, MailKind, Mailer};
use warden_api::router::build_app_router;
use warden_api::state::AppState;
use warden_auth::config::AuthConfig;
use warden_auth::credential_service::SignupInput;
use warden_auth::memory::MemoryStore;
use warden_auth::password::{CredentialHasher, HashError};
use warden_auth::signer::JwtSigner;
use warden_auth::AuthServices;
use warden_db::models::user::User;

pub const PASSWORD: &str = "correct-horse-battery";
pub const SUCCESS_REDIRECT: &str = "https://app.example.com/verified";
pub const ERROR_REDIRECT: &str = "https://app.example.com/verify-error";
pub const PASSWORD_RESET_REDIRECT: &str = "https://app.example.com/set-password";

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Reversible stand-in for Argon2 so tests stay fast.
pub struct PlainHasher;

impl CredentialHasher for PlainHasher {
    fn hash(&self, password: &str) -> Result<String, HashError> {
        Ok(format!("plain${password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, HashError> {
        match hash.strip_prefix("plain$") {
            Some(stored) => Ok(stored == password),
            None => Err(HashError::MalformedHash(hash.to_string())),
        }
    }
}

/// Keeps every message instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<AuthMail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<AuthMail> {
        self.sent.lock().unwrap().clone()
    }

    /// The `token` query parameter of the newest message of `kind` to `to`.
    pub fn last_token(&self, kind: MailKind, to: &str) -> Option<String> {
        self.sent()
            .iter()
            .rev()
            .find(|m| m.kind == kind && m.to == to)
            .and_then(|m| m.link.split_once("token="))
            .map(|(_, token)| token.to_string())
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &AuthMail) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        public_base_url: "https://auth.example.com".to_string(),
        password_reset_page_url: "https://app.example.com/reset-password".to_string(),
        database_url: String::new(),
    }
}

pub fn test_auth_config() -> AuthConfig {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("JWT_ACCESS_TOKEN_SECRET", "access-secret-for-tests"),
        ("JWT_REFRESH_TOKEN_SECRET", "refresh-secret-for-tests"),
        ("JWT_CONFIRM_EMAIL_TOKEN_SECRET", "confirm-secret-for-tests"),
        ("JWT_PASSWORD_RESET_TOKEN_SECRET", "reset-secret-for-tests"),
        ("VERIFY_EMAIL_SUCCESS_REDIRECT", SUCCESS_REDIRECT),
        ("VERIFY_EMAIL_ERROR_REDIRECT", ERROR_REDIRECT),
        ("VERIFY_EMAIL_PASSWORD_RESET_REDIRECT", PASSWORD_RESET_REDIRECT),
    ]);
    AuthConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).expect("valid test config")
}

pub struct TestApp {
    pub router: Router,
    pub services: AuthServices,
    pub store: MemoryStore,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    /// A fresh router handle; `oneshot` consumes it.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Sign up through the API and redeem the mailed confirmation link.
    pub async fn verified_user(&self, email: &str) -> serde_json::Value {
        let response = post_json(
            self.app(),
            "/api/v1/auth/email/signup",
            serde_json::json!({ "email": email, "password": PASSWORD }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let user = body_json(response).await["data"]["user"].clone();

        let token = self
            .mailer
            .last_token(MailKind::ConfirmEmail, email)
            .expect("confirmation mail");
        let response = get(self.app(), &format!("/api/v1/auth/email/verify?token={token}")).await;
        assert_eq!(location(&response), SUCCESS_REDIRECT);
        user
    }

    /// Log in and return the `data` object of the response.
    pub async fn login(&self, email: &str, password: &str) -> serde_json::Value {
        let response = post_json(
            self.app(),
            "/api/v1/auth/email/login",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["data"].clone()
    }

    /// Create a verified admin directly through the services.
    pub async fn admin(&self, email: &str) -> User {
        let outcome = self
            .services
            .credentials
            .signup(SignupInput {
                email: email.to_string(),
                password: PASSWORD.to_string(),
                first_name: None,
                last_name: None,
                role: Some("admin".to_string()),
            })
            .await
            .expect("admin signup");
        self.services
            .credentials
            .verify_email(outcome.user.id)
            .await
            .expect("admin verification");
        outcome.user
    }
}

/// Build the full application router over in-memory collaborators.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let store = MemoryStore::new();
    let shared = Arc::new(store.clone());
    let services = AuthServices::new(
        Arc::new(test_auth_config()),
        shared.clone(),
        shared.clone(),
        shared.clone(),
        shared,
        Arc::new(JwtSigner),
        Arc::new(PlainHasher),
    );
    let mailer = Arc::new(RecordingMailer::default());

    let state = AppState {
        pool: None,
        config: Arc::new(config.clone()),
        auth: services.clone(),
        mailer: mailer.clone(),
    };

    TestApp {
        router: build_app_router(state, &config),
        services,
        store,
        mailer,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_refresh(app: Router, refresh_token: &str) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/refresh")
        .header("x-refresh-token", refresh_token)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// The `location` header of a redirect.
pub fn location(response: &Response) -> String {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    response
        .headers()
        .get("location")
        .expect("location header")
        .to_str()
        .unwrap()
        .to_string()
}
