//! Shared fixtures for the service-level tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use warden_auth::config::AuthConfig;
use warden_auth::credential_service::SignupInput;
use warden_auth::memory::MemoryStore;
use warden_auth::password::{CredentialHasher, HashError};
use warden_auth::signer::JwtSigner;
use warden_auth::AuthServices;
use warden_db::models::user::User;

pub const PASSWORD: &str = "correct-horse-battery";

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

pub fn test_config_with(overrides: &[(&'static str, &'static str)]) -> AuthConfig {
    let mut vars: HashMap<&str, &str> = HashMap::from([
        ("JWT_ACCESS_TOKEN_SECRET", "access-secret-for-tests"),
        ("JWT_REFRESH_TOKEN_SECRET", "refresh-secret-for-tests"),
        ("JWT_CONFIRM_EMAIL_TOKEN_SECRET", "confirm-secret-for-tests"),
        ("JWT_PASSWORD_RESET_TOKEN_SECRET", "reset-secret-for-tests"),
        ("VERIFY_EMAIL_SUCCESS_REDIRECT", "https://app.example.com/verified"),
        ("VERIFY_EMAIL_ERROR_REDIRECT", "https://app.example.com/verify-error"),
        ("VERIFY_EMAIL_PASSWORD_RESET_REDIRECT", "https://app.example.com/set-password"),
    ]);
    vars.extend(overrides.iter().copied());
    AuthConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).expect("valid test config")
}

pub fn test_config() -> AuthConfig {
    test_config_with(&[])
}

pub fn services_with(config: AuthConfig) -> (AuthServices, MemoryStore) {
    let store = MemoryStore::new();
    let shared = Arc::new(store.clone());
    let services = AuthServices::new(
        Arc::new(config),
        shared.clone(),
        shared.clone(),
        shared.clone(),
        shared,
        Arc::new(JwtSigner),
        Arc::new(PlainHasher),
    );
    (services, store)
}

pub fn services() -> (AuthServices, MemoryStore) {
    services_with(test_config())
}

pub fn signup_input(email: &str) -> SignupInput {
    SignupInput {
        email: email.to_string(),
        password: PASSWORD.to_string(),
        first_name: Some("Test".to_string()),
        last_name: Some("User".to_string()),
        role: None,
    }
}

/// Sign up and verify a user so it can log in.
pub async fn verified_user(services: &AuthServices, email: &str) -> User {
    let outcome = services
        .credentials
        .signup(signup_input(email))
        .await
        .expect("signup should succeed");
    services
        .credentials
        .verify_email(outcome.user.id)
        .await
        .expect("verification should succeed");
    outcome.user
}
