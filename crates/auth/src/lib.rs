//! Credential and session lifecycle core.
//!
//! Leaf-first: the store traits ([`store`]) and their adapters ([`pg`],
//! [`memory`]), the [`token_service::TokenService`], the
//! [`session_service::SessionService`], and the orchestrating
//! [`credential_service::CredentialService`]. Collaborators are injected as
//! `Arc<dyn Trait>`; every service is a cheap `Clone` handle.

use std::sync::Arc;

pub mod audit;
pub mod config;
pub mod credential_service;
pub mod error;
pub mod memory;
pub mod password;
pub mod pg;
pub mod session_service;
pub mod signer;
pub mod store;
pub mod token_service;

use audit::AuditRecorder;
use config::AuthConfig;
use credential_service::CredentialService;
use memory::MemoryStore;
use password::{Argon2Hasher, CredentialHasher};
use pg::PgStore;
use session_service::SessionService;
use signer::{JwtSigner, TokenSigner};
use store::{AuditLogStore, SessionStore, TokenStore, UserDirectory};
use token_service::TokenService;

/// The wired service graph handed to the HTTP layer.
#[derive(Clone)]
pub struct AuthServices {
    pub tokens: TokenService,
    pub sessions: SessionService,
    pub credentials: CredentialService,
    pub audit: AuditRecorder,
}

impl AuthServices {
    /// Wire the services over explicit collaborators.
    pub fn new(
        config: Arc<AuthConfig>,
        token_store: Arc<dyn TokenStore>,
        session_store: Arc<dyn SessionStore>,
        users: Arc<dyn UserDirectory>,
        audit_log: Arc<dyn AuditLogStore>,
        signer: Arc<dyn TokenSigner>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        let tokens = TokenService::new(token_store, signer, Arc::clone(&config));
        let sessions = SessionService::new(session_store, tokens.clone());
        let credentials = CredentialService::new(
            users,
            hasher,
            tokens.clone(),
            sessions.clone(),
            config.min_password_length,
        );
        Self {
            tokens,
            sessions,
            credentials,
            audit: AuditRecorder::new(audit_log),
        }
    }

    /// Production wiring: PostgreSQL stores, JWT signing, Argon2id hashing.
    pub fn postgres(config: AuthConfig, pool: warden_db::DbPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self::new(
            Arc::new(config),
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            Arc::new(JwtSigner),
            Arc::new(Argon2Hasher),
        )
    }

    /// In-process wiring over a shared [`MemoryStore`].
    pub fn in_memory(config: AuthConfig, store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Self::new(
            Arc::new(config),
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            Arc::new(JwtSigner),
            Arc::new(Argon2Hasher),
        )
    }
}
