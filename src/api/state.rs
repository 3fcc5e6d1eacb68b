//! Shared request state: the auth services wired to one store.

use std::sync::Arc;

use super::email::EmailSender;
use crate::auth::{
    AuthConfig, Clock, IdentityGate, PasswordResetManager, SessionManager, UserService,
};
use crate::store::{CredentialStore, GalleryStore};

pub struct AppState {
    config: AuthConfig,
    users: UserService,
    sessions: SessionManager,
    resets: PasswordResetManager,
    gate: IdentityGate,
    galleries: Arc<dyn GalleryStore>,
    email: Arc<dyn EmailSender>,
}

impl AppState {
    pub fn new<S>(
        config: AuthConfig,
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        email: Arc<dyn EmailSender>,
    ) -> Self
    where
        S: CredentialStore + GalleryStore + 'static,
    {
        let credentials: Arc<dyn CredentialStore> = store.clone();
        let sessions = SessionManager::new(credentials.clone(), config.session_token_bytes());
        Self {
            users: UserService::new(credentials.clone()),
            resets: PasswordResetManager::new(credentials, clock, config.clone()),
            gate: IdentityGate::new(sessions.clone()),
            sessions,
            galleries: store,
            email,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn users(&self) -> &UserService {
        &self.users
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    #[must_use]
    pub fn resets(&self) -> &PasswordResetManager {
        &self.resets
    }

    #[must_use]
    pub fn gate(&self) -> &IdentityGate {
        &self.gate
    }

    #[must_use]
    pub fn galleries(&self) -> &dyn GalleryStore {
        self.galleries.as_ref()
    }

    #[must_use]
    pub fn email(&self) -> &dyn EmailSender {
        self.email.as_ref()
    }
}
