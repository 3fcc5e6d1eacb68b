//! Request identity: resolve the presented token once, then pass the result
//! explicitly to every downstream check.

use tracing::{error, instrument};

use super::{
    error::{AuthError, AuthResult},
    session::SessionManager,
};
use crate::store::{User, UserId};

/// Identity attached to a single request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Identity {
    #[default]
    Anonymous,
    User(User),
}

impl Identity {
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Anonymous => None,
            Self::User(user) => Some(user),
        }
    }
}

/// What to do with a request that needs an identity but has none.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenyPolicy {
    /// Interactive flows are sent to the sign-in page.
    Redirect(&'static str),
    /// Resource endpoints answer 401.
    Unauthorized,
}

#[derive(Clone)]
pub struct IdentityGate {
    sessions: SessionManager,
}

impl IdentityGate {
    #[must_use]
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }

    /// Resolve an optional raw token. Never fails: misses and store errors
    /// both yield `Identity::Anonymous`.
    #[instrument(skip_all)]
    pub async fn attach_identity(&self, token: Option<&str>) -> Identity {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Identity::Anonymous;
        };
        match self.sessions.resolve(token).await {
            Ok(Some(user)) => Identity::User(user),
            Ok(None) => Identity::Anonymous,
            Err(err) => {
                error!("Failed to resolve session: {err:#}");
                Identity::Anonymous
            }
        }
    }
}

/// Return the user or the policy the caller must apply before returning.
///
/// # Errors
/// Returns `policy` when the identity is anonymous.
pub fn require_identity(identity: &Identity, policy: DenyPolicy) -> Result<&User, DenyPolicy> {
    identity.user().ok_or(policy)
}

/// Allow access only to the resource owner.
///
/// # Errors
/// `Forbidden` when `user` does not own the resource.
pub fn authorize_owner(user: &User, owner_id: UserId) -> AuthResult<()> {
    if user.id == owner_id {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCredentialStore;
    use std::sync::Arc;

    fn user(id: UserId) -> User {
        User {
            id,
            email: format!("user{id}@x.com"),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn attach_identity_resolves_or_falls_back_to_anonymous() -> AuthResult<()> {
        let store = Arc::new(MemoryCredentialStore::new());
        store.insert_user(user(3)).await?;
        let sessions = SessionManager::new(store, 32);
        let session = sessions.create(3).await?;
        let gate = IdentityGate::new(sessions);

        assert_eq!(
            gate.attach_identity(Some(session.token())).await,
            Identity::User(user(3))
        );
        assert_eq!(gate.attach_identity(None).await, Identity::Anonymous);
        assert_eq!(gate.attach_identity(Some("")).await, Identity::Anonymous);
        assert_eq!(
            gate.attach_identity(Some("bogus")).await,
            Identity::Anonymous
        );
        Ok(())
    }

    #[test]
    fn require_identity_denies_anonymous() {
        assert_eq!(
            require_identity(&Identity::Anonymous, DenyPolicy::Unauthorized),
            Err(DenyPolicy::Unauthorized)
        );
        assert_eq!(
            require_identity(&Identity::Anonymous, DenyPolicy::Redirect("/signin")),
            Err(DenyPolicy::Redirect("/signin"))
        );
        let identity = Identity::User(user(5));
        assert_eq!(
            require_identity(&identity, DenyPolicy::Unauthorized).map(|u| u.id),
            Ok(5)
        );
    }

    #[test]
    fn authorize_owner_matches_ids() {
        assert!(authorize_owner(&user(1), 1).is_ok());
        assert!(matches!(
            authorize_owner(&user(1), 2),
            Err(AuthError::Forbidden)
        ));
    }
}
