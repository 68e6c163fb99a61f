//! Per-session identity.
//!
//! The rest of the crate treats an identity as an opaque equality key.
//! `SessionIdentity` hands out one random token and keeps returning it for as
//! long as the value lives, which is all a session needs.

use crate::game::{GameError, PlayerId};
use async_trait::async_trait;
use std::sync::OnceLock;
use thiserror::Error;

/// Identity could not be obtained
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Identity unavailable: {0}")]
pub struct IdentityError(pub String);

impl From<IdentityError> for GameError {
    fn from(err: IdentityError) -> Self {
        GameError::CollaboratorUnavailable(err.0)
    }
}

/// Source of the caller's identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn identity(&self) -> Result<PlayerId, IdentityError>;
}

/// Random identity generated on first use, stable afterwards.
#[derive(Debug, Default)]
pub struct SessionIdentity {
    id: OnceLock<PlayerId>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse a token issued earlier in the same session.
    pub fn restore(id: PlayerId) -> Self {
        Self {
            id: OnceLock::from(id),
        }
    }

    pub fn get(&self) -> &PlayerId {
        self.id.get_or_init(PlayerId::generate)
    }
}

#[async_trait]
impl IdentityProvider for SessionIdentity {
    async fn identity(&self) -> Result<PlayerId, IdentityError> {
        Ok(self.get().clone())
    }
}

#[async_trait]
impl IdentityProvider for PlayerId {
    async fn identity(&self) -> Result<PlayerId, IdentityError> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_identity_is_stable() {
        let session = SessionIdentity::new();
        let first = session.identity().await.unwrap();
        let second = session.identity().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_str().len(), 32);

        assert_ne!(first, SessionIdentity::new().identity().await.unwrap());
    }

    #[tokio::test]
    async fn test_restore_keeps_token() {
        let session = SessionIdentity::restore(PlayerId::new("abc"));
        assert_eq!(session.identity().await.unwrap(), PlayerId::new("abc"));
    }

    #[test]
    fn test_failure_maps_to_collaborator_error() {
        let err: GameError = IdentityError("no session storage".into()).into();
        assert_eq!(err.kind(), crate::game::ErrorKind::CollaboratorUnavailable);
    }
}
