//! In-memory session credentials

use async_trait::async_trait;
use brigade_core::TokenProvider;
use parking_lot::RwLock;

/// Bearer token shared between the session layer and the HTTP client.
///
/// The session layer replaces the token on sign-in and refresh; every
/// outgoing request reads it at call time. An empty token is treated the
/// same as no token.
pub struct SessionTokens {
    token: RwLock<Option<String>>,
}

impl SessionTokens {
    #[must_use]
    pub fn new(initial: Option<String>) -> Self {
        Self {
            token: RwLock::new(initial),
        }
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    /// Drop the credential; subsequent requests go out anonymous.
    pub fn clear_token(&self) {
        *self.token.write() = None;
    }
}

#[async_trait]
impl TokenProvider for SessionTokens {
    async fn bearer_token(&self) -> Option<String> {
        self.token.read().clone().filter(|token| !token.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_roundtrip() {
        let session = SessionTokens::new(None);
        assert_eq!(session.bearer_token().await, None);

        session.set_token("abc");
        assert_eq!(session.bearer_token().await, Some("abc".to_string()));

        session.clear_token();
        assert_eq!(session.bearer_token().await, None);
    }

    #[tokio::test]
    async fn test_empty_token_reads_as_absent() {
        let session = SessionTokens::new(Some(String::new()));
        assert_eq!(session.bearer_token().await, None);
    }
}
