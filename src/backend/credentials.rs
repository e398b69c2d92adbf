use std::sync::{PoisonError, RwLock};

/// Source of the bearer credential. Token storage and refresh belong to the
/// embedding application.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Token fixed at construction, replaceable after a re-login.
#[derive(Debug, Default)]
pub struct StaticToken {
    token: RwLock<Option<String>>,
}

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self { token: RwLock::new(token.filter(|value| !value.trim().is_empty())) }
    }

    pub fn replace(&self, token: Option<String>) {
        let mut guard = self.token.write().unwrap_or_else(PoisonError::into_inner);
        *guard = token.filter(|value| !value.trim().is_empty());
    }
}

impl CredentialProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
