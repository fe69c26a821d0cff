//! Per-scope caching of resolved API tokens

use std::collections::HashMap;

use crate::error::Result;
use crate::remote::hosting::{ApiToken, TokenScope};

/// Tokens resolved so far, one per scope.
///
/// Resolving a token may read files or the environment; the cache makes that
/// happen at most once per scope for the lifetime of a remote manager.
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    tokens: HashMap<TokenScope, ApiToken>,
}

impl TokenCache {
    /// Create a new empty token cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the token for `scope`, or resolve and cache it if not present.
    ///
    /// A failed resolution is not cached.
    pub fn get_or_resolve<F>(&mut self, scope: TokenScope, resolver: F) -> Result<ApiToken>
    where
        F: FnOnce() -> Result<ApiToken>,
    {
        if let Some(cached) = self.tokens.get(&scope) {
            return Ok(cached.clone());
        }

        let token = resolver()?;
        self.tokens.insert(scope, token.clone());
        Ok(token)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.tokens.len()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, scope: TokenScope) -> bool {
        self.tokens.contains_key(&scope)
    }
}
