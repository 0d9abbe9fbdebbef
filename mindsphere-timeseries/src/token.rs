//! Bearer token supply per tenant
//!
//! [`TokenProvider`] is the only capability the service consumes. The
//! [`TokenManager`] implementation caches one token per tenant and asks its
//! [`TokenFetcher`] for a new one once the cached token reaches its expiry
//! instant. The cache lock is never held across the fetch, so concurrent
//! callers that observe the same expired token may each refresh it.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use mindsphere_core::error::{MindSphereError, MindSphereResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

use crate::config::TenantToken;

/// Supplies a valid bearer token for a tenant
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self, tenant: &str) -> MindSphereResult<String>;
}

/// A freshly issued token and its lifetime
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in_secs: u64,
}

/// Acquires new tokens; called by [`TokenManager`] on a cache miss
#[async_trait]
pub trait TokenFetcher: Send + Sync {
    async fn fetch_token(&self, tenant: &str) -> MindSphereResult<IssuedToken>;
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Caching token provider
pub struct TokenManager<F> {
    fetcher: F,
    cache: RwLock<HashMap<String, CachedToken>>,
    refreshes: AtomicU64,
}

impl<F: TokenFetcher> TokenManager<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            cache: RwLock::new(HashMap::new()),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Number of times the fetcher has been asked for a token
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Drop the cached token for a tenant
    pub fn invalidate(&self, tenant: &str) {
        self.cache.write().remove(tenant);
    }

    fn cached(&self, tenant: &str, now: DateTime<Utc>) -> Option<String> {
        self.cache
            .read()
            .get(tenant)
            .filter(|token| now < token.expires_at)
            .map(|token| token.access_token.clone())
    }
}

fn expiry_after(now: DateTime<Utc>, secs: u64) -> DateTime<Utc> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[async_trait]
impl<F: TokenFetcher> TokenProvider for TokenManager<F> {
    async fn bearer_token(&self, tenant: &str) -> MindSphereResult<String> {
        if let Some(token) = self.cached(tenant, Utc::now()) {
            return Ok(token);
        }

        debug!(tenant, "No valid cached token, fetching a new one");
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        let issued = self.fetcher.fetch_token(tenant).await?;

        let expires_at = expiry_after(Utc::now(), issued.expires_in_secs);
        info!(tenant, %expires_at, "Acquired token");

        self.cache.write().insert(
            tenant.to_string(),
            CachedToken {
                access_token: issued.access_token.clone(),
                expires_at,
            },
        );

        Ok(issued.access_token)
    }
}

/// Fetcher handing out pre-provisioned tokens from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticTokenFetcher {
    tokens: HashMap<String, IssuedToken>,
}

impl StaticTokenFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token<T: Into<String>, S: Into<String>>(
        mut self,
        tenant: T,
        token: S,
        expires_in_secs: u64,
    ) -> Self {
        self.tokens.insert(
            tenant.into(),
            IssuedToken {
                access_token: token.into(),
                expires_in_secs,
            },
        );
        self
    }

    pub fn from_config(tokens: &[TenantToken]) -> Self {
        tokens.iter().fold(Self::new(), |fetcher, entry| {
            fetcher.with_token(
                entry.tenant.clone(),
                entry.token.clone(),
                entry.expires_in_secs,
            )
        })
    }
}

#[async_trait]
impl TokenFetcher for StaticTokenFetcher {
    async fn fetch_token(&self, tenant: &str) -> MindSphereResult<IssuedToken> {
        self.tokens.get(tenant).cloned().ok_or_else(|| {
            MindSphereError::token(format!("No token configured for tenant {}", tenant))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Fetcher issuing numbered tokens, optionally failing
    struct CountingFetcher {
        lifetime_secs: u64,
        issued: AtomicU64,
        fail: bool,
    }

    impl CountingFetcher {
        fn new(lifetime_secs: u64) -> Self {
            Self {
                lifetime_secs,
                issued: AtomicU64::new(0),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl TokenFetcher for CountingFetcher {
        async fn fetch_token(&self, tenant: &str) -> MindSphereResult<IssuedToken> {
            if self.fail {
                return Err(MindSphereError::token("token endpoint unavailable"));
            }
            let n = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
            Ok(IssuedToken {
                access_token: format!("{}-{}", tenant, n),
                expires_in_secs: self.lifetime_secs,
            })
        }
    }

    #[tokio::test]
    async fn test_token_is_reused_until_expiry() {
        let manager = TokenManager::new(CountingFetcher::new(3600));

        assert_eq!(manager.bearer_token("acme").await.unwrap(), "acme-1");
        assert_eq!(manager.bearer_token("acme").await.unwrap(), "acme-1");
        assert_eq!(manager.bearer_token("globex").await.unwrap(), "globex-2");
        assert_eq!(manager.refresh_count(), 2);
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed() {
        let manager = TokenManager::new(CountingFetcher::new(0));

        assert_eq!(manager.bearer_token("acme").await.unwrap(), "acme-1");
        assert_eq!(manager.bearer_token("acme").await.unwrap(), "acme-2");
        assert_eq!(manager.refresh_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let manager = TokenManager::new(CountingFetcher::new(3600));
        manager.bearer_token("acme").await.unwrap();
        manager.invalidate("acme");
        assert_eq!(manager.bearer_token("acme").await.unwrap(), "acme-2");
    }

    #[tokio::test]
    async fn test_fetch_failure_is_returned_unchanged_and_not_cached() {
        let mut fetcher = CountingFetcher::new(3600);
        fetcher.fail = true;
        let manager = TokenManager::new(fetcher);

        let err = manager.bearer_token("acme").await.unwrap_err();
        assert!(matches!(err, MindSphereError::TokenAcquisition(_)));
        assert_eq!(err.to_string(), "token endpoint unavailable");

        manager.bearer_token("acme").await.unwrap_err();
        assert_eq!(manager.refresh_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_get_tokens() {
        let manager = Arc::new(TokenManager::new(CountingFetcher::new(3600)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.bearer_token("acme").await })
            })
            .collect();

        for handle in handles {
            let token = handle.await.unwrap().unwrap();
            assert!(token.starts_with("acme-"));
        }
        assert!(manager.refresh_count() >= 1);
        assert!(manager.refresh_count() <= 8);
    }

    #[tokio::test]
    async fn test_static_fetcher() {
        let fetcher = StaticTokenFetcher::new().with_token("acme", "secret", 60);
        assert_eq!(
            fetcher.fetch_token("acme").await.unwrap().access_token,
            "secret"
        );

        let err = fetcher.fetch_token("globex").await.unwrap_err();
        assert_eq!(err.to_string(), "No token configured for tenant globex");
    }

    #[test]
    fn test_expiry_saturates() {
        let now = Utc::now();
        assert_eq!(expiry_after(now, u64::MAX), DateTime::<Utc>::MAX_UTC);
        assert_eq!(expiry_after(now, 0), now);
    }
}
