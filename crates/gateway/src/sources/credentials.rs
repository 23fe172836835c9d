//! Credential caching and the upstream token exchange.
//!
//! Authentication round-trips are expensive relative to search calls, so
//! tokens are cached in two tiers:
//!
//! 1. An in-process map guarded by an async `RwLock`, with its own short
//!    local TTL independent of the upstream-declared lifetime. Writes are
//!    whole-value replacements, so last-write-wins is safe.
//! 2. A shared `moka` cache whose entries live for the upstream-declared
//!    lifetime minus a safety margin. This tier is the authority; in a
//!    multi-process deployment it would be backed by a distributed store,
//!    and that swap is confined to this module.
//!
//! Expiry is checked lazily at read time - tokens are read far more often
//! than replaced, so no background eviction is needed.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use sourcing_hub_core::SourceId;

use super::SourceError;

/// Safety margin subtracted from upstream-declared token lifetimes.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Lifetime of the in-process copy, independent of the upstream TTL.
const LOCAL_TTL: Duration = Duration::from_secs(60);

/// Token lifetime assumed when the auth endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// A bearer token for one upstream source.
///
/// Replaced whole on refresh, never partially updated.
#[derive(Debug, Clone)]
pub struct CachedCredential {
    /// The bearer token itself.
    pub access_token: SecretString,
    /// Unix timestamp when the token expires.
    pub expires_at: i64,
}

impl CachedCredential {
    /// Whether the token is expired, applying the safety margin.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        chrono::Utc::now().timestamp() >= self.expires_at - EXPIRY_MARGIN_SECS
    }
}

struct LocalEntry {
    credential: CachedCredential,
    /// When the in-process copy must be revalidated against the shared tier.
    refresh_at: Instant,
}

/// Per-entry expiry for the shared tier: upstream lifetime minus the margin.
struct CredentialExpiry;

impl moka::Expiry<SourceId, CachedCredential> for CredentialExpiry {
    fn expire_after_create(
        &self,
        _key: &SourceId,
        value: &CachedCredential,
        _created_at: Instant,
    ) -> Option<Duration> {
        let remaining = value.expires_at - EXPIRY_MARGIN_SECS - chrono::Utc::now().timestamp();
        Some(Duration::from_secs(u64::try_from(remaining).unwrap_or(0)))
    }
}

/// Two-tier token cache shared by every connector.
pub struct CredentialCache {
    local: RwLock<HashMap<SourceId, LocalEntry>>,
    shared: Cache<SourceId, CachedCredential>,
}

impl CredentialCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            local: RwLock::new(HashMap::new()),
            shared: Cache::builder()
                .max_capacity(16)
                .expire_after(CredentialExpiry)
                .build(),
        }
    }

    /// Three-step token lookup: process memory, shared cache, then the
    /// source's auth endpoint via `authenticate`.
    ///
    /// On authentication failure nothing is cached and the error
    /// propagates; a stale or partial token is never returned.
    pub async fn get_or_authenticate<F, Fut>(
        &self,
        source: SourceId,
        authenticate: F,
    ) -> Result<CachedCredential, SourceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedCredential, SourceError>>,
    {
        if let Some(credential) = self.get(source).await {
            return Ok(credential);
        }

        let credential = authenticate().await?;
        self.store(source, credential.clone()).await;
        Ok(credential)
    }

    /// Cached read without side effects on miss; `None` on miss or expiry.
    pub async fn get(&self, source: SourceId) -> Option<CachedCredential> {
        {
            let local = self.local.read().await;
            if let Some(entry) = local.get(&source)
                && entry.refresh_at > Instant::now()
                && !entry.credential.is_expired()
            {
                return Some(entry.credential.clone());
            }
        }

        let credential = self.shared.get(&source).await?;
        if credential.is_expired() {
            return None;
        }

        debug!(%source, "populating in-process credential from shared cache");
        self.local.write().await.insert(
            source,
            LocalEntry {
                credential: credential.clone(),
                refresh_at: Instant::now() + LOCAL_TTL,
            },
        );
        Some(credential)
    }

    /// Store a fresh credential in both tiers, replacing whatever was there.
    pub async fn store(&self, source: SourceId, credential: CachedCredential) {
        self.shared.insert(source, credential.clone()).await;
        self.local.write().await.insert(
            source,
            LocalEntry {
                credential,
                refresh_at: Instant::now() + LOCAL_TTL,
            },
        );
    }

    /// Forcibly invalidate both tiers for one source.
    ///
    /// The next `get_or_authenticate` for that source will hit the auth
    /// endpoint again.
    pub async fn clear(&self, source: SourceId) {
        self.local.write().await.remove(&source);
        self.shared.invalidate(&source).await;
    }
}

impl Default for CredentialCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Token exchange
// =============================================================================

/// Request body for the client-credentials token exchange.
#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
}

/// Response from a source's auth endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Token lifetime in seconds; some sources omit it.
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Error response from a source's auth endpoint.
#[derive(Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Exchange client credentials for a bearer token.
///
/// # Errors
///
/// Returns `SourceError::Authentication` if the exchange is rejected or the
/// response cannot be decoded into a token.
#[instrument(skip(client, client_secret), fields(source = %source))]
pub async fn authenticate(
    client: &reqwest::Client,
    source: SourceId,
    token_url: &str,
    client_id: &str,
    client_secret: &SecretString,
) -> Result<CachedCredential, SourceError> {
    let now = chrono::Utc::now().timestamp();

    let response = client
        .post(token_url)
        .json(&TokenRequest {
            client_id,
            client_secret: client_secret.expose_secret(),
        })
        .send()
        .await?;

    let status = response.status();

    if status.is_success() {
        let token: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| SourceError::Authentication {
                    source,
                    message: format!("malformed token response: {e}"),
                })?;

        Ok(CachedCredential {
            access_token: SecretString::from(token.access_token),
            expires_at: now + token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
        })
    } else if status == reqwest::StatusCode::UNAUTHORIZED
        || status == reqwest::StatusCode::FORBIDDEN
    {
        let error_response: TokenErrorResponse =
            response.json().await.unwrap_or(TokenErrorResponse {
                error: None,
                message: None,
            });

        let message = error_response
            .message
            .or(error_response.error)
            .unwrap_or_else(|| "invalid client credentials".to_string());

        Err(SourceError::Authentication { source, message })
    } else {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());

        Err(SourceError::Authentication {
            source,
            message: format!("HTTP {status}: {error_text}"),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn credential(expires_in_secs: i64) -> CachedCredential {
        CachedCredential {
            access_token: SecretString::from("test-token"),
            expires_at: chrono::Utc::now().timestamp() + expires_in_secs,
        }
    }

    #[test]
    fn test_credential_is_expired() {
        // Expired an hour ago
        assert!(credential(-3600).is_expired());

        // Expires in an hour
        assert!(!credential(3600).is_expired());

        // Expires in 30 seconds - inside the 60s safety margin
        assert!(credential(30).is_expired());
    }

    #[tokio::test]
    async fn test_store_then_get_returns_credential() {
        let cache = CredentialCache::new();
        cache.store(SourceId::Alibaba, credential(3600)).await;

        let fetched = cache.get(SourceId::Alibaba).await.unwrap();
        assert_eq!(fetched.access_token.expose_secret(), "test-token");
    }

    #[tokio::test]
    async fn test_expired_credential_is_never_returned() {
        let cache = CredentialCache::new();
        cache.store(SourceId::Alibaba, credential(-10)).await;

        assert!(cache.get(SourceId::Alibaba).await.is_none());
    }

    #[tokio::test]
    async fn test_clear_invalidates_both_tiers() {
        let cache = CredentialCache::new();
        cache.store(SourceId::CjDropshipping, credential(3600)).await;
        cache.clear(SourceId::CjDropshipping).await;

        assert!(cache.get(SourceId::CjDropshipping).await.is_none());
    }

    #[tokio::test]
    async fn test_shared_tier_repopulates_local_copy() {
        let cache = CredentialCache::new();
        cache.store(SourceId::MadeInChina, credential(3600)).await;

        // Drop the in-process copy; the shared tier should still serve it.
        cache.local.write().await.clear();

        let fetched = cache.get(SourceId::MadeInChina).await.unwrap();
        assert_eq!(fetched.access_token.expose_secret(), "test-token");
        assert!(cache.local.read().await.contains_key(&SourceId::MadeInChina));
    }

    #[tokio::test]
    async fn test_get_or_authenticate_hits_auth_only_once() {
        let cache = CredentialCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let fetched = cache
                .get_or_authenticate(SourceId::Alibaba, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(credential(3600))
                })
                .await
                .unwrap();
            assert!(!fetched.is_expired());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_auth_failure_caches_nothing() {
        let cache = CredentialCache::new();

        let result = cache
            .get_or_authenticate(SourceId::Alibaba, || async {
                Err(SourceError::Authentication {
                    source: SourceId::Alibaba,
                    message: "bad secret".to_string(),
                })
            })
            .await;

        assert!(result.is_err());
        assert!(cache.get(SourceId::Alibaba).await.is_none());
    }
}
