//! Third-party Identity Verification
//!
//! Validates identity assertions (OpenID Connect ID tokens) issued by an
//! external provider. Google is the supported provider: its signing keys
//! are obtained through OIDC discovery and the token's signature, audience,
//! issuer and expiry are checked by `openidconnect`.

use std::future::Future;
use std::str::FromStr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use openidconnect::core::{CoreClient, CoreIdToken, CoreProviderMetadata};
use openidconnect::reqwest::async_http_client;
use openidconnect::{ClaimsVerificationError, ClientId, IssuerUrl, Nonce};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

/// Provider name stored in `accounts.auth_provider` for Google identities.
pub const GOOGLE_PROVIDER: &str = "Google";

/// Minimum time between two rediscoveries of the provider keys.
const KEY_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Whether keys fetched at `refreshed_at` may be fetched again at `now`.
fn refresh_due(refreshed_at: Instant, now: Instant) -> bool {
    now.saturating_duration_since(refreshed_at) >= KEY_REFRESH_INTERVAL
}

/// Provider keys plus the time they were last fetched.
///
/// Readers take a short read lock on the current value. A refresh is gated by
/// a separate mutex, so the fetch itself runs without blocking readers and
/// concurrent refreshers wait for one fetch instead of starting their own.
struct KeyCache<T> {
    current: RwLock<T>,
    refreshed_at: Mutex<Instant>,
}

impl<T> KeyCache<T> {
    fn new(value: T, refreshed_at: Instant) -> Self {
        Self {
            current: RwLock::new(value),
            refreshed_at: Mutex::new(refreshed_at),
        }
    }

    async fn read(&self) -> RwLockReadGuard<'_, T> {
        self.current.read().await
    }

    /// Replace the value with a fresh fetch unless one ran within
    /// [`KEY_REFRESH_INTERVAL`]. Returns whether a fetch ran.
    async fn refresh<F, Fut, E>(&self, fetch: F) -> Result<bool, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut refreshed_at = self.refreshed_at.lock().await;
        if !refresh_due(*refreshed_at, Instant::now()) {
            return Ok(false);
        }

        // Failed attempts count toward the interval too.
        *refreshed_at = Instant::now();
        let fresh = fetch().await?;
        *self.current.write().await = fresh;
        Ok(true)
    }
}

/// Identity extracted from a validated assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Provider-specific subject identifier.
    pub subject: String,
    /// Email address asserted by the provider.
    pub email: Option<String>,
    /// Whether the provider has verified the email (absent if not stated).
    pub email_verified: Option<bool>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

/// Identity verification failures.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The assertion is not valid for this provider and client.
    #[error("Identity assertion rejected: {0}")]
    Rejected(String),

    /// The provider could not be reached or returned unusable metadata.
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Verifies identity assertions from one external provider.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Provider name bound to accounts (e.g. `"Google"`).
    fn provider(&self) -> &str;

    /// Validate an assertion and extract the identity it carries.
    async fn verify(&self, assertion: &str) -> Result<VerifiedIdentity, IdentityError>;
}

/// Google ID token verifier.
///
/// Holds the discovered provider client. On a signature failure the
/// metadata (and so the JWKS) is rediscovered to follow key rotation, at most
/// once per [`KEY_REFRESH_INTERVAL`].
pub struct GoogleIdTokenVerifier {
    issuer: IssuerUrl,
    client_id: ClientId,
    client: KeyCache<CoreClient>,
}

impl GoogleIdTokenVerifier {
    /// Discover the provider and build a verifier for `client_id`.
    pub async fn discover(issuer_url: &str, client_id: &str) -> anyhow::Result<Self> {
        let issuer = IssuerUrl::new(issuer_url.to_string())?;
        let client_id = ClientId::new(client_id.to_string());
        let client = Self::build_client(&issuer, &client_id).await?;

        info!(issuer = %issuer_url, "Identity provider metadata discovered");

        Ok(Self {
            issuer,
            client_id,
            client: KeyCache::new(client, Instant::now()),
        })
    }

    async fn build_client(issuer: &IssuerUrl, client_id: &ClientId) -> anyhow::Result<CoreClient> {
        let metadata = CoreProviderMetadata::discover_async(issuer.clone(), async_http_client)
            .await
            .map_err(|e| anyhow::anyhow!("OIDC discovery failed: {e}"))?;

        Ok(CoreClient::from_provider_metadata(
            metadata,
            client_id.clone(),
            None,
        ))
    }

    /// Rediscover the provider keys unless that happened within the interval.
    async fn refresh_keys(&self) -> Result<(), IdentityError> {
        let refreshed = self
            .client
            .refresh(|| Self::build_client(&self.issuer, &self.client_id))
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        if refreshed {
            info!("Identity provider signing keys refreshed");
        } else {
            debug!("Provider keys refreshed recently, skipping rediscovery");
        }
        Ok(())
    }

    async fn check(&self, token: &CoreIdToken) -> Result<VerifiedIdentity, ClaimsVerificationError> {
        let client = self.client.read().await;
        let verifier = client.id_token_verifier();
        // Sign-in button tokens are not bound to a nonce we issued.
        let claims = token.claims(&verifier, |_: Option<&Nonce>| Ok::<(), String>(()))?;

        Ok(VerifiedIdentity {
            subject: claims.subject().to_string(),
            email: claims.email().map(|e| e.to_string()),
            email_verified: claims.email_verified(),
            given_name: claims
                .given_name()
                .and_then(|n| n.get(None))
                .map(|n| n.to_string()),
            family_name: claims
                .family_name()
                .and_then(|n| n.get(None))
                .map(|n| n.to_string()),
        })
    }
}

#[async_trait]
impl IdentityVerifier for GoogleIdTokenVerifier {
    fn provider(&self) -> &str {
        GOOGLE_PROVIDER
    }

    async fn verify(&self, assertion: &str) -> Result<VerifiedIdentity, IdentityError> {
        let token = CoreIdToken::from_str(assertion)
            .map_err(|e| IdentityError::Rejected(format!("malformed ID token: {e}")))?;

        match self.check(&token).await {
            Ok(identity) => Ok(identity),
            Err(ClaimsVerificationError::SignatureVerification(e)) => {
                warn!(error = %e, "ID token signature check failed, refreshing provider keys");
                self.refresh_keys().await?;
                self.check(&token)
                    .await
                    .map_err(|e| IdentityError::Rejected(e.to_string()))
            }
            Err(e) => Err(IdentityError::Rejected(e.to_string())),
        }
    }
}
