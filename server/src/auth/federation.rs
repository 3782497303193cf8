//! Identity Federation
//!
//! Maps a validated third-party identity onto a local account: an account
//! already bound to the identity, an existing local account with the same
//! email (which gets linked), or a freshly provisioned account.

use std::sync::Arc;

use tracing::{info, warn};

use super::error::{AuthError, AuthResult};
use super::oidc::{IdentityError, IdentityVerifier, VerifiedIdentity};
use super::password::{hash_password_async, random_password};
use crate::db::{Account, AccountStore, NewAccount, Role, StoreError};

/// Resolves identity assertions to accounts.
#[derive(Clone)]
pub struct FederationResolver {
    verifier: Arc<dyn IdentityVerifier>,
    accounts: Arc<dyn AccountStore>,
}

impl FederationResolver {
    pub fn new(verifier: Arc<dyn IdentityVerifier>, accounts: Arc<dyn AccountStore>) -> Self {
        Self { verifier, accounts }
    }

    /// Provider name accounts are bound under.
    pub fn provider(&self) -> &str {
        self.verifier.provider()
    }

    /// Resolve an assertion to an account, linking or provisioning as needed.
    #[tracing::instrument(skip_all, fields(provider = %self.provider()))]
    pub async fn resolve(&self, assertion: &str) -> AuthResult<Account> {
        if assertion.trim().is_empty() {
            return Err(AuthError::InvalidAssertion);
        }

        let identity = self.verifier.verify(assertion).await.map_err(|e| match e {
            IdentityError::Rejected(reason) => {
                info!(reason = %reason, "Identity assertion rejected");
                AuthError::InvalidIdentityToken
            }
            IdentityError::Unavailable(reason) => {
                AuthError::Internal(format!("Identity provider unavailable: {reason}"))
            }
        })?;

        let email = identity
            .email
            .clone()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                info!(subject = %identity.subject, "Identity assertion carries no email");
                AuthError::InvalidIdentityToken
            })?;
        if identity.email_verified == Some(false) {
            info!(subject = %identity.subject, "Identity assertion email is unverified");
            return Err(AuthError::InvalidIdentityToken);
        }

        let provider = self.provider().to_string();

        if let Some(account) = self
            .accounts
            .find_by_provider_key(&provider, &identity.subject)
            .await?
        {
            return Ok(account);
        }

        if let Some(account) = self.accounts.find_by_email(&email).await? {
            return self.link(account, &provider, &identity.subject).await;
        }

        match self.provision(&provider, &email, &identity).await {
            Ok(account) => Ok(account),
            Err(AuthError::Store(StoreError::Conflict(constraint))) => {
                // Lost a race against a concurrent login for the same identity.
                warn!(constraint = %constraint, subject = %identity.subject, "Federated account creation conflicted, retrying lookup");
                self.accounts
                    .find_by_provider_key(&provider, &identity.subject)
                    .await?
                    .ok_or(AuthError::IdentityConflict)
            }
            Err(e) => Err(e),
        }
    }

    async fn link(&self, mut account: Account, provider: &str, subject: &str) -> AuthResult<Account> {
        if account.auth_provider.as_deref() == Some(provider) && account.provider_key.is_some() {
            warn!(
                account_id = account.id,
                "Email already bound to a different identity of this provider"
            );
            return Err(AuthError::IdentityConflict);
        }

        account.auth_provider = Some(provider.to_string());
        account.provider_key = Some(subject.to_string());

        let linked = self.accounts.update(&account).await.map_err(|e| match e {
            StoreError::Conflict(_) => AuthError::IdentityConflict,
            StoreError::NotFound => AuthError::AccountNotFound,
            other => AuthError::Store(other),
        })?;

        info!(account_id = linked.id, "Linked external identity to existing account");
        Ok(linked)
    }

    async fn provision(
        &self,
        provider: &str,
        email: &str,
        identity: &VerifiedIdentity,
    ) -> AuthResult<Account> {
        let password_hash = hash_password_async(random_password()).await?;

        let account = self
            .accounts
            .create(NewAccount {
                email: email.to_string(),
                password_hash,
                first_name: identity.given_name.clone().unwrap_or_default(),
                last_name: identity.family_name.clone().unwrap_or_default(),
                role: Role::Student,
                is_first_login: true,
                auth_provider: Some(provider.to_string()),
                provider_key: Some(identity.subject.clone()),
            })
            .await?;

        info!(account_id = account.id, "Provisioned account from external identity");
        Ok(account)
    }
}
