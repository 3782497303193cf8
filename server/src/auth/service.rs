//! Auth Orchestrator
//!
//! Login, registration and federated login, plus the account operations that
//! sit behind a session: first-login role selection and profile management.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use tracing::info;
use validator::Validate;

use super::error::{AuthError, AuthResult};
use super::federation::FederationResolver;
use super::jwt::TokenIssuer;
use super::password::{hash_password_async, verify_dummy_async, verify_password_async};
use crate::db::{Account, AccountStore, NewAccount, Role, StoreError};

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));

fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Registration input.
#[derive(Debug, Clone, Validate)]
pub struct Registration {
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    pub confirm_password: String,
    #[validate(length(min = 1, max = 50, message = "First name must be 1-50 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50, message = "Last name must be 1-50 characters"))]
    pub last_name: String,
}

/// Editable profile fields.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Account as shown to its owner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_first_login: bool,
    pub auth_provider: Option<String>,
}

impl From<Account> for Profile {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
            role: account.role,
            is_first_login: account.is_first_login,
            auth_provider: account.auth_provider,
        }
    }
}

/// Authentication entry points.
#[derive(Clone)]
pub struct AuthService {
    accounts: Arc<dyn AccountStore>,
    tokens: TokenIssuer,
    federation: Option<FederationResolver>,
}

impl AuthService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        tokens: TokenIssuer,
        federation: Option<FederationResolver>,
    ) -> Self {
        Self {
            accounts,
            tokens,
            federation,
        }
    }

    /// Token issuer shared with the auth middleware.
    pub const fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Whether federated login is available.
    pub const fn has_federation(&self) -> bool {
        self.federation.is_some()
    }

    /// Exchange email and password for a session token.
    ///
    /// Unknown email and wrong password are the same error to the caller.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<String> {
        let Some(account) = self.accounts.find_by_email(email).await? else {
            verify_dummy_async(password.to_string()).await;
            info!(reason = "unknown_email", "Login failed");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password_async(password.to_string(), account.password_hash.clone()).await {
            info!(account_id = account.id, reason = "bad_password", "Login failed");
            return Err(AuthError::InvalidCredentials);
        }

        info!(account_id = account.id, "Login succeeded");
        self.tokens.issue(&account)
    }

    /// Create a password account.
    ///
    /// Checks run in a fixed order: required fields, confirmation, email
    /// format, uniqueness.
    #[tracing::instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: Registration) -> AuthResult<Account> {
        registration
            .validate()
            .map_err(|e| AuthError::Validation(e.to_string()))?;
        if registration.password != registration.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        if !is_valid_email(&registration.email) {
            return Err(AuthError::InvalidEmail);
        }
        if self
            .accounts
            .find_by_email(&registration.email)
            .await?
            .is_some()
        {
            return Err(AuthError::AccountExists);
        }

        let password_hash = hash_password_async(registration.password).await?;

        let account = self
            .accounts
            .create(NewAccount {
                email: registration.email,
                password_hash,
                first_name: registration.first_name,
                last_name: registration.last_name,
                role: Role::default(),
                is_first_login: true,
                auth_provider: None,
                provider_key: None,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AuthError::AccountExists,
                other => AuthError::Store(other),
            })?;

        info!(account_id = account.id, "Account registered");
        Ok(account)
    }

    /// Exchange a third-party identity assertion for a session token.
    #[tracing::instrument(skip_all)]
    pub async fn login_with_federated_identity(&self, assertion: &str) -> AuthResult<String> {
        let resolver = self
            .federation
            .as_ref()
            .ok_or(AuthError::FederationNotConfigured)?;

        let account = resolver.resolve(assertion).await?;
        info!(account_id = account.id, "Federated login succeeded");
        self.tokens.issue(&account)
    }

    /// One-time role choice made on first login. Returns a token carrying the new role.
    #[tracing::instrument(skip(self))]
    pub async fn select_role(&self, account_id: i64, is_educator: bool) -> AuthResult<String> {
        self.load(account_id).await?;

        let account = self
            .accounts
            .select_role(account_id, Role::from_educator_flag(is_educator))
            .await?
            .ok_or(AuthError::RoleAlreadySelected)?;

        info!(account_id, role = %account.role, "Role selected");
        self.tokens.issue(&account)
    }

    pub async fn profile(&self, account_id: i64) -> AuthResult<Profile> {
        self.load(account_id).await.map(Profile::from)
    }

    #[tracing::instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        account_id: i64,
        update: ProfileUpdate,
    ) -> AuthResult<Profile> {
        let mut account = self.load(account_id).await?;

        if !account.email.eq_ignore_ascii_case(&update.email) {
            if !is_valid_email(&update.email) {
                return Err(AuthError::InvalidEmail);
            }
            if self.accounts.find_by_email(&update.email).await?.is_some() {
                return Err(AuthError::AccountExists);
            }
        }

        account.email = update.email;
        account.first_name = update.first_name;
        account.last_name = update.last_name;

        self.save(&account).await.map(Profile::from)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_account(&self, account_id: i64) -> AuthResult<()> {
        let account = self.load(account_id).await?;
        self.accounts.delete(&account).await.map_err(|e| match e {
            StoreError::NotFound => AuthError::AccountNotFound,
            other => AuthError::Store(other),
        })?;

        info!(account_id, "Account deleted");
        Ok(())
    }

    async fn load(&self, account_id: i64) -> AuthResult<Account> {
        self.accounts
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::AccountNotFound)
    }

    async fn save(&self, account: &Account) -> AuthResult<Account> {
        self.accounts.update(account).await.map_err(|e| match e {
            StoreError::NotFound => AuthError::AccountNotFound,
            StoreError::Conflict(_) => AuthError::AccountExists,
            other => AuthError::Store(other),
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::auth::federation::tests::StaticVerifier;
    use crate::db::{InMemoryStore, StoreResult};

    /// Store that yields after every id lookup so concurrent callers interleave.
    struct YieldingStore(Arc<InMemoryStore>);

    #[async_trait]
    impl AccountStore for YieldingStore {
        async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
            self.0.find_by_email(email).await
        }

        async fn find_by_id(&self, id: i64) -> StoreResult<Option<Account>> {
            let found = self.0.find_by_id(id).await;
            tokio::task::yield_now().await;
            found
        }

        async fn find_by_provider_key(
            &self,
            provider: &str,
            subject: &str,
        ) -> StoreResult<Option<Account>> {
            self.0.find_by_provider_key(provider, subject).await
        }

        async fn create(&self, account: NewAccount) -> StoreResult<Account> {
            self.0.create(account).await
        }

        async fn update(&self, account: &Account) -> StoreResult<Account> {
            self.0.update(account).await
        }

        async fn delete(&self, account: &Account) -> StoreResult<()> {
            self.0.delete(account).await
        }

        async fn select_role(&self, id: i64, role: Role) -> StoreResult<Option<Account>> {
            self.0.select_role(id, role).await
        }
    }

    fn service_with(federation: Option<StaticVerifier>) -> (AuthService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let resolver = federation
            .map(|verifier| FederationResolver::new(Arc::new(verifier), store.clone()));
        (
            AuthService::new(store.clone(), TokenIssuer::new("test-secret", 3600), resolver),
            store,
        )
    }

    fn service() -> (AuthService, Arc<InMemoryStore>) {
        service_with(None)
    }

    fn registration(email: &str) -> Registration {
        Registration {
            email: email.to_string(),
            password: "hunter22".to_string(),
            confirm_password: "hunter22".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
        }
    }

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last+tag@school.edu.au"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("ax.com"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email(""));
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (service, _) = service();
        let account = service.register(registration("ada@x.com")).await.unwrap();

        assert_eq!(account.role, Role::Student);
        assert!(account.is_first_login);

        let token = service.login("ada@x.com", "hunter22").await.unwrap();
        let claims = service.tokens().verify(&token).unwrap();
        assert_eq!(claims.account_id().unwrap(), account.id);
        assert_eq!(claims.email, "ada@x.com");
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (service, _) = service();
        service.register(registration("ada@x.com")).await.unwrap();

        let wrong_password = service.login("ada@x.com", "nope").await.unwrap_err();
        let unknown_email = service.login("bob@x.com", "hunter22").await.unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert_eq!(wrong_password.status(), unknown_email.status());
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let (service, store) = service();
        service.register(registration("ada@x.com")).await.unwrap();

        let err = service
            .register(registration("ADA@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountExists));
        assert_eq!(store.account_count().await, 1);
    }

    #[tokio::test]
    async fn test_register_mismatch_persists_nothing() {
        let (service, store) = service();
        let mut input = registration("ada@x.com");
        input.confirm_password = "different".into();

        assert!(matches!(
            service.register(input).await,
            Err(AuthError::PasswordMismatch)
        ));
        assert_eq!(store.account_count().await, 0);
    }

    #[tokio::test]
    async fn test_register_reports_first_defect() {
        let (service, _) = service();
        service.register(registration("ada@x.com")).await.unwrap();

        // Mismatch wins over bad format.
        let mut input = registration("not-an-email");
        input.confirm_password = "different".into();
        assert!(matches!(
            service.register(input).await,
            Err(AuthError::PasswordMismatch)
        ));

        // Bad format wins over uniqueness.
        assert!(matches!(
            service.register(registration("ada@x")).await,
            Err(AuthError::InvalidEmail)
        ));
    }

    #[tokio::test]
    async fn test_role_selected_once() {
        let (service, _) = service();
        let account = service.register(registration("ada@x.com")).await.unwrap();

        let token = service.select_role(account.id, true).await.unwrap();
        let claims = service.tokens().verify(&token).unwrap();
        assert_eq!(claims.role, Role::Educator);

        assert!(matches!(
            service.select_role(account.id, false).await,
            Err(AuthError::RoleAlreadySelected)
        ));
        assert_eq!(
            service.profile(account.id).await.unwrap().role,
            Role::Educator
        );
    }

    #[tokio::test]
    async fn test_concurrent_role_selections_apply_once() {
        let store = Arc::new(InMemoryStore::new());
        let service = AuthService::new(
            Arc::new(YieldingStore(store.clone())),
            TokenIssuer::new("test-secret", 3600),
            None,
        );
        let account = service.register(registration("ada@x.com")).await.unwrap();

        let (educator, student) = tokio::join!(
            service.select_role(account.id, true),
            service.select_role(account.id, false)
        );

        let outcomes = [educator, student];
        let winners: Vec<_> = outcomes.iter().filter(|r| r.is_ok()).collect();
        assert_eq!(winners.len(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(AuthError::RoleAlreadySelected))));

        let token = winners[0].as_ref().unwrap();
        let claims = service.tokens().verify(token).unwrap();
        let stored = store.find_by_id(account.id).await.unwrap().unwrap();
        assert_eq!(stored.role, claims.role);
        assert!(!stored.is_first_login);
    }

    #[tokio::test]
    async fn test_profile_update_during_role_selection_keeps_role() {
        let store = Arc::new(InMemoryStore::new());
        let service = AuthService::new(
            Arc::new(YieldingStore(store.clone())),
            TokenIssuer::new("test-secret", 3600),
            None,
        );
        let account = service.register(registration("ada@x.com")).await.unwrap();

        let (updated, selected) = tokio::join!(
            service.update_profile(
                account.id,
                ProfileUpdate {
                    email: "ada@x.com".into(),
                    first_name: "Ada".into(),
                    last_name: "King".into(),
                },
            ),
            service.select_role(account.id, true)
        );
        updated.unwrap();
        let claims = service.tokens().verify(&selected.unwrap()).unwrap();
        assert_eq!(claims.role, Role::Educator);

        let stored = store.find_by_id(account.id).await.unwrap().unwrap();
        assert_eq!(stored.last_name, "King");
        assert_eq!(stored.role, Role::Educator);
        assert!(!stored.is_first_login);
        assert!(matches!(
            service.select_role(account.id, false).await,
            Err(AuthError::RoleAlreadySelected)
        ));
    }

    #[tokio::test]
    async fn test_select_role_for_missing_account() {
        let (service, _) = service();
        assert!(matches!(
            service.select_role(42, true).await,
            Err(AuthError::AccountNotFound)
        ));
    }

    #[tokio::test]
    async fn test_register_requires_password_and_names() {
        let (service, store) = service();

        let mut empty_password = registration("ada@x.com");
        empty_password.password = String::new();
        empty_password.confirm_password = String::new();
        assert!(matches!(
            service.register(empty_password).await,
            Err(AuthError::Validation(_))
        ));

        let mut empty_names = registration("ada@x.com");
        empty_names.first_name = String::new();
        empty_names.last_name = String::new();
        assert!(matches!(
            service.register(empty_names).await,
            Err(AuthError::Validation(_))
        ));

        let mut long_name = registration("ada@x.com");
        long_name.last_name = "x".repeat(51);
        assert!(matches!(
            service.register(long_name).await,
            Err(AuthError::Validation(_))
        ));

        assert_eq!(store.account_count().await, 0);
        assert!(matches!(
            service.login("ada@x.com", "").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_update_profile_checks_email() {
        let (service, _) = service();
        let ada = service.register(registration("ada@x.com")).await.unwrap();
        service.register(registration("bob@x.com")).await.unwrap();

        let taken = service
            .update_profile(
                ada.id,
                ProfileUpdate {
                    email: "Bob@x.com".into(),
                    first_name: "Ada".into(),
                    last_name: "King".into(),
                },
            )
            .await;
        assert!(matches!(taken, Err(AuthError::AccountExists)));

        let malformed = service
            .update_profile(
                ada.id,
                ProfileUpdate {
                    email: "ada".into(),
                    first_name: "Ada".into(),
                    last_name: "King".into(),
                },
            )
            .await;
        assert!(matches!(malformed, Err(AuthError::InvalidEmail)));

        let updated = service
            .update_profile(
                ada.id,
                ProfileUpdate {
                    email: "ada@x.com".into(),
                    first_name: "Ada".into(),
                    last_name: "King".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.last_name, "King");
    }

    #[tokio::test]
    async fn test_delete_account() {
        let (service, store) = service();
        let account = service.register(registration("ada@x.com")).await.unwrap();

        service.delete_account(account.id).await.unwrap();

        assert_eq!(store.account_count().await, 0);
        assert!(matches!(
            service.delete_account(account.id).await,
            Err(AuthError::AccountNotFound)
        ));
        assert!(matches!(
            service.login("ada@x.com", "hunter22").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_federated_login_without_provider() {
        let (service, _) = service();
        assert!(matches!(
            service.login_with_federated_identity("tok").await,
            Err(AuthError::FederationNotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_federated_login_is_idempotent() {
        let (service, store) = service_with(Some(
            StaticVerifier::default()
                .with("tok-1", "sub-1", "grace@x.com")
                .with("tok-2", "sub-1", "grace@x.com"),
        ));

        let first = service.login_with_federated_identity("tok-1").await.unwrap();
        let second = service.login_with_federated_identity("tok-2").await.unwrap();

        let a = service.tokens().verify(&first).unwrap();
        let b = service.tokens().verify(&second).unwrap();
        assert_eq!(a.sub, b.sub);
        assert_eq!(store.account_count().await, 1);
    }

    #[tokio::test]
    async fn test_federated_login_links_registered_account() {
        let (service, store) =
            service_with(Some(StaticVerifier::default().with("tok", "sub-7", "a@x.com")));
        let registered = service.register(registration("a@x.com")).await.unwrap();

        let token = service.login_with_federated_identity("tok").await.unwrap();
        let claims = service.tokens().verify(&token).unwrap();

        assert_eq!(claims.account_id().unwrap(), registered.id);
        assert_eq!(store.account_count().await, 1);
        let linked = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert!(linked.is_bound_to("Google", "sub-7"));

        // Password login keeps working after linking.
        assert!(service.login("a@x.com", "hunter22").await.is_ok());
    }
}
