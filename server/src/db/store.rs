//! Store Traits
//!
//! Persistence seams consumed by the services. Implementations hold no
//! business rules: they look up, insert and replace rows, and surface
//! uniqueness violations as [`StoreError::Conflict`].

use async_trait::async_trait;

use super::error::StoreResult;
use super::models::{Account, Class, NewAccount, NewClass, Participant, Role};

/// Account persistence.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Find an account by email (case-insensitive).
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    /// Find an account by id.
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Account>>;

    /// Find an account bound to `(provider, subject)`.
    async fn find_by_provider_key(
        &self,
        provider: &str,
        subject: &str,
    ) -> StoreResult<Option<Account>>;

    /// Insert a new account and return it with its assigned id.
    async fn create(&self, account: NewAccount) -> StoreResult<Account>;

    /// Replace the profile fields and identity binding of an existing account.
    ///
    /// Never writes `role` or `is_first_login`: the stored values win over
    /// whatever the caller's copy holds. Those change only via [`Self::select_role`].
    async fn update(&self, account: &Account) -> StoreResult<Account>;

    /// Delete an account.
    async fn delete(&self, account: &Account) -> StoreResult<()>;

    /// Set the role of an account still on its first login and clear the flag
    /// in one step. Returns `None` if the role was already chosen or the
    /// account is gone.
    async fn select_role(&self, id: i64, role: Role) -> StoreResult<Option<Account>>;
}

/// Class and participant persistence.
#[async_trait]
pub trait ClassStore: Send + Sync {
    async fn find_class(&self, id: i64) -> StoreResult<Option<Class>>;

    async fn create_class(&self, class: NewClass) -> StoreResult<Class>;

    /// Classes owned by an educator, oldest first.
    async fn classes_owned_by(&self, owner_id: i64) -> StoreResult<Vec<Class>>;

    /// Classes a student participates in, oldest first.
    async fn classes_joined_by(&self, user_id: i64) -> StoreResult<Vec<Class>>;

    /// Participants of a class in join order.
    async fn participants(&self, class_id: i64) -> StoreResult<Vec<Participant>>;

    async fn find_participant(
        &self,
        user_id: i64,
        class_id: i64,
    ) -> StoreResult<Option<Participant>>;

    async fn add_participant(&self, user_id: i64, class_id: i64) -> StoreResult<Participant>;

    async fn remove_participant(&self, user_id: i64, class_id: i64) -> StoreResult<()>;
}
