//! `PostgreSQL` store backend.

use async_trait::async_trait;
use sqlx::PgPool;

use super::error::{StoreError, StoreResult};
use super::models::{Account, Class, NewAccount, NewClass, Participant, Role};
use super::queries;
use super::store::{AccountStore, ClassStore};

/// Store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        Ok(queries::find_account_by_email(&self.pool, email).await?)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Account>> {
        Ok(queries::find_account_by_id(&self.pool, id).await?)
    }

    async fn find_by_provider_key(
        &self,
        provider: &str,
        subject: &str,
    ) -> StoreResult<Option<Account>> {
        Ok(queries::find_account_by_provider_key(&self.pool, provider, subject).await?)
    }

    async fn create(&self, account: NewAccount) -> StoreResult<Account> {
        Ok(queries::create_account(&self.pool, &account).await?)
    }

    async fn update(&self, account: &Account) -> StoreResult<Account> {
        queries::update_account(&self.pool, account)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, account: &Account) -> StoreResult<()> {
        match queries::delete_account(&self.pool, account.id).await? {
            0 => Err(StoreError::NotFound),
            _ => Ok(()),
        }
    }

    async fn select_role(&self, id: i64, role: Role) -> StoreResult<Option<Account>> {
        Ok(queries::select_account_role(&self.pool, id, role).await?)
    }
}

#[async_trait]
impl ClassStore for PgStore {
    async fn find_class(&self, id: i64) -> StoreResult<Option<Class>> {
        Ok(queries::find_class_by_id(&self.pool, id).await?)
    }

    async fn create_class(&self, class: NewClass) -> StoreResult<Class> {
        Ok(queries::create_class(&self.pool, &class).await?)
    }

    async fn classes_owned_by(&self, owner_id: i64) -> StoreResult<Vec<Class>> {
        Ok(queries::list_classes_by_owner(&self.pool, owner_id).await?)
    }

    async fn classes_joined_by(&self, user_id: i64) -> StoreResult<Vec<Class>> {
        Ok(queries::list_classes_by_participant(&self.pool, user_id).await?)
    }

    async fn participants(&self, class_id: i64) -> StoreResult<Vec<Participant>> {
        Ok(queries::list_participants(&self.pool, class_id).await?)
    }

    async fn find_participant(
        &self,
        user_id: i64,
        class_id: i64,
    ) -> StoreResult<Option<Participant>> {
        Ok(queries::find_participant(&self.pool, user_id, class_id).await?)
    }

    async fn add_participant(&self, user_id: i64, class_id: i64) -> StoreResult<Participant> {
        Ok(queries::create_participant(&self.pool, user_id, class_id).await?)
    }

    async fn remove_participant(&self, user_id: i64, class_id: i64) -> StoreResult<()> {
        match queries::delete_participant(&self.pool, user_id, class_id).await? {
            0 => Err(StoreError::NotFound),
            _ => Ok(()),
        }
    }
}
