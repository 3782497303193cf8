//! In-memory store backend.
//!
//! Mirrors the `PostgreSQL` schema constraints: case-insensitive unique email,
//! unique `(auth_provider, provider_key)`, unique `(user_id, class_id)`, and
//! cascading deletes from accounts to owned classes and participations.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::error::{StoreError, StoreResult};
use super::models::{Account, Class, NewAccount, NewClass, Participant, Role};
use super::store::{AccountStore, ClassStore};

#[derive(Debug, Default)]
struct Tables {
    accounts: BTreeMap<i64, Account>,
    classes: BTreeMap<i64, Class>,
    participants: BTreeMap<i64, Participant>,
    next_account_id: i64,
    next_class_id: i64,
    next_participant_id: i64,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.accounts
            .values()
            .any(|a| Some(a.id) != except && a.email.eq_ignore_ascii_case(email))
    }

    fn binding_taken(&self, provider: Option<&str>, key: Option<&str>, except: Option<i64>) -> bool {
        let (Some(provider), Some(key)) = (provider, key) else {
            return false;
        };
        self.accounts
            .values()
            .any(|a| Some(a.id) != except && a.is_bound_to(provider, key))
    }

    fn check_account_constraints(
        &self,
        email: &str,
        provider: Option<&str>,
        key: Option<&str>,
        except: Option<i64>,
    ) -> StoreResult<()> {
        if self.email_taken(email, except) {
            return Err(StoreError::Conflict("accounts_email_key".into()));
        }
        if self.binding_taken(provider, key, except) {
            return Err(StoreError::Conflict("accounts_provider_binding_key".into()));
        }
        Ok(())
    }
}

/// Store that keeps all rows in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    pub async fn account_count(&self) -> usize {
        self.tables.read().await.accounts.len()
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Account>> {
        Ok(self.tables.read().await.accounts.get(&id).cloned())
    }

    async fn find_by_provider_key(
        &self,
        provider: &str,
        subject: &str,
    ) -> StoreResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .values()
            .find(|a| a.is_bound_to(provider, subject))
            .cloned())
    }

    async fn create(&self, account: NewAccount) -> StoreResult<Account> {
        let mut tables = self.tables.write().await;
        tables.check_account_constraints(
            &account.email,
            account.auth_provider.as_deref(),
            account.provider_key.as_deref(),
            None,
        )?;

        tables.next_account_id += 1;
        let now = Utc::now();
        let created = Account {
            id: tables.next_account_id,
            email: account.email,
            password_hash: account.password_hash,
            first_name: account.first_name,
            last_name: account.last_name,
            role: account.role,
            is_first_login: account.is_first_login,
            auth_provider: account.auth_provider,
            provider_key: account.provider_key,
            created_at: now,
            updated_at: now,
        };
        tables.accounts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, account: &Account) -> StoreResult<Account> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables.accounts.get(&account.id) else {
            return Err(StoreError::NotFound);
        };
        let (role, is_first_login) = (stored.role, stored.is_first_login);
        tables.check_account_constraints(
            &account.email,
            account.auth_provider.as_deref(),
            account.provider_key.as_deref(),
            Some(account.id),
        )?;

        let mut updated = account.clone();
        updated.role = role;
        updated.is_first_login = is_first_login;
        updated.updated_at = Utc::now();
        tables.accounts.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, account: &Account) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.accounts.remove(&account.id).is_none() {
            return Err(StoreError::NotFound);
        }

        tables.classes.retain(|_, c| c.owner_id != account.id);
        let Tables {
            classes,
            participants,
            ..
        } = &mut *tables;
        participants.retain(|_, p| p.user_id != account.id && classes.contains_key(&p.class_id));
        Ok(())
    }

    async fn select_role(&self, id: i64, role: Role) -> StoreResult<Option<Account>> {
        let mut tables = self.tables.write().await;
        let Some(account) = tables.accounts.get_mut(&id) else {
            return Ok(None);
        };
        if !account.is_first_login {
            return Ok(None);
        }

        account.role = role;
        account.is_first_login = false;
        account.updated_at = Utc::now();
        Ok(Some(account.clone()))
    }
}

#[async_trait]
impl ClassStore for InMemoryStore {
    async fn find_class(&self, id: i64) -> StoreResult<Option<Class>> {
        Ok(self.tables.read().await.classes.get(&id).cloned())
    }

    async fn create_class(&self, class: NewClass) -> StoreResult<Class> {
        let mut tables = self.tables.write().await;
        if !tables.accounts.contains_key(&class.owner_id) {
            return Err(StoreError::NotFound);
        }

        tables.next_class_id += 1;
        let now = Utc::now();
        let created = Class {
            id: tables.next_class_id,
            owner_id: class.owner_id,
            title: class.title,
            user_limit: class.user_limit,
            created_at: now,
            updated_at: now,
        };
        tables.classes.insert(created.id, created.clone());
        Ok(created)
    }

    async fn classes_owned_by(&self, owner_id: i64) -> StoreResult<Vec<Class>> {
        let tables = self.tables.read().await;
        Ok(tables
            .classes
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn classes_joined_by(&self, user_id: i64) -> StoreResult<Vec<Class>> {
        let tables = self.tables.read().await;
        let mut joined: Vec<Class> = tables
            .participants
            .values()
            .filter(|p| p.user_id == user_id)
            .filter_map(|p| tables.classes.get(&p.class_id).cloned())
            .collect();
        joined.sort_by_key(|c| c.id);
        Ok(joined)
    }

    async fn participants(&self, class_id: i64) -> StoreResult<Vec<Participant>> {
        let tables = self.tables.read().await;
        Ok(tables
            .participants
            .values()
            .filter(|p| p.class_id == class_id)
            .cloned()
            .collect())
    }

    async fn find_participant(
        &self,
        user_id: i64,
        class_id: i64,
    ) -> StoreResult<Option<Participant>> {
        let tables = self.tables.read().await;
        Ok(tables
            .participants
            .values()
            .find(|p| p.user_id == user_id && p.class_id == class_id)
            .cloned())
    }

    async fn add_participant(&self, user_id: i64, class_id: i64) -> StoreResult<Participant> {
        let mut tables = self.tables.write().await;
        if !tables.accounts.contains_key(&user_id) || !tables.classes.contains_key(&class_id) {
            return Err(StoreError::NotFound);
        }
        if tables
            .participants
            .values()
            .any(|p| p.user_id == user_id && p.class_id == class_id)
        {
            return Err(StoreError::Conflict("participants_user_class_key".into()));
        }

        tables.next_participant_id += 1;
        let created = Participant {
            id: tables.next_participant_id,
            user_id,
            class_id,
            joined_at: Utc::now(),
        };
        tables.participants.insert(created.id, created.clone());
        Ok(created)
    }

    async fn remove_participant(&self, user_id: i64, class_id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let before = tables.participants.len();
        tables
            .participants
            .retain(|_, p| !(p.user_id == user_id && p.class_id == class_id));
        if tables.participants.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
