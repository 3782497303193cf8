//! Class participation.
//!
//! Every operation checks existence (class, then account) before asking the
//! role gate, so a missing class reports `ClassNotFound` whatever the caller's role.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::error::{ClassError, ClassResult};
use crate::db::{Account, AccountStore, Class, ClassStore, NewClass, Participant, Role, StoreError};
use crate::permissions::AuthUser;

/// Class with its owner's name and participant list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDetails {
    pub id: i64,
    pub title: String,
    pub user_limit: i16,
    pub owner: Option<String>,
    pub participants: Vec<Participant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Class as listed in "my classes".
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    pub id: i64,
    pub title: String,
    pub user_count: usize,
    pub user_limit: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ClassService {
    accounts: Arc<dyn AccountStore>,
    classes: Arc<dyn ClassStore>,
}

impl ClassService {
    pub fn new(accounts: Arc<dyn AccountStore>, classes: Arc<dyn ClassStore>) -> Self {
        Self { accounts, classes }
    }

    async fn load_class(&self, class_id: i64) -> ClassResult<Class> {
        self.classes
            .find_class(class_id)
            .await?
            .ok_or(ClassError::ClassNotFound)
    }

    async fn load_account(&self, account_id: i64) -> ClassResult<Account> {
        self.accounts
            .find_by_id(account_id)
            .await?
            .ok_or(ClassError::UserNotFound)
    }

    async fn details(&self, class: Class) -> ClassResult<ClassDetails> {
        let owner = self
            .accounts
            .find_by_id(class.owner_id)
            .await?
            .map(|a| a.full_name());
        let participants = self.classes.participants(class.id).await?;

        Ok(ClassDetails {
            id: class.id,
            title: class.title,
            user_limit: class.user_limit,
            owner,
            participants,
            created_at: class.created_at,
            updated_at: class.updated_at,
        })
    }

    async fn summary(&self, class: Class) -> ClassResult<ClassSummary> {
        let user_count = self.classes.participants(class.id).await?.len();
        Ok(ClassSummary {
            id: class.id,
            title: class.title,
            user_count,
            user_limit: class.user_limit,
            created_at: class.created_at,
            updated_at: class.updated_at,
        })
    }

    pub async fn get_class(&self, class_id: i64) -> ClassResult<ClassDetails> {
        let class = self.load_class(class_id).await?;
        self.details(class).await
    }

    /// Owned classes for educators, joined classes for students.
    pub async fn my_classes(&self, user: &AuthUser) -> ClassResult<Vec<ClassSummary>> {
        let account = self.load_account(user.current_account_id()).await?;

        let classes = if user.has_role(Role::Educator) {
            self.classes.classes_owned_by(account.id).await?
        } else {
            self.classes.classes_joined_by(account.id).await?
        };

        let mut summaries = Vec::with_capacity(classes.len());
        for class in classes {
            summaries.push(self.summary(class).await?);
        }
        Ok(summaries)
    }

    #[tracing::instrument(skip(self, user), fields(account_id = user.id))]
    pub async fn create_class(
        &self,
        user: &AuthUser,
        title: String,
        user_limit: i16,
    ) -> ClassResult<ClassDetails> {
        let account = self.load_account(user.current_account_id()).await?;
        user.require_role(Role::Educator)?;

        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(ClassError::Validation("Title must not be empty".into()));
        }
        if !(1..=255).contains(&user_limit) {
            return Err(ClassError::Validation(
                "User limit must be between 1 and 255".into(),
            ));
        }

        let class = self
            .classes
            .create_class(NewClass {
                owner_id: account.id,
                title,
                user_limit,
            })
            .await
            .map_err(|e| match e {
                StoreError::NotFound => ClassError::UserNotFound,
                other => ClassError::Store(other),
            })?;

        info!(class_id = class.id, "Class created");
        self.details(class).await
    }

    /// Join a class as a student.
    ///
    /// Capacity is checked before the insert without a lock, so two
    /// simultaneous joins may both take the last seat.
    #[tracing::instrument(skip(self, user), fields(account_id = user.id))]
    pub async fn join_class(&self, user: &AuthUser, class_id: i64) -> ClassResult<Participant> {
        let class = self.load_class(class_id).await?;
        let account = self.load_account(user.current_account_id()).await?;
        user.require_role(Role::Student)?;

        if self
            .classes
            .find_participant(account.id, class.id)
            .await?
            .is_some()
        {
            return Err(ClassError::AlreadyParticipant);
        }

        let participants = self.classes.participants(class.id).await?;
        if participants.len() >= usize::try_from(class.user_limit).unwrap_or(0) {
            return Err(ClassError::ClassFull);
        }

        let participant = self
            .classes
            .add_participant(account.id, class.id)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => ClassError::AlreadyParticipant,
                StoreError::NotFound => ClassError::ClassNotFound,
                other => ClassError::Store(other),
            })?;

        info!(class_id, "Joined class");
        Ok(participant)
    }

    #[tracing::instrument(skip(self, user), fields(account_id = user.id))]
    pub async fn leave_class(&self, user: &AuthUser, class_id: i64) -> ClassResult<()> {
        let class = self.load_class(class_id).await?;
        let account = self.load_account(user.current_account_id()).await?;
        user.require_role(Role::Student)?;

        self.classes
            .remove_participant(account.id, class.id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => ClassError::NotParticipant,
                other => ClassError::Store(other),
            })?;

        info!(class_id, "Left class");
        Ok(())
    }

    /// Remove a participant from a class the caller owns. Returns the updated class.
    #[tracing::instrument(skip(self, user), fields(account_id = user.id))]
    pub async fn remove_participant(
        &self,
        user: &AuthUser,
        class_id: i64,
        participant_id: i64,
    ) -> ClassResult<ClassDetails> {
        let class = self.load_class(class_id).await?;
        self.load_account(user.current_account_id()).await?;
        user.require_role(Role::Educator)?;
        user.require_owner(class.owner_id)?;

        self.classes
            .remove_participant(participant_id, class.id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => ClassError::NotParticipant,
                other => ClassError::Store(other),
            })?;

        info!(class_id, participant_id, "Participant removed");
        let class = self.load_class(class_id).await?;
        self.details(class).await
    }
}
