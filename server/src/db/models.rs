//! Database Models

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account role. An account is exactly one of the two.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Educator,
    #[default]
    Student,
}

impl Role {
    /// Role for the `is_educator` flag used by the wire format.
    #[must_use]
    pub const fn from_educator_flag(is_educator: bool) -> Self {
        if is_educator {
            Self::Educator
        } else {
            Self::Student
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Educator => "educator",
            Self::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account model.
///
/// `password_hash` is always populated. Federated accounts carry the hash of
/// a random secret that is never handed out.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_first_login: bool,
    pub auth_provider: Option<String>,
    pub provider_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Display name as "First Last".
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Whether this account is bound to the given provider identity.
    #[must_use]
    pub fn is_bound_to(&self, provider: &str, subject: &str) -> bool {
        self.auth_provider.as_deref() == Some(provider) && self.provider_key.as_deref() == Some(subject)
    }
}

/// Account fields supplied on creation. Id and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_first_login: bool,
    pub auth_provider: Option<String>,
    pub provider_key: Option<String>,
}

/// Class model.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub user_limit: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Class fields supplied on creation.
#[derive(Debug, Clone)]
pub struct NewClass {
    pub owner_id: i64,
    pub title: String,
    pub user_limit: i16,
}

/// Class participant (student enrolment).
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: i64,
    pub user_id: i64,
    pub class_id: i64,
    pub joined_at: DateTime<Utc>,
}
