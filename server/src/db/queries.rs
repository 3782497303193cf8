//! Database Queries
//!
//! Runtime queries (no compile-time `DATABASE_URL` required).
//!
//! All query functions include error context logging to aid debugging.

use sqlx::PgPool;
use tracing::error;

use super::models::{Account, Class, NewAccount, NewClass, Participant, Role};

/// Log and return a database error with context.
///
/// This helper ensures all database errors are logged with relevant context
/// before being propagated, making production debugging easier.
macro_rules! db_error {
    ($query:expr, $($field:tt)*) => {
        |e| {
            error!(query = $query, $($field)*, error = %e, "Database query failed");
            e
        }
    };
}

// ============================================================================
// Account Queries
// ============================================================================

/// Find account by ID.
pub async fn find_account_by_id(pool: &PgPool, id: i64) -> sqlx::Result<Option<Account>> {
    sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_account_by_id", account_id = id))
}

/// Find account by email, ignoring case.
pub async fn find_account_by_email(pool: &PgPool, email: &str) -> sqlx::Result<Option<Account>> {
    sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_account_by_email", email = %email))
}

/// Find account by external identity binding.
pub async fn find_account_by_provider_key(
    pool: &PgPool,
    provider: &str,
    subject: &str,
) -> sqlx::Result<Option<Account>> {
    sqlx::query_as::<_, Account>(
        "SELECT * FROM accounts WHERE auth_provider = $1 AND provider_key = $2",
    )
    .bind(provider)
    .bind(subject)
    .fetch_optional(pool)
    .await
    .map_err(db_error!("find_account_by_provider_key", provider = %provider))
}

/// Create a new account.
pub async fn create_account(pool: &PgPool, account: &NewAccount) -> sqlx::Result<Account> {
    sqlx::query_as::<_, Account>(
        r"
        INSERT INTO accounts (email, password_hash, first_name, last_name, role,
                              is_first_login, auth_provider, provider_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        ",
    )
    .bind(&account.email)
    .bind(&account.password_hash)
    .bind(&account.first_name)
    .bind(&account.last_name)
    .bind(account.role)
    .bind(account.is_first_login)
    .bind(&account.auth_provider)
    .bind(&account.provider_key)
    .fetch_one(pool)
    .await
}

/// Replace the profile fields and identity binding of an account.
///
/// `role` and `is_first_login` are left alone; only [`select_account_role`]
/// writes them. Returns `None` if the row is gone.
pub async fn update_account(pool: &PgPool, account: &Account) -> sqlx::Result<Option<Account>> {
    sqlx::query_as::<_, Account>(
        r"
        UPDATE accounts
        SET email = $2, password_hash = $3, first_name = $4, last_name = $5,
            auth_provider = $6, provider_key = $7, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        ",
    )
    .bind(account.id)
    .bind(&account.email)
    .bind(&account.password_hash)
    .bind(&account.first_name)
    .bind(&account.last_name)
    .bind(&account.auth_provider)
    .bind(&account.provider_key)
    .fetch_optional(pool)
    .await
}

/// Set the role of an account that has not chosen one yet.
///
/// Returns `None` if the role was already selected or the row is gone.
pub async fn select_account_role(
    pool: &PgPool,
    id: i64,
    role: Role,
) -> sqlx::Result<Option<Account>> {
    sqlx::query_as::<_, Account>(
        r"
        UPDATE accounts
        SET role = $2, is_first_login = FALSE, updated_at = NOW()
        WHERE id = $1 AND is_first_login
        RETURNING *
        ",
    )
    .bind(id)
    .bind(role)
    .fetch_optional(pool)
    .await
    .map_err(db_error!("select_account_role", account_id = id))
}

/// Delete an account. Owned classes and participations cascade.
pub async fn delete_account(pool: &PgPool, id: i64) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(db_error!("delete_account", account_id = id))?;

    Ok(result.rows_affected())
}

// ============================================================================
// Class Queries
// ============================================================================

/// Find class by ID.
pub async fn find_class_by_id(pool: &PgPool, id: i64) -> sqlx::Result<Option<Class>> {
    sqlx::query_as::<_, Class>("SELECT * FROM classes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_class_by_id", class_id = id))
}

/// Create a class.
pub async fn create_class(pool: &PgPool, class: &NewClass) -> sqlx::Result<Class> {
    sqlx::query_as::<_, Class>(
        r"
        INSERT INTO classes (owner_id, title, user_limit)
        VALUES ($1, $2, $3)
        RETURNING *
        ",
    )
    .bind(class.owner_id)
    .bind(&class.title)
    .bind(class.user_limit)
    .fetch_one(pool)
    .await
    .map_err(db_error!("create_class", owner_id = class.owner_id))
}

/// List classes owned by an educator.
pub async fn list_classes_by_owner(pool: &PgPool, owner_id: i64) -> sqlx::Result<Vec<Class>> {
    sqlx::query_as::<_, Class>("SELECT * FROM classes WHERE owner_id = $1 ORDER BY id")
        .bind(owner_id)
        .fetch_all(pool)
        .await
        .map_err(db_error!("list_classes_by_owner", owner_id = owner_id))
}

/// List classes a student participates in.
pub async fn list_classes_by_participant(
    pool: &PgPool,
    user_id: i64,
) -> sqlx::Result<Vec<Class>> {
    sqlx::query_as::<_, Class>(
        r"
        SELECT c.* FROM classes c
        INNER JOIN participants p ON p.class_id = c.id
        WHERE p.user_id = $1
        ORDER BY c.id
        ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(db_error!("list_classes_by_participant", user_id = user_id))
}

// ============================================================================
// Participant Queries
// ============================================================================

/// List participants of a class.
pub async fn list_participants(pool: &PgPool, class_id: i64) -> sqlx::Result<Vec<Participant>> {
    sqlx::query_as::<_, Participant>(
        "SELECT * FROM participants WHERE class_id = $1 ORDER BY joined_at, id",
    )
    .bind(class_id)
    .fetch_all(pool)
    .await
    .map_err(db_error!("list_participants", class_id = class_id))
}

/// Find a participant row by user and class.
pub async fn find_participant(
    pool: &PgPool,
    user_id: i64,
    class_id: i64,
) -> sqlx::Result<Option<Participant>> {
    sqlx::query_as::<_, Participant>(
        "SELECT * FROM participants WHERE user_id = $1 AND class_id = $2",
    )
    .bind(user_id)
    .bind(class_id)
    .fetch_optional(pool)
    .await
    .map_err(db_error!("find_participant", user_id = user_id, class_id = class_id))
}

/// Add a participant to a class.
pub async fn create_participant(
    pool: &PgPool,
    user_id: i64,
    class_id: i64,
) -> sqlx::Result<Participant> {
    sqlx::query_as::<_, Participant>(
        r"
        INSERT INTO participants (user_id, class_id)
        VALUES ($1, $2)
        RETURNING *
        ",
    )
    .bind(user_id)
    .bind(class_id)
    .fetch_one(pool)
    .await
}

/// Remove a participant from a class.
pub async fn delete_participant(pool: &PgPool, user_id: i64, class_id: i64) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM participants WHERE user_id = $1 AND class_id = $2")
        .bind(user_id)
        .bind(class_id)
        .execute(pool)
        .await
        .map_err(db_error!("delete_participant", user_id = user_id, class_id = class_id))?;

    Ok(result.rows_affected())
}
