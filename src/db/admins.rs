//! Admin accounts and their single active session.

use chrono::Utc;
use sqlx::AnyPool;

use super::format_timestamp;
use super::models::{Admin, AdminRow};
use crate::error::AppError;

const ADMIN_COLUMNS: &str =
    "id, username, email, password_hash, full_name, is_active, created_at, last_login, session_token";

/// Look an admin up by username or email, ignoring case.
pub async fn find_by_login(pool: &AnyPool, login: &str) -> Result<Option<Admin>, AppError> {
    let row = sqlx::query_as::<_, AdminRow>(&format!(
        "SELECT {} FROM admins WHERE LOWER(username) = LOWER($1) OR LOWER(email) = LOWER($1) \
         ORDER BY id LIMIT 1",
        ADMIN_COLUMNS
    ))
    .bind(login.trim())
    .fetch_optional(pool)
    .await?;

    row.map(Admin::try_from).transpose()
}

pub async fn find_by_id(pool: &AnyPool, id: i64) -> Result<Option<Admin>, AppError> {
    let row = sqlx::query_as::<_, AdminRow>(&format!("SELECT {} FROM admins WHERE id = $1", ADMIN_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(Admin::try_from).transpose()
}

pub async fn count(pool: &AnyPool) -> Result<i64, AppError> {
    Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM admins")
        .fetch_one(pool)
        .await?)
}

pub async fn create(
    pool: &AnyPool,
    username: &str,
    email: &str,
    full_name: &str,
    password_hash: &str,
) -> Result<Admin, AppError> {
    let row = sqlx::query_as::<_, AdminRow>(&format!(
        "INSERT INTO admins (username, email, password_hash, full_name, is_active, created_at) \
         VALUES ($1, $2, $3, $4, 1, $5) RETURNING {}",
        ADMIN_COLUMNS
    ))
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(full_name)
    .bind(format_timestamp(Utc::now()))
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::from_write(e, "Admin already exists"))?;

    tracing::info!(username, "Admin account created");
    row.try_into()
}

/// Start a new session: store the session hash and stamp `last_login`.
/// Any previously issued token stops verifying.
pub async fn start_session(pool: &AnyPool, id: i64, session_hash: &str) -> Result<(), AppError> {
    sqlx::query("UPDATE admins SET session_token = $1, last_login = $2 WHERE id = $3")
        .bind(session_hash)
        .bind(format_timestamp(Utc::now()))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn clear_session(pool: &AnyPool, id: i64) -> Result<(), AppError> {
    sqlx::query("UPDATE admins SET session_token = NULL WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Change display name and/or email. An email held by another admin
/// (compared without case) is a conflict.
pub async fn update_profile(
    pool: &AnyPool,
    id: i64,
    full_name: Option<&str>,
    email: Option<&str>,
) -> Result<Admin, AppError> {
    let mut tx = pool.begin().await?;

    if let Some(email) = email {
        let taken = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM admins WHERE LOWER(email) = LOWER($1) AND id <> $2 LIMIT 1",
        )
        .bind(email)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        if taken.is_some() {
            return Err(AppError::Conflict("Email already in use".to_string()));
        }
    }

    let row = sqlx::query_as::<_, AdminRow>(&format!(
        "UPDATE admins SET full_name = COALESCE($1, full_name), email = COALESCE($2, email) \
         WHERE id = $3 RETURNING {}",
        ADMIN_COLUMNS
    ))
    .bind(full_name)
    .bind(email)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| AppError::from_write(e, "Email already in use"))?
    .ok_or_else(|| AppError::not_found("Admin"))?;

    tx.commit().await?;

    tracing::info!(id, "Admin profile updated");
    row.try_into()
}

pub async fn update_password(pool: &AnyPool, id: i64, password_hash: &str) -> Result<(), AppError> {
    let result = sqlx::query("UPDATE admins SET password_hash = $1 WHERE id = $2")
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Admin"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::empty_pool;

    #[tokio::test]
    async fn test_find_by_username_or_email_ignores_case() {
        let pool = empty_pool().await;
        let admin = create(&pool, "admin", "Dr@Example.com", "Dr. Admin", "hash").await.unwrap();

        for login in ["admin", "ADMIN", "dr@example.com", " Dr@Example.com "] {
            let found = find_by_login(&pool, login).await.unwrap().unwrap();
            assert_eq!(found.id, admin.id);
        }
        assert!(find_by_login(&pool, "nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let pool = empty_pool().await;
        let admin = create(&pool, "admin", "a@example.com", "Admin", "hash").await.unwrap();
        assert!(admin.session_token.is_none());
        assert!(admin.last_login.is_none());

        start_session(&pool, admin.id, "abc").await.unwrap();
        let active = find_by_id(&pool, admin.id).await.unwrap().unwrap();
        assert_eq!(active.session_token.as_deref(), Some("abc"));
        assert!(active.last_login.is_some());

        clear_session(&pool, admin.id).await.unwrap();
        let cleared = find_by_id(&pool, admin.id).await.unwrap().unwrap();
        assert!(cleared.session_token.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_admin_conflicts() {
        let pool = empty_pool().await;
        create(&pool, "admin", "a@example.com", "Admin", "hash").await.unwrap();
        assert!(matches!(
            create(&pool, "admin", "b@example.com", "Admin", "hash").await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(count(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_password() {
        let pool = empty_pool().await;
        let admin = create(&pool, "admin", "a@example.com", "Admin", "old").await.unwrap();
        update_password(&pool, admin.id, "new").await.unwrap();
        let stored = find_by_id(&pool, admin.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "new");
        assert!(matches!(
            update_password(&pool, 999, "x").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_profile_changes_only_given_fields() {
        let pool = empty_pool().await;
        let admin = create(&pool, "admin", "a@example.com", "Admin", "h").await.unwrap();

        let updated = update_profile(&pool, admin.id, Some("Dr. Admin"), None).await.unwrap();
        assert_eq!(updated.full_name, "Dr. Admin");
        assert_eq!(updated.email, "a@example.com");

        let updated = update_profile(&pool, admin.id, None, Some("novo@example.com")).await.unwrap();
        assert_eq!(updated.full_name, "Dr. Admin");
        assert_eq!(updated.email, "novo@example.com");

        // keeping one's own email is not a conflict
        assert!(update_profile(&pool, admin.id, None, Some("NOVO@example.com")).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_profile_rejects_email_of_another_admin() {
        let pool = empty_pool().await;
        let first = create(&pool, "admin", "a@example.com", "Admin", "h").await.unwrap();
        create(&pool, "other", "b@example.com", "Other", "h").await.unwrap();

        assert!(matches!(
            update_profile(&pool, first.id, None, Some("B@example.com")).await,
            Err(AppError::Conflict(_))
        ));
        let stored = find_by_id(&pool, first.id).await.unwrap().unwrap();
        assert_eq!(stored.email, "a@example.com");
        assert!(matches!(
            update_profile(&pool, 999, Some("x"), None).await,
            Err(AppError::NotFound(_))
        ));
    }
}
