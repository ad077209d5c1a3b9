//! Content sections and site settings: two independent key-value tables
//! holding opaque JSON documents.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::AnyPool;

use super::models::{encode_json, ContentRow, ContentSection, Setting, SettingRow};
use super::{format_timestamp, next_timestamp, parse_timestamp};
use crate::error::AppError;

// ============================================================================
// Content sections
// ============================================================================

pub async fn list_sections(pool: &AnyPool) -> Result<Vec<ContentSection>, AppError> {
    let rows = sqlx::query_as::<_, ContentRow>(
        "SELECT section_id, section_name, content_data, updated_at FROM site_content ORDER BY section_id",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ContentSection::try_from).collect()
}

pub async fn get_section(pool: &AnyPool, section_id: &str) -> Result<ContentSection, AppError> {
    sqlx::query_as::<_, ContentRow>(
        "SELECT section_id, section_name, content_data, updated_at FROM site_content WHERE section_id = $1",
    )
    .bind(section_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Section"))?
    .try_into()
}

/// Create or replace a section. A missing `section_name` keeps the stored
/// one, or falls back to the id for a new section.
pub async fn put_section(
    pool: &AnyPool,
    section_id: &str,
    section_name: Option<&str>,
    data: &Value,
) -> Result<ContentSection, AppError> {
    let encoded = encode_json(data)?;
    let mut tx = pool.begin().await?;

    let existing = sqlx::query_as::<_, (String, String)>(
        "SELECT section_name, updated_at FROM site_content WHERE section_id = $1",
    )
    .bind(section_id)
    .fetch_optional(&mut *tx)
    .await?;

    let (name, updated_at) = match existing {
        Some((stored_name, stored_at)) => {
            let name = section_name.map(str::to_string).unwrap_or(stored_name);
            let updated_at = next_timestamp(Some(parse_timestamp(&stored_at)?));
            sqlx::query(
                "UPDATE site_content SET section_name = $1, content_data = $2, updated_at = $3 WHERE section_id = $4",
            )
            .bind(&name)
            .bind(&encoded)
            .bind(format_timestamp(updated_at))
            .bind(section_id)
            .execute(&mut *tx)
            .await?;
            (name, updated_at)
        }
        None => {
            let name = section_name.unwrap_or(section_id).to_string();
            let updated_at = next_timestamp(None);
            sqlx::query(
                "INSERT INTO site_content (section_id, section_name, content_data, updated_at) VALUES ($1, $2, $3, $4)",
            )
            .bind(section_id)
            .bind(&name)
            .bind(&encoded)
            .bind(format_timestamp(updated_at))
            .execute(&mut *tx)
            .await?;
            tracing::info!(section_id, "Created content section");
            (name, updated_at)
        }
    };

    tx.commit().await?;

    Ok(ContentSection {
        section_id: section_id.to_string(),
        section_name: name,
        content_data: data.clone(),
        updated_at,
    })
}

// ============================================================================
// Settings
// ============================================================================

pub async fn list_settings(pool: &AnyPool) -> Result<Vec<Setting>, AppError> {
    let rows = sqlx::query_as::<_, SettingRow>(
        "SELECT setting_key, setting_value, updated_at FROM site_settings ORDER BY setting_key",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Setting::try_from).collect()
}

pub async fn get_setting(pool: &AnyPool, key: &str) -> Result<Setting, AppError> {
    sqlx::query_as::<_, SettingRow>(
        "SELECT setting_key, setting_value, updated_at FROM site_settings WHERE setting_key = $1",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Setting"))?
    .try_into()
}

pub async fn put_setting(pool: &AnyPool, key: &str, value: &Value) -> Result<Setting, AppError> {
    let encoded = encode_json(value)?;
    let mut tx = pool.begin().await?;

    let previous: Option<DateTime<Utc>> = sqlx::query_scalar::<_, String>(
        "SELECT updated_at FROM site_settings WHERE setting_key = $1",
    )
    .bind(key)
    .fetch_optional(&mut *tx)
    .await?
    .map(|raw| parse_timestamp(&raw))
    .transpose()?;

    let updated_at = next_timestamp(previous);
    let stamp = format_timestamp(updated_at);

    if previous.is_some() {
        sqlx::query("UPDATE site_settings SET setting_value = $1, updated_at = $2 WHERE setting_key = $3")
            .bind(&encoded)
            .bind(&stamp)
            .bind(key)
            .execute(&mut *tx)
            .await?;
    } else {
        sqlx::query("INSERT INTO site_settings (setting_key, setting_value, updated_at) VALUES ($1, $2, $3)")
            .bind(key)
            .bind(&encoded)
            .bind(&stamp)
            .execute(&mut *tx)
            .await?;
        tracing::info!(setting_key = key, "Created setting");
    }

    tx.commit().await?;

    Ok(Setting {
        setting_key: key.to_string(),
        setting_value: value.clone(),
        updated_at,
    })
}

/// Seed a section unless one with the same id exists. Returns whether a row
/// was written.
pub async fn insert_section_if_missing(
    pool: &AnyPool,
    section_id: &str,
    section_name: &str,
    data: &Value,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        INSERT INTO site_content (section_id, section_name, content_data, updated_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (section_id) DO NOTHING
        "#,
    )
    .bind(section_id)
    .bind(section_name)
    .bind(encode_json(data)?)
    .bind(format_timestamp(Utc::now()))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn insert_setting_if_missing(pool: &AnyPool, key: &str, value: &Value) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        INSERT INTO site_settings (setting_key, setting_value, updated_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (setting_key) DO NOTHING
        "#,
    )
    .bind(key)
    .bind(encode_json(value)?)
    .bind(format_timestamp(Utc::now()))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::empty_pool;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_missing_section_is_not_found() {
        let pool = empty_pool().await;
        assert!(matches!(
            get_section(&pool, "hero").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_put_creates_unknown_section_with_id_as_name() {
        let pool = empty_pool().await;
        let created = put_section(&pool, "faq", None, &json!({"items": []})).await.unwrap();
        assert_eq!(created.section_name, "faq");

        let fetched = get_section(&pool, "faq").await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_put_section_keeps_name_and_advances_timestamp() {
        let pool = empty_pool().await;
        let first = put_section(&pool, "hero", Some("Hero"), &json!({"title": "A"}))
            .await
            .unwrap();
        let second = put_section(&pool, "hero", None, &json!({"title": "B"}))
            .await
            .unwrap();

        assert_eq!(second.section_name, "Hero");
        assert_eq!(second.content_data, json!({"title": "B"}));
        assert!(second.updated_at > first.updated_at);
        assert_eq!(list_sections(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_setting_round_trip_is_strictly_later() {
        let pool = empty_pool().await;
        let first = put_setting(&pool, "theme", &json!({"primary": "#000"})).await.unwrap();
        for i in 0..5 {
            let value = json!({"primary": format!("#{}{}{}", i, i, i)});
            let written = put_setting(&pool, "theme", &value).await.unwrap();
            let read = get_setting(&pool, "theme").await.unwrap();
            assert_eq!(read.setting_value, value);
            assert!(read.updated_at > first.updated_at);
            assert_eq!(read.updated_at, written.updated_at);
        }
    }

    #[tokio::test]
    async fn test_settings_accept_any_json_type() {
        let pool = empty_pool().await;
        put_setting(&pool, "maintenance", &json!(false)).await.unwrap();
        put_setting(&pool, "tagline", &json!("Cuidando do seu coração")).await.unwrap();

        let all = list_settings(&pool).await.unwrap();
        let keys: Vec<_> = all.iter().map(|s| s.setting_key.as_str()).collect();
        assert_eq!(keys, vec!["maintenance", "tagline"]);
        assert_eq!(all[0].setting_value, json!(false));
    }

    #[tokio::test]
    async fn test_insert_if_missing_never_overwrites() {
        let pool = empty_pool().await;
        put_setting(&pool, "site_info", &json!({"title": "Custom"})).await.unwrap();
        let written = insert_setting_if_missing(&pool, "site_info", &json!({"title": "Default"}))
            .await
            .unwrap();
        assert!(!written);
        assert_eq!(
            get_setting(&pool, "site_info").await.unwrap().setting_value,
            json!({"title": "Custom"})
        );

        assert!(insert_section_if_missing(&pool, "hero", "Hero", &json!({})).await.unwrap());
        assert!(!insert_section_if_missing(&pool, "hero", "Hero", &json!({})).await.unwrap());
    }
}
