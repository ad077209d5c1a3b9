//! Database Models - raw rows as stored (used by sqlx) and the typed records
//! the rest of the crate works with.
//!
//! Rows keep the portable storage encoding: timestamps as RFC 3339 text,
//! flags as 0/1 integers, JSON documents as text. The `TryFrom` impls decode
//! them once, at the store boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::{parse_optional_timestamp, parse_timestamp};
use crate::error::AppError;
use crate::text::split_tags;

fn decode_json(raw: &str) -> Result<Value, AppError> {
    serde_json::from_str(raw).map_err(|e| AppError::Internal(format!("stored JSON is invalid: {}", e)))
}

pub(crate) fn encode_json(value: &Value) -> Result<String, AppError> {
    serde_json::to_string(value).map_err(|e| AppError::Internal(e.to_string()))
}

pub(crate) fn flag(value: bool) -> i64 {
    i64::from(value)
}

// ============================================================================
// Content / settings
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct ContentRow {
    pub section_id: String,
    pub section_name: String,
    pub content_data: String,
    pub updated_at: String,
}

/// One editable block of page content. `content_data` is an opaque document
/// whose shape is owned by the frontend component rendering the section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSection {
    pub section_id: String,
    pub section_name: String,
    pub content_data: Value,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ContentRow> for ContentSection {
    type Error = AppError;

    fn try_from(row: ContentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            content_data: decode_json(&row.content_data)?,
            updated_at: parse_timestamp(&row.updated_at)?,
            section_id: row.section_id,
            section_name: row.section_name,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SettingRow {
    pub setting_key: String,
    pub setting_value: String,
    pub updated_at: String,
}

/// A named site-wide value (site metadata, theme colors, social links).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub setting_key: String,
    pub setting_value: Value,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SettingRow> for Setting {
    type Error = AppError;

    fn try_from(row: SettingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            setting_value: decode_json(&row.setting_value)?,
            updated_at: parse_timestamp(&row.updated_at)?,
            setting_key: row.setting_key,
        })
    }
}

// ============================================================================
// Blog
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct BlogPostRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub category: String,
    pub tags: Option<String>,
    pub featured_image: Option<String>,
    pub is_published: i64,
    pub is_featured: i64,
    pub read_time: i64,
    pub views: i64,
    pub author_id: i64,
    pub created_at: String,
    pub updated_at: String,
    pub published_at: Option<String>,
}

/// Blog post model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub featured_image: Option<String>,
    pub is_published: bool,
    pub is_featured: bool,
    pub read_time: i64,
    pub views: i64,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl TryFrom<BlogPostRow> for BlogPost {
    type Error = AppError;

    fn try_from(row: BlogPostRow) -> Result<Self, Self::Error> {
        Ok(Self {
            tags: split_tags(row.tags.as_deref()),
            is_published: row.is_published != 0,
            is_featured: row.is_featured != 0,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
            published_at: parse_optional_timestamp(row.published_at.as_deref())?,
            id: row.id,
            title: row.title,
            slug: row.slug,
            excerpt: row.excerpt,
            content: row.content,
            category: row.category,
            featured_image: row.featured_image,
            read_time: row.read_time,
            views: row.views,
            author_id: row.author_id,
        })
    }
}

/// New blog post for creation. Slug, excerpt and read time are derived.
#[derive(Debug, Clone, Default)]
pub struct NewBlogPost {
    pub title: String,
    pub content: String,
    pub category: String,
    pub author_id: i64,
    pub excerpt: Option<String>,
    /// Already comma-joined.
    pub tags: Option<String>,
    pub featured_image: Option<String>,
    pub is_featured: bool,
    pub publish: bool,
}

/// Blog post update; `None` leaves the field untouched. For the nullable
/// columns `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default)]
pub struct BlogPostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<Option<String>>,
    pub category: Option<String>,
    pub tags: Option<Option<String>>,
    pub featured_image: Option<Option<String>>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Published,
    Draft,
    All,
}

/// One page of posts plus the pagination metadata the frontend renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let pages = if total == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            page,
            per_page,
            total,
            pages,
            has_next: page < pages,
            has_prev: page > 1,
        }
    }
}

/// Blog numbers for the admin dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub total_posts: i64,
    pub published_posts: i64,
    pub draft_posts: i64,
    pub total_views: i64,
    pub popular_posts: Vec<BlogPost>,
    pub recent_posts: Vec<BlogPost>,
}

#[derive(Debug, Clone, FromRow)]
pub struct BlogCategoryRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub color: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogCategory {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<BlogCategoryRow> for BlogCategory {
    type Error = AppError;

    fn try_from(row: BlogCategoryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            created_at: parse_timestamp(&row.created_at)?,
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            color: row.color,
        })
    }
}

// ============================================================================
// Reviews
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct ReviewRow {
    pub id: i64,
    pub source: String,
    pub external_id: Option<String>,
    pub author_name: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub date_created: Option<String>,
    pub imported_at: String,
    pub is_active: i64,
}

/// A patient testimonial, entered by hand or imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub source: String,
    pub external_id: Option<String>,
    pub author_name: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub imported_at: DateTime<Utc>,
    pub is_active: bool,
}

impl TryFrom<ReviewRow> for Review {
    type Error = AppError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(Self {
            date_created: parse_optional_timestamp(row.date_created.as_deref())?,
            imported_at: parse_timestamp(&row.imported_at)?,
            is_active: row.is_active != 0,
            id: row.id,
            source: row.source,
            external_id: row.external_id,
            author_name: row.author_name,
            rating: row.rating,
            comment: row.comment,
        })
    }
}

/// Review-like input for manual creation and import batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReview {
    pub source: String,
    #[serde(default)]
    pub external_id: Option<String>,
    pub author_name: String,
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub imported: usize,
    pub skipped: usize,
}

// ============================================================================
// Admin
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct AdminRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub is_active: i64,
    pub created_at: String,
    pub last_login: Option<String>,
    pub session_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    /// SHA-256 of the id of the currently valid session, if any.
    pub session_token: Option<String>,
}

impl TryFrom<AdminRow> for Admin {
    type Error = AppError;

    fn try_from(row: AdminRow) -> Result<Self, Self::Error> {
        Ok(Self {
            is_active: row.is_active != 0,
            created_at: parse_timestamp(&row.created_at)?,
            last_login: parse_optional_timestamp(row.last_login.as_deref())?,
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            full_name: row.full_name,
            session_token: row.session_token,
        })
    }
}

/// Admin info returned to the frontend (no credentials).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&Admin> for AdminProfile {
    fn from(admin: &Admin) -> Self {
        Self {
            id: admin.id,
            username: admin.username.clone(),
            email: admin.email.clone(),
            full_name: admin.full_name.clone(),
            is_active: admin.is_active,
            created_at: admin.created_at,
            last_login: admin.last_login,
        }
    }
}
