/**
 * Blog Routes
 * Public reading, admin CRUD, publishing and categories for blog posts
 */
use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{
    blog,
    models::{BlogPost, BlogPostChanges, NewBlogPost, Pagination, PostStatus},
};
use crate::error::AppError;
use crate::routes::admin::require_admin;
use crate::routes::{double_option, parse_id, SuccessResponse};
use crate::text::join_tags;
use crate::AppState;

const MAX_PER_PAGE: i64 = 100;
const DEFAULT_FEATURED_LIMIT: i64 = 3;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for GET /api/blog/posts
#[derive(Debug, Deserialize)]
pub struct PublicListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
    pub category: Option<String>,
    pub search: Option<String>,
}

/// Query parameters for GET /api/admin/blog/posts
#[derive(Debug, Deserialize)]
pub struct AdminListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
    pub status: Option<PostStatus>,
}

#[derive(Debug, Deserialize)]
pub struct FeaturedQuery {
    pub limit: Option<i64>,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    10
}

fn clamp_paging(page: i64, per_page: i64) -> (i64, i64) {
    (page.max(1), per_page.clamp(1, MAX_PER_PAGE))
}

/// Response for the list endpoints
#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub posts: Vec<PostSummary>,
    pub pagination: Pagination,
}

/// Blog post summary (for list view)
#[derive(Debug, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub category: String,
    pub tags: Vec<String>,
    pub featured_image: Option<String>,
    pub is_published: bool,
    pub is_featured: bool,
    pub read_time: i64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl From<BlogPost> for PostSummary {
    fn from(post: BlogPost) -> Self {
        Self {
            id: post.id,
            title: post.title,
            slug: post.slug,
            excerpt: post.excerpt,
            category: post.category,
            tags: post.tags,
            featured_image: post.featured_image,
            is_published: post.is_published,
            is_featured: post.is_featured,
            read_time: post.read_time,
            views: post.views,
            created_at: post.created_at,
            published_at: post.published_at,
        }
    }
}

/// Tags as a JSON list or a comma-separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Text(String),
}

impl TagsInput {
    fn joined(self) -> Option<String> {
        match self {
            TagsInput::List(tags) => join_tags(tags),
            TagsInput::Text(text) => join_tags(text.split(',')),
        }
    }
}

/// Request body for POST /api/blog/posts
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub tags: Option<TagsInput>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_published: bool,
}

/// Request body for PUT /api/blog/posts/{id}. `null` clears the nullable
/// fields; an absent field is left alone.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub excerpt: Option<Option<String>>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub tags: Option<Option<TagsInput>>,
    #[serde(default, deserialize_with = "double_option")]
    pub featured_image: Option<Option<String>>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    #[serde(default = "default_publish")]
    pub publish: bool,
}

fn default_publish() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

// ============================================================================
// Validation
// ============================================================================

/// Sanitize HTML content using ammonia
fn sanitize_html(html: &str) -> String {
    ammonia::clean(html)
}

fn required(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn is_hex_color(color: &str) -> bool {
    color.len() == 7 && color.starts_with('#') && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

// ============================================================================
// Public handlers
// ============================================================================

/// GET /api/blog/posts - Published posts with pagination
pub async fn list_posts(
    State(state): State<AppState>,
    query: Result<Query<PublicListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let (page, per_page) = clamp_paging(query.page, query.per_page);

    let result = blog::list_public(
        &state.pool,
        page,
        per_page,
        query.category.as_deref(),
        query.search.as_deref(),
    )
    .await?;

    Ok(Json(PostListResponse {
        posts: result.items.into_iter().map(PostSummary::from).collect(),
        pagination: result.pagination,
    }))
}

/// GET /api/blog/posts/featured
pub async fn featured_posts(
    State(state): State<AppState>,
    query: Result<Query<FeaturedQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_FEATURED_LIMIT).clamp(1, MAX_PER_PAGE);
    let posts = blog::featured(&state.pool, limit).await?;
    Ok(Json(posts.into_iter().map(PostSummary::from).collect::<Vec<_>>()))
}

/// GET /api/blog/posts/{slug} - Read a published post; counts one view
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let post = blog::get_published_by_slug(&state.pool, &slug).await?;
    Ok(Json(post))
}

/// GET /api/blog/categories
pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(blog::list_categories(&state.pool).await?))
}

// ============================================================================
// Admin handlers
// ============================================================================

/// POST /api/blog/posts
pub async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let admin = require_admin(&state, &headers).await?;
    let Json(payload) = payload?;

    let title = required(&payload.title, "Title")?;
    let content = sanitize_html(&required(&payload.content, "Content")?);

    let post = blog::create(
        &state.pool,
        NewBlogPost {
            title,
            content,
            category: payload.category.unwrap_or_default(),
            author_id: admin.id,
            excerpt: payload.excerpt,
            tags: payload.tags.and_then(TagsInput::joined),
            featured_image: blank_to_none(payload.featured_image),
            is_featured: payload.is_featured,
            publish: payload.is_published,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// PUT /api/blog/posts/{id}
pub async fn update_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePostRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state, &headers).await?;
    let id = parse_id(&id, "Post")?;
    let Json(payload) = payload?;

    let title = payload.title.map(|t| required(&t, "Title")).transpose()?;
    let content = payload
        .content
        .map(|c| required(&c, "Content").map(|c| sanitize_html(&c)))
        .transpose()?;

    let changes = BlogPostChanges {
        title,
        content,
        excerpt: payload.excerpt,
        category: payload.category,
        tags: payload.tags.map(|tags| tags.and_then(TagsInput::joined)),
        featured_image: payload.featured_image.map(blank_to_none),
        is_featured: payload.is_featured,
    };

    Ok(Json(blog::update(&state.pool, id, changes).await?))
}

/// DELETE /api/blog/posts/{id}
pub async fn delete_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state, &headers).await?;
    let id = parse_id(&id, "Post")?;
    blog::delete(&state.pool, id).await?;
    Ok(Json(SuccessResponse::with_message("Post deleted")))
}

/// POST /api/blog/posts/{id}/publish - body `{"publish": bool}`, optional
pub async fn publish_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state, &headers).await?;
    let id = parse_id(&id, "Post")?;

    let publish = if body.iter().all(u8::is_ascii_whitespace) {
        true
    } else {
        serde_json::from_slice::<PublishRequest>(&body)
            .map_err(|e| AppError::validation(format!("Invalid JSON body: {}", e)))?
            .publish
    };

    Ok(Json(blog::publish(&state.pool, id, publish).await?))
}

/// GET /api/admin/blog/posts - every post, any state
pub async fn admin_list_posts(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<AdminListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state, &headers).await?;
    let Query(query) = query?;
    let (page, per_page) = clamp_paging(query.page, query.per_page);

    let result = blog::list_admin(
        &state.pool,
        page,
        per_page,
        query.status.unwrap_or(PostStatus::All),
    )
    .await?;

    Ok(Json(PostListResponse {
        posts: result.items.into_iter().map(PostSummary::from).collect(),
        pagination: result.pagination,
    }))
}

/// GET /api/admin/blog/posts/{id} - no view counting
pub async fn admin_get_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state, &headers).await?;
    let id = parse_id(&id, "Post")?;
    Ok(Json(blog::get_by_id(&state.pool, id).await?))
}

/// POST /api/blog/categories
pub async fn create_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state, &headers).await?;
    let Json(payload) = payload?;

    let name = required(&payload.name, "Name")?;
    let color = blank_to_none(payload.color);
    if let Some(color) = color.as_deref() {
        if !is_hex_color(color) {
            return Err(AppError::validation("Color must look like #RRGGBB"));
        }
    }
    let description = blank_to_none(payload.description);

    let category = blog::create_category(&state.pool, &name, description.as_deref(), color.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(category)))
}
