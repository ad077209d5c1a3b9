//! Blog posts and categories.

use chrono::Utc;
use sqlx::{Any, AnyPool, Transaction};

use super::models::{
    flag, BlogCategory, BlogCategoryRow, BlogPost, BlogPostChanges, BlogPostRow, DashboardStats,
    NewBlogPost, Page, Pagination, PostStatus,
};
use super::{format_timestamp, next_timestamp};
use crate::error::AppError;
use crate::text::{calculate_read_time, generate_excerpt, slug_with_suffix, slugify, strip_tags};

pub const DEFAULT_CATEGORY: &str = "Geral";
pub const DEFAULT_CATEGORY_COLOR: &str = "#3B82F6";

const POST_COLUMNS: &str = "id, title, slug, excerpt, content, category, tags, featured_image, \
     is_published, is_featured, read_time, views, author_id, created_at, updated_at, published_at";

const CATEGORY_COLUMNS: &str = "id, name, slug, description, color, created_at";

/// Filters shared by the list queries. Every bound value is text, numbered
/// in the order the clauses are pushed.
#[derive(Default)]
struct Filter {
    clauses: Vec<String>,
    binds: Vec<String>,
}

impl Filter {
    fn literal(&mut self, clause: &str) {
        self.clauses.push(clause.to_string());
    }

    /// `clause` uses `{}` for the placeholder; it may appear more than once.
    fn bind(&mut self, clause: &str, value: String) {
        self.binds.push(value);
        let placeholder = format!("${}", self.binds.len());
        self.clauses.push(clause.replace("{}", &placeholder));
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }

    fn next_placeholder(&self, offset: usize) -> String {
        format!("${}", self.binds.len() + offset)
    }
}

fn like_pattern(search: &str) -> String {
    let escaped = search
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Lowercased title, excerpt and plain-text content. Folding happens here
/// rather than in SQL so accented capitals match on every backend.
fn search_text(title: &str, excerpt: Option<&str>, content: &str) -> String {
    format!("{}\n{}\n{}", title, excerpt.unwrap_or_default(), strip_tags(content)).to_lowercase()
}

fn excerpt_or_generated(excerpt: Option<&str>, content: &str) -> String {
    match excerpt.map(str::trim) {
        Some(e) if !e.is_empty() => e.to_string(),
        _ => generate_excerpt(content),
    }
}

/// First free slug for `title`: the base slug, then `-1`, `-2`, ...
/// A post never collides with itself.
async fn unique_slug(
    tx: &mut Transaction<'static, Any>,
    title: &str,
    own_id: Option<i64>,
) -> Result<String, AppError> {
    let base = slugify(title);
    let mut attempt = 0;
    loop {
        let candidate = slug_with_suffix(&base, attempt);
        let holder = sqlx::query_scalar::<_, i64>("SELECT id FROM blog_posts WHERE slug = $1")
            .bind(&candidate)
            .fetch_optional(&mut **tx)
            .await?;
        match holder {
            None => return Ok(candidate),
            Some(id) if Some(id) == own_id => return Ok(candidate),
            Some(_) => attempt += 1,
        }
    }
}

async fn fetch_post(
    tx: &mut Transaction<'static, Any>,
    id: i64,
) -> Result<BlogPost, AppError> {
    sqlx::query_as::<_, BlogPostRow>(&format!("SELECT {} FROM blog_posts WHERE id = $1", POST_COLUMNS))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::not_found("Post"))?
        .try_into()
}

pub async fn create(pool: &AnyPool, post: NewBlogPost) -> Result<BlogPost, AppError> {
    let mut tx = pool.begin().await?;

    let slug = unique_slug(&mut tx, &post.title, None).await?;
    let excerpt = excerpt_or_generated(post.excerpt.as_deref(), &post.content);
    let read_time = calculate_read_time(&post.content);
    let category = match post.category.trim() {
        "" => DEFAULT_CATEGORY.to_string(),
        c => c.to_string(),
    };
    let now = format_timestamp(Utc::now());
    let published_at = post.publish.then(|| now.clone());

    let row = sqlx::query_as::<_, BlogPostRow>(&format!(
        r#"
        INSERT INTO blog_posts
            (title, slug, excerpt, content, category, tags, featured_image,
             is_published, is_featured, read_time, views, author_id,
             created_at, updated_at, published_at, search_text)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0, $11, $12, $12, $13, $14)
        RETURNING {}
        "#,
        POST_COLUMNS
    ))
    .bind(&post.title)
    .bind(&slug)
    .bind(&excerpt)
    .bind(&post.content)
    .bind(&category)
    .bind(&post.tags)
    .bind(&post.featured_image)
    .bind(flag(post.publish))
    .bind(flag(post.is_featured))
    .bind(read_time)
    .bind(post.author_id)
    .bind(&now)
    .bind(&published_at)
    .bind(search_text(&post.title, Some(excerpt.as_str()), &post.content))
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| AppError::from_write(e, "A post with this slug already exists"))?;

    tx.commit().await?;

    tracing::info!(id = row.id, slug = %row.slug, "Blog post created");
    row.try_into()
}

pub async fn update(pool: &AnyPool, id: i64, changes: BlogPostChanges) -> Result<BlogPost, AppError> {
    let mut tx = pool.begin().await?;
    let mut post = fetch_post(&mut tx, id).await?;

    if let Some(title) = changes.title {
        if title != post.title {
            post.slug = unique_slug(&mut tx, &title, Some(id)).await?;
            post.title = title;
        }
    }
    if let Some(content) = changes.content {
        post.read_time = calculate_read_time(&content);
        post.content = content;
    }
    if let Some(excerpt) = changes.excerpt {
        post.excerpt = Some(excerpt_or_generated(excerpt.as_deref(), &post.content));
    }
    if let Some(category) = changes.category {
        let category = category.trim();
        post.category = if category.is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            category.to_string()
        };
    }
    let tags = match changes.tags {
        Some(tags) => tags,
        None => crate::text::join_tags(&post.tags),
    };
    if let Some(image) = changes.featured_image {
        post.featured_image = image;
    }
    if let Some(featured) = changes.is_featured {
        post.is_featured = featured;
    }

    let updated_at = next_timestamp(Some(post.updated_at));

    let row = sqlx::query_as::<_, BlogPostRow>(&format!(
        r#"
        UPDATE blog_posts SET
            title = $1, slug = $2, excerpt = $3, content = $4, category = $5,
            tags = $6, featured_image = $7, is_featured = $8, read_time = $9,
            updated_at = $10, search_text = $11
        WHERE id = $12
        RETURNING {}
        "#,
        POST_COLUMNS
    ))
    .bind(&post.title)
    .bind(&post.slug)
    .bind(&post.excerpt)
    .bind(&post.content)
    .bind(&post.category)
    .bind(&tags)
    .bind(&post.featured_image)
    .bind(flag(post.is_featured))
    .bind(post.read_time)
    .bind(format_timestamp(updated_at))
    .bind(search_text(&post.title, post.excerpt.as_deref(), &post.content))
    .bind(id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| AppError::from_write(e, "A post with this slug already exists"))?;

    tx.commit().await?;

    tracing::info!(id, slug = %row.slug, "Blog post updated");
    row.try_into()
}

/// Publish keeps an existing `published_at`; unpublish clears it.
pub async fn publish(pool: &AnyPool, id: i64, publish: bool) -> Result<BlogPost, AppError> {
    let mut tx = pool.begin().await?;
    let post = fetch_post(&mut tx, id).await?;

    let published_at = if publish {
        Some(format_timestamp(post.published_at.unwrap_or_else(Utc::now)))
    } else {
        None
    };

    let row = sqlx::query_as::<_, BlogPostRow>(&format!(
        "UPDATE blog_posts SET is_published = $1, published_at = $2, updated_at = $3 WHERE id = $4 RETURNING {}",
        POST_COLUMNS
    ))
    .bind(flag(publish))
    .bind(&published_at)
    .bind(format_timestamp(next_timestamp(Some(post.updated_at))))
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(id, publish, "Blog post publish state changed");
    row.try_into()
}

pub async fn delete(pool: &AnyPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Post"));
    }

    tracing::info!(id, "Blog post deleted");
    Ok(())
}

pub async fn get_by_id(pool: &AnyPool, id: i64) -> Result<BlogPost, AppError> {
    sqlx::query_as::<_, BlogPostRow>(&format!("SELECT {} FROM blog_posts WHERE id = $1", POST_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Post"))?
        .try_into()
}

/// Public read: published posts only, and every call counts one view.
pub async fn get_published_by_slug(pool: &AnyPool, slug: &str) -> Result<BlogPost, AppError> {
    let mut tx = pool.begin().await?;

    let counted = sqlx::query("UPDATE blog_posts SET views = views + 1 WHERE slug = $1 AND is_published = 1")
        .bind(slug)
        .execute(&mut *tx)
        .await?;

    if counted.rows_affected() == 0 {
        return Err(AppError::not_found("Post"));
    }

    let row = sqlx::query_as::<_, BlogPostRow>(&format!("SELECT {} FROM blog_posts WHERE slug = $1", POST_COLUMNS))
        .bind(slug)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    row.try_into()
}

/// Fill `search_text` for rows written before the column existed.
pub async fn reindex_search_text(pool: &AnyPool) -> Result<u64, AppError> {
    let stale = sqlx::query_as::<_, (i64, String, Option<String>, String)>(
        "SELECT id, title, excerpt, content FROM blog_posts WHERE search_text = ''",
    )
    .fetch_all(pool)
    .await?;

    let mut tx = pool.begin().await?;
    for (id, title, excerpt, content) in &stale {
        sqlx::query("UPDATE blog_posts SET search_text = $1 WHERE id = $2")
            .bind(search_text(title, excerpt.as_deref(), content))
            .bind(*id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    if !stale.is_empty() {
        tracing::info!(count = stale.len(), "Reindexed blog post search text");
    }
    Ok(stale.len() as u64)
}

async fn fetch_page(
    pool: &AnyPool,
    filter: &Filter,
    order_by: &str,
    page: i64,
    per_page: i64,
) -> Result<Page<BlogPost>, AppError> {
    let where_sql = filter.where_sql();

    let count_sql = format!("SELECT COUNT(*) FROM blog_posts {}", where_sql);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for value in &filter.binds {
        count_query = count_query.bind(value);
    }
    let total = count_query.fetch_one(pool).await?;

    let list_sql = format!(
        "SELECT {} FROM blog_posts {} ORDER BY {} LIMIT {} OFFSET {}",
        POST_COLUMNS,
        where_sql,
        order_by,
        filter.next_placeholder(1),
        filter.next_placeholder(2)
    );
    let mut list_query = sqlx::query_as::<_, BlogPostRow>(&list_sql);
    for value in &filter.binds {
        list_query = list_query.bind(value);
    }
    let rows = list_query
        .bind(per_page)
        .bind((page - 1).saturating_mul(per_page))
        .fetch_all(pool)
        .await?;

    let items = rows
        .into_iter()
        .map(BlogPost::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page {
        items,
        pagination: Pagination::new(page, per_page, total),
    })
}

/// Published posts, newest publication first.
pub async fn list_public(
    pool: &AnyPool,
    page: i64,
    per_page: i64,
    category: Option<&str>,
    search: Option<&str>,
) -> Result<Page<BlogPost>, AppError> {
    let mut filter = Filter::default();
    filter.literal("is_published = 1");
    if let Some(category) = category.map(str::trim).filter(|c| !c.is_empty()) {
        filter.bind("category = {}", category.to_string());
    }
    if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
        filter.bind(r"search_text LIKE {} ESCAPE '\'", like_pattern(search));
    }

    fetch_page(pool, &filter, "published_at DESC, id DESC", page, per_page).await
}

/// Every post regardless of state, newest first.
pub async fn list_admin(
    pool: &AnyPool,
    page: i64,
    per_page: i64,
    status: PostStatus,
) -> Result<Page<BlogPost>, AppError> {
    let mut filter = Filter::default();
    match status {
        PostStatus::Published => filter.literal("is_published = 1"),
        PostStatus::Draft => filter.literal("is_published = 0"),
        PostStatus::All => {}
    }

    fetch_page(pool, &filter, "created_at DESC, id DESC", page, per_page).await
}

pub async fn featured(pool: &AnyPool, limit: i64) -> Result<Vec<BlogPost>, AppError> {
    let rows = sqlx::query_as::<_, BlogPostRow>(&format!(
        "SELECT {} FROM blog_posts WHERE is_published = 1 AND is_featured = 1 \
         ORDER BY published_at DESC, id DESC LIMIT $1",
        POST_COLUMNS
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(BlogPost::try_from).collect()
}

pub async fn dashboard_stats(pool: &AnyPool) -> Result<DashboardStats, AppError> {
    let (total_posts, published_posts, total_views) = sqlx::query_as::<_, (i64, i64, i64)>(
        r#"
        SELECT
            COUNT(*),
            CAST(COALESCE(SUM(is_published), 0) AS BIGINT),
            CAST(COALESCE(SUM(views), 0) AS BIGINT)
        FROM blog_posts
        "#,
    )
    .fetch_one(pool)
    .await?;

    let popular = sqlx::query_as::<_, BlogPostRow>(&format!(
        "SELECT {} FROM blog_posts WHERE is_published = 1 ORDER BY views DESC, id DESC LIMIT 5",
        POST_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    let recent = sqlx::query_as::<_, BlogPostRow>(&format!(
        "SELECT {} FROM blog_posts ORDER BY created_at DESC, id DESC LIMIT 5",
        POST_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    Ok(DashboardStats {
        total_posts,
        published_posts,
        draft_posts: total_posts - published_posts,
        total_views,
        popular_posts: popular.into_iter().map(BlogPost::try_from).collect::<Result<_, _>>()?,
        recent_posts: recent.into_iter().map(BlogPost::try_from).collect::<Result<_, _>>()?,
    })
}

// ============================================================================
// Categories
// ============================================================================

pub async fn list_categories(pool: &AnyPool) -> Result<Vec<BlogCategory>, AppError> {
    let rows = sqlx::query_as::<_, BlogCategoryRow>(&format!(
        "SELECT {} FROM blog_categories ORDER BY name",
        CATEGORY_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(BlogCategory::try_from).collect()
}

pub async fn create_category(
    pool: &AnyPool,
    name: &str,
    description: Option<&str>,
    color: Option<&str>,
) -> Result<BlogCategory, AppError> {
    let row = sqlx::query_as::<_, BlogCategoryRow>(&format!(
        "INSERT INTO blog_categories (name, slug, description, color, created_at) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {}",
        CATEGORY_COLUMNS
    ))
    .bind(name)
    .bind(slugify(name))
    .bind(description)
    .bind(color.unwrap_or(DEFAULT_CATEGORY_COLOR))
    .bind(format_timestamp(Utc::now()))
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::from_write(e, "Category already exists"))?;

    tracing::info!(name, "Blog category created");
    row.try_into()
}

pub async fn insert_category_if_missing(
    pool: &AnyPool,
    name: &str,
    description: &str,
    color: &str,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        INSERT INTO blog_categories (name, slug, description, color, created_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (name) DO NOTHING
        "#,
    )
    .bind(name)
    .bind(slugify(name))
    .bind(description)
    .bind(color)
    .bind(format_timestamp(Utc::now()))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::empty_pool;

    fn new_post(title: &str) -> NewBlogPost {
        NewBlogPost {
            title: title.to_string(),
            content: "<p>Conteúdo sobre saúde do coração.</p>".to_string(),
            category: "Prevenção".to_string(),
            author_id: 1,
            ..Default::default()
        }
    }

    async fn published(pool: &AnyPool, title: &str) -> BlogPost {
        let post = create(pool, new_post(title)).await.unwrap();
        publish(pool, post.id, true).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_derives_fields() {
        let pool = empty_pool().await;
        let content = vec!["palavra"; 500].join(" ");
        let post = create(
            &pool,
            NewBlogPost {
                content: format!("<p>{}</p>", content),
                tags: Some("cardio, exames".to_string()),
                ..new_post("Exames: ECG & Holter")
            },
        )
        .await
        .unwrap();

        assert_eq!(post.slug, "exames-ecg-holter");
        assert_eq!(post.read_time, 3);
        assert_eq!(post.tags, vec!["cardio", "exames"]);
        assert!(post.excerpt.as_deref().unwrap().ends_with("..."));
        assert!(!post.is_published);
        assert!(post.published_at.is_none());
        assert_eq!(post.views, 0);
    }

    #[tokio::test]
    async fn test_blank_category_defaults() {
        let pool = empty_pool().await;
        let post = create(
            &pool,
            NewBlogPost {
                category: "  ".to_string(),
                ..new_post("Sem categoria")
            },
        )
        .await
        .unwrap();
        assert_eq!(post.category, DEFAULT_CATEGORY);
    }

    #[tokio::test]
    async fn test_duplicate_titles_get_suffixed_slugs() {
        let pool = empty_pool().await;
        let first = create(&pool, new_post("My Title")).await.unwrap();
        let second = create(&pool, new_post("My Title")).await.unwrap();
        let third = create(&pool, new_post("My Title")).await.unwrap();
        assert_eq!(first.slug, "my-title");
        assert_eq!(second.slug, "my-title-1");
        assert_eq!(third.slug, "my-title-2");
    }

    #[tokio::test]
    async fn test_update_title_regenerates_slug_without_self_collision() {
        let pool = empty_pool().await;
        let post = create(&pool, new_post("My Title")).await.unwrap();
        let other = create(&pool, new_post("Other")).await.unwrap();

        let renamed = update(
            &pool,
            post.id,
            BlogPostChanges {
                title: Some("My Title!".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(renamed.slug, "my-title");
        assert!(renamed.updated_at > post.updated_at);

        let clash = update(
            &pool,
            other.id,
            BlogPostChanges {
                title: Some("My Title".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(clash.slug, "my-title-1");
    }

    #[tokio::test]
    async fn test_update_content_recomputes_read_time_and_keeps_tags() {
        let pool = empty_pool().await;
        let post = create(
            &pool,
            NewBlogPost {
                tags: Some("a, b".to_string()),
                ..new_post("Leitura")
            },
        )
        .await
        .unwrap();
        assert_eq!(post.read_time, 1);

        let updated = update(
            &pool,
            post.id,
            BlogPostChanges {
                content: Some(vec!["palavra"; 700].join(" ")),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.read_time, 4);
        assert_eq!(updated.tags, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_update_missing_post_is_not_found() {
        let pool = empty_pool().await;
        assert!(matches!(
            update(&pool, 99, BlogPostChanges::default()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_is_idempotent_and_unpublish_clears() {
        let pool = empty_pool().await;
        let post = create(&pool, new_post("Publicar")).await.unwrap();

        let once = publish(&pool, post.id, true).await.unwrap();
        let twice = publish(&pool, post.id, true).await.unwrap();
        assert!(twice.is_published);
        assert_eq!(once.published_at, twice.published_at);
        assert!(once.published_at.is_some());

        let draft = publish(&pool, post.id, false).await.unwrap();
        assert!(!draft.is_published);
        assert!(draft.published_at.is_none());
        let again = publish(&pool, post.id, false).await.unwrap();
        assert!(again.published_at.is_none());
    }

    #[tokio::test]
    async fn test_slug_read_counts_views_and_hides_drafts() {
        let pool = empty_pool().await;
        let post = published(&pool, "Visitas").await;
        let draft = create(&pool, new_post("Rascunho")).await.unwrap();

        for expected in 1..=3 {
            let read = get_published_by_slug(&pool, &post.slug).await.unwrap();
            assert_eq!(read.views, expected);
        }
        assert!(matches!(
            get_published_by_slug(&pool, &draft.slug).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            get_published_by_slug(&pool, "nope").await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(get_by_id(&pool, draft.id).await.unwrap().views, 0);
    }

    #[tokio::test]
    async fn test_list_public_filters_and_paginates() {
        let pool = empty_pool().await;
        for i in 0..3 {
            published(&pool, &format!("Prevenção {}", i)).await;
        }
        let other = create(
            &pool,
            NewBlogPost {
                category: "Exames".to_string(),
                content: "Tudo sobre o ecocardiograma".to_string(),
                ..new_post("Eco")
            },
        )
        .await
        .unwrap();
        publish(&pool, other.id, true).await.unwrap();
        create(&pool, new_post("Draft")).await.unwrap();

        let page = list_public(&pool, 1, 2, None, None).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.pagination.total, 4);
        assert_eq!(page.pagination.pages, 2);
        assert!(page.pagination.has_next);

        let exams = list_public(&pool, 1, 10, Some("Exames"), None).await.unwrap();
        assert_eq!(exams.items.len(), 1);

        let search = list_public(&pool, 1, 10, None, Some("ECOCARDIO")).await.unwrap();
        assert_eq!(search.items.len(), 1);
        assert_eq!(search.items[0].id, other.id);

        let literal = list_public(&pool, 1, 10, None, Some("100%")).await.unwrap();
        assert!(literal.items.is_empty());
    }

    #[tokio::test]
    async fn test_list_admin_by_status() {
        let pool = empty_pool().await;
        published(&pool, "Um").await;
        create(&pool, new_post("Dois")).await.unwrap();

        let all = list_admin(&pool, 1, 10, PostStatus::All).await.unwrap();
        assert_eq!(all.pagination.total, 2);
        assert_eq!(all.items[0].title, "Dois");
        assert_eq!(list_admin(&pool, 1, 10, PostStatus::Draft).await.unwrap().pagination.total, 1);
        assert_eq!(list_admin(&pool, 1, 10, PostStatus::Published).await.unwrap().pagination.total, 1);
    }

    #[tokio::test]
    async fn test_search_folds_accented_capitals() {
        let pool = empty_pool().await;
        let post = create(
            &pool,
            NewBlogPost {
                content: "<p>ÁGUA e SAÚDE</p>".to_string(),
                ..new_post("É HORA DE CUIDAR DO CORAÇÃO")
            },
        )
        .await
        .unwrap();
        publish(&pool, post.id, true).await.unwrap();

        for term in ["hora", "saúde", "SAÚDE", "coração", "É hora", "água"] {
            let found = list_public(&pool, 1, 10, None, Some(term)).await.unwrap();
            assert_eq!(found.pagination.total, 1, "{}", term);
        }
        // markup is not searchable text
        assert!(list_public(&pool, 1, 10, None, Some("<p>")).await.unwrap().items.is_empty());

        update(
            &pool,
            post.id,
            BlogPostChanges {
                content: Some("Exercício FÍSICO".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(list_public(&pool, 1, 10, None, Some("físico")).await.unwrap().pagination.total, 1);
        assert!(list_public(&pool, 1, 10, None, Some("água")).await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn test_reindex_fills_missing_search_text() {
        let pool = empty_pool().await;
        let post = published(&pool, "Pressão ALTA").await;
        sqlx::query("UPDATE blog_posts SET search_text = ''")
            .execute(&pool)
            .await
            .unwrap();
        assert!(list_public(&pool, 1, 10, None, Some("pressão")).await.unwrap().items.is_empty());

        assert_eq!(reindex_search_text(&pool).await.unwrap(), 1);
        let found = list_public(&pool, 1, 10, None, Some("pressão alta")).await.unwrap();
        assert_eq!(found.items[0].id, post.id);
        assert_eq!(reindex_search_text(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_page_far_past_the_end_is_empty() {
        let pool = empty_pool().await;
        published(&pool, "Um").await;

        let page = list_public(&pool, i64::MAX, 10, None, None).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.pagination.total, 1);
        assert!(!page.pagination.has_next);

        let admin = list_admin(&pool, i64::MAX, 100, PostStatus::All).await.unwrap();
        assert!(admin.items.is_empty());
        assert_eq!(admin.pagination.total, 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let pool = empty_pool().await;
        let post = create(&pool, new_post("Apagar")).await.unwrap();
        delete(&pool, post.id).await.unwrap();
        assert!(matches!(delete(&pool, post.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_featured_and_stats() {
        let pool = empty_pool().await;
        let post = create(
            &pool,
            NewBlogPost {
                is_featured: true,
                publish: true,
                ..new_post("Destaque")
            },
        )
        .await
        .unwrap();
        create(&pool, new_post("Rascunho")).await.unwrap();
        get_published_by_slug(&pool, &post.slug).await.unwrap();

        let featured_posts = featured(&pool, 3).await.unwrap();
        assert_eq!(featured_posts.len(), 1);

        let stats = dashboard_stats(&pool).await.unwrap();
        assert_eq!(stats.total_posts, 2);
        assert_eq!(stats.published_posts, 1);
        assert_eq!(stats.draft_posts, 1);
        assert_eq!(stats.total_views, 1);
        assert_eq!(stats.popular_posts.len(), 1);
        assert_eq!(stats.recent_posts.len(), 2);
    }

    #[tokio::test]
    async fn test_categories() {
        let pool = empty_pool().await;
        assert!(insert_category_if_missing(&pool, "Exames", "Exames cardíacos", "#8B5CF6")
            .await
            .unwrap());
        assert!(!insert_category_if_missing(&pool, "Exames", "x", "#000000")
            .await
            .unwrap());

        let created = create_category(&pool, "Arritmias", None, None).await.unwrap();
        assert_eq!(created.slug, "arritmias");
        assert_eq!(created.color, DEFAULT_CATEGORY_COLOR);

        assert!(matches!(
            create_category(&pool, "Exames", None, None).await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(list_categories(&pool).await.unwrap().len(), 2);
    }
}
