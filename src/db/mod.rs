pub mod admins;
pub mod blog;
pub mod content;
pub mod models;
pub mod reviews;
pub mod seed;

use chrono::{DateTime, Duration, NaiveDateTime, SubsecRound, Utc};
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use crate::config::env_or;
use crate::error::AppError;

/// Fixed-width UTC format, so that text ordering matches time ordering.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
}

impl Backend {
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("sqlite:") {
            Some(Backend::Sqlite)
        } else if url.starts_with("postgres:") || url.starts_with("postgresql:") {
            Some(Backend::Postgres)
        } else {
            None
        }
    }

    fn id_column(self) -> &'static str {
        match self {
            Backend::Sqlite => "id INTEGER PRIMARY KEY AUTOINCREMENT",
            Backend::Postgres => "id BIGSERIAL PRIMARY KEY",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://site_data.db?mode=rwc".to_string()),
            max_connections: env_or("DB_POOL_MAX", 10),
            min_connections: env_or("DB_POOL_MIN", 1),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT", 10),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT", 300),
        }
    }
}

impl DbConfig {
    pub fn backend(&self) -> Option<Backend> {
        Backend::from_url(&self.url)
    }

    fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

pub async fn init_pool(config: &DbConfig) -> Result<AnyPool, sqlx::Error> {
    sqlx::any::install_default_drivers();

    tracing::info!("Initializing database connection pool...");
    tracing::debug!(
        "Database URL: {}",
        config.url.replace(
            |c: char| !c.is_ascii_alphanumeric() && c != ':' && c != '/' && c != '@' && c != '.',
            "*"
        )
    );

    let options = if config.is_in_memory() {
        // every connection to an in-memory database sees its own empty
        // database, so the pool must hold exactly one, forever
        AnyPoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .idle_timeout(std::time::Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(std::time::Duration::from_secs(1800))
    };

    let pool = options
        .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    tracing::info!("Database connection pool initialized successfully");

    Ok(pool)
}

pub async fn health_check(pool: &AnyPool) -> Result<std::time::Duration, sqlx::Error> {
    let start = std::time::Instant::now();
    sqlx::query("SELECT 1").fetch_one(pool).await?;
    Ok(start.elapsed())
}

pub async fn run_migrations(pool: &AnyPool, backend: Backend) -> Result<(), sqlx::Error> {
    tracing::info!(?backend, "Running database migrations...");

    let id = backend.id_column();

    let tables = [
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS site_content (
                {id},
                section_id TEXT NOT NULL UNIQUE,
                section_name TEXT NOT NULL,
                content_data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS site_settings (
                {id},
                setting_key TEXT NOT NULL UNIQUE,
                setting_value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS admins (
                {id},
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                full_name TEXT NOT NULL,
                is_active BIGINT NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                last_login TEXT,
                session_token TEXT
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS blog_posts (
                {id},
                title TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                excerpt TEXT,
                content TEXT NOT NULL,
                category TEXT NOT NULL,
                tags TEXT,
                featured_image TEXT,
                is_published BIGINT NOT NULL DEFAULT 0,
                is_featured BIGINT NOT NULL DEFAULT 0,
                read_time BIGINT NOT NULL DEFAULT 1,
                views BIGINT NOT NULL DEFAULT 0,
                author_id BIGINT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                published_at TEXT,
                search_text TEXT NOT NULL DEFAULT ''
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS blog_categories (
                {id},
                name TEXT NOT NULL UNIQUE,
                slug TEXT NOT NULL UNIQUE,
                description TEXT,
                color TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS reviews (
                {id},
                source TEXT NOT NULL,
                external_id TEXT,
                author_name TEXT NOT NULL,
                rating BIGINT NOT NULL,
                comment TEXT,
                date_created TEXT,
                imported_at TEXT NOT NULL,
                is_active BIGINT NOT NULL DEFAULT 1
            )
            "#
        ),
    ];

    for ddl in &tables {
        sqlx::query(ddl).execute(pool).await?;
    }

    add_search_text_column(pool, backend).await?;

    // one statement per query: a prepared statement holds a single command
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_blog_posts_published ON blog_posts(is_published, published_at)",
        "CREATE INDEX IF NOT EXISTS idx_blog_posts_created_at ON blog_posts(created_at)",
        "CREATE INDEX IF NOT EXISTS idx_blog_posts_category ON blog_posts(category)",
        "CREATE INDEX IF NOT EXISTS idx_reviews_active ON reviews(is_active, date_created)",
        "CREATE INDEX IF NOT EXISTS idx_reviews_dedup ON reviews(author_name, source)",
    ];

    for ddl in indexes {
        sqlx::query(ddl).execute(pool).await?;
    }

    tracing::info!("Database migrations completed successfully");

    Ok(())
}

/// Databases created before `blog_posts.search_text` existed get the column
/// here; `blog::reindex_search_text` fills it.
async fn add_search_text_column(pool: &AnyPool, backend: Backend) -> Result<(), sqlx::Error> {
    match backend {
        Backend::Postgres => {
            sqlx::query("ALTER TABLE blog_posts ADD COLUMN IF NOT EXISTS search_text TEXT NOT NULL DEFAULT ''")
                .execute(pool)
                .await?;
        }
        Backend::Sqlite => {
            let present = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM pragma_table_info('blog_posts') WHERE name = 'search_text'",
            )
            .fetch_one(pool)
            .await?;
            if present == 0 {
                sqlx::query("ALTER TABLE blog_posts ADD COLUMN search_text TEXT NOT NULL DEFAULT ''")
                    .execute(pool)
                    .await?;
                tracing::info!("Added blog_posts.search_text");
            }
        }
    }
    Ok(())
}

// ============================================================================
// Timestamps
// ============================================================================

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp. Accepts RFC 3339 and the bare
/// `YYYY-MM-DD[ HH:MM:SS]` forms older rows and imports may carry.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, AppError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(AppError::Internal(format!("unparseable timestamp: {}", raw)))
}

pub fn parse_optional_timestamp(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, AppError> {
    raw.map(parse_timestamp).transpose()
}

/// Current time at stored precision (microseconds), but strictly after
/// `previous` when one is given.
pub fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now().trunc_subsecs(6);
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}
