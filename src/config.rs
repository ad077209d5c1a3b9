//! Runtime configuration read from the environment (and `.env`).

use crate::db::DbConfig;
use crate::error::StartupError;

pub const DEFAULT_JWT_SECRET: &str = "default-jwt-secret-change-in-production";

pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Token signing and password hashing parameters.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: env_string("JWT_SECRET", DEFAULT_JWT_SECRET),
            token_ttl_minutes: env_or("TOKEN_TTL_MINUTES", 720),
            bcrypt_cost: env_or("BCRYPT_COST", bcrypt::DEFAULT_COST),
        }
    }
}

/// Credentials for the admin account created when none exists.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: Option<String>,
    pub password_hash: Option<String>,
}

impl Default for AdminSeed {
    fn default() -> Self {
        Self {
            username: env_string("ADMIN_USERNAME", "admin"),
            email: env_string("ADMIN_EMAIL", "admin@example.com"),
            full_name: env_string("ADMIN_FULL_NAME", "Site Administrator"),
            password: std::env::var("ADMIN_PASSWORD").ok(),
            password_hash: std::env::var("ADMIN_HASH_PASSWORD").ok(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub db: DbConfig,
    pub auth: AuthConfig,
    pub admin: AdminSeed,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            environment: env_string("ENVIRONMENT", "development"),
            host: env_string("HOST", "127.0.0.1"),
            port: env_or("PORT", 3001),
            db: DbConfig::default(),
            auth: AuthConfig::default(),
            admin: AdminSeed::default(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Refuse insecure defaults in production; warn about weak admin seeds.
    pub fn validate(&self) -> Result<(), StartupError> {
        if !self.is_production() {
            return Ok(());
        }

        if self.auth.jwt_secret.is_empty() || self.auth.jwt_secret == DEFAULT_JWT_SECRET {
            return Err(StartupError::InvalidConfig(
                "JWT_SECRET must be set to a secure, unique value in production".to_string(),
            ));
        }

        if self.admin.password.is_none() && self.admin.password_hash.is_none() {
            tracing::warn!(
                "SECURITY: Neither ADMIN_HASH_PASSWORD nor ADMIN_PASSWORD is set. \
                 The default admin password 'admin123' is insecure."
            );
        }

        Ok(())
    }
}
