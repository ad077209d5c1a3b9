/*!
 * Logging Module
 * Console + daily rolling file output for the site backend
 */
pub mod middleware;

use std::io;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Where and how loudly to log.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub is_production: bool,
    pub log_dir: String,
    pub log_level: String,
}

impl LogConfig {
    pub fn from_env(is_production: bool) -> Self {
        Self {
            is_production,
            log_dir: std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| {
                if is_production {
                    "info".to_string()
                } else {
                    "debug".to_string()
                }
            }),
        }
    }

    /// `RUST_LOG` wins over `LOG_LEVEL` when set.
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "practice_site_backend={},tower_http=debug,axum=debug,sqlx=warn",
                self.log_level
            ))
        })
    }
}

/// Keeps the non-blocking writers flushing. Drop it only at shutdown.
#[must_use = "dropping the guards stops the log writer threads"]
pub struct LogGuards {
    _guards: Vec<WorkerGuard>,
}

/// Initialize the logging system
pub fn init(config: &LogConfig) -> LogGuards {
    if let Err(e) = std::fs::create_dir_all(&config.log_dir) {
        eprintln!("Cannot create log directory {}: {}", config.log_dir, e);
    }

    let (file_writer, file_guard) = non_blocking(rolling::daily(&config.log_dir, "app.log"));
    let (error_writer, error_guard) = non_blocking(rolling::daily(&config.log_dir, "error.log"));
    let (console_writer, console_guard) = non_blocking(io::stdout());

    let subscriber = tracing_subscriber::registry().with(config.env_filter());

    if config.is_production {
        // JSON format for production
        let file_layer = fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        let error_layer = fmt::layer()
            .json()
            .with_writer(error_writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(tracing_subscriber::filter::LevelFilter::ERROR);

        let console_layer = fmt::layer()
            .json()
            .with_writer(console_writer)
            .with_target(false);

        subscriber
            .with(file_layer)
            .with(error_layer)
            .with(console_layer)
            .init();
    } else {
        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false);

        let error_layer = fmt::layer()
            .with_writer(error_writer)
            .with_ansi(false)
            .with_filter(tracing_subscriber::filter::LevelFilter::ERROR);

        let console_layer = fmt::layer()
            .with_writer(console_writer)
            .with_target(true)
            .pretty();

        subscriber
            .with(file_layer)
            .with(error_layer)
            .with(console_layer)
            .init();
    }

    tracing::info!(
        production = config.is_production,
        log_dir = %config.log_dir,
        "Logging initialized"
    );

    LogGuards {
        _guards: vec![file_guard, error_guard, console_guard],
    }
}
