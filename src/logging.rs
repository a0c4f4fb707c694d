//! # Structured Logging Module
//!
//! Environment-aware structured logging to the console, with an optional JSON file layer
//! for long-running pipeline processes.

use crate::config::LoggingConfig;
use chrono::Utc;
use std::fs;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific defaults
pub fn init_structured_logging() {
    init_structured_logging_with(&LoggingConfig::default());
}

/// Initialize structured logging from a [`LoggingConfig`]. Only the first call has effect.
pub fn init_structured_logging_with(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment, config);

        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(build_filter(&log_level));

        let mut log_file = None;
        let file_layer = if config.json_file {
            match fs::create_dir_all(&config.log_dir) {
                Ok(()) => {
                    let pid = process::id();
                    let file_name = format!("{environment}.{pid}.log");
                    let appender = tracing_appender::rolling::daily(&config.log_dir, &file_name);
                    let (writer, guard) = tracing_appender::non_blocking(appender);
                    // The writer must outlive every span in the process
                    std::mem::forget(guard);
                    log_file = Some(config.log_dir.join(file_name));
                    Some(
                        fmt::layer()
                            .with_writer(writer)
                            .with_target(true)
                            .with_thread_ids(true)
                            .with_ansi(false)
                            .json()
                            .with_filter(build_filter(&log_level)),
                    )
                }
                Err(e) => {
                    eprintln!(
                        "Failed to create log directory {}: {e}; logging to console only",
                        config.log_dir.display()
                    );
                    None
                }
            }
        } else {
            None
        };

        let subscriber = tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer);

        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            pid = process::id(),
            environment = %environment,
            level = %log_level,
            log_file = ?log_file,
            "Structured logging initialized"
        );
    });
}

fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("CADENCE_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Production runs at the configured level; everything else at debug or finer
fn get_log_level(environment: &str, config: &LoggingConfig) -> String {
    match environment {
        "production" => config.level.clone(),
        _ if config.level == "trace" => "trace".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for bundle lifecycle operations
pub fn log_bundle_operation(
    operation: &str,
    task_id: Option<i64>,
    bundle_index: Option<usize>,
    phase: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        task_id = task_id,
        bundle_index = bundle_index,
        phase = phase,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "BUNDLE_OPERATION"
    );
}

/// Log structured data for cache refills and evictions
pub fn log_cache_operation(
    operation: &str,
    requested: usize,
    absent: usize,
    cached: usize,
    status: &str,
) {
    tracing::debug!(
        operation = %operation,
        requested = requested,
        absent = absent,
        cached = cached,
        status = %status,
        timestamp = %Utc::now().to_rfc3339(),
        "CACHE_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "ERROR"
    );
}
