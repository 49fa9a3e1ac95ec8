//! Logging utilities for the hypso engine.
//!
//! This module provides structured logging functionality to make logs more
//! searchable, analyzable, and useful when runs are driven from batch
//! schedulers.

use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Initialize the tracing subscriber with the given log level
pub fn init_tracing(log_level: &str) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(val) => val,
        Err(_) => log_level.to_string(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

/// Generate a unique run ID
pub fn generate_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// Log a start message for a significant operation
pub fn log_operation_start(operation: &str, details: Option<&str>) {
    if let Some(details) = details {
        info!(
            operation = operation,
            details = details,
            "Starting operation"
        );
    } else {
        info!(operation = operation, "Starting operation");
    }
}

/// Log the completion of a significant operation
pub fn log_operation_end(operation: &str, start_time: Instant, success: bool) {
    let duration = start_time.elapsed();
    let duration_ms = duration.as_secs_f64() * 1000.0;

    if success {
        info!(
            operation = operation,
            duration_ms = duration_ms,
            "Operation completed successfully"
        );
    } else {
        warn!(
            operation = operation,
            duration_ms = duration_ms,
            "Operation completed with warnings"
        );
    }
}

/// Log an operation with timing and result in a single statement
pub fn log_timed_operation<F, R>(operation: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = Instant::now();
    let run_id = Uuid::new_v4();

    debug!(
        operation = operation,
        run_id = %run_id,
        "Starting operation"
    );

    let result = f();

    let duration = start.elapsed();

    info!(
        operation = operation,
        run_id = %run_id,
        duration_ms = duration.as_secs_f64() * 1000.0,
        "Operation completed"
    );

    result
}

/// Log detailed information about one interpolation pass
pub fn log_interp_stats(
    file_path: &str,
    vars: &str,
    heights: usize,
    columns: usize,
    clamped_speeds: usize,
    capped_regressions: usize,
) {
    info!(
        operation = "interp",
        file_path = file_path,
        vars = vars,
        heights = heights,
        columns = columns,
        clamped_speeds = clamped_speeds,
        capped_regressions = capped_regressions,
        "Interpolation completed"
    );
}

/// Log an error with context
pub fn log_error(error: &crate::error::HypsoError, context: &str) {
    error!(
        error = %error,
        context = context,
        error_type = std::any::type_name_of_val(error),
        "Error occurred"
    );
}
