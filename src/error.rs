//! Error types for the hypso engine.
//!
//! This module defines a comprehensive error enum that covers all possible
//! error conditions in the application. Numerical errors are never retried:
//! a corrupt input aborts the whole file.

use thiserror::Error;

/// The main error type for hypso operations.
#[derive(Error, Debug)]
pub enum HypsoError {
    /// NetCDF file operation errors
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Array shape errors
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// Configuration errors, raised before any computation starts
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Physically impossible input values (non-positive pressure,
    /// non-monotonic height profile). Fatal for the whole file.
    #[error("Corrupt input data: {message}")]
    CorruptInput { message: String },

    /// A requested quantity's prerequisite input variable is absent
    #[error("Missing variable: {name} (needed for {needed_for})")]
    MissingVariable { name: String, needed_for: String },
}

/// Convenience type alias for Results with HypsoError
pub type Result<T> = std::result::Result<T, HypsoError>;
