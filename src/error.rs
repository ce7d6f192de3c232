//! Custom error types for openalex-works.
//!
//! All library functions return `Result<T, OpenAlexError>` instead of using `unwrap()`.
//! Best-effort lookups use the narrower [`NotFound`] so callers cannot confuse
//! "lookup failed" with a hard error.

use thiserror::Error;

/// Main error type for openalex-works operations.
#[derive(Debug, Error)]
pub enum OpenAlexError {
    /// Rate limited by the API and retries were exhausted
    #[error("Rate limit exceeded. Retry after {wait_secs} seconds.")]
    RateLimited {
        /// Wait duration announced by the last `Retry-After` header
        wait_secs: u64,
    },

    /// Transport or HTTP failure that survived every retry
    #[error("API request failed: {0}")]
    Api(String),

    /// Institution name could not be resolved to an id
    #[error("Institution '{0}' not found. Please check the spelling or use an institution ID instead.")]
    InstitutionNotFound(String),

    /// Caller supplied invalid or insufficient input
    #[error("{0}")]
    Validation(String),

    /// Network/HTTP client construction or body error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV read error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias using `OpenAlexError`
pub type Result<T> = std::result::Result<T, OpenAlexError>;

/// A best-effort lookup produced no identifier.
///
/// Returned both when the API answered with zero hits and when the request
/// itself failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no match for '{0}'")]
pub struct NotFound(pub String);

/// Result of a best-effort identifier lookup
pub type Lookup = std::result::Result<String, NotFound>;
