use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for modgraph operations outside the resolver taxonomy.
#[derive(Debug, Error, Diagnostic)]
pub enum ModError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or unreadable configuration file.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check ~/.modgraph/config.toml for syntax errors"))]
    Config { message: String },

    /// A module's `metadata.json` could not be read or parsed.
    #[error("Metadata error: {message}")]
    Metadata { message: String },

    /// Network request to the registry failed.
    #[error("Network error: {message}")]
    Network { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type ModResult<T> = miette::Result<T>;
