use thiserror::Error;

/// Library error type for gallery cache operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The media root is missing or not a directory.
    #[error("invalid media directory: {0}")]
    BadDir(String),

    /// No eligible, decodable media could be produced within the bounded wait.
    #[error("no media available")]
    NoMediaAvailable,

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),
}
