/// Core error type for the bot.
///
/// Adapter crates should map their specific errors into this type so the
/// bot core can handle failures consistently (cache fallback vs user-facing
/// message). Authorization denials are NOT errors; they are modeled as
/// [`crate::gate::Denial`] values.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("unrecognized response: {0}")]
    Normalize(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
