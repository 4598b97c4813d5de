use thiserror::Error;

/// Why one strategy in a capability cascade failed. A cascade steps to the
/// next strategy on any of these; they are never surfaced as job failures.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("provider returned HTTP {0}")]
    Http(u16),

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("capability not available")]
    Unavailable,

    #[error("local engine failed: {0}")]
    Engine(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Network(err.to_string())
    }
}

/// The only fatal job outcomes. Every other failure mode degrades in place.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("script is empty; nothing to generate")]
    EmptyScript,

    #[error("no usable segments were produced")]
    NoSegments,
}
