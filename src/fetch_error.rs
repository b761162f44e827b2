/// Failure of a single provider lookup. Every variant means the same thing
/// to the resolver: this source is unavailable for the current request, log
/// it and move on to the next one.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected response status: {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to decode provider payload: {0}")]
    Decode(String),
    #[error("provider returned no usable data: {0}")]
    Empty(String),
    #[error("missing configuration: {0}")]
    NotConfigured(&'static str),
}
