#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing token, or the server answered 401/403
    #[error("Not authenticated")]
    Unauthorized,

    #[error("API error ({status}): {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}
