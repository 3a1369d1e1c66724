/// Errors from talking to the advising backend.
///
/// The `Display` text of every variant is what ends up in the chat as the
/// assistant's reply, so it is written for students, not developers.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Non-2xx response. Holds the body text, or `HTTP <code>` when empty.
    #[error("{0}")]
    Status(String),

    #[error("Could not reach the advising service: {0}")]
    Request(#[from] reqwest::Error),

    #[error("The advising service sent a response that could not be read: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
