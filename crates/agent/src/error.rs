use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Failed to parse JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Upload rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}
