//! Error types shared by the remote client and the input parsers

/// Errors raised while talking to the remote file store
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Graph API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Access token unavailable: {0}")]
    Token(String),
}

/// Errors raised while extracting a folder id from a share link
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ShareUrlError {
    #[error("Share link is not a valid URL: {0}")]
    InvalidUrl(String),

    #[error("Could not extract a folder id from: {0}")]
    MissingFolderId(String),
}

/// Errors raised while loading a hand-authored course structure
#[derive(thiserror::Error, Debug)]
pub enum ManualError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML structure: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse JSON structure: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported structure file extension: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid structure: {0}")]
    Invalid(String),
}
