use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Tag error: {0}")]
    Tag(#[from] lofty::error::LoftyError),

    #[error("API error: {0}")]
    Api(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Playlist error: {0}")]
    Playlist(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
