use thiserror::Error;

#[derive(Error, Debug)]
pub enum LongboxError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Release feed parse error: {0}")]
    FeedParse(String),

    #[error("Rule definition error: {0}")]
    RuleDefinition(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Comic not found: {0}")]
    ComicNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("A refresh is already in flight")]
    RefreshInFlight,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, LongboxError>;
