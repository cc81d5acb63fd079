//! Error types for Lectio

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LectioError {
    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl From<rusqlite::Error> for LectioError {
    fn from(e: rusqlite::Error) -> Self {
        LectioError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for LectioError {
    fn from(e: serde_json::Error) -> Self {
        LectioError::Corpus(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        let e = LectioError::NotFound("translation xx".to_string());
        assert_eq!(e.to_string(), "Not found: translation xx");
        let e = LectioError::Other("plain".to_string());
        assert_eq!(e.to_string(), "plain");
    }
}
