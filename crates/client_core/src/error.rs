use shared::error::ApiException;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Server,
    Validation,
    Internal,
}

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Server(#[from] ApiException),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unexpected reply from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        source: serde_json::Error,
    },
    #[error("invalid server url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("no trip content is open")]
    NoActiveContent,
    #[error("content is not in editing mode")]
    NotEditing,
}

impl ConsoleError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ConsoleError::Transport(_) => ErrorKind::Transport,
            ConsoleError::Server(_) => ErrorKind::Server,
            ConsoleError::InvalidInput(_)
            | ConsoleError::NoActiveContent
            | ConsoleError::NotEditing => ErrorKind::Validation,
            ConsoleError::Decode { .. } | ConsoleError::InvalidUrl(_) => ErrorKind::Internal,
        }
    }

    /// Text suitable for a notification. Server errors surface the server's
    /// own wording; everything else falls back to `fallback` or the error.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ConsoleError::Server(err) => err.message.clone(),
            ConsoleError::InvalidInput(message) => message.clone(),
            ConsoleError::NoActiveContent | ConsoleError::NotEditing => self.to_string(),
            _ => fallback.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ConsoleError::Server(err) if err.status == 404)
    }
}

pub type Result<T, E = ConsoleError> = std::result::Result<T, E>;
