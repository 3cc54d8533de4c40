use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Feed request failed: {status} - {body}")]
    FeedStatus { status: u16, body: String },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Artifact error ({path}): {message}")]
    Artifact { path: String, message: String },

    #[error("Prediction failed: {0}")]
    Prediction(String),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

impl AlertError {
    pub fn store(message: impl Into<String>) -> Self {
        AlertError::Store {
            message: message.into(),
        }
    }

    pub fn artifact(path: impl Into<String>, message: impl Into<String>) -> Self {
        AlertError::Artifact {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AlertError>;
