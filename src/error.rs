use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("invalid pipeline: {0}")]
    InvalidPipeline(String),

    #[error("invalid recipe: {0}")]
    InvalidRecipe(String),
}

pub type Result<T> = std::result::Result<T, Error>;
