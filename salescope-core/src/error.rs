use thiserror::Error;

use crate::executor::ExecutionError;
use crate::translator::TranslationError;

#[derive(Error, Debug)]
pub enum SalescopeError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Other error: {0}")]
    Other(String),
}
