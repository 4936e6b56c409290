// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid targetId: must be a non-empty identifier")]
    InvalidTargetId,

    #[error("Handler key must be \"CollectionName.handler\": {0}")]
    InvalidHandlerFormat(String),

    #[error("Unknown collection \"{0}\". Register it in the target resolver first.")]
    UnknownCollection(String),

    #[error("Handler already registered: {0}")]
    DuplicateHandler(String),

    #[error("Missing handler: {0}")]
    MissingHandler(String),

    #[error("Modifier required for update")]
    ModifierRequired,
}

pub type Result<T> = std::result::Result<T, DomainError>;
