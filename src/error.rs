use thiserror::Error;

use crate::game::list::ListError;
use crate::sprite::SpriteError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// An entity list or the sprite service refused a new entity.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(&'static str),
    #[error("sprite service unavailable")]
    ServiceUnavailable,
    #[error("invalid engine state: {0}")]
    InvalidState(&'static str),
}

impl From<ListError> for EngineError {
    fn from(err: ListError) -> Self {
        match err {
            ListError::Full => EngineError::ResourceExhausted("entity list at capacity"),
        }
    }
}

impl From<SpriteError> for EngineError {
    fn from(err: SpriteError) -> Self {
        match err {
            SpriteError::Exhausted => EngineError::ResourceExhausted("no free sprite handles"),
            SpriteError::Unavailable | SpriteError::UnknownHandle(_) => {
                EngineError::ServiceUnavailable
            }
        }
    }
}
