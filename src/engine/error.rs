use thiserror::Error;

use crate::core::broadcast::ShapeMismatchError;
use crate::core::store::StoreError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Tensor name not found: {0}")]
    NameNotFound(String),

    #[error(transparent)]
    ShapeMismatch(#[from] ShapeMismatchError),

    #[error("Invalid operation: {0}")]
    InvalidOp(String),
}
