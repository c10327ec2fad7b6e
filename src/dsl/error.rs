use thiserror::Error;

use crate::engine::EngineError;

/// Errores del lenguaje de comandos
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DslError {
    #[error("[line {line}] Parse error: {msg}")]
    Parse { line: usize, msg: String },

    #[error("[line {line}] Engine error: {source}")]
    Engine { line: usize, source: EngineError },
}

impl DslError {
    pub fn line(&self) -> usize {
        match self {
            DslError::Parse { line, .. } | DslError::Engine { line, .. } => *line,
        }
    }
}
