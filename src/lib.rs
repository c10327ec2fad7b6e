// src/lib.rs

pub mod core;

pub mod dsl;
pub mod engine;
pub mod utils;

pub use crate::core::store;
pub use crate::core::tensor;

// Re-exports para tener una API limpia desde fuera del crate
pub use crate::core::broadcast::{check_compatible, classify, BroadcastPlan};
pub use crate::core::{
    BroadcastKind, BroadcastResult, DType, EngineConfig, KernelBackend, ShapeMismatchError,
};
pub use dsl::{execute_line, execute_script, DslError, DslOutput};
pub use engine::golden::{golden, max_abs_error, HostArray};
pub use engine::kernels::{eval_binary, subalpha, subalpha_with};
pub use engine::{BinaryOp, EngineError, TensorDb};
pub use store::{InMemoryTensorStore, StoreError};
pub use tensor::{Shape, Tensor, TensorError, TensorId};
