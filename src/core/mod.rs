pub mod broadcast;
pub mod config;
pub mod dtype;
pub mod store;
pub mod tensor;

// Re-export commonly used types
pub use broadcast::{BroadcastKind, BroadcastPlan, BroadcastResult, ShapeMismatchError};
pub use config::{EngineConfig, KernelBackend};
pub use dtype::DType;
pub use tensor::{Shape, Tensor, TensorError, TensorId};
