pub mod db;
pub mod error;
pub mod golden;
pub mod kernels;
pub mod operations;

pub use db::{Derivation, TensorDb};
pub use error::EngineError;
pub use operations::BinaryOp;
