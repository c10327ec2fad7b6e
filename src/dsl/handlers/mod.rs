pub mod introspection;
pub mod operations;
pub mod tensor;

pub use introspection::{handle_check, handle_show, handle_verify};
pub use operations::handle_let;
pub use tensor::handle_define;
