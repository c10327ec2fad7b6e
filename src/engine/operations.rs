use serde::Serialize;
use std::fmt;

use crate::core::dtype::DType;

/// Operaciones binarias elemento a elemento (todas con broadcasting)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum BinaryOp {
    /// a - alpha * b
    SubAlpha(f32),
    /// a - b
    Subtract,
    /// a + b
    Add,
    /// a * b
    Multiply,
}

impl BinaryOp {
    /// The same operation with its scalar parameter rounded into `dtype`,
    /// the way the scalar is packed for the output precision.
    pub fn for_dtype(self, dtype: DType) -> Self {
        match self {
            BinaryOp::SubAlpha(alpha) => BinaryOp::SubAlpha(dtype.quantize(alpha)),
            other => other,
        }
    }

    /// Apply to one pair of elements. Arithmetic runs in f32; rounding into the
    /// storage dtype happens on write.
    ///
    /// `SubAlpha(0.0)` returns `x` untouched, also when `y` is infinite or NaN.
    #[inline(always)]
    pub fn apply(self, x: f32, y: f32) -> f32 {
        match self {
            BinaryOp::SubAlpha(alpha) if alpha == 0.0 => x,
            BinaryOp::SubAlpha(alpha) => x - alpha * y,
            BinaryOp::Subtract => x - y,
            BinaryOp::Add => x + y,
            BinaryOp::Multiply => x * y,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::SubAlpha(_) => "subalpha",
            BinaryOp::Subtract => "subtract",
            BinaryOp::Add => "add",
            BinaryOp::Multiply => "multiply",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::SubAlpha(alpha) => write!(f, "subalpha(alpha={})", alpha),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply() {
        assert_eq!(BinaryOp::SubAlpha(5.0).apply(10.0, 2.0), 0.0);
        assert_eq!(BinaryOp::SubAlpha(-0.5).apply(1.0, 4.0), 3.0);
        assert_eq!(BinaryOp::Subtract.apply(1.0, 4.0), -3.0);
        assert_eq!(BinaryOp::Add.apply(1.0, 4.0), 5.0);
        assert_eq!(BinaryOp::Multiply.apply(1.5, 4.0), 6.0);
    }

    #[test]
    fn test_zero_alpha_ignores_rhs() {
        assert_eq!(BinaryOp::SubAlpha(0.0).apply(3.0, f32::INFINITY), 3.0);
        assert_eq!(BinaryOp::SubAlpha(-0.0).apply(3.0, f32::NAN), 3.0);
        // i32 truncation turns a small alpha into 0
        let op = BinaryOp::SubAlpha(0.5).for_dtype(DType::Int32);
        assert_eq!(op.apply(7.0, f32::NEG_INFINITY), 7.0);
    }

    #[test]
    fn test_alpha_follows_dtype() {
        assert_eq!(
            BinaryOp::SubAlpha(2.7).for_dtype(DType::Int32),
            BinaryOp::SubAlpha(2.0)
        );
        assert_eq!(
            BinaryOp::SubAlpha(0.1).for_dtype(DType::Float32),
            BinaryOp::SubAlpha(0.1)
        );
        assert_eq!(BinaryOp::Add.for_dtype(DType::Int32), BinaryOp::Add);
    }
}
