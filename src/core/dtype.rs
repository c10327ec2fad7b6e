// src/core/dtype.rs
use half::bf16;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage precision of a tensor.
///
/// Values are always held as `f32` in memory; the dtype decides how they are
/// rounded when written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    #[default]
    Float32,
    BFloat16,
    Int32,
}

impl DType {
    /// Round a value into this storage precision.
    /// - Float32: unchanged
    /// - BFloat16: round-to-nearest-even through `half::bf16`
    /// - Int32: truncation toward zero, saturating at the i32 range (NaN -> 0)
    #[inline]
    pub fn quantize(self, value: f32) -> f32 {
        match self {
            DType::Float32 => value,
            DType::BFloat16 => bf16::from_f32(value).to_f32(),
            DType::Int32 => (value as i32) as f32,
        }
    }

    /// Quantize a full buffer in place
    pub fn quantize_slice(self, values: &mut [f32]) {
        if self == DType::Float32 {
            return;
        }
        for v in values.iter_mut() {
            *v = self.quantize(*v);
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DType::Float32 => "f32",
            DType::BFloat16 => "bf16",
            DType::Int32 => "i32",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "f32" | "float32" => Ok(DType::Float32),
            "bf16" | "bfloat16" => Ok(DType::BFloat16),
            "i32" | "int32" => Ok(DType::Int32),
            other => Err(format!("Unknown dtype: {}", other)),
        }
    }
}
