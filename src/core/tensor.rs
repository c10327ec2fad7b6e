// src/core/tensor.rs
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::dtype::DType;

/// Identificador de tensor (newtype para no confundir con otros u64)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorId(pub u64);

/// Representa la forma (shape) de un tensor.
/// []            -> escalar (rank 0)
/// [3]           -> vector (rank 1)
/// [1, 3, 32, 32] -> NCHW (rank 4)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub dims: Vec<usize>,
}

impl Shape {
    /// Crea un nuevo shape a partir de una lista de dimensiones
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// Shape with `rank` axes of length 1
    pub fn ones(rank: usize) -> Self {
        Self { dims: vec![1; rank] }
    }

    /// Número de dimensiones (rank)
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Número total de elementos, `None` si no cabe en usize.
    /// Un eje de longitud 0 da 0 aunque el resto desborde.
    pub fn checked_num_elements(&self) -> Option<usize> {
        if self.dims.contains(&0) {
            return Some(0);
        }
        self.dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Número total de elementos; satura en usize::MAX
    pub fn num_elements(&self) -> usize {
        self.checked_num_elements().unwrap_or(usize::MAX)
    }

    /// Row-major strides. Axes of length 1 still get their natural stride;
    /// broadcasting zeroes them separately.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![0; self.dims.len()];
        let mut acc: usize = 1;
        for (i, &d) in self.dims.iter().enumerate().rev() {
            strides[i] = acc;
            acc = acc.saturating_mul(d);
        }
        strides
    }

    /// Left-pad with 1s up to `rank` axes. Never truncates.
    pub fn aligned_to(&self, rank: usize) -> Shape {
        if self.rank() >= rank {
            return self.clone();
        }
        let mut dims = vec![1; rank - self.rank()];
        dims.extend_from_slice(&self.dims);
        Shape { dims }
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.dims)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    #[error("Data length {len} does not match shape {shape} (expected {expected})")]
    LengthMismatch {
        len: usize,
        shape: Shape,
        expected: usize,
    },

    #[error("Invalid random range: low {low} must be below high {high}, with a finite width")]
    InvalidRange { low: f32, high: f32 },

    #[error("Shape {shape} has too many elements")]
    TooLarge { shape: Shape },
}

/// Tensor denso row-major, inmutable una vez construido.
///
/// Los valores se guardan como f32 pero ya redondeados al `dtype`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    id: TensorId,
    shape: Shape,
    dtype: DType,
    data: Vec<f32>,
}

impl Tensor {
    /// Crea un tensor verificando que data.len() coincide con shape.num_elements().
    /// Los valores se redondean a la precisión de `dtype`.
    pub fn new(
        id: TensorId,
        shape: Shape,
        dtype: DType,
        mut data: Vec<f32>,
    ) -> Result<Self, TensorError> {
        let expected = shape
            .checked_num_elements()
            .ok_or_else(|| TensorError::TooLarge {
                shape: shape.clone(),
            })?;
        if data.len() != expected {
            return Err(TensorError::LengthMismatch {
                len: data.len(),
                shape,
                expected,
            });
        }
        dtype.quantize_slice(&mut data);
        Ok(Self {
            id,
            shape,
            dtype,
            data,
        })
    }

    /// Kernel output whose length already matches `shape` and whose values are
    /// already rounded into `dtype`.
    pub(crate) fn from_parts(id: TensorId, shape: Shape, dtype: DType, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), shape.num_elements());
        Self {
            id,
            shape,
            dtype,
            data,
        }
    }

    /// f32 tensor with id 0, handy for host-side construction
    pub fn from_vec(dims: Vec<usize>, data: Vec<f32>) -> Result<Self, TensorError> {
        Self::new(TensorId(0), Shape::new(dims), DType::Float32, data)
    }

    /// Tensor of uniform samples in `[low, high)` from a seeded generator.
    pub fn random(
        id: TensorId,
        shape: Shape,
        dtype: DType,
        low: f32,
        high: f32,
        seed: u64,
    ) -> Result<Self, TensorError> {
        if low.is_nan() || high.is_nan() || low >= high || !(high - low).is_finite() {
            return Err(TensorError::InvalidRange { low, high });
        }
        let len = shape
            .checked_num_elements()
            .ok_or_else(|| TensorError::TooLarge {
                shape: shape.clone(),
            })?;
        let mut rng = StdRng::seed_from_u64(seed);
        let data = (0..len)
            .map(|_| rng.gen_range(low..high))
            .collect();
        Self::new(id, shape, dtype, data)
    }

    /// Same contents under a different id
    pub fn with_id(mut self, id: TensorId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> TensorId {
        self.id
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        &self.shape.dims
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Rank del tensor (0 = escalar, 1 = vector, 2 = matriz...)
    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// Número de elementos
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element at a full coordinate, `None` if out of bounds
    pub fn get(&self, index: &[usize]) -> Option<f32> {
        if index.len() != self.rank() {
            return None;
        }
        let mut flat = 0;
        for ((&i, &d), s) in index
            .iter()
            .zip(self.shape.dims.iter())
            .zip(self.shape.strides())
        {
            if i >= d {
                return None;
            }
            flat += i * s;
        }
        self.data.get(flat).copied()
    }
}
