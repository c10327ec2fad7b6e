// src/core/store/tensor_store.rs

use thiserror::Error;

use crate::core::dtype::DType;
use crate::core::tensor::{Shape, Tensor, TensorError, TensorId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Tensor not found: {0:?}")]
    TensorNotFound(TensorId),

    #[error("Invalid tensor: {0}")]
    InvalidTensor(#[from] TensorError),
}

/// Motor en memoria: guarda tensores inmutables en una lista.
#[derive(Debug, Default)]
pub struct InMemoryTensorStore {
    next_id: u64,
    tensors: Vec<Tensor>,
}

impl InMemoryTensorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Genera un nuevo ID interno
    pub fn gen_id_internal(&mut self) -> TensorId {
        let id = TensorId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Inserta un tensor a partir de shape + dtype + data
    pub fn insert_tensor(
        &mut self,
        shape: Shape,
        dtype: DType,
        data: Vec<f32>,
    ) -> Result<TensorId, StoreError> {
        let id = self.gen_id_internal();
        let tensor = Tensor::new(id, shape, dtype, data)?;
        self.tensors.push(tensor);
        Ok(id)
    }

    /// Inserta un Tensor ya construido (normalmente con un ID de `gen_id_internal`)
    pub fn insert_existing_tensor(&mut self, tensor: Tensor) -> TensorId {
        let id = tensor.id();
        self.tensors.push(tensor);
        id
    }

    /// Obtiene referencia a un tensor por ID
    pub fn get(&self, id: TensorId) -> Result<&Tensor, StoreError> {
        self.tensors
            .iter()
            .find(|t| t.id() == id)
            .ok_or(StoreError::TensorNotFound(id))
    }

    /// Conserva solo los tensores cuyo ID cumple `keep`; devuelve cuántos se quitaron
    pub fn retain(&mut self, keep: impl Fn(TensorId) -> bool) -> usize {
        let before = self.tensors.len();
        self.tensors.retain(|t| keep(t.id()));
        before - self.tensors.len()
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}
