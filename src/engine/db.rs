use std::collections::{HashMap, HashSet};

use crate::core::broadcast::{self, BroadcastKind, BroadcastResult};
use crate::core::config::EngineConfig;
use crate::core::dtype::DType;
use crate::core::store::{InMemoryTensorStore, StoreError};
use crate::core::tensor::{Shape, Tensor, TensorError, TensorId};

use super::error::EngineError;
use super::golden;
use super::kernels;
use super::operations::BinaryOp;

/// Cómo se obtuvo un tensor derivado: operación, nombres de los operandos
/// y los tensores exactos que se usaron.
///
/// Los tensores de los operandos siguen en el store mientras la derivación
/// exista, aunque sus nombres se redefinan.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    pub op: BinaryOp,
    pub left: String,
    pub right: String,
    pub left_id: TensorId,
    pub right_id: TensorId,
}

struct NameEntry {
    id: TensorId,
    origin: Option<Derivation>,
}

/// Espacio de trabajo: tensores inmutables con nombre más la configuración
/// del kernel.
///
/// Redefinir un nombre crea un tensor nuevo; los tensores existentes nunca se
/// modifican.
pub struct TensorDb {
    pub config: EngineConfig,
    store: InMemoryTensorStore,
    names: HashMap<String, NameEntry>,
}

impl Default for TensorDb {
    fn default() -> Self {
        Self::new()
    }
}

impl TensorDb {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::load())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            store: InMemoryTensorStore::new(),
            names: HashMap::new(),
        }
    }

    /// Inserta un tensor y lo asocia a un nombre
    pub fn insert_named(
        &mut self,
        name: impl Into<String>,
        shape: Shape,
        dtype: DType,
        data: Vec<f32>,
    ) -> Result<(), EngineError> {
        let name = name.into();
        let id = self.store.insert_tensor(shape, dtype, data)?;
        log::debug!("defined {} as {:?}", name, id);
        self.bind(name, NameEntry { id, origin: None });
        Ok(())
    }

    /// Inserta un tensor aleatorio uniforme en [low, high) con semilla fija
    pub fn insert_random(
        &mut self,
        name: impl Into<String>,
        shape: Shape,
        dtype: DType,
        low: f32,
        high: f32,
        seed: u64,
    ) -> Result<(), EngineError> {
        let id = self.store.gen_id_internal();
        let tensor =
            Tensor::random(id, shape, dtype, low, high, seed).map_err(StoreError::from)?;
        let id = self.store.insert_existing_tensor(tensor);
        self.bind(name.into(), NameEntry { id, origin: None });
        Ok(())
    }

    /// Asocia `name` a un tensor y libera los tensores que ya no alcanza
    /// ningún nombre ni ninguna derivación.
    fn bind(&mut self, name: String, entry: NameEntry) {
        if self.names.insert(name, entry).is_some() {
            self.collect_unreachable();
        }
    }

    fn collect_unreachable(&mut self) {
        let live: HashSet<TensorId> = self
            .names
            .values()
            .flat_map(|e| {
                let operands = e.origin.as_ref().map(|d| [d.left_id, d.right_id]);
                std::iter::once(e.id).chain(operands.into_iter().flatten())
            })
            .collect();
        let freed = self.store.retain(|id| live.contains(&id));
        if freed > 0 {
            log::debug!("freed {} unreachable tensor(s)", freed);
        }
    }

    /// Obtiene un tensor por nombre
    pub fn get(&self, name: &str) -> Result<&Tensor, EngineError> {
        let entry = self.entry(name)?;
        Ok(self.store.get(entry.id)?)
    }

    /// Operación y operandos que produjeron `name`, si es derivado
    pub fn origin(&self, name: &str) -> Result<Option<&Derivation>, EngineError> {
        Ok(self.entry(name)?.origin.as_ref())
    }

    fn entry(&self, name: &str) -> Result<&NameEntry, EngineError> {
        self.names
            .get(name)
            .ok_or_else(|| EngineError::NameNotFound(name.to_string()))
    }

    /// Compatibilidad de broadcast entre dos tensores con nombre
    pub fn check(&self, left_name: &str, right_name: &str) -> Result<BroadcastResult, EngineError> {
        let a = self.get(left_name)?;
        let b = self.get(right_name)?;
        Ok(broadcast::check_compatible(a.shape(), b.shape()))
    }

    /// Tipo de broadcast en los dos últimos ejes
    pub fn classify(
        &self,
        left_name: &str,
        right_name: &str,
    ) -> Result<BroadcastKind, EngineError> {
        let a = self.get(left_name)?;
        let b = self.get(right_name)?;
        Ok(broadcast::classify(a.shape(), b.shape())?)
    }

    /// Evalúa una operación binaria con broadcasting y guarda el resultado
    pub fn eval_binary(
        &mut self,
        output_name: impl Into<String>,
        left_name: &str,
        right_name: &str,
        op: BinaryOp,
    ) -> Result<(), EngineError> {
        let new_id = self.store.gen_id_internal();
        let left_id = self.entry(left_name)?.id;
        let right_id = self.entry(right_name)?.id;
        let a = self.store.get(left_id)?;
        let b = self.store.get(right_id)?;

        let out_shape = broadcast::check_compatible(a.shape(), b.shape()).into_result()?;
        if out_shape.checked_num_elements().is_none() {
            return Err(StoreError::from(TensorError::TooLarge { shape: out_shape }).into());
        }

        let result = kernels::eval_binary(a, b, op, new_id, &self.config.kernel)?;

        let output_name = output_name.into();
        log::info!(
            "{} = {} {} {} -> shape {}",
            output_name,
            op,
            left_name,
            right_name,
            result.shape()
        );

        let id = self.store.insert_existing_tensor(result);
        self.bind(
            output_name,
            NameEntry {
                id,
                origin: Some(Derivation {
                    op,
                    left: left_name.to_string(),
                    right: right_name.to_string(),
                    left_id,
                    right_id,
                }),
            },
        );
        Ok(())
    }

    /// a - alpha * b
    pub fn eval_subalpha(
        &mut self,
        output_name: impl Into<String>,
        left_name: &str,
        right_name: &str,
        alpha: f32,
    ) -> Result<(), EngineError> {
        self.eval_binary(output_name, left_name, right_name, BinaryOp::SubAlpha(alpha))
    }

    /// Recalcula un tensor derivado con la implementación de referencia y
    /// devuelve el máximo error absoluto.
    ///
    /// Usa los tensores exactos que produjeron el resultado, no lo que los
    /// nombres de los operandos valen ahora.
    pub fn verify(&self, name: &str) -> Result<f64, EngineError> {
        let derivation = self.origin(name)?.ok_or_else(|| {
            EngineError::InvalidOp(format!("{} was not produced by an operation", name))
        })?;
        let result = self.get(name)?;
        let a = self.store.get(derivation.left_id)?;
        let b = self.store.get(derivation.right_id)?;

        let reference = golden::golden(derivation.op.for_dtype(a.dtype()), a, b)
            .ok_or_else(|| {
                EngineError::InvalidOp(format!("operands of {} do not broadcast together", name))
            })?;
        golden::max_abs_error(result, &reference).ok_or_else(|| {
            EngineError::InvalidOp(format!("{} does not match its reference shape", name))
        })
    }

    /// Todos los nombres registrados
    pub fn list_names(&self) -> Vec<String> {
        self.names.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> TensorDb {
        TensorDb::with_config(EngineConfig::default())
    }

    #[test]
    fn test_eval_and_verify() {
        let mut db = db();
        db.insert_named("a", Shape::new(vec![2, 1]), DType::Float32, vec![1.0, 2.0])
            .unwrap();
        db.insert_named("b", Shape::new(vec![3]), DType::Float32, vec![0.5, 1.0, 1.5])
            .unwrap();
        db.eval_subalpha("c", "a", "b", 2.0).unwrap();

        let c = db.get("c").unwrap();
        assert_eq!(c.dims(), &[2, 3]);
        assert_eq!(c.data(), &[0.0, -1.0, -2.0, 1.0, 0.0, -1.0]);
        assert_eq!(db.verify("c").unwrap(), 0.0);
        assert_eq!(
            db.origin("c").unwrap().map(|d| d.op),
            Some(BinaryOp::SubAlpha(2.0))
        );
    }

    #[test]
    fn test_verify_needs_derived_tensor() {
        let mut db = db();
        db.insert_named("a", Shape::new(vec![1]), DType::Float32, vec![1.0])
            .unwrap();
        assert!(matches!(db.verify("a"), Err(EngineError::InvalidOp(_))));
    }

    #[test]
    fn test_mismatch_keeps_workspace_unchanged() {
        let mut db = db();
        db.insert_random("a", Shape::new(vec![2, 5]), DType::BFloat16, 0.0, 1.0, 0)
            .unwrap();
        db.insert_random("b", Shape::new(vec![3, 5]), DType::BFloat16, 0.0, 1.0, 1)
            .unwrap();
        let err = db.eval_subalpha("c", "a", "b", 1.0).unwrap_err();
        assert!(matches!(err, EngineError::ShapeMismatch(_)));
        assert!(matches!(db.get("c"), Err(EngineError::NameNotFound(_))));
        assert!(!db.check("a", "b").unwrap().is_compatible());
    }

    #[test]
    fn test_verify_uses_recorded_operands() {
        let mut db = db();
        db.insert_named("a", Shape::new(vec![2]), DType::Float32, vec![10.0, 20.0])
            .unwrap();
        db.insert_named("b", Shape::new(vec![1]), DType::Float32, vec![1.0])
            .unwrap();
        db.eval_subalpha("a", "a", "b", 1.0).unwrap();
        db.insert_named("b", Shape::new(vec![3]), DType::Float32, vec![7.0; 3])
            .unwrap();

        assert_eq!(db.get("a").unwrap().data(), &[9.0, 19.0]);
        assert_eq!(db.verify("a").unwrap(), 0.0);
    }

    #[test]
    fn test_unreachable_tensors_are_freed() {
        let mut db = db();
        db.insert_named("a", Shape::new(vec![1]), DType::Float32, vec![1.0])
            .unwrap();
        db.insert_named("b", Shape::new(vec![1]), DType::Float32, vec![2.0])
            .unwrap();
        for _ in 0..5 {
            db.eval_subalpha("c", "a", "b", 1.0).unwrap();
        }
        assert_eq!(db.store.len(), 3);

        // c keeps the first a alive; redefining c releases it
        db.insert_named("a", Shape::new(vec![1]), DType::Float32, vec![5.0])
            .unwrap();
        assert_eq!(db.store.len(), 4);
        db.insert_named("c", Shape::new(vec![1]), DType::Float32, vec![0.0])
            .unwrap();
        assert_eq!(db.store.len(), 3);
    }

    #[test]
    fn test_empty_output_with_huge_axes() {
        let mut db = db();
        db.insert_named("a", Shape::new(vec![usize::MAX, 1, 0]), DType::Float32, vec![])
            .unwrap();
        db.insert_named("b", Shape::new(vec![1, 4, 1]), DType::Float32, vec![1.0; 4])
            .unwrap();
        // [MAX, 4, 0] has 0 elements and is fine
        db.eval_subalpha("c", "a", "b", 1.0).unwrap();
        let c = db.get("c").unwrap();
        assert_eq!(c.dims(), &[usize::MAX, 4, 0]);
        assert!(c.is_empty());
        assert_eq!(db.verify("c").unwrap(), 0.0);

        let err = db
            .insert_named("x", Shape::new(vec![usize::MAX, 2]), DType::Float32, vec![])
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Store(StoreError::InvalidTensor(TensorError::TooLarge { .. }))
        ));
    }

    #[test]
    fn test_missing_name() {
        let db = db();
        assert_eq!(
            db.check("x", "y").unwrap_err(),
            EngineError::NameNotFound("x".into())
        );
    }
}
