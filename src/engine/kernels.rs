// src/engine/kernels.rs

use rayon::prelude::*;

use crate::core::broadcast::{BroadcastPlan, ShapeMismatchError};
use crate::core::config::{KernelBackend, KernelConfig};
use crate::core::dtype::DType;
use crate::core::tensor::{Tensor, TensorId};

use super::operations::BinaryOp;

/// Evalúa `op` elemento a elemento sobre el shape de broadcast de `a` y `b`.
///
/// El tensor resultante usa el dtype de `a`. Si los shapes no son compatibles
/// se devuelve el error antes de reservar o calcular nada.
pub fn eval_binary(
    a: &Tensor,
    b: &Tensor,
    op: BinaryOp,
    new_id: TensorId,
    config: &KernelConfig,
) -> Result<Tensor, ShapeMismatchError> {
    let plan = BroadcastPlan::new(a.shape(), b.shape())?;
    let dtype = a.dtype();
    let op = op.for_dtype(dtype);
    let len = plan.out_shape.num_elements();
    let backend = select_backend(config, len);

    log::debug!(
        "{} {} x {} -> {} (broadcast {}, {:?}, {})",
        op,
        a.shape(),
        b.shape(),
        plan.out_shape,
        plan.kind,
        backend,
        dtype
    );

    let mut out = vec![0.0f32; len];
    match backend {
        KernelBackend::Scalar => {
            fill_range(&plan, a.data(), b.data(), &mut out, 0, op, dtype);
        }
        KernelBackend::Parallel => {
            let chunk = config.min_chunk.max(1);
            out.par_chunks_mut(chunk)
                .enumerate()
                .for_each(|(i, dst)| {
                    fill_range(&plan, a.data(), b.data(), dst, i * chunk, op, dtype);
                });
        }
    }

    Ok(Tensor::from_parts(new_id, plan.out_shape, dtype, out))
}

/// a - alpha * b con broadcasting, backend escalar
pub fn subalpha(
    a: &Tensor,
    b: &Tensor,
    alpha: f32,
    new_id: TensorId,
) -> Result<Tensor, ShapeMismatchError> {
    eval_binary(a, b, BinaryOp::SubAlpha(alpha), new_id, &KernelConfig::default())
}

/// a - alpha * b con broadcasting y configuración explícita del kernel
pub fn subalpha_with(
    a: &Tensor,
    b: &Tensor,
    alpha: f32,
    new_id: TensorId,
    config: &KernelConfig,
) -> Result<Tensor, ShapeMismatchError> {
    eval_binary(a, b, BinaryOp::SubAlpha(alpha), new_id, config)
}

fn select_backend(config: &KernelConfig, len: usize) -> KernelBackend {
    match config.backend {
        KernelBackend::Parallel if len >= config.parallel_threshold => KernelBackend::Parallel,
        _ => KernelBackend::Scalar,
    }
}

/// Fill `dst` with output elements `start..start + dst.len()`.
fn fill_range(
    plan: &BroadcastPlan,
    lhs: &[f32],
    rhs: &[f32],
    dst: &mut [f32],
    start: usize,
    op: BinaryOp,
    dtype: DType,
) {
    if dst.is_empty() {
        return;
    }

    if plan.is_identity() {
        let lhs = &lhs[start..start + dst.len()];
        let rhs = &rhs[start..start + dst.len()];
        for ((o, &x), &y) in dst.iter_mut().zip(lhs).zip(rhs) {
            *o = dtype.quantize(op.apply(x, y));
        }
        return;
    }

    let dims = &plan.out_shape.dims;
    let rank = dims.len();

    // unravel the first flat index, then advance like an odometer
    let mut index = vec![0usize; rank];
    let mut rem = start;
    for axis in (0..rank).rev() {
        index[axis] = rem % dims[axis];
        rem /= dims[axis];
    }
    let (mut off_a, mut off_b) = plan.source_offsets(&index);

    for o in dst.iter_mut() {
        *o = dtype.quantize(op.apply(lhs[off_a], rhs[off_b]));

        for axis in (0..rank).rev() {
            index[axis] += 1;
            off_a += plan.lhs_strides[axis];
            off_b += plan.rhs_strides[axis];
            if index[axis] < dims[axis] {
                break;
            }
            off_a -= plan.lhs_strides[axis] * dims[axis];
            off_b -= plan.rhs_strides[axis] * dims[axis];
            index[axis] = 0;
        }
    }
}
