// src/engine/golden.rs
//
// Reference implementations used for acceptance checks. They work on plain
// host arrays in f64 and share no code with the kernels.

use crate::core::tensor::Tensor;

use super::operations::BinaryOp;

/// Host-side array in double precision.
#[derive(Debug, Clone, PartialEq)]
pub struct HostArray {
    pub dims: Vec<usize>,
    pub data: Vec<f64>,
}

impl HostArray {
    pub fn from_tensor(t: &Tensor) -> Self {
        Self {
            dims: t.dims().to_vec(),
            data: t.data().iter().map(|&v| v as f64).collect(),
        }
    }
}

/// Reference function: `(a, b, scalar) -> output`, `None` when the shapes
/// cannot broadcast.
pub type GoldenFn = fn(&HostArray, &HostArray, f64) -> Option<HostArray>;

/// Reference implementation for each operation
pub fn golden_function(op: BinaryOp) -> GoldenFn {
    match op {
        BinaryOp::SubAlpha(_) => golden_subalpha,
        BinaryOp::Subtract => golden_subtract,
        BinaryOp::Add => golden_add,
        BinaryOp::Multiply => golden_multiply,
    }
}

/// Run the reference for `op` on two tensors. The scalar comes from the op.
pub fn golden(op: BinaryOp, a: &Tensor, b: &Tensor) -> Option<HostArray> {
    let scalar = match op {
        BinaryOp::SubAlpha(alpha) => alpha as f64,
        _ => 0.0,
    };
    golden_function(op)(&HostArray::from_tensor(a), &HostArray::from_tensor(b), scalar)
}

/// Largest absolute difference between a result and its reference.
/// `None` when the shapes differ.
pub fn max_abs_error(result: &Tensor, reference: &HostArray) -> Option<f64> {
    if result.dims() != reference.dims.as_slice() {
        return None;
    }
    Some(
        result
            .data()
            .iter()
            .zip(reference.data.iter())
            .map(|(&x, &y)| (x as f64 - y).abs())
            .fold(0.0, f64::max),
    )
}

fn golden_subalpha(a: &HostArray, b: &HostArray, alpha: f64) -> Option<HostArray> {
    if alpha == 0.0 {
        // a broadcast to the output shape, even where b is infinite or NaN
        return zip_broadcast(a, b, |x, _| x);
    }
    zip_broadcast(a, b, |x, y| x - alpha * y)
}

fn golden_subtract(a: &HostArray, b: &HostArray, _: f64) -> Option<HostArray> {
    zip_broadcast(a, b, |x, y| x - y)
}

fn golden_add(a: &HostArray, b: &HostArray, _: f64) -> Option<HostArray> {
    zip_broadcast(a, b, |x, y| x + y)
}

fn golden_multiply(a: &HostArray, b: &HostArray, _: f64) -> Option<HostArray> {
    zip_broadcast(a, b, |x, y| x * y)
}

fn zip_broadcast(a: &HostArray, b: &HostArray, f: impl Fn(f64, f64) -> f64) -> Option<HostArray> {
    let rank = a.dims.len().max(b.dims.len());
    let pad = |dims: &[usize]| {
        let mut v = vec![1; rank - dims.len()];
        v.extend_from_slice(dims);
        v
    };
    let da = pad(&a.dims);
    let db = pad(&b.dims);

    let mut dims = Vec::with_capacity(rank);
    for (&x, &y) in da.iter().zip(db.iter()) {
        match (x, y) {
            _ if x == y => dims.push(x),
            (1, _) => dims.push(y),
            (_, 1) => dims.push(x),
            _ => return None,
        }
    }

    let total = if dims.contains(&0) {
        0
    } else {
        dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))?
    };
    let mut data = Vec::with_capacity(total);
    let mut coord = vec![0usize; rank];
    for flat in 0..total {
        let mut rem = flat;
        for axis in (0..rank).rev() {
            coord[axis] = rem % dims[axis];
            rem /= dims[axis];
        }
        let x = a.data[ravel(&coord, &da)];
        let y = b.data[ravel(&coord, &db)];
        data.push(f(x, y));
    }

    Some(HostArray { dims, data })
}

/// Row-major offset of `coord` in an array of `dims`; size-1 axes read index 0.
fn ravel(coord: &[usize], dims: &[usize]) -> usize {
    coord
        .iter()
        .zip(dims.iter())
        .fold(0, |acc, (&c, &d)| acc * d + c % d)
}
