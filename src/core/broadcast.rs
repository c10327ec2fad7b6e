// src/core/broadcast.rs
//
// NumPy-style broadcasting: shapes are right-aligned, missing leading axes
// count as 1, and a pair of axis lengths is compatible when they are equal or
// one of them is 1.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use super::tensor::Shape;

/// Two shapes disagree on an axis where neither length is 1.
///
/// `axis` counts from the left of the right-aligned (output-rank) shapes.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error(
    "Broadcasting rule violation on axis {axis}: {lhs} vs {rhs} (shapes {lhs_shape} and {rhs_shape})"
)]
pub struct ShapeMismatchError {
    pub axis: usize,
    pub lhs: usize,
    pub rhs: usize,
    pub lhs_shape: Shape,
    pub rhs_shape: Shape,
}

/// Result of a compatibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BroadcastResult {
    Compatible(Shape),
    Incompatible(ShapeMismatchError),
}

impl BroadcastResult {
    pub fn is_compatible(&self) -> bool {
        matches!(self, BroadcastResult::Compatible(_))
    }

    pub fn into_result(self) -> Result<Shape, ShapeMismatchError> {
        match self {
            BroadcastResult::Compatible(shape) => Ok(shape),
            BroadcastResult::Incompatible(err) => Err(err),
        }
    }
}

/// Decide whether `a` and `b` broadcast together and compute the output shape.
///
/// Axes are walked from the trailing one to the leading one and the walk stops
/// at the first conflict.
pub fn check_compatible(a: &Shape, b: &Shape) -> BroadcastResult {
    let rank = a.rank().max(b.rank());
    let la = a.aligned_to(rank);
    let lb = b.aligned_to(rank);

    let mut out = vec![0; rank];
    for axis in (0..rank).rev() {
        let (da, db) = (la.dims[axis], lb.dims[axis]);
        if da == db || da == 1 || db == 1 {
            // a zero-length axis wins over 1, otherwise this is max(da, db)
            out[axis] = if da == 1 { db } else { da };
        } else {
            return BroadcastResult::Incompatible(ShapeMismatchError {
                axis,
                lhs: da,
                rhs: db,
                lhs_shape: a.clone(),
                rhs_shape: b.clone(),
            });
        }
    }

    BroadcastResult::Compatible(Shape::new(out))
}

/// How the two trailing axes broadcast. Leading axes may broadcast under any kind.
///
/// "Row" means the second-to-last axis is 1 on that side while the other side
/// is larger, "Col" the last axis, "Scalar" both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BroadcastKind {
    None,
    ScalarA,
    ScalarB,
    RowA,
    RowB,
    ColA,
    ColB,
    RowAColB,
    RowBColA,
}

impl fmt::Display for BroadcastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BroadcastKind::None => "none",
            BroadcastKind::ScalarA => "scalar_a",
            BroadcastKind::ScalarB => "scalar_b",
            BroadcastKind::RowA => "row_a",
            BroadcastKind::RowB => "row_b",
            BroadcastKind::ColA => "col_a",
            BroadcastKind::ColB => "col_b",
            BroadcastKind::RowAColB => "row_a_col_b",
            BroadcastKind::RowBColA => "row_b_col_a",
        };
        f.write_str(s)
    }
}

/// Classify the trailing-axis broadcast between two compatible shapes.
pub fn classify(a: &Shape, b: &Shape) -> Result<BroadcastKind, ShapeMismatchError> {
    check_compatible(a, b).into_result()?;

    let rank = a.rank().max(b.rank()).max(2);
    let la = a.aligned_to(rank);
    let lb = b.aligned_to(rank);
    let (a_h, a_w) = (la.dims[rank - 2], la.dims[rank - 1]);
    let (b_h, b_w) = (lb.dims[rank - 2], lb.dims[rank - 1]);

    let kind = if a_h == b_h && a_w == b_w {
        BroadcastKind::None
    } else if a_h == 1 && a_w == 1 {
        BroadcastKind::ScalarA
    } else if b_h == 1 && b_w == 1 {
        BroadcastKind::ScalarB
    } else if a_h == 1 && b_h > 1 {
        if b_w == 1 && a_w > 1 {
            BroadcastKind::RowAColB
        } else {
            BroadcastKind::RowA
        }
    } else if b_h == 1 && a_h > 1 {
        if a_w == 1 && b_w > 1 {
            BroadcastKind::RowBColA
        } else {
            BroadcastKind::RowB
        }
    } else if a_w == 1 {
        BroadcastKind::ColA
    } else {
        BroadcastKind::ColB
    };

    Ok(kind)
}

/// Everything a kernel needs to walk the output and find both source elements.
///
/// Strides are aligned to the output rank; broadcast axes (and padded leading
/// axes) get stride 0 so every index along them reads element 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastPlan {
    pub out_shape: Shape,
    pub lhs_strides: Vec<usize>,
    pub rhs_strides: Vec<usize>,
    pub kind: BroadcastKind,
}

impl BroadcastPlan {
    pub fn new(a: &Shape, b: &Shape) -> Result<Self, ShapeMismatchError> {
        let out_shape = check_compatible(a, b).into_result()?;
        let kind = classify(a, b)?;
        let lhs_strides = broadcast_strides(a, &out_shape);
        let rhs_strides = broadcast_strides(b, &out_shape);
        Ok(Self {
            out_shape,
            lhs_strides,
            rhs_strides,
            kind,
        })
    }

    /// True when no axis broadcasts on either side
    pub fn is_identity(&self) -> bool {
        let contiguous = self.out_shape.strides();
        self.lhs_strides == contiguous && self.rhs_strides == contiguous
    }

    /// Flat source offsets of the output element at `index`
    #[inline]
    pub fn source_offsets(&self, index: &[usize]) -> (usize, usize) {
        let mut lhs = 0;
        let mut rhs = 0;
        for ((&i, &sa), &sb) in index
            .iter()
            .zip(self.lhs_strides.iter())
            .zip(self.rhs_strides.iter())
        {
            lhs += i * sa;
            rhs += i * sb;
        }
        (lhs, rhs)
    }
}

/// Strides of `shape` viewed through the broadcast output shape `target`.
fn broadcast_strides(shape: &Shape, target: &Shape) -> Vec<usize> {
    let aligned = shape.aligned_to(target.rank());
    let natural = aligned.strides();
    aligned
        .dims
        .iter()
        .zip(target.dims.iter())
        .zip(natural)
        .map(|((&d, &t), s)| if d == 1 && t != 1 { 0 } else { s })
        .collect()
}
