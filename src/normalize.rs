//! Adjacency normalization: self-loops and row-stochastic propagation.
//!
//! The propagation operator used by both convolution layers is
//!
//! ```text
//! A_hat = A + I
//! P     = D_hat^{-1} A_hat        (D_hat = diag(rowsum(A_hat)))
//! ```
//!
//! This is random-walk (row) normalization, not the symmetric
//! `D^{-1/2} A D^{-1/2}` form: each row of `P` averages a node's own
//! features with its neighbors'. `P` is computed once and never trained.

use crate::error::{ensure_dim, Result};
use crate::graph::Graph;
use candle_core::{DType, Device, Tensor};

/// Row-normalize a non-negative matrix: `M'[i][j] = M[i][j] / sum_j M[i][j]`.
///
/// Rows that sum to zero map to all-zero rows instead of `inf`/`NaN`.
/// Applying it to an already row-stochastic matrix is a no-op.
pub fn row_normalize(m: &Tensor) -> Result<Tensor> {
    m.dims2()?;
    let row_sum = m.sum_keepdim(1)?;
    let nonzero = row_sum.ne(0f32)?;
    let inv = nonzero.where_cond(&row_sum.recip()?, &row_sum.zeros_like()?)?;
    Ok(m.broadcast_mul(&inv)?)
}

/// Augment a square adjacency matrix with self-loops: `A + I`.
pub fn add_self_loops(adj: &Tensor) -> Result<Tensor> {
    let (rows, cols) = adj.dims2()?;
    ensure_dim("self-loop augmentation (square adjacency)", rows, cols)?;
    let eye = Tensor::eye(rows, adj.dtype(), adj.device())?;
    Ok((adj + eye)?)
}

/// The fixed propagation matrix `P = rownorm(A + I)` of a graph.
pub fn propagation_matrix(graph: &Graph, device: &Device) -> Result<Tensor> {
    let adj = graph.to_tensor(device)?;
    row_normalize(&add_self_loops(&adj)?)
}

/// One-hot identity features `X = rownorm(I_n)`, one row per node.
pub fn identity_features(n: usize, device: &Device) -> Result<Tensor> {
    row_normalize(&Tensor::eye(n, DType::F32, device)?)
}
