//! Classification accuracy from per-node class scores.

use crate::error::{ensure_dim, Result};
use candle_core::Tensor;

/// Predicted class per row: `argmax_c scores[i][c]`.
///
/// Ties resolve to the lowest class index.
pub fn predictions(scores: &Tensor) -> Result<Vec<u32>> {
    let rows: Vec<Vec<f32>> = scores.to_dtype(candle_core::DType::F32)?.to_vec2()?;
    Ok(rows
        .iter()
        .map(|row| {
            let mut best = 0;
            for (c, &v) in row.iter().enumerate() {
                if v > row[best] {
                    best = c;
                }
            }
            best as u32
        })
        .collect())
}

/// Fraction of rows whose argmax equals the label.
///
/// An empty batch scores 0.
pub fn accuracy(scores: &Tensor, labels: &[u32]) -> Result<f32> {
    let predicted = predictions(scores)?;
    ensure_dim("accuracy labels", predicted.len(), labels.len())?;
    if labels.is_empty() {
        return Ok(0.0);
    }
    let correct = predicted
        .iter()
        .zip(labels)
        .filter(|(p, l)| p == l)
        .count();
    Ok(correct as f32 / labels.len() as f32)
}
