//! Graph convolution layer.
//!
//! Implements the propagation rule of a single GCN layer:
//!
//! ```text
//! H' = P (H W) + b
//! ```
//!
//! Where:
//! - P is the fixed, row-normalized adjacency with self-loops (N x N)
//! - H is the node feature matrix (N x in_features)
//! - W is the learnable weight matrix (in_features x out_features)
//! - b is an optional learnable bias, broadcast over rows
//!
//! `H W` is formed first so the only product involving `P` is against an
//! `N x out_features` operand.
//!
//! # Reference
//!
//! Kipf & Welling, "Semi-Supervised Classification with Graph Convolutional
//! Networks", ICLR 2017.

use crate::error::{ensure_dim, Error, Result};
use candle_core::{Device, Tensor, Var};
use rand::Rng;
use rand_distr::{Distribution, Uniform};

/// Graph Convolutional Network layer with owned parameters.
pub struct GCNConv {
    weight: Var,
    bias: Option<Var>,
    in_features: usize,
    out_features: usize,
}

impl GCNConv {
    /// Create a new GCN layer.
    ///
    /// `W` and `b` are drawn independently from
    /// `U(-1/sqrt(out_features), 1/sqrt(out_features))`. The bound is
    /// scaled by the output width.
    ///
    /// # Arguments
    /// - `in_features`: Input feature dimension
    /// - `out_features`: Output feature dimension
    /// - `bias`: Whether to include bias term
    /// - `rng`: Source of the initial parameter values
    /// - `device`: Device the parameters live on
    pub fn new<R: Rng + ?Sized>(
        in_features: usize,
        out_features: usize,
        bias: bool,
        rng: &mut R,
        device: &Device,
    ) -> Result<Self> {
        if in_features == 0 || out_features == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer widths must be positive, got {in_features} -> {out_features}"
            )));
        }

        let stdv = 1.0 / (out_features as f32).sqrt();
        let dist = Uniform::new_inclusive(-stdv, stdv)
            .map_err(|e| Error::InvalidConfig(format!("weight init range: {e}")))?;

        let w: Vec<f32> = (0..in_features * out_features)
            .map(|_| dist.sample(rng))
            .collect();
        let weight = Var::from_vec(w, (in_features, out_features), device)?;

        let bias = if bias {
            let b: Vec<f32> = (0..out_features).map(|_| dist.sample(rng)).collect();
            Some(Var::from_vec(b, out_features, device)?)
        } else {
            None
        };

        Ok(Self {
            weight,
            bias,
            in_features,
            out_features,
        })
    }

    /// Forward pass.
    ///
    /// # Arguments
    /// - `x`: Node features (N x in_features)
    /// - `adj`: Normalized propagation matrix (N x N), including self-loops
    ///
    /// # Returns
    /// - Node embeddings (N x out_features)
    pub fn forward(&self, x: &Tensor, adj: &Tensor) -> Result<Tensor> {
        let (n, features) = x.dims2()?;
        ensure_dim("layer input width", self.in_features, features)?;
        let (rows, cols) = adj.dims2()?;
        ensure_dim("propagation matrix columns", n, cols)?;
        ensure_dim("propagation matrix rows", n, rows)?;

        // Linear transform: X * W
        let support = x.matmul(self.weight.as_tensor())?;
        // Neighborhood aggregation: P * (X W)
        let out = adj.matmul(&support)?;

        match &self.bias {
            Some(b) => Ok(out.broadcast_add(b.as_tensor())?),
            None => Ok(out),
        }
    }

    /// Trainable parameters, weight first.
    pub fn vars(&self) -> Vec<Var> {
        let mut vars = vec![self.weight.clone()];
        vars.extend(self.bias.iter().cloned());
        vars
    }

    pub fn weight(&self) -> &Var {
        &self.weight
    }

    pub fn bias(&self) -> Option<&Var> {
        self.bias.as_ref()
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }
}
