//! Two-layer GCN node classifier.
//!
//! ```text
//! H  = ReLU(conv1(X, P))
//! H' = Dropout_p(H)            (training mode only)
//! Z  = conv2(H', P)
//! Y  = LogSoftmax(Z, axis = 1)
//! ```
//!
//! Both layers share the same fixed propagation matrix `P`. `Y` holds
//! per-node log-probabilities: `exp(Y)` sums to 1 along each row.

use crate::conv::GCNConv;
use crate::error::{Error, Result};
use candle_core::{Device, Tensor, Var, D};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use tracing::debug;

/// Whether stochastic regularization is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Dropout active.
    #[default]
    Training,
    /// Dropout bypassed; forward is deterministic.
    Evaluation,
}

/// Inverted dropout with a seeded mask generator.
///
/// Each element survives with probability `1 - p` and is rescaled by
/// `1 / (1 - p)`. The mask is a constant in the autograd graph, so the
/// backward pass zeroes and rescales exactly the same elements.
pub struct Dropout {
    drop_p: f32,
    rng: RefCell<StdRng>,
}

impl Dropout {
    pub fn new(drop_p: f32, seed: u64) -> Result<Self> {
        if !(0.0..=1.0).contains(&drop_p) {
            return Err(Error::InvalidConfig(format!(
                "dropout probability must be in [0, 1], got {drop_p}"
            )));
        }
        Ok(Self {
            drop_p,
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
        })
    }

    pub fn probability(&self) -> f32 {
        self.drop_p
    }

    pub fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        if !train || self.drop_p == 0.0 {
            return Ok(xs.clone());
        }
        if self.drop_p >= 1.0 {
            return Ok(xs.zeros_like()?);
        }

        let scale = 1.0 / (1.0 - self.drop_p);
        let mut rng = self.rng.borrow_mut();
        let mask: Vec<f32> = (0..xs.elem_count())
            .map(|_| {
                if rng.random::<f32>() < self.drop_p {
                    0.0
                } else {
                    scale
                }
            })
            .collect();
        let mask = Tensor::from_vec(mask, xs.shape(), xs.device())?.to_dtype(xs.dtype())?;
        Ok(xs.mul(&mask)?)
    }
}

/// Two-layer graph convolutional classifier.
pub struct GCN {
    conv1: GCNConv,
    conv2: GCNConv,
    dropout: Dropout,
    mode: Mode,
}

impl GCN {
    /// Create a model `n_features -> n_hidden -> n_classes`.
    ///
    /// `seed` drives parameter initialization and the dropout masks.
    pub fn new(
        n_features: usize,
        n_hidden: usize,
        n_classes: usize,
        dropout: f32,
        seed: u64,
        device: &Device,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let conv1 = GCNConv::new(n_features, n_hidden, true, &mut rng, device)?;
        let conv2 = GCNConv::new(n_hidden, n_classes, true, &mut rng, device)?;
        let dropout = Dropout::new(dropout, rng.random())?;

        debug!(
            n_features,
            n_hidden,
            n_classes,
            dropout = dropout.probability(),
            "built GCN"
        );

        Ok(Self {
            conv1,
            conv2,
            dropout,
            mode: Mode::Training,
        })
    }

    /// Switch to training mode (dropout active).
    pub fn train(&mut self) {
        self.mode = Mode::Training;
    }

    /// Switch to evaluation mode (dropout bypassed).
    pub fn eval(&mut self) {
        self.mode = Mode::Evaluation;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Forward pass in the current [`Mode`].
    pub fn forward(&self, x: &Tensor, adj: &Tensor) -> Result<Tensor> {
        self.forward_t(x, adj, self.mode == Mode::Training)
    }

    /// Forward pass with an explicit training flag.
    ///
    /// # Arguments
    /// - `x`: Node features (N x n_features)
    /// - `adj`: Normalized propagation matrix (N x N)
    /// - `train`: Whether dropout is applied
    ///
    /// # Returns
    /// - Log-probabilities (N x n_classes)
    pub fn forward_t(&self, x: &Tensor, adj: &Tensor, train: bool) -> Result<Tensor> {
        let h = self.conv1.forward(x, adj)?.relu()?;
        let h = self.dropout.forward_t(&h, train)?;
        let z = self.conv2.forward(&h, adj)?;
        Ok(candle_nn::ops::log_softmax(&z, D::Minus1)?)
    }

    /// All trainable parameters: conv1 (W, b), then conv2 (W, b).
    pub fn vars(&self) -> Vec<Var> {
        let mut vars = self.conv1.vars();
        vars.extend(self.conv2.vars());
        vars
    }

    pub fn layers(&self) -> (&GCNConv, &GCNConv) {
        (&self.conv1, &self.conv2)
    }

    pub fn num_classes(&self) -> usize {
        self.conv2.out_features()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::normalize::{identity_features, propagation_matrix};

    fn ring(n: usize) -> (Tensor, Tensor) {
        let edges: Vec<(usize, usize)> = (0..n).map(|i| (i, (i + 1) % n)).collect();
        let g = Graph::from_edges(n, &edges).unwrap();
        let p = propagation_matrix(&g, &Device::Cpu).unwrap();
        let x = identity_features(n, &Device::Cpu).unwrap();
        (x, p)
    }

    fn assert_rows_are_distributions(y: &Tensor) {
        let probs: Vec<f32> = y.exp().unwrap().sum(1).unwrap().to_vec1().unwrap();
        for s in probs {
            assert!((s - 1.0).abs() < 1e-5, "row sums to {s}");
        }
    }

    #[test]
    fn test_output_is_log_distribution_in_both_modes() {
        let (x, p) = ring(8);
        let mut model = GCN::new(8, 4, 3, 0.5, 7, &Device::Cpu).unwrap();

        let y = model.forward(&x, &p).unwrap();
        assert_eq!(y.dims(), &[8, 3]);
        assert_rows_are_distributions(&y);

        model.eval();
        let y = model.forward(&x, &p).unwrap();
        assert_rows_are_distributions(&y);
    }

    #[test]
    fn test_large_logits_stay_finite() {
        let (x, p) = ring(6);
        let mut model = GCN::new(6, 4, 2, 0.0, 5, &Device::Cpu).unwrap();
        model.eval();
        let vars = model.vars();

        // Constant logits [1000, -1000]: exp(1000) overflows f32.
        vars[2].set(&vars[2].zeros_like().unwrap()).unwrap();
        vars[3]
            .set(&Tensor::new(&[1000f32, -1000.0], &Device::Cpu).unwrap())
            .unwrap();
        let y: Vec<Vec<f32>> = model.forward(&x, &p).unwrap().to_vec2().unwrap();
        for row in &y {
            assert!(row[0].abs() < 1e-5, "{row:?}");
            assert!((row[1] + 2000.0).abs() < 1e-2, "{row:?}");
        }

        // Every parameter scaled by 1e4.
        let mut model = GCN::new(6, 4, 2, 0.0, 5, &Device::Cpu).unwrap();
        model.eval();
        for var in model.vars() {
            let scaled = (var.as_tensor() * 1e4).unwrap();
            var.set(&scaled).unwrap();
        }
        let y = model.forward(&x, &p).unwrap();
        let values: Vec<f32> = y.flatten_all().unwrap().to_vec1().unwrap();
        assert!(values.iter().all(|v| v.is_finite()), "{values:?}");
        assert_rows_are_distributions(&y);
    }

    #[test]
    fn test_eval_mode_is_deterministic() {
        let (x, p) = ring(6);
        let mut model = GCN::new(6, 4, 2, 0.9, 3, &Device::Cpu).unwrap();
        model.eval();
        assert_eq!(model.mode(), Mode::Evaluation);

        let a: Vec<Vec<f32>> = model.forward(&x, &p).unwrap().to_vec2().unwrap();
        let b: Vec<Vec<f32>> = model.forward(&x, &p).unwrap().to_vec2().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_dropout_zero_is_identity() {
        let dropout = Dropout::new(0.0, 1).unwrap();
        let xs = Tensor::new(&[[1f32, -2.0], [3.0, 4.0]], &Device::Cpu).unwrap();
        let out: Vec<Vec<f32>> = dropout.forward_t(&xs, true).unwrap().to_vec2().unwrap();
        assert_eq!(out, vec![vec![1.0, -2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn test_dropout_one_zeroes_everything() {
        let dropout = Dropout::new(1.0, 1).unwrap();
        let xs = Tensor::new(&[[1f32, 2.0], [3.0, 4.0]], &Device::Cpu).unwrap();
        let out: Vec<f32> = dropout
            .forward_t(&xs, true)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1()
            .unwrap();
        assert!(out.iter().all(|&v| v == 0.0));

        // Bypassed outside training.
        let out: Vec<Vec<f32>> = dropout.forward_t(&xs, false).unwrap().to_vec2().unwrap();
        assert_eq!(out, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn test_dropout_rescales_survivors() {
        let dropout = Dropout::new(0.5, 9).unwrap();
        let xs = Tensor::ones((20, 20), candle_core::DType::F32, &Device::Cpu).unwrap();
        let out: Vec<f32> = dropout
            .forward_t(&xs, true)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1()
            .unwrap();
        assert!(out.iter().all(|&v| v == 0.0 || (v - 2.0).abs() < 1e-6));
        let kept = out.iter().filter(|&&v| v != 0.0).count();
        assert!(kept > 100 && kept < 300, "kept {kept} of 400");
    }

    #[test]
    fn test_invalid_dropout_rejected() {
        assert!(Dropout::new(1.5, 0).is_err());
        assert!(Dropout::new(-0.1, 0).is_err());
        assert!(GCN::new(4, 2, 2, 2.0, 0, &Device::Cpu).is_err());
    }

    #[test]
    fn test_vars_cover_both_layers() {
        let model = GCN::new(5, 4, 2, 0.3, 0, &Device::Cpu).unwrap();
        let dims: Vec<Vec<usize>> = model.vars().iter().map(|v| v.dims().to_vec()).collect();
        assert_eq!(dims, vec![vec![5, 4], vec![4], vec![4, 2], vec![2]]);
        assert_eq!(model.num_classes(), 2);
    }
}
