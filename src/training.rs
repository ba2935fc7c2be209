//! Full-batch training loop for node classification.
//!
//! Every epoch runs one forward/backward/update cycle over the whole graph:
//!
//! 1. Switch the model to training mode (dropout active)
//! 2. `Y = model(X, P)` (log-probabilities)
//! 3. `loss = -mean_i Y[i][label_i]` (negative log-likelihood)
//! 4. Reverse-mode gradients of `loss` w.r.t. every layer parameter
//! 5. One Adam step with L2 weight decay
//! 6. Log `{epoch, loss, accuracy}`
//!
//! There is no early stopping and no validation split: the loop runs
//! exactly `epoch_count` times.
//!
//! # Example
//!
//! ```rust,ignore
//! use lattix_gcn::datasets::karate_club;
//! use lattix_gcn::training::{NodeDataset, Trainer, TrainingConfig};
//! use candle_core::Device;
//!
//! let (graph, labels) = karate_club()?;
//! let data = NodeDataset::from_graph(&graph, labels, &Device::Cpu)?;
//!
//! let config = TrainingConfig::default()
//!     .with_hidden(4)
//!     .with_learning_rate(0.05)
//!     .with_epochs(15);
//!
//! let mut trainer = Trainer::new(config, data.num_features(), &Device::Cpu)?;
//! let report = trainer.fit(&data)?;
//! println!("eval accuracy: {:.4}", report.evaluation.accuracy);
//! ```

use crate::error::{ensure_dim, Error, Result};
use crate::graph::Graph;
use crate::metrics;
use crate::model::GCN;
use crate::normalize::{identity_features, propagation_matrix};
use crate::optim::{Adam, ParamsAdam};
use candle_core::{DType, Device, Tensor};
use candle_nn::Optimizer;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Training configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingConfig {
    /// Hidden layer width (default: 4).
    pub n_hidden: usize,
    /// Number of output classes (default: 2).
    pub n_classes: usize,
    /// Dropout probability on the hidden layer (default: 0.3).
    pub dropout_probability: f32,
    /// Adam learning rate (default: 0.05).
    pub learning_rate: f64,
    /// L2 weight decay coefficient (default: 0.01).
    pub weight_decay: f64,
    /// Number of training epochs (default: 15).
    pub epoch_count: usize,
    /// Seed for parameter initialization and dropout masks (default: 42).
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_hidden: 4,
            n_classes: 2,
            dropout_probability: 0.3,
            learning_rate: 0.05,
            weight_decay: 0.01,
            epoch_count: 15,
            seed: 42,
        }
    }
}

impl TrainingConfig {
    pub fn with_hidden(mut self, n_hidden: usize) -> Self {
        self.n_hidden = n_hidden;
        self
    }

    pub fn with_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = n_classes;
        self
    }

    pub fn with_dropout(mut self, dropout: f32) -> Self {
        self.dropout_probability = dropout;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_weight_decay(mut self, weight_decay: f64) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epoch_count = epochs;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reject configurations the training loop cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.n_hidden == 0 {
            return Err(Error::InvalidConfig("n_hidden must be positive".into()));
        }
        if self.n_classes == 0 {
            return Err(Error::InvalidConfig("n_classes must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.dropout_probability) {
            return Err(Error::InvalidConfig(format!(
                "dropout_probability must be in [0, 1], got {}",
                self.dropout_probability
            )));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.weight_decay.is_finite() && self.weight_decay >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "weight_decay must be non-negative, got {}",
                self.weight_decay
            )));
        }
        if self.epoch_count == 0 {
            return Err(Error::InvalidConfig("epoch_count must be positive".into()));
        }
        Ok(())
    }
}

/// Fixed inputs of a node-classification run.
///
/// Built once before training and never mutated.
#[derive(Debug, Clone)]
pub struct NodeDataset {
    features: Tensor,
    propagation: Tensor,
    labels: Tensor,
    label_ids: Vec<u32>,
}

impl NodeDataset {
    /// Bundle features `(N, F)`, propagation matrix `(N, N)` and `N` labels.
    pub fn new(features: Tensor, propagation: Tensor, labels: Vec<u32>) -> Result<Self> {
        let (n, _) = features.dims2()?;
        let (rows, cols) = propagation.dims2()?;
        ensure_dim("propagation matrix rows", n, rows)?;
        ensure_dim("propagation matrix columns", n, cols)?;
        ensure_dim("labels", n, labels.len())?;

        let label_tensor = Tensor::from_vec(labels.clone(), n, features.device())?;
        Ok(Self {
            features,
            propagation,
            labels: label_tensor,
            label_ids: labels,
        })
    }

    /// Identity features and `rownorm(A + I)` propagation for `graph`.
    pub fn from_graph(graph: &Graph, labels: Vec<u32>, device: &Device) -> Result<Self> {
        let features = identity_features(graph.num_nodes(), device)?;
        let propagation = propagation_matrix(graph, device)?;
        Self::new(features, propagation, labels)
    }

    pub fn features(&self) -> &Tensor {
        &self.features
    }

    pub fn propagation(&self) -> &Tensor {
        &self.propagation
    }

    /// Labels as a `u32` tensor of shape `(N,)`.
    pub fn labels(&self) -> &Tensor {
        &self.labels
    }

    pub fn label_ids(&self) -> &[u32] {
        &self.label_ids
    }

    pub fn num_nodes(&self) -> usize {
        self.label_ids.len()
    }

    pub fn num_features(&self) -> usize {
        self.features.dims().get(1).copied().unwrap_or(0)
    }
}

/// Metrics of one training epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    /// 1-indexed epoch number.
    pub epoch: usize,
    pub loss: f32,
    pub accuracy: f32,
}

impl fmt::Display for EpochStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Epoch: {:04} loss_train: {:.4} acc_train: {:.4}",
            self.epoch, self.loss, self.accuracy
        )
    }
}

/// Deterministic (dropout-free) evaluation of the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub loss: f32,
    pub accuracy: f32,
    /// Predicted class per node.
    pub predictions: Vec<u32>,
}

/// Training results.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    /// Per-epoch training metrics, in order.
    pub history: Vec<EpochStats>,
    /// Evaluation-mode metrics after the last epoch.
    pub evaluation: Evaluation,
}

impl TrainingReport {
    /// Training loss per epoch.
    pub fn losses(&self) -> Vec<f32> {
        self.history.iter().map(|s| s.loss).collect()
    }

    /// Training accuracy of the last epoch.
    pub fn final_accuracy(&self) -> f32 {
        self.history.last().map_or(0.0, |s| s.accuracy)
    }
}

/// Owns the model and its optimizer for one training run.
pub struct Trainer {
    config: TrainingConfig,
    model: GCN,
    optimizer: Adam,
}

impl Trainer {
    pub fn new(config: TrainingConfig, n_features: usize, device: &Device) -> Result<Self> {
        config.validate()?;
        let model = GCN::new(
            n_features,
            config.n_hidden,
            config.n_classes,
            config.dropout_probability,
            config.seed,
            device,
        )?;
        let optimizer = Adam::new(
            model.vars(),
            ParamsAdam {
                lr: config.learning_rate,
                weight_decay: config.weight_decay,
                ..Default::default()
            },
        )?;
        debug!(
            lr = config.learning_rate,
            weight_decay = config.weight_decay,
            epochs = config.epoch_count,
            "built trainer"
        );
        Ok(Self {
            config,
            model,
            optimizer,
        })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn model(&self) -> &GCN {
        &self.model
    }

    /// Run `config.epoch_count` epochs, then evaluate.
    pub fn fit(&mut self, data: &NodeDataset) -> Result<TrainingReport> {
        let mut history = Vec::with_capacity(self.config.epoch_count);
        for epoch in 1..=self.config.epoch_count {
            history.push(self.train_epoch(epoch, data)?);
        }
        let evaluation = self.evaluate(data)?;
        Ok(TrainingReport {
            history,
            evaluation,
        })
    }

    /// One forward/backward/update cycle. `epoch` is 1-indexed.
    pub fn train_epoch(&mut self, epoch: usize, data: &NodeDataset) -> Result<EpochStats> {
        self.check_dataset(data)?;
        self.model.train();

        let output = self.model.forward(data.features(), data.propagation())?;
        let loss = candle_nn::loss::nll(&output, data.labels())?;
        // Each backward pass yields a fresh GradStore, so gradients start from zero.
        self.optimizer.backward_step(&loss)?;

        let stats = EpochStats {
            epoch,
            loss: loss.to_dtype(DType::F32)?.to_scalar::<f32>()?,
            accuracy: metrics::accuracy(&output, data.label_ids())?,
        };
        info!(
            epoch = stats.epoch,
            loss = stats.loss,
            accuracy = stats.accuracy,
            "{stats}"
        );
        Ok(stats)
    }

    /// Evaluation-mode loss, accuracy and predictions.
    pub fn evaluate(&mut self, data: &NodeDataset) -> Result<Evaluation> {
        self.check_dataset(data)?;
        self.model.eval();

        let output = self.model.forward(data.features(), data.propagation())?;
        let loss = candle_nn::loss::nll(&output, data.labels())?
            .to_dtype(DType::F32)?
            .to_scalar::<f32>()?;
        let predictions = metrics::predictions(&output)?;
        let accuracy = metrics::accuracy(&output, data.label_ids())?;
        debug!(loss, accuracy, "evaluation");

        Ok(Evaluation {
            loss,
            accuracy,
            predictions,
        })
    }

    fn check_dataset(&self, data: &NodeDataset) -> Result<()> {
        let (conv1, _) = self.model.layers();
        ensure_dim("dataset features", conv1.in_features(), data.num_features())?;
        let n_classes = self.config.n_classes as u32;
        if let Some(&bad) = data.label_ids().iter().find(|&&l| l >= n_classes) {
            return Err(Error::InvalidConfig(format!(
                "label {bad} out of range for {n_classes} classes"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::two_cliques;

    fn small_data() -> NodeDataset {
        let (graph, labels) = two_cliques(5).unwrap();
        NodeDataset::from_graph(&graph, labels, &Device::Cpu).unwrap()
    }

    #[test]
    fn test_epoch_line_format() {
        let stats = EpochStats {
            epoch: 7,
            loss: 0.693147,
            accuracy: 0.5,
        };
        assert_eq!(
            stats.to_string(),
            "Epoch: 0007 loss_train: 0.6931 acc_train: 0.5000"
        );
    }

    #[test]
    fn test_config_validation() {
        assert!(TrainingConfig::default().validate().is_ok());
        assert!(TrainingConfig::default().with_hidden(0).validate().is_err());
        assert!(TrainingConfig::default().with_classes(0).validate().is_err());
        assert!(TrainingConfig::default().with_dropout(1.2).validate().is_err());
        assert!(TrainingConfig::default()
            .with_learning_rate(0.0)
            .validate()
            .is_err());
        assert!(TrainingConfig::default()
            .with_weight_decay(-0.1)
            .validate()
            .is_err());
        assert!(TrainingConfig::default().with_epochs(0).validate().is_err());
    }

    #[test]
    fn test_fit_runs_exactly_configured_epochs() {
        let data = small_data();
        let config = TrainingConfig::default().with_epochs(4).with_seed(1);
        let mut trainer = Trainer::new(config, data.num_features(), &Device::Cpu).unwrap();
        let report = trainer.fit(&data).unwrap();

        let epochs: Vec<usize> = report.history.iter().map(|s| s.epoch).collect();
        assert_eq!(epochs, vec![1, 2, 3, 4]);
        assert!(report.losses().iter().all(|l| l.is_finite() && *l > 0.0));
        assert_eq!(report.evaluation.predictions.len(), 10);
        assert!((0.0..=1.0).contains(&report.final_accuracy()));
    }

    #[test]
    fn test_epoch_updates_parameters() {
        let data = small_data();
        let mut trainer =
            Trainer::new(TrainingConfig::default(), data.num_features(), &Device::Cpu).unwrap();
        let before: Vec<Vec<f32>> = trainer.model().vars()[0].to_vec2().unwrap();
        trainer.train_epoch(1, &data).unwrap();
        let after: Vec<Vec<f32>> = trainer.model().vars()[0].to_vec2().unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_same_seed_same_run() {
        let data = small_data();
        let run = || {
            let config = TrainingConfig::default().with_epochs(3).with_seed(11);
            let mut trainer = Trainer::new(config, data.num_features(), &Device::Cpu).unwrap();
            trainer.fit(&data).unwrap().losses()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_rejects_out_of_range_labels() {
        let (graph, _) = two_cliques(3).unwrap();
        let data = NodeDataset::from_graph(&graph, vec![0, 1, 2, 0, 1, 2], &Device::Cpu).unwrap();
        let mut trainer =
            Trainer::new(TrainingConfig::default(), data.num_features(), &Device::Cpu).unwrap();
        assert!(matches!(
            trainer.train_epoch(1, &data),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_dataset_shape_checks() {
        let (graph, _) = two_cliques(3).unwrap();
        assert!(matches!(
            NodeDataset::from_graph(&graph, vec![0, 1], &Device::Cpu),
            Err(Error::DimensionMismatch { .. })
        ));

        let data = small_data();
        let mut trainer = Trainer::new(TrainingConfig::default(), 4, &Device::Cpu).unwrap();
        assert!(matches!(
            trainer.evaluate(&data),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}
