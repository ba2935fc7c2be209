//! Two-layer Graph Convolutional Network for node classification.
//!
//! Learns community membership from graph connectivity alone: every node's
//! input feature is a one-hot encoding of its own identity, and the only
//! structural signal comes from propagating through the adjacency.
//!
//! ## The Propagation Rule
//!
//! [Kipf & Welling 2017](https://arxiv.org/abs/1609.02907), with row
//! (random-walk) normalization of the self-looped adjacency:
//!
//! ```text
//! P = D_hat^{-1} (A + I)
//! H' = P (H W) + b
//! ```
//!
//! Each layer averages a node's transformed features with its neighbors'.
//! Stacking two layers mixes information from the 2-hop neighborhood.
//!
//! ## The Classifier
//!
//! ```text
//! Y = LogSoftmax(conv2(Dropout(ReLU(conv1(X, P))), P))
//! ```
//!
//! trained full-batch with negative log-likelihood and Adam (L2 weight
//! decay). Gradients come from candle's reverse-mode autograd.
//!
//! ## Modules
//!
//! - [`graph`]: Validated dense adjacency ([`Graph`])
//! - [`normalize`]: Self-loops and row normalization
//! - [`conv`]: Graph convolution layer ([`GCNConv`])
//! - [`model`]: Two-layer classifier ([`GCN`]) and dropout
//! - [`optim`]: Adam with coupled L2 weight decay
//! - [`training`]: Configuration, dataset bundle, training loop
//! - [`metrics`]: Argmax predictions and accuracy
//! - [`datasets`]: Zachary's karate club, two-clique benchmark
//!
//! ## Example
//!
//! ```rust,ignore
//! use lattix_gcn::{datasets, NodeDataset, Trainer, TrainingConfig};
//! use candle_core::Device;
//!
//! let (graph, labels) = datasets::karate_club()?;
//! let data = NodeDataset::from_graph(&graph, labels, &Device::Cpu)?;
//! let mut trainer = Trainer::new(TrainingConfig::default(), data.num_features(), &Device::Cpu)?;
//! let report = trainer.fit(&data)?;
//! ```

pub mod conv;
pub mod datasets;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod model;
pub mod normalize;
pub mod optim;
pub mod training;

pub use conv::GCNConv;
pub use error::{Error, Result};
pub use graph::Graph;
pub use model::{Dropout, Mode, GCN};
pub use optim::{Adam, ParamsAdam};
pub use training::{EpochStats, Evaluation, NodeDataset, Trainer, TrainingConfig, TrainingReport};
