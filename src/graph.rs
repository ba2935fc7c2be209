//! Undirected, unweighted graphs as dense adjacency matrices.
//!
//! A [`Graph`] is the input collaborator of the GCN: an `N x N` symmetric
//! 0/1 matrix with an empty diagonal. It is validated once on construction
//! and immutable afterwards; every downstream tensor (augmented adjacency,
//! propagation matrix) is derived from it.
//!
//! ```text
//! A[i][j] = A[j][i] in {0, 1}
//! A[i][i] = 0
//! ```

use crate::error::{Error, Result};
use candle_core::{Device, Tensor};
use petgraph::graph::UnGraph;
use petgraph::visit::EdgeRef;

/// Dense symmetric adjacency matrix over `num_nodes` nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    num_nodes: usize,
    /// Row-major `num_nodes x num_nodes` entries in {0, 1}.
    adjacency: Vec<f32>,
}

impl Graph {
    /// Build a graph from an undirected edge list.
    ///
    /// Duplicate edges (in either orientation) collapse to one. Self-loops
    /// and out-of-range endpoints are rejected: self-loops are added later,
    /// uniformly, by [`crate::normalize::add_self_loops`].
    pub fn from_edges(num_nodes: usize, edges: &[(usize, usize)]) -> Result<Self> {
        let mut adjacency = vec![0.0; num_nodes * num_nodes];
        for &(u, v) in edges {
            if u >= num_nodes || v >= num_nodes {
                return Err(Error::InvalidGraph(format!(
                    "edge ({u}, {v}) out of range for {num_nodes} nodes"
                )));
            }
            if u == v {
                return Err(Error::InvalidGraph(format!("self-loop on node {u}")));
            }
            adjacency[u * num_nodes + v] = 1.0;
            adjacency[v * num_nodes + u] = 1.0;
        }
        Ok(Self {
            num_nodes,
            adjacency,
        })
    }

    /// Build a graph from dense rows, validating the adjacency invariants.
    pub fn from_dense(rows: &[Vec<f32>]) -> Result<Self> {
        let n = rows.len();
        let mut adjacency = Vec::with_capacity(n * n);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(Error::InvalidGraph(format!(
                    "row {i} has {} entries, expected {n}",
                    row.len()
                )));
            }
            adjacency.extend_from_slice(row);
        }

        for i in 0..n {
            for j in 0..n {
                let a = adjacency[i * n + j];
                if a != 0.0 && a != 1.0 {
                    return Err(Error::InvalidGraph(format!(
                        "entry ({i}, {j}) = {a} is not binary"
                    )));
                }
                if a != adjacency[j * n + i] {
                    return Err(Error::InvalidGraph(format!(
                        "entry ({i}, {j}) breaks symmetry"
                    )));
                }
            }
            if adjacency[i * n + i] != 0.0 {
                return Err(Error::InvalidGraph(format!("self-loop on node {i}")));
            }
        }

        Ok(Self {
            num_nodes: n,
            adjacency,
        })
    }

    /// Build a graph from a petgraph undirected graph, ignoring weights.
    pub fn from_petgraph<N, E>(graph: &UnGraph<N, E>) -> Result<Self> {
        let edges: Vec<(usize, usize)> = graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index()))
            .collect();
        Self::from_edges(graph.node_count(), &edges)
    }

    /// Number of nodes `N`.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Number of undirected edges.
    pub fn num_edges(&self) -> usize {
        let ones = self.adjacency.iter().filter(|&&a| a != 0.0).count();
        ones / 2
    }

    /// Whether `u` and `v` are adjacent.
    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        u < self.num_nodes && v < self.num_nodes && self.adjacency[u * self.num_nodes + v] != 0.0
    }

    /// Number of neighbors of `node` (0 for out-of-range nodes).
    pub fn degree(&self, node: usize) -> usize {
        if node >= self.num_nodes {
            return 0;
        }
        let start = node * self.num_nodes;
        self.adjacency[start..start + self.num_nodes]
            .iter()
            .filter(|&&a| a != 0.0)
            .count()
    }

    /// Row-major view of the adjacency entries.
    pub fn as_slice(&self) -> &[f32] {
        &self.adjacency
    }

    /// The adjacency matrix `A` as an `(N, N)` f32 tensor.
    pub fn to_tensor(&self, device: &Device) -> Result<Tensor> {
        Ok(Tensor::from_vec(
            self.adjacency.clone(),
            (self.num_nodes, self.num_nodes),
            device,
        )?)
    }
}
