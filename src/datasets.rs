//! Built-in node-classification graphs.
//!
//! # Zachary's Karate Club
//!
//! 34 members of a university karate club, 78 friendship edges observed
//! before the club split in two (Zachary, 1977). The label of each member
//! is the faction they joined: `0` for the instructor's club, `1` for the
//! officer's club. The split is 17/17.
//!
//! Only the connectivity is used as input; labels are ground truth.

use crate::error::{Error, Result};
use crate::graph::Graph;

/// Undirected edges of the karate club graph (0-indexed).
#[rustfmt::skip]
const KARATE_EDGES: [(usize, usize); 78] = [
    (0, 1), (0, 2), (0, 3), (0, 4), (0, 5), (0, 6), (0, 7), (0, 8),
    (0, 10), (0, 11), (0, 12), (0, 13), (0, 17), (0, 19), (0, 21), (0, 31),
    (1, 2), (1, 3), (1, 7), (1, 13), (1, 17), (1, 19), (1, 21), (1, 30),
    (2, 3), (2, 7), (2, 8), (2, 9), (2, 13), (2, 27), (2, 28), (2, 32),
    (3, 7), (3, 12), (3, 13),
    (4, 6), (4, 10),
    (5, 6), (5, 10), (5, 16),
    (6, 16),
    (8, 30), (8, 32), (8, 33),
    (9, 33),
    (13, 33),
    (14, 32), (14, 33),
    (15, 32), (15, 33),
    (18, 32), (18, 33),
    (19, 33),
    (20, 32), (20, 33),
    (22, 32), (22, 33),
    (23, 25), (23, 27), (23, 29), (23, 32), (23, 33),
    (24, 25), (24, 27), (24, 31),
    (25, 31),
    (26, 29), (26, 33),
    (27, 33),
    (28, 31), (28, 33),
    (29, 32), (29, 33),
    (30, 32), (30, 33),
    (31, 32), (31, 33),
    (32, 33),
];

/// Faction per member: 0 = instructor, 1 = officer.
#[rustfmt::skip]
const KARATE_CLUB: [u32; 34] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
    0, 0, 0, 0, 1, 1, 0, 0, 1, 0,
    1, 0, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1,
];

/// Zachary's karate club graph with binarized faction labels.
pub fn karate_club() -> Result<(Graph, Vec<u32>)> {
    let graph = Graph::from_edges(KARATE_CLUB.len(), &KARATE_EDGES)?;
    Ok((graph, KARATE_CLUB.to_vec()))
}

/// Two disjoint `clique_size`-cliques joined by one bridge edge.
///
/// Nodes `0..k` form clique 0 and `k..2k` clique 1; the bridge links node
/// `k - 1` to node `k`. Labels are the clique index.
pub fn two_cliques(clique_size: usize) -> Result<(Graph, Vec<u32>)> {
    if clique_size < 2 {
        return Err(Error::InvalidConfig(format!(
            "clique size must be at least 2, got {clique_size}"
        )));
    }
    let k = clique_size;
    let mut edges = Vec::with_capacity(k * (k - 1) + 1);
    for offset in [0, k] {
        for i in 0..k {
            for j in (i + 1)..k {
                edges.push((offset + i, offset + j));
            }
        }
    }
    edges.push((k - 1, k));

    let graph = Graph::from_edges(2 * k, &edges)?;
    let labels = (0..2 * k).map(|i| u32::from(i >= k)).collect();
    Ok((graph, labels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_karate_club_shape() {
        let (g, labels) = karate_club().unwrap();
        assert_eq!(g.num_nodes(), 34);
        assert_eq!(g.num_edges(), 78);
        assert_eq!(labels.len(), 34);
        assert_eq!(labels.iter().filter(|&&l| l == 0).count(), 17);
        // The instructor and the officer are the two hubs.
        assert_eq!(g.degree(0), 16);
        assert_eq!(g.degree(33), 17);
        assert_eq!(labels[0], 0);
        assert_eq!(labels[33], 1);
    }

    #[test]
    fn test_two_cliques() {
        let (g, labels) = two_cliques(17).unwrap();
        assert_eq!(g.num_nodes(), 34);
        assert_eq!(g.num_edges(), 2 * (17 * 16 / 2) + 1);
        assert!(g.has_edge(16, 17));
        assert!(!g.has_edge(0, 17));
        assert_eq!(g.degree(0), 16);
        assert_eq!(g.degree(16), 17);
        assert_eq!(&labels[..17], &[0; 17]);
        assert_eq!(&labels[17..], &[1; 17]);
    }

    #[test]
    fn test_two_cliques_too_small() {
        assert!(two_cliques(1).is_err());
    }
}
