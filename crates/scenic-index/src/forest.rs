//! Random-hyperplane forest construction and traversal.
//!
//! Each tree recursively splits the item set with a hyperplane chosen from
//! two randomly picked member vectors, until partitions fit in a leaf. A
//! query walks all trees at once through a single max-priority queue: the
//! child on the query's side of a split keeps a non-negative bound (the
//! smallest boundary margin seen so far), the far child is queued at the
//! negated margin, so every tree's pure-descent leaf is reached before any
//! far branch and near-boundary branches follow in margin order. Candidates
//! from the visited leaves are then re-ranked by true distance in
//! [`crate::index::VectorIndex::query`].

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bincode::{Decode, Encode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use crate::types::{IndexItem, Metric};

/// Partitioning stops once a subset fits in one leaf.
pub(crate) const MAX_LEAF_ITEMS: usize = 16;

/// How many random point pairs to try before giving up on a data-derived
/// split plane.
const SPLIT_ATTEMPTS: usize = 3;

// ============================================================================
// Tree structure
// ============================================================================

/// A node of one space-partitioning tree.
///
/// `slots` are positions in the index's item vector, not item ids.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub(crate) enum Node {
    /// Terminal node holding item slots.
    Leaf { slots: Vec<u32> },
    /// Internal split: items with `dot(normal, v) - offset > 0` went above.
    Split {
        normal: Vec<f32>,
        offset: f32,
        below: u32,
        above: u32,
    },
}

/// One randomized space-partitioning tree.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub(crate) struct Tree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: u32,
}

/// The forest of independently built trees.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub(crate) struct Forest {
    pub(crate) trees: Vec<Tree>,
}

impl Forest {
    pub(crate) fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

// ============================================================================
// Construction
// ============================================================================

/// Build `trees` independent trees over the items.
///
/// With a seed, per-tree seeds are derived as `seed + tree_index`, so the
/// result is reproducible even though trees build in parallel. Without one,
/// per-tree seeds are drawn from OS entropy up front for the same reason.
pub(crate) fn build_forest(
    items: &[IndexItem],
    metric: Metric,
    trees: usize,
    seed: Option<u64>,
) -> Forest {
    let tree_seeds: Vec<u64> = match seed {
        Some(base) => (0..trees as u64).map(|i| base.wrapping_add(i)).collect(),
        None => {
            let mut rng = rand::rng();
            (0..trees).map(|_| rng.random()).collect()
        }
    };

    let trees: Vec<Tree> = tree_seeds
        .into_par_iter()
        .map(|tree_seed| build_tree(items, metric, StdRng::seed_from_u64(tree_seed)))
        .collect();

    debug!(
        "Built forest: {} trees over {} items",
        trees.len(),
        items.len()
    );

    Forest { trees }
}

fn build_tree(items: &[IndexItem], metric: Metric, mut rng: StdRng) -> Tree {
    let mut nodes = Vec::new();
    let slots: Vec<u32> = (0..items.len() as u32).collect();
    let root = grow(items, metric, slots, &mut nodes, &mut rng);
    Tree { nodes, root }
}

/// Recursively partition `slots`, returning the index of the created node.
fn grow(
    items: &[IndexItem],
    metric: Metric,
    slots: Vec<u32>,
    nodes: &mut Vec<Node>,
    rng: &mut StdRng,
) -> u32 {
    if slots.len() <= MAX_LEAF_ITEMS {
        nodes.push(Node::Leaf { slots });
        return (nodes.len() - 1) as u32;
    }

    let dim = items[slots[0] as usize].vector.len();
    let (normal, offset) = choose_hyperplane(items, &slots, metric, rng)
        .unwrap_or_else(|| random_plane(dim, rng));

    let mut below = Vec::new();
    let mut above = Vec::new();
    for &slot in &slots {
        let margin = dot(&items[slot as usize].vector, &normal) - offset;
        if margin > 0.0 {
            above.push(slot);
        } else {
            below.push(slot);
        }
    }

    // Degenerate data (e.g. many identical vectors) can put everything on
    // one side; alternate assignment keeps the tree depth bounded.
    if below.is_empty() || above.is_empty() {
        below.clear();
        above.clear();
        for (i, &slot) in slots.iter().enumerate() {
            if i % 2 == 0 {
                below.push(slot);
            } else {
                above.push(slot);
            }
        }
    }

    let below_idx = grow(items, metric, below, nodes, rng);
    let above_idx = grow(items, metric, above, nodes, rng);
    nodes.push(Node::Split {
        normal,
        offset,
        below: below_idx,
        above: above_idx,
    });
    (nodes.len() - 1) as u32
}

/// Derive a split plane from two randomly chosen member points.
///
/// Under Cosine the points are direction-normalized first and the plane
/// passes through the origin; under Euclidean the plane bisects the segment
/// between them. Returns None when the sampled points give no usable normal.
fn choose_hyperplane(
    items: &[IndexItem],
    slots: &[u32],
    metric: Metric,
    rng: &mut StdRng,
) -> Option<(Vec<f32>, f32)> {
    for _ in 0..SPLIT_ATTEMPTS {
        let i = rng.random_range(0..slots.len());
        let mut j = rng.random_range(0..slots.len());
        if j == i {
            j = (i + 1) % slots.len();
        }
        let p = &items[slots[i] as usize].vector;
        let q = &items[slots[j] as usize].vector;

        match metric {
            Metric::Cosine => {
                let (Some(pn), Some(qn)) = (normalized(p), normalized(q)) else {
                    continue;
                };
                let diff: Vec<f32> = pn.iter().zip(qn.iter()).map(|(a, b)| a - b).collect();
                if let Some(normal) = normalized(&diff) {
                    return Some((normal, 0.0));
                }
            }
            Metric::Euclidean => {
                let diff: Vec<f32> = p.iter().zip(q.iter()).map(|(a, b)| a - b).collect();
                if let Some(normal) = normalized(&diff) {
                    let midpoint_proj: f32 = normal
                        .iter()
                        .zip(p.iter().zip(q.iter()))
                        .map(|(n, (a, b))| n * (a + b) * 0.5)
                        .sum();
                    return Some((normal, midpoint_proj));
                }
            }
        }
    }
    None
}

/// Fallback plane with a random direction through the origin.
fn random_plane(dim: usize, rng: &mut StdRng) -> (Vec<f32>, f32) {
    let v: Vec<f32> = (0..dim).map(|_| rng.random::<f32>() - 0.5).collect();
    match normalized(&v) {
        Some(normal) => (normal, 0.0),
        None => {
            // All-zero draw; a unit axis still partitions.
            let mut axis = vec![0.0; dim.max(1)];
            axis[0] = 1.0;
            (axis, 0.0)
        }
    }
}

// ============================================================================
// Traversal
// ============================================================================

/// Priority-queue entry for the best-first walk across all trees.
#[derive(Debug)]
struct QueueEntry {
    priority: f32,
    tree: u32,
    node: u32,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Tie-break on tree/node so pops are deterministic.
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| self.tree.cmp(&other.tree))
            .then_with(|| self.node.cmp(&other.node))
    }
}

/// Gather at least `search_k` candidate slots (when available) by walking
/// all trees best-first. Returned slots are sorted and deduplicated.
pub(crate) fn query_candidates(forest: &Forest, query: &[f32], search_k: usize) -> Vec<u32> {
    let mut heap = BinaryHeap::new();
    for (tree_idx, tree) in forest.trees.iter().enumerate() {
        heap.push(QueueEntry {
            priority: f32::INFINITY,
            tree: tree_idx as u32,
            node: tree.root,
        });
    }

    let mut found: Vec<u32> = Vec::new();
    while found.len() < search_k {
        let Some(entry) = heap.pop() else {
            break;
        };
        match &forest.trees[entry.tree as usize].nodes[entry.node as usize] {
            Node::Leaf { slots } => found.extend_from_slice(slots),
            Node::Split {
                normal,
                offset,
                below,
                above,
            } => {
                let margin = dot(query, normal) - offset;
                heap.push(QueueEntry {
                    priority: entry.priority.min(margin),
                    tree: entry.tree,
                    node: *above,
                });
                heap.push(QueueEntry {
                    priority: entry.priority.min(-margin),
                    tree: entry.tree,
                    node: *below,
                });
            }
        }
    }

    found.sort_unstable();
    found.dedup();
    found
}

// ============================================================================
// Vector helpers
// ============================================================================

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Unit-length copy of `v`, or None when its norm is (near) zero.
fn normalized(v: &[f32]) -> Option<Vec<f32>> {
    let norm = dot(v, v).sqrt();
    if norm <= f32::EPSILON {
        return None;
    }
    Some(v.iter().map(|x| x / norm).collect())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemId, ItemRecord};

    fn items_from(vectors: Vec<Vec<f32>>) -> Vec<IndexItem> {
        vectors
            .into_iter()
            .enumerate()
            .map(|(i, v)| IndexItem::new(ItemId::new(i as u64), v, ItemRecord::new("")))
            .collect()
    }

    /// Deterministic spread of 2-d vectors, no RNG needed in the test body.
    fn fan_of_vectors(n: usize) -> Vec<Vec<f32>> {
        (0..n)
            .map(|i| {
                let angle = i as f32 * 0.37;
                vec![angle.cos() * (1.0 + i as f32), angle.sin() * (1.0 + i as f32)]
            })
            .collect()
    }

    #[test]
    fn test_seeded_build_is_reproducible() {
        let items = items_from(fan_of_vectors(100));
        let a = build_forest(&items, Metric::Cosine, 4, Some(42));
        let b = build_forest(&items, Metric::Cosine, 4, Some(42));
        assert_eq!(a, b);

        let c = build_forest(&items, Metric::Cosine, 4, Some(43));
        assert_ne!(a, c);
    }

    #[test]
    fn test_candidates_include_self() {
        let items = items_from(fan_of_vectors(80));
        let forest = build_forest(&items, Metric::Cosine, 8, Some(7));

        for (slot, item) in items.iter().enumerate() {
            let candidates = query_candidates(&forest, &item.vector, 8);
            assert!(
                candidates.contains(&(slot as u32)),
                "slot {slot} missing from its own candidate set"
            );
        }
    }

    #[test]
    fn test_identical_vectors_terminate() {
        // All-identical data forces the alternate-assignment fallback.
        let items = items_from(vec![vec![1.0, 1.0]; 200]);
        let forest = build_forest(&items, Metric::Cosine, 2, Some(1));
        let candidates = query_candidates(&forest, &[1.0, 1.0], 200 * 2);
        assert_eq!(candidates.len(), 200);
    }

    #[test]
    fn test_euclidean_split_separates_clusters() {
        let mut vectors: Vec<Vec<f32>> = (0..30).map(|i| vec![i as f32 * 0.01, 0.0]).collect();
        vectors.extend((0..30).map(|i| vec![100.0 + i as f32 * 0.01, 0.0]));
        let items = items_from(vectors);

        let forest = build_forest(&items, Metric::Euclidean, 4, Some(5));
        // A query deep inside the first cluster should surface cluster-one
        // slots before the heap is forced across the gap.
        let candidates = query_candidates(&forest, &[0.05, 0.0], 10);
        assert!(candidates.iter().any(|&s| s < 30));
    }

    #[test]
    fn test_candidates_sorted_and_deduped() {
        let items = items_from(fan_of_vectors(50));
        let forest = build_forest(&items, Metric::Cosine, 6, Some(11));
        let candidates = query_candidates(&forest, &items[3].vector, 64);

        let mut sorted = candidates.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(candidates, sorted);
    }
}
