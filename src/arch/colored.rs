//! Simple vertex- and edge-colored graphs, the input of automorphism backends,
//! and color refinement on them.

use crate::perm::{FHashMap, Perm};
use itertools::Itertools;
use rayon::prelude::*;

pub type NeighborMap = FHashMap<usize, usize>;

/// Graph without self-loops and with at most one colored edge per ordered vertex pair.
/// Undirected graphs store every edge in both directions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColoredGraph {
    pub directed: bool,
    pub vertex_colors: Vec<usize>,
    pub out_edges: Vec<NeighborMap>,
}

impl ColoredGraph {
    pub fn new(directed: bool, vertex_colors: Vec<usize>) -> Self {
        let out_edges = vec![NeighborMap::default(); vertex_colors.len()];
        Self { directed, vertex_colors, out_edges }
    }

    pub fn len(&self) -> usize {
        self.vertex_colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_colors.is_empty()
    }

    /// Returns the previous color of the edge, if any.
    pub fn insert_edge(&mut self, (i, j): (usize, usize), color: usize) -> Option<usize> {
        assert!(i != j, "Self-loops must be encoded as vertex colors.");
        let out = self.out_edges[i].insert(j, color);
        if !self.directed {
            assert_eq!(out, self.out_edges[j].insert(i, color));
        }
        out
    }

    pub fn edge(&self, (i, j): (usize, usize)) -> Option<usize> {
        self.out_edges[i].get(&j).cloned()
    }

    /// Directed edges with colors, sorted.
    pub fn edges(&self) -> Vec<((usize, usize), usize)> {
        self.out_edges.iter().enumerate().flat_map(|(i, ne)|
            ne.iter().map(move |(&j, &c)| ((i, j), c))).sorted_unstable().collect()
    }

    pub fn in_edges(&self) -> Vec<Vec<(usize, usize)>> {
        let mut out = vec![vec![]; self.len()];
        for ((i, j), c) in self.edges() {
            out[j].push((i, c));
        }
        out
    }

    /// Whether the permutation preserves vertex colors and maps edges onto edges of equal color.
    pub fn is_automorphism(&self, p: &Perm) -> bool {
        p.degree() == self.len() &&
            (0..self.len()).all(|i| self.vertex_colors[i] == self.vertex_colors[p * i]) &&
            self.out_edges.par_iter().enumerate().all(|(i, ne)|
                ne.iter().all(|(&j, &c)| self.edge((p * i, p * j)) == Some(c)))
    }

    /// Relabelled graph where vertex i becomes p(i).
    pub fn permuted(&self, p: &Perm) -> Self {
        let mut vertex_colors = vec![0; self.len()];
        for (i, &c) in self.vertex_colors.iter().enumerate() {
            vertex_colors[p * i] = c;
        }
        let mut out = Self::new(self.directed, vertex_colors);
        for ((i, j), c) in self.edges() {
            out.out_edges[p * i].insert(p * j, c);
        }
        out
    }
}

/// Color refinement (1-dimensional Weisfeiler-Leman) producing equitable colorings.
/// Colors are dense and assigned in an isomorphism-invariant order: refining a relabelled
/// coloring yields the relabelled result.
pub struct ColorRefinement<'a> {
    graph: &'a ColoredGraph,
    in_edges: Option<Vec<Vec<(usize, usize)>>>,
}

type Signature = (usize, Vec<(usize, usize)>, Vec<(usize, usize)>);

impl<'a> ColorRefinement<'a> {
    pub fn new(graph: &'a ColoredGraph) -> Self {
        let in_edges = graph.directed.then(|| graph.in_edges());
        Self { graph, in_edges }
    }

    /// Initial equitable coloring induced by the vertex colors.
    pub fn initial(&self) -> Vec<usize> {
        self.refine(dense_ranks(&self.graph.vertex_colors))
    }

    /// Refines until the number of colors is stable.
    pub fn refine(&self, mut colors: Vec<usize>) -> Vec<usize> {
        let mut count = num_colors(&colors);
        loop {
            let refined = dense_ranks(&self.signatures(&colors));
            let refined_count = num_colors(&refined);
            if refined_count == count {
                return refined;
            }
            colors = refined;
            count = refined_count;
        }
    }

    /// Gives `v` a color of its own, ordered before the rest of its cell, then refines.
    pub fn individualize(&self, colors: &[usize], v: usize) -> Vec<usize> {
        let split = colors.iter().enumerate().map(|(i, &c)| (c, i != v)).collect_vec();
        self.refine(dense_ranks(&split))
    }

    fn signatures(&self, colors: &[usize]) -> Vec<Signature> {
        (0..self.graph.len()).into_par_iter().map(|i| {
            let out: Vec<_> = self.graph.out_edges[i].iter().map(|(&j, &e)| (colors[j], e)).sorted_unstable().collect();
            let inc: Vec<_> = self.in_edges.as_ref().map_or(vec![], |in_edges|
                in_edges[i].iter().map(|&(j, e)| (colors[j], e)).sorted_unstable().collect());
            (colors[i], out, inc)
        }).collect()
    }
}

/// Lowest color shared by more than one vertex, with its vertices in increasing order.
pub fn target_cell(colors: &[usize]) -> Option<Vec<usize>> {
    let sizes = cell_sizes(colors);
    let color = sizes.iter().position(|&s| s > 1)?;
    Some(colors.iter().positions(|&c| c == color).collect())
}

pub fn cell_sizes(colors: &[usize]) -> Vec<usize> {
    let mut sizes = vec![0; num_colors(colors)];
    for &c in colors {
        sizes[c] += 1;
    }
    sizes
}

fn num_colors(colors: &[usize]) -> usize {
    colors.iter().max().map_or(0, |m| m + 1)
}

/// Rank of each key among the distinct keys.
pub fn dense_ranks<T: Ord>(keys: &[T]) -> Vec<usize> {
    let distinct = keys.iter().sorted_unstable().dedup().collect_vec();
    keys.iter().map(|k| distinct.binary_search(&k).expect("key is present")).collect()
}
