//! Automorphism group generators of colored graphs.
//!
//! The default backend is an individualization-refinement search in pure Rust.
//! With the `nauty` feature, nauty can be selected instead.

use crate::arch::colored::{cell_sizes, target_cell, ColorRefinement, ColoredGraph};
use crate::group::chain::Level;
use crate::perm::Perm;
use itertools::Itertools;
use std::cell::RefCell;
use tracing::trace;

pub trait AutomorphismBackend {
    /// Generators of the automorphism group of the given graph, none of them the identity.
    fn generators(&self, graph: &ColoredGraph) -> Vec<Perm>;
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Backend {
    #[default]
    Search,
    /// Exhaustive check of all vertex permutations. Only feasible for tiny graphs.
    BruteForce,
    #[cfg(feature = "nauty")]
    Nauty,
}

impl AutomorphismBackend for Backend {
    fn generators(&self, graph: &ColoredGraph) -> Vec<Perm> {
        match self {
            Backend::Search => Search.generators(graph),
            Backend::BruteForce => BruteForce.generators(graph),
            #[cfg(feature = "nauty")]
            Backend::Nauty => crate::arch::nauty::Nauty.generators(graph),
        }
    }
}

thread_local! {
    /// The backend used for architecture graphs whose automorphisms are not computed yet.
    pub static AUTOMORPHISMS_BACKEND: RefCell<Backend> = RefCell::new(Backend::default());
}

pub fn with_automorphisms_backend<F: FnOnce() -> R, R>(backend: Backend, f: F) -> R {
    AUTOMORPHISMS_BACKEND.with(|b| {
        let old = b.replace(backend);
        let out = f();
        assert_eq!(backend, b.replace(old));
        out
    })
}

pub fn current_backend() -> Backend {
    AUTOMORPHISMS_BACKEND.with_borrow(|b| *b)
}

/// Individualization-refinement search. Follows the leftmost path of the search tree to a
/// first leaf, then, from the deepest level up, looks for automorphisms fixing the path prefix
/// and mapping the individualized vertex to each other vertex of its cell that is not yet
/// known to be in the same orbit.
#[derive(Clone, Copy, Debug, Default)]
pub struct Search;

struct SearchState<'a> {
    graph: &'a ColoredGraph,
    refinement: ColorRefinement<'a>,
    /// Colorings along the first path, from the root to the first leaf.
    first_path: Vec<Vec<usize>>,
}

impl AutomorphismBackend for Search {
    fn generators(&self, graph: &ColoredGraph) -> Vec<Perm> {
        let refinement = ColorRefinement::new(graph);
        let mut colors = refinement.initial();
        let mut first_path = vec![];
        let mut individualized = vec![];
        while let Some(cell) = target_cell(&colors) {
            let child = refinement.individualize(&colors, cell[0]);
            individualized.push(cell[0]);
            first_path.push(std::mem::replace(&mut colors, child));
        }
        first_path.push(colors);
        let state = SearchState { graph, refinement, first_path };

        let mut generators: Vec<Perm> = vec![];
        for (depth, &v) in individualized.iter().enumerate().rev() {
            let colors = &state.first_path[depth];
            let Some(cell) = target_cell(colors) else { continue };
            let mut orbit = Level::new(graph.len(), v, generators.clone()).orbit;
            for w in cell {
                if orbit.contains(&w) {
                    continue;
                }
                let child = state.refinement.individualize(colors, w);
                if let Some(g) = state.find(depth + 1, child) {
                    trace!(depth, from = v, to = w, "Automorphism found");
                    generators.push(g);
                    orbit = Level::new(graph.len(), v, generators.clone()).orbit;
                }
            }
        }
        generators
    }
}

impl SearchState<'_> {
    /// Depth-first search below a node at the given depth for a leaf equivalent to the first leaf.
    fn find(&self, depth: usize, colors: Vec<usize>) -> Option<Perm> {
        let reference = self.first_path.get(depth)?;
        if cell_sizes(&colors) != cell_sizes(reference) {
            return None;
        }
        match target_cell(&colors) {
            None => {
                let mut vertex_of_color = vec![0; colors.len()];
                for (v, &c) in colors.iter().enumerate() {
                    vertex_of_color[c] = v;
                }
                let g = Perm::from_images_unchecked(reference.iter().map(|&c| vertex_of_color[c]).collect());
                self.graph.is_automorphism(&g).then_some(g)
            }
            Some(cell) => cell.into_iter().find_map(|x|
                self.find(depth + 1, self.refinement.individualize(&colors, x))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BruteForce;

impl AutomorphismBackend for BruteForce {
    fn generators(&self, graph: &ColoredGraph) -> Vec<Perm> {
        let n = graph.len();
        (0..n).permutations(n).map(Perm::from_images_unchecked).
            filter(|p| !p.is_identity() && graph.is_automorphism(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{factorial, PermutationGroup};
    use num_bigint::BigUint;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg64Mcg;

    fn group(graph: &ColoredGraph, backend: &impl AutomorphismBackend) -> PermutationGroup {
        let generators = backend.generators(graph);
        for g in &generators {
            assert!(graph.is_automorphism(g));
            assert!(!g.is_identity());
        }
        PermutationGroup::new(graph.len(), generators).unwrap()
    }

    fn random_graph(n: usize, directed: bool, num_colors: usize, edge_prob: f64, seed: u64) -> ColoredGraph {
        let rng = &mut Pcg64Mcg::seed_from_u64(seed);
        let mut g = ColoredGraph::new(directed, (0..n).map(|_| rng.gen_range(0..num_colors)).collect());
        for i in 0..n {
            for j in 0..n {
                if i != j && (directed || i < j) && rng.gen_bool(edge_prob) {
                    g.insert_edge((i, j), rng.gen_range(0..num_colors));
                }
            }
        }
        g
    }

    #[test]
    fn complete_and_empty_graphs() {
        let empty = ColoredGraph::new(false, vec![0; 7]);
        assert_eq!(group(&empty, &Search).order(), factorial(7));
        let mut complete = ColoredGraph::new(false, vec![0; 7]);
        for (i, j) in (0..7).tuple_combinations() {
            complete.insert_edge((i, j), 0);
        }
        assert_eq!(group(&complete, &Search).order(), factorial(7));
        assert_eq!(group(&ColoredGraph::new(true, vec![]), &Search).order(), BigUint::from(1u32));
    }

    #[test]
    fn cycles() {
        for n in 3..9 {
            let mut directed = ColoredGraph::new(true, vec![0; n]);
            let mut undirected = ColoredGraph::new(false, vec![0; n]);
            for i in 0..n {
                directed.insert_edge((i, (i + 1) % n), 0);
                undirected.insert_edge((i, (i + 1) % n), 0);
            }
            assert_eq!(group(&directed, &Search).order(), BigUint::from(n));
            assert_eq!(group(&undirected, &Search).order(), BigUint::from(2 * n));
        }
    }

    #[test]
    fn search_agrees_with_brute_force() {
        for seed in 0..30 {
            let n = 3 + seed as usize % 4;
            for directed in [false, true] {
                let graph = random_graph(n, directed, 1 + seed as usize % 2, 0.4, seed);
                assert_eq!(group(&graph, &Search), group(&graph, &BruteForce), "seed {seed}, directed {directed}");
            }
        }
    }

    #[test]
    fn relabelled_graph_has_conjugate_group() {
        for seed in 0..10 {
            let graph = random_graph(12, seed % 2 == 0, 2, 0.3, seed);
            let p = Perm::random(12, seed);
            assert_eq!(group(&graph, &Search).order(), group(&graph.permuted(&p), &Search).order());
        }
    }

    #[test]
    fn backend_selection() {
        assert_eq!(current_backend(), Backend::Search);
        let graph = random_graph(5, false, 1, 0.5, 1);
        let order = with_automorphisms_backend(Backend::BruteForce, || {
            assert_eq!(current_backend(), Backend::BruteForce);
            group(&graph, &current_backend()).order()
        });
        assert_eq!(current_backend(), Backend::Search);
        assert_eq!(order, group(&graph, &Backend::Search).order());
    }
}
