//! Automorphisms computed by nauty. Colored edges are subdivided into colored vertices,
//! since sparse nauty only supports vertex colors.

use crate::arch::automorphisms::AutomorphismBackend;
use crate::arch::colored::ColoredGraph;
use crate::perm::Perm;
use itertools::Itertools;
use nauty_Traces_sys::{nauty_check, optionblk, sparsenauty, statsblk, SparseGraph, FALSE, NAUTYVERSIONID, SETWORDSNEEDED, WORDSIZE};
use std::cell::RefCell;
use std::os::raw::c_int;

#[derive(Clone, Copy, Debug, Default)]
pub struct Nauty;

impl AutomorphismBackend for Nauty {
    fn generators(&self, graph: &ColoredGraph) -> Vec<Perm> {
        if graph.is_empty() { // nauty breaks on graph size 0.
            return vec![];
        }
        let (colors, adjacency) = with_edges_as_vertices(graph);
        let n = colors.len();
        let lab_order = (0..n).sorted_unstable_by_key(|&i| (colors[i], i)).collect_vec();
        let mut ptn = lab_order.iter().enumerate().map(|(k, &i)|
            if k + 1 < n && colors[lab_order[k + 1]] == colors[i] { 1 } else { 0 }).collect_vec();
        let mut lab = lab_order.into_iter().map(|i| i as c_int).collect_vec();
        let mut orbits = vec![0; n];

        unsafe {
            nauty_check(WORDSIZE as c_int, SETWORDSNEEDED(n) as c_int, n as c_int, NAUTYVERSIONID as c_int);
        }

        thread_local! {
            /// Collect generators via static C callback function:
            static GENERATORS: RefCell<Vec<Vec<usize>>> = RefCell::new(vec![]);
        }
        extern "C" fn push_generator(ordinal: c_int, perm: *mut c_int, _orbits: *mut c_int,
                                     _numorbits: c_int, _stabnode: c_int, n: c_int) {
            let images = (0..n).map(|i| unsafe { *perm.offset(i as isize) } as usize).collect_vec();
            GENERATORS.with(|g| {
                let mut generators = g.borrow_mut();
                generators.push(images);
                assert_eq!(ordinal as usize, generators.len());
            });
        }

        let sg = &mut to_nauty(&adjacency);
        let options = &mut if graph.directed {
            optionblk::default_sparse_digraph()
        } else {
            optionblk::default_sparse()
        };
        options.getcanon = FALSE;
        options.userautomproc = Some(push_generator);
        options.defaultptn = FALSE;
        let stats = &mut statsblk::default();
        unsafe {
            sparsenauty(&mut sg.into(), lab.as_mut_ptr(), ptn.as_mut_ptr(), orbits.as_mut_ptr(),
                        options, stats, std::ptr::null_mut());
        }

        let generators = GENERATORS.with(|g| g.borrow_mut().drain(..).collect_vec());
        generators.into_iter().map(|images| {
            let truncated = images.into_iter().take(graph.len()).collect_vec();
            debug_assert!(truncated.iter().all(|&i| i < graph.len()));
            Perm::from_images_unchecked(truncated)
        }).filter(|p| !p.is_identity()).collect()
    }
}

/// Equivalent vertex-colored graph where each edge becomes a vertex colored after the edge,
/// placed after the original vertices.
fn with_edges_as_vertices(graph: &ColoredGraph) -> (Vec<usize>, Vec<Vec<usize>>) {
    let edge_color_shift = graph.vertex_colors.iter().max().map_or(0, |m| m + 1);
    let mut colors = graph.vertex_colors.clone();
    let mut adjacency = vec![vec![]; graph.len()];
    for ((i, j), c) in graph.edges() {
        if !graph.directed && i > j {
            continue;
        }
        let new = colors.len();
        colors.push(edge_color_shift + c);
        adjacency.push(vec![]);
        adjacency[i].push(new);
        adjacency[new].push(j);
        if !graph.directed {
            adjacency[new].push(i);
            adjacency[j].push(new);
        }
    }
    (colors, adjacency)
}

fn to_nauty(adjacency: &[Vec<usize>]) -> SparseGraph {
    let d = adjacency.iter().map(|ne| ne.len() as c_int).collect_vec();
    let v = adjacency.iter().map(Vec::len).scan(0, |acc, d| {
        let out = Some(*acc);
        *acc += d;
        out
    }).collect();
    let e = adjacency.iter().map(|ne| ne.iter().map(|&i| i as c_int).sorted_unstable().collect_vec()).concat();
    SparseGraph { v, d, e }
}
