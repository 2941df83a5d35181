//! Architecture graphs: typed processors connected by typed communication channels.

use crate::arch::automorphisms::{current_backend, AutomorphismBackend};
use crate::arch::canonical::{CanonicalForm, ChannelRecord, GraphRecord};
use crate::arch::colored::{dense_ranks, ColoredGraph};
use crate::arch::ArchSystem;
use crate::error::{Error, Result};
use crate::group::PermutationGroup;
use crate::perm::FHashSet;
use itertools::Itertools;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::ops::Range;
use std::sync::OnceLock;
use tracing::debug;

pub const DEFAULT_PROCESSOR_TYPE: &str = "P";
pub const DEFAULT_CHANNEL_TYPE: &str = "C";

/// Channel between two processors, with the index of its type label.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Channel {
    pub source: usize,
    pub target: usize,
    pub ty: usize,
}

/// Processors with type labels connected by channels with type labels.
/// There is at most one channel of each type per processor pair, and per unordered pair
/// for undirected graphs. Self-channels are allowed.
///
/// Automorphisms are computed on first use and recomputed after any mutation.
#[derive(Clone, Debug, Default)]
pub struct ArchGraph {
    directed: bool,
    processor_type_names: Vec<String>,
    channel_type_names: Vec<String>,
    processors: Vec<usize>,
    channels: Vec<Channel>,
    channel_keys: FHashSet<Channel>,
    automorphisms: OnceLock<PermutationGroup>,
}

impl ArchGraph {
    pub fn new(directed: bool) -> Self {
        Self { directed, ..Self::default() }
    }

    /// Graph of processors with default type, connected by channels of default type.
    /// Fails if the adjacency mentions a processor outside of 0..num_processors.
    pub fn from_adjacency<T: IntoIterator<Item=usize>>(
        num_processors: usize, adjacency: impl IntoIterator<Item=(usize, T)>, directed: bool,
    ) -> Result<Self> {
        let mut graph = Self::new(directed);
        graph.add_processors(num_processors, DEFAULT_PROCESSOR_TYPE);
        for (source, targets) in adjacency {
            for target in targets {
                graph.add_channel(source, target, DEFAULT_CHANNEL_TYPE)?;
            }
        }
        Ok(graph)
    }

    /// `n` processors with a channel between every pair of distinct processors.
    pub fn fully_connected(n: usize, processor_type: &str, channel_type: &str) -> Self {
        let mut graph = Self::new(false);
        graph.add_processors(n, processor_type);
        graph.fully_connect(channel_type);
        graph
    }

    /// `width * height` processors in row-major order, each connected to its horizontal and
    /// vertical neighbours.
    pub fn regular_mesh(width: usize, height: usize, processor_type: &str, channel_type: &str) -> Self {
        let mut graph = Self::new(false);
        graph.add_processors(width * height, processor_type);
        let ty = Self::type_index(&mut graph.channel_type_names, channel_type);
        for (row, col) in (0..height).cartesian_product(0..width) {
            let pe = row * width + col;
            if col + 1 < width {
                graph.insert_channel(Channel { source: pe, target: pe + 1, ty });
            }
            if row + 1 < height {
                graph.insert_channel(Channel { source: pe, target: pe + width, ty });
            }
        }
        graph
    }

    /// Regular mesh whose rows and columns wrap around, i.e. a torus.
    /// Rows or columns of a single processor get no wrap-around self-channel.
    pub fn hyper_mesh(width: usize, height: usize, processor_type: &str, channel_type: &str) -> Self {
        let mut graph = Self::regular_mesh(width, height, processor_type, channel_type);
        if graph.num_processors() == 0 {
            return graph;
        }
        let ty = Self::type_index(&mut graph.channel_type_names, channel_type);
        let rows = (0..height).map(|row| (row * width, row * width + width - 1));
        let cols = (0..width).map(|col| (col, col + (height - 1) * width));
        for (source, target) in rows.chain(cols).collect_vec() {
            if source != target {
                graph.insert_channel(Channel { source, target, ty });
            }
        }
        graph
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    fn type_index(names: &mut Vec<String>, name: &str) -> usize {
        match names.iter().position(|n| n == name) {
            Some(i) => i,
            None => {
                names.push(name.to_owned());
                names.len() - 1
            }
        }
    }

    /// Returns the index of the new processor.
    pub fn add_processor(&mut self, processor_type: &str) -> usize {
        let ty = Self::type_index(&mut self.processor_type_names, processor_type);
        self.processors.push(ty);
        self.automorphisms = OnceLock::new();
        self.processors.len() - 1
    }

    pub fn add_processors(&mut self, count: usize, processor_type: &str) -> Range<usize> {
        let start = self.num_processors();
        for _ in 0..count {
            self.add_processor(processor_type);
        }
        start..self.num_processors()
    }

    fn check_processor(&self, pe: usize) -> Result<()> {
        if pe < self.num_processors() {
            Ok(())
        } else {
            Err(Error::InvalidGraph(format!("processor {pe} does not exist, there are {} processors", self.num_processors())))
        }
    }

    /// Adds a channel unless an equal channel exists. Returns whether it was added.
    pub fn add_channel(&mut self, source: usize, target: usize, channel_type: &str) -> Result<bool> {
        self.check_processor(source)?;
        self.check_processor(target)?;
        let ty = Self::type_index(&mut self.channel_type_names, channel_type);
        Ok(self.insert_channel(Channel { source, target, ty }))
    }

    fn insert_channel(&mut self, channel: Channel) -> bool {
        let key = if self.directed || channel.source <= channel.target { channel } else {
            Channel { source: channel.target, target: channel.source, ty: channel.ty }
        };
        if !self.channel_keys.insert(key) {
            return false;
        }
        self.channels.push(channel);
        self.automorphisms = OnceLock::new();
        true
    }

    /// Connects every pair of distinct processors from the given set, in both directions for
    /// directed graphs. Returns the number of channels added.
    pub fn fully_connect_subset(&mut self, processors: &[usize], channel_type: &str) -> Result<usize> {
        for &pe in processors {
            self.check_processor(pe)?;
        }
        let ty = Self::type_index(&mut self.channel_type_names, channel_type);
        let mut added = 0;
        for (&source, &target) in processors.iter().cartesian_product(processors) {
            if source != target && (self.directed || source < target) &&
                self.insert_channel(Channel { source, target, ty }) {
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn fully_connect(&mut self, channel_type: &str) -> usize {
        let all = (0..self.num_processors()).collect_vec();
        self.fully_connect_subset(&all, channel_type).unwrap_or(0)
    }

    /// Connects all processors of the given type with each other.
    pub fn fully_connect_processors(&mut self, processor_type: &str, channel_type: &str) -> usize {
        let processors = self.processors_of_type(processor_type);
        self.fully_connect_subset(&processors, channel_type).unwrap_or(0)
    }

    /// Adds a self-channel to every processor of the given set.
    pub fn self_connect_subset(&mut self, processors: &[usize], channel_type: &str) -> Result<usize> {
        for &pe in processors {
            self.check_processor(pe)?;
        }
        let ty = Self::type_index(&mut self.channel_type_names, channel_type);
        Ok(processors.iter().filter(|&&pe| self.insert_channel(Channel { source: pe, target: pe, ty })).count())
    }

    pub fn self_connect(&mut self, channel_type: &str) -> usize {
        let all = (0..self.num_processors()).collect_vec();
        self.self_connect_subset(&all, channel_type).unwrap_or(0)
    }

    pub fn self_connect_processors(&mut self, processor_type: &str, channel_type: &str) -> usize {
        let processors = self.processors_of_type(processor_type);
        self.self_connect_subset(&processors, channel_type).unwrap_or(0)
    }

    fn processors_of_type(&self, processor_type: &str) -> Vec<usize> {
        self.processors.iter().positions(|&ty| self.processor_type_names[ty] == processor_type).collect()
    }

    pub fn num_processors(&self) -> usize {
        self.processors.len()
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Type label the processor was added with.
    pub fn processor_type(&self, pe: usize) -> Result<&str> {
        self.check_processor(pe)?;
        Ok(&self.processor_type_names[self.processors[pe]])
    }

    /// Indices of the self-channel types of each processor, sorted.
    fn self_channel_types(&self) -> Vec<Vec<usize>> {
        let mut loops = vec![vec![]; self.num_processors()];
        for c in self.channels.iter().filter(|c| c.source == c.target) {
            loops[c.source].push(c.ty);
        }
        for l in &mut loops {
            l.sort_unstable();
        }
        loops
    }

    /// Label of a processor combined with the sorted labels of its self-channels,
    /// such as `p%L1%L2` for a processor of type `p` with self-channels `L2` and `L1`.
    fn composite_processor_types(&self) -> Vec<String> {
        self.processors.iter().zip(self.self_channel_types()).map(|(&ty, loops)|
            loops.into_iter().map(|l| self.channel_type_names[l].as_str()).sorted_unstable()
                .fold(self.processor_type_names[ty].clone(), |acc, l| acc + "%" + l)
        ).collect()
    }

    /// Distinct processor types, with self-channel types folded into the processor type.
    pub fn processor_types(&self) -> Vec<String> {
        self.composite_processor_types().into_iter().unique().collect()
    }

    /// Distinct types of existing channels, including self-channels.
    pub fn channel_types(&self) -> Vec<&str> {
        self.channels.iter().map(|c| self.channel_type_names[c.ty].as_str()).unique().collect()
    }

    /// Channels as (source, target, type) in insertion order.
    pub fn channels(&self) -> impl Iterator<Item=(usize, usize, &str)> + '_ {
        self.channels.iter().map(|c| (c.source, c.target, self.channel_type_names[c.ty].as_str()))
    }

    pub fn has_channel(&self, source: usize, target: usize, channel_type: &str) -> bool {
        let Some(ty) = self.channel_type_names.iter().position(|n| n == channel_type) else { return false };
        let key = if self.directed || source <= target { (source, target) } else { (target, source) };
        self.channel_keys.contains(&Channel { source: key.0, target: key.1, ty })
    }

    /// Equivalent simple colored graph. Vertex colors encode the processor type and self-channels,
    /// edge colors the set of channel types between a processor pair.
    pub fn colored_graph(&self) -> ColoredGraph {
        let kinds = self.processors.iter().cloned().zip(self.self_channel_types()).collect_vec();
        let vertex_colors = dense_ranks(&kinds);
        let mut pairs = BTreeMap::<(usize, usize), Vec<usize>>::new();
        for c in self.channels.iter().filter(|c| c.source != c.target) {
            let key = if self.directed || c.source < c.target { (c.source, c.target) } else { (c.target, c.source) };
            pairs.entry(key).or_default().push(c.ty);
        }
        let (edges, types): (Vec<_>, Vec<_>) = pairs.into_iter().map(|(e, types)|
            (e, types.into_iter().sorted_unstable().collect_vec())).unzip();
        let mut graph = ColoredGraph::new(self.directed, vertex_colors);
        for (e, c) in edges.into_iter().zip(dense_ranks(&types)) {
            graph.insert_edge(e, c);
        }
        graph
    }

    /// Computes the automorphism group with the given backend, bypassing the cache.
    pub fn automorphisms_with(&self, backend: &impl AutomorphismBackend) -> PermutationGroup {
        let graph = self.colored_graph();
        let generators = backend.generators(&graph);
        debug_assert!(generators.par_iter().all(|g| graph.is_automorphism(g)));
        debug!(processors = self.num_processors(), channels = self.num_channels(),
            generators = generators.len(), "Architecture graph automorphisms");
        PermutationGroup::from_valid(self.num_processors(), generators)
    }

    pub fn to_record(&self) -> GraphRecord {
        GraphRecord {
            directed: self.directed,
            processors: self.processors.iter().map(|&ty| self.processor_type_names[ty].clone()).collect(),
            channels: self.channels().map(|(source, target, ty)|
                ChannelRecord { source, target, channel_type: ty.to_owned() }).collect(),
        }
    }

    pub fn from_record(record: &GraphRecord) -> Result<Self> {
        let mut graph = Self::new(record.directed);
        for ty in &record.processors {
            graph.add_processor(ty);
        }
        for c in &record.channels {
            graph.add_channel(c.source, c.target, &c.channel_type).map_err(|e| Error::Deserialization(e.to_string()))?;
        }
        Ok(graph)
    }
}

impl ArchSystem for ArchGraph {
    fn num_processors(&self) -> usize {
        self.num_processors()
    }

    fn num_channels(&self) -> usize {
        self.num_channels()
    }

    fn automorphisms(&self) -> &PermutationGroup {
        self.automorphisms.get_or_init(|| self.automorphisms_with(&current_backend()))
    }

    fn to_canonical_form(&self) -> CanonicalForm {
        CanonicalForm::Graph(self.to_record())
    }
}

impl Display for ArchGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let (kind, arrow) = if self.directed { ("directed", "->") } else { ("undirected", "--") };
        writeln!(f, "{kind} architecture graph, {} processors, {} channels", self.num_processors(), self.num_channels())?;
        for (pe, &ty) in self.processors.iter().enumerate() {
            writeln!(f, "  {pe}: {}", self.processor_type_names[ty])?;
        }
        for (source, target, ty) in self.channels() {
            writeln!(f, "  {source} {arrow} {target}: {ty}")?;
        }
        writeln!(f, "automorphisms of {}", ArchSystem::automorphisms(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::automorphisms::{with_automorphisms_backend, Backend, BruteForce};
    use crate::group::factorial;
    use crate::perm::Perm;
    use num_bigint::BigUint;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    fn ram_graph(directed: bool, processors: usize) -> ArchGraph {
        let mut graph = ArchGraph::new(directed);
        graph.add_processors(processors, "p");
        graph.fully_connect("RAM");
        graph
    }

    fn ring(n: usize, directed: bool, both_ways: bool) -> ArchGraph {
        let mut graph = ram_graph(directed, n);
        for pe in 0..n {
            graph.add_channel(pe, (pe + 1) % n, "c").unwrap();
            if both_ways {
                graph.add_channel((pe + 1) % n, pe, "c").unwrap();
            }
        }
        graph
    }

    #[test]
    fn channels_are_validated_and_unique() {
        let mut graph = ArchGraph::new(false);
        graph.add_processors(3, "p");
        assert_eq!(graph.add_channel(0, 1, "c"), Ok(true));
        assert_eq!(graph.add_channel(1, 0, "c"), Ok(false));
        assert_eq!(graph.add_channel(1, 0, "d"), Ok(true));
        assert!(matches!(graph.add_channel(0, 3, "c"), Err(Error::InvalidGraph(_))));
        assert_eq!(graph.num_channels(), 2);
        assert!(graph.has_channel(1, 0, "c"));
        assert!(!graph.has_channel(1, 2, "c"));

        let mut directed = ArchGraph::new(true);
        directed.add_processors(2, "p");
        assert_eq!(directed.add_channel(0, 1, "c"), Ok(true));
        assert_eq!(directed.add_channel(1, 0, "c"), Ok(true));
        assert!(!directed.has_channel(1, 1, "c"));
    }

    #[test]
    fn duplicate_channels() {
        for directed in [true, false] {
            let mut graph = ArchGraph::new(directed);
            graph.add_processors(10, "p");
            for pe in (0..10).step_by(2) {
                for _ in 0..2 {
                    graph.add_channel(pe, pe, "L1").unwrap();
                    graph.add_channel(pe, pe, "L2").unwrap();
                    graph.add_channel(pe, pe + 1, "c").unwrap();
                    graph.add_channel(pe + 1, pe, "c").unwrap();
                }
            }
            assert_eq!(graph.num_channels(), if directed { 20 } else { 15 });
            assert_eq!(graph.processor_types().into_iter().sorted().collect_vec(), vec!["p", "p%L1%L2"]);
            assert_eq!(graph.channel_types().into_iter().sorted().collect_vec(), vec!["L1", "L2", "c"]);
            assert_eq!(graph.processor_type(1), Ok("p"));
        }
    }

    #[test]
    fn fully_connected() {
        let undirected = ram_graph(false, 10);
        assert_eq!(undirected.num_channels(), 45);
        assert_eq!(undirected.num_automorphisms(), factorial(10));
        let directed = ram_graph(true, 10);
        assert_eq!(directed.num_channels(), 90);
        assert_eq!(directed.num_automorphisms(), factorial(10));
    }

    #[test]
    fn self_channels() {
        for directed in [true, false] {
            let mut graph = ram_graph(directed, 10);
            assert_eq!(graph.self_connect("L1"), 10);
            assert_eq!(graph.num_automorphisms(), factorial(10));

            let mut graph = ram_graph(directed, 20);
            graph.self_connect_subset(&(0..10).collect_vec(), "L1").unwrap();
            graph.self_connect_subset(&(10..20).collect_vec(), "L2").unwrap();
            assert_eq!(graph.num_automorphisms(), factorial(10).pow(2));

            let mut graph = ram_graph(directed, 30);
            let caches = ["L1", "L2", "L3"].into_iter().permutations(3).cycle();
            for (pe, caches) in (0..30).zip(caches) {
                for cache in caches {
                    graph.add_channel(pe, pe, cache).unwrap();
                }
            }
            assert_eq!(graph.num_automorphisms(), factorial(30));
        }
    }

    #[test]
    fn typed_processors() {
        let mut graph = ArchGraph::new(false);
        graph.add_processors(3, "big");
        graph.add_processors(2, "little");
        assert_eq!(graph.fully_connect_processors("big", "cache"), 3);
        assert_eq!(graph.self_connect_processors("little", "L1"), 2);
        assert_eq!(graph.fully_connect_processors("none", "cache"), 0);
        assert_eq!(graph.num_automorphisms(), BigUint::from(12u32));
        assert_eq!(graph.processor_types(), vec!["big", "little%L1"]);
    }

    #[test]
    fn processor_labels_do_not_imitate_self_channels() {
        let mut graph = ArchGraph::new(false);
        graph.add_processor("p%L1");
        graph.add_processor("p");
        graph.add_channel(1, 1, "L1").unwrap();
        assert_eq!(graph.num_automorphisms(), BigUint::from(1u32));

        let mut same = ArchGraph::new(false);
        same.add_processors(2, "p");
        same.self_connect("L1");
        assert_eq!(same.num_automorphisms(), BigUint::from(2u32));
    }

    #[test]
    fn generated_topologies() {
        let complete = ArchGraph::fully_connected(5, "p", "c");
        assert_eq!(complete.num_channels(), 10);
        assert_eq!(complete.num_automorphisms(), factorial(5));

        let mesh = ArchGraph::regular_mesh(8, 8, "p", "c");
        assert_eq!(mesh.num_processors(), 64);
        assert_eq!(mesh.num_channels(), 112);
        assert_eq!(mesh.num_automorphisms(), BigUint::from(8u32));
        assert!(mesh.has_channel(9, 17, "c"));
        assert!(!mesh.has_channel(7, 8, "c"));
        assert_eq!(ArchGraph::regular_mesh(5, 3, "p", "c").num_automorphisms(), BigUint::from(4u32));

        let torus = ArchGraph::hyper_mesh(4, 4, "p", "c");
        assert_eq!(torus.num_channels(), 32);
        assert!(torus.has_channel(0, 3, "c"));
        assert!(torus.has_channel(12, 0, "c"));
        assert_eq!(torus.num_automorphisms(), BigUint::from(384u32));

        let ring = ArchGraph::hyper_mesh(6, 1, "p", "c");
        assert_eq!(ring.num_channels(), 6);
        assert_eq!(ring.num_automorphisms(), BigUint::from(12u32));
    }

    #[test]
    fn multi_channel_automorphisms() {
        assert_eq!(ram_graph(true, 4).num_automorphisms(), factorial(4));
        assert_eq!(ram_graph(false, 4).num_automorphisms(), factorial(4));
        assert_eq!(ring(4, true, false).num_automorphisms(), BigUint::from(4u32));
        assert_eq!(ring(4, true, true).num_automorphisms(), BigUint::from(8u32));
        assert_eq!(ring(4, false, false).num_automorphisms(), BigUint::from(8u32));
    }

    #[test]
    fn plain_cycles() {
        let cycle = [(0, vec![1]), (1, vec![2]), (2, vec![3]), (3, vec![0])];
        let directed = ArchGraph::from_adjacency(4, cycle.clone(), true).unwrap();
        assert_eq!(directed.num_automorphisms(), BigUint::from(4u32));
        let both_ways = ArchGraph::from_adjacency(4, cycle.into_iter().chain(
            [(1, vec![0]), (2, vec![1]), (3, vec![2]), (0, vec![3])]), true).unwrap();
        assert_eq!(both_ways.num_automorphisms(), BigUint::from(8u32));
    }

    #[test]
    fn random_halves_of_self_channels() {
        for seed in 0..5 {
            let mut processors = (0..10).collect_vec();
            processors.shuffle(&mut Pcg64Mcg::seed_from_u64(seed));
            let mut graph = ArchGraph::new(false);
            graph.add_processors(10, "p");
            graph.self_connect_subset(&processors[..5], "L1").unwrap();
            graph.self_connect_subset(&processors[5..], "L2").unwrap();
            assert_eq!(graph.num_automorphisms(), factorial(5).pow(2));
        }
    }

    #[test]
    fn automorphisms_preserve_channels() {
        let graph = ring(6, true, false);
        let group = graph.automorphisms();
        for g in group.elements() {
            for (source, target, ty) in graph.channels() {
                assert!(graph.has_channel(&g * source, &g * target, ty));
            }
        }
        assert!(!group.contains(&Perm::create_swap(6, 0, 1)));
    }

    #[test]
    fn mutation_invalidates_automorphisms() {
        let mut graph = ram_graph(false, 4);
        assert_eq!(graph.num_automorphisms(), factorial(4));
        graph.add_channel(0, 1, "c").unwrap();
        assert_eq!(graph.num_automorphisms(), BigUint::from(4u32));
        graph.add_processor("p");
        assert_eq!(graph.automorphisms().degree(), 5);
    }

    #[test]
    fn backends_agree() {
        for graph in [ring(5, true, false), ring(5, false, false), ram_graph(true, 4)] {
            let search = graph.automorphisms_with(&Backend::Search);
            assert_eq!(search, graph.automorphisms_with(&BruteForce));
            let cached = with_automorphisms_backend(Backend::BruteForce, || graph.automorphisms().clone());
            assert_eq!(cached, search);
        }
    }

    #[test]
    fn from_adjacency() {
        let path = ArchGraph::from_adjacency(4, [(0, vec![1]), (1, vec![2]), (2, vec![3])], false).unwrap();
        assert_eq!(path.num_channels(), 3);
        assert_eq!(path.num_automorphisms(), BigUint::from(2u32));
        assert!(matches!(ArchGraph::from_adjacency(2, [(0, vec![2])], true), Err(Error::InvalidGraph(_))));
    }

    #[test]
    fn records() {
        let graph = ring(4, true, false);
        let record = graph.to_record();
        assert_eq!(record.processors.len(), 4);
        assert_eq!(record.channels.len(), graph.num_channels());
        let restored = ArchGraph::from_record(&record).unwrap();
        assert_eq!(restored.to_record(), record);
        assert_eq!(restored.num_automorphisms(), graph.num_automorphisms());

        let mut broken = record.clone();
        broken.channels[0].target = 7;
        assert!(matches!(ArchGraph::from_record(&broken), Err(Error::Deserialization(_))));
    }

    #[test]
    fn display() {
        let mut graph = ArchGraph::new(true);
        graph.add_processors(2, "p");
        graph.add_channel(0, 1, "c").unwrap();
        assert_eq!(graph.to_string(), "directed architecture graph, 2 processors, 1 channels\n  0: p\n  1: p\n  0 -> 1: c\nautomorphisms of degree 2, order 1: []\n");
    }
}
