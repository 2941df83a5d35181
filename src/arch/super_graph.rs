//! Uniform super graphs: a super graph whose vertices are each replaced by a copy of a proto graph.

use crate::arch::canonical::CanonicalForm;
use crate::arch::graph::ArchGraph;
use crate::arch::ArchSystem;
use crate::error::{Error, Result};
use crate::group::PermutationGroup;
use std::sync::OnceLock;
use tracing::debug;

/// Processor `cluster * proto.num_processors() + local` is processor `local` of the copy of
/// the proto graph that replaces super graph vertex `cluster`. A super channel between two
/// clusters stands for a channel between every processor of one and every processor of the other.
#[derive(Clone, Debug)]
pub struct ArchSuperGraph {
    super_graph: ArchGraph,
    proto: ArchGraph,
    automorphisms: OnceLock<PermutationGroup>,
}

impl ArchSuperGraph {
    /// Fails for directed super or proto graphs.
    pub fn new(super_graph: ArchGraph, proto: ArchGraph) -> Result<Self> {
        for (name, graph) in [("super", &super_graph), ("proto", &proto)] {
            if graph.is_directed() {
                return Err(Error::InvalidGraph(format!("{name} graph of a uniform super graph must be undirected")));
            }
        }
        Ok(Self { super_graph, proto, automorphisms: OnceLock::new() })
    }

    pub fn super_graph(&self) -> &ArchGraph {
        &self.super_graph
    }

    pub fn proto(&self) -> &ArchGraph {
        &self.proto
    }

    /// Equivalent plain architecture graph. Processor types are `<cluster type>/<proto type>`.
    ///
    /// A super self-channel on a cluster of `m` processors becomes the `m * (m + 1) / 2`
    /// undirected channels within that cluster, self-channels included, whereas
    /// `num_channels()` counts it as `m * m` like any other super channel. The automorphisms
    /// are the same either way.
    pub fn flatten(&self) -> Result<ArchGraph> {
        let block_len = self.proto.num_processors();
        let mut out = ArchGraph::new(false);
        for cluster in 0..self.super_graph.num_processors() {
            let cluster_type = self.super_graph.processor_type(cluster)?;
            for local in 0..block_len {
                out.add_processor(&format!("{cluster_type}/{}", self.proto.processor_type(local)?));
            }
        }
        for cluster in 0..self.super_graph.num_processors() {
            let offset = cluster * block_len;
            for (source, target, ty) in self.proto.channels() {
                out.add_channel(offset + source, offset + target, ty)?;
            }
        }
        for (a, b, ty) in self.super_graph.channels() {
            for source in a * block_len..(a + 1) * block_len {
                for target in b * block_len..(b + 1) * block_len {
                    out.add_channel(source, target, ty)?;
                }
            }
        }
        Ok(out)
    }
}

/// Automorphisms of a uniform super graph: proto automorphisms act independently within
/// each cluster, super graph automorphisms permute whole clusters.
pub fn compose_automorphisms(super_group: &PermutationGroup, proto: &PermutationGroup) -> PermutationGroup {
    let out = PermutationGroup::wreath_product(proto, super_group);
    debug!(super_order = %super_group.order(), proto_order = %proto.order(), order = %out.order(), "Super graph automorphisms");
    out
}

impl ArchSystem for ArchSuperGraph {
    fn num_processors(&self) -> usize {
        self.super_graph.num_processors() * self.proto.num_processors()
    }

    fn num_channels(&self) -> usize {
        let proto_processors = self.proto.num_processors();
        self.proto.num_channels() * self.super_graph.num_processors() +
            self.super_graph.num_channels() * proto_processors * proto_processors
    }

    fn automorphisms(&self) -> &PermutationGroup {
        self.automorphisms.get_or_init(||
            compose_automorphisms(self.super_graph.automorphisms(), self.proto.automorphisms()))
    }

    fn to_canonical_form(&self) -> CanonicalForm {
        CanonicalForm::SuperGraph { super_graph: self.super_graph.to_record(), proto: self.proto.to_record() }
    }
}
