//! Disjoint unions of architectures.

use crate::arch::canonical::CanonicalForm;
use crate::arch::{ArchSystem, Architecture};
use crate::group::PermutationGroup;
use std::sync::OnceLock;
use tracing::debug;

/// Independent subsystems side by side. Processors are numbered subsystem by subsystem,
/// in insertion order. Automorphisms never move processors between subsystems.
#[derive(Clone, Debug, Default)]
pub struct ArchCluster {
    subsystems: Vec<Architecture>,
    automorphisms: OnceLock<PermutationGroup>,
}

impl ArchCluster {
    pub fn new(subsystems: Vec<Architecture>) -> Self {
        Self { subsystems, automorphisms: OnceLock::new() }
    }

    pub fn add_subsystem(&mut self, subsystem: Architecture) {
        self.subsystems.push(subsystem);
        self.automorphisms = OnceLock::new();
    }

    pub fn subsystems(&self) -> &[Architecture] {
        &self.subsystems
    }

    pub fn num_subsystems(&self) -> usize {
        self.subsystems.len()
    }
}

impl ArchSystem for ArchCluster {
    fn num_processors(&self) -> usize {
        self.subsystems.iter().map(Architecture::num_processors).sum()
    }

    fn num_channels(&self) -> usize {
        self.subsystems.iter().map(Architecture::num_channels).sum()
    }

    fn automorphisms(&self) -> &PermutationGroup {
        self.automorphisms.get_or_init(|| {
            let groups = self.subsystems.iter().map(|s| s.automorphisms().clone()).collect::<Vec<_>>();
            let out = PermutationGroup::direct_product(&groups);
            debug!(subsystems = groups.len(), order = %out.order(), "Cluster automorphisms");
            out
        })
    }

    fn to_canonical_form(&self) -> CanonicalForm {
        CanonicalForm::Cluster(self.subsystems.iter().map(Architecture::to_canonical_form).collect())
    }
}
