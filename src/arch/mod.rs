//! Architectures of multiprocessor systems and their automorphism groups.

use crate::error::{Error, Result};
use crate::group::PermutationGroup;
use crate::mapping::{Orbit, ReprOptions, TaskMapping};
use crate::TaskOrbits;
use crate::perm::Perm;
use crate::{mapping, ArchCluster, ArchGraph, ArchSuperGraph};
use canonical::CanonicalForm;
use itertools::Itertools;
use num_bigint::BigUint;

pub mod automorphisms;
pub mod canonical;
pub mod cluster;
pub mod colored;
pub mod graph;
#[cfg(feature = "nauty")]
pub mod nauty;
pub mod super_graph;

/// A system of processors whose symmetries act on processor indices 0..num_processors().
pub trait ArchSystem {
    fn num_processors(&self) -> usize;

    fn num_channels(&self) -> usize;

    /// Computed on first use, then cached until the system is mutated.
    fn automorphisms(&self) -> &PermutationGroup;

    fn to_canonical_form(&self) -> CanonicalForm;

    fn num_automorphisms(&self) -> BigUint {
        self.automorphisms().order()
    }

    /// All task mappings equivalent to the given one.
    fn orbit(&self, mapping: &[usize]) -> Result<Orbit<'_>> {
        mapping::orbit(self.automorphisms(), mapping)
    }

    /// Lexicographically smallest task mapping equivalent to the given one.
    fn representative(&self, mapping: &[usize], options: &ReprOptions) -> Result<TaskMapping> {
        mapping::representative(self.automorphisms(), mapping, options)
    }

    /// Representative that is also recorded in `orbits`.
    fn representative_in(&self, mapping: &[usize], orbits: &mut TaskOrbits, options: &ReprOptions) -> Result<TaskMapping> {
        mapping::representative_in(self.automorphisms(), mapping, orbits, options)
    }

    fn equivalent(&self, a: &[usize], b: &[usize], options: &ReprOptions) -> Result<bool> {
        mapping::equivalent(self.automorphisms(), a, b, options)
    }

    /// The same system reduced to its automorphism group.
    fn expand_automorphisms(&self) -> Architecture {
        Architecture::Automorphisms(self.automorphisms().clone())
    }
}

/// Any architecture, as restored from a canonical form.
#[derive(Clone, Debug)]
pub enum Architecture {
    Graph(ArchGraph),
    SuperGraph(ArchSuperGraph),
    Cluster(ArchCluster),
    Automorphisms(PermutationGroup),
}

impl Architecture {
    pub fn from_canonical_form(form: &CanonicalForm) -> Result<Self> {
        Ok(match form {
            CanonicalForm::Graph(record) => Self::Graph(ArchGraph::from_record(record)?),
            CanonicalForm::SuperGraph { super_graph, proto } => Self::SuperGraph(
                ArchSuperGraph::new(ArchGraph::from_record(super_graph)?, ArchGraph::from_record(proto)?).
                    map_err(|e| Error::Deserialization(e.to_string()))?),
            CanonicalForm::Cluster(subsystems) => Self::Cluster(ArchCluster::new(
                subsystems.iter().map(Self::from_canonical_form).try_collect()?)),
            CanonicalForm::Automorphisms { degree, generators } => {
                let generators: Vec<Perm> = generators.iter().map(|g| Perm::new(g.clone())).try_collect().
                    map_err(|e: Error| Error::Deserialization(e.to_string()))?;
                Self::Automorphisms(PermutationGroup::new(*degree, generators).
                    map_err(|e| Error::Deserialization(e.to_string()))?)
            }
        })
    }

    fn system(&self) -> &dyn ArchSystem {
        match self {
            Self::Graph(g) => g,
            Self::SuperGraph(g) => g,
            Self::Cluster(c) => c,
            Self::Automorphisms(group) => group,
        }
    }
}

impl ArchSystem for Architecture {
    fn num_processors(&self) -> usize {
        self.system().num_processors()
    }

    fn num_channels(&self) -> usize {
        self.system().num_channels()
    }

    fn automorphisms(&self) -> &PermutationGroup {
        self.system().automorphisms()
    }

    fn to_canonical_form(&self) -> CanonicalForm {
        self.system().to_canonical_form()
    }
}

/// A bare automorphism group acting on processors without any channels.
impl ArchSystem for PermutationGroup {
    fn num_processors(&self) -> usize {
        self.degree()
    }

    fn num_channels(&self) -> usize {
        0
    }

    fn automorphisms(&self) -> &PermutationGroup {
        self
    }

    fn to_canonical_form(&self) -> CanonicalForm {
        CanonicalForm::Automorphisms {
            degree: self.degree(),
            generators: self.generators().iter().map(|g| g.images().to_vec()).collect(),
        }
    }
}

impl From<ArchGraph> for Architecture {
    fn from(graph: ArchGraph) -> Self { Self::Graph(graph) }
}

impl From<ArchSuperGraph> for Architecture {
    fn from(graph: ArchSuperGraph) -> Self { Self::SuperGraph(graph) }
}

impl From<ArchCluster> for Architecture {
    fn from(cluster: ArchCluster) -> Self { Self::Cluster(cluster) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::graph::DEFAULT_CHANNEL_TYPE;
    use crate::ReprMethod;

    fn haec_super_graph() -> ArchSuperGraph {
        let mut clusters = ArchGraph::new(false);
        clusters.add_processors(4, "cluster");
        for i in 0..3 {
            clusters.add_channel(i, i + 1, "wireless").unwrap();
        }
        let mut boards = ArchGraph::new(false);
        boards.add_processors(16, "board");
        for i in 0..16 {
            if i % 4 < 3 {
                boards.add_channel(i, i + 1, "optical").unwrap();
            }
            if i < 12 {
                boards.add_channel(i, i + 4, "optical").unwrap();
            }
        }
        ArchSuperGraph::new(clusters, boards).unwrap()
    }

    #[test]
    fn haec() {
        let haec = haec_super_graph();
        assert_eq!(haec.num_processors(), 64);
        assert_eq!(haec.num_channels(), 864);
        assert_eq!(haec.num_automorphisms(), BigUint::from(8192u32));

        let orbit1 = [[0, 1, 2, 3], [0, 4, 8, 12], [3, 2, 1, 0], [3, 7, 11, 15], [12, 8, 4, 0], [12, 13, 14, 15],
            [15, 11, 7, 3], [15, 14, 13, 12], [48, 49, 50, 51], [48, 52, 56, 60], [51, 50, 49, 48], [51, 55, 59, 63],
            [60, 56, 52, 48], [60, 61, 62, 63], [63, 59, 55, 51], [63, 62, 61, 60]].map(|t| t.to_vec());
        let orbit2 = [[0, 3, 12, 15], [0, 12, 3, 15], [3, 0, 15, 12], [3, 15, 0, 12], [12, 0, 15, 3], [12, 15, 0, 3],
            [15, 3, 12, 0], [15, 12, 3, 0], [48, 51, 60, 63], [48, 60, 51, 63], [51, 48, 63, 60], [51, 63, 48, 60],
            [60, 48, 63, 51], [60, 63, 48, 51], [63, 51, 60, 48], [63, 60, 51, 48]].map(|t| t.to_vec());
        for expected in [orbit1, orbit2] {
            let orbit = haec.orbit(&expected[0]).unwrap().sorted().collect_vec();
            assert_eq!(orbit, expected.to_vec());
            for method in [ReprMethod::Iterate, ReprMethod::Orbit] {
                let options = ReprOptions::with_method(method);
                for mapping in &expected {
                    assert_eq!(haec.representative(mapping, &options).unwrap(), expected[0]);
                }
            }
        }
    }

    #[test]
    fn haec_task_orbits() {
        let haec = haec_super_graph();
        let mut orbits = TaskOrbits::new();
        let options = ReprOptions::default();
        assert_eq!(haec.representative_in(&[63, 62, 61, 60], &mut orbits, &options).unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(haec.representative_in(&[12, 8, 4, 0], &mut orbits, &options).unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(haec.representative_in(&[15, 3, 12, 0], &mut orbits, &options).unwrap(), vec![0, 3, 12, 15]);
        assert_eq!(orbits.num_orbits(), 2);
        assert_eq!(orbits.class_id(&[0, 3, 12, 15]), Some(1));
    }

    #[test]
    fn haec_from_adjacency() {
        let super_graph = ArchGraph::from_adjacency(4, [(0, vec![1]), (1, vec![2]), (2, vec![3])], false).unwrap();
        let proto = ArchGraph::from_adjacency(16, [
            (0, vec![1, 4]), (1, vec![2, 5]), (2, vec![3, 6]), (3, vec![7]), (4, vec![5, 8]), (5, vec![6, 9]),
            (6, vec![7, 10]), (7, vec![11]), (8, vec![9, 12]), (9, vec![10, 13]), (10, vec![11, 14]), (11, vec![15]),
            (12, vec![13]), (13, vec![14]), (14, vec![15])], false).unwrap();
        assert_eq!(proto.channel_types(), vec![DEFAULT_CHANNEL_TYPE]);
        let haec = ArchSuperGraph::new(super_graph, proto).unwrap();
        assert_eq!(*haec.automorphisms(), *haec_super_graph().automorphisms());
    }

    #[test]
    fn canonical_form_round_trip() {
        let mut cluster = ArchCluster::default();
        cluster.add_subsystem(haec_super_graph().into());
        let mut ring = ArchGraph::new(true);
        ring.add_processors(3, "p");
        for i in 0..3 {
            ring.add_channel(i, (i + 1) % 3, "c").unwrap();
        }
        cluster.add_subsystem(ring.clone().into());
        cluster.add_subsystem(ring.expand_automorphisms());
        let system = Architecture::from(cluster);

        let form = system.to_canonical_form();
        let json = serde_json::to_string(&form).unwrap();
        let parsed: CanonicalForm = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, form);
        let restored = Architecture::from_canonical_form(&parsed).unwrap();
        assert_eq!(restored.to_canonical_form(), form);
        assert_eq!(restored.num_processors(), 70);
        assert_eq!(restored.num_channels(), 864 + 3);
        assert_eq!(restored.num_automorphisms(), BigUint::from(8192u32 * 3 * 3));
        assert_eq!(*restored.automorphisms(), *system.automorphisms());
    }

    #[test]
    fn malformed_canonical_forms() {
        let bad_generator = CanonicalForm::Automorphisms { degree: 3, generators: vec![vec![0, 0, 1]] };
        assert!(matches!(Architecture::from_canonical_form(&bad_generator), Err(Error::Deserialization(_))));
        let bad_degree = CanonicalForm::Automorphisms { degree: 3, generators: vec![vec![1, 0]] };
        assert!(matches!(Architecture::from_canonical_form(&bad_degree), Err(Error::Deserialization(_))));

        let directed = ArchGraph::new(true).to_record();
        let bad_super = CanonicalForm::SuperGraph { super_graph: directed.clone(), proto: directed };
        assert!(matches!(Architecture::from_canonical_form(&bad_super), Err(Error::Deserialization(_))));

        assert!(serde_json::from_str::<CanonicalForm>(r#"{"graph": {"directed": true}}"#).is_err());
    }

    #[test]
    fn expanded_automorphisms_behave_alike() {
        let haec = haec_super_graph();
        let expanded = haec.expand_automorphisms();
        assert_eq!(expanded.num_processors(), 64);
        assert_eq!(expanded.num_channels(), 0);
        let options = ReprOptions::default();
        let mapping = [5, 6, 5, 40];
        assert_eq!(expanded.representative(&mapping, &options), haec.representative(&mapping, &options));
    }
}
