pub mod arch;
pub mod error;
pub mod group;
pub mod mapping;
pub mod perm;

pub use arch::automorphisms::{with_automorphisms_backend, AutomorphismBackend, Backend};
pub use arch::canonical::CanonicalForm;
pub use arch::cluster::ArchCluster;
pub use arch::graph::ArchGraph;
pub use arch::super_graph::ArchSuperGraph;
pub use arch::{ArchSystem, Architecture};
pub use error::{Error, Result};
pub use group::PermutationGroup;
pub use mapping::task_orbits::TaskOrbits;
pub use mapping::{LocalSearchVariant, ReprMethod, ReprOptions, TaskMapping};
pub use perm::Perm;
