//! Plain data records describing architectures, stable under serialization.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalForm {
    Graph(GraphRecord),
    SuperGraph { super_graph: GraphRecord, proto: GraphRecord },
    Cluster(Vec<CanonicalForm>),
    /// Only the automorphism group is retained.
    Automorphisms { degree: usize, generators: Vec<Vec<usize>> },
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub directed: bool,
    /// Processor type label per processor.
    pub processors: Vec<String>,
    /// Channels in insertion order.
    pub channels: Vec<ChannelRecord>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub source: usize,
    pub target: usize,
    #[serde(rename = "type")]
    pub channel_type: String,
}
