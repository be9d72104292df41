mod error;
mod fragment;
mod graph;
mod load;
mod manifest;
mod table;

pub use fragment::{FRAGMENT_NOT_FOUND, FragmentLoader, FragmentState};
pub use graph::{DEFAULT_CLUSTER, DocumentNode, KnowledgeGraph, NodeContent};
pub use load::{Ingestion, SourceSet, ingest};
