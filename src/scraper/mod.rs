pub mod descriptor;
pub mod fields;
pub mod normalizer;
pub mod provider;
pub mod row;
pub mod search;

// Re-export commonly used types
pub use descriptor::FieldPipeline;
pub use normalizer::normalize;
pub use provider::{ProviderAdapter, RowStream, SearchCapability, SearchParams, Site};
pub use row::RawRow;
pub use search::SnapshotSearch;
