pub mod metadata;
pub mod query;

pub use metadata::{MetadataService, SchemaOverview};
pub use query::{QueryService, StatementOutcome};
