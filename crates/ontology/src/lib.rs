pub mod error;
pub mod schema;

pub use error::ConfigurationError;
pub use schema::{Endpoint, Ontology, OntologyClass, RelationSchema};
