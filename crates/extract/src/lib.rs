pub mod error;
pub mod filter;
pub mod normalize;
pub mod prompt;
pub mod relations;
pub mod resolver;
pub mod schema;

pub use error::ValidationError;
pub use filter::{FilterDecision, FilterOutcome, OntologyFilter};
pub use normalize::normalize_surface;
pub use relations::{RelationExtractor, RelationOutcome};
pub use resolver::EntityResolver;
pub use schema::{ChunkExtraction, Mention, RelationCandidate, ResolvedEntity, TextChunk};
