use thiserror::Error;

/// Fatal at pipeline start: a malformed ontology cannot produce a meaningful graph.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("ontology defines no entity classes")]
    NoClasses,

    #[error("ontology defines no relation types")]
    NoRelations,

    #[error("duplicate entity class '{0}'")]
    DuplicateClass(String),

    #[error("duplicate relation type '{0}'")]
    DuplicateRelation(String),

    #[error("relation '{relation}' references unknown class '{class}' at its {endpoint}")]
    UnknownEndpointClass {
        relation: String,
        class: String,
        endpoint: &'static str,
    },

    #[error("acceptance threshold {0} is not a finite non-negative number")]
    BadThreshold(f64),

    #[error("failed to parse ontology JSON: {0}")]
    Parse(#[from] serde_json::Error),
}
