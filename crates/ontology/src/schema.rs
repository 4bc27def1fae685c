use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::ConfigurationError;

/// An entity class in the domain ontology, e.g. "Company".
///
/// `coarse_types` lists the mention-tagger labels (ORG, LOC, ...) that may
/// instantiate this class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OntologyClass {
    pub name: String,
    #[serde(default)]
    pub coarse_types: Vec<String>,
}

/// A relation type with its allowed endpoint classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationSchema {
    pub name: String,
    pub subject_classes: Vec<String>,
    pub object_classes: Vec<String>,
}

/// The fixed set of entity and relation types valid for one extraction run.
///
/// Loaded once at pipeline start and read-only afterwards. `coarse_type_compat`
/// maps a tagger coarse type to the knowledge-base types an entity link may
/// carry; a coarse type absent from the table is never linked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ontology {
    pub classes: Vec<OntologyClass>,
    pub relations: Vec<RelationSchema>,
    #[serde(default)]
    pub coarse_type_compat: BTreeMap<String, BTreeSet<String>>,
}

impl Ontology {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        let ontology: Ontology = serde_json::from_str(json)?;
        ontology.validate()?;
        Ok(ontology)
    }

    /// The built-in automotive supply-chain ontology.
    pub fn supply_chain() -> Self {
        let compat = |coarse: &str, kb: &[&str]| {
            (
                coarse.to_string(),
                kb.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
            )
        };
        Self {
            classes: vec![
                OntologyClass {
                    name: "Company".into(),
                    coarse_types: vec!["ORG".into()],
                },
                OntologyClass {
                    name: "Product".into(),
                    coarse_types: vec!["MISC".into(), "PROD".into()],
                },
                OntologyClass {
                    name: "Location".into(),
                    coarse_types: vec!["LOC".into(), "GPE".into()],
                },
            ],
            relations: vec![
                RelationSchema {
                    name: "produces".into(),
                    subject_classes: vec!["Company".into()],
                    object_classes: vec!["Product".into()],
                },
                RelationSchema {
                    name: "locatedIn".into(),
                    subject_classes: vec!["Company".into()],
                    object_classes: vec!["Location".into()],
                },
                RelationSchema {
                    name: "suppliesTo".into(),
                    subject_classes: vec!["Company".into()],
                    object_classes: vec!["Company".into()],
                },
            ],
            coarse_type_compat: BTreeMap::from([
                compat("ORG", &["organization"]),
                compat("LOC", &["location"]),
                compat("GPE", &["location"]),
                compat("PER", &["person"]),
                compat(
                    "MISC",
                    &["organization", "product", "location", "unknown"],
                ),
                compat("PROD", &["product", "unknown"]),
            ]),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.classes.is_empty() {
            return Err(ConfigurationError::NoClasses);
        }
        if self.relations.is_empty() {
            return Err(ConfigurationError::NoRelations);
        }

        let mut class_names = BTreeSet::new();
        for class in &self.classes {
            if !class_names.insert(class.name.as_str()) {
                return Err(ConfigurationError::DuplicateClass(class.name.clone()));
            }
        }

        let mut relation_names = BTreeSet::new();
        for relation in &self.relations {
            if !relation_names.insert(relation.name.as_str()) {
                return Err(ConfigurationError::DuplicateRelation(relation.name.clone()));
            }
            for class in &relation.subject_classes {
                if !class_names.contains(class.as_str()) {
                    return Err(ConfigurationError::UnknownEndpointClass {
                        relation: relation.name.clone(),
                        class: class.clone(),
                        endpoint: "subject",
                    });
                }
            }
            for class in &relation.object_classes {
                if !class_names.contains(class.as_str()) {
                    return Err(ConfigurationError::UnknownEndpointClass {
                        relation: relation.name.clone(),
                        class: class.clone(),
                        endpoint: "object",
                    });
                }
            }
        }
        Ok(())
    }

    pub fn class_names(&self) -> Vec<&str> {
        self.classes.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn relation_names(&self) -> Vec<&str> {
        self.relations.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn relation(&self, name: &str) -> Option<&RelationSchema> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn has_relation(&self, name: &str) -> bool {
        self.relation(name).is_some()
    }

    /// Whether a link candidate of `kb_type` is acceptable for a mention
    /// tagged with `coarse_type`.
    pub fn is_link_compatible(&self, coarse_type: &str, kb_type: &str) -> bool {
        self.coarse_type_compat
            .get(coarse_type)
            .map(|allowed| allowed.contains(kb_type))
            .unwrap_or(false)
    }

    /// The ontology classes a tagger coarse type may instantiate.
    pub fn classes_for_coarse(&self, coarse_type: &str) -> BTreeSet<&str> {
        self.classes
            .iter()
            .filter(|c| c.coarse_types.iter().any(|t| t == coarse_type))
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Endpoint check for relation validation. An entity whose coarse type is
    /// unknown (or maps to no class) passes: the schema constrains what it
    /// can see, it does not guess.
    pub fn endpoint_allows(
        &self,
        relation: &RelationSchema,
        endpoint: Endpoint,
        coarse_type: Option<&str>,
    ) -> bool {
        let Some(coarse) = coarse_type else {
            return true;
        };
        let candidate_classes = self.classes_for_coarse(coarse);
        if candidate_classes.is_empty() {
            return true;
        }
        let allowed = match endpoint {
            Endpoint::Subject => &relation.subject_classes,
            Endpoint::Object => &relation.object_classes,
        };
        allowed
            .iter()
            .any(|class| candidate_classes.contains(class.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Subject,
    Object,
}
