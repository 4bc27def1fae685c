use ontology::Ontology;
use serde_json::json;

use crate::schema::ResolvedEntity;

/// System prompt for the per-chunk relevance decision. The full ontology
/// vocabulary is embedded so the model can ground its answer.
pub fn filter_system_prompt(ontology: &Ontology) -> String {
    let classes = ontology.class_names().join(", ");
    let relations = ontology.relation_names().join(", ");
    format!(
        r#"You are an expert in supply chain knowledge extraction. Decide whether the following text is relevant to a supply-chain knowledge graph.

The graph covers these entity types: {classes}.
And these relation types: {relations}.

A text is RELEVANT if it mentions any of those entity types taking part in any of those relations. Text that only covers unrelated events, finance-only news, politics, or other non-supply-chain content is NOT relevant.

Examples:
[Example 1]
Text: "Toyota sources batteries from Panasonic in Japan. The two companies also co-hosted a sports event last year."
Output: {{"relevant": true, "rationale": "supplier-buyer relation between Toyota and Panasonic"}}

[Example 2]
Text: "Tim Cook gave a keynote speech at a university."
Output: {{"relevant": false, "rationale": "no supply chain entities or relations"}}

OUTPUT FORMAT (CRITICAL):
Return a single valid JSON object: {{"relevant": <true|false>, "rationale": "<short reason>"}}. No markdown, no explanations outside the JSON."#
    )
}

/// System prompt for relation extraction over a fixed vocabulary.
pub fn relation_system_prompt(ontology: &Ontology) -> String {
    let vocabulary = ontology.relation_names().join(", ");
    let definitions: String = ontology
        .relations
        .iter()
        .map(|r| {
            format!(
                "- {}: links a {} (subject) to a {} (object).\n",
                r.name,
                r.subject_classes.join("/"),
                r.object_classes.join("/")
            )
        })
        .collect();
    format!(
        r#"You are an expert in Relation Extraction. You will be given a text snippet and a predefined list of entities found within that text. Extract relationships between different entities from that list.

# Relation Extraction
Extract ONLY the following relationships, strictly complying with these definitions:
{definitions}
Synonyms map onto the vocabulary: "manufactures", "produces" and "fabricates" all represent "produces"; "headquartered in" and "operates in" represent "locatedIn"; "supplies", "provides" and "delivers" represent "suppliesTo".

# Rules
- Allowed relation labels: {vocabulary}. Use them verbatim.
- The subject and object MUST be entities from the provided list. Each entry gives the entity's surface form as written in the text and its canonical name; use either spelling verbatim.
- Maintain entity consistency: always use the most complete identifier from the list.

# OUTPUT FORMAT (CRITICAL):
- Return a single valid JSON object with one key: "relations".
- The value MUST be a list of triples: ["subject", "predicate", "object"].
- Example: {{"relations": [["Toyota", "produces", "hybrid vehicles"], ["TSMC", "suppliesTo", "Qualcomm"]]}}
- If no valid relations are found, return {{"relations": []}}."#
    )
}

/// User payload for relation extraction: the chunk text plus each entity's
/// surface form and canonical label.
pub fn relation_user_content(chunk_text: &str, entities: &[ResolvedEntity]) -> String {
    let entity_list: Vec<serde_json::Value> = entities
        .iter()
        .map(|e| {
            json!({
                "surface": e.mention.surface,
                "canonical": e.canonical_label,
            })
        })
        .collect();
    json!({
        "text": chunk_text,
        "entities": entity_list,
    })
    .to_string()
}
