//! End-to-end extraction against real back-ends: a local Ollama model for
//! filtering and relation extraction, an HTTP NER sidecar for tagging, and
//! the public Wikidata API for entity linking.
//!
//! Run with: cargo run -p pipeline --example run_extraction

use extract::TextChunk;
use ontology::Ontology;
use pipeline::{Pipeline, RunConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let pipeline = Pipeline::from_config(RunConfig::default(), Ontology::supply_chain())?;

    let chunks = vec![
        TextChunk::new(
            "news-2024-03-12",
            "Toyota sources batteries from Panasonic in Japan. \
             The two companies also co-hosted a sports event last year.",
        ),
        TextChunk::new(
            "news-2024-03-13",
            "Apple partners with TSMC to manufacture advanced chips in Taiwan.",
        ),
    ];

    let outcome = pipeline.run(chunks).await;

    println!("{}", outcome.graph.to_json_pretty()?);
    println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    Ok(())
}
