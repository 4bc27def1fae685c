pub mod config;
pub mod orchestrator;
pub mod report;

pub use config::{LookupConfig, RetryConfig, RunConfig, TaggerConfig};
pub use orchestrator::{CancelHandle, Pipeline, RunOutcome};
pub use report::{ChunkFailure, RunReport, Stage};
