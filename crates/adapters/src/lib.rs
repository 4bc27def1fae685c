pub mod error;
pub mod lookup;
pub mod provider;
pub mod providers;
pub mod retry;
pub mod tagger;

pub use error::{LookupError, ProviderError, TaggerError};
pub use lookup::{Candidate, CandidateLookup, WikidataLookup};
pub use provider::{CompletionProvider, ProviderConfig, ProviderKind, build_provider};
pub use retry::RetryPolicy;
pub use tagger::{HttpTagger, MentionTagger, TaggedSpan};
