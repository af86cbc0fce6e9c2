//! Retrieval orchestration: local vector search with a similarity threshold,
//! web fallback when nothing local qualifies, and context composition.

mod capabilities;
mod compose;
mod instrument;
mod local;
mod orchestrator;

pub use capabilities::{Capabilities, CapabilitySet};
pub use compose::{preview, ContextComposer, ContextLimits, ContextSize};
pub use instrument::{Instrumented, QueryMetrics, QueryService};
pub use local::{LocalRetrieval, LocalRetriever};
pub use orchestrator::{OrchestratorStats, RetrievalOrchestrator, StrategyDistribution};

pub use intellisearch_core::config::{RetrievalSettings, SettingsUpdate};
pub use intellisearch_web::{WebFallbackOutcome, WebFallbackRetriever};
