//! Outbound ports - interfaces the application requires from external systems

mod llm_port;
mod repository_port;

pub use llm_port::{EnvelopeContext, IntentContext, LlmPort};
pub use repository_port::{MemoryRepositoryPort, NarrativeRepositoryPort, ProjectRepositoryPort};
