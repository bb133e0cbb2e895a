pub mod agent;
pub mod classifier;
pub mod command;
pub mod decision;
pub mod error;
pub mod orchestrator;
pub mod parser;
pub mod pipeline;
pub mod reference_agent;
pub mod scoring;

pub mod test_support;

pub use agent::EvidenceAgent;
pub use classifier::{CaseClassifier, KnownnessLookup};
pub use command::CommandAgent;
pub use decision::DecisionEngine;
pub use error::{AgentError, PipelineError};
pub use orchestrator::{outcome_advisories, Orchestrator};
pub use pipeline::RepurposePipeline;
pub use reference_agent::ReferenceAgent;
pub use scoring::ScoringEngine;
