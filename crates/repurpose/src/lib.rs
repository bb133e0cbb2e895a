//! Drug repurposing evidence orchestration.
//!
//! Classifies a drug/condition question, fans it out to evidence agents,
//! scores what comes back and decides a Go/No-Go verdict.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use repurpose::models::{RepurposeConfig, RepurposingRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let pipeline = repurpose::build_pipeline(&RepurposeConfig::default())?;
//! let request = RepurposingRequest::new(Some("Metformin"), Some("PCOS"));
//! let report = pipeline.analyze(&request, &CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub use repurpose_agents as agents;
pub use repurpose_models as models;
pub use repurpose_reference as reference;

use std::sync::Arc;

use anyhow::Context;
use repurpose_agents::{
    CaseClassifier, CommandAgent, DecisionEngine, EvidenceAgent, Orchestrator, PipelineError,
    ReferenceAgent, RepurposePipeline, ScoringEngine,
};
use repurpose_models::config::{AgentSource, RepurposeConfig};
use repurpose_reference::ReferenceReader;
use tracing::info;

/// Build a pipeline from configuration.
///
/// Validates the configuration, opens the reference store and instantiates
/// one agent per enabled source.
pub fn build_pipeline(config: &RepurposeConfig) -> anyhow::Result<RepurposePipeline> {
    config
        .validate()
        .map_err(PipelineError::from)
        .context("Invalid configuration")?;

    let reader = Arc::new(ReferenceReader::open(&config.reference).with_context(|| {
        format!(
            "Failed to open reference store: {}",
            config.reference.sqlite_path
        )
    })?);

    let agents: Vec<Arc<dyn EvidenceAgent>> = config
        .agents
        .enabled_sources()
        .map(|source| match &source.source {
            AgentSource::Reference => Arc::new(ReferenceAgent::new(
                &source.name,
                source.kind,
                Arc::clone(&reader),
            )) as Arc<dyn EvidenceAgent>,
            AgentSource::Command { program, args } => Arc::new(CommandAgent::new(
                &source.name,
                source.kind,
                program,
                args.clone(),
            )) as Arc<dyn EvidenceAgent>,
        })
        .collect();

    info!(
        agents = agents.len(),
        reference = %config.reference.sqlite_path,
        "Pipeline built"
    );

    Ok(RepurposePipeline::new(
        CaseClassifier::new(reader, config.reference.lookup_timeout()),
        Orchestrator::new(agents, config.agents.clone()),
        ScoringEngine::new(&config.scoring),
        DecisionEngine::new(&config.decision),
    ))
}
