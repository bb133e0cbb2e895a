use async_trait::async_trait;
use repurpose_models::agent_message::{AgentKind, AgentRequest, AgentResponse};

use crate::error::AgentError;

/// Uniform contract for evidence collectors. Mockable for testing.
///
/// Implementations should answer before `request.deadline`; the
/// orchestrator stops waiting at that point and drops the future.
#[async_trait]
pub trait EvidenceAgent: Send + Sync {
    fn name(&self) -> &str;
    fn kind(&self) -> AgentKind;

    async fn invoke(&self, request: &AgentRequest) -> Result<AgentResponse, AgentError>;
}
