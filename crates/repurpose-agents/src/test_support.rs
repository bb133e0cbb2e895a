//! Scripted mock agents for exercising the orchestrator and pipeline
//! without a reference store or external programs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use repurpose_models::agent_message::{AgentKind, AgentRequest, AgentResponse};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::agent::EvidenceAgent;
use crate::error::AgentError;

/// What a [`MockAgent`] does when invoked.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Answer immediately.
    Succeed { confidence: Decimal, payload: Value },
    /// Answer with an empty payload after a delay.
    Delay(Duration, Decimal),
    /// Return an agent error.
    Fail(String),
    /// Never answer.
    Hang,
    /// Panic inside the agent.
    Panic,
    /// Answer with a confidence outside 0..=100.
    Malformed,
}

impl MockBehavior {
    pub fn succeed(confidence: Decimal) -> Self {
        MockBehavior::Succeed {
            confidence,
            payload: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_payload(confidence: Decimal, payload: Value) -> Self {
        MockBehavior::Succeed {
            confidence,
            payload,
        }
    }
}

pub struct MockAgent {
    name: String,
    kind: AgentKind,
    behavior: MockBehavior,
    calls: AtomicUsize,
    finished: Arc<AtomicUsize>,
}

/// Counts an invocation as finished when its future completes or is dropped.
struct FinishGuard(Arc<AtomicUsize>);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl MockAgent {
    pub fn new(kind: AgentKind, behavior: MockBehavior) -> Self {
        Self {
            name: format!("mock-{kind}"),
            kind,
            behavior,
            calls: AtomicUsize::new(0),
            finished: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Invocations that returned or whose future was dropped mid-flight.
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    fn respond(&self, confidence: Decimal, payload: Value) -> AgentResponse {
        AgentResponse {
            agent_name: self.name.clone(),
            confidence,
            summary: format!("Mock {} evidence", self.kind),
            payload,
            sources: vec![format!("mock_{}", self.kind)],
        }
    }
}

#[async_trait]
impl EvidenceAgent for MockAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AgentKind {
        self.kind
    }

    async fn invoke(&self, _request: &AgentRequest) -> Result<AgentResponse, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _guard = FinishGuard(Arc::clone(&self.finished));
        match &self.behavior {
            MockBehavior::Succeed {
                confidence,
                payload,
            } => Ok(self.respond(*confidence, payload.clone())),
            MockBehavior::Delay(delay, confidence) => {
                tokio::time::sleep(*delay).await;
                Ok(self.respond(*confidence, Value::Object(serde_json::Map::new())))
            }
            MockBehavior::Fail(reason) => Err(AgentError::Command(reason.clone())),
            MockBehavior::Hang => {
                std::future::pending::<()>().await;
                Err(AgentError::Command("unreachable".to_string()))
            }
            MockBehavior::Panic => panic!("mock agent {} panicked", self.name),
            MockBehavior::Malformed => Ok(self.respond(
                Decimal::from(150),
                Value::Object(serde_json::Map::new()),
            )),
        }
    }
}
