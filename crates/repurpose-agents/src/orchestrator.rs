use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use repurpose_models::agent_message::{AgentKind, AgentRequest};
use repurpose_models::config::AgentsConfig;
use repurpose_models::evidence::{AgentOutcome, AgentTask, EvidenceBundle};
use repurpose_models::request::{Advisory, Case};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agent::EvidenceAgent;
use crate::error::{AgentError, PipelineError};
use crate::parser::normalize_response;

/// Fans a case out to its selected agents and joins whatever comes back.
///
/// Holds no per-request state; one instance serves concurrent requests.
pub struct Orchestrator {
    agents: BTreeMap<AgentKind, Arc<dyn EvidenceAgent>>,
    config: AgentsConfig,
}

impl Orchestrator {
    /// Registers one agent per kind. Later agents for an already registered kind are ignored.
    pub fn new(agents: Vec<Arc<dyn EvidenceAgent>>, config: AgentsConfig) -> Self {
        let mut registered: BTreeMap<AgentKind, Arc<dyn EvidenceAgent>> = BTreeMap::new();
        for agent in agents {
            let kind = agent.kind();
            if let Some(existing) = registered.get(&kind) {
                warn!(kind = %kind, kept = %existing.name(), ignored = %agent.name(), "Duplicate agent for kind");
                continue;
            }
            registered.insert(kind, agent);
        }
        Self {
            agents: registered,
            config,
        }
    }

    pub fn registered_kinds(&self) -> Vec<AgentKind> {
        self.agents.keys().copied().collect()
    }

    /// Run every selected agent concurrently and return one outcome per agent.
    ///
    /// Agent failures, timeouts and panics become outcomes. The only error is
    /// cancellation, in which case all in-flight agents are aborted and dropped
    /// before returning, and no partial bundle is returned.
    pub async fn run(
        &self,
        case: &Case,
        cancel: &CancellationToken,
    ) -> Result<EvidenceBundle, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let start = Instant::now();
        let request_id = Uuid::new_v4();
        let mut builder = EvidenceBundle::builder();
        let mut join_set: JoinSet<AgentTask> = JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, (AgentKind, String)> = HashMap::new();
        let mut longest = Duration::ZERO;

        // 1. Fan out in declaration order
        for kind in case.selected_agents.iter().copied() {
            let Some(agent) = self.agents.get(&kind) else {
                warn!(agent = %kind, "No agent registered for selected kind");
                let now = Utc::now();
                builder.record(AgentTask {
                    kind,
                    agent_name: "unregistered".to_string(),
                    started_at: now,
                    deadline: now,
                    elapsed_ms: 0,
                    outcome: AgentOutcome::Failed {
                        reason: "no agent registered".to_string(),
                    },
                });
                continue;
            };

            let timeout = self.config.timeout_for(kind);
            longest = longest.max(timeout);

            let started_at = Utc::now();
            let deadline = started_at
                + chrono::Duration::from_std(timeout).unwrap_or_else(|_| chrono::Duration::zero());
            let request = AgentRequest {
                request_id,
                kind,
                drug_name: case.request.drug().map(str::to_string),
                condition_name: case.request.condition().map(str::to_string),
                deadline,
            };

            let agent = Arc::clone(agent);
            let name = agent.name().to_string();
            let handle = join_set.spawn(async move {
                let agent_start = Instant::now();
                let outcome = invoke_with_timeout(agent.as_ref(), &request, timeout).await;
                AgentTask {
                    kind,
                    agent_name: agent.name().to_string(),
                    started_at,
                    deadline,
                    elapsed_ms: agent_start.elapsed().as_millis() as u64,
                    outcome,
                }
            });
            in_flight.insert(handle.id(), (kind, name));
        }

        // 2. Fan in until every task is terminal, the overall deadline passes, or we are cancelled
        let overall = tokio::time::sleep(longest + self.config.fan_in_grace());
        tokio::pin!(overall);
        let mut deadline_hit = false;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    // Aborts every agent and waits until their futures are dropped
                    join_set.shutdown().await;
                    info!(elapsed_ms = start.elapsed().as_millis(), "Orchestration cancelled");
                    return Err(PipelineError::Cancelled);
                }
                joined = join_set.join_next() => {
                    match joined {
                        Some(Ok(task)) => {
                            in_flight.retain(|_, (kind, _)| *kind != task.kind);
                            log_outcome(&task);
                            builder.record(task);
                        }
                        Some(Err(e)) => {
                            if let Some((kind, name)) = in_flight.remove(&e.id()) {
                                error!(agent = %name, kind = %kind, error = %e, "Agent task panicked");
                                let now = Utc::now();
                                builder.record(AgentTask {
                                    kind,
                                    agent_name: name,
                                    started_at: now,
                                    deadline: now,
                                    elapsed_ms: start.elapsed().as_millis() as u64,
                                    outcome: AgentOutcome::Failed {
                                        reason: "agent task panicked".to_string(),
                                    },
                                });
                            }
                        }
                        None => break,
                    }
                }
                _ = &mut overall => {
                    deadline_hit = true;
                    join_set.abort_all();
                    warn!(pending = in_flight.len(), "Overall orchestration deadline reached");
                    break;
                }
            }
        }

        // 3. Completeness: every selected kind gets exactly one outcome
        let now = Utc::now();
        for (kind, name) in in_flight.into_values() {
            if builder.contains(kind) {
                continue;
            }
            let outcome = if deadline_hit {
                AgentOutcome::TimedOut {
                    after_ms: start.elapsed().as_millis() as u64,
                }
            } else {
                AgentOutcome::Failed {
                    reason: "agent task panicked".to_string(),
                }
            };
            builder.record(AgentTask {
                kind,
                agent_name: name,
                started_at: now,
                deadline: now,
                elapsed_ms: start.elapsed().as_millis() as u64,
                outcome,
            });
        }

        let bundle = builder.build();
        info!(
            selected = case.selected_agents.len(),
            succeeded = bundle.succeeded().len(),
            timed_out = bundle.timed_out().len(),
            failed = bundle.failed().len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Fan-in complete"
        );

        Ok(bundle)
    }
}

async fn invoke_with_timeout(
    agent: &dyn EvidenceAgent,
    request: &AgentRequest,
    timeout: Duration,
) -> AgentOutcome {
    match tokio::time::timeout(timeout, agent.invoke(request)).await {
        Ok(Ok(response)) => match normalize_response(request.kind, agent.name(), response) {
            Ok(result) => AgentOutcome::Success { result },
            Err(e) => AgentOutcome::Failed {
                reason: e.to_string(),
            },
        },
        Ok(Err(AgentError::Timeout(after_ms))) => AgentOutcome::TimedOut { after_ms },
        Ok(Err(e)) => AgentOutcome::Failed {
            reason: e.to_string(),
        },
        Err(_) => AgentOutcome::TimedOut {
            after_ms: timeout.as_millis() as u64,
        },
    }
}

fn log_outcome(task: &AgentTask) {
    match &task.outcome {
        AgentOutcome::Success { result } => {
            info!(agent = %task.agent_name, kind = %task.kind, confidence = %result.confidence, elapsed_ms = task.elapsed_ms, "Agent succeeded");
        }
        AgentOutcome::TimedOut { after_ms } => {
            warn!(agent = %task.agent_name, kind = %task.kind, after_ms, "Agent timed out");
        }
        AgentOutcome::Failed { reason } => {
            warn!(agent = %task.agent_name, kind = %task.kind, error = %reason, elapsed_ms = task.elapsed_ms, "Agent failed");
        }
    }
}

/// Advisories for every agent that did not return evidence, in kind order.
pub fn outcome_advisories(bundle: &EvidenceBundle) -> Vec<Advisory> {
    bundle
        .tasks()
        .filter_map(|task| match &task.outcome {
            AgentOutcome::Success { .. } => None,
            AgentOutcome::TimedOut { after_ms } => Some(Advisory::AgentTimedOut {
                kind: task.kind,
                after_ms: *after_ms,
            }),
            AgentOutcome::Failed { reason } => Some(Advisory::AgentFailed {
                kind: task.kind,
                reason: reason.clone(),
            }),
        })
        .collect()
}
