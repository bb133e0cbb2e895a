use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent_message::{AgentKind, AgentResult};

/// Terminal state of one agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgentOutcome {
    Success { result: AgentResult },
    TimedOut { after_ms: u64 },
    Failed { reason: String },
}

impl AgentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AgentOutcome::Success { .. })
    }

    pub fn result(&self) -> Option<&AgentResult> {
        match self {
            AgentOutcome::Success { result } => Some(result),
            _ => None,
        }
    }
}

/// One invocation of one agent, as recorded after it reached a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentTask {
    pub kind: AgentKind,
    pub agent_name: String,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub outcome: AgentOutcome,
}

/// Outcomes keyed by agent kind. Built once through [`EvidenceBundleBuilder`]
/// and read-only afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct EvidenceBundle {
    entries: BTreeMap<AgentKind, AgentTask>,
}

impl EvidenceBundle {
    pub fn builder() -> EvidenceBundleBuilder {
        EvidenceBundleBuilder::default()
    }

    pub fn get(&self, kind: AgentKind) -> Option<&AgentTask> {
        self.entries.get(&kind)
    }

    pub fn outcome(&self, kind: AgentKind) -> Option<&AgentOutcome> {
        self.entries.get(&kind).map(|t| &t.outcome)
    }

    pub fn result(&self, kind: AgentKind) -> Option<&AgentResult> {
        self.outcome(kind).and_then(AgentOutcome::result)
    }

    pub fn kinds(&self) -> impl Iterator<Item = AgentKind> + '_ {
        self.entries.keys().copied()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &AgentTask> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn succeeded(&self) -> Vec<AgentKind> {
        self.kinds_where(AgentOutcome::is_success)
    }

    pub fn timed_out(&self) -> Vec<AgentKind> {
        self.kinds_where(|o| matches!(o, AgentOutcome::TimedOut { .. }))
    }

    pub fn failed(&self) -> Vec<AgentKind> {
        self.kinds_where(|o| matches!(o, AgentOutcome::Failed { .. }))
    }

    fn kinds_where(&self, pred: impl Fn(&AgentOutcome) -> bool) -> Vec<AgentKind> {
        self.entries
            .iter()
            .filter(|(_, t)| pred(&t.outcome))
            .map(|(k, _)| *k)
            .collect()
    }
}

/// Write-once slots: the first outcome recorded for a kind wins.
#[derive(Debug, Default)]
pub struct EvidenceBundleBuilder {
    entries: BTreeMap<AgentKind, AgentTask>,
}

impl EvidenceBundleBuilder {
    /// Returns `false` (and drops `task`) when the slot is already filled.
    pub fn record(&mut self, task: AgentTask) -> bool {
        if self.entries.contains_key(&task.kind) {
            return false;
        }
        self.entries.insert(task.kind, task);
        true
    }

    pub fn contains(&self, kind: AgentKind) -> bool {
        self.entries.contains_key(&kind)
    }

    pub fn build(self) -> EvidenceBundle {
        EvidenceBundle {
            entries: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(kind: AgentKind, outcome: AgentOutcome) -> AgentTask {
        let now = Utc::now();
        AgentTask {
            kind,
            agent_name: format!("{kind}-agent"),
            started_at: now,
            deadline: now,
            elapsed_ms: 0,
            outcome,
        }
    }

    #[test]
    fn builder_is_write_once() {
        let mut builder = EvidenceBundle::builder();
        assert!(builder.record(task(
            AgentKind::Patents,
            AgentOutcome::TimedOut { after_ms: 40_000 }
        )));
        assert!(!builder.record(task(
            AgentKind::Patents,
            AgentOutcome::Failed {
                reason: "late".to_string()
            }
        )));
        assert!(builder.contains(AgentKind::Patents));

        let bundle = builder.build();
        assert_eq!(bundle.len(), 1);
        assert_eq!(bundle.timed_out(), vec![AgentKind::Patents]);
        assert!(bundle.failed().is_empty());
    }

    #[test]
    fn kinds_are_ordered_regardless_of_insertion() {
        let mut builder = EvidenceBundle::builder();
        builder.record(task(
            AgentKind::Market,
            AgentOutcome::Failed {
                reason: "x".to_string(),
            },
        ));
        builder.record(task(
            AgentKind::Literature,
            AgentOutcome::TimedOut { after_ms: 1 },
        ));
        let bundle = builder.build();
        assert_eq!(
            bundle.kinds().collect::<Vec<_>>(),
            vec![AgentKind::Literature, AgentKind::Market]
        );
        assert!(bundle.result(AgentKind::Market).is_none());
    }

    #[test]
    fn task_serializes_flat_status() {
        let json = serde_json::to_value(task(
            AgentKind::Trials,
            AgentOutcome::Failed {
                reason: "boom".to_string(),
            },
        ))
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "boom");
        assert_eq!(json["kind"], "trials");
    }
}
