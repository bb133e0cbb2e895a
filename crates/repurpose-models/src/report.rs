use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent_message::{AgentKind, TrendSuggestion};
use crate::evidence::EvidenceBundle;
use crate::request::{Advisory, Case, RepurposingRequest};
use crate::score::ScoreBreakdown;
use crate::verdict::Verdict;

pub const OUTPUT_SCHEMA_VERSION: u32 = 1;

/// Which agents succeeded, timed out or failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentStatusSummary {
    pub succeeded: Vec<AgentKind>,
    pub timed_out: Vec<AgentKind>,
    pub failed: Vec<AgentKind>,
}

impl AgentStatusSummary {
    pub fn from_bundle(bundle: &EvidenceBundle) -> Self {
        Self {
            succeeded: bundle.succeeded(),
            timed_out: bundle.timed_out(),
            failed: bundle.failed(),
        }
    }
}

/// The response envelope for one analyzed request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    pub id: Uuid,
    pub schema_version: u32,
    pub request: RepurposingRequest,
    pub case: Case,
    /// Raw per-agent outcomes, for display.
    pub evidence: EvidenceBundle,
    /// Absent when no scoring dimension was active (trend-only requests).
    pub breakdown: Option<ScoreBreakdown>,
    pub verdict: Option<Verdict>,
    #[serde(default)]
    pub trends: Vec<TrendSuggestion>,
    pub agent_status: AgentStatusSummary,
    #[serde(default)]
    pub advisories: Vec<Advisory>,
    pub decided_at: DateTime<Utc>,
    pub processing_time_ms: u64,
}
