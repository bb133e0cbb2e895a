use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::agent_message::AgentKind;

pub const INPUT_SCHEMA_VERSION: u32 = 1;

/// A repurposing question: could `drug_name` treat `condition_name`?
/// Either field may be absent; the combination decides the workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepurposingRequest {
    #[serde(default, alias = "drugName")]
    pub drug_name: Option<String>,
    #[serde(default, alias = "conditionName", alias = "target_condition")]
    pub condition_name: Option<String>,
}

impl RepurposingRequest {
    pub fn new(drug_name: Option<&str>, condition_name: Option<&str>) -> Self {
        Self {
            drug_name: drug_name.map(str::to_string),
            condition_name: condition_name.map(str::to_string),
        }
    }

    /// Trimmed drug name, `None` when absent or blank.
    pub fn drug(&self) -> Option<&str> {
        non_blank(self.drug_name.as_deref())
    }

    /// Trimmed condition name, `None` when absent or blank.
    pub fn condition(&self) -> Option<&str> {
        non_blank(self.condition_name.as_deref())
    }

    pub fn presence_mode(&self) -> PresenceMode {
        match (self.drug(), self.condition()) {
            (Some(_), Some(_)) => PresenceMode::Both,
            (Some(_), None) => PresenceMode::DrugOnly,
            (None, Some(_)) => PresenceMode::ConditionOnly,
            (None, None) => PresenceMode::Neither,
        }
    }

    /// Copy with blank fields dropped and surrounding whitespace removed.
    pub fn normalized(&self) -> Self {
        Self {
            drug_name: self.drug().map(str::to_string),
            condition_name: self.condition().map(str::to_string),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Which request fields were supplied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresenceMode {
    Both,
    DrugOnly,
    ConditionOnly,
    Neither,
}

impl PresenceMode {
    /// Agents that run for this mode, in dispatch order.
    pub fn selected_agents(self) -> BTreeSet<AgentKind> {
        let kinds: &[AgentKind] = match self {
            PresenceMode::Both => &[
                AgentKind::Literature,
                AgentKind::Trials,
                AgentKind::Patents,
                AgentKind::Regulatory,
                AgentKind::Market,
            ],
            PresenceMode::DrugOnly => &[
                AgentKind::Literature,
                AgentKind::Trials,
                AgentKind::Patents,
                AgentKind::Regulatory,
            ],
            PresenceMode::ConditionOnly => {
                &[AgentKind::Literature, AgentKind::Trials, AgentKind::Market]
            }
            PresenceMode::Neither => &[AgentKind::Trend],
        };
        kinds.iter().copied().collect()
    }
}

/// How familiar the reference dataset is with the drug and condition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Knownness {
    KnownRepurposing,
    LikelyRepurposing,
    Exploratory,
    Novel,
}

impl Knownness {
    pub fn from_recognition(drug_known: bool, condition_known: bool) -> Self {
        match (drug_known, condition_known) {
            (true, true) => Knownness::KnownRepurposing,
            (true, false) => Knownness::LikelyRepurposing,
            (false, true) => Knownness::Exploratory,
            (false, false) => Knownness::Novel,
        }
    }

    /// 2 (lowest) to 5 (highest).
    pub fn priority(self) -> u8 {
        match self {
            Knownness::KnownRepurposing => 5,
            Knownness::LikelyRepurposing => 4,
            Knownness::Exploratory => 3,
            Knownness::Novel => 2,
        }
    }

    pub fn estimated_analysis(self) -> &'static str {
        match self {
            Knownness::KnownRepurposing => "1-2 minutes",
            Knownness::LikelyRepurposing => "2-3 minutes",
            Knownness::Exploratory => "3-5 minutes",
            Knownness::Novel => "5-10 minutes",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LookupEntity {
    Drug,
    Condition,
}

/// Non-fatal conditions surfaced next to the result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Advisory {
    /// Reference lookup failed; the entity was treated as unfamiliar.
    ClassificationDegraded { entity: LookupEntity, reason: String },
    AgentTimedOut { kind: AgentKind, after_ms: u64 },
    AgentFailed { kind: AgentKind, reason: String },
}

/// Classification of a request along two independent axes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Case {
    /// The request with blank fields dropped.
    pub request: RepurposingRequest,
    pub presence_mode: PresenceMode,
    pub knownness: Knownness,
    pub priority: u8,
    pub selected_agents: BTreeSet<AgentKind>,
    pub estimated_analysis: String,
    #[serde(default)]
    pub advisories: Vec<Advisory>,
}

impl Case {
    pub fn new(request: &RepurposingRequest, drug_known: bool, condition_known: bool) -> Self {
        let request = request.normalized();
        let presence_mode = request.presence_mode();
        let knownness = Knownness::from_recognition(
            drug_known && request.drug().is_some(),
            condition_known && request.condition().is_some(),
        );

        Self {
            request,
            presence_mode,
            knownness,
            priority: knownness.priority(),
            selected_agents: presence_mode.selected_agents(),
            estimated_analysis: knownness.estimated_analysis().to_string(),
            advisories: Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.advisories
            .iter()
            .any(|a| matches!(a, Advisory::ClassificationDegraded { .. }))
    }
}
