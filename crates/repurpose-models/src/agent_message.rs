use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::score::Dimension;

/// Evidence domains, in dispatch order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Literature,
    Trials,
    Patents,
    Regulatory,
    Market,
    Trend,
}

impl AgentKind {
    pub const ALL: [AgentKind; 6] = [
        AgentKind::Literature,
        AgentKind::Trials,
        AgentKind::Patents,
        AgentKind::Regulatory,
        AgentKind::Market,
        AgentKind::Trend,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AgentKind::Literature => "literature",
            AgentKind::Trials => "trials",
            AgentKind::Patents => "patents",
            AgentKind::Regulatory => "regulatory",
            AgentKind::Market => "market",
            AgentKind::Trend => "trend",
        }
    }

    /// The scoring dimension fed by this agent. Trend scanning feeds none.
    pub fn dimension(self) -> Option<Dimension> {
        match self {
            AgentKind::Literature => Some(Dimension::Science),
            AgentKind::Trials => Some(Dimension::Trials),
            AgentKind::Patents => Some(Dimension::Patents),
            AgentKind::Regulatory => Some(Dimension::Regulatory),
            AgentKind::Market => Some(Dimension::Market),
            AgentKind::Trend => None,
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One invocation of one agent (serialized as JSON to subprocess agents).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRequest {
    pub request_id: Uuid,
    pub kind: AgentKind,
    pub drug_name: Option<String>,
    pub condition_name: Option<String>,
    /// The agent must answer before this instant; it is abandoned afterwards.
    pub deadline: DateTime<Utc>,
}

/// Raw answer from an agent, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentResponse {
    #[serde(default)]
    pub agent_name: String,
    /// 0 to 100.
    pub confidence: Decimal,
    #[serde(default)]
    pub summary: String,
    /// Domain-specific structured data; shape depends on the agent kind.
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// A successful agent answer after its payload was parsed for its domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentResult {
    pub kind: AgentKind,
    pub agent_name: String,
    pub confidence: Decimal,
    pub summary: String,
    pub evidence: DomainEvidence,
    /// The payload as the agent sent it, kept for display.
    pub payload: serde_json::Value,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "domain", rename_all = "snake_case")]
pub enum DomainEvidence {
    Literature(LiteratureEvidence),
    Trials(TrialsEvidence),
    Patents(PatentEvidence),
    Regulatory(RegulatoryEvidence),
    Market(MarketEvidence),
    Trend(TrendEvidence),
}

impl DomainEvidence {
    /// Parse a raw payload into the shape expected for `kind`.
    /// A null payload is read as an empty object.
    pub fn parse(kind: AgentKind, payload: &serde_json::Value) -> Result<Self, serde_json::Error> {
        let value = if payload.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            payload.clone()
        };

        Ok(match kind {
            AgentKind::Literature => DomainEvidence::Literature(serde_json::from_value(value)?),
            AgentKind::Trials => DomainEvidence::Trials(serde_json::from_value(value)?),
            AgentKind::Patents => DomainEvidence::Patents(serde_json::from_value(value)?),
            AgentKind::Regulatory => DomainEvidence::Regulatory(serde_json::from_value(value)?),
            AgentKind::Market => DomainEvidence::Market(serde_json::from_value(value)?),
            AgentKind::Trend => DomainEvidence::Trend(serde_json::from_value(value)?),
        })
    }

    pub fn kind(&self) -> AgentKind {
        match self {
            DomainEvidence::Literature(_) => AgentKind::Literature,
            DomainEvidence::Trials(_) => AgentKind::Trials,
            DomainEvidence::Patents(_) => AgentKind::Patents,
            DomainEvidence::Regulatory(_) => AgentKind::Regulatory,
            DomainEvidence::Market(_) => AgentKind::Market,
            DomainEvidence::Trend(_) => AgentKind::Trend,
        }
    }
}

fn default_relevance() -> Decimal {
    Decimal::from(50)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paper {
    pub title: String,
    #[serde(default)]
    pub journal: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    /// 0 to 100.
    #[serde(default = "default_relevance")]
    pub relevance: Decimal,
    #[serde(default)]
    pub pmid: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LiteratureEvidence {
    #[serde(default)]
    pub papers: Vec<Paper>,
    /// Matching rows in the local reference dataset.
    #[serde(default)]
    pub reference_records: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trial {
    pub id: String,
    pub title: String,
    /// Free text as published by the registry, e.g. "Phase 3" or "PHASE2".
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub participants: Option<u32>,
}

impl Trial {
    /// Highest phase number mentioned in `phase`, if any.
    pub fn phase_number(&self) -> Option<u8> {
        let phase = self.phase.as_deref()?;
        let compact: String = phase
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '/')
            .collect::<String>()
            .to_lowercase();
        (1..=4u8)
            .rev()
            .find(|n| compact.contains(&format!("phase{n}")))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrialsEvidence {
    #[serde(default)]
    pub trials: Vec<Trial>,
    /// The drug is already documented for the target condition.
    #[serde(default)]
    pub already_approved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patent {
    pub number: String,
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub filing_date: Option<String>,
}

impl Patent {
    pub fn is_granted(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("granted"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatentEvidence {
    #[serde(default)]
    pub patents: Vec<Patent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegulatoryEvidence {
    /// Approved for at least one indication.
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub approved_indication: Option<String>,
    #[serde(default)]
    pub pathway: Option<String>,
    /// Dispensing classification, e.g. "Prescription" or "Over-the-Counter".
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub barriers: Vec<String>,
}

impl RegulatoryEvidence {
    pub fn has_expedited_pathway(&self) -> bool {
        self.pathway.as_deref().is_some_and(|p| {
            let p = p.to_lowercase();
            p.contains("505(b)(2)") || p.contains("fast track")
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    Moderate,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MarketEvidence {
    #[serde(default)]
    pub market_size_usd_billions: Option<Decimal>,
    #[serde(default)]
    pub growth_rate_pct: Option<Decimal>,
    #[serde(default)]
    pub competition: Option<Level>,
    #[serde(default)]
    pub unmet_need: Option<Level>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendSuggestion {
    #[serde(default)]
    pub drug_name: Option<String>,
    #[serde(default)]
    pub condition_name: Option<String>,
    pub category: String,
    /// 0 to 100.
    pub trend_score: Decimal,
    #[serde(default)]
    pub rationale: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrendEvidence {
    #[serde(default)]
    pub suggestions: Vec<TrendSuggestion>,
}
