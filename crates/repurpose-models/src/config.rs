use std::collections::HashSet;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::agent_message::AgentKind;
use crate::score::Dimension;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("scoring weight for {0} is negative")]
    NegativeWeight(Dimension),

    #[error("scoring weights sum to zero")]
    ZeroWeights,

    #[error("neutral score for {0} must be within 0..=100")]
    NeutralOutOfRange(Dimension),

    #[error("confidence blend must be within 0..=1, got {0}")]
    BlendOutOfRange(Decimal),

    #[error("verdict thresholds must strictly descend: {0}")]
    ThresholdOrder(String),

    #[error("timeout for {0} agents must be greater than zero")]
    ZeroTimeout(AgentKind),

    #[error("more than one enabled agent source for {0}")]
    DuplicateSource(AgentKind),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RepurposeConfig {
    #[serde(default)]
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub decision: DecisionConfig,
}

impl RepurposeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.agents.validate()?;
        self.scoring.validate()?;
        self.decision.validate()
    }
}

/// Configuration for the reference store layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReferenceConfig {
    /// Path to the SQLite file written by `repurpose-loader`.
    pub sqlite_path: String,
    /// Maximum number of entries in the in-memory moka cache.
    pub memory_max_capacity: u64,
    /// How long a read stays in memory.
    pub memory_ttl_seconds: u64,
    /// Upper bound for one knownness lookup during classification.
    pub lookup_timeout_ms: u64,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "data/reference.db".to_string(),
            memory_max_capacity: 10_000,
            memory_ttl_seconds: 300,
            lookup_timeout_ms: 2_000,
        }
    }
}

impl ReferenceConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

/// Per-kind agent deadlines, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentTimeouts {
    pub literature_seconds: u64,
    pub trials_seconds: u64,
    pub patents_seconds: u64,
    pub regulatory_seconds: u64,
    pub market_seconds: u64,
    pub trend_seconds: u64,
}

impl Default for AgentTimeouts {
    fn default() -> Self {
        Self {
            literature_seconds: 40,
            trials_seconds: 40,
            patents_seconds: 40,
            regulatory_seconds: 20,
            market_seconds: 20,
            trend_seconds: 20,
        }
    }
}

impl AgentTimeouts {
    pub fn seconds_for(&self, kind: AgentKind) -> u64 {
        match kind {
            AgentKind::Literature => self.literature_seconds,
            AgentKind::Trials => self.trials_seconds,
            AgentKind::Patents => self.patents_seconds,
            AgentKind::Regulatory => self.regulatory_seconds,
            AgentKind::Market => self.market_seconds,
            AgentKind::Trend => self.trend_seconds,
        }
    }
}

/// Configuration for the agent orchestration layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentsConfig {
    pub timeouts: AgentTimeouts,
    /// Extra time the fan-in waits past the longest agent deadline.
    pub fan_in_grace_ms: u64,
    pub sources: Vec<AgentSourceConfig>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            timeouts: AgentTimeouts::default(),
            fan_in_grace_ms: 500,
            sources: AgentKind::ALL
                .iter()
                .map(|kind| AgentSourceConfig {
                    kind: *kind,
                    name: format!("reference-{kind}"),
                    enabled: true,
                    source: AgentSource::Reference,
                })
                .collect(),
        }
    }
}

impl AgentsConfig {
    pub fn timeout_for(&self, kind: AgentKind) -> Duration {
        Duration::from_secs(self.timeouts.seconds_for(kind))
    }

    pub fn fan_in_grace(&self) -> Duration {
        Duration::from_millis(self.fan_in_grace_ms)
    }

    pub fn enabled_sources(&self) -> impl Iterator<Item = &AgentSourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for kind in AgentKind::ALL {
            if self.timeouts.seconds_for(kind) == 0 {
                return Err(ConfigError::ZeroTimeout(kind));
            }
        }
        let mut seen = HashSet::new();
        for source in self.enabled_sources() {
            if !seen.insert(source.kind) {
                return Err(ConfigError::DuplicateSource(source.kind));
            }
        }
        Ok(())
    }
}

fn default_enabled() -> bool {
    true
}

/// Configuration for a single evidence agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSourceConfig {
    pub kind: AgentKind,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub source: AgentSource,
}

/// Where an agent gets its evidence from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AgentSource {
    /// Answer from the local reference store.
    #[default]
    Reference,
    /// Spawn a program that reads an `AgentRequest` on stdin and prints an `AgentResponse`.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeightPreset {
    TrialsFirst,
    ScienceFirst,
}

impl WeightPreset {
    pub fn weights(self) -> DimensionWeights {
        match self {
            WeightPreset::TrialsFirst => DimensionWeights {
                science: Decimal::from(25),
                trials: Decimal::from(30),
                patents: Decimal::from(10),
                regulatory: Decimal::from(20),
                market: Decimal::from(15),
            },
            WeightPreset::ScienceFirst => DimensionWeights {
                science: Decimal::from(30),
                trials: Decimal::from(25),
                patents: Decimal::from(15),
                regulatory: Decimal::from(20),
                market: Decimal::from(10),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DimensionWeights {
    pub science: Decimal,
    pub trials: Decimal,
    pub patents: Decimal,
    pub regulatory: Decimal,
    pub market: Decimal,
}

impl Default for DimensionWeights {
    fn default() -> Self {
        WeightPreset::TrialsFirst.weights()
    }
}

impl DimensionWeights {
    pub fn get(&self, dimension: Dimension) -> Decimal {
        match dimension {
            Dimension::Science => self.science,
            Dimension::Trials => self.trials,
            Dimension::Patents => self.patents,
            Dimension::Regulatory => self.regulatory,
            Dimension::Market => self.market,
        }
    }
}

/// Sub-scores used when an agent timed out or failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NeutralScores {
    pub science: Decimal,
    pub trials: Decimal,
    pub patents: Decimal,
    pub regulatory: Decimal,
    pub market: Decimal,
}

impl Default for NeutralScores {
    fn default() -> Self {
        Self {
            science: Decimal::from(45),
            trials: Decimal::from(40),
            patents: Decimal::from(50),
            regulatory: Decimal::from(45),
            market: Decimal::from(50),
        }
    }
}

impl NeutralScores {
    pub fn get(&self, dimension: Dimension) -> Decimal {
        match dimension {
            Dimension::Science => self.science,
            Dimension::Trials => self.trials,
            Dimension::Patents => self.patents,
            Dimension::Regulatory => self.regulatory,
            Dimension::Market => self.market,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    pub preset: Option<WeightPreset>,
    /// Explicit weights; take precedence over `preset`.
    pub weights: Option<DimensionWeights>,
    pub neutral_scores: NeutralScores,
    /// Share of the sub-score taken from the agent's own confidence.
    pub confidence_blend: Decimal,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            preset: None,
            weights: None,
            neutral_scores: NeutralScores::default(),
            confidence_blend: Decimal::new(30, 2),
        }
    }
}

impl ScoringConfig {
    pub fn effective_weights(&self) -> DimensionWeights {
        match (&self.weights, self.preset) {
            (Some(weights), _) => weights.clone(),
            (None, Some(preset)) => preset.weights(),
            (None, None) => DimensionWeights::default(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let weights = self.effective_weights();
        let mut total = Decimal::ZERO;
        for dimension in Dimension::ALL {
            let weight = weights.get(dimension);
            if weight < Decimal::ZERO {
                return Err(ConfigError::NegativeWeight(dimension));
            }
            total += weight;

            let neutral = self.neutral_scores.get(dimension);
            if neutral < Decimal::ZERO || neutral > Decimal::ONE_HUNDRED {
                return Err(ConfigError::NeutralOutOfRange(dimension));
            }
        }
        if total.is_zero() {
            return Err(ConfigError::ZeroWeights);
        }
        if self.confidence_blend < Decimal::ZERO || self.confidence_blend > Decimal::ONE {
            return Err(ConfigError::BlendOutOfRange(self.confidence_blend));
        }
        Ok(())
    }
}

/// Minimum composite score for each verdict tier.
/// Without `strong_go` the table has three tiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerdictThresholds {
    #[serde(default)]
    pub strong_go: Option<Decimal>,
    pub go: Decimal,
    pub conditional_go: Decimal,
}

impl Default for VerdictThresholds {
    fn default() -> Self {
        Self::four_tier()
    }
}

impl VerdictThresholds {
    pub fn four_tier() -> Self {
        Self {
            strong_go: Some(Decimal::from(80)),
            go: Decimal::from(65),
            conditional_go: Decimal::from(50),
        }
    }

    pub fn three_tier() -> Self {
        Self {
            strong_go: None,
            go: Decimal::from(70),
            conditional_go: Decimal::from(50),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecisionConfig {
    pub thresholds: VerdictThresholds,
    /// Sub-scores at or above this count as strong evidence.
    pub strong_evidence: Decimal,
    /// Sub-scores below this count as weak.
    pub weak_evidence: Decimal,
    /// Fraction of agents that must return evidence before completeness is flagged.
    pub min_completeness: Decimal,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            thresholds: VerdictThresholds::default(),
            strong_evidence: Decimal::from(70),
            weak_evidence: Decimal::from(60),
            min_completeness: Decimal::new(6, 1),
        }
    }
}

impl DecisionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thresholds;
        if let Some(strong_go) = t.strong_go {
            if strong_go <= t.go {
                return Err(ConfigError::ThresholdOrder(format!(
                    "strong_go {strong_go} <= go {}",
                    t.go
                )));
            }
        }
        if t.go <= t.conditional_go {
            return Err(ConfigError::ThresholdOrder(format!(
                "go {} <= conditional_go {}",
                t.go, t.conditional_go
            )));
        }
        if self.weak_evidence > self.strong_evidence {
            return Err(ConfigError::ThresholdOrder(format!(
                "weak_evidence {} > strong_evidence {}",
                self.weak_evidence, self.strong_evidence
            )));
        }
        Ok(())
    }
}
