pub mod agent_message;
pub mod config;
pub mod evidence;
pub mod reference_schema;
pub mod report;
pub mod request;
pub mod score;
pub mod verdict;

pub use agent_message::{
    AgentKind, AgentRequest, AgentResponse, AgentResult, DomainEvidence, Level,
    LiteratureEvidence, MarketEvidence, Paper, Patent, PatentEvidence, RegulatoryEvidence, Trial,
    TrendEvidence, TrendSuggestion, TrialsEvidence,
};
pub use config::{
    AgentSource, AgentSourceConfig, AgentTimeouts, AgentsConfig, ConfigError, DecisionConfig,
    DimensionWeights, NeutralScores, ReferenceConfig, RepurposeConfig, ScoringConfig,
    VerdictThresholds, WeightPreset,
};
pub use evidence::{AgentOutcome, AgentTask, EvidenceBundle, EvidenceBundleBuilder};
pub use reference_schema::{
    ConditionProfile, DrugProfile, ReferenceCategory, ReferenceRow, StoredEvidence,
};
pub use report::{AgentStatusSummary, AnalysisReport, OUTPUT_SCHEMA_VERSION};
pub use request::{
    Advisory, Case, Knownness, LookupEntity, PresenceMode, RepurposingRequest,
    INPUT_SCHEMA_VERSION,
};
pub use score::{Dimension, DimensionScore, ScoreBreakdown, ScoreSource};
pub use verdict::{RiskCategory, RiskFactor, Severity, Verdict, VerdictTier};
