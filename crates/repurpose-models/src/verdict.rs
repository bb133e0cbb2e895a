use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::score::Dimension;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictTier {
    StrongGo,
    Go,
    ConditionalGo,
    NoGo,
}

impl VerdictTier {
    pub fn label(self) -> &'static str {
        match self {
            VerdictTier::StrongGo => "STRONG GO",
            VerdictTier::Go => "GO",
            VerdictTier::ConditionalGo => "CONDITIONAL GO",
            VerdictTier::NoGo => "NO GO",
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            VerdictTier::StrongGo => "Proceed with development; evidence strongly supports this candidate",
            VerdictTier::Go => "Proceed with development while monitoring the weaker areas",
            VerdictTier::ConditionalGo => "Proceed only after the identified gaps are addressed",
            VerdictTier::NoGo => "Do not proceed; evidence does not support this candidate",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    /// The collaborator timed out or failed; the score is a placeholder.
    DataUnavailable,
    /// Evidence arrived and scored poorly.
    PoorFit,
    /// Too few agents returned evidence for the verdict to be reliable.
    LowCompleteness,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskFactor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<Dimension>,
    pub category: RiskCategory,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Verdict {
    pub tier: VerdictTier,
    pub composite: Decimal,
    pub reasoning: String,
    pub risk_factors: Vec<RiskFactor>,
    pub next_steps: Vec<String>,
    pub recommendation: String,
}

impl Verdict {
    /// Risk messages only.
    pub fn risk_messages(&self) -> Vec<&str> {
        self.risk_factors.iter().map(|r| r.message.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn tier_serialization() {
        assert_eq!(
            serde_json::to_string(&VerdictTier::ConditionalGo).unwrap(),
            "\"CONDITIONAL_GO\""
        );
        let tier: VerdictTier = serde_json::from_str("\"STRONG_GO\"").unwrap();
        assert_eq!(tier, VerdictTier::StrongGo);
    }

    #[test]
    fn risk_messages_in_order() {
        let verdict = Verdict {
            tier: VerdictTier::NoGo,
            composite: dec!(44.8),
            reasoning: String::new(),
            risk_factors: vec![
                RiskFactor {
                    dimension: Some(Dimension::Regulatory),
                    category: RiskCategory::DataUnavailable,
                    severity: Severity::High,
                    message: "Insufficient regulatory data: agent timed out".to_string(),
                },
                RiskFactor {
                    dimension: None,
                    category: RiskCategory::LowCompleteness,
                    severity: Severity::High,
                    message: "Only 0 of 5 agents returned evidence".to_string(),
                },
            ],
            next_steps: vec![],
            recommendation: VerdictTier::NoGo.recommendation().to_string(),
        };
        assert_eq!(verdict.risk_messages().len(), 2);
        assert!(verdict.risk_messages()[0].starts_with("Insufficient regulatory"));

        let json = serde_json::to_value(&verdict.risk_factors[1]).unwrap();
        assert!(json.get("dimension").is_none());
        assert_eq!(json["category"], "low_completeness");
    }
}
