use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::agent_message::AgentKind;

/// Scoring dimensions, in reporting order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Science,
    Trials,
    Patents,
    Regulatory,
    Market,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Science,
        Dimension::Trials,
        Dimension::Patents,
        Dimension::Regulatory,
        Dimension::Market,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Science => "science",
            Dimension::Trials => "trials",
            Dimension::Patents => "patents",
            Dimension::Regulatory => "regulatory",
            Dimension::Market => "market",
        }
    }

    /// Human-readable name used in reasoning text.
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Science => "scientific evidence",
            Dimension::Trials => "clinical trial evidence",
            Dimension::Patents => "patent position",
            Dimension::Regulatory => "regulatory",
            Dimension::Market => "market opportunity",
        }
    }

    pub fn agent_kind(self) -> AgentKind {
        match self {
            Dimension::Science => AgentKind::Literature,
            Dimension::Trials => AgentKind::Trials,
            Dimension::Patents => AgentKind::Patents,
            Dimension::Regulatory => AgentKind::Regulatory,
            Dimension::Market => AgentKind::Market,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a sub-score came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Evidence,
    TimedOut,
    Failed,
}

impl ScoreSource {
    pub fn is_unavailable(self) -> bool {
        !matches!(self, ScoreSource::Evidence)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DimensionScore {
    pub dimension: Dimension,
    /// 0 to 100.
    pub sub_score: Decimal,
    /// Renormalized weight; active weights sum to 100.
    pub weight: Decimal,
    /// `sub_score * weight / 100`, unrounded.
    pub weighted: Decimal,
    pub source: ScoreSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_confidence: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    /// Active dimensions only, in reporting order.
    pub dimensions: Vec<DimensionScore>,
    /// Weighted composite, one decimal place, 0 to 100.
    pub composite: Decimal,
    /// Fraction of active dimensions backed by evidence, 0 to 1.
    pub data_completeness: Decimal,
}

impl ScoreBreakdown {
    pub fn get(&self, dimension: Dimension) -> Option<&DimensionScore> {
        self.dimensions.iter().find(|d| d.dimension == dimension)
    }

    pub fn total_weight(&self) -> Decimal {
        self.dimensions.iter().map(|d| d.weight).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn score(dimension: Dimension, sub: Decimal, weight: Decimal) -> DimensionScore {
        DimensionScore {
            dimension,
            sub_score: sub,
            weight,
            weighted: sub * weight / dec!(100),
            source: ScoreSource::Evidence,
            agent_confidence: None,
        }
    }

    #[test]
    fn dimension_maps_back_to_agent() {
        for dimension in Dimension::ALL {
            assert_eq!(dimension.agent_kind().dimension(), Some(dimension));
        }
    }

    #[test]
    fn breakdown_lookup_and_total() {
        let breakdown = ScoreBreakdown {
            dimensions: vec![
                score(Dimension::Science, dec!(80), dec!(45.45)),
                score(Dimension::Trials, dec!(60), dec!(54.55)),
            ],
            composite: dec!(69.1),
            data_completeness: dec!(1),
        };
        assert_eq!(breakdown.total_weight(), dec!(100));
        assert_eq!(
            breakdown.get(Dimension::Trials).map(|d| d.sub_score),
            Some(dec!(60))
        );
        assert!(breakdown.get(Dimension::Market).is_none());
        assert!(!breakdown.is_empty());
    }

    #[test]
    fn unavailable_sources() {
        assert!(ScoreSource::TimedOut.is_unavailable());
        assert!(ScoreSource::Failed.is_unavailable());
        assert!(!ScoreSource::Evidence.is_unavailable());
    }
}
