use repurpose_models::config::{DecisionConfig, VerdictThresholds};
use repurpose_models::score::{Dimension, DimensionScore, ScoreBreakdown, ScoreSource};
use repurpose_models::verdict::{RiskCategory, RiskFactor, Severity, Verdict, VerdictTier};
use rust_decimal::Decimal;
use tracing::info;

/// Maps a score breakdown to a verdict with reasoning, risks and next steps.
pub struct DecisionEngine {
    config: DecisionConfig,
}

impl DecisionEngine {
    pub fn new(config: &DecisionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn tier_for(&self, composite: Decimal) -> VerdictTier {
        tier_for(&self.config.thresholds, composite)
    }

    pub fn decide(&self, breakdown: &ScoreBreakdown) -> Verdict {
        let tier = self.tier_for(breakdown.composite);
        let reasoning = self.reasoning(tier, breakdown);
        let risk_factors = self.risk_factors(breakdown);
        let next_steps = self.next_steps(tier, breakdown);

        info!(
            tier = ?tier,
            composite = %breakdown.composite,
            risks = risk_factors.len(),
            "Verdict decided"
        );

        Verdict {
            tier,
            composite: breakdown.composite,
            reasoning,
            risk_factors,
            next_steps,
            recommendation: tier.recommendation().to_string(),
        }
    }

    fn strength(&self, score: &DimensionScore) -> &'static str {
        match score.source {
            ScoreSource::TimedOut => "unavailable (timed out)",
            ScoreSource::Failed => "unavailable (failed)",
            ScoreSource::Evidence if score.sub_score >= self.config.strong_evidence => "strong",
            ScoreSource::Evidence if score.sub_score >= self.config.weak_evidence => "moderate",
            ScoreSource::Evidence => "weak",
        }
    }

    fn reasoning(&self, tier: VerdictTier, breakdown: &ScoreBreakdown) -> String {
        let headline = match tier {
            VerdictTier::StrongGo => "Strong repurposing candidate",
            VerdictTier::Go => "Promising repurposing candidate",
            VerdictTier::ConditionalGo => "Mixed evidence for repurposing",
            VerdictTier::NoGo => "Insufficient support for repurposing",
        };
        let mut text = format!("{headline} (composite {}).", breakdown.composite);
        for score in &breakdown.dimensions {
            text.push_str(&format!(
                " {}: {} ({}).",
                capitalize(score.dimension.label()),
                self.strength(score),
                score.sub_score
            ));
        }
        text
    }

    fn risk_factors(&self, breakdown: &ScoreBreakdown) -> Vec<RiskFactor> {
        let mut risks = Vec::new();

        for score in &breakdown.dimensions {
            let dimension = score.dimension;
            match score.source {
                ScoreSource::TimedOut | ScoreSource::Failed
                    if score.sub_score < self.config.strong_evidence =>
                {
                    let cause = if score.source == ScoreSource::TimedOut {
                        "agent timed out"
                    } else {
                        "agent failed"
                    };
                    risks.push(RiskFactor {
                        dimension: Some(dimension),
                        category: RiskCategory::DataUnavailable,
                        severity: if score.weight >= Decimal::from(20) {
                            Severity::High
                        } else {
                            Severity::Medium
                        },
                        message: format!("Insufficient {dimension} data: {cause}"),
                    });
                }
                ScoreSource::Evidence if score.sub_score < self.config.weak_evidence => {
                    risks.push(RiskFactor {
                        dimension: Some(dimension),
                        category: RiskCategory::PoorFit,
                        severity: if score.sub_score < Decimal::from(40) {
                            Severity::High
                        } else {
                            Severity::Medium
                        },
                        message: format!("Poor {dimension} fit (score {})", score.sub_score),
                    });
                }
                _ => {}
            }
        }

        if !breakdown.is_empty() && breakdown.data_completeness < self.config.min_completeness {
            let total = breakdown.dimensions.len();
            let succeeded = breakdown
                .dimensions
                .iter()
                .filter(|d| d.source == ScoreSource::Evidence)
                .count();
            risks.push(RiskFactor {
                dimension: None,
                category: RiskCategory::LowCompleteness,
                severity: if succeeded == 0 {
                    Severity::High
                } else {
                    Severity::Medium
                },
                message: format!("Only {succeeded} of {total} agents returned evidence"),
            });
        }

        risks
    }

    fn next_steps(&self, tier: VerdictTier, breakdown: &ScoreBreakdown) -> Vec<String> {
        let mut steps = vec![match tier {
            VerdictTier::StrongGo => "Prepare a development plan and engage regulatory advisors",
            VerdictTier::Go => "Design a proof-of-concept study to confirm efficacy",
            VerdictTier::ConditionalGo => "Close the evidence gaps below before committing resources",
            VerdictTier::NoGo => "Deprioritize this candidate and revisit if new evidence emerges",
        }
        .to_string()];

        for score in &breakdown.dimensions {
            if score.source == ScoreSource::Evidence && score.sub_score < self.config.weak_evidence {
                steps.push(weak_dimension_step(score.dimension).to_string());
            }
        }
        for score in &breakdown.dimensions {
            if score.source.is_unavailable() {
                steps.push(format!(
                    "Re-collect {} evidence once the source is reachable",
                    score.dimension
                ));
            }
        }

        steps
    }
}

fn tier_for(thresholds: &VerdictThresholds, composite: Decimal) -> VerdictTier {
    match thresholds.strong_go {
        Some(strong_go) if composite >= strong_go => VerdictTier::StrongGo,
        _ if composite >= thresholds.go => VerdictTier::Go,
        _ if composite >= thresholds.conditional_go => VerdictTier::ConditionalGo,
        _ => VerdictTier::NoGo,
    }
}

fn weak_dimension_step(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Science => "Conduct a systematic literature review",
        Dimension::Trials => "Design a phase II proof-of-concept trial",
        Dimension::Patents => "Commission a freedom-to-operate search",
        Dimension::Regulatory => "Schedule a pre-IND meeting with the regulator",
        Dimension::Market => "Commission a market sizing study",
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
