use repurpose_models::agent_message::{
    DomainEvidence, Level, LiteratureEvidence, MarketEvidence, PatentEvidence, RegulatoryEvidence,
    TrialsEvidence,
};
use repurpose_models::config::{DimensionWeights, NeutralScores, ScoringConfig};
use repurpose_models::evidence::{AgentOutcome, EvidenceBundle};
use repurpose_models::request::Case;
use repurpose_models::score::{Dimension, DimensionScore, ScoreBreakdown, ScoreSource};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

const ALREADY_APPROVED_FLOOR: i64 = 90;

/// Reduces an evidence bundle to per-dimension sub-scores and a weighted composite.
/// Pure: the same bundle and case always give the same breakdown.
pub struct ScoringEngine {
    weights: DimensionWeights,
    neutral: NeutralScores,
    blend: Decimal,
}

impl ScoringEngine {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            weights: config.effective_weights(),
            neutral: config.neutral_scores.clone(),
            blend: config.confidence_blend,
        }
    }

    pub fn score(&self, bundle: &EvidenceBundle, case: &Case) -> ScoreBreakdown {
        let active: Vec<Dimension> = case
            .selected_agents
            .iter()
            .filter_map(|kind| kind.dimension())
            .collect();
        if active.is_empty() {
            return ScoreBreakdown::default();
        }

        let weights = self.renormalized_weights(&active);
        let mut dimensions = Vec::with_capacity(active.len());
        let mut succeeded = 0u32;

        for (dimension, weight) in active.iter().copied().zip(weights) {
            let (sub_score, source, agent_confidence) =
                match bundle.outcome(dimension.agent_kind()) {
                    Some(AgentOutcome::Success { result }) => {
                        succeeded += 1;
                        let heuristic = clamp(heuristic(&result.evidence));
                        let mut sub = round1(
                            heuristic * (Decimal::ONE - self.blend)
                                + clamp(result.confidence) * self.blend,
                        );
                        if already_approved(&result.evidence) {
                            sub = sub.max(Decimal::from(ALREADY_APPROVED_FLOOR));
                        }
                        (clamp(sub), ScoreSource::Evidence, Some(result.confidence))
                    }
                    Some(AgentOutcome::TimedOut { .. }) => {
                        (self.neutral.get(dimension), ScoreSource::TimedOut, None)
                    }
                    Some(AgentOutcome::Failed { .. }) | None => {
                        (self.neutral.get(dimension), ScoreSource::Failed, None)
                    }
                };

            dimensions.push(DimensionScore {
                dimension,
                sub_score,
                weight,
                weighted: sub_score * weight / Decimal::ONE_HUNDRED,
                source,
                agent_confidence,
            });
        }

        let composite = composite_of(&dimensions);
        let data_completeness = (Decimal::from(succeeded) / Decimal::from(active.len() as u32))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        debug!(composite = %composite, completeness = %data_completeness, "Scored evidence");

        ScoreBreakdown {
            dimensions,
            composite,
            data_completeness,
        }
    }

    /// Configured weights restricted to `active` and scaled to sum to exactly 100.
    /// Each weight is rounded to two decimals; the rounding residue goes to
    /// the heaviest dimension.
    fn renormalized_weights(&self, active: &[Dimension]) -> Vec<Decimal> {
        let raw: Vec<Decimal> = active.iter().map(|d| self.weights.get(*d)).collect();
        let total: Decimal = raw.iter().copied().sum();

        let raw = if total > Decimal::ZERO {
            raw
        } else {
            vec![Decimal::ONE; active.len()]
        };
        let total: Decimal = raw.iter().copied().sum();

        let mut weights: Vec<Decimal> = raw
            .iter()
            .map(|w| {
                (*w * Decimal::ONE_HUNDRED / total)
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            })
            .collect();

        let residue = Decimal::ONE_HUNDRED - weights.iter().copied().sum::<Decimal>();
        if !residue.is_zero() {
            let mut heaviest = 0;
            for (i, w) in weights.iter().enumerate() {
                if *w > weights[heaviest] {
                    heaviest = i;
                }
            }
            weights[heaviest] += residue;
        }
        weights
    }
}

/// Weighted sum of sub-scores, one decimal place, clamped to 0..=100.
pub fn composite_of(dimensions: &[DimensionScore]) -> Decimal {
    let total: Decimal = dimensions
        .iter()
        .map(|d| d.sub_score * d.weight / Decimal::ONE_HUNDRED)
        .sum();
    clamp(round1(total))
}

fn round1(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

fn clamp(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO).min(Decimal::ONE_HUNDRED)
}

fn already_approved(evidence: &DomainEvidence) -> bool {
    matches!(evidence, DomainEvidence::Trials(t) if t.already_approved)
}

fn heuristic(evidence: &DomainEvidence) -> Decimal {
    match evidence {
        DomainEvidence::Literature(e) => science_heuristic(e),
        DomainEvidence::Trials(e) => trials_heuristic(e),
        DomainEvidence::Patents(e) => patents_heuristic(e),
        DomainEvidence::Regulatory(e) => regulatory_heuristic(e),
        DomainEvidence::Market(e) => market_heuristic(e),
        DomainEvidence::Trend(_) => Decimal::from(50),
    }
}

fn science_heuristic(e: &LiteratureEvidence) -> Decimal {
    if e.papers.is_empty() && e.reference_records == 0 {
        return Decimal::from(30);
    }
    let count = Decimal::from(e.papers.len() as u64);
    let mut score = Decimal::from(30) + (count * Decimal::from(5)).min(Decimal::from(30));
    if !e.papers.is_empty() {
        let avg_relevance = e.papers.iter().map(|p| clamp(p.relevance)).sum::<Decimal>() / count;
        score += (avg_relevance - Decimal::from(50)) * Decimal::new(8, 1);
    }
    if e.reference_records > 0 {
        score += Decimal::from(10);
    }
    score
}

fn trials_heuristic(e: &TrialsEvidence) -> Decimal {
    if e.trials.is_empty() && !e.already_approved {
        return Decimal::from(30);
    }
    let mut score = Decimal::from(30);
    for trial in &e.trials {
        score += Decimal::from(match trial.phase_number() {
            Some(3) | Some(4) => 20,
            Some(2) => 15,
            Some(1) => 8,
            _ => 0,
        });
        let status = trial.status.as_deref().unwrap_or_default().to_lowercase();
        if status.contains("active") {
            score += Decimal::from(8);
        } else if status.contains("recruiting") {
            score += Decimal::from(5);
        }
    }
    score += Decimal::from(match e.trials.len() {
        0 | 1 => 0,
        2 => 10,
        _ => 15,
    });
    score
}

fn patents_heuristic(e: &PatentEvidence) -> Decimal {
    if e.patents.is_empty() {
        return Decimal::from(35);
    }
    let count = Decimal::from(e.patents.len() as u64);
    let granted = Decimal::from(e.patents.iter().filter(|p| p.is_granted()).count() as u64);
    Decimal::from(40) + (count * Decimal::from(5)).min(Decimal::from(30)) + granted * Decimal::from(5)
}

fn regulatory_heuristic(e: &RegulatoryEvidence) -> Decimal {
    let mut score = Decimal::from(50);
    score += Decimal::from(if e.approved { 30 } else { 10 });
    if e.has_expedited_pathway() {
        score += Decimal::from(15);
    }
    if e.classification.is_some() {
        score += Decimal::from(5);
    }
    score
}

fn market_heuristic(e: &MarketEvidence) -> Decimal {
    let mut score = Decimal::from(50);
    if let Some(size) = e.market_size_usd_billions {
        score += Decimal::from(if size > Decimal::from(50) {
            20
        } else if size > Decimal::from(10) {
            15
        } else {
            8
        });
    }
    score += Decimal::from(match e.unmet_need {
        Some(Level::High) | Some(Level::VeryHigh) => 15,
        Some(Level::Moderate) => 8,
        _ => 0,
    });
    if e.competition == Some(Level::Low) {
        score += Decimal::from(10);
    }
    score
}
