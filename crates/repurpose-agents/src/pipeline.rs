use std::time::Instant;

use chrono::Utc;
use repurpose_models::agent_message::{AgentKind, DomainEvidence, TrendSuggestion};
use repurpose_models::evidence::EvidenceBundle;
use repurpose_models::report::{AgentStatusSummary, AnalysisReport, OUTPUT_SCHEMA_VERSION};
use repurpose_models::request::RepurposingRequest;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::classifier::CaseClassifier;
use crate::decision::DecisionEngine;
use crate::error::PipelineError;
use crate::orchestrator::{outcome_advisories, Orchestrator};
use crate::scoring::ScoringEngine;

/// Classify, fan out, score and decide for one request.
pub struct RepurposePipeline {
    classifier: CaseClassifier,
    orchestrator: Orchestrator,
    scoring: ScoringEngine,
    decision: DecisionEngine,
}

impl RepurposePipeline {
    pub fn new(
        classifier: CaseClassifier,
        orchestrator: Orchestrator,
        scoring: ScoringEngine,
        decision: DecisionEngine,
    ) -> Self {
        Self {
            classifier,
            orchestrator,
            scoring,
            decision,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    #[instrument(skip_all, fields(drug = ?request.drug(), condition = ?request.condition()))]
    pub async fn analyze(
        &self,
        request: &RepurposingRequest,
        cancel: &CancellationToken,
    ) -> Result<AnalysisReport, PipelineError> {
        let start = Instant::now();

        let case = self.classifier.classify(request).await;
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let evidence = self.orchestrator.run(&case, cancel).await?;

        let breakdown = self.scoring.score(&evidence, &case);
        let (breakdown, verdict) = if breakdown.is_empty() {
            (None, None)
        } else {
            let verdict = self.decision.decide(&breakdown);
            (Some(breakdown), Some(verdict))
        };

        let mut advisories = case.advisories.clone();
        advisories.extend(outcome_advisories(&evidence));

        let report = AnalysisReport {
            id: Uuid::new_v4(),
            schema_version: OUTPUT_SCHEMA_VERSION,
            request: case.request.clone(),
            trends: trend_suggestions(&evidence),
            agent_status: AgentStatusSummary::from_bundle(&evidence),
            case,
            evidence,
            breakdown,
            verdict,
            advisories,
            decided_at: Utc::now(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        };

        match &report.verdict {
            Some(verdict) => info!(
                tier = verdict.tier.label(),
                composite = %verdict.composite,
                advisories = report.advisories.len(),
                elapsed_ms = report.processing_time_ms,
                "Analysis complete"
            ),
            None => info!(
                trends = report.trends.len(),
                elapsed_ms = report.processing_time_ms,
                "Trend discovery complete"
            ),
        }

        Ok(report)
    }
}

fn trend_suggestions(bundle: &EvidenceBundle) -> Vec<TrendSuggestion> {
    match bundle.result(AgentKind::Trend).map(|r| &r.evidence) {
        Some(DomainEvidence::Trend(trend)) => trend.suggestions.clone(),
        _ => Vec::new(),
    }
}
