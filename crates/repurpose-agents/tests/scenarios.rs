//! End-to-end scenarios for the repurposing pipeline.
//!
//! Each test seeds an in-memory reference store, registers reference-backed
//! agents (optionally shadowed by scripted mocks), then runs
//! `RepurposePipeline::analyze()` and checks the resulting report.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use repurpose_agents::test_support::{MockAgent, MockBehavior};
use repurpose_agents::{
    CaseClassifier, DecisionEngine, EvidenceAgent, Orchestrator, ReferenceAgent,
    RepurposePipeline, ScoringEngine,
};
use repurpose_models::agent_message::AgentKind;
use repurpose_models::config::{AgentsConfig, DecisionConfig, ScoringConfig};
use repurpose_models::evidence::AgentOutcome;
use repurpose_models::reference_schema::{key_patterns, DrugProfile, ReferenceCategory};
use repurpose_models::report::AnalysisReport;
use repurpose_models::request::{Knownness, PresenceMode, RepurposingRequest};
use repurpose_models::score::{Dimension, ScoreSource};
use repurpose_models::verdict::{RiskCategory, VerdictTier};
use repurpose_reference::{ReferenceReader, SqliteReference};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

const DRUG: &str = "KnownDrugX";
const CONDITION: &str = "KnownConditionY";

fn put(sqlite: &SqliteReference, key: &str, category: ReferenceCategory, value: &Value) {
    sqlite
        .put(key, category, value, ChronoDuration::hours(1))
        .unwrap();
}

fn seeded_reader() -> Arc<ReferenceReader> {
    let sqlite = SqliteReference::open_in_memory().unwrap();

    sqlite
        .put(
            &key_patterns::drug(DRUG),
            ReferenceCategory::Drug,
            &DrugProfile {
                name: DRUG.to_string(),
                categories: vec!["Antidiabetic".to_string()],
                indications: vec![CONDITION.to_string(), "Obesity".to_string()],
                classifications: vec!["Prescription".to_string()],
                dosage_forms: vec!["Tablet".to_string()],
                manufacturers: vec!["Acme Pharma".to_string()],
                record_count: 6,
            },
            ChronoDuration::hours(1),
        )
        .unwrap();
    put(
        &sqlite,
        &key_patterns::condition(CONDITION),
        ReferenceCategory::Condition,
        &json!({"name": CONDITION, "drug_count": 3}),
    );
    put(
        &sqlite,
        &key_patterns::evidence("literature", Some(DRUG), Some(CONDITION)),
        ReferenceCategory::Evidence,
        &json!({
            "confidence": 85,
            "summary": "6 supporting papers",
            "payload": {"papers": (0..6).map(|i| json!({
                "title": format!("Study {i}"),
                "journal": "J Clin Pharm",
                "relevance": 80
            })).collect::<Vec<_>>()},
            "sources": ["pubmed"]
        }),
    );
    put(
        &sqlite,
        &key_patterns::evidence("patents", Some(DRUG), None),
        ReferenceCategory::Evidence,
        &json!({
            "confidence": 70,
            "summary": "2 granted patents",
            "payload": {"patents": [
                {"number": "US1111111", "title": "Extended release", "status": "granted"},
                {"number": "US2222222", "title": "Combination", "status": "Granted"}
            ]},
            "sources": ["uspto"]
        }),
    );
    put(
        &sqlite,
        &key_patterns::evidence("market", None, Some(CONDITION)),
        ReferenceCategory::Evidence,
        &json!({
            "confidence": 70,
            "summary": "Sizable underserved market",
            "payload": {
                "market_size_usd_billions": 12,
                "competition": "moderate",
                "unmet_need": "high"
            },
            "sources": ["market_report"]
        }),
    );
    put(
        &sqlite,
        &key_patterns::trend("glp1-obesity"),
        ReferenceCategory::Trend,
        &json!({"drug_name": "Semaglutide", "condition_name": "Obesity", "category": "metabolic", "trend_score": 92}),
    );
    put(
        &sqlite,
        &key_patterns::trend("metformin-aging"),
        ReferenceCategory::Trend,
        &json!({"drug_name": "Metformin", "condition_name": "Aging", "category": "longevity", "trend_score": 81}),
    );

    Arc::new(ReferenceReader::new(sqlite, 100, Duration::from_secs(60)))
}

/// Mocks come first so they shadow the reference agent for the same kind.
fn build_pipeline(
    reader: &Arc<ReferenceReader>,
    mocks: Vec<(AgentKind, MockBehavior)>,
) -> RepurposePipeline {
    let agents = mocks
        .into_iter()
        .map(|(kind, behavior)| Arc::new(MockAgent::new(kind, behavior)) as Arc<dyn EvidenceAgent>)
        .collect();
    build_pipeline_with(reader, agents)
}

/// Registers `agents` ahead of the reference agents so they shadow them.
fn build_pipeline_with(
    reader: &Arc<ReferenceReader>,
    mut agents: Vec<Arc<dyn EvidenceAgent>>,
) -> RepurposePipeline {
    for kind in AgentKind::ALL {
        agents.push(Arc::new(ReferenceAgent::new(
            &format!("reference-{kind}"),
            kind,
            Arc::clone(reader),
        )));
    }

    RepurposePipeline::new(
        CaseClassifier::new(reader.clone(), Duration::from_millis(500)),
        Orchestrator::new(agents, AgentsConfig::default()),
        ScoringEngine::new(&ScoringConfig::default()),
        DecisionEngine::new(&DecisionConfig::default()),
    )
}

async fn analyze(pipeline: &RepurposePipeline, drug: Option<&str>, condition: Option<&str>) -> AnalysisReport {
    pipeline
        .analyze(
            &RepurposingRequest::new(drug, condition),
            &CancellationToken::new(),
        )
        .await
        .unwrap()
}

fn strong_mocks() -> Vec<(AgentKind, MockBehavior)> {
    vec![
        (
            AgentKind::Literature,
            MockBehavior::with_payload(
                dec!(100),
                json!({"papers": (0..6).map(|i| json!({"title": format!("Trial report {i}"), "relevance": 100})).collect::<Vec<_>>()}),
            ),
        ),
        (
            AgentKind::Trials,
            MockBehavior::with_payload(
                dec!(100),
                json!({
                    "already_approved": true,
                    "trials": [
                        {"id": "NCT001", "title": "A", "phase": "Phase 3", "status": "Recruiting"},
                        {"id": "NCT002", "title": "B", "phase": "Phase 3", "status": "Recruiting"},
                        {"id": "NCT003", "title": "C", "phase": "Phase 3", "status": "Recruiting"}
                    ]
                }),
            ),
        ),
        (
            AgentKind::Regulatory,
            MockBehavior::with_payload(
                dec!(100),
                json!({"approved": true, "pathway": "505(b)(2)", "classification": "Prescription"}),
            ),
        ),
        (
            AgentKind::Market,
            MockBehavior::with_payload(
                dec!(100),
                json!({"market_size_usd_billions": 60, "unmet_need": "very_high", "competition": "low"}),
            ),
        ),
    ]
}

// ============================================================
// Scenario A: known drug already indicated for a known condition
// Drug profile lists the condition; literature, patents and market
// evidence are stored. Expected: KNOWN_REPURPOSING, trials >= 85,
// verdict GO or STRONG_GO.
// ============================================================

#[tokio::test]
async fn scenario_known_repurposing() {
    let reader = seeded_reader();
    let pipeline = build_pipeline(&reader, vec![]);

    let report = analyze(&pipeline, Some(DRUG), Some(CONDITION)).await;

    assert_eq!(report.case.presence_mode, PresenceMode::Both);
    assert_eq!(report.case.knownness, Knownness::KnownRepurposing);
    assert_eq!(report.case.priority, 5);
    assert!(reader.co_associated(DRUG, CONDITION).await.unwrap());

    let breakdown = report.breakdown.as_ref().unwrap();
    let trials = breakdown.get(Dimension::Trials).unwrap();
    assert!(trials.sub_score >= dec!(85), "trials sub-score {}", trials.sub_score);
    assert_eq!(trials.source, ScoreSource::Evidence);
    assert_eq!(breakdown.total_weight(), dec!(100));
    assert_eq!(breakdown.data_completeness, dec!(1));

    let verdict = report.verdict.as_ref().unwrap();
    assert!(
        matches!(verdict.tier, VerdictTier::StrongGo | VerdictTier::Go),
        "unexpected tier {:?} at composite {}",
        verdict.tier,
        verdict.composite
    );
    assert!(report.advisories.is_empty());
    assert!(report.trends.is_empty());
}

// ============================================================
// Scenario B: every agent hangs
// Expected: a report, five TimedOut outcomes, neutral-low composite,
// NO_GO or CONDITIONAL_GO, a data-unavailable risk per dimension.
// ============================================================

#[tokio::test(start_paused = true)]
async fn scenario_all_agents_time_out() {
    let reader = seeded_reader();
    let hangs = AgentKind::ALL
        .iter()
        .map(|kind| (*kind, MockBehavior::Hang))
        .collect();
    let pipeline = build_pipeline(&reader, hangs);

    let report = analyze(&pipeline, Some(DRUG), Some(CONDITION)).await;

    assert_eq!(report.evidence.len(), 5);
    assert!(report
        .evidence
        .tasks()
        .all(|task| matches!(task.outcome, AgentOutcome::TimedOut { .. })));
    assert_eq!(report.agent_status.timed_out.len(), 5);
    assert_eq!(report.advisories.len(), 5);

    let breakdown = report.breakdown.as_ref().unwrap();
    assert_eq!(breakdown.composite, dec!(44.8));
    assert!(breakdown.composite >= dec!(40) && breakdown.composite <= dec!(55));
    assert_eq!(breakdown.data_completeness, dec!(0));

    let verdict = report.verdict.as_ref().unwrap();
    assert!(matches!(verdict.tier, VerdictTier::NoGo | VerdictTier::ConditionalGo));
    for dimension in Dimension::ALL {
        let expected = format!("Insufficient {dimension} data: agent timed out");
        assert!(
            verdict.risk_messages().contains(&expected.as_str()),
            "missing risk for {dimension}: {:?}",
            verdict.risk_messages()
        );
    }
    assert!(verdict
        .risk_factors
        .iter()
        .any(|r| r.category == RiskCategory::LowCompleteness));
}

// ============================================================
// Scenario C: empty request
// Expected: NEITHER, only the trend agent runs, trend suggestions
// instead of a drug-condition verdict.
// ============================================================

#[tokio::test]
async fn scenario_empty_request_discovers_trends() {
    let reader = seeded_reader();
    let pipeline = build_pipeline(&reader, vec![]);

    let report = analyze(&pipeline, None, Some("   ")).await;

    assert_eq!(report.case.presence_mode, PresenceMode::Neither);
    assert_eq!(
        report.case.selected_agents.iter().copied().collect::<Vec<_>>(),
        vec![AgentKind::Trend]
    );
    assert!(report.breakdown.is_none());
    assert!(report.verdict.is_none());
    assert_eq!(report.trends.len(), 2);
    assert_eq!(report.trends[0].drug_name.as_deref(), Some("Semaglutide"));
    assert_eq!(report.trends[1].trend_score, dec!(81));
}

// ============================================================
// Scenario D: patents fails, the other four are near-maximal
// Expected: composite drops only by the patents weight times the
// gap to its neutral score; STRONG_GO is still reachable.
// ============================================================

#[tokio::test]
async fn scenario_single_failure_costs_only_its_weight() {
    let reader = seeded_reader();

    let mut failing = strong_mocks();
    failing.push((AgentKind::Patents, MockBehavior::Fail("patent office unreachable".to_string())));
    let degraded = analyze(&build_pipeline(&reader, failing), Some(DRUG), Some(CONDITION)).await;

    let mut succeeding = strong_mocks();
    succeeding.push((
        AgentKind::Patents,
        MockBehavior::with_payload(
            dec!(100),
            json!({"patents": (0..6).map(|i| json!({"number": format!("US{i}"), "title": "Use", "status": "granted"})).collect::<Vec<_>>()}),
        ),
    ));
    let full = analyze(&build_pipeline(&reader, succeeding), Some(DRUG), Some(CONDITION)).await;

    let degraded_breakdown = degraded.breakdown.as_ref().unwrap();
    let patents = degraded_breakdown.get(Dimension::Patents).unwrap();
    assert_eq!(patents.source, ScoreSource::Failed);
    assert_eq!(patents.sub_score, dec!(50));
    assert_eq!(patents.weight, dec!(10));
    assert_eq!(degraded_breakdown.data_completeness, dec!(0.8));

    let full_patents = full.breakdown.as_ref().unwrap().get(Dimension::Patents).unwrap();
    let expected_drop = (full_patents.sub_score - patents.sub_score) * patents.weight / dec!(100);
    let full_composite = full.verdict.as_ref().unwrap().composite;
    let degraded_composite = degraded.verdict.as_ref().unwrap().composite;
    assert_eq!(full_composite - degraded_composite, expected_drop);

    let verdict = degraded.verdict.as_ref().unwrap();
    assert_eq!(verdict.tier, VerdictTier::StrongGo);
    assert!(verdict
        .risk_messages()
        .contains(&"Insufficient patents data: agent failed"));
}

// ============================================================
// Properties
// ============================================================

#[tokio::test(start_paused = true)]
async fn every_selected_agent_has_exactly_one_outcome() {
    let reader = seeded_reader();
    let mixes: Vec<Vec<(AgentKind, MockBehavior)>> = vec![
        vec![],
        vec![
            (AgentKind::Literature, MockBehavior::Panic),
            (AgentKind::Trials, MockBehavior::Hang),
        ],
        vec![
            (AgentKind::Patents, MockBehavior::Malformed),
            (AgentKind::Market, MockBehavior::Fail("boom".to_string())),
            (AgentKind::Regulatory, MockBehavior::Delay(Duration::from_secs(5), dec!(60))),
        ],
    ];
    let requests = [
        (Some(DRUG), Some(CONDITION)),
        (Some(DRUG), None),
        (None, Some(CONDITION)),
        (None, None),
    ];

    for mocks in mixes {
        let pipeline = build_pipeline(&reader, mocks);
        for (drug, condition) in requests {
            let report = analyze(&pipeline, drug, condition).await;
            let selected: Vec<AgentKind> = report.case.selected_agents.iter().copied().collect();
            let recorded: Vec<AgentKind> = report.evidence.kinds().collect();
            assert_eq!(selected, recorded);

            let status = &report.agent_status;
            assert_eq!(
                status.succeeded.len() + status.timed_out.len() + status.failed.len(),
                selected.len()
            );

            if let Some(breakdown) = &report.breakdown {
                assert_eq!(breakdown.total_weight(), dec!(100));
            }
        }
    }
}

#[tokio::test]
async fn recognized_entities_are_known_repurposing_regardless_of_case() {
    let reader = seeded_reader();
    let pipeline = build_pipeline(&reader, vec![]);

    for (drug, condition) in [
        ("knowndrugx", "knownconditiony"),
        ("  KNOWNDRUGX ", "KnownConditionY"),
    ] {
        let report = analyze(&pipeline, Some(drug), Some(condition)).await;
        assert_eq!(report.case.knownness, Knownness::KnownRepurposing);
        assert_eq!(report.case.priority, 5);
    }

    let report = analyze(&pipeline, Some("UnlistedDrug"), Some(CONDITION)).await;
    assert_eq!(report.case.knownness, Knownness::Exploratory);
}

#[tokio::test]
async fn unrecorded_evidence_is_low_but_not_unavailable() {
    let reader = seeded_reader();
    let pipeline = build_pipeline(&reader, vec![]);

    let report = analyze(&pipeline, Some("UnlistedDrug"), Some("Unlisted condition")).await;

    assert_eq!(report.case.knownness, Knownness::Novel);
    let breakdown = report.breakdown.unwrap();
    assert!(breakdown
        .dimensions
        .iter()
        .all(|d| d.source == ScoreSource::Evidence));
    assert!(report.advisories.is_empty());
    let verdict = report.verdict.unwrap();
    assert!(verdict
        .risk_factors
        .iter()
        .all(|r| r.category != RiskCategory::DataUnavailable));
    assert!(verdict.composite < Decimal::from(65));
}

#[tokio::test]
async fn cancellation_returns_no_report() {
    let reader = seeded_reader();
    let pipeline = Arc::new(build_pipeline(
        &reader,
        vec![(AgentKind::Literature, MockBehavior::Hang)],
    ));
    let cancel = CancellationToken::new();

    let task = {
        let pipeline = Arc::clone(&pipeline);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            pipeline
                .analyze(&RepurposingRequest::new(Some(DRUG), None), &cancel)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let result = task.await.unwrap();
    assert!(matches!(
        result,
        Err(repurpose_agents::PipelineError::Cancelled)
    ));
}

#[tokio::test]
async fn cancellation_releases_in_flight_agents() {
    let reader = seeded_reader();
    let hanging = Arc::new(MockAgent::new(AgentKind::Literature, MockBehavior::Hang));
    let pipeline = Arc::new(build_pipeline_with(
        &reader,
        vec![Arc::clone(&hanging) as Arc<dyn EvidenceAgent>],
    ));
    let cancel = CancellationToken::new();

    let task = {
        let pipeline = Arc::clone(&pipeline);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            pipeline
                .analyze(&RepurposingRequest::new(Some(DRUG), None), &cancel)
                .await
        })
    };
    for _ in 0..200 {
        if hanging.calls() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(hanging.calls(), 1);
    assert_eq!(hanging.finished(), 0);

    cancel.cancel();
    let result = task.await.unwrap();

    assert!(matches!(
        result,
        Err(repurpose_agents::PipelineError::Cancelled)
    ));
    assert_eq!(hanging.finished(), 1);
}
