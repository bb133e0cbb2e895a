//! Integration tests that run `CommandAgent` against small `/bin/sh` scripts.
//!
//! Each script stands in for an external evidence collector: it receives the
//! `AgentRequest` JSON on stdin and prints a response on stdout.
#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use repurpose_agents::{AgentError, CommandAgent, EvidenceAgent, Orchestrator};
use repurpose_models::agent_message::{AgentKind, AgentRequest};
use repurpose_models::config::AgentsConfig;
use repurpose_models::evidence::AgentOutcome;
use repurpose_models::request::{Case, RepurposingRequest};
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn sh(script: &str, kind: AgentKind) -> CommandAgent {
    CommandAgent::new(
        &format!("sh-{kind}"),
        kind,
        "/bin/sh",
        vec!["-c".to_string(), script.to_string()],
    )
}

fn request(kind: AgentKind, budget: Duration) -> AgentRequest {
    AgentRequest {
        request_id: Uuid::new_v4(),
        kind,
        drug_name: Some("metformin".to_string()),
        condition_name: Some("pcos".to_string()),
        deadline: Utc::now() + chrono::Duration::from_std(budget).unwrap(),
    }
}

#[tokio::test]
async fn plain_json_response_is_parsed() {
    let agent = sh(
        r#"cat > /dev/null; echo '{"agent_name": "sh-patents", "confidence": 72, "summary": "2 patents", "payload": {"patents": []}, "sources": ["uspto"]}'"#,
        AgentKind::Patents,
    );

    let response = agent
        .invoke(&request(AgentKind::Patents, Duration::from_secs(10)))
        .await
        .unwrap();

    assert_eq!(response.confidence, dec!(72));
    assert_eq!(response.summary, "2 patents");
    assert_eq!(response.sources, vec!["uspto".to_string()]);
}

#[tokio::test]
async fn script_sees_the_request_on_stdin() {
    // Echo the drug name back through the summary.
    let agent = sh(
        r#"drug=$(sed -n 's/.*"drug_name":"\([^"]*\)".*/\1/p'); printf '{"confidence": 40, "summary": "%s"}' "$drug""#,
        AgentKind::Literature,
    );

    let response = agent
        .invoke(&request(AgentKind::Literature, Duration::from_secs(10)))
        .await
        .unwrap();

    assert_eq!(response.summary, "metformin");
}

#[tokio::test]
async fn fenced_response_inside_prose_is_extracted() {
    let agent = sh(
        r#"cat > /dev/null
printf 'Here is what I found:\n```json\n{"confidence": 55, "summary": "market", "payload": {"unmet_need": "high"}}\n```\nDone.\n'"#,
        AgentKind::Market,
    );

    let response = agent
        .invoke(&request(AgentKind::Market, Duration::from_secs(10)))
        .await
        .unwrap();

    assert_eq!(response.confidence, dec!(55));
    assert_eq!(response.payload["unmet_need"], "high");
}

#[tokio::test]
async fn non_zero_exit_is_a_command_error() {
    let agent = sh("echo 'registry unavailable' >&2; exit 3", AgentKind::Trials);

    let err = agent
        .invoke(&request(AgentKind::Trials, Duration::from_secs(10)))
        .await
        .unwrap_err();

    match err {
        AgentError::Command(message) => assert!(message.contains("registry unavailable")),
        other => panic!("expected command error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_output_is_a_command_error() {
    let agent = sh("cat > /dev/null", AgentKind::Regulatory);

    let err = agent
        .invoke(&request(AgentKind::Regulatory, Duration::from_secs(10)))
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::Command(ref m) if m.contains("empty output")));
}

#[tokio::test]
async fn slow_program_times_out() {
    let agent = sh("sleep 5", AgentKind::Patents);

    let err = agent
        .invoke(&request(AgentKind::Patents, Duration::from_millis(200)))
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::Timeout(_)));
}

#[tokio::test]
async fn orchestrator_records_command_outcomes() {
    let agents: Vec<Arc<dyn EvidenceAgent>> = vec![
        Arc::new(sh(
            r#"cat > /dev/null; echo '{"confidence": 80, "payload": {"papers": [{"title": "RCT"}]}}'"#,
            AgentKind::Literature,
        )),
        Arc::new(sh("exit 1", AgentKind::Trials)),
        Arc::new(sh(
            r#"cat > /dev/null; echo 'no json here'"#,
            AgentKind::Patents,
        )),
        Arc::new(sh(
            r#"cat > /dev/null; echo '{"confidence": 60, "payload": {"approved": true}}'"#,
            AgentKind::Regulatory,
        )),
    ];
    let orchestrator = Orchestrator::new(agents, AgentsConfig::default());
    let case = Case::new(&RepurposingRequest::new(Some("metformin"), None), true, false);

    let bundle = orchestrator
        .run(&case, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(bundle.len(), 4);
    assert_eq!(
        bundle.succeeded(),
        vec![AgentKind::Literature, AgentKind::Regulatory]
    );
    assert!(matches!(
        bundle.outcome(AgentKind::Trials),
        Some(AgentOutcome::Failed { .. })
    ));
    assert!(matches!(
        bundle.outcome(AgentKind::Patents),
        Some(AgentOutcome::Failed { .. })
    ));
    // Missing agent_name falls back to the registered name.
    assert_eq!(
        bundle.result(AgentKind::Literature).unwrap().agent_name,
        "sh-literature"
    );
}
