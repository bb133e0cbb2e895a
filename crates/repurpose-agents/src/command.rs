use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use repurpose_models::agent_message::{AgentKind, AgentRequest, AgentResponse};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::agent::EvidenceAgent;
use crate::error::AgentError;
use crate::parser::parse_agent_response;

/// An agent backed by an external program.
///
/// The program receives the `AgentRequest` as JSON on stdin and prints an
/// `AgentResponse` JSON object on stdout (bare, fenced, or inside prose).
/// The child is killed if the invocation is abandoned.
pub struct CommandAgent {
    name: String,
    kind: AgentKind,
    program: String,
    args: Vec<String>,
}

impl CommandAgent {
    pub fn new(name: &str, kind: AgentKind, program: &str, args: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            program: program.to_string(),
            args,
        }
    }

    async fn run(&self, input: &[u8]) -> Result<String, AgentError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AgentError::Command(format!("Failed to spawn {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(input).await {
                Ok(()) => {}
                // The program may exit without reading its input.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Err(e) => return Err(AgentError::Io(e)),
            }
        }

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(agent = %self.name, status = %output.status, stderr = %stderr, "Agent command failed");
            return Err(AgentError::Command(format!(
                "{} exited {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if stdout.trim().is_empty() {
            return Err(AgentError::Command(format!(
                "{} returned empty output",
                self.program
            )));
        }

        Ok(stdout)
    }
}

#[async_trait]
impl EvidenceAgent for CommandAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AgentKind {
        self.kind
    }

    async fn invoke(&self, request: &AgentRequest) -> Result<AgentResponse, AgentError> {
        debug!(agent = %self.name, program = %self.program, "Invoking agent command");

        let input = serde_json::to_vec(request)?;
        let budget = (request.deadline - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);

        let raw_output = tokio::time::timeout(budget, self.run(&input))
            .await
            .map_err(|_| AgentError::Timeout(budget.as_millis() as u64))??;

        parse_agent_response(&raw_output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_agent_identity() {
        let agent = CommandAgent::new(
            "pubmed",
            AgentKind::Literature,
            "/usr/local/bin/pubmed-agent",
            vec!["--json".to_string()],
        );
        assert_eq!(agent.name(), "pubmed");
        assert_eq!(agent.kind(), AgentKind::Literature);
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_failure() {
        let agent = CommandAgent::new(
            "ghost",
            AgentKind::Patents,
            "/nonexistent/agent-binary",
            vec![],
        );
        let request = AgentRequest {
            request_id: uuid::Uuid::new_v4(),
            kind: AgentKind::Patents,
            drug_name: Some("Metformin".to_string()),
            condition_name: None,
            deadline: Utc::now() + chrono::Duration::seconds(5),
        };

        match agent.invoke(&request).await {
            Err(AgentError::Command(msg)) => assert!(msg.starts_with("Failed to spawn")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
