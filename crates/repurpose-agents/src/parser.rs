use repurpose_models::agent_message::{AgentKind, AgentResponse, AgentResult, DomainEvidence};
use rust_decimal::Decimal;

use crate::error::AgentError;

/// Extract the first JSON object from a string that may contain surrounding text.
///
/// Handles:
/// - Clean JSON: `{"key": "value"}`
/// - Markdown-wrapped: ```json\n{"key": "value"}\n```
/// - Prefix text: `Found 3 trials:\n{"key": "value"}`
pub fn extract_json(text: &str) -> Result<String, AgentError> {
    let trimmed = text.trim();

    if trimmed.starts_with('{') && serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
        return Ok(trimmed.to_string());
    }

    if let Some(json_str) = extract_from_markdown_block(trimmed) {
        if serde_json::from_str::<serde_json::Value>(&json_str).is_ok() {
            return Ok(json_str);
        }
    }

    if let Some(json_str) = extract_first_object(trimmed) {
        if serde_json::from_str::<serde_json::Value>(&json_str).is_ok() {
            return Ok(json_str);
        }
    }

    Err(AgentError::Parse(format!(
        "No valid JSON object found in output (length={})",
        text.len()
    )))
}

fn extract_from_markdown_block(text: &str) -> Option<String> {
    let start_markers = ["```json\n", "```json\r\n", "```\n", "```\r\n"];

    for marker in &start_markers {
        if let Some(start) = text.find(marker) {
            let json_start = start + marker.len();
            if let Some(end) = text[json_start..].find("```") {
                return Some(text[json_start..json_start + end].trim().to_string());
            }
        }
    }

    None
}

/// Find the first balanced { ... } in the text, ignoring braces inside strings.
/// Quotes only open strings once an object has started.
fn extract_first_object(text: &str) -> Option<String> {
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' if depth > 0 => in_string = !in_string,
            '{' if !in_string => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if !in_string && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start {
                        return Some(text[s..=i].to_string());
                    }
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse an AgentResponse from raw agent output.
pub fn parse_agent_response(raw: &str) -> Result<AgentResponse, AgentError> {
    let json_str = extract_json(raw)?;
    serde_json::from_str(&json_str)
        .map_err(|e| AgentError::Parse(format!("Failed to parse AgentResponse: {e}")))
}

/// Validate a raw response and parse its payload into the domain shape for `kind`.
pub fn normalize_response(
    kind: AgentKind,
    agent_name: &str,
    response: AgentResponse,
) -> Result<AgentResult, AgentError> {
    if response.confidence < Decimal::ZERO || response.confidence > Decimal::ONE_HUNDRED {
        return Err(AgentError::Malformed(format!(
            "confidence {} outside 0..=100",
            response.confidence
        )));
    }

    let evidence = DomainEvidence::parse(kind, &response.payload)
        .map_err(|e| AgentError::Malformed(format!("{kind} payload: {e}")))?;

    let agent_name = if response.agent_name.is_empty() {
        agent_name.to_string()
    } else {
        response.agent_name
    };

    Ok(AgentResult {
        kind,
        agent_name,
        confidence: response.confidence,
        summary: response.summary,
        evidence,
        payload: response.payload,
        sources: response.sources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn extract_clean_json() {
        let input = r#"{"confidence": 75, "summary": "test"}"#;
        assert_eq!(extract_json(input).unwrap(), input);
    }

    #[test]
    fn extract_from_markdown() {
        let input = "Results:\n```json\n{\"confidence\": 75}\n```\nDone.";
        assert_eq!(extract_json(input).unwrap(), r#"{"confidence": 75}"#);
    }

    #[test]
    fn extract_from_markdown_no_lang() {
        let input = "Result:\n```\n{\"confidence\": 75}\n```";
        assert_eq!(extract_json(input).unwrap(), r#"{"confidence": 75}"#);
    }

    #[test]
    fn extract_with_prefix_text() {
        let input = "Found 2 trials for the request:\n{\"confidence\": 75, \"summary\": \"two trials\"}";
        assert!(extract_json(input).unwrap().contains("two trials"));
    }

    #[test]
    fn extract_with_braces_in_strings() {
        let input = r#"{"summary": "dose {low} vs {high}", "confidence": 50}"#;
        let parsed: serde_json::Value = serde_json::from_str(&extract_json(input).unwrap()).unwrap();
        assert_eq!(parsed["confidence"], 50);
    }

    #[test]
    fn extract_tolerates_stray_closing_brace() {
        let input = "} noise {\"confidence\": 10}";
        assert_eq!(extract_json(input).unwrap(), r#"{"confidence": 10}"#);
    }

    #[test]
    fn extract_after_unbalanced_quote_in_prose() {
        let input = r#"Measured on a 5" screen: {"confidence": 10, "summary": "ok"}"#;
        let parsed: serde_json::Value = serde_json::from_str(&extract_json(input).unwrap()).unwrap();
        assert_eq!(parsed["confidence"], 10);
        assert_eq!(parsed["summary"], "ok");
    }

    #[test]
    fn extract_no_json() {
        assert!(extract_json("no trials matched").is_err());
    }

    #[test]
    fn parse_full_agent_response() {
        let input = r#"```json
{
    "agent_name": "clinicaltrials",
    "confidence": "82",
    "summary": "3 completed trials",
    "payload": {"trials": [{"id": "NCT1", "title": "t", "phase": "Phase 3"}]},
    "sources": ["clinicaltrials.gov"]
}
```"#;
        let response = parse_agent_response(input).unwrap();
        assert_eq!(response.agent_name, "clinicaltrials");
        assert_eq!(response.confidence, dec!(82));
    }

    #[test]
    fn normalize_parses_domain_payload() {
        let response = AgentResponse {
            agent_name: String::new(),
            confidence: dec!(70),
            summary: "ok".to_string(),
            payload: serde_json::json!({"patents": [{"number": "US1", "title": "t", "status": "granted"}]}),
            sources: vec![],
        };
        let result = normalize_response(AgentKind::Patents, "patents-agent", response).unwrap();
        assert_eq!(result.agent_name, "patents-agent");
        match result.evidence {
            DomainEvidence::Patents(p) => assert!(p.patents[0].is_granted()),
            other => panic!("unexpected evidence: {other:?}"),
        }
    }

    #[test]
    fn normalize_rejects_out_of_range_confidence() {
        let response = AgentResponse {
            agent_name: "x".to_string(),
            confidence: dec!(140),
            summary: String::new(),
            payload: serde_json::Value::Null,
            sources: vec![],
        };
        let err = normalize_response(AgentKind::Market, "x", response).unwrap_err();
        assert!(matches!(err, AgentError::Malformed(_)));
    }

    #[test]
    fn normalize_rejects_wrong_payload_shape() {
        let response = AgentResponse {
            agent_name: "x".to_string(),
            confidence: dec!(50),
            summary: String::new(),
            payload: serde_json::json!({"trials": 3}),
            sources: vec![],
        };
        let err = normalize_response(AgentKind::Trials, "x", response).unwrap_err();
        assert!(err.to_string().contains("trials payload"));
    }
}
