use std::sync::Arc;

use async_trait::async_trait;
use repurpose_models::agent_message::{AgentKind, AgentRequest, AgentResponse};
use repurpose_models::reference_schema::DrugProfile;
use repurpose_reference::ReferenceReader;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::agent::EvidenceAgent;
use crate::error::AgentError;

const NO_RECORDS_CONFIDENCE: i64 = 20;
const PROFILE_ONLY_CONFIDENCE: i64 = 50;
const TREND_CONFIDENCE: i64 = 60;

/// An agent that answers from the local reference store.
///
/// Stored `evidence:` rows supply the payload; the drug profile fills in
/// what the medicine dataset itself can tell (approval status, indications,
/// record counts).
pub struct ReferenceAgent {
    name: String,
    kind: AgentKind,
    reader: Arc<ReferenceReader>,
}

impl ReferenceAgent {
    pub fn new(name: &str, kind: AgentKind, reader: Arc<ReferenceReader>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            reader,
        }
    }

    fn trend_response(&self) -> Result<AgentResponse, AgentError> {
        let suggestions = self.reader.trends()?;
        let confidence = if suggestions.is_empty() {
            NO_RECORDS_CONFIDENCE
        } else {
            TREND_CONFIDENCE
        };
        Ok(AgentResponse {
            agent_name: self.name.clone(),
            confidence: Decimal::from(confidence),
            summary: format!("{} trending repurposing opportunities", suggestions.len()),
            payload: json!({ "suggestions": suggestions }),
            sources: vec!["reference".to_string()],
        })
    }
}

#[async_trait]
impl EvidenceAgent for ReferenceAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AgentKind {
        self.kind
    }

    async fn invoke(&self, request: &AgentRequest) -> Result<AgentResponse, AgentError> {
        if self.kind == AgentKind::Trend {
            return self.trend_response();
        }

        let drug = request.drug_name.as_deref();
        let condition = request.condition_name.as_deref();

        let stored = self.reader.evidence(self.kind, drug, condition).await?;
        let profile = match drug {
            Some(drug) => self.reader.drug_profile(drug).await?,
            None => None,
        };

        let (mut confidence, summary, mut payload, mut sources) = match stored {
            Some(stored) => (stored.confidence, stored.summary, stored.payload, stored.sources),
            None => (
                Decimal::from(NO_RECORDS_CONFIDENCE),
                "No records found".to_string(),
                Value::Object(Map::new()),
                Vec::new(),
            ),
        };
        if payload.is_null() {
            payload = Value::Object(Map::new());
        }

        let enriched = match (&profile, payload.as_object_mut()) {
            (Some(profile), Some(fields)) => enrich(self.kind, profile, condition, fields),
            _ => false,
        };
        if enriched {
            confidence = confidence.max(Decimal::from(PROFILE_ONLY_CONFIDENCE));
            sources.push("reference".to_string());
        }

        debug!(agent = %self.name, kind = %self.kind, enriched, "Reference agent answered");

        Ok(AgentResponse {
            agent_name: self.name.clone(),
            confidence,
            summary,
            payload,
            sources,
        })
    }
}

/// Fill payload fields the drug profile can answer. Returns whether anything was added.
fn enrich(
    kind: AgentKind,
    profile: &DrugProfile,
    condition: Option<&str>,
    fields: &mut Map<String, Value>,
) -> bool {
    match kind {
        AgentKind::Trials => match condition {
            Some(condition) if profile.treats(condition) => {
                fields.insert("already_approved".to_string(), Value::Bool(true));
                true
            }
            _ => false,
        },
        AgentKind::Regulatory => {
            let mut changed = false;
            if profile.is_marketed() && !fields.contains_key("approved") {
                fields.insert("approved".to_string(), Value::Bool(true));
                changed = true;
            }
            if let Some(classification) = profile.classifications.first() {
                if !fields.contains_key("classification") {
                    fields.insert("classification".to_string(), json!(classification));
                    changed = true;
                }
            }
            let matching = condition.and_then(|c| profile.matching_indication(c));
            if let Some(indication) = matching {
                if !fields.contains_key("approved_indication") {
                    fields.insert("approved_indication".to_string(), json!(indication));
                    changed = true;
                }
            }
            changed
        }
        AgentKind::Literature if profile.record_count > 0 => {
            fields.insert("reference_records".to_string(), json!(profile.record_count));
            true
        }
        _ => false,
    }
}
