use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use repurpose_models::request::{Advisory, Case, LookupEntity, RepurposingRequest};
use repurpose_reference::ReferenceReader;
use tracing::{info, warn};

use crate::error::AgentError;

/// Answers whether a drug or condition is a recognized entity.
#[async_trait]
pub trait KnownnessLookup: Send + Sync {
    async fn is_known_drug(&self, drug: &str) -> Result<bool, AgentError>;
    async fn is_known_condition(&self, condition: &str) -> Result<bool, AgentError>;
}

#[async_trait]
impl KnownnessLookup for ReferenceReader {
    async fn is_known_drug(&self, drug: &str) -> Result<bool, AgentError> {
        Ok(ReferenceReader::is_known_drug(self, drug).await?)
    }

    async fn is_known_condition(&self, condition: &str) -> Result<bool, AgentError> {
        Ok(ReferenceReader::is_known_condition(self, condition).await?)
    }
}

/// Derives a [`Case`] from a request. Never fails: lookup errors and
/// timeouts degrade the entity to unfamiliar and leave an advisory.
pub struct CaseClassifier {
    lookup: Arc<dyn KnownnessLookup>,
    lookup_timeout: Duration,
}

impl CaseClassifier {
    pub fn new(lookup: Arc<dyn KnownnessLookup>, lookup_timeout: Duration) -> Self {
        Self {
            lookup,
            lookup_timeout,
        }
    }

    pub async fn classify(&self, request: &RepurposingRequest) -> Case {
        let mut advisories = Vec::new();

        let drug_known = match request.drug() {
            Some(drug) => {
                let lookup = self.lookup.is_known_drug(drug);
                self.bounded(LookupEntity::Drug, lookup, &mut advisories)
                    .await
            }
            None => false,
        };

        let condition_known = match request.condition() {
            Some(condition) => {
                let lookup = self.lookup.is_known_condition(condition);
                self.bounded(LookupEntity::Condition, lookup, &mut advisories)
                    .await
            }
            None => false,
        };

        let mut case = Case::new(request, drug_known, condition_known);
        case.advisories = advisories;

        info!(
            presence_mode = ?case.presence_mode,
            knownness = ?case.knownness,
            priority = case.priority,
            agents = case.selected_agents.len(),
            degraded = case.is_degraded(),
            "Request classified"
        );

        case
    }

    async fn bounded<F>(
        &self,
        entity: LookupEntity,
        lookup: F,
        advisories: &mut Vec<Advisory>,
    ) -> bool
    where
        F: std::future::Future<Output = Result<bool, AgentError>>,
    {
        let reason = match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(Ok(known)) => return known,
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!(
                "lookup timed out after {} ms",
                self.lookup_timeout.as_millis()
            ),
        };

        warn!(entity = ?entity, reason = %reason, "Knownness lookup degraded");
        advisories.push(Advisory::ClassificationDegraded { entity, reason });
        false
    }
}
