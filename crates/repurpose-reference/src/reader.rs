use std::sync::Mutex;
use std::time::Duration;

use repurpose_models::agent_message::{AgentKind, TrendSuggestion};
use repurpose_models::config::ReferenceConfig;
use repurpose_models::reference_schema::{key_patterns, DrugProfile, ReferenceRow, StoredEvidence};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::ReferenceError;
use crate::memory::MemoryCache;
use crate::sqlite::SqliteReference;

/// Read-through reference store: checks moka (hot) → SQLite → None.
///
/// SQLite hits and misses are promoted to moka. SQLite access is serialized
/// through a `Mutex` since `rusqlite::Connection` is not `Sync`.
pub struct ReferenceReader {
    memory: MemoryCache,
    sqlite: Mutex<SqliteReference>,
}

impl ReferenceReader {
    pub fn new(sqlite: SqliteReference, max_capacity: u64, memory_ttl: Duration) -> Self {
        Self {
            memory: MemoryCache::new(max_capacity, memory_ttl),
            sqlite: Mutex::new(sqlite),
        }
    }

    /// Open the configured SQLite file read-only.
    pub fn open(config: &ReferenceConfig) -> Result<Self, ReferenceError> {
        let sqlite = SqliteReference::open(&config.sqlite_path)?;
        Ok(Self::new(
            sqlite,
            config.memory_max_capacity,
            Duration::from_secs(config.memory_ttl_seconds),
        ))
    }

    /// Get a typed value by reference key.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ReferenceError> {
        match self.get_json(key).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Get the raw JSON string for a reference key.
    pub async fn get_json(&self, key: &str) -> Result<Option<String>, ReferenceError> {
        // 1. Check moka, including cached misses
        if let Some(cached) = self.memory.get(key).await {
            return Ok(cached);
        }

        // 2. Check SQLite (expiry filtering happens in the query)
        let row = {
            let sqlite = self.lock()?;
            sqlite.get(key)?
        };

        // 3. Promote to moka
        let value = row.map(|r| r.value_json);
        self.memory.insert(key.to_string(), value.clone()).await;
        Ok(value)
    }

    /// Live rows whose key starts with `prefix`. Not cached.
    pub fn get_by_prefix(&self, prefix: &str) -> Result<Vec<ReferenceRow>, ReferenceError> {
        self.lock()?.get_by_prefix(prefix)
    }

    pub async fn drug_profile(&self, drug: &str) -> Result<Option<DrugProfile>, ReferenceError> {
        self.get(&key_patterns::drug(drug)).await
    }

    pub async fn is_known_drug(&self, drug: &str) -> Result<bool, ReferenceError> {
        Ok(self.get_json(&key_patterns::drug(drug)).await?.is_some())
    }

    pub async fn is_known_condition(&self, condition: &str) -> Result<bool, ReferenceError> {
        Ok(self
            .get_json(&key_patterns::condition(condition))
            .await?
            .is_some())
    }

    /// Whether the dataset already lists `condition` among the drug's indications.
    pub async fn co_associated(&self, drug: &str, condition: &str) -> Result<bool, ReferenceError> {
        Ok(self
            .drug_profile(drug)
            .await?
            .is_some_and(|profile| profile.treats(condition)))
    }

    /// Stored evidence for one agent kind, most specific key first:
    /// `drug:condition`, then `drug:*`, then `*:condition`.
    pub async fn evidence(
        &self,
        kind: AgentKind,
        drug: Option<&str>,
        condition: Option<&str>,
    ) -> Result<Option<StoredEvidence>, ReferenceError> {
        let mut candidates = vec![key_patterns::evidence(kind.as_str(), drug, condition)];
        if drug.is_some() && condition.is_some() {
            candidates.push(key_patterns::evidence(kind.as_str(), drug, None));
            candidates.push(key_patterns::evidence(kind.as_str(), None, condition));
        }

        for key in candidates {
            if let Some(evidence) = self.get::<StoredEvidence>(&key).await? {
                debug!(key = %key, "Reference evidence hit");
                return Ok(Some(evidence));
            }
        }
        Ok(None)
    }

    /// Every stored trend suggestion, highest score first.
    pub fn trends(&self) -> Result<Vec<TrendSuggestion>, ReferenceError> {
        let rows = self.get_by_prefix(key_patterns::TREND_PREFIX)?;
        let mut suggestions = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_str::<TrendSuggestion>(&row.value_json) {
                Ok(suggestion) => suggestions.push(suggestion),
                Err(e) => warn!(key = %row.key, error = %e, "Skipping malformed trend row"),
            }
        }
        suggestions.sort_by(|a, b| b.trend_score.cmp(&a.trend_score));
        Ok(suggestions)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, SqliteReference>, ReferenceError> {
        self.sqlite
            .lock()
            .map_err(|e| ReferenceError::Unavailable(format!("SQLite mutex poisoned: {e}")))
    }
}
