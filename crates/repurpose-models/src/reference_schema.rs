use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Categories for organizing reference keys.
/// The loader uses these when writing to the reference SQLite file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceCategory {
    Drug,
    Condition,
    Evidence,
    Trend,
}

impl ReferenceCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ReferenceCategory::Drug => "drug",
            ReferenceCategory::Condition => "condition",
            ReferenceCategory::Evidence => "evidence",
            ReferenceCategory::Trend => "trend",
        }
    }
}

/// The SQLite table the loader writes and the reference reader queries.
///
/// ```sql
/// CREATE TABLE IF NOT EXISTS reference_entries (
///     key         TEXT PRIMARY KEY,
///     category    TEXT NOT NULL,
///     value_json  TEXT NOT NULL,
///     source      TEXT NOT NULL,
///     drug        TEXT,
///     condition   TEXT,
///     created_at  TEXT NOT NULL,
///     expires_at  TEXT NOT NULL,
///     updated_at  TEXT NOT NULL
/// );
/// ```
pub const REFERENCE_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS reference_entries (
    key         TEXT PRIMARY KEY,
    category    TEXT NOT NULL,
    value_json  TEXT NOT NULL,
    source      TEXT NOT NULL,
    drug        TEXT,
    condition   TEXT,
    created_at  TEXT NOT NULL,
    expires_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_reference_category ON reference_entries(category);
CREATE INDEX IF NOT EXISTS idx_reference_drug ON reference_entries(drug);
CREATE INDEX IF NOT EXISTS idx_reference_condition ON reference_entries(condition);
CREATE INDEX IF NOT EXISTS idx_reference_expires ON reference_entries(expires_at);
";

/// Key conventions for the reference store. Names are normalized first.
///
/// - Drug profiles: `drug:{name}` (e.g., `drug:metformin`)
/// - Conditions: `condition:{name}` (e.g., `condition:type 2 diabetes`)
/// - Evidence: `evidence:{kind}:{drug|*}:{condition|*}`
///   (e.g., `evidence:trials:metformin:pcos`, `evidence:market:*:pcos`)
/// - Trend suggestions: `trend:{slug}`
pub mod key_patterns {
    pub const WILDCARD: &str = "*";
    pub const TREND_PREFIX: &str = "trend:";

    /// Trim, lower-case and collapse inner whitespace.
    pub fn normalize(name: &str) -> String {
        name.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    pub fn drug(name: &str) -> String {
        format!("drug:{}", normalize(name))
    }

    pub fn condition(name: &str) -> String {
        format!("condition:{}", normalize(name))
    }

    pub fn evidence(kind: &str, drug: Option<&str>, condition: Option<&str>) -> String {
        let part = |v: Option<&str>| v.map(normalize).unwrap_or_else(|| WILDCARD.to_string());
        format!("evidence:{kind}:{}:{}", part(drug), part(condition))
    }

    pub fn trend(slug: &str) -> String {
        format!("{TREND_PREFIX}{}", normalize(slug))
    }

    /// Normalize every `:`-separated segment of an already assembled key,
    /// so `evidence:trials:Metformin:PCOS` matches `evidence(..)` lookups.
    pub fn normalize_key(key: &str) -> String {
        key.split(':').map(normalize).collect::<Vec<_>>().join(":")
    }
}

/// A raw reference row as read from SQLite.
#[derive(Debug, Clone)]
pub struct ReferenceRow {
    pub key: String,
    pub category: String,
    pub value_json: String,
    pub source: String,
    pub drug: Option<String>,
    pub condition: Option<String>,
    pub created_at: String,
    pub expires_at: String,
    pub updated_at: String,
}

/// Everything the medicine dataset says about one drug, aggregated over its rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DrugProfile {
    pub name: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub indications: Vec<String>,
    #[serde(default)]
    pub classifications: Vec<String>,
    #[serde(default)]
    pub dosage_forms: Vec<String>,
    #[serde(default)]
    pub manufacturers: Vec<String>,
    #[serde(default)]
    pub record_count: u32,
}

impl DrugProfile {
    /// Whether any documented indication matches `condition`.
    pub fn treats(&self, condition: &str) -> bool {
        self.matching_indication(condition).is_some()
    }

    /// First indication equal to or mentioning `condition`, after normalization.
    pub fn matching_indication(&self, condition: &str) -> Option<&str> {
        let wanted = key_patterns::normalize(condition);
        if wanted.is_empty() {
            return None;
        }
        self.indications
            .iter()
            .find(|indication| key_patterns::normalize(indication).contains(&wanted))
            .map(String::as_str)
    }

    /// Sold under a prescription or over-the-counter classification.
    pub fn is_marketed(&self) -> bool {
        self.classifications.iter().any(|c| {
            let c = key_patterns::normalize(c);
            c == "prescription" || c == "over-the-counter" || c == "otc"
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConditionProfile {
    pub name: String,
    #[serde(default)]
    pub drug_count: u32,
}

/// Pre-collected evidence for one agent kind, stored under an `evidence:` key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredEvidence {
    pub confidence: Decimal,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub sources: Vec<String>,
}
