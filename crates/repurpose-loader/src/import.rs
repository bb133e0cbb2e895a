//! Builds reference rows from the medicine dataset and the evidence seed file.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;

use chrono::{Duration, Utc};
use repurpose_models::reference_schema::{
    key_patterns, ConditionProfile, DrugProfile, ReferenceCategory, ReferenceRow,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::LoaderConfig;
use crate::error::LoaderError;
use crate::writer::SqliteWriter;

const DATASET_SOURCE: &str = "medicine_dataset";
const SEED_SOURCE: &str = "evidence_seed";

/// One row of the medicine dataset CSV.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicineRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Category", default)]
    pub category: String,
    #[serde(rename = "Dosage Form", default)]
    pub dosage_form: String,
    #[serde(rename = "Strength", default)]
    pub strength: String,
    #[serde(rename = "Manufacturer", default)]
    pub manufacturer: String,
    #[serde(rename = "Indication", default)]
    pub indication: String,
    #[serde(rename = "Classification", default)]
    pub classification: String,
}

/// One entry of the evidence seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntry {
    pub key: String,
    pub category: ReferenceCategory,
    #[serde(default)]
    pub drug: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    pub value: serde_json::Value,
}

/// Row counts written by one import run.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub medicine_records: usize,
    pub skipped_records: usize,
    pub drugs: usize,
    pub conditions: usize,
    pub seed_entries: usize,
    pub expired: usize,
    pub rows_by_category: BTreeMap<String, usize>,
    pub total_rows: usize,
}

/// Read medicine records, skipping rows without a name or that fail to parse.
pub fn read_medicines<R: Read>(input: R) -> Result<(Vec<MedicineRecord>, usize), LoaderError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);

    let mut records = Vec::new();
    let mut skipped = 0;
    for (line, result) in reader.deserialize::<MedicineRecord>().enumerate() {
        match result {
            Ok(record) if !record.name.trim().is_empty() => records.push(record),
            Ok(_) => skipped += 1,
            Err(e) => {
                warn!(line = line + 2, error = %e, "Skipping malformed medicine row");
                skipped += 1;
            }
        }
    }
    Ok((records, skipped))
}

/// Group records by normalized drug name. The first spelling seen is kept as
/// the display name; list fields keep first-seen order without duplicates.
pub fn aggregate_profiles(records: &[MedicineRecord]) -> Vec<DrugProfile> {
    let mut profiles: BTreeMap<String, DrugProfile> = BTreeMap::new();

    for record in records {
        let profile = profiles
            .entry(key_patterns::normalize(&record.name))
            .or_insert_with(|| DrugProfile {
                name: record.name.trim().to_string(),
                ..Default::default()
            });
        push_unique(&mut profile.categories, &record.category);
        push_unique(&mut profile.indications, &record.indication);
        push_unique(&mut profile.classifications, &record.classification);
        push_unique(&mut profile.dosage_forms, &record.dosage_form);
        push_unique(&mut profile.manufacturers, &record.manufacturer);
        profile.record_count += 1;
    }

    profiles.into_values().collect()
}

/// One profile per distinct indication, counting the drugs that list it.
pub fn condition_profiles(drugs: &[DrugProfile]) -> Vec<ConditionProfile> {
    let mut conditions: BTreeMap<String, ConditionProfile> = BTreeMap::new();
    for drug in drugs {
        for indication in &drug.indications {
            let entry = conditions
                .entry(key_patterns::normalize(indication))
                .or_insert_with(|| ConditionProfile {
                    name: indication.clone(),
                    drug_count: 0,
                });
            entry.drug_count += 1;
        }
    }
    conditions.into_values().collect()
}

pub fn read_seed<R: Read>(input: R) -> Result<Vec<SeedEntry>, LoaderError> {
    Ok(serde_json::from_reader(input)?)
}

/// Turn profiles and seed entries into reference rows expiring after `ttl`.
pub fn build_rows(
    drugs: &[DrugProfile],
    conditions: &[ConditionProfile],
    seed: &[SeedEntry],
    ttl: Duration,
) -> Result<Vec<ReferenceRow>, LoaderError> {
    let now = Utc::now();
    let row = |key: String,
               category: ReferenceCategory,
               value_json: String,
               source: &str,
               drug: Option<String>,
               condition: Option<String>| ReferenceRow {
        key,
        category: category.as_str().to_string(),
        value_json,
        source: source.to_string(),
        drug,
        condition,
        created_at: now.to_rfc3339(),
        expires_at: (now + ttl).to_rfc3339(),
        updated_at: now.to_rfc3339(),
    };

    let mut rows = Vec::with_capacity(drugs.len() + conditions.len() + seed.len());
    for drug in drugs {
        rows.push(row(
            key_patterns::drug(&drug.name),
            ReferenceCategory::Drug,
            serde_json::to_string(drug)?,
            DATASET_SOURCE,
            Some(key_patterns::normalize(&drug.name)),
            None,
        ));
    }
    for condition in conditions {
        rows.push(row(
            key_patterns::condition(&condition.name),
            ReferenceCategory::Condition,
            serde_json::to_string(condition)?,
            DATASET_SOURCE,
            None,
            Some(key_patterns::normalize(&condition.name)),
        ));
    }
    for entry in seed {
        rows.push(row(
            key_patterns::normalize_key(&entry.key),
            entry.category,
            serde_json::to_string(&entry.value)?,
            SEED_SOURCE,
            entry.drug.as_deref().map(key_patterns::normalize),
            entry.condition.as_deref().map(key_patterns::normalize),
        ));
    }
    Ok(rows)
}

/// Import the configured dataset (and seed file, if any) into `writer`.
pub fn run_import(config: &LoaderConfig, writer: &mut SqliteWriter) -> Result<ImportSummary, LoaderError> {
    config.validate()?;

    let (records, skipped_records) = read_medicines(File::open(&config.dataset.csv_path)?)?;
    let drugs = aggregate_profiles(&records);
    let conditions = condition_profiles(&drugs);
    info!(
        records = records.len(),
        skipped = skipped_records,
        drugs = drugs.len(),
        conditions = conditions.len(),
        "Medicine dataset parsed"
    );

    let seed = match &config.dataset.evidence_path {
        Some(path) => read_seed(File::open(path)?)?,
        None => Vec::new(),
    };

    let ttl = Duration::seconds(config.dataset.ttl_seconds as i64);
    let rows = build_rows(&drugs, &conditions, &seed, ttl)?;
    let stats = writer.apply(&rows)?;
    let rows_by_category = writer.category_counts()?;

    let summary = ImportSummary {
        medicine_records: records.len(),
        skipped_records,
        drugs: drugs.len(),
        conditions: conditions.len(),
        seed_entries: seed.len(),
        expired: stats.expired,
        total_rows: rows_by_category.values().sum(),
        rows_by_category,
    };
    info!(
        written = stats.written,
        expired = stats.expired,
        total = summary.total_rows,
        "Reference import complete"
    );
    Ok(summary)
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }
    if !values.iter().any(|v| v.eq_ignore_ascii_case(value)) {
        values.push(value.to_string());
    }
}
