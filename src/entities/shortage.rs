use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entities::RiskLevel;
use crate::error::MedMcpError;
use crate::sources::openfda::{DrugShortageResult, OpenFdaClient};
use crate::transform::normalize::{clean_drug_name, clean_drug_name_for_trends};
use crate::transform::shortage::{
    RelevanceConfig, build_strategies, record_matches_term, record_matches_trend_term,
    to_shortage_record,
};
use crate::transform::trends::{build_trend_report, empty_trend_report};

/// Rows fetched per fallback-chain strategy.
const SEARCH_PAGE_SIZE: usize = 20;
/// Rows fetched for the single broad trend query.
const TREND_PAGE_SIZE: usize = 100;

pub const MAX_TREND_MONTHS: u32 = 60;

/// One upstream shortage entry, reshaped for callers. Request-scoped; nothing
/// here is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortageRecord {
    pub generic_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proprietary_name: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortage_reason: Option<String>,
    pub company_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage_form: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strength: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub therapeutic_category: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_posting_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alias_names: Vec<String>,
}

/// Result of a shortage lookup. Absence of a shortage is a normal outcome:
/// `shortages` is empty and `status` explains, and callers must not treat
/// that as a failed lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortageReport {
    pub search_term: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shortages: Vec<ShortageRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ShortageReport {
    pub fn has_shortages(&self) -> bool {
        !self.shortages.is_empty()
    }
}

/// Shortage-history aggregation for one drug over the analysis window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    pub drug_name: String,
    pub analysis_period: String,
    pub total_shortage_events: usize,
    pub status_breakdown: BTreeMap<String, usize>,
    pub companies_affected: usize,
    pub recent_activity: usize,
    pub shortage_frequency: String,
    pub top_reasons: String,
    pub risk_level: RiskLevel,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_records: Vec<ShortageRecord>,
}

/// Looks up current shortage records for a free-text drug identifier.
///
/// Query formulations are tried in order and the first one that yields any
/// *relevant* rows wins; upstream misses and transient failures both mean
/// "try the next formulation". Exhausting the chain is not an error.
pub async fn find_shortages(
    client: &OpenFdaClient,
    drug: &str,
) -> Result<ShortageReport, MedMcpError> {
    let drug = drug.trim();
    if drug.is_empty() {
        return Err(MedMcpError::InvalidArgument(
            "Drug name is required. Example: medmcp shortage amoxicillin".into(),
        ));
    }

    let cleaned = clean_drug_name(drug);
    let config = RelevanceConfig::default();

    for strategy in build_strategies(drug, &cleaned) {
        let resp = match client.shortage_search(&strategy.query, SEARCH_PAGE_SIZE).await {
            Ok(Some(resp)) => resp,
            Ok(None) => continue,
            Err(err) => {
                debug!(query = %strategy.query, error = %err, "shortage strategy failed, trying next");
                continue;
            }
        };

        let relevant: Vec<ShortageRecord> = resp
            .results
            .iter()
            .filter(|record| record_matches_term(record, &strategy.term, &config))
            .map(to_shortage_record)
            .collect();

        // Rows that all fail the relevance filter are a miss, not a result.
        if !relevant.is_empty() {
            return Ok(ShortageReport {
                search_term: strategy.term,
                shortages: relevant,
                status: None,
            });
        }
    }

    Ok(ShortageReport {
        search_term: cleaned,
        shortages: Vec::new(),
        status: Some(format!("No current shortages found for \"{drug}\"")),
    })
}

/// Analyzes shortage history for one drug and classifies its supply risk.
///
/// The shortage endpoint cannot filter by date server-side, so this pulls a
/// broad page and filters client-side; `months_back` labels the analysis
/// window in the report.
pub async fn analyze_trends(
    client: &OpenFdaClient,
    drug: &str,
    months_back: u32,
) -> Result<TrendReport, MedMcpError> {
    let drug = drug.trim();
    if drug.is_empty() {
        return Err(MedMcpError::InvalidArgument(
            "Drug name is required. Example: medmcp trends insulin".into(),
        ));
    }
    if months_back == 0 || months_back > MAX_TREND_MONTHS {
        return Err(MedMcpError::InvalidArgument(format!(
            "months-back must be between 1 and {MAX_TREND_MONTHS}"
        )));
    }

    let cleaned = clean_drug_name_for_trends(drug);
    let escaped = OpenFdaClient::escape_query_value(&cleaned);
    let query = format!("\"{escaped}\"");

    let Some(resp) = client.shortage_search(&query, TREND_PAGE_SIZE).await? else {
        return Ok(empty_trend_report(&cleaned, months_back));
    };

    let relevant: Vec<DrugShortageResult> = resp
        .results
        .into_iter()
        .filter(|record| record_matches_trend_term(record, &cleaned))
        .collect();

    Ok(build_trend_report(&cleaned, months_back, &relevant))
}
