use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MedMcpError;
use crate::sources::openfda::{FaersEventResult, OpenFdaClient};

/// FAERS page size; reports beyond `REPORT_DISPLAY_LIMIT` only feed the counters.
const FAERS_PAGE_SIZE: usize = 100;
const REPORT_DISPLAY_LIMIT: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdverseEventReaction {
    pub term: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdverseEventReport {
    pub report_id: String,
    pub serious: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reactions: Vec<AdverseEventReaction>,
}

/// Adverse-event lookup result; absence of reports is a `status`, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdverseEventSummary {
    pub drug_name: String,
    pub total_reports: usize,
    pub serious_reports: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reports: Vec<AdverseEventReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

fn from_faers(raw: &FaersEventResult) -> AdverseEventReport {
    let reactions = raw
        .patient
        .as_ref()
        .map(|patient| {
            patient
                .reaction
                .iter()
                .filter_map(|r| {
                    let term = r.reactionmeddrapt.as_deref()?.trim();
                    if term.is_empty() {
                        return None;
                    }
                    Some(AdverseEventReaction {
                        term: term.to_string(),
                        outcome: r.reactionoutcome.clone(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    AdverseEventReport {
        report_id: raw
            .safetyreportid
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        serious: raw.serious.as_deref() == Some("1"),
        received_date: raw.receivedate.clone(),
        reactions,
    }
}

/// Fetches FAERS reports for a drug. Two query formulations are tried in
/// order (product name, then indication); a miss on one falls through to the
/// next, and exhausting both is a normal empty outcome.
pub async fn fetch_adverse_events(
    client: &OpenFdaClient,
    drug: &str,
    serious_only: bool,
) -> Result<AdverseEventSummary, MedMcpError> {
    let drug = drug.trim();
    if drug.is_empty() {
        return Err(MedMcpError::InvalidArgument(
            "Drug name is required. Example: medmcp adverse-events metformin".into(),
        ));
    }

    let escaped = OpenFdaClient::escape_query_value(drug);
    let strategies = [
        format!("patient.drug.medicinalproduct:\"{escaped}\""),
        format!("patient.drug.drugindication:\"{escaped}\""),
    ];

    for query in &strategies {
        let resp = match client.faers_search(query, FAERS_PAGE_SIZE).await {
            Ok(Some(resp)) => resp,
            Ok(None) => continue,
            Err(err) => {
                debug!(query = %query, error = %err, "FAERS strategy failed, trying next");
                continue;
            }
        };
        if resp.results.is_empty() {
            continue;
        }

        let mut reports: Vec<AdverseEventReport> =
            resp.results.iter().map(from_faers).collect();
        let serious_reports = reports.iter().filter(|r| r.serious).count();
        if serious_only {
            reports.retain(|r| r.serious);
        }
        let total_reports = reports.len();
        reports.truncate(REPORT_DISPLAY_LIMIT);

        return Ok(AdverseEventSummary {
            drug_name: drug.to_string(),
            total_reports,
            serious_reports,
            reports,
            status: None,
        });
    }

    Ok(AdverseEventSummary {
        drug_name: drug.to_string(),
        total_reports: 0,
        serious_reports: 0,
        reports: Vec::new(),
        status: Some(format!("No adverse event reports found for \"{drug}\"")),
    })
}
