use serde::{Deserialize, Serialize};

use crate::error::MedMcpError;
use crate::sources::openfda::{EnforcementResult, OpenFdaClient};

pub const DEFAULT_RECALL_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallRecord {
    pub recall_number: String,
    pub classification: String,
    pub product_description: String,
    pub reason_for_recall: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recall_initiation_date: Option<String>,
}

/// Recall lookup result; no matching enforcement records is a normal outcome
/// reported through `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallReport {
    pub search_term: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recalls: Vec<RecallRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl RecallReport {
    pub fn has_recalls(&self) -> bool {
        !self.recalls.is_empty()
    }
}

fn from_enforcement(raw: EnforcementResult) -> RecallRecord {
    RecallRecord {
        recall_number: raw.recall_number,
        classification: raw.classification,
        product_description: raw.product_description,
        reason_for_recall: raw.reason_for_recall,
        status: raw.status,
        distribution_pattern: raw.distribution_pattern,
        recall_initiation_date: raw.recall_initiation_date,
    }
}

/// Searches drug enforcement records by product description substring.
pub async fn search_recalls(
    client: &OpenFdaClient,
    drug: &str,
    limit: usize,
) -> Result<RecallReport, MedMcpError> {
    let drug = drug.trim();
    if drug.is_empty() {
        return Err(MedMcpError::InvalidArgument(
            "Drug name is required. Example: medmcp recall amoxicillin".into(),
        ));
    }

    let escaped = OpenFdaClient::escape_query_value(drug);
    let query = format!("product_description:\"{escaped}\"");

    let recalls: Vec<RecallRecord> = match client.enforcement_search(&query, limit).await? {
        Some(resp) => resp.results.into_iter().map(from_enforcement).collect(),
        None => Vec::new(),
    };

    if recalls.is_empty() {
        return Ok(RecallReport {
            search_term: drug.to_string(),
            recalls: Vec::new(),
            status: Some(format!("No recall records found for \"{drug}\"")),
        });
    }

    Ok(RecallReport {
        search_term: drug.to_string(),
        recalls,
        status: None,
    })
}
