use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entities::label::{LabelSummary, fetch_label};
use crate::entities::shortage::{ShortageReport, find_shortages};
use crate::error::MedMcpError;
use crate::sources::openfda::OpenFdaClient;

/// Combined label + shortage view for one medication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationProfile {
    pub drug_identifier: String,
    pub shortage_search_term: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<LabelSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_error: Option<String>,
    pub shortage: ShortageReport,
    pub overall_status: String,
}

fn overall_status(label_ok: bool, has_shortages: bool) -> String {
    match (label_ok, has_shortages) {
        (true, true) => {
            "Retrieved complete drug profile with current shortage information".to_string()
        }
        (true, false) => {
            "Retrieved complete drug profile; no current shortages found".to_string()
        }
        (false, true) => {
            "Retrieved shortage data but failed to get label information".to_string()
        }
        (false, false) => {
            "No shortage found and failed to get label information".to_string()
        }
    }
}

/// Fetches label and shortage status together. The label's first generic name
/// becomes the shortage search term when available, since the shortage index
/// keys on active ingredients rather than brand names.
pub async fn medication_profile(
    client: &OpenFdaClient,
    drug: &str,
) -> Result<MedicationProfile, MedMcpError> {
    let drug = drug.trim();
    if drug.is_empty() {
        return Err(MedMcpError::InvalidArgument(
            "Drug name is required. Example: medmcp profile lisinopril".into(),
        ));
    }

    let (label, label_error) = match fetch_label(client, drug).await {
        Ok(label) => (Some(label), None),
        Err(err) => {
            debug!(drug, error = %err, "label fetch failed, continuing with shortage lookup");
            (None, Some(err.to_string()))
        }
    };

    let shortage_search_term = label
        .as_ref()
        .and_then(|l| l.generic_names.first())
        .map(|name| name.to_lowercase())
        .unwrap_or_else(|| drug.to_string());

    let shortage = find_shortages(client, &shortage_search_term).await?;

    Ok(MedicationProfile {
        drug_identifier: drug.to_string(),
        overall_status: overall_status(label.is_some(), shortage.has_shortages()),
        shortage_search_term,
        label,
        label_error,
        shortage,
    })
}
