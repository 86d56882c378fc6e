use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MedMcpError;
use crate::sources::rxnav::RxNavClient;

/// Ingredients that warrant a bleeding-risk warning whenever they appear in a
/// checked combination.
const ANTICOAGULANT_INGREDIENTS: &[&str] = &["warfarin", "aspirin", "clopidogrel"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugConcept {
    pub rxcui: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingredients: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionFinding {
    pub drug_a: String,
    pub drug_b: String,
    pub interaction_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub common_ingredients: Vec<String>,
    pub severity: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionReport {
    pub drugs_analyzed: Vec<String>,
    pub drug_details: BTreeMap<String, DrugConcept>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub potential_interactions: Vec<InteractionFinding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub safety_warnings: Vec<String>,
    pub summary: String,
    pub limitations: String,
}

fn lowered_set(ingredients: &[String]) -> BTreeSet<String> {
    ingredients.iter().map(|i| i.to_lowercase()).collect()
}

/// Checks a drug combination for ingredient duplication via RxNorm.
///
/// Each name is resolved to an RxCUI, its TTY=IN ingredient set is fetched,
/// and pairwise intersections flag potential duplication. This is ingredient
/// comparison, not clinical interaction checking, and says so in the report.
pub async fn check_interactions(
    client: &RxNavClient,
    drugs: &[String],
) -> Result<InteractionReport, MedMcpError> {
    let drugs: Vec<String> = drugs
        .iter()
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .collect();
    if drugs.len() < 2 {
        return Err(MedMcpError::InvalidArgument(
            "At least two drug names are required. Example: medmcp interactions warfarin aspirin"
                .into(),
        ));
    }

    let mut details: BTreeMap<String, DrugConcept> = BTreeMap::new();
    for drug in &drugs {
        let rxcui = client.rxcui_by_name(drug).await?.ok_or_else(|| {
            MedMcpError::NotFound {
                entity: "RxNorm concept".to_string(),
                id: drug.clone(),
                suggestion: format!("Check the spelling or try a generic name for \"{drug}\""),
            }
        })?;

        let (ingredients, note) = match client.ingredients(&rxcui).await {
            Ok(ingredients) => (ingredients, None),
            Err(err) => {
                debug!(drug = %drug, error = %err, "ingredient lookup failed, keeping bare RxCUI");
                (
                    Vec::new(),
                    Some(format!("Could not retrieve ingredients: {err}")),
                )
            }
        };

        details.insert(
            drug.clone(),
            DrugConcept {
                rxcui,
                ingredients,
                note,
            },
        );
    }

    let mut potential_interactions = Vec::new();
    for (i, drug_a) in drugs.iter().enumerate() {
        for drug_b in drugs.iter().skip(i + 1) {
            let set_a = lowered_set(&details[drug_a].ingredients);
            let set_b = lowered_set(&details[drug_b].ingredients);
            let common: Vec<String> = set_a.intersection(&set_b).cloned().collect();
            if common.is_empty() {
                continue;
            }
            potential_interactions.push(InteractionFinding {
                drug_a: drug_a.clone(),
                drug_b: drug_b.clone(),
                interaction_type: "Ingredient duplication".to_string(),
                common_ingredients: common,
                severity: "Monitor for additive effects".to_string(),
                recommendation: "Consult a pharmacist about potential duplication".to_string(),
            });
        }
    }

    let mut safety_warnings = Vec::new();
    for drug in &drugs {
        let has_anticoagulant = details[drug]
            .ingredients
            .iter()
            .any(|i| ANTICOAGULANT_INGREDIENTS.contains(&i.to_lowercase().as_str()));
        if has_anticoagulant {
            safety_warnings.push(format!(
                "{drug} contains anticoagulant/antiplatelet agents; monitor for bleeding risk"
            ));
        }
    }

    let summary = format!(
        "Analyzed {} drugs, found {} potential interaction(s)",
        drugs.len(),
        potential_interactions.len()
    );

    Ok(InteractionReport {
        drugs_analyzed: drugs,
        drug_details: details,
        potential_interactions,
        safety_warnings,
        summary,
        limitations: "Based on ingredient comparison only. For comprehensive interaction \
                      checking, consult a pharmacist or clinical decision support system."
            .to_string(),
    })
}
