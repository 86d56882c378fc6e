use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::MedMcpError;
use crate::sources::openfda::{DrugLabelResult, OpenFdaClient};

/// Condensed FDA label view: identity fields from the `openfda` block plus the
/// narrative sections callers actually ask for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelSummary {
    pub drug_identifier: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generic_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub brand_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manufacturer_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub route: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dosage_forms: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indications_and_usage: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adverse_reactions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings_and_cautions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dosage_and_administration: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contraindications: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drug_interactions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameConversion {
    pub original_drug: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generic_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub brand_names: Vec<String>,
}

fn summarize(drug: &str, raw: DrugLabelResult) -> LabelSummary {
    let openfda = raw.openfda.unwrap_or_default();
    LabelSummary {
        drug_identifier: drug.to_string(),
        generic_names: openfda.generic_name.into_vec(),
        brand_names: openfda.brand_name.into_vec(),
        manufacturer_names: openfda.manufacturer_name.into_vec(),
        route: openfda.route.into_vec(),
        dosage_forms: openfda.dosage_form.into_vec(),
        indications_and_usage: raw.indications_and_usage.into_vec(),
        adverse_reactions: raw.adverse_reactions.into_vec(),
        warnings_and_cautions: raw.warnings_and_cautions.into_vec(),
        dosage_and_administration: raw.dosage_and_administration.into_vec(),
        contraindications: raw.contraindications.into_vec(),
        drug_interactions: raw.drug_interactions.into_vec(),
    }
}

/// Fetches the most recent label for a drug. Returns the first (newest) match.
pub async fn fetch_label(
    client: &OpenFdaClient,
    drug: &str,
) -> Result<LabelSummary, MedMcpError> {
    let drug = drug.trim();
    let resp = client.label_search(drug).await?;
    let first = resp.and_then(|r| r.results.into_iter().next());

    match first {
        Some(raw) => Ok(summarize(drug, raw)),
        None => Err(MedMcpError::NotFound {
            entity: "drug label".to_string(),
            id: drug.to_string(),
            suggestion: format!("Try a generic or brand name: medmcp convert \"{drug}\""),
        }),
    }
}

/// Converts between generic and brand names by collecting the alias sets from
/// label matches. The generic-name field is tried first, then brand-name.
pub async fn convert_names(
    client: &OpenFdaClient,
    drug: &str,
) -> Result<NameConversion, MedMcpError> {
    let drug = drug.trim();
    if drug.is_empty() {
        return Err(MedMcpError::InvalidArgument(
            "Drug name is required. Example: medmcp convert tylenol".into(),
        ));
    }

    let escaped = OpenFdaClient::escape_query_value(drug);
    let strategies = [
        format!("openfda.generic_name:\"{escaped}\""),
        format!("openfda.brand_name:\"{escaped}\""),
    ];

    for query in &strategies {
        let results = match client.label_field_search(query).await {
            Ok(Some(resp)) => resp.results,
            Ok(None) => continue,
            Err(_) => continue,
        };
        if results.is_empty() {
            continue;
        }

        let mut generic_names: BTreeSet<String> = BTreeSet::new();
        let mut brand_names: BTreeSet<String> = BTreeSet::new();
        for result in results {
            let Some(openfda) = result.openfda else {
                continue;
            };
            generic_names.extend(openfda.generic_name.into_vec());
            brand_names.extend(openfda.brand_name.into_vec());
        }

        if !generic_names.is_empty() || !brand_names.is_empty() {
            return Ok(NameConversion {
                original_drug: drug.to_string(),
                generic_names: generic_names.into_iter().collect(),
                brand_names: brand_names.into_iter().collect(),
            });
        }
    }

    Err(MedMcpError::NotFound {
        entity: "drug".to_string(),
        id: drug.to_string(),
        suggestion: "Check the spelling, or search labels directly: medmcp label <name>".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn label_row() -> serde_json::Value {
        serde_json::json!({
            "openfda": {
                "generic_name": ["ACETAMINOPHEN"],
                "brand_name": ["TYLENOL", "TYLENOL EXTRA STRENGTH"],
                "manufacturer_name": ["Example Consumer Health"],
                "route": ["ORAL"]
            },
            "indications_and_usage": "Temporary relief of minor aches and pains.",
            "contraindications": ["Known hypersensitivity."]
        })
    }

    #[tokio::test]
    async fn label_fetch_summarizes_first_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "meta": {},
                "results": [label_row()]
            })))
            .mount(&server)
            .await;

        let client = OpenFdaClient::new_for_test(server.uri(), None).unwrap();
        let label = fetch_label(&client, "acetaminophen").await.unwrap();
        assert_eq!(label.generic_names, vec!["ACETAMINOPHEN"]);
        assert_eq!(label.brand_names.len(), 2);
        // String-or-list sections normalize to lists.
        assert_eq!(label.indications_and_usage.len(), 1);
    }

    #[tokio::test]
    async fn missing_label_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = OpenFdaClient::new_for_test(server.uri(), None).unwrap();
        let err = fetch_label(&client, "nosuchdrug").await.unwrap_err();
        assert!(matches!(err, MedMcpError::NotFound { .. }));
    }

    #[tokio::test]
    async fn convert_falls_back_to_brand_field_and_sorts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .and(query_param("search", "openfda.generic_name:\"tylenol\""))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .and(query_param("search", "openfda.brand_name:\"tylenol\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "meta": {},
                "results": [label_row(), label_row()]
            })))
            .mount(&server)
            .await;

        let client = OpenFdaClient::new_for_test(server.uri(), None).unwrap();
        let conversion = convert_names(&client, "tylenol").await.unwrap();
        assert_eq!(conversion.generic_names, vec!["ACETAMINOPHEN"]);
        assert_eq!(
            conversion.brand_names,
            vec!["TYLENOL", "TYLENOL EXTRA STRENGTH"]
        );
    }

    #[tokio::test]
    async fn convert_with_no_matches_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = OpenFdaClient::new_for_test(server.uri(), None).unwrap();
        let err = convert_names(&client, "nosuchdrug").await.unwrap_err();
        assert!(matches!(err, MedMcpError::NotFound { .. }));
    }
}
