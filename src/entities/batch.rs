use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::entities::RiskLevel;
use crate::entities::recall::search_recalls;
use crate::entities::shortage::{TrendReport, analyze_trends, find_shortages};
use crate::error::MedMcpError;
use crate::sources::openfda::OpenFdaClient;
use crate::transform::batch::build_batch_report;
use crate::transform::shortage::ShortageStatus;

/// Hard cap on formulary size. Each drug can cost up to a dozen upstream
/// requests, so oversized batches are rejected before the first call.
pub const MAX_BATCH_SIZE: usize = 25;

const BATCH_RECALL_LIMIT: usize = 10;
const BATCH_TREND_MONTHS: u32 = 6;
const COMPANY_DISPLAY_LIMIT: usize = 5;

/// Per-drug outcome inside a batch. A failed analysis keeps its slot with
/// `risk_level: Unknown` and an `error` instead of aborting the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugAnalysis {
    pub drug: String,
    pub shortage_count: usize,
    pub shortage_status: String,
    pub recall_count: usize,
    pub risk_level: RiskLevel,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub companies_affected: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_drugs_analyzed: usize,
    pub drugs_with_shortages: usize,
    pub drugs_with_recalls: usize,
    pub high_risk_drugs: usize,
    pub total_shortage_events: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskBuckets {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub high_risk: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub medium_risk: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub low_risk: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_summary: BatchSummary,
    pub risk_assessment: RiskBuckets,
    pub individual_analyses: Vec<DrugAnalysis>,
    pub formulary_recommendations: Vec<String>,
}

async fn analyze_one(
    client: &OpenFdaClient,
    drug: &str,
    include_trends: bool,
) -> Result<DrugAnalysis, MedMcpError> {
    let shortage = find_shortages(client, drug).await?;

    let (risk_level, shortage_status) = if shortage.has_shortages() {
        let any_current = shortage
            .shortages
            .iter()
            .any(|r| ShortageStatus::classify(Some(r.status.as_str())) == ShortageStatus::Current);
        let risk = if any_current {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        };
        (
            risk,
            format!("{} shortage record(s) found", shortage.shortages.len()),
        )
    } else {
        (RiskLevel::Low, "No current shortages".to_string())
    };

    let mut companies_affected: Vec<String> = Vec::new();
    for record in &shortage.shortages {
        let company = record.company_name.trim();
        if company.is_empty() || company.eq_ignore_ascii_case("unknown") {
            continue;
        }
        if !companies_affected.iter().any(|c| c == company) {
            companies_affected.push(company.to_string());
        }
        if companies_affected.len() == COMPANY_DISPLAY_LIMIT {
            break;
        }
    }

    // Recalls are checked regardless of the shortage outcome.
    let recall = search_recalls(client, drug, BATCH_RECALL_LIMIT).await?;

    // Trend risk is reported next to the shortage-based bucket, never merged
    // into it.
    let trend = if include_trends {
        Some(analyze_trends(client, drug, BATCH_TREND_MONTHS).await?)
    } else {
        None
    };

    Ok(DrugAnalysis {
        drug: drug.to_string(),
        shortage_count: shortage.shortages.len(),
        shortage_status,
        recall_count: recall.recalls.len(),
        risk_level,
        companies_affected,
        trend,
        error: None,
    })
}

/// Analyzes a formulary drug list sequentially. Per-item failures are
/// isolated; only input violations fail the whole batch.
pub async fn batch_analyze(
    client: &OpenFdaClient,
    drugs: &[String],
    include_trends: bool,
) -> Result<BatchReport, MedMcpError> {
    let drugs: Vec<&str> = drugs
        .iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .collect();
    if drugs.is_empty() {
        return Err(MedMcpError::InvalidArgument(
            "At least one drug name is required. Example: medmcp batch morphine fentanyl".into(),
        ));
    }
    if drugs.len() > MAX_BATCH_SIZE {
        return Err(MedMcpError::InvalidArgument(format!(
            "Batch size {} exceeds the maximum of {MAX_BATCH_SIZE} drugs",
            drugs.len()
        )));
    }

    let mut analyses = Vec::with_capacity(drugs.len());
    for drug in drugs {
        match analyze_one(client, drug, include_trends).await {
            Ok(analysis) => analyses.push(analysis),
            Err(err) => {
                warn!(drug, error = %err, "drug analysis failed, continuing batch");
                analyses.push(DrugAnalysis {
                    drug: drug.to_string(),
                    shortage_count: 0,
                    shortage_status: "Analysis failed".to_string(),
                    recall_count: 0,
                    risk_level: RiskLevel::Unknown,
                    companies_affected: Vec::new(),
                    trend: None,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    Ok(build_batch_report(analyses))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn shortage_row(generic: &str, status: &str, company: &str) -> serde_json::Value {
        serde_json::json!({
            "generic_name": generic,
            "status": status,
            "company_name": company
        })
    }

    fn results_body(rows: Vec<serde_json::Value>) -> serde_json::Value {
        serde_json::json!({"meta": {}, "results": rows})
    }

    async fn mount_shortage_hit(server: &MockServer, term: &str, rows: Vec<serde_json::Value>) {
        Mock::given(method("GET"))
            .and(path("/drug/shortages.json"))
            .and(query_param("search", format!("\"{term}\"")))
            .respond_with(ResponseTemplate::new(200).set_body_json(results_body(rows)))
            .mount(server)
            .await;
    }

    async fn mount_miss_everything(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/drug/shortages.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drug/enforcement.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected_before_any_upstream_call() {
        let server = MockServer::start().await;
        let client = OpenFdaClient::new_for_test(server.uri(), None).unwrap();

        let drugs: Vec<String> = (0..26).map(|i| format!("drug{i}")).collect();
        let err = batch_analyze(&client, &drugs, false).await.unwrap_err();
        assert!(matches!(err, MedMcpError::InvalidArgument(_)));
        assert!(err.to_string().contains("26"));

        let received = server.received_requests().await.unwrap_or_default();
        assert!(received.is_empty(), "no upstream calls may be made");
    }

    #[tokio::test]
    async fn batch_of_exactly_twenty_five_is_accepted() {
        let server = MockServer::start().await;
        mount_miss_everything(&server).await;

        let client = OpenFdaClient::new_for_test(server.uri(), None).unwrap();
        let drugs: Vec<String> = (0..25).map(|i| format!("batchdrug{i}")).collect();
        let report = crate::sources::with_no_cache(true, batch_analyze(&client, &drugs, false))
            .await
            .unwrap();
        assert_eq!(report.batch_summary.total_drugs_analyzed, 25);
        assert_eq!(report.risk_assessment.low_risk.len(), 25);
    }

    #[tokio::test]
    async fn classifies_mixed_formulary_by_shortage_status() {
        let server = MockServer::start().await;
        mount_shortage_hit(
            &server,
            "druga",
            vec![
                shortage_row("DrugA Injection", "Current", "Alpha Pharma"),
                shortage_row("DrugA Tablets", "Current", "Beta Labs"),
            ],
        )
        .await;
        mount_shortage_hit(
            &server,
            "drugc",
            vec![
                shortage_row("DrugC 10 mg", "Resolved", "Alpha Pharma"),
                shortage_row("DrugC 20 mg", "Resolved", "Alpha Pharma"),
                shortage_row("DrugC 40 mg", "Resolved", "Gamma Inc"),
                shortage_row("DrugC 80 mg", "Resolved", "Delta Co"),
            ],
        )
        .await;
        mount_miss_everything(&server).await;

        let client = OpenFdaClient::new_for_test(server.uri(), None).unwrap();
        let drugs = vec!["drugA".to_string(), "drugB".to_string(), "drugC".to_string()];
        let report = crate::sources::with_no_cache(true, batch_analyze(&client, &drugs, false))
            .await
            .unwrap();

        assert_eq!(report.batch_summary.drugs_with_shortages, 2);
        assert_eq!(report.batch_summary.total_shortage_events, 6);
        assert_eq!(report.risk_assessment.high_risk, vec!["drugA"]);
        assert_eq!(report.risk_assessment.medium_risk, vec!["drugC"]);
        assert_eq!(report.risk_assessment.low_risk, vec!["drugB"]);

        let drug_c = &report.individual_analyses[2];
        assert_eq!(drug_c.companies_affected.len(), 3);
    }

    #[tokio::test]
    async fn failing_drug_is_isolated_with_unknown_risk() {
        let server = MockServer::start().await;
        // Shortage lookups all miss; the recall endpoint errors for drugX only.
        Mock::given(method("GET"))
            .and(path("/drug/shortages.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drug/enforcement.json"))
            .and(query_param("search", "product_description:\"drugx\""))
            .respond_with(ResponseTemplate::new(400).set_body_string("simulated failure"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drug/enforcement.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = OpenFdaClient::new_for_test(server.uri(), None).unwrap();
        let drugs = vec!["drugw".to_string(), "drugx".to_string(), "drugy".to_string()];
        let report = crate::sources::with_no_cache(true, batch_analyze(&client, &drugs, false))
            .await
            .unwrap();

        assert_eq!(report.batch_summary.total_drugs_analyzed, 3);
        assert_eq!(report.risk_assessment.low_risk, vec!["drugw", "drugy"]);

        let failed = &report.individual_analyses[1];
        assert_eq!(failed.drug, "drugx");
        assert_eq!(failed.risk_level, RiskLevel::Unknown);
        assert!(failed.error.as_deref().unwrap().contains("simulated failure"));
    }

    #[tokio::test]
    async fn trends_are_folded_in_without_overriding_shortage_risk() {
        let server = MockServer::start().await;
        mount_shortage_hit(
            &server,
            "drugz",
            vec![shortage_row("DrugZ Injection", "Resolved", "Alpha Pharma")],
        )
        .await;
        mount_miss_everything(&server).await;

        let client = OpenFdaClient::new_for_test(server.uri(), None).unwrap();
        let report = crate::sources::with_no_cache(
            true,
            batch_analyze(&client, &["drugz".to_string()], true),
        )
        .await
        .unwrap();

        let analysis = &report.individual_analyses[0];
        // Shortage-based bucket stays Medium even though the trend view is Low.
        assert_eq!(analysis.risk_level, RiskLevel::Medium);
        let trend = analysis.trend.as_ref().unwrap();
        assert_eq!(trend.analysis_period, "last 6 months");
    }
}
