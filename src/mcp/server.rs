use rmcp::model::{Implementation, ServerCapabilities, ServerInfo};
use rmcp::{ServerHandler, ServiceExt, tool};
use tokio_util::sync::CancellationToken;

use crate::entities::{adverse_event, batch, interaction, label, profile, recall, shortage};
use crate::error::MedMcpError;
use crate::render::json::to_pretty;
use crate::sources::openfda::OpenFdaClient;
use crate::sources::rxnav::RxNavClient;

const DEFAULT_TREND_MONTHS: u32 = 6;

#[derive(Debug, Clone)]
pub struct MedMcpServer;

/// Tool handlers never raise toward the host: every failure collapses into a
/// JSON object with an `error` field.
fn tool_payload(result: Result<String, MedMcpError>) -> String {
    match result {
        Ok(payload) => payload,
        Err(err) => {
            let body = serde_json::json!({ "error": err.to_string() });
            serde_json::to_string_pretty(&body)
                .unwrap_or_else(|_| "{\"error\": \"internal serialization failure\"}".to_string())
        }
    }
}

#[tool(tool_box)]
impl MedMcpServer {
    #[tool(
        description = "Search current drug shortage records by drug name (generic or brand). Tries several query formulations and filters results for relevance. Absence of a shortage is reported via a status field, not an error."
    )]
    async fn search_drug_shortages(&self, #[tool(param)] drug: String) -> String {
        tool_payload(
            async {
                let client = OpenFdaClient::new()?;
                let report = shortage::find_shortages(&client, &drug).await?;
                to_pretty(&report)
            }
            .await,
        )
    }

    #[tool(
        description = "Analyze shortage history for a drug and classify its supply risk (High/Medium/Low), with status breakdown, affected companies, top reasons, and a recommendation. months_back labels the analysis window (default 6)."
    )]
    async fn analyze_shortage_trends(
        &self,
        #[tool(param)] drug: String,
        #[tool(param)] months_back: Option<u32>,
    ) -> String {
        tool_payload(
            async {
                let client = OpenFdaClient::new()?;
                let report = shortage::analyze_trends(
                    &client,
                    &drug,
                    months_back.unwrap_or(DEFAULT_TREND_MONTHS),
                )
                .await?;
                to_pretty(&report)
            }
            .await,
        )
    }

    #[tool(
        description = "Analyze a formulary drug list (max 25 drugs) for shortage and recall risk. Returns per-drug analyses, disjoint High/Medium/Low risk buckets, summary counters, and formulary recommendations. Set include_trends for a per-drug 6-month trend view."
    )]
    async fn batch_drug_analysis(
        &self,
        #[tool(param)] drugs: Vec<String>,
        #[tool(param)] include_trends: Option<bool>,
    ) -> String {
        tool_payload(
            async {
                let client = OpenFdaClient::new()?;
                let report =
                    batch::batch_analyze(&client, &drugs, include_trends.unwrap_or(false)).await?;
                to_pretty(&report)
            }
            .await,
        )
    }

    #[tool(
        description = "Search drug recall and enforcement records by product description. No matching recalls is reported via a status field, not an error."
    )]
    async fn search_drug_recalls(
        &self,
        #[tool(param)] drug: String,
        #[tool(param)] limit: Option<u32>,
    ) -> String {
        tool_payload(
            async {
                let client = OpenFdaClient::new()?;
                let limit = limit.unwrap_or(recall::DEFAULT_RECALL_LIMIT as u32) as usize;
                let report = recall::search_recalls(&client, &drug, limit).await?;
                to_pretty(&report)
            }
            .await,
        )
    }

    #[tool(
        description = "Fetch the FDA label for a drug: identity fields plus indications, adverse reactions, warnings, dosage, contraindications, and drug interactions."
    )]
    async fn get_drug_label(&self, #[tool(param)] drug: String) -> String {
        tool_payload(
            async {
                let client = OpenFdaClient::new()?;
                let summary = label::fetch_label(&client, &drug).await?;
                to_pretty(&summary)
            }
            .await,
        )
    }

    #[tool(
        description = "Fetch a combined medication profile: FDA label plus current shortage status, with the shortage lookup keyed on the label's generic name."
    )]
    async fn get_medication_profile(&self, #[tool(param)] drug: String) -> String {
        tool_payload(
            async {
                let client = OpenFdaClient::new()?;
                let profile = profile::medication_profile(&client, &drug).await?;
                to_pretty(&profile)
            }
            .await,
        )
    }

    #[tool(
        description = "Convert between generic and brand drug names using FDA label data. Returns sorted, deduplicated generic and brand name lists."
    )]
    async fn convert_drug_names(&self, #[tool(param)] drug: String) -> String {
        tool_payload(
            async {
                let client = OpenFdaClient::new()?;
                let conversion = label::convert_names(&client, &drug).await?;
                to_pretty(&conversion)
            }
            .await,
        )
    }

    #[tool(
        description = "Check a drug combination (two or more names) for ingredient duplication via RxNorm, with safety warnings for anticoagulant/antiplatelet agents. Ingredient comparison only, not clinical interaction checking."
    )]
    async fn check_drug_interactions(&self, #[tool(param)] drugs: Vec<String>) -> String {
        tool_payload(
            async {
                let client = RxNavClient::new()?;
                let report = interaction::check_interactions(&client, &drugs).await?;
                to_pretty(&report)
            }
            .await,
        )
    }

    #[tool(
        description = "Fetch FDA FAERS adverse-event reports for a drug, with serious-report counts and per-report reactions. Set serious_only to keep only serious reports."
    )]
    async fn get_adverse_events(
        &self,
        #[tool(param)] drug: String,
        #[tool(param)] serious_only: Option<bool>,
    ) -> String {
        tool_payload(
            async {
                let client = OpenFdaClient::new()?;
                let summary = adverse_event::fetch_adverse_events(
                    &client,
                    &drug,
                    serious_only.unwrap_or(false),
                )
                .await?;
                to_pretty(&summary)
            }
            .await,
        )
    }
}

#[tool(tool_box)]
impl ServerHandler for MedMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "medmcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "MedMCP provides medication data from openFDA (labels, shortages, \
                 recalls, adverse events) and RxNav (ingredient-based interaction \
                 checks). Every tool returns JSON; lookups that find nothing return \
                 a status field rather than an error, and failures return an error \
                 field instead of raising."
                    .to_string(),
            ),
            ..Default::default()
        }
    }
}

pub async fn run_stdio() -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();

    let cancel = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let running = MedMcpServer
        .serve_with_ct(rmcp::transport::stdio(), shutdown)
        .await?;
    let _reason = running.waiting().await?;
    Ok(())
}

pub async fn run_http(host: &str, port: u16) -> anyhow::Result<()> {
    use rmcp::transport::sse_server::SseServer;

    let ip: std::net::IpAddr = host
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid host address: {e}"))?;
    let bind = std::net::SocketAddr::new(ip, port);

    tracing::info!("MedMCP HTTP server listening on http://{bind}");
    tracing::info!("  SSE endpoint:  GET  http://{bind}/sse");
    tracing::info!("  Post endpoint: POST http://{bind}/message");

    let ct = SseServer::serve(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP server: {e}"))?
        .with_service(|| MedMcpServer);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down…");
    ct.cancel();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_collapse_into_structured_payloads() {
        let payload = tool_payload(Err(MedMcpError::InvalidArgument(
            "Batch size 26 exceeds the maximum of 25 drugs".into(),
        )));
        let value: serde_json::Value = serde_json::from_str(&payload).expect("valid JSON");
        assert!(
            value["error"]
                .as_str()
                .unwrap()
                .contains("exceeds the maximum")
        );
    }

    #[test]
    fn successful_payloads_pass_through() {
        let payload = tool_payload(Ok("{\"status\": \"ok\"}".to_string()));
        assert_eq!(payload, "{\"status\": \"ok\"}");
    }

    #[test]
    fn server_info_advertises_tools() {
        let info = MedMcpServer.get_info();
        assert_eq!(info.server_info.name, "medmcp");
        assert!(info.instructions.unwrap().contains("openFDA"));
    }
}
