//! Command-line surface. Every capability the MCP server exposes is also a
//! subcommand, which keeps the tools scriptable and testable by hand.

pub(crate) mod health;

use clap::{Parser, Subcommand};

use crate::entities::{adverse_event, batch, interaction, label, profile, recall, shortage};
use crate::render;
use crate::sources::openfda::OpenFdaClient;
use crate::sources::rxnav::RxNavClient;

#[derive(Debug, Parser)]
#[command(
    name = "medmcp",
    version,
    about = "Medication information from openFDA and RxNav: labels, shortages, recalls, adverse events, interactions"
)]
pub struct Cli {
    /// Print pretty JSON instead of Markdown
    #[arg(long, global = true)]
    pub json: bool,

    /// Bypass the on-disk HTTP response cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Search current drug shortage records
    Shortage {
        /// Drug name (generic or brand)
        drug: String,
    },
    /// Analyze shortage history and classify supply risk
    Trends {
        drug: String,
        /// Analysis window in months
        #[arg(long, default_value_t = 6)]
        months_back: u32,
    },
    /// Analyze a formulary drug list for shortage and recall risk (max 25)
    Batch {
        #[arg(required = true)]
        drugs: Vec<String>,
        /// Include a 6-month trend analysis per drug
        #[arg(long)]
        trends: bool,
    },
    /// Search drug recall and enforcement records
    Recall {
        drug: String,
        #[arg(long, default_value_t = recall::DEFAULT_RECALL_LIMIT)]
        limit: usize,
    },
    /// Fetch the FDA label for a drug
    Label { drug: String },
    /// Combined label and shortage profile for a drug
    Profile { drug: String },
    /// Convert between generic and brand names
    Convert { drug: String },
    /// Check a drug combination for ingredient duplication
    Interactions {
        #[arg(required = true)]
        drugs: Vec<String>,
    },
    /// Fetch FAERS adverse-event reports for a drug
    AdverseEvents {
        drug: String,
        /// Keep only reports marked serious
        #[arg(long)]
        serious_only: bool,
    },
    /// Check upstream API connectivity
    Health {
        /// Skip the local cache-directory probe
        #[arg(long)]
        apis_only: bool,
    },
    /// Run the MCP server on stdio
    Mcp,
    /// Run the MCP server over HTTP with SSE transport
    ServeHttp {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8319)]
        port: u16,
    },
}

/// Executes a CLI command and returns its rendered output.
///
/// # Errors
///
/// Returns an error when argument validation fails or a standalone upstream
/// call fails; fallback-chain misses are reported in the output instead.
pub async fn run(cli: Cli) -> anyhow::Result<String> {
    let no_cache = cli.no_cache;
    crate::sources::with_no_cache(no_cache, dispatch(cli)).await
}

async fn dispatch(cli: Cli) -> anyhow::Result<String> {
    let json = cli.json;
    match cli.command {
        Commands::Shortage { drug } => {
            let client = OpenFdaClient::new()?;
            let report = shortage::find_shortages(&client, &drug).await?;
            if json {
                Ok(render::json::to_pretty(&report)?)
            } else {
                Ok(render::markdown::shortage_report(&report)?)
            }
        }
        Commands::Trends { drug, months_back } => {
            let client = OpenFdaClient::new()?;
            let report = shortage::analyze_trends(&client, &drug, months_back).await?;
            if json {
                Ok(render::json::to_pretty(&report)?)
            } else {
                Ok(render::markdown::trend_report(&report)?)
            }
        }
        Commands::Batch { drugs, trends } => {
            let client = OpenFdaClient::new()?;
            let report = batch::batch_analyze(&client, &drugs, trends).await?;
            if json {
                Ok(render::json::to_pretty(&report)?)
            } else {
                Ok(render::markdown::batch_report(&report)?)
            }
        }
        Commands::Recall { drug, limit } => {
            let client = OpenFdaClient::new()?;
            let report = recall::search_recalls(&client, &drug, limit).await?;
            if json {
                Ok(render::json::to_pretty(&report)?)
            } else {
                Ok(render::markdown::recall_report(&report)?)
            }
        }
        Commands::Label { drug } => {
            let client = OpenFdaClient::new()?;
            let summary = label::fetch_label(&client, &drug).await?;
            Ok(render::json::to_pretty(&summary)?)
        }
        Commands::Profile { drug } => {
            let client = OpenFdaClient::new()?;
            let profile = profile::medication_profile(&client, &drug).await?;
            Ok(render::json::to_pretty(&profile)?)
        }
        Commands::Convert { drug } => {
            let client = OpenFdaClient::new()?;
            let conversion = label::convert_names(&client, &drug).await?;
            Ok(render::json::to_pretty(&conversion)?)
        }
        Commands::Interactions { drugs } => {
            let client = RxNavClient::new()?;
            let report = interaction::check_interactions(&client, &drugs).await?;
            Ok(render::json::to_pretty(&report)?)
        }
        Commands::AdverseEvents { drug, serious_only } => {
            let client = OpenFdaClient::new()?;
            let summary = adverse_event::fetch_adverse_events(&client, &drug, serious_only).await?;
            Ok(render::json::to_pretty(&summary)?)
        }
        Commands::Health { apis_only } => {
            let report = health::check(apis_only).await?;
            if json {
                Ok(render::json::to_pretty(&report)?)
            } else {
                Ok(report.to_markdown())
            }
        }
        Commands::Mcp | Commands::ServeHttp { .. } => {
            anyhow::bail!("server commands are handled by the binary entrypoint")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shortage_command_with_global_flags() {
        let cli = Cli::parse_from(["medmcp", "shortage", "amoxicillin", "--json", "--no-cache"]);
        assert!(cli.json);
        assert!(cli.no_cache);
        assert!(matches!(cli.command, Commands::Shortage { ref drug } if drug == "amoxicillin"));
    }

    #[test]
    fn parses_batch_with_multiple_drugs() {
        let cli = Cli::parse_from(["medmcp", "batch", "morphine", "fentanyl", "--trends"]);
        match cli.command {
            Commands::Batch { drugs, trends } => {
                assert_eq!(drugs, vec!["morphine", "fentanyl"]);
                assert!(trends);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn batch_requires_at_least_one_drug() {
        assert!(Cli::try_parse_from(["medmcp", "batch"]).is_err());
    }

    #[test]
    fn trends_default_window_is_six_months() {
        let cli = Cli::parse_from(["medmcp", "trends", "insulin"]);
        assert!(matches!(
            cli.command,
            Commands::Trends { months_back: 6, .. }
        ));
    }

    #[test]
    fn serve_http_has_loopback_defaults() {
        let cli = Cli::parse_from(["medmcp", "serve-http"]);
        match cli.command {
            Commands::ServeHttp { host, port } => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(port, 8319);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
