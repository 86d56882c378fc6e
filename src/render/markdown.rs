use std::sync::OnceLock;

use minijinja::{Environment, context};
use minijinja::value::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::entities::batch::BatchReport;
use crate::entities::recall::RecallReport;
use crate::entities::shortage::{ShortageReport, TrendReport};
use crate::error::MedMcpError;

static ENV: OnceLock<Environment<'static>> = OnceLock::new();

const SHORTAGE_TEMPLATE: &str = r#"# Shortage lookup: {{ report.search_term }}

{% if report.status -%}
{{ report.status }}
{%- else -%}
{{ report.shortages | length }} shortage record(s) found.

| Drug | Status | Company | Availability |
|------|--------|---------|--------------|
{% for r in report.shortages -%}
| {{ r.generic_name }} | {{ r.status }} | {{ r.company_name }} | {{ r.availability or "-" }} |
{% endfor -%}
{%- endif %}
"#;

const TREND_TEMPLATE: &str = r#"# Shortage trends: {{ report.drug_name }} ({{ report.analysis_period }})

- Total shortage events: {{ report.total_shortage_events }}
- Frequency: {{ report.shortage_frequency }}
- Companies affected: {{ report.companies_affected }}
- Recent activity: {{ report.recent_activity }}
- Risk level: **{{ report.risk_level }}**
- Top reasons: {{ report.top_reasons }}

{{ report.recommendation }}
{% if report.status_breakdown %}
| Status | Count |
|--------|-------|
{% for status, count in report.status_breakdown | items -%}
| {{ status }} | {{ count }} |
{% endfor -%}
{% endif %}
"#;

const BATCH_TEMPLATE: &str = r#"# Formulary analysis

- Drugs analyzed: {{ report.batch_summary.total_drugs_analyzed }}
- Drugs with shortages: {{ report.batch_summary.drugs_with_shortages }}
- Drugs with recalls: {{ report.batch_summary.drugs_with_recalls }}
- Total shortage events: {{ report.batch_summary.total_shortage_events }}

{% if report.risk_assessment.high_risk -%}
High risk: {{ report.risk_assessment.high_risk | join(", ") }}
{% endif -%}
{% if report.risk_assessment.medium_risk -%}
Medium risk: {{ report.risk_assessment.medium_risk | join(", ") }}
{% endif -%}
{% if report.risk_assessment.low_risk -%}
Low risk: {{ report.risk_assessment.low_risk | join(", ") }}
{% endif %}
## Recommendations

{% for rec in report.formulary_recommendations -%}
{{ loop.index }}. {{ rec }}
{% endfor -%}
"#;

const RECALL_TEMPLATE: &str = r#"# Recall lookup: {{ report.search_term }}

{% if report.status -%}
{{ report.status }}
{%- else -%}
{{ report.recalls | length }} recall record(s) found.

| Recall | Class | Status | Reason |
|--------|-------|--------|--------|
{% for r in report.recalls -%}
| {{ r.recall_number }} | {{ r.classification }} | {{ r.status }} | {{ r.reason_for_recall }} |
{% endfor -%}
{%- endif %}
"#;

fn env() -> &'static Environment<'static> {
    ENV.get_or_init(|| {
        let mut env = Environment::new();
        env.add_template("shortage.md", SHORTAGE_TEMPLATE)
            .expect("static shortage template parses");
        env.add_template("trend.md", TREND_TEMPLATE)
            .expect("static trend template parses");
        env.add_template("batch.md", BATCH_TEMPLATE)
            .expect("static batch template parses");
        env.add_template("recall.md", RECALL_TEMPLATE)
            .expect("static recall template parses");
        env
    })
}

fn footer(source: &str) -> String {
    let retrieved = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string());
    format!("\n---\nSource: {source}. Retrieved {retrieved}.\n")
}

fn render<T: serde::Serialize>(
    template: &str,
    report: &T,
    source: &str,
) -> Result<String, MedMcpError> {
    let tmpl = env().get_template(template)?;
    let mut out = tmpl.render(context!(report => Value::from_serialize(report)))?;
    out.push_str(&footer(source));
    Ok(out)
}

pub fn shortage_report(report: &ShortageReport) -> Result<String, MedMcpError> {
    render("shortage.md", report, "openFDA Drug Shortages API")
}

pub fn trend_report(report: &TrendReport) -> Result<String, MedMcpError> {
    render("trend.md", report, "openFDA Drug Shortages API")
}

pub fn batch_report(report: &BatchReport) -> Result<String, MedMcpError> {
    render(
        "batch.md",
        report,
        "openFDA Drug Shortages and Enforcement APIs",
    )
}

pub fn recall_report(report: &RecallReport) -> Result<String, MedMcpError> {
    render("recall.md", report, "openFDA Drug Enforcement API")
}
