use std::collections::{BTreeMap, BTreeSet};

use crate::entities::RiskLevel;
use crate::entities::shortage::TrendReport;
use crate::sources::openfda::DrugShortageResult;
use crate::transform::shortage::{ShortageStatus, to_shortage_record};

const SAMPLE_RECORD_LIMIT: usize = 5;
const TOP_REASON_LIMIT: usize = 3;

/// Risk rules are evaluated top-down; the first match wins. A single current
/// shortage outranks any amount of resolved history.
fn risk_level(current: usize, total: usize) -> RiskLevel {
    if current > 0 {
        RiskLevel::High
    } else if total > 5 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn frequency_label(total: usize) -> String {
    if total == 0 {
        return "None".to_string();
    }
    let label = if total > 10 {
        "high"
    } else if total > 3 {
        "moderate"
    } else {
        "low"
    };
    format!("{total} events ({label} frequency)")
}

fn top_reasons(records: &[DrugShortageResult]) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        let Some(reason) = record.shortage_reason.as_deref().map(str::trim) else {
            continue;
        };
        if reason.is_empty() || reason == "N/A" {
            continue;
        }
        *counts.entry(reason).or_insert(0) += 1;
    }

    if counts.is_empty() {
        return "Not specified".to_string();
    }

    // BTreeMap iteration gives the alphabetical tie-break; the sort by count
    // is stable, so equal counts keep that order.
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(TOP_REASON_LIMIT);
    ranked
        .into_iter()
        .map(|(reason, _)| reason)
        .collect::<Vec<_>>()
        .join("; ")
}

fn recommendation(drug: &str, risk: RiskLevel, current: usize, resolved: usize) -> String {
    if current > 0 {
        format!(
            "{} risk: {current} current shortage record(s) for {drug}. Monitor supply closely and line up therapeutic alternatives.",
            risk.as_str()
        )
    } else {
        format!(
            "{} risk: no current shortages for {drug}; {resolved} resolved record(s) in recent history.",
            risk.as_str()
        )
    }
}

pub(crate) fn empty_trend_report(drug: &str, months_back: u32) -> TrendReport {
    TrendReport {
        drug_name: drug.to_string(),
        analysis_period: format!("last {months_back} months"),
        total_shortage_events: 0,
        status_breakdown: BTreeMap::new(),
        companies_affected: 0,
        recent_activity: 0,
        shortage_frequency: "None".to_string(),
        top_reasons: "Not specified".to_string(),
        risk_level: RiskLevel::Low,
        recommendation: format!(
            "No shortage history on record for {drug}. Historical supply risk appears low."
        ),
        sample_records: Vec::new(),
    }
}

/// Aggregates relevance-filtered shortage history into a trend report.
/// Deterministic: identical input records always produce identical output.
pub(crate) fn build_trend_report(
    drug: &str,
    months_back: u32,
    records: &[DrugShortageResult],
) -> TrendReport {
    if records.is_empty() {
        return empty_trend_report(drug, months_back);
    }

    let mut status_breakdown: BTreeMap<String, usize> = BTreeMap::new();
    let mut companies: BTreeSet<String> = BTreeSet::new();
    let mut current = 0usize;
    let mut resolved = 0usize;
    let mut recent_activity = 0usize;

    for record in records {
        let status_key = record
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Unknown")
            .to_string();
        *status_breakdown.entry(status_key).or_insert(0) += 1;

        let status = ShortageStatus::classify(record.status.as_deref());
        match status {
            ShortageStatus::Current => current += 1,
            ShortageStatus::Resolved => resolved += 1,
            _ => {}
        }
        if status.is_active() {
            recent_activity += 1;
        }

        if let Some(company) = record.company_name.as_deref().map(str::trim)
            && !company.is_empty()
            && !company.eq_ignore_ascii_case("unknown")
        {
            companies.insert(company.to_string());
        }
    }

    let total = records.len();
    let risk = risk_level(current, total);

    TrendReport {
        drug_name: drug.to_string(),
        analysis_period: format!("last {months_back} months"),
        total_shortage_events: total,
        status_breakdown,
        companies_affected: companies.len(),
        recent_activity,
        shortage_frequency: frequency_label(total),
        top_reasons: top_reasons(records),
        risk_level: risk,
        recommendation: recommendation(drug, risk, current, resolved),
        sample_records: records
            .iter()
            .take(SAMPLE_RECORD_LIMIT)
            .map(to_shortage_record)
            .collect(),
    }
}
