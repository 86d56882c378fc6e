use crate::entities::RiskLevel;
use crate::entities::batch::{BatchReport, BatchSummary, DrugAnalysis, RiskBuckets};

/// High-risk share beyond which the formulary gets an alert recommendation.
const HIGH_RISK_ALERT_PERCENT: usize = 30;

/// Folds per-drug analyses into batch-level counters, disjoint risk buckets,
/// and threshold-driven formulary recommendations.
pub(crate) fn build_batch_report(analyses: Vec<DrugAnalysis>) -> BatchReport {
    let total = analyses.len();
    let mut buckets = RiskBuckets::default();
    let mut summary = BatchSummary {
        total_drugs_analyzed: total,
        ..BatchSummary::default()
    };
    let mut failures = 0usize;

    for analysis in &analyses {
        if analysis.shortage_count > 0 {
            summary.drugs_with_shortages += 1;
            summary.total_shortage_events += analysis.shortage_count;
        }
        if analysis.recall_count > 0 {
            summary.drugs_with_recalls += 1;
        }
        match analysis.risk_level {
            RiskLevel::High => buckets.high_risk.push(analysis.drug.clone()),
            RiskLevel::Medium => buckets.medium_risk.push(analysis.drug.clone()),
            RiskLevel::Low => buckets.low_risk.push(analysis.drug.clone()),
            RiskLevel::Unknown => failures += 1,
        }
    }
    summary.high_risk_drugs = buckets.high_risk.len();

    let mut recommendations = Vec::new();
    if buckets.high_risk.len() * 100 > total * HIGH_RISK_ALERT_PERCENT {
        recommendations.push(format!(
            "Alert: {} of {total} drugs are high risk. Review alternative suppliers and therapeutic substitutes now.",
            buckets.high_risk.len()
        ));
    }
    if summary.drugs_with_shortages > 0 {
        recommendations.push(format!(
            "Monitor: {} drug(s) have shortage records on file. Track availability updates for these items.",
            summary.drugs_with_shortages
        ));
    }
    if buckets.low_risk.len() == total {
        recommendations.push(
            "No shortage activity detected across the formulary. Continue routine monitoring."
                .to_string(),
        );
    }
    recommendations.push(format!(
        "Reviewed {total} drug(s): {} high risk, {} medium risk, {} low risk, {failures} failed.",
        buckets.high_risk.len(),
        buckets.medium_risk.len(),
        buckets.low_risk.len(),
    ));

    BatchReport {
        batch_summary: summary,
        risk_assessment: buckets,
        individual_analyses: analyses,
        formulary_recommendations: recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(drug: &str, shortages: usize, recalls: usize, risk: RiskLevel) -> DrugAnalysis {
        DrugAnalysis {
            drug: drug.to_string(),
            shortage_count: shortages,
            shortage_status: String::new(),
            recall_count: recalls,
            risk_level: risk,
            companies_affected: Vec::new(),
            trend: None,
            error: None,
        }
    }

    #[test]
    fn buckets_are_disjoint_and_cover_all_successes() {
        let report = build_batch_report(vec![
            analysis("drugA", 2, 0, RiskLevel::High),
            analysis("drugB", 0, 0, RiskLevel::Low),
            analysis("drugC", 4, 0, RiskLevel::Medium),
        ]);

        assert_eq!(report.batch_summary.drugs_with_shortages, 2);
        assert_eq!(report.batch_summary.total_shortage_events, 6);
        assert_eq!(report.risk_assessment.high_risk, vec!["drugA"]);
        assert_eq!(report.risk_assessment.medium_risk, vec!["drugC"]);
        assert_eq!(report.risk_assessment.low_risk, vec!["drugB"]);
    }

    #[test]
    fn failures_stay_out_of_the_buckets() {
        let report = build_batch_report(vec![
            analysis("drugA", 0, 0, RiskLevel::Low),
            analysis("drugX", 0, 0, RiskLevel::Unknown),
        ]);

        let bucketed = report.risk_assessment.high_risk.len()
            + report.risk_assessment.medium_risk.len()
            + report.risk_assessment.low_risk.len();
        assert_eq!(bucketed, 1);
        assert!(
            report
                .formulary_recommendations
                .last()
                .unwrap()
                .contains("1 failed")
        );
    }

    #[test]
    fn high_risk_share_over_threshold_emits_alert() {
        let report = build_batch_report(vec![
            analysis("a", 1, 0, RiskLevel::High),
            analysis("b", 0, 0, RiskLevel::Low),
            analysis("c", 0, 0, RiskLevel::Low),
        ]);
        assert!(
            report
                .formulary_recommendations
                .iter()
                .any(|r| r.starts_with("Alert:"))
        );
    }

    #[test]
    fn exactly_thirty_percent_does_not_alert() {
        let mut analyses = vec![
            analysis("a", 1, 0, RiskLevel::High),
            analysis("b", 1, 0, RiskLevel::High),
            analysis("c", 1, 0, RiskLevel::High),
        ];
        for i in 0..7 {
            analyses.push(analysis(&format!("low{i}"), 0, 0, RiskLevel::Low));
        }
        let report = build_batch_report(analyses);
        assert!(
            !report
                .formulary_recommendations
                .iter()
                .any(|r| r.starts_with("Alert:"))
        );
    }

    #[test]
    fn all_low_batch_gets_reassuring_note_and_count_line() {
        let report = build_batch_report(vec![
            analysis("a", 0, 0, RiskLevel::Low),
            analysis("b", 0, 0, RiskLevel::Low),
        ]);
        assert!(
            report
                .formulary_recommendations
                .iter()
                .any(|r| r.contains("No shortage activity"))
        );
        assert!(
            report
                .formulary_recommendations
                .last()
                .unwrap()
                .starts_with("Reviewed 2 drug(s):")
        );
    }

    #[test]
    fn recall_counts_feed_the_summary() {
        let report = build_batch_report(vec![analysis("a", 0, 3, RiskLevel::Low)]);
        assert_eq!(report.batch_summary.drugs_with_recalls, 1);
    }
}
