use crate::entities::shortage::ShortageRecord;
use crate::sources::openfda::{DrugShortageResult, OpenFdaClient};

/// Upstream shortage statuses that matter for risk classification. Everything
/// the API ever returns is kept verbatim in reports; this enum only drives
/// the decision rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShortageStatus {
    Current,
    Resolved,
    ToBeDiscontinued,
    Other,
}

impl ShortageStatus {
    pub(crate) fn classify(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Other;
        };
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "current" => Self::Current,
            "resolved" => Self::Resolved,
            "to be discontinued" | "tobediscontinued" => Self::ToBeDiscontinued,
            _ => Self::Other,
        }
    }

    pub(crate) fn is_active(self) -> bool {
        matches!(self, Self::Current | Self::ToBeDiscontinued)
    }
}

/// One query formulation in the fallback chain. The unescaped search term is
/// carried alongside the constructed query so relevance testing never has to
/// recover it from the query string.
#[derive(Debug, Clone)]
pub(crate) struct SearchStrategy {
    pub query: String,
    pub term: String,
}

const SEARCH_FIELDS: &[Option<&str>] = &[
    None, // bare quoted term
    Some("generic_name"),
    Some("proprietary_name"),
    Some("openfda.generic_name"),
    Some("openfda.brand_name"),
];

fn strategies_for_term(term: &str, out: &mut Vec<SearchStrategy>) {
    let escaped = OpenFdaClient::escape_query_value(term);
    for field in SEARCH_FIELDS {
        let query = match field {
            None => format!("\"{escaped}\""),
            Some(field) => format!("{field}:\"{escaped}\""),
        };
        out.push(SearchStrategy {
            query,
            term: term.to_string(),
        });
    }
}

/// Builds the ordered fallback chain for a shortage lookup. The cleaned name
/// comes first; if cleaning changed the input, the same field sequence is
/// appended for the raw (lowercased) name so brand formulations stay findable.
pub(crate) fn build_strategies(raw: &str, cleaned: &str) -> Vec<SearchStrategy> {
    let mut strategies = Vec::with_capacity(SEARCH_FIELDS.len() * 2);
    strategies_for_term(cleaned, &mut strategies);

    let raw_lower = raw.trim().to_lowercase();
    if raw_lower != cleaned {
        strategies_for_term(&raw_lower, &mut strategies);
    }
    strategies
}

/// Containment thresholds for the relevance filter. The symmetric alias check
/// is deliberately permissive ("insulin" matches "insulin aspart"); the
/// minimum alias length guards against two-letter aliases matching anything.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RelevanceConfig {
    pub min_alias_len: usize,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self { min_alias_len: 3 }
    }
}

fn contains_term(field: Option<&str>, term: &str) -> bool {
    field.is_some_and(|value| value.to_lowercase().contains(term))
}

fn alias_names(record: &DrugShortageResult) -> impl Iterator<Item = &str> {
    record
        .openfda
        .iter()
        .flat_map(|fda| fda.generic_name.iter().chain(fda.brand_name.iter()))
}

/// Decides whether an upstream row actually pertains to the searched drug.
/// The shortage API's own search is loose; rows for unrelated products come
/// back regularly and must be dropped rather than reported.
pub(crate) fn record_matches_term(
    record: &DrugShortageResult,
    term: &str,
    config: &RelevanceConfig,
) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return false;
    }

    if contains_term(record.generic_name.as_deref(), &term)
        || contains_term(record.proprietary_name.as_deref(), &term)
    {
        return true;
    }

    alias_names(record).any(|alias| {
        let alias = alias.trim().to_lowercase();
        if alias.is_empty() {
            return false;
        }
        alias.contains(&term) || (alias.len() > config.min_alias_len && term.contains(&alias))
    })
}

/// The trend path filters with a stricter one-way containment check against
/// the reported names and generic aliases only.
pub(crate) fn record_matches_trend_term(record: &DrugShortageResult, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return false;
    }

    contains_term(record.generic_name.as_deref(), &term)
        || contains_term(record.proprietary_name.as_deref(), &term)
        || record
            .openfda
            .iter()
            .flat_map(|fda| fda.generic_name.iter())
            .any(|alias| alias.to_lowercase().contains(&term))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub(crate) fn to_shortage_record(raw: &DrugShortageResult) -> ShortageRecord {
    let raw = raw.clone();
    let alias_names: Vec<String> = raw
        .openfda
        .as_ref()
        .map(|fda| {
            fda.generic_name
                .iter()
                .chain(fda.brand_name.iter())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    ShortageRecord {
        generic_name: non_empty(raw.generic_name).unwrap_or_else(|| "Unknown".to_string()),
        proprietary_name: non_empty(raw.proprietary_name),
        status: non_empty(raw.status).unwrap_or_else(|| "Unknown".to_string()),
        availability: non_empty(raw.availability),
        shortage_reason: non_empty(raw.shortage_reason).filter(|v| v != "N/A"),
        company_name: non_empty(raw.company_name).unwrap_or_else(|| "Unknown".to_string()),
        dosage_form: non_empty(raw.dosage_form),
        strength: raw.strength.into_vec(),
        therapeutic_category: raw.therapeutic_category.into_vec(),
        initial_posting_date: non_empty(raw.initial_posting_date),
        update_date: non_empty(raw.update_date),
        alias_names,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::openfda::ShortageOpenFda;
    use crate::utils::serde::StringOrVec;

    fn record(generic: Option<&str>, proprietary: Option<&str>, aliases: &[&str]) -> DrugShortageResult {
        DrugShortageResult {
            generic_name: generic.map(str::to_string),
            proprietary_name: proprietary.map(str::to_string),
            openfda: Some(ShortageOpenFda {
                generic_name: StringOrVec::Multiple(
                    aliases.iter().map(|a| a.to_string()).collect(),
                ),
                ..ShortageOpenFda::default()
            }),
            ..DrugShortageResult::default()
        }
    }

    #[test]
    fn status_classification_is_case_insensitive() {
        assert_eq!(
            ShortageStatus::classify(Some("CURRENT")),
            ShortageStatus::Current
        );
        assert_eq!(
            ShortageStatus::classify(Some("To Be Discontinued")),
            ShortageStatus::ToBeDiscontinued
        );
        assert_eq!(ShortageStatus::classify(None), ShortageStatus::Other);
        assert!(ShortageStatus::classify(Some("current")).is_active());
        assert!(!ShortageStatus::classify(Some("Resolved")).is_active());
    }

    #[test]
    fn strategies_cover_all_fields_in_order() {
        let strategies = build_strategies("lisinopril", "lisinopril");
        let queries: Vec<&str> = strategies.iter().map(|s| s.query.as_str()).collect();
        assert_eq!(
            queries,
            vec![
                "\"lisinopril\"",
                "generic_name:\"lisinopril\"",
                "proprietary_name:\"lisinopril\"",
                "openfda.generic_name:\"lisinopril\"",
                "openfda.brand_name:\"lisinopril\"",
            ]
        );
        assert!(strategies.iter().all(|s| s.term == "lisinopril"));
    }

    #[test]
    fn strategies_append_raw_term_when_cleaning_changed_it() {
        let strategies = build_strategies("Amoxicillin Capsules", "amoxicillin");
        assert_eq!(strategies.len(), 10);
        assert_eq!(strategies[0].term, "amoxicillin");
        assert_eq!(strategies[5].term, "amoxicillin capsules");
        assert_eq!(strategies[5].query, "\"amoxicillin capsules\"");
    }

    #[test]
    fn strategy_queries_escape_but_terms_do_not() {
        let strategies = build_strategies("a/b", "a/b");
        assert_eq!(strategies[0].query, "\"a\\/b\"");
        assert_eq!(strategies[0].term, "a/b");
    }

    #[test]
    fn matches_on_reported_names() {
        let config = RelevanceConfig::default();
        let rec = record(Some("Amoxicillin Capsules"), None, &[]);
        assert!(record_matches_term(&rec, "amoxicillin", &config));

        let rec = record(None, Some("Amoxil"), &[]);
        assert!(record_matches_term(&rec, "amoxil", &config));
    }

    #[test]
    fn matches_alias_in_either_direction() {
        let config = RelevanceConfig::default();

        // Search term contained in alias.
        let rec = record(None, None, &["insulin aspart"]);
        assert!(record_matches_term(&rec, "insulin", &config));

        // Alias contained in search term (partial/abbreviated upstream name).
        let rec = record(None, None, &["insulin"]);
        assert!(record_matches_term(&rec, "insulin aspart", &config));
    }

    #[test]
    fn short_aliases_do_not_reverse_match() {
        let config = RelevanceConfig::default();
        let rec = record(None, None, &["ace"]);
        assert!(!record_matches_term(&rec, "acetaminophen tablets", &config));

        // Raising the threshold disables longer reverse matches too.
        let strict = RelevanceConfig { min_alias_len: 12 };
        let rec = record(None, None, &["insulin"]);
        assert!(!record_matches_term(&rec, "insulin aspart", &strict));
    }

    #[test]
    fn irrelevant_records_are_rejected() {
        let config = RelevanceConfig::default();
        let rec = record(Some("Cisplatin Injection"), Some("Platinol"), &["cisplatin"]);
        assert!(!record_matches_term(&rec, "lisinopril", &config));
    }

    #[test]
    fn trend_filter_ignores_brand_aliases() {
        let mut rec = record(None, None, &[]);
        rec.openfda = Some(ShortageOpenFda {
            brand_name: StringOrVec::Single("Amoxil".into()),
            ..ShortageOpenFda::default()
        });
        assert!(!record_matches_trend_term(&rec, "amoxil"));

        let rec = record(Some("Amoxicillin"), None, &[]);
        assert!(record_matches_trend_term(&rec, "amoxicillin"));
    }

    #[test]
    fn record_conversion_normalizes_placeholders() {
        let raw = DrugShortageResult {
            generic_name: Some("  Clindamycin Injection ".into()),
            shortage_reason: Some("N/A".into()),
            company_name: None,
            ..DrugShortageResult::default()
        };
        let rec = to_shortage_record(&raw);
        assert_eq!(rec.generic_name, "Clindamycin Injection");
        assert_eq!(rec.status, "Unknown");
        assert_eq!(rec.company_name, "Unknown");
        assert!(rec.shortage_reason.is_none());
    }
}
