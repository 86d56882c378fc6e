/// Dosage-form noise commonly typed after a drug name. Stripped before the
/// shortage fallback chain so `"amoxicillin capsules"` searches as
/// `"amoxicillin"`.
const DOSAGE_FORM_SUFFIXES: &[&str] = &[" tablets", " capsules", " injection", " oral", " solution"];

/// Normalizes a free-text drug identifier for shortage searching.
///
/// Lowercases and trims, keeps only the first active ingredient of a
/// combination name ("amoxicillin and clavulanate" -> "amoxicillin"), and
/// strips the fixed dosage-form suffixes until none remain.
pub(crate) fn clean_drug_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();

    let mut name = match lowered.split_once(" and ") {
        Some((first, _)) => first.trim().to_string(),
        None => lowered,
    };

    loop {
        let before = name.len();
        for suffix in DOSAGE_FORM_SUFFIXES {
            if let Some(stripped) = name.strip_suffix(suffix) {
                name = stripped.trim_end().to_string();
            }
        }
        if name.len() == before {
            break;
        }
    }

    name.trim().to_string()
}

/// Trend analysis keeps the broader name: lowercase/trim only, no suffix
/// stripping, so multi-ingredient histories stay visible.
pub(crate) fn clean_drug_name_for_trends(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{clean_drug_name, clean_drug_name_for_trends};

    #[test]
    fn lowercases_and_trims() {
        assert_eq!(clean_drug_name("  Lisinopril "), "lisinopril");
    }

    #[test]
    fn keeps_first_ingredient_of_combination_names() {
        assert_eq!(
            clean_drug_name("Amoxicillin and Clavulanate Potassium"),
            "amoxicillin"
        );
    }

    #[test]
    fn strips_dosage_form_suffixes() {
        assert_eq!(clean_drug_name("clindamycin injection"), "clindamycin");
        assert_eq!(clean_drug_name("Amoxicillin Capsules"), "amoxicillin");
    }

    #[test]
    fn strips_stacked_suffixes() {
        assert_eq!(clean_drug_name("acetaminophen oral solution"), "acetaminophen");
    }

    #[test]
    fn leaves_embedded_words_alone() {
        // Only trailing suffixes are dosage-form noise.
        assert_eq!(clean_drug_name("oral-b rinse"), "oral-b rinse");
    }

    #[test]
    fn trend_cleaning_keeps_suffixes() {
        assert_eq!(
            clean_drug_name_for_trends("Clindamycin Injection"),
            "clindamycin injection"
        );
    }
}
