use intake_core::PatientName;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ParsingConfig;

/// Labels that may directly precede a patient name ("Patient Name: Ada Lovelace").
pub const DEFAULT_NAME_LABELS: [&str; 2] = [r"Patient\s+Name", r"Name"];

/// Build the label fallback regex: any of `labels` (case-insensitive), then
/// exactly two capitalized words on the same line.
pub(crate) fn label_regex(labels: &[String]) -> Result<Regex, regex::Error> {
    let alternation = labels
        .iter()
        .map(|l| format!("(?:{})", l))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r"\b(?i:{})[: \t]+([A-Z][a-z]+)[ \t]+([A-Z][a-z]+)\b",
        alternation
    ))
}

/// Extract the patient's first and last name from one page's text.
///
/// Tries, in order:
/// 1. Two or more capitalized words (followed by a date) on the line after the
///    "Patient Name and Address … Date of Birth" header; the first word is the
///    first name and the rest form the last name
/// 2. A `Patient Name` / `Name` label followed by two capitalized words
/// 3. Two capitalized words on the line after "Patient Name and Address"
pub fn extract_patient_name(text: &str) -> Option<PatientName> {
    extract_patient_name_with_config(text, &ParsingConfig::default())
}

/// Config-aware version of [`extract_patient_name`].
pub(crate) fn extract_patient_name_with_config(
    text: &str,
    config: &ParsingConfig,
) -> Option<PatientName> {
    static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?i:Patient\s+Name\s+and\s+Address).*?(?i:Date\s+of\s+Birth)\s*\n\s*([A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+)+)[ \t]+\d{1,2}/\d{1,2}/\d{2,4}",
        )
        .unwrap()
    });

    static LABEL_RE: Lazy<Regex> = Lazy::new(|| {
        let labels: Vec<String> = DEFAULT_NAME_LABELS.iter().map(|l| l.to_string()).collect();
        label_regex(&labels).unwrap()
    });

    static ADDRESS_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i:Patient\s+Name\s+and\s+Address)\s*\n\s*([A-Z][a-z]+)[ \t]+([A-Z][a-z]+)\b")
            .unwrap()
    });

    if let Some(caps) = HEADER_RE.captures(text) {
        let mut tokens = caps[1].split_whitespace();
        if let Some(first) = tokens.next() {
            let last = tokens.collect::<Vec<_>>().join(" ");
            if !last.is_empty() {
                tracing::debug!(first, last = %last, "name from header block");
                return Some(PatientName::new(first, last));
            }
        }
    }

    let label_re = config.name_label_re.as_ref().unwrap_or(&LABEL_RE);
    for re in [label_re, &*ADDRESS_HEADER_RE] {
        if let Some(caps) = re.captures(text) {
            let first = &caps[1];
            let last = &caps[2];
            tracing::debug!(first, last, "name from fallback pattern");
            return Some(PatientName::new(first, last));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(first: &str, last: &str) -> Option<PatientName> {
        Some(PatientName::new(first, last))
    }

    #[test]
    fn test_header_block_two_words() {
        let text = "Patient Name and Address   Patient Date of Birth\nMarie Curie 12/05/1900";
        assert_eq!(extract_patient_name(text), name("Marie", "Curie"));
    }

    #[test]
    fn test_header_block_multiword_last_name() {
        let text = "patient name and address    date of birth\n\n  Martin Van Buren  12/05/1982\n";
        assert_eq!(extract_patient_name(text), name("Martin", "Van Buren"));
    }

    #[test]
    fn test_label_fallback() {
        assert_eq!(
            extract_patient_name("Patient Name: Ada Lovelace\nAddress: 1 Main St"),
            name("Ada", "Lovelace")
        );
        assert_eq!(
            extract_patient_name("NAME   Grace Hopper"),
            name("Grace", "Hopper")
        );
    }

    #[test]
    fn test_label_does_not_span_lines() {
        assert_eq!(extract_patient_name("Name:\nAda\nLovelace"), None);
    }

    #[test]
    fn test_address_header_fallback() {
        let text = "Patient Name and Address\nAlan Turing\n12 Bletchley Rd";
        assert_eq!(extract_patient_name(text), name("Alan", "Turing"));
    }

    #[test]
    fn test_name_tokens_are_case_sensitive() {
        assert_eq!(extract_patient_name("Patient Name: ada lovelace"), None);
        assert_eq!(extract_patient_name("Patient Name: ADA LOVELACE"), None);
    }

    #[test]
    fn test_header_words_are_not_taken_as_names() {
        // "Name and Address" must not be read as a name.
        assert_eq!(
            extract_patient_name("Patient Name and Address   Patient Date of Birth"),
            None
        );
    }

    #[test]
    fn test_custom_label() {
        let config = crate::ParsingConfigBuilder::new()
            .add_name_label(r"Member".to_string())
            .build()
            .unwrap();
        assert_eq!(
            extract_patient_name_with_config("Member: Rosalind Franklin", &config),
            name("Rosalind", "Franklin")
        );
        assert_eq!(extract_patient_name("Member: Rosalind Franklin"), None);
    }

    #[test]
    fn test_no_name() {
        assert_eq!(extract_patient_name("lab results pending"), None);
    }
}
