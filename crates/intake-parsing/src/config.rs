use regex::Regex;

use crate::date::{DEFAULT_DATE_FORMATS, EARLIEST_BIRTH_YEAR};
use crate::name::DEFAULT_NAME_LABELS;

/// Controls how a list of patterns/values is overridden from its defaults.
#[derive(Debug, Clone, Default)]
pub enum ListOverride<T> {
    /// Use the built-in defaults.
    #[default]
    Default,
    /// Completely replace the defaults with these values.
    Replace(Vec<T>),
    /// Append these values to the defaults.
    Extend(Vec<T>),
}

impl<T: Clone> ListOverride<T> {
    /// Resolve this override against the given defaults.
    pub fn resolve(&self, defaults: &[T]) -> Vec<T> {
        match self {
            ListOverride::Default => defaults.to_vec(),
            ListOverride::Replace(v) => v.clone(),
            ListOverride::Extend(v) => {
                let mut result = defaults.to_vec();
                result.extend(v.iter().cloned());
                result
            }
        }
    }
}

/// Configuration for the name and date parsers.
///
/// `name_label_re` is `None` when the built-in label set is in use.
/// Use [`ParsingConfigBuilder`] to construct with string patterns.
#[derive(Debug, Clone)]
pub struct ParsingConfig {
    // ── date.rs ──
    /// Oldest birth year still considered plausible (inclusive).
    pub(crate) earliest_birth_year: i32,
    /// `chrono` format strings tried, in order, on every date candidate.
    pub(crate) date_formats: Vec<String>,

    // ── name.rs ──
    /// Compiled label fallback for names (labels followed by two capitalized words).
    pub(crate) name_label_re: Option<Regex>,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            earliest_birth_year: EARLIEST_BIRTH_YEAR,
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
            name_label_re: None,
        }
    }
}

impl ParsingConfig {
    pub fn earliest_birth_year(&self) -> i32 {
        self.earliest_birth_year
    }

    pub fn date_formats(&self) -> &[String] {
        &self.date_formats
    }
}

/// Builder for [`ParsingConfig`].
///
/// Name label patterns are compiled to a `Regex` in [`build()`](Self::build),
/// which fails fast with `regex::Error` if any pattern is invalid.
#[derive(Debug, Clone, Default)]
pub struct ParsingConfigBuilder {
    earliest_birth_year: Option<i32>,
    date_formats: ListOverride<String>,
    name_labels: ListOverride<String>,
}

impl ParsingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn earliest_birth_year(mut self, year: i32) -> Self {
        self.earliest_birth_year = Some(year);
        self
    }

    // ── Date formats ──

    pub fn set_date_formats(mut self, formats: Vec<String>) -> Self {
        self.date_formats = ListOverride::Replace(formats);
        self
    }

    pub fn add_date_format(mut self, format: String) -> Self {
        match &mut self.date_formats {
            ListOverride::Extend(v) => v.push(format),
            _ => self.date_formats = ListOverride::Extend(vec![format]),
        }
        self
    }

    // ── Name labels ──

    pub fn set_name_labels(mut self, patterns: Vec<String>) -> Self {
        self.name_labels = ListOverride::Replace(patterns);
        self
    }

    pub fn add_name_label(mut self, pattern: String) -> Self {
        match &mut self.name_labels {
            ListOverride::Extend(v) => v.push(pattern),
            _ => self.name_labels = ListOverride::Extend(vec![pattern]),
        }
        self
    }

    /// Compile the label patterns and produce a [`ParsingConfig`].
    pub fn build(self) -> Result<ParsingConfig, regex::Error> {
        let defaults: Vec<String> = DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect();
        let date_formats = self.date_formats.resolve(&defaults);

        let name_label_re = match self.name_labels {
            ListOverride::Default => None,
            labels => {
                let defaults: Vec<String> =
                    DEFAULT_NAME_LABELS.iter().map(|l| l.to_string()).collect();
                let resolved = labels.resolve(&defaults);
                // Each label must compile on its own so errors point at the bad pattern.
                for label in &resolved {
                    Regex::new(label)?;
                }
                Some(crate::name::label_regex(&resolved)?)
            }
        };

        Ok(ParsingConfig {
            earliest_birth_year: self.earliest_birth_year.unwrap_or(EARLIEST_BIRTH_YEAR),
            date_formats,
            name_label_re,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ParsingConfig::default();
        assert_eq!(config.earliest_birth_year, 1900);
        assert_eq!(
            config.date_formats,
            vec!["%m/%d/%Y", "%m-%d-%Y", "%m/%d/%y", "%m-%d-%y"]
        );
        assert!(config.name_label_re.is_none());
    }

    #[test]
    fn test_builder_scalars_and_formats() {
        let config = ParsingConfigBuilder::new()
            .earliest_birth_year(1920)
            .add_date_format("%d.%m.%Y".to_string())
            .build()
            .unwrap();
        assert_eq!(config.earliest_birth_year(), 1920);
        assert_eq!(config.date_formats().len(), 5);
        assert_eq!(config.date_formats()[4], "%d.%m.%Y");
    }

    #[test]
    fn test_builder_replace_formats() {
        let config = ParsingConfigBuilder::new()
            .set_date_formats(vec!["%Y-%m-%d".to_string()])
            .build()
            .unwrap();
        assert_eq!(config.date_formats(), ["%Y-%m-%d".to_string()]);
    }

    #[test]
    fn test_builder_custom_label() {
        let config = ParsingConfigBuilder::new()
            .add_name_label(r"Patient".to_string())
            .build()
            .unwrap();
        assert!(config.name_label_re.is_some());
    }

    #[test]
    fn test_builder_invalid_label() {
        let result = ParsingConfigBuilder::new()
            .add_name_label(r"[invalid".to_string())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_list_override_resolve() {
        let defaults = vec!["a".to_string(), "b".to_string()];

        let d: ListOverride<String> = ListOverride::Default;
        assert_eq!(d.resolve(&defaults), defaults);

        let r: ListOverride<String> = ListOverride::Replace(vec!["x".to_string()]);
        assert_eq!(r.resolve(&defaults), vec!["x".to_string()]);

        let e: ListOverride<String> = ListOverride::Extend(vec!["c".to_string()]);
        assert_eq!(
            e.resolve(&defaults),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }
}
