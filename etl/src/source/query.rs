use std::path::Path;

use crate::etl_error;
use crate::error::{ErrorKind, EtlResult};

/// Placeholder for the pagination offset.
const SKIP_PLACEHOLDER: &str = "$skip";
/// Placeholder for the per-call result cap.
const FIRST_PLACEHOLDER: &str = "$first";
/// Placeholder for the window start (inclusive, epoch seconds).
const START_PLACEHOLDER: &str = "$start_ts";
/// Placeholder for the window end (exclusive, epoch seconds).
const END_PLACEHOLDER: &str = "$end_ts";

/// Typed parameters bound into one page request.
///
/// Binding goes through this struct rather than raw text substitution so offsets and
/// timestamps are integers by construction, not substring-injected values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryBindings {
    /// Per-call result cap.
    pub first: usize,
    /// Pagination offset, in records.
    pub skip: usize,
    /// Window start, inclusive, epoch seconds.
    pub start: i64,
    /// Window end, exclusive, epoch seconds.
    pub end: i64,
}

/// A parameterized GraphQL query template for one dataset.
///
/// The template is opaque to the pipeline apart from its placeholders and its
/// top-level operation field, under which the source returns the ordered sequence of
/// matching records. The field selection inside is the dataset author's business.
#[derive(Debug, Clone)]
pub struct QueryTemplate {
    text: String,
    operation_field: String,
}

impl QueryTemplate {
    /// Loads a template from a `.graphql` file.
    pub fn from_file(path: impl AsRef<Path>) -> EtlResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            etl_error!(
                ErrorKind::ConfigError,
                "Failed to read query template",
                path.display(),
                source: err
            )
        })?;

        Self::from_text(text)
    }

    /// Parses and validates a template from its text.
    ///
    /// Requires the `$skip`, `$start_ts` and `$end_ts` placeholders and a parseable
    /// top-level operation field. The `$first` placeholder is optional; a template
    /// without it carries its page size literally and binding leaves it untouched.
    pub fn from_text(text: impl Into<String>) -> EtlResult<Self> {
        let text = text.into();

        for placeholder in [SKIP_PLACEHOLDER, START_PLACEHOLDER, END_PLACEHOLDER] {
            if !text.contains(placeholder) {
                return Err(etl_error!(
                    ErrorKind::ConfigError,
                    "Query template is missing a required placeholder",
                    placeholder
                ));
            }
        }

        let operation_field = extract_operation_field(&text).ok_or_else(|| {
            etl_error!(
                ErrorKind::ConfigError,
                "Query template has no parseable top-level operation field"
            )
        })?;

        Ok(Self {
            text,
            operation_field,
        })
    }

    /// The top-level response field under which records are returned.
    pub fn operation_field(&self) -> &str {
        &self.operation_field
    }

    /// Renders the query text with the given bindings applied.
    pub fn bind(&self, bindings: &QueryBindings) -> String {
        // start_ts/end_ts are replaced before their shorter potential prefixes would
        // matter; all placeholder names are disjoint by construction.
        self.text
            .replace(START_PLACEHOLDER, &bindings.start.to_string())
            .replace(END_PLACEHOLDER, &bindings.end.to_string())
            .replace(FIRST_PLACEHOLDER, &bindings.first.to_string())
            .replace(SKIP_PLACEHOLDER, &bindings.skip.to_string())
    }
}

/// Extracts the first field name after the opening brace of the query body.
fn extract_operation_field(text: &str) -> Option<String> {
    let after_brace = &text[text.find('{')? + 1..];
    let trimmed = after_brace.trim_start();

    let field: String = trimmed
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();

    if field.is_empty() { None } else { Some(field) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPOSITS_TEMPLATE: &str = r#"{
  deposits(first: $first, skip: $skip, where: {timestamp_gte: "$start_ts", timestamp_lt: "$end_ts"}, orderDirection: asc) {
    id
    amount
    timestamp
    account {
      id
    }
  }
}"#;

    #[test]
    fn operation_field_is_extracted() {
        let template = QueryTemplate::from_text(DEPOSITS_TEMPLATE).unwrap();
        assert_eq!(template.operation_field(), "deposits");
    }

    #[test]
    fn bind_renders_all_parameters() {
        let template = QueryTemplate::from_text(DEPOSITS_TEMPLATE).unwrap();
        let bound = template.bind(&QueryBindings {
            first: 1000,
            skip: 2000,
            start: 1704067200,
            end: 1704088800,
        });

        assert!(bound.contains("first: 1000"));
        assert!(bound.contains("skip: 2000"));
        assert!(bound.contains(r#"timestamp_gte: "1704067200""#));
        assert!(bound.contains(r#"timestamp_lt: "1704088800""#));
        assert!(!bound.contains('$'));
    }

    #[test]
    fn binding_is_deterministic() {
        let template = QueryTemplate::from_text(DEPOSITS_TEMPLATE).unwrap();
        let bindings = QueryBindings {
            first: 1000,
            skip: 0,
            start: 1,
            end: 2,
        };

        assert_eq!(template.bind(&bindings), template.bind(&bindings));
    }

    #[test]
    fn literal_page_size_is_left_untouched_by_binding() {
        let template = QueryTemplate::from_text(
            r#"{ deposits(first: 1000, skip: $skip, where: {timestamp_gte: "$start_ts", timestamp_lt: "$end_ts"}) { id } }"#,
        )
        .unwrap();

        let bound = template.bind(&QueryBindings {
            first: 500,
            skip: 0,
            start: 1,
            end: 2,
        });

        assert!(bound.contains("first: 1000"));
        assert!(!bound.contains("500"));
    }

    #[test]
    fn missing_placeholder_is_rejected() {
        let result = QueryTemplate::from_text("{ deposits(skip: $skip) { id } }");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::ConfigError);
    }

    #[test]
    fn template_without_operation_field_is_rejected() {
        let result = QueryTemplate::from_text("$skip $start_ts $end_ts");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::ConfigError);
    }
}
