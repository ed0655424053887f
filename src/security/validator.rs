//! SQL statement validator.
//!
//! Applies a fixed, ordered rule chain to a candidate statement and either
//! returns a normalized [`ValidatedStatement`] or the first violated rule.
//! Matchers are compiled once and shared process-wide.

use crate::error::{PREVIEW_CHARS, SqlRejection, preview};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use tracing::{debug, warn};

/// Keywords that indicate a write or DDL operation.
pub const FORBIDDEN_KEYWORDS: [&str; 9] = [
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "TRUNCATE", "CREATE", "GRANT", "REVOKE",
];

/// Aggregate functions that collapse rows into a single value.
pub const AGGREGATE_FUNCTIONS: [&str; 5] = ["COUNT", "SUM", "AVG", "MIN", "MAX"];

/// Statement must open with `select` and whitespace.
static SELECT_ONLY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*select\s").expect("Invalid regex: select-only pattern"));

static FORBIDDEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(r"(?i)\b({})\b", FORBIDDEN_KEYWORDS.join("|"));
    Regex::new(&pattern).expect("Invalid regex: forbidden keyword pattern")
});

static AGGREGATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(r"(?i)\b({})\s*\(", AGGREGATE_FUNCTIONS.join("|"));
    Regex::new(&pattern).expect("Invalid regex: aggregate call pattern")
});

/// Outcome of validating one candidate statement.
pub type ValidationOutcome = Result<ValidatedStatement, SqlRejection>;

/// A statement that passed every rule.
///
/// Guarantees: starts with `SELECT`, contains no forbidden keyword, contains
/// an aggregate call, has no surrounding whitespace and no trailing `;`.
/// Only [`validate`] constructs it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedStatement(String);

impl ValidatedStatement {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for ValidatedStatement {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValidatedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ValidatedStatement> for String {
    fn from(statement: ValidatedStatement) -> Self {
        statement.0
    }
}

/// Validate a candidate statement.
///
/// Rules, first failure wins:
/// 1. must start with `SELECT` ([`SqlRejection::NotASelect`]);
/// 2. no forbidden keyword anywhere ([`SqlRejection::ForbiddenKeyword`]);
/// 3. at least one aggregate call ([`SqlRejection::MissingAggregate`]).
pub fn validate(candidate: &str) -> ValidationOutcome {
    debug!("Validating SQL: {}", preview(candidate, PREVIEW_CHARS));

    check_statement_kind(candidate)?;
    check_forbidden_keywords(candidate)?;
    check_aggregate(candidate)?;

    let statement = normalize(candidate);
    debug!("SQL validation passed");
    Ok(ValidatedStatement(statement))
}

/// Check that the statement is a SELECT.
fn check_statement_kind(candidate: &str) -> Result<(), SqlRejection> {
    if SELECT_ONLY_REGEX.is_match(candidate) {
        return Ok(());
    }
    warn!("Rejected non-SELECT statement");
    Err(SqlRejection::NotASelect {
        preview: preview(candidate, PREVIEW_CHARS),
    })
}

/// Check for forbidden keywords on word boundaries.
fn check_forbidden_keywords(candidate: &str) -> Result<(), SqlRejection> {
    match FORBIDDEN_REGEX.find(candidate) {
        Some(found) => {
            let keyword = found.as_str().to_ascii_uppercase();
            warn!("Forbidden keyword detected: {}", keyword);
            Err(SqlRejection::ForbiddenKeyword {
                keyword,
                preview: preview(candidate, PREVIEW_CHARS),
            })
        }
        None => Ok(()),
    }
}

/// Check for at least one aggregate function call.
fn check_aggregate(candidate: &str) -> Result<(), SqlRejection> {
    if AGGREGATE_REGEX.is_match(candidate) {
        return Ok(());
    }
    warn!("Rejected statement without aggregate function");
    Err(SqlRejection::MissingAggregate {
        preview: preview(candidate, PREVIEW_CHARS),
    })
}

/// Trim whitespace and the trailing terminator.
///
/// Repeats until stable so a stray `; ;` cannot leave a terminator behind
/// and normalizing twice yields the same text.
fn normalize(candidate: &str) -> String {
    let mut statement = candidate.trim();
    while let Some(stripped) = statement.strip_suffix(';') {
        statement = stripped.trim_end();
    }
    statement.to_string()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::security::extract;
    use proptest::prelude::*;

    fn aggregate() -> impl Strategy<Value = &'static str> {
        prop::sample::select(AGGREGATE_FUNCTIONS.to_vec())
    }

    fn identifier() -> impl Strategy<Value = String> {
        "[a-z_][a-z0-9_]{0,15}".prop_filter("no forbidden keyword", |ident| {
            !FORBIDDEN_REGEX.is_match(ident)
        })
    }

    fn aggregate_statement() -> impl Strategy<Value = String> {
        (
            "(?i)select",
            aggregate(),
            prop_oneof![Just("*".to_string()), identifier()],
            identifier(),
        )
            .prop_map(|(select, agg, arg, table)| format!("{select} {agg}({arg}) FROM {table}"))
    }

    proptest! {
        #[test]
        fn text_without_select_never_passes(raw in "[ -~\t\n]{0,200}") {
            prop_assume!(!raw.to_ascii_lowercase().contains("select"));
            let outcome = validate(&extract(&raw));
            prop_assert!(
                matches!(outcome, Err(SqlRejection::NotASelect { .. })),
                "unexpected outcome {:?}",
                outcome
            );
        }

        #[test]
        fn aggregate_statements_pass(
            statement in aggregate_statement(),
            leading in "[ \t\n]{0,3}",
            trailing in "[ \t\n]{0,3}",
            terminator in prop::bool::ANY,
        ) {
            let raw = format!(
                "{leading}{statement}{}{trailing}",
                if terminator { ";" } else { "" }
            );
            let validated = validate(&raw);
            prop_assert_eq!(validated.map(String::from), Ok(statement));
        }

        #[test]
        fn normalization_is_a_fixed_point(
            statement in aggregate_statement(),
            noise in "[ ;\t\n]{0,6}",
        ) {
            let first = validate(&format!("{statement}{noise}")).unwrap();
            let second = validate(first.as_str()).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert!(!first.as_str().ends_with(';'));
            prop_assert_eq!(first.as_str().trim(), first.as_str());
        }

        #[test]
        fn appended_forbidden_keyword_is_caught(
            statement in aggregate_statement(),
            keyword in prop::sample::select(FORBIDDEN_KEYWORDS.to_vec()),
            lowercase in prop::bool::ANY,
        ) {
            let keyword = if lowercase { keyword.to_lowercase() } else { keyword.to_string() };
            let raw = format!("{statement}; {keyword} TABLE videos");
            let outcome = validate(&raw);
            prop_assert!(
                matches!(outcome, Err(SqlRejection::ForbiddenKeyword { .. })),
                "unexpected outcome {:?}",
                outcome
            );
        }

        #[test]
        fn keyword_inside_identifier_is_allowed(
            statement in aggregate_statement(),
            keyword in prop::sample::select(FORBIDDEN_KEYWORDS.to_vec()),
        ) {
            let raw = format!("{statement} WHERE {}_flag = 1", keyword.to_lowercase());
            prop_assert!(validate(&raw).is_ok());
        }

        #[test]
        fn fenced_statement_round_trips(
            statement in aggregate_statement(),
            label in prop_oneof![Just(""), Just("sql"), Just("SQL"), Just("postgresql")],
            prose in "[A-Za-z ,.:]{0,30}",
        ) {
            prop_assume!(!prose.to_lowercase().contains("select"));
            let raw = format!("{prose}\n```{label}\n{statement}\n```\n{prose}");
            prop_assert_eq!(extract(&raw), statement.clone());
            prop_assert_eq!(validate(&extract(&raw)).map(String::from), Ok(statement));
        }
    }
}
