//! `validate_sql` tool: run the SQL guard without executing anything.

use crate::define_tool;
use crate::error::Result;
use crate::protocol::{CallToolResult, Tool};
use crate::security::guard;
use crate::tools::registry::{ToolHandler, parse_arguments};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct ValidateSqlArgs {
    pub sql: String,
}

/// Guard verdict as returned to the client.
#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Verdict {
    Accepted {
        valid: bool,
        statement: String,
    },
    Rejected {
        valid: bool,
        rule: &'static str,
        message: String,
        preview: String,
    },
}

impl Verdict {
    /// Guard `raw` exactly as model output would be guarded.
    pub fn of(raw: &str) -> Self {
        match guard(raw) {
            Ok(statement) => Self::Accepted {
                valid: true,
                statement: statement.into_inner(),
            },
            Err(rejection) => Self::Rejected {
                valid: false,
                rule: rejection.rule(),
                message: rejection.to_string(),
                preview: rejection.preview().to_string(),
            },
        }
    }
}

pub struct ValidateSqlTool;

#[async_trait]
impl ToolHandler for ValidateSqlTool {
    fn definition(&self) -> Tool {
        define_tool! {
            name: "validate_sql",
            description: "Check SQL or raw model output against the safety rules used for \
                generated queries. Markdown fences and surrounding prose are stripped first. \
                Nothing is executed.",
            schema: {
                "type": "object",
                "properties": {
                    "sql": {
                        "type": "string",
                        "description": "SQL statement or raw model output to check"
                    }
                },
                "required": ["sql"]
            }
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "validate_sql"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: ValidateSqlArgs = parse_arguments(arguments)?;
        Ok(CallToolResult::json(&Verdict::of(&args.sql)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_accepts_fenced_statement() {
        let result = ValidateSqlTool
            .execute(json!({"sql": "```sql\nSELECT COUNT(*) FROM videos;\n```"}))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&result.text_content()).unwrap();
        assert_eq!(
            value,
            json!({"valid": true, "statement": "SELECT COUNT(*) FROM videos"})
        );
    }

    #[tokio::test]
    async fn test_reports_violated_rule() {
        let result = ValidateSqlTool
            .execute(json!({"sql": "SELECT COUNT(*) FROM videos; DELETE FROM videos"}))
            .await
            .unwrap();
        assert!(!result.is_error());
        let value: Value = serde_json::from_str(&result.text_content()).unwrap();
        assert_eq!(value["valid"], false);
        assert_eq!(value["rule"], "forbidden_keyword");
        assert!(value["message"].as_str().unwrap().contains("DELETE"));
    }

    #[test]
    fn test_verdict_rules() {
        assert!(matches!(
            Verdict::of("Sorry, I can't help with that."),
            Verdict::Rejected { rule: "not_a_select", .. }
        ));
        assert!(matches!(
            Verdict::of("SELECT id FROM videos"),
            Verdict::Rejected { rule: "missing_aggregate", .. }
        ));
    }

    #[tokio::test]
    async fn test_missing_sql_argument() {
        assert!(ValidateSqlTool.execute(json!({})).await.is_err());
    }
}
