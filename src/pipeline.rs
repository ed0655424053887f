//! Question answering pipeline.
//!
//! Rate check, SQL generation, guard and execution, in that order. Generation
//! and guard share one attempt budget: a rejected statement or a transient
//! model failure asks the model again. Any other failure stops the pipeline;
//! nothing reaches the database unless the guard accepted it.

use crate::database::ScalarExecutor;
use crate::error::{McpError, PREVIEW_CHARS, Result, ToolError, preview};
use crate::llm::{RetryPolicy, SqlGenerator};
use crate::security::{RateLimiter, ValidatedStatement, guard};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Successful answer to a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub value: i64,
    /// The statement that produced the value.
    pub sql: String,
}

/// Orchestrates one question from text to number.
pub struct QuestionPipeline {
    generator: Arc<dyn SqlGenerator>,
    executor: Arc<dyn ScalarExecutor>,
    rate_limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl QuestionPipeline {
    pub fn new(
        generator: Arc<dyn SqlGenerator>,
        executor: Arc<dyn ScalarExecutor>,
        rate_limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            generator,
            executor,
            rate_limiter,
            retry,
        }
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Answer `question` on behalf of `user`.
    ///
    /// Every failure is logged at warn level before it is returned.
    #[instrument(skip(self, question))]
    pub async fn answer(&self, user: &str, question: &str) -> Result<Answer> {
        let result = self.run(user, question).await;
        match &result {
            Ok(answer) => info!(value = answer.value, "Question answered"),
            Err(e) => warn!(error = %e, "Question failed"),
        }
        result
    }

    async fn run(&self, user: &str, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ToolError::MissingArgument("question".into()).into());
        }

        self.rate_limiter.check(user)?;

        let statement = self.retry.run(|| self.generate_statement(question)).await?;
        let value = self.executor.fetch_scalar(&statement).await?;

        Ok(Answer {
            value,
            sql: statement.into_inner(),
        })
    }

    /// One model request followed by the guard.
    async fn generate_statement(&self, question: &str) -> Result<ValidatedStatement> {
        let raw = self.generator.generate(question).await?;
        debug!("Model output: {}", preview(&raw, PREVIEW_CHARS));
        guard(&raw).map_err(McpError::from)
    }
}
