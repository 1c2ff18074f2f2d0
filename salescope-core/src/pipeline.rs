//! The Ask assistant pipeline.
//!
//! Every accepted question appends exactly two turns to the session: the
//! user's own turn first (so the question stays visible when generation
//! fails), then one assistant turn carrying the result or the captured
//! failure. Each question gets exactly one end-to-end attempt; the user
//! resubmits to retry. Ad hoc generated queries bypass the report cache.

use std::sync::Arc;

use thiserror::Error;

use crate::executor::QueryExecutor;
use crate::models::{FailureStage, Turn, TurnError};
use crate::session::ConversationSession;
use crate::translator::NlQueryTranslator;

/// Synchronous rejections — nothing was appended to the session.
#[derive(Error, Debug)]
pub enum AskError {
    #[error("Question is empty")]
    EmptyQuestion,
}

pub struct AssistantPipeline {
    translator: NlQueryTranslator,
    executor: Arc<dyn QueryExecutor>,
}

impl AssistantPipeline {
    pub fn new(translator: NlQueryTranslator, executor: Arc<dyn QueryExecutor>) -> Self {
        Self {
            translator,
            executor,
        }
    }

    /// Run one question to completion and return the assistant turn. The
    /// exclusive session borrow is what serializes questions within a
    /// session; independent sessions run fully in parallel.
    pub async fn ask(
        &self,
        session: &mut ConversationSession,
        question: &str,
    ) -> Result<Turn, AskError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AskError::EmptyQuestion);
        }

        session.append(Turn::user(question));

        let sql = match self.translator.translate(question).await {
            Ok(sql) => sql,
            Err(e) => {
                tracing::warn!(error = %e, "Query generation failed");
                let turn = Turn::assistant_failure(
                    failure_message(&e),
                    None,
                    TurnError {
                        stage: FailureStage::Translation,
                        message: e.to_string(),
                    },
                );
                session.append(turn.clone());
                return Ok(turn);
            }
        };

        tracing::debug!(sql = %sql, "Executing generated query");
        let turn = match self.executor.execute(&sql).await {
            Ok(result) => Turn::assistant_success(
                format!("Here are the results for: *{}*", question),
                sql,
                result,
            ),
            Err(e) => {
                tracing::warn!(error = %e, sql = %sql, "Generated query failed");
                Turn::assistant_failure(
                    failure_message(&e),
                    Some(sql),
                    TurnError {
                        stage: FailureStage::Execution,
                        message: e.to_string(),
                    },
                )
            }
        };

        session.append(turn.clone());
        Ok(turn)
    }
}

fn failure_message(error: &impl std::fmt::Display) -> String {
    format!("Sorry, I couldn't process that question. Error: {}", error)
}
