//! Sub-question decomposition over per-document engines
//!
//! A user question is split by the completion provider into questions that
//! each target one document. Every sub-question runs against its document's
//! engine concurrently, and the answers are synthesized into one reply.

use super::index::RetrievalEngine;
use crate::error::{ChatfolioError, Result};
use crate::providers::Provider;
use crate::session::Turn;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A retrieval engine labelled with its document's name and description
#[derive(Clone)]
pub struct DocumentTool {
    /// Document base name
    pub name: String,
    /// Short description used to route sub-questions
    pub description: String,
    /// Engine answering questions about the document
    pub engine: Arc<dyn RetrievalEngine>,
}

impl std::fmt::Debug for DocumentTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// One generated question aimed at one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubQuestion {
    /// The question to ask
    pub sub_question: String,
    /// Name of the document to ask it of
    pub tool_name: String,
}

#[derive(Serialize)]
struct ToolSummary<'a> {
    name: &'a str,
    description: &'a str,
}

/// Answers questions across several documents
pub struct SubQuestionEngine {
    provider: Arc<dyn Provider>,
    tools: Vec<DocumentTool>,
    max_sub_questions: usize,
}

impl SubQuestionEngine {
    /// Create an engine over `tools`
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Vec<DocumentTool>,
        max_sub_questions: usize,
    ) -> Self {
        Self {
            provider,
            tools,
            max_sub_questions,
        }
    }

    /// Documents this engine can answer from
    pub fn tools(&self) -> &[DocumentTool] {
        &self.tools
    }

    /// Ask the provider to decompose `query`
    ///
    /// Falls back to asking the whole question of every document when the
    /// reply is not a usable JSON array.
    ///
    /// # Errors
    ///
    /// Returns error if the provider call fails
    pub async fn generate(&self, query: &str) -> Result<Vec<SubQuestion>> {
        let summaries: Vec<ToolSummary<'_>> = self
            .tools
            .iter()
            .map(|t| ToolSummary {
                name: &t.name,
                description: &t.description,
            })
            .collect();
        let tools_json = serde_json::to_string_pretty(&summaries)?;

        let prompt = vec![
            Turn::system(format!(
                "You break a user question into at most {} simpler sub-questions, each \
                 answerable from exactly one of the documents listed below. Reply with a \
                 JSON array of objects with the keys \"sub_question\" and \"tool_name\", \
                 where tool_name is one of the document names. Reply with JSON only.\n\n\
                 Documents:\n{}",
                self.max_sub_questions, tools_json
            )),
            Turn::user(query.to_string()),
        ];

        let reply = self.provider.complete_text(&prompt).await?;
        match parse_sub_questions(&reply, &self.tools, self.max_sub_questions) {
            Some(questions) => Ok(questions),
            None => {
                tracing::warn!("Could not parse sub-questions, asking every document");
                Ok(self.fan_out(query))
            }
        }
    }

    fn fan_out(&self, query: &str) -> Vec<SubQuestion> {
        self.tools
            .iter()
            .map(|t| SubQuestion {
                sub_question: query.to_string(),
                tool_name: t.name.clone(),
            })
            .collect()
    }

    /// Answer `query` from the documents
    ///
    /// # Errors
    ///
    /// Returns `Retrieval` if there are no documents or every sub-question
    /// failed, and provider errors from generation or synthesis
    pub async fn query(&self, query: &str) -> Result<String> {
        if self.tools.is_empty() {
            return Err(ChatfolioError::Retrieval("No indexable documents".to_string()).into());
        }

        let questions = self.generate(query).await?;
        tracing::debug!("Generated {} sub-question(s)", questions.len());

        let answers = join_all(questions.iter().map(|q| async move {
            let tool = self.tools.iter().find(|t| t.name == q.tool_name);
            match tool {
                Some(tool) => tool.engine.query(&q.sub_question).await,
                None => Err(ChatfolioError::Retrieval(format!("Unknown document {}", q.tool_name))
                    .into()),
            }
        }))
        .await;

        let mut pairs = Vec::new();
        let mut first_error = None;
        for (question, answer) in questions.iter().zip(answers) {
            match answer {
                Ok(answer) => {
                    tracing::debug!(
                        "[{}] {} -> {}",
                        question.tool_name,
                        question.sub_question,
                        answer
                    );
                    pairs.push((question, answer));
                }
                Err(e) => {
                    tracing::warn!("Sub-question on {} failed: {}", question.tool_name, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if pairs.is_empty() {
            return Err(first_error.unwrap_or_else(|| {
                ChatfolioError::Retrieval("No sub-question produced an answer".to_string()).into()
            }));
        }

        self.synthesize(query, &pairs).await
    }

    async fn synthesize(&self, query: &str, pairs: &[(&SubQuestion, String)]) -> Result<String> {
        let findings = pairs
            .iter()
            .map(|(q, a)| {
                format!(
                    "Sub question ({}): {}\nResponse: {}",
                    q.tool_name, q.sub_question, a
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = vec![
            Turn::system(
                "Combine the findings below into a single answer to the user's question. \
                 Compare the documents where relevant and rely only on the findings.",
            ),
            Turn::user(format!("Findings:\n{}\n\nQuestion: {}", findings, query)),
        ];
        self.provider.complete_text(&prompt).await
    }
}

/// Parse a generated sub-question list
///
/// Accepts the array bare, wrapped in a Markdown code fence, or surrounded
/// by prose. Entries naming unknown documents are dropped and at most `max`
/// are kept. Returns `None` when nothing usable remains.
pub fn parse_sub_questions(
    reply: &str,
    tools: &[DocumentTool],
    max: usize,
) -> Option<Vec<SubQuestion>> {
    let start = reply.find('[')?;
    let end = reply.rfind(']')?;
    if end < start {
        return None;
    }

    let parsed: Vec<SubQuestion> = serde_json::from_str(&reply[start..=end]).ok()?;
    let questions: Vec<SubQuestion> = parsed
        .into_iter()
        .filter(|q| !q.sub_question.trim().is_empty())
        .filter(|q| tools.iter().any(|t| t.name == q.tool_name))
        .take(max)
        .collect();

    if questions.is_empty() {
        None
    } else {
        Some(questions)
    }
}
