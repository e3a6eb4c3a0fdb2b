//! Agent-facing tool surface
//!
//! The agent never chooses its inbox or date cutoff: both are bound from the
//! scenario it is working on. Caller mistakes (a bad keyword list) come back
//! as ordinary tool output so the agent can correct itself; only storage
//! faults are returned as `Err`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::query::{SearchQuery, MAX_SEARCH_RESULTS};
use crate::scenario::Scenario;
use crate::storage::{EmailReader, StorageError, StorageResult};
use crate::types::{EmailRecord, SearchResult};

/// Terminal answer of an agent episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalAnswer {
    pub answer: String,
    pub source_ids: Vec<String>,
}

/// A tool invocation as emitted by the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolCall {
    SearchInbox {
        keywords: Vec<String>,
    },
    ReadEmail {
        message_id: String,
    },
    ReturnFinalAnswer {
        answer: String,
        #[serde(default)]
        reference_message_ids: Vec<String>,
    },
}

/// Result of a dispatched [`ToolCall`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ToolOutput {
    SearchResults(Vec<SearchResult>),
    /// `None` when the id is unknown
    Email(Option<EmailRecord>),
    FinalAnswer(FinalAnswer),
    /// Caller error the agent should see and recover from
    Error(String),
}

impl ToolOutput {
    /// True when this output ends the agent's turn loop
    pub fn is_terminal(&self) -> bool {
        matches!(self, ToolOutput::FinalAnswer(_))
    }
}

/// Tools bound to one scenario
pub struct InboxTools {
    reader: Arc<dyn EmailReader>,
    scenario: Scenario,
}

impl InboxTools {
    pub fn new(reader: Arc<dyn EmailReader>, scenario: Scenario) -> Self {
        Self { reader, scenario }
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Keyword search over the scenario's inbox, restricted to mail sent
    /// before the scenario's query date.
    pub async fn search_inbox(&self, keywords: Vec<String>) -> StorageResult<Vec<SearchResult>> {
        let query = SearchQuery::new(&self.scenario.inbox_address, keywords)
            .sent_before(self.scenario.query_date)
            .max_results(MAX_SEARCH_RESULTS);
        self.reader.search(&query).await
    }

    pub async fn read_email(&self, message_id: &str) -> StorageResult<Option<EmailRecord>> {
        self.reader.read(message_id).await
    }

    pub fn return_final_answer(&self, answer: String, reference_message_ids: Vec<String>) -> FinalAnswer {
        FinalAnswer {
            answer,
            source_ids: reference_message_ids,
        }
    }

    /// Run one tool call.
    pub async fn dispatch(&self, call: ToolCall) -> StorageResult<ToolOutput> {
        debug!(scenario = %self.scenario.id, ?call, "Dispatching tool call");
        match call {
            ToolCall::SearchInbox { keywords } => match self.search_inbox(keywords).await {
                Ok(results) => Ok(ToolOutput::SearchResults(results)),
                Err(StorageError::InvalidQuery(err)) => Ok(ToolOutput::Error(err.to_string())),
                Err(err) => Err(err),
            },
            ToolCall::ReadEmail { message_id } => {
                Ok(ToolOutput::Email(self.read_email(&message_id).await?))
            }
            ToolCall::ReturnFinalAnswer {
                answer,
                reference_message_ids,
            } => Ok(ToolOutput::FinalAnswer(
                self.return_final_answer(answer, reference_message_ids),
            )),
        }
    }
}

/// JSON-schema descriptions of the three tools, for the agent prompt.
pub fn tool_definitions() -> Vec<Value> {
    vec![
        json!({
            "name": "search_inbox",
            "description": "Search the inbox for emails matching all of the given keywords. Returns up to 10 results with a message_id and a highlighted snippet, newest first.",
            "parameters": {
                "type": "object",
                "properties": {
                    "keywords": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Keywords that must all appear in the subject or body"
                    }
                },
                "required": ["keywords"]
            }
        }),
        json!({
            "name": "read_email",
            "description": "Read a specific email by message ID. Returns null when no such email exists.",
            "parameters": {
                "type": "object",
                "properties": {
                    "message_id": { "type": "string" }
                },
                "required": ["message_id"]
            }
        }),
        json!({
            "name": "return_final_answer",
            "description": "Return the final answer and the message IDs of the emails that were used to generate the answer.",
            "parameters": {
                "type": "object",
                "properties": {
                    "answer": { "type": "string" },
                    "reference_message_ids": {
                        "type": "array",
                        "items": { "type": "string" }
                    }
                },
                "required": ["answer", "reference_message_ids"]
            }
        }),
    ]
}
