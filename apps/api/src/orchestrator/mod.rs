//! Conversation orchestrator: drives the LLM turns, runs the search tool or
//! the content extractor in between, and assembles the final answer.
//!
//! Three flows share one `Orchestrator`:
//! - `search_with_tools`: native function calling (tool_calling.rs)
//! - `search_with_prompt_json`: JSON intent classification (prompt_json.rs)
//! - `analyze`: job-detail report with optional page context (analysis.rs)
//!
//! Every step inside a request is sequential. Search, resolution, and
//! extraction failures degrade the answer; only LLM transport failures
//! surface as errors.

pub mod analysis;
pub mod handlers;
pub mod prompt_json;
pub mod prompts;
pub mod tool_calling;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use crate::extraction::{ContentExtractor, ExtractedContent};
use crate::llm_client::{ChatMessage, LlmBackend, LlmError, TokenUsage};
use crate::search::client::{JobBoard, SearchError};
use crate::search::facets::FacetTables;
use crate::search::format::format_payload;
use crate::search::models::{SearchPayload, SearchQuery};
use crate::search::resolver::{resolve, DroppedFacet, Resolution};

pub const DEFAULT_MAX_RESULTS: usize = 5;

// ────────────────────────────────────────────────────────────────────────────
// OrchestrationResult
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    ToolCalling,
    PromptJson,
    Analysis,
}

/// Per-request record, built up turn by turn and returned once.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationResult {
    pub request_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub protocol: Protocol,
    pub user_input: String,
    /// Loose parameter maps exactly as the LLM produced them.
    pub raw_params: Vec<Map<String, Value>>,
    pub queries: Vec<SearchQuery>,
    pub dropped: Vec<DroppedFacet>,
    pub search_results: Vec<SearchPayload>,
    pub extracted_url: Option<String>,
    pub extracted_content: Option<ExtractedContent>,
    pub final_text: String,
    /// True once a search or page fetch was actually attempted.
    pub external_call: bool,
    pub token_usage: TokenUsage,
    pub elapsed_ms: u64,
    #[serde(skip)]
    started: Instant,
}

impl OrchestrationResult {
    fn new(protocol: Protocol, user_input: &str) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            started_at: Utc::now(),
            protocol,
            user_input: user_input.to_string(),
            raw_params: Vec::new(),
            queries: Vec::new(),
            dropped: Vec::new(),
            search_results: Vec::new(),
            extracted_url: None,
            extracted_content: None,
            final_text: String::new(),
            external_call: false,
            token_usage: TokenUsage::default(),
            elapsed_ms: 0,
            started: Instant::now(),
        }
    }

    fn record_turn(&mut self, turn: &str, usage: TokenUsage, elapsed: Duration) {
        info!(
            request_id = %self.request_id,
            "{} took {}ms, tokens: {} (prompt: {}, completion: {})",
            turn,
            elapsed.as_millis(),
            usage.total,
            usage.prompt,
            usage.completion
        );
        self.token_usage.add(usage);
    }

    fn finish(mut self, final_text: String) -> Self {
        self.final_text = final_text;
        self.elapsed_ms = self.started.elapsed().as_millis() as u64;
        info!(
            request_id = %self.request_id,
            "{:?} request finished in {}ms ({} chars, {} tokens)",
            self.protocol,
            self.elapsed_ms,
            self.final_text.chars().count(),
            self.token_usage.total
        );
        self
    }

    /// The final text split into messages of at most `limit` characters.
    pub fn chunks(&self, limit: usize) -> Vec<String> {
        chunk_message(&self.final_text, limit)
    }
}

/// Splits `text` into pieces of at most `limit` chars, breaking after the last
/// newline inside each window when there is one. Concatenating the pieces
/// gives back `text` exactly.
pub fn chunk_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.chars().count() > limit {
        let window_end = rest
            .char_indices()
            .nth(limit)
            .map_or(rest.len(), |(i, _)| i);
        let split = match rest[..window_end].rfind('\n') {
            Some(i) if i > 0 => i + 1,
            _ => window_end,
        };
        chunks.push(rest[..split].to_string());
        rest = &rest[split..];
    }

    if !rest.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

pub struct Orchestrator {
    llm: Arc<dyn LlmBackend>,
    board: Arc<dyn JobBoard>,
    extractor: Arc<ContentExtractor>,
    tables: Arc<FacetTables>,
    max_results: usize,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LlmBackend>,
        board: Arc<dyn JobBoard>,
        extractor: Arc<ContentExtractor>,
        tables: Arc<FacetTables>,
        max_results: usize,
    ) -> Self {
        Self {
            llm,
            board,
            extractor,
            tables,
            max_results: max_results.max(1),
        }
    }

    /// One LLM round trip, timed and added to the request's token usage.
    async fn chat_turn(
        &self,
        turn: &str,
        messages: &[ChatMessage],
        tools: &[Value],
        result: &mut OrchestrationResult,
    ) -> Result<ChatMessage, LlmError> {
        let started = Instant::now();
        let completion = self.llm.chat(messages, tools).await?;
        result.record_turn(turn, completion.usage, started.elapsed());
        Ok(completion.message)
    }

    /// Resolve → search → format. Resolution never fails; the search call can.
    async fn run_search(
        &self,
        params: &Map<String, Value>,
        result: &mut OrchestrationResult,
    ) -> Result<String, SearchError> {
        let Resolution { query, dropped } = resolve(params, &self.tables);
        result.raw_params.push(params.clone());
        result.queries.push(query.clone());
        result.dropped.extend(dropped);
        result.external_call = true;

        let started = Instant::now();
        let payload = self.board.search(&query, 1).await?;
        info!(
            request_id = %result.request_id,
            "Search call took {}ms",
            started.elapsed().as_millis()
        );

        let formatted = format_payload(&payload, &self.tables, self.max_results);
        result.search_results.push(payload);
        Ok(formatted)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_is_single_chunk() {
        assert_eq!(chunk_message("報告", 2000), vec!["報告".to_string()]);
        assert!(chunk_message("", 2000).is_empty());
    }

    #[test]
    fn test_chunks_prefer_newline_and_never_truncate() {
        let text = format!("{}\n{}\n{}", "甲".repeat(8), "乙".repeat(8), "丙".repeat(4));
        let chunks = chunk_message(&text, 12);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], format!("{}\n", "甲".repeat(8)));
        assert_eq!(chunks[1], format!("{}\n", "乙".repeat(8)));
        assert_eq!(chunks[2], "丙".repeat(4));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_chunks_split_long_line_on_char_boundary() {
        let text = "字".repeat(4500);
        let chunks = chunk_message(&text, 2000);
        let sizes: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(sizes, vec![2000, 2000, 500]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_result_chunks_use_final_text() {
        let result = OrchestrationResult::new(Protocol::Analysis, "q").finish("a\nb".to_string());
        assert_eq!(result.chunks(1), vec!["a", "\n", "b"]);
    }
}
