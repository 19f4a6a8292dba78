//! Tool-calling protocol: the model decides whether to call `search_104_jobs`.
//!
//! Turn 1 carries the tool schema. Without a tool call, its text is the
//! answer. Otherwise every call is executed, its output appended as a tool
//! turn, and turn 2 runs without tools under a steering instruction.

use tracing::{info, warn};

use crate::llm_client::{ChatMessage, LlmError, ToolCall};
use crate::orchestrator::prompts::{tool_calling_system, TOOL_RESULT_STEERING};
use crate::orchestrator::{OrchestrationResult, Orchestrator, Protocol};
use crate::search::tool::{search_tool_definition, SEARCH_TOOL_NAME};

impl Orchestrator {
    pub async fn search_with_tools(&self, text: &str) -> Result<OrchestrationResult, LlmError> {
        let mut result = OrchestrationResult::new(Protocol::ToolCalling, text);
        let tools = [search_tool_definition(&self.tables)];
        let mut messages = vec![
            ChatMessage::system(tool_calling_system()),
            ChatMessage::user(text),
        ];

        let first = self
            .chat_turn("Tool selection", &messages, &tools, &mut result)
            .await?;

        if first.tool_calls.is_empty() {
            info!("Model answered without calling a tool");
            let answer = first.text().ok_or(LlmError::EmptyContent)?.to_string();
            return Ok(result.finish(answer));
        }

        info!("Executing {} tool call(s)", first.tool_calls.len());
        let calls = first.tool_calls.clone();
        messages.push(first);

        let mut outputs = Vec::with_capacity(calls.len());
        for call in &calls {
            let output = self.execute_tool_call(call, &mut result).await;
            messages.push(ChatMessage::tool_result(&call.id, output.clone()));
            outputs.push(output);
        }
        messages.push(ChatMessage::system(TOOL_RESULT_STEERING));

        let second = self
            .chat_turn("Final response", &messages, &[], &mut result)
            .await?;

        let answer = match second.text() {
            Some(text) => text.to_string(),
            None => {
                warn!("Final turn returned no text; showing tool output directly");
                outputs.join("\n\n")
            }
        };
        Ok(result.finish(answer))
    }

    /// Runs one tool call. Every failure becomes text for the model to read.
    async fn execute_tool_call(&self, call: &ToolCall, result: &mut OrchestrationResult) -> String {
        if call.function.name != SEARCH_TOOL_NAME {
            warn!("Model called unknown tool '{}'", call.function.name);
            return format!("未知的工具：{}", call.function.name);
        }

        let arguments = call.function.parsed_arguments();
        info!("search_104_jobs arguments: {}", call.function.arguments);

        match self.run_search(&arguments, result).await {
            Ok(formatted) => formatted,
            Err(e) => {
                warn!("Search tool failed: {}", e);
                format!("搜尋時發生錯誤：{e}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::extraction::testing::CannedFetcher;
    use crate::llm_client::{ChatMessage, Role};
    use crate::orchestrator::testing::{
        one_job_payload, orchestrator, tool_call, RecordingBoard, ScriptedLlm,
    };

    #[tokio::test]
    async fn test_plain_answer_skips_search() {
        let llm = ScriptedLlm::new(vec![ChatMessage::assistant("你好！想找什麼工作呢？")]);
        let board = RecordingBoard::returning(one_job_payload());
        let orch = orchestrator(llm.clone(), board.clone(), CannedFetcher::failing());

        let result = orch.search_with_tools("嗨").await.unwrap();

        assert_eq!(result.final_text, "你好！想找什麼工作呢？");
        assert!(!result.external_call);
        assert!(board.queries().is_empty());
        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].tool_count, 1);
    }

    #[tokio::test]
    async fn test_tool_call_runs_search_and_second_turn() {
        let llm = ScriptedLlm::new(vec![
            tool_call(
                "call_1",
                "search_104_jobs",
                r#"{"keyword":"Python","area":["台北市"],"salary_range":"50000-"}"#,
            ),
            ChatMessage::assistant("推薦你這份 Python 後端工程師職缺。"),
        ]);
        let board = RecordingBoard::returning(one_job_payload());
        let orch = orchestrator(llm.clone(), board.clone(), CannedFetcher::failing());

        let result = orch.search_with_tools("台北 Python 5 萬以上").await.unwrap();

        assert_eq!(result.final_text, "推薦你這份 Python 後端工程師職缺。");
        assert!(result.external_call);
        assert_eq!(result.token_usage.total, 240);

        let queries = board.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].areas, vec!["6001001000"]);
        assert_eq!(queries[0].salary_min, Some(50000));

        let second = &llm.requests()[1];
        assert_eq!(second.tool_count, 0);
        let tool_turn = second
            .messages
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        assert_eq!(tool_turn.tool_call_id.as_deref(), Some("call_1"));
        assert!(tool_turn.content.as_deref().unwrap().contains("Python 後端工程師"));
        assert_eq!(second.messages.last().unwrap().role, Role::System);
    }

    #[tokio::test]
    async fn test_unknown_tool_and_bad_arguments() {
        let mut reply = tool_call("call_1", "book_flight", "{}");
        reply.tool_calls.extend(tool_call("call_2", "search_104_jobs", "{not json").tool_calls);
        let llm = ScriptedLlm::new(vec![reply, ChatMessage::assistant("完成")]);
        let board = RecordingBoard::returning(one_job_payload());
        let orch = orchestrator(llm.clone(), board.clone(), CannedFetcher::failing());

        let result = orch.search_with_tools("找工作").await.unwrap();

        assert_eq!(result.final_text, "完成");
        // malformed arguments search with no filters
        assert_eq!(board.queries().len(), 1);
        assert!(board.queries()[0].is_unfiltered());

        let tool_turns: Vec<String> = llm.requests()[1]
            .messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .filter_map(|m| m.content.clone())
            .collect();
        assert_eq!(tool_turns[0], "未知的工具：book_flight");
    }

    #[tokio::test]
    async fn test_failed_search_becomes_tool_text() {
        let llm = ScriptedLlm::new(vec![
            tool_call("call_1", "search_104_jobs", r#"{"keyword":"Go"}"#),
            ChatMessage::assistant(""),
        ]);
        let orch = orchestrator(llm.clone(), RecordingBoard::failing(), CannedFetcher::failing());

        let result = orch.search_with_tools("Go 工作").await.unwrap();

        // empty final turn falls back to the tool output
        assert_eq!(result.final_text, "搜尋時發生錯誤：搜尋失敗：系統維護中");
        assert!(result.search_results.is_empty());
    }
}
