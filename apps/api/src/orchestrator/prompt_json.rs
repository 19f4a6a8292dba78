//! Prompt-JSON protocol for models without native tool calling.
//!
//! Turn 1 asks for `{"need_search": bool, "params"|"message": ...}`. Output
//! that cannot be read as JSON is returned verbatim; a failed search is
//! rendered as an error sentence. Neither aborts the request.

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::llm_client::{extract_json_object, ChatMessage, LlmError};
use crate::orchestrator::prompts::{
    extract_params_system, final_response_system, final_response_user,
};
use crate::orchestrator::{OrchestrationResult, Orchestrator, Protocol};

impl Orchestrator {
    pub async fn search_with_prompt_json(
        &self,
        text: &str,
    ) -> Result<OrchestrationResult, LlmError> {
        let mut result = OrchestrationResult::new(Protocol::PromptJson, text);
        let messages = [
            ChatMessage::system(extract_params_system(&self.tables)),
            ChatMessage::user(text),
        ];

        let reply = self
            .chat_turn("Parameter extraction", &messages, &[], &mut result)
            .await?;
        let reply_text = reply.content.unwrap_or_default();

        let Some(decision) = extract_json_object(&reply_text) else {
            warn!("Model reply is not JSON; returning it as the answer");
            return Ok(result.finish(reply_text));
        };

        let need_search = decision
            .get("need_search")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if !need_search {
            let message = decision
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(reply_text);
            return Ok(result.finish(message));
        }

        let params = match decision.get("params") {
            Some(Value::Object(params)) => params.clone(),
            _ => Map::new(),
        };
        let shown = Value::Object(params.clone());
        info!("Extracted search params: {}", shown);

        let formatted = match self.run_search(&params, &mut result).await {
            Ok(formatted) => formatted,
            Err(e) => {
                warn!("Search failed: {}", e);
                return Ok(result.finish(format!("搜尋時發生錯誤：{e}")));
            }
        };

        let final_messages = [
            ChatMessage::system(final_response_system()),
            ChatMessage::user(final_response_user(text, &formatted)),
        ];
        let final_reply = self
            .chat_turn("Final response", &final_messages, &[], &mut result)
            .await?;

        let answer = match final_reply.text() {
            Some(text) => text.to_string(),
            None => {
                warn!("Final turn returned no text; showing formatted results");
                formatted
            }
        };
        Ok(result.finish(answer))
    }
}

#[cfg(test)]
mod tests {
    use crate::extraction::testing::CannedFetcher;
    use crate::llm_client::ChatMessage;
    use crate::orchestrator::testing::{one_job_payload, orchestrator, RecordingBoard, ScriptedLlm};

    #[tokio::test]
    async fn test_end_to_end_taipei_python_search() {
        let llm = ScriptedLlm::new(vec![
            ChatMessage::assistant(
                "```json\n{\"need_search\": true, \"params\": {\"keyword\": \"Python 工程師\", \"area\": [\"台北市\"], \"salary_range\": \"50000-\"}}\n```",
            ),
            ChatMessage::assistant("為你找到 1 筆符合的職缺。"),
        ]);
        let board = RecordingBoard::returning(one_job_payload());
        let orch = orchestrator(llm.clone(), board.clone(), CannedFetcher::failing());

        let result = orch
            .search_with_prompt_json("我想找台北市的 Python 工程師工作，薪水至少 5 萬")
            .await
            .unwrap();

        let queries = board.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].areas, vec!["6001001000"]);
        assert_eq!(queries[0].keyword.as_deref(), Some("Python 工程師"));
        assert_eq!(queries[0].salary_min, Some(50000));
        assert_eq!(queries[0].salary_max, None);

        // the second turn sees exactly one formatted result block
        let requests = llm.requests();
        assert_eq!(requests.len(), 2);
        let final_user = requests[1].messages[1].content.clone().unwrap();
        assert!(final_user.starts_with("用戶需求：我想找台北市的 Python 工程師工作，薪水至少 5 萬"));
        assert_eq!(final_user.matches("找到 1 筆工作").count(), 1);
        assert!(final_user.contains("1. Python 後端工程師"));

        assert_eq!(result.final_text, "為你找到 1 筆符合的職缺。");
        assert!(result.external_call);
        assert!(result.dropped.is_empty());
        assert_eq!(result.search_results.len(), 1);
    }

    #[tokio::test]
    async fn test_decision_followed_by_braced_prose_still_searches() {
        let llm = ScriptedLlm::new(vec![
            ChatMessage::assistant(
                "參數：{\"need_search\": true, \"params\": {\"keyword\": \"Rust\"}}（格式 {key: value}）",
            ),
            ChatMessage::assistant("找到了"),
        ]);
        let board = RecordingBoard::returning(one_job_payload());
        let orch = orchestrator(llm, board.clone(), CannedFetcher::failing());

        let result = orch.search_with_prompt_json("Rust 工作").await.unwrap();

        assert_eq!(board.queries().len(), 1);
        assert_eq!(board.queries()[0].keyword.as_deref(), Some("Rust"));
        assert_eq!(result.final_text, "找到了");
    }

    #[tokio::test]
    async fn test_no_search_returns_message() {
        let llm = ScriptedLlm::new(vec![ChatMessage::assistant(
            r#"{"need_search": false, "message": "面試時可以準備作品集。"}"#,
        )]);
        let board = RecordingBoard::returning(one_job_payload());
        let orch = orchestrator(llm.clone(), board.clone(), CannedFetcher::failing());

        let result = orch.search_with_prompt_json("面試要準備什麼？").await.unwrap();

        assert_eq!(result.final_text, "面試時可以準備作品集。");
        assert!(!result.external_call);
        assert!(board.queries().is_empty());
        assert_eq!(llm.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_no_search_without_message_returns_raw_text() {
        let raw = r#"{"need_search": false}"#;
        let llm = ScriptedLlm::new(vec![ChatMessage::assistant(raw)]);
        let orch = orchestrator(
            llm,
            RecordingBoard::returning(one_job_payload()),
            CannedFetcher::failing(),
        );

        let result = orch.search_with_prompt_json("謝謝").await.unwrap();
        assert_eq!(result.final_text, raw);
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_returned_verbatim() {
        let llm = ScriptedLlm::new(vec![ChatMessage::assistant("抱歉，我不太懂你的意思。")]);
        let board = RecordingBoard::returning(one_job_payload());
        let orch = orchestrator(llm, board.clone(), CannedFetcher::failing());

        let result = orch.search_with_prompt_json("？？").await.unwrap();

        assert_eq!(result.final_text, "抱歉，我不太懂你的意思。");
        assert!(board.queries().is_empty());
    }

    #[tokio::test]
    async fn test_search_failure_is_user_facing_text() {
        let llm = ScriptedLlm::new(vec![ChatMessage::assistant(
            r#"{"need_search": true, "params": {"keyword": "Rust"}}"#,
        )]);
        let orch = orchestrator(llm.clone(), RecordingBoard::failing(), CannedFetcher::failing());

        let result = orch.search_with_prompt_json("Rust 工作").await.unwrap();

        assert_eq!(result.final_text, "搜尋時發生錯誤：搜尋失敗：系統維護中");
        assert!(result.external_call);
        assert_eq!(llm.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_unmapped_facet_is_dropped_not_fatal() {
        let llm = ScriptedLlm::new(vec![
            ChatMessage::assistant(
                r#"{"need_search": true, "params": {"area": ["火星市", "台北市"], "education": "大學"}}"#,
            ),
            ChatMessage::assistant("好的"),
        ]);
        let board = RecordingBoard::returning(one_job_payload());
        let orch = orchestrator(llm, board.clone(), CannedFetcher::failing());

        let result = orch.search_with_prompt_json("火星或台北").await.unwrap();

        assert_eq!(board.queries()[0].areas, vec!["6001001000"]);
        assert_eq!(board.queries()[0].education.as_deref(), Some("4"));
        assert_eq!(result.dropped.len(), 1);
        assert_eq!(result.dropped[0].value, "火星市");
    }
}
