//! Chat command dispatch: `{prefix}{name} {args}` → reply messages.
//!
//! This is the adapter a chat front end calls with a raw message and the
//! sender's roles. Every failure becomes a `CommandError`, rendered to the
//! user through `CommandError::user_message`.

pub mod handlers;

use tracing::{info, warn};

use crate::errors::CommandError;
use crate::orchestrator::handlers::with_deadline;
use crate::orchestrator::OrchestrationResult;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Search,
    SearchTools,
    Analyze,
    Ping,
    Help,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::Search,
        Command::SearchTools,
        Command::Analyze,
        Command::Ping,
        Command::Help,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Command::Search => "search",
            Command::SearchTools => "search_tools",
            Command::Analyze => "analyze",
            Command::Ping => "ping",
            Command::Help => "help",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }

    fn description(self) -> &'static str {
        match self {
            Command::Search => "用自然語言搜尋 104 職缺",
            Command::SearchTools => "同上，由模型直接呼叫搜尋工具",
            Command::Analyze => "分析職缺內容或 104 職缺連結",
            Command::Ping => "確認機器人是否在線",
            Command::Help => "顯示指令列表",
        }
    }

    /// Commands that reach the LLM or the job board.
    fn restricted(self) -> bool {
        matches!(
            self,
            Command::Search | Command::SearchTools | Command::Analyze
        )
    }

    fn takes_query(self) -> bool {
        self.restricted()
    }
}

/// A message split into command name and argument text.
#[derive(Debug, PartialEq, Eq)]
pub struct Invocation<'a> {
    pub name: &'a str,
    pub args: &'a str,
}

/// `None` when the message is not addressed to the bot.
pub fn parse_invocation<'a>(content: &'a str, prefix: &str) -> Option<Invocation<'a>> {
    let body = content.trim_start().strip_prefix(prefix)?;
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    let (name, args) = match body.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (body, ""),
    };
    Some(Invocation { name, args })
}

fn has_permission(allowed: &[String], roles: &[String]) -> bool {
    allowed.is_empty() || roles.iter().any(|r| allowed.iter().any(|a| a == r))
}

fn help_text(prefix: &str) -> String {
    let mut lines = vec!["可用指令：".to_string()];
    for command in Command::ALL {
        let usage = if command.takes_query() { " <內容>" } else { "" };
        lines.push(format!(
            "{prefix}{}{usage}：{}",
            command.name(),
            command.description()
        ));
    }
    lines.join("\n")
}

/// Runs one chat message. `Ok(None)` means the message was not a command.
pub async fn dispatch(
    state: &AppState,
    content: &str,
    roles: &[String],
) -> Result<Option<Vec<String>>, CommandError> {
    let config = &state.config;
    let Some(invocation) = parse_invocation(content, &config.command_prefix) else {
        return Ok(None);
    };

    let command = Command::parse(invocation.name)
        .ok_or_else(|| CommandError::NotFound(invocation.name.to_string()))?;

    if command.restricted() && !has_permission(&config.command_allowed_roles, roles) {
        warn!("Command '{}' refused: caller roles {:?}", command.name(), roles);
        return Err(CommandError::MissingPermission);
    }

    if command.takes_query() && invocation.args.is_empty() {
        return Err(CommandError::MissingArgument("query".to_string()));
    }

    info!("Dispatching command '{}'", command.name());
    let orchestrator = &state.orchestrator;
    let deadline = config.request_timeout_secs;
    let query = invocation.args;

    let result: OrchestrationResult = match command {
        Command::Ping => return Ok(Some(vec!["Pong!".to_string()])),
        Command::Help => return Ok(Some(vec![help_text(&config.command_prefix)])),
        Command::Search => with_deadline(deadline, orchestrator.search_with_prompt_json(query)).await?,
        Command::SearchTools => with_deadline(deadline, orchestrator.search_with_tools(query)).await?,
        Command::Analyze => with_deadline(deadline, orchestrator.analyze(query)).await?,
    };

    let replies = result.chunks(config.message_chunk_chars);
    if replies.is_empty() {
        return Err(CommandError::Other("模型沒有產生回覆".to_string()));
    }
    Ok(Some(replies))
}

/// `dispatch` with errors rendered as the reply.
pub async fn reply_to(state: &AppState, content: &str, roles: &[String]) -> Vec<String> {
    match dispatch(state, content, roles).await {
        Ok(Some(replies)) => replies,
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!("Command failed: {}", e);
            vec![e.user_message()]
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::state;
    use super::*;
    use crate::llm_client::ChatMessage;
    use crate::orchestrator::testing::{one_job_payload, RecordingBoard, ScriptedLlm};

    fn roles(names: &[&str]) -> Vec<String> {
        names.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_parse_invocation() {
        assert_eq!(
            parse_invocation("!search  台北 Python 工程師 ", "!"),
            Some(Invocation {
                name: "search",
                args: "台北 Python 工程師"
            })
        );
        assert_eq!(
            parse_invocation("!ping", "!"),
            Some(Invocation { name: "ping", args: "" })
        );
        assert_eq!(parse_invocation("hello", "!"), None);
        assert_eq!(parse_invocation("!", "!"), None);
    }

    #[tokio::test]
    async fn test_ping_and_help() {
        let app = state(ScriptedLlm::new(vec![]), RecordingBoard::failing(), &[]);
        assert_eq!(
            dispatch(&app, "!ping", &[]).await.unwrap(),
            Some(vec!["Pong!".to_string()])
        );
        let help = dispatch(&app, "!help", &[]).await.unwrap().unwrap();
        assert!(help[0].contains("!search <內容>"));
        assert!(help[0].contains("!analyze <內容>"));
    }

    #[tokio::test]
    async fn test_non_command_is_ignored() {
        let app = state(ScriptedLlm::new(vec![]), RecordingBoard::failing(), &[]);
        assert_eq!(dispatch(&app, "大家好", &[]).await.unwrap(), None);
        assert!(reply_to(&app, "大家好", &[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_error_kinds() {
        let app = state(ScriptedLlm::new(vec![]), RecordingBoard::failing(), &[]);
        assert!(matches!(
            dispatch(&app, "!dance", &[]).await,
            Err(CommandError::NotFound(name)) if name == "dance"
        ));
        assert_eq!(
            reply_to(&app, "!search   ", &[]).await,
            vec!["缺少必要參數：query".to_string()]
        );
    }

    #[tokio::test]
    async fn test_role_restriction() {
        let llm = ScriptedLlm::new(vec![ChatMessage::assistant(
            r#"{"need_search": false, "message": "嗨"}"#,
        )]);
        let app = state(llm, RecordingBoard::failing(), &["member"]);

        assert_eq!(
            reply_to(&app, "!search 工作", &roles(&["guest"])).await,
            vec!["你沒有權限執行此指令。".to_string()]
        );
        // open commands ignore the role list
        assert_eq!(
            reply_to(&app, "!ping", &[]).await,
            vec!["Pong!".to_string()]
        );
        assert_eq!(
            reply_to(&app, "!search 工作", &roles(&["guest", "member"])).await,
            vec!["嗨".to_string()]
        );
    }

    #[tokio::test]
    async fn test_search_command_runs_prompt_json() {
        let llm = ScriptedLlm::new(vec![
            ChatMessage::assistant(r#"{"need_search": true, "params": {"keyword": "Rust"}}"#),
            ChatMessage::assistant("找到一份 Rust 職缺"),
        ]);
        let board = RecordingBoard::returning(one_job_payload());
        let app = state(llm, board.clone(), &[]);

        let replies = reply_to(&app, "!search Rust 工作", &[]).await;

        assert_eq!(replies, vec!["找到一份 Rust 職缺".to_string()]);
        assert_eq!(board.queries()[0].keyword.as_deref(), Some("Rust"));
    }

    #[tokio::test]
    async fn test_llm_failure_renders_other() {
        let app = state(ScriptedLlm::new(vec![]), RecordingBoard::failing(), &[]);
        let replies = reply_to(&app, "!analyze 某公司工程師", &[]).await;
        assert_eq!(replies.len(), 1);
        assert!(replies[0].starts_with("執行指令時發生錯誤："));
    }
}
