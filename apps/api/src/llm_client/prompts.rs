// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.

/// Closing instruction for every prompt that expects a bare JSON object back.
pub const JSON_ONLY_INSTRUCTION: &str = "\
重要：必須輸出有效的 JSON 格式，不要有其他文字說明。";

/// Persona shared by every job-search conversation.
pub const ASSISTANT_PERSONA: &str =
    "你是一個專業的求職助手，幫助用戶在 104 人力銀行搜尋工作機會。";
