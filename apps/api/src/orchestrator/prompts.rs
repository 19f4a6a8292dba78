// All LLM prompt constants for the conversation orchestrator.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::{ASSISTANT_PERSONA, JSON_ONLY_INSTRUCTION};
use crate::search::facets::{Facet, FacetTables};

/// Tool-calling turn 1 system prompt. Replace `{persona}` before sending.
const TOOL_CALLING_SYSTEM_TEMPLATE: &str = "{persona}當用戶描述他們想找的工作時，請使用 search_104_jobs 工具來搜尋，並將結果整理後回覆給用戶。";

/// Steering instruction appended before tool-calling turn 2.
pub const TOOL_RESULT_STEERING: &str = "\
以上是搜尋工具回傳的結果。請根據這些結果，用繁體中文為用戶整理出清楚的職缺推薦，\
列出職位、公司、地區、薪資與連結，並簡短說明推薦理由。\
如果沒有找到結果或搜尋失敗，請說明原因並建議用戶調整搜尋條件。不要再呼叫任何工具。";

/// Prompt-JSON turn 1 system prompt.
/// Replace: {area_options}, {job_category_options}, {education_options},
///          {sort_options}, {json_only}
const EXTRACT_PARAMS_TEMPLATE: &str = r#"你是一個專業的求職助手，負責分析用戶的工作搜尋需求。

根據用戶的需求，適當的填入 104 人力銀行搜尋工具所需的參數。

## 可用的搜尋參數，都是 Optional（可選擇提供或不提供）：

1. **keyword** (string): 搜尋關鍵字，例如：前端工程師

2. **area** (array of strings): 工作地區，可以是多個。
   有以下列表中的地區名稱：
   {area_options}
   - 例如：["台北市", "新北市永和區"]

3. **job_category** (array of strings): 職位類別，可以是多個。
   有下列表中的職位類別：
   {job_category_options}
   - 例如：["軟體／工程類人員"]

4. **salary_range** (string): 薪資範圍，格式：'最低-最高'（單位：元）
   - 例如：'40000-60000' 表示 4 萬到 6 萬元
   - 只有最低薪資：'40000-'
   - 只有最高薪資：'-60000'

5. **education** (string): 學歷要求
   有以下選項：{education_options}

6. **posted_within_days** (integer): 發布天數內的工作，例如：7 表示過去 7 天內發布

7. **sort_by** (string): 排序方式，預設幫用戶找比較新發布的工作。
   有以下選項：{sort_options}

## 回覆格式：

請以 JSON 格式回覆搜尋參數。如果用戶需要搜尋工作，請輸出：

{
  "need_search": true,
  "params": {
    "keyword": "關鍵字",
    "area": ["地區1", "地區2"],
    "salary_range": "最低-最高"
  }
}

如果用戶只是在問問題或聊天，不需要搜尋工作，請輸出：

{
  "need_search": false,
  "message": "你想要詢問的回覆內容"
}

## 重要提醒：

- {json_only}
- 職位善用 job_category 參數來篩選，keyword 用來找尋特定技能或公司名稱
"#;

/// Prompt-JSON turn 2 system prompt. Replace `{persona}` before sending.
const FINAL_RESPONSE_TEMPLATE: &str = r#"{persona}

你會收到用戶的原始需求，以及依照需求搜尋 104 人力銀行得到的職缺列表。請：

1. 挑出最符合用戶需求的職缺，說明每個職缺符合的地方（地區、薪資、技能等）
2. 保留每個職缺的連結，方便用戶直接點開查看
3. 如果搜尋結果不理想或為空，建議用戶可以如何調整條件（例如放寬地區或薪資）
4. 使用繁體中文，語氣友善、條理清楚，不要編造搜尋結果中沒有的資訊"#;

/// Detail analysis system prompt. Replace `{job_info}` before sending.
const JOB_DETAIL_ANALYSIS_TEMPLATE: &str = r#"你是一位資深的職涯顧問，擅長分析台灣就業市場的職缺。

以下是用戶想了解的職缺資訊：

{job_info}

請針對這個職缺產出一份分析報告，包含以下段落：

## 職位概述
職稱、公司、工作地點與主要職責的重點整理。

## 能力要求
必備與加分的技能、經歷與學歷，並評估門檻高低。

## 薪資與福利
薪資是否具競爭力、福利制度的亮點。如資訊不足請明確說明。

## 公司背景
公司產業、規模與可能的發展性。只根據已知資訊推論，不確定之處請標註。

## 優勢與風險
這個職缺吸引人的地方，以及應徵前需要留意或進一步確認的事項。

## 面試準備建議
可能的面試重點與準備方向。

請使用繁體中文，內容具體、避免空泛，不要捏造職缺資訊中沒有的事實。"#;

/// Detail analysis user turn.
pub const ANALYSIS_KICKOFF: &str = "請開始分析這個職缺。";

/// Context block placed in front of the query when page content was extracted.
/// Replace: {query}, {content}
const ANALYSIS_CONTEXT_TEMPLATE: &str = "用戶查詢：{query}

從職缺網頁提取的基本資訊：
{content}

請基於以上資訊進行更深入的分析。";

pub fn tool_calling_system() -> String {
    TOOL_CALLING_SYSTEM_TEMPLATE.replace("{persona}", ASSISTANT_PERSONA)
}

pub fn final_response_system() -> String {
    FINAL_RESPONSE_TEMPLATE.replace("{persona}", ASSISTANT_PERSONA)
}

/// Parameter-extraction prompt with option lists drawn from the facet tables.
pub fn extract_params_system(tables: &FacetTables) -> String {
    let labels = |facet: Facet| tables.get(facet).labels().collect::<Vec<_>>().join(", ");

    EXTRACT_PARAMS_TEMPLATE
        .replace("{area_options}", &tables.prompt_area_options().join(", "))
        .replace(
            "{job_category_options}",
            &tables.prompt_job_category_options().join(", "),
        )
        .replace("{education_options}", &labels(Facet::Education))
        .replace("{sort_options}", &labels(Facet::SortBy))
        .replace("{json_only}", JSON_ONLY_INSTRUCTION)
}

pub fn job_detail_analysis_system(job_info: &str) -> String {
    JOB_DETAIL_ANALYSIS_TEMPLATE.replace("{job_info}", job_info)
}

pub fn analysis_context(query: &str, content: &str) -> String {
    ANALYSIS_CONTEXT_TEMPLATE
        .replace("{query}", query)
        .replace("{content}", content)
}

pub fn final_response_user(message: &str, formatted_results: &str) -> String {
    format!("用戶需求：{message}\n\n搜尋結果：\n{formatted_results}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_params_prompt_lists_options() {
        let prompt = extract_params_system(&FacetTables::builtin());
        assert!(prompt.contains("台北市"));
        assert!(prompt.contains("新北市永和區"));
        assert!(prompt.contains("軟體／工程類人員"));
        assert!(prompt.contains("大學"));
        assert!(prompt.contains("必須輸出有效的 JSON 格式"));
        assert!(prompt.contains("\"need_search\": true"));
        assert!(!prompt.contains("{area_options}"));
    }

    #[test]
    fn test_analysis_prompt_embeds_job_info() {
        let prompt = job_detail_analysis_system("某科技公司的 Python 後端工程師");
        assert!(prompt.contains("某科技公司的 Python 後端工程師"));
        assert!(!prompt.contains("{job_info}"));
    }

    #[test]
    fn test_tool_calling_prompt_names_the_tool() {
        let prompt = tool_calling_system();
        assert!(prompt.starts_with(ASSISTANT_PERSONA));
        assert!(prompt.contains("search_104_jobs"));
    }
}
