//! Function-calling schema for the job search tool.

use serde_json::{json, Value};

use crate::search::facets::{Facet, FacetTables};

pub const SEARCH_TOOL_NAME: &str = "search_104_jobs";

/// OpenAI-style `{"type":"function", ...}` definition. Option lists are drawn
/// from the facet tables so the schema never offers a label we cannot map.
pub fn search_tool_definition(tables: &FacetTables) -> Value {
    let join = |labels: Vec<&str>| labels.join("、");
    let education = join(tables.get(Facet::Education).labels().collect());
    let sort_by = join(tables.get(Facet::SortBy).labels().collect());
    let categories = join(tables.prompt_job_category_options());

    json!({
        "type": "function",
        "function": {
            "name": SEARCH_TOOL_NAME,
            "description": "搜尋 104 人力銀行的工作機會。可以根據關鍵字、地區、職位類別、薪資範圍、學歷要求、發布時間等條件進行篩選。",
            "parameters": {
                "type": "object",
                "properties": {
                    "keyword": {
                        "type": "string",
                        "description": "搜尋關鍵字，例如：Python、前端工程師、數據分析師"
                    },
                    "area": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "工作地區，可以是多個。支援全台灣所有縣市，且台北市、新北市支援區級地區（如：台北市大安區、新北市板橋區）。例如：['台北市', '新北市']"
                    },
                    "job_category": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": format!("職位類別，可以是多個。可選擇的類別包括：{categories}")
                    },
                    "salary_range": {
                        "type": "string",
                        "description": "薪資範圍，格式：'最低-最高'（單位：元）。例如：'40000-60000' 表示 4 萬到 6 萬元。如果只有最低薪資，格式為：'40000-'；只有最高薪資，格式為：'-60000'"
                    },
                    "education": {
                        "type": "string",
                        "description": format!("學歷要求。選項：{education}")
                    },
                    "posted_within_days": {
                        "type": "integer",
                        "description": "發布天數內的工作。例如：7 表示過去 7 天內發布的工作"
                    },
                    "sort_by": {
                        "type": "string",
                        "description": format!("排序方式。選項：{sort_by}")
                    }
                },
                "required": []
            }
        }
    })
}
