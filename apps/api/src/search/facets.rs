//! Facet code tables: human labels to 104 query codes.
//!
//! Built once at startup and shared read-only as `Arc<FacetTables>`.
//! Lookups never fail loudly: an unknown label simply yields `None` and the
//! resolver decides what to do with it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Raw tables
// ────────────────────────────────────────────────────────────────────────────

const AREAS: &[(&str, &str)] = &[
    ("台北市", "6001001000"),
    ("新北市", "6001002000"),
    ("宜蘭縣", "6001003000"),
    ("基隆市", "6001004000"),
    ("桃園市", "6001005000"),
    ("新竹縣市", "6001006000"),
    ("苗栗縣", "6001007000"),
    ("台中市", "6001008000"),
    ("彰化縣", "6001010000"),
    ("南投縣", "6001011000"),
    ("雲林縣", "6001012000"),
    ("嘉義縣市", "6001013000"),
    ("台南市", "6001014000"),
    ("高雄市", "6001016000"),
    ("屏東縣", "6001018000"),
    ("台東縣", "6001019000"),
    ("花蓮縣", "6001020000"),
    ("澎湖縣", "6001021000"),
    ("金門縣", "6001022000"),
    ("連江縣", "6001023000"),
    ("台北市中正區", "6001001001"),
    ("台北市大同區", "6001001002"),
    ("台北市中山區", "6001001003"),
    ("台北市松山區", "6001001004"),
    ("台北市大安區", "6001001005"),
    ("台北市萬華區", "6001001006"),
    ("台北市信義區", "6001001007"),
    ("台北市士林區", "6001001008"),
    ("台北市北投區", "6001001009"),
    ("台北市內湖區", "6001001010"),
    ("台北市南港區", "6001001011"),
    ("台北市文山區", "6001001012"),
    ("新北市萬里區", "6001002001"),
    ("新北市金山區", "6001002002"),
    ("新北市板橋區", "6001002003"),
    ("新北市汐止區", "6001002004"),
    ("新北市深坑區", "6001002005"),
    ("新北市石碇區", "6001002006"),
    ("新北市瑞芳區", "6001002007"),
    ("新北市平溪區", "6001002008"),
    ("新北市雙溪區", "6001002009"),
    ("新北市貢寮區", "6001002010"),
    ("新北市新店區", "6001002011"),
    ("新北市坪林區", "6001002012"),
    ("新北市烏來區", "6001002013"),
    ("新北市永和區", "6001002014"),
    ("新北市中和區", "6001002015"),
    ("新北市土城區", "6001002016"),
    ("新北市三峽區", "6001002017"),
    ("新北市樹林區", "6001002018"),
    ("新北市鶯歌區", "6001002019"),
    ("新北市三重區", "6001002020"),
    ("新北市新莊區", "6001002021"),
    ("新北市泰山區", "6001002022"),
    ("新北市林口區", "6001002023"),
    ("新北市蘆洲區", "6001002024"),
    ("新北市五股區", "6001002025"),
    ("新北市八里區", "6001002026"),
    ("新北市淡水區", "6001002027"),
    ("新北市三芝區", "6001002028"),
    ("新北市石門區", "6001002029"),
];

const JOB_CATEGORIES: &[(&str, &str)] = &[
    ("經營／人資類", "2001000000"),
    ("經營／幕僚類人員", "2001001000"),
    ("人力資源類人員", "2001002000"),
    ("行政／總務／法務類", "2002000000"),
    ("行政／總務類人員", "2002001000"),
    ("法務／智財類人員", "2002002000"),
    ("財會／金融專業類", "2003000000"),
    ("財務／會計／稅務類", "2003001000"),
    ("金融專業相關類人員", "2003002000"),
    ("行銷／企劃／專案管理類", "2004000000"),
    ("行銷類人員", "2004001000"),
    ("產品企劃類人員", "2004002000"),
    ("專案／產品管理類人員", "2004003000"),
    ("客服／門市／業務／貿易類", "2005000000"),
    ("客戶服務類人員", "2005001000"),
    ("門市營業類人員", "2005002000"),
    ("業務銷售類人員", "2005003000"),
    ("貿易類人員", "2005004000"),
    ("餐飲／旅遊／美容美髮類", "2006000000"),
    ("餐飲類人員", "2006001000"),
    ("旅遊休閒類人員", "2006002000"),
    ("美容／美髮類人員", "2006003000"),
    ("資訊軟體系統類", "2007000000"),
    ("軟體／工程類人員", "2007001000"),
    ("MIS／網管類人員", "2007002000"),
    ("操作／技術／維修類", "2008000000"),
    ("操作／技術類人員", "2008001000"),
    ("維修／技術服務類人員", "2008002000"),
    ("資材／物流／運輸類", "2009000000"),
    ("採購／資材／倉管類人員", "2009001000"),
    ("運輸物流類人員", "2009002000"),
    ("營建／製圖類", "2010000000"),
    ("營建規劃類人員", "2010001000"),
    ("營建施作類人員", "2010002000"),
    ("製圖／測量類人員", "2010003000"),
    ("傳播藝術／設計類", "2011000000"),
    ("藝術類人員", "2011001000"),
    ("設計類人員", "2011002000"),
    ("傳播媒體類人員", "2011003000"),
    ("研發相關類", "2013000000"),
    ("電子／電機類工程師", "2013001000"),
    ("化工／材料類工程師", "2013002000"),
    ("機械類工程師", "2013003000"),
    ("醫療／保健服務類", "2014000000"),
    ("醫療專業類人員", "2014001000"),
    ("醫療／保健服務人員", "2014002000"),
    ("教育／學術類", "2015000000"),
    ("學術研究類人員", "2015001000"),
    ("教育輔導類人員", "2015002000"),
];

const EDUCATION: &[(&str, &str)] = &[
    ("高中職以下", "1"),
    ("高中職", "2"),
    ("專科", "3"),
    ("大學", "4"),
    ("碩士", "5"),
    ("博士", "6"),
];

const SORT_BY: &[(&str, &str)] = &[
    ("符合度", "15"),
    ("日期", "16"),
    ("經歷", "17"),
    ("學歷", "18"),
    ("應徵人數", "7"),
    ("待遇", "13"),
];

/// Additive bitmask: the selected codes are summed into one `s9` value.
const WORK_PERIODS: &[(&str, &str)] = &[
    ("日班", "1"),
    ("夜班", "2"),
    ("大夜班", "4"),
    ("假日班", "8"),
];

const ROTATION: &[(&str, &str)] = &[("不需輪班", "1"), ("需輪班", "2")];

const EXPERIENCE: &[(&str, &str)] = &[
    ("1年以下", "1"),
    ("1-3年", "3"),
    ("3-5年", "5"),
    ("5-10年", "10"),
    ("10年以上", "99"),
];

const COMPANY_TYPES: &[(&str, &str)] = &[
    ("上市上櫃", "16"),
    ("外商一般", "5"),
    ("外商資訊", "4"),
];

const WELFARE: &[(&str, &str)] = &[
    ("年終獎金", "10"),
    ("三節獎金", "11"),
    ("員工旅遊", "20"),
    ("分紅配股", "30"),
    ("彈性上下班", "40"),
    ("員工餐廳", "50"),
];

// ────────────────────────────────────────────────────────────────────────────
// Facet names
// ────────────────────────────────────────────────────────────────────────────

/// One filterable search dimension. The snake_case name doubles as the key
/// an LLM uses in its loose parameter dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Area,
    JobCategory,
    Education,
    SortBy,
    WorkPeriod,
    Rotation,
    Experience,
    CompanyType,
    Welfare,
}

impl Facet {
    pub fn key(self) -> &'static str {
        match self {
            Facet::Area => "area",
            Facet::JobCategory => "job_category",
            Facet::Education => "education",
            Facet::SortBy => "sort_by",
            Facet::WorkPeriod => "work_period",
            Facet::Rotation => "rotation",
            Facet::Experience => "experience",
            Facet::CompanyType => "company_type",
            Facet::Welfare => "welfare",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FacetMap
// ────────────────────────────────────────────────────────────────────────────

/// Bidirectional label ⇄ code map for one facet.
#[derive(Debug, Clone)]
pub struct FacetMap {
    entries: &'static [(&'static str, &'static str)],
    by_label: HashMap<&'static str, &'static str>,
    by_code: HashMap<&'static str, &'static str>,
}

impl FacetMap {
    fn from_entries(entries: &'static [(&'static str, &'static str)]) -> Self {
        let mut by_label = HashMap::with_capacity(entries.len());
        let mut by_code = HashMap::with_capacity(entries.len());
        for &(label, code) in entries {
            by_label.insert(label, code);
            // first label wins when two labels share a code
            by_code.entry(code).or_insert(label);
        }
        Self {
            entries,
            by_label,
            by_code,
        }
    }

    pub fn code(&self, label: &str) -> Option<&'static str> {
        self.by_label.get(label.trim()).copied()
    }

    pub fn label(&self, code: &str) -> Option<&'static str> {
        self.by_code.get(code.trim()).copied()
    }

    /// Labels in table order.
    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(label, _)| *label)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FacetTables
// ────────────────────────────────────────────────────────────────────────────

/// Every facet table the resolver, formatter, and prompts need.
#[derive(Debug, Clone)]
pub struct FacetTables {
    area: FacetMap,
    job_category: FacetMap,
    education: FacetMap,
    sort_by: FacetMap,
    work_period: FacetMap,
    rotation: FacetMap,
    experience: FacetMap,
    company_type: FacetMap,
    welfare: FacetMap,
}

impl FacetTables {
    pub fn builtin() -> Self {
        Self {
            area: FacetMap::from_entries(AREAS),
            job_category: FacetMap::from_entries(JOB_CATEGORIES),
            education: FacetMap::from_entries(EDUCATION),
            sort_by: FacetMap::from_entries(SORT_BY),
            work_period: FacetMap::from_entries(WORK_PERIODS),
            rotation: FacetMap::from_entries(ROTATION),
            experience: FacetMap::from_entries(EXPERIENCE),
            company_type: FacetMap::from_entries(COMPANY_TYPES),
            welfare: FacetMap::from_entries(WELFARE),
        }
    }

    pub fn get(&self, facet: Facet) -> &FacetMap {
        match facet {
            Facet::Area => &self.area,
            Facet::JobCategory => &self.job_category,
            Facet::Education => &self.education,
            Facet::SortBy => &self.sort_by,
            Facet::WorkPeriod => &self.work_period,
            Facet::Rotation => &self.rotation,
            Facet::Experience => &self.experience,
            Facet::CompanyType => &self.company_type,
            Facet::Welfare => &self.welfare,
        }
    }

    /// Area labels offered to the LLM: every county plus the districts of
    /// 台北市 and 新北市.
    pub fn prompt_area_options(&self) -> Vec<&'static str> {
        self.area
            .labels()
            .filter(|label| {
                !label.contains('區') || label.starts_with("台北市") || label.starts_with("新北市")
            })
            .collect()
    }

    /// Job categories offered to the LLM: concrete roles only, not the
    /// top-level groups whose code ends in six zeros.
    pub fn prompt_job_category_options(&self) -> Vec<&'static str> {
        self.job_category
            .entries()
            .filter(|(_, code)| !code.ends_with("000000"))
            .map(|(label, _)| label)
            .collect()
    }
}

impl Default for FacetTables {
    fn default() -> Self {
        Self::builtin()
    }
}
