// ==========================================
// 钢铁资产级排放核算引擎 - 报告主体与归属规则
// ==========================================
// 职责: 主体匹配规则、股权转让事件、股东解析结果
// 红线: 匹配规则是数据,不写死在代码里
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// CanonicalEntity - 报告主体
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub name: String,
    /// 股东文本匹配规则（正则,大小写不敏感,任一命中即归属）
    pub owner_patterns: Vec<String>,
    /// 装置/厂名兜底规则（股东规则无结果时使用）
    pub name_fallback_patterns: Vec<String>,
    /// 名称归一化时剥离的前缀（如 "posco", "nippon steel"）
    pub name_prefixes: Vec<String>,
}

impl CanonicalEntity {
    pub fn new(name: &str, owner_pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            owner_patterns: vec![owner_pattern.to_string()],
            name_fallback_patterns: Vec::new(),
            name_prefixes: Vec::new(),
        }
    }

    pub fn with_name_fallback(mut self, pattern: &str) -> Self {
        self.name_fallback_patterns.push(pattern.to_string());
        self
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.name_prefixes.push(prefix.to_lowercase());
        self
    }
}

// ==========================================
// OwnershipTransferEvent - 股权转让
// ==========================================
// 生效年份之前: 受让方排除目标装置,目标装置回归转让方自身规则/兜底
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipTransferEvent {
    pub acquirer: String,
    pub target: String,
    /// 装置/厂名匹配规则
    pub unit_pattern: String,
    pub effective_year: i32,
}

// ==========================================
// 股比
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "fraction", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Equity {
    Known(f64), // [0, 1]
    Unknown,
}

impl Equity {
    pub fn fraction(&self) -> Option<f64> {
        match self {
            Equity::Known(f) => Some(*f),
            Equity::Unknown => None,
        }
    }
}

// ==========================================
// OwnerShare - 股东解析结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerShare {
    pub owner_name: String,
    pub equity: Equity,
}

// ==========================================
// ReferenceOwnership - 参照股权清单条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceOwnership {
    pub entity: String,
    pub plant_name: String,
    pub country: String,
    pub equity: Option<f64>,
    pub status: Option<String>,
}
