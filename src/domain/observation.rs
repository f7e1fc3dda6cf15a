// ==========================================
// 钢铁资产级排放核算引擎 - 产量观测与排放因子条目
// ==========================================

use crate::domain::types::{
    CommitmentKind, OutputMethod, Scenario, SourceAgreement, SourceKind, TechnologyClass,
};
use serde::{Deserialize, Serialize};

/// 排放因子条目 (tCO2 / t 粗钢)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionFactorEntry {
    pub region: String,
    pub technology_class: TechnologyClass,
    pub base_factor: f64,
    pub reference_year: i32,
    /// 年改进率,仅一种工艺路线允许携带
    pub annual_improvement: Option<f64>,
}

/// 产量来源描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub source_id: String,
    pub kind: SourceKind,
    /// 越小越优先
    pub priority_rank: u32,
}

/// 主体-年份产量观测 (Mt)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputObservation {
    pub entity: String,
    pub year: i32,
    pub quantity: f64,
    pub source_id: String,
    pub priority_rank: u32,
}

/// 排除规则（精确匹配 主体+年份+来源）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExclusionRule {
    pub entity: String,
    pub year: i32,
    pub source_id: String,
}

/// 核定产量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledOutput {
    pub entity: String,
    pub year: i32,
    pub quantity: f64,
    pub source_id: String,
    pub method: OutputMethod,
    /// 产能估算时的校准利用率
    pub calibrated_utilization: Option<f64>,
    /// 产能估算时参与校准的年份
    pub calibration_years: Vec<i32>,
    /// 参与比较的有效来源数（排除规则之后）
    pub source_count: usize,
    /// (最大 − 最小) / 中位数,来源不足 2 个时为空
    pub source_spread: Option<f64>,
    pub agreement: SourceAgreement,
    /// 数据质量标记（超合理上限等,只标记不丢弃）
    pub quality_flags: Vec<String>,
}

/// 区域分项目标（按装置所在国家）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalTarget {
    pub entity: String,
    pub year: i32,
    pub country: String,
    pub quantity: f64,
}

/// 可信序列点（锚定用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustedPoint {
    pub entity: String,
    pub year: i32,
    pub emissions: f64,
    pub output: Option<f64>,
}

/// 独立参照轨迹点（偏差审计用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    pub entity: String,
    pub year: i32,
    pub scenario: Scenario,
    pub emissions: f64,
}

/// 企业减排承诺
///
/// 比例均为小数（0.25 = 减排 25%）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitmentTarget {
    pub entity: String,
    pub interim_target_year: Option<i32>,
    pub interim_reduction: Option<f64>,
    pub end_target_year: Option<i32>,
    pub end_target_kind: CommitmentKind,
    pub end_reduction: Option<f64>,
}
