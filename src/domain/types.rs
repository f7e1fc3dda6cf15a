// ==========================================
// 钢铁资产级排放核算引擎 - 领域类型定义
// ==========================================
// 职责: 工艺路线、生命周期状态、策略轴、方法标签等枚举
// 红线: 所有默认/推断值必须带来源标签,禁止静默补零
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 工艺路线 (Technology Class)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TechnologyClass {
    PrimaryRoute,        // 高炉-转炉长流程
    ScrapRoute,          // 废钢电炉短流程
    ReducedIronGas,      // 气基直接还原
    ReducedIronCoal,     // 煤基直接还原
    ReducedIronHydrogen, // 氢基直接还原
    Unknown,             // 未识别
}

impl TechnologyClass {
    /// 是否属于直接还原铁路线
    pub fn is_reduced_iron(&self) -> bool {
        matches!(
            self,
            TechnologyClass::ReducedIronGas
                | TechnologyClass::ReducedIronCoal
                | TechnologyClass::ReducedIronHydrogen
        )
    }

    /// 从文本解析工艺路线（容忍大小写、连字符与常见别名）
    ///
    /// # 返回
    /// - None: 无法识别
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text.trim().to_uppercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "PRIMARY_ROUTE" | "BF_BOF" | "BF" | "BOF" => Some(TechnologyClass::PrimaryRoute),
            "SCRAP_ROUTE" | "EAF" | "SCRAP_EAF" => Some(TechnologyClass::ScrapRoute),
            "REDUCED_IRON_GAS" | "DRI_GAS" => Some(TechnologyClass::ReducedIronGas),
            "REDUCED_IRON_COAL" | "DRI_COAL" => Some(TechnologyClass::ReducedIronCoal),
            "REDUCED_IRON_HYDROGEN" | "H2_DRI" | "DRI_H2" => {
                Some(TechnologyClass::ReducedIronHydrogen)
            }
            "UNKNOWN" => Some(TechnologyClass::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for TechnologyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TechnologyClass::PrimaryRoute => write!(f, "PRIMARY_ROUTE"),
            TechnologyClass::ScrapRoute => write!(f, "SCRAP_ROUTE"),
            TechnologyClass::ReducedIronGas => write!(f, "REDUCED_IRON_GAS"),
            TechnologyClass::ReducedIronCoal => write!(f, "REDUCED_IRON_COAL"),
            TechnologyClass::ReducedIronHydrogen => write!(f, "REDUCED_IRON_HYDROGEN"),
            TechnologyClass::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ==========================================
// 生命周期状态 (Lifecycle Status)
// ==========================================
// 红线: CANCELLED 在任何年份都不活跃
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStatus {
    Operating,              // 在产
    OperatingPreRetirement, // 在产(已宣布退役)
    Retired,                // 已退役
    Mothballed,             // 封存
    Construction,           // 在建
    Announced,              // 已宣布(规划)
    Cancelled,              // 已取消
}

impl LifecycleStatus {
    /// 从台账文本解析状态
    ///
    /// 接受 "operating pre-retirement" / "OPERATING_PRE_RETIREMENT" / "pre-retirement" 等写法
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text.trim().to_lowercase().replace(['-', '_'], " ");
        let collapsed = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
        match collapsed.as_str() {
            "operating" => Some(LifecycleStatus::Operating),
            "operating pre retirement" | "pre retirement" => {
                Some(LifecycleStatus::OperatingPreRetirement)
            }
            "retired" => Some(LifecycleStatus::Retired),
            "mothballed" => Some(LifecycleStatus::Mothballed),
            "construction" | "under construction" => Some(LifecycleStatus::Construction),
            "announced" => Some(LifecycleStatus::Announced),
            "cancelled" | "canceled" => Some(LifecycleStatus::Cancelled),
            _ => None,
        }
    }

    /// 快照时点已存在的产能（开工年份缺失时按"早期"默认）
    pub fn is_existing(&self) -> bool {
        matches!(
            self,
            LifecycleStatus::Operating
                | LifecycleStatus::OperatingPreRetirement
                | LifecycleStatus::Retired
                | LifecycleStatus::Mothballed
        )
    }

    /// 快照时点仍在运行（无关停情景可抑制其退役）
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            LifecycleStatus::Operating | LifecycleStatus::OperatingPreRetirement
        )
    }

    /// 未来新增产能（只认装置级开工年份）
    pub fn is_future(&self) -> bool {
        matches!(
            self,
            LifecycleStatus::Construction | LifecycleStatus::Announced
        )
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleStatus::Operating => write!(f, "OPERATING"),
            LifecycleStatus::OperatingPreRetirement => write!(f, "OPERATING_PRE_RETIREMENT"),
            LifecycleStatus::Retired => write!(f, "RETIRED"),
            LifecycleStatus::Mothballed => write!(f, "MOTHBALLED"),
            LifecycleStatus::Construction => write!(f, "CONSTRUCTION"),
            LifecycleStatus::Announced => write!(f, "ANNOUNCED"),
            LifecycleStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

// ==========================================
// 生命周期策略轴
// ==========================================

/// 规划产能(ANNOUNCED)是否计入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnnouncedPolicy {
    Strict,  // 仅历史/在建
    Relaxed, // 计入规划产能
}

/// 推断退役是否生效
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetirementMode {
    Scheduled,  // 按计划退役
    Suppressed, // 抑制在产装置的退役
}

/// 活跃判定策略（两个轴必须显式给出,禁止隐式混用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecyclePolicy {
    pub announced: AnnouncedPolicy,
    pub retirements: RetirementMode,
}

impl LifecyclePolicy {
    /// 历史核算口径: 不计规划产能, 按计划退役
    pub fn historical() -> Self {
        Self {
            announced: AnnouncedPolicy::Strict,
            retirements: RetirementMode::Scheduled,
        }
    }

    /// 预测情景口径
    pub fn for_scenario(scenario: Scenario, announced: AnnouncedPolicy) -> Self {
        Self {
            announced,
            retirements: scenario.retirement_mode(),
        }
    }
}

// ==========================================
// 预测情景 (Scenario)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scenario {
    PlannedTransition, // 按计划关停
    NoClosure,         // 延续运行,新增照常
}

impl Scenario {
    pub const ALL: [Scenario; 2] = [Scenario::PlannedTransition, Scenario::NoClosure];

    pub fn retirement_mode(&self) -> RetirementMode {
        match self {
            Scenario::PlannedTransition => RetirementMode::Scheduled,
            Scenario::NoClosure => RetirementMode::Suppressed,
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_uppercase().replace(['-', ' '], "_").as_str() {
            "PLANNED_TRANSITION" | "TP" | "TRANSITION" => Some(Scenario::PlannedTransition),
            "NO_CLOSURE" | "BAU" | "CONTINUITY" => Some(Scenario::NoClosure),
            _ => None,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scenario::PlannedTransition => write!(f, "PLANNED_TRANSITION"),
            Scenario::NoClosure => write!(f, "NO_CLOSURE"),
        }
    }
}

// ==========================================
// 来源标签
// ==========================================

/// 开工年份来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StartYearSource {
    UnitReported,    // 装置级年份
    PlantReported,   // 厂级年份
    DefaultExisting, // 存量产能默认
    DefaultFuture,   // 新增产能默认
}

/// 退役年份来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetirementSource {
    Explicit,              // 台账退役年份
    AnnouncementHorizon,   // 宣布年份 + N 年
    PreRetirementFallback, // 已宣布退役但无年份
    RetiredFallback,       // 已退役但无年份(台账年份)
}

/// 工艺路线来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TechnologySource {
    Declared,          // 台账显式给出
    CapacityDominance, // 分项产能占优
    CapacitySignal,    // 单一分项产能
    TextFallback,      // 设备文本
    Default,           // 兜底默认
    CoLocation,        // 同厂直接还原铁共址改判
}

/// 股权匹配方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchSource {
    OwnerRule,    // 股东文本规则
    NameFallback, // 装置/厂名兜底
}

/// 产量来源性质
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    Disclosed,       // 审计/披露
    Modeled,         // 模型/派生
    CapacityDerived, // 产能份额估算
}

impl SourceKind {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_uppercase().replace(['-', ' '], "_").as_str() {
            "DISCLOSED" | "AUDITED" | "REPORTED" => Some(SourceKind::Disclosed),
            "MODELED" | "MODELLED" | "DERIVED" => Some(SourceKind::Modeled),
            "CAPACITY_DERIVED" | "CAPACITY_SHARE" => Some(SourceKind::CapacityDerived),
            _ => None,
        }
    }
}

/// 核定产量方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputMethod {
    Observed,         // 观测值
    CapacityEstimate, // 产能 × 校准利用率
}

impl fmt::Display for OutputMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMethod::Observed => write!(f, "OBSERVED"),
            OutputMethod::CapacityEstimate => write!(f, "CAPACITY_ESTIMATE"),
        }
    }
}

/// 多来源一致性（核定值相对全部有效来源中位数的偏离）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceAgreement {
    NotCompared, // 有效来源不足 2 个或补缺值
    Strong,      // 偏离 ≤ 强一致阈值
    Partial,     // 偏离 ≤ 部分一致阈值
    Divergent,   // 超出部分一致阈值
}

impl fmt::Display for SourceAgreement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceAgreement::NotCompared => write!(f, "NOT_COMPARED"),
            SourceAgreement::Strong => write!(f, "STRONG"),
            SourceAgreement::Partial => write!(f, "PARTIAL"),
            SourceAgreement::Divergent => write!(f, "DIVERGENT"),
        }
    }
}

/// 利用率来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UtilizationSource {
    Calibrated, // 基年校准
    Clipped,    // 校准后截断至合理区间
    Default,    // 无法校准,使用默认
}

/// 轨迹方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrajectoryMethod {
    UnitLevel,    // 装置级推演
    FlatFallback, // 无装置,沿用最新已知值
}

/// 锚定基准来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BaselineSource {
    TrustedSeries,        // 外部可信序列
    HistoricalAllocation, // 本引擎历史分配结果
}

// ==========================================
// 排放路径 (Pathway)
// ==========================================

/// 排放路径类型（装置级情景之外的主体级路径）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PathwayKind {
    TrendBau,   // 近年复合增长率外推
    Commitment, // 企业减排承诺线性插值
}

impl fmt::Display for PathwayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathwayKind::TrendBau => write!(f, "TREND_BAU"),
            PathwayKind::Commitment => write!(f, "COMMITMENT"),
        }
    }
}

/// 远期承诺类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitmentKind {
    NetZero,       // 净零,保留 5% 残余
    CarbonNeutral, // 碳中和/气候中和,保留 10% 残余
    Reduction,     // 绝对减排,按目标比例
    Other,         // 未识别,保留 20% 残余
}

impl CommitmentKind {
    /// 默认绝对减排比例（目标未给比例时）
    pub const DEFAULT_REDUCTION: f64 = 0.40;

    /// 从承诺文本识别类型
    pub fn parse(value: &str) -> Self {
        let lowered = value.trim().to_lowercase().replace(['-', '_'], " ");
        if lowered.contains("net zero") {
            CommitmentKind::NetZero
        } else if lowered.contains("carbon neutral") || lowered.contains("climate neutral") {
            CommitmentKind::CarbonNeutral
        } else if lowered.contains("reduction") {
            CommitmentKind::Reduction
        } else {
            CommitmentKind::Other
        }
    }

    /// 目标年残余排放占基准的比例
    ///
    /// # 参数
    /// - reduction: 绝对减排比例（仅 Reduction 使用）
    pub fn residual_share(&self, reduction: Option<f64>) -> f64 {
        match self {
            CommitmentKind::NetZero => 0.05,
            CommitmentKind::CarbonNeutral => 0.10,
            CommitmentKind::Reduction => 1.0 - reduction.unwrap_or(Self::DEFAULT_REDUCTION),
            CommitmentKind::Other => 0.20,
        }
    }
}

// ==========================================
// 偏差等级 (Divergence Class)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DivergenceClass {
    Aligned,       // 一致
    Minor,         // 轻微
    Moderate,      // 中等
    Major,         // 重大
    Indeterminate, // 参照值过小,无法判定
}

impl fmt::Display for DivergenceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DivergenceClass::Aligned => write!(f, "ALIGNED"),
            DivergenceClass::Minor => write!(f, "MINOR"),
            DivergenceClass::Moderate => write!(f, "MODERATE"),
            DivergenceClass::Major => write!(f, "MAJOR"),
            DivergenceClass::Indeterminate => write!(f, "INDETERMINATE"),
        }
    }
}

/// 偏差成因推测（仅供报告）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DivergenceCause {
    ConsistentLifecycle,          // 生命周期假设一致
    ReferenceAssumesMoreClosures, // 参照模型关停更多
    ReferenceFewerClosuresOrFactors, // 参照模型关停更少或排放因子不同
    NotAssessed,                  // 无法判定
}

// ==========================================
// 股权审计标记
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnershipFlag {
    NotInReference,  // 仅本方匹配到
    InReferenceOnly, // 仅参照清单有
    EquityMismatch,  // 股比不一致
    EquityUnknown,   // 股比未知
    MinorityStake,   // 少数股权
}

impl OwnershipFlag {
    /// 人工复核建议
    pub fn suggested_action(&self) -> &'static str {
        match self {
            OwnershipFlag::NotInReference => "核实该装置归属,确认是否应计入该主体",
            OwnershipFlag::InReferenceOnly => "检查匹配规则或台账,确认是否漏配该装置",
            OwnershipFlag::EquityMismatch => "核对年报披露股比,必要时修订台账股东字段",
            OwnershipFlag::EquityUnknown => "补充股比信息,当前不按全资处理",
            OwnershipFlag::MinorityStake => "确认核算口径(权益法/运营控制)是否计入少数股权",
        }
    }
}

impl fmt::Display for OwnershipFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnershipFlag::NotInReference => write!(f, "NOT_IN_REFERENCE"),
            OwnershipFlag::InReferenceOnly => write!(f, "IN_REFERENCE_ONLY"),
            OwnershipFlag::EquityMismatch => write!(f, "EQUITY_MISMATCH"),
            OwnershipFlag::EquityUnknown => write!(f, "EQUITY_UNKNOWN"),
            OwnershipFlag::MinorityStake => write!(f, "MINORITY_STAKE"),
        }
    }
}
