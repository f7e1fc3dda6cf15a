// ==========================================
// 钢铁资产级排放核算引擎 - 输出行结构
// ==========================================
// 职责: 引擎边界输出的结构化行（由外部负责落盘/展示）
// ==========================================

use crate::domain::entity::Equity;
use crate::domain::trajectory::Trajectory;
use crate::domain::types::{
    BaselineSource, DivergenceCause, DivergenceClass, MatchSource, OutputMethod, OwnershipFlag,
    PathwayKind, Scenario, SourceAgreement, TechnologyClass, TrajectoryMethod, UtilizationSource,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 装置级分配结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitAllocationRow {
    pub entity: String,
    pub year: i32,
    pub unit_id: String,
    pub plant_name: String,
    pub country: String,
    pub region: String,
    pub technology_class: TechnologyClass,
    pub capacity: f64,
    pub utilization: f64,
    pub allocated_output: f64,
    pub emission_factor: f64,
    pub emissions: f64,
    pub equity: Equity,
    /// 该年目标产量的来源（观测 / 利用率补缺）
    pub output_method: OutputMethod,
}

/// 主体-年份汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityYearRow {
    pub entity: String,
    pub year: i32,
    pub target_output: f64,
    pub output_source_id: String,
    pub output_method: OutputMethod,
    pub source_count: usize,
    pub source_agreement: SourceAgreement,
    pub source_spread: Option<f64>,
    pub active_capacity: f64,
    pub utilization: f64,
    pub allocated_output: f64,
    pub unallocated_output: f64,
    pub emissions: f64,
    pub weighted_emission_factor: Option<f64>,
    pub plausibility_flags: Vec<String>,
}

/// 轨迹输出行（扁平化）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRow {
    pub entity: String,
    pub scenario: Scenario,
    pub year: i32,
    /// 未知（可信序列未给产量）时为空
    pub output: Option<f64>,
    pub emissions: f64,
    pub active_capacity: f64,
    pub active_units: usize,
    pub scale_factor: f64,
    pub anchored: bool,
    pub method: TrajectoryMethod,
    pub calibrated_utilization: f64,
    pub utilization_source: UtilizationSource,
    pub baseline_source: Option<BaselineSource>,
}

impl TrajectoryRow {
    pub fn from_trajectory(trajectory: &Trajectory) -> Vec<Self> {
        trajectory
            .points
            .iter()
            .map(|p| TrajectoryRow {
                entity: trajectory.entity.clone(),
                scenario: trajectory.scenario,
                year: p.year,
                output: p.output,
                emissions: p.emissions,
                active_capacity: p.active_capacity,
                active_units: p.active_units,
                scale_factor: trajectory.scale_factor,
                anchored: trajectory.anchored,
                method: trajectory.method,
                calibrated_utilization: trajectory.calibrated_utilization,
                utilization_source: trajectory.utilization_source,
                baseline_source: trajectory.baseline_source,
            })
            .collect()
    }
}

/// 归属映射行（每个匹配装置一行）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipMappingRow {
    pub entity: String,
    pub year: i32,
    pub unit_id: String,
    pub plant_name: String,
    pub country: String,
    pub equity: Equity,
    pub match_source: MatchSource,
    pub reference_plant: Option<String>,
    pub reference_equity: Option<f64>,
    pub flags: Vec<OwnershipFlag>,
    pub suggested_actions: Vec<String>,
}

/// 归属差异行（每个标记一行）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipMismatchRow {
    pub entity: String,
    pub plant_name: String,
    pub country: String,
    pub flag: OwnershipFlag,
    pub our_equity: Option<f64>,
    pub reference_equity: Option<f64>,
    pub suggested_action: String,
}

/// 偏差审计行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenceRow {
    pub entity: String,
    pub scenario: Scenario,
    pub year: i32,
    pub produced: f64,
    pub reference: f64,
    pub delta_pct: Option<f64>,
    pub class: DivergenceClass,
    pub cause: DivergenceCause,
}

/// 主体级补充路径行（趋势外推 / 减排承诺）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayRow {
    pub entity: String,
    pub kind: PathwayKind,
    pub year: i32,
    pub emissions: f64,
    /// 路径起点
    pub base_year: i32,
    pub base_emissions: f64,
    /// 趋势外推采用的年增长率
    pub growth_rate: Option<f64>,
}

/// 批处理问题（不中断批次）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchIssue {
    pub entity: String,
    pub year: Option<i32>,
    pub stage: String,
    pub message: String,
}

/// 批处理报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub allocations: Vec<UnitAllocationRow>,
    pub entity_years: Vec<EntityYearRow>,
    pub trajectories: Vec<TrajectoryRow>,
    pub ownership: Vec<OwnershipMappingRow>,
    pub mismatches: Vec<OwnershipMismatchRow>,
    pub divergence: Vec<DivergenceRow>,
    pub pathways: Vec<PathwayRow>,
    pub issues: Vec<BatchIssue>,
}
