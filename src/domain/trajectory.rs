// ==========================================
// 钢铁资产级排放核算引擎 - 预测轨迹
// ==========================================

use crate::domain::types::{BaselineSource, Scenario, TrajectoryMethod, UtilizationSource};
use serde::{Deserialize, Serialize};

/// 单年轨迹点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub year: i32,
    /// 平推兜底且可信点未给产量时为空
    pub output: Option<f64>,
    pub emissions: f64,
    pub active_capacity: f64,
    pub active_units: usize,
}

/// 单主体单情景轨迹
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub entity: String,
    pub scenario: Scenario,
    pub points: Vec<TrajectoryPoint>,
    /// 锚定缩放系数（未锚定时为 1.0）
    pub scale_factor: f64,
    pub anchored: bool,
    pub baseline_source: Option<BaselineSource>,
    pub calibrated_utilization: f64,
    pub utilization_source: UtilizationSource,
    pub method: TrajectoryMethod,
}

impl Trajectory {
    pub fn point(&self, year: i32) -> Option<&TrajectoryPoint> {
        self.points.iter().find(|p| p.year == year)
    }

    pub fn emissions_at(&self, year: i32) -> Option<f64> {
        self.point(year).map(|p| p.emissions)
    }
}
