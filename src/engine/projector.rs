// ==========================================
// 钢铁资产级排放核算引擎 - 远期轨迹推演
// ==========================================
// 职责: 基年利用率校准 → 逐年活跃产能 × 利用率 → 排放 → 锚定缩放
// 红线: 两个情景共享同一校准利用率; 无装置主体走平推兜底并打标
// ==========================================

use crate::config::engine_config::ProjectionConfig;
use crate::domain::observation::{ReconciledOutput, TrustedPoint};
use crate::domain::trajectory::{Trajectory, TrajectoryPoint};
use crate::domain::types::{
    BaselineSource, LifecyclePolicy, Scenario, TrajectoryMethod, UtilizationSource,
};
use crate::engine::emission_factor::EmissionFactorTable;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::lifecycle::ActiveFleet;
use tracing::{debug, info, instrument};

/// 历史分配结果（用于锚定与平推兜底）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoricalPoint {
    pub year: i32,
    pub output: f64,
    pub emissions: f64,
}

/// 推演所需的主体历史数据
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectionInputs<'a> {
    pub reconciled: &'a [ReconciledOutput],
    pub trusted: &'a [TrustedPoint],
    pub historical: &'a [HistoricalPoint],
}

/// 校准后的利用率
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibratedUtilization {
    pub value: f64,
    pub source: UtilizationSource,
}

// ==========================================
// TrajectoryProjector - 轨迹推演器
// ==========================================
pub struct TrajectoryProjector {
    config: ProjectionConfig,
}

impl TrajectoryProjector {
    pub fn new(config: ProjectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// 基年利用率校准
    ///
    /// # 规则
    /// 1. 基年核定产量;缺失时取基年之前最近一年
    /// 2. ÷ 该产量所在年份的已投产产能（历史口径）
    ///    在建/规划装置即使开工年已过也不计入分母
    /// 3. 截断至 [min, max];不可计算时取默认值
    pub fn calibrate_utilization(
        &self,
        entity: &str,
        reconciled: &[ReconciledOutput],
        fleet: &dyn ActiveFleet,
    ) -> CalibratedUtilization {
        let fallback = CalibratedUtilization {
            value: self.config.default_utilization,
            source: UtilizationSource::Default,
        };

        let Some(record) = reconciled
            .iter()
            .filter(|r| r.entity == entity && r.year <= self.config.base_year)
            .max_by_key(|r| r.year)
        else {
            debug!(entity = %entity, "无基年产量,使用默认利用率");
            return fallback;
        };
        let output = record.quantity;

        let capacity = match fleet.active_units(entity, record.year, LifecyclePolicy::historical()) {
            Ok(units) => units
                .iter()
                .filter(|u| !u.registered.unit.lifecycle_status.is_future())
                .map(|u| u.capacity())
                .sum::<f64>(),
            Err(_) => 0.0,
        };
        if capacity <= 0.0 {
            debug!(entity = %entity, year = record.year, "已投产产能为 0,使用默认利用率");
            return fallback;
        }

        let raw = output / capacity;
        let clipped = raw.clamp(self.config.utilization_min, self.config.utilization_max);
        let source = if (clipped - raw).abs() > f64::EPSILON {
            UtilizationSource::Clipped
        } else {
            UtilizationSource::Calibrated
        };
        debug!(entity = %entity, year = record.year, raw, clipped, "基年利用率校准");
        CalibratedUtilization {
            value: clipped,
            source,
        }
    }

    /// 推演单主体单情景轨迹
    ///
    /// # 参数
    /// - utilization: 由 calibrate_utilization 给出,两个情景共用
    ///
    /// # 返回
    /// - Ok(Trajectory): 装置级或平推兜底
    /// - Err(MissingData): 无装置且无任何已知值
    #[instrument(skip(self, inputs, fleet, factors, utilization), fields(
        entity = %entity,
        scenario = %scenario
    ))]
    pub fn project(
        &self,
        entity: &str,
        scenario: Scenario,
        utilization: CalibratedUtilization,
        inputs: ProjectionInputs<'_>,
        fleet: &dyn ActiveFleet,
        factors: &EmissionFactorTable,
    ) -> EngineResult<Trajectory> {
        let policy = LifecyclePolicy::for_scenario(scenario, self.config.announced_policy);

        let mut points = Vec::new();
        for year in self.config.base_year..=self.config.end_year {
            let units = fleet.active_units(entity, year, policy)?;
            let mut active_capacity = 0.0;
            let mut emissions = 0.0;
            for active in &units {
                let derived = &active.registered.derived;
                let ef = factors
                    .factor(&derived.region, derived.technology_class, year)
                    .ok_or_else(|| EngineError::MissingData {
                        entity: entity.to_string(),
                        year,
                        message: format!(
                            "缺少排放因子: {}/{}",
                            derived.region, derived.technology_class
                        ),
                    })?;
                active_capacity += active.capacity();
                emissions += active.capacity() * utilization.value * ef;
            }
            points.push(TrajectoryPoint {
                year,
                output: Some(active_capacity * utilization.value),
                emissions,
                active_capacity,
                active_units: units.len(),
            });
        }

        if points.iter().all(|p| p.active_units == 0) {
            return self.flat_fallback(entity, scenario, inputs);
        }

        let mut trajectory = Trajectory {
            entity: entity.to_string(),
            scenario,
            points,
            scale_factor: 1.0,
            anchored: false,
            baseline_source: None,
            calibrated_utilization: utilization.value,
            utilization_source: utilization.source,
            method: TrajectoryMethod::UnitLevel,
        };
        self.anchor(&mut trajectory, inputs);

        info!(
            points = trajectory.points.len(),
            scale_factor = trajectory.scale_factor,
            anchored = trajectory.anchored,
            "轨迹推演完成"
        );
        Ok(trajectory)
    }

    /// 锚定基准: 可信序列优先,其次历史分配结果
    pub fn baseline(&self, entity: &str, inputs: ProjectionInputs<'_>) -> Option<(f64, BaselineSource)> {
        let base_year = self.config.base_year;
        if let Some(t) = inputs
            .trusted
            .iter()
            .find(|t| t.entity == entity && t.year == base_year)
        {
            return Some((t.emissions, BaselineSource::TrustedSeries));
        }
        if self.config.anchor_to_historical_allocation {
            if let Some(h) = inputs.historical.iter().find(|h| h.year == base_year) {
                return Some((h.emissions, BaselineSource::HistoricalAllocation));
            }
        }
        None
    }

    /// 锚定缩放
    ///
    /// # 规则
    /// scale = 可信基年排放 / 推演基年排放（两者均 > 0）,作用于全部年份的产量与排放
    fn anchor(&self, trajectory: &mut Trajectory, inputs: ProjectionInputs<'_>) {
        let raw_base = trajectory
            .emissions_at(self.config.base_year)
            .unwrap_or(0.0);
        let Some((trusted_base, source)) = self.baseline(&trajectory.entity, inputs) else {
            return;
        };
        if trusted_base <= 0.0 || raw_base <= 0.0 {
            debug!(trusted_base, raw_base, "基年值非正,跳过锚定");
            return;
        }

        let scale = trusted_base / raw_base;
        for point in &mut trajectory.points {
            point.output = point.output.map(|o| o * scale);
            point.emissions *= scale;
        }
        trajectory.scale_factor = scale;
        trajectory.anchored = true;
        trajectory.baseline_source = Some(source);
    }

    /// 平推兜底: 最新可信点,其次最新历史分配
    ///
    /// 可信点未给产量时产量保持未知,不以 0 填充
    fn flat_fallback(
        &self,
        entity: &str,
        scenario: Scenario,
        inputs: ProjectionInputs<'_>,
    ) -> EngineResult<Trajectory> {
        let latest_trusted = inputs
            .trusted
            .iter()
            .filter(|t| t.entity == entity)
            .max_by_key(|t| t.year);
        let latest_historical = inputs.historical.iter().max_by_key(|h| h.year);

        let (output, emissions, source) = match (latest_trusted, latest_historical) {
            (Some(t), _) => (t.output, t.emissions, BaselineSource::TrustedSeries),
            (None, Some(h)) => (
                Some(h.output),
                h.emissions,
                BaselineSource::HistoricalAllocation,
            ),
            (None, None) => {
                return Err(EngineError::MissingData {
                    entity: entity.to_string(),
                    year: self.config.base_year,
                    message: "无匹配装置且无任何已知排放值".to_string(),
                })
            }
        };

        info!(entity = %entity, scenario = %scenario, emissions, "无匹配装置,平推兜底");
        let points = (self.config.base_year..=self.config.end_year)
            .map(|year| TrajectoryPoint {
                year,
                output,
                emissions,
                active_capacity: 0.0,
                active_units: 0,
            })
            .collect();

        Ok(Trajectory {
            entity: entity.to_string(),
            scenario,
            points,
            scale_factor: 1.0,
            anchored: false,
            baseline_source: Some(source),
            calibrated_utilization: self.config.default_utilization,
            utilization_source: UtilizationSource::Default,
            method: TrajectoryMethod::FlatFallback,
        })
    }
}
