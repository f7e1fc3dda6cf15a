// ==========================================
// 钢铁资产级排放核算引擎 - 产量分配引擎
// ==========================================
// 职责: 主体(或区域)产量目标 → 按产能分摊至活跃装置 → 排放
// 红线: 活跃产能为 0 时报 MissingData,禁止除零;
//       越界结果只标记不丢弃
// ==========================================

use crate::config::engine_config::AllocationConfig;
use crate::domain::entity::Equity;
use crate::domain::report::UnitAllocationRow;
use crate::domain::types::{OutputMethod, TechnologyClass};
use crate::engine::emission_factor::EmissionFactorTable;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::lifecycle::ActiveUnit;
use std::collections::{BTreeMap, HashMap};
use tracing::{instrument, warn};

// ==========================================
// 分配结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct UnitAllocation {
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
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationResult {
    pub entity: String,
    pub year: i32,
    pub target: f64,
    pub active_capacity: f64,
    /// 主体整体利用率 = 目标 / 活跃产能
    pub utilization: f64,
    pub units: Vec<UnitAllocation>,
    pub allocated_output: f64,
    /// 区域模式下无法落到装置的产量
    pub unallocated_output: f64,
    pub emissions: f64,
    pub weighted_emission_factor: Option<f64>,
    /// 合理性越界（PlausibilityViolation）
    pub violations: Vec<EngineError>,
}

impl AllocationResult {
    /// 展开为装置明细行,method 为目标产量的来源（观测/补缺）
    pub fn to_rows(&self, method: OutputMethod) -> Vec<UnitAllocationRow> {
        self.units
            .iter()
            .map(|u| UnitAllocationRow {
                entity: self.entity.clone(),
                year: self.year,
                unit_id: u.unit_id.clone(),
                plant_name: u.plant_name.clone(),
                country: u.country.clone(),
                region: u.region.clone(),
                technology_class: u.technology_class,
                capacity: u.capacity,
                utilization: u.utilization,
                allocated_output: u.allocated_output,
                emission_factor: u.emission_factor,
                emissions: u.emissions,
                equity: u.equity,
                output_method: method,
            })
            .collect()
    }
}

// ==========================================
// OutputAllocator - 产量分配引擎
// ==========================================
pub struct OutputAllocator {
    config: AllocationConfig,
}

impl OutputAllocator {
    pub fn new(config: AllocationConfig) -> Self {
        Self { config }
    }

    /// 分配主体产量
    ///
    /// # 规则
    /// 1. utilization = target / Σ活跃产能
    /// 2. allocated = capacity × utilization
    ///    区域模式: 各区域按自身分项目标计算利用率;
    ///    剩余 = target − Σ已匹配分项目标,按产能摊给无分项目标的装置
    /// 3. emissions = allocated × EF(区域, 工艺, 年份)
    ///
    /// # 参数
    /// - units: 活跃装置（由生命周期过滤给出）
    /// - regional_targets: 国家 → 分项目标（可选）
    #[instrument(skip(self, units, factors, regional_targets), fields(
        entity = %entity,
        year = year,
        target = target,
        units = units.len()
    ))]
    pub fn allocate(
        &self,
        entity: &str,
        year: i32,
        target: f64,
        units: &[ActiveUnit<'_>],
        factors: &EmissionFactorTable,
        regional_targets: Option<&BTreeMap<String, f64>>,
    ) -> EngineResult<AllocationResult> {
        if !target.is_finite() || target < 0.0 {
            return Err(EngineError::MissingData {
                entity: entity.to_string(),
                year,
                message: format!("产量目标非法: {}", target),
            });
        }

        let active_capacity: f64 = units.iter().map(|u| u.capacity()).sum();
        if active_capacity <= 0.0 {
            return Err(EngineError::MissingData {
                entity: entity.to_string(),
                year,
                message: format!("活跃产能为 0（候选装置 {} 个）", units.len()),
            });
        }

        let utilization = target / active_capacity;
        let mut violations = Vec::new();
        if utilization > self.config.utilization_max {
            violations.push(self.violation(entity, year, "utilization", utilization, self.config.utilization_max));
        }

        // 装置利用率
        let (unit_rates, unallocated_output) = match regional_targets.filter(|m| !m.is_empty()) {
            None => (vec![utilization; units.len()], 0.0),
            Some(regional) => {
                self.regional_rates(entity, year, target, units, regional, &mut violations)
            }
        };

        let mut allocations = Vec::with_capacity(units.len());
        for (active, rate) in units.iter().zip(unit_rates) {
            let registered = active.registered;
            let derived = &registered.derived;
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
            let allocated = active.capacity() * rate;
            allocations.push(UnitAllocation {
                unit_id: registered.unit.unit_id.clone(),
                plant_name: registered.unit.plant_name.clone(),
                country: registered.unit.country.clone(),
                region: derived.region.clone(),
                technology_class: derived.technology_class,
                capacity: active.capacity(),
                utilization: rate,
                allocated_output: allocated,
                emission_factor: ef,
                emissions: allocated * ef,
                equity: active.equity,
            });
        }

        let allocated_output: f64 = allocations.iter().map(|a| a.allocated_output).sum();
        let emissions: f64 = allocations.iter().map(|a| a.emissions).sum();
        let weighted_emission_factor = if target > 0.0 {
            Some(emissions / target)
        } else {
            None
        };

        if emissions > self.config.emissions_sanity_max {
            violations.push(self.violation(entity, year, "emissions", emissions, self.config.emissions_sanity_max));
        }

        Ok(AllocationResult {
            entity: entity.to_string(),
            year,
            target,
            active_capacity,
            utilization,
            units: allocations,
            allocated_output,
            unallocated_output,
            emissions,
            weighted_emission_factor,
            violations,
        })
    }

    /// 区域模式下逐装置利用率
    ///
    /// # 返回
    /// (与 units 对齐的利用率, 未能落地的产量)
    fn regional_rates(
        &self,
        entity: &str,
        year: i32,
        target: f64,
        units: &[ActiveUnit<'_>],
        regional: &BTreeMap<String, f64>,
        violations: &mut Vec<EngineError>,
    ) -> (Vec<f64>, f64) {
        let key = |country: &str| country.trim().to_lowercase();
        let sub_targets: HashMap<String, f64> =
            regional.iter().map(|(c, q)| (key(c), *q)).collect();

        let mut capacity_by_country: HashMap<String, f64> = HashMap::new();
        for active in units {
            *capacity_by_country
                .entry(key(&active.registered.unit.country))
                .or_insert(0.0) += active.capacity();
        }

        // 有产能的分项目标才算已匹配
        let mut country_rates: HashMap<String, f64> = HashMap::new();
        let mut matched_total = 0.0;
        for (country, quantity) in &sub_targets {
            let capacity = capacity_by_country.get(country).copied().unwrap_or(0.0);
            if capacity > 0.0 {
                let rate = quantity / capacity;
                if rate > self.config.utilization_max {
                    violations.push(self.violation(
                        entity,
                        year,
                        &format!("utilization[{}]", country),
                        rate,
                        self.config.utilization_max,
                    ));
                }
                country_rates.insert(country.clone(), rate);
                matched_total += quantity;
            }
        }

        let remaining = target - matched_total;
        let unmatched_capacity: f64 = units
            .iter()
            .filter(|a| !country_rates.contains_key(&key(&a.registered.unit.country)))
            .map(|a| a.capacity())
            .sum();

        let (residual_rate, unallocated) = if remaining > 0.0 && unmatched_capacity > 0.0 {
            (remaining / unmatched_capacity, 0.0)
        } else {
            if remaining < 0.0 {
                warn!(entity = %entity, year, remaining, "分项目标之和超过主体目标");
            } else if remaining > 0.0 {
                warn!(entity = %entity, year, remaining, "剩余产量无可分摊装置");
            }
            (0.0, remaining.max(0.0))
        };

        let rates = units
            .iter()
            .map(|a| {
                country_rates
                    .get(&key(&a.registered.unit.country))
                    .copied()
                    .unwrap_or(residual_rate)
            })
            .collect();
        (rates, unallocated)
    }

    fn violation(&self, entity: &str, year: i32, metric: &str, value: f64, limit: f64) -> EngineError {
        warn!(entity = %entity, year, metric, value, limit, "合理性越界");
        EngineError::PlausibilityViolation {
            entity: entity.to_string(),
            year,
            metric: metric.to_string(),
            value,
            limit,
        }
    }
}
