// ==========================================
// 钢铁资产级排放核算引擎 - 装置台账与生命周期过滤
// ==========================================
// 职责: 开工/退役年份推断、活跃判定、按主体查询活跃装置
// 红线: 纯函数 + 只读台账; 同输入同输出; CANCELLED 永不活跃
// ==========================================

use crate::config::engine_config::{LifecycleConfig, TechnologyConfig};
use crate::domain::entity::Equity;
use crate::domain::types::{
    AnnouncedPolicy, LifecyclePolicy, LifecycleStatus, MatchSource, RetirementMode,
    RetirementSource, StartYearSource,
};
use crate::domain::unit::{ProductionUnit, RegisteredUnit, UnitDerivation};
use crate::engine::emission_factor::EmissionFactorTable;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::technology::{classify_fleet, FeedstockHeuristic};
use std::collections::HashMap;
use tracing::{debug, info};

// ==========================================
// LifecycleCore - 纯函数工具类
// ==========================================
pub struct LifecycleCore;

impl LifecycleCore {
    /// 确定开工年份
    ///
    /// # 规则
    /// - 在建/规划: 只认装置级年份,缺失 → 新增产能默认年
    /// - 其余: 装置级 → 厂级 → 存量产能默认年
    pub fn resolve_start_year(
        unit: &ProductionUnit,
        config: &LifecycleConfig,
    ) -> (i32, StartYearSource) {
        if unit.lifecycle_status.is_future() {
            return match unit.unit_start_year {
                Some(y) => (y, StartYearSource::UnitReported),
                None => (config.default_start_year_future, StartYearSource::DefaultFuture),
            };
        }

        match (unit.unit_start_year, unit.plant_start_year) {
            (Some(y), _) => (y, StartYearSource::UnitReported),
            (None, Some(y)) => (y, StartYearSource::PlantReported),
            (None, None) => (
                config.default_start_year_existing,
                StartYearSource::DefaultExisting,
            ),
        }
    }

    /// 推断退役年份
    ///
    /// # 规则
    /// 1. 台账退役年份 → 直接采用
    /// 2. 在产: 无
    /// 3. 在产(已宣布退役): 宣布年 + N → 兜底年
    /// 4. 已退役/封存: 宣布年 + N → 台账年份兜底
    /// 5. 在建/规划/取消: 无
    pub fn infer_retirement(
        unit: &ProductionUnit,
        config: &LifecycleConfig,
    ) -> (Option<i32>, Option<RetirementSource>) {
        if let Some(year) = unit.retirement_year {
            return (Some(year), Some(RetirementSource::Explicit));
        }

        let from_announcement = unit
            .pre_retirement_announcement_year
            .map(|y| y + config.pre_retirement_horizon_years);

        match unit.lifecycle_status {
            LifecycleStatus::OperatingPreRetirement => match from_announcement {
                Some(y) => (Some(y), Some(RetirementSource::AnnouncementHorizon)),
                None => (
                    Some(config.pre_retirement_fallback_year),
                    Some(RetirementSource::PreRetirementFallback),
                ),
            },
            LifecycleStatus::Retired | LifecycleStatus::Mothballed => match from_announcement {
                Some(y) => (Some(y), Some(RetirementSource::AnnouncementHorizon)),
                None => (
                    Some(config.retired_fallback_year),
                    Some(RetirementSource::RetiredFallback),
                ),
            },
            _ => (None, None),
        }
    }

    /// 判定装置在指定年份是否活跃
    ///
    /// # 规则
    /// - CANCELLED → 否
    /// - ANNOUNCED 且 Strict → 否
    /// - 开工年 > year → 否
    /// - 退役生效且 year ≥ 退役年 → 否
    ///   （Suppressed 仅抑制快照时仍在运行装置的退役）
    pub fn is_active(unit: &RegisteredUnit, year: i32, policy: LifecyclePolicy) -> bool {
        let status = unit.unit.lifecycle_status;
        if status == LifecycleStatus::Cancelled {
            return false;
        }
        if status == LifecycleStatus::Announced && policy.announced == AnnouncedPolicy::Strict {
            return false;
        }
        if unit.derived.start_year > year {
            return false;
        }

        let retirement_applies = match policy.retirements {
            RetirementMode::Scheduled => true,
            RetirementMode::Suppressed => !status.is_running(),
        };
        match unit.derived.retirement_year {
            Some(close) if retirement_applies => year < close,
            _ => true,
        }
    }
}

// ==========================================
// ActiveUnit - 查询结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveUnit<'a> {
    pub registered: &'a RegisteredUnit,
    pub equity: Equity,
    pub match_source: MatchSource,
}

impl<'a> ActiveUnit<'a> {
    pub fn unit_id(&self) -> &str {
        &self.registered.unit.unit_id
    }

    pub fn capacity(&self) -> f64 {
        self.registered.unit.capacity_per_year
    }
}

// ==========================================
// ActiveFleet - 主体活跃装置查询接口
// ==========================================
pub trait ActiveFleet {
    /// 主体在指定年份、指定口径下的活跃装置（按装置 ID 排序）
    fn active_units(
        &self,
        entity: &str,
        year: i32,
        policy: LifecyclePolicy,
    ) -> EngineResult<Vec<ActiveUnit<'_>>>;

    /// 活跃产能合计
    fn active_capacity_under(
        &self,
        entity: &str,
        year: i32,
        policy: LifecyclePolicy,
    ) -> EngineResult<f64> {
        Ok(self
            .active_units(entity, year, policy)?
            .iter()
            .map(|u| u.capacity())
            .sum())
    }
}

// ==========================================
// AssetRegistry - 装置台账（只读）
// ==========================================
#[derive(Debug, Clone)]
pub struct AssetRegistry {
    units: Vec<RegisteredUnit>,
    index: HashMap<String, usize>,
}

impl AssetRegistry {
    /// 构建台账并一次性计算派生字段
    ///
    /// # 校验
    /// - 台账非空
    /// - 装置 ID 唯一
    /// - 产能非负且有限
    pub fn build(
        mut units: Vec<ProductionUnit>,
        factors: &EmissionFactorTable,
        lifecycle: &LifecycleConfig,
        technology: &TechnologyConfig,
        heuristic: &dyn FeedstockHeuristic,
    ) -> EngineResult<Self> {
        if units.is_empty() {
            return Err(EngineError::NoRegistry);
        }

        for unit in &units {
            if !unit.capacity_per_year.is_finite() || unit.capacity_per_year < 0.0 {
                return Err(EngineError::InvalidUnit {
                    unit_id: unit.unit_id.clone(),
                    message: format!("产能非法: {}", unit.capacity_per_year),
                });
            }
        }

        // 排序保证查询结果确定
        units.sort_by(|a, b| a.unit_id.cmp(&b.unit_id));
        for pair in units.windows(2) {
            if pair[0].unit_id == pair[1].unit_id {
                return Err(EngineError::InvalidUnit {
                    unit_id: pair[0].unit_id.clone(),
                    message: "装置 ID 重复".to_string(),
                });
            }
        }

        let classes = classify_fleet(&units, technology, heuristic);

        let registered: Vec<RegisteredUnit> = units
            .into_iter()
            .zip(classes)
            .map(|(unit, (technology_class, technology_source))| {
                let (start_year, start_year_source) =
                    LifecycleCore::resolve_start_year(&unit, lifecycle);
                let (retirement_year, retirement_source) =
                    LifecycleCore::infer_retirement(&unit, lifecycle);
                let region = factors.region_for(&unit.country);
                debug!(
                    unit_id = %unit.unit_id,
                    start_year,
                    retirement_year = ?retirement_year,
                    technology = %technology_class,
                    region = %region,
                    "装置派生字段"
                );
                RegisteredUnit {
                    derived: UnitDerivation {
                        start_year,
                        start_year_source,
                        retirement_year,
                        retirement_source,
                        technology_class,
                        technology_source,
                        region,
                    },
                    unit,
                }
            })
            .collect();

        let index = registered
            .iter()
            .enumerate()
            .map(|(i, r)| (r.unit.unit_id.clone(), i))
            .collect();

        info!(units = registered.len(), "装置台账构建完成");
        Ok(Self {
            units: registered,
            index,
        })
    }

    pub fn units(&self) -> &[RegisteredUnit] {
        &self.units
    }

    pub fn get(&self, unit_id: &str) -> Option<&RegisteredUnit> {
        self.index.get(unit_id).map(|&i| &self.units[i])
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// 在给定候选装置中筛选活跃装置（按装置 ID 排序）
    pub fn filter_active<'a, 's, I>(
        &'a self,
        candidates: I,
        year: i32,
        policy: LifecyclePolicy,
    ) -> Vec<ActiveUnit<'a>>
    where
        I: IntoIterator<Item = (&'s str, Equity, MatchSource)>,
    {
        let mut active: Vec<ActiveUnit<'a>> = candidates
            .into_iter()
            .filter_map(|(unit_id, equity, match_source)| {
                self.get(unit_id).map(|registered| ActiveUnit {
                    registered,
                    equity,
                    match_source,
                })
            })
            .filter(|a| LifecycleCore::is_active(a.registered, year, policy))
            .collect();
        active.sort_by(|a, b| a.unit_id().cmp(b.unit_id()));
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Scenario, TechnologyClass, TechnologySource};

    fn unit(status: LifecycleStatus) -> ProductionUnit {
        ProductionUnit {
            unit_id: "U1".to_string(),
            plant_id: "P1".to_string(),
            unit_name: "BF1".to_string(),
            plant_name: "Test Works".to_string(),
            country: "Japan".to_string(),
            capacity_per_year: 2.0,
            lifecycle_status: status,
            unit_start_year: None,
            plant_start_year: None,
            pre_retirement_announcement_year: None,
            retirement_year: None,
            owning_entity_raw: String::new(),
            declared_technology: None,
            primary_capacity: None,
            reduced_iron_capacity: None,
            scrap_capacity: None,
            equipment_text: None,
            reductant_text: None,
        }
    }

    fn register(unit: ProductionUnit) -> RegisteredUnit {
        let config = LifecycleConfig::default();
        let (start_year, start_year_source) = LifecycleCore::resolve_start_year(&unit, &config);
        let (retirement_year, retirement_source) = LifecycleCore::infer_retirement(&unit, &config);
        RegisteredUnit {
            derived: UnitDerivation {
                start_year,
                start_year_source,
                retirement_year,
                retirement_source,
                technology_class: TechnologyClass::PrimaryRoute,
                technology_source: TechnologySource::Default,
                region: "Japan".to_string(),
            },
            unit,
        }
    }

    #[test]
    fn test_construction_ignores_plant_founding_year() {
        let mut u = unit(LifecycleStatus::Construction);
        u.plant_start_year = Some(1965);
        let (year, source) = LifecycleCore::resolve_start_year(&u, &LifecycleConfig::default());
        assert_eq!(year, 2025);
        assert_eq!(source, StartYearSource::DefaultFuture);
    }

    #[test]
    fn test_pre_retirement_uses_announcement_horizon() {
        let mut u = unit(LifecycleStatus::OperatingPreRetirement);
        u.pre_retirement_announcement_year = Some(2022);
        assert_eq!(
            LifecycleCore::infer_retirement(&u, &LifecycleConfig::default()),
            (Some(2027), Some(RetirementSource::AnnouncementHorizon))
        );

        u.pre_retirement_announcement_year = None;
        assert_eq!(
            LifecycleCore::infer_retirement(&u, &LifecycleConfig::default()),
            (Some(2030), Some(RetirementSource::PreRetirementFallback))
        );
    }

    #[test]
    fn test_operating_has_no_inferred_end() {
        let u = unit(LifecycleStatus::Operating);
        assert_eq!(
            LifecycleCore::infer_retirement(&u, &LifecycleConfig::default()),
            (None, None)
        );
    }

    #[test]
    fn test_cancelled_never_active() {
        let mut u = unit(LifecycleStatus::Cancelled);
        u.unit_start_year = Some(1990);
        let r = register(u);
        for year in 1990..2060 {
            for scenario in Scenario::ALL {
                for announced in [AnnouncedPolicy::Strict, AnnouncedPolicy::Relaxed] {
                    let policy = LifecyclePolicy::for_scenario(scenario, announced);
                    assert!(!LifecycleCore::is_active(&r, year, policy));
                }
            }
        }
    }

    #[test]
    fn test_announced_only_under_relaxed_policy() {
        let mut u = unit(LifecycleStatus::Announced);
        u.unit_start_year = Some(2026);
        let r = register(u);
        let strict = LifecyclePolicy::for_scenario(Scenario::PlannedTransition, AnnouncedPolicy::Strict);
        let relaxed = LifecyclePolicy::for_scenario(Scenario::PlannedTransition, AnnouncedPolicy::Relaxed);
        assert!(!LifecycleCore::is_active(&r, 2030, strict));
        assert!(LifecycleCore::is_active(&r, 2030, relaxed));
        assert!(!LifecycleCore::is_active(&r, 2025, relaxed));
    }

    #[test]
    fn test_no_closure_suppresses_running_unit_retirement_only() {
        let mut running = unit(LifecycleStatus::OperatingPreRetirement);
        running.unit_start_year = Some(1980);
        running.retirement_year = Some(2028);
        let running = register(running);

        let mut retired = unit(LifecycleStatus::Retired);
        retired.unit_start_year = Some(1970);
        retired.retirement_year = Some(2015);
        let retired = register(retired);

        let planned = LifecyclePolicy::for_scenario(Scenario::PlannedTransition, AnnouncedPolicy::Relaxed);
        let no_closure = LifecyclePolicy::for_scenario(Scenario::NoClosure, AnnouncedPolicy::Relaxed);

        assert!(!LifecycleCore::is_active(&running, 2030, planned));
        assert!(LifecycleCore::is_active(&running, 2030, no_closure));
        assert!(!LifecycleCore::is_active(&retired, 2030, no_closure));
        assert!(LifecycleCore::is_active(&retired, 2014, no_closure));
    }
}
