// ==========================================
// 钢铁资产级排放核算引擎 - 工艺路线推断
// ==========================================
// 职责: 按装置分项产能/设备文本推断工艺路线; 同厂共址改判
// 红线: 纯函数,逐装置推断,禁止按主体整体假设
// ==========================================

use crate::config::engine_config::TechnologyConfig;
use crate::domain::types::{TechnologyClass, TechnologySource};
use crate::domain::unit::ProductionUnit;
use crate::engine::error::{EngineError, EngineResult};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

// ==========================================
// TechnologyCore - 纯函数工具类
// ==========================================
pub struct TechnologyCore;

impl TechnologyCore {
    /// 推断单装置工艺路线
    ///
    /// # 规则
    /// 1. 台账显式给出且非 UNKNOWN → 采用
    /// 2. 高炉与直接还原分项产能并存 → 大者胜（相等取长流程）
    /// 3. 单一分项产能 → 高炉 / 直接还原 / 电炉
    /// 4. 设备文本兜底
    /// 5. 配置默认
    pub fn classify(
        unit: &ProductionUnit,
        config: &TechnologyConfig,
    ) -> (TechnologyClass, TechnologySource) {
        if let Some(declared) = unit.declared_technology {
            if declared != TechnologyClass::Unknown {
                return (declared, TechnologySource::Declared);
            }
        }

        let primary = positive(unit.primary_capacity);
        let reduced = positive(unit.reduced_iron_capacity);
        let scrap = positive(unit.scrap_capacity);

        match (primary, reduced) {
            (Some(p), Some(d)) => {
                let class = if p >= d {
                    TechnologyClass::PrimaryRoute
                } else {
                    Self::reduced_iron_flavor(unit, config)
                };
                return (class, TechnologySource::CapacityDominance);
            }
            (Some(_), None) => {
                return (TechnologyClass::PrimaryRoute, TechnologySource::CapacitySignal)
            }
            (None, Some(_)) => {
                return (
                    Self::reduced_iron_flavor(unit, config),
                    TechnologySource::CapacitySignal,
                )
            }
            (None, None) => {}
        }

        if scrap.is_some() {
            return (TechnologyClass::ScrapRoute, TechnologySource::CapacitySignal);
        }

        if let Some(text) = unit.equipment_text.as_deref() {
            if let Some(class) = Self::classify_text(text) {
                let class = match class {
                    TechnologyClass::ReducedIronGas => Self::reduced_iron_flavor(unit, config),
                    other => other,
                };
                return (class, TechnologySource::TextFallback);
            }
        }

        (config.default_technology, TechnologySource::Default)
    }

    /// 设备文本识别
    ///
    /// # 返回
    /// - 直接还原统一返回 REDUCED_IRON_GAS,由调用方细分
    pub fn classify_text(text: &str) -> Option<TechnologyClass> {
        let lower = text.to_lowercase();
        let has_word = |word: &str| {
            lower
                .split(|c: char| !c.is_ascii_alphanumeric())
                .any(|token| token == word)
        };

        if lower.contains("hydrogen") || has_word("h2") {
            Some(TechnologyClass::ReducedIronHydrogen)
        } else if lower.contains("blast furnace") || has_word("bf") || has_word("bof") {
            Some(TechnologyClass::PrimaryRoute)
        } else if has_word("dri") || lower.contains("sponge") || lower.contains("direct red") {
            Some(TechnologyClass::ReducedIronGas)
        } else if has_word("eaf") || lower.contains("electric") || lower.contains("scrap") {
            Some(TechnologyClass::ScrapRoute)
        } else {
            None
        }
    }

    /// 直接还原细分: 还原剂文本 → 煤基国家 → 气基
    pub fn reduced_iron_flavor(unit: &ProductionUnit, config: &TechnologyConfig) -> TechnologyClass {
        if let Some(reductant) = unit.reductant_text.as_deref() {
            let lower = reductant.to_lowercase();
            if lower.contains("hydrogen") || lower.contains("h2") {
                return TechnologyClass::ReducedIronHydrogen;
            }
            if lower.contains("coal") {
                return TechnologyClass::ReducedIronCoal;
            }
            if lower.contains("gas") {
                return TechnologyClass::ReducedIronGas;
            }
        }

        let country = unit.country.trim();
        if config
            .coal_reductant_countries
            .iter()
            .any(|c| c.eq_ignore_ascii_case(country))
        {
            TechnologyClass::ReducedIronCoal
        } else {
            TechnologyClass::ReducedIronGas
        }
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

// ==========================================
// FeedstockHeuristic - 共址原料改判（可替换）
// ==========================================
pub trait FeedstockHeuristic: Send + Sync {
    /// 根据同厂其他装置的工艺改判当前装置
    ///
    /// # 参数
    /// - unit: 当前装置
    /// - current: 当前推断结果
    /// - co_located: 同厂其他装置的工艺路线
    ///
    /// # 返回
    /// - Some(class): 改判结果
    /// - None: 不改判
    fn reclassify(
        &self,
        unit: &ProductionUnit,
        current: TechnologyClass,
        co_located: &[TechnologyClass],
    ) -> Option<TechnologyClass>;
}

/// 默认共址规则
///
/// - 电炉与直接还原同厂 → 视为直接还原铁供料,优先级 氢基 > 煤基 > 气基
/// - 厂名命中氢基例外规则 → 氢基
pub struct DefaultFeedstockHeuristic {
    hydrogen_plants: Vec<Regex>,
}

impl DefaultFeedstockHeuristic {
    pub fn new(config: &TechnologyConfig) -> EngineResult<Self> {
        let hydrogen_plants = config
            .hydrogen_plant_patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| EngineError::InvalidRule {
                        rule: p.clone(),
                        message: e.to_string(),
                    })
            })
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(Self { hydrogen_plants })
    }

    fn is_hydrogen_plant(&self, unit: &ProductionUnit) -> bool {
        self.hydrogen_plants
            .iter()
            .any(|re| re.is_match(&unit.plant_name) || re.is_match(&unit.display_name()))
    }
}

impl FeedstockHeuristic for DefaultFeedstockHeuristic {
    fn reclassify(
        &self,
        unit: &ProductionUnit,
        current: TechnologyClass,
        co_located: &[TechnologyClass],
    ) -> Option<TechnologyClass> {
        if current.is_reduced_iron() {
            if current != TechnologyClass::ReducedIronHydrogen && self.is_hydrogen_plant(unit) {
                return Some(TechnologyClass::ReducedIronHydrogen);
            }
            return None;
        }

        if current != TechnologyClass::ScrapRoute {
            return None;
        }
        if !co_located.iter().any(|c| c.is_reduced_iron()) {
            return None;
        }
        if self.is_hydrogen_plant(unit) {
            return Some(TechnologyClass::ReducedIronHydrogen);
        }

        [
            TechnologyClass::ReducedIronHydrogen,
            TechnologyClass::ReducedIronCoal,
            TechnologyClass::ReducedIronGas,
        ]
        .into_iter()
        .find(|candidate| co_located.contains(candidate))
    }
}

/// 对全台账推断工艺路线并应用共址改判
///
/// # 返回
/// 与输入顺序一致的 (工艺路线, 来源)
pub fn classify_fleet(
    units: &[ProductionUnit],
    config: &TechnologyConfig,
    heuristic: &dyn FeedstockHeuristic,
) -> Vec<(TechnologyClass, TechnologySource)> {
    let mut classes: Vec<(TechnologyClass, TechnologySource)> = units
        .iter()
        .map(|u| TechnologyCore::classify(u, config))
        .collect();

    let mut by_plant: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, unit) in units.iter().enumerate() {
        by_plant.entry(unit.plant_id.as_str()).or_default().push(idx);
    }

    let mut updates = Vec::new();
    for indices in by_plant.values() {
        for &idx in indices {
            // 显式声明不改判
            if classes[idx].1 == TechnologySource::Declared {
                continue;
            }
            let co_located: Vec<TechnologyClass> = indices
                .iter()
                .filter(|&&other| other != idx)
                .map(|&other| classes[other].0)
                .collect();
            if let Some(new_class) = heuristic.reclassify(&units[idx], classes[idx].0, &co_located) {
                updates.push((idx, new_class));
            }
        }
    }

    for (idx, new_class) in updates {
        classes[idx] = (new_class, TechnologySource::CoLocation);
    }
    classes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::LifecycleStatus;

    fn unit(plant_id: &str, country: &str) -> ProductionUnit {
        ProductionUnit {
            unit_id: format!("{}-U", plant_id),
            plant_id: plant_id.to_string(),
            unit_name: String::new(),
            plant_name: format!("{} Works", plant_id),
            country: country.to_string(),
            capacity_per_year: 1.0,
            lifecycle_status: LifecycleStatus::Operating,
            unit_start_year: Some(2000),
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

    #[test]
    fn test_dominance_rule_larger_capacity_wins() {
        let config = TechnologyConfig::default();
        let mut u = unit("P1", "Germany");
        u.primary_capacity = Some(2.0);
        u.reduced_iron_capacity = Some(3.0);
        assert_eq!(
            TechnologyCore::classify(&u, &config),
            (TechnologyClass::ReducedIronGas, TechnologySource::CapacityDominance)
        );

        u.primary_capacity = Some(3.0);
        assert_eq!(
            TechnologyCore::classify(&u, &config).0,
            TechnologyClass::PrimaryRoute
        );
    }

    #[test]
    fn test_coal_country_and_reductant_text() {
        let config = TechnologyConfig::default();
        let mut u = unit("P1", "India");
        u.reduced_iron_capacity = Some(1.0);
        assert_eq!(TechnologyCore::classify(&u, &config).0, TechnologyClass::ReducedIronCoal);

        u.reductant_text = Some("Natural gas".to_string());
        assert_eq!(TechnologyCore::classify(&u, &config).0, TechnologyClass::ReducedIronGas);
    }

    #[test]
    fn test_text_fallback_then_default() {
        let config = TechnologyConfig::default();
        let mut u = unit("P1", "Japan");
        u.equipment_text = Some("EAF; ladle furnace".to_string());
        assert_eq!(
            TechnologyCore::classify(&u, &config),
            (TechnologyClass::ScrapRoute, TechnologySource::TextFallback)
        );

        u.equipment_text = Some("rolling mill".to_string());
        assert_eq!(
            TechnologyCore::classify(&u, &config),
            (TechnologyClass::PrimaryRoute, TechnologySource::Default)
        );
    }

    #[test]
    fn test_scrap_unit_next_to_reduced_iron_is_reclassified() {
        let config = TechnologyConfig::default();
        let heuristic = DefaultFeedstockHeuristic::new(&config).unwrap();

        let mut eaf = unit("P1", "India");
        eaf.unit_id = "P1-EAF".to_string();
        eaf.scrap_capacity = Some(1.0);
        let mut dri = unit("P1", "India");
        dri.unit_id = "P1-DRI".to_string();
        dri.reduced_iron_capacity = Some(1.0);
        let mut other = unit("P2", "India");
        other.scrap_capacity = Some(1.0);

        let classes = classify_fleet(&[eaf, dri, other], &config, &heuristic);
        assert_eq!(classes[0], (TechnologyClass::ReducedIronCoal, TechnologySource::CoLocation));
        assert_eq!(classes[1].0, TechnologyClass::ReducedIronCoal);
        assert_eq!(classes[2].0, TechnologyClass::ScrapRoute);
    }

    #[test]
    fn test_hydrogen_plant_exception() {
        let config = TechnologyConfig::default();
        let heuristic = DefaultFeedstockHeuristic::new(&config).unwrap();
        let mut dri = unit("P9", "Sweden");
        dri.plant_name = "HYBRIT demonstration".to_string();
        dri.reduced_iron_capacity = Some(0.5);

        let classes = classify_fleet(&[dri], &config, &heuristic);
        assert_eq!(classes[0].0, TechnologyClass::ReducedIronHydrogen);
    }
}
