// ==========================================
// 钢铁资产级排放核算引擎 - 排放因子表
// ==========================================
// 职责: (区域, 工艺路线) → 排放因子; 国家 → 区域多对一映射
// 红线: 纯查询,无副作用; 仅一种工艺路线允许随年份衰减
// ==========================================

use crate::domain::observation::EmissionFactorEntry;
use crate::domain::types::TechnologyClass;
use crate::engine::error::{EngineError, EngineResult};
use std::collections::{BTreeSet, HashMap};

/// 兜底区域
pub const GLOBAL_REGION: &str = "Global";

/// 因子基准年
pub const DEFAULT_REFERENCE_YEAR: i32 = 2020;

/// 长流程年改进率
pub const DEFAULT_PRIMARY_IMPROVEMENT: f64 = 0.005;

// ==========================================
// RegionMap - 国家 → 区域
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct RegionMap {
    // key: 小写国家名
    map: HashMap<String, String>,
}

impl RegionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 (国家, 区域) 对构建
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        let map = pairs
            .into_iter()
            .map(|(country, region)| {
                (
                    country.as_ref().trim().to_lowercase(),
                    region.as_ref().trim().to_string(),
                )
            })
            .collect();
        Self { map }
    }

    /// 查询区域; 未登记返回 None
    pub fn get(&self, country: &str) -> Option<&str> {
        self.map.get(&country.trim().to_lowercase()).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// 内置映射（直接国家 / 欧盟成员 / 近似代理）
    pub fn builtin() -> Self {
        let mut pairs: Vec<(&str, &str)> = Vec::new();
        for region in DIRECT_REGIONS {
            pairs.push((region, region));
        }
        pairs.push(("Turkiye", "Turkey"));
        for member in EU_MEMBERS {
            pairs.push((member, "EU"));
        }
        pairs.extend_from_slice(PROXY_REGIONS);
        Self::from_pairs(pairs)
    }
}

// ==========================================
// EmissionFactorTable - 排放因子表
// ==========================================
#[derive(Debug, Clone)]
pub struct EmissionFactorTable {
    entries: HashMap<(String, TechnologyClass), EmissionFactorEntry>,
    regions: RegionMap,
}

impl EmissionFactorTable {
    /// 构建因子表并校验
    ///
    /// # 规则
    /// - 表不能为空
    /// - 因子必须非负且有限
    /// - 最多一种工艺路线携带年改进率
    pub fn new(entries: Vec<EmissionFactorEntry>, regions: RegionMap) -> EngineResult<Self> {
        if entries.is_empty() {
            return Err(EngineError::NoEmissionFactors);
        }

        let mut decaying: BTreeSet<TechnologyClass> = BTreeSet::new();
        let mut map = HashMap::with_capacity(entries.len());
        for entry in entries {
            if !entry.base_factor.is_finite() || entry.base_factor < 0.0 {
                return Err(EngineError::InvalidEmissionFactors(format!(
                    "{}/{} 因子非法: {}",
                    entry.region, entry.technology_class, entry.base_factor
                )));
            }
            if let Some(rate) = entry.annual_improvement {
                if !(0.0..1.0).contains(&rate) {
                    return Err(EngineError::InvalidEmissionFactors(format!(
                        "{}/{} 年改进率非法: {}",
                        entry.region, entry.technology_class, rate
                    )));
                }
                if rate > 0.0 {
                    decaying.insert(entry.technology_class);
                }
            }
            map.insert((entry.region.clone(), entry.technology_class), entry);
        }

        if decaying.len() > 1 {
            return Err(EngineError::InvalidEmissionFactors(format!(
                "仅允许一种工艺路线随年份衰减,实际: {:?}",
                decaying
            )));
        }

        Ok(Self {
            entries: map,
            regions,
        })
    }

    /// 内置因子表
    pub fn builtin() -> EngineResult<Self> {
        Self::new(Self::builtin_entries(), RegionMap::builtin())
    }

    /// 内置因子条目（区域长流程/短流程 + 直接还原技术常数）
    pub fn builtin_entries() -> Vec<EmissionFactorEntry> {
        let mut entries = Vec::new();
        for (region, factor) in PRIMARY_ROUTE_FACTORS {
            entries.push(EmissionFactorEntry {
                region: region.to_string(),
                technology_class: TechnologyClass::PrimaryRoute,
                base_factor: *factor,
                reference_year: DEFAULT_REFERENCE_YEAR,
                annual_improvement: Some(DEFAULT_PRIMARY_IMPROVEMENT),
            });
        }
        for (region, factor) in SCRAP_ROUTE_FACTORS {
            entries.push(EmissionFactorEntry {
                region: region.to_string(),
                technology_class: TechnologyClass::ScrapRoute,
                base_factor: *factor,
                reference_year: DEFAULT_REFERENCE_YEAR,
                annual_improvement: None,
            });
        }
        for (class, factor) in [
            (TechnologyClass::ReducedIronGas, 1.05),
            (TechnologyClass::ReducedIronCoal, 3.10),
            (TechnologyClass::ReducedIronHydrogen, 0.04),
        ] {
            entries.push(EmissionFactorEntry {
                region: GLOBAL_REGION.to_string(),
                technology_class: class,
                base_factor: factor,
                reference_year: DEFAULT_REFERENCE_YEAR,
                annual_improvement: None,
            });
        }
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 国家 → 区域
    ///
    /// # 规则
    /// 1. 映射表登记 → 映射区域
    /// 2. 国家名本身即因子表区域 → 国家名
    /// 3. 否则 → Global
    pub fn region_for(&self, country: &str) -> String {
        if let Some(region) = self.regions.get(country) {
            return region.to_string();
        }
        let trimmed = country.trim();
        if self.entries.keys().any(|(region, _)| region == trimmed) {
            return trimmed.to_string();
        }
        GLOBAL_REGION.to_string()
    }

    /// 查找因子条目（区域 → Global; UNKNOWN → 长流程）
    pub fn entry(&self, region: &str, class: TechnologyClass) -> Option<&EmissionFactorEntry> {
        let found = self
            .entries
            .get(&(region.to_string(), class))
            .or_else(|| self.entries.get(&(GLOBAL_REGION.to_string(), class)));

        match (found, class) {
            (Some(entry), _) => Some(entry),
            (None, TechnologyClass::Unknown) => self.entry(region, TechnologyClass::PrimaryRoute),
            (None, _) => None,
        }
    }

    /// 计算指定年份排放因子
    ///
    /// # 规则
    /// factor(year) = base × (1 − rate)^(year − reference_year)
    pub fn factor(&self, region: &str, class: TechnologyClass, year: i32) -> Option<f64> {
        self.entry(region, class).map(|entry| match entry.annual_improvement {
            Some(rate) if rate > 0.0 => {
                entry.base_factor * (1.0 - rate).powi(year - entry.reference_year)
            }
            _ => entry.base_factor,
        })
    }
}

// ==========================================
// 内置数据 (tCO2 / t 粗钢, 范围一直接排放)
// ==========================================

const PRIMARY_ROUTE_FACTORS: &[(&str, f64)] = &[
    ("Brazil", 2.19),
    ("China", 1.76),
    ("EU", 1.77),
    ("India", 3.72),
    ("Japan", 2.05),
    ("Russia", 2.79),
    ("Serbia", 2.06),
    ("South Africa", 3.57),
    ("South Korea", 2.00),
    ("Taiwan", 2.02),
    ("Turkey", 2.17),
    ("Ukraine", 2.30),
    ("United Kingdom", 2.05),
    ("United States", 1.94),
    ("Australia", 2.31),
    ("New Zealand", 3.10),
    ("Indonesia", 2.31),
    ("Kazakhstan", 2.31),
    ("Canada", 1.84),
    ("Global", 2.314),
];

const SCRAP_ROUTE_FACTORS: &[(&str, f64)] = &[
    ("Belarus", 0.07),
    ("Brazil", 0.05),
    ("China", 0.03),
    ("EU", 0.04),
    ("India", 0.07),
    ("Japan", 0.04),
    ("Russia", 0.07),
    ("Serbia", 0.06),
    ("South Africa", 0.12),
    ("South Korea", 0.03),
    ("Switzerland", 0.08),
    ("Taiwan", 0.02),
    ("Thailand", 0.05),
    ("Turkey", 0.04),
    ("Ukraine", 0.04),
    ("United Kingdom", 0.04),
    ("United States", 0.04),
    ("Australia", 0.04),
    ("New Zealand", 0.04),
    ("Indonesia", 0.04),
    ("Kazakhstan", 0.07),
    ("Canada", 0.04),
    ("Global", 0.051),
];

const DIRECT_REGIONS: &[&str] = &[
    "Belarus", "Brazil", "China", "India", "Japan", "Russia", "Serbia", "South Africa",
    "South Korea", "Switzerland", "Taiwan", "Thailand", "Turkey", "Ukraine", "United Kingdom",
    "United States", "Australia", "New Zealand", "Indonesia", "Kazakhstan", "Canada",
];

const EU_MEMBERS: &[&str] = &[
    "Germany", "France", "Netherlands", "Belgium", "Austria", "Spain", "Italy", "Sweden",
    "Finland", "Poland", "Czech Republic", "Czechia", "Luxembourg", "Romania", "Slovakia",
    "Hungary", "Croatia", "Greece", "Portugal", "Bulgaria", "Slovenia", "Latvia", "Estonia",
    "Lithuania", "Ireland", "Cyprus", "Malta",
];

// 无独立因子的国家按相近区域代理
const PROXY_REGIONS: &[(&str, &str)] = &[
    ("Mexico", "Brazil"),
    ("Argentina", "Brazil"),
    ("Colombia", "Brazil"),
    ("Peru", "Brazil"),
    ("Chile", "Brazil"),
    ("Venezuela", "Brazil"),
    ("Ecuador", "Brazil"),
    ("Bolivia", "Brazil"),
    ("Uruguay", "Brazil"),
    ("Paraguay", "Brazil"),
    ("Trinidad and Tobago", "Brazil"),
    ("Vietnam", "China"),
    ("Malaysia", "China"),
    ("Philippines", "India"),
    ("Bangladesh", "India"),
    ("Pakistan", "India"),
    ("Myanmar", "India"),
    ("Iran", "Turkey"),
    ("Egypt", "Turkey"),
    ("Saudi Arabia", "Turkey"),
    ("United Arab Emirates", "Turkey"),
    ("Qatar", "Turkey"),
    ("Oman", "Turkey"),
    ("Bahrain", "Turkey"),
    ("Kuwait", "Turkey"),
    ("Algeria", "Turkey"),
    ("Libya", "Turkey"),
    ("Tunisia", "Turkey"),
    ("Morocco", "Turkey"),
    ("Norway", "EU"),
];
