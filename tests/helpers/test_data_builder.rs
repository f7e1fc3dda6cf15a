// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use steel_apa::domain::entity::CanonicalEntity;
use steel_apa::domain::observation::{EmissionFactorEntry, OutputObservation, TrustedPoint};
use steel_apa::domain::types::{LifecycleStatus, TechnologyClass};
use steel_apa::domain::unit::ProductionUnit;
use steel_apa::engine::emission_factor::RegionMap;
use steel_apa::engine::LoadedContextBuilder;
use steel_apa::EngineConfig;

// ==========================================
// ProductionUnit 构建器
// ==========================================

pub struct UnitBuilder {
    unit_id: String,
    plant_id: String,
    plant_name: String,
    country: String,
    capacity: f64,
    status: LifecycleStatus,
    start_year: Option<i32>,
    announcement_year: Option<i32>,
    retirement_year: Option<i32>,
    owner: String,
    technology: Option<TechnologyClass>,
}

impl UnitBuilder {
    pub fn new(unit_id: &str) -> Self {
        Self {
            unit_id: unit_id.to_string(),
            plant_id: format!("P-{}", unit_id),
            plant_name: format!("{} Works", unit_id),
            country: "R1".to_string(),
            capacity: 1.0,
            status: LifecycleStatus::Operating,
            start_year: Some(2000),
            announcement_year: None,
            retirement_year: None,
            owner: String::new(),
            technology: Some(TechnologyClass::PrimaryRoute),
        }
    }

    pub fn plant(mut self, plant_id: &str, plant_name: &str) -> Self {
        self.plant_id = plant_id.to_string();
        self.plant_name = plant_name.to_string();
        self
    }

    pub fn country(mut self, country: &str) -> Self {
        self.country = country.to_string();
        self
    }

    pub fn capacity(mut self, capacity: f64) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn status(mut self, status: LifecycleStatus) -> Self {
        self.status = status;
        self
    }

    pub fn start_year(mut self, year: i32) -> Self {
        self.start_year = Some(year);
        self
    }

    pub fn no_start_year(mut self) -> Self {
        self.start_year = None;
        self
    }

    pub fn announced_retirement(mut self, year: i32) -> Self {
        self.announcement_year = Some(year);
        self
    }

    pub fn retirement_year(mut self, year: i32) -> Self {
        self.retirement_year = Some(year);
        self
    }

    pub fn owner(mut self, owner: &str) -> Self {
        self.owner = owner.to_string();
        self
    }

    pub fn technology(mut self, technology: TechnologyClass) -> Self {
        self.technology = Some(technology);
        self
    }

    pub fn build(self) -> ProductionUnit {
        ProductionUnit {
            unit_id: self.unit_id,
            plant_id: self.plant_id,
            unit_name: String::new(),
            plant_name: self.plant_name,
            country: self.country,
            capacity_per_year: self.capacity,
            lifecycle_status: self.status,
            unit_start_year: self.start_year,
            plant_start_year: None,
            pre_retirement_announcement_year: self.announcement_year,
            retirement_year: self.retirement_year,
            owning_entity_raw: self.owner,
            declared_technology: self.technology,
            primary_capacity: None,
            reduced_iron_capacity: None,
            scrap_capacity: None,
            equipment_text: None,
            reductant_text: None,
        }
    }
}

// ==========================================
// 排放因子与上下文
// ==========================================

/// 不随年份衰减的因子条目
pub fn flat_factor(region: &str, technology: TechnologyClass, factor: f64) -> EmissionFactorEntry {
    EmissionFactorEntry {
        region: region.to_string(),
        technology_class: technology,
        base_factor: factor,
        reference_year: 2020,
        annual_improvement: None,
    }
}

/// 区域 R1: 长流程 2.0, 电炉 0.4
pub fn r1_factors() -> Vec<EmissionFactorEntry> {
    vec![
        flat_factor("R1", TechnologyClass::PrimaryRoute, 2.0),
        flat_factor("R1", TechnologyClass::ScrapRoute, 0.4),
        flat_factor("R2", TechnologyClass::PrimaryRoute, 1.8),
        flat_factor("R2", TechnologyClass::ScrapRoute, 0.3),
    ]
}

/// 预置 R1/R2 因子表的上下文构建器
pub fn context_builder(units: Vec<ProductionUnit>, entities: Vec<CanonicalEntity>) -> LoadedContextBuilder {
    LoadedContextBuilder::new(EngineConfig::default())
        .units(units)
        .entities(entities)
        .emission_factors(r1_factors())
        .regions(RegionMap::from_pairs([("R1", "R1"), ("R2", "R2")]))
}

pub fn observation(entity: &str, year: i32, quantity: f64, source_id: &str, rank: u32) -> OutputObservation {
    OutputObservation {
        entity: entity.to_string(),
        year,
        quantity,
        source_id: source_id.to_string(),
        priority_rank: rank,
    }
}

pub fn trusted(entity: &str, year: i32, emissions: f64, output: Option<f64>) -> TrustedPoint {
    TrustedPoint {
        entity: entity.to_string(),
        year,
        emissions,
        output,
    }
}
