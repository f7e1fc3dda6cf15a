// ==========================================
// 钢铁资产级排放核算引擎 - 生产装置实体
// ==========================================
// 职责: 台账装置记录 + 一次性计算的派生字段
// 红线: 产能非负; 派生字段在上下文构建时计算一次,之后只读
// ==========================================

use crate::domain::types::{
    LifecycleStatus, RetirementSource, StartYearSource, TechnologyClass, TechnologySource,
};
use serde::{Deserialize, Serialize};

// ==========================================
// ProductionUnit - 台账装置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionUnit {
    // ===== 标识 =====
    pub unit_id: String,
    pub plant_id: String,
    pub unit_name: String,
    pub plant_name: String,
    pub country: String,

    // ===== 产能与状态 =====
    pub capacity_per_year: f64, // 年产能 (Mt/年)
    pub lifecycle_status: LifecycleStatus,

    // ===== 年份（台账原值,可能缺失）=====
    pub unit_start_year: Option<i32>,
    pub plant_start_year: Option<i32>,
    pub pre_retirement_announcement_year: Option<i32>,
    pub retirement_year: Option<i32>,

    // ===== 股东原始文本 =====
    pub owning_entity_raw: String,

    // ===== 工艺推断输入 =====
    pub declared_technology: Option<TechnologyClass>,
    pub primary_capacity: Option<f64>,       // 高炉分项产能
    pub reduced_iron_capacity: Option<f64>,  // 直接还原分项产能
    pub scrap_capacity: Option<f64>,         // 电炉分项产能
    pub equipment_text: Option<String>,
    pub reductant_text: Option<String>,
}

impl ProductionUnit {
    /// 用于名称规则匹配的展示名（装置名 + 厂名）
    pub fn display_name(&self) -> String {
        if self.unit_name.is_empty() || self.unit_name == self.plant_name {
            self.plant_name.clone()
        } else {
            format!("{} {}", self.plant_name, self.unit_name)
        }
    }
}

// ==========================================
// UnitDerivation - 派生字段（缓存）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDerivation {
    pub start_year: i32,
    pub start_year_source: StartYearSource,
    pub retirement_year: Option<i32>,
    pub retirement_source: Option<RetirementSource>,
    pub technology_class: TechnologyClass,
    pub technology_source: TechnologySource,
    pub region: String,
}

// ==========================================
// RegisteredUnit - 装置 + 派生字段
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredUnit {
    pub unit: ProductionUnit,
    pub derived: UnitDerivation,
}
