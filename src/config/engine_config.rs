// ==========================================
// 钢铁资产级排放核算引擎 - 引擎配置值对象
// ==========================================
// 职责: 汇总各引擎使用的阈值/默认年份/合理区间
// 红线: 构建后只读; Default 即文档默认值
// ==========================================

use crate::config::engine_config_trait::EngineConfigReader;
use crate::domain::types::{AnnouncedPolicy, TechnologyClass};
use serde::{Deserialize, Serialize};
use std::error::Error;

/// 生命周期推断默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    pub default_start_year_existing: i32,
    pub default_start_year_future: i32,
    pub pre_retirement_horizon_years: i32,
    pub pre_retirement_fallback_year: i32,
    pub retired_fallback_year: i32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            default_start_year_existing: 2000,
            default_start_year_future: 2025,
            pre_retirement_horizon_years: 5,
            pre_retirement_fallback_year: 2030,
            retired_fallback_year: 2024,
        }
    }
}

/// 多源核定与补缺
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    pub gap_fill_start_year: i32,
    pub gap_fill_end_year: i32,
    pub utilization_sample_min: f64,
    pub utilization_sample_max: f64,
    pub calibration_sample_count: usize,
    /// 核定值偏离来源中位数的强一致阈值（相对值）
    pub agreement_strong_tolerance: f64,
    /// 部分一致阈值
    pub agreement_partial_tolerance: f64,
    /// 核定产量合理上限 (Mt),超出只标记
    pub suspicious_output_max: f64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            gap_fill_start_year: 2014,
            gap_fill_end_year: 2019,
            utilization_sample_min: 0.1,
            utilization_sample_max: 1.5,
            calibration_sample_count: 3,
            agreement_strong_tolerance: 0.15,
            agreement_partial_tolerance: 0.30,
            suspicious_output_max: 100.0,
        }
    }
}

/// 产量分配合理性
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationConfig {
    pub utilization_max: f64,
    pub emissions_sanity_max: f64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            utilization_max: 1.5,
            emissions_sanity_max: 200.0,
        }
    }
}

/// 轨迹预测
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    pub base_year: i32,
    pub end_year: i32,
    pub utilization_min: f64,
    pub utilization_max: f64,
    pub default_utilization: f64,
    pub announced_policy: AnnouncedPolicy,
    pub anchor_to_historical_allocation: bool,
    /// 趋势外推取样窗口（含两端）
    pub trend_window_start_year: i32,
    pub trend_window_end_year: i32,
    /// 复合增长率截断区间
    pub trend_growth_min: f64,
    pub trend_growth_max: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            base_year: 2024,
            end_year: 2050,
            utilization_min: 0.40,
            utilization_max: 1.00,
            default_utilization: 0.80,
            announced_policy: AnnouncedPolicy::Relaxed,
            anchor_to_historical_allocation: true,
            trend_window_start_year: 2021,
            trend_window_end_year: 2023,
            trend_growth_min: -0.10,
            trend_growth_max: 0.05,
        }
    }
}

/// 审计阈值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    pub equity_tolerance: f64,
    pub minority_stake_threshold: f64,
    pub aligned_threshold: f64,
    pub minor_threshold: f64,
    pub moderate_threshold: f64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            equity_tolerance: 0.02,
            minority_stake_threshold: 0.5,
            aligned_threshold: 0.05,
            minor_threshold: 0.15,
            moderate_threshold: 0.30,
        }
    }
}

/// 工艺推断
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnologyConfig {
    pub default_technology: TechnologyClass,
    /// 直接还原默认煤基的国家
    pub coal_reductant_countries: Vec<String>,
    /// 强制判为氢基的厂名规则
    pub hydrogen_plant_patterns: Vec<String>,
}

impl Default for TechnologyConfig {
    fn default() -> Self {
        Self {
            default_technology: TechnologyClass::PrimaryRoute,
            coal_reductant_countries: vec![
                "India".to_string(),
                "China".to_string(),
                "South Africa".to_string(),
                "New Zealand".to_string(),
            ],
            hydrogen_plant_patterns: vec![
                "HYBRIT".to_string(),
                "H2 Green Steel".to_string(),
                "Salzgitter Flachstahl.*DRI".to_string(),
            ],
        }
    }
}

// ==========================================
// EngineConfig - 引擎配置总表
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub lifecycle: LifecycleConfig,
    pub reconciliation: ReconciliationConfig,
    pub allocation: AllocationConfig,
    pub projection: ProjectionConfig,
    pub audit: AuditConfig,
    pub technology: TechnologyConfig,
}

impl EngineConfig {
    /// 从配置读取器加载全部配置
    ///
    /// # 参数
    /// - reader: 配置读取器（ConfigManager 或测试桩）
    pub async fn load<C: EngineConfigReader + ?Sized>(reader: &C) -> Result<Self, Box<dyn Error>> {
        let config = Self {
            lifecycle: reader.get_lifecycle_config().await?,
            reconciliation: reader.get_reconciliation_config().await?,
            allocation: reader.get_allocation_config().await?,
            projection: reader.get_projection_config().await?,
            audit: reader.get_audit_config().await?,
            technology: reader.get_technology_config().await?,
        };
        config.validate()?;
        Ok(config)
    }

    /// 结构性校验（区间上下界、年份顺序）
    pub fn validate(&self) -> Result<(), String> {
        if self.projection.base_year > self.projection.end_year {
            return Err(format!(
                "预测基年 {} 晚于结束年 {}",
                self.projection.base_year, self.projection.end_year
            ));
        }
        if self.projection.utilization_min > self.projection.utilization_max {
            return Err("预测利用率区间下界大于上界".to_string());
        }
        if self.reconciliation.utilization_sample_min > self.reconciliation.utilization_sample_max {
            return Err("校准利用率样本区间下界大于上界".to_string());
        }
        if self.reconciliation.gap_fill_start_year > self.reconciliation.gap_fill_end_year {
            return Err("补缺窗口起始年晚于结束年".to_string());
        }
        if self.reconciliation.calibration_sample_count == 0 {
            return Err("校准样本数必须大于 0".to_string());
        }
        if self.reconciliation.agreement_strong_tolerance
            > self.reconciliation.agreement_partial_tolerance
        {
            return Err("来源一致性阈值必须递增".to_string());
        }
        if self.projection.trend_window_start_year >= self.projection.trend_window_end_year {
            return Err("趋势窗口至少跨两个年份".to_string());
        }
        if self.projection.trend_growth_min > self.projection.trend_growth_max {
            return Err("趋势增长率区间下界大于上界".to_string());
        }
        let audit = &self.audit;
        if !(audit.aligned_threshold <= audit.minor_threshold
            && audit.minor_threshold <= audit.moderate_threshold)
        {
            return Err("偏差分级阈值必须递增".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_horizon() {
        let mut config = EngineConfig::default();
        config.projection.base_year = 2060;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_agreement_tolerances() {
        let mut config = EngineConfig::default();
        config.reconciliation.agreement_strong_tolerance = 0.4;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.projection.trend_window_end_year = config.projection.trend_window_start_year;
        assert!(config.validate().is_err());
    }
}
