// ==========================================
// 钢铁资产级排放核算引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、快照管理
// 存储: config_kv 表 (scope_id + key + value)
// ==========================================

use crate::config::engine_config::{
    AllocationConfig, AuditConfig, LifecycleConfig, ProjectionConfig, ReconciliationConfig,
    TechnologyConfig,
};
use crate::config::engine_config_trait::EngineConfigReader;
use crate::db::{ensure_config_schema, open_sqlite_connection};
use crate::domain::types::{AnnouncedPolicy, TechnologyClass};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例（config_kv 不存在时自动建表）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_config_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
            ensure_config_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取并解析数值配置；格式错误时告警并回落默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr + Copy + std::fmt::Display,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    tracing::warn!(
                        config_key = key,
                        raw_value = %raw,
                        default = %default,
                        "配置值格式错误，使用默认值"
                    );
                    Ok(default)
                }
            },
        }
    }

    /// 读取逗号/分号分隔的列表配置
    fn get_list_or_default(&self, key: &str, default: &[String]) -> Result<Vec<String>, Box<dyn Error>> {
        let value = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default.to_vec()),
        };

        let items: Vec<String> = value
            .split(|c| c == ',' || c == ';')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if items.is_empty() {
            Ok(default.to_vec())
        } else {
            Ok(items)
        }
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 每次批处理记录配置快照,保证结果可复现
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key",
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> Result<usize, Box<dyn Error>> {
        let config_map: HashMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
                params![key, value],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }
}

// ==========================================
// EngineConfigReader Trait 实现
// ==========================================
#[async_trait]
impl EngineConfigReader for ConfigManager {
    async fn get_lifecycle_config(&self) -> Result<LifecycleConfig, Box<dyn Error>> {
        let d = LifecycleConfig::default();
        Ok(LifecycleConfig {
            default_start_year_existing: self
                .get_parsed_or_default(config_keys::DEFAULT_START_YEAR_EXISTING, d.default_start_year_existing)?,
            default_start_year_future: self
                .get_parsed_or_default(config_keys::DEFAULT_START_YEAR_FUTURE, d.default_start_year_future)?,
            pre_retirement_horizon_years: self
                .get_parsed_or_default(config_keys::PRE_RETIREMENT_HORIZON_YEARS, d.pre_retirement_horizon_years)?,
            pre_retirement_fallback_year: self
                .get_parsed_or_default(config_keys::PRE_RETIREMENT_FALLBACK_YEAR, d.pre_retirement_fallback_year)?,
            retired_fallback_year: self
                .get_parsed_or_default(config_keys::RETIRED_FALLBACK_YEAR, d.retired_fallback_year)?,
        })
    }

    async fn get_reconciliation_config(&self) -> Result<ReconciliationConfig, Box<dyn Error>> {
        let d = ReconciliationConfig::default();
        Ok(ReconciliationConfig {
            gap_fill_start_year: self
                .get_parsed_or_default(config_keys::GAP_FILL_START_YEAR, d.gap_fill_start_year)?,
            gap_fill_end_year: self
                .get_parsed_or_default(config_keys::GAP_FILL_END_YEAR, d.gap_fill_end_year)?,
            utilization_sample_min: self
                .get_parsed_or_default(config_keys::UTILIZATION_SAMPLE_MIN, d.utilization_sample_min)?,
            utilization_sample_max: self
                .get_parsed_or_default(config_keys::UTILIZATION_SAMPLE_MAX, d.utilization_sample_max)?,
            calibration_sample_count: self
                .get_parsed_or_default(config_keys::CALIBRATION_SAMPLE_COUNT, d.calibration_sample_count)?,
            agreement_strong_tolerance: self
                .get_parsed_or_default(config_keys::AGREEMENT_STRONG_TOLERANCE, d.agreement_strong_tolerance)?,
            agreement_partial_tolerance: self
                .get_parsed_or_default(config_keys::AGREEMENT_PARTIAL_TOLERANCE, d.agreement_partial_tolerance)?,
            suspicious_output_max: self
                .get_parsed_or_default(config_keys::SUSPICIOUS_OUTPUT_MAX, d.suspicious_output_max)?,
        })
    }

    async fn get_allocation_config(&self) -> Result<AllocationConfig, Box<dyn Error>> {
        let d = AllocationConfig::default();
        Ok(AllocationConfig {
            utilization_max: self
                .get_parsed_or_default(config_keys::ALLOCATION_UTILIZATION_MAX, d.utilization_max)?,
            emissions_sanity_max: self
                .get_parsed_or_default(config_keys::EMISSIONS_SANITY_MAX, d.emissions_sanity_max)?,
        })
    }

    async fn get_projection_config(&self) -> Result<ProjectionConfig, Box<dyn Error>> {
        let d = ProjectionConfig::default();

        let announced_raw = self.get_config_or_default(config_keys::PROJECTION_ANNOUNCED_POLICY, "RELAXED")?;
        let announced_policy = match announced_raw.trim().to_uppercase().as_str() {
            "STRICT" => AnnouncedPolicy::Strict,
            "RELAXED" => AnnouncedPolicy::Relaxed,
            other => {
                tracing::warn!(
                    config_key = config_keys::PROJECTION_ANNOUNCED_POLICY,
                    raw_value = %other,
                    "规划产能口径配置无法识别，使用 RELAXED"
                );
                d.announced_policy
            }
        };

        Ok(ProjectionConfig {
            base_year: self.get_parsed_or_default(config_keys::PROJECTION_BASE_YEAR, d.base_year)?,
            end_year: self.get_parsed_or_default(config_keys::PROJECTION_END_YEAR, d.end_year)?,
            utilization_min: self
                .get_parsed_or_default(config_keys::PROJECTION_UTILIZATION_MIN, d.utilization_min)?,
            utilization_max: self
                .get_parsed_or_default(config_keys::PROJECTION_UTILIZATION_MAX, d.utilization_max)?,
            default_utilization: self
                .get_parsed_or_default(config_keys::PROJECTION_DEFAULT_UTILIZATION, d.default_utilization)?,
            announced_policy,
            anchor_to_historical_allocation: self.get_parsed_or_default(
                config_keys::ANCHOR_TO_HISTORICAL_ALLOCATION,
                d.anchor_to_historical_allocation,
            )?,
            trend_window_start_year: self
                .get_parsed_or_default(config_keys::TREND_WINDOW_START_YEAR, d.trend_window_start_year)?,
            trend_window_end_year: self
                .get_parsed_or_default(config_keys::TREND_WINDOW_END_YEAR, d.trend_window_end_year)?,
            trend_growth_min: self.get_parsed_or_default(config_keys::TREND_GROWTH_MIN, d.trend_growth_min)?,
            trend_growth_max: self.get_parsed_or_default(config_keys::TREND_GROWTH_MAX, d.trend_growth_max)?,
        })
    }

    async fn get_audit_config(&self) -> Result<AuditConfig, Box<dyn Error>> {
        let d = AuditConfig::default();
        Ok(AuditConfig {
            equity_tolerance: self.get_parsed_or_default(config_keys::EQUITY_TOLERANCE, d.equity_tolerance)?,
            minority_stake_threshold: self
                .get_parsed_or_default(config_keys::MINORITY_STAKE_THRESHOLD, d.minority_stake_threshold)?,
            aligned_threshold: self
                .get_parsed_or_default(config_keys::DIVERGENCE_ALIGNED_THRESHOLD, d.aligned_threshold)?,
            minor_threshold: self
                .get_parsed_or_default(config_keys::DIVERGENCE_MINOR_THRESHOLD, d.minor_threshold)?,
            moderate_threshold: self
                .get_parsed_or_default(config_keys::DIVERGENCE_MODERATE_THRESHOLD, d.moderate_threshold)?,
        })
    }

    async fn get_technology_config(&self) -> Result<TechnologyConfig, Box<dyn Error>> {
        let d = TechnologyConfig::default();

        let default_technology = match self.get_config_value(config_keys::DEFAULT_TECHNOLOGY)? {
            None => d.default_technology,
            Some(raw) => TechnologyClass::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(
                    config_key = config_keys::DEFAULT_TECHNOLOGY,
                    raw_value = %raw,
                    "默认工艺路线无法识别，使用 PRIMARY_ROUTE"
                );
                d.default_technology
            }),
        };

        Ok(TechnologyConfig {
            default_technology,
            coal_reductant_countries: self
                .get_list_or_default(config_keys::COAL_REDUCTANT_COUNTRIES, &d.coal_reductant_countries)?,
            hydrogen_plant_patterns: self
                .get_list_or_default(config_keys::HYDROGEN_PLANT_PATTERNS, &d.hydrogen_plant_patterns)?,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 生命周期
    pub const DEFAULT_START_YEAR_EXISTING: &str = "default_start_year_existing";
    pub const DEFAULT_START_YEAR_FUTURE: &str = "default_start_year_future";
    pub const PRE_RETIREMENT_HORIZON_YEARS: &str = "pre_retirement_horizon_years";
    pub const PRE_RETIREMENT_FALLBACK_YEAR: &str = "pre_retirement_fallback_year";
    pub const RETIRED_FALLBACK_YEAR: &str = "retired_fallback_year";

    // 核定与补缺
    pub const GAP_FILL_START_YEAR: &str = "gap_fill_start_year";
    pub const GAP_FILL_END_YEAR: &str = "gap_fill_end_year";
    pub const UTILIZATION_SAMPLE_MIN: &str = "utilization_sample_min";
    pub const UTILIZATION_SAMPLE_MAX: &str = "utilization_sample_max";
    pub const CALIBRATION_SAMPLE_COUNT: &str = "calibration_sample_count";
    pub const AGREEMENT_STRONG_TOLERANCE: &str = "agreement_strong_tolerance";
    pub const AGREEMENT_PARTIAL_TOLERANCE: &str = "agreement_partial_tolerance";
    pub const SUSPICIOUS_OUTPUT_MAX: &str = "suspicious_output_max";

    // 分配
    pub const ALLOCATION_UTILIZATION_MAX: &str = "allocation_utilization_max";
    pub const EMISSIONS_SANITY_MAX: &str = "emissions_sanity_max";

    // 预测
    pub const PROJECTION_BASE_YEAR: &str = "projection_base_year";
    pub const PROJECTION_END_YEAR: &str = "projection_end_year";
    pub const PROJECTION_UTILIZATION_MIN: &str = "projection_utilization_min";
    pub const PROJECTION_UTILIZATION_MAX: &str = "projection_utilization_max";
    pub const PROJECTION_DEFAULT_UTILIZATION: &str = "projection_default_utilization";
    pub const PROJECTION_ANNOUNCED_POLICY: &str = "projection_announced_policy";
    pub const ANCHOR_TO_HISTORICAL_ALLOCATION: &str = "anchor_to_historical_allocation";
    pub const TREND_WINDOW_START_YEAR: &str = "trend_window_start_year";
    pub const TREND_WINDOW_END_YEAR: &str = "trend_window_end_year";
    pub const TREND_GROWTH_MIN: &str = "trend_growth_min";
    pub const TREND_GROWTH_MAX: &str = "trend_growth_max";

    // 审计
    pub const EQUITY_TOLERANCE: &str = "equity_tolerance";
    pub const MINORITY_STAKE_THRESHOLD: &str = "minority_stake_threshold";
    pub const DIVERGENCE_ALIGNED_THRESHOLD: &str = "divergence_aligned_threshold";
    pub const DIVERGENCE_MINOR_THRESHOLD: &str = "divergence_minor_threshold";
    pub const DIVERGENCE_MODERATE_THRESHOLD: &str = "divergence_moderate_threshold";

    // 工艺
    pub const DEFAULT_TECHNOLOGY: &str = "default_technology";
    pub const COAL_REDUCTANT_COUNTRIES: &str = "coal_reductant_countries";
    pub const HYDROGEN_PLANT_PATTERNS: &str = "hydrogen_plant_patterns";
}
