// ==========================================
// 钢铁资产级排放核算引擎 - 引擎配置读取 Trait
// ==========================================
// 职责: 定义引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::engine_config::{
    AllocationConfig, AuditConfig, LifecycleConfig, ProjectionConfig, ReconciliationConfig,
    TechnologyConfig,
};
use async_trait::async_trait;
use std::error::Error;

// ==========================================
// EngineConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait EngineConfigReader: Send + Sync {
    /// 生命周期推断默认值
    ///
    /// # 默认值
    /// - 存量开工年 2000 / 新增开工年 2025
    /// - 宣布退役 +5 年, 无年份时 2030
    /// - 已退役无年份时 2024
    async fn get_lifecycle_config(&self) -> Result<LifecycleConfig, Box<dyn Error>>;

    /// 多源核定与补缺窗口
    ///
    /// # 默认值
    /// - 补缺窗口 2014..=2019
    /// - 样本利用率区间 [0.1, 1.5], 取最早 3 年
    /// - 来源一致性阈值 0.15 / 0.30, 产量合理上限 100 Mt
    async fn get_reconciliation_config(&self) -> Result<ReconciliationConfig, Box<dyn Error>>;

    /// 分配合理性阈值
    ///
    /// # 默认值
    /// - 利用率上限 1.5, 排放上限 200 Mt
    async fn get_allocation_config(&self) -> Result<AllocationConfig, Box<dyn Error>>;

    /// 预测参数
    ///
    /// # 默认值
    /// - 基年 2024, 结束年 2050
    /// - 利用率区间 [0.40, 1.00], 默认 0.80
    /// - 趋势窗口 2021..=2023, 增长率截断 [-10%, +5%]
    async fn get_projection_config(&self) -> Result<ProjectionConfig, Box<dyn Error>>;

    /// 审计阈值
    async fn get_audit_config(&self) -> Result<AuditConfig, Box<dyn Error>>;

    /// 工艺推断参数
    async fn get_technology_config(&self) -> Result<TechnologyConfig, Box<dyn Error>>;
}
