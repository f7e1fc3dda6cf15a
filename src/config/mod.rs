// ==========================================
// 钢铁资产级排放核算引擎 - 配置层
// ==========================================
// 职责: 引擎阈值/默认值管理
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod engine_config;
pub mod engine_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use engine_config::{
    AllocationConfig, AuditConfig, EngineConfig, LifecycleConfig, ProjectionConfig,
    ReconciliationConfig, TechnologyConfig,
};
pub use engine_config_trait::EngineConfigReader;
