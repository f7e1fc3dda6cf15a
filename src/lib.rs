// ==========================================
// 钢铁资产级排放核算引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite（配置）+ CSV/XLSX（输入）
// 系统定位: 资产级产量分配 + 排放轨迹预测 + 外部口径审计
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AnnouncedPolicy, LifecyclePolicy, LifecycleStatus, RetirementMode, Scenario, TechnologyClass,
};

// 领域实体
pub use domain::{
    BatchReport, CanonicalEntity, Equity, OwnershipTransferEvent, ProductionUnit, Trajectory,
};

// 引擎
pub use engine::{
    AssetRegistry, BatchOrchestrator, DivergenceAuditor, EmissionFactorTable, EngineError,
    EngineResult, EntityResolver, LoadedContext, MultiSourceReconciler, OutputAllocator,
    OwnershipAuditor, TrajectoryProjector,
};

// 配置
pub use config::{ConfigManager, EngineConfig};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "钢铁资产级排放核算引擎";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
