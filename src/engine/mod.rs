// ==========================================
// 钢铁资产级排放核算引擎 - 引擎层
// ==========================================
// 职责: 装置生命周期、主体归属、产量分配、多源核定、轨迹推演与审计
// 红线: 引擎不做 I/O; 同输入同输出; 估算/跳过的记录必须带来源标签
// ==========================================

pub mod allocator;
pub mod context;
pub mod divergence;
pub mod emission_factor;
pub mod entity_resolver;
pub mod error;
pub mod lifecycle;
pub mod orchestrator;
pub mod ownership;
pub mod ownership_audit;
pub mod pathway;
pub mod projector;
pub mod reconciler;
pub mod technology;

// 重导出核心引擎
pub use allocator::{AllocationResult, OutputAllocator, UnitAllocation};
pub use context::{LoadedContext, LoadedContextBuilder};
pub use divergence::DivergenceAuditor;
pub use emission_factor::{EmissionFactorTable, RegionMap, GLOBAL_REGION};
pub use entity_resolver::{EntityResolver, Resolution, ResolvedUnit};
pub use error::{EngineError, EngineResult};
pub use lifecycle::{ActiveFleet, ActiveUnit, AssetRegistry, LifecycleCore};
pub use orchestrator::{BatchOrchestrator, EntityOutcome, EntityPipeline};
pub use ownership::{combine_equity, OwnerParser};
pub use ownership_audit::{OwnershipAuditResult, OwnershipAuditor};
pub use pathway::{emissions_history, PathwayBuilder};
pub use projector::{CalibratedUtilization, HistoricalPoint, ProjectionInputs, TrajectoryProjector};
pub use reconciler::{CapacityProvider, MultiSourceReconciler, CAPACITY_ESTIMATE_SOURCE};
pub use technology::{DefaultFeedstockHeuristic, FeedstockHeuristic, TechnologyCore};
