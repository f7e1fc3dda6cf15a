// ==========================================
// 钢铁资产级排放核算引擎 - 领域模型层
// ==========================================
// 职责: 定义装置、主体、观测、轨迹与输出行
// 红线: 不含 I/O,不含引擎逻辑
// ==========================================

pub mod entity;
pub mod observation;
pub mod report;
pub mod trajectory;
pub mod types;
pub mod unit;

// 重导出核心类型
pub use entity::{CanonicalEntity, Equity, OwnerShare, OwnershipTransferEvent, ReferenceOwnership};
pub use observation::{
    CommitmentTarget, EmissionFactorEntry, ExclusionRule, OutputObservation, ReconciledOutput,
    ReferencePoint, RegionalTarget, SourceDescriptor, TrustedPoint,
};
pub use report::{
    BatchIssue, BatchReport, DivergenceRow, EntityYearRow, OwnershipMappingRow,
    OwnershipMismatchRow, PathwayRow, TrajectoryRow, UnitAllocationRow,
};
pub use trajectory::{Trajectory, TrajectoryPoint};
pub use types::{
    AnnouncedPolicy, BaselineSource, CommitmentKind, DivergenceCause, DivergenceClass,
    LifecyclePolicy, LifecycleStatus, MatchSource, OutputMethod, OwnershipFlag, PathwayKind,
    RetirementMode, RetirementSource, Scenario, SourceAgreement, SourceKind, StartYearSource,
    TechnologyClass, TechnologySource, TrajectoryMethod, UtilizationSource,
};
pub use unit::{ProductionUnit, RegisteredUnit, UnitDerivation};
