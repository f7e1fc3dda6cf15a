// ==========================================
// 钢铁资产级排放核算引擎 - 批处理编排
// ==========================================
// 职责: 逐主体并行执行 核定 → 历史分配 → 归属审计 → 双情景推演 → 偏差审计
//       → 补充路径（趋势外推 / 减排承诺）
// 红线: 单主体-年份错误记为 BatchIssue,不中断批次;
//       计算期间无 I/O,上下文只读
// ==========================================

use crate::config::engine_config::EngineConfig;
use crate::domain::entity::Equity;
use crate::domain::report::{
    BatchIssue, BatchReport, DivergenceRow, EntityYearRow, OwnershipMappingRow,
    OwnershipMismatchRow, PathwayRow, TrajectoryRow, UnitAllocationRow,
};
use crate::domain::types::{LifecyclePolicy, Scenario};
use crate::engine::allocator::OutputAllocator;
use crate::engine::context::LoadedContext;
use crate::engine::divergence::DivergenceAuditor;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::lifecycle::ActiveFleet;
use crate::engine::ownership_audit::OwnershipAuditor;
use crate::engine::pathway::{emissions_history, PathwayBuilder};
use crate::engine::projector::{HistoricalPoint, ProjectionInputs, TrajectoryProjector};
use crate::engine::reconciler::MultiSourceReconciler;
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 单主体处理结果
#[derive(Debug, Clone, Default)]
pub struct EntityOutcome {
    pub allocations: Vec<UnitAllocationRow>,
    pub entity_years: Vec<EntityYearRow>,
    pub trajectories: Vec<TrajectoryRow>,
    pub ownership: Vec<OwnershipMappingRow>,
    pub mismatches: Vec<OwnershipMismatchRow>,
    pub divergence: Vec<DivergenceRow>,
    pub pathways: Vec<PathwayRow>,
    pub issues: Vec<BatchIssue>,
}

impl EntityOutcome {
    fn issue(&mut self, entity: &str, year: Option<i32>, stage: &str, err: &EngineError) {
        warn!(entity = %entity, year = ?year, stage, error = %err, "批处理问题");
        self.issues.push(BatchIssue {
            entity: entity.to_string(),
            year,
            stage: stage.to_string(),
            message: err.to_string(),
        });
    }
}

// ==========================================
// EntityPipeline - 单主体流水线
// ==========================================
pub struct EntityPipeline {
    reconciler: MultiSourceReconciler,
    allocator: OutputAllocator,
    auditor: OwnershipAuditor,
    projector: TrajectoryProjector,
    divergence: DivergenceAuditor,
    pathways: PathwayBuilder,
}

impl EntityPipeline {
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        Ok(Self {
            reconciler: MultiSourceReconciler::new(config.reconciliation.clone()),
            allocator: OutputAllocator::new(config.allocation.clone()),
            auditor: OwnershipAuditor::new(config.audit.clone())?,
            projector: TrajectoryProjector::new(config.projection.clone()),
            divergence: DivergenceAuditor::new(config.audit.clone()),
            pathways: PathwayBuilder::new(config.projection.clone()),
        })
    }

    /// 处理单个主体
    #[instrument(skip(self, ctx), fields(entity = %entity))]
    pub fn run_entity(&self, ctx: &LoadedContext, entity: &str) -> EntityOutcome {
        let mut outcome = EntityOutcome::default();

        // 1. 多源核定 + 补缺
        let reconciled =
            self.reconciler
                .reconcile_entity(entity, ctx.observations(), ctx.exclusions(), ctx);
        debug!(years = reconciled.len(), "核定完成");

        // 2. 历史年份分配
        let mut historical = Vec::with_capacity(reconciled.len());
        for record in &reconciled {
            let units = match ctx.active_units(entity, record.year, LifecyclePolicy::historical()) {
                Ok(units) => units,
                Err(e) => {
                    outcome.issue(entity, Some(record.year), "resolution", &e);
                    continue;
                }
            };
            let result = match self.allocator.allocate(
                entity,
                record.year,
                record.quantity,
                &units,
                ctx.factors(),
                ctx.regional_targets(entity, record.year),
            ) {
                Ok(result) => result,
                Err(e) => {
                    outcome.issue(entity, Some(record.year), "allocation", &e);
                    continue;
                }
            };

            for violation in &result.violations {
                outcome.issue(entity, Some(record.year), "plausibility", violation);
            }
            historical.push(HistoricalPoint {
                year: record.year,
                output: result.allocated_output,
                emissions: result.emissions,
            });
            outcome.entity_years.push(EntityYearRow {
                entity: entity.to_string(),
                year: record.year,
                target_output: record.quantity,
                output_source_id: record.source_id.clone(),
                output_method: record.method,
                source_count: record.source_count,
                source_agreement: record.agreement,
                source_spread: record.source_spread,
                active_capacity: result.active_capacity,
                utilization: result.utilization,
                allocated_output: result.allocated_output,
                unallocated_output: result.unallocated_output,
                emissions: result.emissions,
                weighted_emission_factor: result.weighted_emission_factor,
                plausibility_flags: record
                    .quality_flags
                    .iter()
                    .cloned()
                    .chain(result.violations.iter().map(|v| v.to_string()))
                    .collect(),
            });
            outcome.allocations.extend(result.to_rows(record.method));
        }

        // 3. 归属审计（参照清单年份 = 推演基年）
        let audit_year = self.projector.config().base_year;
        if let Some(canonical) = ctx.entity(entity) {
            match ctx.active_units(entity, audit_year, LifecyclePolicy::historical()) {
                Ok(units) => {
                    let audit = self.auditor.cross_reference(
                        canonical,
                        audit_year,
                        &units,
                        ctx.reference_ownership(),
                    );
                    for mapping in audit.mappings.iter().filter(|m| m.equity == Equity::Unknown) {
                        let soft = EngineError::EquityUnknown {
                            entity: entity.to_string(),
                            unit_id: mapping.unit_id.clone(),
                        };
                        outcome.issue(entity, Some(audit_year), "ownership", &soft);
                    }
                    outcome.ownership.extend(audit.mappings);
                    outcome.mismatches.extend(audit.mismatches);
                }
                Err(e) => outcome.issue(entity, Some(audit_year), "ownership", &e),
            }
        }

        // 4. 双情景推演 + 5. 偏差审计
        let trusted = ctx.trusted_for(entity);
        let inputs = ProjectionInputs {
            reconciled: &reconciled,
            trusted: &trusted,
            historical: &historical,
        };
        let utilization = self
            .projector
            .calibrate_utilization(entity, &reconciled, ctx);
        for scenario in Scenario::ALL {
            match self
                .projector
                .project(entity, scenario, utilization, inputs, ctx, ctx.factors())
            {
                Ok(trajectory) => {
                    outcome
                        .divergence
                        .extend(self.divergence.audit(&trajectory, ctx.references()));
                    outcome
                        .trajectories
                        .extend(TrajectoryRow::from_trajectory(&trajectory));
                }
                Err(e) => outcome.issue(entity, None, "projection", &e),
            }
        }

        // 6. 补充路径
        let history = emissions_history(&trusted, &historical);
        if let Some(rows) = self.pathways.trend_bau(entity, &history) {
            outcome.pathways.extend(rows);
        }
        if let Some(commitment) = ctx.commitment_for(entity) {
            if let Some(rows) = self.pathways.commitment(commitment, &history) {
                outcome.pathways.extend(rows);
            }
        }

        outcome
    }
}

// ==========================================
// BatchOrchestrator - 批处理编排器
// ==========================================
pub struct BatchOrchestrator {
    pipeline: Arc<EntityPipeline>,
}

impl BatchOrchestrator {
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        Ok(Self {
            pipeline: Arc::new(EntityPipeline::new(config)?),
        })
    }

    /// 执行一次批处理
    ///
    /// # 流程
    /// 每个主体一个阻塞任务（spawn_blocking）,join_all 汇总;
    /// 结果顺序与主体名称顺序一致
    pub async fn run(&self, ctx: Arc<LoadedContext>) -> BatchReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let entities: Vec<String> = ctx.resolver().entity_names().map(str::to_string).collect();
        info!(run_id = %run_id, entities = entities.len(), "批处理开始");

        let tasks = entities.iter().map(|entity| {
            let ctx = Arc::clone(&ctx);
            let pipeline = Arc::clone(&self.pipeline);
            let entity = entity.clone();
            tokio::task::spawn_blocking(move || pipeline.run_entity(&ctx, &entity))
        });
        let joined = join_all(tasks).await;

        let mut report = BatchReport {
            run_id,
            started_at,
            finished_at: started_at,
            allocations: Vec::new(),
            entity_years: Vec::new(),
            trajectories: Vec::new(),
            ownership: Vec::new(),
            mismatches: Vec::new(),
            divergence: Vec::new(),
            pathways: Vec::new(),
            issues: Vec::new(),
        };

        for (entity, result) in entities.iter().zip(joined) {
            match result {
                Ok(outcome) => {
                    report.allocations.extend(outcome.allocations);
                    report.entity_years.extend(outcome.entity_years);
                    report.trajectories.extend(outcome.trajectories);
                    report.ownership.extend(outcome.ownership);
                    report.mismatches.extend(outcome.mismatches);
                    report.divergence.extend(outcome.divergence);
                    report.pathways.extend(outcome.pathways);
                    report.issues.extend(outcome.issues);
                }
                Err(join_err) => {
                    let err = EngineError::TaskFailed(join_err.to_string());
                    error!(entity = %entity, error = %err, "主体任务失败");
                    report.issues.push(BatchIssue {
                        entity: entity.clone(),
                        year: None,
                        stage: "task".to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        report.finished_at = Utc::now();
        info!(
            run_id = %run_id,
            entity_years = report.entity_years.len(),
            trajectory_rows = report.trajectories.len(),
            mismatches = report.mismatches.len(),
            pathway_rows = report.pathways.len(),
            issues = report.issues.len(),
            "批处理完成"
        );
        report
    }
}
