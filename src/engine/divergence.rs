// ==========================================
// 钢铁资产级排放核算引擎 - 外部轨迹偏差审计
// ==========================================
// 职责: 本方轨迹 vs 独立参照轨迹,逐年分级并给出可能原因
// 红线: 只报告,不修正任何一方
// ==========================================

use crate::config::engine_config::AuditConfig;
use crate::domain::observation::ReferencePoint;
use crate::domain::report::DivergenceRow;
use crate::domain::trajectory::Trajectory;
use crate::domain::types::{DivergenceCause, DivergenceClass};
use tracing::info;

/// 参照值绝对值低于此值时不判定
const REFERENCE_EPSILON: f64 = 1e-3;

pub struct DivergenceAuditor {
    config: AuditConfig,
}

impl DivergenceAuditor {
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    /// 单点分级
    ///
    /// # 返回
    /// (偏差比例, 等级, 原因)
    pub fn classify(
        &self,
        produced: f64,
        reference: f64,
    ) -> (Option<f64>, DivergenceClass, DivergenceCause) {
        if reference.abs() < REFERENCE_EPSILON {
            return (None, DivergenceClass::Indeterminate, DivergenceCause::NotAssessed);
        }

        let delta = (produced - reference) / reference;
        let magnitude = delta.abs();
        let class = if magnitude < self.config.aligned_threshold {
            DivergenceClass::Aligned
        } else if magnitude < self.config.minor_threshold {
            DivergenceClass::Minor
        } else if magnitude < self.config.moderate_threshold {
            DivergenceClass::Moderate
        } else {
            DivergenceClass::Major
        };

        let cause = if class == DivergenceClass::Aligned {
            DivergenceCause::ConsistentLifecycle
        } else if produced > reference {
            DivergenceCause::ReferenceAssumesMoreClosures
        } else {
            DivergenceCause::ReferenceFewerClosuresOrFactors
        };
        (Some(delta), class, cause)
    }

    /// 审计单条轨迹（按年份对齐,仅同主体同情景的参照点）
    pub fn audit(&self, trajectory: &Trajectory, references: &[ReferencePoint]) -> Vec<DivergenceRow> {
        let mut rows: Vec<DivergenceRow> = references
            .iter()
            .filter(|r| r.entity == trajectory.entity && r.scenario == trajectory.scenario)
            .filter_map(|r| {
                let produced = trajectory.emissions_at(r.year)?;
                let (delta_pct, class, cause) = self.classify(produced, r.emissions);
                Some(DivergenceRow {
                    entity: trajectory.entity.clone(),
                    scenario: trajectory.scenario,
                    year: r.year,
                    produced,
                    reference: r.emissions,
                    delta_pct,
                    class,
                    cause,
                })
            })
            .collect();
        rows.sort_by_key(|r| r.year);

        if !rows.is_empty() {
            let aligned = rows
                .iter()
                .filter(|r| r.class == DivergenceClass::Aligned)
                .count();
            let deltas: Vec<f64> = rows.iter().filter_map(|r| r.delta_pct).collect();
            let mean_delta = if deltas.is_empty() {
                0.0
            } else {
                deltas.iter().sum::<f64>() / deltas.len() as f64
            };
            info!(
                entity = %trajectory.entity,
                scenario = %trajectory.scenario,
                compared = rows.len(),
                aligned,
                mean_delta,
                "偏差审计汇总"
            );
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_thresholds() {
        let auditor = DivergenceAuditor::new(AuditConfig::default());
        assert_eq!(auditor.classify(103.0, 100.0).1, DivergenceClass::Aligned);
        assert_eq!(auditor.classify(110.0, 100.0).1, DivergenceClass::Minor);
        assert_eq!(auditor.classify(80.0, 100.0).1, DivergenceClass::Moderate);
        assert_eq!(auditor.classify(140.0, 100.0).1, DivergenceClass::Major);
    }

    #[test]
    fn test_classify_cause_direction() {
        let auditor = DivergenceAuditor::new(AuditConfig::default());
        assert_eq!(
            auditor.classify(140.0, 100.0).2,
            DivergenceCause::ReferenceAssumesMoreClosures
        );
        assert_eq!(
            auditor.classify(60.0, 100.0).2,
            DivergenceCause::ReferenceFewerClosuresOrFactors
        );
        assert_eq!(
            auditor.classify(101.0, 100.0).2,
            DivergenceCause::ConsistentLifecycle
        );
    }

    #[test]
    fn test_near_zero_reference_is_indeterminate() {
        let auditor = DivergenceAuditor::new(AuditConfig::default());
        let (delta, class, cause) = auditor.classify(5.0, 0.0);
        assert_eq!(delta, None);
        assert_eq!(class, DivergenceClass::Indeterminate);
        assert_eq!(cause, DivergenceCause::NotAssessed);
    }
}
