// ==========================================
// 钢铁资产级排放核算引擎 - 多源产量核定
// ==========================================
// 职责: 主体-年份多来源观测 → 单一核定值; 窗口内缺失年份按产能补缺
// 规则: 排除规则先于排序; 优先级数值越小越优先; 补缺值必须带方法标签
// ==========================================

use crate::config::engine_config::ReconciliationConfig;
use crate::domain::observation::{ExclusionRule, OutputObservation, ReconciledOutput};
use crate::domain::types::{OutputMethod, SourceAgreement};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, instrument, warn};

/// 产能份额估算的来源标识
pub const CAPACITY_ESTIMATE_SOURCE: &str = "capacity_estimate";

// ==========================================
// CapacityProvider - 活跃产能查询接口
// ==========================================
pub trait CapacityProvider {
    /// 主体在指定年份的活跃产能（历史口径）
    ///
    /// # 返回
    /// - None: 主体无法解析或无装置
    fn active_capacity(&self, entity: &str, year: i32) -> Option<f64>;
}

// ==========================================
// MultiSourceReconciler - 多源核定器
// ==========================================
pub struct MultiSourceReconciler {
    config: ReconciliationConfig,
}

impl MultiSourceReconciler {
    pub fn new(config: ReconciliationConfig) -> Self {
        Self { config }
    }

    fn is_valid(obs: &OutputObservation) -> bool {
        obs.quantity.is_finite() && obs.quantity > 0.0
    }

    /// 选取单一 (主体, 年份) 的核定值
    ///
    /// # 规则
    /// 1. 剔除命中排除规则的观测
    /// 2. 剔除非正/非有限观测
    /// 3. 取优先级最小者; 同级取来源 ID 字典序最小者
    /// 4. 有效来源 ≥ 2 时,按核定值偏离中位数的比例判定一致性
    /// 5. 核定值超出合理上限时打质量标记（不丢弃）
    pub fn select(
        &self,
        entity: &str,
        year: i32,
        observations: &[OutputObservation],
        exclusions: &HashSet<ExclusionRule>,
    ) -> Option<ReconciledOutput> {
        let candidates: Vec<&OutputObservation> = observations
            .iter()
            .filter(|o| o.entity == entity && o.year == year)
            .filter(|o| !exclusions.contains(&exclusion_key(o)))
            .filter(|o| Self::is_valid(o))
            .collect();

        let selected = candidates.iter().min_by(|a, b| {
            a.priority_rank
                .cmp(&b.priority_rank)
                .then_with(|| a.source_id.cmp(&b.source_id))
        })?;

        let quantities: Vec<f64> = candidates.iter().map(|o| o.quantity).collect();
        let (agreement, spread) = self.agreement(selected.quantity, &quantities);
        if agreement == SourceAgreement::Divergent {
            debug!(
                entity = %entity,
                year,
                source_id = %selected.source_id,
                spread = spread.unwrap_or_default(),
                "核定值与其他来源分歧较大"
            );
        }

        let mut quality_flags = Vec::new();
        if selected.quantity > self.config.suspicious_output_max {
            warn!(
                entity = %entity,
                year,
                quantity = selected.quantity,
                limit = self.config.suspicious_output_max,
                "核定产量超出合理上限,保留并标记"
            );
            quality_flags.push(format!(
                "产量 {:.1} Mt 超出合理上限 {:.1} Mt",
                selected.quantity, self.config.suspicious_output_max
            ));
        }

        Some(ReconciledOutput {
            entity: selected.entity.clone(),
            year: selected.year,
            quantity: selected.quantity,
            source_id: selected.source_id.clone(),
            method: OutputMethod::Observed,
            calibrated_utilization: None,
            calibration_years: Vec::new(),
            source_count: candidates.len(),
            source_spread: spread,
            agreement,
            quality_flags,
        })
    }

    /// 来源一致性
    ///
    /// # 返回
    /// - (一致性等级, (最大 − 最小) / 中位数)
    /// - 来源不足 2 个: (NotCompared, None)
    fn agreement(&self, selected: f64, quantities: &[f64]) -> (SourceAgreement, Option<f64>) {
        if quantities.len() < 2 {
            return (SourceAgreement::NotCompared, None);
        }
        let mut sorted = quantities.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        let spread = (sorted[sorted.len() - 1] - sorted[0]) / median;
        let deviation = (selected - median).abs() / median;
        let agreement = if deviation <= self.config.agreement_strong_tolerance {
            SourceAgreement::Strong
        } else if deviation <= self.config.agreement_partial_tolerance {
            SourceAgreement::Partial
        } else {
            SourceAgreement::Divergent
        };
        (agreement, Some(spread))
    }

    /// 核定主体全部年份（观测 + 补缺）
    ///
    /// # 返回
    /// 按年份升序的核定序列
    #[instrument(skip(self, observations, exclusions, capacity), fields(entity = %entity))]
    pub fn reconcile_entity(
        &self,
        entity: &str,
        observations: &[OutputObservation],
        exclusions: &HashSet<ExclusionRule>,
        capacity: &dyn CapacityProvider,
    ) -> Vec<ReconciledOutput> {
        let mut years: Vec<i32> = Vec::new();
        for obs in observations.iter().filter(|o| o.entity == entity) {
            if !Self::is_valid(obs) {
                warn!(
                    entity = %entity,
                    year = obs.year,
                    source_id = %obs.source_id,
                    quantity = obs.quantity,
                    "观测值非正或非有限，已丢弃"
                );
                continue;
            }
            if exclusions.contains(&exclusion_key(obs)) {
                debug!(year = obs.year, source_id = %obs.source_id, "观测命中排除规则");
            }
            years.push(obs.year);
        }
        years.sort_unstable();
        years.dedup();

        let mut by_year: BTreeMap<i32, ReconciledOutput> = BTreeMap::new();
        for year in years {
            if let Some(selected) = self.select(entity, year, observations, exclusions) {
                by_year.insert(year, selected);
            }
        }

        let observed: Vec<ReconciledOutput> = by_year.values().cloned().collect();
        if let Some((utilization, calibration_years)) = self.calibrate(entity, &observed, capacity) {
            for year in self.config.gap_fill_start_year..=self.config.gap_fill_end_year {
                if by_year.contains_key(&year) {
                    continue;
                }
                let cap = match capacity.active_capacity(entity, year) {
                    Some(c) if c > 0.0 => c,
                    _ => continue,
                };
                debug!(year, capacity = cap, utilization, "产能估算补缺");
                by_year.insert(
                    year,
                    ReconciledOutput {
                        entity: entity.to_string(),
                        year,
                        quantity: cap * utilization,
                        source_id: CAPACITY_ESTIMATE_SOURCE.to_string(),
                        method: OutputMethod::CapacityEstimate,
                        calibrated_utilization: Some(utilization),
                        calibration_years: calibration_years.clone(),
                        source_count: 0,
                        source_spread: None,
                        agreement: SourceAgreement::NotCompared,
                        quality_flags: Vec::new(),
                    },
                );
            }
        }

        by_year.into_values().collect()
    }

    /// 校准利用率
    ///
    /// # 规则
    /// - 逐观测年份计算 产量 / 活跃产能
    /// - 丢弃区间外样本
    /// - 取最早 N 个样本的均值
    ///
    /// # 返回
    /// - Some((利用率, 样本年份))
    /// - None: 无有效样本
    pub fn calibrate(
        &self,
        entity: &str,
        observed: &[ReconciledOutput],
        capacity: &dyn CapacityProvider,
    ) -> Option<(f64, Vec<i32>)> {
        let mut sorted: Vec<&ReconciledOutput> = observed
            .iter()
            .filter(|o| o.method == OutputMethod::Observed)
            .collect();
        sorted.sort_by_key(|o| o.year);

        let samples: Vec<(i32, f64)> = sorted
            .into_iter()
            .filter_map(|o| {
                let cap = capacity.active_capacity(entity, o.year)?;
                if cap <= 0.0 {
                    return None;
                }
                let rate = o.quantity / cap;
                let in_band = rate >= self.config.utilization_sample_min
                    && rate <= self.config.utilization_sample_max;
                if !in_band {
                    debug!(year = o.year, rate, "校准样本越界，已丢弃");
                }
                in_band.then_some((o.year, rate))
            })
            .take(self.config.calibration_sample_count)
            .collect();

        if samples.is_empty() {
            return None;
        }
        let mean = samples.iter().map(|(_, r)| r).sum::<f64>() / samples.len() as f64;
        Some((mean, samples.into_iter().map(|(y, _)| y).collect()))
    }
}

fn exclusion_key(obs: &OutputObservation) -> ExclusionRule {
    ExclusionRule {
        entity: obs.entity.clone(),
        year: obs.year,
        source_id: obs.source_id.clone(),
    }
}
