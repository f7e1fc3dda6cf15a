// ==========================================
// 钢铁资产级排放核算引擎 - 主体级补充路径
// ==========================================
// 职责: 主体历史排放 → 近年趋势外推 (BAU) / 减排承诺线性插值
// 红线: 与装置级轨迹并列输出,不参与锚定与偏差审计;
//       数据不足时跳过并记日志,不报错
// ==========================================

use crate::config::engine_config::ProjectionConfig;
use crate::domain::observation::{CommitmentTarget, TrustedPoint};
use crate::domain::report::PathwayRow;
use crate::domain::types::PathwayKind;
use crate::engine::projector::HistoricalPoint;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// 主体历史排放序列（年份升序）
///
/// 同一年份可信序列优先于历史分配结果
pub fn emissions_history(trusted: &[TrustedPoint], historical: &[HistoricalPoint]) -> Vec<(i32, f64)> {
    let mut by_year: BTreeMap<i32, f64> = BTreeMap::new();
    for point in historical.iter().filter(|h| h.emissions.is_finite()) {
        by_year.insert(point.year, point.emissions);
    }
    for point in trusted.iter().filter(|t| t.emissions.is_finite()) {
        by_year.insert(point.year, point.emissions);
    }
    by_year.into_iter().collect()
}

// ==========================================
// PathwayBuilder - 补充路径构建器
// ==========================================
pub struct PathwayBuilder {
    config: ProjectionConfig,
}

impl PathwayBuilder {
    pub fn new(config: ProjectionConfig) -> Self {
        Self { config }
    }

    /// 趋势外推路径
    ///
    /// # 规则
    /// 1. 取样窗口内至少 2 个年份,首末值均 > 0
    /// 2. 复合增长率 = (末值 / 首值)^(1 / 年数) − 1,截断至 [min, max]
    /// 3. 起点: 基年排放,缺失时取最新一年
    /// 4. 起点次年至结束年: 起点值 × (1 + 增长率)^k
    pub fn trend_bau(&self, entity: &str, history: &[(i32, f64)]) -> Option<Vec<PathwayRow>> {
        let window: Vec<&(i32, f64)> = history
            .iter()
            .filter(|(year, _)| {
                (self.config.trend_window_start_year..=self.config.trend_window_end_year)
                    .contains(year)
            })
            .collect();
        let (&&(first_year, first), &&(last_year, last)) = match (window.first(), window.last()) {
            (Some(first), Some(last)) if window.len() >= 2 => (first, last),
            _ => {
                debug!(entity = %entity, points = window.len(), "趋势窗口样本不足,跳过 BAU 路径");
                return None;
            }
        };
        if first <= 0.0 || last <= 0.0 {
            debug!(entity = %entity, first, last, "趋势窗口端点非正,跳过 BAU 路径");
            return None;
        }

        let span = f64::from(last_year - first_year);
        let raw = (last / first).powf(1.0 / span) - 1.0;
        let growth = raw.clamp(self.config.trend_growth_min, self.config.trend_growth_max);

        let &(base_year, base) = history
            .iter()
            .find(|(year, _)| *year == self.config.base_year)
            .or_else(|| history.last())?;

        let rows: Vec<PathwayRow> = (base_year + 1..=self.config.end_year)
            .map(|year| PathwayRow {
                entity: entity.to_string(),
                kind: PathwayKind::TrendBau,
                year,
                emissions: base * (1.0 + growth).powi(year - base_year),
                base_year,
                base_emissions: base,
                growth_rate: Some(growth),
            })
            .collect();

        info!(entity = %entity, base_year, raw, growth, rows = rows.len(), "BAU 趋势路径");
        Some(rows)
    }

    /// 减排承诺路径
    ///
    /// # 规则
    /// 1. 起点: 最新一年历史排放
    /// 2. 中期目标点: 起点 × (1 − 中期减排比例)
    /// 3. 远期目标点: 起点 × 残余比例（按承诺类型）
    /// 4. 起点至结束年逐年线性插值,末个目标点之后保持不变
    ///
    /// # 返回
    /// - None: 无历史排放,或中期/远期年份均缺失
    pub fn commitment(
        &self,
        commitment: &CommitmentTarget,
        history: &[(i32, f64)],
    ) -> Option<Vec<PathwayRow>> {
        let entity = commitment.entity.as_str();
        if commitment.interim_target_year.is_none() && commitment.end_target_year.is_none() {
            debug!(entity = %entity, "承诺缺少目标年份,跳过");
            return None;
        }
        let Some(&(base_year, base)) = history.last() else {
            debug!(entity = %entity, "无历史排放,跳过承诺路径");
            return None;
        };

        let mut anchors: Vec<(i32, f64)> = vec![(base_year, base)];
        if let (Some(year), Some(reduction)) =
            (commitment.interim_target_year, commitment.interim_reduction)
        {
            if year > base_year {
                anchors.push((year, (base * (1.0 - reduction)).max(0.0)));
            }
        }
        if let Some(year) = commitment.end_target_year {
            if year > base_year {
                let residual = commitment
                    .end_target_kind
                    .residual_share(commitment.end_reduction);
                anchors.push((year, (base * residual).max(0.0)));
            }
        }
        anchors.sort_by_key(|(year, _)| *year);

        let rows: Vec<PathwayRow> = (base_year..=self.config.end_year)
            .map(|year| PathwayRow {
                entity: entity.to_string(),
                kind: PathwayKind::Commitment,
                year,
                emissions: interpolate(&anchors, year).max(0.0),
                base_year,
                base_emissions: base,
                growth_rate: None,
            })
            .collect();

        info!(
            entity = %entity,
            base_year,
            kind = ?commitment.end_target_kind,
            anchors = anchors.len(),
            "减排承诺路径"
        );
        Some(rows)
    }
}

/// 分段线性插值; 首点之前取首值,末点之后取末值
fn interpolate(anchors: &[(i32, f64)], year: i32) -> f64 {
    let before = anchors.iter().rev().find(|(y, _)| *y <= year);
    let after = anchors.iter().find(|(y, _)| *y > year);
    match (before, after) {
        (Some(&(y1, e1)), Some(&(y2, e2))) => {
            e1 + (e2 - e1) * f64::from(year - y1) / f64::from(y2 - y1)
        }
        (Some(&(_, e)), None) | (None, Some(&(_, e))) => e,
        (None, None) => 0.0,
    }
}
