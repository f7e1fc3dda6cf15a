// ==========================================
// 钢铁资产级排放核算引擎 - 股权归属交叉审计
// ==========================================
// 职责: 本方归属结果 vs 独立参照清单,输出复核标记
// 红线: 只标记不修正; 每个标记附人工复核建议
// ==========================================

use crate::config::engine_config::AuditConfig;
use crate::domain::entity::{CanonicalEntity, Equity, ReferenceOwnership};
use crate::domain::report::{OwnershipMappingRow, OwnershipMismatchRow};
use crate::domain::types::OwnershipFlag;
use crate::engine::error::EngineResult;
use crate::engine::lifecycle::ActiveUnit;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, instrument};

/// 地名匹配时忽略的通用词
const GENERIC_WORDS: &[&str] = &[
    "steel", "plant", "works", "iron", "mill", "new", "old", "integrated", "facility", "complex",
    "base",
];

/// 参照清单中不参与"仅参照方有"检查的状态
const SKIPPED_REFERENCE_STATUSES: &[&str] = &["cancelled", "canceled", "announced"];

/// 审计结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OwnershipAuditResult {
    pub mappings: Vec<OwnershipMappingRow>,
    pub mismatches: Vec<OwnershipMismatchRow>,
}

// ==========================================
// OwnershipAuditor - 归属审计器
// ==========================================
pub struct OwnershipAuditor {
    config: AuditConfig,
    suffix_re: Regex,
    quote_re: Regex,
}

impl OwnershipAuditor {
    pub fn new(config: AuditConfig) -> EngineResult<Self> {
        Ok(Self {
            config,
            suffix_re: Regex::new(r"\s+(steel|iron|works|plant|mill|steelworks|ironworks)\s*$")?,
            quote_re: Regex::new(r#"['"`‘’“”]"#)?,
        })
    }

    /// 厂名归一化
    ///
    /// # 规则
    /// 1. 小写、去引号
    /// 2. 反复剥离尾部通用词（"steel plant" 两轮剥净）
    /// 3. 剥离主体前缀
    /// 4. 折叠空白
    pub fn normalize_name(&self, name: &str, prefixes: &[String]) -> String {
        let mut s = self.quote_re.replace_all(&name.trim().to_lowercase(), "").to_string();

        loop {
            let stripped = self.suffix_re.replace(&s, "").to_string();
            if stripped == s {
                break;
            }
            s = stripped;
        }

        for prefix in prefixes {
            let prefix = prefix.trim().to_lowercase();
            // 仅按整词剥离
            if !prefix.is_empty() && s.starts_with(&format!("{} ", prefix)) {
                s = s[prefix.len()..].trim().to_string();
            }
        }

        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn significant_words(name: &str) -> HashSet<String> {
        name.split_whitespace()
            .filter(|w| !GENERIC_WORDS.contains(w))
            .map(|w| w.to_string())
            .collect()
    }

    /// 在参照清单中查找匹配条目
    ///
    /// # 规则（同国前提下依次尝试）
    /// 1. 归一化名称完全一致
    /// 2. 一方包含另一方
    /// 3. 共享非通用词
    pub fn find_match(
        &self,
        plant_name: &str,
        country: &str,
        references: &[(usize, String, String)],
    ) -> Option<usize> {
        let country = country.trim().to_lowercase();
        let same_country: Vec<&(usize, String, String)> = references
            .iter()
            .filter(|(_, _, c)| *c == country)
            .collect();

        let norm = plant_name;
        if let Some((idx, _, _)) = same_country.iter().find(|(_, n, _)| n == norm) {
            return Some(*idx);
        }
        if !norm.is_empty() {
            if let Some((idx, _, _)) = same_country
                .iter()
                .find(|(_, n, _)| !n.is_empty() && (n.contains(norm) || norm.contains(n.as_str())))
            {
                return Some(*idx);
            }
        }
        let words = Self::significant_words(norm);
        if words.is_empty() {
            return None;
        }
        same_country
            .iter()
            .find(|(_, n, _)| !Self::significant_words(n).is_disjoint(&words))
            .map(|(idx, _, _)| *idx)
    }

    /// 交叉审计
    ///
    /// # 参数
    /// - entity: 主体（提供名称前缀）
    /// - year: 参照清单年份
    /// - units: 本方在该年份的活跃装置
    /// - reference: 全部参照清单条目
    #[instrument(skip(self, entity, units, reference), fields(entity = %entity.name, year = year))]
    pub fn cross_reference(
        &self,
        entity: &CanonicalEntity,
        year: i32,
        units: &[ActiveUnit<'_>],
        reference: &[ReferenceOwnership],
    ) -> OwnershipAuditResult {
        let mut prefixes = entity.name_prefixes.clone();
        prefixes.push(entity.name.to_lowercase());
        // 长前缀优先剥离
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()));

        let entity_refs: Vec<(usize, &ReferenceOwnership)> = reference
            .iter()
            .enumerate()
            .filter(|(_, r)| r.entity.eq_ignore_ascii_case(&entity.name))
            .collect();
        let normalized_refs: Vec<(usize, String, String)> = entity_refs
            .iter()
            .map(|(i, r)| {
                (
                    *i,
                    self.normalize_name(&r.plant_name, &prefixes),
                    r.country.trim().to_lowercase(),
                )
            })
            .collect();
        let has_reference = !entity_refs.is_empty();

        let mut result = OwnershipAuditResult::default();
        let mut matched_refs: HashSet<usize> = HashSet::new();

        for active in units {
            let unit = &active.registered.unit;
            let norm = self.normalize_name(&unit.plant_name, &prefixes);
            let matched = self.find_match(&norm, &unit.country, &normalized_refs);
            let reference_row = matched.map(|idx| &reference[idx]);
            if let Some(idx) = matched {
                matched_refs.insert(idx);
            }

            let mut flags = Vec::new();
            if has_reference && matched.is_none() {
                flags.push(OwnershipFlag::NotInReference);
            }
            match active.equity {
                Equity::Unknown => flags.push(OwnershipFlag::EquityUnknown),
                Equity::Known(ours) => {
                    if let Some(theirs) = reference_row.and_then(|r| r.equity) {
                        if (ours - theirs).abs() > self.config.equity_tolerance {
                            flags.push(OwnershipFlag::EquityMismatch);
                        }
                    }
                    if ours < self.config.minority_stake_threshold {
                        flags.push(OwnershipFlag::MinorityStake);
                    }
                }
            }

            for flag in &flags {
                result.mismatches.push(OwnershipMismatchRow {
                    entity: entity.name.clone(),
                    plant_name: unit.plant_name.clone(),
                    country: unit.country.clone(),
                    flag: *flag,
                    our_equity: active.equity.fraction(),
                    reference_equity: reference_row.and_then(|r| r.equity),
                    suggested_action: flag.suggested_action().to_string(),
                });
            }

            result.mappings.push(OwnershipMappingRow {
                entity: entity.name.clone(),
                year,
                unit_id: unit.unit_id.clone(),
                plant_name: unit.plant_name.clone(),
                country: unit.country.clone(),
                equity: active.equity,
                match_source: active.match_source,
                reference_plant: reference_row.map(|r| r.plant_name.clone()),
                reference_equity: reference_row.and_then(|r| r.equity),
                suggested_actions: flags.iter().map(|f| f.suggested_action().to_string()).collect(),
                flags,
            });
        }

        for (idx, r) in &entity_refs {
            if matched_refs.contains(idx) {
                continue;
            }
            let skipped = r
                .status
                .as_deref()
                .map(|s| SKIPPED_REFERENCE_STATUSES.contains(&s.trim().to_lowercase().as_str()))
                .unwrap_or(false);
            if skipped {
                continue;
            }
            let flag = OwnershipFlag::InReferenceOnly;
            result.mismatches.push(OwnershipMismatchRow {
                entity: entity.name.clone(),
                plant_name: r.plant_name.clone(),
                country: r.country.clone(),
                flag,
                our_equity: None,
                reference_equity: r.equity,
                suggested_action: flag.suggested_action().to_string(),
            });
        }

        debug!(
            mapped = result.mappings.len(),
            flagged = result.mismatches.len(),
            "归属审计完成"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_suffixes_and_prefixes() {
        let auditor = OwnershipAuditor::new(AuditConfig::default()).unwrap();
        let prefixes = vec!["ssab".to_string()];
        assert_eq!(auditor.normalize_name("SSAB Raahe steel plant", &prefixes), "raahe");
        assert_eq!(auditor.normalize_name("  Kimitsu   Works ", &[]), "kimitsu");
        assert_eq!(auditor.normalize_name("O'Neill Steelworks", &[]), "oneill");
    }

    #[test]
    fn test_find_match_tiers_require_same_country() {
        let auditor = OwnershipAuditor::new(AuditConfig::default()).unwrap();
        let refs = vec![
            (0, "oita".to_string(), "japan".to_string()),
            (1, "kashima east".to_string(), "japan".to_string()),
            (2, "gary".to_string(), "united states".to_string()),
        ];
        assert_eq!(auditor.find_match("oita", "Japan", &refs), Some(0));
        assert_eq!(auditor.find_match("kashima", "Japan", &refs), Some(1));
        assert_eq!(auditor.find_match("east kashima complex", "Japan", &refs), Some(1));
        assert_eq!(auditor.find_match("gary", "Japan", &refs), None);
    }
}
