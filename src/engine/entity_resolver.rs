// ==========================================
// 钢铁资产级排放核算引擎 - 主体归属解析
// ==========================================
// 职责: 装置 → 报告主体（股东规则 + 股权转让 + 名称兜底）
// 红线: 股比 < 1 或未知必须透传,不得默认全资
// ==========================================

use crate::domain::entity::{CanonicalEntity, Equity, OwnerShare, OwnershipTransferEvent};
use crate::domain::types::MatchSource;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::lifecycle::AssetRegistry;
use crate::engine::ownership::{combine_equity, OwnerParser};
use crate::domain::unit::ProductionUnit;
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// 编译单条规则（大小写不敏感）
pub fn compile_rule(pattern: &str) -> EngineResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| EngineError::InvalidRule {
            rule: pattern.to_string(),
            message: e.to_string(),
        })
}

/// 已编译的主体规则
#[derive(Debug, Clone)]
pub struct EntityRule {
    pub entity: CanonicalEntity,
    owner_res: Vec<Regex>,
    fallback_res: Vec<Regex>,
}

impl EntityRule {
    pub fn compile(entity: CanonicalEntity) -> EngineResult<Self> {
        let owner_res = entity
            .owner_patterns
            .iter()
            .map(|p| compile_rule(p))
            .collect::<EngineResult<Vec<_>>>()?;
        let fallback_res = entity
            .name_fallback_patterns
            .iter()
            .map(|p| compile_rule(p))
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(Self {
            entity,
            owner_res,
            fallback_res,
        })
    }

    /// 股东名称是否命中
    pub fn matches_owner(&self, owner_name: &str) -> bool {
        self.owner_res.iter().any(|re| re.is_match(owner_name))
    }

    /// 装置/厂名是否命中兜底规则
    pub fn matches_name(&self, unit: &ProductionUnit) -> bool {
        let display = unit.display_name();
        self.fallback_res
            .iter()
            .any(|re| re.is_match(&unit.plant_name) || re.is_match(&display))
    }
}

/// 已编译的股权转让
#[derive(Debug, Clone)]
struct TransferRule {
    event: OwnershipTransferEvent,
    unit_re: Regex,
}

impl TransferRule {
    fn covers(&self, unit: &ProductionUnit) -> bool {
        self.unit_re.is_match(&unit.plant_name) || self.unit_re.is_match(&unit.display_name())
    }
}

// ==========================================
// 解析结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedUnit {
    pub unit_id: String,
    pub equity: Equity,
    pub match_source: MatchSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub entity: String,
    pub year: i32,
    pub units: Vec<ResolvedUnit>,
}

impl Resolution {
    /// 供生命周期过滤使用的候选序列
    pub fn candidates(&self) -> impl Iterator<Item = (&str, Equity, MatchSource)> {
        self.units
            .iter()
            .map(|u| (u.unit_id.as_str(), u.equity, u.match_source))
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

// ==========================================
// EntityResolver - 主体归属解析器
// ==========================================
#[derive(Debug, Clone)]
pub struct EntityResolver {
    rules: BTreeMap<String, EntityRule>,
    transfers: Vec<TransferRule>,
    // 与台账顺序一致的股东解析结果
    owners: Vec<Vec<OwnerShare>>,
}

impl EntityResolver {
    /// 编译规则并预解析全部股东文本
    pub fn build(
        entities: Vec<CanonicalEntity>,
        transfers: Vec<OwnershipTransferEvent>,
        registry: &AssetRegistry,
        parser: &OwnerParser,
    ) -> EngineResult<Self> {
        let mut rules = BTreeMap::new();
        for entity in entities {
            let rule = EntityRule::compile(entity)?;
            rules.insert(rule.entity.name.clone(), rule);
        }

        let transfers = transfers
            .into_iter()
            .map(|event| {
                Ok(TransferRule {
                    unit_re: compile_rule(&event.unit_pattern)?,
                    event,
                })
            })
            .collect::<EngineResult<Vec<_>>>()?;

        let owners = registry
            .units()
            .iter()
            .map(|r| parser.parse(&r.unit.owning_entity_raw))
            .collect();

        Ok(Self {
            rules,
            transfers,
            owners,
        })
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(|k| k.as_str())
    }

    pub fn rule(&self, entity: &str) -> Option<&EntityRule> {
        self.rules.get(entity)
    }

    /// 解析主体在指定年份的装置集合
    ///
    /// # 规则
    /// 1. 股东规则命中 → 股比取命中股东之和（任一未知则未知）
    /// 2. 受让方且 year < 生效年 → 剔除转让规则覆盖的装置
    /// 3. 转让目标且 year < 生效年 → 补入转让规则覆盖的装置（Unknown 股比）
    /// 4. 仍无结果 → 名称兜底（转让目标在生效年及之后不兜底）
    #[instrument(skip(self, registry), fields(entity = %entity, year = year))]
    pub fn resolve(
        &self,
        registry: &AssetRegistry,
        entity: &str,
        year: i32,
    ) -> EngineResult<Resolution> {
        let rule = self
            .rules
            .get(entity)
            .ok_or_else(|| EngineError::UnknownEntity(entity.to_string()))?;

        let mut units: Vec<ResolvedUnit> = Vec::new();
        for (registered, shares) in registry.units().iter().zip(&self.owners) {
            let matched: Vec<Equity> = shares
                .iter()
                .filter(|s| rule.matches_owner(&s.owner_name))
                .map(|s| s.equity)
                .collect();
            if !matched.is_empty() {
                units.push(ResolvedUnit {
                    unit_id: registered.unit.unit_id.clone(),
                    equity: combine_equity(&matched),
                    match_source: MatchSource::OwnerRule,
                });
            }
        }

        // 受让方: 生效前剔除目标装置
        for transfer in self
            .transfers
            .iter()
            .filter(|t| t.event.acquirer == entity && year < t.event.effective_year)
        {
            let before = units.len();
            units.retain(|u| {
                registry
                    .get(&u.unit_id)
                    .map(|r| !transfer.covers(&r.unit))
                    .unwrap_or(true)
            });
            debug!(
                target_entity = %transfer.event.target,
                removed = before - units.len(),
                "转让生效前剔除目标装置"
            );
        }

        // 转让目标: 生效前仍持有被转让装置（即使自有股东规则已有结果）
        for transfer in self
            .transfers
            .iter()
            .filter(|t| t.event.target == entity && year < t.event.effective_year)
        {
            let before = units.len();
            for registered in registry.units() {
                let unit = &registered.unit;
                let named = rule.fallback_res.is_empty() || rule.matches_name(unit);
                if transfer.covers(unit)
                    && named
                    && !units.iter().any(|u| u.unit_id == unit.unit_id)
                {
                    units.push(ResolvedUnit {
                        unit_id: unit.unit_id.clone(),
                        equity: Equity::Unknown,
                        match_source: MatchSource::NameFallback,
                    });
                }
            }
            debug!(
                acquirer = %transfer.event.acquirer,
                added = units.len() - before,
                "转让生效前归还目标装置"
            );
        }

        if units.is_empty() && !rule.fallback_res.is_empty() {
            let transferred_away = self
                .transfers
                .iter()
                .any(|t| t.event.target == entity && year >= t.event.effective_year);
            if !transferred_away {
                units = registry
                    .units()
                    .iter()
                    .filter(|r| rule.matches_name(&r.unit))
                    .map(|r| ResolvedUnit {
                        unit_id: r.unit.unit_id.clone(),
                        equity: Equity::Unknown,
                        match_source: MatchSource::NameFallback,
                    })
                    .collect();
                debug!(matched = units.len(), "名称兜底匹配");
            }
        }

        units.sort_by(|a, b| a.unit_id.cmp(&b.unit_id));
        Ok(Resolution {
            entity: entity.to_string(),
            year,
            units,
        })
    }
}
