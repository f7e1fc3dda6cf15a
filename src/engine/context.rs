// ==========================================
// 钢铁资产级排放核算引擎 - 已加载上下文
// ==========================================
// 职责: 一次性加载的全部快照 + 派生结果,批处理期间只读共享
// 红线: 构建后不可变; 以 Arc<LoadedContext> 跨线程共享
// ==========================================

use crate::config::engine_config::EngineConfig;
use crate::domain::entity::{CanonicalEntity, OwnershipTransferEvent, ReferenceOwnership};
use crate::domain::observation::{
    CommitmentTarget, EmissionFactorEntry, ExclusionRule, OutputObservation, ReferencePoint,
    RegionalTarget, SourceDescriptor, TrustedPoint,
};
use crate::domain::types::LifecyclePolicy;
use crate::domain::unit::ProductionUnit;
use crate::engine::emission_factor::{EmissionFactorTable, RegionMap};
use crate::engine::entity_resolver::EntityResolver;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::lifecycle::{ActiveFleet, ActiveUnit, AssetRegistry};
use crate::engine::ownership::OwnerParser;
use crate::engine::reconciler::CapacityProvider;
use crate::engine::technology::{DefaultFeedstockHeuristic, FeedstockHeuristic};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{info, warn};

// ==========================================
// LoadedContext - 只读上下文
// ==========================================
pub struct LoadedContext {
    config: EngineConfig,
    registry: AssetRegistry,
    factors: EmissionFactorTable,
    resolver: EntityResolver,
    entities: Vec<CanonicalEntity>,
    observations: Vec<OutputObservation>,
    exclusions: HashSet<ExclusionRule>,
    regional_targets: BTreeMap<(String, i32), BTreeMap<String, f64>>,
    trusted: Vec<TrustedPoint>,
    references: Vec<ReferencePoint>,
    reference_ownership: Vec<ReferenceOwnership>,
    commitments: HashMap<String, CommitmentTarget>,
}

impl LoadedContext {
    pub fn builder(config: EngineConfig) -> LoadedContextBuilder {
        LoadedContextBuilder::new(config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn factors(&self) -> &EmissionFactorTable {
        &self.factors
    }

    pub fn resolver(&self) -> &EntityResolver {
        &self.resolver
    }

    pub fn entities(&self) -> &[CanonicalEntity] {
        &self.entities
    }

    pub fn entity(&self, name: &str) -> Option<&CanonicalEntity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn observations(&self) -> &[OutputObservation] {
        &self.observations
    }

    pub fn exclusions(&self) -> &HashSet<ExclusionRule> {
        &self.exclusions
    }

    /// 主体-年份的区域分项目标（国家 → 产量）
    pub fn regional_targets(&self, entity: &str, year: i32) -> Option<&BTreeMap<String, f64>> {
        self.regional_targets.get(&(entity.to_string(), year))
    }

    pub fn trusted_for(&self, entity: &str) -> Vec<TrustedPoint> {
        self.trusted
            .iter()
            .filter(|t| t.entity == entity)
            .cloned()
            .collect()
    }

    pub fn references(&self) -> &[ReferencePoint] {
        &self.references
    }

    pub fn reference_ownership(&self) -> &[ReferenceOwnership] {
        &self.reference_ownership
    }

    pub fn commitment_for(&self, entity: &str) -> Option<&CommitmentTarget> {
        self.commitments.get(entity)
    }
}

impl ActiveFleet for LoadedContext {
    fn active_units(
        &self,
        entity: &str,
        year: i32,
        policy: LifecyclePolicy,
    ) -> EngineResult<Vec<ActiveUnit<'_>>> {
        let resolution = self.resolver.resolve(&self.registry, entity, year)?;
        Ok(self
            .registry
            .filter_active(resolution.candidates(), year, policy))
    }
}

impl CapacityProvider for LoadedContext {
    fn active_capacity(&self, entity: &str, year: i32) -> Option<f64> {
        self.active_capacity_under(entity, year, LifecyclePolicy::historical())
            .ok()
    }
}

// ==========================================
// LoadedContextBuilder - 上下文构建器
// ==========================================
pub struct LoadedContextBuilder {
    config: EngineConfig,
    units: Vec<ProductionUnit>,
    emission_factors: Vec<EmissionFactorEntry>,
    regions: Option<RegionMap>,
    entities: Vec<CanonicalEntity>,
    transfers: Vec<OwnershipTransferEvent>,
    observations: Vec<OutputObservation>,
    sources: Vec<SourceDescriptor>,
    exclusions: Vec<ExclusionRule>,
    regional_targets: Vec<RegionalTarget>,
    trusted: Vec<TrustedPoint>,
    references: Vec<ReferencePoint>,
    reference_ownership: Vec<ReferenceOwnership>,
    commitments: Vec<CommitmentTarget>,
    heuristic: Option<Box<dyn FeedstockHeuristic>>,
}

impl LoadedContextBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            units: Vec::new(),
            emission_factors: Vec::new(),
            regions: None,
            entities: Vec::new(),
            transfers: Vec::new(),
            observations: Vec::new(),
            sources: Vec::new(),
            exclusions: Vec::new(),
            regional_targets: Vec::new(),
            trusted: Vec::new(),
            references: Vec::new(),
            reference_ownership: Vec::new(),
            commitments: Vec::new(),
            heuristic: None,
        }
    }

    pub fn units(mut self, units: Vec<ProductionUnit>) -> Self {
        self.units = units;
        self
    }

    /// 排放因子条目;为空时使用内置表
    pub fn emission_factors(mut self, entries: Vec<EmissionFactorEntry>) -> Self {
        self.emission_factors = entries;
        self
    }

    /// 国家 → 区域映射;缺省时使用内置映射
    pub fn regions(mut self, regions: RegionMap) -> Self {
        self.regions = Some(regions);
        self
    }

    pub fn entities(mut self, entities: Vec<CanonicalEntity>) -> Self {
        self.entities = entities;
        self
    }

    pub fn transfers(mut self, transfers: Vec<OwnershipTransferEvent>) -> Self {
        self.transfers = transfers;
        self
    }

    pub fn observations(mut self, observations: Vec<OutputObservation>) -> Self {
        self.observations = observations;
        self
    }

    pub fn sources(mut self, sources: Vec<SourceDescriptor>) -> Self {
        self.sources = sources;
        self
    }

    pub fn exclusions(mut self, exclusions: Vec<ExclusionRule>) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn regional_targets(mut self, targets: Vec<RegionalTarget>) -> Self {
        self.regional_targets = targets;
        self
    }

    pub fn trusted(mut self, trusted: Vec<TrustedPoint>) -> Self {
        self.trusted = trusted;
        self
    }

    pub fn references(mut self, references: Vec<ReferencePoint>) -> Self {
        self.references = references;
        self
    }

    pub fn reference_ownership(mut self, reference: Vec<ReferenceOwnership>) -> Self {
        self.reference_ownership = reference;
        self
    }

    pub fn commitments(mut self, commitments: Vec<CommitmentTarget>) -> Self {
        self.commitments = commitments;
        self
    }

    /// 替换默认的同厂原料推断规则
    pub fn feedstock_heuristic(mut self, heuristic: Box<dyn FeedstockHeuristic>) -> Self {
        self.heuristic = Some(heuristic);
        self
    }

    /// 构建上下文
    ///
    /// # 步骤
    /// 1. 校验配置
    /// 2. 排放因子表（含区域映射）
    /// 3. 装置台账 + 派生字段
    /// 4. 主体规则编译 + 股东文本预解析
    /// 5. 观测按来源描述重排优先级
    /// 6. 减排承诺按主体去重（同一主体保留最后一条）
    pub fn build(self) -> EngineResult<LoadedContext> {
        self.config.validate().map_err(EngineError::InvalidConfig)?;

        let regions = self.regions.unwrap_or_else(RegionMap::builtin);
        let factors = if self.emission_factors.is_empty() {
            warn!("未提供排放因子表,使用内置表");
            EmissionFactorTable::new(EmissionFactorTable::builtin_entries(), regions)?
        } else {
            EmissionFactorTable::new(self.emission_factors, regions)?
        };

        let heuristic: Box<dyn FeedstockHeuristic> = match self.heuristic {
            Some(h) => h,
            None => Box::new(DefaultFeedstockHeuristic::new(&self.config.technology)?),
        };
        let registry = AssetRegistry::build(
            self.units,
            &factors,
            &self.config.lifecycle,
            &self.config.technology,
            heuristic.as_ref(),
        )?;

        let parser = OwnerParser::new()?;
        let resolver =
            EntityResolver::build(self.entities.clone(), self.transfers, &registry, &parser)?;

        let ranks: HashMap<&str, u32> = self
            .sources
            .iter()
            .map(|s| (s.source_id.as_str(), s.priority_rank))
            .collect();
        let observations: Vec<OutputObservation> = self
            .observations
            .into_iter()
            .map(|mut o| {
                if let Some(rank) = ranks.get(o.source_id.as_str()) {
                    o.priority_rank = *rank;
                }
                o
            })
            .collect();

        let mut regional_targets: BTreeMap<(String, i32), BTreeMap<String, f64>> = BTreeMap::new();
        for target in self.regional_targets {
            *regional_targets
                .entry((target.entity, target.year))
                .or_default()
                .entry(target.country)
                .or_insert(0.0) += target.quantity;
        }

        let mut commitments: HashMap<String, CommitmentTarget> = HashMap::new();
        for commitment in self.commitments {
            if let Some(previous) = commitments.insert(commitment.entity.clone(), commitment) {
                warn!(entity = %previous.entity, "减排承诺重复,保留最后一条");
            }
        }

        info!(
            units = registry.len(),
            entities = self.entities.len(),
            observations = observations.len(),
            exclusions = self.exclusions.len(),
            trusted = self.trusted.len(),
            references = self.references.len(),
            commitments = commitments.len(),
            "上下文构建完成"
        );

        Ok(LoadedContext {
            config: self.config,
            registry,
            factors,
            resolver,
            entities: self.entities,
            observations,
            exclusions: self.exclusions.into_iter().collect(),
            regional_targets,
            trusted: self.trusted,
            references: self.references,
            reference_ownership: self.reference_ownership,
            commitments,
        })
    }
}
