// ==========================================
// 钢铁资产级排放核算引擎 - 输入目录加载
// ==========================================
// 职责: 按固定文件名加载整套输入 → InputBundle → 上下文构建器
// 规则: 每张表优先 .csv,其次 .xlsx; 台账与主体规则必需,其余缺省为空
// ==========================================

use crate::config::engine_config::EngineConfig;
use crate::domain::entity::{CanonicalEntity, OwnershipTransferEvent, ReferenceOwnership};
use crate::domain::observation::{
    CommitmentTarget, EmissionFactorEntry, ExclusionRule, OutputObservation, ReferencePoint,
    RegionalTarget, SourceDescriptor, TrustedPoint,
};
use crate::domain::unit::ProductionUnit;
use crate::engine::context::LoadedContextBuilder;
use crate::engine::emission_factor::RegionMap;
use crate::engine::error::EngineError;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{RawTable, UniversalFileParser};
use crate::importer::table_loader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// 输入文件名（不含扩展名）
pub mod file_names {
    pub const REGISTRY: &str = "registry";
    pub const OBSERVATIONS: &str = "observations";
    pub const SOURCES: &str = "sources";
    pub const EXCLUSIONS: &str = "exclusions";
    pub const TRUSTED: &str = "trusted";
    pub const REFERENCE_TRAJECTORIES: &str = "reference_trajectories";
    pub const ENTITY_RULES: &str = "entity_rules";
    pub const TRANSFERS: &str = "transfers";
    pub const EMISSION_FACTORS: &str = "emission_factors";
    pub const REGION_MAP: &str = "region_map";
    pub const REFERENCE_OWNERSHIP: &str = "reference_ownership";
    pub const REGIONAL_TARGETS: &str = "regional_targets";
    pub const COMMITMENTS: &str = "commitments";
}

const EXTENSIONS: &[&str] = &["csv", "xlsx", "xls"];

/// 整套输入
#[derive(Debug, Clone, Default)]
pub struct InputBundle {
    pub units: Vec<ProductionUnit>,
    pub ambiguous_dates: Vec<EngineError>,
    pub observations: Vec<OutputObservation>,
    pub sources: Vec<SourceDescriptor>,
    pub exclusions: Vec<ExclusionRule>,
    pub trusted: Vec<TrustedPoint>,
    pub references: Vec<ReferencePoint>,
    pub entities: Vec<CanonicalEntity>,
    pub transfers: Vec<OwnershipTransferEvent>,
    pub emission_factors: Vec<EmissionFactorEntry>,
    pub regions: Option<RegionMap>,
    pub reference_ownership: Vec<ReferenceOwnership>,
    pub regional_targets: Vec<RegionalTarget>,
    pub commitments: Vec<CommitmentTarget>,
}

impl InputBundle {
    /// 转为上下文构建器
    pub fn into_context_builder(self, config: EngineConfig) -> LoadedContextBuilder {
        let mut builder = LoadedContextBuilder::new(config)
            .units(self.units)
            .observations(self.observations)
            .sources(self.sources)
            .exclusions(self.exclusions)
            .trusted(self.trusted)
            .references(self.references)
            .entities(self.entities)
            .transfers(self.transfers)
            .emission_factors(self.emission_factors)
            .reference_ownership(self.reference_ownership)
            .regional_targets(self.regional_targets)
            .commitments(self.commitments);
        if let Some(regions) = self.regions {
            builder = builder.regions(regions);
        }
        builder
    }
}

// ==========================================
// InputLoader - 目录加载器
// ==========================================
pub struct InputLoader {
    dir: PathBuf,
    /// 台账为 XLSX 时指定的工作表
    registry_sheet: Option<String>,
}

impl InputLoader {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            registry_sheet: None,
        }
    }

    pub fn with_registry_sheet(mut self, sheet: &str) -> Self {
        self.registry_sheet = Some(sheet.to_string());
        self
    }

    fn locate(&self, stem: &str) -> Option<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{}.{}", stem, ext)))
            .find(|p| p.exists())
    }

    fn read(&self, stem: &str, sheet: Option<&str>) -> ImportResult<Option<RawTable>> {
        let Some(path) = self.locate(stem) else {
            debug!(table = stem, "输入表不存在,按空表处理");
            return Ok(None);
        };
        let parser = match sheet {
            Some(s) => UniversalFileParser::with_sheet(s),
            None => UniversalFileParser::default(),
        };
        let table = parser.parse(&path)?;
        debug!(table = stem, path = %path.display(), rows = table.rows.len(), "输入表读取完成");
        Ok(Some(table))
    }

    fn require(&self, stem: &str, sheet: Option<&str>) -> ImportResult<RawTable> {
        self.read(stem, sheet)?.ok_or_else(|| {
            ImportError::FileNotFound(self.dir.join(format!("{}.csv", stem)).display().to_string())
        })
    }

    fn optional<T>(
        &self,
        stem: &str,
        load: impl Fn(&RawTable) -> ImportResult<Vec<T>>,
    ) -> ImportResult<Vec<T>> {
        match self.read(stem, None)? {
            Some(table) => load(&table),
            None => Ok(Vec::new()),
        }
    }

    /// 加载整套输入
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub fn load(&self) -> ImportResult<InputBundle> {
        let registry = table_loader::load_registry(
            &self.require(file_names::REGISTRY, self.registry_sheet.as_deref())?,
        )?;
        let entities =
            table_loader::load_entity_rules(&self.require(file_names::ENTITY_RULES, None)?)?;

        let regions = match self.read(file_names::REGION_MAP, None)? {
            Some(table) => Some(table_loader::load_region_map(&table)?),
            None => None,
        };

        let bundle = InputBundle {
            units: registry.units,
            ambiguous_dates: registry.ambiguous_dates,
            observations: self.optional(file_names::OBSERVATIONS, table_loader::load_observations)?,
            sources: self.optional(file_names::SOURCES, table_loader::load_sources)?,
            exclusions: self.optional(file_names::EXCLUSIONS, table_loader::load_exclusions)?,
            trusted: self.optional(file_names::TRUSTED, table_loader::load_trusted)?,
            references: self.optional(
                file_names::REFERENCE_TRAJECTORIES,
                table_loader::load_reference_trajectories,
            )?,
            entities,
            transfers: self.optional(file_names::TRANSFERS, table_loader::load_transfers)?,
            emission_factors: self.optional(
                file_names::EMISSION_FACTORS,
                table_loader::load_emission_factors,
            )?,
            regions,
            reference_ownership: self.optional(
                file_names::REFERENCE_OWNERSHIP,
                table_loader::load_reference_ownership,
            )?,
            regional_targets: self.optional(
                file_names::REGIONAL_TARGETS,
                table_loader::load_regional_targets,
            )?,
            commitments: self.optional(file_names::COMMITMENTS, table_loader::load_commitments)?,
        };

        info!(
            units = bundle.units.len(),
            entities = bundle.entities.len(),
            observations = bundle.observations.len(),
            commitments = bundle.commitments.len(),
            ambiguous_dates = bundle.ambiguous_dates.len(),
            "输入加载完成"
        );
        Ok(bundle)
    }
}
