// ==========================================
// 钢铁资产级排放核算引擎 - 输入表加载器
// ==========================================
// 职责: 原始表 + 映射表 → 领域记录
// 红线: 无法解析的日期记 AmbiguousDate 并告警,不得猜测;
//       类型转换失败带表名/行号/字段报错
// ==========================================

use crate::domain::entity::{CanonicalEntity, OwnershipTransferEvent, ReferenceOwnership};
use crate::domain::observation::{
    CommitmentTarget, EmissionFactorEntry, ExclusionRule, OutputObservation, ReferencePoint,
    RegionalTarget, SourceDescriptor, TrustedPoint,
};
use crate::domain::types::{CommitmentKind, LifecycleStatus, Scenario, SourceKind, TechnologyClass};
use crate::domain::unit::ProductionUnit;
use crate::engine::emission_factor::{RegionMap, DEFAULT_REFERENCE_YEAR};
use crate::engine::error::EngineError;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::RawTable;
use crate::importer::schema_map::{parse_year, schemas, BoundSchema, YearValue};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

/// 未声明优先级的观测默认排在最后
pub const DEFAULT_PRIORITY_RANK: u32 = 99;

/// 数据行号（表头为第 1 行）
fn row_number(index: usize) -> usize {
    index + 2
}

/// 台账加载结果
#[derive(Debug, Clone, Default)]
pub struct RegistryLoad {
    pub units: Vec<ProductionUnit>,
    /// 无法解析的日期（AmbiguousDate）
    pub ambiguous_dates: Vec<EngineError>,
}

// ==========================================
// 装置台账
// ==========================================

/// 加载装置台账
///
/// # 规则
/// - 产能列名含 "ttpa" 时按千吨换算为 Mt
/// - 年份字段自由文本抽取;非空但无法抽取 → AmbiguousDate,字段置空
/// - 产能缺失 → 告警并置 0
pub fn load_registry(table: &RawTable) -> ImportResult<RegistryLoad> {
    let schema = schemas::REGISTRY.bind(&table.headers)?;
    let mut load = RegistryLoad::default();

    for (index, row) in table.rows.iter().enumerate() {
        let line = row_number(index);
        let unit_id = schema.require_string(row, "unit_id", line)?;

        let status_raw = schema.require_string(row, "status", line)?;
        let lifecycle_status = LifecycleStatus::parse(&status_raw)
            .ok_or_else(|| schema.conversion_error(line, "status", &status_raw, "装置状态"))?;

        let mut year = |field: &str| -> Option<i32> {
            let raw = schema.get_string(row, field);
            match parse_year(raw.as_deref()) {
                YearValue::Year(y) => Some(y),
                YearValue::Missing => None,
                YearValue::Ambiguous => {
                    let value = raw.unwrap_or_default();
                    warn!(unit_id = %unit_id, field, value = %value, "日期无法解析,按缺失处理");
                    load.ambiguous_dates.push(EngineError::AmbiguousDate {
                        unit_id: unit_id.clone(),
                        field: field.to_string(),
                        value,
                    });
                    None
                }
            }
        };
        let unit_start_year = year("unit_start");
        let plant_start_year = year("plant_start");
        let pre_retirement_announcement_year = year("pre_retirement_announcement");
        let retirement_year = year("retirement");

        let declared_technology = schema.get_string(row, "technology").and_then(|t| {
            let parsed = TechnologyClass::parse(&t);
            if parsed.is_none() {
                warn!(unit_id = %unit_id, technology = %t, "工艺路线无法识别,改用推断");
            }
            parsed
        });

        let plant_name = schema.require_string(row, "plant_name", line)?;
        let capacity_per_year = match capacity(&schema, row, "capacity", line)? {
            Some(c) => c,
            None => {
                warn!(unit_id = %unit_id, line, "装置缺少产能,按 0 处理（不参与分配）");
                0.0
            }
        };
        load.units.push(ProductionUnit {
            plant_id: schema.require_string(row, "plant_id", line)?,
            unit_name: schema
                .get_string(row, "unit_name")
                .unwrap_or_else(|| plant_name.clone()),
            plant_name,
            country: schema.require_string(row, "country", line)?,
            capacity_per_year,
            lifecycle_status,
            unit_start_year,
            plant_start_year,
            pre_retirement_announcement_year,
            retirement_year,
            owning_entity_raw: schema.get_string(row, "owner").unwrap_or_default(),
            declared_technology,
            primary_capacity: capacity(&schema, row, "primary_capacity", line)?,
            reduced_iron_capacity: capacity(&schema, row, "reduced_iron_capacity", line)?,
            scrap_capacity: capacity(&schema, row, "scrap_capacity", line)?,
            equipment_text: schema.get_string(row, "equipment"),
            reductant_text: schema.get_string(row, "reductant"),
            unit_id,
        });
    }

    info!(
        units = load.units.len(),
        ambiguous_dates = load.ambiguous_dates.len(),
        "装置台账加载完成"
    );
    Ok(load)
}

fn capacity(
    schema: &BoundSchema,
    row: &HashMap<String, String>,
    field: &str,
    line: usize,
) -> ImportResult<Option<f64>> {
    let in_kilotonnes = schema
        .column(field)
        .map(|c| c.to_lowercase().contains("ttpa"))
        .unwrap_or(false);
    let value = schema.parse_f64(row, field, line)?;
    Ok(value.map(|v| if in_kilotonnes { v / 1000.0 } else { v }))
}

// ==========================================
// 产量观测 / 来源 / 排除规则
// ==========================================

/// 优先级必须为非负整数
fn priority_rank(schema: &BoundSchema, line: usize, value: f64) -> ImportResult<u32> {
    let integral = value.is_finite() && value.fract() == 0.0;
    if !integral || value < 0.0 || value > f64::from(u32::MAX) {
        return Err(schema.conversion_error(line, "priority_rank", &value.to_string(), "非负整数优先级"));
    }
    Ok(value as u32)
}

pub fn load_observations(table: &RawTable) -> ImportResult<Vec<OutputObservation>> {
    let schema = schemas::OBSERVATIONS.bind(&table.headers)?;
    let mut out = Vec::with_capacity(table.rows.len());
    for (index, row) in table.rows.iter().enumerate() {
        let line = row_number(index);
        let priority_rank = match schema.parse_f64(row, "priority_rank", line)? {
            Some(v) => priority_rank(&schema, line, v)?,
            None => DEFAULT_PRIORITY_RANK,
        };
        out.push(OutputObservation {
            entity: schema.require_string(row, "entity", line)?,
            year: schema.require_year(row, "year", line)?,
            quantity: schema.require_f64(row, "quantity", line)?,
            source_id: schema.require_string(row, "source_id", line)?,
            priority_rank,
        });
    }
    info!(observations = out.len(), "产量观测加载完成");
    Ok(out)
}

pub fn load_sources(table: &RawTable) -> ImportResult<Vec<SourceDescriptor>> {
    let schema = schemas::SOURCES.bind(&table.headers)?;
    table
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let line = row_number(index);
            let kind_raw = schema.require_string(row, "kind", line)?;
            let kind = SourceKind::parse(&kind_raw)
                .ok_or_else(|| schema.conversion_error(line, "kind", &kind_raw, "来源类型"))?;
            let rank = schema.require_f64(row, "priority_rank", line)?;
            Ok(SourceDescriptor {
                source_id: schema.require_string(row, "source_id", line)?,
                kind,
                priority_rank: priority_rank(&schema, line, rank)?,
            })
        })
        .collect()
}

pub fn load_exclusions(table: &RawTable) -> ImportResult<Vec<ExclusionRule>> {
    let schema = schemas::EXCLUSIONS.bind(&table.headers)?;
    table
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let line = row_number(index);
            Ok(ExclusionRule {
                entity: schema.require_string(row, "entity", line)?,
                year: schema.require_year(row, "year", line)?,
                source_id: schema.require_string(row, "source_id", line)?,
            })
        })
        .collect()
}

// ==========================================
// 可信序列 / 参照轨迹 / 区域分项目标 / 减排承诺
// ==========================================

pub fn load_trusted(table: &RawTable) -> ImportResult<Vec<TrustedPoint>> {
    let schema = schemas::TRUSTED.bind(&table.headers)?;
    table
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let line = row_number(index);
            Ok(TrustedPoint {
                entity: schema.require_string(row, "entity", line)?,
                year: schema.require_year(row, "year", line)?,
                emissions: schema.require_f64(row, "emissions", line)?,
                output: schema.parse_f64(row, "output", line)?,
            })
        })
        .collect()
}

pub fn load_reference_trajectories(table: &RawTable) -> ImportResult<Vec<ReferencePoint>> {
    let schema = schemas::REFERENCE_TRAJECTORIES.bind(&table.headers)?;
    table
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let line = row_number(index);
            let scenario_raw = schema.require_string(row, "scenario", line)?;
            let scenario = Scenario::parse(&scenario_raw)
                .ok_or_else(|| schema.conversion_error(line, "scenario", &scenario_raw, "情景"))?;
            Ok(ReferencePoint {
                entity: schema.require_string(row, "entity", line)?,
                year: schema.require_year(row, "year", line)?,
                scenario,
                emissions: schema.require_f64(row, "emissions", line)?,
            })
        })
        .collect()
}

pub fn load_regional_targets(table: &RawTable) -> ImportResult<Vec<RegionalTarget>> {
    let schema = schemas::REGIONAL_TARGETS.bind(&table.headers)?;
    table
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let line = row_number(index);
            Ok(RegionalTarget {
                entity: schema.require_string(row, "entity", line)?,
                year: schema.require_year(row, "year", line)?,
                country: schema.require_string(row, "country", line)?,
                quantity: schema.require_f64(row, "quantity", line)?,
            })
        })
        .collect()
}

/// 加载企业减排承诺
///
/// # 规则
/// - 目标年份可空;中期与远期均为空的行仍保留（推演时跳过）
/// - 减排比例 > 1 视为百分数
pub fn load_commitments(table: &RawTable) -> ImportResult<Vec<CommitmentTarget>> {
    let schema = schemas::COMMITMENTS.bind(&table.headers)?;
    let fraction = |v: f64| if v > 1.0 { v / 100.0 } else { v };
    table
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let line = row_number(index);
            let optional_year = |field: &str| -> ImportResult<Option<i32>> {
                match schema.get_string(row, field) {
                    Some(_) => schema.require_year(row, field, line).map(Some),
                    None => Ok(None),
                }
            };
            let end_target_kind = schema
                .get_string(row, "end_target_type")
                .map(|t| CommitmentKind::parse(&t))
                .unwrap_or(CommitmentKind::Other);
            Ok(CommitmentTarget {
                entity: schema.require_string(row, "entity", line)?,
                interim_target_year: optional_year("interim_target_year")?,
                interim_reduction: schema.parse_f64(row, "interim_reduction", line)?.map(fraction),
                end_target_year: optional_year("end_target_year")?,
                end_target_kind,
                end_reduction: schema.parse_f64(row, "end_reduction", line)?.map(fraction),
            })
        })
        .collect()
}

// ==========================================
// 主体规则 / 股权转让 / 参照归属清单
// ==========================================

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// 加载主体规则（同一主体多行合并）
pub fn load_entity_rules(table: &RawTable) -> ImportResult<Vec<CanonicalEntity>> {
    let schema = schemas::ENTITY_RULES.bind(&table.headers)?;
    let mut merged: BTreeMap<String, CanonicalEntity> = BTreeMap::new();
    for (index, row) in table.rows.iter().enumerate() {
        let line = row_number(index);
        let name = schema.require_string(row, "entity", line)?;
        let pattern = schema.require_string(row, "owner_pattern", line)?;
        let entity = merged.entry(name.clone()).or_insert_with(|| CanonicalEntity {
            name,
            owner_patterns: Vec::new(),
            name_fallback_patterns: Vec::new(),
            name_prefixes: Vec::new(),
        });
        entity.owner_patterns.push(pattern);
        entity
            .name_fallback_patterns
            .extend(split_list(schema.get_string(row, "name_fallback")));
        entity
            .name_prefixes
            .extend(split_list(schema.get_string(row, "name_prefixes")));
    }
    info!(entities = merged.len(), "主体规则加载完成");
    Ok(merged.into_values().collect())
}

pub fn load_transfers(table: &RawTable) -> ImportResult<Vec<OwnershipTransferEvent>> {
    let schema = schemas::TRANSFERS.bind(&table.headers)?;
    table
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let line = row_number(index);
            Ok(OwnershipTransferEvent {
                acquirer: schema.require_string(row, "acquirer", line)?,
                target: schema.require_string(row, "target", line)?,
                unit_pattern: schema.require_string(row, "unit_pattern", line)?,
                effective_year: schema.require_year(row, "effective_year", line)?,
            })
        })
        .collect()
}

/// 加载参照归属清单
///
/// 股比 > 1 视为百分数
pub fn load_reference_ownership(table: &RawTable) -> ImportResult<Vec<ReferenceOwnership>> {
    let schema = schemas::REFERENCE_OWNERSHIP.bind(&table.headers)?;
    table
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let line = row_number(index);
            let equity = schema
                .parse_f64(row, "equity", line)?
                .map(|e| if e > 1.0 { e / 100.0 } else { e });
            Ok(ReferenceOwnership {
                entity: schema.require_string(row, "entity", line)?,
                plant_name: schema.require_string(row, "plant_name", line)?,
                country: schema.require_string(row, "country", line)?,
                equity,
                status: schema.get_string(row, "status"),
            })
        })
        .collect()
}

// ==========================================
// 排放因子 / 区域映射
// ==========================================

pub fn load_emission_factors(table: &RawTable) -> ImportResult<Vec<EmissionFactorEntry>> {
    let schema = schemas::EMISSION_FACTORS.bind(&table.headers)?;
    table
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let line = row_number(index);
            let technology_raw = schema.require_string(row, "technology", line)?;
            let technology_class = TechnologyClass::parse(&technology_raw).ok_or_else(|| {
                schema.conversion_error(line, "technology", &technology_raw, "工艺路线")
            })?;
            let reference_year = match schema.get_string(row, "reference_year") {
                Some(_) => schema.require_year(row, "reference_year", line)?,
                None => DEFAULT_REFERENCE_YEAR,
            };
            Ok(EmissionFactorEntry {
                region: schema.require_string(row, "region", line)?,
                technology_class,
                base_factor: schema.require_f64(row, "factor", line)?,
                reference_year,
                annual_improvement: schema.parse_f64(row, "annual_improvement", line)?,
            })
        })
        .collect()
}

pub fn load_region_map(table: &RawTable) -> ImportResult<RegionMap> {
    let schema = schemas::REGION_MAP.bind(&table.headers)?;
    let pairs = table
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let line = row_number(index);
            Ok((
                schema.require_string(row, "country", line)?,
                schema.require_string(row, "region", line)?,
            ))
        })
        .collect::<ImportResult<Vec<(String, String)>>>()?;
    Ok(RegionMap::from_pairs(pairs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::error::ImportError;

    fn table(headers: &[&str], rows: Vec<Vec<&str>>) -> RawTable {
        RawTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| {
                    headers
                        .iter()
                        .zip(r.iter())
                        .map(|(h, v)| (h.to_string(), v.to_string()))
                        .collect()
                })
                .collect(),
        }
    }

    #[test]
    fn test_registry_converts_kilotonnes_and_flags_ambiguous_dates() {
        let raw = table(
            &[
                "GEM Unit ID",
                "GEM Plant ID",
                "Plant name (English)",
                "Country",
                "Current Capacity (ttpa)",
                "Unit Status",
                "Start Date",
                "Parent",
            ],
            vec![vec![
                "U1",
                "P1",
                "Kimitsu",
                "Japan",
                "2500",
                "operating",
                "around then",
                "Nippon Steel Corp [100%]",
            ]],
        );
        let load = load_registry(&raw).unwrap();
        assert_eq!(load.units.len(), 1);
        let unit = &load.units[0];
        assert!((unit.capacity_per_year - 2.5).abs() < 1e-9);
        assert_eq!(unit.unit_start_year, None);
        assert_eq!(unit.unit_name, "Kimitsu");
        assert_eq!(load.ambiguous_dates.len(), 1);
        assert!(matches!(
            &load.ambiguous_dates[0],
            EngineError::AmbiguousDate { field, .. } if field == "unit_start"
        ));
    }

    #[test]
    fn test_entity_rules_merge_rows() {
        let raw = table(
            &["entity", "owner_pattern", "name_fallback"],
            vec![
                vec!["Nippon Steel", "Nippon Steel", ""],
                vec!["Nippon Steel", "NSSMC", "Kimitsu;Oita"],
            ],
        );
        let entities = load_entity_rules(&raw).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].owner_patterns, vec!["Nippon Steel", "NSSMC"]);
        assert_eq!(entities[0].name_fallback_patterns, vec!["Kimitsu", "Oita"]);
    }

    #[test]
    fn test_observation_without_rank_gets_default() {
        let raw = table(
            &["Company", "Year", "Value", "Source"],
            vec![vec!["SSAB", "2021", "8.1", "annual_report"]],
        );
        let obs = load_observations(&raw).unwrap();
        assert_eq!(obs[0].priority_rank, DEFAULT_PRIORITY_RANK);
        assert_eq!(obs[0].year, 2021);
    }

    #[test]
    fn test_registry_missing_capacity_defaults_to_zero() {
        let raw = table(
            &["unit_id", "plant_id", "plant_name", "country", "capacity_mtpa", "status", "owner"],
            vec![vec!["U1", "P1", "Oita", "Japan", "", "operating", "Nippon Steel [100%]"]],
        );
        let load = load_registry(&raw).unwrap();
        assert_eq!(load.units[0].capacity_per_year, 0.0);
    }

    #[test]
    fn test_fractional_priority_rank_is_rejected() {
        let raw = table(
            &["Company", "Year", "Value", "Source", "Priority"],
            vec![vec!["SSAB", "2021", "8.1", "annual_report", "1.5"]],
        );
        assert!(matches!(
            load_observations(&raw),
            Err(ImportError::TypeConversionError { .. })
        ));

        let raw = table(
            &["source_id", "kind", "priority_rank"],
            vec![vec!["annual_report", "disclosed", "0.5"]],
        );
        assert!(matches!(
            load_sources(&raw),
            Err(ImportError::TypeConversionError { .. })
        ));

        let raw = table(
            &["source_id", "kind", "priority_rank"],
            vec![vec!["annual_report", "disclosed", "2"]],
        );
        assert_eq!(load_sources(&raw).unwrap()[0].priority_rank, 2);
    }

    #[test]
    fn test_commitments_normalize_percentages() {
        let raw = table(
            &[
                "Company",
                "interim_target_year",
                "interim_target_pct",
                "end_target_year",
                "end_target_type",
            ],
            vec![
                vec!["SSAB", "2030", "35", "2045", "Net zero"],
                vec!["Tata", "", "", "", ""],
            ],
        );
        let commitments = load_commitments(&raw).unwrap();
        assert_eq!(commitments.len(), 2);
        assert_eq!(commitments[0].interim_target_year, Some(2030));
        assert!((commitments[0].interim_reduction.unwrap() - 0.35).abs() < 1e-9);
        assert_eq!(commitments[0].end_target_kind, CommitmentKind::NetZero);
        assert_eq!(commitments[1].end_target_year, None);
        assert_eq!(commitments[1].end_target_kind, CommitmentKind::Other);
    }
}
