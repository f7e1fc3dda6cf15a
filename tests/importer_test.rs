// ==========================================
// 输入目录加载集成测试
// ==========================================
// 测试目标: 字段映射、单位换算、缺失表处理、映射失败报错
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

use steel_apa::engine::ActiveFleet;
use steel_apa::importer::{file_names, ImportError, InputLoader};
use steel_apa::{EngineConfig, EngineError, LifecyclePolicy, LifecycleStatus, TechnologyClass};
use test_helpers::{create_input_dir, write_csv};

const REGISTRY_GEM: &[&str] = &[
    "GEM Unit ID,GEM Plant ID,Plant name (English),Country/Area,Current Capacity (ttpa),Unit Status,Start Date,Parent,Technology",
    "U1,P1,Alpha Works,R1,\"2,500\",operating,2005-06,Alpha Corp [100%],BF-BOF",
    "U2,P2,Alpha Mini Mill,R1,1000,Operating Pre-Retirement,sometime,Alpha Corp [60%]; Beta [40%],EAF",
];

const ENTITY_RULES: &[&str] = &["entity,owner_pattern,name_fallback", "Alpha,^Alpha Corp,Alpha"];

#[test]
fn test_load_directory_with_gem_headers() {
    let dir = create_input_dir().expect("创建临时目录失败");
    write_csv(dir.path(), file_names::REGISTRY, REGISTRY_GEM).expect("写入失败");
    write_csv(dir.path(), file_names::ENTITY_RULES, ENTITY_RULES).expect("写入失败");
    write_csv(
        dir.path(),
        file_names::OBSERVATIONS,
        &[
            "Company Name,Year,Value,Source",
            "Alpha,2020,3.1,audited",
            "Alpha,2020,2.9,modeled",
        ],
    )
    .expect("写入失败");
    write_csv(
        dir.path(),
        file_names::SOURCES,
        &["source_id,kind,priority_rank", "audited,AUDITED,0", "modeled,MODELED,1"],
    )
    .expect("写入失败");

    let bundle = InputLoader::new(dir.path()).load().expect("加载失败");

    assert_eq!(bundle.units.len(), 2);
    let u1 = bundle.units.iter().find(|u| u.unit_id == "U1").expect("缺少 U1");
    assert!((u1.capacity_per_year - 2.5).abs() < 1e-9);
    assert_eq!(u1.unit_start_year, Some(2005));
    assert_eq!(u1.lifecycle_status, LifecycleStatus::Operating);
    assert_eq!(u1.declared_technology, Some(TechnologyClass::PrimaryRoute));

    let u2 = bundle.units.iter().find(|u| u.unit_id == "U2").expect("缺少 U2");
    assert!((u2.capacity_per_year - 1.0).abs() < 1e-9);
    assert_eq!(u2.lifecycle_status, LifecycleStatus::OperatingPreRetirement);
    assert_eq!(u2.unit_start_year, None);

    // 无法解析的日期按缺失处理并上报
    assert_eq!(bundle.ambiguous_dates.len(), 1);
    assert!(matches!(
        &bundle.ambiguous_dates[0],
        EngineError::AmbiguousDate { unit_id, .. } if unit_id == "U2"
    ));

    assert_eq!(bundle.entities.len(), 1);
    assert_eq!(bundle.entities[0].name_fallback_patterns, vec!["Alpha".to_string()]);
    assert_eq!(bundle.observations.len(), 2);
    assert_eq!(bundle.sources.len(), 2);

    // 可选表缺失 → 空
    assert!(bundle.exclusions.is_empty());
    assert!(bundle.transfers.is_empty());
    assert!(bundle.emission_factors.is_empty());
    assert!(bundle.regions.is_none());
    assert!(bundle.commitments.is_empty());
}

#[test]
fn test_loaded_bundle_builds_context() {
    let dir = create_input_dir().expect("创建临时目录失败");
    write_csv(dir.path(), file_names::REGISTRY, REGISTRY_GEM).expect("写入失败");
    write_csv(dir.path(), file_names::ENTITY_RULES, ENTITY_RULES).expect("写入失败");
    write_csv(
        dir.path(),
        file_names::EMISSION_FACTORS,
        &[
            "region,technology,factor,annual_improvement",
            "R1,BF-BOF,2.0,",
            "R1,EAF,0.4,",
        ],
    )
    .expect("写入失败");
    write_csv(dir.path(), file_names::REGION_MAP, &["country,region", "R1,R1"]).expect("写入失败");
    write_csv(
        dir.path(),
        file_names::COMMITMENTS,
        &[
            "Company,Interim Target Year,Interim Target %,End Target Year,End Target Type",
            "Alpha,2030,30%,2050,Carbon neutral",
        ],
    )
    .expect("写入失败");

    let bundle = InputLoader::new(dir.path()).load().expect("加载失败");
    assert!(bundle.regions.is_some());
    assert_eq!(bundle.emission_factors.len(), 2);

    let ctx = bundle
        .into_context_builder(EngineConfig::default())
        .build()
        .expect("上下文构建失败");
    let units = ctx
        .active_units("Alpha", 2020, LifecyclePolicy::historical())
        .expect("活跃装置查询失败");
    assert_eq!(units.len(), 2);
    assert_eq!(ctx.factors().factor("R1", TechnologyClass::ScrapRoute, 2030), Some(0.4));

    let commitment = ctx.commitment_for("Alpha").expect("缺少减排承诺");
    assert_eq!(commitment.end_target_year, Some(2050));
    assert!((commitment.interim_reduction.expect("缺少中期比例") - 0.3).abs() < 1e-9);
}

#[test]
fn test_missing_registry_is_file_not_found() {
    let dir = create_input_dir().expect("创建临时目录失败");
    write_csv(dir.path(), file_names::ENTITY_RULES, ENTITY_RULES).expect("写入失败");

    let result = InputLoader::new(dir.path()).load();
    assert!(matches!(result, Err(ImportError::FileNotFound(_))));
}

#[test]
fn test_unmapped_required_column_is_rejected() {
    let dir = create_input_dir().expect("创建临时目录失败");
    // 缺少股东列
    write_csv(
        dir.path(),
        file_names::REGISTRY,
        &[
            "unit_id,plant_id,plant_name,country,capacity_mtpa,status",
            "U1,P1,Alpha Works,R1,2.5,operating",
        ],
    )
    .expect("写入失败");
    write_csv(dir.path(), file_names::ENTITY_RULES, ENTITY_RULES).expect("写入失败");

    let result = InputLoader::new(dir.path()).load();
    match result {
        Err(ImportError::UnmappedRequiredField { table, field, .. }) => {
            assert_eq!(table, "registry");
            assert_eq!(field, "owner");
        }
        other => panic!("应报字段映射失败,实际: {:?}", other.map(|b| b.units.len())),
    }
}

#[test]
fn test_unknown_status_is_type_conversion_error() {
    let dir = create_input_dir().expect("创建临时目录失败");
    write_csv(
        dir.path(),
        file_names::REGISTRY,
        &[
            "unit_id,plant_id,plant_name,country,capacity_mtpa,status,owner",
            "U1,P1,Alpha Works,R1,2.5,dismantled,Alpha Corp",
        ],
    )
    .expect("写入失败");
    write_csv(dir.path(), file_names::ENTITY_RULES, ENTITY_RULES).expect("写入失败");

    let result = InputLoader::new(dir.path()).load();
    assert!(matches!(result, Err(ImportError::TypeConversionError { .. })));
}
