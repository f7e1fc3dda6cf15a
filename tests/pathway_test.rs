// ==========================================
// 补充路径集成测试
// ==========================================
// 测试目标: 趋势外推增长率截断与起点选择、减排承诺插值、流水线输出
// ==========================================

mod helpers;

use helpers::test_data_builder::{context_builder, trusted, UnitBuilder};
use steel_apa::config::ProjectionConfig;
use steel_apa::domain::observation::CommitmentTarget;
use steel_apa::domain::types::{CommitmentKind, PathwayKind};
use steel_apa::engine::{EntityPipeline, PathwayBuilder};
use steel_apa::CanonicalEntity;

const EPS: f64 = 1e-9;

fn builder() -> PathwayBuilder {
    PathwayBuilder::new(ProjectionConfig::default())
}

fn commitment(
    interim: Option<(i32, f64)>,
    end_year: Option<i32>,
    kind: CommitmentKind,
    end_reduction: Option<f64>,
) -> CommitmentTarget {
    CommitmentTarget {
        entity: "E".to_string(),
        interim_target_year: interim.map(|(y, _)| y),
        interim_reduction: interim.map(|(_, r)| r),
        end_target_year: end_year,
        end_target_kind: kind,
        end_reduction,
    }
}

#[test]
fn test_trend_bau_compounds_from_base_year() {
    let history = vec![(2021, 10.0), (2023, 10.0 * 1.02 * 1.02), (2024, 11.0)];
    let rows = builder().trend_bau("E", &history).expect("应生成 BAU 路径");

    assert_eq!(rows.len(), 26);
    assert_eq!(rows.first().map(|r| r.year), Some(2025));
    assert_eq!(rows.last().map(|r| r.year), Some(2050));
    assert!(rows.iter().all(|r| r.kind == PathwayKind::TrendBau && r.base_year == 2024));

    let growth = rows[0].growth_rate.expect("应有增长率");
    assert!((growth - 0.02).abs() < 1e-12);
    assert!((rows[0].emissions - 11.0 * 1.02).abs() < EPS);
    let r2030 = rows.iter().find(|r| r.year == 2030).expect("缺少 2030");
    assert!((r2030.emissions - 11.0 * 1.02_f64.powi(6)).abs() < EPS);
}

#[test]
fn test_trend_bau_growth_is_capped() {
    // 年均 +20% → 截断至 +5%
    let rows = builder()
        .trend_bau("E", &[(2021, 10.0), (2022, 12.0), (2023, 14.4)])
        .expect("应生成 BAU 路径");
    assert_eq!(rows[0].growth_rate, Some(0.05));
    // 无基年值 → 以最新一年为起点
    assert_eq!(rows[0].base_year, 2023);
    assert!((rows[0].emissions - 14.4 * 1.05).abs() < EPS);

    // 年均 -50% → 截断至 -10%
    let rows = builder()
        .trend_bau("E", &[(2021, 10.0), (2022, 5.0)])
        .expect("应生成 BAU 路径");
    assert_eq!(rows[0].growth_rate, Some(-0.10));
}

#[test]
fn test_trend_bau_needs_two_positive_window_points() {
    assert!(builder().trend_bau("E", &[(2019, 8.0), (2023, 10.0)]).is_none());
    assert!(builder().trend_bau("E", &[(2021, 0.0), (2023, 10.0)]).is_none());
    assert!(builder().trend_bau("E", &[]).is_none());
}

#[test]
fn test_commitment_interpolates_between_targets() {
    let target = commitment(Some((2030, 0.25)), Some(2050), CommitmentKind::NetZero, None);
    let rows = builder()
        .commitment(&target, &[(2022, 18.0), (2024, 20.0)])
        .expect("应生成承诺路径");

    assert_eq!(rows.len(), 27);
    assert!(rows.iter().all(|r| r.kind == PathwayKind::Commitment && r.growth_rate.is_none()));
    let at = |year: i32| rows.iter().find(|r| r.year == year).map(|r| r.emissions);

    assert_eq!(at(2024), Some(20.0));
    assert!((at(2027).expect("缺少 2027") - 17.5).abs() < EPS);
    assert!((at(2030).expect("缺少 2030") - 15.0).abs() < EPS);
    assert!((at(2040).expect("缺少 2040") - 8.0).abs() < EPS);
    // 净零保留 5%
    assert!((at(2050).expect("缺少 2050") - 1.0).abs() < EPS);
}

#[test]
fn test_commitment_beyond_horizon_and_held_after_last_target() {
    // 远期目标晚于结束年: 默认绝对减排 40%
    let late = commitment(None, Some(2055), CommitmentKind::Reduction, None);
    let rows = builder()
        .commitment(&late, &[(2024, 20.0)])
        .expect("应生成承诺路径");
    let last = rows.last().expect("路径为空");
    assert_eq!(last.year, 2050);
    assert!((last.emissions - (20.0 + (12.0 - 20.0) * 26.0 / 31.0)).abs() < EPS);

    // 中期目标之后保持不变
    let interim_only = commitment(Some((2030, 0.5)), None, CommitmentKind::Other, None);
    let rows = builder()
        .commitment(&interim_only, &[(2024, 20.0)])
        .expect("应生成承诺路径");
    assert!(rows
        .iter()
        .filter(|r| r.year >= 2030)
        .all(|r| (r.emissions - 10.0).abs() < EPS));
}

#[test]
fn test_commitment_skipped_without_years_or_history() {
    let no_years = commitment(None, None, CommitmentKind::NetZero, None);
    assert!(builder().commitment(&no_years, &[(2024, 20.0)]).is_none());

    let target = commitment(None, Some(2050), CommitmentKind::NetZero, None);
    assert!(builder().commitment(&target, &[]).is_none());
}

#[test]
fn test_pipeline_emits_both_pathways() {
    let ctx = context_builder(
        vec![UnitBuilder::new("E1")
            .capacity(10.0)
            .owner("E Steel [100%]")
            .build()],
        vec![CanonicalEntity::new("E", "^E Steel")],
    )
    .trusted(vec![
        trusted("E", 2021, 15.0, None),
        trusted("E", 2023, 15.0, None),
        trusted("E", 2024, 16.0, Some(8.0)),
    ])
    .commitments(vec![commitment(
        Some((2030, 0.3)),
        Some(2050),
        CommitmentKind::CarbonNeutral,
        None,
    )])
    .build()
    .expect("上下文构建失败");

    let pipeline = EntityPipeline::new(ctx.config()).expect("流水线创建失败");
    let outcome = pipeline.run_entity(&ctx, "E");

    let bau: Vec<_> = outcome
        .pathways
        .iter()
        .filter(|r| r.kind == PathwayKind::TrendBau)
        .collect();
    assert_eq!(bau.len(), 26);
    assert!(bau.iter().all(|r| (r.emissions - 16.0).abs() < EPS));

    let committed: Vec<_> = outcome
        .pathways
        .iter()
        .filter(|r| r.kind == PathwayKind::Commitment)
        .collect();
    assert_eq!(committed.first().map(|r| (r.year, r.emissions)), Some((2024, 16.0)));
    let end = committed.last().expect("承诺路径为空");
    assert!((end.emissions - 1.6).abs() < EPS);
}
