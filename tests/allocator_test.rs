// ==========================================
// OutputAllocator 集成测试
// ==========================================
// 测试目标: 产能比例分配、排放汇总、区域分项目标、合理性标记
// ==========================================

mod helpers;

use helpers::test_data_builder::{context_builder, UnitBuilder};
use std::collections::BTreeMap;
use steel_apa::config::AllocationConfig;
use steel_apa::engine::{ActiveFleet, LoadedContext, OutputAllocator};
use steel_apa::{CanonicalEntity, EngineError, LifecyclePolicy, LifecycleStatus, TechnologyClass};

const EPS: f64 = 1e-9;

/// E: U1 10Mt 长流程, U2 5Mt 电炉, 均在 R1
fn two_unit_context() -> LoadedContext {
    context_with_u1_capacity(10.0)
}

fn context_with_u1_capacity(u1_capacity: f64) -> LoadedContext {
    context_builder(
        vec![
            UnitBuilder::new("U1")
                .capacity(u1_capacity)
                .owner("E Steel [100%]")
                .technology(TechnologyClass::PrimaryRoute)
                .build(),
            UnitBuilder::new("U2")
                .capacity(5.0)
                .owner("E Steel [100%]")
                .technology(TechnologyClass::ScrapRoute)
                .build(),
        ],
        vec![CanonicalEntity::new("E", "^E Steel")],
    )
    .build()
    .expect("上下文构建失败")
}

#[test]
fn test_allocate_two_unit_worked_example() {
    let ctx = two_unit_context();
    let units = ctx
        .active_units("E", 2024, LifecyclePolicy::historical())
        .expect("活跃装置查询失败");
    assert_eq!(units.len(), 2);

    let allocator = OutputAllocator::new(AllocationConfig::default());
    let result = allocator
        .allocate("E", 2024, 9.0, &units, ctx.factors(), None)
        .expect("分配失败");

    assert!((result.utilization - 0.6).abs() < EPS);
    assert!((result.active_capacity - 15.0).abs() < EPS);

    let u1 = result.units.iter().find(|u| u.unit_id == "U1").expect("缺少 U1");
    let u2 = result.units.iter().find(|u| u.unit_id == "U2").expect("缺少 U2");
    assert!((u1.allocated_output - 6.0).abs() < EPS);
    assert!((u2.allocated_output - 3.0).abs() < EPS);
    assert!((u1.emissions - 12.0).abs() < EPS);
    assert!((u2.emissions - 1.2).abs() < EPS);

    assert!((result.emissions - 13.2).abs() < EPS);
    let wef = result.weighted_emission_factor.expect("应有加权因子");
    assert!((wef - 13.2 / 9.0).abs() < EPS);
    assert!((wef - 1.467).abs() < 1e-3);
    assert!(result.violations.is_empty());
}

#[test]
fn test_allocated_sum_equals_target() {
    let ctx = two_unit_context();
    let units = ctx
        .active_units("E", 2021, LifecyclePolicy::historical())
        .expect("活跃装置查询失败");
    let allocator = OutputAllocator::new(AllocationConfig::default());

    for target in [0.0, 1.25, 7.5, 14.0] {
        let result = allocator
            .allocate("E", 2021, target, &units, ctx.factors(), None)
            .expect("分配失败");
        assert!(
            (result.allocated_output - target).abs() < 1e-6,
            "目标 {} 分配合计 {}",
            target,
            result.allocated_output
        );
        assert_eq!(result.unallocated_output, 0.0);
    }
}

#[test]
fn test_larger_capacity_gets_no_less_output() {
    let ctx = two_unit_context();
    let units = ctx
        .active_units("E", 2024, LifecyclePolicy::historical())
        .expect("活跃装置查询失败");
    let allocator = OutputAllocator::new(AllocationConfig::default());
    let result = allocator
        .allocate("E", 2024, 11.0, &units, ctx.factors(), None)
        .expect("分配失败");

    let mut by_capacity: Vec<_> = result.units.iter().collect();
    by_capacity.sort_by(|a, b| a.capacity.total_cmp(&b.capacity));
    for pair in by_capacity.windows(2) {
        assert!(pair[0].allocated_output <= pair[1].allocated_output);
    }
}

#[test]
fn test_raising_unit_capacity_raises_its_output() {
    let allocator = OutputAllocator::new(AllocationConfig::default());
    let utilization = 0.6;

    let u1_output = |capacity: f64| {
        let ctx = context_with_u1_capacity(capacity);
        let units = ctx
            .active_units("E", 2024, LifecyclePolicy::historical())
            .expect("活跃装置查询失败");
        let total: f64 = units.iter().map(|u| u.capacity()).sum();
        let result = allocator
            .allocate("E", 2024, total * utilization, &units, ctx.factors(), None)
            .expect("分配失败");
        assert!((result.utilization - utilization).abs() < EPS);
        let u1 = result.units.iter().find(|u| u.unit_id == "U1").expect("缺少 U1");
        u1.allocated_output
    };

    let base = u1_output(10.0);
    let raised = u1_output(12.0);
    assert!((base - 6.0).abs() < EPS);
    assert!((raised - 7.2).abs() < EPS);
    assert!(raised > base);
}

#[test]
fn test_zero_active_capacity_is_missing_data() {
    let ctx = context_builder(
        vec![UnitBuilder::new("U1")
            .capacity(0.0)
            .owner("E Steel [100%]")
            .build()],
        vec![CanonicalEntity::new("E", "^E Steel")],
    )
    .build()
    .expect("上下文构建失败");
    let units = ctx
        .active_units("E", 2024, LifecyclePolicy::historical())
        .expect("活跃装置查询失败");

    let allocator = OutputAllocator::new(AllocationConfig::default());
    let result = allocator.allocate("E", 2024, 5.0, &units, ctx.factors(), None);
    assert!(matches!(result, Err(EngineError::MissingData { .. })));

    // 无活跃装置同样报 MissingData
    let result = allocator.allocate("E", 2024, 5.0, &[], ctx.factors(), None);
    assert!(matches!(result, Err(EngineError::MissingData { .. })));
}

#[test]
fn test_retired_unit_excluded_from_allocation() {
    let ctx = context_builder(
        vec![
            UnitBuilder::new("U1")
                .capacity(10.0)
                .owner("E Steel [100%]")
                .build(),
            UnitBuilder::new("U2")
                .capacity(10.0)
                .owner("E Steel [100%]")
                .status(LifecycleStatus::Retired)
                .retirement_year(2022)
                .build(),
        ],
        vec![CanonicalEntity::new("E", "^E Steel")],
    )
    .build()
    .expect("上下文构建失败");
    let allocator = OutputAllocator::new(AllocationConfig::default());

    let units_2021 = ctx
        .active_units("E", 2021, LifecyclePolicy::historical())
        .expect("活跃装置查询失败");
    let units_2023 = ctx
        .active_units("E", 2023, LifecyclePolicy::historical())
        .expect("活跃装置查询失败");
    assert_eq!(units_2021.len(), 2);
    assert_eq!(units_2023.len(), 1);

    let result = allocator
        .allocate("E", 2023, 8.0, &units_2023, ctx.factors(), None)
        .expect("分配失败");
    assert!((result.utilization - 0.8).abs() < EPS);
    assert_eq!(result.units.len(), 1);
    assert_eq!(result.units[0].unit_id, "U1");
}

#[test]
fn test_regional_targets_with_residual() {
    let ctx = context_builder(
        vec![
            UnitBuilder::new("U1")
                .capacity(10.0)
                .country("R1")
                .owner("E Steel [100%]")
                .build(),
            UnitBuilder::new("U3")
                .capacity(10.0)
                .country("R2")
                .owner("E Steel [100%]")
                .build(),
        ],
        vec![CanonicalEntity::new("E", "^E Steel")],
    )
    .build()
    .expect("上下文构建失败");
    let units = ctx
        .active_units("E", 2024, LifecyclePolicy::historical())
        .expect("活跃装置查询失败");

    let mut regional = BTreeMap::new();
    regional.insert("R1".to_string(), 4.0);
    // 无产能的分项目标不计入已匹配
    regional.insert("Nowhere".to_string(), 2.0);

    let allocator = OutputAllocator::new(AllocationConfig::default());
    let result = allocator
        .allocate("E", 2024, 9.0, &units, ctx.factors(), Some(&regional))
        .expect("分配失败");

    let u1 = result.units.iter().find(|u| u.unit_id == "U1").expect("缺少 U1");
    let u3 = result.units.iter().find(|u| u.unit_id == "U3").expect("缺少 U3");
    assert!((u1.utilization - 0.4).abs() < EPS);
    assert!((u3.utilization - 0.5).abs() < EPS);
    assert!((u3.emissions - 5.0 * 1.8).abs() < EPS);
    assert!((result.allocated_output - 9.0).abs() < EPS);
    assert_eq!(result.unallocated_output, 0.0);
}

#[test]
fn test_regional_remainder_without_capacity_is_unallocated() {
    let ctx = two_unit_context();
    let units = ctx
        .active_units("E", 2024, LifecyclePolicy::historical())
        .expect("活跃装置查询失败");

    let mut regional = BTreeMap::new();
    regional.insert("r1".to_string(), 6.0);

    let allocator = OutputAllocator::new(AllocationConfig::default());
    let result = allocator
        .allocate("E", 2024, 9.0, &units, ctx.factors(), Some(&regional))
        .expect("分配失败");

    assert!((result.allocated_output - 6.0).abs() < EPS);
    assert!((result.unallocated_output - 3.0).abs() < EPS);
}

#[test]
fn test_plausibility_violation_is_flagged_not_dropped() {
    let ctx = two_unit_context();
    let units = ctx
        .active_units("E", 2024, LifecyclePolicy::historical())
        .expect("活跃装置查询失败");

    let allocator = OutputAllocator::new(AllocationConfig::default());
    let result = allocator
        .allocate("E", 2024, 30.0, &units, ctx.factors(), None)
        .expect("越界结果仍应返回");

    assert!((result.utilization - 2.0).abs() < EPS);
    assert!((result.allocated_output - 30.0).abs() < EPS);
    assert!(result.violations.iter().any(|v| matches!(
        v,
        EngineError::PlausibilityViolation { metric, .. } if metric == "utilization"
    )));
}
