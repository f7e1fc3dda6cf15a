// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: 配置读取、默认值回落、快照与恢复
// ==========================================

mod test_helpers;

use steel_apa::config::{config_keys, ConfigManager, EngineConfigReader};
use steel_apa::{AnnouncedPolicy, EngineConfig, TechnologyClass};
use test_helpers::{create_test_db, insert_config, open_test_connection};

#[tokio::test]
async fn test_config_manager_creation() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    let config_manager = ConfigManager::new(&db_path);
    assert!(
        config_manager.is_ok(),
        "ConfigManager should be created successfully"
    );
}

#[tokio::test]
async fn test_empty_store_yields_defaults() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    let config = EngineConfig::load(&config_manager)
        .await
        .expect("Failed to load engine config");
    assert_eq!(config, EngineConfig::default());
    assert!(config.validate().is_ok());
}

#[tokio::test]
async fn test_stored_values_override_defaults() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_test_connection(&db_path).expect("Failed to open db");
    insert_config(&conn, config_keys::PROJECTION_BASE_YEAR, "2023").expect("insert failed");
    insert_config(&conn, config_keys::PROJECTION_ANNOUNCED_POLICY, "strict").expect("insert failed");
    insert_config(&conn, config_keys::GAP_FILL_END_YEAR, "2018").expect("insert failed");
    insert_config(&conn, config_keys::DEFAULT_TECHNOLOGY, "EAF").expect("insert failed");
    insert_config(&conn, config_keys::COAL_REDUCTANT_COUNTRIES, "India; South Africa").expect("insert failed");
    insert_config(&conn, config_keys::AGREEMENT_STRONG_TOLERANCE, "0.1").expect("insert failed");
    insert_config(&conn, config_keys::TREND_GROWTH_MAX, "0.03").expect("insert failed");
    drop(conn);

    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    let config = EngineConfig::load(&config_manager)
        .await
        .expect("Failed to load engine config");

    assert_eq!(config.projection.base_year, 2023);
    assert_eq!(config.projection.announced_policy, AnnouncedPolicy::Strict);
    assert_eq!(config.reconciliation.gap_fill_end_year, 2018);
    assert_eq!(config.reconciliation.agreement_strong_tolerance, 0.1);
    assert_eq!(config.reconciliation.agreement_partial_tolerance, 0.30);
    assert_eq!(config.projection.trend_growth_max, 0.03);
    assert_eq!(config.technology.default_technology, TechnologyClass::ScrapRoute);
    assert_eq!(
        config.technology.coal_reductant_countries,
        vec!["India".to_string(), "South Africa".to_string()]
    );
}

#[tokio::test]
async fn test_malformed_value_falls_back_to_default() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    config_manager
        .set_global_config_value(config_keys::ALLOCATION_UTILIZATION_MAX, "not-a-number")
        .expect("Failed to set config");

    let allocation = config_manager
        .get_allocation_config()
        .await
        .expect("Failed to read allocation config");
    assert_eq!(allocation.utilization_max, 1.5);
}

#[tokio::test]
async fn test_invalid_combination_fails_validation() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    config_manager
        .set_global_config_value(config_keys::PROJECTION_END_YEAR, "2020")
        .expect("Failed to set config");

    // 结束年早于基年 → 加载即失败
    let result = EngineConfig::load(&config_manager).await;
    assert!(result.is_err(), "Inverted horizon should be rejected");
}

#[tokio::test]
async fn test_snapshot_round_trip_restores_values() {
    let (_temp_a, db_a) = create_test_db().expect("Failed to create test db");
    let (_temp_b, db_b) = create_test_db().expect("Failed to create test db");

    let source = ConfigManager::new(&db_a).expect("Failed to create ConfigManager");
    source
        .set_global_config_value(config_keys::EQUITY_TOLERANCE, "0.05")
        .expect("Failed to set config");
    let snapshot = source.get_config_snapshot().expect("Failed to snapshot");

    let target = ConfigManager::new(&db_b).expect("Failed to create ConfigManager");
    let restored = target
        .restore_config_from_snapshot(&snapshot)
        .expect("Failed to restore");
    assert_eq!(restored, 1);

    let audit = target.get_audit_config().await.expect("Failed to read audit config");
    assert_eq!(audit.equity_tolerance, 0.05);
}
