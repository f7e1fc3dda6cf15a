// ==========================================
// 钢铁资产级排放核算引擎 - 批处理入口
// ==========================================
// 流程: 日志 → 配置库 → 输入目录 → 上下文 → 批处理 → 报告(JSON, stdout)
// 用法: steel-apa [输入目录]（缺省读取 STEEL_APA_INPUT_DIR,再缺省 ./input）
// ==========================================

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use steel_apa::config::{ConfigManager, EngineConfig};
use steel_apa::db::get_default_db_path;
use steel_apa::engine::BatchOrchestrator;
use steel_apa::importer::InputLoader;
use steel_apa::logging;

const INPUT_DIR_ENV: &str = "STEEL_APA_INPUT_DIR";
const REGISTRY_SHEET_ENV: &str = "STEEL_APA_REGISTRY_SHEET";
const LOG_FORMAT_ENV: &str = "STEEL_APA_LOG_FORMAT";

#[tokio::main]
async fn main() -> Result<()> {
    match std::env::var(LOG_FORMAT_ENV).as_deref() {
        Ok("json") => logging::init_json(),
        _ => logging::init(),
    }

    tracing::info!("==================================================");
    tracing::info!("{} v{}", steel_apa::APP_NAME, steel_apa::VERSION);
    tracing::info!("==================================================");

    // 配置
    let db_path = get_default_db_path();
    tracing::info!("使用配置库: {}", db_path);
    let manager = ConfigManager::new(&db_path)
        .map_err(|e| anyhow!("无法打开配置库 {}: {}", db_path, e))?;
    let config = EngineConfig::load(&manager)
        .await
        .map_err(|e| anyhow!("配置加载失败: {}", e))?;
    let snapshot = manager
        .get_config_snapshot()
        .map_err(|e| anyhow!("配置快照失败: {}", e))?;
    tracing::info!(snapshot = %snapshot, "本次批处理配置快照");

    // 输入
    let input_dir = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(INPUT_DIR_ENV).ok())
        .unwrap_or_else(|| "./input".to_string());
    let mut loader = InputLoader::new(&input_dir);
    if let Ok(sheet) = std::env::var(REGISTRY_SHEET_ENV) {
        loader = loader.with_registry_sheet(&sheet);
    }
    let bundle = tokio::task::spawn_blocking(move || loader.load())
        .await
        .context("输入加载任务失败")?
        .with_context(|| format!("输入目录加载失败: {}", input_dir))?;
    for issue in &bundle.ambiguous_dates {
        tracing::warn!("{}", issue);
    }

    // 上下文 + 批处理
    let ctx = bundle
        .into_context_builder(config.clone())
        .build()
        .context("上下文构建失败")?;
    let orchestrator = BatchOrchestrator::new(&config).context("批处理编排器初始化失败")?;
    let report = orchestrator.run(Arc::new(ctx)).await;

    tracing::info!(
        run_id = %report.run_id,
        entity_years = report.entity_years.len(),
        trajectory_rows = report.trajectories.len(),
        ownership_flags = report.mismatches.len(),
        divergence_rows = report.divergence.len(),
        pathway_rows = report.pathways.len(),
        issues = report.issues.len(),
        "批处理汇总"
    );

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("报告序列化失败")?
    );
    Ok(())
}
