// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时配置库、临时输入目录
// ==========================================

#![allow(dead_code)]

use rusqlite::Connection;
use std::error::Error;
use std::fs;
use std::path::Path;
use tempfile::{NamedTempFile, TempDir};

/// 创建临时测试数据库并初始化 config_kv
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时路径非 UTF-8")?
        .to_string();

    let conn = Connection::open(&db_path)?;
    steel_apa::db::ensure_config_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 写入 global 作用域配置
pub fn insert_config(conn: &Connection, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
    conn.execute(
        "INSERT OR REPLACE INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)",
        [key, value],
    )?;
    Ok(())
}

pub fn open_test_connection(db_path: &str) -> Result<Connection, Box<dyn Error>> {
    Ok(Connection::open(db_path)?)
}

/// 创建临时输入目录
pub fn create_input_dir() -> Result<TempDir, Box<dyn Error>> {
    Ok(TempDir::new()?)
}

/// 在输入目录写入 CSV 表
pub fn write_csv(dir: &Path, stem: &str, lines: &[&str]) -> Result<(), Box<dyn Error>> {
    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(dir.join(format!("{}.csv", stem)), content)?;
    Ok(())
}
