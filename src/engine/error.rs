// ==========================================
// 钢铁资产级排放核算引擎 - 引擎错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 单个主体-年份的错误只记录不中断; 结构性错误才致命
// ==========================================

use thiserror::Error;

/// 引擎错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    // ===== 数据缺失 =====
    #[error("数据缺失 (主体 {entity}, 年份 {year}): {message}")]
    MissingData {
        entity: String,
        year: i32,
        message: String,
    },

    #[error("日期无法解析 (装置 {unit_id}, 字段 {field}): {value}")]
    AmbiguousDate {
        unit_id: String,
        field: String,
        value: String,
    },

    // ===== 软性问题（上报,不中断）=====
    #[error("股比未知 (主体 {entity}, 装置 {unit_id})")]
    EquityUnknown { entity: String, unit_id: String },

    #[error("合理性越界 (主体 {entity}, 年份 {year}, 指标 {metric}): 值 {value} 超过上限 {limit}")]
    PlausibilityViolation {
        entity: String,
        year: i32,
        metric: String,
        value: f64,
        limit: f64,
    },

    // ===== 结构性错误（致命）=====
    #[error("装置台账为空")]
    NoRegistry,

    #[error("装置记录非法 (装置 {unit_id}): {message}")]
    InvalidUnit { unit_id: String, message: String },

    #[error("排放因子表为空")]
    NoEmissionFactors,

    #[error("排放因子表非法: {0}")]
    InvalidEmissionFactors(String),

    #[error("匹配规则非法 (规则 {rule}): {message}")]
    InvalidRule { rule: String, message: String },

    #[error("未知主体: {0}")]
    UnknownEntity(String),

    #[error("配置非法: {0}")]
    InvalidConfig(String),

    #[error("任务执行失败: {0}")]
    TaskFailed(String),
}

impl EngineError {
    /// 是否为结构性错误（批处理需中止）
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            EngineError::NoRegistry
                | EngineError::InvalidUnit { .. }
                | EngineError::NoEmissionFactors
                | EngineError::InvalidEmissionFactors(_)
                | EngineError::InvalidRule { .. }
                | EngineError::InvalidConfig(_)
        )
    }
}

impl From<regex::Error> for EngineError {
    fn from(err: regex::Error) -> Self {
        EngineError::InvalidRule {
            rule: String::new(),
            message: err.to_string(),
        }
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
