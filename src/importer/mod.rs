// ==========================================
// 钢铁资产级排放核算引擎 - 导入层
// ==========================================
// 职责: 外部表格 → 领域记录（显式字段映射表）
// 支持: Excel, CSV
// ==========================================

pub mod error;
pub mod file_parser;
pub mod input_loader;
pub mod schema_map;
pub mod table_loader;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawTable, UniversalFileParser};
pub use input_loader::{file_names, InputBundle, InputLoader};
pub use schema_map::{parse_year, schemas, BoundSchema, FieldSpec, SchemaMap, YearValue};
pub use table_loader::{RegistryLoad, DEFAULT_PRIORITY_RANK};
