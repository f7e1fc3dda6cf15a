// ==========================================
// 钢铁资产级排放核算引擎 - 字段映射表
// ==========================================
// 职责: 源列名 → 标准字段的显式映射 + 类型转换
// 红线: 必需字段在加载前对表头校验,缺失即失败
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// 单个标准字段的映射定义
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: &'static str,
    /// 可接受的源列名（大小写与首尾空白不敏感）
    pub aliases: &'static [&'static str],
    pub required: bool,
}

const fn req(field: &'static str, aliases: &'static [&'static str]) -> FieldSpec {
    FieldSpec {
        field,
        aliases,
        required: true,
    }
}

const fn opt(field: &'static str, aliases: &'static [&'static str]) -> FieldSpec {
    FieldSpec {
        field,
        aliases,
        required: false,
    }
}

/// 一张输入表的映射表
#[derive(Debug, Clone, Copy)]
pub struct SchemaMap {
    pub table: &'static str,
    pub fields: &'static [FieldSpec],
}

impl SchemaMap {
    /// 对表头绑定映射
    ///
    /// # 返回
    /// - Ok(BoundSchema): 字段 → 实际列名
    /// - Err(UnmappedRequiredField): 必需字段无任何可接受列名
    pub fn bind(&self, headers: &[String]) -> ImportResult<BoundSchema> {
        let normalized: Vec<(String, &String)> = headers
            .iter()
            .map(|h| (h.trim().to_lowercase(), h))
            .collect();

        let mut columns = HashMap::new();
        for spec in self.fields {
            let found = spec.aliases.iter().find_map(|alias| {
                let alias = alias.to_lowercase();
                normalized
                    .iter()
                    .find(|(n, _)| *n == alias)
                    .map(|(_, original)| (*original).clone())
            });
            match found {
                Some(column) => {
                    columns.insert(spec.field, column);
                }
                None if spec.required => {
                    return Err(ImportError::UnmappedRequiredField {
                        table: self.table.to_string(),
                        field: spec.field.to_string(),
                        aliases: spec.aliases.join(" | "),
                    });
                }
                None => {}
            }
        }

        Ok(BoundSchema {
            table: self.table,
            columns,
        })
    }
}

/// 已绑定表头的映射
#[derive(Debug, Clone)]
pub struct BoundSchema {
    table: &'static str,
    columns: HashMap<&'static str, String>,
}

impl BoundSchema {
    pub fn table(&self) -> &'static str {
        self.table
    }

    /// 字段实际绑定的源列名
    pub fn column(&self, field: &str) -> Option<&str> {
        self.columns.get(field).map(|s| s.as_str())
    }

    /// 提取字符串字段（空串视为缺失）
    pub fn get_string(&self, row: &HashMap<String, String>, field: &str) -> Option<String> {
        let column = self.columns.get(field)?;
        row.get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
    }

    pub fn require_string(
        &self,
        row: &HashMap<String, String>,
        field: &str,
        row_number: usize,
    ) -> ImportResult<String> {
        self.get_string(row, field)
            .ok_or_else(|| ImportError::MissingValue {
                table: self.table.to_string(),
                row: row_number,
                field: field.to_string(),
            })
    }

    /// 解析浮点字段（容忍千分位逗号与百分号）
    pub fn parse_f64(
        &self,
        row: &HashMap<String, String>,
        field: &str,
        row_number: usize,
    ) -> ImportResult<Option<f64>> {
        let Some(raw) = self.get_string(row, field) else {
            return Ok(None);
        };
        let cleaned = raw.replace(',', "");
        let (number, divisor) = match cleaned.strip_suffix('%') {
            Some(n) => (n.trim(), 100.0),
            None => (cleaned.as_str(), 1.0),
        };
        match number.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v / divisor)),
            _ => Err(self.conversion_error(row_number, field, &raw, "数值")),
        }
    }

    pub fn require_f64(
        &self,
        row: &HashMap<String, String>,
        field: &str,
        row_number: usize,
    ) -> ImportResult<f64> {
        self.parse_f64(row, field, row_number)?
            .ok_or_else(|| ImportError::MissingValue {
                table: self.table.to_string(),
                row: row_number,
                field: field.to_string(),
            })
    }

    /// 解析整数年份列（"2019" / "2019.0"）
    pub fn require_year(
        &self,
        row: &HashMap<String, String>,
        field: &str,
        row_number: usize,
    ) -> ImportResult<i32> {
        let raw = self.require_string(row, field, row_number)?;
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0 && (1900.0..=2100.0).contains(v))
            .map(|v| v as i32)
            .ok_or_else(|| self.conversion_error(row_number, field, &raw, "年份"))
    }

    pub fn conversion_error(
        &self,
        row_number: usize,
        field: &str,
        raw: &str,
        expected: &str,
    ) -> ImportError {
        ImportError::TypeConversionError {
            table: self.table.to_string(),
            row: row_number,
            field: field.to_string(),
            message: format!("无法解析为{}: '{}'", expected, raw),
        }
    }
}

/// 年份抽取结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearValue {
    Missing,
    Year(i32),
    /// 非空但无法抽取出年份
    Ambiguous,
}

fn year_regex() -> Option<&'static Regex> {
    static YEAR_RE: OnceLock<Option<Regex>> = OnceLock::new();
    YEAR_RE
        .get_or_init(|| Regex::new(r"\b(19|20)\d{2}\b").ok())
        .as_ref()
}

/// 从自由文本中抽取年份
///
/// # 规则
/// - 空值 → Missing
/// - "2019" / "2019.0" / "2019-05" / "c. 1965" → 第一个 4 位年份
/// - 范围 1900..=2100 之外或无年份 → Ambiguous
pub fn parse_year(raw: Option<&str>) -> YearValue {
    let Some(text) = raw.map(str::trim).filter(|t| !t.is_empty()) else {
        return YearValue::Missing;
    };
    if let Ok(v) = text.parse::<f64>() {
        if v.fract() == 0.0 && (1900.0..=2100.0).contains(&v) {
            return YearValue::Year(v as i32);
        }
    }
    year_regex()
        .and_then(|re| re.find(text))
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .filter(|y| (1900..=2100).contains(y))
        .map(YearValue::Year)
        .unwrap_or(YearValue::Ambiguous)
}

// ==========================================
// 映射表定义
// ==========================================
pub mod schemas {
    use super::{opt, req, SchemaMap};

    pub const REGISTRY: SchemaMap = SchemaMap {
        table: "registry",
        fields: &[
            req("unit_id", &["unit_id", "GEM Unit ID", "Unit ID"]),
            req("plant_id", &["plant_id", "GEM Plant ID", "Plant ID"]),
            opt("unit_name", &["unit_name", "Unit Name", "Unit name"]),
            req("plant_name", &["plant_name", "Plant name (English)", "Plant Name"]),
            req("country", &["country", "Country", "Country/Area"]),
            req(
                "capacity",
                &[
                    "capacity_mtpa",
                    "Capacity (Mtpa)",
                    "capacity_ttpa",
                    "Current Capacity (ttpa)",
                    "Nominal crude steel capacity (ttpa)",
                ],
            ),
            req("status", &["status", "Unit Status", "Status"]),
            opt("unit_start", &["unit_start", "Start Date", "Unit Start"]),
            opt("plant_start", &["plant_start", "Plant Start", "Start year"]),
            opt(
                "pre_retirement_announcement",
                &["pre_retirement_announcement", "Pre-retirement Announcement Date"],
            ),
            opt("retirement", &["retirement", "Retired Date", "Retirement Date"]),
            req("owner", &["owner", "Parent", "Owner"]),
            opt("technology", &["technology", "Technology", "Process route"]),
            opt(
                "primary_capacity",
                &["primary_capacity", "Nominal BF capacity (ttpa)", "BF capacity"],
            ),
            opt(
                "reduced_iron_capacity",
                &["reduced_iron_capacity", "Nominal DRI capacity (ttpa)", "DRI capacity"],
            ),
            opt(
                "scrap_capacity",
                &["scrap_capacity", "Nominal EAF steel capacity (ttpa)", "EAF capacity"],
            ),
            opt("equipment", &["equipment", "Main production equipment"]),
            opt("reductant", &["reductant", "Reductant"]),
        ],
    };

    pub const OBSERVATIONS: SchemaMap = SchemaMap {
        table: "observations",
        fields: &[
            req("entity", &["entity", "Company Name", "Company"]),
            req("year", &["year", "Year"]),
            req("quantity", &["quantity", "Output (Mt)", "Value"]),
            req("source_id", &["source_id", "Source"]),
            opt("priority_rank", &["priority_rank", "Priority"]),
        ],
    };

    pub const SOURCES: SchemaMap = SchemaMap {
        table: "sources",
        fields: &[
            req("source_id", &["source_id", "Source"]),
            req("kind", &["kind", "Source Kind", "Certainty"]),
            req("priority_rank", &["priority_rank", "Priority"]),
        ],
    };

    pub const EXCLUSIONS: SchemaMap = SchemaMap {
        table: "exclusions",
        fields: &[
            req("entity", &["entity", "Company Name", "Company"]),
            req("year", &["year", "Year"]),
            req("source_id", &["source_id", "Source"]),
        ],
    };

    pub const TRUSTED: SchemaMap = SchemaMap {
        table: "trusted",
        fields: &[
            req("entity", &["entity", "Company Name", "Company"]),
            req("year", &["year", "Year"]),
            req("emissions", &["emissions", "Emissions (MtCO2)"]),
            opt("output", &["output", "Output (Mt)"]),
        ],
    };

    pub const REFERENCE_TRAJECTORIES: SchemaMap = SchemaMap {
        table: "reference_trajectories",
        fields: &[
            req("entity", &["entity", "Company Name", "Company"]),
            req("year", &["year", "Year"]),
            req("scenario", &["scenario", "Scenario"]),
            req("emissions", &["emissions", "Emissions (MtCO2)", "Value"]),
        ],
    };

    pub const ENTITY_RULES: SchemaMap = SchemaMap {
        table: "entity_rules",
        fields: &[
            req("entity", &["entity", "Company Name", "Company"]),
            req("owner_pattern", &["owner_pattern", "Owner Pattern"]),
            opt("name_fallback", &["name_fallback", "Name Fallback"]),
            opt("name_prefixes", &["name_prefixes", "Name Prefixes"]),
        ],
    };

    pub const TRANSFERS: SchemaMap = SchemaMap {
        table: "transfers",
        fields: &[
            req("acquirer", &["acquirer", "Acquirer"]),
            req("target", &["target", "Target"]),
            req("unit_pattern", &["unit_pattern", "Unit Pattern"]),
            req("effective_year", &["effective_year", "Effective Year"]),
        ],
    };

    pub const EMISSION_FACTORS: SchemaMap = SchemaMap {
        table: "emission_factors",
        fields: &[
            req("region", &["region", "Region"]),
            req("technology", &["technology", "Technology"]),
            req("factor", &["factor", "EF (tCO2/t)", "Emission Factor"]),
            opt("reference_year", &["reference_year", "Reference Year"]),
            opt("annual_improvement", &["annual_improvement", "Annual Improvement"]),
        ],
    };

    pub const REGION_MAP: SchemaMap = SchemaMap {
        table: "region_map",
        fields: &[
            req("country", &["country", "Country"]),
            req("region", &["region", "Region", "EF Region"]),
        ],
    };

    pub const REFERENCE_OWNERSHIP: SchemaMap = SchemaMap {
        table: "reference_ownership",
        fields: &[
            req("entity", &["entity", "Company Name", "Company"]),
            req("plant_name", &["plant_name", "Plant Name", "Plant"]),
            req("country", &["country", "Country"]),
            opt("equity", &["equity", "Equity", "Share"]),
            opt("status", &["status", "Status"]),
        ],
    };

    pub const COMMITMENTS: SchemaMap = SchemaMap {
        table: "commitments",
        fields: &[
            req("entity", &["entity", "Company Name", "Company"]),
            opt("interim_target_year", &["interim_target_year", "Interim Target Year"]),
            opt(
                "interim_reduction",
                &["interim_reduction", "interim_target_pct", "Interim Target %"],
            ),
            opt("end_target_year", &["end_target_year", "End Target Year"]),
            opt("end_target_type", &["end_target_type", "End Target Type"]),
            opt("end_reduction", &["end_reduction", "end_target_pct", "End Target %"]),
        ],
    };

    pub const REGIONAL_TARGETS: SchemaMap = SchemaMap {
        table: "regional_targets",
        fields: &[
            req("entity", &["entity", "Company Name", "Company"]),
            req("year", &["year", "Year"]),
            req("country", &["country", "Country"]),
            req("quantity", &["quantity", "Output (Mt)", "Value"]),
        ],
    };
}
