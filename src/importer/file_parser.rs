// ==========================================
// 钢铁资产级排放核算引擎 - 文件解析器
// ==========================================
// 职责: 表格文件 → 表头 + 原始行（字符串）
// 支持: Excel (.xlsx/.xls, 可指定工作表) / CSV (.csv)
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// 原始表（表头保持文件原样,值已 trim）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

impl RawTable {
    fn push_row(&mut self, row: HashMap<String, String>) {
        // 跳过完全空白的行
        if row.values().all(|v| v.is_empty()) {
            return;
        }
        self.rows.push(row);
    }
}

/// 文件解析接口
pub trait FileParser {
    fn parse_table(&self, file_path: &Path) -> ImportResult<RawTable>;
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_table(&self, file_path: &Path) -> ImportResult<RawTable> {
        ensure_exists(file_path)?;
        let ext = extension(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut table = RawTable {
            headers: headers.clone(),
            rows: Vec::new(),
        };
        for result in reader.records() {
            let record = result?;
            let row = record
                .iter()
                .enumerate()
                .filter_map(|(i, v)| headers.get(i).map(|h| (h.clone(), v.trim().to_string())))
                .collect();
            table.push_row(row);
        }
        Ok(table)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser {
    /// 指定工作表;None 时读取第一个
    pub sheet: Option<String>,
}

impl FileParser for ExcelParser {
    fn parse_table(&self, file_path: &Path) -> ImportResult<RawTable> {
        ensure_exists(file_path)?;
        let ext = extension(file_path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;
        let sheet_names = workbook.sheet_names().to_owned();
        let sheet_name = match &self.sheet {
            Some(wanted) => sheet_names
                .iter()
                .find(|s| s.eq_ignore_ascii_case(wanted))
                .cloned()
                .ok_or_else(|| ImportError::SheetNotFound(wanted.clone()))?,
            None => sheet_names
                .first()
                .cloned()
                .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?,
        };

        let range = workbook.worksheet_range(&sheet_name)?;
        let mut rows = range.rows();
        let header_row = rows
            .next()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无数据行".to_string()))?;
        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let mut table = RawTable {
            headers: headers.clone(),
            rows: Vec::new(),
        };
        for data_row in rows {
            let row = data_row
                .iter()
                .enumerate()
                .filter_map(|(i, cell)| {
                    headers
                        .get(i)
                        .map(|h| (h.clone(), cell.to_string().trim().to_string()))
                })
                .collect();
            table.push_row(row);
        }
        Ok(table)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct UniversalFileParser {
    pub sheet: Option<String>,
}

impl UniversalFileParser {
    pub fn with_sheet(sheet: &str) -> Self {
        Self {
            sheet: Some(sheet.to_string()),
        }
    }

    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<RawTable> {
        let path = file_path.as_ref();
        match extension(path).as_str() {
            "csv" => CsvParser.parse_table(path),
            "xlsx" | "xls" => ExcelParser {
                sheet: self.sheet.clone(),
            }
            .parse_table(path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[test]
    fn test_csv_parser_valid_file() {
        let file = csv_file(&["Plant ID,Capacity,Country", "P100,2.5,Japan", "P200,3.0,India"]);
        let table = CsvParser.parse_table(file.path()).unwrap();

        assert_eq!(table.headers, vec!["Plant ID", "Capacity", "Country"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("Plant ID"), Some(&"P100".to_string()));
        assert_eq!(table.rows[1].get("Capacity"), Some(&"3.0".to_string()));
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse_table(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_csv_parser_skip_empty_rows() {
        let file = csv_file(&["Plant ID,Capacity", "P100,2.5", ",", "P200,3.0"]);
        let table = CsvParser.parse_table(file.path()).unwrap();
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let file = Builder::new().suffix(".json").tempfile().unwrap();
        let result = UniversalFileParser::default().parse(file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }
}
