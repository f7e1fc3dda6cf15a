// ==========================================
// 钢铁资产级排放核算引擎 - 股东文本解析
// ==========================================
// 职责: 自由文本股东字段 → 结构化 OwnerShare 列表
// 红线: 无股比注记时为 Unknown,不得默认为全资
// ==========================================

use crate::domain::entity::{Equity, OwnerShare};
use crate::engine::error::EngineResult;
use regex::Regex;

// ==========================================
// OwnerParser - 股东解析器
// ==========================================
#[derive(Debug, Clone)]
pub struct OwnerParser {
    equity_re: Regex,
}

impl OwnerParser {
    /// 创建解析器
    ///
    /// 股比注记支持 "[60%]" / "[60.0 %]" / "(60%)"
    pub fn new() -> EngineResult<Self> {
        let equity_re = Regex::new(r"[\[\(]\s*(\d+(?:\.\d+)?)\s*%\s*[\]\)]")?;
        Ok(Self { equity_re })
    }

    /// 解析股东文本
    ///
    /// # 规则
    /// - 按 ';' 拆分为多个股东
    /// - 股比注记 → Known(百分比/100),截断至 [0, 1]
    /// - 无注记 → Unknown
    /// - 空片段忽略
    ///
    /// # 示例
    /// "Nippon Steel Corp [51.0%]; ArcelorMittal SA [49.0%]"
    /// → [("Nippon Steel Corp", 0.51), ("ArcelorMittal SA", 0.49)]
    pub fn parse(&self, text: &str) -> Vec<OwnerShare> {
        text.split(';')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| match self.equity_re.captures(part) {
                Some(caps) => {
                    let fraction = caps
                        .get(1)
                        .and_then(|m| m.as_str().parse::<f64>().ok())
                        .map(|pct| (pct / 100.0).clamp(0.0, 1.0));
                    let name = self.equity_re.replace_all(part, "").trim().to_string();
                    OwnerShare {
                        owner_name: name,
                        equity: fraction.map(Equity::Known).unwrap_or(Equity::Unknown),
                    }
                }
                None => OwnerShare {
                    owner_name: part.to_string(),
                    equity: Equity::Unknown,
                },
            })
            .collect()
    }
}

/// 合并同一主体的多个持股（任一未知 → 未知）
pub fn combine_equity(shares: &[Equity]) -> Equity {
    let mut total = 0.0;
    for share in shares {
        match share {
            Equity::Known(f) => total += f,
            Equity::Unknown => return Equity::Unknown,
        }
    }
    Equity::Known(total.min(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multiple_owners_with_equity() {
        let parser = OwnerParser::new().unwrap();
        let shares = parser.parse("Nippon Steel Corp [51.0%]; ArcelorMittal SA [49%]");
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].owner_name, "Nippon Steel Corp");
        assert_eq!(shares[0].equity, Equity::Known(0.51));
        assert_eq!(shares[1].owner_name, "ArcelorMittal SA");
        assert_eq!(shares[1].equity, Equity::Known(0.49));
    }

    #[test]
    fn test_parse_without_annotation_is_unknown() {
        let parser = OwnerParser::new().unwrap();
        let shares = parser.parse("POSCO Holdings;  ; Tata Steel (100 %)");
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].equity, Equity::Unknown);
        assert_eq!(shares[1].owner_name, "Tata Steel");
        assert_eq!(shares[1].equity, Equity::Known(1.0));
    }

    #[test]
    fn test_combine_equity() {
        assert_eq!(
            combine_equity(&[Equity::Known(0.3), Equity::Known(0.2)]),
            Equity::Known(0.5)
        );
        assert_eq!(
            combine_equity(&[Equity::Known(0.3), Equity::Unknown]),
            Equity::Unknown
        );
    }
}
