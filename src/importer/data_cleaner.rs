// ==========================================
// 学校学生管理系统 - 数据清洗
// ==========================================
// 职责: TRIM / NULL 标准化 / 日期与整数解析
// ==========================================

use chrono::NaiveDate;

/// 接受的日期格式（按顺序尝试）
pub const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y", "%Y%m%d"];

pub struct DataCleaner;

impl DataCleaner {
    /// 空白字符串视为缺失
    pub fn normalize_null(value: &str) -> Option<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// 按 DATE_FORMATS 解析日期；Excel 导出的 "YYYY-MM-DD HH:MM:SS" 取日期部分
    pub fn parse_date(value: &str) -> Option<NaiveDate> {
        let value = value.trim();
        let date_part = value.split_whitespace().next().unwrap_or(value);
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
    }

    /// 解析十进制整数；允许 "12.0" 这类表格导出的写法
    ///
    /// 超出 i64 范围、指数写法（"1e3"）、非零小数均返回 None
    pub fn parse_integer(value: &str) -> Option<i64> {
        let value = value.trim();
        if let Ok(n) = value.parse::<i64>() {
            return Some(n);
        }

        let (int_part, frac_part) = value.split_once('.')?;
        if frac_part.is_empty() || !frac_part.bytes().all(|b| b == b'0') {
            return None;
        }
        int_part.parse::<i64>().ok()
    }
}
