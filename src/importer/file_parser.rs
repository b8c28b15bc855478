// ==========================================
// 学校学生管理系统 - 文件解析器实现
// ==========================================
// 阶段: 读取
// 支持: Excel (.xlsx/.xls/.ods) / CSV，按文件头魔数识别
// 约定: 第一个非空行为表头（通常是第 1 行）；列顺序固定，不做表头名匹配
// ==========================================

use crate::domain::student::{RawRow, StudentRowData};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::TabularReader;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Duration, NaiveDate};
use csv::ReaderBuilder;
use std::io::Cursor;

/// ZIP 容器（xlsx / ods）
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
/// OLE2 复合文档（xls）
const OLE_MAGIC: [u8; 4] = [0xD0, 0xCF, 0x11, 0xE0];

/// 将一组单元格转为 RawRow，姓名为空的行返回 None
fn to_raw_row<S: AsRef<str>>(row_number: usize, cells: &[S]) -> Option<RawRow> {
    let data = StudentRowData::from_cells(cells);
    if data.is_blank() {
        return None;
    }
    Some(RawRow::new(row_number, data))
}

fn non_empty(rows: Vec<RawRow>) -> ImportResult<Vec<RawRow>> {
    if rows.is_empty() {
        Err(ImportError::EmptyDocument)
    } else {
        Ok(rows)
    }
}

// ==========================================
// CSV Reader 实现
// ==========================================
pub struct CsvReader;

impl TabularReader for CsvReader {
    fn read_rows(&self, data: &[u8]) -> ImportResult<Vec<RawRow>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false) // 表头按行号跳过
            .flexible(true) // 允许行长度不一致
            .from_reader(data);

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            // 物理行号；csv 会跳过空行，按记录序号会错位
            let row_number = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 1);

            if idx == 0 {
                continue;
            }

            let cells: Vec<&str> = record.iter().collect();
            if let Some(row) = to_raw_row(row_number, &cells) {
                rows.push(row);
            }
        }

        non_empty(rows)
    }
}

// ==========================================
// Excel Reader 实现
// ==========================================
pub struct ExcelReader;

impl ExcelReader {
    /// 单元格转字符串: 日期 → YYYY-MM-DD，整数浮点去掉 .0
    fn cell_to_string(cell: &Data) -> String {
        match cell {
            Data::Empty | Data::Error(_) => String::new(),
            Data::String(s) => s.trim().to_string(),
            Data::Int(i) => i.to_string(),
            Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
            Data::Float(f) => f.to_string(),
            Data::Bool(b) => b.to_string(),
            Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| dt.as_f64().to_string()),
            Data::DateTimeIso(s) => s.get(..10).unwrap_or(s).to_string(),
            Data::DurationIso(s) => s.clone(),
        }
    }
}

/// Excel 序列日期（1900 体系）
///
/// Excel 把 1900 年当作闰年: 序列 60 是不存在的 1900-02-29（此处映射为 03-01），
/// 序列 1..=59 以 1899-12-31 为纪元，61 起以 1899-12-30 为纪元
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let days = serial.floor() as i64;
    let epoch = if days < 61 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    epoch.checked_add_signed(Duration::days(days))
}

impl TabularReader for ExcelReader {
    fn read_rows(&self, data: &[u8]) -> ImportResult<Vec<RawRow>> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(data))?;

        // 读取第一个 sheet
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ImportError::FormatError("The workbook has no worksheets".into()))??;

        // Range 从第一个非空单元格所在行开始，行号需要加上偏移
        let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);

        let mut rows = Vec::new();
        for (idx, cells) in range.rows().enumerate() {
            let row_number = first_row + idx + 1;
            // 第一个非空行是表头，与 CsvReader 一致
            if idx == 0 {
                continue;
            }

            let values: Vec<String> = cells.iter().map(Self::cell_to_string).collect();
            if let Some(row) = to_raw_row(row_number, &values) {
                rows.push(row);
            }
        }

        non_empty(rows)
    }
}

// ==========================================
// 通用读取器（根据文件头自动选择）
// ==========================================
pub struct UniversalReader;

impl UniversalReader {
    pub fn is_workbook(data: &[u8]) -> bool {
        data.starts_with(&ZIP_MAGIC) || data.starts_with(&OLE_MAGIC)
    }
}

impl TabularReader for UniversalReader {
    fn read_rows(&self, data: &[u8]) -> ImportResult<Vec<RawRow>> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Err(ImportError::EmptyDocument);
        }

        if Self::is_workbook(data) {
            ExcelReader.read_rows(data)
        } else {
            CsvReader.read_rows(data)
        }
    }
}
