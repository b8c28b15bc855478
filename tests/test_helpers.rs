// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、学校数据准备、CSV 构造等功能
// ==========================================

#![allow(dead_code)]

use rusqlite::Connection;
use school_admin::config::ImportConfig;
use school_admin::db::{init_schema, open_sqlite_connection};
use school_admin::importer::StudentImporterImpl;
use school_admin::repository::{
    RetryPolicy, SchoolRepository, StudentImportRepositoryImpl, UnitOfWork,
};
use std::error::Error;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;
use zip::write::FileOptions;
use zip::CompressionMethod;

/// 表头（列顺序固定，表头文字不参与匹配）
pub const CSV_HEADER: [&str; 13] = [
    "Full Name",
    "Date of Birth",
    "Gender",
    "Email",
    "Phone",
    "Address",
    "Enrollment Date",
    "Grade",
    "Section",
    "Roll No",
    "Student ID",
    "Blood Group",
    "House",
];

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().ok_or("non-utf8 temp path")?.to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 测试学校: Grade 1 (A, B) / Grade 2 (A)
#[derive(Debug, Clone)]
pub struct TestSchool {
    pub school_id: i64,
    pub grade1_id: i64,
    pub grade1_a_id: i64,
    pub grade1_b_id: i64,
    pub grade2_id: i64,
    pub grade2_a_id: i64,
}

pub fn seed_school(db_path: &str, name: &str) -> Result<TestSchool, Box<dyn Error>> {
    let repo = SchoolRepository::new(db_path)?;
    let school = repo.create_school(name)?;
    let grade1 = repo.add_grade(school.school_id, "Grade 1")?;
    let grade1_a = repo.add_section(grade1.grade_id, "A")?;
    let grade1_b = repo.add_section(grade1.grade_id, "B")?;
    let grade2 = repo.add_grade(school.school_id, "Grade 2")?;
    let grade2_a = repo.add_section(grade2.grade_id, "A")?;

    Ok(TestSchool {
        school_id: school.school_id,
        grade1_id: grade1.grade_id,
        grade1_a_id: grade1_a.section_id,
        grade1_b_id: grade1_b.section_id,
        grade2_id: grade2.grade_id,
        grade2_a_id: grade2_a.section_id,
    })
}

/// 打开共享连接
pub fn shared_connection(db_path: &str) -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(
        open_sqlite_connection(db_path).expect("Failed to open db"),
    ))
}

/// 测试用的快速重试策略
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        multiplier: 2.0,
    }
}

/// 创建测试用的 StudentImporter 实例
pub fn create_test_importer(
    db_path: &str,
    config: ImportConfig,
) -> StudentImporterImpl<StudentImportRepositoryImpl> {
    let conn = shared_connection(db_path);
    let repo = StudentImportRepositoryImpl::from_connection(conn.clone());
    let unit_of_work = UnitOfWork::new(conn, fast_retry(3));
    StudentImporterImpl::new(repo, unit_of_work, config)
}

// ==========================================
// CSV 构造
// ==========================================

/// 一行学生数据（只填常用列）
#[derive(Debug, Clone, Default)]
pub struct StudentRow {
    pub full_name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub email: String,
    pub grade: String,
    pub section: String,
    pub roll_number: String,
    pub external_id: String,
}

impl StudentRow {
    pub fn new(full_name: &str, grade: &str, section: &str) -> Self {
        Self {
            full_name: full_name.to_string(),
            grade: grade.to_string(),
            section: section.to_string(),
            ..Default::default()
        }
    }

    pub fn roll(mut self, roll_number: u32) -> Self {
        self.roll_number = roll_number.to_string();
        self
    }

    pub fn external_id(mut self, external_id: &str) -> Self {
        self.external_id = external_id.to_string();
        self
    }

    pub fn email(mut self, email: &str) -> Self {
        self.email = email.to_string();
        self
    }

    pub fn date_of_birth(mut self, date_of_birth: &str) -> Self {
        self.date_of_birth = date_of_birth.to_string();
        self
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.full_name.clone(),
            self.date_of_birth.clone(),
            self.gender.clone(),
            self.email.clone(),
            String::new(),
            String::new(),
            String::new(),
            self.grade.clone(),
            self.section.clone(),
            self.roll_number.clone(),
            self.external_id.clone(),
            String::new(),
            String::new(),
        ]
    }
}

/// 构造 CSV 字节（含表头）
pub fn build_csv(rows: &[StudentRow]) -> Vec<u8> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER).expect("write header");
    for row in rows {
        writer.write_record(row.cells()).expect("write row");
    }
    writer.into_inner().expect("flush csv")
}

/// 只含表头的 CSV
pub fn header_only_csv() -> Vec<u8> {
    build_csv(&[])
}

/// 统计学校学生数（直接查库）
pub fn count_students(db_path: &str, school_id: i64) -> i64 {
    let conn = open_sqlite_connection(db_path).expect("Failed to open db");
    conn.query_row(
        "SELECT COUNT(*) FROM student WHERE school_id = ?1",
        [school_id],
        |row| row.get(0),
    )
    .expect("Failed to count students")
}

// ==========================================
// XLSX 构造（最小 OOXML 包: 内联字符串 + 日期样式）
// ==========================================

/// 单元格内容
#[derive(Debug, Clone)]
pub enum XlsxCell {
    Empty,
    Text(String),
    Number(f64),
    /// Excel 序列日期，使用内置日期格式（numFmtId 14）
    Date(u32),
}

pub fn text(value: &str) -> XlsxCell {
    XlsxCell::Text(value.to_string())
}

/// 一个工作表: (1-based 行号, 从 A 列开始的单元格)
pub type XlsxSheet = Vec<(u32, Vec<XlsxCell>)>;

/// 表头行
pub fn xlsx_header() -> Vec<XlsxCell> {
    CSV_HEADER.iter().map(|h| text(h)).collect()
}

/// 学生行 → 单元格（全部为文本）
pub fn xlsx_student_cells(row: &StudentRow) -> Vec<XlsxCell> {
    row.cells()
        .into_iter()
        .map(|value| {
            if value.is_empty() {
                XlsxCell::Empty
            } else {
                XlsxCell::Text(value)
            }
        })
        .collect()
}

/// 构造单表 xlsx：第 1 行为表头
pub fn build_xlsx(rows: &[StudentRow]) -> Vec<u8> {
    let mut sheet: XlsxSheet = vec![(1, xlsx_header())];
    for (idx, row) in rows.iter().enumerate() {
        sheet.push((idx as u32 + 2, xlsx_student_cells(row)));
    }
    build_xlsx_sheets(&[sheet])
}

/// 构造多表 xlsx（按顺序为 Sheet1, Sheet2, ...）
pub fn build_xlsx_sheets(sheets: &[XlsxSheet]) -> Vec<u8> {
    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
"#,
    );
    let mut workbook = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>
"#,
    );
    let mut workbook_rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
"#,
    );

    for idx in 1..=sheets.len() {
        content_types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{idx}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
"#
        ));
        workbook.push_str(&format!(
            r#"<sheet name="Sheet{idx}" sheetId="{idx}" r:id="rId{idx}"/>
"#
        ));
        workbook_rels.push_str(&format!(
            r#"<Relationship Id="rId{idx}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{idx}.xml"/>
"#
        ));
    }
    content_types.push_str("</Types>");
    workbook.push_str("</sheets>\n</workbook>");
    workbook_rels.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#,
        sheets.len() + 1
    ));

    let root_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

    // 样式 0: 常规；样式 1: 内置日期格式 14
    let styles = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="14" applyNumberFormat="1"/></cellXfs>
</styleSheet>"#;

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));

        let mut parts: Vec<(String, String)> = vec![
            ("[Content_Types].xml".to_string(), content_types),
            ("_rels/.rels".to_string(), root_rels.to_string()),
            ("xl/workbook.xml".to_string(), workbook),
            ("xl/_rels/workbook.xml.rels".to_string(), workbook_rels),
            ("xl/styles.xml".to_string(), styles.to_string()),
        ];
        for (idx, sheet) in sheets.iter().enumerate() {
            parts.push((format!("xl/worksheets/sheet{}.xml", idx + 1), sheet_xml(sheet)));
        }

        for (name, content) in parts {
            let options: FileOptions<'_, ()> =
                FileOptions::default().compression_method(CompressionMethod::Stored);
            zip.start_file(name, options).expect("start zip entry");
            zip.write_all(content.as_bytes()).expect("write zip entry");
        }
        zip.finish().expect("finish zip");
    }
    buf
}

fn sheet_xml(rows: &XlsxSheet) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
"#,
    );
    for (row_number, cells) in rows {
        xml.push_str(&format!(r#"<row r="{}">"#, row_number));
        for (col, cell) in cells.iter().enumerate() {
            let reference = format!("{}{}", column_name(col), row_number);
            match cell {
                XlsxCell::Empty => {}
                XlsxCell::Text(value) => xml.push_str(&format!(
                    r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    reference,
                    escape_xml(value)
                )),
                XlsxCell::Number(value) => {
                    xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, reference, value))
                }
                XlsxCell::Date(serial) => xml.push_str(&format!(
                    r#"<c r="{}" s="1"><v>{}</v></c>"#,
                    reference, serial
                )),
            }
        }
        xml.push_str("</row>\n");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// 0 → A, 12 → M（导入只用到前 13 列）
fn column_name(col: usize) -> char {
    (b'A' + col as u8) as char
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
