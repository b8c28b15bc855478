// ==========================================
// 学校学生管理系统 - 学生领域模型
// ==========================================
// 导入管道中的三个形态:
//   RawRow (原始行) → ImportCandidate (校验通过) → NewStudent (引用已解析，可落库)
// ==========================================

use crate::domain::types::{BloodGroup, Gender};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// StudentRowData - 原始单元格内容
// ==========================================
// 用途: RawRow 的载荷，也作为 RowOutcome.importedData 回显
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRowData {
    pub full_name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub enrollment_date: String,
    pub grade: String,
    pub section: String,
    pub roll_number: String,
    pub external_id: String,
    pub blood_group: String,
    pub house: String,
}

impl StudentRowData {
    /// 按列位置构造，缺失的尾部单元格视为空字符串，多余的列忽略
    pub fn from_cells<S: AsRef<str>>(cells: &[S]) -> Self {
        let cell = |idx: usize| -> String {
            cells
                .get(idx)
                .map(|c| c.as_ref().trim().to_string())
                .unwrap_or_default()
        };

        Self {
            full_name: cell(0),
            date_of_birth: cell(1),
            gender: cell(2),
            email: cell(3),
            phone: cell(4),
            address: cell(5),
            enrollment_date: cell(6),
            grade: cell(7),
            section: cell(8),
            roll_number: cell(9),
            external_id: cell(10),
            blood_group: cell(11),
            house: cell(12),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.full_name.trim().is_empty()
    }
}

// ==========================================
// RawRow - 原始行
// ==========================================
// row_number 与源文档一致（1-based，表头为第 1 行）
// 生命周期: 仅在一次导入调用内
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    pub row_number: usize,
    pub data: StudentRowData,
}

impl RawRow {
    pub fn new(row_number: usize, data: StudentRowData) -> Self {
        Self { row_number, data }
    }
}

// ==========================================
// ImportCandidate - 校验通过的候选记录
// ==========================================
// 年级/班级仍是文件中的原始引用，由 ReferenceResolver 解析为 ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCandidate {
    pub row_number: usize,
    pub school_id: i64,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub enrollment_date: Option<NaiveDate>,
    pub grade_ref: String,
    pub section_ref: String,
    pub roll_number: Option<i64>,
    pub external_id: Option<String>,
    pub blood_group: Option<BloodGroup>,
    pub house: Option<String>,
}

impl ImportCandidate {
    /// 去重使用的自然键（TRIM + 小写）；空标识返回 None
    pub fn natural_key(&self) -> Option<String> {
        self.external_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_lowercase)
    }

    /// 结合已解析的年级/班级，生成可落库记录
    pub fn into_new_student(self, grade_id: i64, section_id: i64) -> NewStudent {
        NewStudent {
            row_number: self.row_number,
            school_id: self.school_id,
            full_name: self.full_name,
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            email: self.email,
            phone: self.phone,
            address: self.address,
            enrollment_date: self.enrollment_date,
            grade_id,
            section_id,
            roll_number: self.roll_number,
            external_id: self.external_id,
            blood_group: self.blood_group,
            house: self.house,
        }
    }
}

// ==========================================
// NewStudent - 待落库学生
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudent {
    pub row_number: usize,
    pub school_id: i64,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub enrollment_date: Option<NaiveDate>,
    pub grade_id: i64,
    pub section_id: i64,
    pub roll_number: Option<i64>,
    pub external_id: Option<String>,
    pub blood_group: Option<BloodGroup>,
    pub house: Option<String>,
}

// ==========================================
// Student - 已落库学生（读取用）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub student_id: i64,
    pub school_id: i64,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub grade_id: i64,
    pub section_id: i64,
    pub roll_number: Option<i64>,
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cells_pads_missing_columns() {
        let data = StudentRowData::from_cells(&[" Ann Lee ", "2015-03-01"]);
        assert_eq!(data.full_name, "Ann Lee");
        assert_eq!(data.date_of_birth, "2015-03-01");
        assert_eq!(data.house, "");
        assert!(!data.is_blank());
    }

    #[test]
    fn test_natural_key_blank_is_exempt() {
        let mut candidate = ImportCandidate {
            row_number: 2,
            school_id: 1,
            full_name: "Ann".to_string(),
            date_of_birth: None,
            gender: None,
            email: None,
            phone: None,
            address: None,
            enrollment_date: None,
            grade_ref: "1".to_string(),
            section_ref: "A".to_string(),
            roll_number: None,
            external_id: Some("   ".to_string()),
            blood_group: None,
            house: None,
        };
        assert_eq!(candidate.natural_key(), None);

        candidate.external_id = Some(" Stu-01 ".to_string());
        assert_eq!(candidate.natural_key(), Some("stu-01".to_string()));
    }
}
