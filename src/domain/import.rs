// ==========================================
// 学校学生管理系统 - 导入结果模型
// ==========================================
// RowOutcome: 每个数据行一条；row_number = 0 保留给批次级失败
// ImportReport: 有序结果列表（row 0 在前，其余按源行号）
// ==========================================

use crate::domain::student::StudentRowData;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 批次级（非行级）结果使用的行号
pub const BATCH_ROW_NUMBER: usize = 0;

/// 落库失败时覆盖到原“成功”行上的提示
pub const DATABASE_SAVE_FAILED: &str = "Database save failed; no rows from this file were saved";

// ==========================================
// FieldError - 行级字段错误
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub row_number: usize,
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(row_number: usize, field: &str, message: impl Into<String>) -> Self {
        Self {
            row_number,
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// ==========================================
// DuplicateError - 行级重复错误
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicateKind {
    /// 与学校已有学生冲突
    ExistingInSchool,
    /// 与同一文件中的其他行冲突
    WithinFile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateError {
    pub row_number: usize,
    pub external_id: String,
    pub kind: DuplicateKind,
}

impl fmt::Display for DuplicateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DuplicateKind::ExistingInSchool => write!(
                f,
                "External ID '{}' already exists in this school",
                self.external_id
            ),
            DuplicateKind::WithinFile => write!(
                f,
                "External ID '{}' is a duplicate within the import file",
                self.external_id
            ),
        }
    }
}

// ==========================================
// RowOutcome - 单行导入结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowOutcome {
    pub row_number: usize,
    pub success: bool,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub imported_data: Option<StudentRowData>,
}

impl RowOutcome {
    pub fn succeeded(row_number: usize, data: StudentRowData) -> Self {
        Self {
            row_number,
            success: true,
            errors: Vec::new(),
            imported_data: Some(data),
        }
    }

    pub fn failed(row_number: usize, errors: Vec<String>, data: Option<StudentRowData>) -> Self {
        Self {
            row_number,
            success: false,
            errors,
            imported_data: data,
        }
    }

    pub fn batch_failure(message: impl Into<String>) -> Self {
        Self::failed(BATCH_ROW_NUMBER, vec![message.into()], None)
    }

    pub fn is_batch_level(&self) -> bool {
        self.row_number == BATCH_ROW_NUMBER
    }
}

// ==========================================
// ImportSummary - 汇总统计
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total_rows: usize,
    pub imported: usize,
    pub failed: usize,
}

// ==========================================
// ImportReport - 导入结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportReport {
    outcomes: Vec<RowOutcome>,
}

impl ImportReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 仅含一条 row 0 失败的结果（文件不可读 / 无数据行等）
    pub fn batch_failure(message: impl Into<String>) -> Self {
        Self {
            outcomes: vec![RowOutcome::batch_failure(message)],
        }
    }

    /// 追加行结果；调用方按源行号顺序追加
    pub fn push(&mut self, outcome: RowOutcome) {
        debug_assert!(
            self.outcomes
                .last()
                .map_or(true, |last| last.row_number < outcome.row_number),
            "row outcomes must be pushed in source order"
        );
        self.outcomes.push(outcome);
    }

    /// 落库失败: 所有成功行降级为失败，并在最前插入 row 0 说明底层原因
    pub fn mark_commit_failed(&mut self, cause: &str) {
        for outcome in self.outcomes.iter_mut().filter(|o| o.success) {
            outcome.success = false;
            outcome.errors.push(DATABASE_SAVE_FAILED.to_string());
        }
        self.outcomes.insert(
            0,
            RowOutcome::batch_failure(format!("Database error: {}", cause)),
        );
    }

    pub fn outcomes(&self) -> &[RowOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<RowOutcome> {
        self.outcomes
    }

    pub fn batch_outcome(&self) -> Option<&RowOutcome> {
        self.outcomes.first().filter(|o| o.is_batch_level())
    }

    pub fn successful_rows(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn summary(&self) -> ImportSummary {
        let rows = self.outcomes.iter().filter(|o| !o.is_batch_level());
        let (total_rows, imported) =
            rows.fold((0, 0), |(t, s), o| (t + 1, s + usize::from(o.success)));
        ImportSummary {
            total_rows,
            imported,
            failed: total_rows - imported,
        }
    }
}
