// ==========================================
// 学校学生管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑
// ==========================================

pub mod import;
pub mod school;
pub mod student;
pub mod types;

// 重导出核心类型
pub use import::{
    DuplicateError, DuplicateKind, FieldError, ImportReport, ImportSummary, RowOutcome,
    BATCH_ROW_NUMBER, DATABASE_SAVE_FAILED,
};
pub use school::{Grade, School, SchoolReferences, Section};
pub use student::{ImportCandidate, NewStudent, RawRow, Student, StudentRowData};
pub use types::{BloodGroup, Gender};
