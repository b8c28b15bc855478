// ==========================================
// 学校学生管理系统 - 导入层
// ==========================================
// 职责: 表格文件 → 校验 → 去重 → 单事务落库 → 逐行结果
// 支持: Excel (xlsx/xls/ods), CSV
// ==========================================

// 模块声明
pub mod batch_committer;
pub mod data_cleaner;
pub mod duplicate_detector;
pub mod error;
pub mod file_parser;
pub mod importer_trait;
pub mod reference_resolver;
pub mod row_validator;
pub mod student_importer_impl;

// 重导出核心类型
pub use batch_committer::BatchCommitter;
pub use data_cleaner::DataCleaner;
pub use duplicate_detector::DuplicateDetector;
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvReader, ExcelReader, UniversalReader};
pub use reference_resolver::ReferenceResolver;
pub use row_validator::RowValidator;
pub use student_importer_impl::StudentImporterImpl;

// 重导出 Trait 接口
pub use importer_trait::{StudentImporter, TabularReader};
