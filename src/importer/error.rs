// ==========================================
// 学校学生管理系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 行级错误（FieldError / DuplicateError）是值，不走本枚举；
//       本枚举只承载批次级失败，消息文本直接进入 row 0 结果
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 前置条件 =====
    #[error("School {0} does not exist")]
    SchoolNotFound(i64),

    // ===== 文件相关错误 =====
    #[error("The file could not be read as a spreadsheet: {0}")]
    FormatError(String),

    #[error("The file contains no data rows")]
    EmptyDocument,

    // ===== 落库错误 =====
    #[error("Database error: {0}")]
    Persistence(String),
}

impl ImportError {
    /// 是否应转为 row 0 结果（而非作为 Err 上抛）
    pub fn is_batch_level(&self) -> bool {
        matches!(
            self,
            ImportError::FormatError(_) | ImportError::EmptyDocument | ImportError::Persistence(_)
        )
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FormatError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::FormatError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::FormatError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
