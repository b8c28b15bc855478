// ==========================================
// 学校学生管理系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository/Importer错误为用户友好的错误消息
// ==========================================

use crate::importer::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg)
            | RepositoryError::Transient(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::DatabaseError(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::DatabaseError(format!("外键约束违反: {}", msg))
            }
            err @ RepositoryError::RetriesExhausted { .. } => ApiError::DatabaseError(err.to_string()),
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::SchoolNotFound(id) => ApiError::NotFound(format!("学校(id={})不存在", id)),
            ImportError::FormatError(_) | ImportError::EmptyDocument => {
                ApiError::ImportError(err.to_string())
            }
            ImportError::Persistence(msg) => ApiError::DatabaseError(msg),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_school_not_found_conversion() {
        let api_err: ApiError = ImportError::SchoolNotFound(42).into();
        match api_err {
            ApiError::NotFound(msg) => assert!(msg.contains("42")),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "School".to_string(),
            id: "7".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("School"));
                assert!(msg.contains("7"));
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }

        let exhausted = RepositoryError::RetriesExhausted {
            attempts: 3,
            last_error: Box::new(RepositoryError::Transient("database is locked".into())),
        };
        assert!(matches!(
            ApiError::from(exhausted),
            ApiError::DatabaseError(msg) if msg.contains("database is locked")
        ));
    }

    #[test]
    fn test_file_level_import_error_conversion() {
        assert!(matches!(
            ApiError::from(ImportError::EmptyDocument),
            ApiError::ImportError(msg) if msg.contains("no data rows")
        ));
        assert!(matches!(
            ApiError::from(RepositoryError::DatabaseConnectionError("unable to open".into())),
            ApiError::DatabaseConnectionError(_)
        ));
    }
}
