// ==========================================
// 学生导入API
// ==========================================
// 职责: 封装学生导入流程，供 CLI / 上层服务调用
// 说明: 导入本身是同步的，这里放到 tokio 阻塞线程池执行；
//       每次调用独立打开连接并读取一次配置
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfigReader};
use crate::db::open_sqlite_connection;
use crate::domain::import::RowOutcome;
use crate::importer::StudentImporterImpl;
use crate::repository::{RetryPolicy, StudentImportRepositoryImpl, UnitOfWork};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{error, info};
use uuid::Uuid;

/// 导入API响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportApiResponse {
    /// 本次导入ID（与日志中的 import_id 一致）
    pub import_id: String,
    pub school_id: i64,
    /// 数据行数（不含 row 0）
    pub total: usize,
    /// 已落库行数
    pub imported: usize,
    /// 失败行数
    pub failed: usize,
    /// 逐行结果（row 0 在前）
    pub outcomes: Vec<RowOutcome>,
}

/// 导入API
#[derive(Debug, Clone)]
pub struct ImportApi {
    db_path: String,
}

impl ImportApi {
    /// 创建新的ImportApi实例
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// 导入一份学生文件
    ///
    /// # 参数
    /// - school_id: 目标学校
    /// - data: 文件字节（xlsx/xls/ods/csv）
    ///
    /// # 返回
    /// - Ok(ImportApiResponse): 导入结果（文件级问题体现在 row 0，而非 Err）
    /// - Err(ApiError::NotFound): 学校不存在
    /// - Err(ApiError): 数据库不可用等基础设施故障
    pub async fn import_students(&self, school_id: i64, data: Vec<u8>) -> ApiResult<ImportApiResponse> {
        let db_path = self.db_path.clone();
        let import_id = Uuid::new_v4().to_string();

        let task_id = import_id.clone();
        tokio::task::spawn_blocking(move || Self::run_import(&db_path, &task_id, school_id, &data))
            .await
            .map_err(|e| ApiError::InternalError(format!("导入任务异常终止: {}", e)))?
    }

    /// 并发导入多份文件（通常针对不同学校）
    ///
    /// # 说明
    /// - 每份文件的导入是独立的，互不影响
    /// - 返回顺序与输入顺序一致
    pub async fn import_many(&self, jobs: Vec<(i64, Vec<u8>)>) -> Vec<ApiResult<ImportApiResponse>> {
        info!(jobs = jobs.len(), "开始批量导入");
        let futures = jobs
            .into_iter()
            .map(|(school_id, data)| self.import_students(school_id, data));
        join_all(futures).await
    }

    fn run_import(
        db_path: &str,
        import_id: &str,
        school_id: i64,
        data: &[u8],
    ) -> ApiResult<ImportApiResponse> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        let conn = Arc::new(Mutex::new(conn));

        let config = ConfigManager::from_connection(conn.clone()).load_import_config()?;
        let unit_of_work =
            UnitOfWork::new(conn.clone(), RetryPolicy::from_settings(&config.retry));
        let repo = StudentImportRepositoryImpl::from_connection(conn);
        let importer = StudentImporterImpl::new(repo, unit_of_work, config);

        let report = importer
            .import_with_id(import_id, school_id, data)
            .map_err(|e| {
                error!(import_id, school_id, error = %e, "导入失败");
                ApiError::from(e)
            })?;

        let summary = report.summary();
        Ok(ImportApiResponse {
            import_id: import_id.to_string(),
            school_id,
            total: summary.total_rows,
            imported: summary.imported,
            failed: summary.failed,
            outcomes: report.into_outcomes(),
        })
    }
}
