// ==========================================
// 学校学生管理系统 - 批量落库
// ==========================================
// 职责: 在一个工作单元内一次性写入本批次全部候选
// 约束: 全有或全无；失败时由调用方把已成功行降级（ImportReport::mark_commit_failed）
// ==========================================

use crate::domain::import::ImportReport;
use crate::domain::student::NewStudent;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::{StudentImportRepository, UnitOfWork};
use tracing::{error, info};

pub struct BatchCommitter<'a, R: StudentImportRepository> {
    repo: &'a R,
    unit_of_work: &'a UnitOfWork,
}

impl<'a, R: StudentImportRepository> BatchCommitter<'a, R> {
    pub fn new(repo: &'a R, unit_of_work: &'a UnitOfWork) -> Self {
        Self { repo, unit_of_work }
    }

    /// 写入全部学生
    ///
    /// # 返回
    /// - Ok(usize): 已提交的记录数
    /// - Err(Persistence): 事务已回滚，没有任何记录可见
    pub fn commit(&self, students: &[NewStudent]) -> ImportResult<usize> {
        if students.is_empty() {
            return Ok(0);
        }

        // 工作块可能被重放，只依赖 students 切片，不持有外部可变状态
        self.unit_of_work
            .run_in_transaction_with_result(|tx| self.repo.insert_students(tx, students))
            .map_err(|e| ImportError::Persistence(e.to_string()))
    }

    /// 写入并把结果折叠进报告
    pub fn commit_into(&self, report: &mut ImportReport, students: &[NewStudent]) -> usize {
        match self.commit(students) {
            Ok(count) => {
                info!(count, "批次已提交");
                count
            }
            Err(ImportError::Persistence(cause)) => {
                error!(cause = %cause, rows = students.len(), "批次落库失败，已整体回滚");
                report.mark_commit_failed(&cause);
                0
            }
            Err(other) => {
                error!(error = %other, "批次落库失败，已整体回滚");
                report.mark_commit_failed(&other.to_string());
                0
            }
        }
    }
}
