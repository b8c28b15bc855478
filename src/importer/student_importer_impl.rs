// ==========================================
// 学校学生管理系统 - 学生导入器实现
// ==========================================
// 职责: 整合导入流程，从字节流到数据库
// 流程: 范围检查 → 读取 → 学校快照 → 逐行(校验 → 引用解析 → 去重) → 单事务落库 → 汇总
// 约束: 逐行阶段不访问数据库；学校快照每次调用加载一次（瞬时故障可重试）
// ==========================================

use crate::config::ImportConfig;
use crate::domain::import::{FieldError, ImportReport, RowOutcome};
use crate::domain::school::SchoolReferences;
use crate::domain::student::{ImportCandidate, NewStudent, RawRow};
use crate::importer::batch_committer::BatchCommitter;
use crate::importer::duplicate_detector::DuplicateDetector;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::UniversalReader;
use crate::importer::importer_trait::{StudentImporter, TabularReader};
use crate::importer::reference_resolver::ReferenceResolver;
use crate::importer::row_validator::RowValidator;
use crate::repository::{RepositoryError, RepositoryResult, StudentImportRepository, UnitOfWork};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 通过校验并解析出 (grade_id, section_id) 的候选
type ResolvedCandidate = (ImportCandidate, i64, i64);

// ==========================================
// StudentImporterImpl - 学生导入器实现
// ==========================================
pub struct StudentImporterImpl<R>
where
    R: StudentImportRepository,
{
    // 数据访问层
    repo: R,
    unit_of_work: UnitOfWork,

    // 导入组件
    reader: Box<dyn TabularReader>,

    config: ImportConfig,

    // 出生日期上限（测试可固定）
    today: NaiveDate,
}

impl<R> StudentImporterImpl<R>
where
    R: StudentImportRepository,
{
    /// 创建新的 StudentImporter 实例
    ///
    /// # 参数
    /// - repo: 导入数据仓储
    /// - unit_of_work: 与 repo 共享同一连接的工作单元
    /// - config: 导入配置
    pub fn new(repo: R, unit_of_work: UnitOfWork, config: ImportConfig) -> Self {
        Self {
            repo,
            unit_of_work,
            reader: Box::new(UniversalReader),
            config,
            today: chrono::Local::now().date_naive(),
        }
    }

    pub fn with_reader(mut self, reader: Box<dyn TabularReader>) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// 加载学校快照（已有外部标识 + 年级/班级），瞬时故障按工作单元的策略重试
    fn load_snapshot(&self, school_id: i64) -> RepositoryResult<(HashSet<String>, SchoolReferences)> {
        self.unit_of_work.with_retry(|| {
            let existing_ids = self.repo.load_external_ids(school_id)?;
            let references = self.repo.load_school_references(school_id)?;
            Ok((existing_ids, references))
        })
    }

    /// 逐行阶段: 校验 → 引用解析 → 去重（不访问数据库）
    ///
    /// 返回 (报告, 待落库学生)，报告中行的顺序与源文件一致
    fn process_rows(
        &self,
        school_id: i64,
        rows: Vec<RawRow>,
        existing_ids: HashSet<String>,
        references: &SchoolReferences,
    ) -> (ImportReport, Vec<NewStudent>) {
        if references.is_empty() {
            warn!(school_id, "学校尚未配置年级/班级，所有行将无法解析");
        }

        let validator = RowValidator::new(self.config.limits.clone(), self.today);
        let resolver = ReferenceResolver::new(self.config.reference_mode, references);
        let resolved: Vec<(RawRow, Result<ResolvedCandidate, Vec<FieldError>>)> = rows
            .into_iter()
            .map(|row| {
                let result = validator.validate(school_id, &row).and_then(|candidate| {
                    resolver
                        .resolve(&candidate)
                        .map(|(grade_id, section_id)| (candidate, grade_id, section_id))
                });
                (row, result)
            })
            .collect();

        // 只有通过校验且引用可解析的行参与文件内重复计数
        let mut detector = DuplicateDetector::new(
            existing_ids,
            self.config.duplicate_policy,
            resolved
                .iter()
                .filter_map(|(_, r)| r.as_ref().ok().map(|(candidate, _, _)| candidate)),
        );

        let mut report = ImportReport::new();
        let mut students = Vec::new();

        for (row, resolved) in resolved {
            let outcome = match resolved {
                Err(errors) => {
                    debug!(row = row.row_number, errors = errors.len(), "行校验失败");
                    RowOutcome::failed(
                        row.row_number,
                        errors.iter().map(ToString::to_string).collect(),
                        Some(row.data),
                    )
                }
                Ok((candidate, grade_id, section_id)) => match detector.check(&candidate) {
                    Err(duplicate) => {
                        debug!(row = row.row_number, error = %duplicate, "外部标识重复");
                        RowOutcome::failed(row.row_number, vec![duplicate.to_string()], Some(row.data))
                    }
                    Ok(()) => {
                        students.push(candidate.into_new_student(grade_id, section_id));
                        RowOutcome::succeeded(row.row_number, row.data)
                    }
                },
            };
            report.push(outcome);
        }

        (report, students)
    }

    /// 以调用方提供的导入 ID 执行导入（ID 用于日志关联）
    ///
    /// 只有学校不存在会以 Err 返回；其余批次级失败都落在 row 0
    #[instrument(skip(self, data), fields(import_id = %import_id, bytes = data.len()))]
    pub fn import_with_id(
        &self,
        import_id: &str,
        school_id: i64,
        data: &[u8],
    ) -> ImportResult<ImportReport> {
        let start_time = Instant::now();
        info!("开始导入学生数据");

        // === 阶段 1: 范围检查 ===
        match self.unit_of_work.with_retry(|| self.repo.school_exists(school_id)) {
            Ok(true) => {}
            Ok(false) => {
                warn!(school_id, "学校不存在，导入终止");
                return Err(ImportError::SchoolNotFound(school_id));
            }
            Err(e) => {
                error!(error = %e, "范围检查失败");
                return Ok(Self::persistence_failure(e));
            }
        }

        // === 阶段 2: 读取 ===
        let rows = match self.reader.read_rows(data) {
            Ok(rows) => rows,
            Err(e) if e.is_batch_level() => {
                warn!(error = %e, "文件读取失败");
                return Ok(ImportReport::batch_failure(e.to_string()));
            }
            Err(e) => return Err(e),
        };
        info!(rows = rows.len(), "文件读取完成");

        // === 阶段 3: 学校快照 ===
        let (existing_ids, references) = match self.load_snapshot(school_id) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "学校快照加载失败");
                return Ok(Self::persistence_failure(e));
            }
        };
        debug!(existing_ids = existing_ids.len(), "学校快照加载完成");

        // === 阶段 4: 逐行处理 ===
        let (mut report, students) = self.process_rows(school_id, rows, existing_ids, &references);
        info!(
            valid = students.len(),
            failed = report.summary().failed,
            "逐行校验完成"
        );

        // === 阶段 5: 落库 ===
        if students.is_empty() {
            debug!("没有可落库的行，跳过提交");
        } else {
            BatchCommitter::new(&self.repo, &self.unit_of_work).commit_into(&mut report, &students);
        }

        // === 阶段 6: 汇总 ===
        let summary = report.summary();
        info!(
            total = summary.total_rows,
            imported = summary.imported,
            failed = summary.failed,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "学生数据导入完成"
        );

        Ok(report)
    }

    fn persistence_failure(err: RepositoryError) -> ImportReport {
        ImportReport::batch_failure(ImportError::Persistence(err.to_string()).to_string())
    }
}

impl<R> StudentImporter for StudentImporterImpl<R>
where
    R: StudentImportRepository,
{
    fn import_students(&self, school_id: i64, data: &[u8]) -> ImportResult<ImportReport> {
        self.import_with_id(&Uuid::new_v4().to_string(), school_id, data)
    }
}
