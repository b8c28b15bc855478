// ==========================================
// 学校学生管理系统 - 学生导入 Repository Trait
// ==========================================
// 职责: 定义导入相关数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::school::SchoolReferences;
use crate::domain::student::{NewStudent, Student};
use crate::repository::error::RepositoryResult;
use rusqlite::Transaction;
use std::collections::HashSet;

// ==========================================
// StudentImportRepository Trait
// ==========================================
// 用途: 学生导入相关数据访问
// 实现者: StudentImportRepositoryImpl（使用 rusqlite）
pub trait StudentImportRepository: Send + Sync {
    // ===== 范围检查 / 快照加载（每次导入调用各一次）=====

    /// 学校是否存在
    fn school_exists(&self, school_id: i64) -> RepositoryResult<bool>;

    /// 加载学校内已有学生的外部标识（TRIM + 小写）
    fn load_external_ids(&self, school_id: i64) -> RepositoryResult<HashSet<String>>;

    /// 加载学校的年级 / 班级快照
    fn load_school_references(&self, school_id: i64) -> RepositoryResult<SchoolReferences>;

    // ===== 写入（必须在调用方提供的事务内）=====

    /// 批量插入学生
    ///
    /// # 参数
    /// - tx: 工作单元提供的事务
    /// - students: 待插入学生
    ///
    /// # 返回
    /// - Ok(usize): 插入的记录数
    /// - Err: 数据库错误（由工作单元回滚整个事务）
    fn insert_students(&self, tx: &Transaction<'_>, students: &[NewStudent])
        -> RepositoryResult<usize>;

    // ===== 查询 =====

    fn count_students(&self, school_id: i64) -> RepositoryResult<usize>;

    fn list_students(&self, school_id: i64) -> RepositoryResult<Vec<Student>>;
}
