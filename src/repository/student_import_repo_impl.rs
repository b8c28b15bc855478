// ==========================================
// 学校学生管理系统 - 学生导入 Repository 实现
// ==========================================
// 职责: 实现导入相关数据访问（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::school::{Grade, SchoolReferences, Section};
use crate::domain::student::{NewStudent, Student};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::student_import_repo::StudentImportRepository;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Transaction};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// StudentImportRepositoryImpl
// ==========================================
pub struct StudentImportRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl StudentImportRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 共享连接（用于构造同一连接上的 UnitOfWork）
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

impl StudentImportRepository for StudentImportRepositoryImpl {
    fn school_exists(&self, school_id: i64) -> RepositoryResult<bool> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM school WHERE school_id = ?1",
            params![school_id],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    fn load_external_ids(&self, school_id: i64) -> RepositoryResult<HashSet<String>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT external_id FROM student
            WHERE school_id = ?1 AND external_id IS NOT NULL AND TRIM(external_id) <> ''
            "#,
        )?;

        let ids = stmt
            .query_map(params![school_id], |row| row.get::<_, String>(0))?
            .map(|r| r.map(|id| id.trim().to_lowercase()))
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(ids)
    }

    fn load_school_references(&self, school_id: i64) -> RepositoryResult<SchoolReferences> {
        let conn = self.lock()?;

        let grades = conn
            .prepare("SELECT grade_id, school_id, name FROM grade WHERE school_id = ?1")?
            .query_map(params![school_id], |row| {
                Ok(Grade {
                    grade_id: row.get(0)?,
                    school_id: row.get(1)?,
                    name: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let sections = conn
            .prepare(
                r#"
                SELECT s.section_id, s.grade_id, s.name
                FROM section s
                JOIN grade g ON g.grade_id = s.grade_id
                WHERE g.school_id = ?1
                "#,
            )?
            .query_map(params![school_id], |row| {
                Ok(Section {
                    section_id: row.get(0)?,
                    grade_id: row.get(1)?,
                    name: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SchoolReferences::new(grades, sections))
    }

    fn insert_students(
        &self,
        tx: &Transaction<'_>,
        students: &[NewStudent],
    ) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO student (
                school_id, full_name, date_of_birth, gender, email, phone, address,
                enrollment_date, grade_id, section_id, roll_number, external_id,
                blood_group, house, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15
            )
            "#,
        )?;

        let created_at = Utc::now().to_rfc3339();
        let mut count = 0;
        for student in students {
            // 空标识存 NULL，不参与唯一约束
            let external_id = student
                .external_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty());

            stmt.execute(params![
                student.school_id,
                student.full_name,
                student.date_of_birth,
                student.gender.map(|g| g.as_str()),
                student.email,
                student.phone,
                student.address,
                student.enrollment_date,
                student.grade_id,
                student.section_id,
                student.roll_number,
                external_id,
                student.blood_group.map(|b| b.as_str()),
                student.house,
                created_at,
            ])?;
            count += 1;
        }

        Ok(count)
    }

    fn count_students(&self, school_id: i64) -> RepositoryResult<usize> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM student WHERE school_id = ?1",
            params![school_id],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    fn list_students(&self, school_id: i64) -> RepositoryResult<Vec<Student>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT student_id, school_id, full_name, date_of_birth, gender, email,
                   grade_id, section_id, roll_number, external_id, created_at
            FROM student
            WHERE school_id = ?1
            ORDER BY student_id
            "#,
        )?;

        let students = stmt
            .query_map(params![school_id], |row| {
                Ok(Student {
                    student_id: row.get(0)?,
                    school_id: row.get(1)?,
                    full_name: row.get(2)?,
                    date_of_birth: row.get(3)?,
                    gender: row.get(4)?,
                    email: row.get(5)?,
                    grade_id: row.get(6)?,
                    section_id: row.get(7)?,
                    roll_number: row.get(8)?,
                    external_id: row.get(9)?,
                    created_at: parse_created_at(&row.get::<_, String>(10)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(students)
    }
}

/// created_at 以 RFC 3339 存储；无法解析视为数据损坏
fn parse_created_at(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))
}
