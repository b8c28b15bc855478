// ==========================================
// 学校学生管理系统 - 学校 Repository
// ==========================================
// 职责: 学校 / 年级 / 班级的数据访问
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::school::{Grade, School, Section};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub struct SchoolRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SchoolRepository {
    /// 创建新的 Repository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（与导入器共享连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn create_school(&self, name: &str) -> RepositoryResult<School> {
        let conn = self.lock()?;
        conn.execute("INSERT INTO school (name) VALUES (?1)", params![name.trim()])?;
        Ok(School {
            school_id: conn.last_insert_rowid(),
            name: name.trim().to_string(),
        })
    }

    pub fn find_school(&self, school_id: i64) -> RepositoryResult<Option<School>> {
        let conn = self.lock()?;
        let school = conn
            .query_row(
                "SELECT school_id, name FROM school WHERE school_id = ?1",
                params![school_id],
                |row| {
                    Ok(School {
                        school_id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(school)
    }

    pub fn add_grade(&self, school_id: i64, name: &str) -> RepositoryResult<Grade> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO grade (school_id, name) VALUES (?1, ?2)",
            params![school_id, name.trim()],
        )?;
        Ok(Grade {
            grade_id: conn.last_insert_rowid(),
            school_id,
            name: name.trim().to_string(),
        })
    }

    pub fn add_section(&self, grade_id: i64, name: &str) -> RepositoryResult<Section> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO section (grade_id, name) VALUES (?1, ?2)",
            params![grade_id, name.trim()],
        )?;
        Ok(Section {
            section_id: conn.last_insert_rowid(),
            grade_id,
            name: name.trim().to_string(),
        })
    }
}
