// ==========================================
// 学校学生管理系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 提供导入子系统所需的最小 schema
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    configure_sqlite_connection_with_timeout(conn, Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))
}

/// 同上，但允许调用方指定 busy_timeout（测试中用于快速触发 BUSY）
pub fn configure_sqlite_connection_with_timeout(
    conn: &Connection,
    busy_timeout: Duration,
) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 默认数据库路径
///
/// 优先使用环境变量 SCHOOL_ADMIN_DB_PATH，其次为用户数据目录下的 school-admin/school_admin.db
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var("SCHOOL_ADMIN_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./school_admin.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("school-admin");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("school_admin.db");
        }
    }

    path.to_string_lossy().to_string()
}

/// 建表（幂等）
///
/// student 表上的两个唯一约束是并发导入同一学校时的最终防线:
/// - (school_id, external_id) 大小写不敏感唯一，空标识存 NULL 不参与比较
/// - (section_id, roll_number) 唯一
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS school (
            school_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS grade (
            grade_id INTEGER PRIMARY KEY AUTOINCREMENT,
            school_id INTEGER NOT NULL REFERENCES school(school_id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            UNIQUE (school_id, name COLLATE NOCASE)
        );

        CREATE TABLE IF NOT EXISTS section (
            section_id INTEGER PRIMARY KEY AUTOINCREMENT,
            grade_id INTEGER NOT NULL REFERENCES grade(grade_id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            UNIQUE (grade_id, name COLLATE NOCASE)
        );

        CREATE TABLE IF NOT EXISTS student (
            student_id INTEGER PRIMARY KEY AUTOINCREMENT,
            school_id INTEGER NOT NULL REFERENCES school(school_id) ON DELETE CASCADE,
            full_name TEXT NOT NULL,
            date_of_birth TEXT,
            gender TEXT,
            email TEXT,
            phone TEXT,
            address TEXT,
            enrollment_date TEXT,
            grade_id INTEGER NOT NULL REFERENCES grade(grade_id),
            section_id INTEGER NOT NULL REFERENCES section(section_id),
            roll_number INTEGER,
            external_id TEXT COLLATE NOCASE,
            blood_group TEXT,
            house TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (school_id, external_id),
            UNIQUE (section_id, roll_number)
        );

        CREATE INDEX IF NOT EXISTS idx_student_school ON student(school_id);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
