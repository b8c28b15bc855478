// ==========================================
// 学校学生管理系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config::{DuplicatePolicy, ImportConfig, ReferenceMode};
use crate::db::open_sqlite_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ImportConfigReader - 导入配置读取接口
// ==========================================
// 实现者: ConfigManager（config_kv）、ImportConfig（静态配置，测试/CLI 用）
pub trait ImportConfigReader: Send + Sync {
    fn load_import_config(&self) -> RepositoryResult<ImportConfig>;
}

impl ImportConfigReader for ImportConfig {
    fn load_import_config(&self) -> RepositoryResult<ImportConfig> {
        Ok(self.clone())
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
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

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入 global 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;

        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON 格式，按 key 排序）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let mut stmt = conn
            .prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let config_map = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(json!(config_map).to_string())
    }

    /// 读取配置并解析；格式错误时记录告警并使用默认值
    fn get_parsed_or<T>(&self, key: &str, default: T) -> RepositoryResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_global_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(e) => {
                    tracing::warn!(
                        config_key = key,
                        raw_value = %raw,
                        error = %e,
                        "配置值格式错误，使用默认值"
                    );
                    Ok(default)
                }
            },
        }
    }
}

impl ImportConfigReader for ConfigManager {
    fn load_import_config(&self) -> RepositoryResult<ImportConfig> {
        let defaults = ImportConfig::default();
        let mut config = defaults.clone();

        // ===== 重试 =====
        config.retry.max_attempts = self
            .get_parsed_or(config_keys::RETRY_MAX_ATTEMPTS, defaults.retry.max_attempts)?
            .max(1);
        config.retry.initial_delay_ms = self.get_parsed_or(
            config_keys::RETRY_INITIAL_DELAY_MS,
            defaults.retry.initial_delay_ms,
        )?;
        config.retry.multiplier =
            self.get_parsed_or(config_keys::RETRY_MULTIPLIER, defaults.retry.multiplier)?;
        config.retry.max_delay_ms =
            self.get_parsed_or(config_keys::RETRY_MAX_DELAY_MS, defaults.retry.max_delay_ms)?;

        // ===== 引用解析 / 去重策略 =====
        config.reference_mode =
            self.get_parsed_or::<ReferenceMode>(config_keys::REFERENCE_MODE, defaults.reference_mode)?;
        config.duplicate_policy = self
            .get_parsed_or::<DuplicatePolicy>(config_keys::DUPLICATE_POLICY, defaults.duplicate_policy)?;

        // ===== 字段长度上限 =====
        let limits = &mut config.limits;
        limits.full_name = self.get_parsed_or(config_keys::LIMIT_FULL_NAME, limits.full_name)?;
        limits.email = self.get_parsed_or(config_keys::LIMIT_EMAIL, limits.email)?;
        limits.phone = self.get_parsed_or(config_keys::LIMIT_PHONE, limits.phone)?;
        limits.address = self.get_parsed_or(config_keys::LIMIT_ADDRESS, limits.address)?;
        limits.grade = self.get_parsed_or(config_keys::LIMIT_GRADE, limits.grade)?;
        limits.section = self.get_parsed_or(config_keys::LIMIT_SECTION, limits.section)?;
        limits.external_id =
            self.get_parsed_or(config_keys::LIMIT_EXTERNAL_ID, limits.external_id)?;
        limits.house = self.get_parsed_or(config_keys::LIMIT_HOUSE, limits.house)?;

        tracing::debug!(
            reference_mode = %config.reference_mode,
            duplicate_policy = %config.duplicate_policy,
            max_attempts = config.retry.max_attempts,
            "导入配置已加载"
        );

        Ok(config)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 工作单元重试
    pub const RETRY_MAX_ATTEMPTS: &str = "import.retry.max_attempts";
    pub const RETRY_INITIAL_DELAY_MS: &str = "import.retry.initial_delay_ms";
    pub const RETRY_MULTIPLIER: &str = "import.retry.multiplier";
    pub const RETRY_MAX_DELAY_MS: &str = "import.retry.max_delay_ms";

    // 年级/班级列含义: name | id
    pub const REFERENCE_MODE: &str = "import.reference_mode";

    // 同文件重复标识: keep_first | reject_all
    pub const DUPLICATE_POLICY: &str = "import.duplicate_policy";

    // 字段长度上限
    pub const LIMIT_FULL_NAME: &str = "import.limits.full_name";
    pub const LIMIT_EMAIL: &str = "import.limits.email";
    pub const LIMIT_PHONE: &str = "import.limits.phone";
    pub const LIMIT_ADDRESS: &str = "import.limits.address";
    pub const LIMIT_GRADE: &str = "import.limits.grade";
    pub const LIMIT_SECTION: &str = "import.limits.section";
    pub const LIMIT_EXTERNAL_ID: &str = "import.limits.external_id";
    pub const LIMIT_HOUSE: &str = "import.limits.house";
}
