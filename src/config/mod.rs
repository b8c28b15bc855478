// ==========================================
// 学校学生管理系统 - 配置层
// ==========================================
// 职责: 导入配置默认值 + config_kv 覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config;

// 重导出核心配置类型
pub use config_manager::{config_keys, ConfigManager, ImportConfigReader};
pub use import_config::{DuplicatePolicy, FieldLimits, ImportConfig, ReferenceMode, RetrySettings};
