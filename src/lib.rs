// ==========================================
// 学校学生管理系统 - 核心库
// ==========================================
// 范围: 学生批量导入管道 + 事务化工作单元
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问 / 事务
pub mod repository;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{
    BloodGroup, Gender, ImportCandidate, ImportReport, RawRow, RowOutcome, School,
    StudentRowData,
};

pub use importer::{ImportError, StudentImporter, StudentImporterImpl};

pub use repository::{RepositoryError, RetryPolicy, UnitOfWork};

pub use api::{ApiError, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "学校学生管理系统";
