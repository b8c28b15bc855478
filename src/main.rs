// ==========================================
// 学校学生管理系统 - 命令行入口
// ==========================================
// 用法:
//   school-admin init [db_path]
//   school-admin add-school <name> [db_path]
//   school-admin add-grade <school_id> <name> [db_path]
//   school-admin add-section <grade_id> <name> [db_path]
//   school-admin set-config <key> <value> [db_path]
//   school-admin import <school_id> <file> [db_path]
//
// 结果以 JSON 输出到 stdout，日志写 stderr
// ==========================================

use anyhow::{bail, Context, Result};
use school_admin::api::ImportApi;
use school_admin::config::ConfigManager;
use school_admin::db::{get_default_db_path, init_schema, open_sqlite_connection, read_schema_version};
use school_admin::logging;
use school_admin::repository::SchoolRepository;
use serde_json::json;
use std::sync::{Arc, Mutex};

const USAGE: &str = "usage: school-admin <init|add-school|add-grade|add-section|set-config|import> [args] [db_path]";

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        bail!(USAGE);
    };
    let rest = &args[1..];

    tracing::debug!(command = %command, "{} v{}", school_admin::APP_NAME, school_admin::VERSION);

    let output = match command.as_str() {
        "init" => {
            let db_path = db_path_arg(rest, 0);
            let conn = open_sqlite_connection(&db_path)?;
            init_schema(&conn)?;
            json!({ "dbPath": db_path, "schemaVersion": read_schema_version(&conn)? })
        }
        "add-school" => {
            let name = required_arg(rest, 0, "name")?;
            let repo = school_repository(&db_path_arg(rest, 1))?;
            serde_json::to_value(repo.create_school(name)?)?
        }
        "add-grade" => {
            let school_id = parse_id(required_arg(rest, 0, "school_id")?)?;
            let name = required_arg(rest, 1, "name")?;
            let repo = school_repository(&db_path_arg(rest, 2))?;
            serde_json::to_value(repo.add_grade(school_id, name)?)?
        }
        "add-section" => {
            let grade_id = parse_id(required_arg(rest, 0, "grade_id")?)?;
            let name = required_arg(rest, 1, "name")?;
            let repo = school_repository(&db_path_arg(rest, 2))?;
            serde_json::to_value(repo.add_section(grade_id, name)?)?
        }
        "set-config" => {
            let key = required_arg(rest, 0, "key")?;
            let value = required_arg(rest, 1, "value")?;
            let db_path = db_path_arg(rest, 2);
            let conn = open_sqlite_connection(&db_path)?;
            init_schema(&conn)?;
            let manager = ConfigManager::from_connection(Arc::new(Mutex::new(conn)));
            manager.set_global_config_value(key, value)?;
            serde_json::from_str(&manager.get_config_snapshot()?)?
        }
        "import" => {
            let school_id = parse_id(required_arg(rest, 0, "school_id")?)?;
            let file = required_arg(rest, 1, "file")?;
            let db_path = db_path_arg(rest, 2);
            ensure_schema(&db_path)?;

            let data = std::fs::read(file).with_context(|| format!("无法读取文件: {}", file))?;
            let response = ImportApi::new(db_path).import_students(school_id, data).await?;
            serde_json::to_value(response)?
        }
        other => bail!("unknown command '{}'\n{}", other, USAGE),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn required_arg<'a>(args: &'a [String], idx: usize, name: &str) -> Result<&'a str> {
    args.get(idx)
        .map(|s| s.as_str())
        .with_context(|| format!("missing argument <{}>\n{}", name, USAGE))
}

fn db_path_arg(args: &[String], idx: usize) -> String {
    args.get(idx)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(get_default_db_path)
}

fn parse_id(value: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .with_context(|| format!("'{}' is not a valid id", value))
}

fn ensure_schema(db_path: &str) -> Result<()> {
    let conn = open_sqlite_connection(db_path)?;
    init_schema(&conn)?;
    Ok(())
}

fn school_repository(db_path: &str) -> Result<SchoolRepository> {
    ensure_schema(db_path)?;
    Ok(SchoolRepository::new(db_path)?)
}
