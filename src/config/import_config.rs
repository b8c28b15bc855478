// ==========================================
// 学校学生管理系统 - 导入配置
// ==========================================
// 职责: 导入管道的可调参数（重试、引用解析方式、去重策略、字段长度上限）
// 默认值在此定义，config_kv 中的同名键可覆写
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// ==========================================
// ReferenceMode - 年级/班级列的含义
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceMode {
    /// 列中为名称，按学校内名称（大小写不敏感）解析
    #[default]
    Name,
    /// 列中为数值 ID，须属于该学校/年级
    Id,
}

impl FromStr for ReferenceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(ReferenceMode::Name),
            "id" => Ok(ReferenceMode::Id),
            other => Err(format!("未知的 reference_mode: {}", other)),
        }
    }
}

impl fmt::Display for ReferenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceMode::Name => write!(f, "name"),
            ReferenceMode::Id => write!(f, "id"),
        }
    }
}

// ==========================================
// DuplicatePolicy - 同文件内重复标识的处理
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// 首次出现的行被接受，之后的行失败
    #[default]
    KeepFirst,
    /// 所有共享同一标识的行都失败
    RejectAll,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep_first" => Ok(DuplicatePolicy::KeepFirst),
            "reject_all" => Ok(DuplicatePolicy::RejectAll),
            other => Err(format!("未知的 duplicate_policy: {}", other)),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicatePolicy::KeepFirst => write!(f, "keep_first"),
            DuplicatePolicy::RejectAll => write!(f, "reject_all"),
        }
    }
}

// ==========================================
// RetrySettings - 工作单元重试参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// 总尝试次数（含首次）
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 50,
            multiplier: 2.0,
            max_delay_ms: 1_000,
        }
    }
}

impl RetrySettings {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

// ==========================================
// FieldLimits - 字段长度上限（按字符计）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLimits {
    pub full_name: usize,
    pub email: usize,
    pub phone: usize,
    pub address: usize,
    pub grade: usize,
    pub section: usize,
    pub external_id: usize,
    pub house: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            full_name: 100,
            email: 100,
            phone: 20,
            address: 250,
            grade: 50,
            section: 50,
            external_id: 50,
            house: 50,
        }
    }
}

// ==========================================
// ImportConfig - 导入配置
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    pub retry: RetrySettings,
    pub reference_mode: ReferenceMode,
    pub duplicate_policy: DuplicatePolicy,
    pub limits: FieldLimits,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ImportConfig::default();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.reference_mode, ReferenceMode::Name);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::KeepFirst);
        assert_eq!(config.limits.full_name, 100);
    }

    #[test]
    fn test_parse_modes() {
        assert_eq!("ID".parse::<ReferenceMode>(), Ok(ReferenceMode::Id));
        assert_eq!(
            "reject_all".parse::<DuplicatePolicy>(),
            Ok(DuplicatePolicy::RejectAll)
        );
        assert!("strict".parse::<DuplicatePolicy>().is_err());
    }

    #[test]
    fn test_json_roundtrip_uses_snake_case() {
        let json = serde_json::to_value(ImportConfig::default()).unwrap();
        assert_eq!(json["reference_mode"], "name");
        assert_eq!(json["duplicate_policy"], "keep_first");
    }
}
