// ==========================================
// 学校学生管理系统 - 年级/班级引用解析
// ==========================================
// 阶段: 逐行（基于每次导入加载一次的学校快照，不访问数据库）
// 模式:
//   - Name: 列中为名称，学校内大小写不敏感匹配
//   - Id:   列中为数值 ID，须属于该学校 / 该年级
// ==========================================

use crate::config::ReferenceMode;
use crate::domain::import::FieldError;
use crate::domain::school::SchoolReferences;
use crate::domain::student::ImportCandidate;
use crate::importer::data_cleaner::DataCleaner;

/// 解析结果: (grade_id, section_id)
pub type ResolvedRefs = (i64, i64);

pub struct ReferenceResolver<'a> {
    mode: ReferenceMode,
    refs: &'a SchoolReferences,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(mode: ReferenceMode, refs: &'a SchoolReferences) -> Self {
        Self { mode, refs }
    }

    pub fn resolve(&self, candidate: &ImportCandidate) -> Result<ResolvedRefs, Vec<FieldError>> {
        let row = candidate.row_number;
        let grade = candidate.grade_ref.as_str();
        let section = candidate.section_ref.as_str();

        let grade_id = match self.resolve_grade(grade) {
            Some(id) => id,
            None => {
                return Err(vec![FieldError::new(
                    row,
                    "grade",
                    format!("Grade '{}' does not exist in this school", grade),
                )])
            }
        };

        match self.resolve_section(grade_id, section) {
            Some(section_id) => Ok((grade_id, section_id)),
            None => Err(vec![FieldError::new(
                row,
                "section",
                format!("Section '{}' does not exist in grade '{}'", section, grade),
            )]),
        }
    }

    fn resolve_grade(&self, value: &str) -> Option<i64> {
        match self.mode {
            ReferenceMode::Name => self.refs.grade_id_by_name(value),
            ReferenceMode::Id => {
                DataCleaner::parse_integer(value).filter(|id| self.refs.has_grade_id(*id))
            }
        }
    }

    fn resolve_section(&self, grade_id: i64, value: &str) -> Option<i64> {
        match self.mode {
            ReferenceMode::Name => self.refs.section_id_by_name(grade_id, value),
            ReferenceMode::Id => DataCleaner::parse_integer(value)
                .filter(|id| self.refs.section_belongs_to(*id, grade_id)),
        }
    }
}
