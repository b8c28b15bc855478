// ==========================================
// 学校学生管理系统 - 学校领域模型
// ==========================================
// 学校（导入范围）、年级、班级
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct School {
    pub school_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub grade_id: i64,
    pub school_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub section_id: i64,
    pub grade_id: i64,
    pub name: String,
}

// ==========================================
// SchoolReferences - 学校年级/班级快照
// ==========================================
// 每次导入调用加载一次，供逐行解析使用（纯内存查找）
#[derive(Debug, Clone, Default)]
pub struct SchoolReferences {
    grades_by_name: HashMap<String, i64>,
    grade_ids: HashMap<i64, String>,
    // (grade_id, 小写班级名) → section_id
    sections_by_name: HashMap<(i64, String), i64>,
    // section_id → grade_id
    section_grade: HashMap<i64, i64>,
}

impl SchoolReferences {
    pub fn new(grades: Vec<Grade>, sections: Vec<Section>) -> Self {
        let mut refs = Self::default();
        for grade in grades {
            refs.grades_by_name
                .insert(grade.name.trim().to_lowercase(), grade.grade_id);
            refs.grade_ids.insert(grade.grade_id, grade.name);
        }
        for section in sections {
            refs.sections_by_name.insert(
                (section.grade_id, section.name.trim().to_lowercase()),
                section.section_id,
            );
            refs.section_grade
                .insert(section.section_id, section.grade_id);
        }
        refs
    }

    pub fn grade_id_by_name(&self, name: &str) -> Option<i64> {
        self.grades_by_name.get(&name.trim().to_lowercase()).copied()
    }

    pub fn has_grade_id(&self, grade_id: i64) -> bool {
        self.grade_ids.contains_key(&grade_id)
    }

    pub fn section_id_by_name(&self, grade_id: i64, name: &str) -> Option<i64> {
        self.sections_by_name
            .get(&(grade_id, name.trim().to_lowercase()))
            .copied()
    }

    /// 班级 ID 是否属于指定年级
    pub fn section_belongs_to(&self, section_id: i64, grade_id: i64) -> bool {
        self.section_grade.get(&section_id) == Some(&grade_id)
    }

    pub fn is_empty(&self) -> bool {
        self.grade_ids.is_empty()
    }
}
