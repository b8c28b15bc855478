// ==========================================
// 学校学生管理系统 - 重复检测器
// ==========================================
// 职责: 检测外部标识与学校已有学生 / 同文件其他行的冲突
// 约束: 纯内存计算；已有标识每次导入加载一次
//       比较时 TRIM + 小写；空标识不参与检测
// ==========================================

use crate::config::DuplicatePolicy;
use crate::domain::import::{DuplicateError, DuplicateKind};
use crate::domain::student::ImportCandidate;
use std::collections::{HashMap, HashSet};

pub struct DuplicateDetector {
    policy: DuplicatePolicy,
    existing: HashSet<String>,
    /// 本批次已接受的标识
    accepted: HashSet<String>,
    /// 文件内各标识出现次数（RejectAll 使用）
    occurrences: HashMap<String, usize>,
}

impl DuplicateDetector {
    /// 创建检测器
    ///
    /// # 参数
    /// - existing: 学校内已有标识（已小写）
    /// - policy: 同文件重复的处理策略
    /// - candidates: 本批次通过校验且引用已解析的候选（RejectAll 需预先统计出现次数）
    pub fn new<'c, I>(existing: HashSet<String>, policy: DuplicatePolicy, candidates: I) -> Self
    where
        I: IntoIterator<Item = &'c ImportCandidate>,
    {
        let mut occurrences: HashMap<String, usize> = HashMap::new();
        if policy == DuplicatePolicy::RejectAll {
            for key in candidates.into_iter().filter_map(ImportCandidate::natural_key) {
                *occurrences.entry(key).or_insert(0) += 1;
            }
        }

        Self {
            policy,
            existing,
            accepted: HashSet::new(),
            occurrences,
        }
    }

    /// 检测一条候选；通过时记入本批次已接受集合
    pub fn check(&mut self, candidate: &ImportCandidate) -> Result<(), DuplicateError> {
        let Some(key) = candidate.natural_key() else {
            return Ok(());
        };

        let duplicate = |kind| DuplicateError {
            row_number: candidate.row_number,
            external_id: candidate
                .external_id
                .as_deref()
                .unwrap_or_default()
                .trim()
                .to_string(),
            kind,
        };

        if self.existing.contains(&key) {
            return Err(duplicate(DuplicateKind::ExistingInSchool));
        }

        let within_file = match self.policy {
            DuplicatePolicy::KeepFirst => self.accepted.contains(&key),
            DuplicatePolicy::RejectAll => self.occurrences.get(&key).copied().unwrap_or(0) > 1,
        };
        if within_file {
            return Err(duplicate(DuplicateKind::WithinFile));
        }

        self.accepted.insert(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(row_number: usize, external_id: Option<&str>) -> ImportCandidate {
        ImportCandidate {
            row_number,
            school_id: 1,
            full_name: format!("Student {}", row_number),
            date_of_birth: None,
            gender: None,
            email: None,
            phone: None,
            address: None,
            enrollment_date: None,
            grade_ref: "Grade 1".into(),
            section_ref: "A".into(),
            roll_number: None,
            external_id: external_id.map(str::to_string),
            blood_group: None,
            house: None,
        }
    }

    fn kinds(detector: &mut DuplicateDetector, candidates: &[ImportCandidate]) -> Vec<Option<DuplicateKind>> {
        candidates
            .iter()
            .map(|c| detector.check(c).err().map(|e| e.kind))
            .collect()
    }

    #[test]
    fn test_existing_in_school_case_insensitive() {
        let existing = HashSet::from(["stu-1".to_string()]);
        let candidates = vec![candidate(2, Some(" STU-1 "))];
        let mut detector = DuplicateDetector::new(existing, DuplicatePolicy::KeepFirst, &candidates);

        let err = detector.check(&candidates[0]).unwrap_err();
        assert_eq!(err.kind, DuplicateKind::ExistingInSchool);
        assert_eq!(err.external_id, "STU-1");
        assert_eq!(
            err.to_string(),
            "External ID 'STU-1' already exists in this school"
        );
    }

    #[test]
    fn test_keep_first_accepts_first_occurrence() {
        let candidates = vec![
            candidate(2, Some("S1")),
            candidate(3, Some("s1")),
            candidate(4, Some("S2")),
        ];
        let mut detector =
            DuplicateDetector::new(HashSet::new(), DuplicatePolicy::KeepFirst, &candidates);

        assert_eq!(
            kinds(&mut detector, &candidates),
            vec![None, Some(DuplicateKind::WithinFile), None]
        );
    }

    #[test]
    fn test_reject_all_fails_every_occurrence() {
        let candidates = vec![
            candidate(2, Some("S1")),
            candidate(3, Some("S1")),
            candidate(4, Some("S2")),
        ];
        let mut detector =
            DuplicateDetector::new(HashSet::new(), DuplicatePolicy::RejectAll, &candidates);

        assert_eq!(
            kinds(&mut detector, &candidates),
            vec![
                Some(DuplicateKind::WithinFile),
                Some(DuplicateKind::WithinFile),
                None
            ]
        );
    }

    #[test]
    fn test_blank_identifiers_are_exempt() {
        let candidates = vec![
            candidate(2, None),
            candidate(3, Some("")),
            candidate(4, Some("   ")),
        ];
        for policy in [DuplicatePolicy::KeepFirst, DuplicatePolicy::RejectAll] {
            let mut detector = DuplicateDetector::new(HashSet::new(), policy, &candidates);
            assert_eq!(kinds(&mut detector, &candidates), vec![None, None, None]);
        }
    }
}
