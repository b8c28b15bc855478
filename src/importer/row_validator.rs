// ==========================================
// 学校学生管理系统 - 行校验器
// ==========================================
// 阶段: 逐行校验（纯函数，不访问数据库）
// 规则: 收集一行内的全部错误，不在首个错误处返回
// ==========================================

use crate::config::FieldLimits;
use crate::domain::import::FieldError;
use crate::domain::student::{ImportCandidate, RawRow};
use crate::domain::types::{BloodGroup, Gender};
use crate::importer::data_cleaner::DataCleaner;
use chrono::NaiveDate;
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("valid regex"));

pub struct RowValidator {
    limits: FieldLimits,
    today: NaiveDate,
}

/// 单行错误收集器
struct RowErrors {
    row_number: usize,
    errors: Vec<FieldError>,
}

impl RowErrors {
    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .push(FieldError::new(self.row_number, field, message));
    }

    fn check_length(&mut self, field: &str, label: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.push(field, format!("{} must be at most {} characters", label, max));
        }
    }

    fn required(&mut self, field: &str, label: &str, value: &str) -> Option<String> {
        let value = DataCleaner::normalize_null(value);
        if value.is_none() {
            self.push(field, format!("{} is required", label));
        }
        value
    }

    fn optional_date(&mut self, field: &str, label: &str, value: &str) -> Option<NaiveDate> {
        let value = DataCleaner::normalize_null(value)?;
        let date = DataCleaner::parse_date(&value);
        if date.is_none() {
            self.push(
                field,
                format!("{} '{}' is not a valid date (expected YYYY-MM-DD)", label, value),
            );
        }
        date
    }

    fn optional_parsed<T: FromStr<Err = String>>(&mut self, field: &str, value: &str) -> Option<T> {
        let value = DataCleaner::normalize_null(value)?;
        match value.parse::<T>() {
            Ok(parsed) => Some(parsed),
            Err(message) => {
                self.push(field, message);
                None
            }
        }
    }
}

impl RowValidator {
    pub fn new(limits: FieldLimits, today: NaiveDate) -> Self {
        Self { limits, today }
    }

    /// 校验一行
    ///
    /// # 返回
    /// - Ok(ImportCandidate): 所有字段合法
    /// - Err(Vec<FieldError>): 该行的全部错误（按列顺序）
    pub fn validate(
        &self,
        school_id: i64,
        row: &RawRow,
    ) -> Result<ImportCandidate, Vec<FieldError>> {
        let data = &row.data;
        let limits = &self.limits;
        let mut errs = RowErrors {
            row_number: row.row_number,
            errors: Vec::new(),
        };

        // 姓名
        let full_name = errs.required("full_name", "Full name", &data.full_name);
        errs.check_length("full_name", "Full name", &data.full_name, limits.full_name);

        // 出生日期
        let date_of_birth = errs.optional_date("date_of_birth", "Date of birth", &data.date_of_birth);
        if date_of_birth.is_some_and(|dob| dob > self.today) {
            errs.push("date_of_birth", "Date of birth cannot be in the future");
        }

        let gender: Option<Gender> = errs.optional_parsed("gender", &data.gender);

        // 邮箱
        let email = DataCleaner::normalize_null(&data.email);
        if let Some(email) = &email {
            errs.check_length("email", "Email", email, limits.email);
            if !EMAIL_RE.is_match(email) {
                errs.push("email", format!("Invalid email address '{}'", email));
            }
        }

        let phone = DataCleaner::normalize_null(&data.phone);
        errs.check_length("phone", "Phone", &data.phone, limits.phone);

        let address = DataCleaner::normalize_null(&data.address);
        errs.check_length("address", "Address", &data.address, limits.address);

        let enrollment_date =
            errs.optional_date("enrollment_date", "Enrollment date", &data.enrollment_date);

        // 年级 / 班级（此处只校验存在与长度，解析在 ReferenceResolver）
        let grade_ref = errs.required("grade", "Grade", &data.grade);
        errs.check_length("grade", "Grade", &data.grade, limits.grade);
        let section_ref = errs.required("section", "Section", &data.section);
        errs.check_length("section", "Section", &data.section, limits.section);

        // 学号
        let roll_number = DataCleaner::normalize_null(&data.roll_number).and_then(|value| {
            match DataCleaner::parse_integer(&value).filter(|n| *n > 0) {
                Some(n) => Some(n),
                None => {
                    errs.push(
                        "roll_number",
                        format!("Roll number '{}' must be a positive integer", value),
                    );
                    None
                }
            }
        });

        let external_id = DataCleaner::normalize_null(&data.external_id);
        errs.check_length("external_id", "External ID", &data.external_id, limits.external_id);

        let blood_group: Option<BloodGroup> = errs.optional_parsed("blood_group", &data.blood_group);

        let house = DataCleaner::normalize_null(&data.house);
        errs.check_length("house", "House", &data.house, limits.house);

        if !errs.errors.is_empty() {
            return Err(errs.errors);
        }

        match (full_name, grade_ref, section_ref) {
            (Some(full_name), Some(grade_ref), Some(section_ref)) => Ok(ImportCandidate {
                row_number: row.row_number,
                school_id,
                full_name,
                date_of_birth,
                gender,
                email,
                phone,
                address,
                enrollment_date,
                grade_ref,
                section_ref,
                roll_number,
                external_id,
                blood_group,
                house,
            }),
            // 必填缺失时 errs 非空，已在上面返回
            _ => Err(errs.errors),
        }
    }
}
