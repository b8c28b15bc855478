// ==========================================
// 学校学生管理系统 - 学生导入 Trait
// ==========================================
// 职责: 定义导入接口（不包含实现）
// ==========================================

use crate::domain::import::ImportReport;
use crate::domain::student::RawRow;
use crate::importer::error::ImportResult;

// ==========================================
// StudentImporter Trait
// ==========================================
// 用途: 学生批量导入主接口
// 实现者: StudentImporterImpl
pub trait StudentImporter: Send + Sync {
    /// 将一份表格文件导入指定学校
    ///
    /// # 参数
    /// - school_id: 目标学校（导入范围）
    /// - data: 上传文件的原始字节
    ///
    /// # 返回
    /// - Ok(ImportReport): 每个数据行一条结果；文件或数据库等批次级失败为 row 0
    /// - Err(SchoolNotFound): 学校不存在，未读取文件（唯一的 Err）
    ///
    /// # 导入流程
    /// 1. 范围检查
    /// 2. 文件读取
    /// 3. 学校快照加载（可重试）
    /// 4. 逐行校验 / 引用解析 / 去重（不访问数据库）
    /// 5. 单事务落库（可重试）
    /// 6. 汇总结果
    fn import_students(&self, school_id: i64, data: &[u8]) -> ImportResult<ImportReport>;
}

// ==========================================
// TabularReader Trait
// ==========================================
// 用途: 文件解析接口（阶段: 读取）
// 实现者: CsvReader, ExcelReader, UniversalReader
pub trait TabularReader: Send + Sync {
    /// 解析字节流为数据行
    ///
    /// # 返回
    /// - Ok(Vec<RawRow>): 跳过表头与姓名为空的行，行号与源文件一致
    /// - Err(FormatError): 无法按容器格式解析
    /// - Err(EmptyDocument): 没有数据行
    fn read_rows(&self, data: &[u8]) -> ImportResult<Vec<RawRow>>;
}
