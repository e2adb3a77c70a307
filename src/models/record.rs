//! 文档标识与匹配记录

use compact_str::CompactString;
use std::fmt;

/// 宿主提供的文档标识。引擎不解释其内容；
/// 本地目录后端使用相对路径，内存后端使用任意键
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(CompactString);

impl DocumentId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(CompactString::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        Self(CompactString::from(s))
    }
}

/// 查询在某文档某行上的一次命中。
/// 仅由扫描器产出；此后只读，调和器移除除外。
/// 结果列表恒按 `(doc, line, column)` 升序排列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub doc: DocumentId,
    /// 0 起始行号
    pub line: usize,
    /// 行内 0 起始字节列；整行匹配为 None
    pub column: Option<usize>,
    pub matched_text: String,
    pub line_text: String,
    pub source_query: String,
}

impl MatchRecord {
    /// 排序键。`Option<usize>` 的序使整行匹配（None）排在该行任何列之前
    pub fn position(&self) -> (&DocumentId, usize, Option<usize>) {
        (&self.doc, self.line, self.column)
    }
}

/// 按 `(doc, line, column)` 升序排列记录
pub fn sort_records(records: &mut [MatchRecord]) {
    records.sort_by(|a, b| a.position().cmp(&b.position()));
}
