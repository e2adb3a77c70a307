//! 替换差异
//!
//! 每次替换操作产出一份，由调和器消费一次后丢弃

use super::record::DocumentId;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct ReplacementDiff {
    pub total_replacements: usize,
    pub documents_modified: BTreeSet<DocumentId>,
    /// 被消费的结果列表下标，严格降序
    pub consumed_indices: Vec<usize>,
    pub touched_lines: FxHashMap<DocumentId, BTreeSet<usize>>,
    /// 副作用无法局部推理时置位（多行重写、替换文本引入换行）
    pub requires_full_rescan: bool,
}

impl ReplacementDiff {
    pub fn is_empty(&self) -> bool {
        self.total_replacements == 0 && self.consumed_indices.is_empty()
    }
}
