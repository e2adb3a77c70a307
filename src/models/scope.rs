//! 替换范围与选中集

use super::record::{DocumentId, MatchRecord};
use std::collections::BTreeSet;

/// 调用方持有的结果列表下标集合。
/// 引擎从不拥有它，只通过调和器的纯重映射保持其一致
pub type SelectionSet = BTreeSet<usize>;

/// 一次替换操作触及哪些匹配记录
#[derive(Debug, Clone)]
pub enum ReplacementScope {
    /// 单条记录
    One(MatchRecord),
    /// 外部选中的下标子集
    Selected(SelectionSet),
    /// 某文档在当前结果列表中的全部记录
    Document(DocumentId),
    /// 整个结果列表
    Corpus,
}
