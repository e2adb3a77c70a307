//! 结果调和器
//!
//! 消费一份替换差异，增量更新结果列表与选中集，能不全量重扫就不重扫：
//! - 被消费的下标按降序移除，未移除下标不受移位影响
//! - 选中集做纯重映射：新下标 = 旧下标 − 更小的被消费下标数
//! - 受影响行上的剩余记录按内容重新验证（偏移在替换后会漂移，
//!   只检查原匹配文本是否仍出现在该行）
//! - 验证移除数远超消费数时视为失同步，回退全量重扫

use crate::models::{MatchRecord, ReplacementDiff, SelectionSet};
use crate::services::vault::VaultProvider;
use std::sync::Arc;

/// 调和放弃的信号：调用方应重新运行一次搜索。
/// 这是预期内的正常结果，不是故障
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeedsFullRescan;

impl std::fmt::Display for NeedsFullRescan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Reconciliation gave up, a full rescan is required")
    }
}

impl std::error::Error for NeedsFullRescan {}

/// 纯重映射：被消费的下标丢弃，其余左移被消费的更小下标数
pub fn remap_selection(selection: &SelectionSet, consumed: &[usize]) -> SelectionSet {
    let mut sorted: Vec<usize> = consumed.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    selection
        .iter()
        .copied()
        .filter(|i| sorted.binary_search(i).is_err())
        .map(|i| i - sorted.partition_point(|&c| c < i))
        .collect()
}

pub struct ResultReconciler {
    vault: Arc<dyn VaultProvider>,
    rescan_multiplier: usize,
}

impl ResultReconciler {
    pub fn new(vault: Arc<dyn VaultProvider>, rescan_multiplier: usize) -> Self {
        Self {
            vault,
            rescan_multiplier: rescan_multiplier.max(1),
        }
    }

    /// 应用差异。成功返回更新后的列表与选中集；
    /// 差异无法安全局部调和时返回 NeedsFullRescan，输入整体作废
    pub fn reconcile(
        &self,
        records: Vec<MatchRecord>,
        selection: SelectionSet,
        diff: ReplacementDiff,
    ) -> Result<(Vec<MatchRecord>, SelectionSet), NeedsFullRescan> {
        if diff.requires_full_rescan {
            tracing::debug!("diff requires full rescan, skipping incremental reconciliation");
            return Err(NeedsFullRescan);
        }

        let mut records = records;
        let mut consumed = diff.consumed_indices.clone();
        consumed.sort_unstable_by(|a, b| b.cmp(a));
        consumed.dedup();
        for &idx in &consumed {
            if idx < records.len() {
                records.remove(idx);
            } else {
                tracing::warn!(idx, "consumed index out of bounds, ignoring");
            }
        }
        let selection = remap_selection(&selection, &consumed);

        // 受影响行上的剩余记录重新验证
        let mut stale = Vec::new();
        for (doc, lines) in &diff.touched_lines {
            if !records.iter().any(|r| &r.doc == doc) {
                continue;
            }
            let doc_text = self.vault.read(doc);
            if let Err(e) = &doc_text {
                tracing::warn!(doc = %doc, error = %e, "cannot re-read document, invalidating its records");
            }
            let doc_lines: Option<Vec<&str>> =
                doc_text.as_ref().ok().map(|t| t.lines().collect());

            for (idx, record) in records.iter().enumerate() {
                if &record.doc != doc || !lines.contains(&record.line) {
                    continue;
                }
                let survives = doc_lines
                    .as_ref()
                    .and_then(|lines| lines.get(record.line))
                    .is_some_and(|line| line.contains(&record.matched_text));
                if !survives {
                    stale.push(idx);
                }
            }
        }

        // 失同步安全检查：验证移除远超消费数时宁可全量重扫，
        // 也不返回可疑列表
        let predicted = self.rescan_multiplier * consumed.len().max(1);
        if stale.len() > predicted {
            tracing::warn!(
                stale = stale.len(),
                consumed = consumed.len(),
                "revalidation removed far more than predicted, falling back to full rescan"
            );
            return Err(NeedsFullRescan);
        }

        stale.sort_unstable_by(|a, b| b.cmp(a));
        for &idx in &stale {
            records.remove(idx);
        }
        let selection = remap_selection(&selection, &stale);

        Ok((records, selection))
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/services/replace/reconcile.rs"]
mod tests;
