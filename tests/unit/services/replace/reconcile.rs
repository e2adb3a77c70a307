use super::*;
use crate::models::{DocumentId, ReplacementDiff};
use crate::services::vault::MemoryVault;
use std::collections::BTreeSet;

fn record(doc: &str, line: usize, column: usize, matched: &str, line_text: &str) -> MatchRecord {
    MatchRecord {
        doc: DocumentId::new(doc),
        line,
        column: Some(column),
        matched_text: matched.to_string(),
        line_text: line_text.to_string(),
        source_query: matched.to_string(),
    }
}

fn selection(indices: &[usize]) -> SelectionSet {
    indices.iter().copied().collect()
}

fn reconciler(vault: Arc<MemoryVault>) -> ResultReconciler {
    ResultReconciler::new(vault, 4)
}

#[test]
fn remap_shifts_past_consumed_indices() {
    let remapped = remap_selection(&selection(&[0, 2, 4]), &[1, 3]);
    assert_eq!(remapped, selection(&[0, 1, 2]));
}

#[test]
fn remap_drops_consumed_selection_entries() {
    let remapped = remap_selection(&selection(&[1, 2]), &[1]);
    assert_eq!(remapped, selection(&[1]));
}

#[test]
fn remap_handles_unsorted_duplicate_consumed() {
    let remapped = remap_selection(&selection(&[5]), &[3, 1, 3]);
    assert_eq!(remapped, selection(&[3]));
}

#[test]
fn remap_of_empty_selection_is_empty() {
    assert!(remap_selection(&selection(&[]), &[0, 1]).is_empty());
}

#[test]
fn full_rescan_flag_short_circuits() {
    let vault = Arc::new(MemoryVault::new());
    let diff = ReplacementDiff {
        requires_full_rescan: true,
        ..Default::default()
    };

    let result = reconciler(vault).reconcile(vec![record("a.md", 0, 0, "cat", "cat")], selection(&[0]), diff);
    assert_eq!(result.unwrap_err(), NeedsFullRescan);
}

#[test]
fn consumed_indices_are_removed_and_selection_remapped() {
    let vault = Arc::new(MemoryVault::new());
    vault.insert("a.md", "dog zero\ncat one\ndog two\ncat three\ncat four\n");

    let records = vec![
        record("a.md", 0, 0, "cat", "cat zero"),
        record("a.md", 1, 0, "cat", "cat one"),
        record("a.md", 2, 0, "cat", "cat two"),
        record("a.md", 3, 0, "cat", "cat three"),
        record("a.md", 4, 0, "cat", "cat four"),
    ];
    let mut touched_lines = rustc_hash::FxHashMap::default();
    touched_lines.insert(
        DocumentId::new("a.md"),
        [0usize, 2].into_iter().collect::<BTreeSet<_>>(),
    );
    let diff = ReplacementDiff {
        total_replacements: 2,
        consumed_indices: vec![2, 0],
        touched_lines,
        ..Default::default()
    };

    let (records, remapped) = reconciler(vault)
        .reconcile(records, selection(&[0, 2, 4]), diff)
        .unwrap();

    // 0 和 2 被消费；剩余 1、3、4 左移为 0、1、2
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].line, 1);
    assert_eq!(records[1].line, 3);
    assert_eq!(records[2].line, 4);
    // 选中的 0、2 被消费丢弃，4 移到 2
    assert_eq!(remapped, selection(&[2]));
}

#[test]
fn revalidation_removes_vanished_records() {
    let vault = Arc::new(MemoryVault::new());
    // 行 0 还有一个幸存的 cat；行 1 的 cat 已经没了
    vault.insert("a.md", "dog and cat\ndog only\n");

    let records = vec![
        record("a.md", 0, 8, "cat", "cat and cat"),
        record("a.md", 1, 0, "cat", "cat only"),
    ];
    let mut touched_lines = rustc_hash::FxHashMap::default();
    touched_lines.insert(
        DocumentId::new("a.md"),
        [0usize, 1].into_iter().collect::<BTreeSet<_>>(),
    );
    let diff = ReplacementDiff {
        total_replacements: 2,
        consumed_indices: vec![],
        touched_lines,
        ..Default::default()
    };

    let (records, remapped) = reconciler(vault)
        .reconcile(records, selection(&[0, 1]), diff)
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].line, 0);
    assert_eq!(remapped, selection(&[0]));
}

#[test]
fn unreadable_document_invalidates_its_records() {
    let vault = Arc::new(MemoryVault::new());
    // a.md 不存在：其受影响记录全部失效

    let records = vec![record("a.md", 0, 0, "cat", "cat")];
    let mut touched_lines = rustc_hash::FxHashMap::default();
    touched_lines.insert(
        DocumentId::new("a.md"),
        [0usize].into_iter().collect::<BTreeSet<_>>(),
    );
    let diff = ReplacementDiff {
        total_replacements: 1,
        consumed_indices: vec![],
        touched_lines,
        ..Default::default()
    };

    let (records, _) = reconciler(vault)
        .reconcile(records, selection(&[]), diff)
        .unwrap();
    assert!(records.is_empty());
}

#[test]
fn excessive_stale_records_trigger_full_rescan() {
    let vault = Arc::new(MemoryVault::new());
    // 文档被外部整体改写，所有残留记录都验证失败
    vault.insert("a.md", "nothing matches here\n".repeat(12));

    let records: Vec<MatchRecord> = (0..10)
        .map(|line| record("a.md", line, 0, "cat", "cat here"))
        .collect();
    let mut touched_lines = rustc_hash::FxHashMap::default();
    touched_lines.insert(
        DocumentId::new("a.md"),
        (0usize..10).collect::<BTreeSet<_>>(),
    );
    let diff = ReplacementDiff {
        total_replacements: 1,
        consumed_indices: vec![],
        touched_lines,
        ..Default::default()
    };

    // 消费 0 条（按 1 计），倍数 4：预算 4，失效 10 → 回退
    let result = reconciler(vault).reconcile(records, selection(&[]), diff);
    assert_eq!(result.unwrap_err(), NeedsFullRescan);
}

#[test]
fn untouched_lines_are_not_revalidated() {
    let vault = Arc::new(MemoryVault::new());
    // 行 1 的记录其实已经失效，但该行不在 touched_lines 里，不做验证
    vault.insert("a.md", "dog\ndog\n");

    let records = vec![
        record("a.md", 0, 0, "dog", "dog"),
        record("a.md", 1, 0, "cat", "cat"),
    ];
    let mut touched_lines = rustc_hash::FxHashMap::default();
    touched_lines.insert(
        DocumentId::new("a.md"),
        [0usize].into_iter().collect::<BTreeSet<_>>(),
    );
    let diff = ReplacementDiff {
        total_replacements: 1,
        consumed_indices: vec![],
        touched_lines,
        ..Default::default()
    };

    let (records, _) = reconciler(vault)
        .reconcile(records, selection(&[]), diff)
        .unwrap();
    assert_eq!(records.len(), 2);
}
