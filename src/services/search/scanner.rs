//! 多文档扫描器
//!
//! 按固定批次并发读取文档，逐行产出匹配记录：
//! - 批次边界检查取消令牌；取消的扫描丢弃全部部分结果
//! - 单文档读失败记日志后跳过，不中断整库扫描
//! - 全部批次完成后按 (doc, line, column) 排序一次

use super::{CancelToken, CompiledMatcher, Result, SearchError};
use crate::models::{sort_records, DocumentId, MatchRecord};
use crate::services::vault::{VaultError, VaultProvider};
use memchr::memmem;
use std::sync::Arc;

#[derive(Debug)]
pub struct ScanOutput {
    pub records: Vec<MatchRecord>,
    pub documents_scanned: usize,
    pub documents_skipped: usize,
}

pub struct MatchScanner {
    vault: Arc<dyn VaultProvider>,
    batch_size: usize,
}

impl MatchScanner {
    pub fn new(vault: Arc<dyn VaultProvider>, batch_size: usize) -> Self {
        Self {
            vault,
            batch_size: batch_size.max(1),
        }
    }

    /// 执行一次完整扫描。不可恢复续扫：每次调用都从头开始
    pub async fn scan(
        &self,
        matcher: Arc<CompiledMatcher>,
        token: CancelToken,
    ) -> Result<ScanOutput> {
        let vault = Arc::clone(&self.vault);
        let ids = tokio::task::spawn_blocking(move || vault.enumerate())
            .await
            .map_err(|_| SearchError::Cancelled)??;

        if token.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        let mut records = Vec::new();
        let mut documents_scanned = 0usize;
        let mut documents_skipped = 0usize;

        for batch in ids.chunks(self.batch_size) {
            let mut handles = Vec::with_capacity(batch.len());
            for id in batch {
                let vault = Arc::clone(&self.vault);
                let matcher = Arc::clone(&matcher);
                let id = id.clone();
                handles.push(tokio::task::spawn_blocking(move || {
                    match vault.read(&id) {
                        Ok(text) => Ok(scan_document(&id, &text, &matcher)),
                        Err(e) => Err((id, e)),
                    }
                }));
            }

            for handle in handles {
                match handle.await {
                    Ok(Ok(found)) => {
                        documents_scanned += 1;
                        records.extend(found);
                    }
                    Ok(Err((id, VaultError::NotText(_)))) => {
                        documents_skipped += 1;
                        tracing::debug!(doc = %id, "skipping non-text document");
                    }
                    Ok(Err((id, e))) => {
                        documents_skipped += 1;
                        tracing::warn!(doc = %id, error = %e, "failed to read document, skipping");
                    }
                    Err(e) => {
                        documents_skipped += 1;
                        tracing::warn!(error = %e, "document scan task failed");
                    }
                }
            }

            if token.is_cancelled() {
                return Err(SearchError::Cancelled);
            }
        }

        if token.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        sort_records(&mut records);
        Ok(ScanOutput {
            records,
            documents_scanned,
            documents_skipped,
        })
    }
}

/// 行起始字节偏移表（第 0 行恒从 0 开始）
pub(crate) fn line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for pos in memchr::memchr_iter(b'\n', text.as_bytes()) {
        starts.push(pos + 1);
    }
    starts
}

/// 第 line 行的内容（去掉行尾 \n 与 \r）
pub(crate) fn line_at<'a>(text: &'a str, starts: &[usize], line: usize) -> Option<&'a str> {
    let begin = *starts.get(line)?;
    let end = starts.get(line + 1).map(|&s| s - 1).unwrap_or(text.len());
    let body = &text[begin..end];
    Some(body.strip_suffix('\r').unwrap_or(body))
}

/// 扫描单个文档的全文，产出未排序的匹配记录
pub fn scan_document(doc: &DocumentId, text: &str, matcher: &CompiledMatcher) -> Vec<MatchRecord> {
    let options = matcher.options();

    if matcher.is_match_anything() {
        // 退化模式：每个非空行记一次整行命中，避免逐字符命中风暴
        return text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(line_idx, line)| MatchRecord {
                doc: doc.clone(),
                line: line_idx,
                column: None,
                matched_text: line.to_string(),
                line_text: line.to_string(),
                source_query: matcher.query().to_string(),
            })
            .collect();
    }

    if options.use_pattern && options.multiline {
        return scan_multiline(doc, text, matcher);
    }

    let mut records = Vec::new();
    for (line_idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match matcher.literal_needle() {
            Some(needle) => scan_line_literal(doc, line_idx, line, needle, matcher, &mut records),
            None => scan_line_regex(doc, line_idx, line, matcher, &mut records),
        }
    }
    records
}

fn scan_line_regex(
    doc: &DocumentId,
    line_idx: usize,
    line: &str,
    matcher: &CompiledMatcher,
    records: &mut Vec<MatchRecord>,
) {
    for m in matcher.regex().find_iter(line) {
        records.push(MatchRecord {
            doc: doc.clone(),
            line: line_idx,
            column: Some(m.start()),
            matched_text: m.as_str().to_string(),
            line_text: line.to_string(),
            source_query: matcher.query().to_string(),
        });
    }
}

/// 纯子串扫描。大小写不敏感时做 ASCII 折叠比较，
/// 折叠不改变字节长度，位置可直接回到原行取原始大小写文本
fn scan_line_literal(
    doc: &DocumentId,
    line_idx: usize,
    line: &str,
    needle: &str,
    matcher: &CompiledMatcher,
    records: &mut Vec<MatchRecord>,
) {
    if needle.is_empty() {
        return;
    }

    let case_sensitive = matcher.options().case_sensitive;
    let folded_line;
    let folded_needle;
    let (hay, pat) = if case_sensitive {
        (line.as_bytes(), needle.as_bytes())
    } else {
        folded_line = line.to_ascii_lowercase();
        folded_needle = needle.to_ascii_lowercase();
        (folded_line.as_bytes(), folded_needle.as_bytes())
    };

    let finder = memmem::Finder::new(pat);
    let mut start = 0usize;
    while let Some(pos) = finder.find(&hay[start..]) {
        let at = start + pos;
        records.push(MatchRecord {
            doc: doc.clone(),
            line: line_idx,
            column: Some(at),
            matched_text: line[at..at + needle.len()].to_string(),
            line_text: line.to_string(),
            source_query: matcher.query().to_string(),
        });
        // 非重叠：越过本次命中再继续
        start = at + needle.len();
    }
}

/// 多行模式：匹配器跑在全文上，记录落在匹配起点所在行
fn scan_multiline(doc: &DocumentId, text: &str, matcher: &CompiledMatcher) -> Vec<MatchRecord> {
    let starts = line_starts(text);
    let mut records = Vec::new();

    for m in matcher.regex().find_iter(text) {
        let line = starts.partition_point(|&s| s <= m.start()) - 1;
        let column = m.start() - starts[line];
        let line_text = line_at(text, &starts, line).unwrap_or("").to_string();
        records.push(MatchRecord {
            doc: doc.clone(),
            line,
            column: Some(column),
            matched_text: m.as_str().to_string(),
            line_text,
            source_query: matcher.query().to_string(),
        });
    }
    records
}
