//! 替换引擎
//!
//! 将替换模板应用到指定范围的匹配记录上：
//! - 范围解析为 文档 → 记录组，逐文档做文本手术
//! - 文档/全库范围对受影响行做单趟重写；定向替换按 (line, column)
//!   降序处理，先做的替换不会使后做的偏移失效
//! - 每个文档只写回一次；单文档写失败只记入报告，不中断其余文档
//! - 产出结构化差异供调和器消费

use super::template;
use crate::models::{
    DocumentId, MatchOptions, MatchRecord, ReplacementDiff, ReplacementScope,
};
use crate::services::search::{compile_pattern, CompiledMatcher, SearchError};
use crate::services::vault::{VaultError, VaultProvider};
use regex::Captures;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::sync::Arc;

/// 一次替换操作的完整报告：差异加上逐文档的失败清单。
/// 写失败文档的匹配不计入任何差异字段
#[derive(Debug, Default)]
pub struct ReplaceReport {
    pub diff: ReplacementDiff,
    pub failures: Vec<(DocumentId, VaultError)>,
}

pub struct ReplacementEngine {
    vault: Arc<dyn VaultProvider>,
}

impl ReplacementEngine {
    pub fn new(vault: Arc<dyn VaultProvider>) -> Self {
        Self { vault }
    }

    /// 应用替换。替换一旦开始不可取消；文档内部串行写入
    pub async fn replace(
        &self,
        records: &[MatchRecord],
        scope: &ReplacementScope,
        template: &str,
        options: &MatchOptions,
    ) -> Result<ReplaceReport, SearchError> {
        let targets = resolve_scope(records, scope);
        let whole_document = matches!(
            scope,
            ReplacementScope::Document(_) | ReplacementScope::Corpus
        );

        let mut report = ReplaceReport::default();
        let Some(source_query) = targets
            .first()
            .and_then(|(_, group)| group.first())
            .map(|(_, record)| record.source_query.clone())
        else {
            return Ok(report);
        };
        let matcher = compile_pattern(&source_query, options)?;

        for (doc, group) in targets {
            let vault = Arc::clone(&self.vault);
            let read_doc = doc.clone();
            let text = match tokio::task::spawn_blocking(move || vault.read(&read_doc)).await {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => {
                    tracing::warn!(doc = %doc, error = %e, "cannot read document for replacement");
                    report.failures.push((doc, e));
                    continue;
                }
                Err(e) => {
                    tracing::warn!(doc = %doc, error = %e, "replacement read task failed");
                    report
                        .failures
                        .push((doc.clone(), VaultError::Unavailable(doc)));
                    continue;
                }
            };

            let rewrite = rewrite_document(&text, &group, whole_document, &matcher, template);
            if rewrite.replacements == 0 {
                continue;
            }

            let vault = Arc::clone(&self.vault);
            let write_doc = doc.clone();
            let new_text = rewrite.text;
            let written =
                tokio::task::spawn_blocking(move || vault.write(&write_doc, &new_text)).await;
            match written {
                Ok(Ok(())) => {
                    report.diff.total_replacements += rewrite.replacements;
                    report.diff.documents_modified.insert(doc.clone());
                    report.diff.touched_lines.insert(doc, rewrite.touched);
                    report.diff.consumed_indices.extend(rewrite.consumed);
                    report.diff.requires_full_rescan |= rewrite.requires_full_rescan;
                }
                Ok(Err(e)) => {
                    tracing::warn!(doc = %doc, error = %e, "document write failed, matches not counted");
                    report.failures.push((doc, e));
                }
                Err(e) => {
                    tracing::warn!(doc = %doc, error = %e, "replacement write task failed");
                    report
                        .failures
                        .push((doc.clone(), VaultError::Unwritable(doc)));
                }
            }
        }

        report
            .diff
            .consumed_indices
            .sort_unstable_by(|a, b| b.cmp(a));
        report.diff.consumed_indices.dedup();
        Ok(report)
    }
}

/// 把范围解析为 文档 → 有序 (结果下标, 记录) 组
fn resolve_scope<'a>(
    records: &'a [MatchRecord],
    scope: &ReplacementScope,
) -> Vec<(DocumentId, Vec<(usize, &'a MatchRecord)>)> {
    let selected: Vec<(usize, &MatchRecord)> = match scope {
        ReplacementScope::One(target) => match records.iter().position(|r| r == target) {
            Some(idx) => vec![(idx, &records[idx])],
            None => {
                tracing::warn!("replacement target not present in result list");
                Vec::new()
            }
        },
        ReplacementScope::Selected(selection) => selection
            .iter()
            .filter_map(|&i| records.get(i).map(|r| (i, r)))
            .collect(),
        ReplacementScope::Document(doc) => records
            .iter()
            .enumerate()
            .filter(|(_, r)| &r.doc == doc)
            .collect(),
        ReplacementScope::Corpus => records.iter().enumerate().collect(),
    };

    let mut by_doc: FxHashMap<DocumentId, Vec<(usize, &MatchRecord)>> = FxHashMap::default();
    for (idx, record) in selected {
        by_doc.entry(record.doc.clone()).or_default().push((idx, record));
    }

    let mut groups: Vec<_> = by_doc.into_iter().collect();
    groups.sort_by(|a, b| a.0.cmp(&b.0));
    for (_, group) in groups.iter_mut() {
        group.sort_by(|a, b| a.1.position().cmp(&b.1.position()));
    }
    groups
}

struct DocRewrite {
    text: String,
    replacements: usize,
    consumed: Vec<usize>,
    touched: BTreeSet<usize>,
    requires_full_rescan: bool,
}

fn rewrite_document(
    text: &str,
    group: &[(usize, &MatchRecord)],
    whole_document: bool,
    matcher: &CompiledMatcher,
    template: &str,
) -> DocRewrite {
    let options = matcher.options();
    if options.use_pattern && options.multiline && !matcher.is_match_anything() {
        rewrite_multiline(text, group, whole_document, matcher, template)
    } else {
        rewrite_lines(text, group, whole_document, matcher, template)
    }
}

/// 行级重写。行结构保持不变（模板引入换行时置 requires_full_rescan）
fn rewrite_lines(
    text: &str,
    group: &[(usize, &MatchRecord)],
    whole_document: bool,
    matcher: &CompiledMatcher,
    template: &str,
) -> DocRewrite {
    let mut lines = split_keep_eol(text);
    let expand_tokens = matcher.options().use_pattern;
    let template_has_newline = template.contains('\n');

    let mut by_line: FxHashMap<usize, Vec<(usize, &MatchRecord)>> = FxHashMap::default();
    for &(idx, record) in group {
        by_line.entry(record.line).or_default().push((idx, record));
    }
    let mut line_numbers: Vec<usize> = by_line.keys().copied().collect();
    line_numbers.sort_unstable();

    let mut replacements = 0usize;
    let mut consumed = Vec::new();
    let mut touched = BTreeSet::new();
    let mut requires_full_rescan = false;

    for line_idx in line_numbers {
        let line_records = &by_line[&line_idx];
        let Some(body) = lines.get(line_idx).map(|(body, _)| body.clone()) else {
            tracing::warn!(line = line_idx, "record points past end of document, skipping");
            continue;
        };

        let mut new_body = None;
        let mut line_replaced = 0usize;
        let mut line_consumed = Vec::new();

        if matcher.is_match_anything() {
            // 退化模式的整行记录：行体换成模板（模式模式下先展开一次）
            for &(idx, record) in line_records {
                if record.matched_text != body {
                    tracing::warn!(line = line_idx, "line changed since scan, skipping record");
                    continue;
                }
                let replaced = match matcher.regex().captures(&body) {
                    Some(caps) if expand_tokens => {
                        template::expand(template, &caps, &body, (0, body.len()))
                    }
                    _ => template.to_string(),
                };
                requires_full_rescan |= replaced.contains('\n');
                new_body = Some(replaced);
                line_replaced += 1;
                line_consumed.push(idx);
            }
        } else if whole_document {
            // 受影响行做单趟重写，避免重叠重建造成重复计数
            let mut count = 0usize;
            let replaced = if expand_tokens {
                matcher
                    .regex()
                    .replace_all(&body, |caps: &Captures| {
                        count += 1;
                        template::expand(template, caps, &body, (0, body.len()))
                    })
                    .into_owned()
            } else {
                count = matcher.regex().find_iter(&body).count();
                matcher
                    .regex()
                    .replace_all(&body, regex::NoExpand(template))
                    .into_owned()
            };
            if count > 0 {
                requires_full_rescan |= template_has_newline;
                line_replaced = count;
                line_consumed.extend(line_records.iter().map(|&(idx, _)| idx));
                new_body = Some(replaced);
            }
        } else {
            // 定向替换：行内按列降序逐条手术
            let mut body_mut = body;
            for &(idx, record) in line_records.iter().rev() {
                let Some(col) = record.column else {
                    tracing::warn!(line = line_idx, "whole-line record outside degenerate mode, skipping");
                    continue;
                };
                let len = record.matched_text.len();
                if body_mut.get(col..col + len) != Some(record.matched_text.as_str()) {
                    tracing::warn!(line = line_idx, col, "match text moved, skipping record");
                    continue;
                }
                let replacement = if expand_tokens {
                    match matcher.regex().captures_at(&body_mut, col) {
                        Some(caps)
                            if caps
                                .get(0)
                                .is_some_and(|m| m.start() == col && m.end() == col + len) =>
                        {
                            template::expand(template, &caps, &body_mut, (0, body_mut.len()))
                        }
                        _ => {
                            tracing::warn!(line = line_idx, col, "match no longer aligns, skipping record");
                            continue;
                        }
                    }
                } else {
                    template.to_string()
                };
                requires_full_rescan |= replacement.contains('\n');
                body_mut.replace_range(col..col + len, &replacement);
                line_replaced += 1;
                line_consumed.push(idx);
            }
            if line_replaced > 0 {
                new_body = Some(body_mut);
            }
        }

        if let Some(new_body) = new_body {
            lines[line_idx].0 = new_body;
            replacements += line_replaced;
            consumed.extend(line_consumed);
            touched.insert(line_idx);
        }
    }

    DocRewrite {
        text: join_lines(&lines),
        replacements,
        consumed,
        touched,
        requires_full_rescan,
    }
}

/// 多行模式重写。行数可能改变，差异一律要求全量重扫
fn rewrite_multiline(
    text: &str,
    group: &[(usize, &MatchRecord)],
    whole_document: bool,
    matcher: &CompiledMatcher,
    template: &str,
) -> DocRewrite {
    let starts = crate::services::search::line_starts(text);
    let mut replacements = 0usize;
    let mut consumed = Vec::new();
    let touched: BTreeSet<usize> = group.iter().map(|&(_, r)| r.line).collect();

    let new_text = if whole_document {
        let mut count = 0usize;
        let result = matcher
            .regex()
            .replace_all(text, |caps: &Captures| {
                count += 1;
                let context = caps
                    .get(0)
                    .map(|m| line_context(text, &starts, m.start(), m.end()))
                    .unwrap_or((0, text.len()));
                template::expand(template, caps, text, context)
            })
            .into_owned();
        if count > 0 {
            replacements = count;
            consumed.extend(group.iter().map(|&(idx, _)| idx));
        }
        result
    } else {
        let mut body = text.to_string();
        // 降序 splice：靠后的偏移先改，靠前的保持有效
        for &(idx, record) in group.iter().rev() {
            let Some(col) = record.column else {
                continue;
            };
            let Some(&line_start) = starts.get(record.line) else {
                tracing::warn!(line = record.line, "record points past end of document, skipping");
                continue;
            };
            let offset = line_start + col;
            let len = record.matched_text.len();
            if body.get(offset..offset + len) != Some(record.matched_text.as_str()) {
                tracing::warn!(offset, "match text moved, skipping record");
                continue;
            }
            let replacement = match matcher.regex().captures_at(&body, offset) {
                Some(caps)
                    if caps
                        .get(0)
                        .is_some_and(|m| m.start() == offset && m.end() == offset + len) =>
                {
                    let ctx_start = body[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
                    let mut ctx_end = body[offset + len..]
                        .find('\n')
                        .map(|i| offset + len + i)
                        .unwrap_or(body.len());
                    if ctx_end > 0 && body.as_bytes()[ctx_end - 1] == b'\r' {
                        ctx_end -= 1;
                    }
                    template::expand(template, &caps, &body, (ctx_start, ctx_end))
                }
                _ => {
                    tracing::warn!(offset, "match no longer aligns, skipping record");
                    continue;
                }
            };
            body.replace_range(offset..offset + len, &replacement);
            replacements += 1;
            consumed.push(idx);
        }
        body
    };

    DocRewrite {
        text: new_text,
        replacements,
        consumed,
        touched,
        requires_full_rescan: true,
    }
}

/// 匹配首尾所在行的边界（不含行尾符），作 $` / $' 的上下文
fn line_context(text: &str, starts: &[usize], m_start: usize, m_end: usize) -> (usize, usize) {
    let first = starts.partition_point(|&s| s <= m_start) - 1;
    let last = starts.partition_point(|&s| s <= m_end) - 1;
    let ctx_start = starts[first];
    let mut ctx_end = starts
        .get(last + 1)
        .map(|&s| s - 1)
        .unwrap_or_else(|| text.len());
    if ctx_end > 0 && text.as_bytes()[ctx_end - 1] == b'\r' {
        ctx_end -= 1;
    }
    (ctx_start, ctx_end)
}

/// 按行拆分，保留每行原有的行尾符以便无损重建
fn split_keep_eol(text: &str) -> Vec<(String, &'static str)> {
    let mut lines = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        match rest.find('\n') {
            Some(pos) => {
                let line = &rest[..pos];
                let (body, eol) = match line.strip_suffix('\r') {
                    Some(body) => (body, "\r\n"),
                    None => (line, "\n"),
                };
                lines.push((body.to_string(), eol));
                rest = &rest[pos + 1..];
            }
            None => {
                lines.push((rest.to_string(), ""));
                rest = "";
            }
        }
    }
    lines
}

fn join_lines(lines: &[(String, &'static str)]) -> String {
    let mut out = String::new();
    for (body, eol) in lines {
        out.push_str(body);
        out.push_str(eol);
    }
    out
}
