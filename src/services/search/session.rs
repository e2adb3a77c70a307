//! 搜索会话
//!
//! 把一次用户请求变成一次定义良好的扫描执行：
//! - 选项在 Starting 读取一次并冻结，扫描期间不再访问
//! - 同一时刻至多一个活动扫描；新请求先取消旧扫描，从不排队
//! - 旧扫描未报告终态时有界等待，超时强制复位并告警
//! - 扫描完成后应用结果上限，保留真实总数

use super::{compile_pattern, CancelToken, MatchScanner, Result, SearchError};
use crate::models::{MatchOptions, MatchRecord};
use crate::services::config::EngineConfig;
use crate::services::vault::VaultProvider;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

static SEARCH_ID: AtomicU64 = AtomicU64::new(0);

fn next_search_id() -> u64 {
    SEARCH_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Starting,
    Scanning,
    Completed,
    Cancelled,
    Failed,
}

impl SessionPhase {
    fn as_u8(self) -> u8 {
        match self {
            SessionPhase::Idle => 0,
            SessionPhase::Starting => 1,
            SessionPhase::Scanning => 2,
            SessionPhase::Completed => 3,
            SessionPhase::Cancelled => 4,
            SessionPhase::Failed => 5,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => SessionPhase::Starting,
            2 => SessionPhase::Scanning,
            3 => SessionPhase::Completed,
            4 => SessionPhase::Cancelled,
            5 => SessionPhase::Failed,
            _ => SessionPhase::Idle,
        }
    }
}

/// 一次扫描的最终产出：截断后的可见列表加真实统计
#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub records: Vec<MatchRecord>,
    /// 截断前的真实命中总数（"N of M" 的 M）
    pub total_matches: usize,
    pub documents_scanned: usize,
    pub documents_skipped: usize,
}

/// 未决搜索句柄。被取代的扫描在此解析为 Cancelled
pub struct PendingSearch {
    pub search_id: u64,
    handle: JoinHandle<Result<SearchOutcome>>,
}

impl PendingSearch {
    pub async fn wait(self) -> Result<SearchOutcome> {
        match self.handle.await {
            Ok(result) => result,
            Err(_) => Err(SearchError::Cancelled),
        }
    }
}

struct ActiveScan {
    search_id: u64,
    token: CancelToken,
    done: Arc<AtomicBool>,
}

pub struct SearchSession {
    vault: Arc<dyn VaultProvider>,
    config: EngineConfig,
    phase: Arc<AtomicU8>,
    active: Option<ActiveScan>,
}

impl SearchSession {
    pub fn new(vault: Arc<dyn VaultProvider>, config: EngineConfig) -> Self {
        Self {
            vault,
            config,
            phase: Arc::new(AtomicU8::new(SessionPhase::Idle.as_u8())),
            active: None,
        }
    }

    /// 最近一次扫描的状态
    pub fn phase(&self) -> SessionPhase {
        SessionPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// 启动一次扫描并立即返回句柄。
    /// 已有扫描在途时先取消它，再有界等待其终止
    pub async fn begin_search(
        &mut self,
        query: &str,
        options: &MatchOptions,
    ) -> Result<PendingSearch> {
        self.supersede_active().await;

        let phase = Arc::new(AtomicU8::new(SessionPhase::Starting.as_u8()));
        self.phase = Arc::clone(&phase);
        let search_id = next_search_id();

        // 冻结选项快照：本次会话只在这里读取一次
        let frozen = *options;

        if query.trim().is_empty() {
            phase.store(SessionPhase::Completed.as_u8(), Ordering::Release);
            tracing::debug!(search_id, "empty query, completing without scan");
            let handle = tokio::spawn(async { Ok(SearchOutcome::default()) });
            return Ok(PendingSearch { search_id, handle });
        }

        let matcher = match compile_pattern(query, &frozen) {
            Ok(matcher) => Arc::new(matcher),
            Err(e) => {
                phase.store(SessionPhase::Failed.as_u8(), Ordering::Release);
                return Err(e);
            }
        };

        let token = CancelToken::new();
        let done = Arc::new(AtomicBool::new(false));
        self.active = Some(ActiveScan {
            search_id,
            token: token.clone(),
            done: Arc::clone(&done),
        });

        let scanner = MatchScanner::new(Arc::clone(&self.vault), self.config.scan_batch_size);
        let cap = self.config.max_results;

        phase.store(SessionPhase::Scanning.as_u8(), Ordering::Release);
        tracing::debug!(search_id, query, "scan started");

        let handle = tokio::spawn(async move {
            let result = match scanner.scan(matcher, token).await {
                Ok(output) => {
                    let total_matches = output.records.len();
                    let mut records = output.records;
                    if let Some(cap) = cap {
                        if records.len() > cap {
                            records.truncate(cap);
                        }
                    }
                    phase.store(SessionPhase::Completed.as_u8(), Ordering::Release);
                    tracing::debug!(search_id, total_matches, "scan completed");
                    Ok(SearchOutcome {
                        records,
                        total_matches,
                        documents_scanned: output.documents_scanned,
                        documents_skipped: output.documents_skipped,
                    })
                }
                Err(SearchError::Cancelled) => {
                    phase.store(SessionPhase::Cancelled.as_u8(), Ordering::Release);
                    tracing::debug!(search_id, "scan cancelled");
                    Err(SearchError::Cancelled)
                }
                Err(e) => {
                    phase.store(SessionPhase::Failed.as_u8(), Ordering::Release);
                    tracing::warn!(search_id, error = %e, "scan failed");
                    Err(e)
                }
            };
            done.store(true, Ordering::Release);
            result
        });

        Ok(PendingSearch { search_id, handle })
    }

    /// 便捷入口：启动并原地等待结果
    pub async fn search(&mut self, query: &str, options: &MatchOptions) -> Result<SearchOutcome> {
        self.begin_search(query, options).await?.wait().await
    }

    async fn supersede_active(&mut self) {
        let Some(prev) = self.active.take() else {
            return;
        };
        if prev.done.load(Ordering::Acquire) {
            return;
        }

        prev.token.cancel();
        tracing::debug!(search_id = prev.search_id, "superseding in-flight scan");

        let deadline =
            tokio::time::Instant::now() + Duration::from_millis(self.config.stale_session_wait_ms);
        while !prev.done.load(Ordering::Acquire) {
            if tokio::time::Instant::now() >= deadline {
                // 旧扫描迟迟不终止说明存在逻辑缺陷，不属正常运行
                tracing::warn!(
                    search_id = prev.search_id,
                    "stale scan did not terminate within bound, forcing session reset"
                );
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
