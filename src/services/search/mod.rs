//! 搜索服务模块
//!
//! - compile_pattern/CompiledMatcher: 模式编译（字面转义、整词包裹、一次性校验）
//! - MatchScanner: 批次化、可取消的多文档扫描
//! - SearchSession: 单活动扫描的会话编排（冻结选项、结果上限）

mod pattern;
mod scanner;
mod session;

use crate::services::vault::VaultError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use pattern::{compile_pattern, CompiledMatcher};
pub(crate) use scanner::line_starts;
pub use scanner::{scan_document, MatchScanner, ScanOutput};
pub use session::{PendingSearch, SearchOutcome, SearchSession, SessionPhase};

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug)]
pub enum SearchError {
    /// 模式非法；在任何扫描开始前一次性检出，从不逐行上报
    InvalidPattern(regex::Error),
    /// 扫描被更新的请求取代；不是失败，部分结果一律丢弃
    Cancelled,
    /// 文档库无法枚举（单文档读失败只会被跳过，不走这里）
    Vault(VaultError),
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchError::InvalidPattern(e) => write!(f, "Invalid pattern: {}", e),
            SearchError::Cancelled => write!(f, "Search cancelled"),
            SearchError::Vault(e) => write!(f, "Vault error: {}", e),
        }
    }
}

impl std::error::Error for SearchError {}

impl From<regex::Error> for SearchError {
    fn from(e: regex::Error) -> Self {
        SearchError::InvalidPattern(e)
    }
}

impl From<VaultError> for SearchError {
    fn from(e: VaultError) -> Self {
        SearchError::Vault(e)
    }
}

/// 取消令牌：共享布尔标志，仅在批次边界等既定检查点读取，
/// 从不打断行内处理
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
