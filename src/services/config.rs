//! 引擎配置
//!
//! 可调参数的统一管理，支持 JSON 持久化。
//! 这些都是安全边际与吞吐旋钮，不是对外契约

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 扫描器单批并发读取的文档数
    pub scan_batch_size: usize,
    /// 可见结果上限；超出部分截断，真实总数仍然保留
    pub max_results: Option<usize>,
    /// 新搜索等待旧扫描终止的上限（毫秒），超时强制复位
    pub stale_session_wait_ms: u64,
    /// 重新验证移除数超过 消费数 × 此倍数 时回退全量重扫
    pub rescan_multiplier: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scan_batch_size: 64,
            max_results: None,
            stale_session_wait_ms: 2000,
            rescan_multiplier: 4,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// 配置文件缺失或损坏时退回默认值
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "failed to load engine config, using defaults");
                }
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, text)
    }
}
