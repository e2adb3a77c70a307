//! 服务层模块
//!
//! 提供引擎的各项服务实现：
//! - search: 搜索服务（模式编译、多文档扫描、会话编排）
//! - replace: 替换服务（替换引擎、模板展开、结果调和）
//! - vault: 文档库抽象（Provider + 本地目录/内存后端）
//! - config: 引擎配置

pub mod config;
pub mod replace;
pub mod search;
pub mod vault;

pub use config::EngineConfig;
pub use replace::{
    remap_selection, NeedsFullRescan, ReplaceReport, ReplacementEngine, ResultReconciler,
};
pub use search::{
    compile_pattern, CancelToken, CompiledMatcher, MatchScanner, PendingSearch, SearchError,
    SearchOutcome, SearchSession, SessionPhase,
};
pub use vault::{LocalVault, MemoryVault, VaultError, VaultProvider};
