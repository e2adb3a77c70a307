//! 文档库模块
//!
//! 提供文档库抽象，支持多种后端（本地目录、内存）

pub mod local;
pub mod memory;
pub mod provider;

pub use local::LocalVault;
pub use memory::MemoryVault;
pub use provider::{Result, VaultError, VaultProvider};
