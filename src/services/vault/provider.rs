//! 文档库 Provider trait
//!
//! 抽象文档枚举与读写，支持本地目录、内存等多种后端。
//! 单文档的读写失败由调用方隔离处理，从不中断整库操作

use crate::models::DocumentId;
use std::io;

pub type Result<T> = std::result::Result<T, VaultError>;

#[derive(Debug)]
pub enum VaultError {
    Io(io::Error),
    /// 文档缺失或不可读
    Unavailable(DocumentId),
    /// 文档不是文本（二进制或非 UTF-8），扫描时静默跳过
    NotText(DocumentId),
    Unwritable(DocumentId),
}

impl std::fmt::Display for VaultError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VaultError::Io(e) => write!(f, "IO error: {}", e),
            VaultError::Unavailable(id) => write!(f, "Document unavailable: {}", id),
            VaultError::NotText(id) => write!(f, "Not a text document: {}", id),
            VaultError::Unwritable(id) => write!(f, "Document write failed: {}", id),
        }
    }
}

impl std::error::Error for VaultError {}

impl From<io::Error> for VaultError {
    fn from(e: io::Error) -> Self {
        VaultError::Io(e)
    }
}

pub trait VaultProvider: Send + Sync {
    fn scheme(&self) -> &'static str;

    /// 列出库中全部候选文档
    fn enumerate(&self) -> Result<Vec<DocumentId>>;

    /// 读取文档全文
    fn read(&self, id: &DocumentId) -> Result<String>;

    /// 整体写回文档
    fn write(&self, id: &DocumentId, text: &str) -> Result<()>;
}
