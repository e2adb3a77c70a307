//! 本地目录文档库
//!
//! 基于 ignore crate 遍历目录：
//! - 遵守 .gitignore 规则
//! - 跳过隐藏文件
//! - 二进制与非 UTF-8 文件在读取时报 NotText

use super::provider::{Result, VaultError, VaultProvider};
use crate::models::DocumentId;
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};

pub struct LocalVault {
    root: PathBuf,
}

impl LocalVault {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(VaultError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("vault root is not a directory: {}", root.display()),
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, id: &DocumentId) -> PathBuf {
        self.root.join(id.as_str())
    }
}

/// 检查内容是否可能是二进制：前 8KB 含 NUL 字节
fn is_likely_binary(content: &[u8]) -> bool {
    content.iter().take(8192).any(|&b| b == 0)
}

impl VaultProvider for LocalVault {
    fn scheme(&self) -> &'static str {
        "file"
    }

    fn enumerate(&self) -> Result<Vec<DocumentId>> {
        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .build();

        let mut ids = Vec::new();
        for entry in walker.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let rel = path.strip_prefix(&self.root).unwrap_or(path);
            ids.push(DocumentId::new(rel.to_string_lossy()));
        }

        ids.sort();
        Ok(ids)
    }

    fn read(&self, id: &DocumentId) -> Result<String> {
        let path = self.resolve(id);
        let bytes = fs::read(&path).map_err(|_| VaultError::Unavailable(id.clone()))?;
        if is_likely_binary(&bytes) {
            return Err(VaultError::NotText(id.clone()));
        }
        String::from_utf8(bytes).map_err(|_| VaultError::NotText(id.clone()))
    }

    fn write(&self, id: &DocumentId, text: &str) -> Result<()> {
        let path = self.resolve(id);
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|_| VaultError::Unwritable(id.clone()))?;
            }
        }
        fs::write(&path, text).map_err(|_| VaultError::Unwritable(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn enumerate_lists_files_sorted() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.md"), "beta").unwrap();
        fs::write(dir.path().join("a.md"), "alpha").unwrap();

        let vault = LocalVault::open(dir.path()).unwrap();
        let ids = vault.enumerate().unwrap();
        let names: Vec<_> = ids.iter().map(|id| id.as_str().to_string()).collect();
        assert_eq!(names, vec!["a.md".to_string(), "b.md".to_string()]);
    }

    #[test]
    fn read_write_roundtrip() {
        let dir = tempdir().unwrap();
        let vault = LocalVault::open(dir.path()).unwrap();
        let id = DocumentId::new("notes/today.md");

        vault.write(&id, "hello vault\n").unwrap();
        assert_eq!(vault.read(&id).unwrap(), "hello vault\n");
    }

    #[test]
    fn read_missing_is_unavailable() {
        let dir = tempdir().unwrap();
        let vault = LocalVault::open(dir.path()).unwrap();

        let err = vault.read(&DocumentId::new("gone.md")).unwrap_err();
        assert!(matches!(err, VaultError::Unavailable(_)));
    }

    #[test]
    fn read_binary_is_not_text() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("blob.bin"), b"hello\x00world").unwrap();

        let vault = LocalVault::open(dir.path()).unwrap();
        let err = vault.read(&DocumentId::new("blob.bin")).unwrap_err();
        assert!(matches!(err, VaultError::NotText(_)));
    }

    #[test]
    fn open_rejects_missing_root() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(LocalVault::open(missing).is_err());
    }
}
