//! 内存文档库
//!
//! 供测试与宿主内嵌场景使用；枚举顺序即键序，天然确定

use super::provider::{Result, VaultError, VaultProvider};
use crate::models::DocumentId;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryVault {
    docs: Mutex<BTreeMap<DocumentId, String>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: impl Into<DocumentId>, text: impl Into<String>) {
        let mut docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        docs.insert(id.into(), text.into());
    }

    pub fn get(&self, id: &DocumentId) -> Option<String> {
        let docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        docs.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        let docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VaultProvider for MemoryVault {
    fn scheme(&self) -> &'static str {
        "memory"
    }

    fn enumerate(&self) -> Result<Vec<DocumentId>> {
        let docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(docs.keys().cloned().collect())
    }

    fn read(&self, id: &DocumentId) -> Result<String> {
        self.get(id).ok_or_else(|| VaultError::Unavailable(id.clone()))
    }

    fn write(&self, id: &DocumentId, text: &str) -> Result<()> {
        self.insert(id.clone(), text);
        Ok(())
    }
}
