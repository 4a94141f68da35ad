//! In-memory [`FileStore`] for tests.
//!
//! Holds folders and files in a `BTreeMap` behind `std::sync::RwLock` and
//! appends every mutating call to an operation log, so tests can assert on
//! *how* the reconciler touched the vault and not just the end state.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, RwLock};

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::{FileStore, VaultFile};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Folder,
    File(String),
}

/// A mutating call made against a [`MemoryVault`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultOp {
    CreateFolder(String),
    Create(String, String),
    Write(String, String),
    Modify(String, String),
}

pub struct MemoryVault {
    entries: RwLock<BTreeMap<String, Entry>>,
    ops: Mutex<Vec<VaultOp>>,
    failing: RwLock<HashSet<String>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            ops: Mutex::new(Vec::new()),
            failing: RwLock::new(HashSet::new()),
        }
    }

    /// Seed a file (and its parent folders) without logging an operation.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        {
            let mut entries = self.entries.write().unwrap();
            insert_parents(&mut entries, path);
            entries.insert(path.to_string(), Entry::File(content.to_string()));
        }
        self
    }

    /// Seed a folder without logging an operation.
    pub fn with_folder(self, path: &str) -> Self {
        {
            let mut entries = self.entries.write().unwrap();
            insert_parents(&mut entries, path);
            entries.insert(path.to_string(), Entry::Folder);
        }
        self
    }

    /// Make every mutating call on `path` fail.
    pub fn fail_on(self, path: &str) -> Self {
        self.failing.write().unwrap().insert(path.to_string());
        self
    }

    pub fn read(&self, path: &str) -> Option<String> {
        match self.entries.read().unwrap().get(path) {
            Some(Entry::File(content)) => Some(content.clone()),
            _ => None,
        }
    }

    pub fn is_folder(&self, path: &str) -> bool {
        path.is_empty() || matches!(self.entries.read().unwrap().get(path), Some(Entry::Folder))
    }

    pub fn ops(&self) -> Vec<VaultOp> {
        self.ops.lock().unwrap().clone()
    }

    fn log(&self, op: VaultOp) {
        self.ops.lock().unwrap().push(op);
    }

    fn check_failing(&self, path: &str) -> Result<()> {
        if self.failing.read().unwrap().contains(path) {
            bail!("EACCES: permission denied, open '{}'", path);
        }
        Ok(())
    }

    fn parent_exists(&self, path: &str) -> bool {
        match path.rsplit_once('/') {
            Some((parent, _)) => self.is_folder(parent),
            None => true,
        }
    }
}

impl Default for MemoryVault {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_parents(entries: &mut BTreeMap<String, Entry>, path: &str) {
    let mut prefix = String::new();
    let segments: Vec<&str> = path.split('/').collect();
    for segment in &segments[..segments.len().saturating_sub(1)] {
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(segment);
        entries.entry(prefix.clone()).or_insert(Entry::Folder);
    }
}

#[async_trait]
impl FileStore for MemoryVault {
    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(path.is_empty() || self.entries.read().unwrap().contains_key(path))
    }

    async fn create_folder(&self, path: &str) -> Result<()> {
        self.check_failing(path)?;
        {
            let mut entries = self.entries.write().unwrap();
            if let Some(Entry::File(_)) = entries.get(path) {
                bail!("a file already exists at {}", path);
            }
            insert_parents(&mut entries, path);
            entries.insert(path.to_string(), Entry::Folder);
        }
        self.log(VaultOp::CreateFolder(path.to_string()));
        Ok(())
    }

    async fn create(&self, path: &str, content: &str) -> Result<VaultFile> {
        self.check_failing(path)?;
        if !self.parent_exists(path) {
            bail!("parent folder of {} does not exist", path);
        }
        {
            let mut entries = self.entries.write().unwrap();
            if entries.contains_key(path) {
                bail!("File already exists: {}", path);
            }
            entries.insert(path.to_string(), Entry::File(content.to_string()));
        }
        self.log(VaultOp::Create(path.to_string(), content.to_string()));
        Ok(VaultFile {
            path: path.to_string(),
        })
    }

    async fn write(&self, path: &str, content: &str) -> Result<()> {
        self.check_failing(path)?;
        {
            let mut entries = self.entries.write().unwrap();
            if let Some(Entry::Folder) = entries.get(path) {
                bail!("EISDIR: illegal operation on a directory, open '{}'", path);
            }
            entries.insert(path.to_string(), Entry::File(content.to_string()));
        }
        self.log(VaultOp::Write(path.to_string(), content.to_string()));
        Ok(())
    }

    async fn file(&self, path: &str) -> Result<Option<VaultFile>> {
        Ok(match self.entries.read().unwrap().get(path) {
            Some(Entry::File(_)) => Some(VaultFile {
                path: path.to_string(),
            }),
            _ => None,
        })
    }

    async fn modify(&self, file: &VaultFile, content: &str) -> Result<()> {
        self.check_failing(&file.path)?;
        {
            let mut entries = self.entries.write().unwrap();
            match entries.get_mut(&file.path) {
                Some(Entry::File(existing)) => *existing = content.to_string(),
                _ => bail!("File not found: {}", file.path),
            }
        }
        self.log(VaultOp::Modify(file.path.clone(), content.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_requires_parent_folder() {
        let vault = MemoryVault::new();
        assert!(vault.create("Notes/A.md", "x").await.is_err());
        vault.create_folder("Notes").await.unwrap();
        vault.create("Notes/A.md", "x").await.unwrap();
        assert_eq!(vault.read("Notes/A.md").as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn nested_folders_create_parents() {
        let vault = MemoryVault::new();
        vault.create_folder("a/b/c").await.unwrap();
        assert!(vault.is_folder("a"));
        assert!(vault.is_folder("a/b"));
        assert!(vault.exists("a/b/c").await.unwrap());
    }

    #[tokio::test]
    async fn seeded_entries_are_not_logged() {
        let vault = MemoryVault::new().with_file("x/y.md", "seed");
        assert!(vault.is_folder("x"));
        assert!(vault.ops().is_empty());
        let file = vault.file("x/y.md").await.unwrap().unwrap();
        vault.modify(&file, "new").await.unwrap();
        assert_eq!(
            vault.ops(),
            vec![VaultOp::Modify("x/y.md".into(), "new".into())]
        );
    }

    #[tokio::test]
    async fn failing_paths() {
        let vault = MemoryVault::new().fail_on("bad.md");
        assert!(vault.write("bad.md", "x").await.is_err());
        assert!(vault.read("bad.md").is_none());
    }
}
