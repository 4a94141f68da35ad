//! File store abstraction.
//!
//! The [`FileStore`] trait is the capability set the reconciler needs from
//! the note vault. Paths are vault-relative and `/`-separated; run them
//! through [`normalize_path`] before use.
//!
//! - [`LocalVault`] writes to a directory on disk.
//! - `memory::MemoryVault` keeps everything in memory and records every
//!   operation. It is only compiled for tests.

#[cfg(test)]
pub(crate) mod memory;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Handle to an existing file in the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultFile {
    pub path: String,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// True if a file or folder exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Create a folder and any missing parents.
    async fn create_folder(&self, path: &str) -> Result<()>;

    /// Create a new file. Fails if something already exists at `path`.
    async fn create(&self, path: &str, content: &str) -> Result<VaultFile>;

    /// Write `content` at `path` directly, replacing whatever file is there.
    async fn write(&self, path: &str, content: &str) -> Result<()>;

    /// Look up a file handle. Folders and missing paths yield `None`.
    async fn file(&self, path: &str) -> Result<Option<VaultFile>>;

    /// Replace the content of an existing file.
    async fn modify(&self, file: &VaultFile, content: &str) -> Result<()>;
}

/// Collapse a path to the vault's canonical form: `/`-separated, no empty
/// segments, no leading or trailing slash. The vault root is `""`.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Join two vault paths.
pub fn join_path(parent: &str, child: &str) -> String {
    normalize_path(&format!("{}/{}", parent, child))
}

/// [`FileStore`] over a directory on disk.
pub struct LocalVault {
    root: PathBuf,
}

impl LocalVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open a vault whose root directory must already exist.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            bail!("Vault root does not exist: {}", root.display());
        }
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => bail!("path escapes the vault: {}", path),
            }
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStore for LocalVault {
    async fn exists(&self, path: &str) -> Result<bool> {
        let full = self.resolve(path)?;
        Ok(tokio::fs::try_exists(&full).await?)
    }

    async fn create_folder(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        tokio::fs::create_dir_all(&full)
            .await
            .with_context(|| format!("could not create folder {}", path))
    }

    async fn create(&self, path: &str, content: &str) -> Result<VaultFile> {
        let full = self.resolve(path)?;
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .await
            .with_context(|| format!("could not create {}", path))?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(VaultFile {
            path: path.to_string(),
        })
    }

    async fn write(&self, path: &str, content: &str) -> Result<()> {
        let full = self.resolve(path)?;
        tokio::fs::write(&full, content)
            .await
            .with_context(|| format!("could not write {}", path))
    }

    async fn file(&self, path: &str) -> Result<Option<VaultFile>> {
        let full = self.resolve(path)?;
        match tokio::fs::metadata(&full).await {
            Ok(meta) if meta.is_file() => Ok(Some(VaultFile {
                path: path.to_string(),
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn modify(&self, file: &VaultFile, content: &str) -> Result<()> {
        let full = self.resolve(&file.path)?;
        if !tokio::fs::metadata(&full).await?.is_file() {
            bail!("{} is not a file", file.path);
        }
        let mut handle = tokio::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&full)
            .await
            .with_context(|| format!("could not open {}", file.path))?;
        handle.write_all(content.as_bytes()).await?;
        handle.sync_all().await?;
        Ok(())
    }
}
