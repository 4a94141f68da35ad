//! TOML configuration.
//!
//! ```toml
//! [vault]
//! root = "/home/me/Vault"
//!
//! [api]
//! base_url = "https://open.feishu.cn/open-apis"
//!
//! [sync]
//! batch_size = 10
//! settle_delay_ms = 100
//!
//! [[sources]]
//! name = "Reading notes"
//! url = "https://acme.feishu.cn/base/bascnXXXX?table=tblXXXX&view=vewXXXX"
//! app_id = "Y2xpX2ExYjI="
//! app_secret = "c2VjcmV0"
//! path = "Feishu/Reading"
//! ```
//!
//! Credentials are base64 in the file (see [`crate::credentials`]) and plain
//! in memory.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::credentials;
use crate::models::SourceDescriptor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub vault: VaultConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub sources: Vec<FetchSourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: None,
        }
    }
}

fn default_base_url() -> String {
    "https://open.feishu.cn/open-apis".to_string()
}

impl ApiConfig {
    pub fn auth_url(&self) -> String {
        format!(
            "{}/auth/v3/app_access_token/internal/",
            self.base_url.trim_end_matches('/')
        )
    }

    pub fn search_url(&self, ids: &SourceDescriptor) -> String {
        format!(
            "{}/bitable/v1/apps/{}/tables/{}/records/search",
            self.base_url.trim_end_matches('/'),
            ids.base_id,
            ids.table_id
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_extension")]
    pub default_extension: String,
    #[serde(default = "default_field_names")]
    pub field_names: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            settle_delay_ms: default_settle_delay_ms(),
            default_extension: default_extension(),
            field_names: default_field_names(),
        }
    }
}

impl SyncConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

fn default_batch_size() -> usize {
    10
}
fn default_settle_delay_ms() -> u64 {
    100
}
fn default_extension() -> String {
    "md".to_string()
}
fn default_field_names() -> Vec<String> {
    vec!["Title".to_string(), "MD".to_string(), "SubFolder".to_string()]
}

/// One table view to fetch, and where its notes land in the vault.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchSourceConfig {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_secret: String,
    /// Vault-relative folder the notes are written to.
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_will_export")]
    pub will_export: bool,
}

fn default_will_export() -> bool {
    true
}

impl FetchSourceConfig {
    pub fn new(name: &str, url: &str, app_id: &str, app_secret: &str, path: &str) -> Self {
        Self {
            id: generate_source_id(),
            name: name.to_string(),
            url: url.to_string(),
            app_id: app_id.to_string(),
            app_secret: app_secret.to_string(),
            path: path.to_string(),
            will_export: true,
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.app_id.is_empty() && !self.app_secret.is_empty()
    }

    fn obfuscated(&self) -> Self {
        Self {
            app_id: credentials::obfuscate(&self.app_id),
            app_secret: credentials::obfuscate(&self.app_secret),
            ..self.clone()
        }
    }

    fn revealed(mut self) -> Self {
        self.app_id = credentials::reveal(&self.app_id);
        self.app_secret = credentials::reveal(&self.app_secret);
        self
    }
}

/// `fetch-source-<unix millis>-<0..10000>`
pub fn generate_source_id() -> String {
    format!(
        "fetch-source-{}-{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().as_u128() % 10_000
    )
}

impl Config {
    /// Starter config written by `ffetch init`.
    pub fn starter(vault_root: PathBuf) -> Self {
        Self {
            vault: VaultConfig { root: vault_root },
            api: ApiConfig::default(),
            sync: SyncConfig::default(),
            sources: vec![FetchSourceConfig::new(
                "Untitled",
                "https://feishu.cn/base/...",
                "",
                "",
                "",
            )],
        }
    }

    /// Find a source by name, falling back to id.
    pub fn source(&self, key: &str) -> Option<&FetchSourceConfig> {
        self.sources
            .iter()
            .find(|s| s.name == key)
            .or_else(|| self.sources.iter().find(|s| s.id == key))
    }

    /// Copy of the config as it is stored on disk (credentials obfuscated).
    pub fn to_stored(&self) -> Self {
        Self {
            sources: self.sources.iter().map(|s| s.obfuscated()).collect(),
            ..self.clone()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.sync.batch_size == 0 {
            bail!("sync.batch_size must be > 0");
        }
        if self.sync.default_extension.trim().is_empty() {
            bail!("sync.default_extension must not be empty");
        }
        if self.api.page_size == Some(0) {
            bail!("api.page_size must be > 0 when set");
        }
        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                bail!("every source needs a name");
            }
            if !seen.insert(source.name.as_str()) {
                bail!("duplicate source name: '{}'", source.name);
            }
        }
        Ok(())
    }
}

/// Load and validate the config at `path`.
///
/// Sources without an `id` get one generated, and the file is rewritten so
/// the id stays the same on the next load.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let (config, generated) = parse_with_ids(&content)?;
    if generated > 0 {
        save_config(path, &config)
            .with_context(|| format!("Failed to store generated source ids in {}", path.display()))?;
        tracing::info!(generated, path = %path.display(), "stored generated source ids");
    }
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config> {
    parse_with_ids(content).map(|(config, _)| config)
}

/// Parse, reveal credentials, and fill missing ids. Also returns how many
/// ids were generated.
fn parse_with_ids(content: &str) -> Result<(Config, usize)> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;

    let mut generated = 0;
    config.sources = config
        .sources
        .into_iter()
        .map(|source| {
            let mut source = source.revealed();
            if source.id.is_empty() {
                source.id = generate_source_id();
                generated += 1;
            }
            source
        })
        .collect();

    config.validate()?;
    Ok((config, generated))
}

pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    config.validate()?;
    let content = toml::to_string_pretty(&config.to_stored())?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}
