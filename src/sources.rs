use anyhow::{bail, Result};
use serde::Serialize;
use std::path::Path;

use crate::config::{save_config, Config, FetchSourceConfig};
use crate::models::SourceDescriptor;

/// Health of one configured source, as shown by `ffetch sources`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SourceStatus {
    pub name: String,
    pub id: String,
    pub path: String,
    pub has_credentials: bool,
    pub addressable: bool,
}

impl SourceStatus {
    pub fn healthy(&self) -> bool {
        self.has_credentials && self.addressable
    }
}

pub fn get_sources(config: &Config) -> Vec<SourceStatus> {
    config
        .sources
        .iter()
        .map(|s| SourceStatus {
            name: s.name.clone(),
            id: s.id.clone(),
            path: s.path.clone(),
            has_credentials: s.has_credentials(),
            addressable: SourceDescriptor::from_url(&s.url).is_addressable(),
        })
        .collect()
}

pub fn list_sources(config: &Config) -> Result<()> {
    println!(
        "{:<20} {:<36} {:<24} {:<12} HEALTHY",
        "SOURCE", "ID", "PATH", "CREDENTIALS"
    );
    for status in get_sources(config) {
        let path = if status.path.is_empty() {
            "/"
        } else {
            status.path.as_str()
        };
        let creds = if status.has_credentials {
            "set"
        } else {
            "MISSING"
        };
        println!(
            "{:<20} {:<36} {:<24} {:<12} {}",
            status.name,
            status.id,
            path,
            creds,
            status.healthy()
        );
    }
    Ok(())
}

/// Add a source and persist the config.
pub fn add_source(
    config_path: &Path,
    config: &mut Config,
    source: FetchSourceConfig,
) -> Result<()> {
    if config.sources.iter().any(|s| s.name == source.name) {
        bail!("A source named '{}' already exists", source.name);
    }
    let name = source.name.clone();
    config.sources.push(source);
    save_config(config_path, config)?;
    println!("Added source '{}'.", name);
    Ok(())
}

/// Field changes for [`edit_source`]. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct SourceEdit {
    pub name: Option<String>,
    pub url: Option<String>,
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
    pub path: Option<String>,
    pub will_export: Option<bool>,
}

/// Change fields of a source found by name or id, keeping its id, and
/// persist the config.
pub fn edit_source(
    config_path: &Path,
    config: &mut Config,
    key: &str,
    edit: SourceEdit,
) -> Result<()> {
    let Some(index) = config
        .sources
        .iter()
        .position(|s| s.name == key || s.id == key)
    else {
        bail!("Unknown source: '{}'", key);
    };
    if let Some(name) = &edit.name {
        if config
            .sources
            .iter()
            .enumerate()
            .any(|(i, s)| i != index && &s.name == name)
        {
            bail!("A source named '{}' already exists", name);
        }
    }

    let source = &mut config.sources[index];
    if let Some(name) = edit.name {
        source.name = name;
    }
    if let Some(url) = edit.url {
        source.url = url;
    }
    if let Some(app_id) = edit.app_id {
        source.app_id = app_id;
    }
    if let Some(app_secret) = edit.app_secret {
        source.app_secret = app_secret;
    }
    if let Some(path) = edit.path {
        source.path = path;
    }
    if let Some(will_export) = edit.will_export {
        source.will_export = will_export;
    }
    let name = source.name.clone();

    save_config(config_path, config)?;
    println!("Updated source '{}'.", name);
    Ok(())
}

/// Remove a source by name or id and persist the config.
pub fn remove_source(config_path: &Path, config: &mut Config, key: &str) -> Result<()> {
    let before = config.sources.len();
    config.sources.retain(|s| s.name != key && s.id != key);
    if config.sources.len() == before {
        bail!("Unknown source: '{}'", key);
    }
    save_config(config_path, config)?;
    println!("Removed source '{}'.", key);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;
    use tempfile::TempDir;

    #[test]
    fn status_reflects_credentials_and_url() {
        let mut config = Config::starter("vault".into());
        config.sources.push(FetchSourceConfig::new(
            "Ready",
            "https://acme.feishu.cn/base/b1?table=t1&view=v1",
            "cli",
            "secret",
            "Notes",
        ));

        let statuses = get_sources(&config);
        assert_eq!(statuses.len(), 2);
        assert!(!statuses[0].healthy());
        assert!(!statuses[0].addressable);
        assert!(statuses[1].healthy());
    }

    #[test]
    fn add_and_remove_persist() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ffetch.toml");
        let mut config = Config::starter(tmp.path().to_path_buf());

        let source = FetchSourceConfig::new("Work", "https://x/base/b?table=t", "id", "sec", "W");
        let id = source.id.clone();
        add_source(&path, &mut config, source.clone()).unwrap();
        assert!(add_source(&path, &mut config, source).is_err());

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.source("Work").unwrap().app_secret, "sec");

        remove_source(&path, &mut config, &id).unwrap();
        let loaded = load_config(&path).unwrap();
        assert!(loaded.source("Work").is_none());
        assert!(remove_source(&path, &mut config, "Work").is_err());
    }

    #[test]
    fn edit_keeps_id_and_untouched_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ffetch.toml");
        let mut config = Config::starter(tmp.path().to_path_buf());
        let source = FetchSourceConfig::new("Work", "https://x/base/b?table=t", "id", "sec", "W");
        let id = source.id.clone();
        add_source(&path, &mut config, source).unwrap();

        edit_source(
            &path,
            &mut config,
            "Work",
            SourceEdit {
                name: Some("Job".to_string()),
                app_secret: Some("rotated".to_string()),
                will_export: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

        let loaded = load_config(&path).unwrap();
        let edited = loaded.source(&id).unwrap();
        assert_eq!(edited.name, "Job");
        assert_eq!(edited.app_id, "id");
        assert_eq!(edited.app_secret, "rotated");
        assert_eq!(edited.path, "W");
        assert!(!edited.will_export);
        assert!(!std::fs::read_to_string(&path).unwrap().contains("rotated"));
    }

    #[test]
    fn edit_rejects_unknown_source_and_name_clash() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ffetch.toml");
        let mut config = Config::starter(tmp.path().to_path_buf());
        let source = FetchSourceConfig::new("Work", "https://x/base/b?table=t", "id", "sec", "W");
        add_source(&path, &mut config, source).unwrap();

        assert!(edit_source(&path, &mut config, "Nope", SourceEdit::default()).is_err());
        let err = edit_source(
            &path,
            &mut config,
            "Work",
            SourceEdit {
                name: Some("Untitled".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
