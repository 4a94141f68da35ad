//! Export fetch source settings as JSON.
//!
//! Only sources marked `will_export` are included. Credentials are written
//! in their at-rest (obfuscated) form, exactly as the config file holds them.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use crate::config::Config;

#[derive(Serialize)]
struct ExportData {
    sources: Vec<ExportSource>,
}

#[derive(Serialize)]
struct ExportSource {
    id: String,
    name: String,
    url: String,
    app_id: String,
    app_secret: String,
    path: String,
}

fn export_json(config: &Config) -> Result<(String, usize)> {
    let stored = config.to_stored();
    let sources: Vec<ExportSource> = stored
        .sources
        .into_iter()
        .filter(|s| s.will_export)
        .map(|s| ExportSource {
            id: s.id,
            name: s.name,
            url: s.url,
            app_id: s.app_id,
            app_secret: s.app_secret,
            path: s.path,
        })
        .collect();
    let count = sources.len();
    let json = serde_json::to_string_pretty(&ExportData { sources })?;
    Ok((json, count))
}

/// Export sources as JSON.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub fn run_export(config: &Config, output: Option<&Path>) -> Result<()> {
    let (json, count) = export_json(config)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &json)?;
            eprintln!("Exported {} sources to {}", count, path.display());
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}
