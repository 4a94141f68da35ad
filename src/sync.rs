//! Fetch pipeline orchestration.
//!
//! Coordinates one run: filter selection → record search (token +
//! pagination + normalization) → reconciliation into the vault. Sources are
//! processed one after another; fetching a source finishes before any of
//! its notes are written.

use anyhow::{bail, Result};

use crate::config::{Config, FetchSourceConfig};
use crate::fetch::{fetch_all, search_request, Credentials};
use crate::models::{RecencyFilter, SourceDescriptor};
use crate::notice::{Notice, NoticeMode, NoticeSink};
use crate::reconcile::{reconcile, ReconcileOptions, SyncReport};
use crate::select::{FilterSelector, PresetSelector, PromptSelector};
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::vault::{FileStore, LocalVault};

/// Fetch one source and reconcile its records into `store`.
pub async fn fetch_source(
    config: &Config,
    source: &FetchSourceConfig,
    filter: &RecencyFilter,
    transport: &dyn HttpTransport,
    store: &dyn FileStore,
    notices: &dyn NoticeSink,
) -> Result<SyncReport> {
    let ids = SourceDescriptor::from_url(&source.url);
    if !ids.is_addressable() {
        tracing::warn!(source = %source.name, "source url has no base or table id");
    }

    let url = config.api.search_url(&ids);
    let request = serde_json::to_value(search_request(&ids, filter, &config.sync.field_names))?;
    tracing::info!(source = %source.name, filter = filter.id, "fetching");

    let records = fetch_all(
        transport,
        &config.api,
        Credentials {
            app_id: &source.app_id,
            app_secret: &source.app_secret,
        },
        &url,
        &request,
        notices,
    )
    .await;

    let report = reconcile(
        store,
        &records,
        &source.path,
        &ReconcileOptions::from_config(&config.sync),
        notices,
    )
    .await;

    notices.notify(Notice::SourceFetched {
        source: source.name.clone(),
    });
    Ok(report)
}

/// Resolve `target` (`all`, a source name, or a source id) to sources.
pub fn resolve_sources<'a>(config: &'a Config, target: &str) -> Result<Vec<&'a FetchSourceConfig>> {
    if target == "all" {
        if config.sources.is_empty() {
            bail!("No sources configured. Add one with `ffetch source add`.");
        }
        return Ok(config.sources.iter().collect());
    }
    match config.source(target) {
        Some(source) => Ok(vec![source]),
        None => {
            let names: Vec<&str> = config.sources.iter().map(|s| s.name.as_str()).collect();
            bail!(
                "Unknown source: '{}'. Available: all, {}",
                target,
                names.join(", ")
            )
        }
    }
}

/// Entry point for `ffetch fetch`.
///
/// Without a `filter` the user is prompted on the terminal.
pub async fn run_fetch(
    config: &Config,
    target: &str,
    filter: Option<RecencyFilter>,
    mode: NoticeMode,
) -> Result<()> {
    let sources = resolve_sources(config, target)?;
    let store = LocalVault::open(&config.vault.root)?;

    let chosen = match filter {
        Some(f) => PresetSelector(f).select()?,
        None => tokio::task::spawn_blocking(|| PromptSelector::stdio().select()).await??,
    };
    let Some(filter) = chosen else {
        println!("Cancelled.");
        return Ok(());
    };

    let transport = ReqwestTransport::new();
    let notices = mode.sink();
    let mut total = SyncReport::default();

    for source in &sources {
        let report = fetch_source(
            config,
            source,
            &filter,
            &transport,
            &store,
            notices.as_ref(),
        )
        .await?;
        print_report(&source.name, &report);
        total.merge(&report);
    }

    if sources.len() > 1 {
        print_report("all", &total);
    }
    println!("ok");
    Ok(())
}

fn print_report(name: &str, report: &SyncReport) {
    println!("fetch {}", name);
    println!("  records: {}", report.total() + report.failed);
    println!("  created: {}", report.created);
    println!("  modified: {}", report.modified);
    println!("  overwritten (config dir): {}", report.overwritten);
    println!("  skipped: {}", report.skipped);
    println!("  failed: {}", report.failed);
}
