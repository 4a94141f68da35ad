//! # Feishu Fetcher CLI (`ffetch`)
//!
//! ## Usage
//!
//! ```bash
//! ffetch --config ./config/ffetch.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ffetch init` | Write a starter config file |
//! | `ffetch sources` | List configured sources and their health |
//! | `ffetch source add/edit/remove` | Edit the source list |
//! | `ffetch filters` | List the recency filters |
//! | `ffetch fetch <source>` | Fetch a source (or `all`) into the vault |
//! | `ffetch export` | Export shareable source settings as JSON |
//! | `ffetch completions <shell>` | Print shell completions |

use anyhow::{bail, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use feishu_fetcher::config::{self, Config, FetchSourceConfig};
use feishu_fetcher::models::{RecencyFilter, RECENCY_FILTERS};
use feishu_fetcher::notice::NoticeMode;
use feishu_fetcher::{export, sources, sync};

/// Feishu Fetcher: pull Bitable rows into a local folder of notes.
#[derive(Parser)]
#[command(
    name = "ffetch",
    about = "Pull rows of a Feishu/Lark Bitable view into a local folder of notes",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ffetch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration file.
    ///
    /// Does nothing if the file already exists.
    Init {
        /// Vault root to put in the starter config.
        #[arg(long, default_value = ".")]
        vault: PathBuf,
    },

    /// List configured sources and whether they are ready to fetch.
    Sources,

    /// Add or remove a source.
    Source {
        #[command(subcommand)]
        action: SourceAction,
    },

    /// List the recency filters accepted by `fetch --filter`.
    Filters,

    /// Fetch rows from a source and create or update notes.
    ///
    /// Without `--filter` the filter is asked for interactively.
    Fetch {
        /// Source name or id, or `all`.
        source: String,

        /// Recency filter id: day, threeDays, week, twoWeeks, month, all.
        #[arg(long)]
        filter: Option<String>,

        /// Notice output on stderr: human, json, or off.
        /// Defaults to human when stderr is a terminal.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Export sources marked for export as JSON.
    Export {
        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print shell completions.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum SourceAction {
    /// Add a source.
    Add {
        #[arg(long)]
        name: String,
        /// Share URL of the table view.
        #[arg(long)]
        url: String,
        #[arg(long)]
        app_id: String,
        #[arg(long)]
        app_secret: String,
        /// Vault-relative folder for the notes.
        #[arg(long, default_value = "")]
        path: String,
        /// Leave this source out of `ffetch export`.
        #[arg(long)]
        no_export: bool,
    },
    /// Change fields of a source by name or id. Its id is kept.
    Edit {
        source: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        app_id: Option<String>,
        #[arg(long)]
        app_secret: Option<String>,
        #[arg(long)]
        path: Option<String>,
        /// Include this source in `ffetch export`.
        #[arg(long, conflicts_with = "no_export")]
        export: bool,
        /// Leave this source out of `ffetch export`.
        #[arg(long)]
        no_export: bool,
    },
    /// Remove a source by name or id.
    Remove { source: String },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // Commands that don't require config
    match &cli.command {
        Commands::Init { vault } => {
            if cli.config.exists() {
                println!("Config already exists: {}", cli.config.display());
            } else {
                config::save_config(&cli.config, &Config::starter(vault.clone()))?;
                println!("Wrote {}", cli.config.display());
            }
            return Ok(());
        }
        Commands::Filters => {
            for (i, f) in RECENCY_FILTERS.iter().enumerate() {
                println!("{}. {:<10} {:<5} {}", i + 1, f.id, f.threshold_days, f.label);
            }
            return Ok(());
        }
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "ffetch", &mut std::io::stdout());
            return Ok(());
        }
        _ => {}
    }

    let mut cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Source { action } => match action {
            SourceAction::Add {
                name,
                url,
                app_id,
                app_secret,
                path,
                no_export,
            } => {
                let mut source = FetchSourceConfig::new(&name, &url, &app_id, &app_secret, &path);
                source.will_export = !no_export;
                sources::add_source(&cli.config, &mut cfg, source)?;
            }
            SourceAction::Edit {
                source,
                name,
                url,
                app_id,
                app_secret,
                path,
                export,
                no_export,
            } => {
                let will_export = match (export, no_export) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                };
                let edit = sources::SourceEdit {
                    name,
                    url,
                    app_id,
                    app_secret,
                    path,
                    will_export,
                };
                sources::edit_source(&cli.config, &mut cfg, &source, edit)?;
            }
            SourceAction::Remove { source } => {
                sources::remove_source(&cli.config, &mut cfg, &source)?;
            }
        },
        Commands::Fetch {
            source,
            filter,
            progress,
        } => {
            let filter = match filter {
                Some(id) => match RecencyFilter::by_id(&id) {
                    Some(f) => Some(f),
                    None => bail!(
                        "Unknown filter: '{}'. Run `ffetch filters` for the list.",
                        id
                    ),
                },
                None => None,
            };
            let mode = match progress {
                Some(p) => match NoticeMode::parse(&p) {
                    Some(m) => m,
                    None => bail!("Unknown progress mode: '{}'. Use human, json, or off.", p),
                },
                None => NoticeMode::default_for_tty(),
            };
            sync::run_fetch(&cfg, &source, filter, mode).await?;
        }
        Commands::Export { output } => {
            export::run_export(&cfg, output.as_deref())?;
        }
        Commands::Init { .. } | Commands::Filters | Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
