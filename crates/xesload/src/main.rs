mod output;
mod telemetry;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::warn;
use xesload_core::config::Config;
use xesload_store::Store;

use crate::output::{print_import_human, print_reset_human, print_status_human};
use crate::telemetry::init_cli_tracing;

#[derive(Parser, Debug)]
#[command(name = "xesload")]
#[command(about = "Stream XES event logs into a relational store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Import one .xes or .xes.gz file")]
    Import {
        file: PathBuf,
        #[arg(long)]
        db_path: Option<PathBuf>,
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        flush_every: Option<u64>,
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        progress_every: Option<u64>,
        #[arg(long, help = "Append to existing contents instead of recreating the schema")]
        keep_existing: bool,
        #[arg(long, help = "Parse and load on separate threads")]
        pipelined: bool,
    },
    #[command(about = "Show row counts and trace statistics")]
    Status {
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    #[command(about = "Drop and recreate every table")]
    Reset {
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
}

#[derive(Debug, Default)]
struct CliOverrides {
    db_path: Option<PathBuf>,
    flush_every: Option<u64>,
    progress_every: Option<u64>,
    keep_existing: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_cli_tracing(cli.json);

    match cli.command {
        Commands::Import {
            file,
            db_path,
            flush_every,
            progress_every,
            keep_existing,
            pipelined,
        } => {
            let cfg = load_config(CliOverrides {
                db_path,
                flush_every,
                progress_every,
                keep_existing,
            })?;
            run_import(file, cfg, pipelined, cli.json).await
        }
        Commands::Status { db_path } => {
            let cfg = load_config(CliOverrides {
                db_path,
                ..CliOverrides::default()
            })?;
            let store = open_store(&cfg)?;
            let stats = store.stats().context("collect statistics")?;
            if cli.json {
                print_json(&stats)?;
            } else {
                print_status_human(&stats);
            }
            Ok(())
        }
        Commands::Reset { db_path } => {
            let cfg = load_config(CliOverrides {
                db_path,
                ..CliOverrides::default()
            })?;
            let store = open_store(&cfg)?;
            store.reset().context("reset schema")?;
            if cli.json {
                print_json(&serde_json::json!({ "reset": true, "db_path": store.db_path() }))?;
            } else {
                print_reset_human(store.db_path());
            }
            Ok(())
        }
    }
}

async fn run_import(file: PathBuf, cfg: Config, pipelined: bool, json: bool) -> anyhow::Result<()> {
    if !has_xes_extension(&file) {
        warn!(path = %file.display(), "file does not end in .xes or .xes.gz, importing anyway");
    }

    let store = open_store(&cfg)?;
    let summary = if pipelined {
        xesload_ingest::pipeline::import_file(&file, &store, &cfg)
            .await
            .with_context(|| format!("import {}", file.display()))?
    } else {
        let task_store = store.clone();
        let task_cfg = cfg.clone();
        let task_file = file.clone();
        tokio::task::spawn_blocking(move || {
            xesload_ingest::import_file(&task_file, &task_store, &task_cfg)
        })
        .await
        .context("import task panicked")?
        .with_context(|| format!("import {}", file.display()))?
    };

    if json {
        print_json(&summary)?;
    } else {
        print_import_human(&summary, store.db_path());
    }
    Ok(())
}

fn load_config(overrides: CliOverrides) -> anyhow::Result<Config> {
    let mut cfg = Config::load().context("load config")?;
    apply_cli_overrides(&mut cfg, overrides);
    Ok(cfg)
}

fn apply_cli_overrides(cfg: &mut Config, overrides: CliOverrides) {
    if let Some(v) = overrides.db_path {
        cfg.db_path = v;
    }
    if let Some(v) = overrides.flush_every {
        cfg.flush_every = v;
    }
    if let Some(v) = overrides.progress_every {
        cfg.progress_every = v;
    }
    if overrides.keep_existing {
        cfg.reset_before_import = false;
    }
}

fn open_store(cfg: &Config) -> anyhow::Result<Store> {
    Store::open(&cfg.db_path).with_context(|| format!("open store {}", cfg.db_path.display()))
}

fn has_xes_extension(path: &Path) -> bool {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    name.ends_with(".xes") || name.ends_with(".xes.gz")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_xes_file_names() {
        assert!(has_xes_extension(Path::new("logs/orders.xes")));
        assert!(has_xes_extension(Path::new("ORDERS.XES.GZ")));
        assert!(!has_xes_extension(Path::new("orders.xml")));
        assert!(!has_xes_extension(Path::new("xes")));
    }

    #[test]
    fn cli_flags_override_config() {
        let mut cfg = Config::default();
        apply_cli_overrides(
            &mut cfg,
            CliOverrides {
                db_path: Some(PathBuf::from("/tmp/x.duckdb")),
                flush_every: Some(7),
                progress_every: None,
                keep_existing: true,
            },
        );
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/x.duckdb"));
        assert_eq!(cfg.flush_every, 7);
        assert_eq!(cfg.progress_every, 1000);
        assert!(!cfg.reset_before_import);
    }

    #[test]
    fn zero_flush_interval_is_rejected_by_parser() {
        assert!(Cli::try_parse_from(["xesload", "import", "a.xes", "--flush-every", "0"]).is_err());
        let cli = Cli::try_parse_from(["xesload", "--json", "import", "a.xes", "--pipelined"])
            .unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Import {
                pipelined: true,
                keep_existing: false,
                ..
            }
        ));
    }
}
