use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{error::ErrorKind, Parser};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use crate::catalog::{
    Catalog, CatalogOptions, DEFAULT_REFETCH_PER_SECOND, DEFAULT_REVALIDATE_SECONDS,
};
use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile, MissingConfig};
use crate::export::{self, ExportOptions};
use crate::output::SiteOptions;
use crate::server::{self, AppState};
use crate::sheets::{RecordSource, SheetsClient, SheetsOptions, DEFAULT_API_BASE};

const DEFAULT_BIND: &str = "0.0.0.0:3000";

fn print_banner(no_color: bool) {
    let name = format!("costume-gallery v{}", env!("CARGO_PKG_VERSION"));
    if no_color {
        println!("{name}");
    } else {
        println!("{}", name.bold().green());
    }
    println!();
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

/// Where rows come from once CLI, config file and environment are merged.
#[derive(Clone, Debug, PartialEq, Eq)]
enum SourceConfig {
    Sheets {
        spreadsheet_id: String,
        credentials_json: String,
    },
    RowsFile(String),
}

#[derive(Clone, Debug)]
struct RunConfig {
    verbose: u8,
    no_color: bool,
    bind: SocketAddr,
    source: SourceConfig,
    timeout: usize,
    revalidate: Duration,
    refetch_rate: u32,
    site: SiteOptions,
    export_dir: Option<PathBuf>,
    export_concurrency: usize,
}

fn resolve_source(args: &CliArgs, cfg: &ConfigFile) -> Result<SourceConfig, String> {
    if let Some(rows_file) = args.rows_file.clone().or_else(|| {
        if args.spreadsheet_id.is_some() {
            None
        } else {
            cfg.rows_file.clone()
        }
    }) {
        let path = config::resolve_path(&rows_file);
        return Ok(SourceConfig::RowsFile(path.to_string_lossy().to_string()));
    }

    let spreadsheet_id = args
        .spreadsheet_id
        .clone()
        .or_else(|| cfg.spreadsheet_id.clone())
        .or_else(|| config::env_value(config::SPREADSHEET_ID_ENV))
        .ok_or_else(|| {
            format!(
                "no spreadsheet id (use --spreadsheet-id, spreadsheet_id in config, or {})",
                config::SPREADSHEET_ID_ENV
            )
        })?;

    let credentials_json = match args
        .credentials
        .as_deref()
        .or(cfg.credentials_file.as_deref())
    {
        Some(path) => config::read_credentials_file(path)?,
        None => config::env_value(config::CREDENTIALS_ENV).ok_or_else(|| {
            format!(
                "no credentials (use --credentials, credentials_file in config, or {})",
                config::CREDENTIALS_ENV
            )
        })?,
    };

    Ok(SourceConfig::Sheets {
        spreadsheet_id,
        credentials_json,
    })
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = args.no_color || cfg.no_color.unwrap_or(false);

    let bind_raw = args
        .bind
        .clone()
        .or_else(|| cfg.bind.clone())
        .unwrap_or_else(|| DEFAULT_BIND.to_string());
    let bind = validation::parse_bind(&bind_raw)?;

    let source = resolve_source(&args, &cfg)?;

    let timeout = args.timeout.or(cfg.timeout).unwrap_or(10);
    if timeout == 0 {
        return Err("invalid timeout, expected positive integer".to_string());
    }
    let revalidate = Duration::from_secs(
        args.revalidate
            .or(cfg.revalidate)
            .unwrap_or(DEFAULT_REVALIDATE_SECONDS),
    );
    let refetch_rate = args
        .refetch_rate
        .or(cfg.refetch_rate)
        .unwrap_or(DEFAULT_REFETCH_PER_SECOND);
    if refetch_rate == 0 {
        return Err("invalid refetch_rate, expected positive integer".to_string());
    }

    let defaults = SiteOptions::default();
    let booking_url = args
        .booking_url
        .clone()
        .or_else(|| cfg.booking_url.clone())
        .unwrap_or(defaults.booking_url);
    validation::validate_booking_url(&booking_url)
        .map_err(|e| format!("invalid booking_url: {e}"))?;
    let site = SiteOptions {
        title: args
            .title
            .clone()
            .or_else(|| cfg.site_title.clone())
            .unwrap_or(defaults.title),
        booking_url,
    };

    Ok(RunConfig {
        verbose: args.verbose,
        no_color,
        bind,
        source,
        timeout,
        revalidate,
        refetch_rate,
        site,
        export_dir: args.export.as_deref().map(config::resolve_path),
        export_concurrency: args.export_concurrency,
    })
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "costume_gallery={default_level},tower_http={default_level}"
        ))
    });
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn build_source(run: &RunConfig) -> Result<RecordSource, String> {
    match &run.source {
        SourceConfig::RowsFile(path) => Ok(RecordSource::FilePath(path.clone())),
        SourceConfig::Sheets {
            spreadsheet_id,
            credentials_json,
        } => {
            let client = SheetsClient::new(&SheetsOptions {
                spreadsheet_id: spreadsheet_id.clone(),
                credentials_json: credentials_json.clone(),
                timeout_seconds: run.timeout,
                api_base: DEFAULT_API_BASE.to_string(),
            })
            .map_err(|e| e.to_string())?;
            Ok(RecordSource::Sheets(client))
        }
    }
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }
    print_banner(run.no_color);

    let source = build_source(&run)?;
    format_kv_line("Source", &source.describe());
    format_kv_line("Revalidate", &format!("{}s", run.revalidate.as_secs()));
    format_kv_line("Title", &run.site.title);

    let catalog = Catalog::new(
        source,
        CatalogOptions {
            revalidate: run.revalidate,
            refetch_per_second: run.refetch_rate,
        },
    );

    if let Some(out_dir) = run.export_dir.clone() {
        format_kv_line("Export", &out_dir.display().to_string());
        println!();
        let summary = export::export_site(
            &catalog,
            &run.site,
            &ExportOptions {
                out_dir,
                concurrency: run.export_concurrency,
                show_progress: true,
            },
        )
        .await
        .map_err(|e| e.to_string())?;

        println!();
        println!(
            ":: Completed :: {} pages in {}ms ::",
            summary.pages,
            summary.elapsed.as_millis()
        );
        if !summary.skipped.is_empty() {
            println!(
                "{} skipped ids: {}",
                "::".yellow(),
                summary.skipped.join(", ")
            );
        }
        return Ok(());
    }

    format_kv_line("Bind", &run.bind.to_string());
    println!();

    let state = Arc::new(AppState {
        catalog,
        site: run.site.clone(),
    });
    server::serve(run.bind, state)
        .await
        .map_err(|e| format!("server error: {e}"))
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = e.print();
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    if args.init_config {
        let path = match args.config.as_deref() {
            Some(p) => config::resolve_path(p),
            None => config::default_config_path()
                .ok_or_else(|| "cannot determine home directory".to_string())?,
        };
        let written = config::ensure_default_config_file(&path)?;
        if written {
            println!("wrote {}", path.display());
        } else {
            println!("{} already exists", path.display());
        }
        return Ok(());
    }

    let cfg = match args.config.as_deref() {
        Some(path) => config::load_config(&config::resolve_path(path), MissingConfig::Fail)?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, MissingConfig::UseDefaults)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;
    init_tracing(run.verbose);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}
