//! Static rendering of the whole site.
//!
//! Enumerates the snapshot ids and writes `index.html`, `costumes.json` and
//! `costumes/<id>/index.html` so the output can be served by any static host.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::catalog::{Catalog, CatalogError};
use crate::output::pages::{self, ListingMode};
use crate::output::{self, ApiListing, SiteOptions};
use crate::pipeline::Query;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("failed to create directory: {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write page: {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize costumes.json: {source}")]
    Json {
        #[source]
        source: serde_json::Error,
    },

    #[error("export worker failed: {source}")]
    Worker {
        #[source]
        source: tokio::task::JoinError,
    },
}

#[derive(Clone, Debug)]
pub struct ExportSummary {
    pub pages: usize,
    pub skipped: Vec<String>,
    pub elapsed: Duration,
}

#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub out_dir: PathBuf,
    pub concurrency: usize,
    pub show_progress: bool,
}

/// Ids usable verbatim as a directory name.
pub fn is_safe_file_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

async fn write_page(path: PathBuf, contents: Vec<u8>) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ExportError::CreateDir {
                path: parent.display().to_string(),
                source: e,
            })?;
    }
    tokio::fs::write(&path, contents)
        .await
        .map_err(|e| ExportError::Write {
            path: path.display().to_string(),
            source: e,
        })
}

fn progress_bar(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    ) {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

fn detail_path(out_dir: &Path, id: &str) -> PathBuf {
    out_dir.join("costumes").join(id).join("index.html")
}

pub async fn export_site(
    catalog: &Arc<Catalog>,
    site: &SiteOptions,
    options: &ExportOptions,
) -> Result<ExportSummary, ExportError> {
    let started_at = Instant::now();
    let snapshot = catalog.refresh().await?;
    let query = Query::default();

    let mut jobs: Vec<(PathBuf, Vec<u8>)> = vec![
        (
            options.out_dir.join("index.html"),
            pages::render_listing(site, snapshot.costumes(), &query, ListingMode::Static)
                .into_bytes(),
        ),
        (
            options.out_dir.join("costumes.json"),
            output::render_json(&ApiListing::build(snapshot.costumes(), &query))
                .map_err(|e| ExportError::Json { source: e })?,
        ),
    ];

    let mut skipped = Vec::new();
    for id in snapshot.ids() {
        if !is_safe_file_id(id) {
            warn!(%id, "skipping costume id that is not a safe file name");
            skipped.push(id.to_string());
            continue;
        }
        if let Some(costume) = snapshot.find(id) {
            jobs.push((
                detail_path(&options.out_dir, id),
                pages::render_detail(site, costume).into_bytes(),
            ));
        }
    }

    let pb = progress_bar(jobs.len() as u64, options.show_progress);
    pb.set_message("writing pages");
    let total = jobs.len();

    let worker_count = options.concurrency.max(1).min(total.max(1));
    let mut batches: Vec<Vec<(PathBuf, Vec<u8>)>> = (0..worker_count).map(|_| Vec::new()).collect();
    for (idx, job) in jobs.into_iter().enumerate() {
        batches[idx % worker_count].push(job);
    }

    let mut workers = FuturesUnordered::new();
    for batch in batches {
        let wpb = pb.clone();
        workers.push(tokio::spawn(async move {
            for (path, contents) in batch {
                write_page(path, contents).await?;
                wpb.inc(1);
            }
            Ok::<(), ExportError>(())
        }));
    }
    while let Some(joined) = workers.next().await {
        joined.map_err(|e| ExportError::Worker { source: e })??;
    }
    pb.finish_with_message("done");

    let summary = ExportSummary {
        pages: total,
        skipped,
        elapsed: started_at.elapsed(),
    };
    info!(
        pages = summary.pages,
        skipped = summary.skipped.len(),
        out_dir = %options.out_dir.display(),
        "static export complete"
    );
    Ok(summary)
}
