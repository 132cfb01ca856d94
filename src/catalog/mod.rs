//! Catalog snapshots and the revalidation window.
//!
//! A [`Snapshot`] is one full fetch of the inventory. [`Catalog`] keeps the
//! latest snapshot, serves it while it is fresh, serves it stale while a
//! background refresh runs, and falls back to a blocking fetch when a
//! detail page asks for an id the current snapshot does not know.

use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use itertools::Itertools;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::model::Costume;
use crate::sheets::{RecordSource, SheetsError};

pub const DEFAULT_REVALIDATE_SECONDS: u64 = 60;
pub const DEFAULT_REFETCH_PER_SECOND: u32 = 1;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to fetch catalog snapshot: {source}")]
    Fetch {
        #[from]
        source: SheetsError,
    },
}

#[derive(Clone, Debug)]
pub struct Snapshot {
    costumes: Vec<Costume>,
    fetched_at: DateTime<Utc>,
    fetched_instant: Instant,
}

impl Snapshot {
    pub fn new(costumes: Vec<Costume>) -> Self {
        Self {
            costumes,
            fetched_at: Utc::now(),
            fetched_instant: Instant::now(),
        }
    }

    pub fn costumes(&self) -> &[Costume] {
        &self.costumes
    }

    pub fn len(&self) -> usize {
        self.costumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costumes.is_empty()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn age(&self) -> Duration {
        self.fetched_instant.elapsed()
    }

    /// Detail page ids in snapshot order, each once.
    pub fn ids(&self) -> Vec<&str> {
        self.costumes.iter().map(|c| c.id.as_str()).unique().collect()
    }

    /// First costume carrying `id`; later duplicates are shadowed.
    pub fn find(&self, id: &str) -> Option<&Costume> {
        self.costumes.iter().find(|c| c.id == id)
    }

    pub fn duplicate_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.costumes
            .iter()
            .map(|c| c.id.as_str())
            .filter(|id| !seen.insert(*id))
            .unique()
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    Found(Costume),
    NotFound,
}

#[derive(Clone, Copy, Debug)]
pub struct CatalogOptions {
    pub revalidate: Duration,
    pub refetch_per_second: u32,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            revalidate: Duration::from_secs(DEFAULT_REVALIDATE_SECONDS),
            refetch_per_second: DEFAULT_REFETCH_PER_SECOND,
        }
    }
}

pub struct Catalog {
    source: RecordSource,
    options: CatalogOptions,
    current: RwLock<Option<Arc<Snapshot>>>,
    refreshing: AtomicBool,
    refetch_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl Catalog {
    pub fn new(source: RecordSource, options: CatalogOptions) -> Arc<Self> {
        let per_second = NonZeroU32::new(options.refetch_per_second).unwrap_or(NonZeroU32::MIN);
        Arc::new(Self {
            source,
            options,
            current: RwLock::new(None),
            refreshing: AtomicBool::new(false),
            refetch_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    pub fn source(&self) -> &RecordSource {
        &self.source
    }

    pub fn options(&self) -> &CatalogOptions {
        &self.options
    }

    pub async fn cached(&self) -> Option<Arc<Snapshot>> {
        self.current.read().await.clone()
    }

    /// Fetches a fresh snapshot and makes it current.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, CatalogError> {
        let costumes = self.source.fetch_costumes().await?;
        let snapshot = Arc::new(Snapshot::new(costumes));

        let duplicates = snapshot.duplicate_ids();
        if !duplicates.is_empty() {
            warn!(
                ids = %duplicates.join(","),
                "duplicate costume ids; detail pages resolve to the first row"
            );
        }
        info!(
            source = %self.source.describe(),
            costumes = snapshot.len(),
            "catalog snapshot fetched"
        );

        *self.current.write().await = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Current snapshot. Fetches synchronously when there is none yet; past
    /// the revalidate window the stale snapshot is returned and a single
    /// background refresh is started.
    pub async fn snapshot(self: &Arc<Self>) -> Result<Arc<Snapshot>, CatalogError> {
        let Some(snapshot) = self.cached().await else {
            return self.refresh().await;
        };
        if snapshot.age() >= self.options.revalidate {
            self.spawn_refresh();
        }
        Ok(snapshot)
    }

    fn spawn_refresh(self: &Arc<Self>) {
        if self.refreshing.swap(true, Ordering::AcqRel) {
            return;
        }
        let catalog = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = RefreshGuard(&catalog.refreshing);
            debug!("revalidating catalog snapshot");
            if let Err(e) = catalog.refresh().await {
                warn!(error = %e, "background refresh failed; keeping stale snapshot");
            }
        });
    }

    /// Resolves one costume. An id missing from the current snapshot
    /// triggers one blocking refetch; when the refetch budget is spent the
    /// lookup waits for it instead of answering from the old snapshot.
    pub async fn lookup(self: &Arc<Self>, id: &str) -> Result<Lookup, CatalogError> {
        let snapshot = self.snapshot().await?;
        if let Some(costume) = snapshot.find(id) {
            return Ok(Lookup::Found(costume.clone()));
        }

        if self.refetch_limiter.check().is_err() {
            debug!(%id, "unknown id, waiting for refetch budget");
            self.refetch_limiter.until_ready().await;
        }

        debug!(%id, "unknown id, fetching fresh snapshot");
        let fresh = self.refresh().await?;
        Ok(fresh
            .find(id)
            .cloned()
            .map_or(Lookup::NotFound, Lookup::Found))
    }

    pub async fn ids(self: &Arc<Self>) -> Result<Vec<String>, CatalogError> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.ids().into_iter().map(str::to_string).collect())
    }
}

/// Clears the in-flight refresh flag when the refresh task ends, including
/// by panic.
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
