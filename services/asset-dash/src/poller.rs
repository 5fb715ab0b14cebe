// services/asset-dash/src/poller.rs
//
// Background refresh of every tile and the unit list

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use svckit::config::RefreshConfig;
use svckit::errors::FetchError;
use svckit::query_builder;
use svckit::{AssetClient, QueryCache};

use crate::tiles::{self, Section};

/// Which division and unit the dashboard is looking at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub division_id: Option<String>,
    pub unit_id: Option<String>,
}

impl Selection {
    pub fn new(division_id: Option<String>, unit_id: Option<String>) -> Self {
        Self {
            division_id: division_id.filter(|d| !d.is_empty()),
            unit_id: unit_id.filter(|u| !u.is_empty()),
        }
    }

    pub fn catalog(&self) -> Vec<Section> {
        tiles::catalog(self.division_id.as_deref(), self.unit_id.as_deref())
    }

    /// Every key this selection reads from the cache.
    fn owns_key(&self, key: &str) -> bool {
        let suffix = format!(
            "-{}-{}",
            self.division_id.as_deref().unwrap_or("none"),
            self.unit_id.as_deref().unwrap_or("all")
        );
        key.ends_with(&suffix) || key.starts_with("units-")
    }
}

/// Outcome of one finished refresh, surfaced in the activity log.
#[derive(Debug, Clone)]
pub enum PollEvent {
    Refreshed { key: String, count: usize },
    Failed { key: String, error: String },
}

pub struct Poller {
    client: Arc<AssetClient>,
    cache: Arc<QueryCache>,
    refresh: RefreshConfig,
    events: mpsc::UnboundedSender<PollEvent>,
}

impl Poller {
    pub fn new(
        client: Arc<AssetClient>,
        cache: Arc<QueryCache>,
        refresh: RefreshConfig,
        events: mpsc::UnboundedSender<PollEvent>,
    ) -> Self {
        Self {
            client,
            cache,
            refresh,
            events,
        }
    }

    /// Polls until the selection channel closes. A selection change triggers
    /// an immediate pass; keys of the previous selection are dropped.
    pub async fn run(self: Arc<Self>, mut selection: watch::Receiver<Selection>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            "Poller started: tiles every {:?}, units every {:?}",
            self.refresh.refetch_interval(),
            self.refresh.units_refetch_interval()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = selection.changed() => {
                    if changed.is_err() {
                        info!("Selection channel closed, poller stopping");
                        return;
                    }
                    let current = selection.borrow().clone();
                    info!("Selection changed: division={:?} unit={:?}", current.division_id, current.unit_id);
                    self.cache.retain(|key| current.owns_key(key));
                }
            }

            let current = selection.borrow().clone();
            let started = self.poll_once(&current);
            if started > 0 {
                debug!("Started {} refreshes", started);
            }
        }
    }

    /// Spawns a refresh for every due key of `selection`. Returns how many
    /// were started.
    pub fn poll_once(&self, selection: &Selection) -> usize {
        let mut started = 0;

        if let Some(division_id) = &selection.division_id {
            let key = tiles::units_key(division_id);
            if self.cache.is_due(&key, self.refresh.units_refetch_interval()) && self.cache.begin_fetch(&key) {
                self.spawn_refresh(key, query_builder::units_by_division(division_id));
                started += 1;
            }
        }

        for section in selection.catalog() {
            for tile in section.tiles {
                if self.cache.is_due(&tile.key, self.refresh.refetch_interval()) && self.cache.begin_fetch(&tile.key) {
                    self.spawn_refresh(tile.key, tile.query);
                    started += 1;
                }
            }
        }

        started
    }

    fn spawn_refresh(&self, key: String, query: query_builder::ListQuery) {
        let client = self.client.clone();
        let cache = self.cache.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            let event = match client.fetch_dataset(&query).await {
                Ok(dataset) => {
                    let count = dataset.count();
                    cache.store_success(&key, dataset);
                    PollEvent::Refreshed { key, count }
                }
                Err(e) => {
                    warn!("Refresh of {} failed: {}", key, e);
                    cache.store_failure(&key, &e);
                    PollEvent::Failed { key, error: e.to_string() }
                }
            };
            // UI may already be gone
            let _ = events.send(event);
        });
    }
}

#[derive(Debug)]
pub struct TileCount {
    pub section: &'static str,
    pub title: &'static str,
    pub key: String,
    pub result: Result<usize, FetchError>,
}

/// Fetches every tile of `selection` once, concurrently, in catalog order.
pub async fn fetch_all_once(client: Arc<AssetClient>, selection: &Selection) -> Vec<TileCount> {
    let mut tasks = JoinSet::new();
    let mut slots = Vec::new();

    for section in selection.catalog() {
        for tile in section.tiles {
            let index = slots.len();
            slots.push((section.title, tile.title, tile.key.clone()));
            let client = client.clone();
            tasks.spawn(async move {
                let result = client.fetch_dataset(&tile.query).await.map(|d| d.count());
                (index, result)
            });
        }
    }

    let mut results: Vec<Option<Result<usize, FetchError>>> = vec![None; slots.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(e) => warn!("Tile task aborted: {}", e),
        }
    }

    slots
        .into_iter()
        .zip(results)
        .map(|((section, title, key), result)| TileCount {
            section,
            title,
            key,
            result: result.unwrap_or_else(|| Err(FetchError::Network("task aborted".to_string()))),
        })
        .collect()
}
