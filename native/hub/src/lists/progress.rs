use std::cmp::Ordering;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, instrument};

use super::Refresh;
use crate::{
    api::ApiClient,
    models::{ProgressInfo, ProgressView},
    store::{Snapshot, Sorted, Store},
};

pub const PROGRESS_ENDPOINT: &str = "getProgressInfo";

impl Sorted for ProgressInfo {
    fn order(&self, other: &Self) -> Ordering {
        self.pid.cmp(&other.pid)
    }
}

impl Snapshot<ProgressInfo> {
    pub fn views(&self) -> Vec<ProgressView> {
        self.items.iter().map(ProgressInfo::to_view).collect()
    }

    pub fn active_downloads(&self) -> usize {
        self.items.iter().filter(|p| p.is_downloading()).count()
    }

    pub fn get(&self, pid: i64) -> Option<&ProgressInfo> {
        self.items.iter().find(|p| p.pid == pid)
    }
}

/// Progress records of running operations, kept sorted by `pid`.
#[derive(Debug)]
pub struct ProgressList {
    store: Store<ProgressInfo>,
}

impl Default for ProgressList {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressList {
    pub fn new() -> Self {
        Self { store: Store::new("progress") }
    }

    #[instrument(level = "debug", skip_all, err)]
    pub async fn fetch(&self, api: &ApiClient) -> Result<()> {
        let ticket = self.store.begin();
        let records: Vec<ProgressInfo> =
            api.get_json(PROGRESS_ENDPOINT).await.context("Failed to fetch progress info")?;
        debug!(count = records.len(), ticket = ticket.get(), "Fetched progress info");
        self.store.apply(ticket, records);
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot<ProgressInfo> {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<ProgressInfo>> {
        self.store.subscribe()
    }
}

#[async_trait]
impl Refresh for ProgressList {
    fn name(&self) -> &'static str {
        self.store.name()
    }

    async fn refresh(&self, api: &ApiClient) -> Result<()> {
        self.fetch(api).await
    }
}
