use std::cmp::Ordering;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, instrument};

use super::Refresh;
use crate::{
    api::ApiClient,
    models::{InteractionSummary, InteractionTask},
    store::{Snapshot, Sorted, Store},
};

pub const INTERACTION_TASKS_ENDPOINT: &str = "getInteractionTasks/0";

impl Sorted for InteractionTask {
    fn order(&self, other: &Self) -> Ordering {
        self.iid.cmp(&other.iid)
    }
}

impl Snapshot<InteractionTask> {
    pub fn summary(&self) -> InteractionSummary {
        InteractionSummary::from_tasks(&self.items)
    }

    /// Whether any task waits for user input rather than being a notification.
    pub fn has_pending_task(&self) -> bool {
        self.items.iter().any(|task| !task.is_notification())
    }
}

/// Interaction tasks, kept sorted by `iid`.
#[derive(Debug)]
pub struct InteractionList {
    store: Store<InteractionTask>,
}

impl Default for InteractionList {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionList {
    pub fn new() -> Self {
        Self { store: Store::new("interactions") }
    }

    /// Fetch the task list and replace the held tasks with it.
    ///
    /// On failure the held tasks are left untouched.
    #[instrument(level = "debug", skip_all, err)]
    pub async fn fetch(&self, api: &ApiClient) -> Result<()> {
        let ticket = self.store.begin();
        let tasks: Vec<InteractionTask> = api
            .get_json(INTERACTION_TASKS_ENDPOINT)
            .await
            .context("Failed to fetch interaction tasks")?;
        debug!(count = tasks.len(), ticket = ticket.get(), "Fetched interaction tasks");
        self.store.apply(ticket, tasks);
        Ok(())
    }

    pub fn summary(&self) -> InteractionSummary {
        self.store.read(|snapshot| snapshot.summary())
    }

    pub fn has_pending_task(&self) -> bool {
        self.store.read(|snapshot| snapshot.has_pending_task())
    }

    pub fn snapshot(&self) -> Snapshot<InteractionTask> {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<InteractionTask>> {
        self.store.subscribe()
    }

    pub fn store(&self) -> &Store<InteractionTask> {
        &self.store
    }
}

#[async_trait]
impl Refresh for InteractionList {
    fn name(&self) -> &'static str {
        self.store.name()
    }

    async fn refresh(&self, api: &ApiClient) -> Result<()> {
        self.fetch(api).await
    }
}
