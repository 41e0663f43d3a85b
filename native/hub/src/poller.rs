use std::{error::Error, sync::Arc, time::Duration};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, trace, warn};

use crate::{api::ApiClient, lists::Refresh};

/// One polled resource and how often to refresh it.
pub struct PollJob {
    pub target: Arc<dyn Refresh>,
    pub period: Duration,
}

impl PollJob {
    pub fn new(target: Arc<dyn Refresh>, period: Duration) -> Self {
        Self { target, period }
    }
}

/// Periodically refreshes a set of resources, one tokio task per resource.
///
/// Every refresh uses the client currently held by the `api_rx` channel, so
/// replacing the client does not require restarting the poller.
pub struct Poller {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Poller {
    pub fn start(api_rx: watch::Receiver<ApiClient>, jobs: Vec<PollJob>) -> Self {
        let token = CancellationToken::new();
        let handles = jobs
            .into_iter()
            .map(|job| {
                let span = info_span!("poll", resource = job.target.name());
                tokio::spawn(
                    run_job(job, api_rx.clone(), token.clone()).instrument(span),
                )
            })
            .collect();
        Self { token, handles }
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Cancel every loop and wait for them to finish.
    pub async fn stop(mut self) {
        self.token.cancel();
        for handle in std::mem::take(&mut self.handles) {
            if let Err(e) = handle.await {
                warn!(error = &e as &dyn Error, "Poll task ended abnormally");
            }
        }
        debug!("Poller stopped");
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run_job(job: PollJob, api_rx: watch::Receiver<ApiClient>, token: CancellationToken) {
    info!(period = ?job.period, "Starting poll loop");
    let mut ticker = interval(job.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let api = api_rx.borrow().clone();
        trace!("Refreshing");
        tokio::select! {
            _ = token.cancelled() => break,
            result = job.target.refresh(&api) => {
                if let Err(e) = result {
                    warn!(error = e.as_ref() as &dyn Error, "Refresh failed");
                }
            }
        }
    }
    info!("Poll loop cancelled");
}
