use std::{error::Error, sync::Arc};

use anyhow::{Context, Result};
use tokio::sync::{Mutex, watch};
use tokio_stream::{StreamExt, wrappers::WatchStream};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use crate::{
    api::ApiClient,
    lists::{AccountList, InteractionList, ProgressList},
    models::{PollIntervals, Settings},
    poller::{PollJob, Poller},
};

/// Keeps the interaction, progress and account lists in sync with one server.
pub struct Hub {
    api_tx: watch::Sender<ApiClient>,
    interactions: Arc<InteractionList>,
    progress: Arc<ProgressList>,
    accounts: Arc<AccountList>,
    poller: Mutex<Option<Poller>>,
    shutdown: CancellationToken,
}

impl Hub {
    /// Connect using the first settings value and keep following the stream.
    #[instrument(skip(settings_stream), err)]
    pub async fn start(mut settings_stream: WatchStream<Settings>) -> Result<Arc<Self>> {
        let settings =
            settings_stream.next().await.context("Settings stream closed on hub init")?;
        let api = connect(&settings).await?;

        let handle = Arc::new(Self {
            api_tx: watch::Sender::new(api),
            interactions: Arc::new(InteractionList::new()),
            progress: Arc::new(ProgressList::new()),
            accounts: Arc::new(AccountList::new()),
            poller: Mutex::new(None),
            shutdown: CancellationToken::new(),
        });
        handle.restart_poller(settings.poll_intervals()).await;
        info!(api_root = %handle.api().api_root(), "Hub started");

        tokio::spawn(
            {
                let handle = handle.clone();
                async move {
                    handle.follow_settings(settings, settings_stream).await;
                }
            }
            .instrument(info_span!("task_handle_settings_updates")),
        );
        Ok(handle)
    }

    async fn follow_settings(&self, mut current: Settings, mut settings_stream: WatchStream<Settings>) {
        info!("Starting to listen for settings changes");
        loop {
            let settings = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                next = settings_stream.next() => match next {
                    Some(settings) => settings,
                    None => {
                        warn!("Settings stream closed");
                        break;
                    }
                },
            };
            if settings == current {
                continue;
            }
            info!("Hub received settings update");
            debug!(?settings, "New settings");

            if settings.connection_differs(&current) {
                match connect(&settings).await {
                    Ok(api) => {
                        info!(api_root = %api.api_root(), "Connection settings changed, switched client");
                        self.api_tx.send_replace(api);
                        if let Err(e) = self.refresh_all().await {
                            warn!(error = e.as_ref() as &dyn Error, "Initial refresh after reconnect failed");
                        }
                    }
                    Err(e) => {
                        warn!(
                            error = e.as_ref() as &dyn Error,
                            "Failed to apply new connection settings, keeping previous client"
                        );
                    }
                }
            }

            let intervals = settings.poll_intervals();
            if intervals != current.poll_intervals() {
                info!(?intervals, "Poll intervals changed, restarting poller");
                self.restart_poller(intervals).await;
            }
            current = settings;
        }
        info!("Stopped listening for settings changes");
    }

    async fn restart_poller(&self, intervals: PollIntervals) {
        let mut poller = self.poller.lock().await;
        if let Some(old) = poller.take() {
            old.stop().await;
        }
        if self.shutdown.is_cancelled() {
            return;
        }
        let jobs = vec![
            PollJob::new(self.interactions.clone(), intervals.interactions),
            PollJob::new(self.progress.clone(), intervals.progress),
            PollJob::new(self.accounts.clone(), intervals.accounts),
        ];
        *poller = Some(Poller::start(self.api_tx.subscribe(), jobs));
    }

    pub fn interactions(&self) -> &Arc<InteractionList> {
        &self.interactions
    }

    pub fn progress(&self) -> &Arc<ProgressList> {
        &self.progress
    }

    pub fn accounts(&self) -> &Arc<AccountList> {
        &self.accounts
    }

    /// Client currently used for every request
    pub fn api(&self) -> ApiClient {
        self.api_tx.borrow().clone()
    }

    /// Fetch all three resources once, concurrently.
    #[instrument(level = "debug", skip(self), err)]
    pub async fn refresh_all(&self) -> Result<()> {
        let api = self.api();
        futures::future::try_join3(
            self.interactions.fetch(&api),
            self.progress.fetch(&api),
            self.accounts.fetch(&api),
        )
        .await?;
        Ok(())
    }

    pub async fn is_polling(&self) -> bool {
        self.poller.lock().await.as_ref().is_some_and(Poller::is_running)
    }

    /// Stop polling and stop following settings changes.
    #[instrument(skip(self))]
    pub async fn stop(&self) {
        self.shutdown.cancel();
        if let Some(poller) = self.poller.lock().await.take() {
            poller.stop().await;
        }
        info!("Hub stopped");
    }
}

/// Build a client for `settings` and open a session when credentials are set.
///
/// A rejected login is only logged: the server may not require one.
async fn connect(settings: &Settings) -> Result<ApiClient> {
    let api = ApiClient::new(&settings.server_url)?;
    if !settings.username.is_empty()
        && let Err(e) = api.login(&settings.username, &settings.password).await
    {
        warn!(error = e.as_ref() as &dyn Error, "Login failed, continuing without a session");
    }
    Ok(api)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    use super::*;
    use crate::settings::SettingsHandler;

    async fn mount_api(server: &MockServer, pid: i64) {
        Mock::given(method("GET"))
            .and(path("/api/getInteractionTasks/0"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"iid": 1, "type": 2, "title": "captcha"}])),
            )
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/getProgressInfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"pid": pid, "name": "file.bin", "done": 10, "total": 40}
            ])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/getAccounts/false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"plugin": "Zippyshare"}])))
            .mount(server)
            .await;
    }

    fn settings_for(server: &MockServer) -> Settings {
        Settings {
            server_url: server.uri(),
            interaction_poll_ms: 20,
            progress_poll_ms: 20,
            account_poll_ms: 20,
            ..Settings::default()
        }
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("condition not met in time");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn refresh_all_populates_lists() {
        let server = MockServer::start().await;
        mount_api(&server, 7).await;
        let dir = tempdir().unwrap();
        let handler = SettingsHandler::new(dir.path().to_path_buf());
        handler
            .update(Settings { server_url: server.uri(), ..Settings::default() })
            .unwrap();

        let hub = Hub::start(WatchStream::new(handler.subscribe())).await.unwrap();
        hub.refresh_all().await.unwrap();

        assert!(hub.interactions().has_pending_task());
        let progress = hub.progress().snapshot();
        assert_eq!(progress.views()[0].percent, 25);
        assert_eq!(hub.accounts().snapshot().items[0].plugin, "Zippyshare");
        hub.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn poller_keeps_lists_updated() {
        let server = MockServer::start().await;
        mount_api(&server, 3).await;
        let dir = tempdir().unwrap();
        let handler = SettingsHandler::new(dir.path().to_path_buf());
        handler.update(settings_for(&server)).unwrap();

        let hub = Hub::start(WatchStream::new(handler.subscribe())).await.unwrap();
        assert!(hub.is_polling().await);
        wait_for(|| {
            !hub.interactions().snapshot().is_empty()
                && !hub.progress().snapshot().is_empty()
                && !hub.accounts().snapshot().is_empty()
        })
        .await;

        hub.stop().await;
        assert!(!hub.is_polling().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn server_change_switches_client() {
        let first = MockServer::start().await;
        mount_api(&first, 1).await;
        let second = MockServer::start().await;
        mount_api(&second, 2).await;

        let dir = tempdir().unwrap();
        let handler = SettingsHandler::new(dir.path().to_path_buf());
        handler.update(settings_for(&first)).unwrap();

        let hub = Hub::start(WatchStream::new(handler.subscribe())).await.unwrap();
        wait_for(|| hub.progress().snapshot().get(1).is_some()).await;

        handler.update(settings_for(&second)).unwrap();
        wait_for(|| hub.progress().snapshot().get(2).is_some()).await;
        assert!(hub.api().api_root().as_str().starts_with(&second.uri()));
        hub.stop().await;
    }

    async fn progress_requests(server: &MockServer) -> usize {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == "/api/getProgressInfo")
            .count()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn poll_interval_change_restarts_poller() {
        let server = MockServer::start().await;
        mount_api(&server, 4).await;
        let dir = tempdir().unwrap();
        let handler = SettingsHandler::new(dir.path().to_path_buf());
        let slow = Settings {
            server_url: server.uri(),
            interaction_poll_ms: 60_000,
            progress_poll_ms: 60_000,
            account_poll_ms: 60_000,
            ..Settings::default()
        };
        handler.update(slow.clone()).unwrap();

        let hub = Hub::start(WatchStream::new(handler.subscribe())).await.unwrap();
        let api_root = hub.api().api_root().clone();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(progress_requests(&server).await, 1);

        handler.update(Settings { progress_poll_ms: 20, ..slow }).unwrap();
        let mut polled = 0;
        for _ in 0..100 {
            polled = progress_requests(&server).await;
            if polled >= 5 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(polled >= 5, "expected faster polling, got {polled} requests");
        assert!(hub.is_polling().await);
        assert_eq!(hub.api().api_root(), &api_root);

        hub.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_login_is_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(false)))
            .expect(1)
            .mount(&server)
            .await;
        mount_api(&server, 5).await;

        let dir = tempdir().unwrap();
        let handler = SettingsHandler::new(dir.path().to_path_buf());
        handler
            .update(Settings {
                server_url: server.uri(),
                username: "admin".to_string(),
                password: "wrong".to_string(),
                ..Settings::default()
            })
            .unwrap();

        let hub = Hub::start(WatchStream::new(handler.subscribe())).await.unwrap();
        hub.refresh_all().await.unwrap();
        assert_eq!(hub.progress().snapshot().len(), 1);
        hub.stop().await;
    }
}
