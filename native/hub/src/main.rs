use std::{error::Error, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use humansize::{DECIMAL, format_size};
use mimalloc::MiMalloc;
use pyload_hub::{Hub, SettingsHandler, logging::setup_logging, settings::default_app_dir};
use tokio_stream::{StreamExt, wrappers::WatchStream};
use tracing::{Instrument, error, info, info_span};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = e.as_ref() as &dyn Error, "Fatal error");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let app_dir = default_app_dir()?;
    fs_err::create_dir_all(&app_dir).context("Failed to create app directory")?;

    let _guard = setup_logging(&app_dir.join("logs"));
    if let Err(e) = &_guard {
        eprintln!("Failed to setup logging: {e:#}");
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting pyload-hub");

    let settings_handler = SettingsHandler::new(app_dir);
    let hub = Hub::start(WatchStream::new(settings_handler.subscribe())).await?;
    spawn_reporters(&hub);

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
    info!("Received Ctrl-C, shutting down");
    hub.stop().await;
    Ok(())
}

/// Log every snapshot change of the three lists.
fn spawn_reporters(hub: &Arc<Hub>) {
    let mut interactions = WatchStream::from_changes(hub.interactions().subscribe());
    tokio::spawn(
        async move {
            while let Some(snapshot) = interactions.next().await {
                let summary = snapshot.summary();
                info!(
                    queries = summary.queries,
                    notifications = summary.notifications,
                    pending = snapshot.has_pending_task(),
                    "Interaction tasks changed"
                );
            }
        }
        .instrument(info_span!("report_interactions")),
    );

    let mut progress = WatchStream::from_changes(hub.progress().subscribe());
    tokio::spawn(
        async move {
            while let Some(snapshot) = progress.next().await {
                info!(active = snapshot.active_downloads(), total = snapshot.len(), "Progress changed");
                for view in snapshot.views() {
                    let speed = view
                        .info
                        .download
                        .as_ref()
                        .map(|d| format!("{}/s", format_size(d.speed, DECIMAL)))
                        .unwrap_or_default();
                    info!(
                        pid = view.info.pid,
                        name = view.info.name.as_deref().unwrap_or_default(),
                        status = %view.info.statusmsg,
                        percent = view.percent,
                        downloading = view.downloading,
                        speed = %speed,
                        "Progress"
                    );
                }
            }
        }
        .instrument(info_span!("report_progress")),
    );

    let mut accounts = WatchStream::from_changes(hub.accounts().subscribe());
    tokio::spawn(
        async move {
            while let Some(snapshot) = accounts.next().await {
                info!(count = snapshot.len(), plugins = ?snapshot.plugins(), "Accounts changed");
            }
        }
        .instrument(info_span!("report_accounts")),
    );
}
