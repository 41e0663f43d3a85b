use std::{
    error::Error,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use fs_err as fs;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::models::Settings;

const SETTINGS_FILE_NAME: &str = "settings.json";

/// Per-user data directory of the application.
pub fn default_app_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().context("Failed to get data directory")?;
    Ok(data_dir.join("pyload-hub"))
}

/// Handles application settings
#[derive(Debug)]
pub struct SettingsHandler {
    settings_file_path: PathBuf,
    watch_tx: watch::Sender<Settings>,
}

impl SettingsHandler {
    #[instrument(skip(app_dir))]
    pub fn new(app_dir: PathBuf) -> Arc<Self> {
        let watch_tx = watch::Sender::<Settings>::new(Settings::default());
        let handler =
            Arc::new(Self { settings_file_path: app_dir.join(SETTINGS_FILE_NAME), watch_tx });

        let settings = match handler.load_settings() {
            Ok(s) => s,
            Err(e) => {
                warn!(error = e.as_ref() as &dyn Error, "Failed to load settings, using defaults");
                handler.load_default_settings().unwrap_or_else(|e| {
                    error!(
                        error = e.as_ref() as &dyn Error,
                        "Failed to store default settings, continuing with in-memory defaults"
                    );
                    Settings::default()
                })
            }
        };
        handler.on_settings_change(settings);
        handler
    }

    pub fn settings_file_path(&self) -> &Path {
        &self.settings_file_path
    }

    #[instrument(skip(self, settings))]
    fn on_settings_change(&self, settings: Settings) -> bool {
        trace!("on_settings_change called");
        self.watch_tx.send_if_modified(|s| {
            if s != &settings {
                debug!(settings = ?settings, "Active settings changed");
                *s = settings;
                true
            } else {
                trace!("Settings unchanged, not notifying");
                false
            }
        })
    }

    /// Create a receiver for settings changes
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.watch_tx.subscribe()
    }

    pub fn current(&self) -> Settings {
        self.watch_tx.borrow().clone()
    }

    /// Validate, persist and publish new settings.
    ///
    /// Returns whether the active settings changed.
    #[instrument(skip(self, settings), err)]
    pub fn update(&self, settings: Settings) -> Result<bool> {
        settings.validate().context("Invalid settings")?;
        self.save_settings(&settings)?;
        Ok(self.on_settings_change(settings))
    }

    /// Re-read the settings file and publish its contents.
    #[instrument(skip(self), err)]
    pub fn reload(&self) -> Result<bool> {
        let settings = self.load_settings()?;
        Ok(self.on_settings_change(settings))
    }

    /// Load settings from file or return defaults if file doesn't exist
    #[instrument(skip(self))]
    fn load_settings(&self) -> Result<Settings> {
        if !self.settings_file_path.exists() {
            info!(path = %self.settings_file_path.display(), "Settings file doesn't exist, using defaults");
            return self.load_default_settings().context("Failed to load default settings");
        }

        info!(path = %self.settings_file_path.display(), "Loading settings from file");
        let file_content =
            fs::read_to_string(&self.settings_file_path).context("Failed to read settings file")?;

        let settings: Settings =
            serde_json::from_str(&file_content).context("Failed to parse settings file")?;
        settings.validate().context("Settings file contains invalid settings")?;

        debug!("Loaded application settings successfully");
        Ok(settings)
    }

    /// Save settings to file
    #[instrument(skip(self, settings))]
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        info!(path = %self.settings_file_path.display(), "Saving settings to file");
        let settings_json =
            serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;

        if let Some(parent) = self.settings_file_path.parent()
            && !parent.exists()
        {
            info!(path = %parent.display(), "Creating settings directory");
            fs::create_dir_all(parent).context("Failed to create settings directory")?;
        }

        fs::write(&self.settings_file_path, settings_json)
            .context("Failed to write settings file")?;

        info!("Saved application settings successfully");
        Ok(())
    }

    /// Write the default settings to disk and return them
    #[instrument(skip(self))]
    pub fn load_default_settings(&self) -> Result<Settings> {
        info!("Loading default settings");
        let settings = Settings::default();
        self.save_settings(&settings)?;
        info!("Default settings loaded and saved");
        Ok(settings)
    }
}
