//! Client-side state for a pyLoad server: interaction tasks, download
//! progress and accounts, polled from the web API and published through
//! watch channels.

pub mod api;
pub mod hub;
pub mod lists;
pub mod logging;
pub mod models;
pub mod poller;
pub mod settings;
pub mod store;

pub use api::ApiClient;
pub use hub::Hub;
pub use settings::SettingsHandler;
