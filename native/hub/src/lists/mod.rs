//! Polled resources of the web API, each backed by a [`Store`].
//!
//! [`Store`]: crate::store::Store

use anyhow::Result;
use async_trait::async_trait;

use crate::api::ApiClient;

mod accounts;
pub use accounts::*;
mod interactions;
pub use interactions::*;
mod progress;
pub use progress::*;

/// A resource that can be re-fetched by the [`Poller`](crate::poller::Poller).
#[async_trait]
pub trait Refresh: Send + Sync {
    fn name(&self) -> &'static str;

    async fn refresh(&self, api: &ApiClient) -> Result<()>;
}
