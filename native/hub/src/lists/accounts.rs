use std::cmp::Ordering;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, instrument};

use super::Refresh;
use crate::{
    api::ApiClient,
    models::Account,
    store::{Snapshot, Sorted, Store},
};

/// Account listing without disabled accounts.
pub const ACCOUNTS_ENDPOINT: &str = "getAccounts/false";

impl Sorted for Account {
    fn order(&self, other: &Self) -> Ordering {
        self.plugin.cmp(&other.plugin)
    }
}

impl Snapshot<Account> {
    pub fn plugins(&self) -> Vec<&str> {
        let mut plugins: Vec<&str> = self.items.iter().map(|a| a.plugin.as_str()).collect();
        plugins.dedup();
        plugins
    }
}

/// Accounts, kept sorted by plugin name.
#[derive(Debug)]
pub struct AccountList {
    store: Store<Account>,
}

impl Default for AccountList {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountList {
    pub fn new() -> Self {
        Self { store: Store::new("accounts") }
    }

    #[instrument(level = "debug", skip_all, err)]
    pub async fn fetch(&self, api: &ApiClient) -> Result<()> {
        let ticket = self.store.begin();
        let accounts: Vec<Account> =
            api.get_json(ACCOUNTS_ENDPOINT).await.context("Failed to fetch accounts")?;
        debug!(count = accounts.len(), ticket = ticket.get(), "Fetched accounts");
        self.store.apply(ticket, accounts);
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot<Account> {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<Account>> {
        self.store.subscribe()
    }
}

#[async_trait]
impl Refresh for AccountList {
    fn name(&self) -> &'static str {
        self.store.name()
    }

    async fn refresh(&self, api: &ApiClient) -> Result<()> {
        self.fetch(api).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn fetch_requests_enabled_accounts_sorted_by_plugin() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/getAccounts/false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"plugin": "UploadedTo", "loginname": "u1"},
                {"plugin": "FileFactory", "loginname": "f1"},
                {"plugin": "RapideoPl", "loginname": "r1", "premium": true},
                {"plugin": "FileFactory", "loginname": "f2"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let list = AccountList::new();
        list.fetch(&api).await.unwrap();

        let snapshot = list.snapshot();
        let order: Vec<(&str, &str)> = snapshot
            .iter()
            .map(|a| (a.plugin.as_str(), a.attribute("loginname").and_then(|v| v.as_str()).unwrap()))
            .collect();
        assert_eq!(
            order,
            vec![("FileFactory", "f1"), ("FileFactory", "f2"), ("RapideoPl", "r1"), ("UploadedTo", "u1")]
        );
        assert_eq!(snapshot.items[1].attribute("premium"), None);
        assert_eq!(snapshot.items[2].attribute("premium"), Some(&json!(true)));
        assert_eq!(snapshot.plugins(), vec!["FileFactory", "RapideoPl", "UploadedTo"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_fetch_leaves_accounts_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/getAccounts/false"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let list = AccountList::new();
        let err = list.refresh(&api).await.unwrap_err();
        assert!(format!("{err:#}").contains("Failed to fetch accounts"));
        assert!(list.snapshot().is_empty());
        assert_eq!(list.snapshot().revision, 0);
    }
}
