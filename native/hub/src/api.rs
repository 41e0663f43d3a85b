use std::time::Duration;

use anyhow::{Context, Result, ensure};
use reqwest::{
    Url,
    header::{ACCEPT, HeaderValue},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Dispatches requests to the `api/` endpoints of the web interface.
///
/// Cloning is cheap and clones share the session cookie store.
#[derive(derive_more::Debug, Clone)]
pub struct ApiClient {
    #[debug(skip)]
    client: reqwest::Client,
    api_root: Url,
}

impl ApiClient {
    pub fn new(server_url: &str) -> Result<Self> {
        ensure!(
            server_url.starts_with("http://") || server_url.starts_with("https://"),
            "Server URL must start with http:// or https://: {}",
            server_url
        );
        let mut base =
            Url::parse(server_url).with_context(|| format!("Invalid server URL: {server_url}"))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let api_root = base.join("api/").context("Failed to build API root URL")?;

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, api_root })
    }

    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    /// Resolve an API method path such as `getAccounts/false`.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_root.join(path).with_context(|| format!("Invalid API path: {path}"))
    }

    #[instrument(level = "debug", skip(self), fields(api_root = %self.api_root), err)]
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        debug!(%url, "Sending API request");

        let resp = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await?;
        resp.error_for_status_ref()?;

        let payload =
            resp.json().await.with_context(|| format!("Failed to decode response of {path}"))?;
        Ok(payload)
    }

    /// Open a session. The session cookie is reused by every later request
    /// made through this client or its clones.
    #[instrument(level = "debug", skip(self, password), err)]
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let url = self.endpoint("login")?;
        debug!(%url, "Logging in");

        let resp = self
            .client
            .post(url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        resp.error_for_status_ref()?;

        let answer: Value = resp.json().await.context("Failed to decode login response")?;
        ensure!(
            !matches!(answer, Value::Null | Value::Bool(false)),
            "Login rejected for user {}",
            username
        );
        info!(%username, "Logged in");
        Ok(())
    }
}
