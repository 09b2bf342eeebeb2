use std::time::Duration;

use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use snafu::ResultExt;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::instrument;
use url::Url;

use super::{Notification, Notifier, NotifyError, RejectedSnafu, RequestSnafu};

const WHOP_API_BASE: &str = "https://api.whop.com/api/v2";

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct WhopConfig {
    #[serde(rename = "whop_api_base", default)]
    pub api_base: Option<Url>,

    #[serde_as(as = "DisplayFromStr")]
    #[serde(rename = "whop_send_timeout", default = "default_send_timeout")]
    pub send_timeout: humantime::Duration,

    #[serde_as(as = "DisplayFromStr")]
    #[serde(rename = "whop_send_retries", default = "default_send_retries")]
    pub send_retries: usize,
}

fn default_send_timeout() -> humantime::Duration {
    Duration::from_secs(10).into()
}

fn default_send_retries() -> usize {
    2
}

/// Sends in-app notifications through the Whop REST API.
#[derive(Debug, Clone)]
pub struct WhopNotifier {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    retries: usize,
}

impl WhopNotifier {
    pub fn from_config(config: &WhopConfig) -> Result<Self, reqwest::Error> {
        let timeout: Duration = config.send_timeout.into();
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base = config.api_base.as_ref().map_or(WHOP_API_BASE, Url::as_str);
        let endpoint = format!("{}/notifications", base.trim_end_matches('/'));

        Ok(Self {
            client,
            endpoint,
            timeout,
            retries: config.send_retries,
        })
    }

    async fn post(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&notification.access_token)
            .json(notification)
            .send()
            .await
            .context(RequestSnafu)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(user_id = %notification.user_id, status = %status, body = %body, "whop rejected the notification");

        RejectedSnafu {
            status: status.as_u16(),
            body,
        }
        .fail()
    }
}

impl Notifier for WhopNotifier {
    #[instrument(skip(self), fields(user_id = %notification.user_id))]
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let backoff = ExponentialBackoff::from_millis(10)
            .factor(10)
            .max_delay(Duration::from_secs(2))
            .map(jitter)
            .take(self.retries);

        RetryIf::start(backoff, || self.post(notification), NotifyError::is_transient).await
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
