use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use snafu::{Location, Snafu};

mod whop;

pub use whop::{WhopConfig, WhopNotifier};

/// A message for one member about one unlocked module.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub user_id: String,
    /// Credential of the company the member belongs to, sent as a header rather than in the body.
    #[serde(skip)]
    pub access_token: String,
    pub title: String,
    pub body: String,
}

impl std::fmt::Debug for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notification")
            .field("user_id", &self.user_id)
            .field("access_token", &"<redacted>")
            .field("title", &self.title)
            .field("body", &self.body)
            .finish()
    }
}

/// Delivers unlock notifications to members.
pub trait Notifier: Send + Sync + 'static {
    fn send(&self, notification: &Notification) -> impl Future<Output = Result<(), NotifyError>> + Send;

    /// Upper bound on a single [Notifier::send], retries included.
    fn timeout(&self) -> Duration;
}

impl<N: Notifier> Notifier for Arc<N> {
    fn send(&self, notification: &Notification) -> impl Future<Output = Result<(), NotifyError>> + Send {
        (**self).send(notification)
    }

    fn timeout(&self) -> Duration {
        (**self).timeout()
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum NotifyError {
    #[snafu(display("notification request failed at {location}: {source}"))]
    Request {
        source: reqwest::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("notification rejected with status {status}: {body}"))]
    Rejected {
        status: u16,
        body: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("notifier is unavailable: {message}"))]
    Unavailable {
        message: String,
        #[snafu(implicit)]
        location: Location,
    },
}

impl NotifyError {
    /// Whether sending again could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            NotifyError::Request { .. } | NotifyError::Unavailable { .. } => true,
            NotifyError::Rejected { status, .. } => *status == 429 || *status >= 500,
        }
    }
}
