use std::sync::Arc;

use derive_new::new;

use crate::service::{AccessGate, UnlockPass};

/// Shared state behind every handler.
#[derive(new)]
pub struct App<S, N> {
    pub gate: AccessGate<S>,
    pub pass: Arc<UnlockPass<S, N>>,
    /// Bearer token for the manual unlock trigger, which is disabled when unset.
    pub cron_secret: Option<String>,
}
