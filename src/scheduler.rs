use std::sync::Arc;

use chrono::{NaiveTime, Utc};
use tokio::select;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::notifier::Notifier;
use crate::service::UnlockPass;
use crate::store::DripStore;
use crate::time::daily_timer;

/// Background task that runs the unlock pass once a day.
#[derive(Debug)]
pub struct DailyScheduler {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl DailyScheduler {
    pub fn spawn<S: DripStore, N: Notifier>(pass: Arc<UnlockPass<S, N>>, run_at: NaiveTime) -> Self {
        let (stop, mut stopped) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let mut timer = daily_timer(run_at, Utc::now());
            tracing::info!(%run_at, "scheduled the unlock pass to run daily at {} UTC", run_at);

            loop {
                select! {
                    _ = &mut stopped => break,
                    _ = timer.tick() => {
                        match pass.run(Utc::now()).await {
                            Ok(report) => tracing::info!(report = ?report, "daily unlock pass finished"),
                            Err(err) => tracing::error!(error = ?err, "daily unlock pass failed: {}", err),
                        }
                    },
                }
            }

            tracing::info!("stopped the daily unlock pass");
        });

        Self { stop, handle }
    }

    /// Stop the task, waiting for a pass in progress to finish.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());

        if let Err(err) = self.handle.await {
            tracing::error!(error = ?err, "daily unlock task ended abnormally");
        }
    }
}
