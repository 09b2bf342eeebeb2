use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use chrono::Utc;
use snafu::{ensure, OptionExt, ResultExt};
use subtle::ConstantTimeEq;
use tracing::instrument;

use super::{App, PassSnafu, Result, TriggerDisabledSnafu, UnauthorizedSnafu};
use crate::notifier::Notifier;
use crate::service::PassReport;
use crate::store::DripStore;

/// Runs the unlock pass on demand, for an external scheduler.
#[instrument(skip_all)]
pub async fn unlock<S: DripStore, N: Notifier>(
    State(app): State<Arc<App<S, N>>>, headers: HeaderMap,
) -> Result<Json<PassReport>> {
    let secret = app.cron_secret.as_deref().context(TriggerDisabledSnafu)?;

    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    let authorized = provided.is_some_and(|provided| bool::from(provided.as_bytes().ct_eq(secret.as_bytes())));
    ensure!(authorized, UnauthorizedSnafu);

    let report = app.pass.run(Utc::now()).await.context(PassSnafu)?;
    Ok(Json(report))
}
