use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use tracing::instrument;

use super::{AccessSnafu, App, Result};
use crate::model::{MembershipId, ModuleId};
use crate::notifier::Notifier;
use crate::service::MemberCourse;
use crate::store::DripStore;

#[instrument(skip(app))]
pub async fn course<S: DripStore, N: Notifier>(
    State(app): State<Arc<App<S, N>>>, Path(membership_id): Path<String>,
) -> Result<Json<MemberCourse>> {
    let membership = MembershipId::new(membership_id);
    let course = app
        .gate
        .member_course(&membership, Utc::now())
        .await
        .context(AccessSnafu)?;

    Ok(Json(course))
}

#[derive(Debug, Deserialize)]
pub struct ProgressUpdate {
    pub module_id: String,
    pub completed: bool,
}

#[derive(Debug, Serialize)]
pub struct ProgressAck {
    pub ok: bool,
    /// Whether a completion was added or removed.
    pub changed: bool,
}

#[instrument(skip(app))]
pub async fn progress<S: DripStore, N: Notifier>(
    State(app): State<Arc<App<S, N>>>, Path(membership_id): Path<String>,
    Json(update): Json<ProgressUpdate>,
) -> Result<Json<ProgressAck>> {
    let membership = MembershipId::new(membership_id);
    let module = ModuleId::new(update.module_id);

    let changed = if update.completed {
        app.gate.complete_module(&membership, &module, Utc::now()).await
    } else {
        app.gate.uncomplete_module(&membership, &module).await
    }
    .context(AccessSnafu)?;

    Ok(Json(ProgressAck { ok: true, changed }))
}
