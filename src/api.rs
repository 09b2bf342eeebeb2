use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::notifier::Notifier;
use crate::store::DripStore;

mod cron;
mod error;
mod members;
mod state;

pub use error::*;
pub use state::App;

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

pub fn router<S: DripStore, N: Notifier>(app: Arc<App<S, N>>) -> Router {
    Router::new()
        .route("/members/:membership_id/course", get(members::course::<S, N>))
        .route("/members/:membership_id/progress", post(members::progress::<S, N>))
        .route("/cron/unlock", post(cron::unlock::<S, N>))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(app)
}
