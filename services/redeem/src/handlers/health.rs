use axum::{extract::State, http::StatusCode};

use offercode_core::health::readiness;

use crate::state::AppState;

/// `GET /readyz`: ready once the code store answers.
pub async fn readyz(State(state): State<AppState>) -> StatusCode {
    readiness(state.db.ping().await)
}
