use std::sync::Arc;

use axum::{extract::Query, routing::get, Json, Router};
use serde::Deserialize;

use crate::services::support::{self, SupportLocation};
use crate::AppState;

/// Public support-centre finder, mounted under `/api`.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/support-locations", get(support_locations))
}

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub city: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

async fn support_locations(Query(query): Query<LocationQuery>) -> Json<Vec<SupportLocation>> {
    Json(support::find_locations(
        query.city.as_deref(),
        query.lat,
        query.lng,
    ))
}
