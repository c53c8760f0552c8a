//! Place lookup handlers backing the upload form
//!
//! A miss is a normal answer, not an error; the form simply leaves the
//! map pin unset.

use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ForwardQuery {
    pub city: String,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Deserialize)]
pub struct ReverseQuery {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
pub struct ForwardResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ReverseResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Forward lookup: place name to coordinates. An empty city is answered
/// directly without invoking the adapter.
pub async fn forward(
    State(state): State<AppState>,
    Query(query): Query<ForwardQuery>,
) -> Json<ForwardResponse> {
    if query.city.trim().is_empty() {
        return Json(ForwardResponse {
            found: false,
            latitude: None,
            longitude: None,
        });
    }

    let coordinates = state.geocoder.resolve(&query.city, &query.country).await;
    mosaic_common::metrics::record_geocode(coordinates.is_some());

    Json(ForwardResponse {
        found: coordinates.is_some(),
        latitude: coordinates.map(|c| c.latitude),
        longitude: coordinates.map(|c| c.longitude),
    })
}

/// Reverse lookup: coordinates to place name
pub async fn reverse(
    State(state): State<AppState>,
    Query(query): Query<ReverseQuery>,
) -> Json<ReverseResponse> {
    let place = state
        .geocoder
        .reverse_resolve(query.latitude, query.longitude)
        .await;

    match place {
        Some(place) => Json(ReverseResponse {
            found: true,
            city: place.city,
            country: place.country,
        }),
        None => Json(ReverseResponse {
            found: false,
            city: None,
            country: None,
        }),
    }
}
