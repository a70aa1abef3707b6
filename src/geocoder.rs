use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::models::Location;

/// Radius of the Earth in miles, the unit `distance` is given in.
pub const EARTH_RADIUS_MILES: f64 = 3963.0;

/// angular_radius
///
/// Converts a distance along the Earth's surface (miles) into the angle, in
/// radians, it subtends at the Earth's centre.
pub fn angular_radius(distance_miles: f64) -> f64 {
    distance_miles / EARTH_RADIUS_MILES
}

// 1. Geocoder Contract
/// Geocoder
///
/// Resolves a free-form address or postal code to candidate locations, best
/// match first. An empty list means the provider found nothing.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Vec<Location>, String>;
}

pub type GeocoderState = Arc<dyn Geocoder>;

// 2. MapQuest Implementation
/// MapQuestGeocoder
///
/// Calls the MapQuest `geocoding/v1/address` endpoint.
#[derive(Clone)]
pub struct MapQuestGeocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MapQuestGeocoder {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MapQuestResponse {
    #[serde(default)]
    pub results: Vec<MapQuestResult>,
}

#[derive(Debug, Deserialize)]
pub struct MapQuestResult {
    #[serde(default)]
    pub locations: Vec<MapQuestLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapQuestLocation {
    pub lat_lng: MapQuestLatLng,
    #[serde(default)]
    pub street: String,
    /// City.
    #[serde(default)]
    pub admin_area5: String,
    /// State.
    #[serde(default)]
    pub admin_area3: String,
    /// Country code.
    #[serde(default)]
    pub admin_area1: String,
    #[serde(default)]
    pub postal_code: String,
}

#[derive(Debug, Deserialize)]
pub struct MapQuestLatLng {
    pub lat: f64,
    pub lng: f64,
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl From<MapQuestLocation> for Location {
    fn from(loc: MapQuestLocation) -> Self {
        let formatted = [
            loc.street.as_str(),
            loc.admin_area5.as_str(),
            format!("{} {}", loc.admin_area3, loc.postal_code).trim(),
            loc.admin_area1.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ");

        Location {
            latitude: loc.lat_lng.lat,
            longitude: loc.lat_lng.lng,
            formatted_address: non_empty(formatted),
            street: non_empty(loc.street),
            city: non_empty(loc.admin_area5),
            state: non_empty(loc.admin_area3),
            zipcode: non_empty(loc.postal_code),
            country: non_empty(loc.admin_area1),
        }
    }
}

impl MapQuestResponse {
    /// Flattens every result set into locations, provider order preserved.
    pub fn into_locations(self) -> Vec<Location> {
        self.results
            .into_iter()
            .flat_map(|r| r.locations)
            .map(Location::from)
            .collect()
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, address: &str) -> Result<Vec<Location>, String> {
        let url = format!("{}/geocoding/v1/address", self.base_url);

        let response = self
            .client
            .get(url)
            .query(&[("key", self.api_key.as_str()), ("location", address)])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("geocoder returned {}", response.status()));
        }

        let body = response
            .json::<MapQuestResponse>()
            .await
            .map_err(|e| e.to_string())?;

        let locations = body.into_locations();
        tracing::debug!(address, matches = locations.len(), "geocoded address");
        Ok(locations)
    }
}

// 3. The Mock Implementation (For Tests)
/// MockGeocoder
///
/// Returns a canned location for every query, or nothing, or a failure.
#[derive(Clone, Default)]
pub struct MockGeocoder {
    pub location: Option<Location>,
    pub should_fail: bool,
}

impl MockGeocoder {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            location: Some(Location {
                latitude,
                longitude,
                formatted_address: Some("233 Bay State Rd, Boston, MA 02215, US".to_string()),
                street: Some("233 Bay State Rd".to_string()),
                city: Some("Boston".to_string()),
                state: Some("MA".to_string()),
                zipcode: Some("02215".to_string()),
                country: Some("US".to_string()),
            }),
            should_fail: false,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            location: None,
            should_fail: true,
        }
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn geocode(&self, _address: &str) -> Result<Vec<Location>, String> {
        if self.should_fail {
            return Err("Mock Geocoder Error: Simulation requested".to_string());
        }
        Ok(self.location.clone().into_iter().collect())
    }
}
