use super::BoxFuture;
use crate::error::GeocodeError;
use crate::status::Coordinates;
use serde::{Deserialize, Serialize};

/// Human-readable description of a coordinate pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPlace {
    pub display_location: String,
    pub address: String,
}

/// Search hit for a free-text destination query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceDetails {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub name: String,
}

/// Reverse-geocoding and place search.
pub trait Geocoder: Send + Sync {
    fn resolve(&self, coordinates: Coordinates) -> BoxFuture<'_, Result<ResolvedPlace, GeocodeError>>;

    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<PlaceDetails, GeocodeError>>;
}

/// Geocoder that never finds anything; addresses stay absent.
pub struct NoGeocoder;

impl Geocoder for NoGeocoder {
    fn resolve(&self, coordinates: Coordinates) -> BoxFuture<'_, Result<ResolvedPlace, GeocodeError>> {
        Box::pin(async move { Err(GeocodeError::NotFound(coordinates.to_string())) })
    }

    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<PlaceDetails, GeocodeError>> {
        Box::pin(async move { Err(GeocodeError::NotFound(query.to_string())) })
    }
}
