use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{CountryVisit, Place, TripId, TripState, UserId};

// -- JWT Claims --

/// Claims carried by bearer tokens issued by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub handle: String,
    pub password: String,
    pub name: String,
    pub surname: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationResponse {
    pub id: UserId,
    pub handle: String,
    pub name: String,
    pub surname: String,
    #[serde(default)]
    pub url: Option<String>,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlHandler {
    pub url: String,
}

// -- Trips --

/// Country visit as sent by the client: no id, names only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddCountryRequest {
    pub country: Place,
    pub cities: Vec<Place>,
}

impl From<&CountryVisit> for AddCountryRequest {
    fn from(visit: &CountryVisit) -> Self {
        Self {
            country: visit.country.clone(),
            cities: visit.cities.clone(),
        }
    }
}

impl From<AddCountryRequest> for CountryVisit {
    fn from(request: AddCountryRequest) -> Self {
        Self {
            id: None,
            country: request.country,
            cities: request.cities,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTripRequest {
    pub name: String,
    pub money_in_usd: i32,
    #[serde(default)]
    pub main_photo_url: Option<String>,
    pub start_trip_date: NaiveDate,
    pub end_trip_date: NaiveDate,
    pub state: TripState,
    #[serde(default)]
    pub places: Vec<Place>,
    #[serde(default)]
    pub countries: Vec<AddCountryRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddNoteRequest {
    pub trip_id: TripId,
    pub text: String,
    #[serde(default)]
    pub photo_url: Option<String>,
}
