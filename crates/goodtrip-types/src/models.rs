use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned identifiers. The client never invents these.
pub type UserId = i64;
pub type TripId = i64;
pub type NoteId = i64;
pub type CountryVisitId = i64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A country or a city. Coordinates are `0,0` when the client doesn't know them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    #[serde(default)]
    pub coordinates: Coordinates,
}

impl Place {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            coordinates: Coordinates::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripState {
    Planned,
    Ongoing,
    Completed,
}

/// A country plus the cities visited in it, in visiting order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryVisit {
    /// Absent until the server has stored the visit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CountryVisitId>,
    pub country: Place,
    #[serde(default)]
    pub cities: Vec<Place>,
}

impl CountryVisit {
    pub fn new(country: impl Into<String>, cities: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            id: None,
            country: Place::named(country),
            cities: cities.into_iter().map(Place::named).collect(),
        }
    }

    pub fn city_names(&self) -> Vec<&str> {
        self.cities.iter().map(|c| c.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub trip_id: TripId,
    pub text: String,
    #[serde(default)]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: TripId,
    pub user_id: UserId,
    pub name: String,
    pub start_trip_date: NaiveDate,
    pub end_trip_date: NaiveDate,
    pub money_in_usd: i32,
    #[serde(default)]
    pub main_photo_url: Option<String>,
    pub state: TripState,
    #[serde(default)]
    pub countries: Vec<CountryVisit>,
    #[serde(default)]
    pub notes: Vec<Note>,
    pub time_of_publication: DateTime<Utc>,
}

/// Another user as returned by the social endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: UserId,
    pub handle: String,
    pub name: String,
    pub surname: String,
    #[serde(default)]
    pub image_link: Option<String>,
}

impl Profile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}
