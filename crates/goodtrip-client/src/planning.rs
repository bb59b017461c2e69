use chrono::NaiveDate;
use thiserror::Error;

use goodtrip_types::api::{AddCountryRequest, AddTripRequest};
use goodtrip_types::models::{CountryVisit, Place, TripState};

pub const MAX_TRIP_NAME_LEN: usize = 32;

/// Dates are typed by the user as `dd.mm.yyyy`.
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Why a draft can't be sent. Checks run in declaration order and the first
/// failure wins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TripValidationError {
    #[error("trip name must not be blank or longer than 32 characters")]
    Name,
    #[error("start date must be a date in dd.mm.yyyy form")]
    StartDate,
    #[error("end date must be a date in dd.mm.yyyy form")]
    EndDate,
    #[error("invalid date order: the trip ends before it starts")]
    DateOrder,
    #[error("budget must be a non-negative whole number of dollars")]
    Budget,
}

/// A trip as typed into the planning form, before validation.
#[derive(Debug, Clone, Default)]
pub struct TripDraft {
    pub name: String,
    pub start_date: String,
    pub end_date: String,
    pub main_photo_url: Option<String>,
    pub money_in_usd: String,
    pub places: Vec<Place>,
    pub countries: Vec<CountryVisit>,
}

impl TripDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn dates(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_date = start.into();
        self.end_date = end.into();
        self
    }

    pub fn budget(mut self, money_in_usd: impl Into<String>) -> Self {
        self.money_in_usd = money_in_usd.into();
        self
    }

    pub fn main_photo(mut self, url: impl Into<String>) -> Self {
        self.main_photo_url = Some(url.into());
        self
    }

    /// Append a place of interest (a landmark, a park) to the itinerary.
    pub fn add_place(&mut self, name: impl Into<String>) -> &mut Self {
        self.places.push(Place::named(name));
        self
    }

    /// Append a visited country with its cities in visiting order.
    pub fn add_country(
        &mut self,
        country: impl Into<String>,
        cities: impl IntoIterator<Item = impl Into<String>>,
    ) -> &mut Self {
        self.countries.push(CountryVisit::new(country, cities));
        self
    }

    /// Turn the draft into an add-trip request for a newly planned trip.
    pub fn validate(&self) -> Result<AddTripRequest, TripValidationError> {
        let name = self.name.trim();
        if name.is_empty() || name.chars().count() > MAX_TRIP_NAME_LEN {
            return Err(TripValidationError::Name);
        }

        let start = parse_date(&self.start_date).ok_or(TripValidationError::StartDate)?;
        let end = parse_date(&self.end_date).ok_or(TripValidationError::EndDate)?;
        if start > end {
            return Err(TripValidationError::DateOrder);
        }

        let money_in_usd = parse_budget(&self.money_in_usd).ok_or(TripValidationError::Budget)?;

        Ok(AddTripRequest {
            name: name.to_string(),
            money_in_usd,
            main_photo_url: self.main_photo_url.clone(),
            start_trip_date: start,
            end_trip_date: end,
            state: TripState::Planned,
            places: self.places.clone(),
            countries: self.countries.iter().map(AddCountryRequest::from).collect(),
        })
    }
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

fn parse_budget(value: &str) -> Option<i32> {
    value.trim().parse::<i32>().ok().filter(|money| *money >= 0)
}
