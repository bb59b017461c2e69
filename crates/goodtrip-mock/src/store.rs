//! In-memory backing store. One mutex around everything: the mock serves a
//! handful of test clients, not production traffic.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::error;

use goodtrip_types::api::{AddCountryRequest, AddNoteRequest, AddTripRequest};
use goodtrip_types::models::{CountryVisit, CountryVisitId, Note, NoteId, Profile, Trip, TripId, UserId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("not allowed for this user")]
    Forbidden,
    #[error("already exists")]
    Conflict,
    #[error("invalid request: {0}")]
    Invalid(&'static str),
    #[error("store lock poisoned")]
    Poisoned,
}

impl From<StoreError> for StatusCode {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => StatusCode::NOT_FOUND,
            StoreError::Forbidden => StatusCode::FORBIDDEN,
            StoreError::Conflict => StatusCode::CONFLICT,
            StoreError::Invalid(_) => StatusCode::BAD_REQUEST,
            StoreError::Poisoned => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub handle: String,
    pub password: String,
    pub name: String,
    pub surname: String,
    pub photo_url: Option<String>,
}

impl UserRecord {
    pub fn profile(&self) -> Profile {
        Profile {
            id: self.id,
            handle: self.handle.clone(),
            name: self.name.clone(),
            surname: self.surname.clone(),
            image_link: self.photo_url.clone(),
        }
    }
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    last_published: Option<DateTime<Utc>>,
    users: BTreeMap<UserId, UserRecord>,
    trips: BTreeMap<TripId, Trip>,
    /// (follower, followed)
    follows: BTreeSet<(UserId, UserId)>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Strictly increasing, so trips created back to back still sort.
    fn publication_time(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let time = match self.last_published {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        self.last_published = Some(time);
        time
    }

    fn owned_trip_mut(&mut self, trip_id: TripId, user_id: UserId) -> StoreResult<&mut Trip> {
        let trip = self.trips.get_mut(&trip_id).ok_or(StoreError::NotFound)?;
        if trip.user_id != user_id {
            return Err(StoreError::Forbidden);
        }
        Ok(trip)
    }
}

#[derive(Default)]
pub struct Store {
    inner: Mutex<Inner>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|e| {
            error!("Store lock poisoned: {}", e);
            StoreError::Poisoned
        })
    }

    // -- Users --

    pub fn register(
        &self,
        username: &str,
        handle: &str,
        password: &str,
        name: &str,
        surname: &str,
    ) -> StoreResult<UserRecord> {
        let mut inner = self.lock()?;
        if inner
            .users
            .values()
            .any(|u| u.username == username || u.handle == handle)
        {
            return Err(StoreError::Conflict);
        }

        let user = UserRecord {
            id: inner.next_id(),
            username: username.to_string(),
            handle: handle.to_string(),
            password: password.to_string(),
            name: name.to_string(),
            surname: surname.to_string(),
            photo_url: None,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    pub fn user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    pub fn set_photo(&self, user_id: UserId, url: &str) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let user = inner.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.photo_url = Some(url.to_string());
        Ok(())
    }

    // -- Trips --

    pub fn trips_of(&self, user_id: UserId) -> StoreResult<Vec<Trip>> {
        Ok(self
            .lock()?
            .trips
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    pub fn trip(&self, trip_id: TripId) -> StoreResult<Trip> {
        self.lock()?
            .trips
            .get(&trip_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    pub fn add_trip(&self, user_id: UserId, request: AddTripRequest) -> StoreResult<Trip> {
        if request.name.trim().is_empty() {
            return Err(StoreError::Invalid("trip name is blank"));
        }
        if request.start_trip_date > request.end_trip_date {
            return Err(StoreError::Invalid("trip ends before it starts"));
        }

        let mut inner = self.lock()?;
        if !inner.users.contains_key(&user_id) {
            return Err(StoreError::NotFound);
        }

        let countries = request
            .countries
            .into_iter()
            .map(|c| stored_visit(&mut inner, c))
            .collect();

        let trip = Trip {
            id: inner.next_id(),
            user_id,
            name: request.name,
            start_trip_date: request.start_trip_date,
            end_trip_date: request.end_trip_date,
            money_in_usd: request.money_in_usd,
            main_photo_url: request.main_photo_url,
            state: request.state,
            countries,
            notes: vec![],
            time_of_publication: inner.publication_time(),
        };
        inner.trips.insert(trip.id, trip.clone());
        Ok(trip)
    }

    pub fn delete_trip(&self, user_id: UserId, trip_id: TripId) -> StoreResult<()> {
        let mut inner = self.lock()?;
        inner.owned_trip_mut(trip_id, user_id)?;
        inner.trips.remove(&trip_id);
        Ok(())
    }

    // -- Notes --

    pub fn note(&self, note_id: NoteId) -> StoreResult<Note> {
        self.lock()?
            .trips
            .values()
            .flat_map(|t| t.notes.iter())
            .find(|n| n.id == note_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    pub fn add_note(&self, user_id: UserId, request: AddNoteRequest) -> StoreResult<Note> {
        let mut inner = self.lock()?;
        inner.owned_trip_mut(request.trip_id, user_id)?;

        let note = Note {
            id: inner.next_id(),
            trip_id: request.trip_id,
            text: request.text,
            photo_url: request.photo_url,
        };
        inner.owned_trip_mut(request.trip_id, user_id)?.notes.push(note.clone());
        Ok(note)
    }

    pub fn delete_note(&self, user_id: UserId, note_id: NoteId) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let trip = inner
            .trips
            .values_mut()
            .find(|t| t.notes.iter().any(|n| n.id == note_id))
            .ok_or(StoreError::NotFound)?;
        if trip.user_id != user_id {
            return Err(StoreError::Forbidden);
        }
        trip.notes.retain(|n| n.id != note_id);
        Ok(())
    }

    // -- Country visits --

    pub fn add_country_visit(
        &self,
        user_id: UserId,
        trip_id: TripId,
        request: AddCountryRequest,
    ) -> StoreResult<CountryVisit> {
        let mut inner = self.lock()?;
        inner.owned_trip_mut(trip_id, user_id)?;

        let visit = stored_visit(&mut inner, request);
        inner.owned_trip_mut(trip_id, user_id)?.countries.push(visit.clone());
        Ok(visit)
    }

    pub fn delete_country_visit(&self, user_id: UserId, visit_id: CountryVisitId) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let trip = inner
            .trips
            .values_mut()
            .find(|t| t.countries.iter().any(|c| c.id == Some(visit_id)))
            .ok_or(StoreError::NotFound)?;
        if trip.user_id != user_id {
            return Err(StoreError::Forbidden);
        }
        trip.countries.retain(|c| c.id != Some(visit_id));
        Ok(())
    }

    // -- Social --

    pub fn follow(&self, follower: UserId, handle: &str) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let followed = inner
            .users
            .values()
            .find(|u| u.handle == handle)
            .map(|u| u.id)
            .ok_or(StoreError::NotFound)?;
        if followed == follower {
            return Err(StoreError::Invalid("users cannot follow themselves"));
        }
        inner.follows.insert((follower, followed));
        Ok(())
    }

    pub fn unfollow(&self, follower: UserId, handle: &str) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let followed = inner
            .users
            .values()
            .find(|u| u.handle == handle)
            .map(|u| u.id)
            .ok_or(StoreError::NotFound)?;
        inner.follows.remove(&(follower, followed));
        Ok(())
    }

    pub fn followers(&self, user_id: UserId) -> StoreResult<Vec<Profile>> {
        let inner = self.lock()?;
        Ok(inner
            .follows
            .iter()
            .filter(|(_, followed)| *followed == user_id)
            .filter_map(|(follower, _)| inner.users.get(follower))
            .map(UserRecord::profile)
            .collect())
    }

    pub fn subscriptions(&self, user_id: UserId) -> StoreResult<Vec<Profile>> {
        let inner = self.lock()?;
        Ok(inner
            .follows
            .iter()
            .filter(|(follower, _)| *follower == user_id)
            .filter_map(|(_, followed)| inner.users.get(followed))
            .map(UserRecord::profile)
            .collect())
    }
}

fn stored_visit(inner: &mut Inner, request: AddCountryRequest) -> CountryVisit {
    let mut visit = CountryVisit::from(request);
    visit.id = Some(inner.next_id());
    visit
}
