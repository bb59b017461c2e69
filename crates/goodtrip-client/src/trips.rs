use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::info;

use goodtrip_types::api::{AddCountryRequest, AddNoteRequest, AddTripRequest};
use goodtrip_types::models::{CountryVisit, CountryVisitId, Note, NoteId, Trip, TripId, UserId};

use crate::error::ClientResult;
use crate::planning::TripDraft;
use crate::session::SessionManager;
use crate::transport::{Transport, cancellable};

/// Trip, note and country-visit endpoints under `/trip`.
///
/// Every call takes its bearer token from the session and fails with
/// `NotAuthenticated` before anything is sent when there is none.
#[derive(Clone)]
pub struct TripService {
    transport: Transport,
    session: SessionManager,
    cancel: Option<CancellationToken>,
}

impl TripService {
    pub fn new(transport: Transport, session: SessionManager) -> Self {
        Self {
            transport,
            session,
            cancel: None,
        }
    }

    /// A copy of this service whose calls also stop when `cancel` fires.
    pub fn with_cancel(&self, cancel: CancellationToken) -> Self {
        Self {
            cancel: Some(cancel),
            ..self.clone()
        }
    }

    pub async fn user_trips(&self, user_id: UserId) -> ClientResult<Vec<Trip>> {
        self.get(&format!("/trip/all/{}", user_id)).await
    }

    /// Trips of the logged-in user.
    pub async fn my_trips(&self) -> ClientResult<Vec<Trip>> {
        let user_id = self.session.authorize()?.user_id;
        self.user_trips(user_id).await
    }

    pub async fn trip(&self, trip_id: TripId) -> ClientResult<Trip> {
        self.get(&format!("/trip/{}", trip_id)).await
    }

    /// Post a trip for the logged-in user; the server answers with the stored trip.
    pub async fn add_trip(&self, request: &AddTripRequest) -> ClientResult<Trip> {
        let auth = self.session.authorize()?;
        let builder = self
            .transport
            .request(Method::POST, &format!("/trip/{}", auth.user_id))
            .bearer_auth(&auth.token)
            .json(request);

        let trip: Trip = cancellable(
            self.cancel.as_ref(),
            self.transport.send_json(builder, &auth.cancel),
        )
        .await?;
        info!("Trip {} '{}' created", trip.id, trip.name);
        Ok(trip)
    }

    /// Validate a planning draft and post it. Nothing is sent for an invalid draft.
    pub async fn create_trip(&self, draft: &TripDraft) -> ClientResult<Trip> {
        let request = draft.validate()?;
        self.add_trip(&request).await
    }

    pub async fn delete_trip(&self, trip_id: TripId) -> ClientResult<()> {
        self.delete(&format!("/trip/{}", trip_id)).await
    }

    pub async fn note(&self, note_id: NoteId) -> ClientResult<Note> {
        self.get(&format!("/trip/note/{}", note_id)).await
    }

    pub async fn add_note(&self, request: &AddNoteRequest) -> ClientResult<Note> {
        let auth = self.session.authorize()?;
        let builder = self
            .transport
            .request(Method::POST, &format!("/trip/note/{}", auth.user_id))
            .bearer_auth(&auth.token)
            .json(request);

        cancellable(
            self.cancel.as_ref(),
            self.transport.send_json(builder, &auth.cancel),
        )
        .await
    }

    pub async fn delete_note(&self, note_id: NoteId) -> ClientResult<()> {
        self.delete(&format!("/trip/note/{}", note_id)).await
    }

    pub async fn add_country_visit(
        &self,
        trip_id: TripId,
        visit: &CountryVisit,
    ) -> ClientResult<CountryVisit> {
        let auth = self.session.authorize()?;
        let builder = self
            .transport
            .request(Method::POST, &format!("/trip/country/{}", trip_id))
            .bearer_auth(&auth.token)
            .json(&AddCountryRequest::from(visit));

        cancellable(
            self.cancel.as_ref(),
            self.transport.send_json(builder, &auth.cancel),
        )
        .await
    }

    pub async fn delete_country_visit(&self, visit_id: CountryVisitId) -> ClientResult<()> {
        self.delete(&format!("/trip/country/{}", visit_id)).await
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let auth = self.session.authorize()?;
        let builder = self
            .transport
            .request(Method::GET, path)
            .bearer_auth(&auth.token);

        cancellable(
            self.cancel.as_ref(),
            self.transport.send_json(builder, &auth.cancel),
        )
        .await
    }

    async fn delete(&self, path: &str) -> ClientResult<()> {
        let auth = self.session.authorize()?;
        let builder = self
            .transport
            .request(Method::DELETE, path)
            .bearer_auth(&auth.token);

        cancellable(
            self.cancel.as_ref(),
            self.transport.send_empty(builder, &auth.cancel),
        )
        .await
    }
}
