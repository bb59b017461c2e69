use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use goodtrip_types::api::{AddCountryRequest, AddNoteRequest, AddTripRequest, Claims};
use goodtrip_types::models::{CountryVisitId, NoteId, TripId, UserId};

use crate::auth::AppState;

/// Trips of any user are readable by every authenticated user; only the
/// owner may change them.
pub async fn user_trips(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, StatusCode> {
    Ok(Json(state.store.trips_of(user_id)?))
}

pub async fn get_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<TripId>,
) -> Result<impl IntoResponse, StatusCode> {
    Ok(Json(state.store.trip(trip_id)?))
}

pub async fn add_trip(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddTripRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if claims.sub != user_id {
        return Err(StatusCode::FORBIDDEN);
    }
    let trip = state.store.add_trip(user_id, req)?;
    info!("{} created trip {} '{}'", claims.username, trip.id, trip.name);
    Ok((StatusCode::CREATED, Json(trip)))
}

pub async fn delete_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<TripId>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    state.store.delete_trip(claims.sub, trip_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_note(
    State(state): State<AppState>,
    Path(note_id): Path<NoteId>,
) -> Result<impl IntoResponse, StatusCode> {
    Ok(Json(state.store.note(note_id)?))
}

pub async fn add_note(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddNoteRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if claims.sub != user_id {
        return Err(StatusCode::FORBIDDEN);
    }
    let note = state.store.add_note(user_id, req)?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path(note_id): Path<NoteId>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    state.store.delete_note(claims.sub, note_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_country_visit(
    State(state): State<AppState>,
    Path(trip_id): Path<TripId>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddCountryRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let visit = state.store.add_country_visit(claims.sub, trip_id, req)?;
    Ok((StatusCode::CREATED, Json(visit)))
}

pub async fn delete_country_visit(
    State(state): State<AppState>,
    Path(visit_id): Path<CountryVisitId>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    state.store.delete_country_visit(claims.sub, visit_id)?;
    Ok(StatusCode::NO_CONTENT)
}
