use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use goodtrip_types::api::Claims;
use goodtrip_types::models::UserId;

use crate::auth::AppState;

pub async fn followers(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, StatusCode> {
    Ok(Json(state.store.followers(user_id)?))
}

pub async fn subscriptions(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, StatusCode> {
    Ok(Json(state.store.subscriptions(user_id)?))
}

pub async fn follow(
    State(state): State<AppState>,
    Path((user_id, handle)): Path<(UserId, String)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    if claims.sub != user_id {
        return Err(StatusCode::FORBIDDEN);
    }
    state.store.follow(user_id, &handle)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unfollow(
    State(state): State<AppState>,
    Path((user_id, handle)): Path<(UserId, String)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    if claims.sub != user_id {
        return Err(StatusCode::FORBIDDEN);
    }
    state.store.unfollow(user_id, &handle)?;
    Ok(StatusCode::NO_CONTENT)
}
