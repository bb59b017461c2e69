use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;

use goodtrip_types::api::{
    AuthenticationResponse, AuthorizationRequest, Claims, RegisterRequest, UrlHandler,
};
use goodtrip_types::models::UserId;

use crate::store::{Store, UserRecord};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Store,
    pub jwt_secret: String,
    pub requests: AtomicUsize,
}

impl AppStateInner {
    pub fn new(jwt_secret: impl Into<String>) -> AppState {
        Arc::new(Self {
            store: Store::new(),
            jwt_secret: jwt_secret.into(),
            requests: AtomicUsize::new(0),
        })
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    // Validate input
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.handle.trim().is_empty() || req.handle.contains('/') {
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.password.len() < 8 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let user = state
        .store
        .register(&req.username, &req.handle, &req.password, &req.name, &req.surname)?;
    info!("Registered {} ({})", user.handle, user.id);

    let response = authentication_response(&state.jwt_secret, &user)?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<AuthorizationRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let user = state
        .store
        .user_by_username(&req.username)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if user.password != req.password {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(Json(authentication_response(&state.jwt_secret, &user)?))
}

pub async fn update_photo(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UrlHandler>,
) -> Result<impl IntoResponse, StatusCode> {
    if claims.sub != user_id {
        return Err(StatusCode::FORBIDDEN);
    }
    state.store.set_photo(user_id, &req.url)?;
    Ok(StatusCode::NO_CONTENT)
}

fn authentication_response(
    secret: &str,
    user: &UserRecord,
) -> Result<AuthenticationResponse, StatusCode> {
    let token = create_token(secret, user.id, &user.username)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(AuthenticationResponse {
        id: user.id,
        handle: user.handle.clone(),
        name: user.name.clone(),
        surname: user.surname.clone(),
        url: user.photo_url.clone(),
        token,
    })
}

fn create_token(secret: &str, user_id: UserId, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::minutes(10)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
