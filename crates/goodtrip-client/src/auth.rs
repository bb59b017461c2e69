use std::fmt;

use async_trait::async_trait;
use reqwest::Method;
use tokio_util::sync::CancellationToken;

use goodtrip_types::api::{AuthenticationResponse, AuthorizationRequest, RegisterRequest, UrlHandler};
use goodtrip_types::models::UserId;

use crate::error::{ClientError, ClientResult};
use crate::transport::Transport;

const LOGIN_REJECTED: &str = "Username or password are not correct";
const SIGN_UP_REJECTED: &str = "Username is not correct or is already taken";
const PHOTO_REJECTED: &str = "Updating photo failed";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SignUpForm {
    pub credentials: Credentials,
    pub handle: String,
    pub name: String,
    pub surname: String,
}

/// Authentication endpoints. Kept behind a trait so the session manager can
/// be exercised without a backend.
#[async_trait]
pub trait AuthApi: Send + Sync + 'static {
    async fn login(&self, credentials: &Credentials) -> ClientResult<AuthenticationResponse>;

    async fn register(&self, form: &SignUpForm) -> ClientResult<AuthenticationResponse>;

    async fn update_photo(
        &self,
        user_id: UserId,
        url: &str,
        token: &str,
        cancel: &CancellationToken,
    ) -> ClientResult<()>;
}

pub struct HttpAuthApi {
    transport: Transport,
}

impl HttpAuthApi {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, credentials: &Credentials) -> ClientResult<AuthenticationResponse> {
        let request = self
            .transport
            .request(Method::POST, "/auth/login")
            .json(&AuthorizationRequest {
                username: credentials.username.clone(),
                password: credentials.password.clone(),
            });

        self.transport
            .send_json(request, &CancellationToken::new())
            .await
            .map_err(|e| with_rejection_message(e, LOGIN_REJECTED))
    }

    async fn register(&self, form: &SignUpForm) -> ClientResult<AuthenticationResponse> {
        let request = self
            .transport
            .request(Method::POST, "/auth/register")
            .json(&RegisterRequest {
                username: form.credentials.username.clone(),
                handle: form.handle.clone(),
                password: form.credentials.password.clone(),
                name: form.name.clone(),
                surname: form.surname.clone(),
            });

        self.transport
            .send_json(request, &CancellationToken::new())
            .await
            .map_err(|e| with_rejection_message(e, SIGN_UP_REJECTED))
    }

    async fn update_photo(
        &self,
        user_id: UserId,
        url: &str,
        token: &str,
        cancel: &CancellationToken,
    ) -> ClientResult<()> {
        let request = self
            .transport
            .request(Method::POST, &format!("/auth/photo/{}", user_id))
            .bearer_auth(token)
            .json(&UrlHandler { url: url.to_string() });

        self.transport
            .send_empty(request, cancel)
            .await
            .map_err(|e| with_rejection_message(e, PHOTO_REJECTED))
    }
}

/// Replace the server's body with a message fit for the user, keeping the status.
fn with_rejection_message(err: ClientError, message: &str) -> ClientError {
    match err {
        ClientError::Rejected { status, .. } => ClientError::rejected(status, message),
        other => other,
    }
}
