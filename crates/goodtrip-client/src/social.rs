use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::info;

use goodtrip_types::models::{Profile, UserId};

use crate::error::ClientResult;
use crate::session::SessionManager;
use crate::transport::{Transport, cancellable};

/// Followers and subscriptions under `/users`.
#[derive(Clone)]
pub struct SocialService {
    transport: Transport,
    session: SessionManager,
    cancel: Option<CancellationToken>,
}

impl SocialService {
    pub fn new(transport: Transport, session: SessionManager) -> Self {
        Self {
            transport,
            session,
            cancel: None,
        }
    }

    pub fn with_cancel(&self, cancel: CancellationToken) -> Self {
        Self {
            cancel: Some(cancel),
            ..self.clone()
        }
    }

    /// Users following `user_id`.
    pub async fn followers(&self, user_id: UserId) -> ClientResult<Vec<Profile>> {
        self.list(&format!("/users/{}/followers", user_id)).await
    }

    /// Users that `user_id` follows.
    pub async fn subscriptions(&self, user_id: UserId) -> ClientResult<Vec<Profile>> {
        self.list(&format!("/users/{}/subscriptions", user_id)).await
    }

    pub async fn follow(&self, handle: &str) -> ClientResult<()> {
        self.change(Method::POST, handle).await?;
        info!("Now following {}", handle);
        Ok(())
    }

    pub async fn unfollow(&self, handle: &str) -> ClientResult<()> {
        self.change(Method::DELETE, handle).await?;
        info!("Stopped following {}", handle);
        Ok(())
    }

    async fn list(&self, path: &str) -> ClientResult<Vec<Profile>> {
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

    async fn change(&self, method: Method, handle: &str) -> ClientResult<()> {
        let auth = self.session.authorize()?;
        let user_id = auth.user_id.to_string();
        let builder = self
            .transport
            .request_segments(method, &["users", &user_id, "follow", handle])?
            .bearer_auth(&auth.token);

        cancellable(
            self.cancel.as_ref(),
            self.transport.send_empty(builder, &auth.cancel),
        )
        .await
    }
}
