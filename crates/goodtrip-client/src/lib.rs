//! GoodTrip client core.
//!
//! [`GoodTripClient`] is built once per app start and handed to whoever
//! needs it. It owns the HTTP transport, the session (login, logout and
//! token refresh) and the services that talk to the trip, social and feed
//! endpoints. All services share the session, so logging out stops every
//! authenticated call at once.

pub mod auth;
pub mod config;
pub mod error;
pub mod feed;
pub mod planning;
pub mod session;
pub mod social;
pub mod transport;
pub mod trips;

use std::sync::Arc;

pub use auth::{AuthApi, Credentials, HttpAuthApi, SignUpForm};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, ErrorKind};
pub use feed::{Feed, FeedService};
pub use planning::{TripDraft, TripValidationError};
pub use session::{Authorization, Session, SessionManager};
pub use social::SocialService;
pub use transport::Transport;
pub use trips::TripService;

pub use goodtrip_types as types;

#[derive(Clone)]
pub struct GoodTripClient {
    config: ClientConfig,
    session: SessionManager,
    trips: TripService,
    social: SocialService,
    feed: FeedService,
}

impl GoodTripClient {
    /// Must be called from within a Tokio runtime: the session actor is
    /// spawned here.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let transport = Transport::new(&config)?;
        let api = Arc::new(HttpAuthApi::new(transport.clone()));
        Ok(Self::assemble(config, transport, api))
    }

    /// Like [`GoodTripClient::new`], with a custom authentication backend.
    pub fn with_auth_api(config: ClientConfig, api: Arc<dyn AuthApi>) -> ClientResult<Self> {
        let transport = Transport::new(&config)?;
        Ok(Self::assemble(config, transport, api))
    }

    fn assemble(config: ClientConfig, transport: Transport, api: Arc<dyn AuthApi>) -> Self {
        let session = SessionManager::new(api, config.refresh_interval);
        let trips = TripService::new(transport.clone(), session.clone());
        let social = SocialService::new(transport, session.clone());
        let feed = FeedService::new(session.clone(), trips.clone(), social.clone());

        Self {
            config,
            session,
            trips,
            social,
            feed,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn trips(&self) -> &TripService {
        &self.trips
    }

    pub fn social(&self) -> &SocialService {
        &self.social
    }

    pub fn feed(&self) -> &FeedService {
        &self.feed
    }
}
