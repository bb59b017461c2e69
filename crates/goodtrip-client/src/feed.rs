use std::collections::HashSet;

use futures_util::future::try_join_all;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use goodtrip_types::models::Trip;

use crate::error::ClientResult;
use crate::session::SessionManager;
use crate::social::SocialService;
use crate::trips::TripService;

/// Trips shown in the feed, newest publication first.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    trips: Vec<Trip>,
}

impl Feed {
    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    /// Replace the whole list with `trips`, sorted by publication time, descending.
    pub fn replace(&mut self, mut trips: Vec<Trip>) {
        trips.sort_by(|a, b| b.time_of_publication.cmp(&a.time_of_publication));
        self.trips = trips;
    }
}

#[derive(Clone)]
pub struct FeedService {
    session: SessionManager,
    trips: TripService,
    social: SocialService,
}

impl FeedService {
    pub fn new(session: SessionManager, trips: TripService, social: SocialService) -> Self {
        Self {
            session,
            trips,
            social,
        }
    }

    pub fn with_cancel(&self, cancel: CancellationToken) -> Self {
        Self {
            session: self.session.clone(),
            trips: self.trips.with_cancel(cancel.clone()),
            social: self.social.with_cancel(cancel),
        }
    }

    /// Fetch the user's own trips and those of everyone they follow, then
    /// replace `feed` with the result. On error `feed` is left untouched.
    pub async fn refresh(&self, feed: &mut Feed) -> ClientResult<usize> {
        let user_id = self.session.authorize()?.user_id;

        let (own, following) = tokio::try_join!(
            self.trips.user_trips(user_id),
            self.social.subscriptions(user_id),
        )?;
        let followed = try_join_all(following.iter().map(|p| self.trips.user_trips(p.id))).await?;

        let mut seen = HashSet::new();
        let trips: Vec<Trip> = own
            .into_iter()
            .chain(followed.into_iter().flatten())
            .filter(|trip| seen.insert(trip.id))
            .collect();

        debug!(
            "Feed refreshed: {} trips from {} followed users",
            trips.len(),
            following.len()
        );
        feed.replace(trips);
        Ok(feed.len())
    }
}
