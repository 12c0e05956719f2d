//! Live map driver
//!
//! Ties the feed client to a [`MapSession`]: the feed task pushes updates
//! into a channel and the owner of the [`LiveMap`] applies them to the
//! session in delivery order.

use crate::api::client::ApiClient;
use crate::core::config::{LocationQuery, ViewerConfig};
use crate::data::location::LocationUpdate;
use crate::feed::client::{ConnectionState, FeedClient};
use crate::layers::reconciler::{MapSession, UpsertOutcome};
use crate::traits::MapSurface;
use crate::Result;
use tokio::sync::mpsc;

pub struct LiveMap<S: MapSurface> {
    session: MapSession<S>,
    updates: mpsc::UnboundedReceiver<LocationUpdate>,
    feed: FeedClient,
}

impl<S: MapSurface> LiveMap<S> {
    /// Connects a default feed client to the configured feed URL.
    pub fn start(session: MapSession<S>, config: &ViewerConfig) -> Result<Self> {
        let url = config.feed_url()?;
        Ok(Self::with_feed(session, FeedClient::new(config), url.as_str()))
    }

    /// Connects `feed` to `url` and routes its updates into `session`.
    pub fn with_feed(session: MapSession<S>, mut feed: FeedClient, url: &str) -> Self {
        let (tx, updates) = mpsc::unbounded_channel();
        feed.connect(url, move |update| {
            if tx.send(update).is_err() {
                log::debug!("live map dropped, discarding update");
            }
        });
        Self {
            session,
            updates,
            feed,
        }
    }

    /// Seeds the map with the last known positions from the REST API.
    /// Returns how many markers were placed.
    pub async fn preload(&mut self, api: &ApiClient, query: &LocationQuery) -> Result<usize> {
        let last = api.last(query).await?;
        let applied = self.session.upsert_all(&last);
        log::info!("preloaded {} of {} last positions", applied, last.len());
        Ok(applied)
    }

    /// Waits for the next feed update and applies it. `None` once the feed
    /// has been shut down.
    pub async fn next(&mut self) -> Option<Result<UpsertOutcome>> {
        let update = self.updates.recv().await?;
        Some(self.session.upsert(&update))
    }

    /// Applies updates until the feed is shut down.
    pub async fn run(&mut self) {
        while let Some(outcome) = self.next().await {
            if let Err(e) = outcome {
                log::warn!("skipping location update: {}", e);
            }
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.feed.state()
    }

    pub fn session(&self) -> &MapSession<S> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut MapSession<S> {
        &mut self.session
    }

    pub fn shutdown(&mut self) {
        self.feed.shutdown();
    }

    /// Stops the feed and hands back the session.
    pub fn into_session(mut self) -> MapSession<S> {
        self.feed.shutdown();
        self.session
    }
}
