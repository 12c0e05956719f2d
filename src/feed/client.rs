//! Reconnecting live feed client
//!
//! One background task per client: connect, send the subscribe request, hand
//! every location update to the callback, and after any close or failure wait
//! the reconnect delay and start over. Only one retry loop is ever running.

use crate::core::config::ViewerConfig;
use crate::core::constants::SUBSCRIBE_REQUEST;
use crate::data::frame::InboundFrame;
use crate::data::location::LocationUpdate;
use crate::feed::status::LogStatus;
use crate::feed::transport::{Connector, FeedConnection, Inbound, WsConnector};
use crate::runtime::{self, AsyncHandle};
use crate::traits::StatusDisplay;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
        };
        f.write_str(text)
    }
}

pub struct FeedClient {
    connector: Arc<dyn Connector>,
    reconnect_delay: Duration,
    status: Arc<dyn StatusDisplay>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    /// Bumped on every shutdown; only the loop started in the current
    /// generation may publish state.
    generation: Arc<Mutex<u64>>,
    task: Option<Box<dyn AsyncHandle>>,
}

impl FeedClient {
    pub fn new(config: &ViewerConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Closed);
        Self {
            connector: Arc::new(WsConnector),
            reconnect_delay: config.reconnect_delay(),
            status: Arc::new(LogStatus),
            state_tx: Arc::new(state_tx),
            generation: Arc::new(Mutex::new(0)),
            task: None,
        }
    }

    pub fn with_connector(mut self, connector: impl Connector) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    pub fn with_status(mut self, status: impl StatusDisplay + 'static) -> Self {
        self.status = Arc::new(status);
        self
    }

    /// Starts the feed loop against `url`. Any loop started earlier by this
    /// client is stopped first.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect<F>(&mut self, url: impl Into<String>, on_update: F)
    where
        F: FnMut(LocationUpdate) + Send + 'static,
    {
        self.shutdown();

        let feed = FeedLoop {
            url: url.into(),
            connector: Arc::clone(&self.connector),
            reconnect_delay: self.reconnect_delay,
            status: Arc::clone(&self.status),
            publisher: StatePublisher {
                state_tx: Arc::clone(&self.state_tx),
                status: Arc::clone(&self.status),
                id: *lock(&self.generation),
                generation: Arc::clone(&self.generation),
            },
        };
        log::info!("starting live feed for {}", feed.url);
        self.task = Some(runtime::spawn(feed.run(on_update)));
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |task| !task.is_finished())
    }

    /// Stops the feed loop, if one is running. A poll of the old loop that is
    /// still in flight can no longer change the published state.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.cancel();
            let mut generation = lock(&self.generation);
            *generation += 1;
            set_state(&self.state_tx, &*self.status, ConnectionState::Closed);
        }
    }
}

impl Drop for FeedClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct FeedLoop {
    url: String,
    connector: Arc<dyn Connector>,
    reconnect_delay: Duration,
    status: Arc<dyn StatusDisplay>,
    publisher: StatePublisher,
}

impl FeedLoop {
    async fn run<F>(self, mut on_update: F)
    where
        F: FnMut(LocationUpdate) + Send + 'static,
    {
        // Also covers a loop that dies without a shutdown, e.g. a panicking callback.
        let _closed = ClosedOnDrop(self.publisher.clone());

        loop {
            self.publisher.publish(ConnectionState::Connecting);

            match self.connector.connect(&self.url).await {
                Ok(mut connection) => {
                    self.publisher.publish(ConnectionState::Open);
                    self.pump(&mut *connection, &mut on_update).await;
                }
                Err(e) => log::warn!("live feed connection to {} failed: {}", self.url, e),
            }

            self.publisher.publish(ConnectionState::Closed);
            log::debug!("reconnecting in {:?}", self.reconnect_delay);
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// Reads one connection until it ends.
    async fn pump<F>(&self, connection: &mut dyn FeedConnection, on_update: &mut F)
    where
        F: FnMut(LocationUpdate),
    {
        if let Err(e) = connection.send_text(SUBSCRIBE_REQUEST).await {
            log::error!("failed to request last positions: {}", e);
            return;
        }

        while let Some(item) = connection.recv().await {
            match item {
                Ok(Inbound::Text(text)) => self.dispatch(&text, on_update),
                Ok(Inbound::Ping) => log::debug!("live feed ping"),
                Ok(Inbound::Close) => {
                    log::info!("live feed closed by server");
                    break;
                }
                Err(e) => {
                    log::error!("live feed error: {}", e);
                    break;
                }
            }
        }
    }

    fn dispatch<F>(&self, text: &str, on_update: &mut F)
    where
        F: FnMut(LocationUpdate),
    {
        match InboundFrame::parse(text) {
            Ok(InboundFrame::KeepAlive) => {}
            Ok(InboundFrame::Payload { label, location }) => {
                if let Some(label) = label {
                    self.status.label(&label);
                }
                if let Some(location) = location {
                    on_update(location);
                }
            }
            Err(e) => log::debug!("ignoring feed frame: {}", e),
        }
    }
}

/// State publishing handle of one feed loop
#[derive(Clone)]
struct StatePublisher {
    state_tx: Arc<watch::Sender<ConnectionState>>,
    status: Arc<dyn StatusDisplay>,
    generation: Arc<Mutex<u64>>,
    id: u64,
}

impl StatePublisher {
    /// Publishes `state` unless the client has moved on to a newer generation.
    fn publish(&self, state: ConnectionState) {
        let generation = lock(&self.generation);
        if *generation == self.id {
            set_state(&self.state_tx, &*self.status, state);
        }
    }
}

struct ClosedOnDrop(StatePublisher);

impl Drop for ClosedOnDrop {
    fn drop(&mut self) {
        self.0.publish(ConnectionState::Closed);
    }
}

fn lock(generation: &Mutex<u64>) -> MutexGuard<'_, u64> {
    generation.lock().unwrap_or_else(PoisonError::into_inner)
}

fn set_state(
    state_tx: &watch::Sender<ConnectionState>,
    status: &dyn StatusDisplay,
    state: ConnectionState,
) {
    let previous = state_tx.send_replace(state);
    if previous != state {
        status.connection_changed(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::time::Instant;

    /// Each connect pops the next script; an exhausted list fails the connect.
    #[derive(Clone, Default)]
    struct ScriptedConnector {
        scripts: Arc<Mutex<VecDeque<Vec<Inbound>>>>,
        attempts: Arc<Mutex<Vec<(String, Instant)>>>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedConnector {
        fn with_scripts(scripts: Vec<Vec<Inbound>>) -> Self {
            let connector = Self::default();
            connector.scripts.lock().unwrap().extend(scripts);
            connector
        }

        fn attempt_times(&self) -> Vec<Instant> {
            self.attempts.lock().unwrap().iter().map(|(_, at)| *at).collect()
        }
    }

    struct ScriptedConnection {
        inbound: VecDeque<Inbound>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        async fn connect(&self, url: &str) -> crate::Result<Box<dyn FeedConnection>> {
            self.attempts.lock().unwrap().push((url.to_string(), Instant::now()));
            match self.scripts.lock().unwrap().pop_front() {
                Some(inbound) => Ok(Box::new(ScriptedConnection {
                    inbound: inbound.into(),
                    sent: Arc::clone(&self.sent),
                })),
                None => Err(Error::ApiUnavailable("connection refused".to_string())),
            }
        }
    }

    #[async_trait]
    impl FeedConnection for ScriptedConnection {
        async fn send_text(&mut self, text: &str) -> crate::Result<()> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn recv(&mut self) -> Option<crate::Result<Inbound>> {
            self.inbound.pop_front().map(Ok)
        }
    }

    #[derive(Clone, Default)]
    struct RecordingStatus {
        labels: Arc<Mutex<Vec<String>>>,
    }

    impl StatusDisplay for RecordingStatus {
        fn connection_changed(&self, _state: ConnectionState) {}

        fn label(&self, text: &str) {
            self.labels.lock().unwrap().push(text.to_string());
        }
    }

    fn text(s: &str) -> Inbound {
        Inbound::Text(s.to_string())
    }

    fn collector() -> (
        Arc<Mutex<Vec<LocationUpdate>>>,
        impl FnMut(LocationUpdate) + Send + 'static,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |update| sink.lock().unwrap().push(update))
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_on_fixed_delay() {
        let connector = ScriptedConnector::default();
        let mut client = FeedClient::new(&ViewerConfig::default()).with_connector(connector.clone());
        let (_, on_update) = collector();

        client.connect("ws://recorder.invalid/ws/last", on_update);
        tokio::time::sleep(Duration::from_millis(9500)).await;
        client.shutdown();

        let times = connector.attempt_times();
        assert_eq!(times.len(), 4);
        for pair in times.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::from_millis(3000));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribes_and_delivers_locations() {
        let connector = ScriptedConnector::with_scripts(vec![vec![
            text(r#"{"_type":"location","topic":"owntracks/jane/phone","lat":48.1,"lon":11.5}"#),
            text(""),
            Inbound::Ping,
            text(r#"{"_type":"location","topic":"owntracks/joe/car","lat":1.0,"lon":2.0}"#),
            Inbound::Close,
        ]]);
        let mut client = FeedClient::new(&ViewerConfig::default()).with_connector(connector.clone());
        let (seen, on_update) = collector();

        client.connect("ws://recorder.invalid/ws/last", on_update);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(*connector.sent.lock().unwrap(), vec!["LAST".to_string()]);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].topic.as_deref(), Some("owntracks/jane/phone"));
        assert_eq!(seen[1].lon, 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignores_malformed_frames() {
        let connector = ScriptedConnector::with_scripts(vec![vec![
            text("not json"),
            text(r#"{"topic":"owntracks/jane/phone","lat":1.0,"lon":2.0}"#),
            text(r#"{"_type":"transition","lat":1.0,"lon":2.0}"#),
            text(r#"{"_type":"location","topic":"owntracks/jane/phone"}"#),
        ]]);
        let status = RecordingStatus::default();
        let mut client = FeedClient::new(&ViewerConfig::default())
            .with_connector(connector)
            .with_status(status.clone());
        let (seen, on_update) = collector();

        client.connect("ws://recorder.invalid/ws/last", on_update);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(seen.lock().unwrap().is_empty());
        assert!(client.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_forwards_status_label() {
        let connector = ScriptedConnector::with_scripts(vec![vec![text(
            r#"{"_label":"3 devices","_type":"location","topic":"owntracks/a/b","lat":0.5,"lon":0.5}"#,
        )]]);
        let status = RecordingStatus::default();
        let mut client = FeedClient::new(&ViewerConfig::default())
            .with_connector(connector)
            .with_status(status.clone());
        let (seen, on_update) = collector();

        client.connect("ws://recorder.invalid/ws/last", on_update);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(*status.labels.lock().unwrap(), vec!["3 devices".to_string()]);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_after_close_resubscribes() {
        let connector = ScriptedConnector::with_scripts(vec![
            vec![Inbound::Close],
            vec![Inbound::Close],
            vec![Inbound::Close],
        ]);
        let mut client = FeedClient::new(&ViewerConfig::default()).with_connector(connector.clone());
        let (_, on_update) = collector();

        client.connect("ws://recorder.invalid/ws/last", on_update);
        tokio::time::sleep(Duration::from_millis(6100)).await;
        client.shutdown();

        let times = connector.attempt_times();
        assert_eq!(times.len(), 3);
        for pair in times.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::from_millis(3000));
        }
        assert_eq!(connector.sent.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_label_kept_when_location_is_malformed() {
        let connector = ScriptedConnector::with_scripts(vec![vec![text(
            r#"{"_label":"2 online","_type":"location","topic":"owntracks/a/b"}"#,
        )]]);
        let status = RecordingStatus::default();
        let mut client = FeedClient::new(&ViewerConfig::default())
            .with_connector(connector)
            .with_status(status.clone());
        let (seen, on_update) = collector();

        client.connect("ws://recorder.invalid/ws/last", on_update);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(*status.labels.lock().unwrap(), vec!["2 online".to_string()]);
        assert!(seen.lock().unwrap().is_empty());
    }

    /// Blocks its worker inside `connect`, then hands out a connection that
    /// never yields a frame.
    struct BlockingConnector {
        block: Duration,
    }

    struct SilentConnection;

    #[async_trait]
    impl Connector for BlockingConnector {
        async fn connect(&self, _url: &str) -> crate::Result<Box<dyn FeedConnection>> {
            std::thread::sleep(self.block);
            Ok(Box::new(SilentConnection))
        }
    }

    #[async_trait]
    impl FeedConnection for SilentConnection {
        async fn send_text(&mut self, _text: &str) -> crate::Result<()> {
            Ok(())
        }

        async fn recv(&mut self) -> Option<crate::Result<Inbound>> {
            futures::future::pending().await
        }
    }

    #[derive(Clone, Default)]
    struct StateLog {
        states: Arc<Mutex<Vec<ConnectionState>>>,
    }

    impl StatusDisplay for StateLog {
        fn connection_changed(&self, state: ConnectionState) {
            self.states.lock().unwrap().push(state);
        }

        fn label(&self, _text: &str) {}
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_during_connect_ends_closed() {
        let log = StateLog::default();
        let mut client = FeedClient::new(&ViewerConfig::default())
            .with_connector(BlockingConnector {
                block: Duration::from_millis(200),
            })
            .with_status(log.clone());

        client.connect("ws://recorder.invalid/ws/last", |_| {});
        tokio::time::sleep(Duration::from_millis(50)).await;
        // The loop is stuck inside connect and will publish `Open` after this.
        client.shutdown();
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(log.states.lock().unwrap().last(), Some(&ConnectionState::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_connect_replaces_first_loop() {
        let connector = ScriptedConnector::default();
        let mut client = FeedClient::new(&ViewerConfig::default()).with_connector(connector.clone());

        client.connect("ws://first.invalid/ws/last", |_| {});
        tokio::time::sleep(Duration::from_millis(100)).await;
        client.connect("ws://second.invalid/ws/last", |_| {});
        tokio::time::sleep(Duration::from_millis(6100)).await;
        client.shutdown();

        let attempts = connector.attempts.lock().unwrap();
        let first = attempts.iter().filter(|(url, _)| url.contains("first")).count();
        let second = attempts.iter().filter(|(url, _)| url.contains("second")).count();
        assert_eq!(first, 1);
        assert_eq!(second, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_transitions() {
        let connector = ScriptedConnector::with_scripts(vec![vec![]]);
        let mut client = FeedClient::new(&ViewerConfig::default()).with_connector(connector);
        assert_eq!(client.state(), ConnectionState::Closed);

        client.connect("ws://recorder.invalid/ws/last", |_| {});
        tokio::time::sleep(Duration::from_millis(100)).await;
        // The scripted connection ends at once, so the loop is waiting to retry.
        assert_eq!(client.state(), ConnectionState::Closed);
        assert!(client.is_running());

        client.shutdown();
        assert!(!client.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dead_loop_publishes_closed() {
        let connector = ScriptedConnector::with_scripts(vec![vec![text(
            r#"{"_type":"location","topic":"owntracks/jane/phone","lat":1.0,"lon":2.0}"#,
        )]]);
        let mut client = FeedClient::new(&ViewerConfig::default()).with_connector(connector);

        client.connect("ws://recorder.invalid/ws/last", |_| panic!("callback failed"));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!client.is_running());
        assert_eq!(client.state(), ConnectionState::Closed);
    }
}
