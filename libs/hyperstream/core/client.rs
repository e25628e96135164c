use crate::config::ClientConfig;
use crate::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::codec::FrameReader;
use crate::heartbeat::HeartbeatWatchdog;
use crate::traits::*;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use futures::StreamExt;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Sleep;
use tracing::{debug, info, warn};

/// Internal command messages for client control
#[derive(Debug)]
enum ClientCommand {
    /// Open the stream unless already connecting or connected
    Connect,
    /// Close the stream and cancel any pending retry
    Disconnect,
    /// Disconnect and stop the actor task
    Dispose,
}

/// Notifications raised by a stream client, in the order they occur
#[derive(Debug, Clone)]
pub enum StreamEvent<T> {
    /// The connection state changed
    StateChanged(ConnectionState),
    /// The first bytes arrived on a new connection
    Connected,
    /// A heartbeat frame arrived
    Heartbeat,
    /// A payload frame was decoded
    Message(T),
    /// The connection failed; a retry is scheduled if the policy allows
    Error(StreamError),
    /// The client was disconnected on request
    Disconnected,
}

/// Client metrics snapshot
#[derive(Debug, Clone)]
pub struct Metrics {
    pub connect_attempts: u64,
    pub messages_received: u64,
    pub heartbeats_received: u64,
    pub malformed_frames: u64,
    pub reconnect_count: u64,
    pub connection_state: ConnectionState,
    pub current_backoff: Duration,
}

/// Resilient subscriber for a framed HTTP event stream
///
/// A single actor task owns the connection, the read loop, the retry timer
/// and the heartbeat watchdog, so every state transition is serialized.
/// `connect` and `disconnect` only enqueue a command and return at once;
/// outcomes are reported as [`StreamEvent`]s.
///
/// # Type Parameters
/// - `C`: FrameCodec implementation (determines the message type)
pub struct StreamClient<C>
where
    C: FrameCodec,
{
    /// Client configuration
    config: Arc<ClientConfig<C>>,
    /// Atomic connection state
    state: Arc<AtomicConnectionState>,
    /// Atomic metrics
    metrics: Arc<AtomicMetrics>,
    /// Current backoff interval in milliseconds
    backoff_millis: Arc<AtomicU64>,
    /// Command channel sender
    command_tx: mpsc::UnboundedSender<ClientCommand>,
    /// Event channel receiver
    event_rx: Receiver<StreamEvent<C::Message>>,
    /// Actor task handle
    task_handle: Option<tokio::task::JoinHandle<()>>,
    /// Set once by `dispose`
    disposed: AtomicBool,
}

impl<C> StreamClient<C>
where
    C: FrameCodec,
{
    /// Create a new stream client from configuration
    ///
    /// This is called by the builder's `build()` method.
    /// Use `hyperstream::builder()` to create a client.
    pub(crate) fn new(config: ClientConfig<C>) -> Result<Self> {
        config.settings.validate()?;

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            StreamError::Configuration("stream client must be built inside a tokio runtime".into())
        })?;

        let config = Arc::new(config);
        let state = Arc::new(AtomicConnectionState::new(ConnectionState::Disconnected));
        let metrics = Arc::new(AtomicMetrics::new());
        let backoff = BackoffState::new(config.settings.backoff());
        let backoff_millis = Arc::new(AtomicU64::new(duration_millis(backoff.current())));

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = unbounded();

        let actor = Actor {
            config: Arc::clone(&config),
            state: Arc::clone(&state),
            metrics: Arc::clone(&metrics),
            backoff,
            backoff_millis: Arc::clone(&backoff_millis),
            event_tx,
        };
        let task_handle = runtime.spawn(run_client(actor, command_rx));

        Ok(Self {
            config,
            state,
            metrics,
            backoff_millis,
            command_tx,
            event_rx,
            task_handle: Some(task_handle),
            disposed: AtomicBool::new(false),
        })
    }

    /// Start connecting to the stream
    ///
    /// A no-op when already connecting or connected. Connection failures
    /// arrive as [`StreamEvent::Error`], never as a return value.
    pub fn connect(&self) -> Result<()> {
        self.send_command(ClientCommand::Connect)
    }

    /// Close the stream and cancel any pending reconnection
    ///
    /// A no-op when already disconnecting or disconnected.
    pub fn disconnect(&self) -> Result<()> {
        self.send_command(ClientCommand::Disconnect)
    }

    fn send_command(&self, command: ClientCommand) -> Result<()> {
        if self.is_disposed() {
            return Err(StreamError::Disposed);
        }
        self.command_tx
            .send(command)
            .map_err(|e| StreamError::ChannelClosed(e.to_string()))
    }

    /// Get current connection state
    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Check if connected
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Get the stream endpoint
    pub fn url(&self) -> &str {
        self.config.url()
    }

    /// Interval the next reconnection attempt will wait
    pub fn current_backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_millis.load(Ordering::Acquire))
    }

    /// Get current metrics
    pub fn metrics(&self) -> Metrics {
        Metrics {
            connect_attempts: self.metrics.connect_attempts(),
            messages_received: self.metrics.messages_received(),
            heartbeats_received: self.metrics.heartbeats_received(),
            malformed_frames: self.metrics.malformed_frames(),
            reconnect_count: self.metrics.reconnect_count(),
            connection_state: self.state.get(),
            current_backoff: self.current_backoff(),
        }
    }

    /// Receiver for notifications
    ///
    /// Clones share one queue; each event is delivered to exactly one receiver.
    pub fn events(&self) -> Receiver<StreamEvent<C::Message>> {
        self.event_rx.clone()
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<StreamEvent<C::Message>> {
        self.event_rx.try_recv().ok()
    }

    /// Receive an event (blocking)
    pub fn recv_event(
        &self,
    ) -> std::result::Result<StreamEvent<C::Message>, crossbeam_channel::RecvError> {
        self.event_rx.recv()
    }

    /// Receive an event, giving up after `timeout` (blocking)
    pub fn recv_event_timeout(
        &self,
        timeout: Duration,
    ) -> std::result::Result<StreamEvent<C::Message>, RecvTimeoutError> {
        self.event_rx.recv_timeout(timeout)
    }

    /// Disconnect and release the connection and timer
    ///
    /// Idempotent. Afterwards `connect` and `disconnect` fail with
    /// [`StreamError::Disposed`].
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!("Disposing stream client for {}", self.config.url());
        let _ = self.command_tx.send(ClientCommand::Dispose);
    }

    /// Dispose and wait for the actor task to finish
    pub async fn shutdown(mut self) -> Result<()> {
        info!("Shutting down stream client for {}", self.config.url());
        self.dispose();

        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
        Ok(())
    }
}

impl<C> Drop for StreamClient<C>
where
    C: FrameCodec,
{
    fn drop(&mut self) {
        self.dispose();
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

type OpenFuture = Pin<Box<dyn Future<Output = Result<ByteStream>> + Send>>;

/// A live response body and the frames buffered from it
struct Connection<C: FrameCodec> {
    body: ByteStream,
    reader: FrameReader<C>,
}

/// State owned by the actor task
struct Actor<C: FrameCodec> {
    config: Arc<ClientConfig<C>>,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    backoff: BackoffState,
    backoff_millis: Arc<AtomicU64>,
    event_tx: Sender<StreamEvent<C::Message>>,
}

impl<C: FrameCodec> Actor<C> {
    fn emit(&self, event: StreamEvent<C::Message>) {
        // Nobody listening is fine; the client may be fire-and-forget
        let _ = self.event_tx.send(event);
    }

    fn transition(&self, next: ConnectionState) {
        let previous = self.state.set(next);
        if previous != next {
            debug!("Stream state {} -> {}", previous, next);
            self.emit(StreamEvent::StateChanged(next));
        }
    }

    fn publish_backoff(&self) {
        self.backoff_millis
            .store(duration_millis(self.backoff.current()), Ordering::Release);
    }

    fn connect(&mut self, opening: &mut Option<OpenFuture>, retry: &mut Option<Pin<Box<Sleep>>>) {
        let state = self.state.get();
        if state.is_active() {
            debug!("Connect ignored, stream is already {}", state);
            return;
        }

        // An explicit connect supersedes a scheduled one
        *retry = None;

        self.transition(ConnectionState::Connecting);
        self.metrics.increment_connect_attempts();
        info!("Connecting to {}", self.config.url);

        let transport = Arc::clone(&self.config.transport);
        let header_provider = self.config.headers.clone();
        let url = self.config.url.clone();
        *opening = Some(Box::pin(async move {
            let headers = match header_provider {
                Some(provider) => provider.get_headers().await,
                None => HashMap::new(),
            };
            transport.open(&url, &headers).await
        }));
    }

    fn on_first_bytes(&mut self) {
        info!("Connected to {}", self.config.url);
        self.backoff.reset();
        self.publish_backoff();
        self.transition(ConnectionState::Connected);
        self.emit(StreamEvent::Connected);
    }

    /// Decode every complete frame in `chunk` and raise its notification
    fn process_chunk(&self, connection: &mut Connection<C>, chunk: &[u8]) -> Result<()> {
        connection.reader.push(chunk);

        while let Some(frame) = connection.reader.next_frame()? {
            match frame {
                Frame::Heartbeat => {
                    self.metrics.increment_heartbeats();
                    self.emit(StreamEvent::Heartbeat);
                }
                Frame::Message(message) => {
                    self.metrics.increment_messages();
                    self.emit(StreamEvent::Message(message));
                }
                Frame::Malformed(reason) => {
                    self.metrics.increment_malformed();
                    warn!("Skipping malformed frame: {}", reason);
                }
            }
        }
        Ok(())
    }

    fn fault(&mut self, error: StreamError, retry: &mut Option<Pin<Box<Sleep>>>) {
        warn!("Stream error on {}: {}", self.config.url, error);
        self.transition(ConnectionState::Faulted);
        self.emit(StreamEvent::Error(error));

        if !self.backoff.can_retry() {
            warn!(
                "Reconnection strategy exhausted after {} attempts, staying faulted",
                self.backoff.failures()
            );
            return;
        }

        let delay = self.backoff.current();
        info!(
            "Reconnecting in {:?} (attempt {})",
            delay,
            self.backoff.failures() + 1
        );
        *retry = Some(Box::pin(tokio::time::sleep(delay)));
    }

    fn on_retry_elapsed(
        &mut self,
        opening: &mut Option<OpenFuture>,
        retry: &mut Option<Pin<Box<Sleep>>>,
    ) {
        let state = self.state.get();
        if state != ConnectionState::Faulted {
            debug!("Retry timer elapsed while {}, ignoring", state);
            self.backoff.reset();
            self.publish_backoff();
            return;
        }

        self.metrics.increment_reconnects();
        self.backoff.advance();
        self.publish_backoff();
        self.connect(opening, retry);
    }

    fn disconnect(
        &mut self,
        opening: &mut Option<OpenFuture>,
        connection: &mut Option<Connection<C>>,
        retry: &mut Option<Pin<Box<Sleep>>>,
        watchdog: &mut HeartbeatWatchdog,
    ) {
        let state = self.state.get();
        if state.is_idle() {
            debug!("Disconnect ignored, stream is already {}", state);
            return;
        }

        self.transition(ConnectionState::Disconnecting);

        // Dropping the body closes the transport and interrupts any pending read
        *opening = None;
        *connection = None;
        *retry = None;
        watchdog.disarm();
        self.backoff.reset();
        self.publish_backoff();

        self.transition(ConnectionState::Disconnected);
        self.emit(StreamEvent::Disconnected);
        info!("Disconnected from {}", self.config.url);
    }
}

/// Main actor loop
async fn run_client<C>(mut actor: Actor<C>, mut command_rx: mpsc::UnboundedReceiver<ClientCommand>)
where
    C: FrameCodec,
{
    let mut opening: Option<OpenFuture> = None;
    let mut connection: Option<Connection<C>> = None;
    let mut retry: Option<Pin<Box<Sleep>>> = None;
    let mut watchdog = HeartbeatWatchdog::new(actor.config.settings.heartbeat_timeout);

    loop {
        tokio::select! {
            // Commands first so a disconnect is never starved by a busy stream
            biased;

            command = command_rx.recv() => {
                match command {
                    Some(ClientCommand::Connect) => actor.connect(&mut opening, &mut retry),
                    Some(ClientCommand::Disconnect) => {
                        actor.disconnect(&mut opening, &mut connection, &mut retry, &mut watchdog)
                    }
                    Some(ClientCommand::Dispose) | None => {
                        actor.disconnect(&mut opening, &mut connection, &mut retry, &mut watchdog);
                        break;
                    }
                }
            }

            opened = async {
                match opening.as_mut() {
                    Some(open) => open.await,
                    None => std::future::pending().await,
                }
            } => {
                opening = None;
                match opened {
                    Ok(body) => {
                        debug!("Transport opened, waiting for first bytes");
                        connection = Some(Connection {
                            body,
                            reader: FrameReader::new(Arc::clone(&actor.config.codec)),
                        });
                        watchdog.feed();
                    }
                    Err(e) => actor.fault(e, &mut retry),
                }
            }

            chunk = async {
                match connection.as_mut() {
                    Some(live) => live.body.next().await,
                    None => std::future::pending().await,
                }
            } => {
                let failure = match chunk {
                    Some(Ok(bytes)) if bytes.is_empty() => None,
                    Some(Ok(bytes)) => {
                        watchdog.feed();
                        if actor.state.get() == ConnectionState::Connecting {
                            actor.on_first_bytes();
                        }
                        match connection.as_mut() {
                            Some(live) => actor.process_chunk(live, &bytes).err(),
                            None => None,
                        }
                    }
                    Some(Err(e)) => Some(e),
                    None => Some(StreamError::UnexpectedEndOfStream),
                };

                if let Some(error) = failure {
                    connection = None;
                    watchdog.disarm();
                    actor.fault(error, &mut retry);
                }
            }

            timeout = watchdog.expired() => {
                connection = None;
                watchdog.disarm();
                actor.fault(StreamError::HeartbeatTimeout(timeout), &mut retry);
            }

            _ = async {
                match retry.as_mut() {
                    Some(sleep) => sleep.await,
                    None => std::future::pending().await,
                }
            } => {
                retry = None;
                actor.on_retry_elapsed(&mut opening, &mut retry);
            }
        }
    }

    info!("Stream client task exiting");
}
