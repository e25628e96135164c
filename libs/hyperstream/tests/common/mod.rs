//! Common test utilities for HyperStream integration tests
//!
//! Provides a scripted in-memory transport, a minimal HTTP server that
//! streams a fixed body, and polling helpers for the event channel.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use crossbeam_channel::Receiver;
use futures::stream;
use futures::StreamExt;
use hyperstream::{ByteStream, ConnectionState, Headers, StreamError, StreamEvent, Transport};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// Payload used by the integration tests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub id: u32,
    pub name: String,
}

impl Update {
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

/// What the next `open` call does
pub enum Script {
    /// Yield these chunks, then end the body
    Close(Vec<Bytes>),
    /// Yield these chunks, then keep the body open forever
    Hold(Vec<Bytes>),
    /// Fail the open with this error
    Refuse(StreamError),
    /// Never finish opening
    Stall,
}

/// In-memory transport that plays back one script per connection attempt
///
/// Clones share the script queue and the counters, so a test can keep a
/// handle after moving the transport into the builder. Once the queue is
/// empty every further open stalls.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    opens: Arc<AtomicUsize>,
    last_headers: Arc<Mutex<Option<Headers>>>,
}

impl ScriptedTransport {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into())),
            ..Default::default()
        }
    }

    pub fn push(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    /// Number of times `open` has been called
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn last_headers(&self) -> Option<Headers> {
        self.last_headers.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, url: &str, headers: &Headers) -> hyperstream::Result<ByteStream> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        *self.last_headers.lock().unwrap() = Some(headers.clone());
        let script = self.scripts.lock().unwrap().pop_front();
        verbose_println!("  open #{} -> {}", self.opens(), url);

        match script.unwrap_or(Script::Stall) {
            Script::Close(chunks) => Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok)))),
            Script::Hold(chunks) => Ok(Box::pin(
                stream::iter(chunks.into_iter().map(Ok)).chain(stream::pending()),
            )),
            Script::Refuse(error) => Err(error),
            Script::Stall => std::future::pending().await,
        }
    }
}

/// Encode an update the way the binary stream carries it
pub fn binary_frame(update: &Update) -> Bytes {
    Bytes::from(hyperstream::encode_binary(update).unwrap())
}

pub fn heartbeat() -> Bytes {
    Bytes::from_static(hyperstream::HEARTBEAT_FRAME)
}

/// Poll the event channel without blocking the runtime
pub async fn next_event<T>(events: &Receiver<StreamEvent<T>>, timeout: Duration) -> Option<StreamEvent<T>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(event) = events.try_recv() {
            return Some(event);
        }
        if Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Collect events until one matches `done`, inclusive
///
/// Panics if nothing matches within `timeout`.
pub async fn collect_until<T, F>(
    events: &Receiver<StreamEvent<T>>,
    timeout: Duration,
    done: F,
) -> Vec<StreamEvent<T>>
where
    T: std::fmt::Debug,
    F: Fn(&StreamEvent<T>) -> bool,
{
    let deadline = Instant::now() + timeout;
    let mut seen = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match next_event(events, remaining).await {
            Some(event) => {
                verbose_println!("  event: {:?}", event);
                let finished = done(&event);
                seen.push(event);
                if finished {
                    return seen;
                }
            }
            None => panic!("timed out waiting for event, saw {:?}", seen),
        }
    }
}

/// Wait for a state change notification carrying `state`
pub async fn wait_for_state<T: std::fmt::Debug>(
    events: &Receiver<StreamEvent<T>>,
    state: ConnectionState,
    timeout: Duration,
) -> Vec<StreamEvent<T>> {
    collect_until(events, timeout, |event| {
        matches!(event, StreamEvent::StateChanged(s) if *s == state)
    })
    .await
}

/// State changes in the order they were observed
pub fn states<T>(events: &[StreamEvent<T>]) -> Vec<ConnectionState> {
    events
        .iter()
        .filter_map(|event| match event {
            StreamEvent::StateChanged(state) => Some(*state),
            _ => None,
        })
        .collect()
}

/// A minimal HTTP/1.1 server that answers every request with one response
///
/// The body has no length, so it ends when the server closes the socket.
/// With `hold_open` the socket stays open until the server is dropped.
pub struct MockHttpServer {
    pub addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    shutdown: Arc<Notify>,
}

impl MockHttpServer {
    pub async fn start(status_line: &'static str, body: Vec<u8>, hold_open: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let shutdown = Arc::new(Notify::new());

        let connections_clone = Arc::clone(&connections);
        let shutdown_clone = Arc::clone(&shutdown);
        let body = Arc::new(body);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                connections_clone.fetch_add(1, Ordering::SeqCst);
                                let shutdown = Arc::clone(&shutdown_clone);
                                let body = Arc::clone(&body);
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, status_line, &body, hold_open, shutdown).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            connections,
            shutdown,
        }
    }

    async fn handle_connection(
        mut stream: tokio::net::TcpStream,
        status_line: &str,
        body: &[u8],
        hold_open: bool,
        shutdown: Arc<Notify>,
    ) {
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }

        let head = format!("{}\r\nContent-Type: application/octet-stream\r\n\r\n", status_line);
        if stream.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        if stream.write_all(body).await.is_err() {
            return;
        }
        let _ = stream.flush().await;

        if hold_open {
            shutdown.notified().await;
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for MockHttpServer {
    fn drop(&mut self) {
        self.shutdown.notify_waiters();
    }
}
