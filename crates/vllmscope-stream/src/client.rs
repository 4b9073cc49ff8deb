use std::marker::PhantomData;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use vllmscope_types::ConnectionState;

use crate::backoff::BackoffPolicy;
use crate::buffer::HistoryBuffer;
use crate::codec::{StreamCodec, endpoint_url};
use crate::connection::{CONNECTION_ERROR, Command, ConnectionManager};

/// How long a closing socket may take to send its close frame
const CLOSE_TIMEOUT: Duration = Duration::from_millis(500);

/// Something that happened on a socket or timer owned by a stream client
#[derive(Clone, Debug)]
pub struct TransportEvent {
    /// Epoch of the socket or timer that produced the event
    pub epoch: u64,
    pub kind: TransportEventKind,
}

#[derive(Clone, Debug)]
pub enum TransportEventKind {
    Opened,
    Frame(String),
    Error(String),
    Closed,
    RetryDue,
}

/// A spawned socket or timer task
struct TaskHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl TaskHandle {
    /// Ask the task to finish on its own (lets a socket send its close frame)
    fn cancel(self) {
        self.cancel.cancel();
    }

    fn abort(self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

/// Callback invoked with a display string on socket errors
pub type ErrorCallback = Box<dyn Fn(&str) + Send>;

/// Live stream client for one endpoint
///
/// Owns the connection state machine, the socket task, the retry timer
/// and the history buffer. All state changes happen in [`handle`], which
/// the owner calls from its event loop with events from [`next_event`].
///
/// [`handle`]: StreamClient::handle
/// [`next_event`]: StreamClient::next_event
pub struct StreamClient<C: StreamCodec> {
    url: String,
    manager: ConnectionManager,
    history: HistoryBuffer<C::Item>,
    current: Option<C::Item>,
    on_error: Option<ErrorCallback>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: mpsc::UnboundedReceiver<TransportEvent>,
    socket: Option<TaskHandle>,
    retry: Option<TaskHandle>,
    _codec: PhantomData<fn() -> C>,
}

impl<C: StreamCodec> StreamClient<C> {
    /// Create a client for the codec's endpoint under `ws_base`
    pub fn new(ws_base: &str, max_history: usize) -> Self {
        Self::with_url(endpoint_url::<C>(ws_base), max_history)
    }

    /// Create a client for an explicit endpoint URL
    pub fn with_url(url: impl Into<String>, max_history: usize) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            url: url.into(),
            manager: ConnectionManager::default(),
            history: HistoryBuffer::new(max_history),
            current: None,
            on_error: None,
            events_tx,
            events_rx,
            socket: None,
            retry: None,
            _codec: PhantomData,
        }
    }

    /// Override the retry budget and delays
    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.manager = ConnectionManager::new(policy);
        self
    }

    /// Register a callback for socket errors
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Open the socket (must be called inside a tokio runtime)
    pub fn connect(&mut self) {
        tracing::debug!(stream = C::NAME, url = %self.url, "connecting stream");
        let commands = self.manager.start();
        self.execute(commands);
    }

    /// Force a fresh connection with a reset retry budget
    pub fn reconnect(&mut self) {
        let commands = self.manager.reconnect();
        if commands.is_empty() {
            return;
        }
        tracing::info!(stream = C::NAME, "manual reconnect");
        self.execute(commands);
    }

    /// Tear down the socket and timer; no further messages are delivered
    pub fn disconnect(&mut self) {
        let commands = self.manager.disconnect();
        self.execute(commands);
    }

    /// Wait for the next socket or timer event
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events_rx.recv().await
    }

    /// Apply one event; returns true when a message was appended
    pub fn handle(&mut self, event: TransportEvent) -> bool {
        let TransportEvent { epoch, kind } = event;
        match kind {
            TransportEventKind::Opened => {
                if self.manager.on_open(epoch) {
                    tracing::debug!(stream = C::NAME, "stream open");
                }
                false
            }
            TransportEventKind::Frame(text) => self.accept_frame(epoch, &text),
            TransportEventKind::Error(reason) => {
                if self.manager.on_error(epoch) {
                    tracing::debug!(stream = C::NAME, %reason, "stream socket error");
                    if let Some(callback) = &self.on_error {
                        callback(CONNECTION_ERROR);
                    }
                }
                false
            }
            TransportEventKind::Closed => {
                let commands = self.manager.on_close(epoch);
                self.execute(commands);
                false
            }
            TransportEventKind::RetryDue => {
                let commands = self.manager.on_retry_due(epoch);
                if !commands.is_empty() {
                    self.retry = None;
                }
                self.execute(commands);
                false
            }
        }
    }

    fn accept_frame(&mut self, epoch: u64, text: &str) -> bool {
        if !self.manager.accepts(epoch) {
            tracing::trace!(stream = C::NAME, "dropping frame from stale connection");
            return false;
        }
        match C::decode(text) {
            Ok(item) => {
                self.current = Some(item.clone());
                self.history.push(item);
                true
            }
            Err(e) => {
                tracing::warn!(stream = C::NAME, error = %e, "failed to decode stream frame");
                false
            }
        }
    }

    fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::Open => {
                    if let Some(old) = self.socket.take() {
                        old.cancel();
                    }
                    self.socket = Some(spawn_socket(
                        self.url.clone(),
                        self.manager.epoch(),
                        self.events_tx.clone(),
                    ));
                }
                Command::Close => {
                    if let Some(socket) = self.socket.take() {
                        socket.cancel();
                    }
                }
                Command::ScheduleRetry(delay) => {
                    if let Some(old) = self.retry.take() {
                        old.abort();
                    }
                    self.retry = Some(spawn_retry_timer(
                        delay,
                        self.manager.epoch(),
                        self.events_tx.clone(),
                    ));
                }
                Command::CancelRetry => {
                    if let Some(timer) = self.retry.take() {
                        timer.abort();
                    }
                }
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    /// Human-readable connection error, if any
    pub fn connection_error(&self) -> Option<&str> {
        self.manager.last_error()
    }

    /// Most recently decoded message
    pub fn current(&self) -> Option<&C::Item> {
        self.current.as_ref()
    }

    /// Ordered copy of the buffered messages
    pub fn history(&self) -> Vec<C::Item> {
        self.history.snapshot()
    }

    pub fn buffer(&self) -> &HistoryBuffer<C::Item> {
        &self.history
    }

    /// Drop all buffered messages
    pub fn clear(&mut self) {
        self.history.clear();
        self.current = None;
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn retry_pending(&self) -> bool {
        self.manager.retry_pending()
    }
}

impl<C: StreamCodec> Drop for StreamClient<C> {
    fn drop(&mut self) {
        if let Some(timer) = self.retry.take() {
            timer.abort();
        }
        if let Some(socket) = self.socket.take() {
            socket.cancel();
        }
    }
}

fn emit(tx: &mpsc::UnboundedSender<TransportEvent>, epoch: u64, kind: TransportEventKind) -> bool {
    tx.send(TransportEvent { epoch, kind }).is_ok()
}

fn spawn_socket(
    url: String,
    epoch: u64,
    tx: mpsc::UnboundedSender<TransportEvent>,
) -> TaskHandle {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        let connected = tokio::select! {
            _ = token.cancelled() => return,
            result = tokio_tungstenite::connect_async(url.as_str()) => result,
        };

        let stream = match connected {
            Ok((stream, _)) => stream,
            Err(e) => {
                emit(&tx, epoch, TransportEventKind::Error(e.to_string()));
                emit(&tx, epoch, TransportEventKind::Closed);
                return;
            }
        };

        if !emit(&tx, epoch, TransportEventKind::Opened) {
            return;
        }

        let (mut write, mut read) = stream.split();

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    let _ = tokio::time::timeout(CLOSE_TIMEOUT, write.close()).await;
                    return;
                }

                message = read.next() => {
                    let kind = match message {
                        Some(Ok(Message::Text(text))) => TransportEventKind::Frame(text.as_str().to_owned()),
                        Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                            Ok(text) => TransportEventKind::Frame(text),
                            Err(_) => {
                                tracing::warn!("ignoring non-UTF-8 binary frame");
                                continue;
                            }
                        },
                        Some(Ok(Message::Close(_))) | None => {
                            emit(&tx, epoch, TransportEventKind::Closed);
                            return;
                        }
                        Some(Err(e)) => {
                            emit(&tx, epoch, TransportEventKind::Error(e.to_string()));
                            emit(&tx, epoch, TransportEventKind::Closed);
                            return;
                        }
                        // Ping/pong are answered by tungstenite
                        Some(Ok(_)) => continue,
                    };

                    if !emit(&tx, epoch, kind) {
                        return;
                    }
                }
            }
        }
    });

    TaskHandle { cancel, task }
}

fn spawn_retry_timer(
    delay: Duration,
    epoch: u64,
    tx: mpsc::UnboundedSender<TransportEvent>,
) -> TaskHandle {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(delay) => {
                emit(&tx, epoch, TransportEventKind::RetryDue);
            }
        }
    });

    TaskHandle { cancel, task }
}
