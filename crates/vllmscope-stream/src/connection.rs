//! Connection state machine for a single live stream.
//!
//! `ConnectionManager` does no I/O. It consumes transport events and
//! returns the commands the driver must execute, which keeps every
//! transition testable without a socket.

use std::time::Duration;

use vllmscope_types::ConnectionState;

use crate::backoff::BackoffPolicy;

/// Display string for socket-level errors
pub const CONNECTION_ERROR: &str = "WebSocket connection error";

/// Display string once the retry budget is spent
pub const RETRIES_EXHAUSTED: &str = "Max reconnection attempts reached";

/// Side effects requested by the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open a new socket for the current epoch
    Open,
    /// Close the current socket, if any
    Close,
    /// Arm the single-shot retry timer
    ScheduleRetry(Duration),
    /// Disarm the retry timer, if armed
    CancelRetry,
}

/// State machine behind a stream connection
///
/// Every socket and retry timer belongs to an epoch. Opening a new socket
/// or tearing down bumps the epoch, so events from older sockets or timers
/// are ignored.
#[derive(Debug)]
pub struct ConnectionManager {
    state: ConnectionState,
    policy: BackoffPolicy,
    attempt: u32,
    last_error: Option<String>,
    socket_open: bool,
    retry_pending: bool,
    live: bool,
    epoch: u64,
}

impl ConnectionManager {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            state: ConnectionState::Connecting,
            policy,
            attempt: 0,
            last_error: None,
            socket_open: false,
            retry_pending: false,
            live: true,
            epoch: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.socket_open
    }

    pub fn retry_pending(&self) -> bool {
        self.retry_pending
    }

    /// Whether events tagged with `epoch` may still be delivered
    pub fn accepts(&self, epoch: u64) -> bool {
        self.live && epoch == self.epoch
    }

    /// Open the first socket
    pub fn start(&mut self) -> Vec<Command> {
        if self.socket_open || self.retry_pending {
            return Vec::new();
        }
        self.live = true;
        self.open()
    }

    fn open(&mut self) -> Vec<Command> {
        self.epoch += 1;
        self.socket_open = false;
        self.state = ConnectionState::Connecting;
        tracing::debug!(epoch = self.epoch, "opening stream socket");
        vec![Command::Open]
    }

    /// The socket reported open
    pub fn on_open(&mut self, epoch: u64) -> bool {
        if !self.accepts(epoch) {
            return false;
        }
        self.socket_open = true;
        self.state = ConnectionState::Connected;
        self.attempt = 0;
        self.last_error = None;
        tracing::debug!(epoch, "stream connected");
        true
    }

    /// The socket reported an error; the close that follows drives the state
    pub fn on_error(&mut self, epoch: u64) -> bool {
        if !self.accepts(epoch) {
            return false;
        }
        self.last_error = Some(CONNECTION_ERROR.to_string());
        true
    }

    /// The socket closed; schedule a retry unless the budget is spent
    pub fn on_close(&mut self, epoch: u64) -> Vec<Command> {
        if !self.accepts(epoch) {
            return Vec::new();
        }
        self.socket_open = false;
        self.state = ConnectionState::Disconnected;

        if self.policy.should_retry(self.attempt) {
            let delay = self.policy.delay_for_attempt(self.attempt);
            self.attempt += 1;
            self.retry_pending = true;
            self.state = ConnectionState::Reconnecting;
            tracing::info!(
                attempt = self.attempt,
                delay_ms = delay.as_millis() as u64,
                "stream closed, scheduling reconnect"
            );
            vec![Command::ScheduleRetry(delay)]
        } else {
            self.last_error = Some(RETRIES_EXHAUSTED.to_string());
            tracing::warn!(attempts = self.attempt, "giving up on stream reconnection");
            Vec::new()
        }
    }

    /// The retry timer fired
    pub fn on_retry_due(&mut self, epoch: u64) -> Vec<Command> {
        if !self.accepts(epoch) || !self.retry_pending {
            return Vec::new();
        }
        self.retry_pending = false;
        self.open()
    }

    /// Manual reconnect: reset the budget and reopen immediately
    ///
    /// A no-op while the socket is open and connected.
    pub fn reconnect(&mut self) -> Vec<Command> {
        if self.live && self.is_connected() {
            return Vec::new();
        }
        let mut commands = Vec::new();
        if self.retry_pending {
            self.retry_pending = false;
            commands.push(Command::CancelRetry);
        }
        commands.push(Command::Close);
        self.socket_open = false;
        self.attempt = 0;
        self.last_error = None;
        self.live = true;
        commands.extend(self.open());
        commands
    }

    /// Tear down: cancel the timer, close the socket, stop retrying
    pub fn disconnect(&mut self) -> Vec<Command> {
        let mut commands = Vec::new();
        if self.retry_pending {
            self.retry_pending = false;
            commands.push(Command::CancelRetry);
        }
        commands.push(Command::Close);
        self.socket_open = false;
        self.attempt = 0;
        self.live = false;
        self.epoch += 1;
        self.state = ConnectionState::Disconnected;
        tracing::debug!("stream disconnected");
        commands
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(BackoffPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> ConnectionManager {
        let mut manager = ConnectionManager::default();
        assert_eq!(manager.start(), vec![Command::Open]);
        manager
    }

    /// Close the current socket and let the retry timer fire
    fn fail_once(manager: &mut ConnectionManager) -> Vec<Command> {
        let epoch = manager.epoch();
        let commands = manager.on_close(epoch);
        if !commands.is_empty() {
            assert_eq!(manager.on_retry_due(epoch), vec![Command::Open]);
        }
        commands
    }

    #[test]
    fn test_initial_state_is_connecting() {
        let manager = ConnectionManager::default();
        assert_eq!(manager.state(), ConnectionState::Connecting);
        assert!(manager.last_error().is_none());
    }

    #[test]
    fn test_open_resets_attempts_and_error() {
        let mut manager = started();
        fail_once(&mut manager);
        manager.on_error(manager.epoch());
        assert_eq!(manager.attempt(), 1);

        assert!(manager.on_open(manager.epoch()));
        assert_eq!(manager.state(), ConnectionState::Connected);
        assert_eq!(manager.attempt(), 0);
        assert!(manager.last_error().is_none());
    }

    #[test]
    fn test_close_schedules_backoff_retry() {
        let mut manager = started();
        let epoch = manager.epoch();
        manager.on_open(epoch);

        let commands = manager.on_close(epoch);
        assert_eq!(commands, vec![Command::ScheduleRetry(Duration::from_millis(1000))]);
        assert_eq!(manager.state(), ConnectionState::Reconnecting);

        assert_eq!(manager.on_retry_due(epoch), vec![Command::Open]);
        assert_eq!(manager.state(), ConnectionState::Connecting);
        assert_eq!(manager.epoch(), epoch + 1);
    }

    #[test]
    fn test_retry_exhaustion() {
        let mut manager = started();
        let mut delays = Vec::new();
        for _ in 0..5 {
            match fail_once(&mut manager).as_slice() {
                [Command::ScheduleRetry(delay)] => delays.push(delay.as_millis()),
                other => panic!("unexpected commands: {:?}", other),
            }
        }
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000]);

        let commands = fail_once(&mut manager);
        assert!(commands.is_empty());
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(manager.last_error(), Some(RETRIES_EXHAUSTED));
        assert!(!manager.retry_pending());

        // No timer is armed, so nothing can reopen the socket
        assert!(manager.on_retry_due(manager.epoch()).is_empty());
    }

    #[test]
    fn test_error_does_not_change_state() {
        let mut manager = started();
        let epoch = manager.epoch();
        manager.on_open(epoch);
        assert!(manager.on_error(epoch));
        assert_eq!(manager.state(), ConnectionState::Connected);
        assert_eq!(manager.last_error(), Some(CONNECTION_ERROR));
    }

    #[test]
    fn test_reconnect_is_noop_while_connected() {
        let mut manager = started();
        manager.on_open(manager.epoch());
        assert!(manager.reconnect().is_empty());
        assert_eq!(manager.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_manual_reconnect_after_exhaustion() {
        let mut manager = started();
        for _ in 0..6 {
            fail_once(&mut manager);
        }
        assert_eq!(manager.last_error(), Some(RETRIES_EXHAUSTED));

        let commands = manager.reconnect();
        assert_eq!(commands, vec![Command::Close, Command::Open]);
        assert_eq!(manager.state(), ConnectionState::Connecting);
        assert_eq!(manager.attempt(), 0);
        assert!(manager.last_error().is_none());
    }

    #[test]
    fn test_reconnect_cancels_pending_retry() {
        let mut manager = started();
        let stale = manager.epoch();
        manager.on_close(stale);
        assert!(manager.retry_pending());

        let commands = manager.reconnect();
        assert_eq!(commands, vec![Command::CancelRetry, Command::Close, Command::Open]);

        // The old timer firing late must not open a second socket
        assert!(manager.on_retry_due(stale).is_empty());
    }

    #[test]
    fn test_disconnect_stops_everything() {
        let mut manager = started();
        let epoch = manager.epoch();
        manager.on_close(epoch);

        let commands = manager.disconnect();
        assert_eq!(commands, vec![Command::CancelRetry, Command::Close]);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(manager.attempt(), 0);
        assert!(!manager.is_live());

        // Late events from the torn-down socket are ignored
        assert!(!manager.accepts(epoch));
        assert!(!manager.on_open(epoch));
        assert!(manager.on_close(epoch).is_empty());
        assert!(manager.on_retry_due(epoch).is_empty());
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_stale_socket_events_ignored_after_reopen() {
        let mut manager = started();
        let old = manager.epoch();
        manager.on_close(old);
        manager.on_retry_due(old);

        assert!(!manager.on_open(old));
        assert!(manager.on_close(old).is_empty());
        assert_eq!(manager.state(), ConnectionState::Connecting);
    }
}
