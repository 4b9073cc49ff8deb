use std::future;

use tokio::sync::mpsc;

use vllmscope_stream::{LogStream, MetricsStream, TransportEvent};
use vllmscope_types::ConnectionState;

use crate::app::{Action, Screen};

/// The live stream owned by the visible screen
///
/// Screens never share a stream: switching screens drops the old one,
/// which cancels its socket and retry timer.
pub enum ScreenStream {
    Metrics(MetricsStream),
    Logs(LogStream),
}

impl ScreenStream {
    /// Create and connect the stream `screen` consumes, if it has one
    ///
    /// Socket errors are reported on `action_tx` as notifications.
    pub fn mount(
        screen: Screen,
        ws_base: &str,
        metrics_capacity: usize,
        log_capacity: usize,
        action_tx: &mpsc::UnboundedSender<Action>,
    ) -> Option<Self> {
        let tx = action_tx.clone();
        let notify = move |msg: &str| {
            let _ = tx.send(Action::ShowError(msg.to_string()));
        };

        let mut stream = match screen {
            Screen::Overview | Screen::Metrics => {
                Self::Metrics(MetricsStream::new(ws_base, metrics_capacity).on_error(notify))
            }
            Screen::Logs => Self::Logs(LogStream::new(ws_base, log_capacity).on_error(notify)),
            Screen::Inventory | Screen::Profiles | Screen::Settings => return None,
        };

        tracing::debug!(?screen, "mounting stream");
        stream.connect();
        Some(stream)
    }

    fn connect(&mut self) {
        match self {
            Self::Metrics(s) => s.connect(),
            Self::Logs(s) => s.connect(),
        }
    }

    pub fn reconnect(&mut self) {
        match self {
            Self::Metrics(s) => s.reconnect(),
            Self::Logs(s) => s.reconnect(),
        }
    }

    pub fn disconnect(&mut self) {
        match self {
            Self::Metrics(s) => s.disconnect(),
            Self::Logs(s) => s.disconnect(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        match self {
            Self::Metrics(s) => s.state(),
            Self::Logs(s) => s.state(),
        }
    }

    pub fn connection_error(&self) -> Option<&str> {
        match self {
            Self::Metrics(s) => s.connection_error(),
            Self::Logs(s) => s.connection_error(),
        }
    }

    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        match self {
            Self::Metrics(s) => s.next_event().await,
            Self::Logs(s) => s.next_event().await,
        }
    }

    /// Apply a transport event; true when a message was appended
    pub fn handle(&mut self, event: TransportEvent) -> bool {
        match self {
            Self::Metrics(s) => s.handle(event),
            Self::Logs(s) => s.handle(event),
        }
    }

    pub fn clear(&mut self) {
        match self {
            Self::Metrics(s) => s.clear(),
            Self::Logs(s) => s.clear(),
        }
    }

    pub fn metrics(&self) -> Option<&MetricsStream> {
        match self {
            Self::Metrics(s) => Some(s),
            Self::Logs(_) => None,
        }
    }

    pub fn logs(&self) -> Option<&LogStream> {
        match self {
            Self::Logs(s) => Some(s),
            Self::Metrics(_) => None,
        }
    }
}

/// Next event of the mounted stream; never resolves when nothing is mounted
pub async fn next_stream_event(stream: &mut Option<ScreenStream>) -> Option<TransportEvent> {
    match stream {
        Some(s) => s.next_event().await,
        None => future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WS: &str = "ws://127.0.0.1:9";

    #[tokio::test]
    async fn test_screens_without_streams() {
        let (tx, _rx) = mpsc::unbounded_channel();
        for screen in [Screen::Inventory, Screen::Profiles, Screen::Settings] {
            assert!(ScreenStream::mount(screen, WS, 10, 10, &tx).is_none());
        }
    }

    #[tokio::test]
    async fn test_mount_picks_codec_per_screen() {
        let (tx, _rx) = mpsc::unbounded_channel();

        let overview = ScreenStream::mount(Screen::Overview, WS, 10, 10, &tx).unwrap();
        assert!(overview.metrics().is_some());
        assert_eq!(overview.state(), ConnectionState::Connecting);

        let logs = ScreenStream::mount(Screen::Logs, WS, 10, 20, &tx).unwrap();
        let client = logs.logs().unwrap();
        assert_eq!(client.url(), "ws://127.0.0.1:9/api/logs/stream");
        assert_eq!(client.buffer().capacity(), 20);
    }

    #[tokio::test]
    async fn test_disconnect_stops_stream() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut stream = ScreenStream::mount(Screen::Metrics, WS, 10, 10, &tx).unwrap();
        stream.disconnect();
        assert_eq!(stream.state(), ConnectionState::Disconnected);
    }
}
