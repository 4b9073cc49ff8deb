//! Periodic REST polling per screen.

use std::time::{Duration, Instant};

use crate::app::Screen;

const NODES_INTERVAL: Duration = Duration::from_secs(10);
const UPTIME_INTERVAL: Duration = Duration::from_secs(30);
const RUNNING_CONFIG_INTERVAL: Duration = Duration::from_secs(10);
const MODELS_INTERVAL: Duration = Duration::from_secs(30);
const DOWNLOAD_STATUS_INTERVAL: Duration = Duration::from_secs(2);
const PROFILES_INTERVAL: Duration = Duration::from_secs(30);
const CONFIG_INTERVAL: Duration = Duration::from_secs(60);

/// A REST resource refreshed on a timer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Poll {
    ClusterStatus,
    Nodes,
    Uptime,
    ModelStatus,
    RunningConfig,
    Models,
    AvailableModels,
    DownloadStatus,
    Profiles,
    Config,
}

impl Poll {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ClusterStatus => "cluster status",
            Self::Nodes => "node health",
            Self::Uptime => "uptime",
            Self::ModelStatus => "model status",
            Self::RunningConfig => "running config",
            Self::Models => "model inventory",
            Self::AvailableModels => "launchable models",
            Self::DownloadStatus => "download status",
            Self::Profiles => "profiles",
            Self::Config => "cluster config",
        }
    }
}

struct Entry {
    poll: Poll,
    interval: Duration,
    /// Interval is the user's refresh rate rather than a fixed one
    follows_refresh: bool,
    last: Option<Instant>,
    /// A request for this resource has not answered yet
    in_flight: bool,
}

/// Which resources the visible screen needs, and when each is next due
pub struct PollSchedule {
    entries: Vec<Entry>,
}

impl PollSchedule {
    /// Schedule for `screen`; `refresh` is the user's status refresh rate
    pub fn for_screen(screen: Screen, refresh: Duration) -> Self {
        // None follows the refresh rate
        let polls: Vec<(Poll, Option<Duration>)> = match screen {
            Screen::Overview => vec![
                (Poll::ClusterStatus, None),
                (Poll::Nodes, Some(NODES_INTERVAL)),
                (Poll::Uptime, Some(UPTIME_INTERVAL)),
                (Poll::ModelStatus, None),
                (Poll::RunningConfig, Some(RUNNING_CONFIG_INTERVAL)),
            ],
            Screen::Metrics => vec![(Poll::ModelStatus, None)],
            Screen::Logs => Vec::new(),
            Screen::Inventory => vec![
                (Poll::Models, Some(MODELS_INTERVAL)),
                (Poll::AvailableModels, Some(MODELS_INTERVAL)),
                (Poll::DownloadStatus, Some(DOWNLOAD_STATUS_INTERVAL)),
            ],
            Screen::Profiles => vec![(Poll::Profiles, Some(PROFILES_INTERVAL))],
            Screen::Settings => vec![(Poll::Config, Some(CONFIG_INTERVAL))],
        };

        Self {
            entries: polls
                .into_iter()
                .map(|(poll, fixed)| Entry {
                    poll,
                    interval: fixed.unwrap_or(refresh),
                    follows_refresh: fixed.is_none(),
                    last: None,
                    in_flight: false,
                })
                .collect(),
        }
    }

    /// Apply a new refresh rate, keeping what is in flight
    pub fn set_refresh(&mut self, refresh: Duration) {
        for entry in self.entries.iter_mut().filter(|e| e.follows_refresh) {
            entry.interval = refresh;
        }
    }

    /// Polls due at `now`; each returned poll is marked as run and in flight
    ///
    /// A resource whose previous request has not completed is skipped.
    pub fn due(&mut self, now: Instant) -> Vec<Poll> {
        self.entries
            .iter_mut()
            .filter(|e| !e.in_flight)
            .filter(|e| match e.last {
                None => true,
                Some(last) => now.saturating_duration_since(last) >= e.interval,
            })
            .map(|e| {
                e.last = Some(now);
                e.in_flight = true;
                e.poll
            })
            .collect()
    }

    /// The request for `poll` answered, successfully or not
    pub fn complete(&mut self, poll: Poll) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.poll == poll) {
            entry.in_flight = false;
        }
    }

    /// Make every poll due on the next check
    pub fn force(&mut self) {
        for entry in &mut self.entries {
            entry.last = None;
        }
    }

    pub fn polls(&self) -> impl Iterator<Item = Poll> + '_ {
        self.entries.iter().map(|e| e.poll)
    }
}
