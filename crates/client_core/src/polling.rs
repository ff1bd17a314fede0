//! Per-trip status polling sessions.

use std::{collections::HashMap, time::Duration};

use shared::domain::{TripId, TripStatus};
use tokio::task::JoinHandle;
use tracing::debug;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// `None` polls until the trip settles.
    pub timeout: Option<Duration>,
}

impl PollSettings {
    /// The interval a session actually ticks at; never below
    /// [`MIN_POLL_INTERVAL`].
    pub fn effective_interval(&self) -> Duration {
        self.interval.max(MIN_POLL_INTERVAL)
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: Some(DEFAULT_POLL_TIMEOUT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Settled(TripStatus),
    TimedOut,
    Errored(String),
}

struct PollingSession {
    generation: u64,
    task: JoinHandle<()>,
}

/// Active sessions keyed by trip id. Installing a session for an id that
/// already has one aborts the old task first.
#[derive(Default)]
pub struct PollingSessions {
    next_generation: u64,
    sessions: HashMap<TripId, PollingSession>,
}

impl PollingSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the generation the next installed session will carry.
    pub fn reserve(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// Returns true when an older session was replaced.
    pub fn install(&mut self, trip_id: TripId, generation: u64, task: JoinHandle<()>) -> bool {
        let previous = self.sessions.insert(
            trip_id,
            PollingSession {
                generation,
                task,
            },
        );
        match previous {
            Some(old) => {
                debug!(
                    "polling: replaced session trip={} old_generation={} new_generation={}",
                    trip_id, old.generation, generation
                );
                old.task.abort();
                true
            }
            None => false,
        }
    }

    /// Called by a session when it ends on its own. A stale generation (the
    /// session was already replaced) leaves the map untouched.
    pub fn finish(&mut self, trip_id: TripId, generation: u64) -> bool {
        match self.sessions.get(&trip_id) {
            Some(session) if session.generation == generation => {
                self.sessions.remove(&trip_id);
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self, trip_id: TripId) -> bool {
        match self.sessions.remove(&trip_id) {
            Some(session) => {
                session.task.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) -> usize {
        let count = self.sessions.len();
        for (_, session) in self.sessions.drain() {
            session.task.abort();
        }
        count
    }

    pub fn is_active(&self, trip_id: TripId) -> bool {
        self.sessions.contains_key(&trip_id)
    }

    pub fn active_ids(&self) -> Vec<TripId> {
        let mut ids: Vec<_> = self.sessions.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Drop for PollingSessions {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use std::future;

    use tokio::sync::oneshot;

    use super::*;

    fn parked() -> JoinHandle<()> {
        tokio::spawn(future::pending::<()>())
    }

    #[test]
    fn interval_is_floored() {
        let settings = PollSettings {
            interval: Duration::ZERO,
            timeout: None,
        };
        assert_eq!(settings.effective_interval(), MIN_POLL_INTERVAL);
        assert_eq!(
            PollSettings::default().effective_interval(),
            DEFAULT_POLL_INTERVAL
        );
    }

    #[tokio::test]
    async fn install_replaces_and_aborts_previous_session() {
        let mut sessions = PollingSessions::new();
        let (dropped_tx, dropped_rx) = oneshot::channel::<()>();
        let first = sessions.reserve();
        let first_task = tokio::spawn(async move {
            let _guard = dropped_tx;
            future::pending::<()>().await;
        });
        assert!(!sessions.install(TripId(1), first, first_task));

        let second = sessions.reserve();
        assert!(sessions.install(TripId(1), second, parked()));
        assert_eq!(sessions.len(), 1);

        let aborted = tokio::time::timeout(Duration::from_secs(1), dropped_rx)
            .await
            .expect("old session should be torn down");
        assert!(aborted.is_err());
    }

    #[tokio::test]
    async fn stale_generation_does_not_finish_newer_session() {
        let mut sessions = PollingSessions::new();
        let first = sessions.reserve();
        sessions.install(TripId(2), first, parked());
        let second = sessions.reserve();
        sessions.install(TripId(2), second, parked());

        assert!(!sessions.finish(TripId(2), first));
        assert!(sessions.is_active(TripId(2)));
        assert!(sessions.finish(TripId(2), second));
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn cancel_is_per_trip() {
        let mut sessions = PollingSessions::new();
        for id in [3, 4] {
            let generation = sessions.reserve();
            sessions.install(TripId(id), generation, parked());
        }
        assert!(sessions.cancel(TripId(3)));
        assert!(!sessions.cancel(TripId(3)));
        assert_eq!(sessions.active_ids(), vec![TripId(4)]);
        assert_eq!(sessions.cancel_all(), 1);
    }
}
