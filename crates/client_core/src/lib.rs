use std::{sync::Arc, time::Duration};

use shared::{
    domain::{TripId, TripStatus},
    protocol::Trip,
};
use tokio::{
    sync::{broadcast, Mutex},
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

pub mod error;
pub mod form;
pub mod notify;
pub mod polling;
pub mod transport;
pub mod view;

pub use error::{ConsoleError, ErrorKind, Result};
pub use form::{FormMode, TripForm};
pub use notify::{Notice, NoticeLevel};
pub use polling::{PollOutcome, PollSettings};
pub use transport::{HttpTripApi, TripApi};
pub use view::{ContentMode, ContentPanel, DateDisplay, StatusDisplay, TripRow, TripView};

use notify::NoticeBoard;
use polling::PollingSessions;

const EVENT_CAPACITY: usize = 256;
const DELETE_PROMPT: &str = "Are you sure you want to delete this trip? This action cannot be undone.";

#[derive(Debug, Clone)]
pub struct ConsoleOptions {
    pub poll: PollSettings,
    pub notice_ttl: Duration,
    pub dates: DateDisplay,
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        Self {
            poll: PollSettings::default(),
            notice_ttl: notify::DEFAULT_NOTICE_TTL,
            dates: DateDisplay::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ConsoleEvent {
    TripsRefreshed {
        count: usize,
    },
    StatusObserved {
        trip_id: TripId,
        status: TripStatus,
        elapsed: Duration,
    },
    PollFinished {
        trip_id: TripId,
        outcome: PollOutcome,
    },
    ContentSaved {
        trip_id: TripId,
    },
    TripDeleted {
        trip_id: TripId,
    },
    Notice(Notice),
}

#[derive(Default)]
struct ConsoleState {
    trips: Vec<Trip>,
    form: TripForm,
    content: Option<ContentPanel>,
}

/// Page-level controller for the trip list, the create/update form, the
/// content panel and the per-trip polling sessions.
pub struct TripConsole {
    api: Arc<dyn TripApi>,
    view: Arc<dyn TripView>,
    options: ConsoleOptions,
    state: Mutex<ConsoleState>,
    sessions: Mutex<PollingSessions>,
    notices: Arc<Mutex<NoticeBoard>>,
    events: broadcast::Sender<ConsoleEvent>,
}

impl TripConsole {
    pub fn new(
        api: Arc<dyn TripApi>,
        view: Arc<dyn TripView>,
        options: ConsoleOptions,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let notices = Arc::new(Mutex::new(NoticeBoard::new(options.notice_ttl)));
        Arc::new(Self {
            api,
            view,
            options,
            state: Mutex::new(ConsoleState::default()),
            sessions: Mutex::new(PollingSessions::new()),
            notices,
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ConsoleEvent> {
        self.events.subscribe()
    }

    pub async fn trips(&self) -> Vec<Trip> {
        self.state.lock().await.trips.clone()
    }

    pub async fn form(&self) -> TripForm {
        self.state.lock().await.form.clone()
    }

    pub async fn set_form(&self, form: TripForm) {
        let mut state = self.state.lock().await;
        state.form = form;
        self.view.render_form(&state.form);
    }

    pub async fn content(&self) -> Option<ContentPanel> {
        self.state.lock().await.content.clone()
    }

    pub async fn is_polling(&self, trip_id: TripId) -> bool {
        self.sessions.lock().await.is_active(trip_id)
    }

    pub async fn polling_ids(&self) -> Vec<TripId> {
        self.sessions.lock().await.active_ids()
    }

    pub async fn active_notices(&self) -> Vec<Notice> {
        self.notices.lock().await.active().to_vec()
    }

    pub async fn dismiss_notice(&self, notice_id: u64) -> bool {
        let removed = self.notices.lock().await.dismiss(notice_id);
        if removed {
            self.view.dismiss_notice(notice_id);
        }
        removed
    }

    /// Fetches every trip and re-renders the list. On failure the last good
    /// list stays on screen.
    pub async fn list_trips(&self) -> Result<Vec<Trip>> {
        let trips = match self.api.list_trips().await {
            Ok(trips) => trips,
            Err(err) => {
                error!("trips: load failed: {err}");
                self.notify(
                    NoticeLevel::Danger,
                    err.user_message("Failed to load trips. Please try again."),
                )
                .await;
                return Err(err);
            }
        };

        {
            let mut state = self.state.lock().await;
            state.trips = trips.clone();
            self.render_rows(&state.trips);
        }
        info!("trips: loaded count={}", trips.len());
        let _ = self.events.send(ConsoleEvent::TripsRefreshed { count: trips.len() });
        Ok(trips)
    }

    /// Sends the current form: an update when it carries a trip id, a create
    /// otherwise. The affected trip is polled until it settles.
    pub async fn submit_trip(self: &Arc<Self>) -> Result<TripId> {
        let form = self.form().await;
        let fields = match form.to_fields() {
            Ok(fields) => fields,
            Err(err) => {
                warn!("form: rejected before submit: {err}");
                self.notify(NoticeLevel::Danger, err.user_message("Invalid trip details."))
                    .await;
                return Err(err);
            }
        };

        let mode = form.mode();
        let result = match mode {
            FormMode::Update(trip_id) => self
                .api
                .update_trip(trip_id, &fields)
                .await
                .map(|()| trip_id),
            FormMode::Create => self.api.create_trip(&fields).await,
        };
        let trip_id = match result {
            Ok(trip_id) => trip_id,
            Err(err) => {
                error!("form: submit failed mode={mode:?}: {err}");
                self.notify(
                    NoticeLevel::Danger,
                    err.user_message("An error occurred while saving the trip."),
                )
                .await;
                return Err(err);
            }
        };

        {
            let mut state = self.state.lock().await;
            state.form.reset();
            self.view.render_form(&state.form);
            if mode == FormMode::Create {
                state.content = None;
                self.view.clear_content();
            }
        }

        match mode {
            FormMode::Update(_) => {
                info!("form: updated trip={trip_id}");
                self.notify(NoticeLevel::Success, "Trip updated successfully")
                    .await;
            }
            FormMode::Create => {
                info!("form: created trip={trip_id}");
                self.notify(
                    NoticeLevel::Info,
                    "Your trip is being generated. You can follow its status in the trip list.",
                )
                .await;
            }
        }

        let _ = self.list_trips().await;
        self.poll_status(trip_id).await;
        Ok(trip_id)
    }

    /// Loads a trip into the form and opens its content read-only. Editing
    /// requires [`TripConsole::begin_content_edit`].
    pub async fn view_trip(&self, trip_id: TripId) -> Result<Trip> {
        let trip = self
            .load_into_form(trip_id, "Failed to load trip content. Please try again.")
            .await?;

        let panel = ContentPanel {
            trip_id,
            html_content: trip.html_content.clone().unwrap_or_default(),
            mode: ContentMode::Viewing,
        };
        self.view.render_content(&panel);
        self.state.lock().await.content = Some(panel);

        self.notify(
            NoticeLevel::Info,
            "Viewing trip details. You can edit the form and content.",
        )
        .await;
        Ok(trip)
    }

    /// Loads a trip into the form for an update without touching content.
    pub async fn edit_trip(&self, trip_id: TripId) -> Result<Trip> {
        let trip = self
            .load_into_form(
                trip_id,
                "Failed to load trip details for editing. Please try again.",
            )
            .await?;
        self.notify(
            NoticeLevel::Info,
            "Editing trip. Change the form and submit to save changes.",
        )
        .await;
        Ok(trip)
    }

    async fn load_into_form(&self, trip_id: TripId, fallback: &str) -> Result<Trip> {
        let trip = match self.api.get_trip(trip_id).await {
            Ok(trip) => trip,
            Err(err) => {
                warn!("trips: fetch failed trip={trip_id}: {err}");
                self.notify(NoticeLevel::Danger, err.user_message(fallback))
                    .await;
                return Err(err);
            }
        };

        let mut state = self.state.lock().await;
        state.form.populate_from(&trip);
        self.view.render_form(&state.form);
        Ok(trip)
    }

    /// The explicit Edit toggle on the open content panel.
    pub async fn begin_content_edit(&self) -> Result<ContentPanel> {
        let mut state = self.state.lock().await;
        let Some(panel) = state.content.as_mut() else {
            return Err(ConsoleError::NoActiveContent);
        };
        panel.mode = ContentMode::Editing;
        self.view.render_content(panel);
        Ok(panel.clone())
    }

    /// Leaves editing mode without saving.
    pub async fn cancel_content_edit(&self) -> Result<ContentPanel> {
        let mut state = self.state.lock().await;
        let Some(panel) = state.content.as_mut() else {
            return Err(ConsoleError::NoActiveContent);
        };
        if panel.mode == ContentMode::Editing {
            panel.mode = ContentMode::Viewing;
            self.view.render_content(panel);
        }
        Ok(panel.clone())
    }

    /// Saves edited HTML for the open panel. Only valid in editing mode.
    pub async fn save_content(&self, html_content: impl Into<String>) -> Result<()> {
        let html_content = html_content.into();
        let trip_id = {
            let state = self.state.lock().await;
            match state.content.as_ref() {
                None => Err(ConsoleError::NoActiveContent),
                Some(panel) if panel.mode != ContentMode::Editing => Err(ConsoleError::NotEditing),
                Some(panel) => Ok(panel.trip_id),
            }
        };
        let trip_id = match trip_id {
            Ok(trip_id) => trip_id,
            Err(err) => {
                self.notify(NoticeLevel::Warning, err.user_message("Nothing to save."))
                    .await;
                return Err(err);
            }
        };

        self.save_trip_content(trip_id, &html_content).await?;

        let mut state = self.state.lock().await;
        if let Some(panel) = state
            .content
            .as_mut()
            .filter(|panel| panel.trip_id == trip_id)
        {
            panel.html_content = html_content;
            panel.mode = ContentMode::Viewing;
            self.view.render_content(panel);
        }
        Ok(())
    }

    /// PUTs HTML for a trip as-is and refreshes the list.
    pub async fn save_trip_content(&self, trip_id: TripId, html_content: &str) -> Result<()> {
        if let Err(err) = self.api.save_content(trip_id, html_content).await {
            error!("content: save failed trip={trip_id}: {err}");
            self.notify(
                NoticeLevel::Danger,
                err.user_message("Failed to save trip content. Please try again."),
            )
            .await;
            return Err(err);
        }

        info!(
            "content: saved trip={trip_id} bytes={}",
            html_content.len()
        );
        let _ = self.events.send(ConsoleEvent::ContentSaved { trip_id });
        self.notify(NoticeLevel::Success, "Trip content saved successfully")
            .await;
        let _ = self.list_trips().await;
        Ok(())
    }

    /// Starts checking a trip's status on a fixed interval, replacing any
    /// session already running for the same trip.
    pub async fn poll_status(self: &Arc<Self>, trip_id: TripId) {
        let mut sessions = self.sessions.lock().await;
        let generation = sessions.reserve();
        let console = Arc::clone(self);
        let task = tokio::spawn(async move {
            let outcome = console.run_poll(trip_id).await;
            console.finish_poll(trip_id, generation, outcome).await;
        });

        if sessions.install(trip_id, generation, task) {
            info!("polling: restarted trip={trip_id}");
        } else {
            info!(
                "polling: started trip={trip_id} interval_ms={}",
                self.options.poll.effective_interval().as_millis()
            );
        }
    }

    pub async fn cancel_polling(&self, trip_id: TripId) -> bool {
        let cancelled = self.sessions.lock().await.cancel(trip_id);
        if cancelled {
            info!("polling: cancelled trip={trip_id}");
        }
        cancelled
    }

    async fn run_poll(&self, trip_id: TripId) -> PollOutcome {
        let settings = self.options.poll;
        let interval = settings.effective_interval();
        let started = Instant::now();
        let mut last_seen: Option<TripStatus> = None;
        self.view.render_status(trip_id, StatusDisplay::Checking);

        let mut ticker = time::interval_at(started + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let elapsed = started.elapsed();

            if settings.timeout.is_some_and(|limit| elapsed >= limit) {
                warn!(
                    "polling: giving up trip={trip_id} elapsed_secs={}",
                    elapsed.as_secs()
                );
                self.view.render_status(trip_id, StatusDisplay::CheckManually);
                self.notify(
                    NoticeLevel::Warning,
                    "Status check timed out. Please check the trip manually.",
                )
                .await;
                return PollOutcome::TimedOut;
            }
            self.view.render_elapsed(trip_id, elapsed);

            let trip = match self.api.get_trip(trip_id).await {
                Ok(trip) => trip,
                Err(err) => {
                    error!("polling: status check failed trip={trip_id}: {err}");
                    let message =
                        err.user_message("Failed to check trip status. Please try again.");
                    self.notify(NoticeLevel::Danger, message.clone()).await;
                    return PollOutcome::Errored(message);
                }
            };

            debug!("polling: trip={trip_id} status={}", trip.status);
            if let Some(previous) = last_seen {
                if !previous.can_transition_to(trip.status) {
                    warn!(
                        "polling: unexpected transition trip={trip_id} from={previous} to={}",
                        trip.status
                    );
                }
            }
            last_seen = Some(trip.status);
            let _ = self.events.send(ConsoleEvent::StatusObserved {
                trip_id,
                status: trip.status,
                elapsed,
            });

            if !trip.status.is_terminal() {
                continue;
            }

            self.view
                .render_status(trip_id, StatusDisplay::Settled(trip.status));
            match trip.status {
                TripStatus::Completed => {
                    self.show_generated(trip_id, trip.html_content.unwrap_or_default())
                        .await;
                }
                TripStatus::Failed => {
                    self.notify(
                        NoticeLevel::Danger,
                        "Trip generation failed. Please try again.",
                    )
                    .await;
                }
                TripStatus::Modified | TripStatus::Pending => {}
            }
            let _ = self.list_trips().await;
            return PollOutcome::Settled(trip.status);
        }
    }

    async fn finish_poll(&self, trip_id: TripId, generation: u64, outcome: PollOutcome) {
        if self.sessions.lock().await.finish(trip_id, generation) {
            info!("polling: finished trip={trip_id} outcome={outcome:?}");
        }
        let _ = self
            .events
            .send(ConsoleEvent::PollFinished { trip_id, outcome });
    }

    async fn show_generated(&self, trip_id: TripId, html_content: String) {
        let panel = ContentPanel {
            trip_id,
            html_content,
            mode: ContentMode::Generated,
        };
        self.view.render_content(&panel);
        self.state.lock().await.content = Some(panel);
    }

    /// Deletes a trip after confirmation. Returns `Ok(false)` when the user
    /// declined. A session polling the trip is cancelled before the request
    /// goes out and resumed only if the trip still exists afterwards.
    pub async fn delete_trip(self: &Arc<Self>, trip_id: TripId) -> Result<bool> {
        if !self.view.confirm(DELETE_PROMPT) {
            debug!("trips: delete declined trip={trip_id}");
            return Ok(false);
        }

        let was_polling = self.cancel_polling(trip_id).await;
        if let Err(err) = self.api.delete_trip(trip_id).await {
            error!("trips: delete failed trip={trip_id}: {err}");
            self.notify(
                NoticeLevel::Danger,
                err.user_message("Failed to delete trip. Please try again."),
            )
            .await;
            if was_polling && !err.is_not_found() {
                self.poll_status(trip_id).await;
            }
            return Err(err);
        }

        {
            let mut state = self.state.lock().await;
            state.trips.retain(|trip| trip.id != trip_id);
            self.render_rows(&state.trips);
            if state
                .content
                .as_ref()
                .is_some_and(|panel| panel.trip_id == trip_id)
            {
                state.content = None;
                self.view.clear_content();
            }
            if state.form.trip_id == Some(trip_id) {
                state.form.reset();
                self.view.render_form(&state.form);
            }
        }

        info!("trips: deleted trip={trip_id}");
        let _ = self.events.send(ConsoleEvent::TripDeleted { trip_id });
        self.notify(NoticeLevel::Success, "Trip deleted successfully")
            .await;
        let _ = self.list_trips().await;
        Ok(true)
    }

    /// Asks the server to generate the trip again and follows the result.
    pub async fn regenerate_trip(self: &Arc<Self>, trip_id: TripId) -> Result<TripStatus> {
        self.view.render_regenerating(trip_id, true);
        let result = self.api.regenerate_trip(trip_id).await;
        self.view.render_regenerating(trip_id, false);

        let reply = match result {
            Ok(reply) => reply,
            Err(err) => {
                error!("trips: regenerate failed trip={trip_id}: {err}");
                self.notify(
                    NoticeLevel::Danger,
                    err.user_message("Failed to regenerate trip. Please try again."),
                )
                .await;
                return Err(err);
            }
        };

        info!("trips: regenerate trip={trip_id} status={}", reply.status);
        match (reply.status, reply.html_content) {
            (TripStatus::Failed, _) => {
                self.notify(
                    NoticeLevel::Danger,
                    "Trip generation failed. Please try again.",
                )
                .await;
                let _ = self.list_trips().await;
            }
            (status, Some(html_content)) if status.has_content() => {
                self.view
                    .render_status(trip_id, StatusDisplay::Settled(status));
                self.show_generated(trip_id, html_content).await;
                let _ = self.list_trips().await;
            }
            _ => {
                self.notify(
                    NoticeLevel::Info,
                    "Trip is being regenerated. Please check back later.",
                )
                .await;
                self.poll_status(trip_id).await;
            }
        }
        Ok(reply.status)
    }

    /// Cancels every polling session.
    pub async fn shutdown(&self) {
        let cancelled = self.sessions.lock().await.cancel_all();
        if cancelled > 0 {
            info!("polling: shutdown cancelled={cancelled}");
        }
    }

    fn render_rows(&self, trips: &[Trip]) {
        let rows: Vec<TripRow> = trips
            .iter()
            .map(|trip| TripRow::from_trip(trip, &self.options.dates))
            .collect();
        self.view.render_trips(&rows);
    }

    async fn notify(&self, level: NoticeLevel, message: impl Into<String>) -> Notice {
        let notice = self.notices.lock().await.push(level, message);
        self.view.show_notice(&notice);
        let _ = self.events.send(ConsoleEvent::Notice(notice.clone()));

        let notices = Arc::clone(&self.notices);
        let view = Arc::clone(&self.view);
        let deadline = Instant::from_std(notice.expires_at);
        tokio::spawn(async move {
            time::sleep_until(deadline).await;
            let expired = notices.lock().await.expire(std::time::Instant::now());
            for notice_id in expired {
                view.dismiss_notice(notice_id);
            }
        });

        notice
    }
}

/// Waits until the session for `trip_id` reports its outcome. Returns `None`
/// if the console is gone.
pub async fn wait_for_poll(
    events: &mut broadcast::Receiver<ConsoleEvent>,
    trip_id: TripId,
) -> Option<PollOutcome> {
    loop {
        match events.recv().await {
            Ok(ConsoleEvent::PollFinished {
                trip_id: finished,
                outcome,
            }) if finished == trip_id => return Some(outcome),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("events: receiver lagged skipped={skipped}");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
