//! Rendering seam between the console and whatever front end draws it.

use std::time::Duration;

use chrono::NaiveDateTime;
use shared::{
    domain::{TripId, TripStatus},
    protocol::Trip,
};

use crate::{form::TripForm, notify::Notice};

pub const DEFAULT_DATE_PATTERN: &str = "%d/%m/%Y %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    View,
    Regenerate,
    Delete,
}

/// Status cell state. `Checking` is shown while a session is polling and
/// `CheckManually` once a session gave up on a slow trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusDisplay {
    Checking,
    Settled(TripStatus),
    CheckManually,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMode {
    Viewing,
    Editing,
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPanel {
    pub trip_id: TripId,
    pub html_content: String,
    pub mode: ContentMode,
}

/// Display pattern for dates; only affects what the user reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateDisplay {
    pattern: String,
}

impl DateDisplay {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    pub fn format(&self, value: &NaiveDateTime) -> String {
        use std::fmt::Write as _;

        let mut out = String::new();
        if write!(out, "{}", value.format(&self.pattern)).is_err() {
            return value.format(DEFAULT_DATE_PATTERN).to_string();
        }
        out
    }
}

impl Default for DateDisplay {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_PATTERN)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripRow {
    pub trip_id: TripId,
    pub status: TripStatus,
    pub modified_badge: bool,
    pub identifier: String,
    pub from: String,
    pub to: String,
    pub created: String,
    pub actions: Vec<RowAction>,
}

impl TripRow {
    pub fn from_trip(trip: &Trip, dates: &DateDisplay) -> Self {
        Self {
            trip_id: trip.id,
            status: trip.status,
            modified_badge: trip.status == TripStatus::Modified,
            identifier: trip.identifier.clone(),
            from: format!("{} ({})", trip.start_place, dates.format(&trip.start_date)),
            to: format!("{} ({})", trip.end_place, dates.format(&trip.end_date)),
            created: dates.format(&trip.created_at),
            actions: row_actions(trip.status),
        }
    }
}

pub fn row_actions(status: TripStatus) -> Vec<RowAction> {
    if status.has_content() {
        vec![RowAction::View, RowAction::Regenerate, RowAction::Delete]
    } else {
        vec![RowAction::Regenerate, RowAction::Delete]
    }
}

pub fn status_glyph(status: TripStatus) -> &'static str {
    match status {
        TripStatus::Completed => "✔",
        TripStatus::Pending => "⌛",
        TripStatus::Failed => "✖",
        TripStatus::Modified => "⚠",
    }
}

/// Everything the console draws goes through here. Implementations must
/// tolerate updates for rows that are no longer displayed.
pub trait TripView: Send + Sync {
    fn render_trips(&self, rows: &[TripRow]);
    fn render_status(&self, trip_id: TripId, status: StatusDisplay);
    fn render_elapsed(&self, trip_id: TripId, elapsed: Duration);
    fn render_regenerating(&self, trip_id: TripId, busy: bool);
    fn render_form(&self, form: &TripForm);
    fn render_content(&self, panel: &ContentPanel);
    fn clear_content(&self);
    fn show_notice(&self, notice: &Notice);
    fn dismiss_notice(&self, notice_id: u64);
    /// Asks the user to confirm a destructive action.
    fn confirm(&self, prompt: &str) -> bool;
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn trip(status: TripStatus) -> Trip {
        let at = |d: u32, h: u32| {
            NaiveDate::from_ymd_opt(2024, 1, d)
                .and_then(|date| date.and_hms_opt(h, 0, 0))
                .expect("date")
        };
        Trip {
            id: TripId(7),
            identifier: "Coast run".into(),
            trip_type: "road".into(),
            start_date: at(1, 10),
            end_date: at(2, 18),
            start_place: "Nice".into(),
            end_place: "Genoa".into(),
            focus: "beaches".into(),
            additional_requirements: None,
            status,
            html_content: None,
            created_at: at(1, 8),
        }
    }

    #[test]
    fn row_formats_places_with_display_dates() {
        let row = TripRow::from_trip(&trip(TripStatus::Completed), &DateDisplay::default());
        assert_eq!(row.from, "Nice (01/01/2024 10:00)");
        assert_eq!(row.to, "Genoa (02/01/2024 18:00)");
        assert_eq!(row.created, "01/01/2024 08:00");
        assert!(!row.modified_badge);
    }

    #[test]
    fn actions_depend_on_content() {
        assert_eq!(
            row_actions(TripStatus::Modified),
            vec![RowAction::View, RowAction::Regenerate, RowAction::Delete]
        );
        assert_eq!(
            row_actions(TripStatus::Failed),
            vec![RowAction::Regenerate, RowAction::Delete]
        );
        assert_eq!(
            row_actions(TripStatus::Pending),
            vec![RowAction::Regenerate, RowAction::Delete]
        );
    }

    #[test]
    fn modified_rows_carry_badge() {
        let row = TripRow::from_trip(&trip(TripStatus::Modified), &DateDisplay::default());
        assert!(row.modified_badge);
    }

    #[test]
    fn invalid_pattern_falls_back_to_default() {
        let display = DateDisplay::new("%Q");
        assert_eq!(display.format(&trip(TripStatus::Pending).start_date), "01/01/2024 10:00");
    }
}
