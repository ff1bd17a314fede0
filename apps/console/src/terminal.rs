use std::{
    io::{self, BufRead, Write},
    time::Duration,
};

use client_core::{
    view::{status_glyph, RowAction},
    ContentMode, ContentPanel, Notice, StatusDisplay, TripForm, TripRow, TripView,
};
use shared::domain::TripId;
use tracing::debug;

/// Line-oriented front end: everything is printed to stdout, confirmations
/// are read from stdin.
pub struct TerminalView {
    assume_yes: bool,
}

impl TerminalView {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }

    fn print(&self, text: &str) {
        let mut out = io::stdout().lock();
        // A closed stdout is not worth failing the command over.
        let _ = writeln!(out, "{text}");
    }
}

impl TripView for TerminalView {
    fn render_trips(&self, rows: &[TripRow]) {
        self.print(&format_table(rows));
    }

    fn render_status(&self, trip_id: TripId, status: StatusDisplay) {
        self.print(&format!("trip {trip_id}: {}", status_label(status)));
    }

    fn render_elapsed(&self, trip_id: TripId, elapsed: Duration) {
        self.print(&format!(
            "trip {trip_id}: still generating ({}s)",
            elapsed.as_secs()
        ));
    }

    fn render_regenerating(&self, trip_id: TripId, busy: bool) {
        if busy {
            self.print(&format!("trip {trip_id}: regenerating..."));
        }
    }

    fn render_form(&self, form: &TripForm) {
        debug!(
            "form: mode={:?} label={} identifier={}",
            form.mode(),
            form.submit_label(),
            form.identifier
        );
    }

    fn render_content(&self, panel: &ContentPanel) {
        let heading = match panel.mode {
            ContentMode::Viewing => "itinerary",
            ContentMode::Editing => "editing itinerary",
            ContentMode::Generated => "generated itinerary",
        };
        self.print(&format!("--- trip {} {heading} ---", panel.trip_id));
        self.print(&panel.html_content);
        self.print("---");
    }

    fn clear_content(&self) {
        debug!("content: panel cleared");
    }

    fn show_notice(&self, notice: &Notice) {
        self.print(&format!("[{}] {}", notice.level.as_str(), notice.message));
    }

    fn dismiss_notice(&self, notice_id: u64) {
        debug!("notice: dismissed id={notice_id}");
    }

    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        {
            let mut out = io::stdout().lock();
            let _ = write!(out, "{prompt} [y/N] ");
            let _ = out.flush();
        }
        // Called synchronously from inside the runtime; hand the worker
        // thread back while waiting on the terminal.
        tokio::task::block_in_place(|| read_answer(&mut io::stdin().lock()))
    }
}

/// Reads one line of input; anything but an explicit yes declines.
fn read_answer(input: &mut impl BufRead) -> bool {
    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(_) => is_yes(&answer),
        Err(_) => false,
    }
}

fn status_label(status: StatusDisplay) -> String {
    match status {
        StatusDisplay::Checking => "⟳ checking status".to_string(),
        StatusDisplay::Settled(status) => format!("{} {}", status_glyph(status), status),
        StatusDisplay::CheckManually => "⚠ still generating, check back later".to_string(),
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn action_label(action: RowAction) -> &'static str {
    match action {
        RowAction::View => "view",
        RowAction::Regenerate => "regenerate",
        RowAction::Delete => "delete",
    }
}

pub fn format_table(rows: &[TripRow]) -> String {
    if rows.is_empty() {
        return "No trips yet.".to_string();
    }

    let header = [
        "ID".to_string(),
        "STATUS".to_string(),
        "IDENTIFIER".to_string(),
        "FROM".to_string(),
        "TO".to_string(),
        "CREATED".to_string(),
        "ACTIONS".to_string(),
    ];
    let mut lines: Vec<[String; 7]> = vec![header];
    for row in rows {
        let mut status = format!("{} {}", status_glyph(row.status), row.status);
        if row.modified_badge {
            status.push_str(" [edited]");
        }
        let actions: Vec<_> = row.actions.iter().copied().map(action_label).collect();
        lines.push([
            row.trip_id.to_string(),
            status,
            row.identifier.clone(),
            row.from.clone(),
            row.to.clone(),
            row.created.clone(),
            actions.join(","),
        ]);
    }

    let mut widths = [0usize; 7];
    for line in &lines {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    lines
        .iter()
        .map(|line| {
            line.iter()
                .zip(widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use shared::domain::TripStatus;

    use super::*;

    fn row(id: i64, status: TripStatus) -> TripRow {
        TripRow {
            trip_id: TripId(id),
            status,
            modified_badge: status == TripStatus::Modified,
            identifier: format!("trip-{id}"),
            from: "Lisbon (01/06/2025 09:00)".into(),
            to: "Porto (03/06/2025 18:00)".into(),
            created: "20/05/2025 10:15".into(),
            actions: client_core::view::row_actions(status),
        }
    }

    #[test]
    fn empty_list_has_placeholder() {
        assert_eq!(format_table(&[]), "No trips yet.");
    }

    #[test]
    fn table_lists_one_line_per_trip() {
        let table = format_table(&[row(1, TripStatus::Pending), row(2, TripStatus::Modified)]);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[1].contains("⌛ Pending"));
        assert!(lines[1].ends_with("regenerate,delete"));
        assert!(lines[2].contains("[edited]"));
        assert!(lines[2].ends_with("view,regenerate,delete"));
    }

    #[test]
    fn columns_line_up() {
        let table = format_table(&[row(1, TripStatus::Completed), row(200, TripStatus::Failed)]);
        let offsets: Vec<_> = table
            .lines()
            .map(|line| line.find("trip-").unwrap_or_default())
            .skip(1)
            .collect();
        assert_eq!(offsets[0], offsets[1]);
    }

    #[test]
    fn answer_is_read_from_the_input_line() {
        assert!(read_answer(&mut io::Cursor::new("yes\nignored\n")));
        assert!(!read_answer(&mut io::Cursor::new("")));
        assert!(!read_answer(&mut io::Cursor::new("n\ny\n")));
    }

    #[test]
    fn assumed_yes_never_touches_stdin() {
        let view = TerminalView::new(true);
        assert!(view.confirm("Delete?"));
    }

    #[test]
    fn only_explicit_yes_confirms() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("nope"));
    }
}
