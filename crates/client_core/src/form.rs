//! The create/update form as the user fills it in.

use shared::{
    domain::TripId,
    protocol::{Trip, TripFields},
    wire_time,
};

use crate::error::{ConsoleError, Result};

pub const CREATE_LABEL: &str = "Generate Itinerary";
pub const UPDATE_LABEL: &str = "Update Trip";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Update(TripId),
}

/// Raw form inputs. Dates hold whatever a `datetime-local` field would
/// produce (`YYYY-MM-DDTHH:MM`) and are only parsed on submit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripForm {
    pub identifier: String,
    pub trip_type: String,
    pub start_date: String,
    pub end_date: String,
    pub start_place: String,
    pub end_place: String,
    pub trip_focus: String,
    pub trip_notes: String,
    /// Hidden field; set when the form was populated from an existing trip.
    pub trip_id: Option<TripId>,
}

impl TripForm {
    pub fn mode(&self) -> FormMode {
        match self.trip_id {
            Some(trip_id) => FormMode::Update(trip_id),
            None => FormMode::Create,
        }
    }

    pub fn submit_label(&self) -> &'static str {
        match self.mode() {
            FormMode::Create => CREATE_LABEL,
            FormMode::Update(_) => UPDATE_LABEL,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn populate_from(&mut self, trip: &Trip) {
        let fields = TripFields::from_trip(trip);
        *self = Self {
            identifier: fields.identifier,
            trip_type: fields.trip_type,
            start_date: wire_time::format_minutes(&fields.start_date),
            end_date: wire_time::format_minutes(&fields.end_date),
            start_place: fields.start_place,
            end_place: fields.end_place,
            trip_focus: fields.trip_focus,
            trip_notes: fields.trip_notes,
            trip_id: Some(trip.id),
        };
    }

    /// Validates the inputs and builds the request body.
    pub fn to_fields(&self) -> Result<TripFields> {
        let required = [
            ("trip type", &self.trip_type),
            ("start place", &self.start_place),
            ("end place", &self.end_place),
            ("trip focus", &self.trip_focus),
        ];
        if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConsoleError::invalid_input(format!("{name} is required")));
        }

        let start_date = parse_date("start date", &self.start_date)?;
        let end_date = parse_date("end date", &self.end_date)?;
        if end_date < start_date {
            return Err(ConsoleError::invalid_input(
                "end date must not be before start date",
            ));
        }

        Ok(TripFields {
            identifier: self.identifier.trim().to_string(),
            trip_type: self.trip_type.trim().to_string(),
            start_date,
            end_date,
            start_place: self.start_place.trim().to_string(),
            end_place: self.end_place.trim().to_string(),
            trip_focus: self.trip_focus.trim().to_string(),
            trip_notes: self.trip_notes.clone(),
        })
    }
}

fn parse_date(name: &str, raw: &str) -> Result<chrono::NaiveDateTime> {
    if raw.trim().is_empty() {
        return Err(ConsoleError::invalid_input(format!("{name} is required")));
    }
    wire_time::parse(raw)
        .ok_or_else(|| ConsoleError::invalid_input(format!("{name} '{raw}' is not a valid date")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> TripForm {
        TripForm {
            identifier: "Alps loop".into(),
            trip_type: "road trip".into(),
            start_date: "2024-01-01T10:00".into(),
            end_date: "2024-01-02T10:00".into(),
            start_place: "Geneva".into(),
            end_place: "Innsbruck".into(),
            trip_focus: "scenery".into(),
            trip_notes: String::new(),
            trip_id: None,
        }
    }

    #[test]
    fn create_body_has_iso_dates_and_no_id() {
        let body = serde_json::to_value(filled().to_fields().expect("fields")).expect("json");
        assert_eq!(body["start_date"], "2024-01-01T10:00");
        assert_eq!(body["end_date"], "2024-01-02T10:00");
        assert!(body.get("trip_id").is_none());
    }

    #[test]
    fn malformed_date_is_rejected_before_submission() {
        let mut form = filled();
        form.start_date = "tomorrow".into();
        let err = form.to_fields().expect_err("bad date");
        assert!(matches!(err, ConsoleError::InvalidInput(_)));
        assert!(err.to_string().contains("start date"));
    }

    #[test]
    fn reversed_window_is_rejected() {
        let mut form = filled();
        form.end_date = "2023-12-31T10:00".into();
        assert!(form.to_fields().is_err());
    }

    #[test]
    fn missing_required_field_is_named() {
        let mut form = filled();
        form.end_place = "  ".into();
        let err = form.to_fields().expect_err("missing");
        assert_eq!(err.to_string(), "invalid input: end place is required");
    }

    #[test]
    fn identifier_may_be_left_blank() {
        let mut form = filled();
        form.identifier = "   ".into();
        let fields = form.to_fields().expect("fields");
        assert_eq!(fields.identifier, "");
    }

    #[test]
    fn populate_then_submit_keeps_trip_details() {
        let trip: Trip = serde_json::from_value(serde_json::json!({
            "id": 9,
            "identifier": "Coast",
            "trip_type": "sailing",
            "start_date": "2024-05-01T08:00",
            "end_date": "2024-05-04T18:30",
            "start_place": "Split",
            "end_place": "Dubrovnik",
            "focus": "islands",
            "additional_requirements": null,
            "status": "Completed",
            "created_at": "2024-04-20 12:00:00"
        }))
        .expect("trip");

        let mut form = TripForm::default();
        form.populate_from(&trip);
        assert_eq!(form.mode(), FormMode::Update(TripId(9)));
        assert_eq!(form.end_date, "2024-05-04T18:30");
        assert_eq!(form.trip_notes, "");

        let fields = form.to_fields().expect("fields");
        assert_eq!(fields, TripFields::from_trip(&trip));
    }

    #[test]
    fn mode_follows_hidden_trip_id() {
        let mut form = filled();
        assert_eq!(form.mode(), FormMode::Create);
        assert_eq!(form.submit_label(), CREATE_LABEL);

        form.trip_id = Some(TripId(5));
        assert_eq!(form.mode(), FormMode::Update(TripId(5)));
        assert_eq!(form.submit_label(), UPDATE_LABEL);

        form.reset();
        assert_eq!(form, TripForm::default());
    }
}
