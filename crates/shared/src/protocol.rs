use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{TripId, TripStatus},
    wire_time,
};

/// A trip as returned by `GET /trips` and `GET /trips/{id}`.
///
/// The list endpoint leaves out `html_content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub identifier: String,
    pub trip_type: String,
    #[serde(with = "wire_time::minutes")]
    pub start_date: NaiveDateTime,
    #[serde(with = "wire_time::minutes")]
    pub end_date: NaiveDateTime,
    pub start_place: String,
    pub end_place: String,
    #[serde(default, alias = "trip_focus")]
    pub focus: String,
    #[serde(default, alias = "trip_notes")]
    pub additional_requirements: Option<String>,
    #[serde(default)]
    pub status: TripStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_content: Option<String>,
    #[serde(with = "wire_time::seconds")]
    pub created_at: NaiveDateTime,
}

/// Body of `POST /trips` and `PUT /trips/{id}`. Carries no trip id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripFields {
    pub identifier: String,
    pub trip_type: String,
    #[serde(with = "wire_time::minutes")]
    pub start_date: NaiveDateTime,
    #[serde(with = "wire_time::minutes")]
    pub end_date: NaiveDateTime,
    pub start_place: String,
    pub end_place: String,
    pub trip_focus: String,
    #[serde(default)]
    pub trip_notes: String,
}

impl TripFields {
    pub fn from_trip(trip: &Trip) -> Self {
        Self {
            identifier: trip.identifier.clone(),
            trip_type: trip.trip_type.clone(),
            start_date: trip.start_date,
            end_date: trip.end_date,
            start_place: trip.start_place.clone(),
            end_place: trip.end_place.clone(),
            trip_focus: trip.focus.clone(),
            trip_notes: trip.additional_requirements.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTripResponse {
    pub trip_id: TripId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUpdate {
    pub html_content: String,
}

/// Reply of `POST /trips/{id}/generate`.
///
/// Servers answer with either a full trip or just `{status, html_content}`;
/// only those two fields matter to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenerateResponse {
    #[serde(default)]
    pub status: TripStatus,
    #[serde(default)]
    pub html_content: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn list_row() -> serde_json::Value {
        json!({
            "id": 3,
            "identifier": "Lisbon weekend",
            "trip_type": "leisure",
            "start_date": "2024-01-01T10:00",
            "end_date": "2024-01-03T18:30",
            "start_place": "Porto",
            "end_place": "Lisbon",
            "focus": "food",
            "additional_requirements": null,
            "created_at": "2023-12-20 09:01:02",
            "status": ""
        })
    }

    #[test]
    fn decodes_list_row_without_content() {
        let trip: Trip = serde_json::from_value(list_row()).expect("trip");
        assert_eq!(trip.id, TripId(3));
        assert_eq!(trip.status, TripStatus::Pending);
        assert!(trip.html_content.is_none());
        assert!(trip.additional_requirements.is_none());
    }

    #[test]
    fn accepts_request_side_field_names() {
        let mut row = list_row();
        let obj = row.as_object_mut().expect("object");
        obj.remove("focus");
        obj.remove("additional_requirements");
        obj.insert("trip_focus".into(), json!("museums"));
        obj.insert("trip_notes".into(), json!("no early starts"));
        let trip: Trip = serde_json::from_value(row).expect("trip");
        assert_eq!(trip.focus, "museums");
        assert_eq!(trip.additional_requirements.as_deref(), Some("no early starts"));
    }

    #[test]
    fn fields_never_carry_a_trip_id() {
        let trip: Trip = serde_json::from_value(list_row()).expect("trip");
        let body = serde_json::to_value(TripFields::from_trip(&trip)).expect("json");
        assert!(body.get("trip_id").is_none());
        assert!(body.get("id").is_none());
        assert_eq!(body["start_date"], "2024-01-01T10:00");
        assert_eq!(body["trip_notes"], "");
    }

    #[test]
    fn regenerate_reply_reads_partial_and_full_bodies() {
        let partial: RegenerateResponse =
            serde_json::from_value(json!({"status": "Completed", "html_content": "<p>x</p>"}))
                .expect("partial");
        assert_eq!(partial.status, TripStatus::Completed);

        let full: RegenerateResponse = serde_json::from_value(list_row()).expect("full");
        assert_eq!(full.status, TripStatus::Pending);
        assert!(full.html_content.is_none());
    }
}
