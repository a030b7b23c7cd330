use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Lifecycle events of the booking system that event rules can react on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingEventName {
    BookingoptionBooked,
    BookingoptionCancelled,
    BookingoptionUpdated,
    BookingoptionCompleted,
    BookinganswerCancelled,
    BookinganswerWaitinglistconfirmed,
    BookingoptionWaitinglistBooked,
}

impl Display for BookingEventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The serialized form is the stable identifier
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(name)) => write!(f, "{}", name),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// Payload of a booking event as dispatched by the host's event bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingEvent {
    pub eventname: BookingEventName,
    pub optionid: i64,
    #[serde(default)]
    pub optiondateid: Option<i64>,
    /// The user who triggered the event
    pub userid: i64,
    /// The user affected by the event, e.g. the user who was booked by a teacher
    #[serde(default)]
    pub relateduserid: Option<i64>,
    pub timecreated: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_use_their_stable_identifiers() {
        assert_eq!(
            BookingEventName::BookingoptionCancelled.to_string(),
            "bookingoption_cancelled"
        );
        let name: BookingEventName = serde_json::from_str("\"bookingoption_booked\"").unwrap();
        assert_eq!(name, BookingEventName::BookingoptionBooked);
    }

    #[test]
    fn optional_event_fields_default_to_none() {
        let event: BookingEvent = serde_json::from_str(
            r#"{"eventname":"bookingoption_booked","optionid":3,"userid":4,"timecreated":10}"#,
        )
        .unwrap();
        assert_eq!(event.relateduserid, None);
        assert_eq!(event.optiondateid, None);
    }
}
