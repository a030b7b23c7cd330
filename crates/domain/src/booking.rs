use crate::query::{ResultRow, Value};
use crate::shared::record::{row, TableRecord};
use serde::{Deserialize, Serialize};

/// A booking instance. Options belong to it and it names the booking manager.
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub id: i64,
    pub name: String,
    /// Username of the booking manager
    pub bookingmanager: String,
}

impl TableRecord for Booking {
    const TABLE: &'static str = "booking";

    fn record_id(&self) -> i64 {
        self.id
    }

    fn to_row(&self) -> ResultRow {
        row(vec![
            ("id", Value::Int(self.id)),
            ("name", self.name.as_str().into()),
            ("bookingmanager", self.bookingmanager.as_str().into()),
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionStatus {
    Normal = 0,
    Cancelled = 1,
    Delayed = 2,
}

/// A bookable option of a booking instance, e.g. a course
#[derive(Debug, Clone, PartialEq)]
pub struct BookingOption {
    pub id: i64,
    pub bookingid: i64,
    pub contextid: i64,
    pub text: String,
    pub location: String,
    pub institution: String,
    pub address: String,
    pub coursestarttime: Option<i64>,
    pub courseendtime: Option<i64>,
    pub bookingopeningtime: Option<i64>,
    pub bookingclosingtime: Option<i64>,
    /// See `OptionStatus`, negative values mark archived options
    pub status: i64,
    /// Comma separated user ids
    pub responsiblecontact: Option<String>,
    pub selflearningcourse: bool,
    /// Duration in seconds, used by self learning courses
    pub duration: i64,
    pub timemodified: i64,
}

impl BookingOption {
    pub fn new(id: i64, bookingid: i64) -> Self {
        Self {
            id,
            bookingid,
            contextid: 1,
            text: format!("Option {}", id),
            location: String::new(),
            institution: String::new(),
            address: String::new(),
            coursestarttime: None,
            courseendtime: None,
            bookingopeningtime: None,
            bookingclosingtime: None,
            status: OptionStatus::Normal as i64,
            responsiblecontact: None,
            selflearningcourse: false,
            duration: 0,
            timemodified: 0,
        }
    }
}

impl TableRecord for BookingOption {
    const TABLE: &'static str = "booking_options";

    fn record_id(&self) -> i64 {
        self.id
    }

    fn to_row(&self) -> ResultRow {
        row(vec![
            ("id", Value::Int(self.id)),
            ("bookingid", self.bookingid.into()),
            ("contextid", self.contextid.into()),
            ("text", self.text.as_str().into()),
            ("location", self.location.as_str().into()),
            ("institution", self.institution.as_str().into()),
            ("address", self.address.as_str().into()),
            ("coursestarttime", self.coursestarttime.into()),
            ("courseendtime", self.courseendtime.into()),
            ("bookingopeningtime", self.bookingopeningtime.into()),
            ("bookingclosingtime", self.bookingclosingtime.into()),
            ("status", self.status.into()),
            ("responsiblecontact", self.responsiblecontact.clone().into()),
            ("selflearningcourse", Value::Int(self.selflearningcourse as i64)),
            ("duration", self.duration.into()),
            ("timemodified", self.timemodified.into()),
        ])
    }
}

/// A session of an option
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDate {
    pub id: i64,
    pub optionid: i64,
    pub coursestarttime: i64,
    pub courseendtime: i64,
    /// Overrides the notification offset of date rules for this session
    /// when positive
    pub daystonotify: i64,
}

impl TableRecord for OptionDate {
    const TABLE: &'static str = "booking_optiondates";

    fn record_id(&self) -> i64 {
        self.id
    }

    fn to_row(&self) -> ResultRow {
        row(vec![
            ("id", self.id),
            ("optionid", self.optionid),
            ("coursestarttime", self.coursestarttime),
            ("courseendtime", self.courseendtime),
            ("daystonotify", self.daystonotify),
        ])
    }
}

/// Status code stored in the `waitinglist` column of an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerStatus {
    Booked = 0,
    WaitingList = 1,
    Reserved = 2,
    NotifyMeList = 3,
    NotBooked = 4,
    Deleted = 5,
}

/// A user's answer (booking, waiting list entry, ...) to an option
#[derive(Debug, Clone, PartialEq)]
pub struct BookingAnswer {
    pub id: i64,
    pub optionid: i64,
    pub userid: i64,
    pub status: AnswerStatus,
    pub timecreated: i64,
    pub timemodified: i64,
}

impl TableRecord for BookingAnswer {
    const TABLE: &'static str = "booking_answers";

    fn record_id(&self) -> i64 {
        self.id
    }

    fn to_row(&self) -> ResultRow {
        row(vec![
            ("id", self.id),
            ("optionid", self.optionid),
            ("userid", self.userid),
            ("waitinglist", self.status as i64),
            ("timecreated", self.timecreated),
            ("timemodified", self.timemodified),
        ])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingTeacher {
    pub id: i64,
    pub optionid: i64,
    pub userid: i64,
}

impl TableRecord for BookingTeacher {
    const TABLE: &'static str = "booking_teachers";

    fn record_id(&self) -> i64 {
        self.id
    }

    fn to_row(&self) -> ResultRow {
        row(vec![
            ("id", self.id),
            ("optionid", self.optionid),
            ("userid", self.userid),
        ])
    }
}

/// A node of the context tree rules are scoped to
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub id: i64,
    /// Ids from the root down to this context, e.g. `/1/3/45`
    pub path: String,
}

impl Context {
    pub const SYSTEM: i64 = 1;
}

impl TableRecord for Context {
    const TABLE: &'static str = "context";

    fn record_id(&self) -> i64 {
        self.id
    }

    fn to_row(&self) -> ResultRow {
        row(vec![
            ("id", Value::Int(self.id)),
            ("path", self.path.as_str().into()),
        ])
    }
}
