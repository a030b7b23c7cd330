use crate::query::{ResultRow, Value};
use crate::shared::record::{row, TableRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub deleted: bool,
    pub suspended: bool,
}

impl User {
    pub fn new(id: i64, username: &str) -> Self {
        Self {
            id,
            username: username.to_string(),
            firstname: String::new(),
            lastname: String::new(),
            email: format!("{}@example.com", username),
            deleted: false,
            suspended: false,
        }
    }
}

impl TableRecord for User {
    const TABLE: &'static str = "user";

    fn record_id(&self) -> i64 {
        self.id
    }

    fn to_row(&self) -> ResultRow {
        row(vec![
            ("id", Value::Int(self.id)),
            ("username", self.username.as_str().into()),
            ("firstname", self.firstname.as_str().into()),
            ("lastname", self.lastname.as_str().into()),
            ("email", self.email.as_str().into()),
            ("deleted", Value::Int(self.deleted as i64)),
            ("suspended", Value::Int(self.suspended as i64)),
        ])
    }
}

/// Definition of a custom user profile field
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileField {
    pub id: i64,
    pub shortname: String,
}

impl TableRecord for ProfileField {
    const TABLE: &'static str = "user_info_field";

    fn record_id(&self) -> i64 {
        self.id
    }

    fn to_row(&self) -> ResultRow {
        row(vec![
            ("id", Value::Int(self.id)),
            ("shortname", self.shortname.as_str().into()),
        ])
    }
}

/// Value of a custom profile field for one user
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileData {
    pub id: i64,
    pub userid: i64,
    pub fieldid: i64,
    pub data: String,
}

impl TableRecord for ProfileData {
    const TABLE: &'static str = "user_info_data";

    fn record_id(&self) -> i64 {
        self.id
    }

    fn to_row(&self) -> ResultRow {
        row(vec![
            ("id", Value::Int(self.id)),
            ("userid", self.userid.into()),
            ("fieldid", self.fieldid.into()),
            ("data", self.data.as_str().into()),
        ])
    }
}
