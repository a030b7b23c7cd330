use crate::event::BookingEvent;
use crate::shared::entity::{Entity, ID};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Sent,
    /// The rule no longer applied when the task was due
    Suppressed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Sent => "sent",
            TaskStatus::Suppressed => "suppressed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Unknown task status `{0}`")]
pub struct InvalidTaskStatus(pub String);

impl FromStr for TaskStatus {
    type Err = InvalidTaskStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "sent" => Ok(TaskStatus::Sent),
            "suppressed" => Ok(TaskStatus::Suppressed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(InvalidTaskStatus(other.to_string())),
        }
    }
}

/// What the action wants to deliver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskCustomData {
    pub subject: String,
    pub message: String,
    /// The event that triggered an event rule
    #[serde(default)]
    pub event: Option<BookingEvent>,
}

/// Identity of a scheduled task. Scheduling a task with the same key
/// updates the existing task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskKey {
    pub ruleid: ID,
    pub userid: i64,
    pub optionid: i64,
    pub optiondateid: Option<i64>,
    /// `uniqueid` of the concerned row. Tells apart rows of one user and
    /// option, like the open installments of a payment plan.
    pub rowkey: String,
}

/// A notification scheduled by a rule's action for one concerned row
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTask {
    pub id: ID,
    pub ruleid: ID,
    pub userid: i64,
    pub optionid: i64,
    pub optiondateid: Option<i64>,
    pub rowkey: String,
    /// Run time computed by the rule, compared when the task is due
    pub nextruntime: i64,
    /// When the task fires
    pub runat: i64,
    /// The rule json at scheduling time
    pub rulesnapshot: String,
    pub customdata: TaskCustomData,
    pub status: TaskStatus,
}

impl ScheduledTask {
    pub fn key(&self) -> TaskKey {
        TaskKey {
            ruleid: self.ruleid.clone(),
            userid: self.userid,
            optionid: self.optionid,
            optiondateid: self.optiondateid,
            rowkey: self.rowkey.clone(),
        }
    }

    pub fn is_due(&self, now: i64) -> bool {
        self.status == TaskStatus::Pending && self.runat <= now
    }
}

impl Entity for ScheduledTask {
    fn id(&self) -> &ID {
        &self.id
    }
}
