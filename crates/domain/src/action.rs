use crate::event::BookingEvent;
use crate::rule::{BookingRule, RuleError, ScheduledRow};
use crate::task::{ScheduledTask, TaskCustomData, TaskStatus};
use chrono::{TimeZone, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Sends one mail per concerned row at its run time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMail {
    pub subject: String,
    pub template: String,
}

impl SendMail {
    pub const NAME: &'static str = "send_mail";
}

/// Like `SendMail` but spreads the mails `interval` seconds apart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMailInterval {
    pub subject: String,
    pub template: String,
    pub interval: i64,
}

impl SendMailInterval {
    pub const NAME: &'static str = "send_mail_interval";
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionConfig {
    SendMail(SendMail),
    SendMailInterval(SendMailInterval),
}

fn parse<T: DeserializeOwned>(name: &str, data: serde_json::Value) -> Result<T, RuleError> {
    serde_json::from_value(data).map_err(|e| RuleError::InvalidConfiguration {
        variant: name.to_string(),
        reason: e.to_string(),
    })
}

/// Replaces `{rulename}`, `{date}` and `{optionid}` in a template
fn render(template: &str, rulename: &str, row: &ScheduledRow) -> String {
    let date = Utc
        .timestamp_opt(row.row.datefield, 0)
        .single()
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    template
        .replace("{rulename}", rulename)
        .replace("{date}", &date)
        .replace("{optionid}", &row.row.optionid.to_string())
}

impl ActionConfig {
    pub fn from_parts(name: &str, data: serde_json::Value) -> Result<Self, RuleError> {
        let action = match name {
            SendMail::NAME => Self::SendMail(parse(name, data)?),
            SendMailInterval::NAME => Self::SendMailInterval(parse(name, data)?),
            unknown => return Err(RuleError::UnknownAction(unknown.to_string())),
        };
        if let Self::SendMailInterval(action) = &action {
            if action.interval <= 0 {
                return Err(RuleError::InvalidConfiguration {
                    variant: name.to_string(),
                    reason: "`interval` must be positive".into(),
                });
            }
        }
        Ok(action)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SendMail(_) => SendMail::NAME,
            Self::SendMailInterval(_) => SendMailInterval::NAME,
        }
    }

    pub fn data(&self) -> serde_json::Value {
        let data = match self {
            Self::SendMail(action) => serde_json::to_value(action),
            Self::SendMailInterval(action) => serde_json::to_value(action),
        };
        data.unwrap_or(serde_json::Value::Null)
    }

    /// Turns the dispatched rows of `rule` into pending tasks, one per row
    /// and in row order
    pub fn schedule(
        &self,
        rule: &BookingRule,
        rulename: &str,
        rows: &[ScheduledRow],
        event: Option<&BookingEvent>,
    ) -> Vec<ScheduledTask> {
        let (subject, template, interval) = match self {
            Self::SendMail(a) => (&a.subject, &a.template, 0),
            Self::SendMailInterval(a) => (&a.subject, &a.template, a.interval),
        };
        rows.iter()
            .enumerate()
            .map(|(position, row)| ScheduledTask {
                id: Default::default(),
                ruleid: rule.id.clone(),
                userid: row.row.userid,
                optionid: row.row.optionid,
                optiondateid: row.row.optiondateid,
                rowkey: row.row.uniqueid.clone(),
                nextruntime: row.nextruntime,
                runat: row
                    .nextruntime
                    .saturating_add((position as i64).saturating_mul(interval)),
                rulesnapshot: rule.rulejson.clone(),
                customdata: TaskCustomData {
                    subject: render(subject, rulename, row),
                    message: render(template, rulename, row),
                    event: event.cloned(),
                },
                status: TaskStatus::Pending,
            })
            .collect()
    }
}
