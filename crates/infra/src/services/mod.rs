mod failure_reporter;
mod mailer;

pub use failure_reporter::{
    IFailureReporter, InMemoryFailureReporter, RuleFailure, TracingFailureReporter,
};
pub use mailer::{IMailer, InMemoryMailer, LogMailer, Mail};
