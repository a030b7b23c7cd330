mod action;
mod booking;
mod capabilities;
mod condition;
mod event;
mod payment;
pub mod query;
mod rule;
mod shared;
mod task;
mod user;

pub use action::{ActionConfig, SendMail, SendMailInterval};
pub use booking::{
    AnswerStatus, Booking, BookingAnswer, BookingOption, BookingTeacher, Context, OptionDate,
    OptionStatus,
};
pub use capabilities::{DatabaseFamily, ServerVersion, SplitStrategy, StoreCapabilities};
pub use condition::{
    Condition, ConditionConfig, ConditionContext, ConditionError, EnterUserProfileField,
    EventUserSource, MatchUserProfileField, OptionField, ProfileOperator,
    SelectBookingManagerInBo, SelectResponsibleContactInBo, SelectStudentInBo,
    SelectTeacherInBo, SelectUserFromEvent, SelectUserShoppingCart, SelectUsers, StudentRole,
};
pub use event::{BookingEvent, BookingEventName};
pub use payment::{Installment, InstallmentPlan, PaymentHistory, INSTALLMENTS_PATH};
pub use rule::{
    BookingRule, ConcernedRow, DateField, DaysBefore, ReactOnEvent, RuleConfig, RuleDefinition,
    RuleError, RulePayload, RuleType, ScanParams, ScheduledRow, TriggerPolicy, MAX_OFFSET_SECONDS,
    RULE_JSON_VERSION,
};
pub use shared::entity::{Entity, InvalidIDError, ID};
pub use shared::record::{row, TableRecord};
pub use task::{InvalidTaskStatus, ScheduledTask, TaskCustomData, TaskKey, TaskStatus};
pub use user::{ProfileData, ProfileField, User};
