use booking_rules_domain::{
    BookingOption, BookingRule, Context, RuleDefinition, StoreCapabilities, TableRecord, User,
};
use booking_rules_infra::{
    BookingRulesContext, InMemoryFailureReporter, InMemoryMailer, InMemoryRowsStore,
    StaticTimeSys,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub const NOW: i64 = 1_700_000_000;
pub const DAY: i64 = 86400;

/// An in-memory context with handles on its test doubles
pub struct TestContext {
    pub ctx: BookingRulesContext,
    pub store: Arc<InMemoryRowsStore>,
    pub mailer: Arc<InMemoryMailer>,
    pub failures: Arc<InMemoryFailureReporter>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_mailer(InMemoryMailer::new())
    }

    pub fn with_mailer(mailer: InMemoryMailer) -> Self {
        let store = Arc::new(InMemoryRowsStore::new(StoreCapabilities::postgres()));
        let mailer = Arc::new(mailer);
        let failures = Arc::new(InMemoryFailureReporter::new());
        let mut ctx = BookingRulesContext::create_inmemory();
        ctx.store = store.clone();
        ctx.mailer = mailer.clone();
        ctx.failure_reporter = failures.clone();
        ctx.sys = Arc::new(StaticTimeSys(NOW));
        Self {
            ctx,
            store,
            mailer,
            failures,
        }
    }

    pub fn set_time(&mut self, now: i64) {
        self.ctx.sys = Arc::new(StaticTimeSys(now));
    }

    pub fn insert<T: TableRecord>(&self, record: &T) {
        self.store.insert(record);
    }

    /// An option of the system context starting at `start`
    pub fn option(&self, id: i64, start: i64) -> BookingOption {
        let mut option = BookingOption::new(id, 1);
        option.contextid = Context::SYSTEM;
        option.coursestarttime = Some(start);
        self.insert(&option);
        option
    }

    pub fn user(&self, id: i64) -> User {
        let user = User::new(id, &format!("user{}", id));
        self.insert(&user);
        user
    }

    pub async fn rule(&self, rulejson: String) -> BookingRule {
        let definition = RuleDefinition::from_json(&rulejson).expect("Valid rule json");
        let rule = BookingRule::new(Context::SYSTEM, &definition);
        self.ctx.repos.rule_repo.insert(&rule).await.unwrap();
        rule
    }
}

pub fn rulejson(ruledata: Value, conditionname: &str, conditiondata: Value) -> String {
    let rulename = if ruledata.get("boevent").is_some() {
        "rule_react_on_event"
    } else {
        "rule_daysbefore"
    };
    json!({
        "name": "Reminder",
        "rulename": rulename,
        "ruledata": ruledata,
        "conditionname": conditionname,
        "conditiondata": conditiondata,
        "actionname": "send_mail",
        "actiondata": { "subject": "{rulename}", "template": "Option {optionid} starts {date}" }
    })
    .to_string()
}

/// One day before the course start, for the given users
pub fn day_before_rule(userids: &[i64]) -> String {
    rulejson(
        json!({ "seconds": DAY, "datefield": "coursestarttime" }),
        "select_users",
        json!({ "userids": userids }),
    )
}
