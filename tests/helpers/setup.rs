use booking_rules_domain::{BookingOption, StoreCapabilities, TableRecord, User};
use booking_rules_infra::{
    BookingRulesContext, InMemoryFailureReporter, InMemoryMailer, InMemoryRowsStore,
    StaticTimeSys,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub const NOW: i64 = 1_700_000_000;
pub const DAY: i64 = 86400;

pub struct TestApp {
    pub ctx: BookingRulesContext,
    pub store: Arc<InMemoryRowsStore>,
    pub mailer: Arc<InMemoryMailer>,
    pub failures: Arc<InMemoryFailureReporter>,
}

impl TestApp {
    pub fn set_time(&mut self, now: i64) {
        self.ctx.sys = Arc::new(StaticTimeSys(now));
    }

    pub fn insert<T: TableRecord>(&self, record: &T) {
        self.store.insert(record);
    }

    pub fn option(&self, id: i64, contextid: i64, start: i64) -> BookingOption {
        let mut option = BookingOption::new(id, 1);
        option.contextid = contextid;
        option.coursestarttime = Some(start);
        self.insert(&option);
        option
    }

    pub fn users(&self, ids: &[i64]) {
        for id in ids {
            self.insert(&User::new(*id, &format!("user{}", id)));
        }
    }
}

// Wire the engine against in-memory storage and a frozen clock
pub fn spawn_app() -> TestApp {
    let store = Arc::new(InMemoryRowsStore::new(StoreCapabilities::postgres()));
    let mailer = Arc::new(InMemoryMailer::new());
    let failures = Arc::new(InMemoryFailureReporter::new());
    let mut ctx = BookingRulesContext::create_inmemory();
    ctx.store = store.clone();
    ctx.mailer = mailer.clone();
    ctx.failure_reporter = failures.clone();
    ctx.sys = Arc::new(StaticTimeSys(NOW));
    TestApp {
        ctx,
        store,
        mailer,
        failures,
    }
}

pub fn rulejson(ruledata: Value, conditionname: &str, conditiondata: Value) -> String {
    let rulename = if ruledata.get("boevent").is_some() {
        "rule_react_on_event"
    } else {
        "rule_daysbefore"
    };
    json!({
        "version": 1,
        "name": "Course reminder",
        "rulename": rulename,
        "ruledata": ruledata,
        "conditionname": conditionname,
        "conditiondata": conditiondata,
        "actionname": "send_mail",
        "actiondata": {
            "subject": "{rulename}",
            "template": "Your course starts on {date}"
        }
    })
    .to_string()
}
