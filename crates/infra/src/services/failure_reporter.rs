use booking_rules_domain::ID;
use std::sync::Mutex;
use tracing::error;

/// A rule that failed while being executed by the driver
#[derive(Debug, Clone, PartialEq)]
pub struct RuleFailure {
    pub rule_id: ID,
    /// The usecase that failed, e.g. `ExecuteRule`
    pub operation: &'static str,
    pub message: String,
}

pub trait IFailureReporter: Send + Sync {
    fn report(&self, failure: RuleFailure);
}

pub struct TracingFailureReporter {}

impl IFailureReporter for TracingFailureReporter {
    fn report(&self, failure: RuleFailure) {
        error!(
            rule_id = %failure.rule_id,
            operation = failure.operation,
            "Rule failed: {}",
            failure.message
        );
    }
}

pub struct InMemoryFailureReporter {
    failures: Mutex<Vec<RuleFailure>>,
}

impl InMemoryFailureReporter {
    pub fn new() -> Self {
        Self {
            failures: Mutex::new(vec![]),
        }
    }

    pub fn failures(&self) -> Vec<RuleFailure> {
        self.failures.lock().unwrap().clone()
    }
}

impl IFailureReporter for InMemoryFailureReporter {
    fn report(&self, failure: RuleFailure) {
        self.failures.lock().unwrap().push(failure);
    }
}
