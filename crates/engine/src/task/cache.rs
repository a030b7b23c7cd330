use booking_rules_domain::{BookingRule, ID};
use booking_rules_infra::BookingRulesContext;
use std::collections::HashMap;

/// Rules loaded while processing one batch of tasks. Lives only as long as
/// the batch, so edits made between batches are always seen.
pub struct RuleCache {
    rules: HashMap<ID, Option<BookingRule>>,
}

impl RuleCache {
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// The rule, loading it on first access. Missing rules are cached too.
    pub async fn get(&mut self, rule_id: &ID, ctx: &BookingRulesContext) -> Option<&BookingRule> {
        if !self.rules.contains_key(rule_id) {
            let rule = ctx.repos.rule_repo.find(rule_id).await;
            self.rules.insert(rule_id.clone(), rule);
        }
        self.rules.get(rule_id).and_then(|rule| rule.as_ref())
    }
}
