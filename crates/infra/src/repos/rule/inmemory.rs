use super::IRuleRepo;
use crate::repos::shared::inmemory_repo::*;
use booking_rules_domain::{BookingRule, RuleType, ID};

pub struct InMemoryRuleRepo {
    rules: std::sync::Mutex<Vec<BookingRule>>,
}

impl InMemoryRuleRepo {
    pub fn new() -> Self {
        Self {
            rules: std::sync::Mutex::new(vec![]),
        }
    }
}

#[async_trait::async_trait]
impl IRuleRepo for InMemoryRuleRepo {
    async fn insert(&self, rule: &BookingRule) -> anyhow::Result<()> {
        insert(rule, &self.rules);
        Ok(())
    }

    async fn save(&self, rule: &BookingRule) -> anyhow::Result<()> {
        save(rule, &self.rules);
        Ok(())
    }

    async fn find(&self, rule_id: &ID) -> Option<BookingRule> {
        find(rule_id, &self.rules)
    }

    async fn find_active_by_type(&self, ruletype: RuleType) -> anyhow::Result<Vec<BookingRule>> {
        Ok(find_by(&self.rules, |rule| {
            rule.isactive && rule.ruletype == ruletype
        }))
    }

    async fn delete(&self, rule_id: &ID) -> Option<BookingRule> {
        delete(rule_id, &self.rules)
    }
}
