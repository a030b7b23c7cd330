mod inmemory;
mod mysql;
mod postgres;

pub use inmemory::InMemoryRuleRepo;
pub use mysql::MySqlRuleRepo;
pub use postgres::PostgresRuleRepo;

use booking_rules_domain::{BookingRule, RuleType, ID};

#[async_trait::async_trait]
pub trait IRuleRepo: Send + Sync {
    async fn insert(&self, rule: &BookingRule) -> anyhow::Result<()>;
    async fn save(&self, rule: &BookingRule) -> anyhow::Result<()>;
    async fn find(&self, rule_id: &ID) -> Option<BookingRule>;
    async fn find_active_by_type(&self, ruletype: RuleType) -> anyhow::Result<Vec<BookingRule>>;
    async fn delete(&self, rule_id: &ID) -> Option<BookingRule>;
}
