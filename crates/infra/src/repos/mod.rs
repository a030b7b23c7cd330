mod rule;
mod shared;
mod task;

pub use rule::IRuleRepo;
use rule::{InMemoryRuleRepo, MySqlRuleRepo, PostgresRuleRepo};
pub use shared::repo::DeleteResult;
use sqlx::{MySqlPool, PgPool};
use std::sync::Arc;
pub use task::ITaskRepo;
use task::{InMemoryTaskRepo, MySqlTaskRepo, PostgresTaskRepo};

#[derive(Clone)]
pub struct Repos {
    pub rule_repo: Arc<dyn IRuleRepo>,
    pub task_repo: Arc<dyn ITaskRepo>,
}

impl Repos {
    pub fn create_postgres(pool: PgPool) -> Self {
        Self {
            rule_repo: Arc::new(PostgresRuleRepo::new(pool.clone())),
            task_repo: Arc::new(PostgresTaskRepo::new(pool)),
        }
    }

    pub fn create_mysql(pool: MySqlPool) -> Self {
        Self {
            rule_repo: Arc::new(MySqlRuleRepo::new(pool.clone())),
            task_repo: Arc::new(MySqlTaskRepo::new(pool)),
        }
    }

    pub fn create_inmemory() -> Self {
        Self {
            rule_repo: Arc::new(InMemoryRuleRepo::new()),
            task_repo: Arc::new(InMemoryTaskRepo::new()),
        }
    }
}
