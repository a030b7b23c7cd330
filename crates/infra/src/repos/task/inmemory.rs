use super::ITaskRepo;
use crate::repos::shared::{inmemory_repo::*, repo::DeleteResult};
use booking_rules_domain::{ScheduledTask, TaskStatus, ID};

pub struct InMemoryTaskRepo {
    tasks: std::sync::Mutex<Vec<ScheduledTask>>,
}

impl InMemoryTaskRepo {
    pub fn new() -> Self {
        Self {
            tasks: std::sync::Mutex::new(vec![]),
        }
    }
}

#[async_trait::async_trait]
impl ITaskRepo for InMemoryTaskRepo {
    async fn upsert(&self, task: &ScheduledTask) -> anyhow::Result<()> {
        let key = task.key();
        upsert_by(
            task,
            &self.tasks,
            |existing| existing.key() == key,
            |existing| {
                if existing.nextruntime != task.nextruntime
                    || existing.rulesnapshot != task.rulesnapshot
                {
                    existing.status = TaskStatus::Pending;
                }
                existing.nextruntime = task.nextruntime;
                existing.runat = task.runat;
                existing.rulesnapshot = task.rulesnapshot.clone();
                existing.customdata = task.customdata.clone();
            },
        );
        Ok(())
    }

    async fn find(&self, task_id: &ID) -> Option<ScheduledTask> {
        find(task_id, &self.tasks)
    }

    async fn find_by_rule(&self, rule_id: &ID) -> anyhow::Result<Vec<ScheduledTask>> {
        Ok(find_by(&self.tasks, |task| task.ruleid == *rule_id))
    }

    async fn find_due(&self, now: i64) -> anyhow::Result<Vec<ScheduledTask>> {
        let mut tasks = find_by(&self.tasks, |task| task.is_due(now));
        tasks.sort_by_key(|task| task.runat);
        Ok(tasks)
    }

    async fn set_status(&self, task_id: &ID, status: TaskStatus) -> anyhow::Result<()> {
        update_many(&self.tasks, |task| task.id == *task_id, |task| task.status = status);
        Ok(())
    }

    async fn delete_pending_by_rule(&self, rule_id: &ID) -> anyhow::Result<DeleteResult> {
        Ok(delete_by(&self.tasks, |task| {
            task.ruleid == *rule_id && task.status == TaskStatus::Pending
        }))
    }
}
