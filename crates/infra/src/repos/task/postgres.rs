use super::{optiondate_from_db, optiondate_to_db, ITaskRepo};
use crate::repos::shared::repo::DeleteResult;
use booking_rules_domain::{ScheduledTask, TaskCustomData, TaskStatus, ID};
use sqlx::{
    types::{Json, Uuid},
    FromRow, PgPool,
};
use std::convert::TryFrom;

pub struct PostgresTaskRepo {
    pool: PgPool,
}

impl PostgresTaskRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TaskRaw {
    task_uid: Uuid,
    rule_uid: Uuid,
    userid: i64,
    optionid: i64,
    optiondateid: i64,
    rowkey: String,
    nextruntime: i64,
    runat: i64,
    rulesnapshot: String,
    customdata: Json<TaskCustomData>,
    status: String,
}

impl TryFrom<TaskRaw> for ScheduledTask {
    type Error = anyhow::Error;

    fn try_from(raw: TaskRaw) -> anyhow::Result<Self> {
        Ok(Self {
            id: raw.task_uid.into(),
            ruleid: raw.rule_uid.into(),
            userid: raw.userid,
            optionid: raw.optionid,
            optiondateid: optiondate_from_db(raw.optiondateid),
            rowkey: raw.rowkey,
            nextruntime: raw.nextruntime,
            runat: raw.runat,
            rulesnapshot: raw.rulesnapshot,
            customdata: raw.customdata.0,
            status: raw.status.parse()?,
        })
    }
}

#[async_trait::async_trait]
impl ITaskRepo for PostgresTaskRepo {
    async fn upsert(&self, task: &ScheduledTask) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO booking_rule_tasks
                (task_uid, rule_uid, userid, optionid, optiondateid, rowkey, nextruntime, runat, rulesnapshot, customdata, status)
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (rule_uid, userid, optionid, optiondateid, rowkey) DO UPDATE
            SET status = CASE
                    WHEN booking_rule_tasks.nextruntime = EXCLUDED.nextruntime
                        AND booking_rule_tasks.rulesnapshot = EXCLUDED.rulesnapshot
                    THEN booking_rule_tasks.status
                    ELSE EXCLUDED.status
                END,
                nextruntime = EXCLUDED.nextruntime,
                runat = EXCLUDED.runat,
                rulesnapshot = EXCLUDED.rulesnapshot,
                customdata = EXCLUDED.customdata
            "#,
        )
        .bind(task.id.inner_ref())
        .bind(task.ruleid.inner_ref())
        .bind(task.userid)
        .bind(task.optionid)
        .bind(optiondate_to_db(task.optiondateid))
        .bind(&task.rowkey)
        .bind(task.nextruntime)
        .bind(task.runat)
        .bind(&task.rulesnapshot)
        .bind(Json(&task.customdata))
        .bind(TaskStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, task_id: &ID) -> Option<ScheduledTask> {
        let raw: TaskRaw = sqlx::query_as(
            r#"
            SELECT * FROM booking_rule_tasks AS t
            WHERE t.task_uid = $1
            "#,
        )
        .bind(task_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .ok()??;
        ScheduledTask::try_from(raw).ok()
    }

    async fn find_by_rule(&self, rule_id: &ID) -> anyhow::Result<Vec<ScheduledTask>> {
        let tasks: Vec<TaskRaw> = sqlx::query_as(
            r#"
            SELECT * FROM booking_rule_tasks AS t
            WHERE t.rule_uid = $1
            "#,
        )
        .bind(rule_id.inner_ref())
        .fetch_all(&self.pool)
        .await?;
        tasks.into_iter().map(ScheduledTask::try_from).collect()
    }

    async fn find_due(&self, now: i64) -> anyhow::Result<Vec<ScheduledTask>> {
        let tasks: Vec<TaskRaw> = sqlx::query_as(
            r#"
            SELECT * FROM booking_rule_tasks AS t
            WHERE t.status = $1 AND t.runat <= $2
            ORDER BY t.runat
            "#,
        )
        .bind(TaskStatus::Pending.as_str())
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        tasks.into_iter().map(ScheduledTask::try_from).collect()
    }

    async fn set_status(&self, task_id: &ID, status: TaskStatus) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE booking_rule_tasks
            SET status = $2
            WHERE task_uid = $1
            "#,
        )
        .bind(task_id.inner_ref())
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_pending_by_rule(&self, rule_id: &ID) -> anyhow::Result<DeleteResult> {
        let res = sqlx::query(
            r#"
            DELETE FROM booking_rule_tasks AS t
            WHERE t.rule_uid = $1 AND t.status = $2
            "#,
        )
        .bind(rule_id.inner_ref())
        .bind(TaskStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;
        Ok(DeleteResult {
            deleted_count: res.rows_affected() as i64,
        })
    }
}
