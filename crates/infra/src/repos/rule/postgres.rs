use super::IRuleRepo;
use booking_rules_domain::{BookingRule, RuleType, ID};
use sqlx::{types::Uuid, FromRow, PgPool};
use std::convert::TryFrom;

pub struct PostgresRuleRepo {
    pool: PgPool,
}

impl PostgresRuleRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RuleRaw {
    rule_uid: Uuid,
    contextid: i64,
    ruletype: String,
    isactive: bool,
    rulejson: String,
}

impl TryFrom<RuleRaw> for BookingRule {
    type Error = anyhow::Error;

    fn try_from(raw: RuleRaw) -> anyhow::Result<Self> {
        Ok(Self {
            id: raw.rule_uid.into(),
            contextid: raw.contextid,
            ruletype: raw.ruletype.parse()?,
            isactive: raw.isactive,
            rulejson: raw.rulejson,
        })
    }
}

#[async_trait::async_trait]
impl IRuleRepo for PostgresRuleRepo {
    async fn insert(&self, rule: &BookingRule) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO booking_rules(rule_uid, contextid, ruletype, isactive, rulejson)
            VALUES($1, $2, $3, $4, $5)
            "#,
        )
        .bind(rule.id.inner_ref())
        .bind(rule.contextid)
        .bind(rule.ruletype.as_str())
        .bind(rule.isactive)
        .bind(&rule.rulejson)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save(&self, rule: &BookingRule) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE booking_rules
            SET contextid = $2,
                ruletype = $3,
                isactive = $4,
                rulejson = $5
            WHERE rule_uid = $1
            "#,
        )
        .bind(rule.id.inner_ref())
        .bind(rule.contextid)
        .bind(rule.ruletype.as_str())
        .bind(rule.isactive)
        .bind(&rule.rulejson)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, rule_id: &ID) -> Option<BookingRule> {
        let raw: RuleRaw = sqlx::query_as(
            r#"
            SELECT * FROM booking_rules AS r
            WHERE r.rule_uid = $1
            "#,
        )
        .bind(rule_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .ok()??;
        BookingRule::try_from(raw).ok()
    }

    async fn find_active_by_type(&self, ruletype: RuleType) -> anyhow::Result<Vec<BookingRule>> {
        let rules: Vec<RuleRaw> = sqlx::query_as(
            r#"
            SELECT * FROM booking_rules AS r
            WHERE r.isactive AND r.ruletype = $1
            "#,
        )
        .bind(ruletype.as_str())
        .fetch_all(&self.pool)
        .await?;
        rules.into_iter().map(BookingRule::try_from).collect()
    }

    async fn delete(&self, rule_id: &ID) -> Option<BookingRule> {
        let raw: RuleRaw = sqlx::query_as(
            r#"
            DELETE FROM booking_rules AS r
            WHERE r.rule_uid = $1
            RETURNING *
            "#,
        )
        .bind(rule_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .ok()??;
        BookingRule::try_from(raw).ok()
    }
}
