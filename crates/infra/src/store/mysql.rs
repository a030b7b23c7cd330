use super::{render, unique_rows, Dialect, IConcernedRowsStore};
use booking_rules_domain::{
    query::{ComposedQuery, ResultRow, Value, ValueKind},
    DatabaseFamily, ServerVersion, StoreCapabilities,
};
use sqlx::{mysql::MySqlRow, MySqlPool, Row};
use tracing::info;

pub struct MySqlRowsStore {
    pool: MySqlPool,
    capabilities: StoreCapabilities,
}

impl MySqlRowsStore {
    /// Negotiates the capabilities from the configured server version or,
    /// when none is configured, from the version reported by the server
    pub async fn connect(pool: MySqlPool, version: Option<ServerVersion>) -> anyhow::Result<Self> {
        let reported: String = sqlx::query_scalar("SELECT VERSION()")
            .fetch_one(&pool)
            .await?;
        let family = if reported.to_lowercase().contains("mariadb") {
            DatabaseFamily::MariaDb
        } else {
            DatabaseFamily::MySql
        };
        let version = version.or_else(|| ServerVersion::parse(&reported));
        let capabilities = StoreCapabilities::negotiate(family, version);
        info!(
            "Connected to {} {}, json records: {}",
            family, reported, capabilities.json_records
        );
        Ok(Self { pool, capabilities })
    }
}

fn decode(row: &MySqlRow, query: &ComposedQuery) -> anyhow::Result<ResultRow> {
    let mut result = ResultRow::new();
    for item in &query.select {
        let value = match item.kind {
            ValueKind::Int => row.try_get::<Option<i64>, _>(item.alias.as_str())?.into(),
            ValueKind::Text => row.try_get::<Option<String>, _>(item.alias.as_str())?.into(),
        };
        result.insert(item.alias.clone(), value);
    }
    Ok(result)
}

#[async_trait::async_trait]
impl IConcernedRowsStore for MySqlRowsStore {
    fn capabilities(&self) -> StoreCapabilities {
        self.capabilities
    }

    async fn fetch_rows(&self, query: &ComposedQuery) -> anyhow::Result<Vec<ResultRow>> {
        let rendered = render(query, Dialect::MySql)?;
        let mut statement = sqlx::query(&rendered.sql);
        for param in rendered.params {
            statement = match param {
                Value::Int(v) => statement.bind(v),
                Value::Text(v) => statement.bind(v),
                Value::Null => statement.bind(None::<i64>),
            };
        }
        let rows = statement.fetch_all(&self.pool).await?;
        let rows = rows
            .iter()
            .map(|row| decode(row, query))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(unique_rows(rows))
    }
}
