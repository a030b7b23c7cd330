mod inmemory;
mod mysql;
mod postgres;
mod render;

pub use inmemory::InMemoryRowsStore;
pub use mysql::MySqlRowsStore;
pub use postgres::PostgresRowsStore;
pub use render::{render, Dialect, RenderError, RenderedQuery};

use booking_rules_domain::{
    query::{ComposedQuery, ResultRow, UNIQUE_KEY},
    StoreCapabilities,
};
use std::collections::HashSet;

/// Executes composed queries against the booking tables
#[async_trait::async_trait]
pub trait IConcernedRowsStore: Send + Sync {
    /// Negotiated when the store was set up
    fn capabilities(&self) -> StoreCapabilities;

    /// Rows in query order, unique by `uniqueid`
    async fn fetch_rows(&self, query: &ComposedQuery) -> anyhow::Result<Vec<ResultRow>>;
}

/// Keeps the first row of every `uniqueid`
pub(crate) fn unique_rows(rows: Vec<ResultRow>) -> Vec<ResultRow> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| match row.get(UNIQUE_KEY) {
            Some(key) => seen.insert(key.clone()),
            None => true,
        })
        .collect()
}
