use crate::query::{ResultRow, Value};

/// A row of a host table read by composed queries.
///
/// The engine never writes these tables, the trait exists so that stores
/// without a database (tests, local runs) can be seeded with typed records.
pub trait TableRecord {
    const TABLE: &'static str;

    fn record_id(&self) -> i64;

    fn to_row(&self) -> ResultRow;
}

/// Builds a `ResultRow` from `(column, value)` pairs
pub fn row<I, V>(columns: I) -> ResultRow
where
    I: IntoIterator<Item = (&'static str, V)>,
    V: Into<Value>,
{
    columns
        .into_iter()
        .map(|(column, value)| (column.to_string(), value.into()))
        .collect()
}
