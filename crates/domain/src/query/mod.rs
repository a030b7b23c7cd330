mod builder;
mod expr;
mod value;

pub use builder::{ComposedQuery, QueryBuilder, QueryError, UNIQUE_KEY, USER_ID};
pub use expr::{
    col, lit, ArithOp, ColumnRef, CompareOp, Expr, Join, JoinKind, JoinSource, JsonColumn,
    MAX_SPLIT_IDS, SelectItem, SortItem, SPLIT_VALUE_COLUMN,
};
pub use value::{ResultRow, Value, ValueKind};
