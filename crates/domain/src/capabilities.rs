use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseFamily {
    Postgres,
    MySql,
    MariaDb,
    /// Any other database, only reachable with the in-memory store
    Other,
}

impl Display for DatabaseFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DatabaseFamily::Postgres => "postgres",
            DatabaseFamily::MySql => "mysql",
            DatabaseFamily::MariaDb => "mariadb",
            DatabaseFamily::Other => "other",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
}

impl ServerVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parses versions like `10.6`, `8.0.32` or `10.6.12-MariaDB`
    pub fn parse(version: &str) -> Option<Self> {
        let mut parts = version
            .split(|c: char| !c.is_ascii_digit())
            .filter(|p| !p.is_empty());
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        Some(Self { major, minor })
    }
}

/// How a backing store turns a comma separated id list into rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStrategy {
    /// `regexp_split_to_table`
    RegexSplit,
    /// Join on a generated number sequence and extract each entry with
    /// `SUBSTRING_INDEX`
    NumberSequence,
}

/// What the backing store can do beyond plain SQL.
///
/// Negotiated once when the store is set up and then consulted by the
/// conditions that need vendor specific features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCapabilities {
    pub family: DatabaseFamily,
    pub version: Option<ServerVersion>,
    /// Json documents can be expanded into records
    /// (`jsonb_to_recordset`, `JSON_TABLE`)
    pub json_records: bool,
    pub split_strategy: Option<SplitStrategy>,
}

impl StoreCapabilities {
    pub fn negotiate(family: DatabaseFamily, version: Option<ServerVersion>) -> Self {
        let json_records = match (family, version) {
            (DatabaseFamily::Postgres, _) => true,
            (DatabaseFamily::MySql, Some(v)) => v >= ServerVersion::new(8, 0),
            (DatabaseFamily::MariaDb, Some(v)) => v >= ServerVersion::new(10, 6),
            // Unknown server versions are assumed to be current releases
            (DatabaseFamily::MySql, None) | (DatabaseFamily::MariaDb, None) => true,
            (DatabaseFamily::Other, _) => false,
        };
        let split_strategy = match family {
            DatabaseFamily::Postgres => Some(SplitStrategy::RegexSplit),
            DatabaseFamily::MySql | DatabaseFamily::MariaDb => Some(SplitStrategy::NumberSequence),
            DatabaseFamily::Other => None,
        };
        Self {
            family,
            version,
            json_records,
            split_strategy,
        }
    }

    pub fn postgres() -> Self {
        Self::negotiate(DatabaseFamily::Postgres, None)
    }
}

impl Default for StoreCapabilities {
    fn default() -> Self {
        Self::postgres()
    }
}
