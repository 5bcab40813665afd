// crates/db/src/queries/row.rs
//! Shared row decoding and partial-update helpers.

use std::str::FromStr;

use agencydesk_types::ParseEnumError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::{now, DbResult};

/// Decode an enumerated TEXT column.
pub(crate) fn enum_col<T>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = ParseEnumError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: ParseEnumError| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

pub(crate) fn opt_enum_col<T>(row: &SqliteRow, column: &str) -> Result<Option<T>, sqlx::Error>
where
    T: FromStr<Err = ParseEnumError>,
{
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| {
        s.parse().map_err(|e: ParseEnumError| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        })
    })
    .transpose()
}

/// Decode a JSON array/object stored as TEXT.
pub(crate) fn json_col<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Distinguishes an absent patch field (`None`) from an explicit `null`
/// (`Some(None)`), so nullable columns can be cleared.
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// `UPDATE <table> SET ... WHERE id = ?` built from the fields a patch
/// actually carries. `updated_at` is always bumped.
pub(crate) struct Changes<'a> {
    qb: QueryBuilder<'a, Sqlite>,
}

impl<'a> Changes<'a> {
    pub(crate) fn new(table: &'static str) -> Self {
        let mut qb = QueryBuilder::new("UPDATE ");
        qb.push(table).push(" SET updated_at = ").push_bind(now());
        Self { qb }
    }

    pub(crate) fn set<T>(&mut self, column: &'static str, value: Option<T>) -> &mut Self
    where
        T: 'a + sqlx::Encode<'a, Sqlite> + sqlx::Type<Sqlite>,
    {
        if let Some(value) = value {
            self.qb.push(", ").push(column).push(" = ").push_bind(value);
        }
        self
    }

    /// Run the update. Returns the number of rows touched (0 or 1).
    pub(crate) async fn apply(mut self, pool: &SqlitePool, id: &str) -> DbResult<u64> {
        self.qb.push(" WHERE id = ").push_bind(id.to_string());
        let result = self.qb.build().execute(pool).await?;
        Ok(result.rows_affected())
    }
}
