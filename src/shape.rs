//! Result shapers.
//!
//! Small helpers reprojecting a [`QueryResult`] into the shape a caller
//! wants: plain rows, key/value maps, maps indexed by one field, flattened
//! columns, a single row or a single value. The free functions are pure
//! transforms, the [`Session`] methods run a query first and then apply them.
//!
//! Shapers never swallow errors. With non-fatal errors a failed query comes
//! back as `Ok(None)`, exactly as from [`Session::query`].
//!
//! # Example
//! ```no_run
//! use livestatus::{Config, QueryOptions, Session};
//!
//! let mut session = Session::new(Config::unix("/var/run/naemon/live"));
//!
//! let hosts = session
//!     .select_keyed("GET hosts\nColumns: name state", "name", &QueryOptions::new())
//!     .unwrap()
//!     .unwrap();
//! let up = session
//!     .select_scalar("GET hosts\nStats: state = 0")
//!     .unwrap();
//! ```
use std::collections::BTreeMap;

use crate::{
    Session,
    error::Error,
    protocol::{QueryResult, Row},
};

/// A row keyed by column name.
pub type RowMap = BTreeMap<String, String>;

pub const PEER_NAME_KEY: &str = "peer_name";
pub const PEER_ADDR_KEY: &str = "peer_addr";

/// Client-side adjustments applied after a query returns.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    limit: Option<usize>,
    rename: Vec<(String, String)>,
    sum: bool,
    add_peer: bool,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps only the first `limit` rows.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Renames the result key `from` to `to`.
    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.rename.push((from.into(), to.into()));
        self
    }

    /// Collapses all rows into one row of per-column sums.
    pub fn sum(mut self, sum: bool) -> Self {
        self.sum = sum;
        self
    }

    /// Appends the session's peer name and address to every row.
    pub fn add_peer(mut self, add_peer: bool) -> Self {
        self.add_peer = add_peer;
        self
    }
}

/// Keeps the first `limit` rows. Never reorders or adds rows.
pub fn truncate(rows: &mut Vec<Row>, limit: Option<usize>) {
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
}

pub fn rename_keys(keys: &mut [String], rename: &[(String, String)]) {
    for key in keys.iter_mut() {
        if let Some((_, to)) = rename.iter().find(|(from, _)| from == key) {
            *key = to.clone();
        }
    }
}

/// Per-column sum over all rows. Fields that aren't numbers count as zero.
pub fn sum_rows(result: &QueryResult) -> Row {
    let width = result
        .rows
        .iter()
        .map(Vec::len)
        .chain([result.keys.len()])
        .max()
        .unwrap_or(0);

    let mut sums = vec![0f64; width];
    for row in &result.rows {
        for (sum, field) in sums.iter_mut().zip(row) {
            *sum += field.trim().parse::<f64>().unwrap_or(0.0);
        }
    }

    sums.into_iter()
        .map(|sum| {
            if sum.fract() == 0.0 && sum.abs() < i64::MAX as f64 {
                (sum as i64).to_string()
            } else {
                sum.to_string()
            }
        })
        .collect()
}

pub fn add_peer(result: &mut QueryResult, name: &str, addr: &str) {
    result.keys.push(PEER_NAME_KEY.to_string());
    result.keys.push(PEER_ADDR_KEY.to_string());
    for row in result.rows.iter_mut() {
        row.push(name.to_string());
        row.push(addr.to_string());
    }
}

/// Zips `keys` with each row. Short rows leave trailing keys out, surplus
/// fields are dropped.
pub fn to_maps(keys: &[String], rows: Vec<Row>) -> Vec<RowMap> {
    rows.into_iter()
        .map(|row| keys.iter().cloned().zip(row).collect())
        .collect()
}

/// Indexes `maps` by the value each holds under `key`.
pub fn index_by(maps: Vec<RowMap>, key: &str) -> Result<BTreeMap<String, RowMap>, Error> {
    let mut indexed = BTreeMap::new();
    for map in maps {
        let Some(value) = map.get(key).cloned() else {
            return Err(Error::MissingKey {
                key: key.to_string(),
                available: map.into_keys().collect(),
            });
        };
        indexed.insert(value, map);
    }
    Ok(indexed)
}

/// Flattens the 1-based `columns` of every row, row by row.
///
/// With two columns the output reads pairwise as key/value. Fields missing
/// from a short row come out empty.
pub fn columns(rows: &[Row], columns: &[usize]) -> Result<Vec<String>, Error> {
    if let Some(&bad) = columns.iter().find(|&&c| c == 0) {
        return Err(Error::InvalidColumn(bad));
    }

    Ok(rows
        .iter()
        .flat_map(|row| {
            columns
                .iter()
                .map(move |&c| row.get(c - 1).cloned().unwrap_or_default())
        })
        .collect())
}

impl Session {
    fn select(
        &mut self,
        statement: &str,
        options: &QueryOptions,
    ) -> Result<Option<QueryResult>, Error> {
        let Some(mut result) = self.query(statement)? else {
            return Ok(None);
        };

        rename_keys(&mut result.keys, &options.rename);
        if options.sum {
            result.rows = vec![sum_rows(&result)];
        }
        if options.add_peer {
            add_peer(&mut result, &self.peer_name(), &self.peer_addr());
        }
        truncate(&mut result.rows, options.limit);

        Ok(Some(result))
    }

    /// Rows as lists of fields.
    pub fn select_rows(
        &mut self,
        statement: &str,
        options: &QueryOptions,
    ) -> Result<Option<Vec<Row>>, Error> {
        Ok(self.select(statement, options)?.map(|result| result.rows))
    }

    /// Rows as maps from column key to field.
    pub fn select_maps(
        &mut self,
        statement: &str,
        options: &QueryOptions,
    ) -> Result<Option<Vec<RowMap>>, Error> {
        Ok(self
            .select(statement, options)?
            .map(|result| to_maps(&result.keys, result.rows)))
    }

    /// Row maps indexed by their `key` field.
    ///
    /// A row without `key` is an error even when errors are not fatal.
    pub fn select_keyed(
        &mut self,
        statement: &str,
        key: &str,
        options: &QueryOptions,
    ) -> Result<Option<BTreeMap<String, RowMap>>, Error> {
        self.select_maps(statement, options)?
            .map(|maps| index_by(maps, key))
            .transpose()
    }

    /// Values of the 1-based `cols`, flattened row by row. An empty `cols`
    /// selects the first column.
    pub fn select_col(
        &mut self,
        statement: &str,
        cols: &[usize],
    ) -> Result<Option<Vec<String>>, Error> {
        let cols = if cols.is_empty() { &[1][..] } else { cols };
        self.select_rows(statement, &QueryOptions::new())?
            .map(|rows| columns(&rows, cols))
            .transpose()
    }

    /// First row as a list of fields.
    pub fn select_row(&mut self, statement: &str) -> Result<Option<Row>, Error> {
        Ok(self
            .select_rows(statement, &QueryOptions::new().limit(1))?
            .and_then(|rows| rows.into_iter().next()))
    }

    /// First row as a map.
    pub fn select_row_map(&mut self, statement: &str) -> Result<Option<RowMap>, Error> {
        Ok(self
            .select_maps(statement, &QueryOptions::new().limit(1))?
            .and_then(|maps| maps.into_iter().next()))
    }

    /// First field of the first row.
    pub fn select_scalar(&mut self, statement: &str) -> Result<Option<String>, Error> {
        Ok(self
            .select_row(statement)?
            .and_then(|row| row.into_iter().next()))
    }
}
