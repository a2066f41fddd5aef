//! Repository layer: entity-scoped database operations.
//!
//! Free functions over a borrowed `Connection`, one sub-module per aggregate.
//! Callers that need several writes to land together open a transaction and
//! pass it in (a `Transaction` derefs to `Connection`).

mod company;
mod lab_result;
mod patient;
mod payment;
mod protocol;
mod reference;
mod session;
mod submission;
mod user;

use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::types::{ToSql, Type};
use rusqlite::Row;

use super::DatabaseError;

pub use company::*;
pub use lab_result::*;
pub use patient::*;
pub use payment::*;
pub use protocol::*;
pub use reference::*;
pub use session::*;
pub use submission::*;
pub use user::*;

/// Round a money amount to cents.
pub fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Read a text column into a `str_enum!` type.
pub(crate) fn enum_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = DatabaseError>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: DatabaseError| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Helper: builds a dynamic WHERE clause from optional filters.
///
/// Placeholders are numbered (`?1`, `?2`, ...) so one bound value can be
/// referenced more than once in a clause.
#[derive(Default)]
pub(crate) struct FilterQuery {
    clauses: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl FilterQuery {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Bind a value and return its placeholder index.
    pub(crate) fn bind<T: ToSql + 'static>(&mut self, value: T) -> usize {
        self.params.push(Box::new(value));
        self.params.len()
    }

    /// Bind a `LIKE` pattern matching `needle` anywhere, with `%`, `_` and
    /// `\` taken literally. Pair it with `ESCAPE '\'` in the clause.
    pub(crate) fn bind_contains(&mut self, needle: &str) -> usize {
        let mut pattern = String::with_capacity(needle.len() + 2);
        pattern.push('%');
        for c in needle.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        self.bind(pattern)
    }

    pub(crate) fn clause(&mut self, clause: String) {
        self.clauses.push(clause);
    }

    pub(crate) fn eq<T: ToSql + 'static>(&mut self, column: &str, value: Option<T>) {
        if let Some(value) = value {
            let idx = self.bind(value);
            self.clauses.push(format!("{column} = ?{idx}"));
        }
    }

    /// Inclusive calendar-date bounds; either side may be open.
    pub(crate) fn date_range(&mut self, column: &str, from: Option<NaiveDate>, to: Option<NaiveDate>) {
        if let Some(from) = from {
            let idx = self.bind(from);
            self.clauses.push(format!("date({column}) >= ?{idx}"));
        }
        if let Some(to) = to {
            let idx = self.bind(to);
            self.clauses.push(format!("date({column}) <= ?{idx}"));
        }
    }

    pub(crate) fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub(crate) fn param_refs(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn money_rounds_to_cents() {
        assert_eq!(round_money(10.005 + 0.0001), 10.01);
        assert_eq!(round_money(0.1 + 0.2), 0.3);
        assert_eq!(round_money(450.0), 450.0);
    }

    #[test]
    fn empty_filter_has_no_where_clause() {
        let q = FilterQuery::new();
        assert_eq!(q.where_sql(), "");
        assert!(q.param_refs().is_empty());
    }

    #[test]
    fn filter_numbers_placeholders_in_order() {
        let mut q = FilterQuery::new();
        q.eq("patient_id", Some(3_i64));
        q.eq::<i64>("company_id", None);
        q.date_range(
            "protocol_date",
            NaiveDate::from_ymd_opt(2024, 1, 1),
            None,
        );
        assert_eq!(
            q.where_sql(),
            " WHERE patient_id = ?1 AND date(protocol_date) >= ?2"
        );
        assert_eq!(q.param_refs().len(), 2);
    }

    #[test]
    fn contains_pattern_escapes_wildcards() {
        let conn = open_memory_database().unwrap();
        let mut q = FilterQuery::new();
        let idx = q.bind_contains("50%_a\\b");
        let sql = format!("SELECT ?{idx}, 'x50%_a\\by' LIKE ?{idx} ESCAPE '\\', '50 percent' LIKE ?{idx} ESCAPE '\\'");
        let (pattern, literal, wildcard): (String, bool, bool) = conn
            .query_row(&sql, q.param_refs().as_slice(), |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .unwrap();
        assert_eq!(pattern, "%50\\%\\_a\\\\b%");
        assert!(literal);
        assert!(!wildcard);
    }

    #[test]
    fn enum_column_rejects_unknown_text() {
        let conn = open_memory_database().unwrap();
        let result: rusqlite::Result<crate::models::enums::Role> =
            conn.query_row("SELECT 'superuser'", [], |row| enum_column(row, 0));
        assert!(result.is_err());
    }
}
