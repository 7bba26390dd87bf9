//! Typed upsert operations
//!
//! A batch is an ordered list of `UpsertOp`s: a static SQL template with
//! `?n` placeholders plus the typed values to bind. Values are never
//! interpolated into executable SQL; the literal rendering in
//! [`UpsertBatch::to_script`] exists only for the audit artifact and the
//! external executor's file boundary.

use serde::Serialize;

/// A single typed SQL binding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
    Real(f64),
    Null,
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(v: Option<i64>) -> Self {
        v.map_or(Self::Null, Self::Integer)
    }
}

impl From<Option<f64>> for SqlValue {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Self::Null, Self::Real)
    }
}

/// One insert-or-replace (or append) against a destination table
#[derive(Debug, Clone)]
pub struct UpsertOp {
    /// Destination table name
    pub table: &'static str,
    /// SQL template with `?n` placeholders
    pub sql: &'static str,
    /// Bindings, in placeholder order
    pub params: Vec<SqlValue>,
}

/// Ordered, replay-safe batch of upsert operations
#[derive(Debug, Clone, Default)]
pub struct UpsertBatch {
    pub ops: Vec<UpsertOp>,
}

impl UpsertBatch {
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of operations targeting a given table
    pub fn count_for(&self, table: &str) -> usize {
        self.ops.iter().filter(|op| op.table == table).count()
    }

    /// Render the batch as a standalone SQL script.
    ///
    /// Used for the durable audit copy and the file handed to the external
    /// executor. Text values are quoted with embedded single quotes doubled;
    /// that is the only escaping the script format performs.
    pub fn to_script(&self) -> String {
        let mut script = String::new();
        for op in &self.ops {
            script.push_str(&render_statement(op.sql, &op.params));
            script.push_str(";\n");
        }
        script
    }
}

/// Substitute `?n` placeholders in one left-to-right pass over the template.
///
/// Rendered literals are never rescanned, so placeholder-shaped text inside a
/// bound value (raw JSON blobs can legitimately contain `?1`) passes through
/// untouched. A `?` without digits, or a number with no matching parameter,
/// is copied verbatim.
fn render_statement(sql: &str, params: &[SqlValue]) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;
    while let Some(pos) = rest.find('?') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let digits = after
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(after.len());
        let value = after[..digits]
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| params.get(i));
        match value {
            Some(v) => out.push_str(&render_literal(v)),
            None => out.push_str(&rest[pos..pos + 1 + digits]),
        }
        rest = &after[digits..];
    }
    out.push_str(rest);
    out
}

/// Render one value as a SQL literal
fn render_literal(value: &SqlValue) -> String {
    match value {
        SqlValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        SqlValue::Integer(i) => i.to_string(),
        SqlValue::Real(f) => {
            if f.fract() == 0.0 && f.is_finite() && f.abs() < 1e15 {
                format!("{f:.1}")
            } else {
                f.to_string()
            }
        }
        SqlValue::Null => "NULL".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(sql: &'static str, params: Vec<SqlValue>) -> UpsertOp {
        UpsertOp {
            table: "leaderboard_cache",
            sql,
            params,
        }
    }

    #[test]
    fn test_render_quotes_doubled() {
        let batch = UpsertBatch {
            ops: vec![op(
                "INSERT OR REPLACE INTO t (a) VALUES (?1)",
                vec![SqlValue::from("O'Brien")],
            )],
        };
        let script = batch.to_script();
        assert!(script.contains("'O''Brien'"));
        // Doubling is reversible: undoing it restores the original text
        assert_eq!("O''Brien".replace("''", "'"), "O'Brien");
    }

    #[test]
    fn test_render_null_and_numbers() {
        let batch = UpsertBatch {
            ops: vec![op(
                "INSERT INTO t (a, b, c) VALUES (?1, ?2, ?3)",
                vec![SqlValue::Null, SqlValue::Integer(42), SqlValue::Real(1.5)],
            )],
        };
        assert_eq!(
            batch.to_script(),
            "INSERT INTO t (a, b, c) VALUES (NULL, 42, 1.5);\n"
        );
    }

    #[test]
    fn test_placeholder_text_inside_value_untouched() {
        // A bound blob may itself contain placeholder-shaped text; rendering
        // earlier params must not rewrite it
        let batch = UpsertBatch {
            ops: vec![op(
                "INSERT INTO t (a, b) VALUES (?1, ?2)",
                vec![
                    SqlValue::Integer(7),
                    SqlValue::from(r#"{"note":"step ?1 of plan"}"#),
                ],
            )],
        };
        assert_eq!(
            batch.to_script(),
            "INSERT INTO t (a, b) VALUES (7, '{\"note\":\"step ?1 of plan\"}');\n"
        );
    }

    #[test]
    fn test_bare_question_mark_passes_through() {
        let batch = UpsertBatch {
            ops: vec![op(
                "INSERT INTO t (a, b) VALUES (?1, 'is it?')",
                vec![SqlValue::Integer(1)],
            )],
        };
        assert_eq!(
            batch.to_script(),
            "INSERT INTO t (a, b) VALUES (1, 'is it?');\n"
        );
    }

    #[test]
    fn test_render_two_digit_placeholders() {
        // 12 params: ?10..?12 must not be read as ?1 plus trailing digits
        let params: Vec<SqlValue> = (0..12).map(|i| SqlValue::Integer(i as i64)).collect();
        let batch = UpsertBatch {
            ops: vec![op(
                "INSERT INTO t VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params,
            )],
        };
        assert_eq!(
            batch.to_script(),
            "INSERT INTO t VALUES (0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11);\n"
        );
    }

    #[test]
    fn test_option_conversions() {
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(7i64)), SqlValue::Integer(7));
        assert_eq!(SqlValue::from(Some(2.5f64)), SqlValue::Real(2.5));
    }
}
