use duckdb::{Connection, params};
use serde::{Deserialize, Serialize};
use xesload_core::error::{Result, XesError};
use xesload_core::model::{AttributeUsage, EventsPerTrace, StoreStats};

use crate::Store;

const TOP_ATTRIBUTES_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub id: i64,
    pub key: String,
    pub kind: String,
    pub ext_id: Option<i64>,
}

impl Store {
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn()?;

        let events_per_trace = conn
            .query_row(
                "SELECT AVG(c), MIN(c), MAX(c)
                 FROM (SELECT COUNT(*) AS c FROM trace_has_event GROUP BY trace_id)",
                [],
                |row| {
                    Ok((
                        row.get::<_, Option<f64>>(0)?,
                        row.get::<_, Option<i64>>(1)?,
                        row.get::<_, Option<i64>>(2)?,
                    ))
                },
            )
            .map_err(|e| XesError::Store(format!("events per trace query failed: {e}")))?;
        let events_per_trace = match events_per_trace {
            (Some(avg), Some(min), Some(max)) => Some(EventsPerTrace { avg, min, max }),
            _ => None,
        };

        let mut stmt = conn
            .prepare(&format!(
                r#"SELECT a."key", COUNT(*) AS usage_count
                   FROM event_has_attribute eha
                   JOIN attribute a ON eha.attr_id = a.id
                   GROUP BY a."key"
                   ORDER BY usage_count DESC, a."key" ASC
                   LIMIT {TOP_ATTRIBUTES_LIMIT}"#
            ))
            .map_err(|e| XesError::Store(format!("prepare top attributes failed: {e}")))?;
        let top_event_attributes = stmt
            .query_map([], |row| {
                Ok(AttributeUsage {
                    key: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                })
            })
            .map_err(|e| XesError::Store(format!("top attributes query failed: {e}")))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| XesError::Store(format!("top attributes row failed: {e}")))?;

        Ok(StoreStats {
            db_path: self.db_path().to_string(),
            logs_count: scalar_usize(&conn, "SELECT COUNT(*) FROM log")?,
            traces_count: scalar_usize(&conn, "SELECT COUNT(*) FROM trace")?,
            events_count: scalar_usize(&conn, "SELECT COUNT(*) FROM event")?,
            attributes_count: scalar_usize(&conn, "SELECT COUNT(*) FROM attribute")?,
            extensions_count: scalar_usize(&conn, "SELECT COUNT(*) FROM extension")?,
            classifiers_count: scalar_usize(&conn, "SELECT COUNT(*) FROM classifier")?,
            events_per_trace,
            top_event_attributes,
        })
    }

    /// `(sequence, trace_id)` pairs of one log, in sequence order.
    pub fn trace_sequences(&self, log_id: i64) -> Result<Vec<(i64, i64)>> {
        self.id_pairs(
            r#"SELECT "sequence", trace_id FROM log_has_trace WHERE log_id = ? ORDER BY "sequence""#,
            log_id,
        )
    }

    /// `(sequence, event_id)` pairs of one trace, in sequence order.
    pub fn event_sequences(&self, trace_id: i64) -> Result<Vec<(i64, i64)>> {
        self.id_pairs(
            r#"SELECT "sequence", event_id FROM trace_has_event WHERE trace_id = ? ORDER BY "sequence""#,
            trace_id,
        )
    }

    pub fn attribute_definitions(&self) -> Result<Vec<AttributeDefinition>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(r#"SELECT id, "key", "type", ext_id FROM attribute ORDER BY id"#)
            .map_err(|e| XesError::Store(format!("prepare attribute query failed: {e}")))?;
        let definitions = stmt
            .query_map([], |row| {
                Ok(AttributeDefinition {
                    id: row.get(0)?,
                    key: row.get(1)?,
                    kind: row.get(2)?,
                    ext_id: row.get(3)?,
                })
            })
            .map_err(|e| XesError::Store(format!("attribute query failed: {e}")))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| XesError::Store(format!("attribute row failed: {e}")))?;
        Ok(definitions)
    }

    /// Number of rows in `table`. Only schema table names are accepted.
    pub fn count_rows(&self, table: &str) -> Result<usize> {
        const TABLES: [&str; 12] = [
            "log",
            "extension",
            "attribute",
            "classifier",
            "trace",
            "event",
            "event_collection",
            "log_has_trace",
            "log_has_attribute",
            "trace_has_attribute",
            "trace_has_event",
            "event_has_attribute",
        ];
        if !TABLES.contains(&table) {
            return Err(XesError::InvalidArgument(format!("unknown table: {table}")));
        }
        let conn = self.conn()?;
        scalar_usize(&conn, &format!("SELECT COUNT(*) FROM {table}"))
    }

    fn id_pairs(&self, sql: &str, id: i64) -> Result<Vec<(i64, i64)>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| XesError::Store(format!("prepare query failed: {e}")))?;
        let pairs = stmt
            .query_map(params![id], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| XesError::Store(format!("query failed: {e}")))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| XesError::Store(format!("row decode failed: {e}")))?;
        Ok(pairs)
    }
}

fn scalar_usize(conn: &Connection, sql: &str) -> Result<usize> {
    conn.query_row(sql, [], |row| row.get::<_, i64>(0))
        .map(|v| v as usize)
        .map_err(|e| XesError::Store(format!("query failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_rows_rejects_unknown_tables() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.count_rows("trace_has_event").unwrap(), 0);
        assert!(matches!(
            store.count_rows("log; DROP TABLE log"),
            Err(XesError::InvalidArgument(_))
        ));
    }

    #[test]
    fn empty_store_has_no_definitions() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.attribute_definitions().unwrap().is_empty());
        assert!(store.trace_sequences(1).unwrap().is_empty());
        assert!(store.event_sequences(1).unwrap().is_empty());
    }
}
