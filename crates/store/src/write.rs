use duckdb::params;
use tracing::debug;
use xesload_core::error::{Result, XesError};
use xesload_core::model::{AttributeType, Classifier, Extension, LogTraceRow, RowBatch};
use xesload_core::store::{RowStore, Sequence};

use crate::db::StoreWriter;

impl RowStore for StoreWriter<'_> {
    fn begin(&mut self) -> Result<()> {
        self.conn
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| XesError::Store(format!("begin tx failed: {e}")))?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| XesError::Store(format!("commit failed: {e}")))?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| XesError::Store(format!("rollback failed: {e}")))
    }

    fn next_id(&mut self, sequence: Sequence) -> Result<i64> {
        let mut stmt = self
            .conn
            .prepare_cached(nextval_sql(sequence))
            .map_err(|e| XesError::Store(format!("prepare {} failed: {e}", sequence.name())))?;
        stmt.query_row([], |row| row.get::<_, i64>(0))
            .map_err(|e| XesError::Store(format!("{} allocation failed: {e}", sequence.name())))
    }

    fn insert_log(&mut self, name: &str) -> Result<i64> {
        let id = self.next_id(Sequence::Log)?;
        self.conn
            .execute("INSERT INTO log (id, name) VALUES (?, ?)", params![id, name])
            .map_err(|e| XesError::Store(format!("insert log failed: {e}")))?;
        Ok(id)
    }

    fn insert_extension(&mut self, extension: &Extension) -> Result<i64> {
        let id = self.next_id(Sequence::Extension)?;
        self.conn
            .execute(
                "INSERT INTO extension (id, name, prefix, uri) VALUES (?, ?, ?, ?)",
                params![
                    id,
                    extension.name.as_deref(),
                    extension.prefix.as_deref(),
                    extension.uri.as_deref(),
                ],
            )
            .map_err(|e| XesError::Store(format!("insert extension failed: {e}")))?;
        Ok(id)
    }

    fn insert_attribute(
        &mut self,
        key: &str,
        kind: AttributeType,
        ext_id: Option<i64>,
    ) -> Result<i64> {
        let id = self.next_id(Sequence::Attribute)?;
        self.conn
            .execute(
                r#"INSERT INTO attribute (id, "type", "key", ext_id, parent_id) VALUES (?, ?, ?, ?, NULL)"#,
                params![id, kind.as_str(), key, ext_id],
            )
            .map_err(|e| XesError::Store(format!("insert attribute failed: {e}")))?;
        Ok(id)
    }

    fn insert_classifier(&mut self, log_id: i64, classifier: &Classifier) -> Result<i64> {
        let id = self.next_id(Sequence::Classifier)?;
        self.conn
            .execute(
                "INSERT INTO classifier (id, name, keys, log_id) VALUES (?, ?, ?, ?)",
                params![
                    id,
                    classifier.name.as_deref(),
                    classifier.keys.as_deref(),
                    log_id,
                ],
            )
            .map_err(|e| XesError::Store(format!("insert classifier failed: {e}")))?;
        Ok(id)
    }

    fn insert_event_collection(&mut self, name: &str) -> Result<i64> {
        let id = self.next_id(Sequence::EventCollection)?;
        self.conn
            .execute(
                "INSERT INTO event_collection (id, name) VALUES (?, ?)",
                params![id, name],
            )
            .map_err(|e| XesError::Store(format!("insert event collection failed: {e}")))?;
        Ok(id)
    }

    fn insert_trace(&mut self) -> Result<i64> {
        let id = self.next_id(Sequence::Trace)?;
        let mut stmt = self
            .conn
            .prepare_cached("INSERT INTO trace (id) VALUES (?)")
            .map_err(|e| XesError::Store(format!("prepare insert trace failed: {e}")))?;
        stmt.execute(params![id])
            .map_err(|e| XesError::Store(format!("insert trace failed: {e}")))?;
        Ok(id)
    }

    fn insert_log_trace(&mut self, row: &LogTraceRow) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare_cached(
                r#"INSERT INTO log_has_trace ("sequence", log_id, trace_id) VALUES (?, ?, ?)"#,
            )
            .map_err(|e| XesError::Store(format!("prepare insert log_has_trace failed: {e}")))?;
        stmt.execute(params![row.sequence, row.log_id, row.trace_id])
            .map_err(|e| XesError::Store(format!("insert log_has_trace failed: {e}")))?;
        Ok(())
    }

    fn insert_event(&mut self, event_collection_id: i64) -> Result<i64> {
        let id = self.next_id(Sequence::Event)?;
        let mut stmt = self
            .conn
            .prepare_cached("INSERT INTO event (id, event_coll_id) VALUES (?, ?)")
            .map_err(|e| XesError::Store(format!("prepare insert event failed: {e}")))?;
        stmt.execute(params![id, event_collection_id])
            .map_err(|e| XesError::Store(format!("insert event failed: {e}")))?;
        Ok(id)
    }

    fn write_batch(&mut self, batch: &RowBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        {
            let mut stmt = self
                .conn
                .prepare_cached(
                    r#"INSERT INTO trace_has_attribute (trace_id, attr_id, "value") VALUES (?, ?, ?)"#,
                )
                .map_err(|e| {
                    XesError::Store(format!("prepare insert trace_has_attribute failed: {e}"))
                })?;
            for row in &batch.trace_attributes {
                stmt.execute(params![row.trace_id, row.attr_id, row.value])
                    .map_err(|e| XesError::Store(format!("insert trace_has_attribute failed: {e}")))?;
            }
        }

        {
            let mut stmt = self
                .conn
                .prepare_cached(
                    r#"INSERT INTO trace_has_event ("sequence", trace_id, event_id) VALUES (?, ?, ?)"#,
                )
                .map_err(|e| XesError::Store(format!("prepare insert trace_has_event failed: {e}")))?;
            for row in &batch.trace_events {
                stmt.execute(params![row.sequence, row.trace_id, row.event_id])
                    .map_err(|e| XesError::Store(format!("insert trace_has_event failed: {e}")))?;
            }
        }

        {
            let mut stmt = self
                .conn
                .prepare_cached(
                    r#"INSERT INTO event_has_attribute (event_id, attr_id, "value") VALUES (?, ?, ?)"#,
                )
                .map_err(|e| {
                    XesError::Store(format!("prepare insert event_has_attribute failed: {e}"))
                })?;
            for row in &batch.event_attributes {
                stmt.execute(params![row.event_id, row.attr_id, row.value])
                    .map_err(|e| XesError::Store(format!("insert event_has_attribute failed: {e}")))?;
            }
        }

        {
            let mut stmt = self
                .conn
                .prepare_cached(
                    r#"INSERT INTO log_has_attribute (log_id, trace_global, event_global, attr_id, "value")
                     VALUES (?, ?, ?, ?, ?)"#,
                )
                .map_err(|e| {
                    XesError::Store(format!("prepare insert log_has_attribute failed: {e}"))
                })?;
            for row in &batch.log_attributes {
                let (trace_global, event_global) = row.scope.flags();
                stmt.execute(params![
                    row.log_id,
                    trace_global,
                    event_global,
                    row.attr_id,
                    row.value,
                ])
                .map_err(|e| XesError::Store(format!("insert log_has_attribute failed: {e}")))?;
            }
        }

        debug!(rows = batch.len(), "wrote batch");
        Ok(())
    }
}

fn nextval_sql(sequence: Sequence) -> &'static str {
    match sequence {
        Sequence::Log => "SELECT nextval('log_id_seq')",
        Sequence::Extension => "SELECT nextval('extension_id_seq')",
        Sequence::Attribute => "SELECT nextval('attribute_id_seq')",
        Sequence::Classifier => "SELECT nextval('classifier_id_seq')",
        Sequence::Trace => "SELECT nextval('trace_id_seq')",
        Sequence::EventCollection => "SELECT nextval('event_collection_id_seq')",
        Sequence::Event => "SELECT nextval('event_id_seq')",
    }
}
