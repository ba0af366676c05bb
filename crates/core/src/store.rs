use crate::error::Result;
use crate::model::{AttributeType, Classifier, Extension, LogTraceRow, RowBatch};

/// Id sequences, one per row kind that owns a generated identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sequence {
    Log,
    Extension,
    Attribute,
    Classifier,
    Trace,
    EventCollection,
    Event,
}

impl Sequence {
    pub fn name(self) -> &'static str {
        match self {
            Self::Log => "log_id_seq",
            Self::Extension => "extension_id_seq",
            Self::Attribute => "attribute_id_seq",
            Self::Classifier => "classifier_id_seq",
            Self::Trace => "trace_id_seq",
            Self::EventCollection => "event_collection_id_seq",
            Self::Event => "event_id_seq",
        }
    }
}

/// Write side of the relational store used by the load engine.
///
/// `insert_*` calls are synchronous and return once the row exists, so later rows
/// may reference the returned id. `write_batch` writes grouped rows without
/// returning ids. Everything between `begin` and `commit` is one unit of work.
pub trait RowStore {
    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    fn next_id(&mut self, sequence: Sequence) -> Result<i64>;

    fn insert_log(&mut self, name: &str) -> Result<i64>;

    fn insert_extension(&mut self, extension: &Extension) -> Result<i64>;

    fn insert_attribute(
        &mut self,
        key: &str,
        kind: AttributeType,
        ext_id: Option<i64>,
    ) -> Result<i64>;

    fn insert_classifier(&mut self, log_id: i64, classifier: &Classifier) -> Result<i64>;

    fn insert_event_collection(&mut self, name: &str) -> Result<i64>;

    fn insert_trace(&mut self) -> Result<i64>;

    fn insert_log_trace(&mut self, row: &LogTraceRow) -> Result<()>;

    fn insert_event(&mut self, event_collection_id: i64) -> Result<i64>;

    fn write_batch(&mut self, batch: &RowBatch) -> Result<()>;
}
