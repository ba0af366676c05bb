use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeScope {
    Log,
    TraceGlobal,
    EventGlobal,
}

impl AttributeScope {
    /// `(trace_global, event_global)` column values.
    pub fn flags(self) -> (bool, bool) {
        match self {
            Self::Log => (false, false),
            Self::TraceGlobal => (true, false),
            Self::EventGlobal => (false, true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTraceRow {
    pub sequence: i64,
    pub log_id: i64,
    pub trace_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogAttributeRow {
    pub log_id: i64,
    pub scope: AttributeScope,
    pub attr_id: i64,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceAttributeRow {
    pub trace_id: i64,
    pub attr_id: i64,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEventRow {
    pub sequence: i64,
    pub trace_id: i64,
    pub event_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventAttributeRow {
    pub event_id: i64,
    pub attr_id: i64,
    pub value: String,
}

/// Rows waiting for the next grouped write. Every id referenced here has already
/// been assigned by a synchronous insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowBatch {
    pub log_attributes: Vec<LogAttributeRow>,
    pub trace_attributes: Vec<TraceAttributeRow>,
    pub trace_events: Vec<TraceEventRow>,
    pub event_attributes: Vec<EventAttributeRow>,
}

impl RowBatch {
    pub fn len(&self) -> usize {
        self.log_attributes.len()
            + self.trace_attributes.len()
            + self.trace_events.len()
            + self.event_attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.log_attributes.clear();
        self.trace_attributes.clear();
        self.trace_events.clear();
        self.event_attributes.clear();
    }
}
