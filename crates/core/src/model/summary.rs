use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub log_id: Option<i64>,
    pub log_name: Option<String>,
    pub traces: u64,
    pub events: u64,
    pub attribute_definitions: u64,
    pub extensions: u64,
    pub classifiers: u64,
    pub global_declarations: u64,
    pub batches_flushed: u64,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventsPerTrace {
    pub avg: f64,
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeUsage {
    pub key: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub db_path: String,
    pub logs_count: usize,
    pub traces_count: usize,
    pub events_count: usize,
    pub attributes_count: usize,
    pub extensions_count: usize,
    pub classifiers_count: usize,
    pub events_per_trace: Option<EventsPerTrace>,
    pub top_event_attributes: Vec<AttributeUsage>,
}
