pub mod attribute;
pub mod log;
pub mod rows;
pub mod summary;

pub use attribute::{AttributeMap, AttributeType, AttributeValue};
pub use log::{Classifier, Extension, GlobalAttributes, XesEvent, XesTrace};
pub use rows::{
    AttributeScope, EventAttributeRow, LogAttributeRow, LogTraceRow, RowBatch, TraceAttributeRow,
    TraceEventRow,
};
pub use summary::{AttributeUsage, EventsPerTrace, ImportSummary, StoreStats};
