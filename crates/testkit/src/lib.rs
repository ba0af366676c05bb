use std::collections::{HashMap, HashSet};

use xesload_core::error::{Result, XesError};
use xesload_core::handler::LogHandler;
use xesload_core::model::{
    AttributeMap, AttributeType, Classifier, EventAttributeRow, Extension, GlobalAttributes,
    LogAttributeRow, LogTraceRow, RowBatch, TraceAttributeRow, TraceEventRow, XesTrace,
};
use xesload_core::store::{RowStore, Sequence};

/// Two traces: the first with events A and B and a `cost` attribute, the second empty.
pub const ROUND_TRIP_XES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<log xes.version="1.0" concept:name="orders">
  <extension name="Concept" prefix="concept" uri="http://www.xes-standard.org/concept.xesext"/>
  <classifier name="Activity" keys="concept:name"/>
  <trace>
    <string key="cost" value="10"/>
    <event>
      <string key="concept:name" value="A"/>
    </event>
    <event>
      <string key="concept:name" value="B"/>
    </event>
  </trace>
  <trace>
  </trace>
</log>
"#;

/// Globals split across blocks, a repeated key, and an unscoped block.
pub const GLOBALS_XES: &str = r#"<?xml version="1.0"?>
<log>
  <global scope="trace">
    <string key="concept:name" value="__INVALID__"/>
  </global>
  <global scope="trace">
    <int key="cost" value="0"/>
    <string key="concept:name" value="UNKNOWN"/>
  </global>
  <global>
    <date key="time:timestamp" value="1970-01-01T00:00:00.000+00:00"/>
  </global>
  <trace>
    <event><string key="concept:name" value="A"/></event>
  </trace>
</log>
"#;

pub const EMPTY_LOG_XES: &str = r#"<?xml version="1.0"?>
<log concept:name="empty"></log>
"#;

/// A log with `traces` traces of `events_per_trace` events each, every event
/// carrying the same two attribute keys.
pub fn generated_log(traces: usize, events_per_trace: usize) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<log concept:name=\"generated\">\n");
    for t in 0..traces {
        out.push_str(&format!(
            "  <trace>\n    <string key=\"concept:name\" value=\"case-{t}\"/>\n"
        ));
        for e in 0..events_per_trace {
            out.push_str(&format!(
                "    <event>\n      <string key=\"concept:name\" value=\"act-{e}\"/>\n      <int key=\"position\" value=\"{e}\"/>\n    </event>\n"
            ));
        }
        out.push_str("  </trace>\n");
    }
    out.push_str("</log>\n");
    out
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    LogStart(String),
    Extension(Extension),
    Classifier(Classifier),
    LogAttributes(AttributeMap),
    GlobalAttributes(GlobalAttributes),
    Trace(XesTrace),
    LogEnd,
}

/// Handler that records every callback in order.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub calls: Vec<Call>,
}

impl RecordingHandler {
    pub fn traces(&self) -> Vec<&XesTrace> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Trace(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn globals(&self) -> Vec<&GlobalAttributes> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::GlobalAttributes(g) => Some(g),
                _ => None,
            })
            .collect()
    }
}

impl LogHandler for RecordingHandler {
    fn on_log_start(&mut self, name: &str) -> Result<()> {
        self.calls.push(Call::LogStart(name.to_string()));
        Ok(())
    }

    fn on_extension(&mut self, extension: Extension) -> Result<()> {
        self.calls.push(Call::Extension(extension));
        Ok(())
    }

    fn on_classifier(&mut self, classifier: Classifier) -> Result<()> {
        self.calls.push(Call::Classifier(classifier));
        Ok(())
    }

    fn on_log_attributes(&mut self, attributes: AttributeMap) -> Result<()> {
        self.calls.push(Call::LogAttributes(attributes));
        Ok(())
    }

    fn on_global_attributes(&mut self, globals: GlobalAttributes) -> Result<()> {
        self.calls.push(Call::GlobalAttributes(globals));
        Ok(())
    }

    fn on_trace(&mut self, trace: XesTrace) -> Result<()> {
        self.calls.push(Call::Trace(trace));
        Ok(())
    }

    fn on_log_end(&mut self) -> Result<()> {
        self.calls.push(Call::LogEnd);
        Ok(())
    }
}

/// In-memory row store that enforces foreign keys at write time: any row whose
/// referenced id has not been inserted yet is rejected with a store error.
#[derive(Debug, Default)]
pub struct FakeStore {
    sequences: HashMap<Sequence, i64>,
    pub logs: Vec<(i64, String)>,
    pub extensions: Vec<(i64, Extension)>,
    pub attributes: Vec<(i64, String, AttributeType, Option<i64>)>,
    pub classifiers: Vec<(i64, i64, Classifier)>,
    pub event_collections: Vec<(i64, String)>,
    pub traces: HashSet<i64>,
    pub events: Vec<(i64, i64)>,
    pub log_traces: Vec<LogTraceRow>,
    pub log_attributes: Vec<LogAttributeRow>,
    pub trace_attributes: Vec<TraceAttributeRow>,
    pub trace_events: Vec<TraceEventRow>,
    pub event_attributes: Vec<EventAttributeRow>,
    pub batches_written: usize,
    pub in_transaction: bool,
    pub commits: usize,
    pub rollbacks: usize,
    pub fail_batches: bool,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose grouped writes always fail.
    pub fn failing_batches() -> Self {
        Self {
            fail_batches: true,
            ..Self::default()
        }
    }

    fn has_log(&self, id: i64) -> bool {
        self.logs.iter().any(|(l, _)| *l == id)
    }

    fn has_attribute(&self, id: i64) -> bool {
        self.attributes.iter().any(|(a, ..)| *a == id)
    }

    fn has_event(&self, id: i64) -> bool {
        self.events.iter().any(|(e, _)| *e == id)
    }

    fn has_extension(&self, id: i64) -> bool {
        self.extensions.iter().any(|(e, _)| *e == id)
    }

    fn has_event_collection(&self, id: i64) -> bool {
        self.event_collections.iter().any(|(c, _)| *c == id)
    }

    fn require(ok: bool, what: &str, id: i64) -> Result<()> {
        if ok {
            Ok(())
        } else {
            Err(XesError::Store(format!(
                "foreign key violation: {what} {id} does not exist"
            )))
        }
    }

    pub fn attribute_keys(&self) -> Vec<&str> {
        self.attributes.iter().map(|(_, k, ..)| k.as_str()).collect()
    }
}

impl RowStore for FakeStore {
    fn begin(&mut self) -> Result<()> {
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(XesError::Store("commit without transaction".to_string()));
        }
        self.in_transaction = false;
        self.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.in_transaction = false;
        self.rollbacks += 1;
        Ok(())
    }

    fn next_id(&mut self, sequence: Sequence) -> Result<i64> {
        let next = self.sequences.entry(sequence).or_insert(0);
        *next += 1;
        Ok(*next)
    }

    fn insert_log(&mut self, name: &str) -> Result<i64> {
        let id = self.next_id(Sequence::Log)?;
        self.logs.push((id, name.to_string()));
        Ok(id)
    }

    fn insert_extension(&mut self, extension: &Extension) -> Result<i64> {
        let id = self.next_id(Sequence::Extension)?;
        self.extensions.push((id, extension.clone()));
        Ok(id)
    }

    fn insert_attribute(
        &mut self,
        key: &str,
        kind: AttributeType,
        ext_id: Option<i64>,
    ) -> Result<i64> {
        if let Some(ext_id) = ext_id {
            Self::require(self.has_extension(ext_id), "extension", ext_id)?;
        }
        let id = self.next_id(Sequence::Attribute)?;
        self.attributes.push((id, key.to_string(), kind, ext_id));
        Ok(id)
    }

    fn insert_classifier(&mut self, log_id: i64, classifier: &Classifier) -> Result<i64> {
        Self::require(self.has_log(log_id), "log", log_id)?;
        let id = self.next_id(Sequence::Classifier)?;
        self.classifiers.push((id, log_id, classifier.clone()));
        Ok(id)
    }

    fn insert_event_collection(&mut self, name: &str) -> Result<i64> {
        let id = self.next_id(Sequence::EventCollection)?;
        self.event_collections.push((id, name.to_string()));
        Ok(id)
    }

    fn insert_trace(&mut self) -> Result<i64> {
        let id = self.next_id(Sequence::Trace)?;
        self.traces.insert(id);
        Ok(id)
    }

    fn insert_log_trace(&mut self, row: &LogTraceRow) -> Result<()> {
        Self::require(self.has_log(row.log_id), "log", row.log_id)?;
        Self::require(self.traces.contains(&row.trace_id), "trace", row.trace_id)?;
        self.log_traces.push(row.clone());
        Ok(())
    }

    fn insert_event(&mut self, event_collection_id: i64) -> Result<i64> {
        Self::require(
            self.has_event_collection(event_collection_id),
            "event collection",
            event_collection_id,
        )?;
        let id = self.next_id(Sequence::Event)?;
        self.events.push((id, event_collection_id));
        Ok(id)
    }

    fn write_batch(&mut self, batch: &RowBatch) -> Result<()> {
        if self.fail_batches {
            return Err(XesError::Store("batch rejected".to_string()));
        }
        for row in &batch.trace_attributes {
            Self::require(self.traces.contains(&row.trace_id), "trace", row.trace_id)?;
            Self::require(self.has_attribute(row.attr_id), "attribute", row.attr_id)?;
        }
        for row in &batch.trace_events {
            Self::require(self.traces.contains(&row.trace_id), "trace", row.trace_id)?;
            Self::require(self.has_event(row.event_id), "event", row.event_id)?;
        }
        for row in &batch.event_attributes {
            Self::require(self.has_event(row.event_id), "event", row.event_id)?;
            Self::require(self.has_attribute(row.attr_id), "attribute", row.attr_id)?;
        }
        for row in &batch.log_attributes {
            Self::require(self.has_log(row.log_id), "log", row.log_id)?;
            Self::require(self.has_attribute(row.attr_id), "attribute", row.attr_id)?;
        }

        self.trace_attributes.extend(batch.trace_attributes.iter().cloned());
        self.trace_events.extend(batch.trace_events.iter().cloned());
        self.event_attributes.extend(batch.event_attributes.iter().cloned());
        self.log_attributes.extend(batch.log_attributes.iter().cloned());
        self.batches_written += 1;
        Ok(())
    }
}
