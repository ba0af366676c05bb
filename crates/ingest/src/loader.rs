use std::time::Instant;

use tracing::{debug, info};
use xesload_core::config::Config;
use xesload_core::error::{Result, XesError};
use xesload_core::handler::LogHandler;
use xesload_core::model::{
    AttributeMap, AttributeScope, Classifier, EventAttributeRow, Extension, GlobalAttributes,
    ImportSummary, LogAttributeRow, LogTraceRow, RowBatch, TraceAttributeRow, TraceEventRow,
    XesTrace,
};
use xesload_core::store::RowStore;

use crate::registry::Registry;

pub const DEFAULT_EVENT_COLLECTION: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadConfig {
    /// Pending rows are written after every `flush_every` traces.
    pub flush_every: u64,
    /// A progress line is logged after every `progress_every` traces.
    pub progress_every: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            flush_every: 100,
            progress_every: 1000,
        }
    }
}

impl From<&Config> for LoadConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            flush_every: cfg.flush_every,
            progress_every: cfg.progress_every,
        }
    }
}

/// Turns parser callbacks into ordered writes against a [`RowStore`].
///
/// Rows that own an id (log, extension, attribute, classifier, trace, event) are
/// inserted synchronously, so their ids exist before any dependent row is queued.
/// Link and attribute-instance rows go into a [`RowBatch`] that is written every
/// `flush_every` traces, after the global declarations, and at end of log. The
/// whole import runs inside one transaction opened by [`LoadEngine::new`] and
/// committed by `on_log_end`.
pub struct LoadEngine<S: RowStore> {
    store: S,
    cfg: LoadConfig,
    registry: Registry,
    batch: RowBatch,
    log_id: Option<i64>,
    log_name: Option<String>,
    event_collection_id: i64,
    trace_sequence: i64,
    events: u64,
    classifiers: u64,
    global_declarations: u64,
    batches_flushed: u64,
    started: Instant,
    finished: bool,
}

impl<S: RowStore> LoadEngine<S> {
    /// Opens the unit of work. Zero cadences are raised to one.
    pub fn new(mut store: S, cfg: LoadConfig) -> Result<Self> {
        let cfg = LoadConfig {
            flush_every: cfg.flush_every.max(1),
            progress_every: cfg.progress_every.max(1),
        };
        store.begin()?;
        let event_collection_id = store.insert_event_collection(DEFAULT_EVENT_COLLECTION)?;
        debug!(id = event_collection_id, "created default event collection");

        Ok(Self {
            store,
            cfg,
            registry: Registry::new(),
            batch: RowBatch::default(),
            log_id: None,
            log_name: None,
            event_collection_id,
            trace_sequence: 0,
            events: 0,
            classifiers: 0,
            global_declarations: 0,
            batches_flushed: 0,
            started: Instant::now(),
            finished: false,
        })
    }

    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            log_id: self.log_id,
            log_name: self.log_name.clone(),
            traces: self.trace_sequence as u64,
            events: self.events,
            attribute_definitions: self.registry.attribute_count(),
            extensions: self.registry.extension_count(),
            classifiers: self.classifiers,
            global_declarations: self.global_declarations,
            batches_flushed: self.batches_flushed,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Discards pending rows and rolls back the unit of work. A no-op once the
    /// import has been committed.
    pub fn abort(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.batch.clear();
        self.store.rollback()
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn log_id(&self) -> Result<i64> {
        self.log_id
            .ok_or_else(|| XesError::Ingest("log content received before log start".to_string()))
    }

    fn flush(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let rows = self.batch.len();
        self.store.write_batch(&self.batch)?;
        self.batch.clear();
        self.batches_flushed += 1;
        debug!(rows, "flushed pending rows");
        Ok(())
    }

    fn queue_log_attributes(
        &mut self,
        log_id: i64,
        attributes: AttributeMap,
        scope: AttributeScope,
    ) -> Result<()> {
        for (key, attribute) in attributes {
            let attr_id = self
                .registry
                .resolve_attribute(&mut self.store, &key, attribute.kind)?;
            self.batch.log_attributes.push(LogAttributeRow {
                log_id,
                scope,
                attr_id,
                value: attribute.value,
            });
        }
        Ok(())
    }
}

impl<S: RowStore> LogHandler for LoadEngine<S> {
    fn on_log_start(&mut self, name: &str) -> Result<()> {
        if self.log_id.is_some() {
            return Err(XesError::Ingest("log started twice".to_string()));
        }
        let id = self.store.insert_log(name)?;
        self.log_id = Some(id);
        self.log_name = Some(name.to_string());
        info!(log_id = id, name, "created log");
        Ok(())
    }

    fn on_extension(&mut self, extension: Extension) -> Result<()> {
        self.registry.register_extension(&mut self.store, &extension)?;
        Ok(())
    }

    fn on_classifier(&mut self, classifier: Classifier) -> Result<()> {
        let log_id = self.log_id()?;
        let id = self.store.insert_classifier(log_id, &classifier)?;
        self.classifiers += 1;
        debug!(id, name = ?classifier.name, "created classifier");
        Ok(())
    }

    fn on_log_attributes(&mut self, attributes: AttributeMap) -> Result<()> {
        let log_id = self.log_id()?;
        self.queue_log_attributes(log_id, attributes, AttributeScope::Log)
    }

    fn on_global_attributes(&mut self, globals: GlobalAttributes) -> Result<()> {
        let log_id = self.log_id()?;
        self.global_declarations += globals.len() as u64;
        self.queue_log_attributes(log_id, globals.trace, AttributeScope::TraceGlobal)?;
        self.queue_log_attributes(log_id, globals.event, AttributeScope::EventGlobal)?;
        self.flush()
    }

    fn on_trace(&mut self, trace: XesTrace) -> Result<()> {
        let log_id = self.log_id()?;

        let trace_id = self.store.insert_trace()?;
        self.store.insert_log_trace(&LogTraceRow {
            sequence: self.trace_sequence,
            log_id,
            trace_id,
        })?;
        self.trace_sequence += 1;

        for (key, attribute) in trace.attributes {
            let attr_id = self
                .registry
                .resolve_attribute(&mut self.store, &key, attribute.kind)?;
            self.batch.trace_attributes.push(TraceAttributeRow {
                trace_id,
                attr_id,
                value: attribute.value,
            });
        }

        for (sequence, event) in trace.events.into_iter().enumerate() {
            let event_id = self.store.insert_event(self.event_collection_id)?;
            self.batch.trace_events.push(TraceEventRow {
                sequence: sequence as i64,
                trace_id,
                event_id,
            });
            for (key, attribute) in event.attributes {
                let attr_id = self
                    .registry
                    .resolve_attribute(&mut self.store, &key, attribute.kind)?;
                self.batch.event_attributes.push(EventAttributeRow {
                    event_id,
                    attr_id,
                    value: attribute.value,
                });
            }
            self.events += 1;
        }

        let traces = self.trace_sequence as u64;
        if traces % self.cfg.flush_every == 0 {
            self.flush()?;
        }
        if traces % self.cfg.progress_every == 0 {
            info!(traces, events = self.events, "import progress");
        }
        Ok(())
    }

    fn on_log_end(&mut self) -> Result<()> {
        self.log_id()?;
        self.flush()?;
        self.store.commit()?;
        self.finished = true;

        let summary = self.summary();
        info!(
            traces = summary.traces,
            events = summary.events,
            attributes = summary.attribute_definitions,
            elapsed_ms = summary.elapsed_ms,
            "import committed"
        );
        Ok(())
    }
}
