use std::io::BufRead;
use std::path::Path;

use tokio::sync::mpsc;
use tracing::{info, warn};
use xesload_core::config::Config;
use xesload_core::error::{Result, XesError};
use xesload_core::handler::LogHandler;
use xesload_core::model::{
    AttributeMap, Classifier, Extension, GlobalAttributes, ImportSummary, XesTrace,
};
use xesload_core::store::RowStore;
use xesload_store::Store;

use crate::import::open_source;
use crate::loader::{LoadConfig, LoadEngine};
use crate::parser::parse;

/// One parser callback, carried across the channel to the loader thread.
#[derive(Debug)]
pub enum ParseEvent {
    LogStart(String),
    Extension(Extension),
    Classifier(Classifier),
    LogAttributes(AttributeMap),
    GlobalAttributes(GlobalAttributes),
    Trace(XesTrace),
    LogEnd,
}

pub fn dispatch<H: LogHandler>(handler: &mut H, event: ParseEvent) -> Result<()> {
    match event {
        ParseEvent::LogStart(name) => handler.on_log_start(&name),
        ParseEvent::Extension(extension) => handler.on_extension(extension),
        ParseEvent::Classifier(classifier) => handler.on_classifier(classifier),
        ParseEvent::LogAttributes(attributes) => handler.on_log_attributes(attributes),
        ParseEvent::GlobalAttributes(globals) => handler.on_global_attributes(globals),
        ParseEvent::Trace(trace) => handler.on_trace(trace),
        ParseEvent::LogEnd => handler.on_log_end(),
    }
}

struct ChannelHandler {
    tx: mpsc::Sender<ParseEvent>,
}

impl ChannelHandler {
    fn send(&self, event: ParseEvent) -> Result<()> {
        self.tx
            .blocking_send(event)
            .map_err(|_| XesError::Ingest("loader stopped receiving parse events".to_string()))
    }
}

impl LogHandler for ChannelHandler {
    fn on_log_start(&mut self, name: &str) -> Result<()> {
        self.send(ParseEvent::LogStart(name.to_string()))
    }

    fn on_extension(&mut self, extension: Extension) -> Result<()> {
        self.send(ParseEvent::Extension(extension))
    }

    fn on_classifier(&mut self, classifier: Classifier) -> Result<()> {
        self.send(ParseEvent::Classifier(classifier))
    }

    fn on_log_attributes(&mut self, attributes: AttributeMap) -> Result<()> {
        self.send(ParseEvent::LogAttributes(attributes))
    }

    fn on_global_attributes(&mut self, globals: GlobalAttributes) -> Result<()> {
        self.send(ParseEvent::GlobalAttributes(globals))
    }

    fn on_trace(&mut self, trace: XesTrace) -> Result<()> {
        self.send(ParseEvent::Trace(trace))
    }

    fn on_log_end(&mut self) -> Result<()> {
        self.send(ParseEvent::LogEnd)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Parse events buffered between the parser and the loader. The parser
    /// blocks once this many are waiting.
    pub channel_capacity: usize,
    pub load: LoadConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            load: LoadConfig::default(),
        }
    }
}

impl From<&Config> for PipelineConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            channel_capacity: cfg.channel_capacity,
            load: LoadConfig::from(cfg),
        }
    }
}

/// Runs the parser and the loader on separate blocking threads joined by a
/// bounded channel. Rows are written in exactly the order the sequential path
/// writes them; only parsing overlaps with database work.
pub async fn run_import<R>(source: R, store: Store, cfg: PipelineConfig) -> Result<ImportSummary>
where
    R: BufRead + Send + 'static,
{
    let load = cfg.load;
    run_pipeline(source, cfg.channel_capacity, move |rx| {
        let mut engine = LoadEngine::new(store.writer()?, load)?;
        load_events(&mut engine, rx)
    })
    .await
}

async fn run_pipeline<R, C>(
    source: R,
    channel_capacity: usize,
    consume: C,
) -> Result<ImportSummary>
where
    R: BufRead + Send + 'static,
    C: FnOnce(mpsc::Receiver<ParseEvent>) -> Result<Option<ImportSummary>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(channel_capacity.max(1));

    let producer = tokio::task::spawn_blocking(move || {
        let mut handler = ChannelHandler { tx };
        parse(source, &mut handler)
    });
    let consumer = tokio::task::spawn_blocking(move || consume(rx));

    // Both tasks are joined before anything is returned, so the store is free
    // again whichever side failed.
    let parsed = producer.await;
    let loaded = consumer.await;
    let parsed = parsed.map_err(join_error).and_then(|r| r);
    let loaded = loaded.map_err(join_error).and_then(|r| r);

    // A loader failure closes the channel and surfaces in the parser as a send
    // error, so the loader's error is reported first.
    match (parsed, loaded) {
        (_, Err(err)) => Err(err),
        (Err(err), Ok(_)) => Err(err),
        (Ok(_), Ok(Some(summary))) => Ok(summary),
        (Ok(_), Ok(None)) => Err(XesError::Ingest(
            "parser finished without ending the log".to_string(),
        )),
    }
}

pub async fn import_file(path: &Path, store: &Store, cfg: &Config) -> Result<ImportSummary> {
    let source = open_source(path)?;
    info!(
        path = %path.display(),
        bytes = source.bytes,
        gzip = source.gzip,
        channel_capacity = cfg.channel_capacity,
        "importing event log (pipelined)"
    );
    if cfg.reset_before_import {
        store.reset()?;
    }
    run_import(source.reader, store.clone(), PipelineConfig::from(cfg)).await
}

/// Returns `Ok(None)` when the channel closes before the log ends; the import
/// has been rolled back in that case.
fn load_events<S: RowStore>(
    engine: &mut LoadEngine<S>,
    mut rx: mpsc::Receiver<ParseEvent>,
) -> Result<Option<ImportSummary>> {
    while let Some(event) = rx.blocking_recv() {
        if let Err(err) = dispatch(engine, event) {
            abort(engine);
            return Err(err);
        }
        if engine.is_finished() {
            return Ok(Some(engine.summary()));
        }
    }

    abort(engine);
    Ok(None)
}

fn abort<S: RowStore>(engine: &mut LoadEngine<S>) {
    if let Err(err) = engine.abort() {
        warn!(error = %err, "rollback after failed import also failed");
    }
}

fn join_error(err: tokio::task::JoinError) -> XesError {
    XesError::Internal(format!("import task failed: {err}"))
}

#[cfg(test)]
mod tests {
    use std::io::{self, BufReader, Cursor, Read};

    use testkit::{FakeStore, ROUND_TRIP_XES, RecordingHandler, generated_log};

    use super::*;
    use crate::import::import_reader;

    fn small_channel() -> PipelineConfig {
        PipelineConfig {
            channel_capacity: 1,
            load: LoadConfig {
                flush_every: 3,
                progress_every: 1000,
            },
        }
    }

    #[tokio::test]
    async fn pipelined_import_matches_sequential_import() {
        let doc = generated_log(20, 4);

        let sequential = Store::open_in_memory().unwrap();
        import_reader(
            Cursor::new(doc.clone()),
            sequential.writer().unwrap(),
            small_channel().load,
        )
        .unwrap();

        let pipelined = Store::open_in_memory().unwrap();
        let summary = run_import(Cursor::new(doc), pipelined.clone(), small_channel())
            .await
            .unwrap();
        assert_eq!(summary.traces, 20);
        assert_eq!(summary.events, 80);

        for table in [
            "log_has_trace",
            "trace_has_event",
            "trace_has_attribute",
            "event_has_attribute",
            "attribute",
        ] {
            assert_eq!(
                sequential.count_rows(table).unwrap(),
                pipelined.count_rows(table).unwrap(),
                "{table}"
            );
        }
        assert_eq!(
            sequential.trace_sequences(1).unwrap(),
            pipelined.trace_sequences(1).unwrap()
        );
    }

    #[tokio::test]
    async fn parse_failure_rolls_back_pipelined_import() {
        let store = Store::open_in_memory().unwrap();
        let doc = "<log><trace><event></trace></log>";
        let err = run_import(Cursor::new(doc), store.clone(), small_channel())
            .await
            .unwrap_err();
        assert!(matches!(err, XesError::Parse(_)));

        let stats = store.stats().unwrap();
        assert_eq!(stats.logs_count, 0);
        assert_eq!(stats.traces_count, 0);
    }

    #[tokio::test]
    async fn non_xml_input_reports_parse_error() {
        let store = Store::open_in_memory().unwrap();
        let err = run_import(Cursor::new("plain text"), store, PipelineConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, XesError::Parse(_)));
    }

    #[tokio::test]
    async fn loader_failure_wins_and_rolls_back() {
        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let load = LoadConfig {
            flush_every: 2,
            progress_every: 1000,
        };

        let err = run_pipeline(Cursor::new(generated_log(40, 2)), 1, move |rx| {
            let mut engine = LoadEngine::new(FakeStore::failing_batches(), load)?;
            let result = load_events(&mut engine, rx);
            let _ = done_tx.send(engine.into_store());
            result
        })
        .await
        .unwrap_err();
        assert!(matches!(err, XesError::Store(_)), "{err}");

        let store = done_rx.recv().unwrap();
        assert_eq!(store.rollbacks, 1);
        assert_eq!(store.commits, 0);
        assert_eq!(store.batches_written, 0);
        assert!(!store.in_transaction);
    }

    struct Exploding;

    impl Read for Exploding {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            panic!("reader exploded");
        }
    }

    #[tokio::test]
    async fn parser_panic_releases_store_after_rollback() {
        let store = Store::open_in_memory().unwrap();
        let err = run_import(BufReader::new(Exploding), store.clone(), small_channel())
            .await
            .unwrap_err();
        assert!(matches!(err, XesError::Internal(_)), "{err}");

        let mut writer = store.writer().unwrap();
        writer.begin().unwrap();
        writer.rollback().unwrap();
        drop(writer);
        assert_eq!(store.count_rows("event_collection").unwrap(), 0);
        assert_eq!(store.stats().unwrap().logs_count, 0);
    }

    #[test]
    fn dispatch_forwards_every_event_kind() {
        let mut recorder = RecordingHandler::default();
        parse(Cursor::new(ROUND_TRIP_XES), &mut recorder).unwrap();

        let mut replay = RecordingHandler::default();
        for call in recorder.calls.iter().cloned() {
            let event = match call {
                testkit::Call::LogStart(name) => ParseEvent::LogStart(name),
                testkit::Call::Extension(e) => ParseEvent::Extension(e),
                testkit::Call::Classifier(c) => ParseEvent::Classifier(c),
                testkit::Call::LogAttributes(a) => ParseEvent::LogAttributes(a),
                testkit::Call::GlobalAttributes(g) => ParseEvent::GlobalAttributes(g),
                testkit::Call::Trace(t) => ParseEvent::Trace(t),
                testkit::Call::LogEnd => ParseEvent::LogEnd,
            };
            dispatch(&mut replay, event).unwrap();
        }
        assert_eq!(recorder.calls, replay.calls);
    }

    #[test]
    fn dispatch_into_load_engine_commits() {
        let mut engine = LoadEngine::new(FakeStore::new(), LoadConfig::default()).unwrap();
        dispatch(&mut engine, ParseEvent::LogStart("log".into())).unwrap();
        dispatch(&mut engine, ParseEvent::Trace(XesTrace::default())).unwrap();
        dispatch(&mut engine, ParseEvent::LogEnd).unwrap();
        assert!(engine.is_finished());
        assert_eq!(engine.into_store().commits, 1);
    }
}
