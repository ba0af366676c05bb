//! Streaming reader for XES documents.
//!
//! The document is walked event by event. Only one trace subtree is materialized
//! at a time; it is handed to the [`LogHandler`] as soon as its closing tag is
//! read and is not retained afterwards. Elements outside the recognized set are
//! skipped together with their subtree.

use std::io::BufRead;

use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::debug;
use xesload_core::error::{Result, XesError};
use xesload_core::handler::LogHandler;
use xesload_core::model::{
    AttributeMap, AttributeType, AttributeValue, Classifier, Extension, GlobalAttributes,
    XesEvent, XesTrace,
};

pub const DEFAULT_LOG_NAME: &str = "Unnamed Log";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseSummary {
    pub traces: u64,
    pub events: u64,
}

/// Parses a whole document, driving `handler` in document order.
///
/// Log-level attributes and global declarations are collected across the whole
/// document and reported once, after the last trace and right before
/// `on_log_end`.
pub fn parse<R: BufRead, H: LogHandler>(source: R, handler: &mut H) -> Result<ParseSummary> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut parser = XesParser {
        reader,
        buf: Vec::new(),
        scratch: Vec::new(),
        summary: ParseSummary::default(),
    };
    parser.run(handler)?;
    debug!(
        traces = parser.summary.traces,
        events = parser.summary.events,
        "finished parsing document"
    );
    Ok(parser.summary)
}

struct XesParser<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    scratch: Vec<u8>,
    summary: ParseSummary,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Container {
    Trace,
    Event,
    Global,
}

impl Container {
    fn tag(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Event => "event",
            Self::Global => "global",
        }
    }
}

impl<R: BufRead> XesParser<R> {
    fn run<H: LogHandler>(&mut self, handler: &mut H) -> Result<()> {
        let mut log_started = false;
        let mut log_attributes = AttributeMap::new();
        let mut globals = GlobalAttributes::default();

        loop {
            self.buf.clear();
            let (element, is_empty) = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) => (e.into_owned(), false),
                Ok(Event::Empty(e)) => (e.into_owned(), true),
                Ok(Event::End(e)) => {
                    if e.local_name().as_ref() == b"log" {
                        break;
                    }
                    continue;
                }
                Ok(Event::Eof) => break,
                Ok(_) => continue,
                Err(e) => return Err(xml_error(&self.reader, e)),
            };

            let name = element.local_name();
            let name = name.as_ref();
            let decoder = self.reader.decoder();

            if !log_started {
                if name != b"log" {
                    return Err(XesError::Parse(format!(
                        "document root must be <log>, found <{}>",
                        String::from_utf8_lossy(name)
                    )));
                }
                let log_name = attr(&element, b"concept:name", decoder)?
                    .unwrap_or_else(|| DEFAULT_LOG_NAME.to_string());
                handler.on_log_start(&log_name)?;
                log_started = true;
                if is_empty {
                    break;
                }
                continue;
            }

            match name {
                b"log" => {
                    return Err(XesError::Parse("nested <log> element".to_string()));
                }
                b"extension" => {
                    let extension = Extension {
                        name: attr(&element, b"name", decoder)?,
                        prefix: attr(&element, b"prefix", decoder)?,
                        uri: attr(&element, b"uri", decoder)?,
                    };
                    self.skip_children(&element, is_empty)?;
                    handler.on_extension(extension)?;
                }
                b"classifier" => {
                    let classifier = Classifier {
                        name: attr(&element, b"name", decoder)?,
                        keys: attr(&element, b"keys", decoder)?,
                    };
                    self.skip_children(&element, is_empty)?;
                    handler.on_classifier(classifier)?;
                }
                b"global" => {
                    let scope = attr(&element, b"scope", decoder)?;
                    let target = if scope.as_deref() == Some("trace") {
                        &mut globals.trace
                    } else {
                        &mut globals.event
                    };
                    if !is_empty {
                        let (declared, _) = self.read_container(Container::Global)?;
                        target.extend(declared);
                    }
                }
                b"trace" => {
                    let trace = if is_empty {
                        XesTrace::default()
                    } else {
                        let (attributes, events) = self.read_container(Container::Trace)?;
                        XesTrace { attributes, events }
                    };
                    self.summary.traces += 1;
                    self.summary.events += trace.events.len() as u64;
                    handler.on_trace(trace)?;
                }
                _ => {
                    if let Some(kind) = AttributeType::from_tag(name)
                        && let Some((key, value)) = leaf_attribute(&element, kind, decoder)?
                    {
                        log_attributes.insert(key, value);
                    }
                    self.skip_children(&element, is_empty)?;
                }
            }
        }

        if !log_started {
            return Err(XesError::Parse("no <log> element found".to_string()));
        }

        if !log_attributes.is_empty() {
            handler.on_log_attributes(log_attributes)?;
        }
        if !globals.is_empty() {
            handler.on_global_attributes(globals)?;
        }
        handler.on_log_end()
    }

    /// Reads the children of an open `trace`, `event` or `global` element up to its
    /// closing tag. Only direct leaf children become attributes; events are only
    /// collected inside a trace.
    fn read_container(&mut self, container: Container) -> Result<(AttributeMap, Vec<XesEvent>)> {
        let mut attributes = AttributeMap::new();
        let mut events = Vec::new();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let (element, is_empty) = match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => (e.into_owned(), false),
                Ok(Event::Empty(e)) => (e.into_owned(), true),
                Ok(Event::End(_)) => break,
                Ok(Event::Eof) => {
                    return Err(XesError::Parse(format!(
                        "unterminated <{}> at byte {}",
                        container.tag(),
                        self.reader.buffer_position()
                    )));
                }
                Ok(_) => continue,
                Err(e) => return Err(xml_error(&self.reader, e)),
            };

            let name = element.local_name();
            let name = name.as_ref();
            let decoder = self.reader.decoder();

            if container == Container::Trace && name == b"event" {
                let event = if is_empty {
                    XesEvent::default()
                } else {
                    let (attributes, _) = self.read_container(Container::Event)?;
                    XesEvent { attributes }
                };
                events.push(event);
                continue;
            }

            if let Some(kind) = AttributeType::from_tag(name)
                && let Some((key, value)) = leaf_attribute(&element, kind, decoder)?
            {
                attributes.insert(key, value);
            }
            self.skip_children(&element, is_empty)?;
        }

        Ok((attributes, events))
    }

    fn skip_children(&mut self, element: &BytesStart<'_>, is_empty: bool) -> Result<()> {
        if is_empty {
            return Ok(());
        }
        self.scratch.clear();
        self.reader
            .read_to_end_into(element.name(), &mut self.scratch)
            .map_err(|e| xml_error(&self.reader, e))?;
        Ok(())
    }
}

fn xml_error<R>(reader: &Reader<R>, err: quick_xml::Error) -> XesError {
    XesError::Parse(format!(
        "malformed document at byte {}: {err}",
        reader.buffer_position()
    ))
}

fn leaf_attribute(
    element: &BytesStart<'_>,
    kind: AttributeType,
    decoder: Decoder,
) -> Result<Option<(String, AttributeValue)>> {
    let Some(key) = attr(element, b"key", decoder)? else {
        return Ok(None);
    };
    let value = attr(element, b"value", decoder)?.unwrap_or_default();
    Ok(Some((key, AttributeValue::new(kind, value))))
}

/// Attribute values are decoded with the encoding named in the XML declaration.
fn attr(element: &BytesStart<'_>, name: &[u8], decoder: Decoder) -> Result<Option<String>> {
    for attribute in element.attributes() {
        let attribute =
            attribute.map_err(|e| XesError::Parse(format!("malformed attribute: {e}")))?;
        if attribute.key.as_ref() == name {
            let value = attribute
                .decode_and_unescape_value(decoder)
                .map_err(|e| XesError::Parse(format!("malformed attribute value: {e}")))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::io::{self, BufReader, Cursor, Read};

    use testkit::{Call, EMPTY_LOG_XES, GLOBALS_XES, ROUND_TRIP_XES, RecordingHandler};

    use super::*;

    fn parse_str(doc: &str) -> Result<RecordingHandler> {
        let mut handler = RecordingHandler::default();
        parse(doc.as_bytes(), &mut handler)?;
        Ok(handler)
    }

    #[test]
    fn emits_callbacks_in_document_order() {
        let handler = parse_str(ROUND_TRIP_XES).unwrap();
        let calls = &handler.calls;
        assert_eq!(calls.len(), 6);
        assert_eq!(calls[0], Call::LogStart("orders".into()));
        assert_eq!(
            calls[1],
            Call::Extension(Extension {
                name: Some("Concept".into()),
                prefix: Some("concept".into()),
                uri: Some("http://www.xes-standard.org/concept.xesext".into()),
            })
        );
        assert_eq!(
            calls[2],
            Call::Classifier(Classifier {
                name: Some("Activity".into()),
                keys: Some("concept:name".into()),
            })
        );
        assert!(matches!(calls[3], Call::Trace(_)));
        assert!(matches!(calls[4], Call::Trace(_)));
        assert_eq!(calls[5], Call::LogEnd);
    }

    #[test]
    fn materializes_trace_attributes_and_events() {
        let handler = parse_str(ROUND_TRIP_XES).unwrap();
        let traces = handler.traces();
        assert_eq!(traces.len(), 2);

        let first = traces[0];
        assert_eq!(first.attributes["cost"], AttributeValue::string("10"));
        assert_eq!(first.events.len(), 2);
        assert_eq!(
            first.events[0].attributes["concept:name"].value,
            "A".to_string()
        );
        assert_eq!(
            first.events[1].attributes["concept:name"].value,
            "B".to_string()
        );

        assert!(traces[1].attributes.is_empty());
        assert!(traces[1].events.is_empty());
    }

    #[test]
    fn merges_global_blocks_once_before_log_end() {
        let handler = parse_str(GLOBALS_XES).unwrap();
        let globals = handler.globals();
        assert_eq!(globals.len(), 1);

        let globals = globals[0];
        assert_eq!(globals.trace.len(), 2);
        assert_eq!(globals.trace["concept:name"].value, "UNKNOWN");
        assert_eq!(
            globals.trace["cost"],
            AttributeValue::new(AttributeType::Int, "0")
        );
        assert_eq!(globals.event.len(), 1);
        assert_eq!(globals.event["time:timestamp"].kind, AttributeType::Date);

        let n = handler.calls.len();
        assert!(matches!(handler.calls[n - 3], Call::Trace(_)));
        assert!(matches!(handler.calls[n - 2], Call::GlobalAttributes(_)));
        assert_eq!(handler.calls[n - 1], Call::LogEnd);
    }

    #[test]
    fn empty_log_skips_globals() {
        let handler = parse_str(EMPTY_LOG_XES).unwrap();
        assert_eq!(
            handler.calls,
            vec![Call::LogStart("empty".into()), Call::LogEnd]
        );
    }

    #[test]
    fn self_closing_log_uses_default_name() {
        let handler = parse_str("<log/>").unwrap();
        assert_eq!(
            handler.calls,
            vec![Call::LogStart(DEFAULT_LOG_NAME.into()), Call::LogEnd]
        );
    }

    #[test]
    fn ignores_unknown_and_nested_elements() {
        let doc = r#"<log>
          <meta><trace><event/></trace></meta>
          <trace>
            <list key="items">
              <values><string key="inner" value="x"/></values>
            </list>
            <string key="outer" value="y">
              <string key="child" value="z"/>
            </string>
            <event>
              <container key="c"><int key="deep" value="1"/></container>
              <boolean key="done" value="true"/>
            </event>
          </trace>
        </log>"#;
        let handler = parse_str(doc).unwrap();
        let traces = handler.traces();
        assert_eq!(traces.len(), 1);
        let trace = traces[0];
        assert_eq!(trace.attributes.len(), 1);
        assert_eq!(trace.attributes["outer"].value, "y");
        assert_eq!(trace.events.len(), 1);
        assert_eq!(trace.events[0].attributes.len(), 1);
        assert_eq!(
            trace.events[0].attributes["done"],
            AttributeValue::new(AttributeType::Boolean, "true")
        );
    }

    #[test]
    fn keeps_raw_values_and_last_duplicate() {
        let doc = r#"<log>
          <trace>
            <float key="cost" value="not-a-number"/>
            <string key="note" value="first"/>
            <string key="note" value="a &amp; b"/>
            <string value="keyless"/>
            <id key="ident"/>
          </trace>
        </log>"#;
        let handler = parse_str(doc).unwrap();
        let trace = handler.traces()[0];
        assert_eq!(trace.attributes["cost"].value, "not-a-number");
        assert_eq!(trace.attributes["note"].value, "a & b");
        assert_eq!(trace.attributes["ident"].value, "");
        assert_eq!(trace.attributes.len(), 3);
    }

    #[test]
    fn collects_log_level_attributes() {
        let doc = r#"<log>
          <string key="concept:name" value="orders"/>
          <string key="lifecycle:model" value="standard"/>
          <trace/>
        </log>"#;
        let handler = parse_str(doc).unwrap();
        let attrs = handler
            .calls
            .iter()
            .find_map(|c| match c {
                Call::LogAttributes(a) => Some(a.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["lifecycle:model"].value, "standard");
        assert_eq!(handler.traces().len(), 1);
    }

    #[test]
    fn missing_extension_fields_stay_absent() {
        let handler = parse_str(r#"<log><extension name="Lifecycle"/></log>"#).unwrap();
        assert_eq!(
            handler.calls[1],
            Call::Extension(Extension {
                name: Some("Lifecycle".into()),
                prefix: None,
                uri: None,
            })
        );
    }

    #[test]
    fn unterminated_trace_is_fatal() {
        let doc = r#"<log><trace><event><string key="a" value="b"/>"#;
        let mut handler = RecordingHandler::default();
        let err = parse(doc.as_bytes(), &mut handler).unwrap_err();
        assert!(matches!(err, XesError::Parse(_)));
        assert!(handler.traces().is_empty());
        assert!(!handler.calls.contains(&Call::LogEnd));
    }

    #[test]
    fn mismatched_tags_are_fatal() {
        let err = parse_str("<log><trace></event></log>").unwrap_err();
        assert!(matches!(err, XesError::Parse(_)));
    }

    #[test]
    fn non_log_root_is_rejected() {
        let err = parse_str("<events><trace/></events>").unwrap_err();
        assert!(err.to_string().contains("<log>"));
        let err = parse_str("").unwrap_err();
        assert!(err.to_string().contains("no <log>"));
    }

    #[test]
    fn handler_errors_abort_parse() {
        struct FailOnTrace(RecordingHandler);

        impl LogHandler for FailOnTrace {
            fn on_log_start(&mut self, name: &str) -> Result<()> {
                self.0.on_log_start(name)
            }
            fn on_extension(&mut self, extension: Extension) -> Result<()> {
                self.0.on_extension(extension)
            }
            fn on_classifier(&mut self, classifier: Classifier) -> Result<()> {
                self.0.on_classifier(classifier)
            }
            fn on_global_attributes(&mut self, globals: GlobalAttributes) -> Result<()> {
                self.0.on_global_attributes(globals)
            }
            fn on_trace(&mut self, _trace: XesTrace) -> Result<()> {
                Err(XesError::Store("rejected".into()))
            }
            fn on_log_end(&mut self) -> Result<()> {
                self.0.on_log_end()
            }
        }

        let mut handler = FailOnTrace(RecordingHandler::default());
        let err = parse(ROUND_TRIP_XES.as_bytes(), &mut handler).unwrap_err();
        assert!(matches!(err, XesError::Store(_)));
        assert!(!handler.0.calls.contains(&Call::LogEnd));
    }

    #[test]
    fn counts_traces_and_events() {
        let doc = testkit::generated_log(25, 4);
        let mut handler = RecordingHandler::default();
        let summary = parse(doc.as_bytes(), &mut handler).unwrap();
        assert_eq!(summary, ParseSummary { traces: 25, events: 100 });
    }

    #[test]
    fn honours_declared_latin1_encoding() {
        let doc: &[u8] = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n\
            <log concept:name=\"caf\xE9\"><trace><string key=\"org:resource\" value=\"Jos\xE9\"/></trace></log>";
        let mut handler = RecordingHandler::default();
        parse(doc, &mut handler).unwrap();

        assert_eq!(handler.calls[0], Call::LogStart("caf\u{e9}".into()));
        let traces = handler.traces();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].attributes["org:resource"].value, "Jos\u{e9}");
    }

    /// Serves `data`, then fails every further read.
    struct CutOff {
        data: Cursor<Vec<u8>>,
    }

    impl Read for CutOff {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.data.read(buf)?;
            if n == 0 {
                return Err(io::Error::other("stream cut"));
            }
            Ok(n)
        }
    }

    #[test]
    fn traces_are_delivered_before_the_rest_of_the_stream_is_read() {
        let head = r#"<log><trace><string key="concept:name" value="case-1"/></trace><trace>"#;
        let source = BufReader::new(CutOff {
            data: Cursor::new(head.as_bytes().to_vec()),
        });
        let mut handler = RecordingHandler::default();

        let err = parse(source, &mut handler).unwrap_err();
        assert!(matches!(err, XesError::Parse(_)));
        assert!(err.to_string().contains("stream cut"), "{err}");
        assert_eq!(handler.traces().len(), 1);
        assert!(!handler.calls.contains(&Call::LogEnd));
    }
}
