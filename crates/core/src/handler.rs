use crate::error::Result;
use crate::model::{AttributeMap, Classifier, Extension, GlobalAttributes, XesTrace};

/// Receiver of structural units, called by the parser in document order.
///
/// `on_log_start` comes first and `on_log_end` last, each exactly once.
/// `on_log_attributes` and `on_global_attributes` are deferred until the whole
/// document has been read, and are skipped when there is nothing to report.
/// An error returned from any callback aborts the parse.
pub trait LogHandler {
    fn on_log_start(&mut self, name: &str) -> Result<()>;

    fn on_extension(&mut self, extension: Extension) -> Result<()>;

    fn on_classifier(&mut self, classifier: Classifier) -> Result<()>;

    fn on_log_attributes(&mut self, _attributes: AttributeMap) -> Result<()> {
        Ok(())
    }

    fn on_global_attributes(&mut self, globals: GlobalAttributes) -> Result<()>;

    fn on_trace(&mut self, trace: XesTrace) -> Result<()>;

    fn on_log_end(&mut self) -> Result<()>;
}

impl<H: LogHandler + ?Sized> LogHandler for &mut H {
    fn on_log_start(&mut self, name: &str) -> Result<()> {
        (**self).on_log_start(name)
    }

    fn on_extension(&mut self, extension: Extension) -> Result<()> {
        (**self).on_extension(extension)
    }

    fn on_classifier(&mut self, classifier: Classifier) -> Result<()> {
        (**self).on_classifier(classifier)
    }

    fn on_log_attributes(&mut self, attributes: AttributeMap) -> Result<()> {
        (**self).on_log_attributes(attributes)
    }

    fn on_global_attributes(&mut self, globals: GlobalAttributes) -> Result<()> {
        (**self).on_global_attributes(globals)
    }

    fn on_trace(&mut self, trace: XesTrace) -> Result<()> {
        (**self).on_trace(trace)
    }

    fn on_log_end(&mut self) -> Result<()> {
        (**self).on_log_end()
    }
}
