use serde::{Deserialize, Serialize};

use crate::model::attribute::AttributeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XesEvent {
    pub attributes: AttributeMap,
}

/// One fully materialized trace subtree. It is the largest unit the parser holds
/// in memory at any time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XesTrace {
    pub attributes: AttributeMap,
    pub events: Vec<XesEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    pub name: Option<String>,
    pub prefix: Option<String>,
    pub uri: Option<String>,
}

/// Named classifier. `keys` is the raw, unsplit key list from the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classifier {
    pub name: Option<String>,
    pub keys: Option<String>,
}

/// Trace-scope and event-scope default declarations merged across every `global` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalAttributes {
    pub trace: AttributeMap,
    pub event: AttributeMap,
}

impl GlobalAttributes {
    pub fn is_empty(&self) -> bool {
        self.trace.is_empty() && self.event.is_empty()
    }

    pub fn len(&self) -> usize {
        self.trace.len() + self.event.len()
    }
}
