use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared type of a flat attribute, taken from the leaf element's tag name.
///
/// The type is recorded on the attribute definition only. Values are kept as the
/// raw text found in the document and are never parsed against their type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Date,
    Int,
    Float,
    Boolean,
    Id,
}

impl AttributeType {
    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"string" => Some(Self::String),
            b"date" => Some(Self::Date),
            b"int" => Some(Self::Int),
            b"float" => Some(Self::Float),
            b"boolean" => Some(Self::Boolean),
            b"id" => Some(Self::Id),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Date => "date",
            Self::Int => "int",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Id => "id",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub kind: AttributeType,
    pub value: String,
}

impl AttributeValue {
    pub fn new(kind: AttributeType, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(AttributeType::String, value)
    }
}

/// Key to value mapping for one owner. Inserting a key twice keeps the last value.
pub type AttributeMap = BTreeMap<String, AttributeValue>;
