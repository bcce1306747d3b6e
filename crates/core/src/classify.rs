//! Shape and rarity classification for inspected values.
//!
//! The core never performs runtime reflection itself. The host supplies each
//! inspected value behind the narrow [`ValueProbe`] capability interface;
//! [`CapturedValue`] is the serde-backed implementation hosts use to ship
//! snapshots over a JSON boundary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{RarityKind, SubjectKind, PROTOTYPE_DEPTH_CAP};

/// Marker runtimes attach to the rendered source of closure-capturing
/// callables.
const CLOSURE_SOURCE_MARKER: &str = "[[Scopes]]";

/// Own-property descriptor, reduced to the single capability the classifier
/// needs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub enumerable: bool,
}

/// Capability probe the host environment supplies per inspected value.
pub trait ValueProbe {
    fn is_callable(&self) -> bool;
    fn is_byte_buffer(&self) -> bool;
    fn element_size(&self) -> Option<u32>;
    fn length(&self) -> Option<u64>;
    /// Declared type-tag name, when the value carries one.
    fn type_tag(&self) -> Option<&str>;
    /// Dynamic type name fallback.
    fn runtime_type(&self) -> Option<&str>;
    fn callable_name(&self) -> Option<&str>;
    /// Rendered source text of a callable, when available.
    fn source_text(&self) -> Option<&str>;
    fn own_descriptor(&self, key: &str) -> Option<PropertyDescriptor>;
    fn own_value(&self, key: &str) -> Option<&dyn ValueProbe>;
    /// Next link in the prototype/ancestor-type chain.
    fn ancestor(&self) -> Option<&dyn ValueProbe>;
}

/// Serde-friendly snapshot of an inspected value, as captured by the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CapturedValue {
    #[serde(default)]
    pub callable: bool,
    #[serde(default)]
    pub callable_name: Option<String>,
    #[serde(default)]
    pub source_text: Option<String>,
    #[serde(default)]
    pub byte_buffer: bool,
    #[serde(default)]
    pub element_size: Option<u32>,
    #[serde(default)]
    pub length: Option<u64>,
    #[serde(default)]
    pub type_tag: Option<String>,
    #[serde(default)]
    pub runtime_type: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, CapturedProperty>,
    #[serde(default)]
    pub ancestor: Option<Box<CapturedValue>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapturedProperty {
    #[serde(default)]
    pub value: Option<Box<CapturedValue>>,
    #[serde(default = "default_enumerable")]
    pub enumerable: bool,
}

fn default_enumerable() -> bool {
    true
}

impl ValueProbe for CapturedValue {
    fn is_callable(&self) -> bool {
        self.callable
    }

    fn is_byte_buffer(&self) -> bool {
        self.byte_buffer
    }

    fn element_size(&self) -> Option<u32> {
        self.element_size
    }

    fn length(&self) -> Option<u64> {
        self.length
    }

    fn type_tag(&self) -> Option<&str> {
        self.type_tag.as_deref()
    }

    fn runtime_type(&self) -> Option<&str> {
        self.runtime_type.as_deref()
    }

    fn callable_name(&self) -> Option<&str> {
        self.callable_name.as_deref()
    }

    fn source_text(&self) -> Option<&str> {
        self.source_text.as_deref()
    }

    fn own_descriptor(&self, key: &str) -> Option<PropertyDescriptor> {
        self.properties.get(key).map(|property| PropertyDescriptor {
            enumerable: property.enumerable,
        })
    }

    fn own_value(&self, key: &str) -> Option<&dyn ValueProbe> {
        self.properties
            .get(key)
            .and_then(|property| property.value.as_deref())
            .map(|value| value as &dyn ValueProbe)
    }

    fn ancestor(&self) -> Option<&dyn ValueProbe> {
        self.ancestor.as_deref().map(|value| value as &dyn ValueProbe)
    }
}

/// Coarse kind of the inspected value. Absent values classify as `Other`.
pub fn infer_kind(value: Option<&dyn ValueProbe>) -> SubjectKind {
    let Some(value) = value else {
        return SubjectKind::Other;
    };
    if value.is_byte_buffer() {
        SubjectKind::Buffer
    } else if value.is_callable() {
        SubjectKind::Function
    } else if value.element_size().is_some() && value.length().is_some() {
        SubjectKind::TypedArray
    } else {
        SubjectKind::Other
    }
}

/// One-line human summary of the inspected value.
pub fn summarize(value: Option<&dyn ValueProbe>) -> String {
    let Some(value) = value else {
        return "null|undefined".to_string();
    };
    if value.is_callable() {
        return match value.callable_name().filter(|name| !name.is_empty()) {
            Some(name) => format!("function {name}()"),
            None => "anonymous function".to_string(),
        };
    }
    if value.is_byte_buffer() {
        return match value.length() {
            Some(length) => format!("buffer(len={length})"),
            None => "buffer(len=?)".to_string(),
        };
    }
    value
        .type_tag()
        .or_else(|| value.runtime_type())
        .unwrap_or("object")
        .to_string()
}

/// Counts links along the ancestor-type chain, capped at
/// [`PROTOTYPE_DEPTH_CAP`] hops so malformed or cyclic chains terminate.
/// Values with no ancestor report 0.
pub fn prototype_depth(value: Option<&dyn ValueProbe>) -> u32 {
    let Some(mut current) = value else {
        return 0;
    };
    let mut depth = 0_u32;
    while depth < PROTOTYPE_DEPTH_CAP {
        match current.ancestor() {
            Some(ancestor) => {
                depth += 1;
                current = ancestor;
            }
            None => break,
        }
    }
    depth
}

fn is_symbolic_slot(slot_name: &str) -> bool {
    slot_name.starts_with("Symbol(") || slot_name.starts_with("@@")
}

fn is_internal_slot(slot_name: &str) -> bool {
    slot_name.starts_with("[[") && slot_name.ends_with("]]")
}

/// Rarity classification of one inspected slot. Precedence: non-enumerable
/// descriptor, then symbolic key, then internal slot, then closure capture.
/// `None` means ordinary.
pub fn classify_rarity(
    value: Option<&dyn ValueProbe>,
    descriptor: Option<&PropertyDescriptor>,
    slot_name: &str,
) -> Option<RarityKind> {
    if descriptor.is_some_and(|descriptor| !descriptor.enumerable) {
        return Some(RarityKind::NonEnumerable);
    }
    if is_symbolic_slot(slot_name) {
        return Some(RarityKind::Symbolic);
    }
    if is_internal_slot(slot_name) {
        return Some(RarityKind::InternalSlot);
    }
    if let Some(value) = value {
        if value.is_callable()
            && value
                .source_text()
                .is_some_and(|source| source.contains(CLOSURE_SOURCE_MARKER))
        {
            return Some(RarityKind::ClosureCapture);
        }
    }
    None
}
