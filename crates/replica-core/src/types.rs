//! Operation kinds and attribute values carried by the IR.

use std::fmt;

/// Attribute value types.
///
/// Attributes are discardable metadata hung off an operation. Passes copy
/// them around verbatim, so every variant supports `Clone` and `PartialEq`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    String(String),
    Int(i64),
    Bool(bool),
    /// Presence-only marker with no payload.
    Unit,
}

impl AttributeValue {
    /// Get the string payload, if this is a string attribute.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(v) => write!(f, "\"{}\"", v),
            AttributeValue::Int(v) => write!(f, "{}", v),
            AttributeValue::Bool(v) => write!(f, "{}", v),
            AttributeValue::Unit => write!(f, "unit"),
        }
    }
}

/// Name of an operation without its own `OpKind` variant.
///
/// Only `OpKind::from_name` builds one, so a name that has a dedicated
/// variant never ends up inside `OpKind::Other`:
///
/// ```compile_fail
/// use replica_core::types::{OpKind, OtherOpName};
///
/// let kind = OpKind::Other(OtherOpName("tf.TPUReplicateMetadata".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OtherOpName(String);

impl OtherOpName {
    /// The textual operation name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The closed set of operation kinds the IR distinguishes.
///
/// Only the kinds a pass needs to tell apart get their own variant; everything
/// else is `Other` with its textual operation name. Build kinds from text with
/// `OpKind::from_name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// `builtin.module`, the root of every module.
    Module,

    /// `func.func`
    Func,

    /// `func.return`
    Return,

    /// `tf_device.cluster`
    Cluster,

    /// `tf_device.replicate`
    Replicate,

    /// `tf.TPUReplicateMetadata`, which declares replication metadata itself.
    ReplicateMetadata,

    /// `tf.TPUCompilationResult`
    CompilationResult,

    /// Any other operation, by name (e.g. `"tf.AddV2"`).
    Other(OtherOpName),
}

impl OpKind {
    /// Textual operation name.
    pub fn name(&self) -> &str {
        match self {
            OpKind::Module => "builtin.module",
            OpKind::Func => "func.func",
            OpKind::Return => "func.return",
            OpKind::Cluster => "tf_device.cluster",
            OpKind::Replicate => "tf_device.replicate",
            OpKind::ReplicateMetadata => "tf.TPUReplicateMetadata",
            OpKind::CompilationResult => "tf.TPUCompilationResult",
            OpKind::Other(name) => name.as_str(),
        }
    }

    /// Parse a textual operation name. Unknown names become `Other`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "builtin.module" => OpKind::Module,
            "func.func" => OpKind::Func,
            "func.return" => OpKind::Return,
            "tf_device.cluster" => OpKind::Cluster,
            "tf_device.replicate" => OpKind::Replicate,
            "tf.TPUReplicateMetadata" => OpKind::ReplicateMetadata,
            "tf.TPUCompilationResult" => OpKind::CompilationResult,
            other => OpKind::Other(OtherOpName(other.to_string())),
        }
    }

    /// Whether this operation declares replication metadata.
    ///
    /// Such operations must never receive an inferred device type.
    pub fn is_metadata_declaration(&self) -> bool {
        match self {
            OpKind::ReplicateMetadata => true,
            OpKind::Module
            | OpKind::Func
            | OpKind::Return
            | OpKind::Cluster
            | OpKind::Replicate
            | OpKind::CompilationResult
            | OpKind::Other(_) => false,
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
