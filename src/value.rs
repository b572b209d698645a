//! Interned operand values and the external collaborator traits.
//!
//! The journal never interprets attribute semantics; object operands are an
//! opaque, closed set of payload shapes compared by equality so that equal
//! values intern to a single stored instance.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::Result;
use crate::target::MutationTarget;

/// Kind of graph element an attribute or primary key is scoped to.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[repr(u8)]
pub enum ElementType {
    /// The graph itself (graph-scoped attributes).
    Graph = 0,
    /// A vertex.
    Vertex = 1,
    /// A transaction (edge).
    Transaction = 2,
}

impl ElementType {
    /// Decodes from the raw ordinal, `None` for anything out of range.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Graph),
            1 => Some(Self::Vertex),
            2 => Some(Self::Transaction),
            _ => None,
        }
    }
}

/// Index maintenance level of an attribute.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[repr(u8)]
pub enum IndexType {
    /// No index.
    None = 0,
    /// Hash-style index, no ordering guarantees.
    Unordered = 1,
    /// Ordered index.
    Ordered = 2,
}

impl IndexType {
    /// Decodes from the raw ordinal, `None` for anything out of range.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Unordered),
            2 => Some(Self::Ordered),
            _ => None,
        }
    }
}

/// Everything needed to (re)create an attribute: the operand of
/// add/remove-attribute operations.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttributeSpec {
    /// Element kind the attribute applies to.
    pub element_type: ElementType,
    /// Registered attribute type name (e.g. `"integer"`).
    pub attribute_type: String,
    /// Display label.
    pub label: String,
    /// Human-readable description.
    pub description: String,
    /// Default value for elements that never had the attribute set.
    pub default_value: Option<Box<ObjectValue>>,
    /// Identifier of the merge policy applied on graph merges, if any.
    pub merger: Option<String>,
}

/// An opaque composite unit of work with its own execute/undo, recorded as a
/// single journal operation and replayed by delegation in both directions.
pub trait GraphOperation: fmt::Debug {
    /// Applies the composite mutation to the target.
    fn execute(&self, target: &mut dyn MutationTarget) -> Result<()>;
    /// Exactly reverses a prior `execute` on the target.
    fn undo(&self, target: &mut dyn MutationTarget) -> Result<()>;
}

/// Closed set of object operand payloads held by the object stack.
///
/// Equality and hashing drive interning: reals compare by bit pattern, and
/// operations compare by pointer identity (two distinct operation objects are
/// never merged, even if behaviourally identical).
#[derive(Clone, Debug)]
pub enum ObjectValue {
    /// UTF-8 text (attribute names, descriptions, string values).
    Text(String),
    /// Integer scalar.
    Int(i64),
    /// Floating scalar.
    Real(f64),
    /// Boolean scalar.
    Bool(bool),
    /// Id list (primary key definitions).
    IntList(Vec<i32>),
    /// Attribute creation parameters.
    Attribute(AttributeSpec),
    /// Opaque composite operation; not serializable.
    Operation(Arc<dyn GraphOperation>),
}

impl PartialEq for ObjectValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Real(a), Self::Real(b)) => a.to_bits() == b.to_bits(),
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::IntList(a), Self::IntList(b)) => a == b,
            (Self::Attribute(a), Self::Attribute(b)) => a == b,
            (Self::Operation(a), Self::Operation(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }
}

impl Eq for ObjectValue {}

impl Hash for ObjectValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Text(s) => s.hash(state),
            Self::Int(v) => v.hash(state),
            Self::Real(v) => v.to_bits().hash(state),
            Self::Bool(v) => v.hash(state),
            Self::IntList(v) => v.hash(state),
            Self::Attribute(a) => a.hash(state),
            Self::Operation(op) => (Arc::as_ptr(op) as *const ()).hash(state),
        }
    }
}
