//! The mutation-target contract: the journal's only outward boundary.
//!
//! Replay applies primitive mutations through this trait; the journal never
//! holds a reference to the graph it was recorded against, so a frozen
//! journal can replay against any target honouring the contract.

use std::sync::Arc;

use crate::error::Result;
use crate::value::{AttributeSpec, ElementType, IndexType, ObjectValue};

/// Primitive setters an attributed graph exposes to the journal.
///
/// Every method either applies the mutation or returns an error; the journal
/// propagates errors immediately and never retries or skips entries, since
/// skipping would break execute/undo symmetry.
pub trait MutationTarget {
    /// Creates vertex `vertex`.
    fn add_vertex(&mut self, vertex: i32) -> Result<()>;
    /// Deletes vertex `vertex`.
    fn remove_vertex(&mut self, vertex: i32) -> Result<()>;
    /// Creates transaction `transaction` from `source` to `destination`.
    fn add_transaction(
        &mut self,
        source: i32,
        destination: i32,
        directed: bool,
        transaction: i32,
    ) -> Result<()>;
    /// Deletes transaction `transaction`.
    fn remove_transaction(&mut self, transaction: i32) -> Result<()>;
    /// Reattaches the source endpoint of `transaction` to `vertex`.
    fn set_transaction_source_vertex(&mut self, transaction: i32, vertex: i32) -> Result<()>;
    /// Reattaches the destination endpoint of `transaction` to `vertex`.
    fn set_transaction_destination_vertex(&mut self, transaction: i32, vertex: i32) -> Result<()>;
    /// Creates attribute `attribute` from `spec`.
    fn add_attribute(&mut self, spec: &AttributeSpec, attribute: i32) -> Result<()>;
    /// Deletes attribute `attribute` and any values stored under it.
    fn remove_attribute(&mut self, attribute: i32) -> Result<()>;
    /// Renames attribute `attribute`.
    fn update_attribute_name(&mut self, attribute: i32, name: &str) -> Result<()>;
    /// Replaces the description of attribute `attribute`.
    fn update_attribute_description(&mut self, attribute: i32, description: &str) -> Result<()>;
    /// Replaces the default value of attribute `attribute`.
    fn update_attribute_default_value(
        &mut self,
        attribute: i32,
        value: Option<Arc<ObjectValue>>,
    ) -> Result<()>;
    /// Sets an 8-bit value.
    fn set_byte_value(&mut self, attribute: i32, id: i32, value: i8) -> Result<()>;
    /// Sets a 16-bit value.
    fn set_short_value(&mut self, attribute: i32, id: i32, value: i16) -> Result<()>;
    /// Sets a 32-bit value.
    fn set_int_value(&mut self, attribute: i32, id: i32, value: i32) -> Result<()>;
    /// Sets a 64-bit value.
    fn set_long_value(&mut self, attribute: i32, id: i32, value: i64) -> Result<()>;
    /// Sets a 32-bit floating value.
    fn set_float_value(&mut self, attribute: i32, id: i32, value: f32) -> Result<()>;
    /// Sets a 64-bit floating value.
    fn set_double_value(&mut self, attribute: i32, id: i32, value: f64) -> Result<()>;
    /// Sets a boolean value.
    fn set_boolean_value(&mut self, attribute: i32, id: i32, value: bool) -> Result<()>;
    /// Sets an object value (`None` clears it).
    fn set_object_value(
        &mut self,
        attribute: i32,
        id: i32,
        value: Option<Arc<ObjectValue>>,
    ) -> Result<()>;
    /// Changes the index maintenance level of attribute `attribute`.
    fn set_attribute_index_type(&mut self, attribute: i32, index_type: IndexType) -> Result<()>;
    /// Replaces the primary key attribute set for `element_type`.
    fn set_primary_key(&mut self, element_type: ElementType, keys: &[i32]) -> Result<()>;
}
