//! A reference in-memory mutation target for tests, doctests and benches.
//!
//! `MemoryGraph` validates every mutation (duplicate ids, dangling
//! endpoints, unknown attributes) and purges stored values when their
//! element or attribute is removed. Values equal to the width's default
//! (zero, `false`, null) are not stored, so a graph mutated and then exactly
//! un-mutated compares equal to its starting state with plain `==`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::{JournalError, Result};
use crate::target::MutationTarget;
use crate::value::{AttributeSpec, ElementType, IndexType, ObjectValue};

#[derive(Clone, Debug, PartialEq)]
struct Transaction {
    source: i32,
    destination: i32,
    directed: bool,
}

#[derive(Clone, Debug, PartialEq)]
struct Attribute {
    spec: AttributeSpec,
    index_type: IndexType,
}

#[derive(Clone, Debug, PartialEq)]
enum Stored {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(u32),
    Double(u64),
    Bool(bool),
    Object(Arc<ObjectValue>),
}

/// An attributed graph held in ordered maps.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryGraph {
    vertices: BTreeSet<i32>,
    transactions: BTreeMap<i32, Transaction>,
    attributes: BTreeMap<i32, Attribute>,
    values: BTreeMap<(i32, i32), Stored>,
    primary_keys: BTreeMap<ElementType, Vec<i32>>,
}

fn reject(message: String) -> JournalError {
    JournalError::Replay(message)
}

impl MemoryGraph {
    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of transactions.
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Number of attributes.
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// True if `vertex` exists.
    pub fn has_vertex(&self, vertex: i32) -> bool {
        self.vertices.contains(&vertex)
    }

    /// Endpoints and directedness of `transaction`, if it exists.
    pub fn transaction(&self, transaction: i32) -> Option<(i32, i32, bool)> {
        self.transactions
            .get(&transaction)
            .map(|t| (t.source, t.destination, t.directed))
    }

    /// Creation parameters of `attribute`, if it exists. The label and
    /// description track renames.
    pub fn attribute_spec(&self, attribute: i32) -> Option<&AttributeSpec> {
        self.attributes.get(&attribute).map(|a| &a.spec)
    }

    /// Index maintenance level of `attribute`, if it exists.
    pub fn attribute_index_type(&self, attribute: i32) -> Option<IndexType> {
        self.attributes.get(&attribute).map(|a| a.index_type)
    }

    /// Primary key attribute set for `element_type` (empty if never set).
    pub fn primary_key(&self, element_type: ElementType) -> &[i32] {
        self.primary_keys
            .get(&element_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Stored 8-bit value, zero if unset.
    pub fn byte_value(&self, attribute: i32, id: i32) -> i8 {
        match self.values.get(&(attribute, id)) {
            Some(Stored::Byte(v)) => *v,
            _ => 0,
        }
    }

    /// Stored 16-bit value, zero if unset.
    pub fn short_value(&self, attribute: i32, id: i32) -> i16 {
        match self.values.get(&(attribute, id)) {
            Some(Stored::Short(v)) => *v,
            _ => 0,
        }
    }

    /// Stored 32-bit value, zero if unset.
    pub fn int_value(&self, attribute: i32, id: i32) -> i32 {
        match self.values.get(&(attribute, id)) {
            Some(Stored::Int(v)) => *v,
            _ => 0,
        }
    }

    /// Stored 64-bit value, zero if unset.
    pub fn long_value(&self, attribute: i32, id: i32) -> i64 {
        match self.values.get(&(attribute, id)) {
            Some(Stored::Long(v)) => *v,
            _ => 0,
        }
    }

    /// Stored 32-bit floating value, zero if unset.
    pub fn float_value(&self, attribute: i32, id: i32) -> f32 {
        match self.values.get(&(attribute, id)) {
            Some(Stored::Float(bits)) => f32::from_bits(*bits),
            _ => 0.0,
        }
    }

    /// Stored 64-bit floating value, zero if unset.
    pub fn double_value(&self, attribute: i32, id: i32) -> f64 {
        match self.values.get(&(attribute, id)) {
            Some(Stored::Double(bits)) => f64::from_bits(*bits),
            _ => 0.0,
        }
    }

    /// Stored boolean value, false if unset.
    pub fn boolean_value(&self, attribute: i32, id: i32) -> bool {
        matches!(self.values.get(&(attribute, id)), Some(Stored::Bool(true)))
    }

    /// Stored object value, `None` if unset.
    pub fn object_value(&self, attribute: i32, id: i32) -> Option<Arc<ObjectValue>> {
        match self.values.get(&(attribute, id)) {
            Some(Stored::Object(v)) => Some(Arc::clone(v)),
            _ => None,
        }
    }

    fn require_attribute(&self, attribute: i32) -> Result<&Attribute> {
        self.attributes
            .get(&attribute)
            .ok_or_else(|| reject(format!("unknown attribute {attribute}")))
    }

    fn store(&mut self, attribute: i32, id: i32, value: Option<Stored>) -> Result<()> {
        self.require_attribute(attribute)?;
        match value {
            Some(value) => self.values.insert((attribute, id), value),
            None => self.values.remove(&(attribute, id)),
        };
        Ok(())
    }

    fn purge_values(&mut self, element_type: ElementType, id: i32) {
        let scoped: Vec<i32> = self
            .attributes
            .iter()
            .filter(|(_, a)| a.spec.element_type == element_type)
            .map(|(&attr, _)| attr)
            .collect();
        for attr in scoped {
            self.values.remove(&(attr, id));
        }
    }
}

impl MutationTarget for MemoryGraph {
    fn add_vertex(&mut self, vertex: i32) -> Result<()> {
        if !self.vertices.insert(vertex) {
            return Err(reject(format!("vertex {vertex} already exists")));
        }
        Ok(())
    }

    fn remove_vertex(&mut self, vertex: i32) -> Result<()> {
        if let Some(t) = self
            .transactions
            .values()
            .find(|t| t.source == vertex || t.destination == vertex)
        {
            return Err(reject(format!(
                "vertex {vertex} still has a transaction {} -> {}",
                t.source, t.destination
            )));
        }
        if !self.vertices.remove(&vertex) {
            return Err(reject(format!("unknown vertex {vertex}")));
        }
        self.purge_values(ElementType::Vertex, vertex);
        Ok(())
    }

    fn add_transaction(
        &mut self,
        source: i32,
        destination: i32,
        directed: bool,
        transaction: i32,
    ) -> Result<()> {
        if !self.vertices.contains(&source) {
            return Err(reject(format!("unknown source vertex {source}")));
        }
        if !self.vertices.contains(&destination) {
            return Err(reject(format!("unknown destination vertex {destination}")));
        }
        if self.transactions.contains_key(&transaction) {
            return Err(reject(format!("transaction {transaction} already exists")));
        }
        self.transactions.insert(
            transaction,
            Transaction {
                source,
                destination,
                directed,
            },
        );
        Ok(())
    }

    fn remove_transaction(&mut self, transaction: i32) -> Result<()> {
        if self.transactions.remove(&transaction).is_none() {
            return Err(reject(format!("unknown transaction {transaction}")));
        }
        self.purge_values(ElementType::Transaction, transaction);
        Ok(())
    }

    fn set_transaction_source_vertex(&mut self, transaction: i32, vertex: i32) -> Result<()> {
        if !self.vertices.contains(&vertex) {
            return Err(reject(format!("unknown vertex {vertex}")));
        }
        match self.transactions.get_mut(&transaction) {
            Some(t) => {
                t.source = vertex;
                Ok(())
            }
            None => Err(reject(format!("unknown transaction {transaction}"))),
        }
    }

    fn set_transaction_destination_vertex(&mut self, transaction: i32, vertex: i32) -> Result<()> {
        if !self.vertices.contains(&vertex) {
            return Err(reject(format!("unknown vertex {vertex}")));
        }
        match self.transactions.get_mut(&transaction) {
            Some(t) => {
                t.destination = vertex;
                Ok(())
            }
            None => Err(reject(format!("unknown transaction {transaction}"))),
        }
    }

    fn add_attribute(&mut self, spec: &AttributeSpec, attribute: i32) -> Result<()> {
        if self.attributes.contains_key(&attribute) {
            return Err(reject(format!("attribute {attribute} already exists")));
        }
        self.attributes.insert(
            attribute,
            Attribute {
                spec: spec.clone(),
                index_type: IndexType::None,
            },
        );
        Ok(())
    }

    fn remove_attribute(&mut self, attribute: i32) -> Result<()> {
        if self.attributes.remove(&attribute).is_none() {
            return Err(reject(format!("unknown attribute {attribute}")));
        }
        self.values.retain(|&(attr, _), _| attr != attribute);
        for keys in self.primary_keys.values_mut() {
            keys.retain(|&k| k != attribute);
        }
        self.primary_keys.retain(|_, keys| !keys.is_empty());
        Ok(())
    }

    fn update_attribute_name(&mut self, attribute: i32, name: &str) -> Result<()> {
        match self.attributes.get_mut(&attribute) {
            Some(a) => {
                a.spec.label = name.to_owned();
                Ok(())
            }
            None => Err(reject(format!("unknown attribute {attribute}"))),
        }
    }

    fn update_attribute_description(&mut self, attribute: i32, description: &str) -> Result<()> {
        match self.attributes.get_mut(&attribute) {
            Some(a) => {
                a.spec.description = description.to_owned();
                Ok(())
            }
            None => Err(reject(format!("unknown attribute {attribute}"))),
        }
    }

    fn update_attribute_default_value(
        &mut self,
        attribute: i32,
        value: Option<Arc<ObjectValue>>,
    ) -> Result<()> {
        match self.attributes.get_mut(&attribute) {
            Some(a) => {
                a.spec.default_value = value.map(|v| Box::new((*v).clone()));
                Ok(())
            }
            None => Err(reject(format!("unknown attribute {attribute}"))),
        }
    }

    fn set_byte_value(&mut self, attribute: i32, id: i32, value: i8) -> Result<()> {
        self.store(attribute, id, (value != 0).then_some(Stored::Byte(value)))
    }

    fn set_short_value(&mut self, attribute: i32, id: i32, value: i16) -> Result<()> {
        self.store(attribute, id, (value != 0).then_some(Stored::Short(value)))
    }

    fn set_int_value(&mut self, attribute: i32, id: i32, value: i32) -> Result<()> {
        self.store(attribute, id, (value != 0).then_some(Stored::Int(value)))
    }

    fn set_long_value(&mut self, attribute: i32, id: i32, value: i64) -> Result<()> {
        self.store(attribute, id, (value != 0).then_some(Stored::Long(value)))
    }

    fn set_float_value(&mut self, attribute: i32, id: i32, value: f32) -> Result<()> {
        let bits = value.to_bits();
        self.store(attribute, id, (bits != 0).then_some(Stored::Float(bits)))
    }

    fn set_double_value(&mut self, attribute: i32, id: i32, value: f64) -> Result<()> {
        let bits = value.to_bits();
        self.store(attribute, id, (bits != 0).then_some(Stored::Double(bits)))
    }

    fn set_boolean_value(&mut self, attribute: i32, id: i32, value: bool) -> Result<()> {
        self.store(attribute, id, value.then_some(Stored::Bool(true)))
    }

    fn set_object_value(
        &mut self,
        attribute: i32,
        id: i32,
        value: Option<Arc<ObjectValue>>,
    ) -> Result<()> {
        self.store(attribute, id, value.map(Stored::Object))
    }

    fn set_attribute_index_type(&mut self, attribute: i32, index_type: IndexType) -> Result<()> {
        match self.attributes.get_mut(&attribute) {
            Some(a) => {
                a.index_type = index_type;
                Ok(())
            }
            None => Err(reject(format!("unknown attribute {attribute}"))),
        }
    }

    fn set_primary_key(&mut self, element_type: ElementType, keys: &[i32]) -> Result<()> {
        for &key in keys {
            if !self.attributes.contains_key(&key) {
                return Err(reject(format!("primary key names unknown attribute {key}")));
            }
        }
        if keys.is_empty() {
            self.primary_keys.remove(&element_type);
        } else {
            self.primary_keys.insert(element_type, keys.to_vec());
        }
        Ok(())
    }
}
