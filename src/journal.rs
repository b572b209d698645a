//! The edit journal: recorder while open, replayer once frozen.
//!
//! A journal is built by calling one recording method per primitive mutation
//! as the caller applies it to its own graph. Recording touches internal
//! stacks only. `finish` freezes the journal; after that it replays forward
//! (`execute`) or backward (`undo`) against any [`MutationTarget`], any
//! number of times.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::cursor::DecodeState;
use crate::error::Result;
use crate::intern::{Interner, NULL_OBJECT};
use crate::op::{
    run_count, EditKind, CODE_BYTE, CODE_INT, CODE_SAME, CODE_SHORT, OPERAND_SHIFT, REPEAT_MASK,
    REPEAT_SHIFT,
};
use crate::stack::AppendStack;
use crate::target::MutationTarget;
use crate::value::{AttributeSpec, ElementType, GraphOperation, IndexType, ObjectValue};

/// Recording-only state, dropped when the journal freezes.
#[derive(Debug, Default)]
struct Recording {
    interner: Interner,
    attribute: i32,
    id: i32,
}

/// Size and shape summary of a frozen journal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct JournalStats {
    /// Stored operation-code entries (after run-length collapse).
    pub entries: usize,
    /// Primitive mutations represented, counting repeats.
    pub occurrences: usize,
    /// Byte stack length.
    pub bytes: usize,
    /// Short stack length.
    pub shorts: usize,
    /// Int stack length.
    pub ints: usize,
    /// Long stack length.
    pub longs: usize,
    /// Distinct interned non-null objects.
    pub objects: usize,
    /// Approximate heap footprint of the primitive stacks, in bytes.
    pub heap_bytes: usize,
}

/// An undo/redo edit journal over an attributed graph.
///
/// ```
/// use retrace::{EditJournal, MemoryGraph};
///
/// let mut journal = EditJournal::new();
/// journal.add_vertex(0);
/// journal.add_vertex(1);
/// journal.finish();
///
/// let mut graph = MemoryGraph::default();
/// journal.execute(&mut graph)?;
/// assert_eq!(graph.vertex_count(), 2);
/// journal.undo(&mut graph)?;
/// assert_eq!(graph.vertex_count(), 0);
/// # Ok::<(), retrace::JournalError>(())
/// ```
#[derive(Debug)]
pub struct EditJournal {
    pub(crate) entries: AppendStack<u16>,
    pub(crate) bytes: AppendStack<i8>,
    pub(crate) shorts: AppendStack<i16>,
    pub(crate) ints: AppendStack<i32>,
    pub(crate) longs: AppendStack<i64>,
    pub(crate) objects: AppendStack<Arc<ObjectValue>>,
    recording: Option<Recording>,
    final_state: Option<DecodeState>,
}

impl Default for EditJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl EditJournal {
    /// Creates an empty journal in the recording state.
    pub fn new() -> Self {
        Self {
            entries: AppendStack::new(),
            bytes: AppendStack::new(),
            shorts: AppendStack::new(),
            ints: AppendStack::new(),
            longs: AppendStack::new(),
            objects: AppendStack::new(),
            recording: Some(Recording::default()),
            final_state: None,
        }
    }

    fn recording_mut(&mut self) -> &mut Recording {
        match self.recording.as_mut() {
            Some(recording) => recording,
            None => panic!("edit journal is frozen; recording is a contract violation"),
        }
    }

    /// Freezes the journal: trims the stacks, drops the interning table and
    /// snapshots the final decode cursor. Calling twice panics.
    pub fn finish(&mut self) {
        if self.recording.take().is_none() {
            panic!("edit journal already finished");
        }
        self.entries.trim();
        self.bytes.trim();
        self.shorts.trim();
        self.ints.trim();
        self.longs.trim();
        self.objects.trim();
        self.final_state = Some(self.decode_all());
        let stats = self.stats();
        debug!(
            entries = stats.entries,
            occurrences = stats.occurrences,
            bytes = stats.bytes,
            shorts = stats.shorts,
            ints = stats.ints,
            longs = stats.longs,
            objects = stats.objects,
            heap_bytes = stats.heap_bytes,
            "edit journal frozen"
        );
    }

    /// True once `finish` has been called.
    pub fn is_finished(&self) -> bool {
        self.final_state.is_some()
    }

    fn frozen_state(&self) -> &DecodeState {
        match self.final_state.as_ref() {
            Some(state) => state,
            None => panic!("edit journal is still recording; finish() it before replaying"),
        }
    }

    /// Runs a decode-only forward pass, producing the cursor state a full
    /// `execute` ends at. Also used to rebuild the snapshot after
    /// deserialization.
    pub(crate) fn decode_all(&self) -> DecodeState {
        let mut state = DecodeState::default();
        for &entry in self.entries.as_slice() {
            let kind = EditKind::from_entry(entry);
            for _ in 0..run_count(entry) {
                kind.decode_forward(self, entry, &mut state);
            }
        }
        state
    }

    pub(crate) fn restore_frozen(&mut self, state: DecodeState) {
        self.recording = None;
        self.final_state = Some(state);
    }

    /// Replays every recorded mutation forward, in recording order.
    pub fn execute(&self, target: &mut dyn MutationTarget) -> Result<()> {
        let state = self.frozen_state();
        trace!(entries = self.entries.len(), "forward replay");
        let mut s = DecodeState::default();
        for &entry in self.entries.as_slice() {
            let kind = EditKind::from_entry(entry);
            for _ in 0..run_count(entry) {
                kind.decode_forward(self, entry, &mut s);
                kind.apply_forward(self, &s, target)?;
            }
        }
        debug_assert_eq!(&s, state);
        Ok(())
    }

    /// Replays every recorded mutation backward, each inverted, in reverse
    /// recording order.
    pub fn undo(&self, target: &mut dyn MutationTarget) -> Result<()> {
        let mut s = self.frozen_state().clone();
        trace!(entries = self.entries.len(), "backward replay");
        for &entry in self.entries.as_slice().iter().rev() {
            let kind = EditKind::from_entry(entry);
            for _ in 0..run_count(entry) {
                kind.apply_backward(self, &s, target)?;
                kind.decode_backward(self, entry, &mut s);
            }
        }
        Ok(())
    }

    /// Size and shape summary.
    pub fn stats(&self) -> JournalStats {
        let occurrences = self.entries.as_slice().iter().map(|&e| run_count(e)).sum();
        JournalStats {
            entries: self.entries.len(),
            occurrences,
            bytes: self.bytes.len(),
            shorts: self.shorts.len(),
            ints: self.ints.len(),
            longs: self.longs.len(),
            objects: self.objects.len(),
            heap_bytes: self.entries.len() * 2
                + self.bytes.len()
                + self.shorts.len() * 2
                + self.ints.len() * 4
                + self.longs.len() * 8,
        }
    }

    /// Resolves an encoded object index; `0` is null.
    pub(crate) fn object(&self, index: u32) -> Result<Option<&ObjectValue>> {
        if index == NULL_OBJECT {
            return Ok(None);
        }
        match self.objects.as_slice().get(index as usize - 1) {
            Some(value) => Ok(Some(value)),
            None => Err(crate::error::JournalError::Corruption(
                "object index out of range",
            )),
        }
    }

    /// Like [`object`](Self::object) but hands out a shared handle.
    pub(crate) fn object_arc(&self, index: u32) -> Result<Option<Arc<ObjectValue>>> {
        if index == NULL_OBJECT {
            return Ok(None);
        }
        match self.objects.as_slice().get(index as usize - 1) {
            Some(value) => Ok(Some(Arc::clone(value))),
            None => Err(crate::error::JournalError::Corruption(
                "object index out of range",
            )),
        }
    }

    // --- recording internals ---

    /// Appends an entry, collapsing into the previous one when the whole
    /// `u16` matches and the run is not saturated.
    fn push_entry(&mut self, entry: u16) {
        if let Some(last) = self.entries.last_mut() {
            let repeat = (*last >> REPEAT_SHIFT) & REPEAT_MASK;
            let stripped = *last & !(REPEAT_MASK << REPEAT_SHIFT);
            if stripped == entry && repeat < REPEAT_MASK {
                *last = stripped | ((repeat + 1) << REPEAT_SHIFT);
                return;
            }
        }
        self.entries.push(entry);
    }

    /// Stores `delta` in the narrowest stack that fits, returning its code.
    fn push_delta(&mut self, delta: i32) -> u16 {
        if delta == 0 {
            CODE_SAME
        } else if let Ok(v) = i8::try_from(delta) {
            self.bytes.push(v);
            CODE_BYTE
        } else if let Ok(v) = i16::try_from(delta) {
            self.shorts.push(v);
            CODE_SHORT
        } else {
            self.ints.push(delta);
            CODE_INT
        }
    }

    fn delta_attribute(&mut self, value: i32) -> u16 {
        let recording = self.recording_mut();
        let delta = value.wrapping_sub(recording.attribute);
        recording.attribute = value;
        self.push_delta(delta) << OPERAND_SHIFT
    }

    fn delta_id(&mut self, value: i32) -> u16 {
        let recording = self.recording_mut();
        let delta = value.wrapping_sub(recording.id);
        recording.id = value;
        self.push_delta(delta) << (OPERAND_SHIFT + 2)
    }

    /// Id delta for kinds whose only slot is the element id.
    fn delta_id_slot0(&mut self, value: i32) -> u16 {
        let recording = self.recording_mut();
        let delta = value.wrapping_sub(recording.id);
        recording.id = value;
        self.push_delta(delta) << OPERAND_SHIFT
    }

    fn intern(&mut self, value: Option<Arc<ObjectValue>>) -> u32 {
        match self.recording.as_mut() {
            Some(recording) => recording.interner.intern(&mut self.objects, value),
            None => panic!("edit journal is frozen; recording is a contract violation"),
        }
    }

    fn push_object_pair(&mut self, old: Option<Arc<ObjectValue>>, new: Option<Arc<ObjectValue>>) {
        let old = self.intern(old);
        let new = self.intern(new);
        self.ints.push(old as i32);
        self.ints.push(new as i32);
    }

    // --- recording API: one method per primitive mutation ---

    /// Records replacement of the primary key attribute set for
    /// `element_type`.
    pub fn set_primary_key(
        &mut self,
        element_type: ElementType,
        old_keys: &[i32],
        new_keys: &[i32],
    ) {
        let mut entry = EditKind::SetPrimaryKey as u16;
        entry |= self.delta_attribute(element_type as i32);
        self.push_object_pair(
            Some(Arc::new(ObjectValue::IntList(old_keys.to_vec()))),
            Some(Arc::new(ObjectValue::IntList(new_keys.to_vec()))),
        );
        self.push_entry(entry);
    }

    /// Records creation of `vertex`.
    pub fn add_vertex(&mut self, vertex: i32) {
        let mut entry = EditKind::AddVertex as u16;
        entry |= self.delta_id_slot0(vertex);
        self.push_entry(entry);
    }

    /// Records deletion of `vertex`. Any attribute values the vertex carried
    /// must be recorded as separate set-value mutations beforehand, or they
    /// will not survive an undo.
    pub fn remove_vertex(&mut self, vertex: i32) {
        let mut entry = EditKind::RemoveVertex as u16;
        entry |= self.delta_id_slot0(vertex);
        self.push_entry(entry);
    }

    /// Records creation of `transaction` from `source` to `destination`.
    pub fn add_transaction(&mut self, source: i32, destination: i32, directed: bool, transaction: i32) {
        let mut entry = if directed {
            EditKind::AddDirectedTransaction as u16
        } else {
            EditKind::AddUndirectedTransaction as u16
        };
        entry |= self.delta_id_slot0(transaction);
        self.ints.push(source);
        self.ints.push(destination);
        self.push_entry(entry);
    }

    /// Records deletion of `transaction`; endpoints are kept so the deletion
    /// can be undone.
    pub fn remove_transaction(
        &mut self,
        source: i32,
        destination: i32,
        directed: bool,
        transaction: i32,
    ) {
        let mut entry = if directed {
            EditKind::RemoveDirectedTransaction as u16
        } else {
            EditKind::RemoveUndirectedTransaction as u16
        };
        entry |= self.delta_id_slot0(transaction);
        self.ints.push(source);
        self.ints.push(destination);
        self.push_entry(entry);
    }

    /// Records reattachment of the source endpoint of `transaction`.
    pub fn set_transaction_source_vertex(&mut self, transaction: i32, old: i32, new: i32) {
        let mut entry = EditKind::SetTransactionSourceVertex as u16;
        entry |= self.delta_id_slot0(transaction);
        self.ints.push(old);
        self.ints.push(new);
        self.push_entry(entry);
    }

    /// Records reattachment of the destination endpoint of `transaction`.
    pub fn set_transaction_destination_vertex(&mut self, transaction: i32, old: i32, new: i32) {
        let mut entry = EditKind::SetTransactionDestinationVertex as u16;
        entry |= self.delta_id_slot0(transaction);
        self.ints.push(old);
        self.ints.push(new);
        self.push_entry(entry);
    }

    /// Records creation of `attribute` from `spec`.
    pub fn add_attribute(&mut self, spec: &AttributeSpec, attribute: i32) {
        let mut entry = EditKind::AddAttribute as u16;
        entry |= self.delta_attribute(attribute);
        let index = self.intern(Some(Arc::new(ObjectValue::Attribute(spec.clone()))));
        self.ints.push(index as i32);
        self.push_entry(entry);
    }

    /// Records deletion of `attribute`; `spec` is kept so the deletion can be
    /// undone.
    pub fn remove_attribute(&mut self, spec: &AttributeSpec, attribute: i32) {
        let mut entry = EditKind::RemoveAttribute as u16;
        entry |= self.delta_attribute(attribute);
        let index = self.intern(Some(Arc::new(ObjectValue::Attribute(spec.clone()))));
        self.ints.push(index as i32);
        self.push_entry(entry);
    }

    /// Records a rename of `attribute`.
    pub fn update_attribute_name(&mut self, attribute: i32, old: &str, new: &str) {
        let mut entry = EditKind::UpdateAttributeName as u16;
        entry |= self.delta_attribute(attribute);
        self.push_object_pair(
            Some(Arc::new(ObjectValue::Text(old.to_owned()))),
            Some(Arc::new(ObjectValue::Text(new.to_owned()))),
        );
        self.push_entry(entry);
    }

    /// Records a description change of `attribute`.
    pub fn update_attribute_description(&mut self, attribute: i32, old: &str, new: &str) {
        let mut entry = EditKind::UpdateAttributeDescription as u16;
        entry |= self.delta_attribute(attribute);
        self.push_object_pair(
            Some(Arc::new(ObjectValue::Text(old.to_owned()))),
            Some(Arc::new(ObjectValue::Text(new.to_owned()))),
        );
        self.push_entry(entry);
    }

    /// Records a default-value change of `attribute`.
    pub fn update_attribute_default_value(
        &mut self,
        attribute: i32,
        old: Option<Arc<ObjectValue>>,
        new: Option<Arc<ObjectValue>>,
    ) {
        let mut entry = EditKind::UpdateAttributeDefaultValue as u16;
        entry |= self.delta_attribute(attribute);
        self.push_object_pair(old, new);
        self.push_entry(entry);
    }

    /// Records an 8-bit value change.
    pub fn set_byte_value(&mut self, attribute: i32, id: i32, old: i8, new: i8) {
        let mut entry = EditKind::SetByteValue as u16;
        entry |= self.delta_attribute(attribute);
        entry |= self.delta_id(id);
        self.bytes.push(old);
        self.bytes.push(new);
        self.push_entry(entry);
    }

    /// Records a 16-bit value change.
    pub fn set_short_value(&mut self, attribute: i32, id: i32, old: i16, new: i16) {
        let mut entry = EditKind::SetShortValue as u16;
        entry |= self.delta_attribute(attribute);
        entry |= self.delta_id(id);
        self.shorts.push(old);
        self.shorts.push(new);
        self.push_entry(entry);
    }

    /// Records a 32-bit value change.
    pub fn set_int_value(&mut self, attribute: i32, id: i32, old: i32, new: i32) {
        let mut entry = EditKind::SetIntValue as u16;
        entry |= self.delta_attribute(attribute);
        entry |= self.delta_id(id);
        self.ints.push(old);
        self.ints.push(new);
        self.push_entry(entry);
    }

    /// Records a 64-bit value change.
    pub fn set_long_value(&mut self, attribute: i32, id: i32, old: i64, new: i64) {
        let mut entry = EditKind::SetLongValue as u16;
        entry |= self.delta_attribute(attribute);
        entry |= self.delta_id(id);
        self.longs.push(old);
        self.longs.push(new);
        self.push_entry(entry);
    }

    /// Records a 32-bit floating value change, stored by bit pattern.
    pub fn set_float_value(&mut self, attribute: i32, id: i32, old: f32, new: f32) {
        let mut entry = EditKind::SetFloatValue as u16;
        entry |= self.delta_attribute(attribute);
        entry |= self.delta_id(id);
        self.longs.push(old.to_bits() as i64);
        self.longs.push(new.to_bits() as i64);
        self.push_entry(entry);
    }

    /// Records a 64-bit floating value change, stored by bit pattern.
    pub fn set_double_value(&mut self, attribute: i32, id: i32, old: f64, new: f64) {
        let mut entry = EditKind::SetDoubleValue as u16;
        entry |= self.delta_attribute(attribute);
        entry |= self.delta_id(id);
        self.longs.push(old.to_bits() as i64);
        self.longs.push(new.to_bits() as i64);
        self.push_entry(entry);
    }

    /// Records a boolean value change; the new value lives in the kind, so a
    /// set to `true` undoes to `false` and vice versa.
    pub fn set_boolean_value(&mut self, attribute: i32, id: i32, value: bool) {
        let mut entry = if value {
            EditKind::SetBooleanValueTrue as u16
        } else {
            EditKind::SetBooleanValueFalse as u16
        };
        entry |= self.delta_attribute(attribute);
        entry |= self.delta_id(id);
        self.push_entry(entry);
    }

    /// Records an object value change; equal values are interned once.
    pub fn set_object_value(
        &mut self,
        attribute: i32,
        id: i32,
        old: Option<Arc<ObjectValue>>,
        new: Option<Arc<ObjectValue>>,
    ) {
        let mut entry = EditKind::SetObjectValue as u16;
        entry |= self.delta_attribute(attribute);
        entry |= self.delta_id(id);
        self.push_object_pair(old, new);
        self.push_entry(entry);
    }

    /// Records an index maintenance level change of `attribute`.
    pub fn set_attribute_index_type(&mut self, attribute: i32, old: IndexType, new: IndexType) {
        let mut entry = EditKind::SetAttributeIndexType as u16;
        entry |= self.delta_attribute(attribute);
        self.bytes.push(old as i8);
        self.bytes.push(new as i8);
        self.push_entry(entry);
    }

    /// Records an opaque composite operation; replay delegates to the
    /// operation object in both directions. Snapshots of journals holding
    /// operations cannot be written.
    pub fn record_operation(&mut self, operation: Arc<dyn GraphOperation>) {
        let entry = EditKind::ExecuteOperation as u16;
        let index = self.intern(Some(Arc::new(ObjectValue::Operation(operation))));
        self.ints.push(index as i32);
        self.push_entry(entry);
    }
}

/// A frozen journal is itself a composite operation, so finished child edits
/// can be recorded into a parent journal via
/// [`record_operation`](EditJournal::record_operation).
impl GraphOperation for EditJournal {
    fn execute(&self, target: &mut dyn MutationTarget) -> Result<()> {
        EditJournal::execute(self, target)
    }

    fn undo(&self, target: &mut dyn MutationTarget) -> Result<()> {
        EditJournal::undo(self, target)
    }
}
