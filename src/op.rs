//! The operation kind registry: encoding layout and four-way dispatch.
//!
//! Every recorded primitive mutation is one occurrence of an [`EditKind`].
//! An operation-code entry is a `u16` packing the kind (low 5 bits), a
//! repeat count (2 bits, runs of up to 4 collapse into one entry) and
//! two-bit delta codes for the attribute/element-id operands from bit 7
//! upward. Value operands are stored as (old, new) pairs in the stack
//! matching their width; attribute and element ids are delta-coded against
//! the decode cursor so unchanged ids cost nothing.

use std::sync::Arc;

use crate::cursor::DecodeState;
use crate::error::{JournalError, Result};
use crate::journal::EditJournal;
use crate::target::MutationTarget;
use crate::value::{AttributeSpec, ElementType, GraphOperation, IndexType};

/// Low bits of an entry holding the kind.
pub(crate) const KIND_MASK: u16 = 0x1F;
/// Bit offset of the repeat count.
pub(crate) const REPEAT_SHIFT: u16 = 5;
/// Repeat count mask; a saturated run holds `REPEAT_MASK + 1` occurrences.
pub(crate) const REPEAT_MASK: u16 = 0x3;
/// Bit offset of the first operand delta code.
pub(crate) const OPERAND_SHIFT: u16 = 7;

/// Delta code: operand equals the cursor, no stack data.
pub(crate) const CODE_SAME: u16 = 0;
/// Delta code: signed 8-bit delta in the byte stack.
pub(crate) const CODE_BYTE: u16 = 1;
/// Delta code: signed 16-bit delta in the short stack.
pub(crate) const CODE_SHORT: u16 = 2;
/// Delta code: full 32-bit delta in the int stack.
pub(crate) const CODE_INT: u16 = 3;

/// Occurrences represented by `entry` (1..=4).
pub(crate) fn run_count(entry: u16) -> usize {
    (((entry >> REPEAT_SHIFT) & REPEAT_MASK) + 1) as usize
}

fn slot(entry: u16, index: u16) -> u16 {
    (entry >> (OPERAND_SHIFT + 2 * index)) & 0x3
}

/// Per-occurrence stack consumption of one entry, used to validate snapshots
/// before replaying them.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct StackUse {
    pub bytes: usize,
    pub shorts: usize,
    pub ints: usize,
    pub longs: usize,
}

/// The closed set of primitive mutation kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum EditKind {
    SetPrimaryKey = 0,
    AddVertex = 1,
    RemoveVertex = 2,
    AddDirectedTransaction = 3,
    AddUndirectedTransaction = 4,
    RemoveDirectedTransaction = 5,
    RemoveUndirectedTransaction = 6,
    SetTransactionSourceVertex = 7,
    SetTransactionDestinationVertex = 8,
    AddAttribute = 9,
    RemoveAttribute = 10,
    UpdateAttributeName = 11,
    UpdateAttributeDescription = 12,
    UpdateAttributeDefaultValue = 13,
    SetByteValue = 14,
    SetShortValue = 15,
    SetIntValue = 16,
    SetLongValue = 17,
    SetFloatValue = 18,
    SetDoubleValue = 19,
    SetBooleanValueTrue = 20,
    SetBooleanValueFalse = 21,
    SetObjectValue = 22,
    SetAttributeIndexType = 23,
    ExecuteOperation = 24,
}

impl EditKind {
    /// Decodes a kind from its raw value.
    pub(crate) fn from_raw(raw: u8) -> Option<Self> {
        use EditKind::*;
        Some(match raw {
            0 => SetPrimaryKey,
            1 => AddVertex,
            2 => RemoveVertex,
            3 => AddDirectedTransaction,
            4 => AddUndirectedTransaction,
            5 => RemoveDirectedTransaction,
            6 => RemoveUndirectedTransaction,
            7 => SetTransactionSourceVertex,
            8 => SetTransactionDestinationVertex,
            9 => AddAttribute,
            10 => RemoveAttribute,
            11 => UpdateAttributeName,
            12 => UpdateAttributeDescription,
            13 => UpdateAttributeDefaultValue,
            14 => SetByteValue,
            15 => SetShortValue,
            16 => SetIntValue,
            17 => SetLongValue,
            18 => SetFloatValue,
            19 => SetDoubleValue,
            20 => SetBooleanValueTrue,
            21 => SetBooleanValueFalse,
            22 => SetObjectValue,
            23 => SetAttributeIndexType,
            24 => ExecuteOperation,
            _ => return None,
        })
    }

    /// Extracts the kind from an entry. Entries are produced by this crate
    /// and validated on deserialization, so an unknown kind is fatal.
    pub(crate) fn from_entry(entry: u16) -> Self {
        match Self::from_raw((entry & KIND_MASK) as u8) {
            Some(kind) => kind,
            None => panic!("corrupt operation kind {}", entry & KIND_MASK),
        }
    }

    /// Number of delta-coded operand slots this kind carries.
    fn slot_count(self) -> u16 {
        use EditKind::*;
        match self {
            ExecuteOperation => 0,
            SetByteValue | SetShortValue | SetIntValue | SetLongValue | SetFloatValue
            | SetDoubleValue | SetBooleanValueTrue | SetBooleanValueFalse | SetObjectValue => 2,
            _ => 1,
        }
    }

    /// Fixed per-occurrence payload, excluding delta-coded slots.
    fn payload_use(self) -> StackUse {
        use EditKind::*;
        let mut u = StackUse::default();
        match self {
            SetPrimaryKey | AddDirectedTransaction | AddUndirectedTransaction
            | RemoveDirectedTransaction | RemoveUndirectedTransaction
            | SetTransactionSourceVertex | SetTransactionDestinationVertex
            | UpdateAttributeName | UpdateAttributeDescription | UpdateAttributeDefaultValue
            | SetIntValue | SetObjectValue => u.ints = 2,
            AddAttribute | RemoveAttribute | ExecuteOperation => u.ints = 1,
            SetByteValue | SetAttributeIndexType => u.bytes = 2,
            SetShortValue => u.shorts = 2,
            SetLongValue | SetFloatValue | SetDoubleValue => u.longs = 2,
            AddVertex | RemoveVertex | SetBooleanValueTrue | SetBooleanValueFalse => {}
        }
        u
    }

    /// Total per-occurrence stack consumption for `entry`.
    pub(crate) fn operand_use(self, entry: u16) -> StackUse {
        let mut u = self.payload_use();
        for i in 0..self.slot_count() {
            match slot(entry, i) {
                CODE_BYTE => u.bytes += 1,
                CODE_SHORT => u.shorts += 1,
                CODE_INT => u.ints += 1,
                _ => {}
            }
        }
        u
    }

    /// Reads this occurrence's operands front-to-back, advancing the read
    /// pointers and updating the cursor.
    pub(crate) fn decode_forward(self, j: &EditJournal, entry: u16, s: &mut DecodeState) {
        use EditKind::*;
        match self {
            SetPrimaryKey => {
                s.attribute = s.attribute.wrapping_add(delta_forward(j, s, slot(entry, 0)));
                object_pair_forward(j, s);
            }
            AddVertex | RemoveVertex => {
                s.id = s.id.wrapping_add(delta_forward(j, s, slot(entry, 0)));
            }
            AddDirectedTransaction | AddUndirectedTransaction | RemoveDirectedTransaction
            | RemoveUndirectedTransaction | SetTransactionSourceVertex
            | SetTransactionDestinationVertex => {
                s.id = s.id.wrapping_add(delta_forward(j, s, slot(entry, 0)));
                int_pair_forward(j, s);
            }
            AddAttribute | RemoveAttribute => {
                s.attribute = s.attribute.wrapping_add(delta_forward(j, s, slot(entry, 0)));
                object_single_forward(j, s);
            }
            UpdateAttributeName | UpdateAttributeDescription | UpdateAttributeDefaultValue => {
                s.attribute = s.attribute.wrapping_add(delta_forward(j, s, slot(entry, 0)));
                object_pair_forward(j, s);
            }
            SetByteValue => {
                attr_id_forward(j, entry, s);
                let (old, new) = (j.bytes.get(s.byte_ptr), j.bytes.get(s.byte_ptr + 1));
                s.byte_ptr += 2;
                s.int_pair = (old as i32, new as i32);
            }
            SetShortValue => {
                attr_id_forward(j, entry, s);
                let (old, new) = (j.shorts.get(s.short_ptr), j.shorts.get(s.short_ptr + 1));
                s.short_ptr += 2;
                s.int_pair = (old as i32, new as i32);
            }
            SetIntValue => {
                attr_id_forward(j, entry, s);
                int_pair_forward(j, s);
            }
            SetLongValue => {
                attr_id_forward(j, entry, s);
                s.long_pair = (j.longs.get(s.long_ptr), j.longs.get(s.long_ptr + 1));
                s.long_ptr += 2;
            }
            SetFloatValue => {
                attr_id_forward(j, entry, s);
                let (old, new) = (j.longs.get(s.long_ptr), j.longs.get(s.long_ptr + 1));
                s.long_ptr += 2;
                s.float_pair = (old as u32, new as u32);
            }
            SetDoubleValue => {
                attr_id_forward(j, entry, s);
                let (old, new) = (j.longs.get(s.long_ptr), j.longs.get(s.long_ptr + 1));
                s.long_ptr += 2;
                s.double_pair = (old as u64, new as u64);
            }
            SetBooleanValueTrue | SetBooleanValueFalse => {
                attr_id_forward(j, entry, s);
            }
            SetObjectValue => {
                attr_id_forward(j, entry, s);
                object_pair_forward(j, s);
            }
            SetAttributeIndexType => {
                s.attribute = s.attribute.wrapping_add(delta_forward(j, s, slot(entry, 0)));
                let (old, new) = (j.bytes.get(s.byte_ptr), j.bytes.get(s.byte_ptr + 1));
                s.byte_ptr += 2;
                s.int_pair = (old as i32, new as i32);
            }
            ExecuteOperation => {
                object_single_forward(j, s);
            }
        }
    }

    /// Applies the mutation using the now-current cursor.
    pub(crate) fn apply_forward(
        self,
        j: &EditJournal,
        s: &DecodeState,
        g: &mut dyn MutationTarget,
    ) -> Result<()> {
        use EditKind::*;
        match self {
            SetPrimaryKey => {
                let keys = int_list(j, s.object_pair.1)?;
                g.set_primary_key(element_type(s.attribute)?, keys)
            }
            AddVertex => g.add_vertex(s.id),
            RemoveVertex => g.remove_vertex(s.id),
            AddDirectedTransaction => g.add_transaction(s.int_pair.0, s.int_pair.1, true, s.id),
            AddUndirectedTransaction => g.add_transaction(s.int_pair.0, s.int_pair.1, false, s.id),
            RemoveDirectedTransaction | RemoveUndirectedTransaction => {
                g.remove_transaction(s.id)
            }
            SetTransactionSourceVertex => g.set_transaction_source_vertex(s.id, s.int_pair.1),
            SetTransactionDestinationVertex => {
                g.set_transaction_destination_vertex(s.id, s.int_pair.1)
            }
            AddAttribute => g.add_attribute(attribute_spec(j, s.object_pair.1)?, s.attribute),
            RemoveAttribute => g.remove_attribute(s.attribute),
            UpdateAttributeName => g.update_attribute_name(s.attribute, text(j, s.object_pair.1)?),
            UpdateAttributeDescription => {
                g.update_attribute_description(s.attribute, text(j, s.object_pair.1)?)
            }
            UpdateAttributeDefaultValue => {
                g.update_attribute_default_value(s.attribute, j.object_arc(s.object_pair.1)?)
            }
            SetByteValue => g.set_byte_value(s.attribute, s.id, s.int_pair.1 as i8),
            SetShortValue => g.set_short_value(s.attribute, s.id, s.int_pair.1 as i16),
            SetIntValue => g.set_int_value(s.attribute, s.id, s.int_pair.1),
            SetLongValue => g.set_long_value(s.attribute, s.id, s.long_pair.1),
            SetFloatValue => g.set_float_value(s.attribute, s.id, f32::from_bits(s.float_pair.1)),
            SetDoubleValue => {
                g.set_double_value(s.attribute, s.id, f64::from_bits(s.double_pair.1))
            }
            SetBooleanValueTrue => g.set_boolean_value(s.attribute, s.id, true),
            SetBooleanValueFalse => g.set_boolean_value(s.attribute, s.id, false),
            SetObjectValue => g.set_object_value(s.attribute, s.id, j.object_arc(s.object_pair.1)?),
            SetAttributeIndexType => {
                g.set_attribute_index_type(s.attribute, index_type(s.int_pair.1)?)
            }
            ExecuteOperation => operation(j, s.object_pair.1)?.execute(g),
        }
    }

    /// Applies the inverse mutation. The attribute/id cursors already hold
    /// this occurrence's values; old operand values are peeked from just
    /// below the read pointers, which `decode_backward` then rewinds past.
    pub(crate) fn apply_backward(
        self,
        j: &EditJournal,
        s: &DecodeState,
        g: &mut dyn MutationTarget,
    ) -> Result<()> {
        use EditKind::*;
        match self {
            SetPrimaryKey => {
                let old = j.ints.get(s.int_ptr - 2) as u32;
                g.set_primary_key(element_type(s.attribute)?, int_list(j, old)?)
            }
            AddVertex => g.remove_vertex(s.id),
            RemoveVertex => g.add_vertex(s.id),
            AddDirectedTransaction | AddUndirectedTransaction => g.remove_transaction(s.id),
            RemoveDirectedTransaction => {
                let (src, dst) = peek_int_pair(j, s);
                g.add_transaction(src, dst, true, s.id)
            }
            RemoveUndirectedTransaction => {
                let (src, dst) = peek_int_pair(j, s);
                g.add_transaction(src, dst, false, s.id)
            }
            SetTransactionSourceVertex => {
                g.set_transaction_source_vertex(s.id, j.ints.get(s.int_ptr - 2))
            }
            SetTransactionDestinationVertex => {
                g.set_transaction_destination_vertex(s.id, j.ints.get(s.int_ptr - 2))
            }
            AddAttribute => g.remove_attribute(s.attribute),
            RemoveAttribute => {
                let params = j.ints.get(s.int_ptr - 1) as u32;
                g.add_attribute(attribute_spec(j, params)?, s.attribute)
            }
            UpdateAttributeName => {
                let old = j.ints.get(s.int_ptr - 2) as u32;
                g.update_attribute_name(s.attribute, text(j, old)?)
            }
            UpdateAttributeDescription => {
                let old = j.ints.get(s.int_ptr - 2) as u32;
                g.update_attribute_description(s.attribute, text(j, old)?)
            }
            UpdateAttributeDefaultValue => {
                let old = j.ints.get(s.int_ptr - 2) as u32;
                g.update_attribute_default_value(s.attribute, j.object_arc(old)?)
            }
            SetByteValue => g.set_byte_value(s.attribute, s.id, j.bytes.get(s.byte_ptr - 2)),
            SetShortValue => g.set_short_value(s.attribute, s.id, j.shorts.get(s.short_ptr - 2)),
            SetIntValue => g.set_int_value(s.attribute, s.id, j.ints.get(s.int_ptr - 2)),
            SetLongValue => g.set_long_value(s.attribute, s.id, j.longs.get(s.long_ptr - 2)),
            SetFloatValue => {
                let old = j.longs.get(s.long_ptr - 2) as u32;
                g.set_float_value(s.attribute, s.id, f32::from_bits(old))
            }
            SetDoubleValue => {
                let old = j.longs.get(s.long_ptr - 2) as u64;
                g.set_double_value(s.attribute, s.id, f64::from_bits(old))
            }
            SetBooleanValueTrue => g.set_boolean_value(s.attribute, s.id, false),
            SetBooleanValueFalse => g.set_boolean_value(s.attribute, s.id, true),
            SetObjectValue => {
                let old = j.ints.get(s.int_ptr - 2) as u32;
                g.set_object_value(s.attribute, s.id, j.object_arc(old)?)
            }
            SetAttributeIndexType => {
                let old = j.bytes.get(s.byte_ptr - 2);
                g.set_attribute_index_type(s.attribute, index_type(old as i32)?)
            }
            ExecuteOperation => {
                let idx = j.ints.get(s.int_ptr - 1) as u32;
                operation(j, idx)?.undo(g)
            }
        }
    }

    /// Rewinds this occurrence's operands back-to-front, restoring the
    /// attribute/id cursors to their pre-occurrence values.
    pub(crate) fn decode_backward(self, j: &EditJournal, entry: u16, s: &mut DecodeState) {
        use EditKind::*;
        match self {
            SetPrimaryKey => {
                object_pair_rewind(j, s);
                s.attribute = s.attribute.wrapping_sub(delta_backward(j, s, slot(entry, 0)));
            }
            AddVertex | RemoveVertex => {
                s.id = s.id.wrapping_sub(delta_backward(j, s, slot(entry, 0)));
            }
            AddDirectedTransaction | AddUndirectedTransaction | RemoveDirectedTransaction
            | RemoveUndirectedTransaction | SetTransactionSourceVertex
            | SetTransactionDestinationVertex => {
                int_pair_rewind(j, s);
                s.id = s.id.wrapping_sub(delta_backward(j, s, slot(entry, 0)));
            }
            AddAttribute | RemoveAttribute => {
                object_single_rewind(j, s);
                s.attribute = s.attribute.wrapping_sub(delta_backward(j, s, slot(entry, 0)));
            }
            UpdateAttributeName | UpdateAttributeDescription | UpdateAttributeDefaultValue => {
                object_pair_rewind(j, s);
                s.attribute = s.attribute.wrapping_sub(delta_backward(j, s, slot(entry, 0)));
            }
            SetByteValue => {
                s.byte_ptr -= 2;
                s.int_pair = (
                    j.bytes.get(s.byte_ptr) as i32,
                    j.bytes.get(s.byte_ptr + 1) as i32,
                );
                attr_id_backward(j, entry, s);
            }
            SetShortValue => {
                s.short_ptr -= 2;
                s.int_pair = (
                    j.shorts.get(s.short_ptr) as i32,
                    j.shorts.get(s.short_ptr + 1) as i32,
                );
                attr_id_backward(j, entry, s);
            }
            SetIntValue => {
                int_pair_rewind(j, s);
                attr_id_backward(j, entry, s);
            }
            SetLongValue => {
                s.long_ptr -= 2;
                s.long_pair = (j.longs.get(s.long_ptr), j.longs.get(s.long_ptr + 1));
                attr_id_backward(j, entry, s);
            }
            SetFloatValue => {
                s.long_ptr -= 2;
                s.float_pair = (
                    j.longs.get(s.long_ptr) as u32,
                    j.longs.get(s.long_ptr + 1) as u32,
                );
                attr_id_backward(j, entry, s);
            }
            SetDoubleValue => {
                s.long_ptr -= 2;
                s.double_pair = (
                    j.longs.get(s.long_ptr) as u64,
                    j.longs.get(s.long_ptr + 1) as u64,
                );
                attr_id_backward(j, entry, s);
            }
            SetBooleanValueTrue | SetBooleanValueFalse => {
                attr_id_backward(j, entry, s);
            }
            SetObjectValue => {
                object_pair_rewind(j, s);
                attr_id_backward(j, entry, s);
            }
            SetAttributeIndexType => {
                s.byte_ptr -= 2;
                s.int_pair = (
                    j.bytes.get(s.byte_ptr) as i32,
                    j.bytes.get(s.byte_ptr + 1) as i32,
                );
                s.attribute = s.attribute.wrapping_sub(delta_backward(j, s, slot(entry, 0)));
            }
            ExecuteOperation => {
                object_single_rewind(j, s);
            }
        }
    }
}

fn attr_id_forward(j: &EditJournal, entry: u16, s: &mut DecodeState) {
    s.attribute = s.attribute.wrapping_add(delta_forward(j, s, slot(entry, 0)));
    s.id = s.id.wrapping_add(delta_forward(j, s, slot(entry, 1)));
}

fn attr_id_backward(j: &EditJournal, entry: u16, s: &mut DecodeState) {
    s.id = s.id.wrapping_sub(delta_backward(j, s, slot(entry, 1)));
    s.attribute = s.attribute.wrapping_sub(delta_backward(j, s, slot(entry, 0)));
}

fn delta_forward(j: &EditJournal, s: &mut DecodeState, code: u16) -> i32 {
    match code {
        CODE_SAME => 0,
        CODE_BYTE => {
            let v = j.bytes.get(s.byte_ptr) as i32;
            s.byte_ptr += 1;
            v
        }
        CODE_SHORT => {
            let v = j.shorts.get(s.short_ptr) as i32;
            s.short_ptr += 1;
            v
        }
        _ => {
            let v = j.ints.get(s.int_ptr);
            s.int_ptr += 1;
            v
        }
    }
}

fn delta_backward(j: &EditJournal, s: &mut DecodeState, code: u16) -> i32 {
    match code {
        CODE_SAME => 0,
        CODE_BYTE => {
            s.byte_ptr -= 1;
            j.bytes.get(s.byte_ptr) as i32
        }
        CODE_SHORT => {
            s.short_ptr -= 1;
            j.shorts.get(s.short_ptr) as i32
        }
        _ => {
            s.int_ptr -= 1;
            j.ints.get(s.int_ptr)
        }
    }
}

fn int_pair_forward(j: &EditJournal, s: &mut DecodeState) {
    s.int_pair = (j.ints.get(s.int_ptr), j.ints.get(s.int_ptr + 1));
    s.int_ptr += 2;
}

fn int_pair_rewind(j: &EditJournal, s: &mut DecodeState) {
    s.int_ptr -= 2;
    s.int_pair = (j.ints.get(s.int_ptr), j.ints.get(s.int_ptr + 1));
}

fn peek_int_pair(j: &EditJournal, s: &DecodeState) -> (i32, i32) {
    (j.ints.get(s.int_ptr - 2), j.ints.get(s.int_ptr - 1))
}

fn object_pair_forward(j: &EditJournal, s: &mut DecodeState) {
    s.object_pair = (
        j.ints.get(s.int_ptr) as u32,
        j.ints.get(s.int_ptr + 1) as u32,
    );
    s.int_ptr += 2;
}

fn object_pair_rewind(j: &EditJournal, s: &mut DecodeState) {
    s.int_ptr -= 2;
    s.object_pair = (
        j.ints.get(s.int_ptr) as u32,
        j.ints.get(s.int_ptr + 1) as u32,
    );
}

fn object_single_forward(j: &EditJournal, s: &mut DecodeState) {
    let index = j.ints.get(s.int_ptr) as u32;
    s.int_ptr += 1;
    s.object_pair = (index, index);
}

fn object_single_rewind(j: &EditJournal, s: &mut DecodeState) {
    s.int_ptr -= 1;
    let index = j.ints.get(s.int_ptr) as u32;
    s.object_pair = (index, index);
}

fn element_type(raw: i32) -> Result<ElementType> {
    u8::try_from(raw)
        .ok()
        .and_then(ElementType::from_raw)
        .ok_or(JournalError::Corruption("element type ordinal out of range"))
}

fn index_type(raw: i32) -> Result<IndexType> {
    u8::try_from(raw)
        .ok()
        .and_then(IndexType::from_raw)
        .ok_or(JournalError::Corruption("index type ordinal out of range"))
}

fn text(j: &EditJournal, index: u32) -> Result<&str> {
    match j.object(index)? {
        Some(crate::value::ObjectValue::Text(s)) => Ok(s),
        _ => Err(JournalError::Corruption("expected text operand")),
    }
}

fn int_list(j: &EditJournal, index: u32) -> Result<&[i32]> {
    match j.object(index)? {
        Some(crate::value::ObjectValue::IntList(v)) => Ok(v),
        _ => Err(JournalError::Corruption("expected id list operand")),
    }
}

fn attribute_spec(j: &EditJournal, index: u32) -> Result<&AttributeSpec> {
    match j.object(index)? {
        Some(crate::value::ObjectValue::Attribute(spec)) => Ok(spec),
        _ => Err(JournalError::Corruption("expected attribute spec operand")),
    }
}

fn operation(j: &EditJournal, index: u32) -> Result<&Arc<dyn GraphOperation>> {
    match j.object(index)? {
        Some(crate::value::ObjectValue::Operation(op)) => Ok(op),
        _ => Err(JournalError::Corruption("expected operation operand")),
    }
}
