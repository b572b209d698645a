//! The decode cursor set threaded through forward and backward replay.
//!
//! All replay state lives here and is passed by mutable reference into each
//! operation kind's advance/apply functions; the journal itself stays
//! immutable during replay.

/// Per-stack read pointers plus the "current value" cursor fields.
///
/// Forward replay starts from `Default` (pointers and cursors zeroed);
/// backward replay starts from the snapshot taken at `finish()`, whose
/// pointers sit at the stack ends. Attribute and element id are delta-coded
/// and return exactly to zero after a full backward pass; the operand pairs
/// hold the most recently decoded (old, new) values in the direction of
/// travel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct DecodeState {
    /// Next unread index in the byte stack.
    pub byte_ptr: usize,
    /// Next unread index in the short stack.
    pub short_ptr: usize,
    /// Next unread index in the int stack.
    pub int_ptr: usize,
    /// Next unread index in the long stack.
    pub long_ptr: usize,

    /// Current attribute id (also carries the element-type ordinal for
    /// set-primary-key, as in the original encoding).
    pub attribute: i32,
    /// Current element id (vertex or transaction).
    pub id: i32,
    /// Current (old, new) int-width operand pair; transaction kinds reuse it
    /// as (source, destination).
    pub int_pair: (i32, i32),
    /// Current (old, new) 64-bit operand pair.
    pub long_pair: (i64, i64),
    /// Current (old, new) 32-bit float bit patterns.
    pub float_pair: (u32, u32),
    /// Current (old, new) 64-bit float bit patterns.
    pub double_pair: (u64, u64),
    /// Current (old, new) encoded object indices (0 = null).
    pub object_pair: (u32, u32),
}
