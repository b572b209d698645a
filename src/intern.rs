//! Object interning: build-time deduplication of object operands.
//!
//! Exists only while the journal is recording; `finish()` drops it, after
//! which any interning attempt is a fatal contract violation.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::stack::AppendStack;
use crate::value::ObjectValue;

/// Encoded index meaning "no value". The object stack holds no nulls;
/// non-null values encode as `stack index + 1`.
pub(crate) const NULL_OBJECT: u32 = 0;

/// Transient equality map from object value to its encoded stack index.
#[derive(Debug, Default)]
pub(crate) struct Interner {
    map: FxHashMap<Arc<ObjectValue>, u32>,
}

impl Interner {
    /// Returns the encoded index of `value`, appending to `stack` only when
    /// an equal value has not been seen before.
    pub(crate) fn intern(
        &mut self,
        stack: &mut AppendStack<Arc<ObjectValue>>,
        value: Option<Arc<ObjectValue>>,
    ) -> u32 {
        let Some(value) = value else {
            return NULL_OBJECT;
        };
        if let Some(&index) = self.map.get(&value) {
            return index;
        }
        let index = stack.push(Arc::clone(&value)) as u32 + 1;
        self.map.insert(value, index);
        index
    }
}
