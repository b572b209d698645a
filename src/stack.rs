//! Typed append stacks: the journal's backing storage.
//!
//! One stack exists per operand width (`i8`, `i16`, `i32`, `i64`), one for
//! the `u16` operation-code entries, and one for interned object references.
//! Appends are O(1) amortized (capacity doubles on overflow); `trim` is
//! called exactly once when the journal freezes.

/// Growable homogeneous array with indexed reads and a one-shot trim.
#[derive(Debug, Clone, Default)]
pub struct AppendStack<T> {
    buf: Vec<T>,
}

impl<T> AppendStack<T> {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Appends a value, returning its index.
    pub fn push(&mut self, value: T) -> usize {
        let index = self.buf.len();
        self.buf.push(value);
        index
    }

    /// Number of appended elements.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Shrinks the backing array to exactly `len`. Called once at freeze.
    pub fn trim(&mut self) {
        self.buf.shrink_to_fit();
    }

    /// All appended elements in append order.
    pub fn as_slice(&self) -> &[T] {
        &self.buf
    }

    /// Mutable view of the most recently appended element, if any.
    pub fn last_mut(&mut self) -> Option<&mut T> {
        self.buf.last_mut()
    }
}

impl<T: Copy> AppendStack<T> {
    /// Reads the element at `index`. Panics past `len`; replay pointers stay
    /// in bounds by construction and snapshots are validated on read.
    pub fn get(&self, index: usize) -> T {
        self.buf[index]
    }
}
