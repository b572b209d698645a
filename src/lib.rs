//! An undo/redo edit journal for in-memory attributed graphs.
//!
//! A [`EditJournal`] records every primitive mutation made to a graph during
//! one logical edit, compressed into run-length-collapsed operation codes
//! over a handful of typed stacks. Once frozen with
//! [`finish`](EditJournal::finish), the same journal replays the whole edit
//! forward ([`execute`](EditJournal::execute)) or exactly backward
//! ([`undo`](EditJournal::undo)) against any [`MutationTarget`], and can be
//! written to and read back from a checksummed binary snapshot.
//!
//! The journal never holds a reference to the graph it was recorded against
//! and never interprets attribute semantics; callers apply mutations to
//! their own graph and mirror each one into the journal.
//!
//! ```
//! use retrace::{EditJournal, MemoryGraph};
//!
//! // the caller mutates its graph and records each primitive as it goes
//! let mut journal = EditJournal::new();
//! journal.add_vertex(0);
//! journal.add_vertex(1);
//! journal.add_transaction(0, 1, true, 0);
//! journal.finish();
//!
//! let mut graph = MemoryGraph::default();
//! journal.execute(&mut graph)?;
//! assert_eq!(graph.transaction(0), Some((0, 1, true)));
//!
//! journal.undo(&mut graph)?;
//! assert_eq!(graph, MemoryGraph::default());
//! # Ok::<(), retrace::JournalError>(())
//! ```

#![forbid(unsafe_code)]

mod codec;
mod cursor;
mod error;
mod intern;
mod journal;
mod op;
mod stack;
mod target;
mod testkit;
mod value;

pub use codec::{FORMAT_VERSION, MAGIC};
pub use error::{JournalError, Result};
pub use journal::{EditJournal, JournalStats};
pub use target::MutationTarget;
pub use testkit::MemoryGraph;
pub use value::{AttributeSpec, ElementType, GraphOperation, IndexType, ObjectValue};
