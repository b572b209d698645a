//! Binary snapshot codec for frozen journals.
//!
//! Layout, all big-endian: magic `b"RTRC"`, format version `u16`, then the
//! length-prefixed sections {operation codes, byte stack, short stack, int
//! stack, long stack, object stack}, then a CRC32 of everything between the
//! version and the checksum. The object section carries an inline
//! append-only variant-name table: each object is a `u32` table index, with
//! the name spelled out the first time it appears.
//!
//! Reads are validated end to end: magic, version, checksum, kind bytes, and
//! an exact match between the declared stack lengths and the operand
//! consumption of the decoded entry stream. A malformed or truncated stream
//! yields [`JournalError::Corruption`]; a partial journal is never returned.

use std::io::{Read, Write};
use std::sync::Arc;

use crate::error::{JournalError, Result};
use crate::journal::EditJournal;
use crate::op::{run_count, EditKind, StackUse, KIND_MASK};
use crate::stack::AppendStack;
use crate::value::{AttributeSpec, ElementType, ObjectValue};

/// Snapshot file magic.
pub const MAGIC: [u8; 4] = *b"RTRC";
/// Current snapshot format version.
pub const FORMAT_VERSION: u16 = 1;

const NAME_TEXT: &str = "text";
const NAME_INT: &str = "int";
const NAME_REAL: &str = "real";
const NAME_BOOL: &str = "bool";
const NAME_INT_LIST: &str = "int_list";
const NAME_ATTRIBUTE: &str = "attribute";

impl EditJournal {
    /// Writes a snapshot of this frozen journal.
    ///
    /// Fails with [`JournalError::Unsupported`] if any interned object is an
    /// opaque operation; the journal is left untouched either way.
    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        if !self.is_finished() {
            panic!("edit journal is still recording; finish() it before writing");
        }
        for object in self.objects.as_slice() {
            if matches!(**object, ObjectValue::Operation(_)) {
                return Err(JournalError::Unsupported(
                    "operation objects cannot be serialized",
                ));
            }
        }

        let mut body = Vec::new();
        put_u32(&mut body, self.entries.len() as u32);
        for &entry in self.entries.as_slice() {
            put_u16(&mut body, entry);
        }
        put_u32(&mut body, self.bytes.len() as u32);
        for &v in self.bytes.as_slice() {
            body.push(v as u8);
        }
        put_u32(&mut body, self.shorts.len() as u32);
        for &v in self.shorts.as_slice() {
            put_u16(&mut body, v as u16);
        }
        put_u32(&mut body, self.ints.len() as u32);
        for &v in self.ints.as_slice() {
            put_u32(&mut body, v as u32);
        }
        put_u32(&mut body, self.longs.len() as u32);
        for &v in self.longs.as_slice() {
            put_u64(&mut body, v as u64);
        }
        put_u32(&mut body, self.objects.len() as u32);
        let mut names = Vec::new();
        for object in self.objects.as_slice() {
            put_object(&mut body, &mut names, object)?;
        }

        writer.write_all(&MAGIC)?;
        let mut version = Vec::new();
        put_u16(&mut version, FORMAT_VERSION);
        writer.write_all(&version)?;
        writer.write_all(&body)?;
        let mut trailer = Vec::new();
        put_u32(&mut trailer, crc32fast::hash(&body));
        writer.write_all(&trailer)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads and fully validates a snapshot, returning a frozen journal.
    pub fn read<R: Read>(mut reader: R) -> Result<EditJournal> {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;
        if raw.len() < MAGIC.len() + 2 + 4 {
            return Err(JournalError::Corruption("truncated snapshot"));
        }
        if raw[..4] != MAGIC {
            return Err(JournalError::Corruption("bad magic"));
        }
        let version = u16::from_be_bytes([raw[4], raw[5]]);
        if version != FORMAT_VERSION {
            return Err(JournalError::Corruption("unsupported format version"));
        }
        let body = &raw[6..raw.len() - 4];
        let declared = u32::from_be_bytes(
            raw[raw.len() - 4..]
                .try_into()
                .map_err(|_| JournalError::Corruption("truncated snapshot"))?,
        );
        if crc32fast::hash(body) != declared {
            return Err(JournalError::Corruption("checksum mismatch"));
        }

        let mut c = SliceReader::new(body);
        let mut entries = AppendStack::new();
        for _ in 0..c.take_u32()? {
            let entry = c.take_u16()?;
            if EditKind::from_raw((entry & KIND_MASK) as u8).is_none() {
                return Err(JournalError::Corruption("unknown operation kind"));
            }
            entries.push(entry);
        }
        let mut bytes = AppendStack::new();
        for _ in 0..c.take_u32()? {
            bytes.push(c.take_u8()? as i8);
        }
        let mut shorts = AppendStack::new();
        for _ in 0..c.take_u32()? {
            shorts.push(c.take_u16()? as i16);
        }
        let mut ints = AppendStack::new();
        for _ in 0..c.take_u32()? {
            ints.push(c.take_u32()? as i32);
        }
        let mut longs = AppendStack::new();
        for _ in 0..c.take_u32()? {
            longs.push(c.take_u64()? as i64);
        }
        let mut objects = AppendStack::new();
        let object_count = c.take_u32()?;
        let mut names: Vec<String> = Vec::new();
        for _ in 0..object_count {
            objects.push(Arc::new(take_object(&mut c, &mut names)?));
        }
        if !c.is_empty() {
            return Err(JournalError::Corruption("trailing bytes after object stack"));
        }

        // declared stack lengths must exactly match what the entry stream
        // will consume
        let mut used = StackUse::default();
        for &entry in entries.as_slice() {
            let kind = match EditKind::from_raw((entry & KIND_MASK) as u8) {
                Some(kind) => kind,
                None => return Err(JournalError::Corruption("unknown operation kind")),
            };
            let per = kind.operand_use(entry);
            let repeats = run_count(entry);
            used.bytes += per.bytes * repeats;
            used.shorts += per.shorts * repeats;
            used.ints += per.ints * repeats;
            used.longs += per.longs * repeats;
        }
        if used.bytes != bytes.len()
            || used.shorts != shorts.len()
            || used.ints != ints.len()
            || used.longs != longs.len()
        {
            return Err(JournalError::Corruption(
                "stack lengths do not match operand usage",
            ));
        }

        let mut journal = EditJournal::new();
        journal.entries = entries;
        journal.bytes = bytes;
        journal.shorts = shorts;
        journal.ints = ints;
        journal.longs = longs;
        journal.objects = objects;
        let state = journal.decode_all();
        journal.restore_frozen(state);
        Ok(journal)
    }
}

fn put_object(out: &mut Vec<u8>, names: &mut Vec<&'static str>, value: &ObjectValue) -> Result<()> {
    let name = match value {
        ObjectValue::Text(_) => NAME_TEXT,
        ObjectValue::Int(_) => NAME_INT,
        ObjectValue::Real(_) => NAME_REAL,
        ObjectValue::Bool(_) => NAME_BOOL,
        ObjectValue::IntList(_) => NAME_INT_LIST,
        ObjectValue::Attribute(_) => NAME_ATTRIBUTE,
        ObjectValue::Operation(_) => {
            return Err(JournalError::Unsupported(
                "operation objects cannot be serialized",
            ))
        }
    };
    match names.iter().position(|&n| n == name) {
        Some(index) => put_u32(out, index as u32),
        None => {
            put_u32(out, names.len() as u32);
            names.push(name);
            put_str(out, name);
        }
    }
    match value {
        ObjectValue::Text(s) => put_str(out, s),
        ObjectValue::Int(v) => put_u64(out, *v as u64),
        ObjectValue::Real(v) => put_u64(out, v.to_bits()),
        ObjectValue::Bool(v) => out.push(*v as u8),
        ObjectValue::IntList(v) => {
            put_u32(out, v.len() as u32);
            for &id in v {
                put_u32(out, id as u32);
            }
        }
        ObjectValue::Attribute(spec) => {
            out.push(spec.element_type as u8);
            put_str(out, &spec.attribute_type);
            put_str(out, &spec.label);
            put_str(out, &spec.description);
            match &spec.default_value {
                Some(default) => {
                    out.push(1);
                    put_object(out, names, default)?;
                }
                None => out.push(0),
            }
            match &spec.merger {
                Some(merger) => {
                    out.push(1);
                    put_str(out, merger);
                }
                None => out.push(0),
            }
        }
        ObjectValue::Operation(_) => unreachable!(),
    }
    Ok(())
}

fn take_object(c: &mut SliceReader<'_>, names: &mut Vec<String>) -> Result<ObjectValue> {
    let index = c.take_u32()? as usize;
    if index == names.len() {
        names.push(c.take_str()?);
    } else if index > names.len() {
        return Err(JournalError::Corruption("object name index out of order"));
    }
    let name = names[index].clone();
    Ok(match name.as_str() {
        NAME_TEXT => ObjectValue::Text(c.take_str()?),
        NAME_INT => ObjectValue::Int(c.take_u64()? as i64),
        NAME_REAL => ObjectValue::Real(f64::from_bits(c.take_u64()?)),
        NAME_BOOL => ObjectValue::Bool(match c.take_u8()? {
            0 => false,
            1 => true,
            _ => return Err(JournalError::Corruption("bad boolean payload")),
        }),
        NAME_INT_LIST => {
            let len = c.take_u32()? as usize;
            let mut ids = Vec::with_capacity(len.min(1 << 16));
            for _ in 0..len {
                ids.push(c.take_u32()? as i32);
            }
            ObjectValue::IntList(ids)
        }
        NAME_ATTRIBUTE => {
            let element_type = ElementType::from_raw(c.take_u8()?)
                .ok_or(JournalError::Corruption("bad element type in attribute"))?;
            let attribute_type = c.take_str()?;
            let label = c.take_str()?;
            let description = c.take_str()?;
            let default_value = match c.take_u8()? {
                0 => None,
                1 => Some(Box::new(take_object(c, names)?)),
                _ => return Err(JournalError::Corruption("bad default value flag")),
            };
            let merger = match c.take_u8()? {
                0 => None,
                1 => Some(c.take_str()?),
                _ => return Err(JournalError::Corruption("bad merger flag")),
            };
            ObjectValue::Attribute(AttributeSpec {
                element_type,
                attribute_type,
                label,
                description,
                default_value,
                merger,
            })
        }
        _ => return Err(JournalError::Corruption("unknown object variant name")),
    })
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn put_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn put_str(out: &mut Vec<u8>, s: &str) {
    put_u32(out, s.len() as u32);
    out.extend_from_slice(s.as_bytes());
}

struct SliceReader<'a> {
    rest: &'a [u8],
}

impl<'a> SliceReader<'a> {
    fn new(rest: &'a [u8]) -> Self {
        Self { rest }
    }

    fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.rest.len() < n {
            return Err(JournalError::Corruption("truncated snapshot"));
        }
        let (head, tail) = self.rest.split_at(n);
        self.rest = tail;
        Ok(head)
    }

    fn take_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn take_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn take_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn take_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn take_str(&mut self) -> Result<String> {
        let len = self.take_u32()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|_| JournalError::Corruption("invalid UTF-8 in snapshot"))
    }
}
