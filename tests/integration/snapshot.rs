//! Snapshot write/read round-trips and corruption handling.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::sync::Arc;

use retrace::{
    AttributeSpec, EditJournal, ElementType, IndexType, JournalError, MemoryGraph, ObjectValue,
    Result, FORMAT_VERSION, MAGIC,
};

fn rich_journal() -> EditJournal {
    let spec = AttributeSpec {
        element_type: ElementType::Vertex,
        attribute_type: "integer".into(),
        label: "weight".into(),
        description: "edge weight".into(),
        default_value: Some(Box::new(ObjectValue::Int(1))),
        merger: Some("keep-latest".into()),
    };
    let mut journal = EditJournal::new();
    journal.add_vertex(0);
    journal.add_vertex(1);
    journal.add_transaction(0, 1, true, 0);
    journal.add_attribute(&spec, 3);
    journal.set_attribute_index_type(3, IndexType::None, IndexType::Unordered);
    journal.set_int_value(3, 0, 0, 41);
    journal.set_double_value(3, 1, 0.0, 6.5);
    journal.set_object_value(3, 1, None, Some(Arc::new(ObjectValue::Text("note".into()))));
    journal.set_primary_key(ElementType::Vertex, &[], &[3]);
    journal.finish();
    journal
}

#[test]
fn file_round_trip_replays_identically() -> Result<()> {
    let journal = rich_journal();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("edit.retrace");
    journal.write(File::create(&path)?)?;
    let restored = EditJournal::read(File::open(&path)?)?;

    let mut from_original = MemoryGraph::default();
    journal.execute(&mut from_original)?;
    let mut from_restored = MemoryGraph::default();
    restored.execute(&mut from_restored)?;
    assert_eq!(from_restored, from_original, "restored journal must replay identically");

    restored.undo(&mut from_restored)?;
    assert_eq!(from_restored, MemoryGraph::default());
    assert_eq!(restored.stats(), journal.stats());
    Ok(())
}

#[test]
fn snapshot_header_is_stable() -> Result<()> {
    let mut buf = Vec::new();
    rich_journal().write(&mut buf)?;
    assert_eq!(&buf[..4], &MAGIC);
    assert_eq!(u16::from_be_bytes([buf[4], buf[5]]), FORMAT_VERSION);
    Ok(())
}

#[test]
fn future_version_is_rejected() -> Result<()> {
    let mut buf = Vec::new();
    rich_journal().write(&mut buf)?;
    buf[5] = buf[5].wrapping_add(1);
    assert!(matches!(
        EditJournal::read(buf.as_slice()),
        Err(JournalError::Corruption("unsupported format version"))
    ));
    Ok(())
}

#[test]
fn corrupted_file_is_rejected() -> Result<()> {
    let journal = rich_journal();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("edit.retrace");
    journal.write(File::create(&path)?)?;

    let mut file = File::options().write(true).open(&path)?;
    file.seek(SeekFrom::Start(20))?;
    file.write_all(&[0xAA])?;
    drop(file);

    assert!(matches!(
        EditJournal::read(File::open(&path)?),
        Err(JournalError::Corruption(_))
    ));
    Ok(())
}

#[test]
fn every_truncation_point_is_rejected() -> Result<()> {
    let mut buf = Vec::new();
    rich_journal().write(&mut buf)?;
    // chop at a spread of points; none may yield a partial journal
    for cut in (0..buf.len()).step_by(7) {
        assert!(
            EditJournal::read(&buf[..cut]).is_err(),
            "truncation at {cut} must be rejected"
        );
    }
    Ok(())
}

#[test]
fn stack_length_mismatch_is_rejected() -> Result<()> {
    // a journal whose entry stream consumes one byte delta
    let mut journal = EditJournal::new();
    journal.add_vertex(1);
    journal.finish();
    let mut buf = Vec::new();
    journal.write(&mut buf)?;

    // rebuild with the byte stack emptied but the entry stream intact
    let body_start = 6;
    let entry_count = 1usize;
    let mut body: Vec<u8> = buf[body_start..buf.len() - 4].to_vec();
    let bytes_len_offset = 4 + entry_count * 2;
    body[bytes_len_offset..bytes_len_offset + 4].copy_from_slice(&0u32.to_be_bytes());
    body.remove(bytes_len_offset + 4);

    let mut forged = buf[..body_start].to_vec();
    forged.extend_from_slice(&body);
    forged.extend_from_slice(&crc32fast::hash(&body).to_be_bytes());
    assert!(matches!(
        EditJournal::read(forged.as_slice()),
        Err(JournalError::Corruption("stack lengths do not match operand usage"))
    ));
    Ok(())
}

#[test]
fn unknown_kind_is_rejected() -> Result<()> {
    let mut journal = EditJournal::new();
    journal.add_vertex(0);
    journal.finish();
    let mut buf = Vec::new();
    journal.write(&mut buf)?;

    // overwrite the single entry's kind bits with an undefined kind (31)
    let mut body: Vec<u8> = buf[6..buf.len() - 4].to_vec();
    let entry = u16::from_be_bytes([body[4], body[5]]) | 0x1F;
    body[4..6].copy_from_slice(&entry.to_be_bytes());

    let mut forged = buf[..6].to_vec();
    forged.extend_from_slice(&body);
    forged.extend_from_slice(&crc32fast::hash(&body).to_be_bytes());
    assert!(matches!(
        EditJournal::read(forged.as_slice()),
        Err(JournalError::Corruption("unknown operation kind"))
    ));
    Ok(())
}

#[test]
fn empty_journal_round_trips() -> Result<()> {
    let mut journal = EditJournal::new();
    journal.finish();
    let mut buf = Vec::new();
    journal.write(&mut buf)?;
    let restored = EditJournal::read(buf.as_slice())?;
    assert_eq!(restored.stats().entries, 0);
    let mut graph = MemoryGraph::default();
    restored.execute(&mut graph)?;
    restored.undo(&mut graph)?;
    assert_eq!(graph, MemoryGraph::default());
    Ok(())
}
