//! Forward and backward replay against the in-memory graph.

use std::sync::Arc;

use retrace::{
    AttributeSpec, EditJournal, ElementType, GraphOperation, IndexType, MemoryGraph,
    MutationTarget, ObjectValue, Result,
};

fn vertex_int_attr(label: &str) -> AttributeSpec {
    AttributeSpec {
        element_type: ElementType::Vertex,
        attribute_type: "integer".into(),
        label: label.into(),
        description: String::new(),
        default_value: None,
        merger: None,
    }
}

#[test]
fn two_vertices_and_two_int_sets() -> Result<()> {
    let mut journal = EditJournal::new();
    journal.add_vertex(0);
    journal.add_vertex(1);
    journal.set_int_value(2, 0, 0, 5);
    journal.set_int_value(2, 1, 0, 7);
    journal.finish();

    let stats = journal.stats();
    assert_eq!(stats.entries, 4, "no two entries share delta codes");
    assert_eq!(stats.occurrences, 4);
    assert_eq!(stats.ints, 4, "two (old, new) pairs");
    assert_eq!(stats.objects, 0);

    // the target already carries the attribute; the journal only recorded
    // vertex and value changes
    let mut initial = MemoryGraph::default();
    initial.add_attribute(&vertex_int_attr("weight"), 2)?;
    let mut graph = initial.clone();

    journal.execute(&mut graph)?;
    assert!(graph.has_vertex(0) && graph.has_vertex(1));
    assert_eq!(graph.int_value(2, 0), 5);
    assert_eq!(graph.int_value(2, 1), 7);

    journal.undo(&mut graph)?;
    assert_eq!(graph, initial, "undo must restore the starting state");
    Ok(())
}

#[test]
fn ten_identical_mutations_collapse_to_three_entries() -> Result<()> {
    let mut journal = EditJournal::new();
    for vertex in 1..=10 {
        journal.add_vertex(vertex);
    }
    journal.finish();
    assert_eq!(journal.stats().entries, 3, "runs of four, four and two");
    assert_eq!(journal.stats().occurrences, 10);

    let mut graph = MemoryGraph::default();
    journal.execute(&mut graph)?;
    assert_eq!(graph.vertex_count(), 10, "every occurrence applies");
    journal.undo(&mut graph)?;
    assert_eq!(graph.vertex_count(), 0);
    Ok(())
}

#[test]
fn attribute_lifecycle_round_trips() -> Result<()> {
    let spec = vertex_int_attr("rank");
    let mut journal = EditJournal::new();
    journal.add_attribute(&spec, 7);
    journal.update_attribute_name(7, "rank", "priority");
    journal.update_attribute_description(7, "", "ordering rank");
    journal.set_attribute_index_type(7, IndexType::None, IndexType::Ordered);
    journal.update_attribute_default_value(
        7,
        None,
        Some(Arc::new(ObjectValue::Int(1))),
    );
    journal.finish();

    let mut graph = MemoryGraph::default();
    journal.execute(&mut graph)?;
    let stored = graph.attribute_spec(7).unwrap();
    assert_eq!(stored.label, "priority");
    assert_eq!(stored.description, "ordering rank");
    assert_eq!(
        stored.default_value.as_deref(),
        Some(&ObjectValue::Int(1))
    );
    assert_eq!(graph.attribute_index_type(7), Some(IndexType::Ordered));

    journal.undo(&mut graph)?;
    assert_eq!(graph, MemoryGraph::default());
    Ok(())
}

#[test]
fn transactions_and_endpoint_moves_invert() -> Result<()> {
    let mut journal = EditJournal::new();
    for v in 0..3 {
        journal.add_vertex(v);
    }
    journal.add_transaction(0, 1, true, 0);
    journal.add_transaction(1, 2, false, 1);
    journal.set_transaction_source_vertex(0, 0, 2);
    journal.set_transaction_destination_vertex(1, 2, 0);
    journal.remove_transaction(2, 1, true, 0);
    journal.finish();

    let mut graph = MemoryGraph::default();
    journal.execute(&mut graph)?;
    assert_eq!(graph.transaction(0), None, "removed after the moves");
    assert_eq!(graph.transaction(1), Some((1, 0, false)));

    journal.undo(&mut graph)?;
    assert_eq!(graph, MemoryGraph::default());
    Ok(())
}

#[test]
fn every_value_width_inverts() -> Result<()> {
    let mut initial = MemoryGraph::default();
    for attr in 0..8 {
        initial.add_attribute(&vertex_int_attr(&format!("a{attr}")), attr)?;
    }
    initial.add_vertex(0)?;

    let mut journal = EditJournal::new();
    journal.set_byte_value(0, 0, 0, -3);
    journal.set_short_value(1, 0, 0, 300);
    journal.set_int_value(2, 0, 0, -70_000);
    journal.set_long_value(3, 0, 0, 1 << 40);
    journal.set_float_value(4, 0, 0.0, 2.5);
    journal.set_double_value(5, 0, 0.0, -0.125);
    journal.set_boolean_value(6, 0, true);
    journal.set_object_value(
        7,
        0,
        None,
        Some(Arc::new(ObjectValue::Text("payload".into()))),
    );
    journal.finish();

    let mut graph = initial.clone();
    journal.execute(&mut graph)?;
    assert_eq!(graph.byte_value(0, 0), -3);
    assert_eq!(graph.short_value(1, 0), 300);
    assert_eq!(graph.int_value(2, 0), -70_000);
    assert_eq!(graph.long_value(3, 0), 1 << 40);
    assert_eq!(graph.float_value(4, 0), 2.5);
    assert_eq!(graph.double_value(5, 0), -0.125);
    assert!(graph.boolean_value(6, 0));
    assert_eq!(
        graph.object_value(7, 0).as_deref(),
        Some(&ObjectValue::Text("payload".into()))
    );

    journal.undo(&mut graph)?;
    assert_eq!(graph, initial);
    Ok(())
}

#[test]
fn object_values_intern_once_per_distinct_value() {
    let payload = || Some(Arc::new(ObjectValue::Text("shared".into())));
    let other = Some(Arc::new(ObjectValue::Text("other".into())));
    let mut journal = EditJournal::new();
    journal.set_object_value(0, 0, None, payload());
    journal.set_object_value(0, 1, None, payload());
    journal.set_object_value(0, 2, payload(), other);
    journal.finish();
    assert_eq!(
        journal.stats().objects,
        2,
        "equal values share one interned slot and null is free"
    );
}

#[test]
fn primary_key_changes_invert() -> Result<()> {
    let mut initial = MemoryGraph::default();
    initial.add_attribute(&vertex_int_attr("a"), 0)?;
    initial.add_attribute(&vertex_int_attr("b"), 1)?;

    let mut journal = EditJournal::new();
    journal.set_primary_key(ElementType::Vertex, &[], &[0, 1]);
    journal.finish();

    let mut graph = initial.clone();
    journal.execute(&mut graph)?;
    assert_eq!(graph.primary_key(ElementType::Vertex), &[0, 1]);
    journal.undo(&mut graph)?;
    assert_eq!(graph, initial);
    Ok(())
}

#[test]
fn replay_error_propagates_immediately() {
    let mut journal = EditJournal::new();
    journal.add_vertex(0);
    journal.add_vertex(0); // duplicate: the second application must fail
    journal.finish();

    let mut graph = MemoryGraph::default();
    let err = journal.execute(&mut graph).unwrap_err();
    assert!(err.to_string().contains("already exists"));
    assert_eq!(graph.vertex_count(), 1, "target left partially mutated");
}

#[derive(Debug)]
struct ToggleVertex(i32);

impl GraphOperation for ToggleVertex {
    fn execute(&self, target: &mut dyn MutationTarget) -> Result<()> {
        target.add_vertex(self.0)
    }
    fn undo(&self, target: &mut dyn MutationTarget) -> Result<()> {
        target.remove_vertex(self.0)
    }
}

#[test]
fn recorded_operations_delegate_both_directions() -> Result<()> {
    let mut journal = EditJournal::new();
    journal.add_vertex(0);
    journal.record_operation(Arc::new(ToggleVertex(1)));
    journal.add_vertex(2);
    journal.finish();

    let mut graph = MemoryGraph::default();
    journal.execute(&mut graph)?;
    assert_eq!(graph.vertex_count(), 3);
    journal.undo(&mut graph)?;
    assert_eq!(graph, MemoryGraph::default());
    Ok(())
}

#[test]
fn frozen_journals_nest_as_child_edits() -> Result<()> {
    let mut child = EditJournal::new();
    child.add_vertex(10);
    child.add_vertex(11);
    child.finish();

    let mut parent = EditJournal::new();
    parent.add_vertex(0);
    parent.record_operation(Arc::new(child));
    parent.finish();

    let mut graph = MemoryGraph::default();
    parent.execute(&mut graph)?;
    assert_eq!(graph.vertex_count(), 3);
    parent.undo(&mut graph)?;
    assert_eq!(graph, MemoryGraph::default());
    Ok(())
}

#[test]
fn replay_is_repeatable() -> Result<()> {
    let mut journal = EditJournal::new();
    journal.add_vertex(0);
    journal.add_vertex(5);
    journal.add_transaction(0, 5, true, 0);
    journal.finish();

    let mut graph = MemoryGraph::default();
    for _ in 0..3 {
        journal.execute(&mut graph)?;
        journal.undo(&mut graph)?;
    }
    assert_eq!(graph, MemoryGraph::default());
    Ok(())
}
