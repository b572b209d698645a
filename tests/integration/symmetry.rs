//! Randomized record/execute/undo symmetry.
//!
//! A script generator drives a model graph and records every mutation into a
//! journal as it goes, exactly as a caller would. Whatever the script did,
//! `execute` on a fresh graph must land on the model and `undo` must land
//! back on the starting state.

use std::collections::HashMap;
use std::sync::Arc;

use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use retrace::{
    AttributeSpec, EditJournal, ElementType, MemoryGraph, MutationTarget, ObjectValue,
};

struct Script {
    rng: ChaCha8Rng,
    graph: MemoryGraph,
    journal: EditJournal,
    vertices: Vec<i32>,
    // id -> (source, destination, directed)
    transactions: HashMap<i32, (i32, i32, bool)>,
    incident: HashMap<i32, usize>,
    int_attrs: Vec<i32>,
    bool_attrs: Vec<i32>,
    next_vertex: i32,
    next_transaction: i32,
    next_attribute: i32,
}

impl Script {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            graph: MemoryGraph::default(),
            journal: EditJournal::new(),
            vertices: Vec::new(),
            transactions: HashMap::new(),
            incident: HashMap::new(),
            int_attrs: Vec::new(),
            bool_attrs: Vec::new(),
            next_vertex: 0,
            next_transaction: 0,
            next_attribute: 0,
        }
    }

    fn pick(&mut self, pool: &[i32]) -> Option<i32> {
        if pool.is_empty() {
            None
        } else {
            Some(pool[self.rng.gen_range(0..pool.len())])
        }
    }

    fn step(&mut self) {
        match self.rng.gen_range(0..10) {
            0 | 1 => self.add_vertex(),
            2 => self.remove_vertex(),
            3 => self.add_transaction(),
            4 => self.remove_transaction(),
            5 => self.move_endpoint(),
            6 => self.add_attribute(),
            7 | 8 => self.set_int(),
            _ => self.set_bool(),
        }
    }

    fn add_vertex(&mut self) {
        let vertex = self.next_vertex;
        self.next_vertex += 1;
        self.graph.add_vertex(vertex).unwrap();
        self.journal.add_vertex(vertex);
        self.vertices.push(vertex);
        self.incident.insert(vertex, 0);
    }

    fn remove_vertex(&mut self) {
        let free: Vec<i32> = self
            .vertices
            .iter()
            .copied()
            .filter(|v| self.incident[v] == 0)
            .collect();
        let Some(vertex) = self.pick(&free) else { return };
        // zero the vertex's recorded values first, or the journal cannot
        // restore them on undo
        for attr in self.int_attrs.clone() {
            let old = self.graph.int_value(attr, vertex);
            if old != 0 {
                self.graph.set_int_value(attr, vertex, 0).unwrap();
                self.journal.set_int_value(attr, vertex, old, 0);
            }
        }
        for attr in self.bool_attrs.clone() {
            if self.graph.boolean_value(attr, vertex) {
                self.graph.set_boolean_value(attr, vertex, false).unwrap();
                self.journal.set_boolean_value(attr, vertex, false);
            }
        }
        self.graph.remove_vertex(vertex).unwrap();
        self.journal.remove_vertex(vertex);
        self.vertices.retain(|&v| v != vertex);
        self.incident.remove(&vertex);
    }

    fn add_transaction(&mut self) {
        let Some(source) = self.pick(&self.vertices.clone()) else { return };
        let Some(destination) = self.pick(&self.vertices.clone()) else { return };
        let directed = self.rng.gen_bool(0.5);
        let transaction = self.next_transaction;
        self.next_transaction += 1;
        self.graph
            .add_transaction(source, destination, directed, transaction)
            .unwrap();
        self.journal
            .add_transaction(source, destination, directed, transaction);
        self.transactions
            .insert(transaction, (source, destination, directed));
        *self.incident.get_mut(&source).unwrap() += 1;
        *self.incident.get_mut(&destination).unwrap() += 1;
    }

    fn remove_transaction(&mut self) {
        let ids: Vec<i32> = self.transactions.keys().copied().collect();
        let Some(transaction) = self.pick(&ids) else { return };
        let (source, destination, directed) = self.transactions.remove(&transaction).unwrap();
        self.graph.remove_transaction(transaction).unwrap();
        self.journal
            .remove_transaction(source, destination, directed, transaction);
        *self.incident.get_mut(&source).unwrap() -= 1;
        *self.incident.get_mut(&destination).unwrap() -= 1;
    }

    fn move_endpoint(&mut self) {
        let ids: Vec<i32> = self.transactions.keys().copied().collect();
        let Some(transaction) = self.pick(&ids) else { return };
        let Some(vertex) = self.pick(&self.vertices.clone()) else { return };
        let entry = self.transactions.get_mut(&transaction).unwrap();
        if self.rng.gen_bool(0.5) {
            let old = entry.0;
            entry.0 = vertex;
            self.graph
                .set_transaction_source_vertex(transaction, vertex)
                .unwrap();
            self.journal
                .set_transaction_source_vertex(transaction, old, vertex);
            *self.incident.get_mut(&old).unwrap() -= 1;
        } else {
            let old = entry.1;
            entry.1 = vertex;
            self.graph
                .set_transaction_destination_vertex(transaction, vertex)
                .unwrap();
            self.journal
                .set_transaction_destination_vertex(transaction, old, vertex);
            *self.incident.get_mut(&old).unwrap() -= 1;
        }
        *self.incident.get_mut(&vertex).unwrap() += 1;
    }

    fn add_attribute(&mut self) {
        let attribute = self.next_attribute;
        self.next_attribute += 1;
        let boolean = self.rng.gen_bool(0.3);
        let spec = AttributeSpec {
            element_type: ElementType::Vertex,
            attribute_type: if boolean { "boolean" } else { "integer" }.into(),
            label: format!("attr{attribute}"),
            description: String::new(),
            default_value: None,
            merger: None,
        };
        self.graph.add_attribute(&spec, attribute).unwrap();
        self.journal.add_attribute(&spec, attribute);
        if boolean {
            self.bool_attrs.push(attribute);
        } else {
            self.int_attrs.push(attribute);
        }
    }

    fn set_int(&mut self) {
        let Some(attr) = self.pick(&self.int_attrs.clone()) else { return };
        let Some(vertex) = self.pick(&self.vertices.clone()) else { return };
        let old = self.graph.int_value(attr, vertex);
        let new = self.rng.gen_range(-1000..1000);
        if new == old {
            return;
        }
        self.graph.set_int_value(attr, vertex, new).unwrap();
        self.journal.set_int_value(attr, vertex, old, new);
    }

    fn set_bool(&mut self) {
        let Some(attr) = self.pick(&self.bool_attrs.clone()) else { return };
        let Some(vertex) = self.pick(&self.vertices.clone()) else { return };
        let old = self.graph.boolean_value(attr, vertex);
        self.graph.set_boolean_value(attr, vertex, !old).unwrap();
        self.journal.set_boolean_value(attr, vertex, !old);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_scripts_execute_and_undo_exactly(seed in any::<u64>(), steps in 1usize..150) {
        let mut script = Script::new(seed);
        for _ in 0..steps {
            script.step();
        }
        script.journal.finish();

        let mut replayed = MemoryGraph::default();
        script.journal.execute(&mut replayed).unwrap();
        prop_assert_eq!(&replayed, &script.graph);

        script.journal.undo(&mut replayed).unwrap();
        prop_assert_eq!(&replayed, &MemoryGraph::default());

        // frozen journals replay any number of times
        script.journal.execute(&mut replayed).unwrap();
        prop_assert_eq!(&replayed, &script.graph);
    }

    #[test]
    fn random_scripts_survive_a_snapshot(seed in any::<u64>(), steps in 1usize..80) {
        let mut script = Script::new(seed);
        for _ in 0..steps {
            script.step();
        }
        script.journal.finish();

        let mut buf = Vec::new();
        script.journal.write(&mut buf).unwrap();
        let restored = EditJournal::read(buf.as_slice()).unwrap();

        let mut replayed = MemoryGraph::default();
        restored.execute(&mut replayed).unwrap();
        prop_assert_eq!(&replayed, &script.graph);
        restored.undo(&mut replayed).unwrap();
        prop_assert_eq!(&replayed, &MemoryGraph::default());
    }
}

#[test]
fn wide_id_jumps_use_every_delta_width() {
    // deltas of 1, 300 and 100_000 exercise the byte, short and int codes
    let mut journal = EditJournal::new();
    let mut graph = MemoryGraph::default();
    for vertex in [0, 1, 301, 100_301, 2, i32::MAX, 0x0100] {
        graph.add_vertex(vertex).unwrap();
        journal.add_vertex(vertex);
    }
    journal.finish();

    let mut replayed = MemoryGraph::default();
    journal.execute(&mut replayed).unwrap();
    assert_eq!(replayed, graph);
    journal.undo(&mut replayed).unwrap();
    assert_eq!(replayed, MemoryGraph::default());
}

#[test]
fn interleaved_attribute_and_id_cursors_stay_independent() {
    let spec = AttributeSpec {
        element_type: ElementType::Vertex,
        attribute_type: "integer".into(),
        label: "x".into(),
        description: String::new(),
        default_value: None,
        merger: None,
    };
    let mut initial = MemoryGraph::default();
    for attr in [0, 9, 500] {
        initial.add_attribute(&spec, attr).unwrap();
    }
    for vertex in [0, 7] {
        initial.add_vertex(vertex).unwrap();
    }

    let mut journal = EditJournal::new();
    journal.set_int_value(0, 7, 0, 1);
    journal.set_int_value(500, 0, 0, 2);
    journal.set_int_value(9, 7, 0, 3);
    journal.set_object_value(500, 7, None, Some(Arc::new(ObjectValue::Bool(true))));
    journal.finish();

    let mut graph = initial.clone();
    journal.execute(&mut graph).unwrap();
    assert_eq!(graph.int_value(0, 7), 1);
    assert_eq!(graph.int_value(500, 0), 2);
    assert_eq!(graph.int_value(9, 7), 3);
    journal.undo(&mut graph).unwrap();
    assert_eq!(graph, initial);
}
