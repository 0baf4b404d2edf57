//! In-memory `ObjectStore`/`EventTree` implementations used only by this crate's own tests
//! (`SPEC_FULL.md` 3.1). The real versions live downstream, backed by an on-disk object store and
//! a loaded phylogeny; grounded here on the tree-walking shape of `cactusEventTree.c`.

#![cfg(test)]

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::external::{EventTree, ObjectStore, Sequence};
use crate::ids::Name;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Event(pub u32);

/// A tree built up by explicit parent/branch-length edges; no balance or depth is assumed.
#[derive(Default)]
pub struct TestTree {
    parents: HashMap<Event, Event>,
    lengths: HashMap<Event, f64>,
    root: Option<Event>,
}

impl TestTree {
    pub fn new(root: Event) -> TestTree {
        TestTree {
            parents: HashMap::new(),
            lengths: HashMap::new(),
            root: Some(root),
        }
    }

    pub fn add_child(&mut self, parent: Event, child: Event, branch_length: f64) {
        self.parents.insert(child, parent);
        self.lengths.insert(child, branch_length);
    }
}

impl EventTree for TestTree {
    type Event = Event;

    fn root(&self) -> Event {
        self.root.expect("TestTree::new must be called before use")
    }

    fn parent(&self, event: Event) -> Option<Event> {
        self.parents.get(&event).copied()
    }

    fn children(&self, event: Event) -> Vec<Event> {
        self.parents
            .iter()
            .filter_map(|(&child, &parent)| if parent == event { Some(child) } else { None })
            .collect()
    }

    fn branch_length(&self, event: Event) -> f64 {
        self.lengths.get(&event).copied().unwrap_or(0.0)
    }

    fn name(&self, event: Event) -> String {
        format!("event{}", event.0)
    }
}

/// Maps contig names directly to the event that sampled them.
#[derive(Default)]
pub struct TestStore(pub HashMap<Name, Event>);

impl ObjectStore for TestStore {
    type Event = Event;

    fn sequence(&self, name: Name) -> Result<Sequence<Event>> {
        let event = *self
            .0
            .get(&name)
            .ok_or(Error::ObjectStoreMiss { kind: "sequence", name })?;
        Ok(Sequence {
            name,
            header: format!("seq{name}"),
            length: 0,
            event,
        })
    }
}
