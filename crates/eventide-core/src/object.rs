//! Map objects and their templates
//!
//! A [`MapObject`] is a live entity on the current map: the hero, an NPC, a
//! spawned template instance. Objects carry their own event/reaction tables
//! and a single move slot so at most one movement routine drives an object
//! at a time.

use crate::dynamic::DynamicValue;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::identity::{EventId, ObjectId, StateId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A position on the map, in squares
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another position, in squares
    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Facing direction of a map object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    South,
    West,
    North,
    East,
}

impl Orientation {
    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(Orientation::South),
            1 => Some(Orientation::West),
            2 => Some(Orientation::North),
            3 => Some(Orientation::East),
            _ => None,
        }
    }

    /// Unit step on the ground plane for this orientation
    pub fn step(&self) -> (f64, f64) {
        match self {
            Orientation::South => (0.0, 1.0),
            Orientation::West => (-1.0, 0.0),
            Orientation::North => (0.0, -1.0),
            Orientation::East => (1.0, 0.0),
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Orientation::South => Orientation::North,
            Orientation::West => Orientation::East,
            Orientation::North => Orientation::South,
            Orientation::East => Orientation::West,
        }
    }
}

/// Outcome of asking the move slot about a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
    /// The ticket drives the object right now
    Active,
    /// The ticket is queued behind the active one
    Waiting,
    /// The ticket was replaced by a newer request and will never run
    Superseded,
}

/// Exclusive ownership of an object's movement
///
/// One routine moves an object at a time. A second request waits in the
/// pending slot; a third overwrites the second, which ends superseded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoveSlot {
    next_ticket: u64,
    current: Option<u64>,
    pending: Option<u64>,
}

impl MoveSlot {
    /// Request the slot, returning the caller's ticket
    pub fn request(&mut self) -> u64 {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        if self.current.is_none() {
            self.current = Some(ticket);
        } else {
            self.pending = Some(ticket);
        }
        ticket
    }

    pub fn status(&self, ticket: u64) -> TicketStatus {
        if self.current == Some(ticket) {
            TicketStatus::Active
        } else if self.pending == Some(ticket) {
            TicketStatus::Waiting
        } else {
            TicketStatus::Superseded
        }
    }

    /// Release a ticket, promoting the pending one if the active ends
    pub fn release(&mut self, ticket: u64) {
        if self.current == Some(ticket) {
            self.current = self.pending.take();
        } else if self.pending == Some(ticket) {
            self.pending = None;
        }
    }

    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }
}

/// A live object on the map
#[derive(Debug, Clone, Default)]
pub struct MapObject {
    pub id: ObjectId,
    pub name: String,
    pub position: Position,
    pub orientation: Orientation,
    /// Movement speed in squares per second
    pub speed: f64,
    /// Delay between autonomous reaction activations
    pub frequency_ms: u64,
    /// Possessed states, first entry is the active one
    pub states: Vec<StateId>,
    pub events: IndexMap<EventId, Vec<Event>>,
    pub properties: IndexMap<usize, DynamicValue>,
    pub move_slot: MoveSlot,
    pub graphics_id: i64,
    /// Flagged by removal commands; a removed object no longer reacts
    pub removed: bool,
    /// Spawned from a template at runtime (not part of the authored map)
    pub spawned: bool,
}

impl MapObject {
    pub fn new(id: ObjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            speed: 1.0,
            states: vec![1],
            ..Self::default()
        }
    }

    /// The state currently driving this object's reactions
    pub fn current_state(&self) -> Option<StateId> {
        self.states.first().copied()
    }

    /// Add a state at the front, making it active
    pub fn add_state(&mut self, state: StateId) {
        self.states.retain(|s| *s != state);
        self.states.insert(0, state);
    }

    /// Remove a possessed state
    pub fn remove_state(&mut self, state: StateId) {
        self.states.retain(|s| *s != state);
    }

    /// Replace all states with a single one
    pub fn replace_states(&mut self, state: StateId) {
        self.states.clear();
        self.states.push(state);
    }

    /// Register an event, merging reactions into an existing match
    pub fn add_event(&mut self, event: Event) {
        let slot = self.events.entry(event.id).or_default();
        match slot.iter_mut().find(|e| e.same_signature(&event)) {
            Some(existing) => existing.merge_reactions(event.reactions),
            None => slot.push(event),
        }
    }
}

/// An authored object template, possibly refining a parent template
#[derive(Debug, Clone, Default)]
pub struct ObjectTemplate {
    pub id: i64,
    pub name: String,
    /// Parent template this one inherits events and properties from
    pub inherit: Option<i64>,
    pub states: Vec<StateId>,
    pub events: Vec<Event>,
    pub properties: IndexMap<usize, DynamicValue>,
    pub graphics_id: i64,
    pub speed: f64,
    pub frequency_ms: u64,
}

/// Merge a parent template under a child, child fields win
pub fn merge_inherited(parent: &ObjectTemplate, child: &ObjectTemplate) -> ObjectTemplate {
    let mut merged = parent.clone();
    merged.id = child.id;
    merged.name = child.name.clone();
    merged.inherit = None;
    if !child.states.is_empty() {
        merged.states = child.states.clone();
    }
    merged.events.extend(child.events.iter().cloned());
    for (index, value) in &child.properties {
        merged.properties.insert(*index, value.clone());
    }
    if child.graphics_id != 0 {
        merged.graphics_id = child.graphics_id;
    }
    if child.speed != 0.0 {
        merged.speed = child.speed;
    }
    if child.frequency_ms != 0 {
        merged.frequency_ms = child.frequency_ms;
    }
    merged
}

/// Order template ids so parents come before children
///
/// Fails with [`Error::InheritanceCycle`] naming one id on the cycle.
pub fn inheritance_order(templates: &IndexMap<i64, ObjectTemplate>) -> Result<Vec<i64>> {
    let mut order = Vec::with_capacity(templates.len());
    let mut done: Vec<i64> = Vec::with_capacity(templates.len());
    for &start in templates.keys() {
        if done.contains(&start) {
            continue;
        }
        // walk up the parent chain, then emit in reverse
        let mut chain = Vec::new();
        let mut current = Some(start);
        while let Some(id) = current {
            if done.contains(&id) {
                break;
            }
            if chain.contains(&id) {
                return Err(Error::InheritanceCycle(id));
            }
            chain.push(id);
            current = templates.get(&id).and_then(|t| t.inherit);
        }
        for id in chain.into_iter().rev() {
            done.push(id);
            order.push(id);
        }
    }
    Ok(order)
}

impl ObjectTemplate {
    /// Instance this template as a live object
    pub fn instance(&self, id: ObjectId, position: Position) -> MapObject {
        let mut object = MapObject::new(id, self.name.clone());
        object.position = position;
        object.speed = if self.speed > 0.0 { self.speed } else { 1.0 };
        object.frequency_ms = self.frequency_ms;
        object.graphics_id = self.graphics_id;
        if !self.states.is_empty() {
            object.states = self.states.clone();
        }
        object.properties = self.properties.clone();
        for event in &self.events {
            object.add_event(event.clone());
        }
        object.spawned = true;
        object
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_slot_exclusion() {
        let mut slot = MoveSlot::default();
        let a = slot.request();
        let b = slot.request();
        assert_eq!(slot.status(a), TicketStatus::Active);
        assert_eq!(slot.status(b), TicketStatus::Waiting);

        // a third request supersedes the waiting one
        let c = slot.request();
        assert_eq!(slot.status(b), TicketStatus::Superseded);
        assert_eq!(slot.status(c), TicketStatus::Waiting);

        slot.release(a);
        assert_eq!(slot.status(c), TicketStatus::Active);
        slot.release(c);
        assert!(!slot.is_busy());
    }

    #[test]
    fn test_state_mutation() {
        let mut object = MapObject::new(ObjectId::new(3), "door");
        assert_eq!(object.current_state(), Some(1));
        object.add_state(2);
        assert_eq!(object.current_state(), Some(2));
        object.remove_state(2);
        assert_eq!(object.current_state(), Some(1));
        object.replace_states(7);
        assert_eq!(object.states, vec![7]);
    }

    #[test]
    fn test_inheritance_order_and_cycle() {
        let mut templates = IndexMap::new();
        for (id, inherit) in [(1, None), (2, Some(1)), (3, Some(2))] {
            templates.insert(
                id,
                ObjectTemplate {
                    id,
                    inherit,
                    ..ObjectTemplate::default()
                },
            );
        }
        // insertion order starts at the deepest child
        templates.move_index(2, 0);
        let order = inheritance_order(&templates).unwrap();
        let pos = |id: i64| order.iter().position(|o| *o == id).unwrap();
        assert!(pos(1) < pos(2));
        assert!(pos(2) < pos(3));

        templates.get_mut(&1).unwrap().inherit = Some(3);
        assert!(matches!(
            inheritance_order(&templates),
            Err(Error::InheritanceCycle(_))
        ));
    }

    #[test]
    fn test_merge_inherited_child_wins() {
        let mut parent = ObjectTemplate {
            id: 1,
            name: "base".into(),
            speed: 2.0,
            ..ObjectTemplate::default()
        };
        parent.properties.insert(0, DynamicValue::Number(1));
        parent.properties.insert(1, DynamicValue::Number(2));
        let mut child = ObjectTemplate {
            id: 2,
            name: "fast".into(),
            inherit: Some(1),
            ..ObjectTemplate::default()
        };
        child.properties.insert(1, DynamicValue::Number(9));

        let merged = merge_inherited(&parent, &child);
        assert_eq!(merged.id, 2);
        assert_eq!(merged.speed, 2.0);
        assert_eq!(merged.properties[&0], DynamicValue::Number(1));
        assert_eq!(merged.properties[&1], DynamicValue::Number(9));
    }
}
