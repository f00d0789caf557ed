//! Identity types for objects, events, states and tree nodes

use serde::{Deserialize, Serialize};
use std::fmt;

/// System identifier of a map object
///
/// `0` is reserved for the hero. Negative ids never appear in authored data;
/// the dispatcher uses `-1` in its *target* encoding to mean "the sender",
/// which is resolved before an `ObjectId` is ever built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub i64);

impl ObjectId {
    /// The hero's object id
    pub const HERO: ObjectId = ObjectId(0);

    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> i64 {
        self.0
    }

    /// Check if this is the hero
    pub fn is_hero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object:{}", self.0)
    }
}

/// Identifier of an object behavior state
pub type StateId = i64;

/// Identifier of an event definition
pub type EventId = i64;

/// Index of a node inside one reaction tree arena
pub type NodeId = usize;

/// Index into the session variable bank
pub type VariableIndex = usize;
