//! Events bound to map objects
//!
//! An [`Event`] registered on an object pairs an event signature (system
//! flag, id, expected parameter values) with the reactions to run per object
//! state. Dispatch matches a sent event against these signatures.

use crate::dynamic::DynamicValue;
use crate::identity::{EventId, StateId};
use crate::reaction::Reaction;
use indexmap::IndexMap;
use std::sync::Arc;

/// An event registration on a map object
#[derive(Debug, Clone, Default)]
pub struct Event {
    /// Engine-defined event rather than a game-defined one
    pub is_system: bool,
    pub id: EventId,
    /// Expected parameter values; a sent event must match all of them
    pub parameters: IndexMap<usize, DynamicValue>,
    /// Reactions to run, keyed by the object state they apply to
    pub reactions: IndexMap<StateId, Arc<Reaction>>,
}

impl Event {
    pub fn new(is_system: bool, id: EventId) -> Self {
        Self {
            is_system,
            id,
            ..Self::default()
        }
    }

    /// Whether two registrations target the same signature
    pub fn same_signature(&self, other: &Event) -> bool {
        self.is_system == other.is_system
            && self.id == other.id
            && self.parameters == other.parameters
    }

    /// Merge reactions from another registration, first writer per state wins
    pub fn merge_reactions(&mut self, reactions: IndexMap<StateId, Arc<Reaction>>) {
        for (state, reaction) in reactions {
            self.reactions.entry(state).or_insert(reaction);
        }
    }

    /// Match a sent event against this registration
    ///
    /// Every expected parameter must equal the sent one; missing sent
    /// parameters count as none. `Default` expectations match anything.
    pub fn matches(
        &self,
        is_system: bool,
        id: EventId,
        sent: &IndexMap<usize, DynamicValue>,
    ) -> bool {
        if self.is_system != is_system || self.id != id {
            return false;
        }
        self.parameters.iter().all(|(index, expected)| match expected {
            DynamicValue::Default => true,
            _ => expected.is_equal(sent.get(index).unwrap_or(&DynamicValue::None)),
        })
    }
}

/// Materialize the parameter table for one activation
///
/// Declaration-site defaults seed the table, the registration's own values
/// overlay them, the sent values overlay both. A `Default` at any layer
/// defers to the layer below it.
pub fn bound_parameters(
    defaults: &IndexMap<usize, DynamicValue>,
    declared: &IndexMap<usize, DynamicValue>,
    sent: &IndexMap<usize, DynamicValue>,
) -> IndexMap<usize, DynamicValue> {
    let mut bound = defaults.clone();
    for layer in [declared, sent] {
        for (index, value) in layer {
            if !matches!(value, DynamicValue::Default) {
                bound.insert(*index, value.clone());
            }
        }
    }
    bound
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sent(pairs: &[(usize, DynamicValue)]) -> IndexMap<usize, DynamicValue> {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn test_matching() {
        let mut event = Event::new(false, 4);
        event.parameters.insert(0, DynamicValue::Number(2));
        event.parameters.insert(1, DynamicValue::Any);

        assert!(event.matches(
            false,
            4,
            &sent(&[(0, DynamicValue::Number(2)), (1, DynamicValue::Message("x".into()))])
        ));
        // Any on the expectation side matches a missing parameter too
        assert!(event.matches(false, 4, &sent(&[(0, DynamicValue::Number(2))])));
        assert!(!event.matches(false, 4, &sent(&[(0, DynamicValue::Number(3))])));
        assert!(!event.matches(true, 4, &sent(&[(0, DynamicValue::Number(2))])));
        assert!(!event.matches(false, 5, &sent(&[(0, DynamicValue::Number(2))])));
    }

    #[test]
    fn test_keyboard_matches_raw_code() {
        let mut event = Event::new(true, 1);
        event.parameters.insert(0, DynamicValue::Keyboard(13));
        assert!(event.matches(true, 1, &sent(&[(0, DynamicValue::Number(13))])));
        assert!(!event.matches(true, 1, &sent(&[(0, DynamicValue::Number(14))])));
    }

    #[test]
    fn test_bound_parameters_layering() {
        let defaults = sent(&[(0, DynamicValue::Number(1)), (1, DynamicValue::Number(2))]);
        let declared = sent(&[(1, DynamicValue::Number(5)), (2, DynamicValue::Default)]);
        let sent_params = sent(&[(0, DynamicValue::Default), (1, DynamicValue::Number(9))]);

        let bound = bound_parameters(&defaults, &declared, &sent_params);
        assert_eq!(bound[&0], DynamicValue::Number(1));
        assert_eq!(bound[&1], DynamicValue::Number(9));
        assert!(!bound.contains_key(&2));
    }

    #[test]
    fn test_merge_reactions_keeps_first() {
        let a = Arc::new(Reaction::empty());
        let b = Arc::new(Reaction::empty());
        let mut event = Event::new(false, 1);
        event.reactions.insert(1, a.clone());
        let mut incoming = IndexMap::new();
        incoming.insert(1, b.clone());
        incoming.insert(2, b.clone());
        event.merge_reactions(incoming);
        assert!(Arc::ptr_eq(&event.reactions[&1], &a));
        assert!(Arc::ptr_eq(&event.reactions[&2], &b));
    }
}
