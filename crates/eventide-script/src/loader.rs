//! Converting raw JSON script data into runtime types

use crate::error::{Error, Result};
use crate::schema::{RawCommandNode, RawCommonReaction, RawEvent, RawEventDef, RawParameter, RawReaction};
use eventide_core::data::{CommonReactionDef, EventDef};
use eventide_core::{DynamicValue, Event, Reaction, ScriptNode, StateId};
use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;

fn script_nodes(raw: &[RawCommandNode]) -> Vec<ScriptNode> {
    raw.iter()
        .map(|node| {
            ScriptNode::new(node.kind, node.command.clone())
                .with_children(script_nodes(&node.children))
        })
        .collect()
}

fn parameter_table(raw: &[RawParameter]) -> Result<IndexMap<usize, DynamicValue>> {
    let mut table = IndexMap::new();
    for parameter in raw {
        let index = parameter.id.max(0) as usize;
        table.insert(index, DynamicValue::from_json(&parameter.value)?);
    }
    Ok(table)
}

/// Decode one raw reaction into its runtime tree
pub fn build_reaction(raw: &RawReaction) -> Result<Arc<Reaction>> {
    let nodes = script_nodes(&raw.commands);
    Ok(Arc::new(Reaction::from_nodes(raw.block_hero, &nodes)?))
}

/// Decode one raw event registration
pub fn build_event(raw: &RawEvent) -> Result<Event> {
    let mut event = Event::new(raw.is_system, raw.id);
    event.parameters = parameter_table(&raw.parameters)?;
    for (key, reaction) in &raw.reactions {
        let state: StateId = key
            .parse()
            .map_err(|_| Error::BadStateKey(key.clone()))?;
        event.reactions.insert(state, build_reaction(reaction)?);
    }
    Ok(event)
}

/// Decode one raw common reaction definition
pub fn build_common_reaction(raw: &RawCommonReaction) -> Result<CommonReactionDef> {
    Ok(CommonReactionDef {
        id: raw.id,
        default_parameters: parameter_table(&raw.parameters)?,
        reaction: build_reaction(&raw.reaction)?,
    })
}

/// Decode one raw event declaration
pub fn build_event_def(raw: &RawEventDef) -> Result<EventDef> {
    Ok(EventDef {
        id: raw.id,
        is_system: raw.is_system,
        defaults: parameter_table(&raw.parameters)?,
    })
}

/// Parse an event registration from a JSON string
pub fn event_from_str(json: &str) -> Result<Event> {
    build_event(&serde_json::from_str(json)?)
}

/// Parse a reaction from a JSON string
pub fn reaction_from_str(json: &str) -> Result<Arc<Reaction>> {
    build_reaction(&serde_json::from_str(json)?)
}

/// Parse a list of common reactions from a JSON string, keyed by id
pub fn common_reactions_from_str(json: &str) -> Result<IndexMap<i64, CommonReactionDef>> {
    let raw: Vec<RawCommonReaction> = serde_json::from_str(json)?;
    let mut table = IndexMap::new();
    for entry in &raw {
        table.insert(entry.id, build_common_reaction(entry)?);
    }
    Ok(table)
}

/// Parse a list of event declarations from a JSON string, keyed by id
pub fn event_defs_from_str(json: &str) -> Result<IndexMap<i64, EventDef>> {
    let raw: Vec<RawEventDef> = serde_json::from_str(json)?;
    let mut table = IndexMap::new();
    for entry in &raw {
        table.insert(entry.id, build_event_def(entry)?);
    }
    Ok(table)
}

/// Parse an event registration from a JSON file
pub fn event_from_file(path: impl AsRef<Path>) -> Result<Event> {
    event_from_str(&std::fs::read_to_string(path)?)
}

/// Parse a reaction from a JSON file
pub fn reaction_from_file(path: impl AsRef<Path>) -> Result<Arc<Reaction>> {
    reaction_from_str(&std::fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventide_core::CommandKind;

    #[test]
    fn test_reaction_from_str_builds_the_tree() {
        let json = r#"{
            "id": 1,
            "bh": true,
            "c": [
                {"kind": 8, "command": [8, 1, 0, 3, 2], "children": [
                    {"kind": 47, "command": ["then"]}
                ]},
                {"kind": 10, "command": []},
                {"kind": 47, "command": ["after"]}
            ]
        }"#;
        let reaction = reaction_from_str(json).unwrap();
        assert!(reaction.block_hero);
        assert_eq!(reaction.len(), 3);
        let root_children = reaction.children(reaction.root());
        assert_eq!(root_children.len(), 2);
        assert_eq!(
            reaction.command(root_children[0]).unwrap().kind(),
            CommandKind::If
        );
    }

    #[test]
    fn test_unknown_kinds_are_skipped() {
        let json = r#"{"c": [
            {"kind": 999, "command": [], "children": [{"kind": 47, "command": ["x"]}]},
            {"kind": 47, "command": ["kept"]}
        ]}"#;
        let reaction = reaction_from_str(json).unwrap();
        assert_eq!(reaction.len(), 1);
    }

    #[test]
    fn test_event_from_str() {
        let json = r#"{
            "sys": true,
            "id": 1,
            "p": [{"id": 0, "v": {"k": 7, "v": 13}}, {"id": 1, "v": {"k": 2}}],
            "r": {"1": {"c": [{"kind": 47, "command": ["hi"]}]}, "2": {"c": []}}
        }"#;
        let event = event_from_str(json).unwrap();
        assert!(event.is_system);
        assert_eq!(event.id, 1);
        assert_eq!(event.parameters[&0], DynamicValue::Keyboard(13));
        assert_eq!(event.parameters[&1], DynamicValue::Default);
        assert_eq!(event.reactions.len(), 2);
        assert_eq!(event.reactions[&1].len(), 1);
        assert!(event.reactions[&2].is_empty());
    }

    #[test]
    fn test_event_rejects_bad_state_keys() {
        let json = r#"{"id": 1, "r": {"first": {"c": []}}}"#;
        assert!(matches!(
            event_from_str(json),
            Err(Error::BadStateKey(key)) if key == "first"
        ));
    }

    #[test]
    fn test_common_reactions_from_str() {
        let json = r#"[{
            "id": 3,
            "p": [{"id": 1, "v": {"k": 3, "v": 10}}],
            "r": {"c": [{"kind": 47, "command": ["body"]}]}
        }]"#;
        let table = common_reactions_from_str(json).unwrap();
        let common = &table[&3];
        assert_eq!(common.default_parameters[&1], DynamicValue::Number(10));
        assert_eq!(common.reaction.len(), 1);
    }

    #[test]
    fn test_event_defs_from_str() {
        let json = r#"[{"id": 4, "p": [{"id": 0, "v": {"k": 5, "v": true}}]}]"#;
        let table = event_defs_from_str(json).unwrap();
        assert_eq!(table[&4].defaults[&0], DynamicValue::Switch(true));
    }
}
