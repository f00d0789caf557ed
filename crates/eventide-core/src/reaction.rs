//! Decoded reaction trees
//!
//! A reaction is the command tree attached to one state of an event. Raw
//! scripts arrive as nested kind/token nodes; decoding flattens them into an
//! arena so interpreters can walk by index without borrowing subtrees.

use crate::command::EventCommand;
use crate::error::Result;
use crate::identity::NodeId;
use serde_json::Value as Json;

/// One raw script node before decoding
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptNode {
    pub kind: i64,
    pub tokens: Vec<Json>,
    pub children: Vec<ScriptNode>,
}

impl ScriptNode {
    pub fn new(kind: i64, tokens: Vec<Json>) -> Self {
        Self {
            kind,
            tokens,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<ScriptNode>) -> Self {
        self.children = children;
        self
    }
}

/// One arena slot of a decoded reaction
#[derive(Debug)]
pub struct Node {
    /// `None` only for the root slot
    pub command: Option<EventCommand>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// A decoded, immutable command tree
#[derive(Debug)]
pub struct Reaction {
    nodes: Vec<Node>,
    labels: Vec<(String, NodeId)>,
    /// Whether running this reaction freezes hero movement
    pub block_hero: bool,
}

impl Reaction {
    /// A reaction with no commands, finishing on its first tick
    pub fn empty() -> Self {
        Self {
            nodes: vec![Node {
                command: None,
                parent: None,
                children: Vec::new(),
            }],
            labels: Vec::new(),
            block_hero: false,
        }
    }

    /// Decode a raw script into an arena-backed reaction
    ///
    /// Block markers and unknown command kinds vanish together with their
    /// children. Labels are recorded during the walk so jumps resolve in
    /// constant time.
    pub fn from_nodes(block_hero: bool, script: &[ScriptNode]) -> Result<Self> {
        let mut reaction = Reaction::empty();
        reaction.block_hero = block_hero;
        for node in script {
            reaction.attach(NodeId::default(), node)?;
        }
        Ok(reaction)
    }

    fn attach(&mut self, parent: NodeId, script: &ScriptNode) -> Result<()> {
        let Some(command) = EventCommand::decode(script.kind, &script.tokens)? else {
            return Ok(());
        };
        let id = self.nodes.len();
        if let Some(name) = command.label_name() {
            self.labels.push((name, id));
        }
        self.nodes.push(Node {
            command: Some(command),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        for child in &script.children {
            self.attach(id, child)?;
        }
        Ok(())
    }

    /// The root slot, which carries no command
    pub fn root(&self) -> NodeId {
        0
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn command(&self, id: NodeId) -> Option<&EventCommand> {
        self.nodes[id].command.as_ref()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// How many commands decoded into this tree, root excluded
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Where a recorded label points
    pub fn label(&self, name: &str) -> Option<NodeId> {
        self.labels
            .iter()
            .find(|(label, _)| label == name)
            .map(|(_, id)| *id)
    }

    /// A node's parent and its index among that parent's children
    pub fn position_in_parent(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.nodes[id].parent?;
        let index = self.nodes[parent].children.iter().position(|c| *c == id)?;
        Some((parent, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandKind;
    use serde_json::json;

    fn comment(text: &str) -> ScriptNode {
        ScriptNode::new(47, vec![json!(text)])
    }

    #[test]
    fn test_tree_construction() {
        // while { comment; break } comment
        let script = vec![
            ScriptNode::new(4, vec![json!(3), json!(1), json!(0), json!(3), json!(1)])
                .with_children(vec![comment("inside"), ScriptNode::new(6, vec![])]),
            ScriptNode::new(5, vec![]),
            comment("after"),
        ];
        let reaction = Reaction::from_nodes(false, &script).unwrap();
        assert_eq!(reaction.len(), 4);
        let root_children = reaction.children(reaction.root());
        assert_eq!(root_children.len(), 2);
        let while_id = root_children[0];
        assert_eq!(
            reaction.command(while_id).unwrap().kind(),
            CommandKind::While
        );
        assert_eq!(reaction.children(while_id).len(), 2);
        assert_eq!(reaction.position_in_parent(root_children[1]), Some((0, 1)));
    }

    #[test]
    fn test_unknown_kinds_drop_their_children() {
        let script = vec![
            ScriptNode::new(999, vec![]).with_children(vec![comment("orphan")]),
            comment("kept"),
        ];
        let reaction = Reaction::from_nodes(false, &script).unwrap();
        assert_eq!(reaction.len(), 1);
    }

    #[test]
    fn test_labels_recorded() {
        let script = vec![
            ScriptNode::new(45, vec![json!(6), json!("top")]),
            comment("x"),
        ];
        let reaction = Reaction::from_nodes(false, &script).unwrap();
        assert_eq!(reaction.label("top"), Some(1));
        assert_eq!(reaction.label("missing"), None);
    }

    #[test]
    fn test_empty_reaction() {
        let reaction = Reaction::empty();
        assert!(reaction.is_empty());
        assert!(reaction.command(reaction.root()).is_none());
    }
}
