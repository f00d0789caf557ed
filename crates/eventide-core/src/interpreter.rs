//! The multi-tick reaction interpreter
//!
//! One interpreter owns a cursor into a reaction tree and runs it one
//! command at a time. A command that yields [`Outcome::Pending`] suspends
//! the walk until the next tick; parallel commands detach from the walk and
//! keep ticking on the side while the cursor moves on.

use crate::command::{CommandKind, CommandState, Outcome};
use crate::context::{ExecutionContext, InputEvent, Scope};
use crate::error::EngineError;
use crate::identity::NodeId;
use crate::reaction::Reaction;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Where an interpreter stands after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    /// Walked off the end of the tree
    Finished,
    /// Halted by a command or by the host
    Stopped,
}

impl Status {
    pub fn is_done(&self) -> bool {
        !matches!(self, Status::Running)
    }
}

/// A running instance of one reaction
#[derive(Debug)]
pub struct Interpreter {
    reaction: Arc<Reaction>,
    pub scope: Scope,
    cursor: Option<NodeId>,
    /// Whether the cursor node already went through `initialize`
    initialized: bool,
    states: HashMap<NodeId, CommandState>,
    /// Detached commands still ticking outside the walk
    parallel: Vec<NodeId>,
    status: Status,
}

impl Interpreter {
    pub fn new(reaction: Arc<Reaction>, scope: Scope) -> Self {
        let cursor = reaction.children(reaction.root()).first().copied();
        Self {
            reaction,
            scope,
            cursor,
            initialized: false,
            states: HashMap::new(),
            parallel: Vec::new(),
            status: Status::Running,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Whether this run freezes hero movement while it lasts
    pub fn blocks_hero(&self) -> bool {
        self.reaction.block_hero
    }

    /// Forward an input event to the currently waiting command
    pub fn push_input(&mut self, event: InputEvent) {
        self.scope.input.push(event);
    }

    /// Halt without running further commands
    pub fn stop(&mut self) {
        self.status = Status::Stopped;
        self.cursor = None;
        self.states.clear();
        self.parallel.clear();
    }

    /// Run as many commands as resolve this tick
    pub fn tick(&mut self, ctx: &mut ExecutionContext) -> Status {
        if self.status.is_done() {
            return self.status;
        }
        self.tick_parallel(ctx);
        let reaction = Arc::clone(&self.reaction);
        // bound the work of degenerate scripts to one pass per node per tick
        let mut budget = reaction.len().max(1) * 8;
        while let Some(node) = self.cursor {
            if budget == 0 {
                break;
            }
            budget -= 1;
            let Some(command) = reaction.command(node) else {
                break;
            };
            if !self.initialized {
                let state = command.initialize(ctx, &self.scope);
                self.states.insert(node, state);
                self.initialized = true;
            }
            let mut state = self.states.remove(&node).unwrap_or(CommandState::None);
            let outcome = command.update(&mut state, ctx, &mut self.scope);
            self.states.insert(node, state);
            match outcome {
                Outcome::Pending => {
                    if command.parallel() {
                        self.parallel.push(node);
                        self.advance(node, 1);
                        continue;
                    }
                    return self.status;
                }
                Outcome::Enter => match reaction.children(node).first() {
                    Some(&first) => {
                        self.cursor = Some(first);
                        self.initialized = false;
                    }
                    None => self.exit_block(node),
                },
                Outcome::Advance(n) => {
                    self.states.remove(&node);
                    self.advance(node, n);
                }
                Outcome::Jump(label) => match reaction.label(&label) {
                    Some(target) => {
                        let keep: HashSet<NodeId> = self.parallel.iter().copied().collect();
                        self.states.retain(|id, _| keep.contains(id));
                        self.cursor = Some(target);
                        self.initialized = false;
                    }
                    None => {
                        ctx.report(EngineError::UnknownLabel(label));
                        self.states.remove(&node);
                        self.advance(node, 1);
                    }
                },
                Outcome::Break => {
                    self.states.remove(&node);
                    match self.enclosing_while(node) {
                        Some(loop_node) => {
                            self.states.remove(&loop_node);
                            self.advance(loop_node, 1);
                        }
                        None => self.advance(node, 1),
                    }
                }
                Outcome::Stop => {
                    self.stop();
                    return self.status;
                }
            }
        }
        if matches!(self.status, Status::Running)
            && self.cursor.is_none()
            && self.parallel.is_empty()
        {
            self.status = Status::Finished;
        }
        self.status
    }

    fn tick_parallel(&mut self, ctx: &mut ExecutionContext) {
        let reaction = Arc::clone(&self.reaction);
        let running = std::mem::take(&mut self.parallel);
        for node in running {
            let Some(command) = reaction.command(node) else {
                continue;
            };
            let mut state = self.states.remove(&node).unwrap_or(CommandState::None);
            let outcome = command.update(&mut state, ctx, &mut self.scope);
            if outcome == Outcome::Pending {
                self.states.insert(node, state);
                self.parallel.push(node);
            }
        }
    }

    /// Move `n` sibling slots past `node`, folding block ends upward
    fn advance(&mut self, node: NodeId, n: usize) {
        let Some((parent, index)) = self.reaction.position_in_parent(node) else {
            self.cursor = None;
            return;
        };
        let siblings = self.reaction.children(parent);
        match siblings.get(index + n) {
            Some(&next) => {
                self.cursor = Some(next);
                self.initialized = false;
            }
            None => self.exit_block(parent),
        }
    }

    /// Leave the block whose owner is `parent`, per the owner's kind
    fn exit_block(&mut self, parent: NodeId) {
        if parent == self.reaction.root() {
            self.cursor = None;
            return;
        }
        let kind = self.reaction.command(parent).map(|c| c.kind());
        match kind {
            Some(CommandKind::While) => {
                // back to the loop head for another condition test
                self.cursor = Some(parent);
                self.initialized = false;
            }
            Some(CommandKind::If | CommandKind::IfWin | CommandKind::IfLose) => {
                let skip = 1 + self.trailing_siblings(parent, CommandKind::Else);
                self.states.remove(&parent);
                self.advance(parent, skip);
            }
            Some(CommandKind::Choice) => {
                let skip = 1 + self.trailing_siblings(parent, CommandKind::Choice);
                self.states.remove(&parent);
                self.advance(parent, skip);
            }
            _ => {
                self.states.remove(&parent);
                self.advance(parent, 1);
            }
        }
    }

    /// How many consecutive siblings of `kind` follow `node`
    fn trailing_siblings(&self, node: NodeId, kind: CommandKind) -> usize {
        let Some((parent, index)) = self.reaction.position_in_parent(node) else {
            return 0;
        };
        self.reaction.children(parent)[index + 1..]
            .iter()
            .take_while(|&&sibling| {
                self.reaction
                    .command(sibling)
                    .is_some_and(|c| c.kind() == kind)
            })
            .count()
    }

    /// The nearest enclosing `While`, when one exists
    fn enclosing_while(&self, node: NodeId) -> Option<NodeId> {
        let mut current = self.reaction.parent(node)?;
        while current != self.reaction.root() {
            if self
                .reaction
                .command(current)
                .is_some_and(|c| c.kind() == CommandKind::While)
            {
                return Some(current);
            }
            current = self.reaction.parent(current)?;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataTables;
    use crate::identity::ObjectId;
    use crate::platform::RecordingPlatform;
    use crate::reaction::ScriptNode;
    use crate::rng::GameRng;
    use crate::scene::Scene;
    use crate::session::Game;
    use crate::value::Value;
    use serde_json::json;

    struct World {
        game: Game,
        data: DataTables,
        scene: Scene,
        platform: RecordingPlatform,
        rng: GameRng,
        now_ms: u64,
    }

    impl World {
        fn new() -> Self {
            Self {
                game: Game::new(20),
                data: DataTables::new(),
                scene: Scene::new(),
                platform: RecordingPlatform::new(),
                rng: GameRng::new(7),
                now_ms: 0,
            }
        }

        fn tick(&mut self, interpreter: &mut Interpreter) -> Status {
            self.now_ms += 16;
            let mut ctx = ExecutionContext {
                game: &mut self.game,
                data: &self.data,
                scene: &mut self.scene,
                platform: &mut self.platform,
                rng: &mut self.rng,
                now_ms: self.now_ms,
                delta_ms: 16,
            };
            interpreter.tick(&mut ctx)
        }
    }

    fn run(script: Vec<ScriptNode>) -> Interpreter {
        let reaction = Reaction::from_nodes(false, &script).unwrap();
        Interpreter::new(Arc::new(reaction), Scope::new(ObjectId::HERO, 1))
    }

    /// kind 2 tokens: set variable `index` to `value`
    fn set_var(index: i64, value: i64) -> ScriptNode {
        ScriptNode::new(
            2,
            vec![
                json!(3),
                json!(index),
                json!(false),
                json!(0),
                json!(0),
                json!(3),
                json!(value),
            ],
        )
    }

    /// kind 2 tokens: add `value` to variable `index`
    fn add_var(index: i64, value: i64) -> ScriptNode {
        ScriptNode::new(
            2,
            vec![
                json!(3),
                json!(index),
                json!(false),
                json!(1),
                json!(0),
                json!(3),
                json!(value),
            ],
        )
    }

    /// kind 8 tokens: if variable `index` equals `value`
    fn if_var_equals(index: i64, value: i64) -> ScriptNode {
        ScriptNode::new(
            8,
            vec![json!(8), json!(index), json!(0), json!(3), json!(value)],
        )
    }

    #[test]
    fn test_straight_line_finishes_in_one_tick() {
        let mut world = World::new();
        let mut interpreter = run(vec![set_var(1, 10), add_var(1, 5)]);
        assert_eq!(world.tick(&mut interpreter), Status::Finished);
        assert_eq!(world.game.variable(1), Value::Int(15));
    }

    #[test]
    fn test_empty_reaction_finishes_immediately() {
        let mut world = World::new();
        let mut interpreter = run(Vec::new());
        assert_eq!(world.tick(&mut interpreter), Status::Finished);
    }

    #[test]
    fn test_if_else_takes_one_branch() {
        let script = vec![
            set_var(1, 2),
            if_var_equals(1, 2).with_children(vec![set_var(2, 100)]),
            ScriptNode::new(9, vec![]).with_children(vec![set_var(2, 200)]),
            ScriptNode::new(10, vec![]),
            if_var_equals(1, 3).with_children(vec![set_var(3, 100)]),
            ScriptNode::new(9, vec![]).with_children(vec![set_var(3, 200)]),
            ScriptNode::new(10, vec![]),
        ];
        let mut world = World::new();
        let mut interpreter = run(script);
        assert_eq!(world.tick(&mut interpreter), Status::Finished);
        assert_eq!(world.game.variable(2), Value::Int(100));
        assert_eq!(world.game.variable(3), Value::Int(200));
    }

    #[test]
    fn test_while_loops_until_condition_fails() {
        // while var1 < 4 { var1 += 1; var2 += 10 }
        let script = vec![
            ScriptNode::new(4, vec![json!(8), json!(1), json!(5), json!(3), json!(4)])
                .with_children(vec![add_var(1, 1), add_var(2, 10)]),
            ScriptNode::new(5, vec![]),
        ];
        let mut world = World::new();
        let mut interpreter = run(script);
        assert_eq!(world.tick(&mut interpreter), Status::Finished);
        assert_eq!(world.game.variable(1), Value::Int(4));
        assert_eq!(world.game.variable(2), Value::Int(40));
    }

    #[test]
    fn test_while_break_exits_the_loop() {
        // while 0 == 0 { var1 += 1; if var1 == 3 { break } }
        let script = vec![
            ScriptNode::new(4, vec![json!(3), json!(0), json!(0), json!(3), json!(0)])
                .with_children(vec![
                    add_var(1, 1),
                    if_var_equals(1, 3).with_children(vec![ScriptNode::new(6, vec![])]),
                    ScriptNode::new(10, vec![]),
                ]),
            ScriptNode::new(5, vec![]),
            set_var(2, 1),
        ];
        let mut world = World::new();
        let mut interpreter = run(script);
        while world.tick(&mut interpreter) == Status::Running {}
        assert_eq!(world.game.variable(1), Value::Int(3));
        assert_eq!(world.game.variable(2), Value::Int(1));
    }

    #[test]
    fn test_wait_suspends_across_ticks() {
        // wait 0.1s then set var1
        let script = vec![
            ScriptNode::new(21, vec![json!(4), json!(0.1)]),
            set_var(1, 1),
        ];
        let mut world = World::new();
        let mut interpreter = run(script);
        assert_eq!(world.tick(&mut interpreter), Status::Running);
        assert_eq!(world.game.variable(1), Value::Null);
        let mut ticks = 1;
        while world.tick(&mut interpreter) == Status::Running {
            ticks += 1;
        }
        assert_eq!(world.game.variable(1), Value::Int(1));
        // 100ms at 16ms per tick
        assert!(ticks >= 6);
    }

    #[test]
    fn test_wait_resumption_does_not_rerun_earlier_commands() {
        let script = vec![
            add_var(1, 1),
            ScriptNode::new(21, vec![json!(4), json!(0.1)]),
            add_var(2, 1),
        ];
        let mut world = World::new();
        let mut interpreter = run(script);
        while world.tick(&mut interpreter) == Status::Running {}
        assert_eq!(world.game.variable(1), Value::Int(1));
        assert_eq!(world.game.variable(2), Value::Int(1));
    }

    #[test]
    fn test_jump_to_label_skips_commands() {
        let script = vec![
            ScriptNode::new(46, vec![json!(6), json!("end")]),
            set_var(1, 1),
            ScriptNode::new(45, vec![json!(6), json!("end")]),
            set_var(2, 1),
        ];
        let mut world = World::new();
        let mut interpreter = run(script);
        assert_eq!(world.tick(&mut interpreter), Status::Finished);
        assert_eq!(world.game.variable(1), Value::Null);
        assert_eq!(world.game.variable(2), Value::Int(1));
    }

    #[test]
    fn test_jump_to_unknown_label_reports_and_continues() {
        let script = vec![
            ScriptNode::new(46, vec![json!(6), json!("nowhere")]),
            set_var(1, 1),
        ];
        let mut world = World::new();
        let mut interpreter = run(script);
        assert_eq!(world.tick(&mut interpreter), Status::Finished);
        assert_eq!(world.game.variable(1), Value::Int(1));
        assert_eq!(world.platform.errors.len(), 1);
    }

    #[test]
    fn test_stop_reaction_halts_the_walk() {
        let script = vec![set_var(1, 1), ScriptNode::new(41, vec![]), set_var(2, 1)];
        let mut world = World::new();
        let mut interpreter = run(script);
        assert_eq!(world.tick(&mut interpreter), Status::Stopped);
        assert_eq!(world.game.variable(1), Value::Int(1));
        assert_eq!(world.game.variable(2), Value::Null);
    }

    #[test]
    fn test_choice_branches_route_on_selection() {
        // display choice { 1: var1=10, 2: var1=20 } then var2=1
        let script = vec![
            ScriptNode::new(30, vec![json!(2), json!(6), json!("yes"), json!(6), json!("no")]),
            ScriptNode::new(31, vec![json!(1)]).with_children(vec![set_var(1, 10)]),
            ScriptNode::new(31, vec![json!(2)]).with_children(vec![set_var(1, 20)]),
            ScriptNode::new(32, vec![]),
            set_var(2, 1),
        ];
        let mut world = World::new();
        let mut interpreter = run(script);
        assert_eq!(world.tick(&mut interpreter), Status::Running);
        interpreter.push_input(InputEvent::Choice(2));
        assert_eq!(world.tick(&mut interpreter), Status::Finished);
        assert_eq!(world.game.variable(1), Value::Int(20));
        assert_eq!(world.game.variable(2), Value::Int(1));
        assert_eq!(world.platform.count("open_choices yes|no"), 1);
        assert_eq!(world.platform.count("close_choices"), 1);
    }

    #[test]
    fn test_parallel_move_lets_the_walk_continue() {
        // move hero east without waiting, then set var1 immediately
        let script = vec![
            ScriptNode::new(
                20,
                vec![json!(3), json!(-1), json!(false), json!(3), json!(1.0)],
            ),
            set_var(1, 1),
        ];
        let mut world = World::new();
        let mut interpreter = run(script);
        let status = world.tick(&mut interpreter);
        assert_eq!(world.game.variable(1), Value::Int(1));
        // the move itself is still in flight
        assert_eq!(status, Status::Running);
        while world.tick(&mut interpreter) == Status::Running {}
        let hero = world.scene.hero().unwrap().position;
        assert!((hero.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_blocking_move_holds_the_walk() {
        let script = vec![
            ScriptNode::new(
                20,
                vec![json!(3), json!(-1), json!(true), json!(3), json!(1.0)],
            ),
            set_var(1, 1),
        ];
        let mut world = World::new();
        let mut interpreter = run(script);
        assert_eq!(world.tick(&mut interpreter), Status::Running);
        assert_eq!(world.game.variable(1), Value::Null);
        while world.tick(&mut interpreter) == Status::Running {}
        assert_eq!(world.game.variable(1), Value::Int(1));
    }
}
