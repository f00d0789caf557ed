//! Troop battle reactions
//!
//! A troop definition attaches reactions that fire during its battles, each
//! gated by simple session conditions and a firing frequency. The runner
//! evaluates eligibility every battle tick and drives the spawned
//! interpreters alongside the battle scene.

use crate::context::{ExecutionContext, Scope};
use crate::identity::ObjectId;
use crate::interpreter::Interpreter;
use crate::reaction::Reaction;
use crate::session::BattleSession;
use std::collections::HashSet;
use std::sync::Arc;

/// How often a troop reaction may fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    /// Every tick its conditions hold, once the previous run ended
    Always,
    /// At most once per battle
    OneTime,
}

/// A condition gating one troop reaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TroopCondition {
    /// The battle is on exactly this turn
    TurnIs(u64),
    /// The battle reached this turn
    TurnAtLeast(u64),
}

impl TroopCondition {
    pub fn holds(&self, battle: &BattleSession) -> bool {
        match self {
            TroopCondition::TurnIs(turn) => battle.turn == *turn,
            TroopCondition::TurnAtLeast(turn) => battle.turn >= *turn,
        }
    }
}

/// One reaction attached to a troop definition
#[derive(Debug, Clone)]
pub struct TroopReactionDef {
    pub id: i64,
    pub frequency: Frequency,
    /// All conditions must hold for the reaction to fire
    pub conditions: Vec<TroopCondition>,
    pub reaction: Arc<Reaction>,
}

/// Drives the battle reactions of one troop for the length of a battle
#[derive(Debug, Default)]
pub struct TroopReactionRunner {
    fired: HashSet<i64>,
    running: Vec<(i64, Interpreter)>,
}

impl TroopReactionRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn running(&self) -> usize {
        self.running.len()
    }

    /// Fire eligible reactions and tick the ones in flight
    ///
    /// A no-op outside a battle. A reaction never overlaps itself; `OneTime`
    /// ones additionally stay fired for the rest of the battle.
    pub fn tick(&mut self, defs: &[TroopReactionDef], ctx: &mut ExecutionContext) {
        let Some(battle) = ctx.game.battle.as_ref() else {
            return;
        };
        for def in defs {
            if self.running.iter().any(|(id, _)| *id == def.id) {
                continue;
            }
            if def.frequency == Frequency::OneTime && self.fired.contains(&def.id) {
                continue;
            }
            if !def.conditions.iter().all(|c| c.holds(battle)) {
                continue;
            }
            self.fired.insert(def.id);
            let scope = Scope::new(ObjectId::HERO, 1);
            self.running
                .push((def.id, Interpreter::new(def.reaction.clone(), scope)));
        }
        let mut index = 0;
        while index < self.running.len() {
            if self.running[index].1.tick(ctx).is_done() {
                self.running.remove(index);
            } else {
                index += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataTables;
    use crate::platform::RecordingPlatform;
    use crate::reaction::ScriptNode;
    use crate::rng::GameRng;
    use crate::scene::Scene;
    use crate::session::Game;
    use crate::value::Value;
    use serde_json::json;

    fn add_var_reaction(index: i64) -> Arc<Reaction> {
        let script = vec![ScriptNode::new(
            2,
            vec![
                json!(3),
                json!(index),
                json!(false),
                json!(1),
                json!(0),
                json!(3),
                json!(1),
            ],
        )];
        Arc::new(Reaction::from_nodes(false, &script).unwrap())
    }

    #[test]
    fn test_one_time_reaction_fires_once_per_battle() {
        let defs = vec![
            TroopReactionDef {
                id: 1,
                frequency: Frequency::OneTime,
                conditions: vec![TroopCondition::TurnAtLeast(1)],
                reaction: add_var_reaction(1),
            },
            TroopReactionDef {
                id: 2,
                frequency: Frequency::Always,
                conditions: vec![TroopCondition::TurnIs(2)],
                reaction: add_var_reaction(2),
            },
        ];
        let mut game = Game::new(10);
        game.battle = Some(BattleSession::new(1));
        game.battle.as_mut().unwrap().turn = 1;
        let data = DataTables::new();
        let mut scene = Scene::new();
        let mut platform = RecordingPlatform::new();
        let mut rng = GameRng::new(3);
        let mut runner = TroopReactionRunner::new();

        for turn in [1, 1, 2, 2] {
            game.battle.as_mut().unwrap().turn = turn;
            let mut ctx = ExecutionContext {
                game: &mut game,
                data: &data,
                scene: &mut scene,
                platform: &mut platform,
                rng: &mut rng,
                now_ms: 16,
                delta_ms: 16,
            };
            runner.tick(&defs, &mut ctx);
        }
        // one-time fired on the first eligible tick only
        assert_eq!(game.variable(1), Value::Int(1));
        // always-frequency fired on both turn-2 ticks
        assert_eq!(game.variable(2), Value::Int(2));
    }

    #[test]
    fn test_runner_idles_outside_battle() {
        let defs = vec![TroopReactionDef {
            id: 1,
            frequency: Frequency::Always,
            conditions: Vec::new(),
            reaction: add_var_reaction(1),
        }];
        let mut game = Game::new(10);
        let data = DataTables::new();
        let mut scene = Scene::new();
        let mut platform = RecordingPlatform::new();
        let mut rng = GameRng::new(3);
        let mut ctx = ExecutionContext {
            game: &mut game,
            data: &data,
            scene: &mut scene,
            platform: &mut platform,
            rng: &mut rng,
            now_ms: 16,
            delta_ms: 16,
        };
        let mut runner = TroopReactionRunner::new();
        runner.tick(&defs, &mut ctx);
        assert_eq!(runner.running(), 0);
        assert_eq!(game.variable(1), Value::Null);
    }
}
