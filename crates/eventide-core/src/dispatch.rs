//! Event dispatch across the scene
//!
//! Sending an event walks the scene in scan order, matches each candidate's
//! registrations and spawns one interpreter per receiving object. The router
//! owns every activation spawned this way and drives them tick by tick.

use crate::context::{ExecutionContext, InputEvent, Scope};
use crate::data::DataTables;
use crate::dynamic::DynamicValue;
use crate::event::bound_parameters;
use crate::identity::{EventId, ObjectId, StateId};
use crate::interpreter::{Interpreter, Status};
use crate::scene::Scene;
use indexmap::IndexMap;

/// Who an event is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Every object in the scene
    All,
    /// Objects colliding with the sender-anchored detection boxes
    Detection(i64),
    /// One object by raw id; `-1` is the sender, `0` the hero
    Specific(i64),
}

/// One reaction spawned by a received event
#[derive(Debug)]
struct Activation {
    object: ObjectId,
    /// State the reaction was bound to; a state change invalidates the run
    state_id: StateId,
    interpreter: Interpreter,
    holds_hero: bool,
}

/// Owns and drives every interpreter spawned by event dispatch
#[derive(Debug, Default)]
pub struct EventRouter {
    activations: Vec<Activation>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn running(&self) -> usize {
        self.activations.len()
    }

    /// Forward an input event to every running activation
    pub fn push_input(&mut self, event: InputEvent) {
        for activation in &mut self.activations {
            activation.interpreter.push_input(event.clone());
        }
    }

    /// Dispatch an event, spawning interpreters on every receiver
    ///
    /// Returns how many objects received it. Objects without a matching
    /// registration, or without a reaction for their current state, skip
    /// silently.
    #[allow(clippy::too_many_arguments)]
    pub fn send_event(
        &mut self,
        data: &DataTables,
        scene: &Scene,
        sender: Option<ObjectId>,
        target: Target,
        is_system: bool,
        event_id: EventId,
        parameters: &IndexMap<usize, DynamicValue>,
        sender_no_receiver: bool,
        only_the_closest: bool,
    ) -> usize {
        let mut candidates: Vec<ObjectId> = match target {
            Target::All => scene.scan(),
            Target::Detection(detection_id) => {
                let Some(detection) = data.detection(detection_id) else {
                    return 0;
                };
                let Some(anchor) = sender.and_then(|s| scene.object(s)).map(|o| o.position)
                else {
                    return 0;
                };
                scene
                    .scan()
                    .into_iter()
                    .filter(|id| {
                        scene
                            .object(*id)
                            .is_some_and(|o| detection.check_collision(&anchor, &o.position))
                    })
                    .collect()
            }
            Target::Specific(raw) => {
                let resolved = match raw {
                    -1 => sender,
                    0 => Some(ObjectId::HERO),
                    other => scene.find_raw(other),
                };
                resolved.into_iter().collect()
            }
        };
        if sender_no_receiver {
            if let Some(sender) = sender {
                candidates.retain(|id| *id != sender);
            }
        }

        let receiving: Vec<ObjectId> = candidates
            .into_iter()
            .filter(|id| self.would_receive(data, scene, *id, is_system, event_id, parameters))
            .collect();

        let chosen: Vec<ObjectId> = if only_the_closest {
            let anchor = sender.and_then(|s| scene.object(s)).map(|o| o.position);
            match anchor {
                Some(anchor) => {
                    let mut best: Option<(ObjectId, f64)> = None;
                    for id in receiving {
                        let Some(object) = scene.object(id) else {
                            continue;
                        };
                        let distance = anchor.distance(&object.position);
                        // ties keep the earliest in scan order
                        if best.map_or(true, |(_, d)| distance < d) {
                            best = Some((id, distance));
                        }
                    }
                    best.map(|(id, _)| id).into_iter().collect()
                }
                None => receiving.into_iter().take(1).collect(),
            }
        } else {
            receiving
        };

        let mut spawned = 0;
        for id in chosen {
            if self.receive(data, scene, id, is_system, event_id, parameters) {
                spawned += 1;
            }
        }
        spawned
    }

    fn would_receive(
        &self,
        data: &DataTables,
        scene: &Scene,
        id: ObjectId,
        is_system: bool,
        event_id: EventId,
        parameters: &IndexMap<usize, DynamicValue>,
    ) -> bool {
        self.matching_reaction(data, scene, id, is_system, event_id, parameters)
            .is_some()
    }

    /// Find the registration and state-bound reaction an object would run
    #[allow(clippy::type_complexity)]
    fn matching_reaction<'s>(
        &self,
        _data: &DataTables,
        scene: &'s Scene,
        id: ObjectId,
        is_system: bool,
        event_id: EventId,
        parameters: &IndexMap<usize, DynamicValue>,
    ) -> Option<(&'s crate::event::Event, StateId)> {
        let object = scene.object(id)?;
        let state_id = object.current_state()?;
        let event = object
            .events
            .get(&event_id)?
            .iter()
            .find(|e| e.matches(is_system, event_id, parameters))?;
        event.reactions.get(&state_id)?;
        Some((event, state_id))
    }

    fn receive(
        &mut self,
        data: &DataTables,
        scene: &Scene,
        id: ObjectId,
        is_system: bool,
        event_id: EventId,
        parameters: &IndexMap<usize, DynamicValue>,
    ) -> bool {
        let Some((event, state_id)) =
            self.matching_reaction(data, scene, id, is_system, event_id, parameters)
        else {
            return false;
        };
        let Some(reaction) = event.reactions.get(&state_id) else {
            return false;
        };
        let empty = IndexMap::new();
        let defaults = data
            .event_def(event_id)
            .map(|def| &def.defaults)
            .unwrap_or(&empty);
        let bound = bound_parameters(defaults, &event.parameters, parameters);
        let scope = Scope::new(id, state_id).with_parameters(bound);
        let interpreter = Interpreter::new(reaction.clone(), scope);
        self.activations.push(Activation {
            object: id,
            state_id,
            interpreter,
            holds_hero: false,
        });
        true
    }

    /// Tick every activation in spawn order, retiring finished and
    /// invalidated ones
    ///
    /// An activation is invalidated when its object left the scene or
    /// switched away from the state the reaction was bound to.
    pub fn tick(&mut self, ctx: &mut ExecutionContext) {
        let mut index = 0;
        while index < self.activations.len() {
            let activation = &mut self.activations[index];
            let valid = ctx
                .scene
                .object(activation.object)
                .and_then(|o| o.current_state())
                == Some(activation.state_id);
            if !valid {
                activation.interpreter.stop();
            } else {
                if activation.interpreter.blocks_hero() && !activation.holds_hero {
                    ctx.game.block_hero(true);
                    activation.holds_hero = true;
                }
                activation.interpreter.tick(ctx);
            }
            if self.activations[index].interpreter.status().is_done() {
                let retired = self.activations.remove(index);
                if retired.holds_hero {
                    ctx.game.block_hero(false);
                }
            } else {
                index += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Detection, DetectionBox, Localized};
    use crate::event::Event;
    use crate::object::{MapObject, Position};
    use crate::platform::RecordingPlatform;
    use crate::reaction::{Reaction, ScriptNode};
    use crate::rng::GameRng;
    use crate::session::Game;
    use crate::value::Value;
    use serde_json::json;
    use std::sync::Arc;

    /// reaction body: set variable `index` to `value`
    fn set_var_reaction(index: i64, value: i64) -> Arc<Reaction> {
        let script = vec![ScriptNode::new(
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
        )];
        Arc::new(Reaction::from_nodes(false, &script).unwrap())
    }

    /// reaction body: set variable `index` from parameter 1
    fn set_var_from_parameter(index: i64) -> Arc<Reaction> {
        let script = vec![ScriptNode::new(
            2,
            vec![
                json!(3),
                json!(index),
                json!(false),
                json!(0),
                json!(0),
                json!(9),
                json!(1),
            ],
        )];
        Arc::new(Reaction::from_nodes(false, &script).unwrap())
    }

    fn listener(id: i64, position: Position, event_id: EventId, reaction: Arc<Reaction>) -> MapObject {
        let mut object = MapObject::new(ObjectId::new(id), format!("listener-{}", id));
        object.position = position;
        let mut event = Event::new(false, event_id);
        event.reactions.insert(1, reaction);
        object.add_event(event);
        object
    }

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
                rng: GameRng::new(11),
                now_ms: 0,
            }
        }

        fn tick(&mut self, router: &mut EventRouter) {
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
            router.tick(&mut ctx);
        }
    }

    #[test]
    fn test_broadcast_reaches_every_matching_object() {
        let mut world = World::new();
        world
            .scene
            .place(listener(10, Position::new(1.0, 0.0, 0.0), 4, set_var_reaction(1, 7)), 0);
        world
            .scene
            .place(listener(11, Position::new(2.0, 0.0, 0.0), 4, set_var_reaction(2, 8)), 0);
        // registered on a different event id, stays silent
        world
            .scene
            .place(listener(12, Position::new(3.0, 0.0, 0.0), 9, set_var_reaction(3, 9)), 0);

        let mut router = EventRouter::new();
        let spawned = router.send_event(
            &world.data,
            &world.scene,
            Some(ObjectId::HERO),
            Target::All,
            false,
            4,
            &IndexMap::new(),
            false,
            false,
        );
        assert_eq!(spawned, 2);
        world.tick(&mut router);
        assert_eq!(world.game.variable(1), Value::Int(7));
        assert_eq!(world.game.variable(2), Value::Int(8));
        assert_eq!(world.game.variable(3), Value::Null);
        assert_eq!(router.running(), 0);
    }

    #[test]
    fn test_sent_parameters_flow_into_the_reaction() {
        let mut world = World::new();
        world.scene.place(
            listener(10, Position::new(0.0, 0.0, 0.0), 4, set_var_from_parameter(1)),
            0,
        );
        let mut router = EventRouter::new();
        let mut parameters = IndexMap::new();
        parameters.insert(1usize, DynamicValue::Number(42));
        router.send_event(
            &world.data,
            &world.scene,
            Some(ObjectId::HERO),
            Target::All,
            false,
            4,
            &parameters,
            false,
            false,
        );
        world.tick(&mut router);
        assert_eq!(world.game.variable(1), Value::Int(42));
    }

    #[test]
    fn test_only_the_closest_ties_keep_scan_order() {
        let mut world = World::new();
        // both listeners sit at distance 2 from the sender at the origin
        world
            .scene
            .place(listener(10, Position::new(2.0, 0.0, 0.0), 4, set_var_reaction(1, 1)), 0);
        world
            .scene
            .place(listener(11, Position::new(-2.0, 0.0, 0.0), 4, set_var_reaction(2, 1)), 0);

        let mut router = EventRouter::new();
        let spawned = router.send_event(
            &world.data,
            &world.scene,
            Some(ObjectId::HERO),
            Target::All,
            false,
            4,
            &IndexMap::new(),
            true,
            true,
        );
        assert_eq!(spawned, 1);
        world.tick(&mut router);
        assert_eq!(world.game.variable(1), Value::Int(1));
        assert_eq!(world.game.variable(2), Value::Null);
    }

    #[test]
    fn test_sender_no_receiver_excludes_the_sender() {
        let mut world = World::new();
        let sender = listener(10, Position::new(0.0, 0.0, 0.0), 4, set_var_reaction(1, 1));
        let sender_id = sender.id;
        world.scene.place(sender, 0);

        let mut router = EventRouter::new();
        let spawned = router.send_event(
            &world.data,
            &world.scene,
            Some(sender_id),
            Target::All,
            false,
            4,
            &IndexMap::new(),
            true,
            false,
        );
        assert_eq!(spawned, 0);
        assert_eq!(world.game.variable(1), Value::Null);
    }

    #[test]
    fn test_specific_target_resolves_special_ids() {
        let mut world = World::new();
        let sender = listener(10, Position::new(0.0, 0.0, 0.0), 4, set_var_reaction(1, 5));
        let sender_id = sender.id;
        world.scene.place(sender, 0);

        let mut router = EventRouter::new();
        // -1 addresses the sender itself
        let spawned = router.send_event(
            &world.data,
            &world.scene,
            Some(sender_id),
            Target::Specific(-1),
            false,
            4,
            &IndexMap::new(),
            false,
            false,
        );
        assert_eq!(spawned, 1);
        world.tick(&mut router);
        assert_eq!(world.game.variable(1), Value::Int(5));
    }

    #[test]
    fn test_detection_limits_receivers_to_colliding_objects() {
        let mut world = World::new();
        world.data.detections.insert(
            1,
            Detection {
                base: Localized::new(1, "front"),
                boxes: vec![DetectionBox {
                    x: 0.0,
                    y: 0.0,
                    z: 0.0,
                    length: 3.0,
                    width: 3.0,
                    height: 1.0,
                }],
            },
        );
        world
            .scene
            .place(listener(10, Position::new(1.0, 0.0, 0.0), 4, set_var_reaction(1, 1)), 0);
        world
            .scene
            .place(listener(11, Position::new(50.0, 0.0, 0.0), 4, set_var_reaction(2, 1)), 0);

        let mut router = EventRouter::new();
        let spawned = router.send_event(
            &world.data,
            &world.scene,
            Some(ObjectId::HERO),
            Target::Detection(1),
            false,
            4,
            &IndexMap::new(),
            true,
            false,
        );
        assert_eq!(spawned, 1);
        world.tick(&mut router);
        assert_eq!(world.game.variable(1), Value::Int(1));
        assert_eq!(world.game.variable(2), Value::Null);
    }

    #[test]
    fn test_state_change_invalidates_a_running_activation() {
        let mut world = World::new();
        // wait, then set var1
        let script = vec![
            ScriptNode::new(21, vec![json!(4), json!(1.0)]),
            ScriptNode::new(
                2,
                vec![
                    json!(3),
                    json!(1),
                    json!(false),
                    json!(0),
                    json!(0),
                    json!(3),
                    json!(1),
                ],
            ),
        ];
        let reaction = Arc::new(Reaction::from_nodes(false, &script).unwrap());
        let object = listener(10, Position::new(0.0, 0.0, 0.0), 4, reaction);
        let object_id = object.id;
        world.scene.place(object, 0);

        let mut router = EventRouter::new();
        router.send_event(
            &world.data,
            &world.scene,
            Some(ObjectId::HERO),
            Target::All,
            false,
            4,
            &IndexMap::new(),
            true,
            false,
        );
        world.tick(&mut router);
        assert_eq!(router.running(), 1);

        if let Some(object) = world.scene.object_mut(object_id) {
            object.add_state(2);
        }
        world.tick(&mut router);
        assert_eq!(router.running(), 0);
        assert_eq!(world.game.variable(1), Value::Null);
    }

    #[test]
    fn test_blocking_reaction_freezes_the_hero_while_running() {
        let mut world = World::new();
        let script = vec![ScriptNode::new(21, vec![json!(4), json!(1.0)])];
        let reaction = Arc::new(Reaction::from_nodes(true, &script).unwrap());
        world
            .scene
            .place(listener(10, Position::new(0.0, 0.0, 0.0), 4, reaction), 0);

        let mut router = EventRouter::new();
        router.send_event(
            &world.data,
            &world.scene,
            Some(ObjectId::HERO),
            Target::All,
            false,
            4,
            &IndexMap::new(),
            true,
            false,
        );
        world.tick(&mut router);
        assert!(world.game.hero_blocked());
        for _ in 0..80 {
            world.tick(&mut router);
        }
        assert_eq!(router.running(), 0);
        assert!(!world.game.hero_blocked());
    }
}
