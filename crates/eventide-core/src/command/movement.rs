//! Movement, scene and camera commands

use super::cursor::Cursor;
use super::{CommandState, Outcome};
use crate::context::{ExecutionContext, Scope};
use crate::dynamic::DynamicValue;
use crate::error::{EngineError, Result};
use crate::identity::ObjectId;
use crate::object::{Orientation, Position, TicketStatus};
use crate::session::Weather;

/// One compiled step of a move routine
#[derive(Debug, Clone, PartialEq)]
pub enum MoveStep {
    /// Walk a fixed direction for a number of squares
    Step(Orientation, f64),
    /// Walk a randomly chosen direction
    StepRandom(f64),
    StepTowardHero(f64),
    StepAwayFromHero(f64),
    Turn(Orientation),
    ChangeGraphics(i64),
    ChangeSpeed(f64),
}

impl MoveStep {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(match cursor.next_i64()? {
            0 => MoveStep::Step(Orientation::South, cursor.next_f64()?),
            1 => MoveStep::Step(Orientation::West, cursor.next_f64()?),
            2 => MoveStep::Step(Orientation::North, cursor.next_f64()?),
            3 => MoveStep::Step(Orientation::East, cursor.next_f64()?),
            4 => MoveStep::StepRandom(cursor.next_f64()?),
            5 => MoveStep::StepTowardHero(cursor.next_f64()?),
            6 => MoveStep::StepAwayFromHero(cursor.next_f64()?),
            7 => MoveStep::Turn(
                Orientation::from_i64(cursor.next_i64()?).unwrap_or(Orientation::South),
            ),
            8 => MoveStep::ChangeGraphics(cursor.next_i64()?),
            9 => MoveStep::ChangeSpeed(cursor.next_f64()?),
            other => {
                return Err(crate::error::Error::MalformedStream(format!(
                    "unknown move step {}",
                    other
                )))
            }
        })
    }

    /// Whether this step takes time rather than applying instantly
    fn is_travel(&self) -> bool {
        matches!(
            self,
            MoveStep::Step(..)
                | MoveStep::StepRandom(_)
                | MoveStep::StepTowardHero(_)
                | MoveStep::StepAwayFromHero(_)
        )
    }
}

/// Per-invocation state of [`MoveObject`]
#[derive(Debug)]
pub struct MoveObjectState {
    pub target: Option<ObjectId>,
    pub ticket: u64,
    pub step: usize,
    /// Squares travelled within the current step
    pub travelled: f64,
    /// Direction chosen for the current random/toward step
    pub chosen: Option<Orientation>,
}

/// Drive an object through a compiled list of move steps
///
/// Claims the target's move slot; a claim held by another routine defers
/// this one tick by tick until the slot frees up.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveObject {
    pub target: DynamicValue,
    /// Block the containing walk until the whole routine ends
    pub is_wait_end: bool,
    pub steps: Vec<MoveStep>,
}

impl MoveObject {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        let target = cursor.next_dynamic()?;
        let is_wait_end = cursor.next_bool()?;
        let mut steps = Vec::new();
        while !cursor.done() {
            steps.push(MoveStep::read(cursor)?);
        }
        Ok(Self {
            target,
            is_wait_end,
            steps,
        })
    }

    pub fn parallel(&self) -> bool {
        !self.is_wait_end
    }

    pub fn initialize(&self, ctx: &mut ExecutionContext, scope: &Scope) -> CommandState {
        let target = ctx.resolve_object(&self.target, scope);
        let ticket = match target.and_then(|id| ctx.scene.object_mut(id)) {
            Some(object) => object.move_slot.request(),
            None => 0,
        };
        CommandState::Move(MoveObjectState {
            target,
            ticket,
            step: 0,
            travelled: 0.0,
            chosen: None,
        })
    }

    pub fn update(&self, state: &mut CommandState, ctx: &mut ExecutionContext) -> Outcome {
        let CommandState::Move(st) = state else {
            return Outcome::Advance(1);
        };
        let Some(target) = st.target else {
            return Outcome::Advance(1);
        };
        let hero_position = ctx.scene.hero().map(|h| h.position);
        let delta_s = ctx.delta_ms as f64 / 1000.0;
        let rng = &mut *ctx.rng;
        let mut step_rng = move |max: usize| (rng.next_u64() as usize) % max;
        let Some(object) = ctx.scene.object_mut(target) else {
            return Outcome::Advance(1);
        };
        match object.move_slot.status(st.ticket) {
            TicketStatus::Superseded => return Outcome::Advance(1),
            TicketStatus::Waiting => return Outcome::Pending,
            TicketStatus::Active => {}
        }

        while st.step < self.steps.len() {
            let step = &self.steps[st.step];
            if step.is_travel() {
                let (orientation, squares) = match *step {
                    MoveStep::Step(orientation, squares) => (orientation, squares),
                    MoveStep::StepRandom(squares) => {
                        let orientation = *st.chosen.get_or_insert_with(|| {
                            [
                                Orientation::South,
                                Orientation::West,
                                Orientation::North,
                                Orientation::East,
                            ][step_rng(4)]
                        });
                        (orientation, squares)
                    }
                    MoveStep::StepTowardHero(squares) | MoveStep::StepAwayFromHero(squares) => {
                        let away = matches!(step, MoveStep::StepAwayFromHero(_));
                        let orientation = *st.chosen.get_or_insert_with(|| {
                            let hero = hero_position.unwrap_or_default();
                            let dx = hero.x - object.position.x;
                            let dz = hero.z - object.position.z;
                            let toward = if dx.abs() >= dz.abs() {
                                if dx >= 0.0 {
                                    Orientation::East
                                } else {
                                    Orientation::West
                                }
                            } else if dz >= 0.0 {
                                Orientation::South
                            } else {
                                Orientation::North
                            };
                            if away {
                                toward.opposite()
                            } else {
                                toward
                            }
                        });
                        (orientation, squares)
                    }
                    _ => unreachable!(),
                };
                object.orientation = orientation;
                let budget = object.speed * delta_s;
                let advance = budget.min(squares - st.travelled);
                let (dx, dz) = orientation.step();
                object.position.x += dx * advance;
                object.position.z += dz * advance;
                st.travelled += advance;
                if st.travelled + 1e-9 < squares {
                    return Outcome::Pending;
                }
                st.step += 1;
                st.travelled = 0.0;
                st.chosen = None;
                if st.step < self.steps.len() {
                    // one travel leg per tick
                    return Outcome::Pending;
                }
            } else {
                match *step {
                    MoveStep::Turn(orientation) => object.orientation = orientation,
                    MoveStep::ChangeGraphics(id) => object.graphics_id = id,
                    MoveStep::ChangeSpeed(speed) => object.speed = speed.max(0.0),
                    _ => unreachable!(),
                }
                st.step += 1;
            }
        }
        object.move_slot.release(st.ticket);
        Outcome::Advance(1)
    }
}

/// Instantly reposition an object
#[derive(Debug, Clone, PartialEq)]
pub struct TeleportObject {
    pub target: DynamicValue,
    pub x: DynamicValue,
    pub y: DynamicValue,
    pub z: DynamicValue,
}

impl TeleportObject {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            target: cursor.next_dynamic()?,
            x: cursor.next_dynamic()?,
            y: cursor.next_dynamic()?,
            z: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let position = Position::new(
            ctx.resolve_f64(&self.x, scope),
            ctx.resolve_f64(&self.y, scope),
            ctx.resolve_f64(&self.z, scope),
        );
        if let Some(object) = ctx
            .resolve_object(&self.target, scope)
            .and_then(|id| ctx.scene.object_mut(id))
        {
            object.position = position;
        }
        Outcome::Advance(1)
    }
}

/// Glide the camera to a target or offset
#[derive(Debug, Clone, PartialEq)]
pub struct MoveCamera {
    pub target: DynamicValue,
    pub x: DynamicValue,
    pub y: DynamicValue,
    pub z: DynamicValue,
    pub seconds: DynamicValue,
    pub wait: bool,
}

impl MoveCamera {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            target: cursor.next_dynamic()?,
            x: cursor.next_dynamic()?,
            y: cursor.next_dynamic()?,
            z: cursor.next_dynamic()?,
            seconds: cursor.next_dynamic()?,
            wait: cursor.next_bool()?,
        })
    }

    pub fn initialize(&self, ctx: &mut ExecutionContext, scope: &Scope) -> CommandState {
        let target = match &self.target {
            DynamicValue::None => None,
            value => ctx.resolve_object(value, scope),
        };
        let offset = (
            ctx.resolve_f64(&self.x, scope),
            ctx.resolve_f64(&self.y, scope),
            ctx.resolve_f64(&self.z, scope),
        );
        let time_ms = (ctx.resolve_f64(&self.seconds, scope) * 1000.0).max(0.0) as u64;
        ctx.platform.move_camera(target, offset, time_ms);
        if self.wait {
            CommandState::WaitUntil {
                until_ms: ctx.now_ms + time_ms,
            }
        } else {
            CommandState::None
        }
    }

    pub fn update(&self, state: &CommandState, ctx: &ExecutionContext) -> Outcome {
        match state {
            CommandState::WaitUntil { until_ms } if ctx.now_ms < *until_ms => Outcome::Pending,
            _ => Outcome::Advance(1),
        }
    }
}

/// Snap the camera back to the hero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResetCamera;

impl ResetCamera {
    pub fn update(&self, ctx: &mut ExecutionContext) -> Outcome {
        ctx.platform.reset_camera();
        Outcome::Advance(1)
    }
}

/// State list mutation selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOperation {
    Replace,
    Add,
    Remove,
}

/// Change an object's behavior state
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeState {
    pub target: DynamicValue,
    pub operation: StateOperation,
    pub state: DynamicValue,
}

impl ChangeState {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            target: cursor.next_dynamic()?,
            operation: match cursor.next_i64()? {
                1 => StateOperation::Add,
                2 => StateOperation::Remove,
                _ => StateOperation::Replace,
            },
            state: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let state = ctx.resolve_i64(&self.state, scope);
        if let Some(object) = ctx
            .resolve_object(&self.target, scope)
            .and_then(|id| ctx.scene.object_mut(id))
        {
            match self.operation {
                StateOperation::Replace => object.replace_states(state),
                StateOperation::Add => object.add_state(state),
                StateOperation::Remove => object.remove_state(state),
            }
        }
        Outcome::Advance(1)
    }
}

/// Spawn a template instance into the map
#[derive(Debug, Clone, PartialEq)]
pub struct CreateObjectInMap {
    pub template: DynamicValue,
    pub x: DynamicValue,
    pub y: DynamicValue,
    pub z: DynamicValue,
}

impl CreateObjectInMap {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            template: cursor.next_dynamic()?,
            x: cursor.next_dynamic()?,
            y: cursor.next_dynamic()?,
            z: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let template = ctx.resolve_i64(&self.template, scope);
        let position = Position::new(
            ctx.resolve_f64(&self.x, scope),
            ctx.resolve_f64(&self.y, scope),
            ctx.resolve_f64(&self.z, scope),
        );
        if ctx.scene.spawn(template, position, 0).is_none() {
            ctx.report(EngineError::MissingEntityReference {
                table: "object template",
                id: template,
            });
        }
        Outcome::Advance(1)
    }
}

/// Remove an object from the map
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveObjectFromMap {
    pub target: DynamicValue,
}

impl RemoveObjectFromMap {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            target: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        if let Some(id) = ctx.resolve_object(&self.target, scope) {
            ctx.scene.remove(id);
        }
        Outcome::Advance(1)
    }
}

/// Swap an object's graphics
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchTexture {
    pub target: DynamicValue,
    pub graphics: DynamicValue,
}

impl SwitchTexture {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            target: cursor.next_dynamic()?,
            graphics: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let graphics = ctx.resolve_i64(&self.graphics, scope);
        if let Some(object) = ctx
            .resolve_object(&self.target, scope)
            .and_then(|id| ctx.scene.object_mut(id))
        {
            object.graphics_id = graphics;
        }
        Outcome::Advance(1)
    }
}

/// Which map property a `ChangeMapProperties` targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapProperty {
    Music,
    BackgroundSound,
    Tileset,
}

/// Override a property of the current map
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeMapProperties {
    pub property: MapProperty,
    pub id: DynamicValue,
}

impl ChangeMapProperties {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            property: match cursor.next_i64()? {
                1 => MapProperty::BackgroundSound,
                2 => MapProperty::Tileset,
                _ => MapProperty::Music,
            },
            id: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let id = ctx.resolve_i64(&self.id, scope);
        let slot = match self.property {
            MapProperty::Music => &mut ctx.game.map_properties.music_id,
            MapProperty::BackgroundSound => &mut ctx.game.map_properties.background_sound_id,
            MapProperty::Tileset => &mut ctx.game.map_properties.tileset_id,
        };
        *slot = Some(id);
        Outcome::Advance(1)
    }
}

/// Switch the active weather effect
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeWeather {
    pub kind: DynamicValue,
}

impl ChangeWeather {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            kind: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let kind = ctx.resolve_i64(&self.kind, scope);
        ctx.game.weather = Weather::from_i64(kind);
        Outcome::Advance(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataTables;
    use crate::object::MapObject;
    use crate::platform::RecordingPlatform;
    use crate::rng::GameRng;
    use crate::scene::Scene;
    use crate::session::Game;
    use serde_json::json;

    #[test]
    fn test_move_step_read() {
        let tokens = vec![json!(2), json!(1.0), json!(3), json!(1.0), json!(7), json!(1)];
        let mut cursor = Cursor::new(&tokens);
        assert_eq!(
            MoveStep::read(&mut cursor).unwrap(),
            MoveStep::Step(Orientation::North, 1.0)
        );
        assert_eq!(
            MoveStep::read(&mut cursor).unwrap(),
            MoveStep::Step(Orientation::East, 1.0)
        );
        assert_eq!(
            MoveStep::read(&mut cursor).unwrap(),
            MoveStep::Turn(Orientation::West)
        );
    }

    #[test]
    fn test_sequential_square_move() {
        let mut game = Game::new(4);
        let data = DataTables::new();
        let mut scene = Scene::new();
        let mut object = MapObject::new(ObjectId::new(3), "walker");
        object.speed = 2.0; // two squares per second
        scene.place(object, 0);
        let mut platform = RecordingPlatform::new();
        let mut rng = GameRng::new(1);

        let command = MoveObject {
            target: DynamicValue::Number(3),
            is_wait_end: true,
            steps: vec![
                MoveStep::Step(Orientation::North, 1.0),
                MoveStep::Step(Orientation::East, 1.0),
            ],
        };

        let mut now_ms = 0;
        let mut ctx = ExecutionContext {
            game: &mut game,
            data: &data,
            scene: &mut scene,
            platform: &mut platform,
            rng: &mut rng,
            now_ms,
            delta_ms: 250,
        };
        let scope = Scope::new(ObjectId::HERO, 1);
        let mut state = command.initialize(&mut ctx, &scope);

        // 2 sq/s at 250ms per tick covers half a square per tick
        let mut outcomes = Vec::new();
        let mut orientations = Vec::new();
        for _ in 0..8 {
            now_ms += 250;
            let mut ctx = ExecutionContext {
                game: &mut game,
                data: &data,
                scene: &mut scene,
                platform: &mut platform,
                rng: &mut rng,
                now_ms,
                delta_ms: 250,
            };
            let outcome = command.update(&mut state, &mut ctx);
            orientations.push(scene.object(ObjectId::new(3)).unwrap().orientation);
            outcomes.push(outcome.clone());
            if outcome != Outcome::Pending {
                break;
            }
        }

        assert_eq!(outcomes.last(), Some(&Outcome::Advance(1)));
        assert_eq!(outcomes.iter().filter(|o| **o == Outcome::Pending).count(), 3);
        assert!(orientations[..2].iter().all(|o| *o == Orientation::North));
        assert!(orientations[2..].iter().all(|o| *o == Orientation::East));
        let walker = scene.object(ObjectId::new(3)).unwrap();
        assert!((walker.position.x - 1.0).abs() < 1e-9);
        assert!((walker.position.z + 1.0).abs() < 1e-9);
        assert!(!walker.move_slot.is_busy());
    }

    #[test]
    fn test_second_move_defers_until_slot_frees() {
        let mut game = Game::new(4);
        let data = DataTables::new();
        let mut scene = Scene::new();
        scene.place(MapObject::new(ObjectId::new(3), "walker"), 0);
        let mut platform = RecordingPlatform::new();
        let mut rng = GameRng::new(1);
        let scope = Scope::new(ObjectId::HERO, 1);

        let first = MoveObject {
            target: DynamicValue::Number(3),
            is_wait_end: false,
            steps: vec![MoveStep::Step(Orientation::East, 1.0)],
        };
        let second = MoveObject {
            target: DynamicValue::Number(3),
            is_wait_end: false,
            steps: vec![MoveStep::Turn(Orientation::North)],
        };

        let mut ctx = ExecutionContext {
            game: &mut game,
            data: &data,
            scene: &mut scene,
            platform: &mut platform,
            rng: &mut rng,
            now_ms: 0,
            delta_ms: 1000,
        };
        let mut first_state = first.initialize(&mut ctx, &scope);
        let mut second_state = second.initialize(&mut ctx, &scope);

        // the second routine waits while the first owns the slot
        assert_eq!(second.update(&mut second_state, &mut ctx), Outcome::Pending);
        assert_eq!(first.update(&mut first_state, &mut ctx), Outcome::Advance(1));
        assert_eq!(
            second.update(&mut second_state, &mut ctx),
            Outcome::Advance(1)
        );
        assert_eq!(
            scene.object(ObjectId::new(3)).unwrap().orientation,
            Orientation::North
        );
    }
}
