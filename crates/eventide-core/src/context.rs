//! Explicit execution context
//!
//! Everything a command may touch during a tick is threaded through an
//! [`ExecutionContext`] borrow instead of ambient globals: the mutable
//! session, read-only data tables, the scene, the platform hooks, the RNG
//! and the frame clock. A [`Scope`] carries the per-activation bindings.

use crate::data::DataTables;
use crate::dynamic::{DynamicValue, ResolveEnv, ResolveOpts};
use crate::error::EngineError;
use crate::identity::{ObjectId, StateId};
use crate::platform::Platform;
use crate::rng::GameRng;
use crate::scene::Scene;
use crate::session::Game;
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::VecDeque;

/// An input occurrence forwarded to whichever command is waiting on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Raw key code
    Key(i64),
    /// Confirm
    Action,
    Cancel,
    /// A committed choice selection (1-based)
    Choice(i64),
    Up,
    Down,
    Left,
    Right,
    MouseUp,
}

/// Pending input events for one interpreter
#[derive(Debug, Clone, Default)]
pub struct InputQueue {
    events: VecDeque<InputEvent>,
}

impl InputQueue {
    pub fn push(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Per-activation bindings: the acting object, its state, the bound
/// parameter table and the input queue
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub object: ObjectId,
    pub state_id: StateId,
    pub parameters: IndexMap<usize, DynamicValue>,
    pub input: InputQueue,
}

impl Scope {
    pub fn new(object: ObjectId, state_id: StateId) -> Self {
        Self {
            object,
            state_id,
            ..Self::default()
        }
    }

    pub fn with_parameters(mut self, parameters: IndexMap<usize, DynamicValue>) -> Self {
        self.parameters = parameters;
        self
    }
}

/// One tick's view of the world, threaded through every command
pub struct ExecutionContext<'a> {
    pub game: &'a mut Game,
    pub data: &'a DataTables,
    pub scene: &'a mut Scene,
    pub platform: &'a mut dyn Platform,
    pub rng: &'a mut GameRng,
    /// Frame clock, milliseconds since session start
    pub now_ms: u64,
    /// Milliseconds elapsed since the previous tick
    pub delta_ms: u64,
}

impl ExecutionContext<'_> {
    /// Resolve a dynamic value in this scope
    pub fn resolve(&mut self, value: &DynamicValue, scope: &Scope) -> Value {
        self.resolve_with(value, scope, ResolveOpts::default())
    }

    /// Resolve with explicit options
    pub fn resolve_with(&mut self, value: &DynamicValue, scope: &Scope, opts: ResolveOpts) -> Value {
        let properties = self.scene.objects.get(&scope.object).map(|o| &o.properties);
        let mut env = ResolveEnv {
            game: Some(&*self.game),
            data: self.data,
            parameters: Some(&scope.parameters),
            properties,
            platform: &mut *self.platform,
        };
        value.resolve(&mut env, opts)
    }

    /// Resolve the raw index/id instead of dereferencing
    pub fn resolve_raw(&mut self, value: &DynamicValue, scope: &Scope) -> Value {
        self.resolve_with(value, scope, ResolveOpts::raw())
    }

    pub fn resolve_i64(&mut self, value: &DynamicValue, scope: &Scope) -> i64 {
        self.resolve(value, scope).as_int().unwrap_or(0)
    }

    pub fn resolve_f64(&mut self, value: &DynamicValue, scope: &Scope) -> f64 {
        self.resolve(value, scope).as_float().unwrap_or(0.0)
    }

    pub fn resolve_bool(&mut self, value: &DynamicValue, scope: &Scope) -> bool {
        self.resolve(value, scope).is_truthy()
    }

    pub fn resolve_string(&mut self, value: &DynamicValue, scope: &Scope) -> String {
        self.resolve(value, scope).to_display_string()
    }

    /// Resolve a value naming a map object: `-1` the acting object, `0` the
    /// hero, anything else the first scan-order object with that raw id
    pub fn resolve_object(&mut self, value: &DynamicValue, scope: &Scope) -> Option<ObjectId> {
        let raw = self.resolve(value, scope).as_int()?;
        match raw {
            -1 => Some(scope.object),
            0 => Some(ObjectId::HERO),
            id => self.scene.find_raw(id),
        }
    }

    /// Report an advisory engine error
    pub fn report(&mut self, err: EngineError) {
        tracing::warn!(error = %err, "command execution degraded");
        self.platform.report_error(&err);
    }
}
