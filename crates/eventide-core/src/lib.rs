//! Event-command interpreter core
//!
//! The runtime behind map-object scripting: dynamic value resolution,
//! decoded reaction trees, tick-based interpreters, event dispatch across a
//! scene and the battle-side troop reactions. Everything runs against an
//! explicit [`context::ExecutionContext`]; the crate owns no globals and
//! talks to the host only through [`platform::Platform`].

pub mod command;
pub mod context;
pub mod data;
pub mod dispatch;
pub mod dynamic;
pub mod error;
pub mod event;
pub mod identity;
pub mod interpreter;
pub mod object;
pub mod platform;
pub mod reaction;
pub mod rng;
pub mod scene;
pub mod session;
pub mod troop;
pub mod value;

pub use command::{CommandKind, CommandState, EventCommand, Outcome};
pub use context::{ExecutionContext, InputEvent, InputQueue, Scope};
pub use data::{DataTables, SystemDef, TableKind};
pub use dispatch::{EventRouter, Target};
pub use dynamic::{DynamicValue, ResolveEnv, ResolveOpts, ValueKind};
pub use error::{EngineError, Error, Result};
pub use event::Event;
pub use identity::{EventId, NodeId, ObjectId, StateId};
pub use interpreter::{Interpreter, Status};
pub use object::{MapObject, ObjectTemplate, Orientation, Position};
pub use platform::{NullPlatform, Platform, RecordingPlatform, SongKind};
pub use reaction::{Reaction, ScriptNode};
pub use rng::GameRng;
pub use scene::Scene;
pub use session::Game;
pub use troop::{Frequency, TroopCondition, TroopReactionDef, TroopReactionRunner};
pub use value::Value;
