//! JSON loading for authored script data
//!
//! [`schema`] mirrors the on-disk JSON shapes, [`loader`] turns them into
//! `eventide-core` events, reactions and data-table entries.

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{Error, Result};
pub use loader::{
    build_common_reaction, build_event, build_event_def, build_reaction,
    common_reactions_from_str, event_defs_from_str, event_from_file, event_from_str,
    reaction_from_file, reaction_from_str,
};
pub use schema::{
    RawCommandNode, RawCommonReaction, RawEvent, RawEventDef, RawParameter, RawReaction,
};
