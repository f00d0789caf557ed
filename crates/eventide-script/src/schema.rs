//! Raw JSON shapes of authored script data
//!
//! These mirror the on-disk format byte for byte; the loader converts them
//! into `eventide-core` types. Field names stay as short as the format
//! spells them, renamed to readable Rust names here.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// One command node: `{"kind": 8, "command": [...], "children": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCommandNode {
    pub kind: i64,
    #[serde(default)]
    pub command: Vec<Json>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RawCommandNode>,
}

/// One reaction: `{"id": 1, "bh": true, "c": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawReaction {
    #[serde(default)]
    pub id: i64,
    #[serde(default, rename = "bh")]
    pub block_hero: bool,
    #[serde(default, rename = "c")]
    pub commands: Vec<RawCommandNode>,
}

/// One parameter binding: `{"id": 1, "v": {"k": 3, "v": 5}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawParameter {
    pub id: i64,
    #[serde(default, rename = "v")]
    pub value: Json,
}

/// One event registration:
/// `{"sys": true, "id": 1, "p": [...], "r": {"1": {...}}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default, rename = "sys")]
    pub is_system: bool,
    pub id: i64,
    #[serde(default, rename = "p")]
    pub parameters: Vec<RawParameter>,
    /// Reactions keyed by the object state they apply to
    #[serde(default, rename = "r")]
    pub reactions: IndexMap<String, RawReaction>,
}

/// A globally-callable reaction with declaration-site parameter defaults:
/// `{"id": 3, "p": [...], "r": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCommonReaction {
    pub id: i64,
    #[serde(default, rename = "p")]
    pub parameters: Vec<RawParameter>,
    #[serde(rename = "r")]
    pub reaction: RawReaction,
}

/// An event declaration carrying parameter defaults:
/// `{"id": 4, "sys": false, "p": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEventDef {
    pub id: i64,
    #[serde(default, rename = "sys")]
    pub is_system: bool,
    #[serde(default, rename = "p")]
    pub parameters: Vec<RawParameter>,
}
