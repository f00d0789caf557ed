//! Read-only data tables consumed by value resolution and commands
//!
//! Everything in here is built once at load time and never mutated during
//! play. Deep data-model inheritance is expressed as composition: a shared
//! [`Localized`] entity value, a tagged hero/monster [`PersonKind`], and
//! explicit merge functions for class `up_class` chains.

use crate::dynamic::DynamicValue;
use crate::identity::EventId;
use crate::object::Position;
use crate::reaction::Reaction;
use crate::troop::TroopReactionDef;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which read-only table a database reference points into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableKind {
    Class,
    Hero,
    Monster,
    Troop,
    Item,
    Weapon,
    Armor,
    Skill,
    Status,
    Animation,
    Tileset,
    Currency,
    Detection,
    Song,
    Picture,
    CommonReaction,
}

impl TableKind {
    /// Table name used in reported errors
    pub fn name(&self) -> &'static str {
        match self {
            TableKind::Class => "class",
            TableKind::Hero => "hero",
            TableKind::Monster => "monster",
            TableKind::Troop => "troop",
            TableKind::Item => "item",
            TableKind::Weapon => "weapon",
            TableKind::Armor => "armor",
            TableKind::Skill => "skill",
            TableKind::Status => "status",
            TableKind::Animation => "animation",
            TableKind::Tileset => "tileset",
            TableKind::Currency => "currency",
            TableKind::Detection => "detection",
            TableKind::Song => "song",
            TableKind::Picture => "picture",
            TableKind::CommonReaction => "common reaction",
        }
    }
}

/// Shared identity + display name of a data entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Localized {
    pub id: i64,
    pub name: String,
}

impl Localized {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A flat stat modifier carried by a class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Characteristic {
    pub id: i64,
    /// Statistic this characteristic applies to ("atk", "def", ...)
    pub stat: String,
    pub value: f64,
}

/// A skill learned at a given level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearnedSkill {
    pub skill_id: i64,
    pub level: i64,
}

/// Class definition, possibly refining a parent class (`up_class`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub base: Localized,
    /// Parent class whose characteristics/skills this one refines
    pub up_class: Option<i64>,
    pub experience_base: f64,
    pub experience_inflation: f64,
    pub statistics: IndexMap<String, f64>,
    pub characteristics: Vec<Characteristic>,
    pub skills: Vec<LearnedSkill>,
}

/// Merge two characteristic lists, last writer by id wins
pub fn merge_characteristics(
    base: &[Characteristic],
    over: &[Characteristic],
) -> Vec<Characteristic> {
    let mut merged: Vec<Characteristic> = base.to_vec();
    for c in over {
        match merged.iter_mut().find(|m| m.id == c.id) {
            Some(slot) => *slot = c.clone(),
            None => merged.push(c.clone()),
        }
    }
    merged
}

/// Merge two learned-skill lists, last writer by skill id wins
pub fn merge_skills(base: &[LearnedSkill], over: &[LearnedSkill]) -> Vec<LearnedSkill> {
    let mut merged: Vec<LearnedSkill> = base.to_vec();
    for s in over {
        match merged.iter_mut().find(|m| m.skill_id == s.skill_id) {
            Some(slot) => *slot = *s,
            None => merged.push(*s),
        }
    }
    merged
}

/// Hero/monster distinction over the shared person shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PersonKind {
    Hero,
    Monster {
        /// Currency rewards on defeat (currency id -> amount)
        rewards: IndexMap<i64, f64>,
    },
}

/// A playable or hostile person definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonDef {
    pub base: Localized,
    pub kind: PersonKind,
    pub class_id: i64,
    pub battler_graphic_id: i64,
}

/// One monster slot inside a troop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TroopMonster {
    pub monster_id: i64,
    pub level: i64,
}

/// Troop definition with its battle reactions
#[derive(Debug, Clone)]
pub struct TroopDef {
    pub base: Localized,
    pub monsters: Vec<TroopMonster>,
    pub reactions: Vec<TroopReactionDef>,
}

/// Item, weapon or armor definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
    pub base: Localized,
    pub price: f64,
    pub consumable: bool,
}

/// Skill definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDef {
    pub base: Localized,
    pub cost: f64,
}

/// Definition carrying only identity (statuses, animations, tilesets, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleDef {
    pub base: Localized,
}

/// Song definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongDef {
    pub base: Localized,
}

/// Picture definition with its expected frame tiling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PictureDef {
    pub base: Localized,
    pub frame_width: u32,
    pub frame_height: u32,
    pub frames: u32,
}

impl PictureDef {
    /// Check loaded texture dimensions against the tiling template
    ///
    /// Returns a description of the mismatch, or `None` when the texture
    /// fits. Mismatches are advisory: the asset is used as-is.
    pub fn tiling_mismatch(&self, width: u32, height: u32) -> Option<String> {
        let expected_w = self.frame_width * self.frames;
        if width != expected_w || height != self.frame_height {
            Some(format!(
                "picture {}: expected {}x{} ({} frames), got {}x{}",
                self.base.id, expected_w, self.frame_height, self.frames, width, height
            ))
        } else {
            None
        }
    }
}

/// An axis-aligned detection box, in squares, relative to the sender
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl DetectionBox {
    fn contains(&self, anchor: &Position, p: &Position) -> bool {
        let cx = anchor.x + self.x;
        let cy = anchor.y + self.y;
        let cz = anchor.z + self.z;
        (p.x - cx).abs() <= self.length / 2.0
            && (p.y - cy).abs() <= self.height / 2.0
            && (p.z - cz).abs() <= self.width / 2.0
    }
}

/// A detection shape used to filter spatial dispatch candidates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub base: Localized,
    pub boxes: Vec<DetectionBox>,
}

impl Detection {
    /// Check whether `candidate` falls inside any box anchored at `sender`
    pub fn check_collision(&self, sender: &Position, candidate: &Position) -> bool {
        self.boxes.iter().any(|b| b.contains(sender, candidate))
    }
}

/// A globally-defined reaction callable from any object
#[derive(Debug, Clone)]
pub struct CommonReactionDef {
    pub id: i64,
    pub default_parameters: IndexMap<usize, DynamicValue>,
    pub reaction: Arc<Reaction>,
}

/// Event definition carrying declaration-site parameter defaults
#[derive(Debug, Clone, Default)]
pub struct EventDef {
    pub id: EventId,
    pub is_system: bool,
    pub defaults: IndexMap<usize, DynamicValue>,
}

/// System-wide constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemDef {
    /// Pixels per map square
    pub square_size: f64,
    /// Size of the session variable bank
    pub variable_count: usize,
}

impl Default for SystemDef {
    fn default() -> Self {
        Self {
            square_size: 16.0,
            variable_count: 1000,
        }
    }
}

/// All read-only game data, keyed by numeric id
#[derive(Debug, Clone, Default)]
pub struct DataTables {
    pub classes: IndexMap<i64, ClassDef>,
    pub heroes: IndexMap<i64, PersonDef>,
    pub monsters: IndexMap<i64, PersonDef>,
    pub troops: IndexMap<i64, TroopDef>,
    pub items: IndexMap<i64, ItemDef>,
    pub weapons: IndexMap<i64, ItemDef>,
    pub armors: IndexMap<i64, ItemDef>,
    pub skills: IndexMap<i64, SkillDef>,
    pub statuses: IndexMap<i64, SimpleDef>,
    pub animations: IndexMap<i64, SimpleDef>,
    pub tilesets: IndexMap<i64, SimpleDef>,
    pub currencies: IndexMap<i64, SimpleDef>,
    pub detections: IndexMap<i64, Detection>,
    pub songs: IndexMap<i64, SongDef>,
    pub pictures: IndexMap<i64, PictureDef>,
    pub common_reactions: IndexMap<i64, CommonReactionDef>,
    pub event_defs: IndexMap<EventId, EventDef>,
    pub system: SystemDef,
}

impl DataTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a table contains the given id
    pub fn contains(&self, kind: TableKind, id: i64) -> bool {
        match kind {
            TableKind::Class => self.classes.contains_key(&id),
            TableKind::Hero => self.heroes.contains_key(&id),
            TableKind::Monster => self.monsters.contains_key(&id),
            TableKind::Troop => self.troops.contains_key(&id),
            TableKind::Item => self.items.contains_key(&id),
            TableKind::Weapon => self.weapons.contains_key(&id),
            TableKind::Armor => self.armors.contains_key(&id),
            TableKind::Skill => self.skills.contains_key(&id),
            TableKind::Status => self.statuses.contains_key(&id),
            TableKind::Animation => self.animations.contains_key(&id),
            TableKind::Tileset => self.tilesets.contains_key(&id),
            TableKind::Currency => self.currencies.contains_key(&id),
            TableKind::Detection => self.detections.contains_key(&id),
            TableKind::Song => self.songs.contains_key(&id),
            TableKind::Picture => self.pictures.contains_key(&id),
            TableKind::CommonReaction => self.common_reactions.contains_key(&id),
        }
    }

    /// Get a detection shape
    pub fn detection(&self, id: i64) -> Option<&Detection> {
        self.detections.get(&id)
    }

    /// Get a common reaction
    pub fn common_reaction(&self, id: i64) -> Option<&CommonReactionDef> {
        self.common_reactions.get(&id)
    }

    /// Get an event definition (for parameter defaults)
    pub fn event_def(&self, id: EventId) -> Option<&EventDef> {
        self.event_defs.get(&id)
    }

    /// Resolve a class with its whole `up_class` chain merged in
    ///
    /// Walks parents first so nearer classes override farther ones. A cycle
    /// stops the walk at the repeated id rather than looping.
    pub fn resolved_class(&self, id: i64) -> Option<ClassDef> {
        let mut chain = Vec::new();
        let mut seen = Vec::new();
        let mut current = Some(id);
        while let Some(cid) = current {
            if seen.contains(&cid) {
                break;
            }
            seen.push(cid);
            let def = self.classes.get(&cid)?;
            chain.push(def);
            current = def.up_class;
        }

        // chain[0] is the requested class, walk from the root down
        let mut iter = chain.into_iter().rev();
        let mut merged = iter.next()?.clone();
        for def in iter {
            merged.base = def.base.clone();
            merged.experience_base = def.experience_base;
            merged.experience_inflation = def.experience_inflation;
            for (stat, v) in &def.statistics {
                merged.statistics.insert(stat.clone(), *v);
            }
            merged.characteristics =
                merge_characteristics(&merged.characteristics, &def.characteristics);
            merged.skills = merge_skills(&merged.skills, &def.skills);
            merged.up_class = None;
        }
        Some(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(id: i64, up: Option<i64>) -> ClassDef {
        ClassDef {
            base: Localized::new(id, format!("class {}", id)),
            up_class: up,
            experience_base: 5.0,
            experience_inflation: 30.0,
            statistics: IndexMap::new(),
            characteristics: Vec::new(),
            skills: Vec::new(),
        }
    }

    #[test]
    fn test_merge_skills_last_writer_wins() {
        let base = vec![
            LearnedSkill {
                skill_id: 1,
                level: 1,
            },
            LearnedSkill {
                skill_id: 2,
                level: 5,
            },
        ];
        let over = vec![
            LearnedSkill {
                skill_id: 2,
                level: 3,
            },
            LearnedSkill {
                skill_id: 7,
                level: 9,
            },
        ];
        let merged = merge_skills(&base, &over);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[1].level, 3);
        assert_eq!(merged[2].skill_id, 7);
    }

    #[test]
    fn test_resolved_class_merges_parent_chain() {
        let mut tables = DataTables::new();
        let mut root = class(1, None);
        root.skills.push(LearnedSkill {
            skill_id: 10,
            level: 1,
        });
        root.statistics.insert("atk".into(), 3.0);
        let mut child = class(2, Some(1));
        child.skills.push(LearnedSkill {
            skill_id: 10,
            level: 4,
        });
        child.statistics.insert("def".into(), 2.0);
        tables.classes.insert(1, root);
        tables.classes.insert(2, child);

        let resolved = tables.resolved_class(2).unwrap();
        assert_eq!(resolved.base.id, 2);
        assert_eq!(resolved.skills, vec![LearnedSkill {
            skill_id: 10,
            level: 4,
        }]);
        assert_eq!(resolved.statistics.get("atk"), Some(&3.0));
        assert_eq!(resolved.statistics.get("def"), Some(&2.0));
    }

    #[test]
    fn test_detection_box() {
        let detection = Detection {
            base: Localized::new(1, "front"),
            boxes: vec![DetectionBox {
                x: 0.0,
                y: 0.0,
                z: 0.0,
                length: 4.0,
                width: 4.0,
                height: 2.0,
            }],
        };
        let sender = Position::new(5.0, 0.0, 5.0);
        assert!(detection.check_collision(&sender, &Position::new(6.5, 0.0, 5.0)));
        assert!(!detection.check_collision(&sender, &Position::new(8.0, 0.0, 5.0)));
    }

    #[test]
    fn test_picture_tiling_mismatch() {
        let pic = PictureDef {
            base: Localized::new(3, "face"),
            frame_width: 32,
            frame_height: 32,
            frames: 4,
        };
        assert!(pic.tiling_mismatch(128, 32).is_none());
        assert!(pic.tiling_mismatch(96, 32).is_some());
    }
}
