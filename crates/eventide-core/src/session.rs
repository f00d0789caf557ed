//! Mutable game session shared by every interpreter
//!
//! One `Game` exists per play session. All interpreters mutate it directly
//! in their fixed per-tick order; there is no isolation and no rollback of
//! partially-applied effects on cancellation.

use crate::data::DataTables;
use crate::platform::SongKind;
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Which inventory table an item command addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Item,
    Weapon,
    Armor,
}

impl ItemKind {
    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(ItemKind::Item),
            1 => Some(ItemKind::Weapon),
            2 => Some(ItemKind::Armor),
            _ => None,
        }
    }
}

/// Which party list a battler lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Team {
    Team,
    Reserve,
    Hidden,
}

impl Team {
    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(Team::Team),
            1 => Some(Team::Reserve),
            2 => Some(Team::Hidden),
            _ => None,
        }
    }
}

/// A party member or enemy instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battler {
    pub instance_id: i64,
    pub person_id: i64,
    pub is_monster: bool,
    pub name: String,
    pub class_id: i64,
    pub level: i64,
    pub experience: f64,
    pub statistics: IndexMap<String, f64>,
    /// Equipment by slot id: (kind, equipment id)
    pub equipment: IndexMap<i64, (ItemKind, i64)>,
    pub skills: Vec<i64>,
    pub statuses: Vec<i64>,
    pub battler_graphic_id: i64,
}

impl Battler {
    /// Instance a battler from the hero/monster tables
    ///
    /// Returns `None` when the person or its class is unknown.
    pub fn from_person(
        data: &DataTables,
        person_id: i64,
        is_monster: bool,
        level: i64,
        instance_id: i64,
    ) -> Option<Battler> {
        let table = if is_monster {
            &data.monsters
        } else {
            &data.heroes
        };
        let person = table.get(&person_id)?;
        let class = data.resolved_class(person.class_id)?;
        let skills = class
            .skills
            .iter()
            .filter(|s| s.level <= level)
            .map(|s| s.skill_id)
            .collect();
        Some(Battler {
            instance_id,
            person_id,
            is_monster,
            name: person.base.name.clone(),
            class_id: person.class_id,
            level,
            experience: 0.0,
            statistics: class.statistics.clone(),
            equipment: IndexMap::new(),
            skills,
            statuses: Vec::new(),
            battler_graphic_id: person.battler_graphic_id,
        })
    }
}

/// A started chronometer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chronometer {
    pub started_at_ms: u64,
    pub paused: bool,
    /// Milliseconds already accumulated before the last (re)start
    pub accumulated_ms: u64,
    /// Count down from this duration instead of up
    pub countdown_ms: Option<u64>,
}

impl Chronometer {
    /// Current display value in milliseconds
    pub fn value_ms(&self, now_ms: u64) -> u64 {
        let elapsed = if self.paused {
            self.accumulated_ms
        } else {
            self.accumulated_ms + now_ms.saturating_sub(self.started_at_ms)
        };
        match self.countdown_ms {
            Some(total) => total.saturating_sub(elapsed),
            None => elapsed,
        }
    }
}

/// A song currently playing on one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayingSong {
    pub id: i64,
    pub volume: f64,
}

/// Screen tint state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenTone {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub grey: f64,
}

impl Default for ScreenTone {
    fn default() -> Self {
        Self {
            red: 0.0,
            green: 0.0,
            blue: 0.0,
            grey: 1.0,
        }
    }
}

/// Dialog box placement options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DialogBoxOptions {
    pub window_skin_id: i64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for DialogBoxOptions {
    fn default() -> Self {
        Self {
            window_skin_id: 1,
            x: 0.0,
            y: 380.0,
            width: 640.0,
            height: 100.0,
        }
    }
}

/// A picture currently displayed on the HUD layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayedPicture {
    pub picture_id: i64,
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
    pub opacity: f64,
    pub angle: f64,
}

/// Active weather effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Weather {
    #[default]
    None,
    Rain,
    Snow,
}

impl Weather {
    pub fn from_i64(v: i64) -> Self {
        match v {
            1 => Weather::Rain,
            2 => Weather::Snow,
            _ => Weather::None,
        }
    }
}

/// Runtime overrides of the current map's properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapProperties {
    pub music_id: Option<i64>,
    pub background_sound_id: Option<i64>,
    pub tileset_id: Option<i64>,
}

/// Step of the running battle scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleStep {
    Selection,
    Animation,
    Victory,
    Defeat,
}

/// How a finished battle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleResult {
    Win,
    Lose,
    Escape,
}

/// Action forced onto a battler by `ForceAnAction`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForcedAction {
    pub battler_instance: i64,
    pub action: BattleAction,
    pub target: ActionTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BattleAction {
    Attack,
    UseSkill(i64),
    UseItem(i64),
    DoNothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActionTarget {
    Enemy(i64),
    Ally(i64),
    AllEnemies,
    AllAllies,
}

/// The running battle, present between `StartBattle` and its resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSession {
    pub troop_id: i64,
    pub turn: u64,
    pub step: BattleStep,
    pub result: Option<BattleResult>,
    pub forced_action: Option<ForcedAction>,
}

impl BattleSession {
    pub fn new(troop_id: i64) -> Self {
        Self {
            troop_id,
            turn: 0,
            step: BattleStep::Selection,
            result: None,
            forced_action: None,
        }
    }
}

/// The mutable session state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub variables: Vec<Value>,
    pub items: IndexMap<i64, i64>,
    pub weapons: IndexMap<i64, i64>,
    pub armors: IndexMap<i64, i64>,
    pub currencies: IndexMap<i64, f64>,
    pub team: Vec<Battler>,
    pub reserve: Vec<Battler>,
    pub hidden: Vec<Battler>,
    pub chronometers: IndexMap<i64, Chronometer>,
    pub songs: IndexMap<SongKind, PlayingSong>,
    pub screen_tone: ScreenTone,
    pub weather: Weather,
    pub dialog_options: DialogBoxOptions,
    /// Displayed pictures by display index
    pub pictures: IndexMap<i64, DisplayedPicture>,
    pub map_properties: MapProperties,
    pub main_menu_allowed: bool,
    pub saves_allowed: bool,
    pub battle: Option<BattleSession>,
    pub last_battle_result: Option<BattleResult>,
    /// Selection committed by the most recent choice window
    pub last_choice: i64,
    next_instance_id: i64,
    blocking_hero: u32,
}

impl Game {
    /// Create a session with the given variable bank size
    pub fn new(variable_count: usize) -> Self {
        Self {
            variables: vec![Value::Null; variable_count],
            items: IndexMap::new(),
            weapons: IndexMap::new(),
            armors: IndexMap::new(),
            currencies: IndexMap::new(),
            team: Vec::new(),
            reserve: Vec::new(),
            hidden: Vec::new(),
            chronometers: IndexMap::new(),
            songs: IndexMap::new(),
            screen_tone: ScreenTone::default(),
            weather: Weather::None,
            dialog_options: DialogBoxOptions::default(),
            pictures: IndexMap::new(),
            map_properties: MapProperties::default(),
            main_menu_allowed: true,
            saves_allowed: true,
            battle: None,
            last_battle_result: None,
            last_choice: -1,
            next_instance_id: 1,
            blocking_hero: 0,
        }
    }

    /// Read a variable; out-of-range reads yield null
    pub fn variable(&self, index: usize) -> Value {
        self.variables.get(index).cloned().unwrap_or(Value::Null)
    }

    /// Write a variable; returns false when the index is out of range
    pub fn set_variable(&mut self, index: usize, value: Value) -> bool {
        match self.variables.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn inventory(&self, kind: ItemKind) -> &IndexMap<i64, i64> {
        match kind {
            ItemKind::Item => &self.items,
            ItemKind::Weapon => &self.weapons,
            ItemKind::Armor => &self.armors,
        }
    }

    fn inventory_mut(&mut self, kind: ItemKind) -> &mut IndexMap<i64, i64> {
        match kind {
            ItemKind::Item => &mut self.items,
            ItemKind::Weapon => &mut self.weapons,
            ItemKind::Armor => &mut self.armors,
        }
    }

    /// Current count of one inventory entry
    pub fn item_count(&self, kind: ItemKind, id: i64) -> i64 {
        self.inventory(kind).get(&id).copied().unwrap_or(0)
    }

    /// Set an inventory entry; counts clamp at zero and empty entries drop
    pub fn set_item_count(&mut self, kind: ItemKind, id: i64, count: i64) {
        let inventory = self.inventory_mut(kind);
        if count <= 0 {
            inventory.shift_remove(&id);
        } else {
            inventory.insert(id, count);
        }
    }

    /// Current amount of a currency
    pub fn currency(&self, id: i64) -> f64 {
        self.currencies.get(&id).copied().unwrap_or(0.0)
    }

    /// Set a currency amount, clamped at zero
    pub fn set_currency(&mut self, id: i64, amount: f64) {
        self.currencies.insert(id, amount.max(0.0));
    }

    /// Find a battler in any party list
    pub fn battler(&self, instance_id: i64) -> Option<&Battler> {
        self.team
            .iter()
            .chain(self.reserve.iter())
            .chain(self.hidden.iter())
            .find(|b| b.instance_id == instance_id)
    }

    /// Find a battler mutably in any party list
    pub fn battler_mut(&mut self, instance_id: i64) -> Option<&mut Battler> {
        self.team
            .iter_mut()
            .chain(self.reserve.iter_mut())
            .chain(self.hidden.iter_mut())
            .find(|b| b.instance_id == instance_id)
    }

    /// The list backing one party
    pub fn party_mut(&mut self, team: Team) -> &mut Vec<Battler> {
        match team {
            Team::Team => &mut self.team,
            Team::Reserve => &mut self.reserve,
            Team::Hidden => &mut self.hidden,
        }
    }

    /// Allocate a fresh battler instance id
    pub fn allocate_instance_id(&mut self) -> i64 {
        let id = self.next_instance_id;
        self.next_instance_id += 1;
        id
    }

    /// Start a chronometer; a second start for the same id is a no-op
    ///
    /// Returns true when a new entry was created.
    pub fn start_chronometer(&mut self, id: i64, now_ms: u64, countdown_ms: Option<u64>) -> bool {
        if self.chronometers.contains_key(&id) {
            return false;
        }
        self.chronometers.insert(
            id,
            Chronometer {
                started_at_ms: now_ms,
                paused: false,
                accumulated_ms: 0,
                countdown_ms,
            },
        );
        true
    }

    /// Whether a blocking reaction currently freezes the hero
    pub fn hero_blocked(&self) -> bool {
        self.blocking_hero > 0
    }

    /// Adjust the blocking-reaction counter
    pub fn block_hero(&mut self, on: bool) {
        if on {
            self.blocking_hero += 1;
        } else {
            self.blocking_hero = self.blocking_hero.saturating_sub(1);
        }
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new(crate::data::SystemDef::default().variable_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variables() {
        let mut game = Game::new(10);
        assert!(game.set_variable(3, Value::Int(7)));
        assert_eq!(game.variable(3), Value::Int(7));
        assert_eq!(game.variable(99), Value::Null);
        assert!(!game.set_variable(99, Value::Int(1)));
    }

    #[test]
    fn test_inventory_clamps_at_zero() {
        let mut game = Game::new(1);
        game.set_item_count(ItemKind::Item, 5, 2);
        assert_eq!(game.item_count(ItemKind::Item, 5), 2);
        game.set_item_count(ItemKind::Item, 5, -4);
        assert_eq!(game.item_count(ItemKind::Item, 5), 0);
        assert!(game.items.is_empty());
    }

    #[test]
    fn test_chronometer_start_is_idempotent() {
        let mut game = Game::new(1);
        assert!(game.start_chronometer(1, 1000, None));
        assert!(!game.start_chronometer(1, 5000, None));
        assert_eq!(game.chronometers.len(), 1);
        assert_eq!(game.chronometers[&1].started_at_ms, 1000);
    }

    #[test]
    fn test_chronometer_value() {
        let chrono = Chronometer {
            started_at_ms: 1000,
            paused: false,
            accumulated_ms: 500,
            countdown_ms: None,
        };
        assert_eq!(chrono.value_ms(3000), 2500);
        let countdown = Chronometer {
            started_at_ms: 0,
            paused: false,
            accumulated_ms: 0,
            countdown_ms: Some(10_000),
        };
        assert_eq!(countdown.value_ms(4000), 6000);
        assert_eq!(countdown.value_ms(20_000), 0);
    }

    #[test]
    fn test_hero_blocking_counter() {
        let mut game = Game::new(1);
        assert!(!game.hero_blocked());
        game.block_hero(true);
        game.block_hero(true);
        game.block_hero(false);
        assert!(game.hero_blocked());
        game.block_hero(false);
        assert!(!game.hero_blocked());
    }
}
