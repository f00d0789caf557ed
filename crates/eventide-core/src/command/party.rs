//! Party, inventory and battler commands

use super::cursor::Cursor;
use super::variables::Operation;
use super::Outcome;
use crate::context::{ExecutionContext, Scope};
use crate::data::TableKind;
use crate::dynamic::DynamicValue;
use crate::error::{EngineError, Result};
use crate::session::{Battler, ItemKind, Team};
use crate::value::Value;

/// Apply an operator to one inventory entry
#[derive(Debug, Clone, PartialEq)]
pub struct ModifyInventory {
    pub kind: ItemKind,
    pub id: DynamicValue,
    pub operation: Operation,
    pub value: DynamicValue,
}

impl ModifyInventory {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            kind: ItemKind::from_i64(cursor.next_i64()?).unwrap_or(ItemKind::Item),
            id: cursor.next_dynamic()?,
            operation: Operation::from_i64(cursor.next_i64()?).unwrap_or(Operation::Set),
            value: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let id = ctx.resolve_i64(&self.id, scope);
        let value = ctx.resolve_i64(&self.value, scope);
        let current = ctx.game.item_count(self.kind, id);
        ctx.game
            .set_item_count(self.kind, id, self.operation.apply_i64(current, value));
        Outcome::Advance(1)
    }
}

/// Apply an operator to a currency amount
#[derive(Debug, Clone, PartialEq)]
pub struct ModifyCurrency {
    pub id: DynamicValue,
    pub operation: Operation,
    pub value: DynamicValue,
}

impl ModifyCurrency {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            id: cursor.next_dynamic()?,
            operation: Operation::from_i64(cursor.next_i64()?).unwrap_or(Operation::Set),
            value: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let id = ctx.resolve_i64(&self.id, scope);
        let value = ctx.resolve_f64(&self.value, scope);
        let current = ctx.game.currency(id);
        ctx.game
            .set_currency(id, self.operation.apply_f64(current, value));
        Outcome::Advance(1)
    }
}

/// What a `ModifyTeam` command does
#[derive(Debug, Clone, PartialEq)]
pub enum TeamOperation {
    /// Instance a new hero/monster into a party list, storing the new
    /// instance id into a variable
    NewInstance {
        is_monster: bool,
        person: DynamicValue,
        level: DynamicValue,
        team: Team,
        /// Raw variable index receiving the instance id
        variable: DynamicValue,
    },
    /// Move an instanced battler between party lists
    Move {
        instance: DynamicValue,
        team: Team,
    },
    /// Remove an instanced battler entirely
    Remove { instance: DynamicValue },
}

/// Add, move or remove party members
#[derive(Debug, Clone, PartialEq)]
pub struct ModifyTeam {
    pub operation: TeamOperation,
}

impl ModifyTeam {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        let operation = match cursor.next_i64()? {
            1 => TeamOperation::Move {
                instance: cursor.next_dynamic()?,
                team: Team::from_i64(cursor.next_i64()?).unwrap_or(Team::Team),
            },
            2 => TeamOperation::Remove {
                instance: cursor.next_dynamic()?,
            },
            _ => TeamOperation::NewInstance {
                is_monster: cursor.next_bool()?,
                person: cursor.next_dynamic()?,
                level: cursor.next_dynamic()?,
                team: Team::from_i64(cursor.next_i64()?).unwrap_or(Team::Team),
                variable: cursor.next_dynamic()?,
            },
        };
        Ok(Self { operation })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        match &self.operation {
            TeamOperation::NewInstance {
                is_monster,
                person,
                level,
                team,
                variable,
            } => {
                let person_id = ctx.resolve_i64(person, scope);
                let level = ctx.resolve_i64(level, scope).max(1);
                let instance_id = ctx.game.allocate_instance_id();
                match Battler::from_person(ctx.data, person_id, *is_monster, level, instance_id) {
                    Some(battler) => {
                        ctx.game.party_mut(*team).push(battler);
                        let index =
                            ctx.resolve_raw(variable, scope).as_int().unwrap_or(0).max(0) as usize;
                        ctx.game.set_variable(index, Value::Int(instance_id));
                    }
                    None => ctx.report(EngineError::MissingEntityReference {
                        table: if *is_monster { "monster" } else { "hero" },
                        id: person_id,
                    }),
                }
            }
            TeamOperation::Move { instance, team } => {
                let instance = ctx.resolve_i64(instance, scope);
                let taken = take_battler(ctx, instance);
                match taken {
                    Some(battler) => ctx.game.party_mut(*team).push(battler),
                    None => ctx.report(EngineError::MissingEntityReference {
                        table: "battler",
                        id: instance,
                    }),
                }
            }
            TeamOperation::Remove { instance } => {
                let instance = ctx.resolve_i64(instance, scope);
                if take_battler(ctx, instance).is_none() {
                    ctx.report(EngineError::MissingEntityReference {
                        table: "battler",
                        id: instance,
                    });
                }
            }
        }
        Outcome::Advance(1)
    }
}

fn take_battler(ctx: &mut ExecutionContext, instance: i64) -> Option<Battler> {
    for team in [Team::Team, Team::Reserve, Team::Hidden] {
        let list = ctx.game.party_mut(team);
        if let Some(pos) = list.iter().position(|b| b.instance_id == instance) {
            return Some(list.remove(pos));
        }
    }
    None
}

fn with_battler(
    ctx: &mut ExecutionContext,
    scope: &Scope,
    instance: &DynamicValue,
    apply: impl FnOnce(&mut ExecutionContext, i64) -> bool,
) -> Outcome {
    let instance = ctx.resolve_i64(instance, scope);
    if !apply(ctx, instance) {
        ctx.report(EngineError::MissingEntityReference {
            table: "battler",
            id: instance,
        });
    }
    Outcome::Advance(1)
}

/// Rename an instanced battler
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeName {
    pub instance: DynamicValue,
    pub name: DynamicValue,
}

impl ChangeName {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            instance: cursor.next_dynamic()?,
            name: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let name = ctx.resolve_string(&self.name, scope);
        with_battler(ctx, scope, &self.instance, |ctx, instance| {
            match ctx.game.battler_mut(instance) {
                Some(battler) => {
                    battler.name = name;
                    true
                }
                None => false,
            }
        })
    }
}

/// Equip a weapon or armor into a slot
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEquipment {
    pub instance: DynamicValue,
    pub slot: i64,
    pub kind: ItemKind,
    pub equipment: DynamicValue,
}

impl ChangeEquipment {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            instance: cursor.next_dynamic()?,
            slot: cursor.next_i64()?,
            kind: ItemKind::from_i64(cursor.next_i64()?).unwrap_or(ItemKind::Weapon),
            equipment: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let id = ctx.resolve_i64(&self.equipment, scope);
        let table = match self.kind {
            ItemKind::Weapon => TableKind::Weapon,
            _ => TableKind::Armor,
        };
        if !ctx.data.contains(table, id) {
            ctx.report(EngineError::MissingEntityReference {
                table: table.name(),
                id,
            });
            return Outcome::Advance(1);
        }
        let (slot, kind) = (self.slot, self.kind);
        with_battler(ctx, scope, &self.instance, |ctx, instance| {
            match ctx.game.battler_mut(instance) {
                Some(battler) => {
                    battler.equipment.insert(slot, (kind, id));
                    true
                }
                None => false,
            }
        })
    }
}

/// Apply an operator to one named statistic
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeAStatistic {
    pub instance: DynamicValue,
    pub statistic: DynamicValue,
    pub operation: Operation,
    pub value: DynamicValue,
}

impl ChangeAStatistic {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            instance: cursor.next_dynamic()?,
            statistic: cursor.next_dynamic()?,
            operation: Operation::from_i64(cursor.next_i64()?).unwrap_or(Operation::Set),
            value: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let stat = ctx.resolve_string(&self.statistic, scope);
        let value = ctx.resolve_f64(&self.value, scope);
        let operation = self.operation;
        with_battler(ctx, scope, &self.instance, |ctx, instance| {
            match ctx.game.battler_mut(instance) {
                Some(battler) => {
                    let current = battler.statistics.get(&stat).copied().unwrap_or(0.0);
                    battler
                        .statistics
                        .insert(stat, operation.apply_f64(current, value));
                    true
                }
                None => false,
            }
        })
    }
}

/// Learn or forget a skill
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeASkill {
    pub instance: DynamicValue,
    pub forget: bool,
    pub skill: DynamicValue,
}

impl ChangeASkill {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            instance: cursor.next_dynamic()?,
            forget: cursor.next_i64()? == 1,
            skill: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let skill = ctx.resolve_i64(&self.skill, scope);
        let forget = self.forget;
        with_battler(ctx, scope, &self.instance, |ctx, instance| {
            match ctx.game.battler_mut(instance) {
                Some(battler) => {
                    if forget {
                        battler.skills.retain(|s| *s != skill);
                    } else if !battler.skills.contains(&skill) {
                        battler.skills.push(skill);
                    }
                    true
                }
                None => false,
            }
        })
    }
}

/// Change a battler's class, refreshing its class-derived statistics
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeClass {
    pub instance: DynamicValue,
    pub class: DynamicValue,
}

impl ChangeClass {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            instance: cursor.next_dynamic()?,
            class: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let class_id = ctx.resolve_i64(&self.class, scope);
        let Some(class) = ctx.data.resolved_class(class_id) else {
            ctx.report(EngineError::MissingEntityReference {
                table: "class",
                id: class_id,
            });
            return Outcome::Advance(1);
        };
        with_battler(ctx, scope, &self.instance, |ctx, instance| {
            match ctx.game.battler_mut(instance) {
                Some(battler) => {
                    battler.class_id = class_id;
                    for (stat, value) in &class.statistics {
                        battler.statistics.insert(stat.clone(), *value);
                    }
                    true
                }
                None => false,
            }
        })
    }
}

/// Add or remove a status effect
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeStatus {
    pub instance: DynamicValue,
    pub remove: bool,
    pub status: DynamicValue,
}

impl ChangeStatus {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            instance: cursor.next_dynamic()?,
            remove: cursor.next_i64()? == 1,
            status: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let status = ctx.resolve_i64(&self.status, scope);
        let remove = self.remove;
        with_battler(ctx, scope, &self.instance, |ctx, instance| {
            match ctx.game.battler_mut(instance) {
                Some(battler) => {
                    if remove {
                        battler.statuses.retain(|s| *s != status);
                    } else if !battler.statuses.contains(&status) {
                        battler.statuses.push(status);
                    }
                    true
                }
                None => false,
            }
        })
    }
}

/// Overwrite a battler's accumulated experience
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeExperienceCurve {
    pub instance: DynamicValue,
    pub experience: DynamicValue,
}

impl ChangeExperienceCurve {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            instance: cursor.next_dynamic()?,
            experience: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let experience = ctx.resolve_f64(&self.experience, scope).max(0.0);
        with_battler(ctx, scope, &self.instance, |ctx, instance| {
            match ctx.game.battler_mut(instance) {
                Some(battler) => {
                    battler.experience = experience;
                    true
                }
                None => false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataTables;
    use crate::identity::ObjectId;
    use crate::platform::RecordingPlatform;
    use crate::rng::GameRng;
    use crate::scene::Scene;
    use crate::session::Game;
    use serde_json::json;

    #[test]
    fn test_modify_inventory_add_scenario() {
        let mut game = Game::new(4);
        game.set_item_count(ItemKind::Item, 5, 2);
        let data = DataTables::new();
        let mut scene = Scene::new();
        let mut platform = RecordingPlatform::new();
        let mut rng = GameRng::new(1);
        let mut ctx = ExecutionContext {
            game: &mut game,
            data: &data,
            scene: &mut scene,
            platform: &mut platform,
            rng: &mut rng,
            now_ms: 0,
            delta_ms: 16,
        };
        let scope = Scope::new(ObjectId::HERO, 1);

        // kind=item, id=5, op=add, value=3
        let tokens = vec![json!(0), json!(3), json!(5), json!(1), json!(3), json!(3)];
        let command = ModifyInventory::read(&mut Cursor::new(&tokens)).unwrap();
        assert_eq!(command.update(&mut ctx, &scope), Outcome::Advance(1));
        assert_eq!(game.item_count(ItemKind::Item, 5), 5);
    }
}
