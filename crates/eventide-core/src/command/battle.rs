//! Battle and menu commands

use super::cursor::Cursor;
use super::{CommandState, Outcome};
use crate::context::{ExecutionContext, Scope};
use crate::dynamic::DynamicValue;
use crate::error::{EngineError, Result};
use crate::session::{
    ActionTarget, BattleAction, BattleSession, BattleStep, Battler, ForcedAction,
};

/// Enter a battle against a troop, waiting for its resolution
#[derive(Debug, Clone, PartialEq)]
pub struct StartBattle {
    pub troop: DynamicValue,
    pub allow_escape: bool,
    pub allow_lose: bool,
}

impl StartBattle {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            troop: cursor.next_dynamic()?,
            allow_escape: cursor.next_bool()?,
            allow_lose: cursor.next_bool()?,
        })
    }

    pub fn initialize(&self, ctx: &mut ExecutionContext, scope: &Scope) -> CommandState {
        let troop_id = ctx.resolve(&self.troop, scope).as_int().unwrap_or(0);
        if !ctx.data.troops.contains_key(&troop_id) {
            ctx.report(EngineError::MissingEntityReference {
                table: "troop",
                id: troop_id,
            });
            return CommandState::None;
        }
        ctx.game.battle = Some(BattleSession::new(troop_id));
        ctx.platform.start_battle(troop_id);
        CommandState::BattleWait
    }

    pub fn update(&self, state: &CommandState, ctx: &mut ExecutionContext) -> Outcome {
        if !matches!(state, CommandState::BattleWait) {
            return Outcome::Advance(1);
        }
        // the battle scene drives the session; we only watch for its end
        match ctx.game.battle.as_ref().and_then(|b| b.result) {
            Some(result) => {
                ctx.game.last_battle_result = Some(result);
                ctx.game.battle = None;
                Outcome::Advance(1)
            }
            None if ctx.game.battle.is_none() => Outcome::Advance(1),
            None => Outcome::Pending,
        }
    }
}

/// Force a battler's next action and push the battle into its animation step
#[derive(Debug, Clone, PartialEq)]
pub struct ForceAnAction {
    pub battler: DynamicValue,
    pub action: BattleAction,
    pub target: ActionTarget,
}

impl ForceAnAction {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        let battler = cursor.next_dynamic()?;
        let action = match cursor.next_i64()? {
            1 => BattleAction::UseSkill(cursor.next_i64()?),
            2 => BattleAction::UseItem(cursor.next_i64()?),
            3 => BattleAction::DoNothing,
            _ => BattleAction::Attack,
        };
        let target = match cursor.next_i64()? {
            1 => ActionTarget::Ally(cursor.next_i64()?),
            2 => ActionTarget::AllEnemies,
            3 => ActionTarget::AllAllies,
            _ => ActionTarget::Enemy(cursor.next_i64()?),
        };
        Ok(Self {
            battler,
            action,
            target,
        })
    }

    pub fn initialize(&self) -> CommandState {
        CommandState::ForcedAction { applied: false }
    }

    pub fn update(
        &self,
        state: &mut CommandState,
        ctx: &mut ExecutionContext,
        scope: &Scope,
    ) -> Outcome {
        let CommandState::ForcedAction { applied } = state else {
            return Outcome::Advance(1);
        };
        if !*applied {
            let instance = ctx.resolve_i64(&self.battler, scope);
            match ctx.game.battle.as_mut() {
                Some(battle) => {
                    battle.forced_action = Some(ForcedAction {
                        battler_instance: instance,
                        action: self.action,
                        target: self.target,
                    });
                    battle.step = BattleStep::Animation;
                    *applied = true;
                    return Outcome::Pending;
                }
                None => {
                    ctx.report(EngineError::InvalidSessionAccess { what: "battle" });
                    return Outcome::Advance(1);
                }
            }
        }
        // wait for the externally-driven animation step to end
        match ctx.game.battle.as_ref() {
            Some(battle) if battle.step == BattleStep::Animation => Outcome::Pending,
            _ => Outcome::Advance(1),
        }
    }
}

/// Swap a battler's portrait/battler graphics
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeBattlerGraphics {
    pub battler: DynamicValue,
    pub graphics: DynamicValue,
}

impl ChangeBattlerGraphics {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            battler: cursor.next_dynamic()?,
            graphics: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let instance = ctx.resolve_i64(&self.battler, scope);
        let graphics = ctx.resolve_i64(&self.graphics, scope);
        match ctx.game.battler_mut(instance) {
            Some(battler) => battler.battler_graphic_id = graphics,
            None => ctx.report(EngineError::MissingEntityReference {
                table: "battler",
                id: instance,
            }),
        }
        Outcome::Advance(1)
    }
}

/// Replace a battler with a monster instance, keeping its slot
#[derive(Debug, Clone, PartialEq)]
pub struct TransformABattler {
    pub battler: DynamicValue,
    pub monster: DynamicValue,
    pub level: DynamicValue,
}

impl TransformABattler {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            battler: cursor.next_dynamic()?,
            monster: cursor.next_dynamic()?,
            level: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let instance = ctx.resolve_i64(&self.battler, scope);
        let monster_id = ctx.resolve_i64(&self.monster, scope);
        let level = ctx.resolve_i64(&self.level, scope).max(1);
        let Some(replacement) = Battler::from_person(ctx.data, monster_id, true, level, instance)
        else {
            ctx.report(EngineError::MissingEntityReference {
                table: "monster",
                id: monster_id,
            });
            return Outcome::Advance(1);
        };
        match ctx.game.battler_mut(instance) {
            Some(battler) => *battler = replacement,
            None => ctx.report(EngineError::MissingEntityReference {
                table: "battler",
                id: instance,
            }),
        }
        Outcome::Advance(1)
    }
}

/// Lock or unlock saving
#[derive(Debug, Clone, PartialEq)]
pub struct AllowForbidSaves {
    pub allow: DynamicValue,
}

impl AllowForbidSaves {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            allow: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        ctx.game.saves_allowed = ctx.resolve_bool(&self.allow, scope);
        Outcome::Advance(1)
    }
}

/// Lock or unlock the main menu
#[derive(Debug, Clone, PartialEq)]
pub struct AllowForbidMainMenu {
    pub allow: DynamicValue,
}

impl AllowForbidMainMenu {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            allow: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        ctx.game.main_menu_allowed = ctx.resolve_bool(&self.allow, scope);
        Outcome::Advance(1)
    }
}

/// Open the main menu, honoring the menu lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenMainMenu;

impl OpenMainMenu {
    pub fn update(&self, ctx: &mut ExecutionContext) -> Outcome {
        if ctx.game.main_menu_allowed {
            ctx.platform.open_main_menu();
        }
        Outcome::Advance(1)
    }
}

/// Open the saves menu, honoring the save lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenSavesMenu;

impl OpenSavesMenu {
    pub fn update(&self, ctx: &mut ExecutionContext) -> Outcome {
        if ctx.game.saves_allowed {
            ctx.platform.open_saves_menu();
        }
        Outcome::Advance(1)
    }
}

/// Open a shop
#[derive(Debug, Clone, PartialEq)]
pub struct StartShopMenu {
    pub shop: DynamicValue,
}

impl StartShopMenu {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            shop: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let shop = ctx.resolve_i64(&self.shop, scope);
        ctx.platform.open_shop(shop);
        Outcome::Advance(1)
    }
}

/// Refill a shop's stock
#[derive(Debug, Clone, PartialEq)]
pub struct RestockShop {
    pub shop: DynamicValue,
}

impl RestockShop {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            shop: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let shop = ctx.resolve_i64(&self.shop, scope);
        ctx.platform.restock_shop(shop);
        Outcome::Advance(1)
    }
}

/// Open the hero-naming menu
#[derive(Debug, Clone, PartialEq)]
pub struct EnterANameMenu {
    pub hero: DynamicValue,
    pub max_chars: DynamicValue,
}

impl EnterANameMenu {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            hero: cursor.next_dynamic()?,
            max_chars: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let hero = ctx.resolve_i64(&self.hero, scope);
        let max_chars = ctx.resolve_i64(&self.max_chars, scope).clamp(1, 64) as usize;
        ctx.platform.open_name_menu(hero, max_chars);
        Outcome::Advance(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataTables, Localized, TroopDef};
    use crate::identity::ObjectId;
    use crate::platform::RecordingPlatform;
    use crate::rng::GameRng;
    use crate::scene::Scene;
    use crate::session::{BattleResult, Game};

    #[test]
    fn test_start_battle_waits_for_resolution() {
        let mut game = Game::new(1);
        let mut data = DataTables::new();
        data.troops.insert(
            7,
            TroopDef {
                base: Localized::new(7, "wolves"),
                monsters: Vec::new(),
                reactions: Vec::new(),
            },
        );
        let mut scene = Scene::new();
        let mut platform = RecordingPlatform::new();
        let mut rng = GameRng::new(1);
        let scope = Scope::new(ObjectId::HERO, 1);
        let command = StartBattle {
            troop: DynamicValue::Number(7),
            allow_escape: true,
            allow_lose: false,
        };

        let mut ctx = ExecutionContext {
            game: &mut game,
            data: &data,
            scene: &mut scene,
            platform: &mut platform,
            rng: &mut rng,
            now_ms: 0,
            delta_ms: 16,
        };
        let state = command.initialize(&mut ctx, &scope);
        assert_eq!(command.update(&state, &mut ctx), Outcome::Pending);

        ctx.game.battle.as_mut().unwrap().result = Some(BattleResult::Win);
        assert_eq!(command.update(&state, &mut ctx), Outcome::Advance(1));
        assert_eq!(game.last_battle_result, Some(BattleResult::Win));
        assert!(game.battle.is_none());
        assert_eq!(platform.count("start_battle 7"), 1);
    }
}
