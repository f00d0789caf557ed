//! The event command catalog
//!
//! Every command follows the same protocol: decoded once from a flat token
//! stream by kind id, optionally initialized into an opaque per-invocation
//! [`CommandState`], then ticked through `update` until it yields something
//! other than [`Outcome::Pending`]. Commands never abort their interpreter;
//! bad references degrade to reported no-ops.

pub mod battle;
pub mod cursor;
pub mod display;
pub mod flow;
pub mod media;
pub mod movement;
pub mod party;
pub mod variables;

use crate::context::{ExecutionContext, Scope};
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::platform::SongKind;
use cursor::Cursor;
use serde_json::Value as Json;

/// Stable integer command kind ids, as persisted in reaction JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum CommandKind {
    ShowText = 1,
    ChangeVariables = 2,
    EndGame = 3,
    While = 4,
    /// Block marker, never instantiated
    EndWhile = 5,
    WhileBreak = 6,
    InputNumber = 7,
    If = 8,
    Else = 9,
    /// Block marker, never instantiated
    EndIf = 10,
    OpenMainMenu = 11,
    OpenSavesMenu = 12,
    ModifyInventory = 13,
    ModifyTeam = 14,
    StartBattle = 15,
    IfWin = 16,
    IfLose = 17,
    ChangeState = 18,
    ChangeProperty = 19,
    MoveObject = 20,
    Wait = 21,
    MoveCamera = 22,
    PlayMusic = 23,
    StopMusic = 24,
    PlayBackgroundSound = 25,
    StopBackgroundSound = 26,
    PlaySound = 27,
    PlayMusicEffect = 28,
    ChangeMapProperties = 29,
    DisplayChoice = 30,
    Choice = 31,
    /// Block marker, never instantiated
    EndChoice = 32,
    Script = 33,
    DisplayAPicture = 34,
    SetMoveTurnAPicture = 35,
    RemoveAPicture = 36,
    SetDialogBoxOptions = 37,
    TitleScreen = 38,
    ChangeScreenTone = 39,
    RemoveObjectFromMap = 40,
    StopReaction = 41,
    AllowForbidSaves = 42,
    AllowForbidMainMenu = 43,
    CallCommonReaction = 44,
    Label = 45,
    JumpToLabel = 46,
    Comment = 47,
    ChangeAStatistic = 48,
    ChangeASkill = 49,
    ChangeName = 50,
    ChangeEquipment = 51,
    ModifyCurrency = 52,
    DisplayAnAnimation = 53,
    ShakeScreen = 54,
    FlashScreen = 55,
    Plugin = 56,
    StartShopMenu = 57,
    RestockShop = 58,
    EnterANameMenu = 59,
    CreateObjectInMap = 60,
    ChangeStatus = 61,
    ResetCamera = 62,
    ChangeBattlerGraphics = 63,
    ChangeClass = 64,
    ChangeChronometer = 65,
    ChangeWeather = 66,
    PlayAVideo = 67,
    SwitchTexture = 68,
    TeleportObject = 69,
    ChangeExperienceCurve = 70,
    TransformABattler = 71,
    ForceAnAction = 72,
    StopASound = 73,
}

impl CommandKind {
    pub fn from_i64(v: i64) -> Option<Self> {
        Some(match v {
            1 => CommandKind::ShowText,
            2 => CommandKind::ChangeVariables,
            3 => CommandKind::EndGame,
            4 => CommandKind::While,
            5 => CommandKind::EndWhile,
            6 => CommandKind::WhileBreak,
            7 => CommandKind::InputNumber,
            8 => CommandKind::If,
            9 => CommandKind::Else,
            10 => CommandKind::EndIf,
            11 => CommandKind::OpenMainMenu,
            12 => CommandKind::OpenSavesMenu,
            13 => CommandKind::ModifyInventory,
            14 => CommandKind::ModifyTeam,
            15 => CommandKind::StartBattle,
            16 => CommandKind::IfWin,
            17 => CommandKind::IfLose,
            18 => CommandKind::ChangeState,
            19 => CommandKind::ChangeProperty,
            20 => CommandKind::MoveObject,
            21 => CommandKind::Wait,
            22 => CommandKind::MoveCamera,
            23 => CommandKind::PlayMusic,
            24 => CommandKind::StopMusic,
            25 => CommandKind::PlayBackgroundSound,
            26 => CommandKind::StopBackgroundSound,
            27 => CommandKind::PlaySound,
            28 => CommandKind::PlayMusicEffect,
            29 => CommandKind::ChangeMapProperties,
            30 => CommandKind::DisplayChoice,
            31 => CommandKind::Choice,
            32 => CommandKind::EndChoice,
            33 => CommandKind::Script,
            34 => CommandKind::DisplayAPicture,
            35 => CommandKind::SetMoveTurnAPicture,
            36 => CommandKind::RemoveAPicture,
            37 => CommandKind::SetDialogBoxOptions,
            38 => CommandKind::TitleScreen,
            39 => CommandKind::ChangeScreenTone,
            40 => CommandKind::RemoveObjectFromMap,
            41 => CommandKind::StopReaction,
            42 => CommandKind::AllowForbidSaves,
            43 => CommandKind::AllowForbidMainMenu,
            44 => CommandKind::CallCommonReaction,
            45 => CommandKind::Label,
            46 => CommandKind::JumpToLabel,
            47 => CommandKind::Comment,
            48 => CommandKind::ChangeAStatistic,
            49 => CommandKind::ChangeASkill,
            50 => CommandKind::ChangeName,
            51 => CommandKind::ChangeEquipment,
            52 => CommandKind::ModifyCurrency,
            53 => CommandKind::DisplayAnAnimation,
            54 => CommandKind::ShakeScreen,
            55 => CommandKind::FlashScreen,
            56 => CommandKind::Plugin,
            57 => CommandKind::StartShopMenu,
            58 => CommandKind::RestockShop,
            59 => CommandKind::EnterANameMenu,
            60 => CommandKind::CreateObjectInMap,
            61 => CommandKind::ChangeStatus,
            62 => CommandKind::ResetCamera,
            63 => CommandKind::ChangeBattlerGraphics,
            64 => CommandKind::ChangeClass,
            65 => CommandKind::ChangeChronometer,
            66 => CommandKind::ChangeWeather,
            67 => CommandKind::PlayAVideo,
            68 => CommandKind::SwitchTexture,
            69 => CommandKind::TeleportObject,
            70 => CommandKind::ChangeExperienceCurve,
            71 => CommandKind::TransformABattler,
            72 => CommandKind::ForceAnAction,
            73 => CommandKind::StopASound,
            _ => return None,
        })
    }
}

/// What a command's `update` tells the interpreter
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Not finished; re-invoke next tick with the same state
    Pending,
    /// Finished; move past this node and the following `n - 1` sibling
    /// subtrees
    Advance(usize),
    /// Finished deciding; walk into this node's children
    Enter,
    /// Relocate the cursor to a recorded label
    Jump(String),
    /// Exit past the enclosing `While`
    Break,
    /// Stop the whole interpreter
    Stop,
}

/// Opaque per-invocation command state, one variant per stateful command
#[derive(Debug)]
pub enum CommandState {
    None,
    WaitUntil { until_ms: u64 },
    ChangeVariables(variables::ChangeVariablesState),
    InputNumber(variables::InputNumberState),
    Move(movement::MoveObjectState),
    Fade(media::FadeState),
    Nested(Box<Interpreter>),
    BattleWait,
    ForcedAction { applied: bool },
}

/// A decoded event command
#[derive(Debug, Clone, PartialEq)]
pub enum EventCommand {
    If(flow::If),
    Else(flow::Else),
    IfWin(flow::IfWin),
    IfLose(flow::IfLose),
    While(flow::While),
    WhileBreak(flow::WhileBreak),
    DisplayChoice(flow::DisplayChoice),
    Choice(flow::Choice),
    Label(flow::Label),
    JumpToLabel(flow::JumpToLabel),
    Wait(flow::Wait),
    Comment(flow::Comment),
    StopReaction,
    CallCommonReaction(flow::CallCommonReaction),
    EndGame,
    TitleScreen,
    ChangeVariables(variables::ChangeVariables),
    InputNumber(variables::InputNumber),
    ChangeProperty(variables::ChangeProperty),
    ChangeChronometer(variables::ChangeChronometer),
    Script(variables::Script),
    Plugin(variables::Plugin),
    ModifyInventory(party::ModifyInventory),
    ModifyCurrency(party::ModifyCurrency),
    ModifyTeam(party::ModifyTeam),
    ChangeName(party::ChangeName),
    ChangeEquipment(party::ChangeEquipment),
    ChangeAStatistic(party::ChangeAStatistic),
    ChangeASkill(party::ChangeASkill),
    ChangeClass(party::ChangeClass),
    ChangeStatus(party::ChangeStatus),
    ChangeExperienceCurve(party::ChangeExperienceCurve),
    MoveObject(movement::MoveObject),
    TeleportObject(movement::TeleportObject),
    MoveCamera(movement::MoveCamera),
    ResetCamera(movement::ResetCamera),
    ChangeState(movement::ChangeState),
    CreateObjectInMap(movement::CreateObjectInMap),
    RemoveObjectFromMap(movement::RemoveObjectFromMap),
    SwitchTexture(movement::SwitchTexture),
    ChangeMapProperties(movement::ChangeMapProperties),
    ChangeWeather(movement::ChangeWeather),
    PlayMusic(media::PlaySong),
    PlayBackgroundSound(media::PlaySong),
    PlaySound(media::PlaySong),
    PlayMusicEffect(media::PlaySong),
    StopMusic(media::StopSong),
    StopBackgroundSound(media::StopSong),
    StopASound(media::StopASound),
    ShowText(display::ShowText),
    DisplayAPicture(display::DisplayAPicture),
    SetMoveTurnAPicture(display::SetMoveTurnAPicture),
    RemoveAPicture(display::RemoveAPicture),
    DisplayAnAnimation(display::DisplayAnAnimation),
    ChangeScreenTone(display::ChangeScreenTone),
    FlashScreen(display::FlashScreen),
    ShakeScreen(display::ShakeScreen),
    SetDialogBoxOptions(display::SetDialogBoxOptions),
    PlayAVideo(display::PlayAVideo),
    StartBattle(battle::StartBattle),
    ForceAnAction(battle::ForceAnAction),
    ChangeBattlerGraphics(battle::ChangeBattlerGraphics),
    TransformABattler(battle::TransformABattler),
    AllowForbidSaves(battle::AllowForbidSaves),
    AllowForbidMainMenu(battle::AllowForbidMainMenu),
    OpenMainMenu(battle::OpenMainMenu),
    OpenSavesMenu(battle::OpenSavesMenu),
    StartShopMenu(battle::StartShopMenu),
    RestockShop(battle::RestockShop),
    EnterANameMenu(battle::EnterANameMenu),
}

impl EventCommand {
    /// Decode one command from its kind id and flat token stream
    ///
    /// Block markers and unknown kinds decode to `None` and are skipped at
    /// tree construction.
    pub fn decode(kind_id: i64, tokens: &[Json]) -> Result<Option<EventCommand>> {
        let Some(kind) = CommandKind::from_i64(kind_id) else {
            tracing::debug!(kind = kind_id, "skipping unknown command kind");
            return Ok(None);
        };
        let mut cursor = Cursor::new(tokens);
        let command = match kind {
            CommandKind::EndWhile | CommandKind::EndIf | CommandKind::EndChoice => return Ok(None),
            CommandKind::ShowText => EventCommand::ShowText(display::ShowText::read(&mut cursor)?),
            CommandKind::ChangeVariables => {
                EventCommand::ChangeVariables(variables::ChangeVariables::read(&mut cursor)?)
            }
            CommandKind::EndGame => EventCommand::EndGame,
            CommandKind::While => EventCommand::While(flow::While::read(&mut cursor)?),
            CommandKind::WhileBreak => EventCommand::WhileBreak(flow::WhileBreak),
            CommandKind::InputNumber => {
                EventCommand::InputNumber(variables::InputNumber::read(&mut cursor)?)
            }
            CommandKind::If => EventCommand::If(flow::If::read(&mut cursor)?),
            CommandKind::Else => EventCommand::Else(flow::Else),
            CommandKind::OpenMainMenu => EventCommand::OpenMainMenu(battle::OpenMainMenu),
            CommandKind::OpenSavesMenu => EventCommand::OpenSavesMenu(battle::OpenSavesMenu),
            CommandKind::ModifyInventory => {
                EventCommand::ModifyInventory(party::ModifyInventory::read(&mut cursor)?)
            }
            CommandKind::ModifyTeam => EventCommand::ModifyTeam(party::ModifyTeam::read(&mut cursor)?),
            CommandKind::StartBattle => {
                EventCommand::StartBattle(battle::StartBattle::read(&mut cursor)?)
            }
            CommandKind::IfWin => EventCommand::IfWin(flow::IfWin),
            CommandKind::IfLose => EventCommand::IfLose(flow::IfLose),
            CommandKind::ChangeState => {
                EventCommand::ChangeState(movement::ChangeState::read(&mut cursor)?)
            }
            CommandKind::ChangeProperty => {
                EventCommand::ChangeProperty(variables::ChangeProperty::read(&mut cursor)?)
            }
            CommandKind::MoveObject => {
                EventCommand::MoveObject(movement::MoveObject::read(&mut cursor)?)
            }
            CommandKind::Wait => EventCommand::Wait(flow::Wait::read(&mut cursor)?),
            CommandKind::MoveCamera => {
                EventCommand::MoveCamera(movement::MoveCamera::read(&mut cursor)?)
            }
            CommandKind::PlayMusic => EventCommand::PlayMusic(media::PlaySong::read(&mut cursor)?),
            CommandKind::StopMusic => EventCommand::StopMusic(media::StopSong::read(
                SongKind::Music,
                &mut cursor,
            )?),
            CommandKind::PlayBackgroundSound => {
                EventCommand::PlayBackgroundSound(media::PlaySong::read(&mut cursor)?)
            }
            CommandKind::StopBackgroundSound => EventCommand::StopBackgroundSound(
                media::StopSong::read(SongKind::BackgroundSound, &mut cursor)?,
            ),
            CommandKind::PlaySound => EventCommand::PlaySound(media::PlaySong::read(&mut cursor)?),
            CommandKind::PlayMusicEffect => {
                EventCommand::PlayMusicEffect(media::PlaySong::read(&mut cursor)?)
            }
            CommandKind::ChangeMapProperties => {
                EventCommand::ChangeMapProperties(movement::ChangeMapProperties::read(&mut cursor)?)
            }
            CommandKind::DisplayChoice => {
                EventCommand::DisplayChoice(flow::DisplayChoice::read(&mut cursor)?)
            }
            CommandKind::Choice => EventCommand::Choice(flow::Choice::read(&mut cursor)?),
            CommandKind::Script => EventCommand::Script(variables::Script::read(&mut cursor)?),
            CommandKind::DisplayAPicture => {
                EventCommand::DisplayAPicture(display::DisplayAPicture::read(&mut cursor)?)
            }
            CommandKind::SetMoveTurnAPicture => {
                EventCommand::SetMoveTurnAPicture(display::SetMoveTurnAPicture::read(&mut cursor)?)
            }
            CommandKind::RemoveAPicture => {
                EventCommand::RemoveAPicture(display::RemoveAPicture::read(&mut cursor)?)
            }
            CommandKind::SetDialogBoxOptions => {
                EventCommand::SetDialogBoxOptions(display::SetDialogBoxOptions::read(&mut cursor)?)
            }
            CommandKind::TitleScreen => EventCommand::TitleScreen,
            CommandKind::ChangeScreenTone => {
                EventCommand::ChangeScreenTone(display::ChangeScreenTone::read(&mut cursor)?)
            }
            CommandKind::RemoveObjectFromMap => {
                EventCommand::RemoveObjectFromMap(movement::RemoveObjectFromMap::read(&mut cursor)?)
            }
            CommandKind::StopReaction => EventCommand::StopReaction,
            CommandKind::AllowForbidSaves => {
                EventCommand::AllowForbidSaves(battle::AllowForbidSaves::read(&mut cursor)?)
            }
            CommandKind::AllowForbidMainMenu => {
                EventCommand::AllowForbidMainMenu(battle::AllowForbidMainMenu::read(&mut cursor)?)
            }
            CommandKind::CallCommonReaction => {
                EventCommand::CallCommonReaction(flow::CallCommonReaction::read(&mut cursor)?)
            }
            CommandKind::Label => EventCommand::Label(flow::Label::read(&mut cursor)?),
            CommandKind::JumpToLabel => {
                EventCommand::JumpToLabel(flow::JumpToLabel::read(&mut cursor)?)
            }
            CommandKind::Comment => EventCommand::Comment(flow::Comment::read(&mut cursor)?),
            CommandKind::ChangeAStatistic => {
                EventCommand::ChangeAStatistic(party::ChangeAStatistic::read(&mut cursor)?)
            }
            CommandKind::ChangeASkill => {
                EventCommand::ChangeASkill(party::ChangeASkill::read(&mut cursor)?)
            }
            CommandKind::ChangeName => EventCommand::ChangeName(party::ChangeName::read(&mut cursor)?),
            CommandKind::ChangeEquipment => {
                EventCommand::ChangeEquipment(party::ChangeEquipment::read(&mut cursor)?)
            }
            CommandKind::ModifyCurrency => {
                EventCommand::ModifyCurrency(party::ModifyCurrency::read(&mut cursor)?)
            }
            CommandKind::DisplayAnAnimation => {
                EventCommand::DisplayAnAnimation(display::DisplayAnAnimation::read(&mut cursor)?)
            }
            CommandKind::ShakeScreen => {
                EventCommand::ShakeScreen(display::ShakeScreen::read(&mut cursor)?)
            }
            CommandKind::FlashScreen => {
                EventCommand::FlashScreen(display::FlashScreen::read(&mut cursor)?)
            }
            CommandKind::Plugin => EventCommand::Plugin(variables::Plugin::read(&mut cursor)?),
            CommandKind::StartShopMenu => {
                EventCommand::StartShopMenu(battle::StartShopMenu::read(&mut cursor)?)
            }
            CommandKind::RestockShop => {
                EventCommand::RestockShop(battle::RestockShop::read(&mut cursor)?)
            }
            CommandKind::EnterANameMenu => {
                EventCommand::EnterANameMenu(battle::EnterANameMenu::read(&mut cursor)?)
            }
            CommandKind::CreateObjectInMap => {
                EventCommand::CreateObjectInMap(movement::CreateObjectInMap::read(&mut cursor)?)
            }
            CommandKind::ChangeStatus => {
                EventCommand::ChangeStatus(party::ChangeStatus::read(&mut cursor)?)
            }
            CommandKind::ResetCamera => EventCommand::ResetCamera(movement::ResetCamera),
            CommandKind::ChangeBattlerGraphics => {
                EventCommand::ChangeBattlerGraphics(battle::ChangeBattlerGraphics::read(&mut cursor)?)
            }
            CommandKind::ChangeClass => EventCommand::ChangeClass(party::ChangeClass::read(&mut cursor)?),
            CommandKind::ChangeChronometer => {
                EventCommand::ChangeChronometer(variables::ChangeChronometer::read(&mut cursor)?)
            }
            CommandKind::ChangeWeather => {
                EventCommand::ChangeWeather(movement::ChangeWeather::read(&mut cursor)?)
            }
            CommandKind::PlayAVideo => EventCommand::PlayAVideo(display::PlayAVideo::read(&mut cursor)?),
            CommandKind::SwitchTexture => {
                EventCommand::SwitchTexture(movement::SwitchTexture::read(&mut cursor)?)
            }
            CommandKind::TeleportObject => {
                EventCommand::TeleportObject(movement::TeleportObject::read(&mut cursor)?)
            }
            CommandKind::ChangeExperienceCurve => {
                EventCommand::ChangeExperienceCurve(party::ChangeExperienceCurve::read(&mut cursor)?)
            }
            CommandKind::TransformABattler => {
                EventCommand::TransformABattler(battle::TransformABattler::read(&mut cursor)?)
            }
            CommandKind::ForceAnAction => {
                EventCommand::ForceAnAction(battle::ForceAnAction::read(&mut cursor)?)
            }
            CommandKind::StopASound => EventCommand::StopASound(media::StopASound::read(&mut cursor)?),
        };
        Ok(Some(command))
    }

    /// The kind id this command was decoded from
    pub fn kind(&self) -> CommandKind {
        match self {
            EventCommand::If(_) => CommandKind::If,
            EventCommand::Else(_) => CommandKind::Else,
            EventCommand::IfWin(_) => CommandKind::IfWin,
            EventCommand::IfLose(_) => CommandKind::IfLose,
            EventCommand::While(_) => CommandKind::While,
            EventCommand::WhileBreak(_) => CommandKind::WhileBreak,
            EventCommand::DisplayChoice(_) => CommandKind::DisplayChoice,
            EventCommand::Choice(_) => CommandKind::Choice,
            EventCommand::Label(_) => CommandKind::Label,
            EventCommand::JumpToLabel(_) => CommandKind::JumpToLabel,
            EventCommand::Wait(_) => CommandKind::Wait,
            EventCommand::Comment(_) => CommandKind::Comment,
            EventCommand::StopReaction => CommandKind::StopReaction,
            EventCommand::CallCommonReaction(_) => CommandKind::CallCommonReaction,
            EventCommand::EndGame => CommandKind::EndGame,
            EventCommand::TitleScreen => CommandKind::TitleScreen,
            EventCommand::ChangeVariables(_) => CommandKind::ChangeVariables,
            EventCommand::InputNumber(_) => CommandKind::InputNumber,
            EventCommand::ChangeProperty(_) => CommandKind::ChangeProperty,
            EventCommand::ChangeChronometer(_) => CommandKind::ChangeChronometer,
            EventCommand::Script(_) => CommandKind::Script,
            EventCommand::Plugin(_) => CommandKind::Plugin,
            EventCommand::ModifyInventory(_) => CommandKind::ModifyInventory,
            EventCommand::ModifyCurrency(_) => CommandKind::ModifyCurrency,
            EventCommand::ModifyTeam(_) => CommandKind::ModifyTeam,
            EventCommand::ChangeName(_) => CommandKind::ChangeName,
            EventCommand::ChangeEquipment(_) => CommandKind::ChangeEquipment,
            EventCommand::ChangeAStatistic(_) => CommandKind::ChangeAStatistic,
            EventCommand::ChangeASkill(_) => CommandKind::ChangeASkill,
            EventCommand::ChangeClass(_) => CommandKind::ChangeClass,
            EventCommand::ChangeStatus(_) => CommandKind::ChangeStatus,
            EventCommand::ChangeExperienceCurve(_) => CommandKind::ChangeExperienceCurve,
            EventCommand::MoveObject(_) => CommandKind::MoveObject,
            EventCommand::TeleportObject(_) => CommandKind::TeleportObject,
            EventCommand::MoveCamera(_) => CommandKind::MoveCamera,
            EventCommand::ResetCamera(_) => CommandKind::ResetCamera,
            EventCommand::ChangeState(_) => CommandKind::ChangeState,
            EventCommand::CreateObjectInMap(_) => CommandKind::CreateObjectInMap,
            EventCommand::RemoveObjectFromMap(_) => CommandKind::RemoveObjectFromMap,
            EventCommand::SwitchTexture(_) => CommandKind::SwitchTexture,
            EventCommand::ChangeMapProperties(_) => CommandKind::ChangeMapProperties,
            EventCommand::ChangeWeather(_) => CommandKind::ChangeWeather,
            EventCommand::PlayMusic(_) => CommandKind::PlayMusic,
            EventCommand::PlayBackgroundSound(_) => CommandKind::PlayBackgroundSound,
            EventCommand::PlaySound(_) => CommandKind::PlaySound,
            EventCommand::PlayMusicEffect(_) => CommandKind::PlayMusicEffect,
            EventCommand::StopMusic(_) => CommandKind::StopMusic,
            EventCommand::StopBackgroundSound(_) => CommandKind::StopBackgroundSound,
            EventCommand::StopASound(_) => CommandKind::StopASound,
            EventCommand::ShowText(_) => CommandKind::ShowText,
            EventCommand::DisplayAPicture(_) => CommandKind::DisplayAPicture,
            EventCommand::SetMoveTurnAPicture(_) => CommandKind::SetMoveTurnAPicture,
            EventCommand::RemoveAPicture(_) => CommandKind::RemoveAPicture,
            EventCommand::DisplayAnAnimation(_) => CommandKind::DisplayAnAnimation,
            EventCommand::ChangeScreenTone(_) => CommandKind::ChangeScreenTone,
            EventCommand::FlashScreen(_) => CommandKind::FlashScreen,
            EventCommand::ShakeScreen(_) => CommandKind::ShakeScreen,
            EventCommand::SetDialogBoxOptions(_) => CommandKind::SetDialogBoxOptions,
            EventCommand::PlayAVideo(_) => CommandKind::PlayAVideo,
            EventCommand::StartBattle(_) => CommandKind::StartBattle,
            EventCommand::ForceAnAction(_) => CommandKind::ForceAnAction,
            EventCommand::ChangeBattlerGraphics(_) => CommandKind::ChangeBattlerGraphics,
            EventCommand::TransformABattler(_) => CommandKind::TransformABattler,
            EventCommand::AllowForbidSaves(_) => CommandKind::AllowForbidSaves,
            EventCommand::AllowForbidMainMenu(_) => CommandKind::AllowForbidMainMenu,
            EventCommand::OpenMainMenu(_) => CommandKind::OpenMainMenu,
            EventCommand::OpenSavesMenu(_) => CommandKind::OpenSavesMenu,
            EventCommand::StartShopMenu(_) => CommandKind::StartShopMenu,
            EventCommand::RestockShop(_) => CommandKind::RestockShop,
            EventCommand::EnterANameMenu(_) => CommandKind::EnterANameMenu,
        }
    }

    /// The label name this command records, when it is a `Label`
    pub fn label_name(&self) -> Option<String> {
        match self {
            EventCommand::Label(label) => label.name.as_label(),
            _ => None,
        }
    }

    /// Whether the containing walk may advance while this command runs
    pub fn parallel(&self) -> bool {
        match self {
            EventCommand::MoveObject(command) => command.parallel(),
            _ => false,
        }
    }

    /// Create this command's per-invocation state, with side effects
    pub fn initialize(&self, ctx: &mut ExecutionContext, scope: &Scope) -> CommandState {
        match self {
            EventCommand::DisplayChoice(c) => c.initialize(ctx, scope),
            EventCommand::Wait(c) => c.initialize(ctx, scope),
            EventCommand::CallCommonReaction(c) => c.initialize(ctx, scope),
            EventCommand::ChangeVariables(c) => c.initialize(),
            EventCommand::InputNumber(c) => c.initialize(ctx, scope),
            EventCommand::MoveObject(c) => c.initialize(ctx, scope),
            EventCommand::MoveCamera(c) => c.initialize(ctx, scope),
            EventCommand::StopMusic(c) | EventCommand::StopBackgroundSound(c) => {
                c.initialize(ctx, scope)
            }
            EventCommand::ShowText(c) => c.initialize(ctx, scope),
            EventCommand::FlashScreen(c) => c.initialize(ctx, scope),
            EventCommand::ShakeScreen(c) => c.initialize(ctx, scope),
            EventCommand::StartBattle(c) => c.initialize(ctx, scope),
            EventCommand::ForceAnAction(c) => c.initialize(),
            _ => CommandState::None,
        }
    }

    /// Tick this command once
    pub fn update(
        &self,
        state: &mut CommandState,
        ctx: &mut ExecutionContext,
        scope: &mut Scope,
    ) -> Outcome {
        match self {
            EventCommand::If(c) => c.update(ctx, scope),
            EventCommand::Else(c) => c.update(),
            EventCommand::IfWin(c) => c.update(ctx),
            EventCommand::IfLose(c) => c.update(ctx),
            EventCommand::While(c) => c.update(ctx, scope),
            EventCommand::WhileBreak(c) => c.update(),
            EventCommand::DisplayChoice(c) => c.update(ctx, scope),
            EventCommand::Choice(c) => c.update(ctx),
            EventCommand::Label(_) => Outcome::Advance(1),
            EventCommand::JumpToLabel(c) => c.update(),
            EventCommand::Wait(c) => c.update(state, ctx),
            EventCommand::Comment(_) => Outcome::Advance(1),
            EventCommand::StopReaction => Outcome::Stop,
            EventCommand::CallCommonReaction(c) => c.update(state, ctx),
            EventCommand::EndGame => {
                ctx.platform.end_game();
                Outcome::Stop
            }
            EventCommand::TitleScreen => {
                ctx.platform.title_screen();
                Outcome::Stop
            }
            EventCommand::ChangeVariables(c) => c.update(state, ctx, scope),
            EventCommand::InputNumber(c) => c.update(state, ctx, scope),
            EventCommand::ChangeProperty(c) => c.update(ctx, scope),
            EventCommand::ChangeChronometer(c) => c.update(ctx, scope),
            EventCommand::Script(c) => c.update(ctx, scope),
            EventCommand::Plugin(c) => c.update(ctx, scope),
            EventCommand::ModifyInventory(c) => c.update(ctx, scope),
            EventCommand::ModifyCurrency(c) => c.update(ctx, scope),
            EventCommand::ModifyTeam(c) => c.update(ctx, scope),
            EventCommand::ChangeName(c) => c.update(ctx, scope),
            EventCommand::ChangeEquipment(c) => c.update(ctx, scope),
            EventCommand::ChangeAStatistic(c) => c.update(ctx, scope),
            EventCommand::ChangeASkill(c) => c.update(ctx, scope),
            EventCommand::ChangeClass(c) => c.update(ctx, scope),
            EventCommand::ChangeStatus(c) => c.update(ctx, scope),
            EventCommand::ChangeExperienceCurve(c) => c.update(ctx, scope),
            EventCommand::MoveObject(c) => c.update(state, ctx),
            EventCommand::TeleportObject(c) => c.update(ctx, scope),
            EventCommand::MoveCamera(c) => c.update(state, ctx),
            EventCommand::ResetCamera(c) => c.update(ctx),
            EventCommand::ChangeState(c) => c.update(ctx, scope),
            EventCommand::CreateObjectInMap(c) => c.update(ctx, scope),
            EventCommand::RemoveObjectFromMap(c) => c.update(ctx, scope),
            EventCommand::SwitchTexture(c) => c.update(ctx, scope),
            EventCommand::ChangeMapProperties(c) => c.update(ctx, scope),
            EventCommand::ChangeWeather(c) => c.update(ctx, scope),
            EventCommand::PlayMusic(c) => c.play(SongKind::Music, ctx, scope),
            EventCommand::PlayBackgroundSound(c) => c.play(SongKind::BackgroundSound, ctx, scope),
            EventCommand::PlaySound(c) => c.play(SongKind::Sound, ctx, scope),
            EventCommand::PlayMusicEffect(c) => c.play(SongKind::MusicEffect, ctx, scope),
            EventCommand::StopMusic(c) | EventCommand::StopBackgroundSound(c) => c.update(state, ctx),
            EventCommand::StopASound(c) => c.update(ctx, scope),
            EventCommand::ShowText(c) => c.update(ctx, scope),
            EventCommand::DisplayAPicture(c) => c.update(ctx, scope),
            EventCommand::SetMoveTurnAPicture(c) => c.update(ctx, scope),
            EventCommand::RemoveAPicture(c) => c.update(ctx, scope),
            EventCommand::DisplayAnAnimation(c) => c.update(ctx, scope),
            EventCommand::ChangeScreenTone(c) => c.update(ctx, scope),
            EventCommand::FlashScreen(c) => c.update(state, ctx),
            EventCommand::ShakeScreen(c) => c.update(state, ctx),
            EventCommand::SetDialogBoxOptions(c) => c.update(ctx, scope),
            EventCommand::PlayAVideo(c) => c.update(ctx, scope),
            EventCommand::StartBattle(c) => c.update(state, ctx),
            EventCommand::ForceAnAction(c) => c.update(state, ctx, scope),
            EventCommand::ChangeBattlerGraphics(c) => c.update(ctx, scope),
            EventCommand::TransformABattler(c) => c.update(ctx, scope),
            EventCommand::AllowForbidSaves(c) => c.update(ctx, scope),
            EventCommand::AllowForbidMainMenu(c) => c.update(ctx, scope),
            EventCommand::OpenMainMenu(c) => c.update(ctx),
            EventCommand::OpenSavesMenu(c) => c.update(ctx),
            EventCommand::StartShopMenu(c) => c.update(ctx, scope),
            EventCommand::RestockShop(c) => c.update(ctx, scope),
            EventCommand::EnterANameMenu(c) => c.update(ctx, scope),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_markers_and_unknown_kinds_decode_to_none() {
        for kind in [5, 10, 32, 999, 0, -1] {
            assert!(EventCommand::decode(kind, &[]).unwrap().is_none());
        }
    }

    #[test]
    fn test_kind_round_trip() {
        let command = EventCommand::decode(47, &[json!("note")]).unwrap().unwrap();
        assert_eq!(command.kind(), CommandKind::Comment);
        let command = EventCommand::decode(41, &[]).unwrap().unwrap();
        assert_eq!(command.kind(), CommandKind::StopReaction);
    }

    #[test]
    fn test_label_name() {
        let tokens = vec![json!(6), json!("top")];
        let command = EventCommand::decode(45, &tokens).unwrap().unwrap();
        assert_eq!(command.label_name(), Some("top".to_string()));
        assert!(EventCommand::StopReaction.label_name().is_none());
    }

    #[test]
    fn test_parallel_is_data_driven() {
        // target, wait-end flag, one step east
        let tokens = vec![json!(3), json!(4), json!(false), json!(3), json!(1.0)];
        let command = EventCommand::decode(20, &tokens).unwrap().unwrap();
        assert!(command.parallel());
        let tokens = vec![json!(3), json!(4), json!(true), json!(3), json!(1.0)];
        let command = EventCommand::decode(20, &tokens).unwrap().unwrap();
        assert!(!command.parallel());
    }
}
