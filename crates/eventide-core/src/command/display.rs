//! Message, picture and screen-effect commands

use super::cursor::Cursor;
use super::{CommandState, Outcome};
use crate::context::{ExecutionContext, InputEvent, Scope};
use crate::dynamic::DynamicValue;
use crate::error::{EngineError, Result};
use crate::session::{DialogBoxOptions, DisplayedPicture, ScreenTone};

/// Show a message window until the player confirms
#[derive(Debug, Clone, PartialEq)]
pub struct ShowText {
    pub interlocutor: DynamicValue,
    pub message: DynamicValue,
}

impl ShowText {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            interlocutor: cursor.next_dynamic()?,
            message: cursor.next_dynamic()?,
        })
    }

    pub fn initialize(&self, ctx: &mut ExecutionContext, scope: &Scope) -> CommandState {
        let interlocutor = ctx.resolve_string(&self.interlocutor, scope);
        let message = ctx.resolve_string(&self.message, scope);
        ctx.platform.show_message(&interlocutor, &message);
        CommandState::None
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &mut Scope) -> Outcome {
        while let Some(event) = scope.input.pop() {
            if matches!(event, InputEvent::Action | InputEvent::MouseUp) {
                ctx.platform.close_message();
                return Outcome::Advance(1);
            }
        }
        Outcome::Pending
    }
}

/// Put a picture on the HUD layer
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayAPicture {
    pub picture: DynamicValue,
    /// Display index; a second display at the same index replaces it
    pub index: DynamicValue,
    pub x: DynamicValue,
    pub y: DynamicValue,
    pub zoom: DynamicValue,
    pub opacity: DynamicValue,
}

impl DisplayAPicture {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            picture: cursor.next_dynamic()?,
            index: cursor.next_dynamic()?,
            x: cursor.next_dynamic()?,
            y: cursor.next_dynamic()?,
            zoom: cursor.next_dynamic()?,
            opacity: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let picture_id = ctx.resolve(&self.picture, scope).as_int().unwrap_or(0);
        if !ctx.data.pictures.contains_key(&picture_id) {
            ctx.report(EngineError::MissingEntityReference {
                table: "picture",
                id: picture_id,
            });
            return Outcome::Advance(1);
        }
        let index = ctx.resolve_i64(&self.index, scope);
        let picture = DisplayedPicture {
            picture_id,
            x: ctx.resolve_f64(&self.x, scope),
            y: ctx.resolve_f64(&self.y, scope),
            zoom: ctx.resolve_f64(&self.zoom, scope),
            opacity: ctx.resolve_f64(&self.opacity, scope),
            angle: 0.0,
        };
        ctx.game.pictures.insert(index, picture);
        ctx.platform.request_hud_repaint();
        Outcome::Advance(1)
    }
}

/// Reposition/transform a displayed picture
#[derive(Debug, Clone, PartialEq)]
pub struct SetMoveTurnAPicture {
    pub index: DynamicValue,
    pub x: DynamicValue,
    pub y: DynamicValue,
    pub zoom: DynamicValue,
    pub opacity: DynamicValue,
    pub angle: DynamicValue,
}

impl SetMoveTurnAPicture {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            index: cursor.next_dynamic()?,
            x: cursor.next_dynamic()?,
            y: cursor.next_dynamic()?,
            zoom: cursor.next_dynamic()?,
            opacity: cursor.next_dynamic()?,
            angle: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let index = ctx.resolve_i64(&self.index, scope);
        let x = ctx.resolve_f64(&self.x, scope);
        let y = ctx.resolve_f64(&self.y, scope);
        let zoom = ctx.resolve_f64(&self.zoom, scope);
        let opacity = ctx.resolve_f64(&self.opacity, scope);
        let angle = ctx.resolve_f64(&self.angle, scope);
        match ctx.game.pictures.get_mut(&index) {
            Some(picture) => {
                picture.x = x;
                picture.y = y;
                picture.zoom = zoom;
                picture.opacity = opacity;
                picture.angle = angle;
                ctx.platform.request_hud_repaint();
            }
            None => ctx.report(EngineError::MissingEntityReference {
                table: "displayed picture",
                id: index,
            }),
        }
        Outcome::Advance(1)
    }
}

/// Drop a displayed picture
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveAPicture {
    pub index: DynamicValue,
}

impl RemoveAPicture {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            index: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let index = ctx.resolve_i64(&self.index, scope);
        ctx.game.pictures.shift_remove(&index);
        ctx.platform.request_hud_repaint();
        Outcome::Advance(1)
    }
}

/// Play an animation over an object
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayAnAnimation {
    pub target: DynamicValue,
    pub animation: DynamicValue,
}

impl DisplayAnAnimation {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            target: cursor.next_dynamic()?,
            animation: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let animation = ctx.resolve(&self.animation, scope).as_int().unwrap_or(0);
        if !ctx.data.animations.contains_key(&animation) {
            ctx.report(EngineError::MissingEntityReference {
                table: "animation",
                id: animation,
            });
            return Outcome::Advance(1);
        }
        if let Some(object) = ctx.resolve_object(&self.target, scope) {
            ctx.platform.display_animation(object, animation);
        }
        Outcome::Advance(1)
    }
}

/// Tint the screen
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeScreenTone {
    pub red: DynamicValue,
    pub green: DynamicValue,
    pub blue: DynamicValue,
    pub grey: DynamicValue,
}

impl ChangeScreenTone {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            red: cursor.next_dynamic()?,
            green: cursor.next_dynamic()?,
            blue: cursor.next_dynamic()?,
            grey: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        ctx.game.screen_tone = ScreenTone {
            red: ctx.resolve_f64(&self.red, scope),
            green: ctx.resolve_f64(&self.green, scope),
            blue: ctx.resolve_f64(&self.blue, scope),
            grey: ctx.resolve_f64(&self.grey, scope),
        };
        ctx.platform.request_hud_repaint();
        Outcome::Advance(1)
    }
}

/// Flash the screen with a color
#[derive(Debug, Clone, PartialEq)]
pub struct FlashScreen {
    pub color: DynamicValue,
    pub seconds: DynamicValue,
    pub wait: bool,
}

impl FlashScreen {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            color: cursor.next_dynamic()?,
            seconds: cursor.next_dynamic()?,
            wait: cursor.next_bool()?,
        })
    }

    pub fn initialize(&self, ctx: &mut ExecutionContext, scope: &Scope) -> CommandState {
        let color = ctx.resolve_i64(&self.color, scope);
        let time_ms = (ctx.resolve_f64(&self.seconds, scope) * 1000.0).max(0.0) as u64;
        ctx.platform.flash_screen(color, time_ms);
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

/// Shake the screen
#[derive(Debug, Clone, PartialEq)]
pub struct ShakeScreen {
    pub offset: DynamicValue,
    pub shake_count: DynamicValue,
    pub seconds: DynamicValue,
    pub wait: bool,
}

impl ShakeScreen {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            offset: cursor.next_dynamic()?,
            shake_count: cursor.next_dynamic()?,
            seconds: cursor.next_dynamic()?,
            wait: cursor.next_bool()?,
        })
    }

    pub fn initialize(&self, ctx: &mut ExecutionContext, scope: &Scope) -> CommandState {
        let offset = ctx.resolve_f64(&self.offset, scope);
        let shakes = ctx.resolve_i64(&self.shake_count, scope).max(0) as u64;
        let time_ms = (ctx.resolve_f64(&self.seconds, scope) * 1000.0).max(0.0) as u64;
        ctx.platform.shake_screen(offset, shakes, time_ms);
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

/// Reconfigure the dialog box
#[derive(Debug, Clone, PartialEq)]
pub struct SetDialogBoxOptions {
    pub window_skin: DynamicValue,
    pub x: DynamicValue,
    pub y: DynamicValue,
    pub width: DynamicValue,
    pub height: DynamicValue,
}

impl SetDialogBoxOptions {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            window_skin: cursor.next_dynamic()?,
            x: cursor.next_dynamic()?,
            y: cursor.next_dynamic()?,
            width: cursor.next_dynamic()?,
            height: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        ctx.game.dialog_options = DialogBoxOptions {
            window_skin_id: ctx.resolve_i64(&self.window_skin, scope),
            x: ctx.resolve_f64(&self.x, scope),
            y: ctx.resolve_f64(&self.y, scope),
            width: ctx.resolve_f64(&self.width, scope),
            height: ctx.resolve_f64(&self.height, scope),
        };
        Outcome::Advance(1)
    }
}

/// Hand a video to the host player
#[derive(Debug, Clone, PartialEq)]
pub struct PlayAVideo {
    pub video: DynamicValue,
}

impl PlayAVideo {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            video: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let video = ctx.resolve_i64(&self.video, scope);
        ctx.platform.play_video(video);
        Outcome::Advance(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataTables, Localized, PictureDef};
    use crate::identity::ObjectId;
    use crate::platform::RecordingPlatform;
    use crate::rng::GameRng;
    use crate::scene::Scene;
    use crate::session::Game;

    #[test]
    fn test_display_picture_requires_known_id() {
        let mut game = Game::new(1);
        let mut data = DataTables::new();
        data.pictures.insert(
            2,
            PictureDef {
                base: Localized::new(2, "portrait"),
                frame_width: 32,
                frame_height: 32,
                frames: 1,
            },
        );
        let mut scene = Scene::new();
        let mut platform = RecordingPlatform::new();
        let mut rng = GameRng::new(1);
        let scope = Scope::new(ObjectId::HERO, 1);
        let mut ctx = ExecutionContext {
            game: &mut game,
            data: &data,
            scene: &mut scene,
            platform: &mut platform,
            rng: &mut rng,
            now_ms: 0,
            delta_ms: 16,
        };

        let known = DisplayAPicture {
            picture: DynamicValue::Number(2),
            index: DynamicValue::Number(1),
            x: DynamicValue::Number(10),
            y: DynamicValue::Number(20),
            zoom: DynamicValue::NumberDouble(1.0),
            opacity: DynamicValue::NumberDouble(1.0),
        };
        assert_eq!(known.update(&mut ctx, &scope), Outcome::Advance(1));

        let unknown = DisplayAPicture {
            picture: DynamicValue::Number(9),
            ..known.clone()
        };
        assert_eq!(unknown.update(&mut ctx, &scope), Outcome::Advance(1));

        assert_eq!(game.pictures.len(), 1);
        assert_eq!(game.pictures[&1].picture_id, 2);
        assert_eq!(platform.errors.len(), 1);
    }
}
