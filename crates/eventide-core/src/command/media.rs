//! Audio commands
//!
//! Song playback goes through the platform hooks; the session keeps track
//! of what plays on the music and background channels so fades know the
//! volume they start from.

use super::cursor::Cursor;
use super::{CommandState, Outcome};
use crate::context::{ExecutionContext, Scope};
use crate::dynamic::DynamicValue;
use crate::error::Result;
use crate::platform::SongKind;
use crate::session::PlayingSong;
use serde_json::Value as Json;

/// The shared payload of every play-song command
#[derive(Debug, Clone, PartialEq)]
pub struct PlaySong {
    pub song_id: DynamicValue,
    /// Volume percentage, 0 to 100
    pub volume: DynamicValue,
    pub is_start: bool,
    /// Start offset in seconds, meaningful when `is_start`
    pub start: DynamicValue,
    pub is_end: bool,
    /// End position in seconds, meaningful when `is_end`
    pub end: DynamicValue,
}

impl PlaySong {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        let song_id = cursor.next_dynamic()?;
        let volume = cursor.next_dynamic()?;
        let is_start = cursor.next_bool()?;
        let start = if is_start {
            cursor.next_dynamic()?
        } else {
            DynamicValue::Number(0)
        };
        let is_end = cursor.next_bool()?;
        let end = if is_end {
            cursor.next_dynamic()?
        } else {
            DynamicValue::Number(0)
        };
        Ok(Self {
            song_id,
            volume,
            is_start,
            start,
            is_end,
            end,
        })
    }

    /// Serialize back to the flat token array consumed by [`PlaySong::read`]
    pub fn to_json(&self) -> Vec<Json> {
        let mut tokens = Vec::new();
        let mut push_dynamic = |tokens: &mut Vec<Json>, value: &DynamicValue| {
            let json = value.to_json();
            tokens.push(json["k"].clone());
            tokens.push(json["v"].clone());
        };
        push_dynamic(&mut tokens, &self.song_id);
        push_dynamic(&mut tokens, &self.volume);
        tokens.push(Json::Bool(self.is_start));
        if self.is_start {
            push_dynamic(&mut tokens, &self.start);
        }
        tokens.push(Json::Bool(self.is_end));
        if self.is_end {
            push_dynamic(&mut tokens, &self.end);
        }
        tokens
    }

    /// Resolve and hand playback to the platform
    pub fn play(&self, kind: SongKind, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let id = ctx.resolve(&self.song_id, scope).as_int().unwrap_or(0);
        let volume = ctx.resolve_f64(&self.volume, scope).clamp(0.0, 100.0);
        let start = if self.is_start {
            ctx.resolve_f64(&self.start, scope)
        } else {
            0.0
        };
        let end = if self.is_end {
            ctx.resolve_f64(&self.end, scope)
        } else {
            0.0
        };
        ctx.platform.play_song(kind, id, volume, start, end);
        if matches!(kind, SongKind::Music | SongKind::BackgroundSound) {
            ctx.game.songs.insert(kind, PlayingSong { id, volume });
        }
        Outcome::Advance(1)
    }
}

/// Per-invocation state of a song fade
#[derive(Debug)]
pub struct FadeState {
    pub started_ms: u64,
    pub duration_ms: u64,
    pub from_volume: f64,
}

/// Fade a channel to silence over a duration, then stop it
#[derive(Debug, Clone, PartialEq)]
pub struct StopSong {
    pub kind: SongKind,
    pub seconds: DynamicValue,
}

impl StopSong {
    pub fn read(kind: SongKind, cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            kind,
            seconds: cursor.next_dynamic()?,
        })
    }

    pub fn initialize(&self, ctx: &mut ExecutionContext, scope: &Scope) -> CommandState {
        let duration_ms = (ctx.resolve_f64(&self.seconds, scope) * 1000.0).max(0.0) as u64;
        let from_volume = ctx
            .game
            .songs
            .get(&self.kind)
            .map(|s| s.volume)
            .unwrap_or(100.0);
        CommandState::Fade(FadeState {
            started_ms: ctx.now_ms,
            duration_ms,
            from_volume,
        })
    }

    pub fn update(&self, state: &mut CommandState, ctx: &mut ExecutionContext) -> Outcome {
        let CommandState::Fade(st) = state else {
            return Outcome::Advance(1);
        };
        let elapsed = ctx.now_ms.saturating_sub(st.started_ms);
        let progress = if st.duration_ms == 0 {
            1.0
        } else {
            elapsed as f64 / st.duration_ms as f64
        };
        let volume = st.from_volume * (1.0 - progress);
        if progress >= 1.0 || volume <= 0.0 {
            ctx.platform.stop_song(self.kind);
            ctx.game.songs.shift_remove(&self.kind);
            Outcome::Advance(1)
        } else {
            ctx.platform.set_song_volume(self.kind, volume);
            Outcome::Pending
        }
    }
}

/// Stop one playing sound effect by id
#[derive(Debug, Clone, PartialEq)]
pub struct StopASound {
    pub id: DynamicValue,
}

impl StopASound {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            id: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let id = ctx.resolve_i64(&self.id, scope);
        ctx.platform.stop_sound(id);
        Outcome::Advance(1)
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

    #[test]
    fn test_play_song_round_trip() {
        let song = PlaySong {
            song_id: DynamicValue::Number(4),
            volume: DynamicValue::Number(80),
            is_start: true,
            start: DynamicValue::NumberDouble(1.5),
            is_end: false,
            end: DynamicValue::Number(0),
        };
        let tokens = song.to_json();
        let back = PlaySong::read(&mut Cursor::new(&tokens)).unwrap();
        assert_eq!(back, song);

        let song = PlaySong {
            song_id: DynamicValue::Variable(2),
            volume: DynamicValue::Number(100),
            is_start: false,
            start: DynamicValue::Number(0),
            is_end: true,
            end: DynamicValue::NumberDouble(12.0),
        };
        let back = PlaySong::read(&mut Cursor::new(&song.to_json())).unwrap();
        assert_eq!(back, song);
    }

    #[test]
    fn test_stop_song_linear_fade() {
        let mut game = Game::new(1);
        game.songs.insert(
            SongKind::Music,
            PlayingSong {
                id: 3,
                volume: 80.0,
            },
        );
        let data = DataTables::new();
        let mut scene = Scene::new();
        let mut platform = RecordingPlatform::new();
        let mut rng = GameRng::new(1);
        let scope = Scope::new(ObjectId::HERO, 1);
        let command = StopSong {
            kind: SongKind::Music,
            seconds: DynamicValue::Number(1),
        };

        let mut state = {
            let mut ctx = ExecutionContext {
                game: &mut game,
                data: &data,
                scene: &mut scene,
                platform: &mut platform,
                rng: &mut rng,
                now_ms: 0,
                delta_ms: 500,
            };
            command.initialize(&mut ctx, &scope)
        };

        for (now_ms, expect_done) in [(500, false), (1000, true)] {
            let mut ctx = ExecutionContext {
                game: &mut game,
                data: &data,
                scene: &mut scene,
                platform: &mut platform,
                rng: &mut rng,
                now_ms,
                delta_ms: 500,
            };
            let outcome = command.update(&mut state, &mut ctx);
            assert_eq!(outcome != Outcome::Pending, expect_done);
        }
        assert_eq!(platform.count("set_song_volume music 40.000"), 1);
        assert_eq!(platform.count("stop_song music"), 1);
        assert!(game.songs.is_empty());
    }
}
