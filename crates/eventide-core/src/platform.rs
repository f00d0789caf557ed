//! Platform collaborator hooks
//!
//! The interpreter core never touches rendering, audio or window internals;
//! it calls these narrow hooks and lets the host react. Every hook defaults
//! to a no-op so headless hosts (and tests) only override what they observe.

use crate::error::EngineError;
use crate::identity::ObjectId;
use serde::{Deserialize, Serialize};

/// Which audio channel a song command addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SongKind {
    Music,
    BackgroundSound,
    MusicEffect,
    Sound,
}

impl SongKind {
    pub fn name(&self) -> &'static str {
        match self {
            SongKind::Music => "music",
            SongKind::BackgroundSound => "background sound",
            SongKind::MusicEffect => "music effect",
            SongKind::Sound => "sound",
        }
    }
}

/// Host-side hooks consumed by command execution
#[allow(unused_variables)]
pub trait Platform {
    /// Advisory engine error (missing entity, session access, ...)
    fn report_error(&mut self, err: &EngineError) {}

    // --- audio ---
    fn play_song(&mut self, kind: SongKind, id: i64, volume: f64, start: f64, end: f64) {}
    fn stop_song(&mut self, kind: SongKind) {}
    fn set_song_volume(&mut self, kind: SongKind, volume: f64) {}
    fn stop_sound(&mut self, id: i64) {}

    // --- message windows and input widgets ---
    fn show_message(&mut self, interlocutor: &str, text: &str) {}
    fn close_message(&mut self) {}
    fn open_choices(&mut self, choices: &[String]) {}
    fn close_choices(&mut self) {}
    fn open_number_input(&mut self, digits: usize) {}
    fn close_number_input(&mut self) {}

    // --- HUD and screen effects ---
    fn request_hud_repaint(&mut self) {}
    fn flash_screen(&mut self, color_id: i64, time_ms: u64) {}
    fn shake_screen(&mut self, offset: f64, shake_count: u64, time_ms: u64) {}
    fn display_animation(&mut self, object: ObjectId, animation_id: i64) {}

    // --- camera ---
    fn move_camera(&mut self, target: Option<ObjectId>, offset: (f64, f64, f64), time_ms: u64) {}
    fn reset_camera(&mut self) {}

    // --- menus and top-level flow ---
    fn open_main_menu(&mut self) {}
    fn open_saves_menu(&mut self) {}
    fn open_shop(&mut self, shop_id: i64) {}
    fn restock_shop(&mut self, shop_id: i64) {}
    fn open_name_menu(&mut self, hero_instance: i64, max_chars: usize) {}
    fn title_screen(&mut self) {}
    fn end_game(&mut self) {}
    fn play_video(&mut self, video_id: i64) {}
    fn start_battle(&mut self, troop_id: i64) {}

    // --- scripting escape hatches ---
    fn run_script(&mut self, code: &str) {}
    fn run_plugin(&mut self, plugin_id: i64, command: &str) {}
}

/// A platform that ignores every hook
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPlatform;

impl Platform for NullPlatform {}

/// A platform that records hook invocations
///
/// Used by the test suites and useful for headless hosts that want to
/// inspect what a script did.
#[derive(Debug, Default)]
pub struct RecordingPlatform {
    pub errors: Vec<EngineError>,
    pub calls: Vec<String>,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, call: String) {
        self.calls.push(call);
    }

    /// Count recorded calls whose description starts with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.calls.iter().filter(|c| c.starts_with(prefix)).count()
    }
}

impl Platform for RecordingPlatform {
    fn report_error(&mut self, err: &EngineError) {
        self.errors.push(err.clone());
    }

    fn play_song(&mut self, kind: SongKind, id: i64, volume: f64, start: f64, end: f64) {
        self.record(format!(
            "play_song {} id={} volume={} start={} end={}",
            kind.name(),
            id,
            volume,
            start,
            end
        ));
    }

    fn stop_song(&mut self, kind: SongKind) {
        self.record(format!("stop_song {}", kind.name()));
    }

    fn set_song_volume(&mut self, kind: SongKind, volume: f64) {
        self.record(format!("set_song_volume {} {:.3}", kind.name(), volume));
    }

    fn stop_sound(&mut self, id: i64) {
        self.record(format!("stop_sound {}", id));
    }

    fn show_message(&mut self, interlocutor: &str, text: &str) {
        self.record(format!("show_message {}: {}", interlocutor, text));
    }

    fn close_message(&mut self) {
        self.record("close_message".to_string());
    }

    fn open_choices(&mut self, choices: &[String]) {
        self.record(format!("open_choices {}", choices.join("|")));
    }

    fn close_choices(&mut self) {
        self.record("close_choices".to_string());
    }

    fn open_number_input(&mut self, digits: usize) {
        self.record(format!("open_number_input {}", digits));
    }

    fn close_number_input(&mut self) {
        self.record("close_number_input".to_string());
    }

    fn request_hud_repaint(&mut self) {
        self.record("request_hud_repaint".to_string());
    }

    fn flash_screen(&mut self, color_id: i64, time_ms: u64) {
        self.record(format!("flash_screen {} {}ms", color_id, time_ms));
    }

    fn shake_screen(&mut self, offset: f64, shake_count: u64, time_ms: u64) {
        self.record(format!(
            "shake_screen {} {} {}ms",
            offset, shake_count, time_ms
        ));
    }

    fn display_animation(&mut self, object: ObjectId, animation_id: i64) {
        self.record(format!("display_animation {} {}", object, animation_id));
    }

    fn move_camera(&mut self, target: Option<ObjectId>, offset: (f64, f64, f64), time_ms: u64) {
        self.record(format!(
            "move_camera {:?} {:?} {}ms",
            target, offset, time_ms
        ));
    }

    fn reset_camera(&mut self) {
        self.record("reset_camera".to_string());
    }

    fn open_main_menu(&mut self) {
        self.record("open_main_menu".to_string());
    }

    fn open_saves_menu(&mut self) {
        self.record("open_saves_menu".to_string());
    }

    fn open_shop(&mut self, shop_id: i64) {
        self.record(format!("open_shop {}", shop_id));
    }

    fn restock_shop(&mut self, shop_id: i64) {
        self.record(format!("restock_shop {}", shop_id));
    }

    fn open_name_menu(&mut self, hero_instance: i64, max_chars: usize) {
        self.record(format!("open_name_menu {} {}", hero_instance, max_chars));
    }

    fn title_screen(&mut self) {
        self.record("title_screen".to_string());
    }

    fn end_game(&mut self) {
        self.record("end_game".to_string());
    }

    fn play_video(&mut self, video_id: i64) {
        self.record(format!("play_video {}", video_id));
    }

    fn start_battle(&mut self, troop_id: i64) {
        self.record(format!("start_battle {}", troop_id));
    }

    fn run_script(&mut self, code: &str) {
        self.record(format!("run_script {}", code));
    }

    fn run_plugin(&mut self, plugin_id: i64, command: &str) {
        self.record(format!("run_plugin {} {}", plugin_id, command));
    }
}
