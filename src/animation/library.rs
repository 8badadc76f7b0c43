//! Clip manifest loading and per-actor playback bookkeeping.
//!
//! Loads the clip manifest JSON, which lists every clip with its frame count
//! and playback rate.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::Animator;

/// Definition of a single clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipDef {
    pub frames: u32,
    /// Frames per second.
    pub fps: f32,
    #[serde(default)]
    pub looping: bool,
}

impl ClipDef {
    pub fn length(&self) -> f32 {
        if self.fps <= 0.0 {
            return 0.0;
        }
        self.frames as f32 / self.fps
    }
}

/// Raw manifest JSON structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipManifest {
    pub version: u32,
    pub clips: HashMap<String, ClipDef>,
}

impl ClipManifest {
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    /// Load the manifest from a JSON file. A missing or broken file yields an
    /// empty manifest, so every clip length query falls back to its caller's default.
    pub fn load_from_file(path: &Path) -> Self {
        if !path.exists() {
            warn!("Clip manifest not found at {:?}, using empty manifest", path);
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to read clip manifest: {}", e);
                return Self::default();
            }
        };

        match Self::from_json(&contents) {
            Ok(manifest) => {
                info!(
                    "Loaded clip manifest v{} with {} clips",
                    manifest.version,
                    manifest.clips.len()
                );
                manifest
            }
            Err(e) => {
                error!("Failed to parse clip manifest: {}", e);
                Self::default()
            }
        }
    }
}

/// The clip an actor was last asked to play.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayedClip {
    pub name: String,
    pub normalized_time: f32,
}

/// Stock `Animator`: clip lengths from a shared manifest, plus a record of
/// what was requested and how far into it playback has advanced.
#[derive(Debug, Clone, Default)]
pub struct ClipLibrary {
    manifest: Arc<ClipManifest>,
    current: Option<PlayedClip>,
    elapsed: f32,
    plays: u32,
}

impl ClipLibrary {
    pub fn new(manifest: Arc<ClipManifest>) -> Self {
        Self {
            manifest,
            ..default()
        }
    }

    pub fn current(&self) -> Option<&PlayedClip> {
        self.current.as_ref()
    }

    pub fn current_clip(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.name.as_str())
    }

    /// Number of play requests that named a known clip.
    pub fn play_count(&self) -> u32 {
        self.plays
    }

    /// Advances playback time, wrapping looping clips.
    pub fn advance(&mut self, dt: f32) {
        let Some(current) = &self.current else {
            return;
        };
        let Some(def) = self.manifest.clips.get(&current.name) else {
            return;
        };
        let length = def.length();
        self.elapsed += dt;
        if length > 0.0 && def.looping {
            self.elapsed %= length;
        }
    }

    /// Frame index of the current clip, for sprite sheets.
    pub fn current_frame(&self) -> u32 {
        let Some(def) = self
            .current
            .as_ref()
            .and_then(|c| self.manifest.clips.get(&c.name))
        else {
            return 0;
        };
        let frame = (self.elapsed * def.fps) as u32;
        frame.min(def.frames.saturating_sub(1))
    }

    pub fn is_finished(&self) -> bool {
        match self
            .current
            .as_ref()
            .and_then(|c| self.manifest.clips.get(&c.name))
        {
            Some(def) => !def.looping && self.elapsed >= def.length(),
            None => true,
        }
    }
}

impl Animator for ClipLibrary {
    fn play(&mut self, clip: &str, normalized_time: f32) {
        let Some(def) = self.manifest.clips.get(clip) else {
            debug!("Clip '{}' not in manifest, ignoring", clip);
            return;
        };
        let normalized_time = normalized_time.clamp(0.0, 1.0);
        self.elapsed = def.length() * normalized_time;
        self.current = Some(PlayedClip {
            name: clip.to_string(),
            normalized_time,
        });
        self.plays += 1;
    }

    fn clip_length(&self, clip: &str) -> Option<f32> {
        self.manifest.clips.get(clip).map(ClipDef::length)
    }
}
