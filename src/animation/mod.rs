//! Animation domain: the playback interface movement states talk to.
//!
//! States only ever ask for a clip by name and read back its length, so any
//! renderer can sit behind `Animator`. `ClipLibrary` is the stock
//! implementation backed by a JSON clip manifest.

mod library;


pub use library::{ClipDef, ClipLibrary, ClipManifest, PlayedClip};

/// Playback collaborator for one actor.
pub trait Animator: Send + Sync {
    /// Starts `clip` at `normalized_time` in [0, 1]. Unknown clips are ignored.
    fn play(&mut self, clip: &str, normalized_time: f32);

    /// Length of `clip` in seconds, if the clip exists.
    fn clip_length(&self, clip: &str) -> Option<f32>;
}

/// Animator for actors with nothing to draw.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAnimator;

impl Animator for NullAnimator {
    fn play(&mut self, _clip: &str, _normalized_time: f32) {}

    fn clip_length(&self, _clip: &str) -> Option<f32> {
        None
    }
}
