//! Narrow interfaces to the asset loader and the audio player
//!
//! Both collaborators live outside the reel core. Failures are tolerated:
//! a slot without an image keeps moving and landing exactly as before.

use std::sync::Arc;

/// Opaque handle to a loaded image
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageHandle(Arc<str>);

impl ImageHandle {
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    pub fn key(&self) -> &str {
        &self.0
    }
}

/// Resolves symbol artwork
pub trait SymbolImageLoader: Send + Sync {
    /// `None` when the image is missing or failed to load
    fn load_image_for_symbol(&self, bundle: &str, path: &str) -> Option<ImageHandle>;
}

/// Fire-and-forget sound playback
pub trait SoundEffects: Send + Sync {
    fn play_sound_effect(&self, id: &str);
}

/// Loader for headless runs: every lookup fails
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImages;

impl SymbolImageLoader for NoImages {
    fn load_image_for_symbol(&self, _bundle: &str, _path: &str) -> Option<ImageHandle> {
        None
    }
}

/// Hands out `bundle/path` keys without touching disk
#[derive(Debug, Clone, Copy, Default)]
pub struct PathImageLoader;

impl SymbolImageLoader for PathImageLoader {
    fn load_image_for_symbol(&self, bundle: &str, path: &str) -> Option<ImageHandle> {
        if path.is_empty() {
            return None;
        }
        Some(ImageHandle::new(format!("{bundle}/{path}")))
    }
}

/// Audio sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct Silence;

impl SoundEffects for Silence {
    fn play_sound_effect(&self, id: &str) {
        log::trace!("sound {id} (muted)");
    }
}

/// Sound ids the reel core plays
pub mod sounds {
    pub const REEL_SPIN: &str = "reel_spin";
    pub const REEL_STOP: &str = "reel_stop";
}
