//! Audio asset naming and the asset store capability.
//!
//! Tag texts are mapped to asset names in a flat 8.3 namespace, and a
//! small set of reserved names provides spoken feedback for kiosk events.
//! The [`AssetStore`] trait is the seam between the dispatcher and the
//! actual audio backend, which keeps dispatch logic testable without an
//! audio device.

use crate::error::AssetError;
use std::path::Path;

/// Extension appended to every tag-derived asset name.
pub const ASSET_EXTENSION: &str = ".WAV";

/// Greeting played once after startup completes.
pub const STARTUP_ASSET: &str = "STARTUP.WAV";
/// Fallback played when a requested asset is not in the store.
pub const NO_MATCH_ASSET: &str = "NOMATCH.WAV";
/// Confirmation played after the volume was raised.
pub const VOLUME_UP_ASSET: &str = "VOLUMEUP.WAV";
/// Confirmation played after the volume was lowered.
pub const VOLUME_DOWN_ASSET: &str = "VOLUMEDN.WAV";
/// Played when a raise request arrives with the volume already at maximum.
pub const VOLUME_MAX_ASSET: &str = "VOLUMEMX.WAV";
/// Played when a lower request arrives with the volume already at minimum.
pub const VOLUME_MIN_ASSET: &str = "VOLUMEMN.WAV";

/// Derive the asset name for a decoded tag text.
///
/// The text is uppercased and the extension appended, so `museum` and
/// `Museum` both name `MUSEUM.WAV`.
pub fn asset_name(text: &str) -> String {
    format!("{}{}", text.to_ascii_uppercase(), ASSET_EXTENSION)
}

/// Store of playable audio assets addressed by name.
///
/// Playback is synchronous: [`AssetStore::play_to_completion`] returns
/// only once the asset has finished (or failed). The dispatcher relies on
/// this to keep cycles strictly sequential.
pub trait AssetStore {
    /// Check whether `name` exists in the store.
    fn exists(&self, name: &str) -> bool;

    /// Play `name` from start to finish, blocking until done.
    fn play_to_completion(&mut self, name: &str) -> Result<(), AssetError>;

    /// Check whether playback is currently in progress.
    ///
    /// Useful for observers on other threads. Stores whose playback is
    /// fully synchronous may rely on the default.
    fn is_playing(&self) -> bool {
        false
    }

    /// Set the output volume for subsequent playback (0.0 to 1.0).
    ///
    /// Default implementation does nothing. Override if the backend has a
    /// volume control.
    fn set_volume(&mut self, _volume: f32) {}
}

/// Probe a WAV file and return its duration in seconds.
///
/// Returns `None` if the file cannot be opened or is not a WAV.
pub fn wav_duration_secs(path: &Path) -> Option<f32> {
    let reader = hound::WavReader::open(path).ok()?;
    let sample_rate = reader.spec().sample_rate;
    if sample_rate == 0 {
        return None;
    }
    Some(reader.duration() as f32 / sample_rate as f32)
}
