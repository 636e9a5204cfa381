//! Rodio-backed asset store for real audio output.
//!
//! Serves WAV assets from a single flat directory through the system's
//! default output device. Playback blocks the calling thread until the
//! asset finishes, which is exactly the contract the dispatcher wants;
//! the active sink is shared behind a mutex so observers on other
//! threads can still ask whether audio is sounding.

use crate::assets::{wav_duration_secs, AssetStore};
use crate::error::AssetError;
use log::{debug, info, warn};
use parking_lot::Mutex;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Asset store backed by a directory of WAV files and a rodio device.
pub struct WavAssetLibrary {
    root: PathBuf,
    /// The stream must be kept alive for the handle to remain valid.
    _stream: OutputStream,
    handle: OutputStreamHandle,
    current: Arc<Mutex<Option<Arc<Sink>>>>,
    volume: f32,
}

impl WavAssetLibrary {
    /// Open the library rooted at `dir` and claim the default output
    /// device.
    ///
    /// Fails if the directory cannot be listed or no output device is
    /// available; both are conditions the kiosk cannot start without.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, AssetError> {
        let root = dir.as_ref().to_path_buf();

        let mut count = 0usize;
        let entries = std::fs::read_dir(&root).map_err(|source| AssetError::Unreadable {
            name: root.display().to_string(),
            source,
        })?;
        for entry in entries.flatten() {
            let path = entry.path();
            if !is_wav(&path) {
                continue;
            }
            count += 1;
            if let Some(secs) = wav_duration_secs(&path) {
                debug!("catalogued {} ({:.1}s)", path.display(), secs);
            } else {
                warn!("{} has a WAV name but no readable header", path.display());
            }
        }
        info!("asset library at {} holds {} WAV files", root.display(), count);

        let (stream, handle) = OutputStream::try_default()
            .map_err(|err| AssetError::Backend(format!("no audio output device: {err}")))?;

        Ok(WavAssetLibrary {
            root,
            _stream: stream,
            handle,
            current: Arc::new(Mutex::new(None)),
            volume: 1.0,
        })
    }

    /// Directory the library serves from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of WAV files currently in the directory.
    pub fn asset_count(&self) -> usize {
        std::fs::read_dir(&self.root)
            .map(|entries| {
                entries
                    .flatten()
                    .filter(|entry| is_wav(&entry.path()))
                    .count()
            })
            .unwrap_or(0)
    }

    fn path_for(&self, name: &str) -> Option<PathBuf> {
        flat_path(&self.root, name)
    }
}

/// Resolve an asset name inside `root`.
///
/// Names come from tag text; only flat names address the library, so
/// anything with a path separator is refused.
fn flat_path(root: &Path, name: &str) -> Option<PathBuf> {
    if name.is_empty() || name.contains(['/', '\\']) {
        return None;
    }
    Some(root.join(name))
}

fn is_wav(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("wav"))
            .unwrap_or(false)
}

impl AssetStore for WavAssetLibrary {
    fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_some_and(|path| path.is_file())
    }

    fn play_to_completion(&mut self, name: &str) -> Result<(), AssetError> {
        let path = self
            .path_for(name)
            .ok_or_else(|| AssetError::Backend(format!("'{name}' is not a flat asset name")))?;

        let file = File::open(&path).map_err(|source| AssetError::Unreadable {
            name: name.to_string(),
            source,
        })?;
        let source = Decoder::new(BufReader::new(file))
            .map_err(|err| AssetError::Backend(format!("cannot decode '{name}': {err}")))?;
        let sink = Sink::try_new(&self.handle)
            .map_err(|err| AssetError::Backend(format!("cannot open sink: {err}")))?;

        sink.set_volume(self.volume);
        sink.append(source);

        let sink = Arc::new(sink);
        *self.current.lock() = Some(Arc::clone(&sink));
        sink.sleep_until_end();
        *self.current.lock() = None;

        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .is_some_and(|sink| !sink.empty())
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }
}
