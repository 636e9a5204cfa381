//! Tag-to-audio dispatch loop.
//!
//! One cycle runs the fixed pipeline: poll for a tag, read the NDEF data
//! window, decode the text, classify it, act on the command. Every
//! failure along the way abandons the cycle and returns the reader to
//! idle; the next tap starts from scratch. Playback is synchronous, so a
//! new cycle can never begin while audio from the previous one is still
//! sounding.

use crate::assets::{
    self, AssetStore, NO_MATCH_ASSET, STARTUP_ASSET, VOLUME_DOWN_ASSET, VOLUME_MAX_ASSET,
    VOLUME_MIN_ASSET, VOLUME_UP_ASSET,
};
use crate::command::{classify, Command};
use crate::error::{DecodeError, KioskError};
use crate::ndef::{decode_text_record, TEXT_CAPACITY};
use crate::transport::{TagTransport, DATA_PAGE_COUNT, DATA_PAGE_START, RAW_BUFFER_LEN};
use crate::volume::{VolumeControl, VolumeDirection, VolumeOutcome, VolumeStore};
use log::{debug, info, warn};
use std::time::Duration;

/// Dispatch loop tuning.
#[derive(Debug, Clone, Copy)]
pub struct KioskConfig {
    /// Pause between cycles while no tag is in the field.
    pub poll_interval: Duration,
    /// Exclusive upper bound on decoded tag text length.
    pub text_capacity: usize,
}

impl Default for KioskConfig {
    fn default() -> Self {
        KioskConfig {
            poll_interval: Duration::from_millis(250),
            text_capacity: TEXT_CAPACITY,
        }
    }
}

/// What a single dispatch cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No tag in the field.
    NoTag,
    /// A tag outside the accepted family was ignored unread.
    ForeignTag {
        /// UID length the foreign tag reported.
        uid_len: usize,
    },
    /// A page read failed mid-window; the cycle was abandoned.
    ReadAborted {
        /// Page whose read failed.
        page: u8,
    },
    /// The data window held no decodable text record.
    DecodeFailed(DecodeError),
    /// The named asset was played to completion.
    Played(String),
    /// The requested asset is not in the store.
    NoMatch {
        /// Asset name that missed.
        requested: String,
        /// Whether the no-match fallback was available and played.
        fallback_played: bool,
    },
    /// The volume moved one step and was persisted.
    VolumeChanged(VolumeDirection),
    /// A volume step was refused because the bound was already reached.
    VolumeAtBound(VolumeDirection),
}

/// Counters accumulated across cycles, reported when the kiosk stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Cycles that found a family tag and ran the pipeline.
    pub tags_handled: u64,
    /// Assets played on request.
    pub assets_played: u64,
    /// Requests that missed the store.
    pub no_matches: u64,
    /// Accepted volume steps.
    pub volume_changes: u64,
}

/// The kiosk dispatcher, generic over its three capabilities.
pub struct Kiosk<T: TagTransport, A: AssetStore, S: VolumeStore> {
    transport: T,
    assets: A,
    store: S,
    volume: VolumeControl,
    config: KioskConfig,
    stats: CycleStats,
}

impl<T: TagTransport, A: AssetStore, S: VolumeStore> Kiosk<T, A, S> {
    /// Build a kiosk, loading the volume from the settings store and
    /// applying it to the asset store.
    ///
    /// Fails only on settings-store errors; an unreadable settings store
    /// at this point is a configuration problem the caller must surface.
    pub fn new(
        transport: T,
        mut assets: A,
        mut store: S,
        config: KioskConfig,
    ) -> Result<Self, KioskError> {
        let volume = VolumeControl::load(&mut store)?;
        assets.set_volume(volume.current());
        Ok(Kiosk {
            transport,
            assets,
            store,
            volume,
            config,
            stats: CycleStats::default(),
        })
    }

    /// Play the startup greeting, if the store has one.
    pub fn startup(&mut self) {
        info!("kiosk ready, volume {}%", self.volume.percent());
        self.play_feedback(STARTUP_ASSET);
    }

    /// Run one dispatch cycle.
    ///
    /// Expected events (no tag, foreign tag, torn reads, undecodable
    /// data, missing assets, refused volume steps) are outcomes, not
    /// errors. An `Err` means a capability failed doing its job, and the
    /// cycle was abandoned just the same.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome, KioskError> {
        let Some(uid) = self.transport.poll() else {
            return Ok(CycleOutcome::NoTag);
        };

        if !uid.is_kiosk_family() {
            debug!("ignoring tag {} with {}-byte uid", uid, uid.len());
            return Ok(CycleOutcome::ForeignTag { uid_len: uid.len() });
        }
        debug!("tag {} acquired", uid);
        self.stats.tags_handled += 1;

        let mut raw = Vec::with_capacity(RAW_BUFFER_LEN);
        for page in DATA_PAGE_START..DATA_PAGE_START + DATA_PAGE_COUNT as u8 {
            match self.transport.read_page(page) {
                Ok(bytes) => raw.extend_from_slice(&bytes),
                Err(err) => {
                    debug!("{}, cycle abandoned", err);
                    return Ok(CycleOutcome::ReadAborted { page });
                }
            }
        }

        let text = match decode_text_record(&raw, self.config.text_capacity) {
            Ok(text) => text,
            Err(err) => {
                debug!("{}, cycle abandoned", err);
                return Ok(CycleOutcome::DecodeFailed(err));
            }
        };
        debug!("tag text '{}'", text);

        match classify(&text) {
            Command::VolumeUp => self.act_volume(VolumeDirection::Up),
            Command::VolumeDown => self.act_volume(VolumeDirection::Down),
            Command::PlayAsset(name) => self.act_play(name),
            Command::Unrecognized => {
                debug!("unrecognized command '{}', treating as miss", text);
                let requested = assets::asset_name(&text);
                let fallback_played = self.play_feedback(NO_MATCH_ASSET);
                Ok(CycleOutcome::NoMatch {
                    requested,
                    fallback_played,
                })
            }
        }
    }

    /// Run cycles until `keep_running` returns false.
    ///
    /// Capability errors are logged and absorbed; the loop itself never
    /// gives up. Pacing comes from [`KioskConfig::poll_interval`].
    pub fn run<F: FnMut() -> bool>(&mut self, mut keep_running: F) {
        while keep_running() {
            match self.run_cycle() {
                Ok(CycleOutcome::NoTag) => {}
                Ok(outcome) => debug!("cycle outcome: {:?}", outcome),
                Err(err) => warn!("cycle failed: {}", err),
            }
            std::thread::sleep(self.config.poll_interval);
        }
    }

    fn act_volume(&mut self, direction: VolumeDirection) -> Result<CycleOutcome, KioskError> {
        let outcome = match direction {
            VolumeDirection::Up => self.volume.increase(&mut self.store)?,
            VolumeDirection::Down => self.volume.decrease(&mut self.store)?,
        };

        match outcome {
            VolumeOutcome::Changed => {
                self.stats.volume_changes += 1;
                self.assets.set_volume(self.volume.current());
                info!(
                    "volume {} to {}%",
                    direction.as_str(),
                    self.volume.percent()
                );
                let feedback = match direction {
                    VolumeDirection::Up => VOLUME_UP_ASSET,
                    VolumeDirection::Down => VOLUME_DOWN_ASSET,
                };
                self.play_feedback(feedback);
                Ok(CycleOutcome::VolumeChanged(direction))
            }
            VolumeOutcome::AlreadyAtBound => {
                debug!("volume already at {} bound", direction.as_str());
                let feedback = match direction {
                    VolumeDirection::Up => VOLUME_MAX_ASSET,
                    VolumeDirection::Down => VOLUME_MIN_ASSET,
                };
                self.play_feedback(feedback);
                Ok(CycleOutcome::VolumeAtBound(direction))
            }
        }
    }

    fn act_play(&mut self, name: String) -> Result<CycleOutcome, KioskError> {
        if self.assets.exists(&name) {
            info!("playing {}", name);
            self.assets.play_to_completion(&name)?;
            self.stats.assets_played += 1;
            Ok(CycleOutcome::Played(name))
        } else {
            self.stats.no_matches += 1;
            info!("no asset for {}", name);
            let fallback_played = self.play_feedback(NO_MATCH_ASSET);
            Ok(CycleOutcome::NoMatch {
                requested: name,
                fallback_played,
            })
        }
    }

    /// Play a reserved feedback asset if the store has it.
    ///
    /// Feedback is optional by contract: a missing asset is silence, and
    /// a playback failure is logged without failing the cycle.
    fn play_feedback(&mut self, name: &str) -> bool {
        if !self.assets.exists(name) {
            debug!("feedback asset {} not installed", name);
            return false;
        }
        match self.assets.play_to_completion(name) {
            Ok(()) => true,
            Err(err) => {
                warn!("feedback {} failed: {}", name, err);
                false
            }
        }
    }

    /// Current playback volume.
    pub fn volume(&self) -> f32 {
        self.volume.current()
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> CycleStats {
        self.stats
    }

    /// The tag transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The asset store.
    pub fn assets(&self) -> &A {
        &self.assets
    }

    /// The settings store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<T: TagTransport, A: AssetStore, S: VolumeStore> Drop for Kiosk<T, A, S> {
    fn drop(&mut self) {
        info!(
            "kiosk stopped: {} tags, {} played, {} misses, {} volume changes",
            self.stats.tags_handled,
            self.stats.assets_played,
            self.stats.no_matches,
            self.stats.volume_changes
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AssetError, PersistError, TransportError};
    use crate::transport::{TagUid, PAGE_LEN};
    use crate::volume::VOLUME_ADDR;
    use std::collections::VecDeque;

    /// Transport scripted with poll results and a fixed data window.
    struct ScriptTransport {
        polls: VecDeque<Option<TagUid>>,
        image: Vec<u8>,
        fail_page: Option<u8>,
        pages_read: usize,
    }

    impl ScriptTransport {
        fn with_tag(image: Vec<u8>) -> Self {
            ScriptTransport {
                polls: VecDeque::from([Some(family_uid())]),
                image,
                fail_page: None,
                pages_read: 0,
            }
        }

        fn empty_field() -> Self {
            ScriptTransport {
                polls: VecDeque::new(),
                image: Vec::new(),
                fail_page: None,
                pages_read: 0,
            }
        }
    }

    impl TagTransport for ScriptTransport {
        fn poll(&mut self) -> Option<TagUid> {
            self.polls.pop_front().flatten()
        }

        fn read_page(&mut self, page: u8) -> Result<[u8; PAGE_LEN], TransportError> {
            if Some(page) == self.fail_page {
                return Err(TransportError::PageRead {
                    page,
                    reason: "tag left the field".to_string(),
                });
            }
            self.pages_read += 1;
            let start = (page - DATA_PAGE_START) as usize * PAGE_LEN;
            let mut out = [0u8; PAGE_LEN];
            out.copy_from_slice(&self.image[start..start + PAGE_LEN]);
            Ok(out)
        }
    }

    /// Asset store that records playback and volume calls.
    struct MockAssets {
        present: Vec<String>,
        played: Vec<String>,
        volumes: Vec<f32>,
        fail_playback: bool,
    }

    impl MockAssets {
        fn with(names: &[&str]) -> Self {
            MockAssets {
                present: names.iter().map(|n| n.to_string()).collect(),
                played: Vec::new(),
                volumes: Vec::new(),
                fail_playback: false,
            }
        }
    }

    impl AssetStore for MockAssets {
        fn exists(&self, name: &str) -> bool {
            self.present.iter().any(|n| n == name)
        }

        fn play_to_completion(&mut self, name: &str) -> Result<(), AssetError> {
            if self.fail_playback {
                return Err(AssetError::Backend("decoder went away".to_string()));
            }
            self.played.push(name.to_string());
            Ok(())
        }

        fn set_volume(&mut self, volume: f32) {
            self.volumes.push(volume);
        }
    }

    /// One-byte settings store.
    struct MemStore {
        byte: u8,
        writes: Vec<u8>,
    }

    impl MemStore {
        fn with_percent(byte: u8) -> Self {
            MemStore {
                byte,
                writes: Vec::new(),
            }
        }
    }

    impl VolumeStore for MemStore {
        fn read_byte(&mut self, addr: usize) -> Result<u8, PersistError> {
            assert_eq!(addr, VOLUME_ADDR);
            Ok(self.byte)
        }

        fn write_byte(&mut self, addr: usize, value: u8) -> Result<(), PersistError> {
            assert_eq!(addr, VOLUME_ADDR);
            self.byte = value;
            self.writes.push(value);
            Ok(())
        }
    }

    fn family_uid() -> TagUid {
        TagUid::new(&[0x04, 0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC])
    }

    /// 24-byte data window holding a Text Record, as a phone writes it.
    fn window_with_text(text: &str) -> Vec<u8> {
        let mut record = vec![0xD1, 0x01];
        record.push((1 + 2 + text.len()) as u8);
        record.push(0x54);
        record.push(0x02);
        record.extend_from_slice(b"en");
        record.extend_from_slice(text.as_bytes());

        let mut image = vec![0x03, record.len() as u8];
        image.extend_from_slice(&record);
        image.push(0xFE);
        image.resize(RAW_BUFFER_LEN, 0x00);
        image
    }

    fn kiosk(
        transport: ScriptTransport,
        assets: MockAssets,
        store: MemStore,
    ) -> Kiosk<ScriptTransport, MockAssets, MemStore> {
        Kiosk::new(transport, assets, store, KioskConfig::default()).unwrap()
    }

    #[test]
    fn test_empty_field_is_a_quiet_cycle() {
        let mut kiosk = kiosk(
            ScriptTransport::empty_field(),
            MockAssets::with(&[]),
            MemStore::with_percent(50),
        );
        assert_eq!(kiosk.run_cycle().unwrap(), CycleOutcome::NoTag);
        assert!(kiosk.assets().played.is_empty());
    }

    #[test]
    fn test_foreign_tag_is_never_read() {
        let mut transport = ScriptTransport::with_tag(window_with_text("MUSEUM"));
        transport.polls = VecDeque::from([Some(TagUid::new(&[0xDE, 0xAD, 0xBE, 0xEF]))]);

        let mut kiosk = kiosk(
            transport,
            MockAssets::with(&["MUSEUM.WAV"]),
            MemStore::with_percent(50),
        );
        assert_eq!(
            kiosk.run_cycle().unwrap(),
            CycleOutcome::ForeignTag { uid_len: 4 }
        );
        assert_eq!(kiosk.transport().pages_read, 0);
        assert!(kiosk.assets().played.is_empty());
    }

    #[test]
    fn test_matched_asset_plays() {
        let mut kiosk = kiosk(
            ScriptTransport::with_tag(window_with_text("museum")),
            MockAssets::with(&["MUSEUM.WAV"]),
            MemStore::with_percent(50),
        );
        assert_eq!(
            kiosk.run_cycle().unwrap(),
            CycleOutcome::Played("MUSEUM.WAV".to_string())
        );
        assert_eq!(kiosk.assets().played, vec!["MUSEUM.WAV"]);
        assert_eq!(kiosk.stats().assets_played, 1);
    }

    #[test]
    fn test_miss_plays_fallback_when_installed() {
        let mut kiosk = kiosk(
            ScriptTransport::with_tag(window_with_text("GHOST")),
            MockAssets::with(&[NO_MATCH_ASSET]),
            MemStore::with_percent(50),
        );
        assert_eq!(
            kiosk.run_cycle().unwrap(),
            CycleOutcome::NoMatch {
                requested: "GHOST.WAV".to_string(),
                fallback_played: true,
            }
        );
        assert_eq!(kiosk.assets().played, vec![NO_MATCH_ASSET]);
    }

    #[test]
    fn test_miss_is_silent_without_fallback() {
        let mut kiosk = kiosk(
            ScriptTransport::with_tag(window_with_text("GHOST")),
            MockAssets::with(&[]),
            MemStore::with_percent(50),
        );
        assert_eq!(
            kiosk.run_cycle().unwrap(),
            CycleOutcome::NoMatch {
                requested: "GHOST.WAV".to_string(),
                fallback_played: false,
            }
        );
        assert!(kiosk.assets().played.is_empty());
    }

    #[test]
    fn test_volume_up_persists_and_reaches_the_backend() {
        let mut kiosk = kiosk(
            ScriptTransport::with_tag(window_with_text("VOLUMEUP")),
            MockAssets::with(&[VOLUME_UP_ASSET]),
            MemStore::with_percent(50),
        );
        assert_eq!(
            kiosk.run_cycle().unwrap(),
            CycleOutcome::VolumeChanged(VolumeDirection::Up)
        );
        assert_eq!(kiosk.store().writes, vec![60]);
        // Applied once at construction, once after the step.
        assert_eq!(kiosk.assets().volumes.len(), 2);
        assert!((kiosk.assets().volumes[1] - 0.6).abs() < 1e-6);
        assert_eq!(kiosk.assets().played, vec![VOLUME_UP_ASSET]);
    }

    #[test]
    fn test_volume_down_at_minimum_is_refused() {
        let mut kiosk = kiosk(
            ScriptTransport::with_tag(window_with_text("VOLUMEDN")),
            MockAssets::with(&[VOLUME_MIN_ASSET]),
            MemStore::with_percent(10),
        );
        assert_eq!(
            kiosk.run_cycle().unwrap(),
            CycleOutcome::VolumeAtBound(VolumeDirection::Down)
        );
        assert!(kiosk.store().writes.is_empty());
        assert_eq!(kiosk.assets().played, vec![VOLUME_MIN_ASSET]);
        // Volume unchanged, so the backend saw only the initial apply.
        assert_eq!(kiosk.assets().volumes.len(), 1);
    }

    #[test]
    fn test_read_failure_mid_window_aborts() {
        let mut transport = ScriptTransport::with_tag(window_with_text("MUSEUM"));
        transport.fail_page = Some(7);

        let mut kiosk = kiosk(
            transport,
            MockAssets::with(&["MUSEUM.WAV"]),
            MemStore::with_percent(50),
        );
        assert_eq!(
            kiosk.run_cycle().unwrap(),
            CycleOutcome::ReadAborted { page: 7 }
        );
        // Pages 4 through 6 were read before the failure.
        assert_eq!(kiosk.transport().pages_read, 3);
        assert!(kiosk.assets().played.is_empty());
        assert!(kiosk.store().writes.is_empty());
    }

    #[test]
    fn test_undecodable_window_is_abandoned() {
        let mut kiosk = kiosk(
            ScriptTransport::with_tag(vec![0u8; RAW_BUFFER_LEN]),
            MockAssets::with(&["MUSEUM.WAV"]),
            MemStore::with_percent(50),
        );
        assert_eq!(
            kiosk.run_cycle().unwrap(),
            CycleOutcome::DecodeFailed(DecodeError::NoPattern)
        );
        assert!(kiosk.assets().played.is_empty());
    }

    #[test]
    fn test_playback_failure_surfaces_as_error() {
        let mut assets = MockAssets::with(&["MUSEUM.WAV"]);
        assets.fail_playback = true;

        let mut kiosk = kiosk(
            ScriptTransport::with_tag(window_with_text("MUSEUM")),
            assets,
            MemStore::with_percent(50),
        );
        assert!(matches!(kiosk.run_cycle(), Err(KioskError::Asset(_))));
        assert_eq!(kiosk.stats().assets_played, 0);
    }

    #[test]
    fn test_startup_plays_greeting_when_installed() {
        let mut kiosk = kiosk(
            ScriptTransport::empty_field(),
            MockAssets::with(&[STARTUP_ASSET]),
            MemStore::with_percent(50),
        );
        kiosk.startup();
        assert_eq!(kiosk.assets().played, vec![STARTUP_ASSET]);
    }

    #[test]
    fn test_construction_applies_loaded_volume() {
        let kiosk = kiosk(
            ScriptTransport::empty_field(),
            MockAssets::with(&[]),
            MemStore::with_percent(70),
        );
        assert_eq!(kiosk.assets().volumes.len(), 1);
        assert!((kiosk.assets().volumes[0] - 0.7).abs() < 1e-6);
        assert!((kiosk.volume() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_run_respects_stop_predicate() {
        let config = KioskConfig {
            poll_interval: Duration::from_millis(1),
            ..KioskConfig::default()
        };
        let mut kiosk = Kiosk::new(
            ScriptTransport::empty_field(),
            MockAssets::with(&[]),
            MemStore::with_percent(50),
            config,
        )
        .unwrap();

        let mut budget = 3;
        kiosk.run(|| {
            budget -= 1;
            budget >= 0
        });
        assert_eq!(budget, -1);
    }
}
