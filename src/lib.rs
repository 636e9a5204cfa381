//! NFC-Tag-Driven Audio Kiosk Core
//!
//! Visitors tap an NFC tag on a reader; the kiosk pulls the tag's NDEF
//! Text Record apart, interprets the text as a command, and either plays
//! the matching WAV asset or steps the playback volume. The volume
//! survives restarts through a small settings image with an integer
//! percent mirror of the float state.
//!
//! # Features
//! - NDEF Text Record decoder with strict offset validation
//! - Case-insensitive command classification (volume keywords, asset names)
//! - Bounded, persisted volume with self-healing on corrupt stores
//! - Sequential dispatch loop that abandons any failed cycle silently
//! - Capability traits for the reader, the asset store, and the settings
//!   store, so the whole pipeline runs against mocks in tests
//!
//! # Crate feature flags
//! - `playback` (opt-in): Rodio-backed [`WavAssetLibrary`] for real audio
//!   output (enables optional `rodio` dep)
//!
//! # Quick start
//! ## Decode and classify a tag
//! ```
//! use taptone::{classify, decode_text_record, Command, TEXT_CAPACITY};
//!
//! // Raw pages as read from a tag: TLV byte pair, Text Record, padding.
//! let pages = [
//!     0x03, 0x0D, 0xD1, 0x01, 0x09, 0x54, 0x02, b'e', b'n', b'm', b'u',
//!     b's', b'e', b'u', b'm', 0xFE, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
//!     0x00, 0x00,
//! ];
//! let text = decode_text_record(&pages, TEXT_CAPACITY).unwrap();
//! assert_eq!(text, "museum");
//! assert_eq!(classify(&text), Command::PlayAsset("MUSEUM.WAV".into()));
//! ```
//!
//! ## Run the dispatch loop
//! ```no_run
//! # fn wire() -> taptone::Result<()> {
//! use taptone::{FileByteStore, Kiosk, KioskConfig};
//! # use taptone::{AssetStore, TagTransport};
//! # struct MyReader; struct MyAssets;
//! # impl TagTransport for MyReader {
//! #     fn poll(&mut self) -> Option<taptone::TagUid> { None }
//! #     fn read_page(&mut self, _: u8) -> Result<[u8; 4], taptone::TransportError> {
//! #         Ok([0; 4])
//! #     }
//! # }
//! # impl AssetStore for MyAssets {
//! #     fn exists(&self, _: &str) -> bool { false }
//! #     fn play_to_completion(&mut self, _: &str) -> Result<(), taptone::AssetError> { Ok(()) }
//! # }
//! # let reader = MyReader; let assets = MyAssets;
//! let store = FileByteStore::open("settings.bin")?;
//! let mut kiosk = Kiosk::new(reader, assets, store, KioskConfig::default())?;
//! kiosk.startup();
//! kiosk.run(|| true);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod assets; // Asset naming & store capability
pub mod command; // Tag text classification
pub mod error; // Error taxonomy
pub mod kiosk; // Dispatch loop
pub mod ndef; // NDEF Text Record decoding
pub mod persist; // File-backed settings store
#[cfg(feature = "playback")]
pub mod playback; // Rodio-backed asset store
pub mod transport; // Tag reader capability
pub mod volume; // Persisted volume state

// Public API exports
pub use assets::AssetStore;
pub use command::{classify, Command};
pub use error::{
    AssetError, DecodeError, KioskError, PersistError, Result, TransportError,
};
pub use kiosk::{CycleOutcome, CycleStats, Kiosk, KioskConfig};
pub use ndef::{decode_text_record, TEXT_CAPACITY};
pub use persist::FileByteStore;
#[cfg(feature = "playback")]
pub use playback::WavAssetLibrary;
pub use transport::{TagTransport, TagUid};
pub use volume::{VolumeControl, VolumeDirection, VolumeStore};
