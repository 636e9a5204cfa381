//! Error handling for kiosk decoding, capabilities, and dispatch.

use thiserror::Error;

/// Convenient result alias for kiosk operations.
pub type Result<T> = std::result::Result<T, KioskError>;

/// Errors that may occur while decoding an NDEF Text Record from raw tag pages.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// No Text Record header pattern anywhere in the buffer.
    #[error("no NDEF text record in tag data")]
    NoPattern,
    /// The record found first has inconsistent length fields.
    #[error("text record at offset {offset} has invalid length (payload {payload_len}, language {lang_len})")]
    InvalidLength {
        /// Offset of the record header inside the buffer.
        offset: usize,
        /// Declared payload length byte.
        payload_len: u8,
        /// Language-code length taken from the status byte.
        lang_len: u8,
    },
    /// The text region is not valid UTF-8.
    #[error("text record at offset {offset} is not valid UTF-8")]
    InvalidEncoding {
        /// Offset of the record header inside the buffer.
        offset: usize,
    },
}

/// Errors raised by a tag transport while talking to the reader.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A data page read failed after the tag was acquired.
    #[error("page {page} read failed: {reason}")]
    PageRead {
        /// Page number that could not be read.
        page: u8,
        /// Reader-supplied failure description.
        reason: String,
    },
    /// The reader hardware could not be reached at all.
    #[error("tag reader unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by an asset store during lookup or playback.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The asset exists in the catalogue but could not be opened.
    #[error("asset '{name}' could not be opened")]
    Unreadable {
        /// Asset name as requested by the dispatcher.
        name: String,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// The audio backend rejected the asset or failed mid-playback.
    #[error("audio backend error: {0}")]
    Backend(String),
}

/// Errors raised by the settings byte store.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Address lies outside the fixed settings image.
    #[error("settings address {addr} out of range")]
    AddressOutOfRange {
        /// Offending byte address.
        addr: usize,
    },
    /// Filesystem failure while reading or replacing the image.
    #[error("settings store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error for kiosk construction and dispatch.
#[derive(Debug, Error)]
pub enum KioskError {
    /// Tag decoding failure.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    /// Tag transport failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// Asset store failure.
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),
    /// Settings persistence failure.
    #[error("persistence error: {0}")]
    Persist(#[from] PersistError),
}
