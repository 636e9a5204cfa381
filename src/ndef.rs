//! NDEF Text Record decoder for NFC tag data
//!
//! Decodes the first NDEF Text Record found inside a raw page buffer read
//! from an NFC tag. Tags written by standard phone apps wrap the record in
//! a TLV container with variable leading bytes, so the record header is
//! located by scanning rather than by fixed offset.
//!
//! Record layout (well-known Text type, short record):
//! - Record header byte (`0xD1`: MB/ME/SR set, TNF well-known)
//! - Type length (`0x01`)
//! - Payload length (one byte, short record)
//! - Type (`0x54`, ASCII 'T')
//! - Status byte (bit 7: UTF-16 flag, bits 0-5: language code length)
//! - Language code (e.g. `en`), then the text itself

use crate::error::DecodeError;
use bitflags::bitflags;

/// Record header byte for a short, well-known-type single record.
pub const RECORD_HEADER: u8 = 0xD1;
/// Type length of the well-known Text type (one byte).
pub const TYPE_LENGTH: u8 = 0x01;
/// Well-known Text type identifier, ASCII 'T'.
pub const TYPE_TEXT: u8 = 0x54;

/// Smallest buffer that can hold a record with one text byte.
/// Header, type length, payload length, type, status, one text byte.
pub const RECORD_MIN_LEN: usize = 6;

/// Upper bound (exclusive) for decoded text length.
///
/// Command texts become 8.3 asset names with a four-character extension
/// appended, so 27 usable characters fill a 32-byte name buffer with the
/// extension and terminator.
pub const TEXT_CAPACITY: usize = 28;

bitflags! {
    /// Flag bits of the Text Record status byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TextStatusFlags: u8 {
        /// Text is encoded as UTF-16 instead of UTF-8.
        const UTF16 = 0x80;
    }
}

/// Decoded view of a Text Record status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStatus {
    flags: TextStatusFlags,
    lang_len: usize,
}

impl TextStatus {
    /// Mask for the language code length bits.
    pub const LANG_LEN_MASK: u8 = 0x3F;

    /// Split a raw status byte into flags and language code length.
    pub fn from_byte(raw: u8) -> Self {
        TextStatus {
            flags: TextStatusFlags::from_bits_truncate(raw),
            lang_len: (raw & Self::LANG_LEN_MASK) as usize,
        }
    }

    /// Length of the language code preceding the text.
    pub fn lang_len(&self) -> usize {
        self.lang_len
    }

    /// Whether the UTF-16 flag is set.
    ///
    /// The decoder does not honor this flag; command tags are written as
    /// UTF-8 and the text region is validated as UTF-8 regardless.
    pub fn is_utf16(&self) -> bool {
        self.flags.contains(TextStatusFlags::UTF16)
    }
}

/// Decode the first Text Record found in `buf`.
///
/// Scans for the `D1 01 .. 54` header pattern and decodes the record at
/// the first structural match. A match that fails its length or encoding
/// checks is an error for the whole buffer; later candidates are never
/// considered, mirroring the single-pass reader this decoder replaces.
///
/// `text_capacity` is an exclusive upper bound on the decoded text length
/// (use [`TEXT_CAPACITY`] for command tags).
pub fn decode_text_record(buf: &[u8], text_capacity: usize) -> Result<String, DecodeError> {
    if buf.len() < RECORD_MIN_LEN {
        return Err(DecodeError::NoPattern);
    }

    for offset in 0..=buf.len() - RECORD_MIN_LEN {
        if buf[offset] != RECORD_HEADER
            || buf[offset + 1] != TYPE_LENGTH
            || buf[offset + 3] != TYPE_TEXT
        {
            continue;
        }
        // First structural match wins; decode it or reject the buffer.
        return decode_at(buf, offset, text_capacity);
    }

    Err(DecodeError::NoPattern)
}

/// Decode the record whose header starts at `offset`.
///
/// The scan guarantees `offset + 5 <= buf.len()`, so the fixed header
/// bytes are in range; only the text region needs a bounds check.
fn decode_at(buf: &[u8], offset: usize, text_capacity: usize) -> Result<String, DecodeError> {
    let payload_len = buf[offset + 2];
    let status = TextStatus::from_byte(buf[offset + 4]);
    let lang_len = status.lang_len();

    let invalid_length = DecodeError::InvalidLength {
        offset,
        payload_len,
        lang_len: lang_len as u8,
    };

    // Payload holds the status byte, the language code, then the text.
    let text_len = match (payload_len as usize).checked_sub(1 + lang_len) {
        Some(len) if len > 0 => len,
        _ => return Err(invalid_length),
    };

    if text_len >= text_capacity {
        return Err(invalid_length);
    }

    let text_start = offset + 5 + lang_len;
    if text_start + text_len > buf.len() {
        return Err(invalid_length);
    }

    let text = &buf[text_start..text_start + text_len];
    match std::str::from_utf8(text) {
        Ok(text) => Ok(text.to_string()),
        Err(_) => Err(DecodeError::InvalidEncoding { offset }),
    }
}
