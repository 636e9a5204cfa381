//! Tag transport capability and page geometry.
//!
//! The dispatcher talks to the NFC reader through [`TagTransport`], which
//! reduces the reader to two operations: a non-blocking poll for a tag in
//! the field and a four-byte page read. Command tags keep their NDEF data
//! in a fixed window of pages, read here as one contiguous buffer.

use crate::error::TransportError;
use std::fmt;

/// UID length of the tag family the kiosk accepts.
pub const TAG_UID_LEN: usize = 7;
/// Largest UID any ISO 14443 tag can report.
pub const MAX_UID_LEN: usize = 10;
/// Bytes per tag page.
pub const PAGE_LEN: usize = 4;
/// First page of the NDEF data window.
pub const DATA_PAGE_START: u8 = 4;
/// Number of pages in the NDEF data window.
pub const DATA_PAGE_COUNT: usize = 6;
/// Total size of the data window in bytes.
pub const RAW_BUFFER_LEN: usize = PAGE_LEN * DATA_PAGE_COUNT;

/// UID reported by a tag in the field.
///
/// Stored as a fixed buffer with an explicit length, the way readers
/// deliver it. Lengths beyond [`MAX_UID_LEN`] are truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagUid {
    bytes: [u8; MAX_UID_LEN],
    len: usize,
}

impl TagUid {
    /// Build a UID from reader bytes.
    pub fn new(uid: &[u8]) -> Self {
        let len = uid.len().min(MAX_UID_LEN);
        let mut bytes = [0u8; MAX_UID_LEN];
        bytes[..len].copy_from_slice(&uid[..len]);
        TagUid { bytes, len }
    }

    /// UID length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the UID is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// UID bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Whether this UID belongs to the accepted tag family.
    ///
    /// Command tags are NTAG-class with seven-byte UIDs; anything else in
    /// the field is ignored without being read.
    pub fn is_kiosk_family(&self) -> bool {
        self.len == TAG_UID_LEN
    }
}

impl fmt::Display for TagUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.as_bytes().iter().enumerate() {
            if i > 0 {
                write!(f, ":")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

/// Reader-side capability for tag acquisition and page reads.
pub trait TagTransport {
    /// Check the field for a tag, returning its UID if one is present.
    ///
    /// Must not block waiting for a tag; absence is the common case and
    /// is reported as `None`.
    fn poll(&mut self) -> Option<TagUid>;

    /// Read one four-byte page from the tag acquired by the last poll.
    fn read_page(&mut self, page: u8) -> Result<[u8; PAGE_LEN], TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_roundtrip() {
        let uid = TagUid::new(&[0x04, 0xA1, 0xB2, 0xC3, 0xD4, 0xE5, 0x80]);
        assert_eq!(uid.len(), 7);
        assert!(uid.is_kiosk_family());
        assert_eq!(uid.as_bytes()[0], 0x04);
    }

    #[test]
    fn test_short_uid_is_foreign() {
        let uid = TagUid::new(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(uid.len(), 4);
        assert!(!uid.is_kiosk_family());
    }

    #[test]
    fn test_overlong_uid_is_truncated() {
        let uid = TagUid::new(&[0x11; 12]);
        assert_eq!(uid.len(), MAX_UID_LEN);
        assert!(!uid.is_kiosk_family());
    }

    #[test]
    fn test_uid_display_format() {
        let uid = TagUid::new(&[0x04, 0x0A, 0xFF]);
        assert_eq!(uid.to_string(), "04:0A:FF");
    }

    #[test]
    fn test_data_window_geometry() {
        assert_eq!(RAW_BUFFER_LEN, 24);
        let last_page = DATA_PAGE_START as usize + DATA_PAGE_COUNT - 1;
        assert_eq!(last_page, 9);
    }
}
