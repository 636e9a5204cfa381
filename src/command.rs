//! Tag command classification
//!
//! Maps decoded tag text to a kiosk command. The two volume keywords are
//! matched case-insensitively and exactly; any other text names an audio
//! asset to play.

use crate::assets;

/// Keyword that raises the volume by one step.
pub const VOLUME_UP_KEYWORD: &str = "VOLUMEUP";
/// Keyword that lowers the volume by one step.
pub const VOLUME_DOWN_KEYWORD: &str = "VOLUMEDN";

/// Command derived from a decoded tag text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Raise the volume by one step.
    VolumeUp,
    /// Lower the volume by one step.
    VolumeDown,
    /// Play the named asset from the store.
    PlayAsset(String),
    /// Reserved for dispatch-side bookkeeping; the classifier maps all
    /// non-keyword text to [`Command::PlayAsset`] and never produces this.
    Unrecognized,
}

/// Classify decoded tag text into a command.
///
/// Matching is case-insensitive: the text is uppercased once and compared
/// against the keywords. Non-keyword text turns into an asset name via
/// [`assets::asset_name`], so `museum` and `Museum` both request
/// `MUSEUM.WAV`.
pub fn classify(text: &str) -> Command {
    let upper = text.to_ascii_uppercase();
    match upper.as_str() {
        VOLUME_UP_KEYWORD => Command::VolumeUp,
        VOLUME_DOWN_KEYWORD => Command::VolumeDown,
        _ => Command::PlayAsset(assets::asset_name(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_volume_keywords() {
        assert_eq!(classify("VOLUMEUP"), Command::VolumeUp);
        assert_eq!(classify("VOLUMEDN"), Command::VolumeDown);
    }

    #[test]
    fn test_classify_keywords_case_insensitive() {
        assert_eq!(classify("volumeup"), Command::VolumeUp);
        assert_eq!(classify("VolumeDn"), Command::VolumeDown);
        assert_eq!(classify("vOlUmEuP"), Command::VolumeUp);
    }

    #[test]
    fn test_classify_text_as_asset() {
        assert_eq!(
            classify("MUSEUM"),
            Command::PlayAsset("MUSEUM.WAV".to_string())
        );
        assert_eq!(
            classify("zone7"),
            Command::PlayAsset("ZONE7.WAV".to_string())
        );
    }

    #[test]
    fn test_classify_keyword_requires_exact_match() {
        // Surrounding whitespace or suffixes make it an asset request.
        assert_eq!(
            classify(" VOLUMEUP"),
            Command::PlayAsset(" VOLUMEUP.WAV".to_string())
        );
        assert_eq!(
            classify("VOLUMEUP2"),
            Command::PlayAsset("VOLUMEUP2.WAV".to_string())
        );
    }

    #[test]
    fn test_classify_empty_text_is_bare_extension() {
        // Degenerate but deliberate: the bare extension misses every
        // store lookup downstream instead of failing here.
        assert_eq!(classify(""), Command::PlayAsset(".WAV".to_string()));
    }
}
