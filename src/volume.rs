//! Kiosk volume state with a persisted integer mirror.
//!
//! The playback volume is a bounded float stepped in fixed increments.
//! Every accepted change is stored as an integer percent in a settings
//! byte store before the in-memory value is committed, so the two views
//! agree whenever a mutation has completed. A stored value above 100 is
//! treated as corrupt and healed back to the default at load time.

use crate::error::PersistError;
use log::{debug, warn};
use std::fmt;

/// Amount added or removed per volume step.
pub const VOLUME_STEP: f32 = 0.1;
/// Lower volume bound; the kiosk is never fully muted.
pub const MIN_VOLUME: f32 = 0.1;
/// Upper volume bound.
pub const MAX_VOLUME: f32 = 1.0;
/// Percent stored when the persisted value is unusable.
pub const DEFAULT_VOLUME_PERCENT: u8 = 50;
/// Largest percent a well-formed store can hold.
pub const MAX_VOLUME_PERCENT: u8 = 100;
/// Byte address of the volume percent inside the settings image.
pub const VOLUME_ADDR: usize = 0;

/// Byte-addressed persistent store for kiosk settings.
///
/// Implementations must make a completed [`VolumeStore::write_byte`]
/// durable before returning; the volume manager commits its in-memory
/// state only after the write succeeds.
pub trait VolumeStore {
    /// Read the byte at `addr`.
    fn read_byte(&mut self, addr: usize) -> Result<u8, PersistError>;

    /// Durably write `value` at `addr`.
    fn write_byte(&mut self, addr: usize, value: u8) -> Result<(), PersistError>;
}

/// Result of a volume step request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeOutcome {
    /// The volume moved one step and the new value was persisted.
    Changed,
    /// The volume was already at the requested bound; nothing was written.
    AlreadyAtBound,
}

/// Direction of a volume step request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeDirection {
    /// Toward [`MAX_VOLUME`].
    Up,
    /// Toward [`MIN_VOLUME`].
    Down,
}

impl VolumeDirection {
    /// Short label for log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeDirection::Up => "up",
            VolumeDirection::Down => "down",
        }
    }
}

impl fmt::Display for VolumeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Current position of the volume relative to its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeBand {
    /// At the lower bound; decrease requests are refused.
    AtMin,
    /// Strictly between the bounds.
    Mid,
    /// At the upper bound; increase requests are refused.
    AtMax,
}

/// Bounded, persisted playback volume.
#[derive(Debug, Clone)]
pub struct VolumeControl {
    value: f32,
}

impl VolumeControl {
    /// Load the volume from the settings store.
    ///
    /// A stored percent above [`MAX_VOLUME_PERCENT`] is corrupt: the
    /// default is written back immediately and used instead. A stored
    /// percent below the lower bound is kept on disk but clamped in
    /// memory; the first accepted step rewrites it.
    pub fn load(store: &mut dyn VolumeStore) -> Result<Self, PersistError> {
        let raw = store.read_byte(VOLUME_ADDR)?;
        let percent = if raw > MAX_VOLUME_PERCENT {
            warn!(
                "stored volume {} out of range, restoring default {}",
                raw, DEFAULT_VOLUME_PERCENT
            );
            store.write_byte(VOLUME_ADDR, DEFAULT_VOLUME_PERCENT)?;
            DEFAULT_VOLUME_PERCENT
        } else {
            raw
        };

        let value = (percent as f32 / 100.0).clamp(MIN_VOLUME, MAX_VOLUME);
        debug!("volume loaded: {:.2} ({}%)", value, percent);
        Ok(VolumeControl { value })
    }

    /// Raise the volume one step, persisting before committing.
    pub fn increase(&mut self, store: &mut dyn VolumeStore) -> Result<VolumeOutcome, PersistError> {
        if self.value >= MAX_VOLUME {
            return Ok(VolumeOutcome::AlreadyAtBound);
        }
        let next = (self.value + VOLUME_STEP).min(MAX_VOLUME);
        self.commit(store, next)?;
        Ok(VolumeOutcome::Changed)
    }

    /// Lower the volume one step, persisting before committing.
    pub fn decrease(&mut self, store: &mut dyn VolumeStore) -> Result<VolumeOutcome, PersistError> {
        if self.value <= MIN_VOLUME {
            return Ok(VolumeOutcome::AlreadyAtBound);
        }
        let next = (self.value - VOLUME_STEP).max(MIN_VOLUME);
        self.commit(store, next)?;
        Ok(VolumeOutcome::Changed)
    }

    /// Persist `next` as a percent, then adopt its quantized value.
    ///
    /// Re-deriving the float from the stored percent keeps the two views
    /// bit-identical and stops step arithmetic from accumulating drift.
    fn commit(&mut self, store: &mut dyn VolumeStore, next: f32) -> Result<(), PersistError> {
        let percent = Self::percent_of(next);
        store.write_byte(VOLUME_ADDR, percent)?;
        self.value = percent as f32 / 100.0;
        Ok(())
    }

    /// Integer percent encoding of a volume value.
    pub fn percent_of(value: f32) -> u8 {
        (value * 100.0).round() as u8
    }

    /// Current volume value.
    pub fn current(&self) -> f32 {
        self.value
    }

    /// Current percent encoding, as it would be persisted.
    pub fn percent(&self) -> u8 {
        Self::percent_of(self.value)
    }

    /// Position of the current value relative to the bounds.
    pub fn band(&self) -> VolumeBand {
        if self.value >= MAX_VOLUME {
            VolumeBand::AtMax
        } else if self.value <= MIN_VOLUME {
            VolumeBand::AtMin
        } else {
            VolumeBand::Mid
        }
    }
}
