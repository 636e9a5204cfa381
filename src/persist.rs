//! File-backed settings byte store.
//!
//! A fixed-size byte image persisted as a single file, standing in for
//! the settings EEPROM of the original hardware. Writes replace the whole
//! image atomically through a temporary file in the same directory, so a
//! power cut mid-write leaves either the old or the new image on disk,
//! never a torn one.

use crate::error::PersistError;
use crate::volume::VolumeStore;
use log::{debug, info};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Size of the settings image in bytes.
pub const IMAGE_LEN: usize = 16;

/// Value every byte holds before first use, matching erased EEPROM.
///
/// An erased volume byte reads as 255, which the volume manager treats
/// as corrupt and heals to the default on the first boot.
pub const ERASED: u8 = 0xFF;

/// Settings store persisted as a small fixed-size file.
pub struct FileByteStore {
    path: PathBuf,
    image: [u8; IMAGE_LEN],
}

impl FileByteStore {
    /// Open the store at `path`, creating an erased image if missing.
    ///
    /// A file of the wrong size is treated as unusable and replaced with
    /// an erased image.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistError> {
        let path = path.as_ref().to_path_buf();

        let image = match fs::read(&path) {
            Ok(bytes) if bytes.len() == IMAGE_LEN => {
                let mut image = [0u8; IMAGE_LEN];
                image.copy_from_slice(&bytes);
                debug!("settings image loaded from {}", path.display());
                image
            }
            Ok(bytes) => {
                info!(
                    "settings image at {} has {} bytes instead of {}, reinitializing",
                    path.display(),
                    bytes.len(),
                    IMAGE_LEN
                );
                let image = [ERASED; IMAGE_LEN];
                write_image(&path, &image)?;
                image
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!("creating settings image at {}", path.display());
                let image = [ERASED; IMAGE_LEN];
                write_image(&path, &image)?;
                image
            }
            Err(err) => return Err(PersistError::Io(err)),
        };

        Ok(FileByteStore { path, image })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VolumeStore for FileByteStore {
    fn read_byte(&mut self, addr: usize) -> Result<u8, PersistError> {
        if addr >= IMAGE_LEN {
            return Err(PersistError::AddressOutOfRange { addr });
        }
        Ok(self.image[addr])
    }

    fn write_byte(&mut self, addr: usize, value: u8) -> Result<(), PersistError> {
        if addr >= IMAGE_LEN {
            return Err(PersistError::AddressOutOfRange { addr });
        }
        // Flush the updated image before adopting it, so the in-memory
        // view never runs ahead of the file.
        let mut updated = self.image;
        updated[addr] = value;
        write_image(&self.path, &updated)?;
        self.image = updated;
        Ok(())
    }
}

/// Atomically replace the image file via a sibling temporary file.
fn write_image(path: &Path, image: &[u8; IMAGE_LEN]) -> Result<(), PersistError> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = match dir {
        Some(dir) => NamedTempFile::new_in(dir)?,
        None => NamedTempFile::new_in(".")?,
    };
    tmp.write_all(image)?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
