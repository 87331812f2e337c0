//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements the byte-addressable [`StoragePort`] on top of a single NVS
//! blob.  The whole image lives in RAM: reads and writes touch only the
//! image, and [`StoragePort::commit`] writes it back as one blob.  A blank
//! partition reads as erased (`0xFF`) cells, like a fresh EEPROM.
//!
//! On the host the image is never persisted; the simulation backend only
//! counts commits.

use log::{debug, info, warn};

use crate::app::ports::StoragePort;
use crate::error::StorageError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Emulated storage size in bytes.
pub const EEPROM_SIZE: usize = 512;

const ERASED: u8 = 0xFF;

#[cfg(target_os = "espidf")]
const NAMESPACE: &[u8] = b"kombi\0";
#[cfg(target_os = "espidf")]
const IMAGE_KEY: &[u8] = b"eeprom\0";

pub struct NvsEeprom {
    image: [u8; EEPROM_SIZE],
    dirty: bool,
    commits: u32,
}

impl NvsEeprom {
    /// Initialise NVS flash and load the stored image.
    ///
    /// On first boot or after a version mismatch the partition is erased
    /// and re-initialised automatically.
    pub fn new() -> Result<Self, StorageError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                let ret = unsafe { nvs_flash_erase() };
                if ret != ESP_OK {
                    return Err(StorageError::FlashInit(ret));
                }
                let ret = unsafe { nvs_flash_init() };
                if ret != ESP_OK {
                    return Err(StorageError::FlashInit(ret));
                }
            } else if ret != ESP_OK {
                return Err(StorageError::FlashInit(ret));
            }
            let mut eeprom = Self::erased();
            eeprom.fetch()?;
            info!("NvsEeprom: ESP-IDF NVS initialised");
            Ok(eeprom)
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("NvsEeprom: simulation backend");
            Ok(Self::erased())
        }
    }

    /// A blank image with no backing store attached yet.
    pub fn erased() -> Self {
        Self {
            image: [ERASED; EEPROM_SIZE],
            dirty: false,
            commits: 0,
        }
    }

    /// Number of commits that actually wrote something.
    pub fn commit_count(&self) -> u32 {
        self.commits
    }

    /// Open the namespace, run `f` with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_handle<T>(
        write: bool,
        f: impl FnOnce(nvs_handle_t) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let mut handle: nvs_handle_t = 0;
        // SAFETY: NAMESPACE is NUL-terminated; handle is a valid out-pointer.
        let ret = unsafe { nvs_open(NAMESPACE.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(StorageError::Open(ret));
        }
        let result = f(handle);
        // SAFETY: handle was opened above and is closed exactly once.
        unsafe { nvs_close(handle) };
        result
    }

    #[cfg(target_os = "espidf")]
    fn fetch(&mut self) -> Result<(), StorageError> {
        let image = &mut self.image;
        let result = Self::with_handle(false, |handle| {
            let mut len = image.len();
            // SAFETY: image is EEPROM_SIZE bytes and len says so.
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    IMAGE_KEY.as_ptr() as *const _,
                    image.as_mut_ptr() as *mut _,
                    &mut len,
                )
            };
            if ret == ESP_OK {
                Ok(len)
            } else if ret == ESP_ERR_NVS_NOT_FOUND {
                Ok(0)
            } else {
                Err(StorageError::Read(ret))
            }
        });
        match result {
            Ok(len) => {
                info!("NvsEeprom: loaded {} byte image", len);
                Ok(())
            }
            Err(StorageError::Open(rc)) if rc == ESP_ERR_NVS_NOT_FOUND => {
                info!("NvsEeprom: no stored image, starting erased");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    #[cfg(target_os = "espidf")]
    fn persist(&self) -> Result<(), StorageError> {
        Self::with_handle(true, |handle| {
            // SAFETY: image is a valid EEPROM_SIZE-byte buffer.
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    IMAGE_KEY.as_ptr() as *const _,
                    self.image.as_ptr() as *const _,
                    self.image.len(),
                )
            };
            if ret != ESP_OK {
                return Err(StorageError::Write(ret));
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(StorageError::Write(ret));
            }
            Ok(())
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn persist(&self) -> Result<(), StorageError> {
        debug!("NvsEeprom: image committed (simulation)");
        Ok(())
    }
}

impl StoragePort for NvsEeprom {
    fn read_byte(&mut self, address: u16) -> u8 {
        self.image.get(usize::from(address)).copied().unwrap_or(ERASED)
    }

    fn write_byte(&mut self, address: u16, byte: u8) {
        if let Some(cell) = self.image.get_mut(usize::from(address)) {
            if *cell != byte {
                *cell = byte;
                self.dirty = true;
            }
        }
    }

    fn commit(&mut self) {
        if !self.dirty {
            debug!("NvsEeprom: commit skipped, image unchanged");
            return;
        }
        // The storage port has no error channel; a failed write stays
        // dirty and is retried on the next save.
        match self.persist() {
            Ok(()) => {
                self.dirty = false;
                self.commits += 1;
            }
            Err(e) => warn!("NvsEeprom: {}", e),
        }
    }
}
