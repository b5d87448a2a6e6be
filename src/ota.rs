//! Over-the-air firmware update, backed by the `esp-ota` crate.
//!
//! Flow: `begin(total)` → N × `write_chunk` → `finalize` → reboot.
//!
//! The manager only tracks the session and reports progress; the HTTP
//! endpoint in [`crate::adapters::ota_server`] feeds it the request body.
//! Progress is exposed as an [`OtaStatus`] so the display can show
//! "Updating NN%" while the transfer runs. None of this touches the
//! control core: a failed update leaves the oven running the old image.
//!
//! The HTTP task owns the manager behind a mutex and may hold it through a
//! multi-second partition erase. The control loop never takes that lock;
//! it reads the [`OtaMonitor`] the manager publishes to after every state
//! change.

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use log::{info, warn};

const MAX_FIRMWARE_SIZE: u32 = 4 * 1024 * 1024; // 4 MB

// ── Error type ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaError {
    AlreadyInProgress,
    InvalidSize,
    BeginFailed,
    WriteFailed,
    VerifyFailed,
    BootSetFailed,
    IncompleteTransfer,
    NotReceiving,
    Overflow,
}

impl fmt::Display for OtaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInProgress => write!(f, "OTA session already in progress"),
            Self::InvalidSize => write!(f, "firmware size out of range (max 4 MB)"),
            Self::BeginFailed => write!(f, "OTA begin failed"),
            Self::WriteFailed => write!(f, "OTA write failed"),
            Self::VerifyFailed => write!(f, "OTA verification failed"),
            Self::BootSetFailed => write!(f, "set boot partition failed"),
            Self::IncompleteTransfer => write!(f, "finalize called before all bytes written"),
            Self::NotReceiving => write!(f, "no OTA session is receiving"),
            Self::Overflow => write!(f, "chunk would exceed declared firmware size"),
        }
    }
}

impl From<OtaError> for crate::error::Error {
    fn from(_: OtaError) -> Self {
        crate::error::CommsError::OtaFailed.into()
    }
}

// ── Status ────────────────────────────────────────────────────

/// What the display needs to know about an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OtaStatus {
    pub in_progress: bool,
    /// Percent complete, 0–100.
    pub progress: u8,
}

/// Integer percentage of `total` covered by `done`.
///
/// Computed as `done / (total / 100)` so it never needs a wide multiply;
/// images smaller than 100 bytes fall back to the exact ratio.
pub fn percent(done: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = if total < 100 {
        u64::from(done) * 100 / u64::from(total)
    } else {
        u64::from(done / (total / 100))
    };
    pct.min(100) as u8
}

// ── Lock-free view ────────────────────────────────────────────

/// Progress and reboot readiness, readable without touching the manager.
#[derive(Debug, Default)]
pub struct OtaMonitor {
    in_progress: AtomicBool,
    progress: AtomicU8,
    ready: AtomicBool,
}

impl OtaMonitor {
    pub fn status(&self) -> OtaStatus {
        OtaStatus {
            in_progress: self.in_progress.load(Ordering::Acquire),
            progress: self.progress.load(Ordering::Relaxed),
        }
    }

    /// A verified image is marked bootable and waiting for the restart.
    pub fn ready_to_reboot(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn publish(&self, state: OtaState) {
        let (in_progress, progress) = match state {
            OtaState::Receiving {
                expected_size,
                bytes_written,
            } => (true, percent(bytes_written, expected_size)),
            _ => (false, 0),
        };
        self.progress.store(progress, Ordering::Relaxed);
        self.in_progress.store(in_progress, Ordering::Release);
        self.ready
            .store(state == OtaState::ReadyToReboot, Ordering::Release);
    }
}

// ── State machine ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaState {
    Idle,
    Receiving { expected_size: u32, bytes_written: u32 },
    ReadyToReboot,
    Failed,
}

/// OTA firmware update manager.
///
/// On ESP-IDF targets the image goes straight to the inactive partition
/// through `esp-ota`. On host targets only the bookkeeping runs.
pub struct OtaManager {
    state: OtaState,
    monitor: Arc<OtaMonitor>,
    #[cfg(target_os = "espidf")]
    ota_update: Option<esp_ota::OtaUpdate>,
}

impl OtaManager {
    pub fn new() -> Self {
        Self {
            state: OtaState::Idle,
            monitor: Arc::new(OtaMonitor::default()),
            #[cfg(target_os = "espidf")]
            ota_update: None,
        }
    }

    pub fn state(&self) -> OtaState {
        self.state
    }

    /// Handle for readers that must not block on the manager.
    pub fn monitor(&self) -> Arc<OtaMonitor> {
        Arc::clone(&self.monitor)
    }

    fn set_state(&mut self, state: OtaState) {
        self.state = state;
        self.monitor.publish(state);
    }

    pub fn status(&self) -> OtaStatus {
        match self.state {
            OtaState::Receiving {
                expected_size,
                bytes_written,
            } => OtaStatus {
                in_progress: true,
                progress: percent(bytes_written, expected_size),
            },
            _ => OtaStatus::default(),
        }
    }

    /// Begin an OTA session and open the inactive partition.
    pub fn begin(&mut self, firmware_size: u32) -> Result<(), OtaError> {
        if matches!(self.state, OtaState::Receiving { .. }) {
            return Err(OtaError::AlreadyInProgress);
        }
        if firmware_size == 0 || firmware_size > MAX_FIRMWARE_SIZE {
            return Err(OtaError::InvalidSize);
        }

        #[cfg(target_os = "espidf")]
        {
            let update = esp_ota::OtaUpdate::begin().map_err(|e| {
                warn!(target: "Core", "esp-ota begin failed: {:?}", e);
                OtaError::BeginFailed
            })?;
            self.ota_update = Some(update);
        }

        self.set_state(OtaState::Receiving {
            expected_size: firmware_size,
            bytes_written: 0,
        });
        info!(target: "Core", "OTA Start ({} bytes)", firmware_size);
        Ok(())
    }

    /// Append the next chunk. Returns total bytes written.
    pub fn write_chunk(&mut self, data: &[u8]) -> Result<u32, OtaError> {
        let OtaState::Receiving {
            expected_size,
            bytes_written,
        } = self.state
        else {
            return Err(OtaError::NotReceiving);
        };

        let len = u32::try_from(data.len()).map_err(|_| OtaError::Overflow)?;
        let new_written = bytes_written.checked_add(len).ok_or(OtaError::Overflow)?;
        if new_written > expected_size {
            self.fail();
            return Err(OtaError::Overflow);
        }

        #[cfg(target_os = "espidf")]
        {
            let Some(update) = self.ota_update.as_mut() else {
                return Err(OtaError::NotReceiving);
            };
            if let Err(e) = update.write(data) {
                warn!(target: "Core", "esp-ota write failed: {:?}", e);
                self.fail();
                return Err(OtaError::WriteFailed);
            }
        }

        let before = percent(bytes_written, expected_size);
        let after = percent(new_written, expected_size);
        if after / 10 != before / 10 {
            info!(target: "Core", "OTA Progress: {}%", after);
        }

        self.set_state(OtaState::Receiving {
            expected_size,
            bytes_written: new_written,
        });
        Ok(new_written)
    }

    /// Verify the image and mark its partition bootable.
    pub fn finalize(&mut self) -> Result<(), OtaError> {
        match self.state {
            OtaState::Receiving {
                expected_size,
                bytes_written,
            } if bytes_written == expected_size => {}
            OtaState::Receiving { .. } => {
                self.fail();
                return Err(OtaError::IncompleteTransfer);
            }
            _ => return Err(OtaError::NotReceiving),
        }

        #[cfg(target_os = "espidf")]
        {
            let Some(update) = self.ota_update.take() else {
                self.set_state(OtaState::Failed);
                return Err(OtaError::NotReceiving);
            };
            let mut completed = update.finalize().map_err(|e| {
                warn!(target: "Core", "esp-ota finalize failed: {:?}", e);
                self.set_state(OtaState::Failed);
                OtaError::VerifyFailed
            })?;
            completed.set_as_boot_partition().map_err(|e| {
                warn!(target: "Core", "esp-ota set_as_boot_partition failed: {:?}", e);
                self.set_state(OtaState::Failed);
                OtaError::BootSetFailed
            })?;
        }

        self.set_state(OtaState::ReadyToReboot);
        info!(target: "Core", "OTA End");
        Ok(())
    }

    /// Abort the current session; back to Idle.
    pub fn abort(&mut self) {
        #[cfg(target_os = "espidf")]
        {
            // Dropping the handle aborts the partition write.
            self.ota_update.take();
        }
        self.set_state(OtaState::Idle);
        warn!(target: "Core", "OTA: aborted");
    }

    fn fail(&mut self) {
        #[cfg(target_os = "espidf")]
        {
            self.ota_update.take();
        }
        self.set_state(OtaState::Failed);
    }
}

impl Default for OtaManager {
    fn default() -> Self {
        Self::new()
    }
}

/// The manager as shared with the HTTP handler.
pub type SharedOta = Arc<Mutex<OtaManager>>;

/// Soft-reset into the newly flashed firmware.
#[cfg(target_os = "espidf")]
pub fn restart() -> ! {
    info!(target: "Core", "OTA: rebooting into new firmware");
    esp_ota::restart();
}

// ── Boot validation ───────────────────────────────────────────

/// Mark the running image valid so the bootloader does not roll back.
#[cfg(target_os = "espidf")]
pub fn check_rollback() {
    match esp_ota::mark_app_valid() {
        Ok(()) => info!(target: "Core", "OTA: firmware marked valid (rollback cancelled)"),
        Err(e) => warn!(target: "Core", "OTA: mark_app_valid failed: {:?}", e),
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn check_rollback() {
    info!(target: "Core", "OTA rollback check (simulation): skipped");
}

// ── Tests ─────────────────────────────────────────────────────
