//! Single-flight guard for price refreshes.
//!
//! At most one refresh runs at a time; a second request is rejected with
//! [`ScannerError::RefreshInProgress`] rather than queued. The in-process flag
//! covers threads sharing one gate. A gate built with [`RefreshGate::with_lock`]
//! also claims a [`RefreshLock`] held in the price store, so refreshes started
//! by separate processes exclude each other too. Both are released when the
//! returned [`RefreshGuard`] drops, including on early return.

use crate::domain::error::ScannerError;
use crate::ports::refresh_lock::RefreshLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

const IDLE: &str = "Idle";
const UPDATING: &str = "Updating";

static NEXT_GATE: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshStatus {
    pub running: bool,
    pub message: String,
}

pub struct RefreshGate {
    running: AtomicBool,
    message: Mutex<String>,
    owner: String,
    lock: Option<Box<dyn RefreshLock>>,
}

impl Default for RefreshGate {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RefreshGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshGate")
            .field("running", &self.running.load(Ordering::Relaxed))
            .field("owner", &self.owner)
            .field("shared", &self.lock.is_some())
            .finish()
    }
}

impl RefreshGate {
    /// Gate local to this process.
    pub fn new() -> Self {
        let id = NEXT_GATE.fetch_add(1, Ordering::Relaxed);
        Self {
            running: AtomicBool::new(false),
            message: Mutex::new(IDLE.to_string()),
            owner: format!("{}-{id}", std::process::id()),
            lock: None,
        }
    }

    /// Gate that must also win `lock` before a refresh may start.
    pub fn with_lock(lock: Box<dyn RefreshLock>) -> Self {
        Self {
            lock: Some(lock),
            ..Self::new()
        }
    }

    pub fn try_begin(&self) -> Result<RefreshGuard<'_>, ScannerError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ScannerError::RefreshInProgress);
        }

        if let Some(lock) = &self.lock {
            match lock.try_acquire(&self.owner, UPDATING) {
                Ok(true) => {}
                Ok(false) => {
                    self.running.store(false, Ordering::Release);
                    tracing::warn!("refresh rejected: lock held elsewhere");
                    return Err(ScannerError::RefreshInProgress);
                }
                Err(e) => {
                    self.running.store(false, Ordering::Release);
                    return Err(e);
                }
            }
        }

        *self.message() = UPDATING.to_string();
        tracing::info!(owner = %self.owner, "refresh started");
        Ok(RefreshGuard { gate: self })
    }

    /// True while this gate, or any gate sharing its lock, holds a refresh.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) || self.shared_holder().is_some()
    }

    pub fn status(&self) -> RefreshStatus {
        if self.running.load(Ordering::Acquire) {
            return RefreshStatus {
                running: true,
                message: self.message().clone(),
            };
        }
        match self.shared_holder() {
            Some(message) => RefreshStatus {
                running: true,
                message,
            },
            None => RefreshStatus {
                running: false,
                message: self.message().clone(),
            },
        }
    }

    fn shared_holder(&self) -> Option<String> {
        let lock = self.lock.as_ref()?;
        lock.holder().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not read refresh lock");
            None
        })
    }

    fn message(&self) -> MutexGuard<'_, String> {
        self.message.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Held for the duration of one refresh.
#[derive(Debug)]
pub struct RefreshGuard<'a> {
    gate: &'a RefreshGate,
}

impl RefreshGuard<'_> {
    /// Replace the progress message shown by [`RefreshGate::status`].
    pub fn set_message(&self, message: impl Into<String>) {
        let message = message.into();
        if let Some(lock) = &self.gate.lock {
            if let Err(e) = lock.update(&self.gate.owner, &message) {
                tracing::warn!(error = %e, "could not update refresh lock");
            }
        }
        *self.gate.message() = message;
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if let Some(lock) = &self.gate.lock {
            if let Err(e) = lock.release(&self.gate.owner) {
                tracing::warn!(error = %e, "could not release refresh lock");
            }
        }
        *self.gate.message() = IDLE.to_string();
        self.gate.running.store(false, Ordering::Release);
        tracing::info!("refresh finished");
    }
}
