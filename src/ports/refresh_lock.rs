//! Refresh lock port: a claim on the price store visible to every process using it.

use crate::domain::error::ScannerError;

pub trait RefreshLock: Send + Sync {
    /// Claim the lock for `owner`. `Ok(false)` when another owner holds it.
    fn try_acquire(&self, owner: &str, message: &str) -> Result<bool, ScannerError>;

    /// Replace the progress message, if `owner` still holds the lock.
    fn update(&self, owner: &str, message: &str) -> Result<(), ScannerError>;

    fn release(&self, owner: &str) -> Result<(), ScannerError>;

    /// Progress message of the current holder, `None` when unlocked.
    fn holder(&self) -> Result<Option<String>, ScannerError>;
}
