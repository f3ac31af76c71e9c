//! Mutex flavour for channels shared between tasks.

#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;

#[cfg(target_os = "none")]
pub type TaskMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
pub type TaskMutex = NoopRawMutex;
