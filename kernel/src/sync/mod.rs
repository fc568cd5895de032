/*
 * Synchronisation Primitives
 *
 * `KillableMutex` is a spin lock whose acquisition can be abandoned when the
 * waiting task has a fatal signal pending (mutex_lock_killable). It is the
 * only blocking point in the driver.
 *
 * Cancellation is checked only while waiting: once the guard is returned the
 * holder runs to completion, and a task that gives up has acquired nothing.
 */

use core::sync::atomic::{AtomicBool, Ordering};

use spin::{Mutex, MutexGuard};

use crate::io::Errno;

/// Source of the "fatal signal pending" condition for the calling task
pub trait SignalSource {
    fn fatal_signal_pending(&self) -> bool;
}

/// Caller that can never be interrupted
pub struct NoSignals;

impl SignalSource for NoSignals {
    fn fatal_signal_pending(&self) -> bool {
        false
    }
}

/// Kill flag a task can be interrupted through
#[derive(Default)]
pub struct KillSignal {
    pending: AtomicBool,
}

impl KillSignal {
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
        }
    }

    /// Deliver the signal
    pub fn raise(&self) {
        self.pending.store(true, Ordering::SeqCst);
    }

    /// Consume the signal
    pub fn clear(&self) {
        self.pending.store(false, Ordering::SeqCst);
    }
}

impl SignalSource for KillSignal {
    fn fatal_signal_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }
}

/// Mutex with a killable acquisition path
pub struct KillableMutex<T> {
    inner: Mutex<T>,
}

impl<T> KillableMutex<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Acquire unconditionally
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock()
    }

    /// Acquire without waiting
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.inner.try_lock()
    }

    /// Acquire, giving up with EINTR once `signals` reports a fatal signal
    ///
    /// An uncontended lock is taken even if a signal is already pending.
    pub fn lock_killable(&self, signals: &dyn SignalSource) -> Result<MutexGuard<'_, T>, Errno> {
        loop {
            if let Some(guard) = self.try_lock() {
                return Ok(guard);
            }
            if signals.fatal_signal_pending() {
                return Err(Errno::EINTR);
            }
            core::hint::spin_loop();
        }
    }

    /// Whether some task currently holds the lock
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}
