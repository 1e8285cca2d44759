use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::blocking_mutex::raw::RawMutex;

/// Mutual-exclusion-guarded container for a value shared between execution
/// contexts (interrupt handlers, sampling tasks, the control loop).
///
/// The raw mutex kind `M` selects the locking discipline: use
/// `CriticalSectionRawMutex` when one of the writers runs in interrupt
/// context, `NoopRawMutex` when everything lives on a single executor.
///
/// This is the only synchronization primitive in the crate; no call path
/// ever holds more than one of these locks at a time.
pub struct SyncedValue<M: RawMutex, T> {
    inner: BlockingMutex<M, RefCell<T>>,
}

impl<M: RawMutex, T> SyncedValue<M, T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: BlockingMutex::new(RefCell::new(value)),
        }
    }

    /// Runs `f` with exclusive access to the stored value. The lock is
    /// released when `f` returns, on every exit path.
    pub fn with_write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Returns a copy of the stored value. The copy is taken under the lock,
    /// so it can never observe a half-finished write.
    pub fn read(&self) -> T
    where
        T: Clone,
    {
        self.inner.lock(|cell| cell.borrow().clone())
    }
}

impl<M: RawMutex, T: Default> Default for SyncedValue<M, T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
