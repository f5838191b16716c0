//! Single-slot busy lock guarding a display's frame buffer and bus.
//!
//! [`RawLock`] is the try / spin / release contract. Two backends implement
//! it:
//!
//! - [`AtomicLock`] uses one atomic swap and is available on targets with
//!   8-bit atomic read-modify-write.
//! - [`CriticalSectionLock`] masks interrupts around a plain flag through
//!   the [`critical_section`] crate, for cores such as Cortex-M0 that lack
//!   atomic swap.
//!
//! [`DefaultLock`] picks the atomic backend when the target has it.
//!
//! # Deadlock
//!
//! [`RawLock::acquire_blocking`] spins without yielding. If the holder can
//! only make progress once the spinner returns (an interrupt handler
//! spinning on a lock held by the code it interrupted, or a task spinning
//! on a lock held across an `.await` on the same executor), the system
//! livelocks. There is no timeout; build one on top of
//! [`RawLock::try_acquire`] if you need a bounded wait.
//!
//! Async code that may contend with another task on the same executor
//! should use [`LockScope::acquire_async`], which yields between attempts
//! so the holder gets polled and can finish.

use core::cell::Cell;
#[cfg(target_has_atomic = "8")]
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_futures::yield_now;

/// Try / spin / release mutual-exclusion flag.
///
/// # Safety
///
/// Implementors must guarantee that, between a successful
/// [`try_acquire`](Self::try_acquire) and the matching
/// [`release`](Self::release), every other `try_acquire` returns `false`.
/// [`Oled`](crate::Oled) hands out `&mut` access to its frame buffer on the
/// strength of that guarantee.
pub unsafe trait RawLock {
    /// An unlocked lock, usable in `static` and `const` initialisers.
    const INIT: Self;

    /// Atomically test-and-set the flag.
    ///
    /// Returns `true` if the caller now holds the lock, `false` (leaving the
    /// lock untouched) if someone else does.
    fn try_acquire(&self) -> bool;

    /// Spin on [`try_acquire`](Self::try_acquire) until it succeeds.
    fn acquire_blocking(&self) {
        while !self.try_acquire() {
            core::hint::spin_loop();
        }
    }

    /// Unlock unconditionally.
    ///
    /// Prefer [`LockScope`], which releases on drop.
    ///
    /// # Safety
    ///
    /// The caller must hold the lock, acquired through `try_acquire` or
    /// `acquire_blocking` and not handed to a [`LockScope`]. Releasing a
    /// lock someone else holds lets a second holder in while the first
    /// still believes it is exclusive. Not checked at runtime.
    unsafe fn release(&self);

    /// Read the flag. Only a snapshot; may be stale by the time it returns.
    fn is_locked(&self) -> bool;
}

// ── Atomic backend ───────────────────────────────────────────────────────

/// Lock backed by a single [`AtomicBool`] swap.
#[cfg(target_has_atomic = "8")]
pub struct AtomicLock {
    locked: AtomicBool,
}

#[cfg(target_has_atomic = "8")]
impl AtomicLock {
    /// Create an unlocked lock.
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }
}

#[cfg(target_has_atomic = "8")]
impl Default for AtomicLock {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: the swap is a single indivisible test-and-set.
#[cfg(target_has_atomic = "8")]
unsafe impl RawLock for AtomicLock {
    const INIT: Self = Self::new();

    fn try_acquire(&self) -> bool {
        !self.locked.swap(true, Ordering::Acquire)
    }

    unsafe fn release(&self) {
        self.locked.store(false, Ordering::Release);
    }

    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

// ── Critical-section backend ─────────────────────────────────────────────

/// Lock whose test-and-set runs with interrupts masked.
pub struct CriticalSectionLock {
    locked: critical_section::Mutex<Cell<bool>>,
}

impl CriticalSectionLock {
    /// Create an unlocked lock.
    pub const fn new() -> Self {
        Self {
            locked: critical_section::Mutex::new(Cell::new(false)),
        }
    }
}

impl Default for CriticalSectionLock {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: test and set both run inside one critical section.
unsafe impl RawLock for CriticalSectionLock {
    const INIT: Self = Self::new();

    fn try_acquire(&self) -> bool {
        critical_section::with(|cs| {
            let locked = self.locked.borrow(cs);
            if locked.get() {
                false
            } else {
                locked.set(true);
                true
            }
        })
    }

    unsafe fn release(&self) {
        critical_section::with(|cs| self.locked.borrow(cs).set(false));
    }

    fn is_locked(&self) -> bool {
        critical_section::with(|cs| self.locked.borrow(cs).get())
    }
}

/// Backend used when none is named explicitly.
#[cfg(target_has_atomic = "8")]
pub type DefaultLock = AtomicLock;

/// Backend used when none is named explicitly.
#[cfg(not(target_has_atomic = "8"))]
pub type DefaultLock = CriticalSectionLock;

// ── Scoped acquisition ───────────────────────────────────────────────────

/// Holds a [`RawLock`] and releases it when dropped.
///
/// Release happens on every exit from the enclosing scope: normal return,
/// early return, `?` propagation and unwinding.
///
/// ```
/// use mono_oled_rs::lock::{AtomicLock, LockScope, RawLock};
///
/// let lock = AtomicLock::new();
/// {
///     let _scope = LockScope::acquire(&lock);
///     assert!(!lock.try_acquire());
/// }
/// assert!(!lock.is_locked());
/// ```
#[must_use = "the lock is released as soon as the scope is dropped"]
pub struct LockScope<'a, L: RawLock> {
    lock: &'a L,
}

impl<'a, L: RawLock> LockScope<'a, L> {
    /// Spin until the lock is held. See the module docs on deadlock.
    pub fn acquire(lock: &'a L) -> Self {
        lock.acquire_blocking();
        Self { lock }
    }

    /// Retry until the lock is held, yielding to the executor after every
    /// failed attempt instead of spinning.
    pub async fn acquire_async(lock: &'a L) -> Self {
        loop {
            if let Some(scope) = Self::try_acquire(lock) {
                return scope;
            }
            yield_now().await;
        }
    }

    /// Take the lock if it is free, without waiting.
    pub fn try_acquire(lock: &'a L) -> Option<Self> {
        if lock.try_acquire() {
            Some(Self { lock })
        } else {
            None
        }
    }
}

impl<L: RawLock> Drop for LockScope<'_, L> {
    fn drop(&mut self) {
        // SAFETY: a scope only exists while its lock is held.
        unsafe { self.lock.release() };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn try_twice_then_release<L: RawLock>(lock: &L) {
        assert!(lock.try_acquire());
        assert!(!lock.try_acquire());
        assert!(lock.is_locked());
        unsafe { lock.release() };
        assert!(!lock.is_locked());
        assert!(lock.try_acquire());
        unsafe { lock.release() };
    }

    #[test]
    fn atomic_try_acquire_is_exclusive() {
        try_twice_then_release(&AtomicLock::new());
    }

    #[test]
    fn critical_section_try_acquire_is_exclusive() {
        try_twice_then_release(&CriticalSectionLock::new());
    }

    #[test]
    fn release_is_unconditional() {
        let lock = AtomicLock::new();
        unsafe { lock.release() };
        assert!(!lock.is_locked());
        assert!(lock.try_acquire());
        unsafe {
            lock.release();
            lock.release();
        }
        assert!(lock.try_acquire());
    }

    #[test]
    fn acquire_blocking_takes_free_lock() {
        let lock = CriticalSectionLock::INIT;
        lock.acquire_blocking();
        assert!(lock.is_locked());
        unsafe { lock.release() };
    }

    #[test]
    fn scope_releases_on_early_return() {
        fn bail(lock: &AtomicLock) -> Result<(), ()> {
            let _scope = LockScope::acquire(lock);
            Err::<(), ()>(())?;
            Ok(())
        }

        let lock = AtomicLock::new();
        assert!(bail(&lock).is_err());
        assert!(!lock.is_locked());
    }

    #[test]
    fn try_scope_fails_while_held() {
        let lock = CriticalSectionLock::new();
        let held = LockScope::try_acquire(&lock);
        assert!(held.is_some());
        assert!(LockScope::try_acquire(&lock).is_none());
        drop(held);
        assert!(LockScope::try_acquire(&lock).is_some());
    }

    #[test]
    fn async_waiter_yields_until_holder_releases() {
        use embassy_futures::{block_on, join::join, yield_now};

        let lock = AtomicLock::new();
        let order = core::cell::RefCell::new(Vec::new());

        block_on(join(
            async {
                let _scope = LockScope::acquire_async(&lock).await;
                order.borrow_mut().push("holder in");
                for _ in 0..5 {
                    yield_now().await;
                }
                order.borrow_mut().push("holder out");
            },
            async {
                let _scope = LockScope::acquire_async(&lock).await;
                order.borrow_mut().push("waiter in");
            },
        ));

        assert_eq!(*order.borrow(), ["holder in", "holder out", "waiter in"]);
        assert!(!lock.is_locked());
    }

    #[test]
    fn spinning_waiter_gets_lock_after_release() {
        use std::sync::atomic::AtomicU32;
        use std::thread;

        let lock = AtomicLock::new();
        let inside = AtomicU32::new(0);

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..1000 {
                        let _scope = LockScope::acquire(&lock);
                        // At most one thread may be between acquire and drop.
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert!(!lock.is_locked());
    }
}
