/*
 * This file is a part of Ordix
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! Two concrete locker strategies sit behind every container in this crate:
//! [`FastFailLock`], a single-owner lock that reports reentrancy instead of
//! blocking for it, and [`StampedRwLock`], a multi-reader/single-writer lock
//! that additionally exposes a monotonic structure stamp so callers can cache
//! a traversal result and cheaply ask "is this still current?" without
//! retaking the lock.

use {
    crate::engine::{mem::CachePadded, sync::Backoff},
    core::{
        ops::{Deref, DerefMut},
        sync::atomic::{AtomicU64, Ordering},
    },
    parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    std::sync::{Mutex, MutexGuard},
};

/// Shared contract for the two acquisition strategies a container may be
/// configured with. `cause` is a short, static description of the calling
/// operation (`"insert"`, `"repair"`, ...), carried through purely for
/// diagnostics -- loggers and panics may print it, nothing else inspects it.
pub trait Locker<T> {
    fn lock_read(&self, cause: &'static str) -> ReadAcquisition<'_, T>;
    fn try_lock_read(&self, cause: &'static str) -> Option<ReadAcquisition<'_, T>>;
    fn lock_write(&self, cause: &'static str) -> WriteAcquisition<'_, T>;
    fn try_lock_write(&self, cause: &'static str) -> Option<WriteAcquisition<'_, T>>;
    /// The structure stamp as of this call. Only [`StampedRwLock`] bumps it;
    /// [`FastFailLock`] reports a constant 0, since a single-owner lock has
    /// no concurrent readers to validate against.
    fn stamp(&self) -> u64;
    /// True if `stamp` is still the current one.
    fn check(&self, stamp: u64) -> bool {
        self.stamp() == stamp
    }
    /// Called by structural mutations (never by in-place value updates) once
    /// the mutation has completed, while the write guard is still held.
    fn bump_stamp(&self);
    /// Runs `f` against a succession of non-blocking read acquisitions,
    /// backing off between attempts, before finally falling back to a
    /// blocking read. `f` returns `None` to signal "try again" (e.g. a
    /// writer held the lock this attempt); this is the "optimistic read,
    /// retried on stamp mismatch" idiom, adapted to a coarse whole-tree
    /// lock: there is no per-node stamped fast path to race a writer on, so
    /// the retry loop's job is purely to avoid parking a reader behind a
    /// transient writer rather than to avoid locking altogether. Used by
    /// every read that doesn't need exclusivity: index lookups,
    /// get-by-index, terminal seeks, node ordering, spliterator bounds
    /// estimation.
    fn do_optimistically<R>(&self, cause: &'static str, mut f: impl FnMut(&T) -> Option<R>) -> R {
        let backoff = Backoff::new();
        for _ in 0..4 {
            if let Some(guard) = self.try_lock_read(cause) {
                if let Some(r) = f(&guard) {
                    return r;
                }
            }
            backoff.snooze();
        }
        let guard = self.lock_read(cause);
        f(&guard).expect("do_optimistically: retry under a held read lock must succeed")
    }
}

pub enum ReadAcquisition<'a, T> {
    Stamped(RwLockReadGuard<'a, T>),
    FastFail(MutexGuard<'a, T>),
}

impl<'a, T> Deref for ReadAcquisition<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        match self {
            Self::Stamped(g) => g,
            Self::FastFail(g) => g,
        }
    }
}

pub enum WriteAcquisition<'a, T> {
    Stamped(RwLockWriteGuard<'a, T>),
    FastFail(MutexGuard<'a, T>),
}

impl<'a, T> Deref for WriteAcquisition<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        match self {
            Self::Stamped(g) => g,
            Self::FastFail(g) => g,
        }
    }
}

impl<'a, T> DerefMut for WriteAcquisition<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        match self {
            Self::Stamped(g) => g,
            Self::FastFail(g) => g,
        }
    }
}

/// Single-owner strategy: no sharing is ever expected, so a second
/// concurrent acquisition -- read or write, this strategy draws no
/// distinction between them -- is treated as a caller bug and reported
/// rather than blocked on ("no sharing; any mutation during a read
/// throws"). Built on [`std::sync::Mutex`]'s non-blocking `try_lock` rather
/// than a `RefCell`,
/// so the type stays `Send + Sync` like its `StampedRwLock` counterpart --
/// a container configured with `safe: false` is still just a container,
/// shareable across an `Arc`, even though this strategy is only meant to
/// ever have one accessor at a time in practice.
pub struct FastFailLock<T> {
    inner: Mutex<T>,
}

impl<T> FastFailLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }
    pub fn into_inner(self) -> T {
        self.inner
            .into_inner()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl<T> Locker<T> for FastFailLock<T> {
    fn lock_read(&self, cause: &'static str) -> ReadAcquisition<'_, T> {
        self.try_lock_read(cause)
            .unwrap_or_else(|| panic!("fast-fail lock: concurrent access during `{cause}`"))
    }
    fn try_lock_read(&self, _cause: &'static str) -> Option<ReadAcquisition<'_, T>> {
        self.inner.try_lock().ok().map(ReadAcquisition::FastFail)
    }
    fn lock_write(&self, cause: &'static str) -> WriteAcquisition<'_, T> {
        self.try_lock_write(cause)
            .unwrap_or_else(|| panic!("fast-fail lock: concurrent access during `{cause}`"))
    }
    fn try_lock_write(&self, _cause: &'static str) -> Option<WriteAcquisition<'_, T>> {
        self.inner.try_lock().ok().map(WriteAcquisition::FastFail)
    }
    fn stamp(&self) -> u64 {
        0
    }
    fn check(&self, _stamp: u64) -> bool {
        true
    }
    fn bump_stamp(&self) {}
}

/// Multi-reader/single-writer strategy modeled on Java's `StampedLock`:
/// structural mutations bump a monotonic counter kept on its own cache
/// line, separate from the `RwLock` guarding the data, so a caller holding
/// no lock at all can still cheaply ask "has anything structural happened
/// since I last looked" before deciding whether to pay for a fresh
/// traversal.
pub struct StampedRwLock<T> {
    data: RwLock<T>,
    stamp: CachePadded<AtomicU64>,
}

impl<T> StampedRwLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            data: RwLock::new(value),
            stamp: CachePadded::new(AtomicU64::new(0)),
        }
    }
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T> Locker<T> for StampedRwLock<T> {
    fn lock_read(&self, _cause: &'static str) -> ReadAcquisition<'_, T> {
        ReadAcquisition::Stamped(self.data.read())
    }
    fn try_lock_read(&self, _cause: &'static str) -> Option<ReadAcquisition<'_, T>> {
        self.data.try_read().map(ReadAcquisition::Stamped)
    }
    fn lock_write(&self, _cause: &'static str) -> WriteAcquisition<'_, T> {
        WriteAcquisition::Stamped(self.data.write())
    }
    fn try_lock_write(&self, _cause: &'static str) -> Option<WriteAcquisition<'_, T>> {
        self.data.try_write().map(WriteAcquisition::Stamped)
    }
    fn stamp(&self) -> u64 {
        self.stamp.load(Ordering::Acquire)
    }
    fn bump_stamp(&self) {
        self.stamp.fetch_add(1, Ordering::AcqRel);
    }
}

/// Runtime choice between the two locker strategies, selected by a
/// container's `safe` configuration option rather than fixed at compile
/// time -- every container in this crate stores its tree behind one of
/// these instead of being generic over `Locker`, since the strategy is a
/// per-instance construction option (§6 `safe`/`thread-constraint`), not a
/// per-type one.
pub enum AnyLock<T> {
    Stamped(StampedRwLock<T>),
    FastFail(FastFailLock<T>),
}

impl<T> AnyLock<T> {
    pub fn new(value: T, safe: bool) -> Self {
        if safe {
            Self::Stamped(StampedRwLock::new(value))
        } else {
            Self::FastFail(FastFailLock::new(value))
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Stamped(l) => l.into_inner(),
            Self::FastFail(l) => l.into_inner(),
        }
    }
}

impl<T> Locker<T> for AnyLock<T> {
    fn lock_read(&self, cause: &'static str) -> ReadAcquisition<'_, T> {
        match self {
            Self::Stamped(l) => l.lock_read(cause),
            Self::FastFail(l) => l.lock_read(cause),
        }
    }
    fn try_lock_read(&self, cause: &'static str) -> Option<ReadAcquisition<'_, T>> {
        match self {
            Self::Stamped(l) => l.try_lock_read(cause),
            Self::FastFail(l) => l.try_lock_read(cause),
        }
    }
    fn lock_write(&self, cause: &'static str) -> WriteAcquisition<'_, T> {
        match self {
            Self::Stamped(l) => l.lock_write(cause),
            Self::FastFail(l) => l.lock_write(cause),
        }
    }
    fn try_lock_write(&self, cause: &'static str) -> Option<WriteAcquisition<'_, T>> {
        match self {
            Self::Stamped(l) => l.try_lock_write(cause),
            Self::FastFail(l) => l.try_lock_write(cause),
        }
    }
    fn stamp(&self) -> u64 {
        match self {
            Self::Stamped(l) => l.stamp(),
            Self::FastFail(l) => l.stamp(),
        }
    }
    fn bump_stamp(&self) {
        match self {
            Self::Stamped(l) => l.bump_stamp(),
            Self::FastFail(l) => l.bump_stamp(),
        }
    }
}
