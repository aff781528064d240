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

//! A traversal cursor that stays valid across concurrent structural changes
//! to the list it walks, and can be split in two for parallel consumption.
//! Bounded by an optional left-inclusive/right-exclusive pair of element ids;
//! an unbounded spliterator covers the whole list.

use {
    super::{
        error::{OrdError, OrdResult},
        tree::{arena::ElementId, Tree},
    },
    crate::engine::sync::lock::{AnyLock, Locker},
};

pub struct Spliterator<'a, E> {
    lock: &'a AnyLock<Tree<E>>,
    /// Last element yielded in either direction; `None` until the first
    /// `next`/`next_back` call.
    cursor: Option<ElementId>,
    left_bound: Option<ElementId>,
    right_bound: Option<ElementId>,
}

impl<'a, E> Spliterator<'a, E> {
    pub(crate) fn new(
        lock: &'a AnyLock<Tree<E>>,
        left_bound: Option<ElementId>,
        right_bound: Option<ElementId>,
    ) -> Self {
        Self {
            lock,
            cursor: None,
            left_bound,
            right_bound,
        }
    }

    /// Advances and returns the next element in forward order, or `None` at
    /// the right bound. Fails with [`OrdError::ConcurrentModification`] if
    /// this spliterator's own cursor was removed by a mutation it did not
    /// itself perform.
    pub fn next(&mut self) -> OrdResult<Option<E>>
    where
        E: Clone,
    {
        let guard = self.lock.lock_read("spliterator_next");
        let candidate = match self.cursor {
            None => match self.left_bound {
                Some(lb) => Some(lb),
                None => guard.terminal(true),
            },
            Some(c) => match guard.adjacent(c, true) {
                Ok(n) => n,
                Err(OrdError::AlreadyRemoved) => {
                    log::warn!("spliterator: cursor element removed concurrently, aborting walk");
                    return Err(OrdError::ConcurrentModification);
                }
                Err(e) => return Err(e),
            },
        };
        let candidate = match candidate {
            Some(c) => c,
            None => return Ok(None),
        };
        if Some(candidate) == self.right_bound {
            return Ok(None);
        }
        let value = guard.value(candidate)?.clone();
        self.cursor = Some(candidate);
        Ok(Some(value))
    }

    /// Advances and returns the next element in reverse order, or `None` at
    /// the left bound.
    pub fn next_back(&mut self) -> OrdResult<Option<E>>
    where
        E: Clone,
    {
        let guard = self.lock.lock_read("spliterator_next_back");
        let candidate = match self.cursor {
            None => match self.right_bound {
                Some(rb) => guard.adjacent(rb, false)?,
                None => guard.terminal(false),
            },
            Some(c) => match guard.adjacent(c, false) {
                Ok(p) => p,
                Err(OrdError::AlreadyRemoved) => {
                    log::warn!("spliterator: cursor element removed concurrently, aborting walk");
                    return Err(OrdError::ConcurrentModification);
                }
                Err(e) => return Err(e),
            },
        };
        let candidate = match candidate {
            Some(c) => c,
            None => return Ok(None),
        };
        if let Some(lb) = self.left_bound {
            if matches!(guard.compare(candidate, lb), Ok(core::cmp::Ordering::Less)) {
                return Ok(None);
            }
        }
        let value = guard.value(candidate)?.clone();
        self.cursor = Some(candidate);
        Ok(Some(value))
    }

    /// Estimates the remaining element count between the current cursor and
    /// the right bound. Goes through [`Locker::do_optimistically`] per
    /// §4.3's "size estimate ... retried on stamp mismatch" -- both bounds
    /// are resolved from the same acquisition so a writer can never be
    /// observed mid-mutation between reading one bound and the other.
    pub fn estimate_size(&self) -> usize {
        self.lock.do_optimistically("spliterator_estimate_size", |tree| {
            let left = match self.cursor {
                // already yielded: everything up to and including it is consumed.
                Some(id) => tree.nodes_before(id).map(|n| n + 1).unwrap_or(0),
                // not yet started: `left_bound` itself is unconsumed.
                None => self
                    .left_bound
                    .map(|id| tree.nodes_before(id).unwrap_or(0))
                    .unwrap_or(0),
            };
            let right = self
                .right_bound
                .map(|id| tree.nodes_before(id).unwrap_or_else(|_| tree.len()))
                .unwrap_or_else(|| tree.len());
            Some(right.saturating_sub(left))
        })
    }

    /// Splits off the far half of the remaining range as a sibling
    /// spliterator, shrinking `self` to the near half. Returns `None` when
    /// the remaining range is too small to split (no element strictly
    /// between its current bounds).
    pub fn try_split(&mut self) -> OrdResult<Option<Spliterator<'a, E>>> {
        let guard = self.lock.lock_read("spliterator_try_split");
        let left = match self.cursor.or(self.left_bound) {
            Some(id) => id,
            None => match guard.terminal(true) {
                Some(id) => id,
                None => return Ok(None),
            },
        };
        let right = match self.right_bound {
            Some(id) => id,
            None => match guard.terminal(false) {
                Some(id) => id,
                None => return Ok(None),
            },
        };
        let mid = match guard.split_between(left, right)? {
            Some(m) => m,
            None => return Ok(None),
        };
        drop(guard);

        let far = Spliterator {
            lock: self.lock,
            cursor: None,
            left_bound: Some(mid),
            right_bound: self.right_bound,
        };
        self.right_bound = Some(mid);
        Ok(Some(far))
    }
}
