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

#![deny(unreachable_patterns)]

pub mod error;
pub mod list;
pub mod map;
pub mod sortedlist;
pub mod spliter;
pub mod tree;

use tree::arena::ElementId;

/// A total order over `E`. Must behave consistently across the lifetime of any
/// single tree: `cmp(a, b)` and `cmp(b, a)` must stay antisymmetric for values
/// that remain unmutated, exactly as a [`std::cmp::Ord`] impl would, but is kept
/// as a free function so callers can reorder a sorted list by swapping comparators
/// (see [`crate::SortedList`]) without re-keying every element.
pub trait Comparator<E>: Fn(&E, &E) -> core::cmp::Ordering {}
impl<E, F: Fn(&E, &E) -> core::cmp::Ordering> Comparator<E> for F {}

/// A probe comparable against a stored element without constructing one --
/// used by key-based lookups (`SortedMap::get`) so the caller need not
/// materialize a full `E` just to search for it.
pub trait SearchComparable<E> {
    /// Returns `Less` if `self` sorts before `candidate`, `Greater` if after,
    /// `Equal` if this is the element being searched for.
    fn compare(&self, candidate: &E) -> core::cmp::Ordering;
}

/// Callback protocol driven by [`tree::Tree::repair`] whenever the tree must
/// reorder nodes to restore sortedness after a caller mutated a key in place.
/// Implementors translate node-level notifications into whatever identifier
/// space their layer (list, sorted list, map) exposes publicly.
pub trait RepairListener<E> {
    /// A node was pulled out of the tree to be reinserted elsewhere.
    fn removed(&mut self, id: ElementId);
    /// A removed node was reinserted at a new position.
    fn transferred(&mut self, id: ElementId, new_position: ElementId);
    /// A removed node was dropped instead of being reinserted, because
    /// reinsertion would have violated a `distinct` constraint.
    fn disposed(&mut self, value: E, near: ElementId);
}

/// Summary of a completed repair pass: whether any out-of-place element was
/// found, and how many were relocated versus disposed of (distinct-mode
/// rejection). `Tree::repair` never raises an error for a merely-unsorted
/// tree -- that is the condition it exists to fix -- it only reports what it
/// did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub relocated: usize,
    pub disposed: usize,
}

impl RepairReport {
    pub fn found_any(&self) -> bool {
        self.relocated > 0 || self.disposed > 0
    }
}
