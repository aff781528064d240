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

use core::fmt;

/// Error kinds surfaced by structural mutation on a tree or any of the
/// container layers built on it. Optimistic reads never surface these --
/// a stamp mismatch triggers an internal retry under a read lock instead.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrdError {
    /// An index was out of `0..size` (or `0..=size` where an insertion point
    /// is meaningful).
    OutOfRange,
    /// A lookup by element id or key found nothing.
    NotFound,
    /// The element id names a node that has already been removed from its
    /// tree and whose removal-time stamp no longer matches the tree's
    /// current stamp.
    AlreadyRemoved,
    /// An element id names an arena slot that was never allocated, or whose
    /// generation no longer matches (the slot has been recycled for an
    /// unrelated element since this id was minted).
    IllegalElement,
    /// An `after`/`before` placement hint was inconsistent with the
    /// comparator-defined order (sorted containers) or contradicted itself
    /// (e.g. `after` sorts after `before`).
    IllegalPosition,
    /// `distinct` rejected an insertion because an equal element is
    /// already present.
    ElementExists,
    /// The operation is not meaningful for this container configuration
    /// (e.g. `index_for` on a non-distinct multi-map view).
    UnsupportedOperation,
    /// A spliterator observed that its own anchor node was removed from
    /// the tree by a structural mutation it did not itself perform.
    ConcurrentModification,
    /// An element id or split bound did not belong to the tree it was
    /// checked against.
    TreeMismatch,
    /// A cycle was detected while ascending parent links -- always a bug
    /// in tree maintenance, never a user-triggerable condition.
    CycleDetection,
}

impl fmt::Display for OrdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::OutOfRange => "index out of range",
            Self::NotFound => "no matching element",
            Self::AlreadyRemoved => "element has already been removed",
            Self::IllegalElement => "element does not belong to this container",
            Self::IllegalPosition => "placement hint contradicts the container's order",
            Self::ElementExists => "an equal element already exists in a distinct container",
            Self::UnsupportedOperation => "operation is not supported by this container",
            Self::ConcurrentModification => "container was structurally modified concurrently",
            Self::TreeMismatch => "element or bound belongs to a different tree",
            Self::CycleDetection => "cycle detected while traversing parent links",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for OrdError {}

pub type OrdResult<T> = Result<T, OrdError>;
