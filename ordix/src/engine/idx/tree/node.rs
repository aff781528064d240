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

use super::arena::NIL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Color {
    Red,
    Black,
}

/// A single size-augmented red-black node plus the doubly-linked adjacency
/// pointers layered over it for O(1) predecessor/successor access. `parent`/
/// `left`/`right`/`prev`/`next` are raw arena slot indices ([`NIL`] standing
/// in for "no such neighbor"); they are only ever followed while the caller
/// holds whatever lock guards the owning [`super::Tree`], so they don't need
/// a generation check the way [`super::arena::ElementId`] does.
pub(crate) struct Node<E> {
    pub value: E,
    pub color: Color,
    pub parent: u32,
    pub left: u32,
    pub right: u32,
    pub prev: u32,
    pub next: u32,
    /// Count of this node plus every node in its subtree. Rank (a live
    /// node's `nodes_before`) is derived from this on demand by ascending to
    /// the root -- see [`super::Tree::rank_of`] -- rather than cached on the
    /// node itself, since any cache would need interior mutability to be
    /// refreshable from a shared read and the ascend is already O(log n).
    /// A *removed* node's last rank, by contrast, genuinely must be cached
    /// (the node no longer has ancestors to ascend through): see
    /// [`super::arena::Resolved::Tombstone`].
    pub size: u32,
}

impl<E> Node<E> {
    pub(crate) fn new(value: E) -> Self {
        Self {
            value,
            color: Color::Red,
            parent: NIL,
            left: NIL,
            right: NIL,
            prev: NIL,
            next: NIL,
            size: 1,
        }
    }

    pub(crate) fn is_red(&self) -> bool {
        matches!(self.color, Color::Red)
    }
}
