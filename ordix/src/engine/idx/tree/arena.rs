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

//! Generation-checked slot storage for tree nodes. Every structural pointer
//! inside [`super::node::Node`] (parent/left/right/prev/next) is a raw `u32`
//! slot index -- no generation check, since those are only ever followed
//! while holding whatever lock protects the tree, and a stale raw index
//! would mean tree corruption, not an external-handle-outlived-its-node
//! situation. [`ElementId`], by contrast, is the identifier handed to
//! callers, and does carry a generation: it must keep comparing and
//! (for a bounded window) answering queries correctly even after its node
//! has been unlinked from the tree.

use super::node::Node;

pub(crate) const NIL: u32 = u32::MAX;

/// Opaque handle to a single element. Two ids compare equal only if they
/// name the same node through the same lifetime of that slot -- a recycled
/// slot gets a new generation, so a stale id never silently aliases
/// whatever value now occupies its old index. `tree_id` additionally ties an
/// id to the particular tree that minted it, so passing a handle from one
/// container into another is rejected rather than silently aliasing
/// whatever node happens to occupy the same slot in the wrong arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
    pub(crate) tree_id: u64,
}

impl ElementId {
    pub(crate) fn new(index: u32, generation: u32, tree_id: u64) -> Self {
        Self {
            index,
            generation,
            tree_id,
        }
    }
}

pub(crate) enum Resolved<'a, E> {
    Live(&'a Node<E>),
    /// The node named by this id has been unlinked from the tree. `last_index`
    /// is the rank it held immediately before removal; `stamp_at_removal` is
    /// the tree's structure stamp at that moment. A caller's `nodes_before`/
    /// `nodes_after` query against a tombstone is only valid while the tree's
    /// current stamp still equals `stamp_at_removal`.
    Tombstone {
        last_index: u32,
        stamp_at_removal: u64,
    },
}

enum Slot<E> {
    Free {
        next_free: u32,
    },
    Occupied(Node<E>),
    Removed {
        last_index: u32,
        stamp_at_removal: u64,
    },
}

/// Owns every node ever inserted into a tree. Removed nodes are kept as
/// tombstones (see [`Resolved::Tombstone`]) until the *next* structural
/// mutation, at which point [`Arena::begin_mutation`] recycles them into the
/// free list. Because recycling only happens when a new mutation is already
/// about to bump the stamp, a tombstone is never evicted while its
/// `stamp_at_removal` could still match the tree's current stamp.
pub(crate) struct Arena<E> {
    slots: Vec<Slot<E>>,
    generations: Vec<u32>,
    free_head: u32,
    pending_removed: Vec<u32>,
    tree_id: u64,
}

impl<E> Arena<E> {
    pub(crate) fn new(tree_id: u64) -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free_head: NIL,
            pending_removed: Vec::new(),
            tree_id,
        }
    }

    pub(crate) fn with_capacity(cap: usize, tree_id: u64) -> Self {
        Self {
            slots: Vec::with_capacity(cap),
            generations: Vec::with_capacity(cap),
            free_head: NIL,
            pending_removed: Vec::new(),
            tree_id,
        }
    }

    /// True if `id` was minted by this arena's tree, independent of whether
    /// the slot it names is still live.
    pub(crate) fn owns(&self, id: ElementId) -> bool {
        id.tree_id == self.tree_id
    }

    /// Drains every pending tombstone into the free list, bumping its
    /// generation. Must be called at the start of every structural
    /// mutation, before that mutation does any work of its own -- by the
    /// time a new mutation begins, the stamp it's about to install can no
    /// longer equal any pending tombstone's `stamp_at_removal`, so nothing
    /// observable is lost by recycling them now.
    pub(crate) fn begin_mutation(&mut self) {
        for idx in self.pending_removed.drain(..) {
            self.generations[idx as usize] = self.generations[idx as usize].wrapping_add(1);
            self.slots[idx as usize] = Slot::Free {
                next_free: self.free_head,
            };
            self.free_head = idx;
        }
    }

    pub(crate) fn insert(&mut self, node: Node<E>) -> (u32, ElementId) {
        if self.free_head != NIL {
            let idx = self.free_head;
            match self.slots[idx as usize] {
                Slot::Free { next_free } => self.free_head = next_free,
                _ => unreachable!("free list points at a non-free slot"),
            }
            self.slots[idx as usize] = Slot::Occupied(node);
            let generation = self.generations[idx as usize];
            (idx, ElementId::new(idx, generation, self.tree_id))
        } else {
            let idx = self.slots.len() as u32;
            self.slots.push(Slot::Occupied(node));
            self.generations.push(0);
            (idx, ElementId::new(idx, 0, self.tree_id))
        }
    }

    pub(crate) fn node(&self, idx: u32) -> &Node<E> {
        match &self.slots[idx as usize] {
            Slot::Occupied(n) => n,
            _ => panic!("arena: raw index {idx} does not name a live node"),
        }
    }

    pub(crate) fn node_mut(&mut self, idx: u32) -> &mut Node<E> {
        match &mut self.slots[idx as usize] {
            Slot::Occupied(n) => n,
            _ => panic!("arena: raw index {idx} does not name a live node"),
        }
    }

    pub(crate) fn id_of(&self, idx: u32) -> ElementId {
        ElementId::new(idx, self.generations[idx as usize], self.tree_id)
    }

    /// Unlinks the node at `idx` from live storage, recording a tombstone
    /// carrying `last_index` (its rank immediately before removal) and
    /// `stamp_at_removal` (the tree's stamp once this mutation completes).
    /// Returns the fully owned node -- the caller is expected to have
    /// already read whatever adjacency/value state it needs (or to take
    /// `.value` out of the returned node) before or immediately after this
    /// call, e.g. to hand it to a `disposed` listener callback.
    pub(crate) fn remove(&mut self, idx: u32, last_index: u32, stamp_at_removal: u64) -> Node<E> {
        let slot = std::mem::replace(&mut self.slots[idx as usize], Slot::Free { next_free: NIL });
        let node = match slot {
            Slot::Occupied(n) => n,
            other => {
                self.slots[idx as usize] = other;
                panic!("arena: raw index {idx} does not name a live node")
            }
        };
        self.slots[idx as usize] = Slot::Removed {
            last_index,
            stamp_at_removal,
        };
        self.pending_removed.push(idx);
        node
    }

    pub(crate) fn resolve(&self, id: ElementId) -> Option<Resolved<'_, E>> {
        let idx = id.index as usize;
        if *self.generations.get(idx)? != id.generation {
            return None;
        }
        match &self.slots[idx] {
            Slot::Occupied(n) => Some(Resolved::Live(n)),
            Slot::Removed {
                last_index,
                stamp_at_removal,
                ..
            } => Some(Resolved::Tombstone {
                last_index: *last_index,
                stamp_at_removal: *stamp_at_removal,
            }),
            Slot::Free { .. } => None,
        }
    }

    /// Checked resolution to a raw index for structural traversal: only a
    /// live node yields one.
    pub(crate) fn live_index(&self, id: ElementId) -> Option<u32> {
        match self.resolve(id)? {
            Resolved::Live(_) => Some(id.index),
            Resolved::Tombstone { .. } => None,
        }
    }

    pub(crate) fn len_live(&self) -> usize {
        self.slots.len() - self.pending_removed.len() - self.free_list_len()
    }

    fn free_list_len(&self) -> usize {
        let mut n = 0;
        let mut cur = self.free_head;
        while cur != NIL {
            n += 1;
            cur = match self.slots[cur as usize] {
                Slot::Free { next_free } => next_free,
                _ => unreachable!("free list points at a non-free slot"),
            };
        }
        n
    }
}
