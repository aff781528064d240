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

pub mod arena;
pub(crate) mod node;

use {
    crate::engine::idx::{error::OrdError, error::OrdResult, RepairListener, RepairReport},
    arena::{Arena, ElementId, Resolved, NIL},
    core::{
        cmp::Ordering,
        sync::atomic::{AtomicU64, Ordering as AtomicOrdering},
    },
    node::{Color, Node},
};

/// Mints a fresh identity for each tree so an [`ElementId`] minted by one
/// tree is never mistaken for one minted by another, even if both happen to
/// reuse the same arena slot index. Starts at 1 for the same reason a
/// tree's stamp does -- see [`Tree::new`].
static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(1);

/// The order-statistic red-black tree every container in this crate is built
/// on: a size-augmented tree plus the doubly-linked adjacency chain threaded
/// through it. `stamp` is bumped exactly once per completed structural
/// mutation (insert, remove, repair) and never for an in-place value
/// replacement -- see [`Tree::set_value`].
pub(crate) struct Tree<E> {
    arena: Arena<E>,
    root: u32,
    first: u32,
    last: u32,
    len: usize,
    /// Starts at 1, not 0: 0 is reserved so a tombstone's
    /// `stamp_at_removal` can never accidentally collide with a tree that
    /// was never mutated.
    stamp: u64,
}

impl<E> Tree<E> {
    pub(crate) fn new() -> Self {
        Self {
            arena: Arena::new(NEXT_TREE_ID.fetch_add(1, AtomicOrdering::Relaxed)),
            root: NIL,
            first: NIL,
            last: NIL,
            len: 0,
            stamp: 1,
        }
    }

    pub(crate) fn with_capacity(cap: usize) -> Self {
        Self {
            arena: Arena::with_capacity(cap, NEXT_TREE_ID.fetch_add(1, AtomicOrdering::Relaxed)),
            root: NIL,
            first: NIL,
            last: NIL,
            len: 0,
            stamp: 1,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn stamp(&self) -> u64 {
        self.stamp
    }

    // ---- raw-index helpers -------------------------------------------------

    fn left_of(&self, x: u32) -> u32 {
        if x == NIL {
            NIL
        } else {
            self.arena.node(x).left
        }
    }
    fn right_of(&self, x: u32) -> u32 {
        if x == NIL {
            NIL
        } else {
            self.arena.node(x).right
        }
    }
    fn parent_of(&self, x: u32) -> u32 {
        if x == NIL {
            NIL
        } else {
            self.arena.node(x).parent
        }
    }
    fn color_of(&self, x: u32) -> Color {
        if x == NIL {
            Color::Black
        } else {
            self.arena.node(x).color
        }
    }
    fn set_color(&mut self, x: u32, c: Color) {
        if x != NIL {
            self.arena.node_mut(x).color = c;
        }
    }
    fn size_of(&self, x: u32) -> u32 {
        if x == NIL {
            0
        } else {
            self.arena.node(x).size
        }
    }
    fn subtree_max(&self, mut x: u32) -> u32 {
        while self.right_of(x) != NIL {
            x = self.right_of(x);
        }
        x
    }
    fn subtree_min(&self, mut x: u32) -> u32 {
        while self.left_of(x) != NIL {
            x = self.left_of(x);
        }
        x
    }

    fn recompute_size(&mut self, x: u32) {
        let s = 1 + self.size_of(self.left_of(x)) + self.size_of(self.right_of(x));
        self.arena.node_mut(x).size = s;
    }
    fn recompute_sizes_from(&mut self, mut x: u32) {
        while x != NIL {
            self.recompute_size(x);
            x = self.parent_of(x);
        }
    }
    fn bump_sizes_from(&mut self, mut x: u32) {
        while x != NIL {
            self.arena.node_mut(x).size += 1;
            x = self.parent_of(x);
        }
    }

    fn require_live(&self, id: ElementId) -> OrdResult<u32> {
        if !self.arena.owns(id) {
            return Err(OrdError::TreeMismatch);
        }
        if let Some(idx) = self.arena.live_index(id) {
            return Ok(idx);
        }
        match self.arena.resolve(id) {
            Some(Resolved::Tombstone { .. }) => Err(OrdError::AlreadyRemoved),
            _ => Err(OrdError::IllegalElement),
        }
    }

    // ---- rotations ----------------------------------------------------------

    fn rotate_left(&mut self, x: u32) {
        let y = self.right_of(x);
        debug_assert!(y != NIL, "rotate_left requires a right child");
        let y_left = self.left_of(y);
        self.arena.node_mut(x).right = y_left;
        if y_left != NIL {
            self.arena.node_mut(y_left).parent = x;
        }
        let xp = self.parent_of(x);
        self.arena.node_mut(y).parent = xp;
        if xp == NIL {
            self.root = y;
        } else if self.left_of(xp) == x {
            self.arena.node_mut(xp).left = y;
        } else {
            self.arena.node_mut(xp).right = y;
        }
        self.arena.node_mut(y).left = x;
        self.arena.node_mut(x).parent = y;
        self.recompute_size(x);
        self.recompute_size(y);
    }

    fn rotate_right(&mut self, x: u32) {
        let y = self.left_of(x);
        debug_assert!(y != NIL, "rotate_right requires a left child");
        let y_right = self.right_of(y);
        self.arena.node_mut(x).left = y_right;
        if y_right != NIL {
            self.arena.node_mut(y_right).parent = x;
        }
        let xp = self.parent_of(x);
        self.arena.node_mut(y).parent = xp;
        if xp == NIL {
            self.root = y;
        } else if self.left_of(xp) == x {
            self.arena.node_mut(xp).left = y;
        } else {
            self.arena.node_mut(xp).right = y;
        }
        self.arena.node_mut(y).right = x;
        self.arena.node_mut(x).parent = y;
        self.recompute_size(x);
        self.recompute_size(y);
    }

    fn transplant(&mut self, u: u32, v: u32) {
        let up = self.parent_of(u);
        if up == NIL {
            self.root = v;
        } else if u == self.left_of(up) {
            self.arena.node_mut(up).left = v;
        } else {
            self.arena.node_mut(up).right = v;
        }
        if v != NIL {
            self.arena.node_mut(v).parent = up;
        }
    }

    // ---- leaf attachment + adjacency -----------------------------------------

    /// Attaches a freshly allocated node holding `value` as the `as_left`
    /// child of `parent` (or as the sole root, if `parent == NIL`), wiring
    /// up `prev`/`next` to match -- `parent`'s left-child slot must
    /// currently be `NIL` when `as_left`, and symmetrically for the right.
    /// Runs the insertion fixup and returns the new node's raw index; does
    /// not touch `self.stamp` (callers bump it once per public operation,
    /// even when an operation performs several attachments, as `repair`
    /// does).
    fn attach_leaf(&mut self, parent: u32, as_left: bool, value: E) -> u32 {
        let (new_idx, _) = self.arena.insert(Node::new(value));
        if parent == NIL {
            self.root = new_idx;
            self.first = new_idx;
            self.last = new_idx;
        } else {
            self.arena.node_mut(new_idx).parent = parent;
            if as_left {
                debug_assert!(self.left_of(parent) == NIL);
                self.arena.node_mut(parent).left = new_idx;
                let pred = self.arena.node(parent).prev;
                self.arena.node_mut(new_idx).next = parent;
                self.arena.node_mut(new_idx).prev = pred;
                self.arena.node_mut(parent).prev = new_idx;
                if pred != NIL {
                    self.arena.node_mut(pred).next = new_idx;
                } else {
                    self.first = new_idx;
                }
            } else {
                debug_assert!(self.right_of(parent) == NIL);
                self.arena.node_mut(parent).right = new_idx;
                let succ = self.arena.node(parent).next;
                self.arena.node_mut(new_idx).prev = parent;
                self.arena.node_mut(new_idx).next = succ;
                self.arena.node_mut(parent).next = new_idx;
                if succ != NIL {
                    self.arena.node_mut(succ).prev = new_idx;
                } else {
                    self.last = new_idx;
                }
            }
            self.bump_sizes_from(parent);
        }
        self.insert_fixup(new_idx);
        self.len += 1;
        new_idx
    }

    fn insert_fixup(&mut self, mut z: u32) {
        while self.color_of(self.parent_of(z)) == Color::Red {
            let zp = self.parent_of(z);
            let zpp = self.parent_of(zp);
            if zp == self.left_of(zpp) {
                let y = self.right_of(zpp);
                if self.color_of(y) == Color::Red {
                    self.set_color(zp, Color::Black);
                    self.set_color(y, Color::Black);
                    self.set_color(zpp, Color::Red);
                    z = zpp;
                } else {
                    let mut z = z;
                    if z == self.right_of(zp) {
                        z = zp;
                        self.rotate_left(z);
                    }
                    let zp = self.parent_of(z);
                    let zpp = self.parent_of(zp);
                    self.set_color(zp, Color::Black);
                    self.set_color(zpp, Color::Red);
                    self.rotate_right(zpp);
                    break;
                }
            } else {
                let y = self.left_of(zpp);
                if self.color_of(y) == Color::Red {
                    self.set_color(zp, Color::Black);
                    self.set_color(y, Color::Black);
                    self.set_color(zpp, Color::Red);
                    z = zpp;
                } else {
                    let mut z = z;
                    if z == self.left_of(zp) {
                        z = zp;
                        self.rotate_right(z);
                    }
                    let zp = self.parent_of(z);
                    let zpp = self.parent_of(zp);
                    self.set_color(zp, Color::Black);
                    self.set_color(zpp, Color::Red);
                    self.rotate_left(zpp);
                    break;
                }
            }
        }
        self.set_color(self.root, Color::Black);
    }

    // ---- public structural mutation: position-relative (List) --------------

    pub(crate) fn push_back(&mut self, value: E) -> ElementId {
        self.arena.begin_mutation();
        let idx = if self.last == NIL {
            self.attach_leaf(NIL, true, value)
        } else {
            self.attach_leaf(self.last, false, value)
        };
        self.stamp += 1;
        self.arena.id_of(idx)
    }

    pub(crate) fn push_front(&mut self, value: E) -> ElementId {
        self.arena.begin_mutation();
        let idx = if self.first == NIL {
            self.attach_leaf(NIL, true, value)
        } else {
            self.attach_leaf(self.first, true, value)
        };
        self.stamp += 1;
        self.arena.id_of(idx)
    }

    pub(crate) fn insert_before(&mut self, anchor: ElementId, value: E) -> OrdResult<ElementId> {
        self.arena.begin_mutation();
        let anchor_idx = self.require_live(anchor)?;
        let idx = if self.left_of(anchor_idx) == NIL {
            self.attach_leaf(anchor_idx, true, value)
        } else {
            let pred = self.subtree_max(self.left_of(anchor_idx));
            self.attach_leaf(pred, false, value)
        };
        self.stamp += 1;
        Ok(self.arena.id_of(idx))
    }

    pub(crate) fn insert_after(&mut self, anchor: ElementId, value: E) -> OrdResult<ElementId> {
        self.arena.begin_mutation();
        let anchor_idx = self.require_live(anchor)?;
        let idx = if self.right_of(anchor_idx) == NIL {
            self.attach_leaf(anchor_idx, false, value)
        } else {
            let succ = self.subtree_min(self.right_of(anchor_idx));
            self.attach_leaf(succ, true, value)
        };
        self.stamp += 1;
        Ok(self.arena.id_of(idx))
    }

    // ---- public structural mutation: comparator-ordered (SortedList) -------

    pub(crate) fn insert_sorted(
        &mut self,
        value: E,
        cmp: &dyn Fn(&E, &E) -> Ordering,
        distinct: bool,
    ) -> Result<ElementId, E> {
        self.arena.begin_mutation();
        match self.insert_sorted_idx(value, cmp, distinct) {
            Ok(idx) => {
                self.stamp += 1;
                Ok(self.arena.id_of(idx))
            }
            Err(value) => Err(value),
        }
    }

    fn insert_sorted_idx(
        &mut self,
        value: E,
        cmp: &dyn Fn(&E, &E) -> Ordering,
        distinct: bool,
    ) -> Result<u32, E> {
        if self.root == NIL {
            return Ok(self.attach_leaf(NIL, true, value));
        }
        let mut cur = self.root;
        loop {
            let ord = cmp(&value, &self.arena.node(cur).value);
            match ord {
                Ordering::Equal if distinct => return Err(value),
                Ordering::Less | Ordering::Equal => {
                    if self.left_of(cur) == NIL {
                        return Ok(self.attach_leaf(cur, true, value));
                    }
                    cur = self.left_of(cur);
                }
                Ordering::Greater => {
                    if self.right_of(cur) == NIL {
                        return Ok(self.attach_leaf(cur, false, value));
                    }
                    cur = self.right_of(cur);
                }
            }
        }
    }

    // ---- removal --------------------------------------------------------------

    pub(crate) fn remove(&mut self, id: ElementId) -> OrdResult<E> {
        self.arena.begin_mutation();
        let idx = self.require_live(id)?;
        let node = self.remove_idx(idx);
        self.stamp += 1;
        Ok(node.value)
    }

    /// Structurally removes the node at `idx`; does not bump `self.stamp`
    /// or call `arena.begin_mutation` -- the caller (a public op, or
    /// `repair`, which performs several removals under one stamp bump) owns
    /// that.
    fn remove_idx(&mut self, idx: u32) -> Node<E> {
        let last_index = self.rank_of(idx);
        let p = self.arena.node(idx).prev;
        let n = self.arena.node(idx).next;
        if p != NIL {
            self.arena.node_mut(p).next = n;
        } else {
            self.first = n;
        }
        if n != NIL {
            self.arena.node_mut(n).prev = p;
        } else {
            self.last = p;
        }

        let z = idx;
        let mut y = z;
        let mut y_original_color = self.color_of(y);
        let x;
        let x_parent;
        if self.left_of(z) == NIL {
            x = self.right_of(z);
            x_parent = self.parent_of(z);
            self.transplant(z, x);
        } else if self.right_of(z) == NIL {
            x = self.left_of(z);
            x_parent = self.parent_of(z);
            self.transplant(z, x);
        } else {
            y = self.subtree_min(self.right_of(z));
            y_original_color = self.color_of(y);
            x = self.right_of(y);
            if self.parent_of(y) == z {
                x_parent = y;
            } else {
                x_parent = self.parent_of(y);
                self.transplant(y, self.right_of(y));
                let zr = self.right_of(z);
                self.arena.node_mut(y).right = zr;
                self.arena.node_mut(zr).parent = y;
            }
            self.transplant(z, y);
            let zl = self.left_of(z);
            self.arena.node_mut(y).left = zl;
            self.arena.node_mut(zl).parent = y;
            self.set_color(y, self.color_of(z));
        }
        self.recompute_sizes_from(x_parent);
        if y_original_color == Color::Black {
            self.delete_fixup(x, x_parent);
        }
        self.len -= 1;
        self.arena.remove(idx, last_index, self.stamp + 1)
    }

    fn delete_fixup(&mut self, mut x: u32, mut x_parent: u32) {
        while x != self.root && self.color_of(x) == Color::Black {
            if x == self.left_of(x_parent) {
                let mut w = self.right_of(x_parent);
                if self.color_of(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.set_color(x_parent, Color::Red);
                    self.rotate_left(x_parent);
                    w = self.right_of(x_parent);
                }
                if self.color_of(self.left_of(w)) == Color::Black
                    && self.color_of(self.right_of(w)) == Color::Black
                {
                    self.set_color(w, Color::Red);
                    x = x_parent;
                    x_parent = self.parent_of(x);
                } else {
                    if self.color_of(self.right_of(w)) == Color::Black {
                        self.set_color(self.left_of(w), Color::Black);
                        self.set_color(w, Color::Red);
                        self.rotate_right(w);
                        w = self.right_of(x_parent);
                    }
                    self.set_color(w, self.color_of(x_parent));
                    self.set_color(x_parent, Color::Black);
                    self.set_color(self.right_of(w), Color::Black);
                    self.rotate_left(x_parent);
                    x = self.root;
                }
            } else {
                let mut w = self.left_of(x_parent);
                if self.color_of(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.set_color(x_parent, Color::Red);
                    self.rotate_right(x_parent);
                    w = self.left_of(x_parent);
                }
                if self.color_of(self.right_of(w)) == Color::Black
                    && self.color_of(self.left_of(w)) == Color::Black
                {
                    self.set_color(w, Color::Red);
                    x = x_parent;
                    x_parent = self.parent_of(x);
                } else {
                    if self.color_of(self.left_of(w)) == Color::Black {
                        self.set_color(self.right_of(w), Color::Black);
                        self.set_color(w, Color::Red);
                        self.rotate_left(w);
                        w = self.left_of(x_parent);
                    }
                    self.set_color(w, self.color_of(x_parent));
                    self.set_color(x_parent, Color::Black);
                    self.set_color(self.left_of(w), Color::Black);
                    self.rotate_right(x_parent);
                    x = self.root;
                }
            }
        }
        self.set_color(x, Color::Black);
    }

    // ---- value access ---------------------------------------------------------

    pub(crate) fn value(&self, id: ElementId) -> OrdResult<&E> {
        let idx = self.require_live(id)?;
        Ok(&self.arena.node(idx).value)
    }

    /// Replaces the value in place. Non-structural: does not bump the
    /// stamp, since only structural mutations do.
    pub(crate) fn set_value(&mut self, id: ElementId, value: E) -> OrdResult<E> {
        let idx = self.require_live(id)?;
        Ok(core::mem::replace(&mut self.arena.node_mut(idx).value, value))
    }

    /// Applies `f` to the value in place without cloning it out first and
    /// without touching structure or the stamp -- the primitive a map entry
    /// handle uses to replace its value while handing back the old one.
    pub(crate) fn update_value<F: FnOnce(&mut E)>(&mut self, id: ElementId, f: F) -> OrdResult<()> {
        let idx = self.require_live(id)?;
        f(&mut self.arena.node_mut(idx).value);
        Ok(())
    }

    pub(crate) fn adjacent(&self, id: ElementId, next: bool) -> OrdResult<Option<ElementId>> {
        let idx = self.require_live(id)?;
        let n = if next {
            self.arena.node(idx).next
        } else {
            self.arena.node(idx).prev
        };
        Ok(if n == NIL {
            None
        } else {
            Some(self.arena.id_of(n))
        })
    }

    pub(crate) fn terminal(&self, first: bool) -> Option<ElementId> {
        let idx = if first { self.first } else { self.last };
        if idx == NIL {
            None
        } else {
            Some(self.arena.id_of(idx))
        }
    }

    // ---- order-statistic queries -----------------------------------------------

    /// Ascends from `idx` to the root, accumulating the count of nodes that
    /// sort strictly before it -- the fallback path backing the node-level
    /// `nodes_before` query.
    fn rank_of(&self, idx: u32) -> u32 {
        let mut count = self.size_of(self.left_of(idx));
        let mut cur = idx;
        while self.parent_of(cur) != NIL {
            let p = self.parent_of(cur);
            if cur == self.right_of(p) {
                count += self.size_of(self.left_of(p)) + 1;
            }
            cur = p;
        }
        count
    }

    pub(crate) fn nodes_before(&self, id: ElementId) -> OrdResult<usize> {
        if !self.arena.owns(id) {
            return Err(OrdError::TreeMismatch);
        }
        match self.arena.resolve(id) {
            Some(Resolved::Live(_)) => Ok(self.rank_of(id.index) as usize),
            Some(Resolved::Tombstone {
                last_index,
                stamp_at_removal,
            }) => {
                if stamp_at_removal == self.stamp {
                    Ok(last_index as usize)
                } else {
                    Err(OrdError::AlreadyRemoved)
                }
            }
            None => Err(OrdError::IllegalElement),
        }
    }

    pub(crate) fn nodes_after(&self, id: ElementId) -> OrdResult<usize> {
        let before = self.nodes_before(id)?;
        let present = matches!(self.arena.resolve(id), Some(Resolved::Live(_)));
        Ok(self.len - before - usize::from(present))
    }

    /// Comparator-driven order-statistic search: descends from the root
    /// accumulating the count of nodes known to sort before the probe
    /// target. Returns `i >= 0` for an exact match at tree-index `i`, or
    /// `-(i+1)` where `i` is the index an insertion would occupy.
    pub(crate) fn index_for(&self, probe: &dyn Fn(&E) -> Ordering) -> isize {
        let mut cur = self.root;
        let mut passed: usize = 0;
        while cur != NIL {
            match probe(&self.arena.node(cur).value) {
                Ordering::Equal => {
                    return (passed + self.size_of(self.left_of(cur)) as usize) as isize
                }
                Ordering::Greater => {
                    passed += self.size_of(self.left_of(cur)) as usize + 1;
                    cur = self.right_of(cur);
                }
                Ordering::Less => {
                    cur = self.left_of(cur);
                }
            }
        }
        -(passed as isize) - 1
    }

    pub(crate) fn get_by_index(&self, index: usize) -> OrdResult<ElementId> {
        if index >= self.len {
            return Err(OrdError::OutOfRange);
        }
        let mut cur = self.root;
        let mut remaining = index as u32;
        loop {
            let left_size = self.size_of(self.left_of(cur));
            match remaining.cmp(&left_size) {
                Ordering::Less => cur = self.left_of(cur),
                Ordering::Equal => return Ok(self.arena.id_of(cur)),
                Ordering::Greater => {
                    remaining -= left_size + 1;
                    cur = self.right_of(cur);
                }
            }
        }
    }

    /// Tree-order comparison between two elements of the same tree,
    /// including support for a recently removed `a`/`b` as long as the
    /// tombstone's stamp still matches -- both sides go through
    /// [`Tree::nodes_before`], so the removal-tolerance rule is shared with
    /// every other rank-based query instead of being re-implemented here.
    pub(crate) fn compare(&self, a: ElementId, b: ElementId) -> OrdResult<Ordering> {
        if a == b {
            return Ok(Ordering::Equal);
        }
        let ra = self.nodes_before(a)?;
        let rb = self.nodes_before(b)?;
        Ok(ra.cmp(&rb))
    }

    /// Returns the element sitting at the midpoint between `a` and `b`
    /// (exclusive of both), or `None` if they are identical or adjacent in
    /// tree order -- used by spliterators to find a fair split point.
    pub(crate) fn split_between(&self, a: ElementId, b: ElementId) -> OrdResult<Option<ElementId>> {
        let ra = self.nodes_before(a)?;
        let rb = self.nodes_before(b)?;
        let (lo, hi) = if ra <= rb { (ra, rb) } else { (rb, ra) };
        if hi <= lo + 1 {
            return Ok(None);
        }
        let mid = lo + (hi - lo) / 2;
        Ok(Some(self.get_by_index(mid)?))
    }

    /// Binary descent toward the closest element satisfying `probe`: a
    /// match on the preferred (`prefer_lesser`) side always wins over one
    /// on the other side, and among same-side candidates the most recently visited one
    /// (closest to the probe target, by the descent invariant) wins. If
    /// `strict` is set and no preferred-side match exists at all, returns
    /// `None` even if a fallback match does.
    pub(crate) fn find_closest(
        &self,
        probe: &dyn Fn(&E) -> Ordering,
        prefer_lesser: bool,
        strict: bool,
    ) -> Option<ElementId> {
        let mut cur = self.root;
        let mut best: Option<u32> = None;
        let mut best_is_preferred = false;
        while cur != NIL {
            let ord = probe(&self.arena.node(cur).value);
            match ord {
                Ordering::Equal => return Some(self.arena.id_of(cur)),
                Ordering::Greater => {
                    // cur sorts before the probe target: a "lesser" candidate.
                    let is_preferred = prefer_lesser;
                    if best.is_none() || is_preferred || !best_is_preferred {
                        best = Some(cur);
                        best_is_preferred = is_preferred;
                    }
                    cur = self.right_of(cur);
                }
                Ordering::Less => {
                    // cur sorts after the probe target: a "greater" candidate.
                    let is_preferred = !prefer_lesser;
                    if best.is_none() || is_preferred || !best_is_preferred {
                        best = Some(cur);
                        best_is_preferred = is_preferred;
                    }
                    cur = self.left_of(cur);
                }
            }
        }
        if strict && !best_is_preferred {
            return None;
        }
        best.map(|b| self.arena.id_of(b))
    }

    fn in_order_indices(&self) -> Vec<u32> {
        let mut v = Vec::with_capacity(self.len);
        let mut cur = self.first;
        while cur != NIL {
            v.push(cur);
            cur = self.arena.node(cur).next;
        }
        v
    }

    pub(crate) fn consistency_check(&self, cmp: &dyn Fn(&E, &E) -> Ordering, distinct: bool) -> bool {
        if self.arena.len_live() != self.len {
            return false;
        }
        let order = self.in_order_indices();
        order.windows(2).all(|w| {
            let a = &self.arena.node(w[0]).value;
            let b = &self.arena.node(w[1]).value;
            let ord = cmp(a, b);
            if distinct {
                ord == Ordering::Less
            } else {
                ord != Ordering::Greater
            }
        })
    }

    /// Restores sortedness after a caller mutated a key's order in place.
    /// Finds the out-of-place elements with a single left-to-right pass
    /// (switching its anchor whenever more than half the elements scanned
    /// since the last accepted anchor turned out to be violators, on the
    /// theory that the anchor itself was probably the misplaced one), pulls
    /// every violator out, and reinserts each by comparator order -- or
    /// drops it, in `distinct` mode, if an equal element already occupies
    /// its new position. Reports every step to `listener`; never returns an
    /// error for an unsorted tree, since restoring sortedness is the
    /// point of calling it.
    pub(crate) fn repair(
        &mut self,
        cmp: &dyn Fn(&E, &E) -> Ordering,
        distinct: bool,
        listener: &mut dyn RepairListener<E>,
    ) -> RepairReport {
        self.arena.begin_mutation();
        let order = self.in_order_indices();
        if order.len() < 2 {
            return RepairReport::default();
        }
        let mut marked = vec![false; order.len()];
        let mut anchor = 0usize;
        let mut marked_since_anchor = 0usize;
        let mut scanned_since_anchor = 0usize;
        for i in 1..order.len() {
            let a = &self.arena.node(order[anchor]).value;
            let b = &self.arena.node(order[i]).value;
            let ord = cmp(a, b);
            let ok = if distinct {
                ord == Ordering::Less
            } else {
                ord != Ordering::Greater
            };
            scanned_since_anchor += 1;
            if ok {
                anchor = i;
                marked_since_anchor = 0;
                scanned_since_anchor = 0;
            } else {
                marked[i] = true;
                marked_since_anchor += 1;
                if marked_since_anchor * 2 > scanned_since_anchor {
                    log::trace!(
                        "repair: switching anchor from index {anchor} to {i}, {marked_since_anchor}/{scanned_since_anchor} since last anchor"
                    );
                    marked[anchor] = true;
                    marked[i] = false;
                    anchor = i;
                    marked_since_anchor = 0;
                    scanned_since_anchor = 0;
                }
            }
        }

        let mut displaced = Vec::new();
        for (i, &idx) in order.iter().enumerate() {
            if marked[i] {
                let old_id = self.arena.id_of(idx);
                listener.removed(old_id);
                let node = self.remove_idx(idx);
                displaced.push((old_id, node.value));
            }
        }

        let mut report = RepairReport::default();
        for (old_id, value) in displaced {
            match self.insert_sorted_idx(value, cmp, distinct) {
                Ok(new_idx) => {
                    report.relocated += 1;
                    listener.transferred(old_id, self.arena.id_of(new_idx));
                }
                Err(value) => {
                    report.disposed += 1;
                    let near = self.terminal(true).unwrap_or(old_id);
                    listener.disposed(value, near);
                }
            }
        }
        if report.found_any() {
            self.stamp += 1;
            log::debug!(
                "repair: relocated {} out-of-order element(s), disposed {}",
                report.relocated,
                report.disposed
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    /// Recursively checks invariant 1 (§8): uniform black-depth on every
    /// root-to-null path, no red node with a red child, root black (or the
    /// tree has at most one node). Returns the black-depth of `x`'s subtree.
    fn check_red_black(tree: &Tree<i32>, x: u32) -> u32 {
        if x == NIL {
            return 1;
        }
        let node = tree.arena.node(x);
        if node.is_red() {
            assert!(
                tree.color_of(tree.left_of(x)) == Color::Black
                    && tree.color_of(tree.right_of(x)) == Color::Black,
                "red node {x} has a red child"
            );
        }
        let left_depth = check_red_black(tree, tree.left_of(x));
        let right_depth = check_red_black(tree, tree.right_of(x));
        assert_eq!(left_depth, right_depth, "unequal black-depth through node {x}");
        left_depth + u32::from(node.color == Color::Black)
    }

    /// Recursively checks invariant 2: every node's `size` equals
    /// `1 + size(left) + size(right)`.
    fn check_sizes(tree: &Tree<i32>, x: u32) -> u32 {
        if x == NIL {
            return 0;
        }
        let left = check_sizes(tree, tree.left_of(x));
        let right = check_sizes(tree, tree.right_of(x));
        let expected = 1 + left + right;
        assert_eq!(tree.arena.node(x).size, expected, "size mismatch at node {x}");
        expected
    }

    /// Checks invariants 3-4: the adjacency chain is exactly the in-order
    /// traversal, and `first`/`last` name its two ends.
    fn check_adjacency(tree: &Tree<i32>) {
        fn in_order(tree: &Tree<i32>, x: u32, out: &mut Vec<u32>) {
            if x == NIL {
                return;
            }
            in_order(tree, tree.left_of(x), out);
            out.push(x);
            in_order(tree, tree.right_of(x), out);
        }
        let mut expected = Vec::new();
        in_order(tree, tree.root, &mut expected);
        assert_eq!(tree.in_order_indices(), expected, "adjacency chain diverges from in-order traversal");
        if expected.is_empty() {
            assert_eq!(tree.first, NIL);
            assert_eq!(tree.last, NIL);
        } else {
            assert_eq!(tree.first, expected[0]);
            assert_eq!(tree.last, *expected.last().unwrap());
        }
    }

    fn check_all_invariants(tree: &Tree<i32>) {
        if tree.root != NIL {
            assert_eq!(tree.color_of(tree.root), Color::Black, "root must be black");
            check_red_black(tree, tree.root);
            check_sizes(tree, tree.root);
        } else {
            assert_eq!(tree.first, NIL);
            assert_eq!(tree.last, NIL);
        }
        check_adjacency(tree);
        assert_eq!(tree.len, tree.size_of(tree.root) as usize, "len diverges from root size");
    }

    #[test]
    fn invariants_hold_after_randomized_sorted_inserts_and_removes() {
        let cmp = |a: &i32, b: &i32| a.cmp(b);
        let mut tree: Tree<i32> = Tree::new();
        let mut live: Vec<ElementId> = Vec::new();
        let mut rng = rand::thread_rng();
        let mut last_stamp = tree.stamp();

        for _ in 0..2000 {
            let do_insert = live.is_empty() || rng.gen_bool(0.65);
            if do_insert {
                let value: i32 = rng.gen_range(0..500);
                if let Ok(id) = tree.insert_sorted(value, &cmp, false) {
                    live.push(id);
                }
            } else {
                let idx = rng.gen_range(0..live.len());
                let id = live.swap_remove(idx);
                tree.remove(id).expect("id from `live` must still be present");
            }
            assert!(tree.stamp() > last_stamp, "stamp must strictly increase on every mutation");
            last_stamp = tree.stamp();
            check_all_invariants(&tree);
        }
    }

    #[test]
    fn distinct_insert_sorted_keeps_invariants_and_ordering() {
        let cmp = |a: &i32, b: &i32| a.cmp(b);
        let mut tree: Tree<i32> = Tree::new();
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let value: i32 = rng.gen_range(0..200);
            let _ = tree.insert_sorted(value, &cmp, true);
        }
        check_all_invariants(&tree);
        assert!(tree.consistency_check(&cmp, true));
    }

    #[test]
    fn nodes_before_matches_in_order_position() {
        let cmp = |a: &i32, b: &i32| a.cmp(b);
        let mut tree: Tree<i32> = Tree::new();
        let mut ids = Vec::new();
        for v in [50, 10, 30, 70, 20, 60, 40, 80, 5, 90] {
            ids.push(tree.insert_sorted(v, &cmp, false).unwrap());
        }
        let order = tree.in_order_indices();
        for (expected_rank, idx) in order.iter().enumerate() {
            let id = tree.arena.id_of(*idx);
            assert_eq!(tree.nodes_before(id).unwrap(), expected_rank);
        }
    }

    #[test]
    fn removed_node_rank_stays_valid_only_until_next_mutation() {
        let mut tree: Tree<i32> = Tree::new();
        let a = tree.push_back(1);
        let b = tree.push_back(2);
        let _c = tree.push_back(3);

        let rank_before = tree.nodes_before(b).unwrap();
        assert_eq!(rank_before, 1);
        tree.remove(b).unwrap();
        // same stamp the removal left behind -- tombstone rank still answers.
        assert_eq!(tree.nodes_before(b).unwrap(), 1);

        tree.remove(a).unwrap();
        // tree mutated again since b's removal -- its tombstone is now stale.
        assert!(tree.nodes_before(b).is_err());
    }

    #[test]
    fn element_id_from_a_different_tree_is_rejected() {
        let mut tree_a: Tree<i32> = Tree::new();
        let mut tree_b: Tree<i32> = Tree::new();
        let id_a = tree_a.push_back(1);
        let _ = tree_b.push_back(1);

        assert!(matches!(
            tree_b.value(id_a),
            Err(OrdError::TreeMismatch)
        ));
        assert!(matches!(
            tree_b.nodes_before(id_a),
            Err(OrdError::TreeMismatch)
        ));
        assert!(matches!(
            tree_b.remove(id_a),
            Err(OrdError::TreeMismatch)
        ));
    }
}
