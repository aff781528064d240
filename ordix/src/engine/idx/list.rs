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

//! `List<E>`: an insertion-ordered collection over the tree core, indexed by
//! both position and stable element id.

use {
    super::{
        error::{OrdError, OrdResult},
        spliter::Spliterator,
        tree::{arena::ElementId, Tree},
    },
    crate::engine::sync::lock::{AnyLock, Locker},
};

/// Construction options for a [`List`]. `safe` selects the locker strategy:
/// `true` for [`crate::StampedRwLock`] (many readers, one writer), `false`
/// for [`crate::FastFailLock`] (single owner, reentrancy reported rather
/// than blocked on).
pub struct ListConfig<E> {
    pub safe: bool,
    pub description: Option<String>,
    pub initial_values: Option<Vec<E>>,
}

impl<E> Default for ListConfig<E> {
    fn default() -> Self {
        Self {
            safe: true,
            description: None,
            initial_values: None,
        }
    }
}

pub struct List<E> {
    lock: AnyLock<Tree<E>>,
    description: Option<String>,
}

impl<E> List<E> {
    pub fn new() -> Self {
        Self::with_config(ListConfig::default())
    }

    pub fn with_config(config: ListConfig<E>) -> Self {
        let mut tree = Tree::new();
        if let Some(values) = config.initial_values {
            Self::initialize(&mut tree, values);
        }
        Self {
            lock: AnyLock::new(tree, config.safe),
            description: config.description,
        }
    }

    /// Bulk-build fast path: appends every value from `source` in order
    /// directly via `push_back`, without the per-insertion comparator
    /// overhead a sorted container would pay. There is no equivalent
    /// internal topology to copy from a plain `Vec` source, so this is
    /// always the append path rather than a direct structural clone.
    fn initialize(tree: &mut Tree<E>, source: Vec<E>) {
        for value in source {
            tree.push_back(value);
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn size(&self) -> usize {
        self.lock.lock_read("size").len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn element_at(&self, index: usize) -> OrdResult<ElementId> {
        self.lock
            .do_optimistically("element_at", |t| Some(t.get_by_index(index)))
    }

    pub fn value_at(&self, index: usize) -> OrdResult<E>
    where
        E: Clone,
    {
        let guard = self.lock.lock_read("value_at");
        let id = guard.get_by_index(index)?;
        guard.value(id).map(|v| v.clone())
    }

    pub fn get(&self, id: ElementId) -> OrdResult<E>
    where
        E: Clone,
    {
        self.lock.lock_read("get").value(id).map(|v| v.clone())
    }

    pub fn adjacent(&self, id: ElementId, next: bool) -> OrdResult<Option<ElementId>> {
        self.lock.lock_read("adjacent").adjacent(id, next)
    }

    pub fn terminal(&self, first: bool) -> Option<ElementId> {
        self.lock
            .do_optimistically("terminal", |t| Some(t.terminal(first)))
    }

    pub fn elements_before(&self, id: ElementId) -> OrdResult<usize> {
        self.lock
            .do_optimistically("elements_before", |t| Some(t.nodes_before(id)))
    }

    pub fn elements_after(&self, id: ElementId) -> OrdResult<usize> {
        self.lock
            .do_optimistically("elements_after", |t| Some(t.nodes_after(id)))
    }

    /// Inserts `value` adjacent to `after_id` (on its right) when
    /// `prefer_first` and `after_id` is present; adjacent to `before_id`
    /// (on its left) when not `prefer_first` and `before_id` is present;
    /// otherwise appends to the terminal on the preferred side. Installs
    /// the value as the sole root when the list is empty, regardless of
    /// any hint.
    pub fn add(
        &self,
        value: E,
        after_id: Option<ElementId>,
        before_id: Option<ElementId>,
        prefer_first: bool,
    ) -> OrdResult<ElementId> {
        let mut guard = self.lock.lock_write("add");
        let id = if guard.is_empty() {
            guard.push_back(value)
        } else if prefer_first && after_id.is_some() {
            guard.insert_after(after_id.unwrap(), value)?
        } else if !prefer_first && before_id.is_some() {
            guard.insert_before(before_id.unwrap(), value)?
        } else if prefer_first {
            guard.push_front(value)
        } else {
            guard.push_back(value)
        };
        self.lock.bump_stamp();
        drop(guard);
        Ok(id)
    }

    pub fn remove(&self, id: ElementId) -> OrdResult<E> {
        let mut guard = self.lock.lock_write("remove");
        let value = guard.remove(id)?;
        self.lock.bump_stamp();
        drop(guard);
        Ok(value)
    }

    /// In-place value replacement; does not touch structure or bump the
    /// structure stamp.
    pub fn set(&self, id: ElementId, value: E) -> OrdResult<E> {
        self.lock.lock_write("set").set_value(id, value)
    }

    /// Reports whether `remove(id)` would succeed, without removing
    /// anything: `None` means allowed, `Some(e)` is the refusal `remove`
    /// would itself return.
    pub fn can_remove(&self, id: ElementId) -> Option<OrdError> {
        self.lock.lock_read("can_remove").value(id).err()
    }

    /// Reports whether `set(id, ..)` would succeed, without touching the
    /// value; same precondition as `can_remove` since both require only
    /// that `id` still names a live node.
    pub fn can_set(&self, id: ElementId) -> Option<OrdError> {
        self.can_remove(id)
    }

    /// Reports whether `add` would succeed given the same hints and
    /// `prefer_first`, without inserting anything. `List` places no
    /// ordering constraint on its hints -- the only way `add` can fail is a
    /// stale or foreign hint id, so this only validates the hint `add`
    /// would actually consult.
    pub fn can_add(
        &self,
        after_id: Option<ElementId>,
        before_id: Option<ElementId>,
        prefer_first: bool,
    ) -> Option<OrdError> {
        let guard = self.lock.lock_read("can_add");
        if guard.is_empty() {
            return None;
        }
        if prefer_first {
            if let Some(after) = after_id {
                return guard.value(after).err();
            }
        } else if let Some(before) = before_id {
            return guard.value(before).err();
        }
        None
    }

    pub fn split_between(&self, a: ElementId, b: ElementId) -> OrdResult<Option<ElementId>> {
        self.lock
            .do_optimistically("split_between", |t| Some(t.split_between(a, b)))
    }

    pub fn spliterator(&self) -> Spliterator<'_, E> {
        Spliterator::new(&self.lock, None, None)
    }

    /// A reversed view over this list's position- and adjacency-based
    /// queries -- see [`Reversed`].
    pub fn reversed(&self) -> Reversed<'_, E> {
        Reversed { inner: self }
    }
}

impl<E> Default for List<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Flips side queries over a [`List`] without a separate reversed-tree
/// implementation (§9's "reversed views" design note): `element_at(i)`
/// becomes `inner.element_at(size - 1 - i)`, `terminal(first)` swaps ends,
/// `adjacent(id, next)` walks the opposite adjacency link, and
/// `elements_before`/`elements_after` swap roles. Every call re-derives from
/// `inner` rather than caching anything, so a `Reversed` handle stays
/// correct across concurrent structural changes to the same degree `inner`
/// itself does.
pub struct Reversed<'a, E> {
    inner: &'a List<E>,
}

impl<'a, E> Reversed<'a, E> {
    pub fn size(&self) -> usize {
        self.inner.size()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn element_at(&self, index: usize) -> OrdResult<ElementId> {
        let size = self.inner.size();
        if index >= size {
            return Err(OrdError::OutOfRange);
        }
        self.inner.element_at(size - 1 - index)
    }

    pub fn value_at(&self, index: usize) -> OrdResult<E>
    where
        E: Clone,
    {
        let size = self.inner.size();
        if index >= size {
            return Err(OrdError::OutOfRange);
        }
        self.inner.value_at(size - 1 - index)
    }

    pub fn get(&self, id: ElementId) -> OrdResult<E>
    where
        E: Clone,
    {
        self.inner.get(id)
    }

    pub fn adjacent(&self, id: ElementId, next: bool) -> OrdResult<Option<ElementId>> {
        self.inner.adjacent(id, !next)
    }

    pub fn terminal(&self, first: bool) -> Option<ElementId> {
        self.inner.terminal(!first)
    }

    pub fn elements_before(&self, id: ElementId) -> OrdResult<usize> {
        self.inner.elements_after(id)
    }

    pub fn elements_after(&self, id: ElementId) -> OrdResult<usize> {
        self.inner.elements_before(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_order() {
        let list = List::new();
        list.add(10, None, None, false).unwrap();
        list.add(20, None, None, false).unwrap();
        list.add(30, None, None, false).unwrap();

        assert_eq!(list.size(), 3);
        assert_eq!(list.value_at(0).unwrap(), 10);
        assert_eq!(list.value_at(1).unwrap(), 20);
        assert_eq!(list.value_at(2).unwrap(), 30);

        let id20 = list.element_at(1).unwrap();
        assert_eq!(list.elements_before(id20).unwrap(), 1);
        assert_eq!(list.get(list.terminal(true).unwrap()).unwrap(), 10);
        assert_eq!(list.get(list.terminal(false).unwrap()).unwrap(), 30);
    }

    #[test]
    fn insert_before_shifts_adjacency() {
        let list = List::new();
        list.add(10, None, None, false).unwrap();
        list.add(20, None, None, false).unwrap();
        list.add(30, None, None, false).unwrap();

        let id20 = list.element_at(1).unwrap();
        list.add(15, None, Some(id20), false).unwrap();

        let values: Vec<_> = (0..4).map(|i| list.value_at(i).unwrap()).collect();
        assert_eq!(values, vec![10, 15, 20, 30]);
    }

    #[test]
    fn remove_and_set() {
        let list = List::new();
        let id = list.add(1, None, None, false).unwrap();
        list.add(2, None, None, false).unwrap();

        assert_eq!(list.set(id, 100).unwrap(), 1);
        assert_eq!(list.get(id).unwrap(), 100);

        assert_eq!(list.remove(id).unwrap(), 100);
        assert_eq!(list.size(), 1);
        assert!(list.get(id).is_err());
    }

    #[test]
    fn can_remove_and_can_add_report_without_mutating() {
        let list = List::new();
        let id = list.add(1, None, None, false).unwrap();
        let other = list.add(2, None, None, false).unwrap();

        assert_eq!(list.can_remove(id), None);
        assert_eq!(list.can_add(Some(id), None, true), None);
        assert_eq!(list.size(), 2, "can_* must not mutate");

        list.remove(id).unwrap();
        assert_eq!(list.can_remove(id), Some(OrdError::AlreadyRemoved));
        assert_eq!(list.can_set(id), Some(OrdError::AlreadyRemoved));
        assert_eq!(list.can_add(Some(id), None, true), Some(OrdError::AlreadyRemoved));
        assert_eq!(list.can_add(None, Some(other), false), None);
    }

    #[test]
    fn split_between_adjacent_is_none() {
        let list = List::new();
        let a = list.add(1, None, None, false).unwrap();
        let b = list.add(2, None, None, false).unwrap();
        assert_eq!(list.split_between(a, b).unwrap(), None);
        assert_eq!(list.split_between(a, a).unwrap(), None);
    }

    #[test]
    fn spliterator_walks_whole_list_forward_and_back() {
        let list = List::with_config(ListConfig {
            safe: true,
            description: None,
            initial_values: Some((1..=10).collect()),
        });

        let mut it = list.spliterator();
        let mut forward = Vec::new();
        while let Some(v) = it.next().unwrap() {
            forward.push(v);
        }
        assert_eq!(forward, (1..=10).collect::<Vec<_>>());

        let mut it = list.spliterator();
        let mut backward = Vec::new();
        while let Some(v) = it.next_back().unwrap() {
            backward.push(v);
        }
        backward.reverse();
        assert_eq!(backward, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn reversed_flips_position_and_adjacency_queries() {
        let list = List::with_config(ListConfig {
            safe: true,
            description: None,
            initial_values: Some((1..=5).collect()),
        });
        let rev = list.reversed();

        assert_eq!(rev.size(), 5);
        let values: Vec<_> = (0..rev.size()).map(|i| rev.value_at(i).unwrap()).collect();
        assert_eq!(values, vec![5, 4, 3, 2, 1]);

        assert_eq!(rev.get(rev.terminal(true).unwrap()).unwrap(), 5);
        assert_eq!(rev.get(rev.terminal(false).unwrap()).unwrap(), 1);
        assert!(rev.element_at(5).is_err());

        let mid_forward = list.element_at(2).unwrap();
        assert_eq!(rev.elements_before(mid_forward).unwrap(), list.elements_after(mid_forward).unwrap());
        assert_eq!(rev.elements_after(mid_forward).unwrap(), list.elements_before(mid_forward).unwrap());

        let next_in_rev = rev.adjacent(mid_forward, true).unwrap().unwrap();
        assert_eq!(next_in_rev, list.adjacent(mid_forward, false).unwrap().unwrap());
    }

    #[test]
    fn spliterator_split_covers_disjoint_halves() {
        let list = List::with_config(ListConfig {
            safe: true,
            description: None,
            initial_values: Some((1..=1024).collect()),
        });

        let mut first = list.spliterator();
        let second = first.try_split().unwrap().expect("splittable");
        let mut second = second;

        let mut out = Vec::new();
        while let Some(v) = first.next().unwrap() {
            out.push(v);
        }
        while let Some(v) = second.next().unwrap() {
            out.push(v);
        }
        out.sort_unstable();
        assert_eq!(out, (1..=1024).collect::<Vec<_>>());
    }
}
