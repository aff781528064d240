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

//! `SortedList<E>`: a comparator-ordered view over the tree core, optionally
//! rejecting duplicates (in which case it behaves as a sorted set --
//! [`SortedSet`] is the same type, built through [`SortedList::new_set`]).

use {
    super::{
        error::{OrdError, OrdResult},
        spliter::Spliterator,
        tree::{arena::ElementId, Tree},
        RepairListener, RepairReport, SearchComparable,
    },
    crate::engine::sync::lock::{AnyLock, Locker},
    core::cmp::Ordering,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFilter {
    LessStrict,
    LessOrEqual,
    Exact,
    GreaterOrEqual,
    GreaterStrict,
}

pub struct SortedListConfig<E> {
    pub safe: bool,
    pub comparator: Box<dyn Fn(&E, &E) -> Ordering + Send + Sync>,
    pub distinct: bool,
    pub description: Option<String>,
    pub initial_values: Option<Vec<E>>,
}

impl<E> SortedListConfig<E> {
    pub fn new(comparator: impl Fn(&E, &E) -> Ordering + Send + Sync + 'static) -> Self {
        Self {
            safe: true,
            comparator: Box::new(comparator),
            distinct: false,
            description: None,
            initial_values: None,
        }
    }
}

pub struct SortedList<E> {
    lock: AnyLock<Tree<E>>,
    comparator: Box<dyn Fn(&E, &E) -> Ordering + Send + Sync>,
    distinct: bool,
    description: Option<String>,
}

/// A sorted set is exactly a sorted list constructed with `distinct: true`;
/// see [`SortedList::new_set`].
pub type SortedSet<E> = SortedList<E>;

impl<E> SortedList<E> {
    pub fn new(comparator: impl Fn(&E, &E) -> Ordering + Send + Sync + 'static) -> Self {
        Self::with_config(SortedListConfig::new(comparator))
    }

    pub fn new_set(comparator: impl Fn(&E, &E) -> Ordering + Send + Sync + 'static) -> Self {
        let mut config = SortedListConfig::new(comparator);
        config.distinct = true;
        Self::with_config(config)
    }

    pub fn with_config(config: SortedListConfig<E>) -> Self {
        let mut tree = Tree::new();
        if let Some(values) = config.initial_values {
            for value in values {
                let _ = tree.insert_sorted(value, &*config.comparator, config.distinct);
            }
        }
        Self {
            lock: AnyLock::new(tree, config.safe),
            comparator: config.comparator,
            distinct: config.distinct,
            description: config.description,
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
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

    /// Reads the value at `id` by reference, without requiring `E: Clone`.
    /// Used by adapter layers (e.g. [`crate::SortedMap`]) whose element type
    /// is a composite record they only want to project one field out of.
    pub fn get_with<R>(&self, id: ElementId, f: impl FnOnce(&E) -> R) -> OrdResult<R> {
        self.lock.lock_read("get_with").value(id).map(f)
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

    pub fn spliterator(&self) -> Spliterator<'_, E> {
        Spliterator::new(&self.lock, None, None)
    }

    /// Finds the element matching `filter` relative to `probe`. Always
    /// confirms the candidate against `probe` directly after the binary
    /// descent rather than trusting `find_closest`'s own exact-match
    /// short-circuit, so every filter variant -- not only `Exact` -- gets a
    /// uniformly correct accept/reject check.
    pub fn search(&self, probe: &dyn SearchComparable<E>, filter: SearchFilter) -> Option<ElementId> {
        let guard = self.lock.lock_read("search");
        let prefer_lesser = matches!(filter, SearchFilter::LessStrict | SearchFilter::LessOrEqual);
        let strict = matches!(filter, SearchFilter::LessStrict | SearchFilter::GreaterStrict);
        let candidate = guard.find_closest(&|e: &E| probe.compare(e), prefer_lesser, strict)?;
        let ord = probe.compare(guard.value(candidate).ok()?);
        let keep = match filter {
            SearchFilter::LessStrict => ord == Ordering::Greater,
            SearchFilter::LessOrEqual => ord != Ordering::Less,
            SearchFilter::Exact => ord == Ordering::Equal,
            SearchFilter::GreaterOrEqual => ord != Ordering::Greater,
            SearchFilter::GreaterStrict => ord == Ordering::Less,
        };
        keep.then_some(candidate)
    }

    /// Returns `i >= 0` when `element_at(i)` compares equal to `probe`;
    /// otherwise `-(i+1)` where `i` is the index an insertion would occupy.
    pub fn index_for(&self, probe: &dyn SearchComparable<E>) -> isize {
        self.lock
            .do_optimistically("index_for", |t| Some(t.index_for(&|e: &E| probe.compare(e))))
    }

    /// Inserts `value`, honoring `after_id`/`before_id` placement hints
    /// before falling back to a full comparator search; see the type-level
    /// docs for the exact placement rule among equal-comparing elements in
    /// non-distinct mode.
    pub fn add(
        &self,
        value: E,
        after_id: Option<ElementId>,
        before_id: Option<ElementId>,
        prefer_first: bool,
    ) -> OrdResult<ElementId> {
        let mut guard = self.lock.lock_write("add");
        let result = self.add_locked(&mut *guard, value, after_id, before_id, prefer_first);
        if result.is_ok() {
            self.lock.bump_stamp();
        }
        drop(guard);
        result
    }

    fn add_locked(
        &self,
        guard: &mut Tree<E>,
        value: E,
        after_id: Option<ElementId>,
        before_id: Option<ElementId>,
        prefer_first: bool,
    ) -> OrdResult<ElementId> {
        let cmp = &*self.comparator;

        if let Some(after) = after_id {
            match cmp(guard.value(after)?, &value) {
                Ordering::Greater => return Err(OrdError::IllegalPosition),
                Ordering::Equal => {
                    if self.distinct {
                        return Err(OrdError::ElementExists);
                    }
                    return guard.insert_after(after, value);
                }
                Ordering::Less => {
                    // The hint only names a valid insertion point if `value`
                    // still fits between `after` and whatever currently
                    // follows it: out of order against the successor is
                    // always a bad hint, and in `distinct` mode landing
                    // exactly on the successor's value is too, since that
                    // collides with an element already occupying the spot.
                    if let Some(succ) = guard.adjacent(after, true)? {
                        match cmp(guard.value(succ)?, &value) {
                            Ordering::Less => return Err(OrdError::IllegalPosition),
                            Ordering::Equal if self.distinct => {
                                return Err(OrdError::IllegalPosition)
                            }
                            _ => {}
                        }
                    }
                }
            }
        }
        if let Some(before) = before_id {
            match cmp(&value, guard.value(before)?) {
                Ordering::Greater => return Err(OrdError::IllegalPosition),
                Ordering::Equal => {
                    if self.distinct {
                        return Err(OrdError::ElementExists);
                    }
                    return guard.insert_before(before, value);
                }
                Ordering::Less => {
                    if let Some(pred) = guard.adjacent(before, false)? {
                        match cmp(guard.value(pred)?, &value) {
                            Ordering::Greater => return Err(OrdError::IllegalPosition),
                            Ordering::Equal if self.distinct => {
                                return Err(OrdError::IllegalPosition)
                            }
                            _ => {}
                        }
                    }
                }
            }
        }

        if guard.is_empty() {
            return Ok(guard.push_back(value));
        }

        let found = match guard.find_closest(&|e: &E| cmp(&value, e), true, false) {
            Some(f) => f,
            None => return Ok(guard.push_back(value)),
        };
        let ord_at_found = cmp(&value, guard.value(found)?);
        if ord_at_found == Ordering::Equal {
            if self.distinct {
                return Err(OrdError::ElementExists);
            }
            let mut cur = found;
            loop {
                let next = if prefer_first {
                    guard.adjacent(cur, false)?
                } else {
                    guard.adjacent(cur, true)?
                };
                match next {
                    Some(n) if cmp(guard.value(n)?, &value) == Ordering::Equal => cur = n,
                    _ => break,
                }
            }
            return if prefer_first {
                guard.insert_before(cur, value)
            } else {
                guard.insert_after(cur, value)
            };
        }

        if ord_at_found == Ordering::Less {
            guard.insert_before(found, value)
        } else {
            guard.insert_after(found, value)
        }
    }

    /// Read-only mirror of `add_locked`'s validation: walks the same hint
    /// checks and keeps it in sync whenever those checks change. Only the
    /// refusal paths matter here -- every place `add_locked` would go on to
    /// insert, this returns `None` instead.
    fn can_add_locked(
        &self,
        guard: &Tree<E>,
        value: &E,
        after_id: Option<ElementId>,
        before_id: Option<ElementId>,
    ) -> Option<OrdError> {
        let cmp = &*self.comparator;

        if let Some(after) = after_id {
            let after_value = match guard.value(after) {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            match cmp(after_value, value) {
                Ordering::Greater => return Some(OrdError::IllegalPosition),
                Ordering::Equal => return self.distinct.then_some(OrdError::ElementExists),
                Ordering::Less => match guard.adjacent(after, true) {
                    Ok(Some(succ)) => {
                        let succ_value = match guard.value(succ) {
                            Ok(v) => v,
                            Err(e) => return Some(e),
                        };
                        match cmp(succ_value, value) {
                            Ordering::Less => return Some(OrdError::IllegalPosition),
                            Ordering::Equal if self.distinct => {
                                return Some(OrdError::IllegalPosition)
                            }
                            _ => {}
                        }
                    }
                    Ok(None) => {}
                    Err(e) => return Some(e),
                },
            }
        }
        if let Some(before) = before_id {
            let before_value = match guard.value(before) {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            match cmp(value, before_value) {
                Ordering::Greater => return Some(OrdError::IllegalPosition),
                Ordering::Equal => return self.distinct.then_some(OrdError::ElementExists),
                Ordering::Less => match guard.adjacent(before, false) {
                    Ok(Some(pred)) => {
                        let pred_value = match guard.value(pred) {
                            Ok(v) => v,
                            Err(e) => return Some(e),
                        };
                        match cmp(pred_value, value) {
                            Ordering::Greater => return Some(OrdError::IllegalPosition),
                            Ordering::Equal if self.distinct => {
                                return Some(OrdError::IllegalPosition)
                            }
                            _ => {}
                        }
                    }
                    Ok(None) => {}
                    Err(e) => return Some(e),
                },
            }
        }

        if guard.is_empty() {
            return None;
        }
        let found = guard.find_closest(&|e: &E| cmp(value, e), true, false)?;
        let found_value = match guard.value(found) {
            Ok(v) => v,
            Err(e) => return Some(e),
        };
        if cmp(value, found_value) == Ordering::Equal && self.distinct {
            return Some(OrdError::ElementExists);
        }
        None
    }

    /// Reports whether `add(value, after_id, before_id, ..)` would succeed,
    /// without inserting anything.
    pub fn can_add(
        &self,
        value: &E,
        after_id: Option<ElementId>,
        before_id: Option<ElementId>,
    ) -> Option<OrdError> {
        let guard = self.lock.lock_read("can_add");
        self.can_add_locked(&guard, value, after_id, before_id)
    }

    pub fn remove(&self, id: ElementId) -> OrdResult<E> {
        let mut guard = self.lock.lock_write("remove");
        let value = guard.remove(id)?;
        self.lock.bump_stamp();
        drop(guard);
        Ok(value)
    }

    /// Reports whether `remove(id)` would succeed, without removing
    /// anything.
    pub fn can_remove(&self, id: ElementId) -> Option<OrdError> {
        self.lock.lock_read("can_remove").value(id).err()
    }

    /// Applies `f` to the value at `id` in place -- used by
    /// [`crate::Entry`] to replace a map entry's value without disturbing
    /// key order.
    pub fn update<F: FnOnce(&mut E)>(&self, id: ElementId, f: F) -> OrdResult<()> {
        self.lock.lock_write("update").update_value(id, f)
    }

    /// Reports whether `update(id, ..)` would succeed, without touching the
    /// value; same precondition as `can_remove` since both require only
    /// that `id` still names a live node.
    pub fn can_update(&self, id: ElementId) -> Option<OrdError> {
        self.can_remove(id)
    }

    /// No-op if `id` already sits within the `after_id`/`before_id` bounds;
    /// otherwise removes and re-adds it using those bounds.
    pub fn move_element(
        &self,
        id: ElementId,
        after_id: Option<ElementId>,
        before_id: Option<ElementId>,
        prefer_first: bool,
    ) -> OrdResult<ElementId> {
        let mut guard = self.lock.lock_write("move_element");
        let after_ok = match after_id {
            Some(a) => guard.compare(id, a)? == Ordering::Greater,
            None => true,
        };
        let before_ok = match before_id {
            Some(b) => guard.compare(id, b)? == Ordering::Less,
            None => true,
        };
        if after_ok && before_ok {
            return Ok(id);
        }
        let value = guard.remove(id)?;
        self.lock.bump_stamp();
        drop(guard);
        self.add(value, after_id, before_id, prefer_first)
    }

    pub fn check_consistency(&self) -> bool {
        let guard = self.lock.lock_read("check_consistency");
        guard.consistency_check(&*self.comparator, self.distinct)
    }

    /// Restores sortedness after external mutation of a value's sort key;
    /// see [`Tree::repair`].
    pub fn repair(&self, listener: &mut dyn RepairListener<E>) -> RepairReport {
        let mut guard = self.lock.lock_write("repair");
        let report = guard.repair(&*self.comparator, self.distinct, listener);
        self.lock.bump_stamp();
        drop(guard);
        report
    }

    /// A reversed view over this list's position- and adjacency-based
    /// queries -- see [`Reversed`]. Ordering-driven operations (`search`,
    /// `index_for`, `add`) are unaffected by reversal, since they are
    /// defined against the comparator, not tree position, so they stay on
    /// `self` rather than being mirrored here.
    pub fn reversed(&self) -> Reversed<'_, E> {
        Reversed { inner: self }
    }
}

/// Flips position and adjacency queries over a [`SortedList`]/[`SortedSet`]
/// the same way [`crate::ReversedList`] does for a plain [`crate::List`] --
/// see that type's docs for the general shape. Kept as a second, concrete
/// wrapper rather than a shared generic one: `List` and `SortedList` have no
/// common trait to abstract over today, and neither did before this wrapper
/// existed.
pub struct Reversed<'a, E> {
    inner: &'a SortedList<E>,
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

    struct IntProbe(i32);
    impl SearchComparable<i32> for IntProbe {
        fn compare(&self, candidate: &i32) -> Ordering {
            self.0.cmp(candidate)
        }
    }

    #[test]
    fn distinct_rejects_duplicate() {
        let set: SortedSet<i32> = SortedList::new_set(|a, b| a.cmp(b));
        set.add(5, None, None, true).unwrap();
        set.add(3, None, None, true).unwrap();
        set.add(9, None, None, true).unwrap();
        assert!(matches!(
            set.add(5, None, None, true),
            Err(OrdError::ElementExists)
        ));

        let values: Vec<_> = (0..set.size()).map(|i| set.value_at(i).unwrap()).collect();
        assert_eq!(values, vec![3, 5, 9]);

        let id3 = set.element_at(0).unwrap();
        assert!(matches!(
            set.add(5, Some(id3), None, true),
            Err(OrdError::IllegalPosition)
        ));
    }

    #[test]
    fn can_add_and_can_remove_report_without_mutating() {
        let set: SortedSet<i32> = SortedList::new_set(|a, b| a.cmp(b));
        let id3 = set.add(3, None, None, true).unwrap();
        set.add(5, None, None, true).unwrap();
        set.add(9, None, None, true).unwrap();

        assert_eq!(set.can_add(&7, None, None), None);
        assert_eq!(set.can_add(&5, None, None), Some(OrdError::ElementExists));
        assert_eq!(
            set.can_add(&5, Some(id3), None),
            Some(OrdError::IllegalPosition)
        );
        assert_eq!(set.size(), 3, "can_add must not mutate");

        assert_eq!(set.can_remove(id3), None);
        set.remove(id3).unwrap();
        assert_eq!(set.can_remove(id3), Some(OrdError::AlreadyRemoved));
        assert_eq!(set.can_update(id3), Some(OrdError::AlreadyRemoved));
    }

    #[test]
    fn non_distinct_duplicate_placement() {
        let list = SortedList::new(|a: &i32, b: &i32| a.cmp(b));
        list.add(1, None, None, true).unwrap();
        list.add(2, None, None, true).unwrap();
        list.add(2, None, None, true).unwrap();
        list.add(2, None, None, true).unwrap();
        list.add(3, None, None, true).unwrap();

        let values: Vec<_> = (0..list.size()).map(|i| list.value_at(i).unwrap()).collect();
        assert_eq!(values, vec![1, 2, 2, 2, 3]);

        list.add(2, None, None, false).unwrap();
        let values: Vec<_> = (0..list.size()).map(|i| list.value_at(i).unwrap()).collect();
        assert_eq!(values, vec![1, 2, 2, 2, 2, 3]);
        assert_eq!(values[4], 2);
    }

    #[test]
    fn search_and_index_for() {
        let set: SortedSet<i32> = SortedList::new_set(|a, b| a.cmp(b));
        for v in [10, 20, 30, 40] {
            set.add(v, None, None, true).unwrap();
        }

        let exact = set.search(&IntProbe(30), SearchFilter::Exact).unwrap();
        assert_eq!(set.get(exact).unwrap(), 30);
        assert!(set.search(&IntProbe(25), SearchFilter::Exact).is_none());

        let less = set.search(&IntProbe(25), SearchFilter::LessStrict).unwrap();
        assert_eq!(set.get(less).unwrap(), 20);
        let greater = set
            .search(&IntProbe(25), SearchFilter::GreaterStrict)
            .unwrap();
        assert_eq!(set.get(greater).unwrap(), 30);

        assert_eq!(set.index_for(&IntProbe(30)), 2);
        assert_eq!(set.index_for(&IntProbe(25)), -(2 + 1));
    }

    /// §8: repair is idempotent on an already-consistent tree.
    struct NullListener;
    impl RepairListener<i32> for NullListener {
        fn removed(&mut self, _id: ElementId) {}
        fn transferred(&mut self, _id: ElementId, _new_position: ElementId) {}
        fn disposed(&mut self, _value: i32, _near: ElementId) {}
    }

    #[test]
    fn repair_is_idempotent_on_a_consistent_list() {
        let _ = env_logger::builder().is_test(true).try_init();

        let set: SortedSet<i32> = SortedList::new_set(|a, b| a.cmp(b));
        for v in [10, 20, 30, 40, 50] {
            set.add(v, None, None, true).unwrap();
        }
        assert!(set.check_consistency());

        let mut listener = NullListener;
        let report = set.repair(&mut listener);
        assert!(!report.found_any());
        assert!(set.check_consistency());
    }

    #[test]
    fn reversed_flips_position_queries() {
        let set: SortedSet<i32> = SortedList::new_set(|a, b| a.cmp(b));
        for v in [10, 20, 30, 40, 50] {
            set.add(v, None, None, true).unwrap();
        }
        let rev = set.reversed();
        let values: Vec<_> = (0..rev.size()).map(|i| rev.value_at(i).unwrap()).collect();
        assert_eq!(values, vec![50, 40, 30, 20, 10]);
        assert_eq!(rev.get(rev.terminal(true).unwrap()).unwrap(), 50);
        assert_eq!(rev.get(rev.terminal(false).unwrap()).unwrap(), 10);

        let id30 = set.element_at(2).unwrap();
        assert_eq!(rev.elements_before(id30).unwrap(), set.elements_after(id30).unwrap());
    }

    /// §8/§4.2: when repair's reinsertion of a displaced value collides with
    /// an equal element already in place, `distinct` mode disposes of it
    /// rather than relocating it -- `RepairListener::disposed` fires instead
    /// of `transferred`.
    #[test]
    fn repair_disposes_value_that_collides_after_external_mutation() {
        use std::{cell::RefCell, rc::Rc};

        let _ = env_logger::builder().is_test(true).try_init();

        let set: SortedSet<Rc<RefCell<i32>>> = SortedList::new_set(|a, b| a.borrow().cmp(&b.borrow()));
        let keys: Vec<_> = [1, 2, 3, 4].into_iter().map(|v| Rc::new(RefCell::new(v))).collect();
        for k in &keys {
            set.add(k.clone(), None, None, true).unwrap();
        }
        assert!(set.check_consistency());

        // Mutate `2` to collide with the already-present `3`.
        *keys[1].borrow_mut() = 3;
        assert!(!set.check_consistency());

        struct Listener {
            disposed: usize,
            relocated: usize,
        }
        impl RepairListener<Rc<RefCell<i32>>> for Listener {
            fn removed(&mut self, _id: ElementId) {}
            fn transferred(&mut self, _id: ElementId, _new_position: ElementId) {
                self.relocated += 1;
            }
            fn disposed(&mut self, _value: Rc<RefCell<i32>>, _near: ElementId) {
                self.disposed += 1;
            }
        }

        let mut listener = Listener { disposed: 0, relocated: 0 };
        let report = set.repair(&mut listener);
        assert_eq!(report.disposed, 1);
        assert_eq!(listener.disposed, 1);
        assert_eq!(report.relocated, 0);
        assert_eq!(listener.relocated, 0);
        assert!(set.check_consistency());
        assert_eq!(set.size(), 3);
    }
}
