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

//! `SortedMap<K, V>` / `SortedMultiMap<K, V>`: thin adapters over a
//! [`SortedSet`] whose values are key-carrying [`Entry`] records, ordered by
//! a comparator over `K` alone. Neither type owns any tree logic of its own
//! -- every structural operation is a [`SortedList`]/[`SortedSet`] call with
//! an `Entry` projected in or out at the boundary.

use {
    super::{
        error::OrdResult,
        sortedlist::{SortedList, SortedListConfig, SortedSet},
        tree::arena::ElementId,
        RepairListener, RepairReport, SearchComparable,
    },
    core::cmp::Ordering,
    std::sync::Arc,
};

/// A single key/value record as stored inside a [`SortedMap`]'s underlying
/// set. Ordering (via the map's comparator) only ever looks at `key`; two
/// entries with equal keys are the same map slot.
pub struct Entry<K, V> {
    key: K,
    value: V,
}

impl<K, V> Entry<K, V> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }
}

/// Compares a bare probe key against a stored [`Entry`]'s key, so lookups
/// never have to materialize a dummy `V` just to search for a `K`.
struct KeyProbe<'a, K> {
    key: &'a K,
    cmp: &'a (dyn Fn(&K, &K) -> Ordering + Send + Sync),
}

impl<'a, K, V> SearchComparable<Entry<K, V>> for KeyProbe<'a, K> {
    fn compare(&self, candidate: &Entry<K, V>) -> Ordering {
        (self.cmp)(self.key, &candidate.key)
    }
}

fn entry_comparator<K, V>(
    key_cmp: Arc<dyn Fn(&K, &K) -> Ordering + Send + Sync>,
) -> impl Fn(&Entry<K, V>, &Entry<K, V>) -> Ordering + Send + Sync {
    move |a, b| key_cmp(&a.key, &b.key)
}

pub struct SortedMapConfig<K, V> {
    pub safe: bool,
    pub comparator: Arc<dyn Fn(&K, &K) -> Ordering + Send + Sync>,
    pub description: Option<String>,
    pub initial_values: Option<Vec<(K, V)>>,
    /// Governs [`KeySet::add`]: `true` lets the key view insert a fresh key
    /// with `V::default()`; `false` makes it `UnsupportedOperation`, per §6's
    /// "add with default value or unsupported (configurable)".
    pub keyset_insert: bool,
}

impl<K, V> SortedMapConfig<K, V> {
    pub fn new(comparator: impl Fn(&K, &K) -> Ordering + Send + Sync + 'static) -> Self {
        Self {
            safe: true,
            comparator: Arc::new(comparator),
            description: None,
            initial_values: None,
            keyset_insert: false,
        }
    }
}

/// A sorted map: a [`SortedSet`] of [`Entry`] records, distinct and ordered
/// by key. Values may be replaced in place (non-structural, §5) without
/// disturbing key order.
pub struct SortedMap<K, V> {
    set: SortedSet<Entry<K, V>>,
    key_cmp: Arc<dyn Fn(&K, &K) -> Ordering + Send + Sync>,
    keyset_insert: bool,
}

impl<K, V> SortedMap<K, V> {
    pub fn new(comparator: impl Fn(&K, &K) -> Ordering + Send + Sync + 'static) -> Self {
        Self::with_config(SortedMapConfig::new(comparator))
    }

    pub fn with_config(config: SortedMapConfig<K, V>) -> Self {
        let key_cmp = config.comparator;
        let entry_cmp = entry_comparator::<K, V>(key_cmp.clone());
        let mut set_config = SortedListConfig::new(entry_cmp);
        set_config.safe = config.safe;
        set_config.distinct = true;
        set_config.description = config.description;
        set_config.initial_values = config
            .initial_values
            .map(|pairs| pairs.into_iter().map(|(key, value)| Entry { key, value }).collect());
        Self {
            set: SortedList::with_config(set_config),
            key_cmp,
            keyset_insert: config.keyset_insert,
        }
    }

    pub fn size(&self) -> usize {
        self.set.size()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    fn probe<'a>(&'a self, key: &'a K) -> KeyProbe<'a, K> {
        KeyProbe {
            key,
            cmp: &*self.key_cmp,
        }
    }

    fn find(&self, key: &K) -> Option<ElementId> {
        self.set
            .search(&self.probe(key), super::sortedlist::SearchFilter::Exact)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let id = self.find(key)?;
        self.set.get_with(id, |e| e.value.clone()).ok()
    }

    /// Inserts `value` under `key`, replacing and returning the previous
    /// value if the key was already present; otherwise adds a new entry and
    /// returns `None`. The replace path is an in-place [`SortedList::update`]
    /// -- it never touches tree structure.
    pub fn put(&self, key: K, value: V) -> OrdResult<Option<V>> {
        if let Some(id) = self.find(&key) {
            let mut old = None;
            self.set.update(id, |e| old = Some(core::mem::replace(&mut e.value, value)))?;
            return Ok(old);
        }
        self.set.add(Entry { key, value }, None, None, true)?;
        Ok(None)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let id = self.find(key)?;
        self.set.remove(id).ok().map(|e| e.value)
    }

    /// Reports whether `put(key, ..)` would overwrite an existing entry
    /// (`Some(true)`) or insert a new one (`Some(false)`), without touching
    /// the map. `put` on a plain key/value map has no placement hint to
    /// reject, so unlike [`SortedList::can_add`] this never returns an
    /// error -- it only distinguishes the two outcomes `put` can have.
    pub fn would_replace(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// A handle for in-place value replacement or removal of the entry at
    /// `key`, without a second lookup for each operation. Returns `None` if
    /// no entry matches.
    pub fn entry(&self, key: &K) -> Option<MapEntry<'_, K, V>> {
        let id = self.find(key)?;
        Some(MapEntry { map: self, id })
    }

    /// Snapshot of every value in entry (key) order -- a plain `Vec`, not a
    /// composed view (view composition beyond the key set is out of scope).
    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        (0..self.set.size())
            .filter_map(|i| self.set.element_at(i).ok())
            .filter_map(|id| self.set.get_with(id, |e| e.value.clone()).ok())
            .collect()
    }

    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        (0..self.set.size())
            .filter_map(|i| self.set.element_at(i).ok())
            .filter_map(|id| self.set.get_with(id, |e| e.key.clone()).ok())
            .collect()
    }

    /// A read-only sorted-set view over this map's keys, per §4.5.
    pub fn key_set(&self) -> KeySet<'_, K, V> {
        KeySet { map: self }
    }

    pub fn check_consistency(&self) -> bool {
        self.set.check_consistency()
    }

    /// Restores key order after a caller mutated a key's sort-relevant state
    /// in place without going through this map's API (§8 S6) -- delegates
    /// straight to the underlying set's repair, since its `ElementId`
    /// namespace already *is* this map's entry-identifier namespace; no
    /// wrapping is needed.
    pub fn repair(&self, listener: &mut dyn RepairListener<Entry<K, V>>) -> RepairReport {
        self.set.repair(listener)
    }
}

/// A read-only sorted-set view over a [`SortedMap`]'s keys. Indexing and
/// ordering delegate entirely to the map's entry set; the only operation
/// that can mutate anything is [`KeySet::add`], and only when the map was
/// configured with `keyset_insert: true`.
pub struct KeySet<'a, K, V> {
    map: &'a SortedMap<K, V>,
}

impl<'a, K, V> KeySet<'a, K, V> {
    pub fn size(&self) -> usize {
        self.map.size()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn key_at(&self, index: usize) -> OrdResult<K>
    where
        K: Clone,
    {
        let id = self.map.set.element_at(index)?;
        self.map.set.get_with(id, |e| e.key.clone())
    }

    pub fn index_for(&self, key: &K) -> isize {
        self.map.set.index_for(&self.map.probe(key))
    }

    /// Inserts `key` with `V::default()` if `keyset_insert` was enabled at
    /// construction; otherwise this is `UnsupportedOperation`.
    pub fn add(&self, key: K) -> OrdResult<ElementId>
    where
        V: Default,
    {
        if !self.map.keyset_insert {
            return Err(super::error::OrdError::UnsupportedOperation);
        }
        self.map.set.add(
            Entry {
                key,
                value: V::default(),
            },
            None,
            None,
            true,
        )
    }

    /// Reports whether `add(key)` would succeed, without inserting
    /// anything.
    pub fn can_add(&self, key: &K) -> Option<super::error::OrdError>
    where
        K: Clone,
        V: Default,
    {
        if !self.map.keyset_insert {
            return Some(super::error::OrdError::UnsupportedOperation);
        }
        self.map.set.can_add(
            &Entry {
                key: key.clone(),
                value: V::default(),
            },
            None,
            None,
        )
    }
}

/// A mutable handle onto one [`SortedMap`] entry, obtained from
/// [`SortedMap::entry`]. Holds the entry's [`ElementId`] rather than a
/// reference to its value, so it stays cheap to carry around and re-checks
/// liveness (`AlreadyRemoved`) on every access rather than assuming the
/// entry is still there.
pub struct MapEntry<'a, K, V> {
    map: &'a SortedMap<K, V>,
    id: ElementId,
}

impl<'a, K, V> MapEntry<'a, K, V> {
    pub fn key(&self) -> OrdResult<K>
    where
        K: Clone,
    {
        self.map.set.get_with(self.id, |e| e.key.clone())
    }

    pub fn value(&self) -> OrdResult<V>
    where
        V: Clone,
    {
        self.map.set.get_with(self.id, |e| e.value.clone())
    }

    /// Replaces the value in place, returning the previous one. Does not
    /// touch key order or bump the structure stamp.
    pub fn set_value(&self, value: V) -> OrdResult<V> {
        let mut old = None;
        self.map
            .set
            .update(self.id, |e| old = Some(core::mem::replace(&mut e.value, value)))?;
        Ok(old.expect("update ran its closure on success"))
    }

    /// Removes this entry from the underlying set.
    pub fn remove(self) -> OrdResult<V> {
        self.map.set.remove(self.id).map(|e| e.value)
    }

    /// Reports whether `set_value`/`remove` would succeed on this handle,
    /// without touching the entry. Both require only that the underlying
    /// id still names a live node, so one check serves either caller.
    pub fn can_mutate(&self) -> Option<super::error::OrdError> {
        self.map.set.can_update(self.id)
    }
}

pub struct SortedMultiMapConfig<K, V> {
    pub safe: bool,
    pub comparator: Arc<dyn Fn(&K, &K) -> Ordering + Send + Sync>,
    pub description: Option<String>,
    pub initial_values: Option<Vec<(K, V)>>,
}

impl<K, V> SortedMultiMapConfig<K, V> {
    pub fn new(comparator: impl Fn(&K, &K) -> Ordering + Send + Sync + 'static) -> Self {
        Self {
            safe: true,
            comparator: Arc::new(comparator),
            description: None,
            initial_values: None,
        }
    }
}

/// A sorted multi-map: one distinct entry per key, each entry's value a
/// `Vec<V>` group -- the simplest concrete instance of the "per-key
/// collection" §4.5 calls an external collaborator. The set of keys is
/// reused verbatim from [`SortedMap`]'s machinery; only the put/remove
/// surface differs to operate on groups instead of single values.
pub struct SortedMultiMap<K, V> {
    set: SortedSet<Entry<K, Vec<V>>>,
    key_cmp: Arc<dyn Fn(&K, &K) -> Ordering + Send + Sync>,
}

impl<K, V> SortedMultiMap<K, V> {
    pub fn new(comparator: impl Fn(&K, &K) -> Ordering + Send + Sync + 'static) -> Self {
        Self::with_config(SortedMultiMapConfig::new(comparator))
    }

    pub fn with_config(config: SortedMultiMapConfig<K, V>) -> Self {
        let key_cmp = config.comparator;
        let entry_cmp = entry_comparator::<K, Vec<V>>(key_cmp.clone());
        let mut set_config = SortedListConfig::new(entry_cmp);
        set_config.safe = config.safe;
        set_config.distinct = true;
        set_config.description = config.description;
        set_config.initial_values = config.initial_values.map(|pairs| {
            let mut groups: Vec<Entry<K, Vec<V>>> = Vec::new();
            'outer: for (key, value) in pairs {
                for g in groups.iter_mut() {
                    if key_cmp(&g.key, &key) == Ordering::Equal {
                        g.value.push(value);
                        continue 'outer;
                    }
                }
                groups.push(Entry {
                    key,
                    value: vec![value],
                });
            }
            groups
        });
        Self {
            set: SortedList::with_config(set_config),
            key_cmp,
        }
    }

    pub fn key_count(&self) -> usize {
        self.set.size()
    }

    fn probe<'a>(&'a self, key: &'a K) -> KeyProbe<'a, K> {
        KeyProbe {
            key,
            cmp: &*self.key_cmp,
        }
    }

    fn find(&self, key: &K) -> Option<ElementId> {
        self.set
            .search(&self.probe(key), super::sortedlist::SearchFilter::Exact)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Appends `value` to `key`'s group, creating a new single-value group
    /// if the key is not yet present.
    pub fn put(&self, key: K, value: V) -> OrdResult<()> {
        if let Some(id) = self.find(&key) {
            return self.set.update(id, |e| e.value.push(value));
        }
        self.set
            .add(Entry { key, value: vec![value] }, None, None, true)?;
        Ok(())
    }

    pub fn get_all(&self, key: &K) -> Vec<V>
    where
        V: Clone,
    {
        self.find(key)
            .and_then(|id| self.set.get_with(id, |e| e.value.clone()).ok())
            .unwrap_or_default()
    }

    pub fn count(&self, key: &K) -> usize {
        self.find(key)
            .and_then(|id| self.set.get_with(id, |e| e.value.len()).ok())
            .unwrap_or(0)
    }

    /// Removes the entire group for `key`, returning its values.
    pub fn remove_key(&self, key: &K) -> Vec<V> {
        match self.find(key) {
            Some(id) => self.set.remove(id).map(|e| e.value).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Removes every value in `key`'s group equal to `value`, dropping the
    /// whole entry if the group becomes empty. Returns the number removed.
    pub fn remove_value(&self, key: &K, value: &V) -> usize
    where
        V: PartialEq,
    {
        let Some(id) = self.find(key) else {
            return 0;
        };
        let mut removed = 0;
        let mut now_empty = false;
        let _ = self.set.update(id, |e| {
            let before = e.value.len();
            e.value.retain(|v| v != value);
            removed = before - e.value.len();
            now_empty = e.value.is_empty();
        });
        if now_empty {
            let _ = self.set.remove(id);
        }
        removed
    }

    pub fn key_set(&self) -> Vec<K>
    where
        K: Clone,
    {
        (0..self.set.size())
            .filter_map(|i| self.set.element_at(i).ok())
            .filter_map(|id| self.set.get_with(id, |e| e.key.clone()).ok())
            .collect()
    }

    pub fn check_consistency(&self) -> bool {
        self.set.check_consistency()
    }

    pub fn repair(&self, listener: &mut dyn RepairListener<Entry<K, Vec<V>>>) -> RepairReport {
        self.set.repair(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    #[test]
    fn put_get_replace() {
        let map: SortedMap<i32, &str> = SortedMap::new(|a, b| a.cmp(b));
        assert_eq!(map.put(1, "a").unwrap(), None);
        assert_eq!(map.put(2, "b").unwrap(), None);
        assert_eq!(map.get(&1), Some("a"));
        assert_eq!(map.put(1, "z").unwrap(), Some("a"));
        assert_eq!(map.get(&1), Some("z"));
        assert_eq!(map.size(), 2);
    }

    #[test]
    fn entry_handle_set_and_remove() {
        let map: SortedMap<i32, i32> = SortedMap::new(|a, b| a.cmp(b));
        map.put(1, 10).unwrap();
        let entry = map.entry(&1).unwrap();
        assert_eq!(entry.set_value(20).unwrap(), 10);
        assert_eq!(map.get(&1), Some(20));
        let entry = map.entry(&1).unwrap();
        assert_eq!(entry.remove().unwrap(), 20);
        assert!(map.get(&1).is_none());
    }

    #[test]
    fn key_set_view() {
        let map: SortedMap<i32, i32> = SortedMap::new(|a, b| a.cmp(b));
        for k in [5, 1, 3] {
            map.put(k, k * 10).unwrap();
        }
        let ks = map.key_set();
        assert_eq!(ks.size(), 3);
        assert_eq!(ks.key_at(0).unwrap(), 1);
        assert_eq!(ks.key_at(2).unwrap(), 5);
        assert_eq!(ks.index_for(&3), 1);
        assert!(matches!(
            ks.add(9),
            Err(super::super::error::OrdError::UnsupportedOperation)
        ));
        assert!(matches!(
            ks.can_add(&9),
            Some(super::super::error::OrdError::UnsupportedOperation)
        ));
    }

    #[test]
    fn map_entry_and_keyset_can_predicates_report_without_mutating() {
        use super::super::error::OrdError;

        let mut config = SortedMapConfig::new(|a: &i32, b: &i32| a.cmp(b));
        config.keyset_insert = true;
        let map: SortedMap<i32, i32> = SortedMap::with_config(config);
        map.put(1, 10).unwrap();

        let ks = map.key_set();
        assert_eq!(ks.can_add(&1), Some(OrdError::ElementExists));
        assert_eq!(ks.can_add(&2), None);
        assert_eq!(ks.size(), 1, "can_add must not mutate");

        let entry = map.entry(&1).unwrap();
        assert_eq!(entry.can_mutate(), None);
        entry.remove().unwrap();

        assert!(!map.would_replace(&1));
        map.put(2, 20).unwrap();
        assert!(map.would_replace(&2));
    }

    #[test]
    fn multimap_groups_by_key() {
        let mm: SortedMultiMap<i32, &str> = SortedMultiMap::new(|a, b| a.cmp(b));
        mm.put(1, "a").unwrap();
        mm.put(1, "b").unwrap();
        mm.put(2, "c").unwrap();
        assert_eq!(mm.key_count(), 2);
        assert_eq!(mm.count(&1), 2);
        assert_eq!(mm.get_all(&1), vec!["a", "b"]);

        assert_eq!(mm.remove_value(&1, &"a"), 1);
        assert_eq!(mm.get_all(&1), vec!["b"]);
        assert_eq!(mm.remove_value(&1, &"b"), 1);
        assert!(!mm.contains_key(&1));
        assert_eq!(mm.key_count(), 1);
    }

    /// §8 S6: a mutable key record changes out from under the map; the map
    /// detects and repairs the resulting disorder.
    #[test]
    fn repair_after_external_key_mutation() {
        let _ = env_logger::builder().is_test(true).try_init();

        struct Listener {
            removed: Vec<ElementId>,
            transferred: Vec<(ElementId, ElementId)>,
        }
        impl RepairListener<Entry<Rc<RefCell<i32>>, &'static str>> for Listener {
            fn removed(&mut self, id: ElementId) {
                self.removed.push(id);
            }
            fn transferred(&mut self, id: ElementId, new_position: ElementId) {
                self.transferred.push((id, new_position));
            }
            fn disposed(&mut self, _value: Entry<Rc<RefCell<i32>>, &'static str>, _near: ElementId) {
                panic!("distinct keys should never collide in this test");
            }
        }

        let map: SortedMap<Rc<RefCell<i32>>, &str> =
            SortedMap::new(|a, b| a.borrow().cmp(&b.borrow()));

        let k1 = Rc::new(RefCell::new(1));
        let k2 = Rc::new(RefCell::new(2));
        let k5 = Rc::new(RefCell::new(5));
        let k8 = Rc::new(RefCell::new(8));
        map.put(k1.clone(), "a").unwrap();
        map.put(k2.clone(), "b").unwrap();
        map.put(k5.clone(), "c").unwrap();
        map.put(k8.clone(), "d").unwrap();

        assert!(map.check_consistency());
        *k2.borrow_mut() = 6;
        assert!(!map.check_consistency());

        let mut listener = Listener {
            removed: Vec::new(),
            transferred: Vec::new(),
        };
        let report = map.repair(&mut listener);
        assert_eq!(report.relocated, 1);
        assert_eq!(report.disposed, 0);
        assert_eq!(listener.removed.len(), 1);
        assert_eq!(listener.transferred.len(), 1);

        assert!(map.check_consistency());
        let keys = map.keys().into_iter().map(|k| *k.borrow()).collect::<Vec<_>>();
        assert_eq!(keys, vec![1, 5, 6, 8]);
        assert_eq!(map.get(&k2), Some("b"));
    }
}
