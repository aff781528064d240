/*
 * This file is a part of Ordix
 *
 * Ordix is an order-statistic red-black tree and the family of ordered
 * container abstractions built directly on it: an insertion-ordered indexed
 * list, a sorted list (optionally distinct, i.e. a sorted set), and a sorted
 * map / multi-map derived from the sorted set via a key-comparing adapter.
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
#![allow(clippy::type_complexity)]

mod engine;

pub use engine::idx::{
    error::{OrdError, OrdResult},
    list::{List, ListConfig},
    map::{Entry, KeySet, MapEntry, SortedMap, SortedMapConfig, SortedMultiMap, SortedMultiMapConfig},
    sortedlist::{SearchFilter, SortedList, SortedListConfig, SortedSet},
    spliter::Spliterator,
    tree::arena::ElementId,
    RepairListener, RepairReport,
};
pub use engine::idx::list::Reversed as ReversedList;
pub use engine::idx::sortedlist::Reversed as ReversedSortedList;
pub use engine::sync::lock::{FastFailLock, Locker, StampedRwLock};
