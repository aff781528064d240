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

#![allow(dead_code)]

pub(crate) mod idx;
pub(crate) mod mem;
pub(crate) mod sync;

/*
    A word on tests:

    Most of the invariant checks here (red-black depth, size augmentation,
    adjacency order) only mean anything at a quiescent point between public
    calls -- rotations and swaps pass through states that violate them on
    purpose. Don't go looking for them mid-rotation.
*/
