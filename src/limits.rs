/*
 * Copyright 2026 The ffs Authors
 *
 * This file is part of ffs.
 *
 * ffs is free software: you can redistribute it and/or modify it under the
 * terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or (at your option) any later
 * version.
 *
 * ffs is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR
 * A PARTICULAR PURPOSE. See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * ffs. If not, see <https://www.gnu.org/licenses/>.
 */

//! Resource bounds a caller places on a restored filesystem.

/// Bounds restore's memory use the same way the allocator pools of the
/// original target bound it: by rejecting allocation past a fixed capacity
/// rather than growing without limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
	/// Maximum number of flash areas, including the scratch area.
	pub max_areas: usize,
	/// Maximum number of live inodes the object index may hold at once.
	pub inode_pool_capacity: usize,
	/// Maximum number of live data blocks the object index may hold at once.
	pub block_pool_capacity: usize,
	/// Capacity of the diagnostics ring, see [`crate::RestoreLog`].
	pub log_capacity: usize,
}

impl Default for Limits {
	fn default() -> Self {
		Limits {
			max_areas: 16,
			inode_pool_capacity: 4096,
			block_pool_capacity: 16384,
			log_capacity: 256,
		}
	}
}
