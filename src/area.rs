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

//! The runtime area table.
//!
//! An [`Area`] here is a table slot, addressed by its position in
//! [`crate::restore::Fs`]'s area vector (this is the `area_idx` stamped on
//! every [`crate::Inode`]/[`crate::Block`]). It is distinct from the
//! on-flash `area_id` in [`crate::disk::AreaHeader`]: the logical identity
//! a data area keeps across garbage-collection cycles, or
//! [`crate::disk::AREA_ID_NONE`] for the scratch area. Two data areas must
//! never carry the same `area_id` outside of a garbage-collection
//! interruption (see [`crate::restore::repair`]).

use crate::object::AREA_ID_NONE;

/// One flash area known to a restored filesystem.
#[derive(Debug, Clone, Copy)]
pub struct Area {
	/// Index into the [`crate::flash::FlashRead`] source this area reads from.
	pub flash_area: u16,
	/// On-flash logical id, or [`crate::disk::AREA_ID_NONE`] for scratch.
	pub area_id: u16,
	/// Garbage-collection sequence number from this area's header.
	pub gc_seq: u32,
	/// Declared length of the area, in bytes.
	pub length: u32,
	/// Write cursor: offset of the first byte not yet known to hold a
	/// record, used only while scanning.
	pub cur: u32,
}

impl Area {
	pub fn is_scratch(&self) -> bool {
		self.area_id == AREA_ID_NONE
	}
}
