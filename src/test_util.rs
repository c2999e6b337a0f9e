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

//! A flash image builder for tests, kept behind `test-util` so downstream
//! crates exercising this one don't need to re-implement the wire format.
//!
//! Records are appended through [`crate::disk`]'s own encode routines, the
//! same ones a real writer would use, so a test image can never drift from
//! what the restore core actually parses.

use crate::disk::{AREA_ID_NONE, AreaHeader, DiskBlock, DiskInode, AREA_HEADER_LEN};
use crate::object::Flags;
use crate::restore::AreaDesc;

pub use crate::flash::SliceFlash;

/// Incrementally builds a set of flash area images for a test.
pub struct FlashImageBuilder {
	areas: Vec<Vec<u8>>,
	lens: Vec<usize>,
}

impl FlashImageBuilder {
	pub fn new() -> Self {
		FlashImageBuilder {
			areas: Vec::new(),
			lens: Vec::new(),
		}
	}

	/// Adds a data area of `len` bytes, identified by its position among
	/// the data areas added so far, and returns its area index.
	pub fn data_area(&mut self, len: usize) -> usize {
		self.push_area(self.areas.len() as u16, 0, len)
	}

	/// Adds a data area carrying an explicit `area_id`/`gc_seq`, for tests
	/// that need to construct a specific garbage-collection scenario.
	pub fn data_area_with(&mut self, area_id: u16, gc_seq: u32, len: usize) -> usize {
		self.push_area(area_id, gc_seq, len)
	}

	/// Adds a scratch area of `len` bytes.
	pub fn scratch_area(&mut self, len: usize) -> usize {
		self.push_area(AREA_ID_NONE, 0, len)
	}

	fn push_area(&mut self, area_id: u16, gc_seq: u32, len: usize) -> usize {
		let idx = self.areas.len();
		let mut buf = AreaHeader { area_id, gc_seq }.encode().to_vec();
		buf.resize(len, 0xFF);
		self.areas.push(buf);
		self.lens.push(len);
		idx
	}

	fn cursor(&self, area_idx: usize) -> usize {
		self.areas[area_idx]
			.iter()
			.rposition(|&b| b != 0xFF)
			.map(|last_non_erased| last_non_erased + 1)
			.unwrap_or(AREA_HEADER_LEN)
	}

	fn append(&mut self, area_idx: usize, record: &[u8]) {
		let at = self.cursor(area_idx);
		let end = at + record.len();
		assert!(end <= self.lens[area_idx], "record does not fit in area");
		self.areas[area_idx][at..end].copy_from_slice(record);
	}

	/// Appends a root directory inode (`id = 0`, no parent) to `area_idx`.
	pub fn push_root_dir(&mut self, area_idx: usize) -> &mut Self {
		self.push_inode(
			area_idx,
			DiskInode {
				id: 0,
				seq: 1,
				parent_id: crate::object::ID_NONE,
				flags: Flags::DIRECTORY,
				filename: Vec::new(),
			},
		)
	}

	pub fn push_inode(&mut self, area_idx: usize, inode: DiskInode) -> &mut Self {
		let encoded = inode.encode();
		self.append(area_idx, &encoded);
		self
	}

	pub fn push_block(&mut self, area_idx: usize, block: DiskBlock) -> &mut Self {
		let encoded = block.encode();
		self.append(area_idx, &encoded);
		self
	}

	/// Area descriptors referencing every area added so far, in the order
	/// they were added.
	pub fn area_descs(&self) -> Vec<AreaDesc> {
		(0..self.areas.len() as u16).map(AreaDesc).collect()
	}

	/// Finalizes the image into a [`SliceFlash`] source.
	pub fn build(self) -> SliceFlash {
		SliceFlash::new(self.areas)
	}
}

impl Default for FlashImageBuilder {
	fn default() -> Self {
		Self::new()
	}
}
