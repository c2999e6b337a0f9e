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

//! The on-flash wire format.
//!
//! Every area begins with a fixed [`AreaHeader`]. What follows is a
//! concatenation of records with no framing beyond their own declared
//! lengths: a 32-bit magic word identifies the record kind (or marks erased
//! flash), a fixed header carries the rest of the fields, and a
//! variable-length trailer (a filename, a data payload) follows immediately.
//!
//! Fields are little-endian. Record boundaries are computed purely from
//! declared lengths, never from alignment or padding, so these routines
//! read and write byte-for-byte with no `repr(C)` cast involved.

use crate::object::{Flags, Id};

pub const AREA_MAGIC: u32 = 0x4653_4646; // "FFSF" little-endian in the header word
pub const INODE_MAGIC: u32 = 0x4E49_4646; // "FFIN"
pub const BLOCK_MAGIC: u32 = 0x4C42_4646; // "FFBL"
pub const ERASED_WORD: u32 = 0xFFFF_FFFF;

/// The same sentinel value as [`crate::object::AREA_ID_NONE`]: this on-disk
/// format uses one constant for both "no area" meanings, exactly as the
/// source format it was distilled from does.
pub const AREA_ID_NONE: u16 = crate::object::AREA_ID_NONE;

pub const AREA_HEADER_LEN: usize = 4 + 2 + 4; // magic, area_id, gc_seq

/// The fixed header at offset 0 of every area.
#[derive(Debug, Clone, Copy)]
pub struct AreaHeader {
	pub area_id: u16,
	pub gc_seq: u32,
}

impl AreaHeader {
	pub fn encode(&self) -> [u8; AREA_HEADER_LEN] {
		let mut buf = [0u8; AREA_HEADER_LEN];
		buf[0..4].copy_from_slice(&AREA_MAGIC.to_le_bytes());
		buf[4..6].copy_from_slice(&self.area_id.to_le_bytes());
		buf[6..10].copy_from_slice(&self.gc_seq.to_le_bytes());
		buf
	}

	/// Decodes a header from exactly [`AREA_HEADER_LEN`] bytes.
	///
	/// Returns `None` if the magic is absent (the area is not formatted, or
	/// this is not flash belonging to this filesystem at all).
	pub fn decode(buf: &[u8]) -> Option<Self> {
		debug_assert!(buf.len() >= AREA_HEADER_LEN);
		let magic = u32::from_le_bytes(buf[0..4].try_into().unwrap());
		if magic != AREA_MAGIC {
			return None;
		}
		let area_id = u16::from_le_bytes(buf[4..6].try_into().unwrap());
		let gc_seq = u32::from_le_bytes(buf[6..10].try_into().unwrap());
		Some(AreaHeader { area_id, gc_seq })
	}
}

pub const INODE_FIXED_LEN: usize = 4 + 4 + 4 + 4 + 1 + 2; // magic,id,seq,parent_id,flags,filename_len

/// A decoded inode record, stamped with where it was read from.
#[derive(Debug, Clone)]
pub struct DiskInode {
	pub id: Id,
	pub seq: u32,
	pub parent_id: Id,
	pub flags: Flags,
	pub filename: Vec<u8>,
}

impl DiskInode {
	pub fn encode(&self) -> Vec<u8> {
		let mut buf = Vec::with_capacity(INODE_FIXED_LEN + self.filename.len());
		buf.extend_from_slice(&INODE_MAGIC.to_le_bytes());
		buf.extend_from_slice(&self.id.to_le_bytes());
		buf.extend_from_slice(&self.seq.to_le_bytes());
		buf.extend_from_slice(&self.parent_id.to_le_bytes());
		buf.push(self.flags.bits());
		buf.extend_from_slice(&(self.filename.len() as u16).to_le_bytes());
		buf.extend_from_slice(&self.filename);
		buf
	}
}

pub const BLOCK_FIXED_LEN: usize = 4 + 4 + 4 + 4 + 1 + 4; // magic,id,seq,inode_id,flags,data_len

/// A decoded data-block record, stamped with where it was read from.
#[derive(Debug, Clone)]
pub struct DiskBlock {
	pub id: Id,
	pub seq: u32,
	pub inode_id: Id,
	pub flags: Flags,
	pub data: Vec<u8>,
}

impl DiskBlock {
	pub fn encode(&self) -> Vec<u8> {
		let mut buf = Vec::with_capacity(BLOCK_FIXED_LEN + self.data.len());
		buf.extend_from_slice(&BLOCK_MAGIC.to_le_bytes());
		buf.extend_from_slice(&self.id.to_le_bytes());
		buf.extend_from_slice(&self.seq.to_le_bytes());
		buf.extend_from_slice(&self.inode_id.to_le_bytes());
		buf.push(self.flags.bits());
		buf.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
		buf.extend_from_slice(&self.data);
		buf
	}
}

/// What [`crate::restore::scan::read_object`] found at a given offset.
pub enum DiskObject {
	Inode(DiskInode),
	Block(DiskBlock),
	/// Erased flash (`0xFFFFFFFF` magic word): the area's tail.
	Empty,
}

impl DiskObject {
	/// Total on-disk size of this record, including its magic word.
	///
	/// Meaningless (and unused) for `Empty`, which terminates a scan.
	pub fn on_disk_size(&self) -> usize {
		match self {
			DiskObject::Inode(i) => INODE_FIXED_LEN + i.filename.len(),
			DiskObject::Block(b) => BLOCK_FIXED_LEN + b.data.len(),
			DiskObject::Empty => 0,
		}
	}
}
