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

//! Merging one data-block record into the object index.

use crate::disk::DiskBlock;
use crate::error::{Error, Result};
use crate::object::{Block, Flags, Id};
use crate::restore::Fs;

fn block_gets_replaced(existing: &Block, disk: &DiskBlock) -> Result<bool> {
	if existing.flags.contains(Flags::DUMMY) {
		return Ok(true);
	}
	if existing.seq < disk.seq {
		return Ok(true);
	}
	if existing.seq == disk.seq {
		return Err(Error::Corrupt);
	}
	Ok(false)
}

fn new_dummy_inode(id: Id) -> crate::object::Inode {
	crate::object::Inode {
		id,
		seq: 0,
		parent_id: crate::object::ID_NONE,
		filename: Vec::new(),
		flags: Flags::DUMMY,
		refcnt: 1,
		area_idx: crate::object::AREA_ID_NONE,
		area_offset: 0,
		children: Vec::new(),
		blocks: Vec::new(),
	}
}

/// Merges one data-block record read from flash into the object index.
pub(crate) fn restore_block(
	fs: &mut Fs,
	area_idx: u16,
	area_offset: u32,
	disk: DiskBlock,
) -> Result<()> {
	let id = disk.id;

	match fs.index.get_block(id) {
		Some(existing) => {
			// The corrupt-scratch repair rescans the good area from its
			// start, so seeing the same (area, offset, seq) again is a
			// second observation of an already-folded-in record, not a
			// genuine duplicate to reject.
			let same_record = existing.area_idx == area_idx
				&& existing.area_offset == area_offset
				&& existing.seq == disk.seq;
			if !same_record && block_gets_replaced(existing, &disk)? {
				let block = fs.index.get_block_mut(id).unwrap();
				let prev_seq = block.seq;
				apply_disk_block(block, &disk, area_idx, area_offset);
				fs.log
					.push(format!("block id={id} superseded, seq={prev_seq} -> {}", disk.seq));
			}
		}
		None => {
			fs.check_block_capacity()?;
			let mut block = Block {
				id,
				seq: 0,
				inode_id: disk.inode_id,
				data: Vec::new(),
				flags: Flags::empty(),
				area_idx: crate::object::AREA_ID_NONE,
				area_offset: 0,
			};
			apply_disk_block(&mut block, &disk, area_idx, area_offset);
			fs.index.insert_block(block);

			if fs.index.get_inode(disk.inode_id).is_none() {
				if let Err(e) = fs.check_inode_capacity() {
					fs.index.remove(id);
					return Err(e);
				}
				fs.log
					.push(format!("synthesized dummy owning inode id={}", disk.inode_id));
				fs.index.insert_inode(new_dummy_inode(disk.inode_id));
			}
			if let Some(inode) = fs.index.get_inode_mut(disk.inode_id) {
				if !inode.blocks.contains(&id) {
					inode.blocks.push(id);
				}
			}
		}
	}

	if id >= fs.next_id {
		fs.next_id = id + 1;
	}

	Ok(())
}

fn apply_disk_block(block: &mut Block, disk: &DiskBlock, area_idx: u16, area_offset: u32) {
	block.seq = disk.seq;
	block.inode_id = disk.inode_id;
	block.data = disk.data.clone();
	block.flags = disk.flags;
	block.area_idx = area_idx;
	block.area_offset = area_offset;
}
