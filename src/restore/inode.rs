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

//! Merging one inode record into the object index.

use crate::disk::DiskInode;
use crate::error::{Error, Result};
use crate::object::{Flags, Id, Inode, ID_NONE};
use crate::restore::Fs;

/// Whether `disk` should replace `existing`, given both share an `id`.
///
/// A dummy is always replaced by a real record. Among two real records, the
/// higher sequence number wins; two records with equal sequence numbers are
/// a corruption the format must never produce.
fn inode_gets_replaced(existing: &Inode, disk: &DiskInode) -> Result<bool> {
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

fn new_dummy_inode(id: Id, is_dir: bool) -> Inode {
	let mut flags = Flags::DUMMY;
	if is_dir {
		flags |= Flags::DIRECTORY;
	}
	Inode {
		id,
		seq: 0,
		parent_id: ID_NONE,
		filename: Vec::new(),
		flags,
		refcnt: 1,
		area_idx: crate::object::AREA_ID_NONE,
		area_offset: 0,
		children: Vec::new(),
		blocks: Vec::new(),
	}
}

/// Ensures a (possibly dummy) inode with `id` exists, synthesizing one if
/// necessary, and returns its id. The caller is responsible for linking it.
fn find_or_synthesize_parent(fs: &mut Fs, id: Id) -> Result<Id> {
	if fs.index.get_inode(id).is_some() {
		return Ok(id);
	}
	fs.check_inode_capacity()?;
	fs.log
		.push(format!("synthesized dummy parent inode id={id}"));
	fs.index.insert_inode(new_dummy_inode(id, true));
	Ok(id)
}

/// Merges one inode record read from flash into the object index.
///
/// `area_idx` is the index into [`Fs`]'s area table (not the on-flash
/// `area_id`), `area_offset` the byte offset within that area the record
/// starts at.
pub(crate) fn restore_inode(
	fs: &mut Fs,
	area_idx: u16,
	area_offset: u32,
	disk: DiskInode,
) -> Result<()> {
	let id = disk.id;
	let mut do_add = true;
	let mut new_inode = false;

	match fs.index.get_inode(id) {
		Some(existing) => {
			let same_record = existing.area_idx == area_idx
				&& existing.area_offset == area_offset
				&& existing.seq == disk.seq;
			do_add = if same_record {
				// The corrupt-scratch repair rescans the good area from its
				// start, so this is a second observation of a record already
				// folded in, not a genuine duplicate (id, seq) pair.
				false
			} else {
				inode_gets_replaced(existing, &disk)?
			};
			if do_add {
				let had_parent = fs.index.get_inode(id).unwrap().parent_id != ID_NONE;
				if had_parent {
					detach_from_parent(fs, id);
				}
				let inode = fs.index.get_inode_mut(id).unwrap();
				apply_disk_inode(inode, &disk, area_idx, area_offset);
				fs.log.push(format!(
					"inode id={id} superseded, seq={} -> {}",
					inode.seq, disk.seq
				));
			}
		}
		None => {
			fs.check_inode_capacity()?;
			new_inode = true;
			let mut inode = Inode {
				id,
				seq: 0,
				parent_id: ID_NONE,
				filename: Vec::new(),
				flags: Flags::empty(),
				refcnt: 1,
				area_idx: crate::object::AREA_ID_NONE,
				area_offset: 0,
				children: Vec::new(),
				blocks: Vec::new(),
			};
			apply_disk_inode(&mut inode, &disk, area_idx, area_offset);
			fs.index.insert_inode(inode);
		}
	}

	if do_add {
		if let Err(e) = link_parent_and_root(fs, id, &disk) {
			if new_inode {
				fs.index.remove(id);
			}
			return Err(e);
		}
	}

	if id >= fs.next_id {
		fs.next_id = id + 1;
	}

	Ok(())
}

fn apply_disk_inode(inode: &mut Inode, disk: &DiskInode, area_idx: u16, area_offset: u32) {
	inode.seq = disk.seq;
	inode.parent_id = disk.parent_id;
	inode.filename = disk.filename.clone();
	inode.flags = disk.flags;
	inode.area_idx = area_idx;
	inode.area_offset = area_offset;
}

fn detach_from_parent(fs: &mut Fs, id: Id) {
	let parent_id = match fs.index.get_inode(id) {
		Some(i) => i.parent_id,
		None => return,
	};
	if parent_id == ID_NONE {
		return;
	}
	if let Some(parent) = fs.index.get_inode_mut(parent_id) {
		parent.children.retain(|&c| c != id);
	}
}

fn link_parent_and_root(fs: &mut Fs, id: Id, disk: &DiskInode) -> Result<()> {
	if disk.parent_id != ID_NONE {
		let parent_id = find_or_synthesize_parent(fs, disk.parent_id)?;
		if let Some(parent) = fs.index.get_inode_mut(parent_id) {
			if !parent.children.contains(&id) {
				parent.children.push(id);
			}
		}
	}

	let is_root = disk.parent_id == ID_NONE && disk.flags.contains(Flags::DIRECTORY);
	if is_root {
		fs.root_dir = Some(id);
	}

	Ok(())
}
