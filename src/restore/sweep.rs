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

//! Discarding whatever the scan left behind that isn't a live object.
//!
//! A dummy that was never replaced by a real record references something
//! that does not actually exist on flash; that is a corruption of a
//! reference, not of this object, so it is simply deleted along with
//! everything that only existed to satisfy that reference. A tombstoned
//! object is deleted outright.

use crate::object::Id;
use crate::restore::Fs;
use std::collections::HashSet;

/// Ids of every inode that is trash by its own flags alone (`DELETED` or
/// `DUMMY`), independent of anything else in the index.
fn trash_inodes(fs: &Fs, ids: &[Id]) -> HashSet<Id> {
	ids.iter()
		.copied()
		.filter(|&id| fs.index.get_inode(id).is_some_and(|i| !i.is_live()))
		.collect()
}

/// Whether the block at `id` is trash: a tombstone/dummy by its own flags,
/// or its owning inode is absent or is itself trash. `trash_inodes` must be
/// computed from the index exactly as it stood before any removal this
/// sweep makes, so this decision never depends on the order ids happen to
/// be visited in.
fn block_is_trash(fs: &Fs, id: Id, trash_inodes: &HashSet<Id>) -> bool {
	let block = match fs.index.get_block(id) {
		Some(b) => b,
		None => return false,
	};
	!block.is_live()
		|| fs.index.get_inode(block.inode_id).is_none()
		|| trash_inodes.contains(&block.inode_id)
}

/// Removes every dummy and tombstoned object from the index.
///
/// Trash status for every object is decided up front from one untouched
/// snapshot of the index — first which inodes are trash by their own
/// flags, then which blocks are trash by their own flags or by pointing at
/// one of those inodes — before anything is actually removed. A block can
/// only ever depend on its *inode's* trash status, never the reverse, so
/// this one ordered pass is already a fixed point: visiting ids in
/// whatever order the id-keyed map happens to yield them can never see a
/// live-looking stand-in for an owner that the same sweep is about to
/// delete.
pub(crate) fn sweep(fs: &mut Fs) {
	let ids = fs.index.ids();
	let trash_inodes = trash_inodes(fs, &ids);
	let trash: Vec<Id> = ids
		.iter()
		.copied()
		.filter(|&id| trash_inodes.contains(&id) || block_is_trash(fs, id, &trash_inodes))
		.collect();

	for id in trash {
		if let Some(inode) = fs.index.get_inode(id) {
			let parent_id = inode.parent_id;
			if parent_id != crate::object::ID_NONE {
				if let Some(parent) = fs.index.get_inode_mut(parent_id) {
					parent.children.retain(|&c| c != id);
				}
			}
		} else if let Some(block) = fs.index.get_block(id) {
			let inode_id = block.inode_id;
			if let Some(inode) = fs.index.get_inode_mut(inode_id) {
				inode.blocks.retain(|&b| b != id);
			}
		}
		fs.log.push(format!("swept trash object id={id}"));
		fs.index.remove(id);
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::object::{Flags, ID_NONE, Inode};

	fn dummy(id: crate::object::Id) -> Inode {
		Inode {
			id,
			seq: 0,
			parent_id: ID_NONE,
			filename: Vec::new(),
			flags: Flags::DUMMY,
			refcnt: 1,
			area_idx: crate::object::AREA_ID_NONE,
			area_offset: 0,
			children: Vec::new(),
			blocks: Vec::new(),
		}
	}

	#[test]
	fn sweep_removes_unreplaced_dummy() {
		let mut fs = Fs::with_limits(crate::Limits::default());
		fs.index.insert_inode(dummy(7));
		sweep(&mut fs);
		assert!(fs.index.get_inode(7).is_none());
	}

	#[test]
	fn sweep_removes_orphan_block_and_its_dummy_owner() {
		let mut fs = Fs::with_limits(crate::Limits::default());
		fs.index.insert_inode(dummy(9));
		fs.index.insert_block(crate::object::Block {
			id: 20,
			seq: 1,
			inode_id: 9,
			data: b"x".to_vec(),
			flags: Flags::empty(),
			area_idx: 0,
			area_offset: 0,
		});
		if let Some(inode) = fs.index.get_inode_mut(9) {
			inode.blocks.push(20);
		}
		sweep(&mut fs);
		assert!(fs.index.get_inode(9).is_none());
		assert!(fs.index.get_block(20).is_none());
	}
}
