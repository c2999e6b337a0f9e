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

//! Recovering from a garbage-collection cycle interrupted by a power loss.
//!
//! If no area was found carrying the scratch marker, a prior copy-compact
//! may have been cut short partway through copying one area's live records
//! into another: two areas then share the same on-flash `area_id`, one
//! fully copied, one a partial, possibly torn, rewrite. Neither was ever
//! reformatted back into a scratch area, which is why the initial scan
//! never found one.

use crate::disk::AREA_ID_NONE as DISK_AREA_ID_NONE;
use crate::error::{Error, Result};
use crate::flash::FlashRead;
use crate::object::Flags;
use crate::restore::{Fs, scan::scan_area};
use std::collections::HashMap;

/// Finds the (good, bad) area-table index pair among areas sharing a
/// non-scratch `area_id`.
///
/// The area with the higher garbage-collection sequence is the more recent,
/// fully copied one. Anything else — no such pair, more than two areas
/// sharing an id, or a tied sequence number — is unrecoverable ambiguity.
fn find_corrupt_scratch(fs: &Fs) -> Result<(usize, usize)> {
	let mut by_area_id: HashMap<u16, Vec<usize>> = HashMap::new();
	for (idx, area) in fs.areas.iter().enumerate() {
		if area.area_id == DISK_AREA_ID_NONE {
			continue;
		}
		by_area_id.entry(area.area_id).or_default().push(idx);
	}

	let mut candidate = None;
	for indices in by_area_id.values() {
		if indices.len() < 2 {
			continue;
		}
		if indices.len() > 2 || candidate.is_some() {
			// More than one ambiguous group, or a group of more than two:
			// no principled way to pick a single good/bad pair.
			return Err(Error::Corrupt);
		}
		candidate = Some((indices[0], indices[1]));
	}

	let (a, b) = candidate.ok_or(Error::Corrupt)?;
	let (a_area, b_area) = (&fs.areas[a], &fs.areas[b]);
	if a_area.gc_seq == b_area.gc_seq {
		return Err(Error::Corrupt);
	}
	if a_area.gc_seq > b_area.gc_seq {
		Ok((a, b))
	} else {
		Ok((b, a))
	}
}

/// Repairs an interrupted garbage-collection cycle: demotes every object
/// that came from the bad area to a dummy, rescans the good area so its
/// records resurrect or replace those dummies, then reformats the bad area
/// as the new scratch.
pub(crate) fn repair_corrupt_scratch(fs: &mut Fs, flash: &dyn FlashRead) -> Result<()> {
	let (good_idx, bad_idx) = find_corrupt_scratch(fs)?;
	fs.log.push(format!(
		"interrupted garbage collection detected: area {good_idx} good, area {bad_idx} bad"
	));

	let bad_idx_u16 = bad_idx as u16;
	let stale_inodes: Vec<_> = fs
		.index
		.inodes()
		.filter(|i| i.area_idx == bad_idx_u16)
		.map(|i| i.id)
		.collect();
	for id in stale_inodes {
		if let Some(inode) = fs.index.get_inode_mut(id) {
			inode.flags |= Flags::DUMMY;
		}
	}
	let stale_blocks: Vec<_> = fs
		.index
		.blocks()
		.filter(|b| b.area_idx == bad_idx_u16)
		.map(|b| b.id)
		.collect();
	for id in stale_blocks {
		if let Some(block) = fs.index.get_block_mut(id) {
			block.flags |= Flags::DUMMY;
		}
	}

	// The good area was already scanned once in the initial area loop, which
	// left its cursor at end-of-content; rewind it so this rescan actually
	// revisits every record instead of immediately reading past it as a
	// no-op.
	fs.areas[good_idx].cur = crate::disk::AREA_HEADER_LEN as u32;
	scan_area(fs, good_idx, flash)?;

	fs.areas[bad_idx].area_id = DISK_AREA_ID_NONE;
	fs.areas[bad_idx].gc_seq = 0;
	fs.areas[bad_idx].cur = crate::disk::AREA_HEADER_LEN as u32;
	fs.scratch_area_idx = Some(bad_idx);

	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::area::Area;
	use crate::disk::{AreaHeader, DiskInode, AREA_HEADER_LEN};
	use crate::flash::SliceFlash;
	use crate::object::{Flags, ID_NONE};
	use crate::restore::{AreaDesc, Fs};

	fn area(area_id: u16, gc_seq: u32) -> Area {
		Area {
			flash_area: 0,
			area_id,
			gc_seq,
			length: 4096,
			cur: 10,
		}
	}

	#[test]
	fn picks_higher_gc_seq_as_good() {
		let mut fs = Fs::with_limits(crate::Limits::default());
		fs.areas.push(area(1, 3));
		fs.areas.push(area(1, 7));
		let (good, bad) = find_corrupt_scratch(&fs).unwrap();
		assert_eq!(good, 1);
		assert_eq!(bad, 0);
	}

	#[test]
	fn no_duplicate_pair_is_corrupt() {
		let mut fs = Fs::with_limits(crate::Limits::default());
		fs.areas.push(area(1, 3));
		fs.areas.push(area(2, 7));
		assert!(matches!(find_corrupt_scratch(&fs), Err(Error::Corrupt)));
	}

	#[test]
	fn tied_gc_seq_is_corrupt() {
		let mut fs = Fs::with_limits(crate::Limits::default());
		fs.areas.push(area(1, 3));
		fs.areas.push(area(1, 3));
		assert!(matches!(find_corrupt_scratch(&fs), Err(Error::Corrupt)));
	}

	fn area_image(area_id: u16, gc_seq: u32, len: usize) -> Vec<u8> {
		let mut buf = AreaHeader { area_id, gc_seq }.encode().to_vec();
		buf.resize(len, 0xFF);
		buf
	}

	/// An end-to-end restore over three areas: a source area left behind by
	/// an interrupted copy (`gc_seq` 1, still holding a record never copied
	/// across) and its more-recent, fully written destination (`gc_seq` 2,
	/// sharing the same on-flash `area_id`), plus one ordinary data area.
	#[test]
	fn interrupted_gc_reformats_bad_area_and_loses_uncopied_record() {
		const LEN: usize = 128;

		let mut bad = area_image(5, 1, LEN);
		let mut off = AREA_HEADER_LEN;
		let root_v1 = DiskInode {
			id: 0,
			seq: 1,
			parent_id: ID_NONE,
			flags: Flags::DIRECTORY,
			filename: Vec::new(),
		}
		.encode();
		bad[off..off + root_v1.len()].copy_from_slice(&root_v1);
		off += root_v1.len();
		let uncopied = DiskInode {
			id: 2,
			seq: 1,
			parent_id: 0,
			flags: Flags::empty(),
			filename: b"late.txt".to_vec(),
		}
		.encode();
		bad[off..off + uncopied.len()].copy_from_slice(&uncopied);

		let mut good = area_image(5, 2, LEN);
		let root_v2 = DiskInode {
			id: 0,
			seq: 2,
			parent_id: ID_NONE,
			flags: Flags::DIRECTORY,
			filename: Vec::new(),
		}
		.encode();
		good[AREA_HEADER_LEN..AREA_HEADER_LEN + root_v2.len()].copy_from_slice(&root_v2);

		let mut other = area_image(9, 0, LEN);
		let sibling = DiskInode {
			id: 1,
			seq: 1,
			parent_id: 0,
			flags: Flags::empty(),
			filename: b"normal.txt".to_vec(),
		}
		.encode();
		other[AREA_HEADER_LEN..AREA_HEADER_LEN + sibling.len()].copy_from_slice(&sibling);

		let flash = SliceFlash::new(vec![bad, good, other]);
		let fs = Fs::restore(&[AreaDesc(0), AreaDesc(1), AreaDesc(2)], &flash).unwrap();

		assert_eq!(fs.area_count(), 3);
		assert_eq!(fs.scratch_area_index(), Some(0));
		let root = fs.root_dir().unwrap();
		assert_eq!(root.seq, 2);
		assert!(root.children.contains(&1));
		assert!(
			fs.inode(2).is_none(),
			"a record never copied to the good area before the crash is not recoverable"
		);
		let log: Vec<&str> = fs.log().entries().collect();
		assert!(log.iter().any(|e| e.contains("interrupted garbage collection detected")));
	}
}
