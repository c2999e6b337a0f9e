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

//! Reading one disk object, and walking a whole area of them.

use crate::disk::{
	BLOCK_FIXED_LEN, BLOCK_MAGIC, DiskBlock, DiskInode, DiskObject, ERASED_WORD, INODE_FIXED_LEN,
	INODE_MAGIC,
};
use crate::error::Error;
use crate::flash::{FlashRead, ReadOutcome};
use crate::object::Flags;
use crate::restore::{Fs, block::restore_block, inode::restore_inode};

/// Local outcome of reading one disk object; `Range` and `Corrupt` are
/// collapsed into [`Error`] or absorbed by the caller depending on which
/// one it is, never surfaced as-is.
enum ReadErr {
	Range,
	Corrupt,
	Flash(crate::flash::FlashReadError),
}

impl From<ReadErr> for Option<Error> {
	fn from(e: ReadErr) -> Self {
		match e {
			ReadErr::Range => None,
			ReadErr::Corrupt => Some(Error::Corrupt),
			ReadErr::Flash(f) => Some(Error::FlashError(f)),
		}
	}
}

fn read_exact(
	flash: &dyn FlashRead,
	flash_area: u16,
	offset: u32,
	buf: &mut [u8],
) -> Result<(), ReadErr> {
	match flash.read(flash_area, offset, buf) {
		ReadOutcome::Ok => Ok(()),
		ReadOutcome::Range => Err(ReadErr::Range),
		ReadOutcome::Err(e) => Err(ReadErr::Flash(e)),
	}
}

/// Reads and classifies the object at `offset` within `flash_area`.
///
/// A read that would run past the area's declared length is reported the
/// same as erased flash would be: the tail of a log area after an unclean
/// shutdown is an ordinary, expected state, not a fault.
fn read_disk_object(
	flash: &dyn FlashRead,
	flash_area: u16,
	offset: u32,
) -> Result<DiskObject, ReadErr> {
	let mut magic_buf = [0u8; 4];
	read_exact(flash, flash_area, offset, &mut magic_buf)?;
	let magic = u32::from_le_bytes(magic_buf);

	if magic == ERASED_WORD {
		return Ok(DiskObject::Empty);
	}

	if magic == INODE_MAGIC {
		let mut rest = [0u8; INODE_FIXED_LEN - 4];
		read_exact(flash, flash_area, offset + 4, &mut rest)?;
		let id = u32::from_le_bytes(rest[0..4].try_into().unwrap());
		let seq = u32::from_le_bytes(rest[4..8].try_into().unwrap());
		let parent_id = u32::from_le_bytes(rest[8..12].try_into().unwrap());
		let flags = Flags::from_bits_truncate(rest[12]);
		let filename_len = u16::from_le_bytes(rest[13..15].try_into().unwrap()) as usize;

		let mut filename = vec![0u8; filename_len];
		read_exact(
			flash,
			flash_area,
			offset + INODE_FIXED_LEN as u32,
			&mut filename,
		)?;

		return Ok(DiskObject::Inode(DiskInode {
			id,
			seq,
			parent_id,
			flags,
			filename,
		}));
	}

	if magic == BLOCK_MAGIC {
		let mut rest = [0u8; BLOCK_FIXED_LEN - 4];
		read_exact(flash, flash_area, offset + 4, &mut rest)?;
		let id = u32::from_le_bytes(rest[0..4].try_into().unwrap());
		let seq = u32::from_le_bytes(rest[4..8].try_into().unwrap());
		let inode_id = u32::from_le_bytes(rest[8..12].try_into().unwrap());
		let flags = Flags::from_bits_truncate(rest[12]);
		let data_len = u32::from_le_bytes(rest[13..17].try_into().unwrap()) as usize;

		let mut data = vec![0u8; data_len];
		read_exact(
			flash,
			flash_area,
			offset + BLOCK_FIXED_LEN as u32,
			&mut data,
		)?;

		return Ok(DiskObject::Block(DiskBlock {
			id,
			seq,
			inode_id,
			flags,
			data,
		}));
	}

	Err(ReadErr::Corrupt)
}

/// Scans one area table entry from its current cursor to the end, merging
/// every record it finds into the object index.
///
/// Stops cleanly (returning `Ok`) on erased flash or a read that runs past
/// the area's declared length; any other failure aborts the scan.
pub(crate) fn scan_area(
	fs: &mut Fs,
	area_table_idx: usize,
	flash: &dyn FlashRead,
) -> crate::Result<()> {
	let flash_area = fs.areas[area_table_idx].flash_area;
	let mut cur = fs.areas[area_table_idx].cur;

	loop {
		match read_disk_object(flash, flash_area, cur) {
			Ok(obj) => {
				let size = obj.on_disk_size();
				match obj {
					DiskObject::Empty => break,
					DiskObject::Inode(rec) => {
						restore_inode(fs, area_table_idx as u16, cur, rec)?
					}
					DiskObject::Block(rec) => {
						restore_block(fs, area_table_idx as u16, cur, rec)?
					}
				}
				cur += size as u32;
			}
			Err(ReadErr::Range) => break,
			Err(e) => {
				let err: Option<Error> = e.into();
				return Err(err.unwrap_or(Error::Corrupt));
			}
		}
	}

	fs.areas[area_table_idx].cur = cur;
	Ok(())
}
