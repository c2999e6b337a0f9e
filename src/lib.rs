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

//! `ffs` is the restore (mount) core of a small log-structured flash filesystem.
//!
//! A log-structured flash filesystem never overwrites in place: every write
//! appends a new, sequence-numbered record to one of a small number of flash
//! areas, and garbage collection periodically copies the still-live records
//! of one area into a reserved scratch area to reclaim space. Restoring the
//! filesystem after a reboot means scanning every area, in whatever order the
//! caller hands them over, and reconstructing the single most recent
//! consistent state from whatever records are found.
//!
//! The restore core has to cope with records arriving out of dependency
//! order (a data block before the inode that owns it), duplicate or
//! superseded records, and a garbage-collection cycle that was interrupted by
//! a power loss midway through copying an area. None of this requires
//! concurrency or unsafe code; the hard part is purely the merge logic,
//! implemented in [`restore`].
//!
//! ```
//! use ffs::{Fs, test_util::FlashImageBuilder};
//!
//! let mut image = FlashImageBuilder::new();
//! let data = image.data_area(4096);
//! image.scratch_area(4096);
//! image.push_root_dir(data);
//! let descs = image.area_descs();
//! let flash = image.build();
//!
//! let fs = Fs::restore(&descs, &flash).unwrap();
//! assert!(fs.root_dir().is_some());
//! ```

mod area;
mod disk;
pub mod error;
mod limits;
mod log;
mod object;
mod restore;

#[cfg(any(test, doctest, feature = "test-util"))]
pub mod test_util;

pub mod flash;

pub use error::{Error, Result};
pub use limits::Limits;
pub use log::RestoreLog;
pub use object::{Block, Flags, Id, Inode, ID_NONE};
pub use restore::{AreaDesc, Fs};
