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

//! Errors surfaced by this crate.
//!
//! A handful of restore-internal signals (an empty read, a read that would
//! run past an area's length, an index lookup miss) never reach this type:
//! they are resolved inside the component that produces them. Only faults a
//! caller needs to react to are represented here.

use crate::flash::FlashReadError;
use std::fmt;

/// The crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// A fault surfaced by a restore operation.
#[derive(Debug)]
pub enum Error {
	/// The flash contents do not form a valid filesystem, or violate an
	/// invariant the on-disk format requires (duplicate `(id, seq)` pair,
	/// an unrecognized record magic, an unrecoverable scratch-area
	/// ambiguity).
	Corrupt,
	/// An allocator pool (inode or block) was exhausted while restoring.
	Enomem,
	/// The underlying flash read primitive reported a failure.
	FlashError(FlashReadError),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::Corrupt => write!(f, "corrupt or unrecognized filesystem image"),
			Error::Enomem => write!(f, "object pool exhausted during restore"),
			Error::FlashError(e) => write!(f, "flash read failure: {e}"),
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Error::FlashError(e) => Some(e),
			_ => None,
		}
	}
}

impl From<FlashReadError> for Error {
	fn from(e: FlashReadError) -> Self {
		Error::FlashError(e)
	}
}
