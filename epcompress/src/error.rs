/*!
# Epcompress: Errors
*/

use argyle::ArgyleError;
use eplz::{
	ConfigError,
	EplzError,
};
use fyi_msg::ProglessError;
use std::{
	error::Error,
	fmt,
};



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Per-File Errors.
pub(super) enum JobError {
	/// # Empty File.
	Empty,

	/// # Eplz Passthrough.
	Eplz(EplzError),

	/// # Read Error.
	Read,

	/// # Vanished.
	Vanished,

	/// # Write Error.
	Write,
}

impl From<EplzError> for JobError {
	#[inline]
	fn from(err: EplzError) -> Self { Self::Eplz(err) }
}

impl JobError {
	#[must_use]
	/// # As Str.
	///
	/// Library errors have their own (longer) descriptions, so this only
	/// covers the file-level problems.
	pub(super) const fn as_str(self) -> &'static str {
		match self {
			Self::Empty => "empty file",
			Self::Eplz(EplzError::Cancelled) => "cancelled",
			Self::Eplz(EplzError::Format(_)) => "corrupt data",
			Self::Eplz(_) => "codec error",
			Self::Read => "read error",
			Self::Vanished => "vanished!",
			Self::Write => "write error",
		}
	}
}



#[derive(Debug, Clone, Copy)]
/// # General/Deal-Breaking Errors.
pub(super) enum EpcError {
	/// # Invalid Start Address.
	Address,

	/// # Argyle Passthrough.
	Argue(ArgyleError),

	/// # Invalid Block Size.
	BlockSize,

	/// # Compression Settings.
	Config(ConfigError),

	/// # Invalid Split Depth.
	Depth,

	/// # Invalid Iterations.
	Iterations,

	/// # Killed Early.
	Killed,

	/// # Invalid Level.
	Level,

	/// # Invalid Match Length.
	Length,

	/// # No Files.
	NoFiles,

	/// # Invalid Offset.
	Offset,

	/// # Progress Passthrough.
	Progress(ProglessError),

	/// # Invalid Thread Count.
	Threads,
}

impl AsRef<str> for EpcError {
	#[inline]
	fn as_ref(&self) -> &str { self.as_str() }
}

impl Error for EpcError {}

impl fmt::Display for EpcError {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl From<ArgyleError> for EpcError {
	#[inline]
	fn from(err: ArgyleError) -> Self { Self::Argue(err) }
}

impl From<ConfigError> for EpcError {
	#[inline]
	fn from(err: ConfigError) -> Self { Self::Config(err) }
}

impl From<ProglessError> for EpcError {
	#[inline]
	fn from(err: ProglessError) -> Self { Self::Progress(err) }
}

impl EpcError {
	#[must_use]
	/// # As Str.
	pub(super) const fn as_str(self) -> &'static str {
		match self {
			Self::Address => "The start address must be between 0..=65_535 (or 0x0000..=0xFFFF).",
			Self::Argue(e) => e.as_str(),
			Self::BlockSize => "The block size must be between 0..=65_536.",
			Self::Config(e) => e.as_str(),
			Self::Depth => "The split depth must be between 0..=255.",
			Self::Iterations => "The number of optimization passes must be between 1..=16.",
			Self::Killed => "The process was aborted early.",
			Self::Level => "The compression level must be between 1..=9.",
			Self::Length => "Match lengths must be between 1..=65_535.",
			Self::NoFiles => "No files were found.",
			Self::Offset => "The maximum offset must be between 1..=65_535.",
			Self::Progress(e) => e.as_str(),
			Self::Threads => "The thread count must be at least one.",
		}
	}
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_job_str() {
		assert_eq!(JobError::from(EplzError::Cancelled).as_str(), "cancelled");
		assert_eq!(JobError::Write.as_str(), "write error");
		assert!(! JobError::from(EplzError::ClosedStream).as_str().is_empty());

		// Format errors all read the same at this level.
		let bad = eplz::decompress(eplz::Codec::M0, &[0, 1, 2]);
		if let Err(e @ EplzError::Format(_)) = bad {
			assert_eq!(JobError::from(e).as_str(), "corrupt data");
		}
	}
}
