/*!
# Eplz: Errors.
*/

use std::{
	error::Error,
	fmt,
};



#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
/// # Configuration Error.
///
/// This is returned by [`CompressionConfig::validate`](crate::CompressionConfig::validate)
/// (and anything that calls it) when a setting is out of range.
pub enum ConfigError {
	/// # Block Size.
	BlockSize,

	/// # Zero Iterations.
	Iterations,

	/// # Minimum Length Exceeds Maximum.
	LengthRange,

	/// # Invalid Compression Level.
	Level,

	/// # Zero Maximum Offset.
	MaxOffset,

	/// # Zero Minimum Length.
	MinLength,
}

impl AsRef<str> for ConfigError {
	#[inline]
	fn as_ref(&self) -> &str { self.as_str() }
}

impl Error for ConfigError {}

impl fmt::Display for ConfigError {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl ConfigError {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::BlockSize => "The block size may not exceed 65,536 bytes.",
			Self::Iterations => "At least one optimization iteration is required.",
			Self::LengthRange => "The minimum match length may not exceed the maximum.",
			Self::Level => "The compression level must be between 1 and 9.",
			Self::MaxOffset => "The maximum offset must be non-zero.",
			Self::MinLength => "The minimum match length must be non-zero.",
		}
	}
}



#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
/// # Format Error Kind.
pub enum FormatErrorKind {
	/// # Checksum Mismatch.
	Checksum,

	/// # Distance Before Start of Output.
	Distance,

	/// # Invalid Code.
	InvalidCode,

	/// # Invalid Table.
	InvalidTable,

	/// # Trailing Data.
	TrailingData,

	/// # Unexpected End of Input.
	Truncated,
}

impl FormatErrorKind {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Checksum => "checksum mismatch",
			Self::Distance => "back-reference before start of output",
			Self::InvalidCode => "invalid code",
			Self::InvalidTable => "invalid decode table",
			Self::TrailingData => "trailing data after last block",
			Self::Truncated => "unexpected end of input",
		}
	}
}



#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
/// # Format Error.
///
/// A malformed compressed stream, with the (zero-based) block index and the
/// byte offset into the compressed input where decoding went wrong.
pub struct FormatError {
	/// # Block Index.
	block: usize,

	/// # Byte Offset.
	offset: usize,

	/// # What Happened.
	kind: FormatErrorKind,
}

impl Error for FormatError {}

impl fmt::Display for FormatError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"Malformed data: {} (block #{}, offset {}).",
			self.kind.as_str(),
			self.block,
			self.offset,
		)
	}
}

impl FormatError {
	#[must_use]
	/// # New.
	pub(crate) const fn new(block: usize, offset: usize, kind: FormatErrorKind) -> Self {
		Self { block, offset, kind }
	}

	#[must_use]
	/// # Block Index.
	pub const fn block(&self) -> usize { self.block }

	#[must_use]
	/// # Byte Offset.
	pub const fn offset(&self) -> usize { self.offset }

	#[must_use]
	/// # Kind.
	pub const fn kind(&self) -> FormatErrorKind { self.kind }
}



#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
/// # Internal Error.
///
/// This is a glorified `panic!`, returned when an internal sanity check
/// fails. In debug builds it remembers where.
pub struct InternalError {
	#[cfg(debug_assertions)] file: &'static str,
	#[cfg(debug_assertions)] line: u32,
}

impl Error for InternalError {}

impl fmt::Display for InternalError {
	#[cfg(debug_assertions)]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_fmt(format_args!("BUG!!! Sanity check failed at {}:{}", self.file, self.line))
	}

	#[cfg(not(debug_assertions))]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("eplz bug")
	}
}

impl InternalError {
	#[cfg(debug_assertions)]
	/// # New Error.
	pub(crate) const fn new(file: &'static str, line: u32) -> Self {
		Self { file, line }
	}

	#[cfg(not(debug_assertions))]
	/// # New Error.
	pub(crate) const fn new() -> Self { Self {} }
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Eplz Error.
pub enum EplzError {
	/// # Cancelled by the Progress Sink.
	Cancelled,

	/// # Write After Last Block.
	ClosedStream,

	/// # Bad Configuration.
	Config(ConfigError),

	/// # Malformed Input.
	Format(FormatError),

	/// # Internal Bug.
	Internal(InternalError),
}

impl Error for EplzError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::Config(e) => Some(e),
			Self::Format(e) => Some(e),
			Self::Internal(e) => Some(e),
			_ => None,
		}
	}
}

impl fmt::Display for EplzError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Cancelled => f.write_str("The operation was cancelled."),
			Self::ClosedStream => f.write_str("The stream was already closed by a last block."),
			Self::Config(e) => fmt::Display::fmt(e, f),
			Self::Format(e) => fmt::Display::fmt(e, f),
			Self::Internal(e) => fmt::Display::fmt(e, f),
		}
	}
}

impl From<ConfigError> for EplzError {
	#[inline]
	fn from(err: ConfigError) -> Self { Self::Config(err) }
}

impl From<FormatError> for EplzError {
	#[inline]
	fn from(err: FormatError) -> Self { Self::Format(err) }
}

impl From<InternalError> for EplzError {
	#[inline]
	fn from(err: InternalError) -> Self { Self::Internal(err) }
}



#[cfg(debug_assertions)]
/// # Error Macro.
///
/// Initialize a new error with the appropriate environmental argument(s)
/// according to `debug_assertions`.
macro_rules! internal_error {
	() => ($crate::InternalError::new(file!(), line!()));
}

#[cfg(not(debug_assertions))]
/// # Error Macro.
macro_rules! internal_error {
	() => ($crate::InternalError::new());
}

/// # Expose it to the rest of the crate.
pub(crate) use internal_error;



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_format_display() {
		let err = FormatError::new(2, 17, FormatErrorKind::Checksum);
		assert_eq!(err.block(), 2);
		assert_eq!(err.offset(), 17);
		assert_eq!(err.kind(), FormatErrorKind::Checksum);
		assert_eq!(
			EplzError::from(err).to_string(),
			"Malformed data: checksum mismatch (block #2, offset 17).",
		);
	}

	#[test]
	fn t_internal() {
		let err = EplzError::from(internal_error!());
		assert!(matches!(err, EplzError::Internal(_)));
		assert!(! err.to_string().is_empty());
	}
}
