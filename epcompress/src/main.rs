/*!
# Epcompress

Compress and decompress files in the Enterprise 128 M0 and M4 formats.
*/

#![deny(unsafe_code)]

#![warn(
	clippy::filetype_is_file,
	clippy::integer_division,
	clippy::needless_borrow,
	clippy::nursery,
	clippy::pedantic,
	clippy::perf,
	clippy::suboptimal_flops,
	clippy::unneeded_field_pattern,
	macro_use_extern_crate,
	missing_copy_implementations,
	missing_debug_implementations,
	missing_docs,
	non_ascii_idents,
	trivial_casts,
	trivial_numeric_casts,
	unreachable_pub,
	unused_crate_dependencies,
	unused_extern_crates,
	unused_import_braces,
)]

#![allow(
	clippy::module_name_repetitions,
	clippy::redundant_pub_crate,
)]

mod error;
mod file;
mod jobs;

use argyle::{
	Argue,
	ArgyleError,
	FLAG_HELP,
	FLAG_REQUIRED,
	FLAG_VERSION,
};
use dactyl::traits::BytesToUnsigned;
use eplz::{
	Codec,
	CompressionConfig,
};
use error::{
	EpcError,
	JobError,
};
use file::{
	Job,
	Mode,
};
use fyi_msg::Msg;
use std::{
	num::NonZeroUsize,
	path::PathBuf,
};



/// # Main.
fn main() {
	match main__() {
		Ok(()) => {},
		Err(EpcError::Argue(ArgyleError::WantsVersion)) => {
			println!(concat!("Epcompress v", env!("CARGO_PKG_VERSION")));
		},
		Err(EpcError::Argue(ArgyleError::WantsHelp)) => { helper(); },
		Err(e) => { Msg::error(e).die(1); },
	}
}

#[inline]
/// # Actual Main.
fn main__() -> Result<(), EpcError> {
	let args = Argue::new(FLAG_HELP | FLAG_REQUIRED | FLAG_VERSION)?;

	// Codec and direction.
	let codec = if args.switch2(b"-4", b"--m4") { Codec::M4 } else { Codec::M0 };
	let mode =
		if args.switch2(b"-d", b"--decompress") {
			Mode::Decompress(
				args.switch(b"--addressed") || args.option2(b"-a", b"--address").is_some()
			)
		}
		else { Mode::Compress(address(args.option2(b"-a", b"--address"))?) };

	let job = Job::new(codec, config(&args)?, mode);
	let threads = threads(args.option(b"-j"))?;

	// The files.
	let mut files: Vec<PathBuf> = args.args_os()
		.map(PathBuf::from)
		.filter(|p| p.is_file())
		.collect();
	files.sort_unstable();
	files.dedup();

	jobs::exec(threads, job, &files, args.switch2(b"-p", b"--progress"))
}



/// # Compression Settings.
///
/// Start from the level preset (if any) and layer the individual overrides
/// on top.
fn config(args: &Argue) -> Result<CompressionConfig, EpcError> {
	let mut out = match args.option2(b"-l", b"--level") {
		Some(v) => u8::btou(v)
			.and_then(|v| CompressionConfig::from_level(v).ok())
			.ok_or(EpcError::Level)?,
		None => CompressionConfig::default(),
	};

	if let Some(v) = args.option2(b"-i", b"--iterations") {
		let v = u8::btou(v).filter(|v| (1..=16).contains(v)).ok_or(EpcError::Iterations)?;
		out = out.with_optimize_iterations(v);
	}

	if let Some(v) = args.option2(b"-b", b"--block-size") {
		let v = u32::btou(v).filter(|&v| v <= 65_536).ok_or(EpcError::BlockSize)?;
		out = out.with_block_size(v);
	}

	if let Some(v) = args.option2(b"-s", b"--split-depth") {
		let v = u8::btou(v).ok_or(EpcError::Depth)?;
		out = out.with_split_depth(v);
	}

	// Exhaustive search is just a very deep split.
	if args.switch2(b"-X", b"--exhaustive") { out = out.with_split_depth(10); }

	if let Some(v) = args.option(b"--min-length") {
		out = out.with_min_length(length(v)?);
	}
	if let Some(v) = args.option(b"--max-length") {
		out = out.with_max_length(length(v)?);
	}
	if let Some(v) = args.option(b"--max-offset") {
		let v = u32::btou(v).filter(|v| (1..=65_535).contains(v)).ok_or(EpcError::Offset)?;
		out = out.with_max_offset(v);
	}

	out.validate()?;
	Ok(out)
}

/// # Parse Match Length.
fn length(raw: &[u8]) -> Result<u32, EpcError> {
	u32::btou(raw).filter(|v| (1..=65_535).contains(v)).ok_or(EpcError::Length)
}

/// # Parse Start Address.
///
/// Addresses may be given in decimal or, with a `0x` prefix, hex.
fn address(raw: Option<&[u8]>) -> Result<Option<u16>, EpcError> {
	let Some(raw) = raw else { return Ok(None); };
	let parsed =
		if let Some(hex) = raw.strip_prefix(b"0x").or_else(|| raw.strip_prefix(b"0X")) {
			std::str::from_utf8(hex).ok()
				.and_then(|h| u16::from_str_radix(h, 16).ok())
		}
		else { u16::btou(raw) };
	parsed.map(Some).ok_or(EpcError::Address)
}

/// # Thread Count.
///
/// Default to one thread per logical core.
fn threads(raw: Option<&[u8]>) -> Result<NonZeroUsize, EpcError> {
	match raw {
		Some(v) => usize::btou(v).and_then(NonZeroUsize::new).ok_or(EpcError::Threads),
		None => Ok(
			std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
		),
	}
}

#[cold]
/// # Print Help.
fn helper() {
	println!(concat!(
		"\x1b[38;5;199mEpcompress\x1b[0;38;5;69m v", env!("CARGO_PKG_VERSION"), "\x1b[0m", r"
Enterprise 128 M0/M4 LZ compression.

USAGE:
    epcompress [FLAGS] [OPTIONS] <FILE(s)>...

FLAGS:
    -4, --m4          Use the M4 format instead of M0.
        --addressed   When decompressing, expect a start address in each
                      M0 block header.
    -d, --decompress  Decompress rather than compress. Output is written to
                      the input path minus its .m0/.m4 extension, or with
                      .out appended if there isn't one.
    -h, --help        Print help information and exit.
    -p, --progress    Show a progress bar while working, with a line per
                      finished file and a summary at the end.
    -V, --version     Print version information and exit.
    -X, --exhaustive  Search every 64-byte block boundary. This is very slow!

OPTIONS:
    -a, --address <NUM>      Write a start (load) address into each M0 block
                             header, decimal or 0x-prefixed hex. When
                             decompressing, this implies --addressed.
    -b, --block-size <NUM>   Force blocks of exactly this many bytes (up to
                             65536). [default: 0 (automatic)]
    -i, --iterations <NUM>   Run up to NUM optimization passes per block,
                             between 1..=16.
    -j <NUM>                 Limit parallelization to this many threads.
                             [default: one per logical core]
    -l, --level <NUM>        Preset compression level, between 1..=9.
        --max-length <NUM>   Longest match to emit. [default: 65535]
        --max-offset <NUM>   Farthest match to emit. [default: 65535]
        --min-length <NUM>   Shortest match to emit. [default: 1]
    -s, --split-depth <NUM>  Block-splitting effort; 10+ is exhaustive.

ARGS:
    <FILE(s)>...    One or more files to (de)compress. Compressed output is
                    saved alongside the source as <FILE>.m0 or <FILE>.m4.

EARLY EXIT:
    Press CTRL+C once to stop queueing files and cancel in-flight work.
    Press it a second time to exit immediately.
"
	));
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_address() {
		assert!(matches!(address(None), Ok(None)));
		assert!(matches!(address(Some(b"256")), Ok(Some(256))));
		assert!(matches!(address(Some(b"0x4000")), Ok(Some(0x4000))));
		assert!(matches!(address(Some(b"0XfFfF")), Ok(Some(0xFFFF))));
		assert!(address(Some(b"65536")).is_err());
		assert!(address(Some(b"0x10000")).is_err());
		assert!(address(Some(b"0xZZ")).is_err());
	}

	#[test]
	fn t_threads() {
		assert_eq!(threads(Some(b"3")).ok().map(NonZeroUsize::get), Some(3));
		assert!(threads(Some(b"0")).is_err());
		assert!(threads(Some(b"x")).is_err());
		assert!(threads(None).is_ok());
	}

	#[test]
	fn t_length() {
		assert!(matches!(length(b"1"), Ok(1)));
		assert!(matches!(length(b"65535"), Ok(65_535)));
		assert!(length(b"0").is_err());
		assert!(length(b"65536").is_err());
	}
}
