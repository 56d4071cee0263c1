/*!
# Epcompress: File Jobs
*/

use crate::JobError;
use eplz::{
	Codec,
	CompressionConfig,
	Compressor,
	Decompressor,
	Progress,
};
use std::{
	ffi::OsString,
	path::{
		Path,
		PathBuf,
	},
};



#[derive(Debug, Clone, Copy)]
/// # Job Settings.
///
/// Everything a worker needs to know to process one file.
pub(super) struct Job {
	/// # Codec.
	codec: Codec,

	/// # Compression Settings.
	config: CompressionConfig,

	/// # Mode.
	mode: Mode,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Mode.
pub(super) enum Mode {
	/// # Compress, With an Optional Start Address.
	Compress(Option<u16>),

	/// # Decompress, Expecting Addresses (Or Not).
	Decompress(bool),
}

impl Job {
	#[must_use]
	/// # New.
	pub(super) const fn new(codec: Codec, config: CompressionConfig, mode: Mode) -> Self {
		Self { codec, config, mode }
	}

	/// # Codec.
	pub(super) const fn codec(&self) -> Codec { self.codec }

	/// # Compressing?
	pub(super) const fn packs(&self) -> bool { matches!(self.mode, Mode::Compress(_)) }

	/// # Verb.
	pub(super) const fn verb(&self) -> &'static str {
		if self.packs() { "Packed" }
		else { "Unpacked" }
	}

	#[must_use]
	/// # Output Path.
	///
	/// Compression appends the codec's extension. Decompression strips it if
	/// present, or appends `.out` if not.
	pub(super) fn output(&self, file: &Path) -> PathBuf {
		let ext = self.codec.extension();
		match self.mode {
			Mode::Compress(_) => {
				let mut out = OsString::from(file.as_os_str());
				out.push(".");
				out.push(ext);
				PathBuf::from(out)
			},
			Mode::Decompress(_) =>
				if file.extension().is_some_and(|e| e.eq_ignore_ascii_case(ext)) {
					file.with_extension("")
				}
				else {
					let mut out = OsString::from(file.as_os_str());
					out.push(".out");
					PathBuf::from(out)
				},
		}
	}

	/// # Process a File.
	///
	/// Read `file`, (de)compress it, and save the result next to it. The
	/// before and after sizes are returned on success.
	///
	/// Compression reports to `progress` as it goes, and stops early if that
	/// asks it to.
	///
	/// ## Errors
	///
	/// Returns an error if the file cannot be read or written, or the codec
	/// fails.
	pub(super) fn run(&self, file: &Path, progress: &mut dyn Progress)
	-> Result<(u64, u64), JobError> {
		let raw = std::fs::read(file).map_err(|_|
			if file.is_file() { JobError::Read }
			else { JobError::Vanished }
		)?;
		let before = raw.len() as u64;
		if before == 0 { return Err(JobError::Empty); }

		let out = match self.mode {
			Mode::Compress(addr) => {
				let mut enc = Compressor::new(self.codec, self.config)?;
				enc.compress_data(&raw, addr, true, Some(progress))?;
				enc.into_inner()
			},
			Mode::Decompress(addressed) => Decompressor::new(self.codec)
				.with_start_address(addressed)
				.decompress(&raw)?,
		};

		let after = out.len() as u64;
		write_atomic::write_file(self.output(file), &out)
			.map(|()| (before, after))
			.map_err(|_| JobError::Write)
	}
}
