/*!
# Eplz: Streams.
*/

use crate::{
	bits::BitWriter,
	CompressionConfig,
	EplzError,
	m0,
	m4,
	Progress,
	progress::Tracker,
	split::compress_blocks,
};
use std::fmt;



#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
/// # Codec.
pub enum Codec {
	/// # M0.
	///
	/// Checksummed, optionally address-tagged, with Huffman-coded symbols.
	M0,

	/// # M4.
	///
	/// Byte-aligned literals and slot-coded matches; faster to decode.
	M4,
}

impl fmt::Display for Codec {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl Codec {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::M0 => "M0",
			Self::M4 => "M4",
		}
	}

	#[must_use]
	/// # File Extension.
	///
	/// The conventional suffix for files holding this format.
	pub const fn extension(self) -> &'static str {
		match self {
			Self::M0 => "m0",
			Self::M4 => "m4",
		}
	}
}



#[derive(Debug)]
/// # Compressor.
///
/// This accumulates one compressed stream, possibly across several calls to
/// [`Compressor::compress_data`]. The stream is finalized by the first call
/// flagged as the last; anything after that is an error.
///
/// ## Examples
///
/// ```
/// use eplz::{Codec, CompressionConfig, Compressor, Decompressor};
///
/// let mut enc = Compressor::new(Codec::M0, CompressionConfig::default()).unwrap();
/// enc.compress_data(b"Hello Hello Hello Hello!", None, false, None).unwrap();
/// enc.compress_data(b"Hello again!", None, true, None).unwrap();
/// assert!(enc.is_closed());
///
/// let dec = Decompressor::new(Codec::M0);
/// let raw = dec.decompress(enc.as_bytes()).unwrap();
/// assert_eq!(raw, b"Hello Hello Hello Hello!Hello again!");
/// ```
pub struct Compressor {
	/// # Codec.
	codec: Codec,

	/// # Settings.
	config: CompressionConfig,

	/// # Output.
	writer: BitWriter,
}

impl Compressor {
	/// # New.
	///
	/// ## Errors
	///
	/// Returns an error if the configuration is invalid.
	pub fn new(codec: Codec, config: CompressionConfig) -> Result<Self, EplzError> {
		config.validate()?;
		Ok(Self { codec, config, writer: BitWriter::default() })
	}

	/// # Compress Data.
	///
	/// Compress `src` and append it to the stream. Empty input is a no-op,
	/// aside from closing the stream if `last_block` is set.
	///
	/// The start address is only meaningful for M0, where it is written into
	/// each block header (offset by the block's position in `src`).
	///
	/// If a progress sink is provided, it receives status messages and
	/// percentages; returning `false` from the latter aborts the call.
	///
	/// ## Errors
	///
	/// Returns an error if the stream is already closed or the operation is
	/// cancelled. On error, nothing from this call is written.
	pub fn compress_data(
		&mut self,
		src: &[u8],
		start_addr: Option<u16>,
		last_block: bool,
		progress: Option<&mut dyn Progress>,
	) -> Result<(), EplzError> {
		if self.writer.is_closed() { return Err(EplzError::ClosedStream); }
		if src.is_empty() {
			if last_block { self.close(); }
			return Ok(());
		}

		let mut tracker = Tracker::new(progress);
		tracker.message("Compressing data");
		let tokens = match self.codec {
			Codec::M0 => {
				let mut coder = m0::Coder::new(src, &self.config, start_addr);
				compress_blocks(&mut coder, src.len(), &self.config, last_block, &mut tracker)?
			},
			Codec::M4 => {
				let mut coder = m4::Coder::new(src, &self.config);
				compress_blocks(&mut coder, src.len(), &self.config, last_block, &mut tracker)?
			},
		};

		if self.codec == Codec::M0 && self.writer.is_empty() { self.writer.reserve(); }
		self.writer.write(&tokens)?;
		if last_block { self.close(); }
		tracker.finish();
		Ok(())
	}

	/// # Close.
	fn close(&mut self) {
		match self.codec {
			Codec::M0 => self.writer.close_with_checksum(),
			Codec::M4 => self.writer.close(),
		}
	}

	#[must_use]
	/// # Codec.
	pub const fn codec(&self) -> Codec { self.codec }

	#[must_use]
	/// # Is Closed?
	pub const fn is_closed(&self) -> bool { self.writer.is_closed() }

	#[must_use]
	/// # Compressed Bytes (So Far).
	///
	/// Until the stream is closed, the final partial byte is not included
	/// and (for M0) the checksum is unset.
	pub fn as_bytes(&self) -> &[u8] { self.writer.as_slice() }

	#[must_use]
	/// # Into Bytes.
	pub fn into_inner(self) -> Vec<u8> { self.writer.into_inner() }
}



#[derive(Debug, Clone, Default, Eq, PartialEq)]
/// # Decoded Block.
pub struct Block {
	/// # Load Address.
	address: Option<u16>,

	/// # Data.
	data: Vec<u8>,
}

impl Block {
	#[must_use]
	/// # Load Address.
	///
	/// This is only set for address-tagged M0 streams.
	pub const fn address(&self) -> Option<u16> { self.address }

	#[must_use]
	/// # Data.
	pub fn data(&self) -> &[u8] { &self.data }

	#[must_use]
	/// # Into Data.
	pub fn into_data(self) -> Vec<u8> { self.data }
}



#[derive(Debug, Clone, Default, Eq, PartialEq)]
/// # Decoder Output.
///
/// Everything decoded, plus the address and end of each block.
pub(crate) struct Decoded {
	pub(crate) data: Vec<u8>,
	pub(crate) blocks: Vec<(Option<u16>, usize)>,
}

impl Decoded {
	/// # Split Into Blocks.
	fn into_blocks(self) -> Vec<Block> {
		let mut out = Vec::with_capacity(self.blocks.len());
		let mut start = 0;
		for (address, end) in self.blocks {
			out.push(Block { address, data: self.data[start..end].to_vec() });
			start = end;
		}
		out
	}
}



#[derive(Debug, Clone, Copy)]
/// # Decompressor.
pub struct Decompressor {
	/// # Codec.
	codec: Codec,

	/// # Expect Addresses?
	addressed: bool,
}

impl Decompressor {
	#[must_use]
	/// # New.
	pub const fn new(codec: Codec) -> Self {
		Self { codec, addressed: false }
	}

	#[must_use]
	/// # With Start Addresses.
	///
	/// Expect an M0 stream written with a start address. This has no effect
	/// on M4.
	pub const fn with_start_address(self, addressed: bool) -> Self {
		Self { addressed, ..self }
	}

	/// # Decompress.
	///
	/// Decode every block of `src` into one buffer.
	///
	/// ## Errors
	///
	/// Returns an error if the data is corrupt or truncated.
	pub fn decompress(&self, src: &[u8]) -> Result<Vec<u8>, EplzError> {
		self.decode(src).map(|d| d.data)
	}

	/// # Decompress (Per Block).
	///
	/// Decode `src`, returning each block separately, along with its load
	/// address if the stream has them.
	///
	/// ## Errors
	///
	/// Returns an error if the data is corrupt or truncated.
	pub fn decompress_blocks(&self, src: &[u8]) -> Result<Vec<Block>, EplzError> {
		self.decode(src).map(Decoded::into_blocks)
	}

	/// # Decode.
	fn decode(&self, src: &[u8]) -> Result<Decoded, EplzError> {
		let out = match self.codec {
			Codec::M0 => m0::decode(src, self.addressed)?,
			Codec::M4 => m4::decode(src)?,
		};
		Ok(out)
	}
}



/// # Compress.
///
/// Compress `src` as a single, closed stream with no start address.
///
/// ## Errors
///
/// Returns an error if the configuration is invalid.
pub fn compress(codec: Codec, src: &[u8], config: &CompressionConfig)
-> Result<Vec<u8>, EplzError> {
	let mut enc = Compressor::new(codec, *config)?;
	enc.compress_data(src, None, true, None)?;
	Ok(enc.into_inner())
}

/// # Decompress.
///
/// Decompress a stream with no start addresses.
///
/// ## Errors
///
/// Returns an error if the data is corrupt or truncated.
pub fn decompress(codec: Codec, src: &[u8]) -> Result<Vec<u8>, EplzError> {
	Decompressor::new(codec).decompress(src)
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_closed() {
		for codec in [Codec::M0, Codec::M4] {
			let mut enc = Compressor::new(codec, CompressionConfig::default())
				.expect("Compressor failed.");
			enc.compress_data(b"abcabcabc", None, true, None).expect("Compression failed.");
			assert!(enc.is_closed());
			assert!(matches!(
				enc.compress_data(b"more", None, true, None),
				Err(EplzError::ClosedStream),
			));
		}
	}

	#[test]
	fn t_empty() {
		for codec in [Codec::M0, Codec::M4] {
			let out = compress(codec, &[], &CompressionConfig::default())
				.expect("Compression failed.");
			assert!(out.is_empty());
			assert!(decompress(codec, &out).is_ok_and(|d| d.is_empty()));
		}
	}

	#[test]
	fn t_addresses() {
		let config = CompressionConfig::default().with_block_size(40);
		let src: Vec<u8> = (0..100_u8).map(|v| v % 7).collect();
		let mut enc = Compressor::new(Codec::M0, config).expect("Compressor failed.");
		enc.compress_data(&src, Some(0x4000), true, None).expect("Compression failed.");

		let blocks = Decompressor::new(Codec::M0)
			.with_start_address(true)
			.decompress_blocks(enc.as_bytes())
			.expect("Decompression failed.");
		assert_eq!(blocks.len(), 3);
		assert_eq!(blocks[0].address(), Some(0x4000));
		assert_eq!(blocks[1].address(), Some(0x4028));
		assert_eq!(blocks[2].address(), Some(0x4050));
		assert_eq!(blocks[2].data(), &src[80..]);

		let joined: Vec<u8> = blocks.into_iter().flat_map(Block::into_data).collect();
		assert_eq!(joined, src);
	}

	#[test]
	fn t_config() {
		let config = CompressionConfig::default().with_min_length(9).with_max_length(3);
		assert!(matches!(
			Compressor::new(Codec::M4, config),
			Err(EplzError::Config(_)),
		));
	}
}
