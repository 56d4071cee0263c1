/*!
# Eplz: Bit Streams.

Both formats pack codes MSB-first into bytes. M4 additionally interleaves
whole bytes ("aligned" writes) with the bit stream; those are stored
immediately while the partially-filled bit register gets a reserved byte
slot of its own, filled in later.
*/

use crate::{
	EplzError,
	FormatError,
	FormatErrorKind,
};



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Token.
///
/// A single entry in an encoded block: some bits or an aligned byte.
pub(crate) enum Token {
	/// # Bits (MSB-first).
	Code { len: u8, bits: u32 },

	/// # Aligned Byte.
	Aligned(u8),
}

impl Token {
	/// # Size in Bits.
	const fn bit_len(self) -> u64 {
		match self {
			Self::Code { len, .. } => len as u64,
			Self::Aligned(_) => 8,
		}
	}

	/// # Hash Word.
	const fn word(self) -> u32 {
		match self {
			Self::Code { len, bits } => ((len as u32) << 24) | (bits & 0x00FF_FFFF),
			Self::Aligned(b) => 0x8800_0000 | b as u32,
		}
	}
}



#[derive(Debug, Clone, Default, Eq, PartialEq)]
/// # Token Buffer.
///
/// An encoded block (or run of blocks) that has not yet been committed to
/// the output. The running size makes comparing candidate encodings cheap.
pub(crate) struct TokenBuf {
	/// # Tokens.
	tokens: Vec<Token>,

	/// # Total Bits.
	size: u64,
}

impl TokenBuf {
	/// # New.
	pub(crate) const fn new() -> Self {
		Self { tokens: Vec::new(), size: 0 }
	}

	/// # Push Bits.
	///
	/// Zero-length pushes are ignored.
	pub(crate) fn bits(&mut self, len: u8, bits: u32) {
		if len != 0 {
			debug_assert!(len <= 32, "Bit lengths are capped at 32.");
			self.tokens.push(Token::Code { len, bits });
			self.size += u64::from(len);
		}
	}

	/// # Push Aligned Byte.
	pub(crate) fn aligned(&mut self, byte: u8) {
		self.tokens.push(Token::Aligned(byte));
		self.size += 8;
	}

	/// # Append.
	pub(crate) fn append(&mut self, other: &Self) {
		self.tokens.extend_from_slice(&other.tokens);
		self.size += other.size;
	}

	/// # Size in Bits.
	pub(crate) const fn size(&self) -> u64 { self.size }

	/// # Tokens.
	pub(crate) fn tokens(&self) -> &[Token] { &self.tokens }

	/// # Fingerprint.
	///
	/// Hash the token stream and size together. Optimization passes stop
	/// early once a fingerprint repeats, since the parse has converged.
	pub(crate) fn fingerprint(&self) -> u64 {
		let mut h: u64 = 1;
		for t in &self.tokens {
			h ^= u64::from(t.word());
			h = (h & 0xFFFF_FFFF) * 0xC2B0_C3CC;
			h = (h ^ (h >> 32)) & 0xFFFF_FFFF;
		}
		h | (self.size << 32)
	}
}

#[cfg(test)]
impl TokenBuf {
	/// # Is Empty?
	pub(crate) fn is_empty(&self) -> bool { self.tokens.is_empty() }
}



#[derive(Debug, Default)]
/// # Bit Writer.
///
/// This commits token streams to bytes, holding the partial register
/// between calls so successive blocks pack together.
pub(crate) struct BitWriter {
	/// # Output.
	buf: Vec<u8>,

	/// # Bit Register.
	reg: u8,

	/// # Bits in Register.
	used: u8,

	/// # Reserved Byte for the Register.
	hole: Option<usize>,

	/// # Closed?
	closed: bool,
}

impl BitWriter {
	/// # Is Closed?
	pub(crate) const fn is_closed(&self) -> bool { self.closed }

	/// # Is Empty?
	pub(crate) const fn is_empty(&self) -> bool {
		self.buf.is_empty() && self.used == 0
	}

	/// # Reserve a Leading Byte.
	///
	/// M0 stores its checksum up front; this sets aside the space for it.
	pub(crate) fn reserve(&mut self) { self.buf.push(0); }

	/// # Write Tokens.
	///
	/// ## Errors
	///
	/// Writing to a closed stream is an error.
	pub(crate) fn write(&mut self, tokens: &TokenBuf) -> Result<(), EplzError> {
		if self.closed { return Err(EplzError::ClosedStream); }
		for t in tokens.tokens() {
			match *t {
				Token::Code { len, bits } => self.put_bits(len, bits),
				Token::Aligned(b) => self.put_aligned(b),
			}
		}
		Ok(())
	}

	/// # Write Bits.
	fn put_bits(&mut self, len: u8, bits: u32) {
		for shift in (0..len).rev() {
			self.reg = (self.reg << 1) | ((bits >> shift) & 1) as u8;
			self.used += 1;
			if self.used == 8 { self.flush(); }
		}
	}

	/// # Write Aligned.
	fn put_aligned(&mut self, b: u8) {
		if self.used != 0 && self.hole.is_none() {
			self.hole = Some(self.buf.len());
			self.buf.push(0);
		}
		self.buf.push(b);
	}

	/// # Flush Register.
	fn flush(&mut self) {
		let reg = self.reg;
		match self.hole.take().and_then(|pos| self.buf.get_mut(pos)) {
			Some(slot) => { *slot = reg; },
			None => { self.buf.push(reg); },
		}
		self.reg = 0;
		self.used = 0;
	}

	/// # Close.
	///
	/// Zero-pad the register and refuse further writes.
	pub(crate) fn close(&mut self) {
		if self.used != 0 {
			self.reg <<= 8 - self.used;
			self.flush();
		}
		self.closed = true;
	}

	/// # Close With Checksum.
	///
	/// Close the stream, then store the checksum of everything after the
	/// first byte into the first byte.
	pub(crate) fn close_with_checksum(&mut self) {
		self.close();
		if let Some((first, rest)) = self.buf.split_first_mut() {
			*first = checksum(rest);
		}
	}

	/// # Bytes.
	pub(crate) fn as_slice(&self) -> &[u8] { &self.buf }

	/// # Into Inner.
	pub(crate) fn into_inner(self) -> Vec<u8> { self.buf }
}



/// # Checksum.
///
/// This covers the compressed stream after the checksum byte itself, in
/// reverse order.
pub(crate) fn checksum(data: &[u8]) -> u8 {
	data.iter()
		.rev()
		.fold(0_u8, |chk, &b| (chk ^ b).rotate_left(1).wrapping_add(0xC4))
		^ 0x5E
}



#[derive(Debug, Clone)]
/// # Bit Reader.
///
/// The mirror of [`BitWriter`]. Reads past the end are reported as
/// truncation errors tagged with the current block and byte position.
pub(crate) struct BitReader<'a> {
	/// # Source.
	src: &'a [u8],

	/// # Next Byte.
	pos: usize,

	/// # Bit Register.
	reg: u8,

	/// # Bits Left in Register.
	left: u8,

	/// # Current Block (for Errors).
	block: usize,
}

impl<'a> BitReader<'a> {
	/// # New.
	///
	/// Start reading at `pos`.
	pub(crate) const fn new(src: &'a [u8], pos: usize) -> Self {
		Self { src, pos, reg: 0, left: 0, block: 0 }
	}

	/// # Next Block.
	pub(crate) const fn next_block(&mut self) { self.block += 1; }

	/// # Current Block.
	pub(crate) const fn block(&self) -> usize { self.block }

	/// # Error.
	pub(crate) const fn error(&self, kind: FormatErrorKind) -> FormatError {
		FormatError::new(self.block, self.pos, kind)
	}

	/// # Read a Bit.
	pub(crate) fn bit(&mut self) -> Result<u32, FormatError> {
		if self.left == 0 {
			self.reg = self.byte()?;
			self.left = 8;
		}
		self.left -= 1;
		Ok(u32::from((self.reg >> self.left) & 1))
	}

	/// # Read Bits.
	pub(crate) fn bits(&mut self, len: u8) -> Result<u32, FormatError> {
		let mut out = 0;
		for _ in 0..len { out = (out << 1) | self.bit()?; }
		Ok(out)
	}

	/// # Read an Aligned Byte.
	pub(crate) fn aligned(&mut self) -> Result<u8, FormatError> { self.byte() }

	/// # Next Byte.
	fn byte(&mut self) -> Result<u8, FormatError> {
		let b = self.src.get(self.pos).copied()
			.ok_or_else(|| self.error(FormatErrorKind::Truncated))?;
		self.pos += 1;
		Ok(b)
	}

	/// # Is Exhausted?
	///
	/// True once every byte has been loaded. Bits left in the register at
	/// that point can only be padding if they are too few to start a block.
	pub(crate) const fn is_exhausted(&self) -> bool { self.src.len() <= self.pos }

	/// # Finish.
	///
	/// Make sure nothing but register padding remains.
	pub(crate) const fn finish(&self) -> Result<(), FormatError> {
		if self.pos < self.src.len() {
			Err(self.error(FormatErrorKind::TrailingData))
		}
		else { Ok(()) }
	}
}
