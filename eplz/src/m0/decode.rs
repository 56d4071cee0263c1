/*!
# Eplz: M0 Decoder.
*/

use super::{
	delta_value,
	FIXED_LENGTH,
	FIXED_PRIMARY,
	LENGTH_SYMBOLS,
	PRIMARY_SYMBOLS,
	remember,
	slot_base,
	slot_extra,
	SYM_CACHED,
	SYM_DISTANCE,
	SYM_SEQUENCE,
};
use crate::{
	bits::{
		BitReader,
		checksum,
	},
	FormatError,
	FormatErrorKind,
	huffman::HuffmanDecoder,
	stream::Decoded,
};



/// # Alphabet.
enum Alphabet {
	/// # Fixed Width (Bits, Symbols).
	Fixed(u8, usize),

	/// # Huffman.
	Huffman(HuffmanDecoder),
}

impl Alphabet {
	/// # Read.
	fn read(r: &mut BitReader<'_>, size: usize, width: u8) -> Result<Self, FormatError> {
		if r.bit()? == 0 { Ok(Self::Fixed(width, size)) }
		else { HuffmanDecoder::read(r, size).map(Self::Huffman) }
	}

	/// # Decode a Symbol.
	fn decode(&self, r: &mut BitReader<'_>) -> Result<usize, FormatError> {
		match self {
			Self::Fixed(width, size) => {
				let sym = r.bits(*width)? as usize;
				if sym < *size { Ok(sym) }
				else { Err(r.error(FormatErrorKind::InvalidCode)) }
			},
			Self::Huffman(h) => h.decode(r),
		}
	}
}



/// # Decode.
///
/// Verify the checksum, then decode blocks until one is flagged last (or the
/// data runs out). If `addressed`, each block header is expected to begin
/// with a load address.
///
/// ## Errors
///
/// Corrupt or truncated data is reported with the block and byte offset
/// where decoding stopped.
pub(crate) fn decode(src: &[u8], addressed: bool) -> Result<Decoded, FormatError> {
	let mut out = Decoded::default();
	let Some((&chk, rest)) = src.split_first() else { return Ok(out); };
	if checksum(rest) != chk {
		return Err(FormatError::new(0, 0, FormatErrorKind::Checksum));
	}

	let mut r = BitReader::new(src, 1);
	loop {
		let address =
			if addressed { Some(r.bits(16)? as u16) }
			else { None };
		let n = match r.bits(16)? {
			0 => 65_536,
			c => 65_536 - c as usize,
		};
		let last = r.bit()? == 1;

		if r.bit()? == 0 {
			out.data.reserve(n);
			for _ in 0..n { out.data.push(r.bits(8)? as u8); }
		}
		else { block(&mut r, &mut out.data, n)?; }
		out.blocks.push((address, out.data.len()));

		if last || r.is_exhausted() { break; }
		r.next_block();
	}

	r.finish()?;
	Ok(out)
}

/// # Decode a Compressed Block.
fn block(r: &mut BitReader<'_>, out: &mut Vec<u8>, n: usize) -> Result<(), FormatError> {
	let primary = Alphabet::read(r, PRIMARY_SYMBOLS, FIXED_PRIMARY)?;
	let lengths = Alphabet::read(r, LENGTH_SYMBOLS, FIXED_LENGTH)?;
	let end = out.len() + n;
	let mut recent = [0_usize; 4];

	while out.len() < end {
		let sym = primary.decode(r)?;
		if sym < SYM_DISTANCE {
			out.push(sym as u8);
			continue;
		}

		let (dist, delta) =
			if sym <= SYM_SEQUENCE {
				let code = sym - SYM_DISTANCE;
				let dist = (slot_base(code) | r.bits(slot_extra(code))?) as usize + 1;
				if 8 < dist { remember(&mut recent, dist); }
				(dist, 0)
			}
			else if sym < SYM_CACHED { (sym - SYM_SEQUENCE, delta_value(r.bits(7)?)) }
			else { (recent[sym - SYM_CACHED], 0) };

		let code = lengths.decode(r)?;
		let len = (slot_base(code) | r.bits(slot_extra(code))?) as usize + 2;

		if dist == 0 || out.len() < dist {
			return Err(r.error(FormatErrorKind::Distance));
		}
		if end < out.len() + len {
			return Err(r.error(FormatErrorKind::InvalidCode));
		}
		for _ in 0..len {
			let b = out[out.len() - dist];
			out.push(b.wrapping_add(delta));
		}
	}

	Ok(())
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::bits::{
		BitWriter,
		TokenBuf,
	};

	/// # Finish a Stream.
	fn stream(tokens: &TokenBuf) -> Vec<u8> {
		let mut w = BitWriter::default();
		w.reserve();
		w.write(tokens).expect("Write failed.");
		w.close_with_checksum();
		w.into_inner()
	}

	#[test]
	fn t_raw() {
		let mut t = TokenBuf::new();
		t.bits(16, 0x1000);
		t.bits(16, 65_536 - 3);
		t.bits(1, 1);
		t.bits(1, 0);
		for b in [1, 2, 3] { t.bits(8, b); }
		let src = stream(&t);

		let out = decode(&src, true).expect("Decode failed.");
		assert_eq!(out.data, [1, 2, 3]);
		assert_eq!(out.blocks, [(Some(0x1000), 3)]);

		// A flipped bit trips the checksum.
		let mut bad = src.clone();
		bad[2] ^= 1;
		assert_eq!(
			decode(&bad, true).map_err(|e| e.kind()),
			Err(FormatErrorKind::Checksum),
		);
	}

	#[test]
	fn t_fixed() {
		// "ab" then a five-byte match at distance two, using fixed codes.
		let mut t = TokenBuf::new();
		t.bits(16, 65_536 - 7);
		t.bits(1, 1);
		t.bits(1, 1);
		t.bits(1, 0);
		t.bits(1, 0);
		t.bits(9, u32::from(b'a'));
		t.bits(9, u32::from(b'b'));
		t.bits(9, 0x101);
		t.bits(5, 3);
		let src = stream(&t);

		let out = decode(&src, false).expect("Decode failed.");
		assert_eq!(out.data, b"abababa");
	}

	#[test]
	fn t_errors() {
		// A match before any data.
		let mut t = TokenBuf::new();
		t.bits(16, 65_536 - 4);
		t.bits(1, 1);
		t.bits(1, 1);
		t.bits(1, 0);
		t.bits(1, 0);
		t.bits(9, 0x100);
		t.bits(5, 2);
		let src = stream(&t);
		assert_eq!(
			decode(&src, false).map_err(|e| e.kind()),
			Err(FormatErrorKind::Distance),
		);

		// Cut short.
		let mut t = TokenBuf::new();
		t.bits(16, 65_536 - 4);
		t.bits(1, 1);
		t.bits(1, 0);
		t.bits(8, 1);
		let src = stream(&t);
		assert_eq!(
			decode(&src, false).map_err(|e| e.kind()),
			Err(FormatErrorKind::Truncated),
		);

		// Nothing at all is fine.
		assert!(decode(&[], false).is_ok_and(|d| d.data.is_empty()));
	}
}
