/*!
# Eplz: M4 Decoder.
*/

use super::{
	LENGTH_SLOTS,
	OFFS1_PREFIX,
	OFFS2_PREFIX,
	RUN_MIN,
};
use crate::{
	bits::BitReader,
	FormatError,
	FormatErrorKind,
	slots::SlotDecoder,
	stream::Decoded,
};



/// # Decode.
///
/// Decode blocks until one is flagged last (or the data runs out).
///
/// ## Errors
///
/// Corrupt or truncated data is reported with the block and byte offset
/// where decoding stopped.
pub(crate) fn decode(src: &[u8]) -> Result<Decoded, FormatError> {
	let mut out = Decoded::default();
	if src.is_empty() { return Ok(out); }

	let mut r = BitReader::new(src, 0);
	loop {
		let last = block(&mut r, &mut out.data)?;
		out.blocks.push((None, out.data.len()));
		if last || r.is_exhausted() { break; }
		r.next_block();
	}

	r.finish()?;
	Ok(out)
}

/// # Decode a Block.
///
/// Returns `true` if it was the last.
fn block(r: &mut BitReader<'_>, out: &mut Vec<u8>) -> Result<bool, FormatError> {
	let offs3_prefix = r.bits(2)? as u8 + 2;
	let offs1 = SlotDecoder::read(r, 1 << OFFS1_PREFIX)?;
	let length = SlotDecoder::read(r, usize::from(LENGTH_SLOTS))?;
	let offs2 = SlotDecoder::read(r, 1 << OFFS2_PREFIX)?;
	let offs3 = SlotDecoder::read(r, 1 << offs3_prefix)?;

	loop {
		// Literal.
		if r.bit()? == 0 {
			out.push(r.aligned()?);
			continue;
		}

		// Length slot, or the marker.
		let mut slot = 0;
		while slot < LENGTH_SLOTS && r.bit()? == 1 { slot += 1; }
		if slot == LENGTH_SLOTS {
			match r.aligned()? {
				0 => return Ok(true),
				1 => return Ok(false),
				n => {
					let len = usize::from(n) + RUN_MIN - 2;
					out.reserve(len);
					for _ in 0..len { out.push(r.aligned()?); }
				},
			}
			continue;
		}

		let len = length.value(r, usize::from(slot))? as usize + 1;
		let (table, prefix) = match len {
			1 => (&offs1, OFFS1_PREFIX),
			2 => (&offs2, OFFS2_PREFIX),
			_ => (&offs3, offs3_prefix),
		};
		let slot = r.bits(prefix)? as usize;
		let dist = table.value(r, slot)? as usize + 1;
		if out.len() < dist { return Err(r.error(FormatErrorKind::Distance)); }

		out.reserve(len);
		for _ in 0..len {
			let b = out[out.len() - dist];
			out.push(b);
		}
	}
}
