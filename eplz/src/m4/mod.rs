/*!
# Eplz: M4.

M4 is the byte-aligned sibling of M0: no checksum, no load addresses, and
no Huffman coding. Literals are a zero flag bit plus a whole byte; matches
are a one bit, a unary length slot and its extra bits, then an offset slot
and its extra bits drawn from one of three tables depending on the length.

Nine consecutive one bits mark either a run of raw literals or the end of a
block, distinguished by the byte that follows.
*/

mod decode;
mod parse;

pub(crate) use decode::decode;

use crate::{
	bits::TokenBuf,
	CompressionConfig,
	EplzError,
	error::internal_error,
	progress::Tracker,
	search::{
		SearchLimits,
		SearchTable,
	},
	slots::{
		Prefix,
		SlotTable,
		UNENCODED_SIZE,
	},
	split::{
		BlockCoder,
		BlockRange,
		converge,
	},
};
use parse::{
	Parser,
	Step,
};



/// # Longest Match Evaluated Length-by-Length.
const MAX_DP_LEN: usize = 512;

/// # Longest Match.
const MAX_MATCH: usize = 65_535;

/// # Farthest Distance.
const MAX_DIST: usize = 65_535;

/// # Farthest One-Byte Match.
const MAX_DIST1: usize = 256;

/// # Farthest Two-Byte Match.
const MAX_DIST2: usize = 4096;

/// # Length Slots.
const LENGTH_SLOTS: u8 = 8;

/// # Offset Prefix Width (One-Byte Matches).
const OFFS1_PREFIX: u8 = 2;

/// # Offset Prefix Width (Two-Byte Matches).
const OFFS2_PREFIX: u8 = 3;

/// # Shortest Literal Run.
const RUN_MIN: usize = 18;

/// # Longest Literal Run.
const RUN_MAX: usize = 271;

/// # Marker (Nine One Bits).
const MARKER: u32 = 0x1FF;

/// # Unencoded Length Size During Parsing.
const PARSE_UNENCODED: u32 = LENGTH_SLOTS as u32 + 15;

/// # Largest Encodable Match.
const MAX_CODE_BITS: u32 = 64;

/// # Passes Per Size Estimate.
///
/// One to gather statistics, one to code with them.
const FAST_PASSES: usize = 2;



/// # M4 Block Coder.
pub(crate) struct Coder<'a> {
	/// # Source.
	src: &'a [u8],

	/// # Match Table.
	table: SearchTable,

	/// # Optimization Passes.
	passes: usize,

	/// # Shortest Match.
	min_len: usize,

	/// # Length Table.
	length: SlotTable,

	/// # Offsets (One-Byte Matches).
	offs1: SlotTable,

	/// # Offsets (Two-Byte Matches).
	offs2: SlotTable,

	/// # Offsets (Everything Longer).
	offs3: SlotTable,
}

impl<'a> Coder<'a> {
	/// # New.
	pub(crate) fn new(src: &'a [u8], config: &CompressionConfig) -> Self {
		let long_len = (config.max_length() as usize).clamp(1, MAX_MATCH);
		let max_len = long_len.min(MAX_DP_LEN);
		let min_len = (config.min_length() as usize).clamp(1, max_len);
		let max_dist = (config.max_offset() as usize)
			.min(MAX_DIST)
			.min(src.len().saturating_sub(1))
			.max(1);
		let limits = SearchLimits {
			min_len,
			max_len,
			long_len,
			max_dist1: MAX_DIST1.min(max_dist),
			max_dist2: MAX_DIST2.min(max_dist),
			max_dist,
			max_seq: 0,
		};

		Self {
			src,
			table: SearchTable::new(src, &limits),
			// The first pass only gathers statistics.
			passes: usize::from(config.optimize_iterations()).max(2),
			min_len,
			length: SlotTable::new(Prefix::Unary(LENGTH_SLOTS), MAX_MATCH as u32 - 1),
			offs1: SlotTable::new(Prefix::Fixed(OFFS1_PREFIX), MAX_DIST1 as u32 - 1),
			offs2: SlotTable::new(Prefix::Fixed(OFFS2_PREFIX), MAX_DIST2 as u32 - 1),
			offs3: SlotTable::new(Prefix::Variable(2, 5), MAX_DIST as u32 - 1),
		}
	}

	/// # Offset Table (by Length).
	const fn offsets(&self, len: usize) -> &SlotTable {
		match len {
			1 => &self.offs1,
			2 => &self.offs2,
			_ => &self.offs3,
		}
	}

	/// # Match Size.
	///
	/// Flag, length and offset bits, under the current tables.
	fn match_bits(&self, dist: usize, len: usize) -> u32 {
		self.length.symbol_size(len as u32 - 1) + 1 +
		self.offsets(len).symbol_size(dist as u32 - 1)
	}

	/// # One Pass.
	///
	/// Refit the offset tables to the previous pass's statistics, parse,
	/// then refit the length table to this parse. The first pass has no
	/// offset statistics to work with, so it parses with fixed guesses and
	/// writes nothing.
	fn pass(&mut self, rng: BlockRange, last: bool, first: bool, fast: bool)
	-> Result<Option<TokenBuf>, EplzError> {
		let steps =
			if first { self.parser().optimize_fixed(rng) }
			else {
				self.offs1.update(false);
				self.offs2.update(false);
				self.offs3.update(fast);
				self.length.set_unencoded_size(PARSE_UNENCODED);
				self.parser().optimize(rng)
			};
		self.length.set_unencoded_size(UNENCODED_SIZE);
		self.gather(&steps)?;
		if first { return Ok(None); }

		// Tables.
		let mut out = TokenBuf::new();
		out.bits(2, u32::from(self.offs3.prefix_bits() - 2));
		self.offs1.write_sizes(&mut out);
		self.length.write_sizes(&mut out);
		self.offs2.write_sizes(&mut out);
		self.offs3.write_sizes(&mut out);

		// Data.
		let mut pos = 0;
		while pos < steps.len() {
			let Step { dist, len } = steps.get(pos).copied().ok_or(internal_error!())?;
			if dist != 0 && self.keep_match(dist, len) {
				out.bits(1, 1);
				self.length.encode(len as u32 - 1, &mut out)?;
				self.offsets(len).encode(dist as u32 - 1, &mut out)?;
			}
			else { self.literals(rng.start() + pos, len, &mut out)?; }
			pos += len;
		}

		out.bits(9, MARKER);
		out.aligned(u8::from(! last));
		Ok(Some(out))
	}

	/// # Parser.
	const fn parser(&self) -> Parser<'_> {
		Parser {
			table: &self.table,
			min_len: self.min_len,
			length: &self.length,
			offs1: &self.offs1,
			offs2: &self.offs2,
			offs3: &self.offs3,
		}
	}

	/// # Gather Statistics.
	///
	/// Refit the length table to the parse, then count the offsets of every
	/// match it can still code. Each value is tagged with what spelling the
	/// match out as literals would cost instead.
	fn gather(&mut self, steps: &[Step]) -> Result<(), EplzError> {
		let mut pos = 0;
		while pos < steps.len() {
			let Step { dist, len } = steps.get(pos).copied().ok_or(internal_error!())?;
			if dist != 0 {
				let prefix = if 1 < len { OFFS2_PREFIX } else { OFFS1_PREFIX };
				let cost = (len as u64 * 9).saturating_sub(1 + u64::from(prefix));
				self.length.add(len as u32 - 1, cost);
			}
			pos += len;
		}
		self.length.update(false);

		let mut pos = 0;
		while pos < steps.len() {
			let Step { dist, len } = steps[pos];
			if dist != 0 {
				let size = self.length.symbol_size(len as u32 - 1);
				if size <= MAX_CODE_BITS {
					let cost = (len as u64 * 9).saturating_sub(1 + u64::from(size));
					let table = match len {
						1 => &mut self.offs1,
						2 => &mut self.offs2,
						_ => &mut self.offs3,
					};
					table.add(dist as u32 - 1, cost);
				}
			}
			pos += len;
		}

		Ok(())
	}

	/// # Keep Match?
	///
	/// A match is dropped for literals if it can't be coded, or if literals
	/// would be no larger.
	fn keep_match(&self, dist: usize, len: usize) -> bool {
		let bits = self.match_bits(dist, len);
		if MAX_CODE_BITS < bits { return false; }
		let bits = bits as usize;
		! ((RUN_MIN <= len && len * 8 + RUN_MIN - 1 < bits) || len * 9 <= bits)
	}

	/// # Write Literals.
	///
	/// Long stretches go out as runs, the rest one at a time.
	fn literals(&self, start: usize, len: usize, out: &mut TokenBuf) -> Result<(), EplzError> {
		let bytes = self.src.get(start..start + len).ok_or(internal_error!())?;
		let mut chunks = bytes;
		while RUN_MIN <= chunks.len() {
			let (run, rest) = chunks.split_at(chunks.len().min(RUN_MAX));
			out.bits(9, MARKER);
			out.aligned((run.len() + 2 - RUN_MIN) as u8);
			for &b in run { out.aligned(b); }
			chunks = rest;
		}
		for &b in chunks {
			out.bits(1, 0);
			out.aligned(b);
		}
		Ok(())
	}
}

impl BlockCoder for Coder<'_> {
	const SPLIT_BIAS: u8 = 1;

	fn passes(&self, fast: bool) -> usize {
		if fast { FAST_PASSES } else { self.passes }
	}

	fn encode_block(
		&mut self,
		rng: BlockRange,
		last: bool,
		fast: bool,
		tracker: &mut Tracker<'_>,
	) -> Result<TokenBuf, EplzError> {
		self.length.clear();
		self.offs1.clear();
		self.offs2.clear();
		self.offs3.clear();
		converge(self.passes(fast), rng.len(), tracker, |idx| self.pass(rng, last, idx == 0, fast))
	}
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_literals() {
		let src: Vec<u8> = (0..300_u16).map(|v| v as u8).collect();
		let config = CompressionConfig::new();
		let coder = Coder::new(&src, &config);

		// Seventeen singles, each a flag bit plus a byte.
		let mut out = TokenBuf::new();
		coder.literals(0, 17, &mut out).expect("Literals failed.");
		assert_eq!(out.size(), 17 * 9);

		// Eighteen make a run.
		let mut out = TokenBuf::new();
		coder.literals(0, 18, &mut out).expect("Literals failed.");
		assert_eq!(out.size(), 9 + 8 + 18 * 8);

		// A full run of 271, then the remaining 19 as a second run.
		let mut out = TokenBuf::new();
		coder.literals(0, 290, &mut out).expect("Literals failed.");
		assert_eq!(out.size(), (17 + 271 * 8) + (17 + 19 * 8));

		// A full run plus seventeen leftovers, which go out one at a time.
		let mut out = TokenBuf::new();
		coder.literals(0, 288, &mut out).expect("Literals failed.");
		assert_eq!(out.size(), (17 + 271 * 8) + 17 * 9);

		// Out of range.
		let mut out = TokenBuf::new();
		assert!(coder.literals(0, 301, &mut out).is_err());
		assert!(out.is_empty());
	}

	#[test]
	fn t_keep_match() {
		let src = vec![0_u8; 1024];
		let config = CompressionConfig::new();
		let mut coder = Coder::new(&src, &config);
		for _ in 0..10 {
			coder.length.add(99, 500);
			coder.offs3.add(0, 500);
		}
		coder.length.update(false);
		coder.offs3.update(false);

		// A long, cheap match is worth keeping.
		assert!(coder.keep_match(1, 100));

		// A length the table can't code is not.
		assert!(! coder.keep_match(1, 300));
	}
}
