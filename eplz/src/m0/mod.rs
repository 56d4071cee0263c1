/*!
# Eplz: M0.

M0 streams open with a checksum byte followed by any number of blocks. Each
block has a small header (optional load address, two's complement byte
count, last-block flag, compression flag) and is either stored raw or coded
with two alphabets:

| Primary     | Meaning |
| ----------- | ------- |
| `0..=255`   | Literal byte. |
| `256..=315` | Distance slot, followed by extra bits and a length. |
| `316..=319` | Delta sequence at distance one through four, seven bits of delta, then a length. |
| `320..=323` | Recently-used distance, then a length. |

The secondary alphabet holds the 28 length slots. Each alphabet is coded
either with fixed 9- and 5-bit codes or with a Huffman table, whichever is
smaller.
*/

mod decode;
mod parse;

pub(crate) use decode::decode;

use crate::{
	bits::TokenBuf,
	CompressionConfig,
	EplzError,
	error::internal_error,
	huffman::HuffmanTable,
	progress::Tracker,
	search::{
		SearchLimits,
		SearchTable,
	},
	split::{
		BlockCoder,
		BlockRange,
		converge,
	},
};
use parse::{
	Lfsr,
	Parser,
	Step,
};



/// # Shortest Match.
const MIN_MATCH: usize = 2;

/// # Longest Match.
const MAX_MATCH: usize = 256;

/// # Farthest Distance.
const MAX_DIST: usize = 65_536;

/// # Primary Alphabet Size.
const PRIMARY_SYMBOLS: usize = 324;

/// # Length Alphabet Size.
const LENGTH_SYMBOLS: usize = 28;

/// # First Distance Symbol.
const SYM_DISTANCE: usize = 0x100;

/// # Sequence Symbol (Minus One).
const SYM_SEQUENCE: usize = 0x13B;

/// # First Cached Distance Symbol.
const SYM_CACHED: usize = 0x140;

/// # Fixed Primary Width.
const FIXED_PRIMARY: u8 = 9;

/// # Fixed Length Width.
const FIXED_LENGTH: u8 = 5;

/// # Cost of an Uncoded Symbol.
const UNSEEN_COST: u32 = 16_383;

/// # Depth Where Tie-Breaks Get Random.
const RANDOM_DEPTH: u8 = 9;

/// # Passes Per Size Estimate.
const FAST_PASSES: usize = 2;



/// # Slot Code.
///
/// Split a length or distance value into its slot code, extra bit count,
/// and extra bits. Values below eight are their own codes; beyond that each
/// power of two gets four codes with the two bits following the leading one
/// folded in.
const fn slot(value: u32) -> (usize, u8, u32) {
	if value < 8 { (value as usize, 0, 0) }
	else {
		let bits = u32::BITS - value.leading_zeros();
		let code = ((value >> (bits - 3)) & 3) | ((bits - 2) << 2);
		let extra = bits - 3;
		(code as usize, extra as u8, value & ((1 << extra) - 1))
	}
}

/// # Slot Extra Bits.
const fn slot_extra(code: usize) -> u8 {
	if code < 8 { 0 }
	else { (code >> 2) as u8 - 1 }
}

/// # Slot Base Value.
const fn slot_base(code: usize) -> u32 {
	if code < 8 { code as u32 }
	else { (4 | (code as u32 & 3)) << slot_extra(code) }
}

/// # Delta Code.
///
/// Deltas are within `0x40` of zero, and zero itself is never used, so the
/// range folds into seven bits.
const fn delta_code(delta: u8) -> u32 {
	let x = delta.wrapping_add(0x40);
	if 0x40 < x { x as u32 - 1 }
	else { x as u32 }
}

/// # Delta From Code.
const fn delta_value(code: u32) -> u8 {
	let x = if 0x40 <= code { code + 1 } else { code };
	(x as u8).wrapping_sub(0x40)
}



#[derive(Debug, Clone)]
/// # Cost Model.
///
/// Bits per symbol, as seen by the parser.
struct CostModel {
	primary: Vec<u32>,
	secondary: Vec<u32>,
}

impl CostModel {
	/// # Fixed Codes.
	fn fixed() -> Self {
		Self {
			primary: vec![u32::from(FIXED_PRIMARY); PRIMARY_SYMBOLS],
			secondary: vec![u32::from(FIXED_LENGTH); LENGTH_SYMBOLS],
		}
	}

	/// # From Tables.
	///
	/// Use the code lengths of whichever tables were actually used, with
	/// symbols they don't cover priced out of reach.
	fn from_tables(primary: Option<&HuffmanTable>, secondary: Option<&HuffmanTable>) -> Self {
		let mut out = Self::fixed();
		for (dst, src) in [(&mut out.primary, primary), (&mut out.secondary, secondary)] {
			if let Some(table) = src {
				for (d, &l) in dst.iter_mut().zip(table.lengths()) {
					*d = if l == 0 { UNSEEN_COST } else { u32::from(l) };
				}
			}
		}
		out
	}

	/// # Distance Cost.
	fn distance(&self, dist: usize) -> u32 {
		let (code, extra, _) = slot(dist as u32 - 1);
		self.primary[SYM_DISTANCE + code] + u32::from(extra)
	}

	/// # Length Cost.
	fn length(&self, len: usize) -> u32 {
		let (code, extra, _) = slot(len as u32 - 2);
		self.secondary[code] + u32::from(extra)
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Intermediate Symbol.
enum Symbol {
	/// # Primary Alphabet.
	Primary(usize),

	/// # Length Alphabet.
	Length(usize),

	/// # Raw Bits.
	Raw(u8, u32),
}



/// # M0 Block Coder.
pub(crate) struct Coder<'a> {
	/// # Source.
	src: &'a [u8],

	/// # Match Table.
	table: SearchTable,

	/// # Optimization Passes.
	passes: usize,

	/// # Shortest Match.
	min_len: usize,

	/// # Farthest Distance.
	max_dist: usize,

	/// # Load Address.
	start_addr: Option<u16>,

	/// # Tie-Break Randomizer.
	lfsr: Option<Lfsr>,

	/// # Primary Counts.
	primary: HuffmanTable,

	/// # Length Counts.
	secondary: HuffmanTable,
}

impl<'a> Coder<'a> {
	/// # New.
	pub(crate) fn new(src: &'a [u8], config: &CompressionConfig, start_addr: Option<u16>) -> Self {
		let max_len = (config.max_length() as usize).clamp(MIN_MATCH, MAX_MATCH);
		let min_len = (config.min_length() as usize).clamp(MIN_MATCH, max_len);
		let max_dist = (config.max_offset() as usize).min(MAX_DIST);
		let limits = SearchLimits {
			min_len,
			max_len,
			long_len: max_len,
			max_dist1: 0,
			max_dist2: max_dist,
			max_dist,
			max_seq: max_len,
		};

		Self {
			src,
			table: SearchTable::new(src, &limits),
			passes: usize::from(config.optimize_iterations()),
			min_len,
			max_dist,
			start_addr,
			lfsr: (RANDOM_DEPTH <= config.split_depth()).then(Lfsr::default),
			primary: HuffmanTable::new(PRIMARY_SYMBOLS),
			secondary: HuffmanTable::new(LENGTH_SYMBOLS),
		}
	}

	/// # One Pass.
	///
	/// Parse under `model`, then code the result, returning the tokens and
	/// the model implied by the tables chosen.
	fn pass(&mut self, rng: BlockRange, last: bool, model: &CostModel)
	-> Result<(TokenBuf, CostModel), EplzError> {
		let steps = Parser {
			src: self.src,
			table: &self.table,
			model,
			min_len: self.min_len,
			max_dist: self.max_dist,
		}.optimize(rng, self.lfsr.as_mut());
		let symbols = self.symbols(rng, &steps, model)?;

		self.primary.build()?;
		self.secondary.build()?;
		let huff1 = use_huffman(&self.primary, FIXED_PRIMARY);
		let huff2 = use_huffman(&self.secondary, FIXED_LENGTH);
		let next = CostModel::from_tables(
			huff1.then_some(&self.primary),
			huff2.then_some(&self.secondary),
		);

		// Header.
		let mut out = TokenBuf::new();
		let count = (65_536 - rng.len()) as u32 & 0xFFFF;
		if let Some(addr) = self.start_addr {
			out.bits(16, (u32::from(addr) + rng.start() as u32) & 0xFFFF);
		}
		out.bits(16, count);
		out.bits(1, u32::from(last));
		let head = out.size();

		// Body.
		out.bits(1, 1);
		for (table, huff) in [(&self.primary, huff1), (&self.secondary, huff2)] {
			out.bits(1, u32::from(huff));
			if huff { table.write_table(&mut out); }
		}
		for s in symbols {
			match s {
				Symbol::Primary(sym) => code(&mut out, &self.primary, huff1, FIXED_PRIMARY, sym)?,
				Symbol::Length(sym) => code(&mut out, &self.secondary, huff2, FIXED_LENGTH, sym)?,
				Symbol::Raw(len, bits) => out.bits(len, bits),
			}
		}

		// Store it instead?
		if (rng.len() as u64) * 8 <= out.size() - head - 1 {
			out = TokenBuf::new();
			if let Some(addr) = self.start_addr {
				out.bits(16, (u32::from(addr) + rng.start() as u32) & 0xFFFF);
			}
			out.bits(16, count);
			out.bits(1, u32::from(last));
			out.bits(1, 0);
			for &b in &self.src[rng.rng()] { out.bits(8, u32::from(b)); }
		}

		Ok((out, next))
	}

	/// # Symbols.
	///
	/// Convert a parse into intermediate symbols, counting them as we go.
	/// Far distances are tracked in a four-entry recently-used list; a
	/// repeat is coded as its list position when that is no more expensive.
	fn symbols(&mut self, rng: BlockRange, steps: &[Step], model: &CostModel)
	-> Result<Vec<Symbol>, EplzError> {
		self.primary.clear();
		self.secondary.clear();

		let mut out = Vec::with_capacity(rng.len());
		let mut recent = [0_usize; 4];
		let mut pos = 0;
		while pos < rng.len() {
			let step = steps.get(pos).copied().ok_or(internal_error!())?;
			if step.len < MIN_MATCH {
				out.push(Symbol::Primary(usize::from(self.src[rng.start() + pos])));
				pos += 1;
				continue;
			}

			if step.delta != 0 {
				out.push(Symbol::Primary(SYM_SEQUENCE + step.dist));
				out.push(Symbol::Raw(7, delta_code(step.delta)));
			}
			else if let Some(idx) = cached(&recent, step.dist, model) {
				out.push(Symbol::Primary(SYM_CACHED + idx));
			}
			else {
				if 8 < step.dist { remember(&mut recent, step.dist); }
				let (code, extra, bits) = slot(step.dist as u32 - 1);
				out.push(Symbol::Primary(SYM_DISTANCE + code));
				out.push(Symbol::Raw(extra, bits));
			}

			let (code, extra, bits) = slot(step.len as u32 - 2);
			out.push(Symbol::Length(code));
			out.push(Symbol::Raw(extra, bits));
			pos += step.len;
		}

		for s in &out {
			match *s {
				Symbol::Primary(sym) => self.primary.add(sym)?,
				Symbol::Length(sym) => self.secondary.add(sym)?,
				Symbol::Raw(..) => {},
			}
		}

		Ok(out)
	}
}

impl BlockCoder for Coder<'_> {
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
		if let Some(lfsr) = self.lfsr.as_mut() { *lfsr = Lfsr::default(); }
		let mut model = CostModel::fixed();
		converge(self.passes(fast), rng.len(), tracker, |_| {
			let (tokens, next) = self.pass(rng, last, &model)?;
			model = next;
			Ok(Some(tokens))
		})
	}
}



/// # Cached Distance Index.
///
/// Return the recently-used slot holding `dist`, if any, and if using it is
/// no more expensive than spelling it out.
fn cached(recent: &[usize; 4], dist: usize, model: &CostModel) -> Option<usize> {
	if dist <= 8 { return None; }
	let idx = recent.iter().position(|&d| d == dist)?;
	if model.primary[SYM_CACHED + idx] < model.distance(dist) { Some(idx) }
	else { None }
}

/// # Remember a Distance.
const fn remember(recent: &mut [usize; 4], dist: usize) {
	recent[3] = recent[2];
	recent[2] = recent[1];
	recent[1] = recent[0];
	recent[0] = dist;
}

/// # Use Huffman?
///
/// Huffman coding has to beat the fixed-width codes outright to pay for its
/// table.
fn use_huffman(table: &HuffmanTable, width: u8) -> bool {
	table.table_bits() + table.payload_bits() < table.fixed_bits(width)
}

/// # Code a Symbol.
fn code(out: &mut TokenBuf, table: &HuffmanTable, huff: bool, width: u8, sym: usize)
-> Result<(), EplzError> {
	if huff {
		let (len, bits) = table.encode(sym).ok_or(internal_error!())?;
		out.bits(len, bits);
	}
	else { out.bits(width, sym as u32); }
	Ok(())
}
