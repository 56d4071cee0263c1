/*!
# Eplz: Huffman Tables.

M0 codes its two alphabets with canonical prefix codes of up to sixteen bits.
Code lengths come from the boundary package-merge algorithm; the tables are
stored as per-length symbol lists with Elias gamma coded deltas, which
limits each length to 255 symbols.
*/

use crate::{
	bits::{
		BitReader,
		TokenBuf,
	},
	EplzError,
	error::internal_error,
	FormatError,
	FormatErrorKind,
};
use std::mem;



/// # Longest Code.
pub(crate) const MAX_CODE_LEN: u8 = 16;

/// # Most Symbols Per Length.
const MAX_PER_LEN: usize = 255;

/// # Shortest Limit Worth Trying.
///
/// Nothing here has more than 512 symbols.
const MIN_CODE_LEN: u8 = 9;



#[derive(Debug, Clone)]
/// # Huffman Table (Encoder).
///
/// Symbol counts go in, code lengths and canonical codes come out.
pub(crate) struct HuffmanTable {
	/// # Symbol Counts.
	counts: Vec<u32>,

	/// # Code Lengths.
	lengths: Vec<u8>,

	/// # Codes.
	codes: Vec<u16>,
}

impl HuffmanTable {
	/// # New.
	pub(crate) fn new(size: usize) -> Self {
		Self {
			counts: vec![0; size],
			lengths: vec![0; size],
			codes: vec![0; size],
		}
	}

	/// # Clear Counts.
	pub(crate) fn clear(&mut self) { self.counts.fill(0); }

	/// # Count a Symbol.
	pub(crate) fn add(&mut self, sym: usize) -> Result<(), EplzError> {
		let c = self.counts.get_mut(sym).ok_or(internal_error!())?;
		*c += 1;
		Ok(())
	}

	/// # Build.
	///
	/// Calculate length-limited code lengths for the current counts, push any
	/// overflow from crowded lengths down a level, and assign codes.
	pub(crate) fn build(&mut self) -> Result<(), EplzError> {
		let mut max_bits = MAX_CODE_LEN;
		loop {
			llcl(&self.counts, max_bits, &mut self.lengths)?;
			if limit_width(&self.counts, &mut self.lengths) { break; }
			if max_bits == MIN_CODE_LEN { return Err(internal_error!().into()); }
			max_bits -= 1;
		}

		canonical(&self.lengths, &mut self.codes);
		Ok(())
	}

	/// # Code Lengths.
	pub(crate) fn lengths(&self) -> &[u8] { &self.lengths }

	/// # Encode.
	///
	/// Return the length and code for a symbol, or `None` if it has no code.
	pub(crate) fn encode(&self, sym: usize) -> Option<(u8, u32)> {
		let len = *self.lengths.get(sym)?;
		if len == 0 { None }
		else { Some((len, u32::from(*self.codes.get(sym)?))) }
	}

	/// # Payload Size.
	///
	/// The total bits needed to code the counted symbols with this table.
	pub(crate) fn payload_bits(&self) -> u64 {
		self.counts.iter()
			.zip(&self.lengths)
			.map(|(&c, &l)| u64::from(c) * u64::from(l))
			.sum()
	}

	/// # Fixed-Width Payload Size.
	pub(crate) fn fixed_bits(&self, width: u8) -> u64 {
		self.counts.iter().map(|&c| u64::from(c)).sum::<u64>() * u64::from(width)
	}

	/// # Table Size.
	pub(crate) fn table_bits(&self) -> u64 {
		let mut tmp = TokenBuf::new();
		self.write_table(&mut tmp);
		tmp.size()
	}

	/// # Write Table.
	///
	/// For each length from one to sixteen: the number of symbols plus one,
	/// then the gaps between them.
	pub(crate) fn write_table(&self, out: &mut TokenBuf) {
		for len in 1..=MAX_CODE_LEN {
			let count = self.lengths.iter().filter(|&&l| l == len).count();
			write_gamma(out, count as u32 + 1);
			let mut prev = 0;
			for (sym, _) in self.lengths.iter().enumerate().filter(|(_, &l)| l == len) {
				write_gamma(out, (sym + 1 - prev) as u32);
				prev = sym + 1;
			}
		}
	}
}



#[derive(Debug, Clone)]
/// # Huffman Decoder.
pub(crate) struct HuffmanDecoder {
	/// # Symbols Per Length.
	counts: [u16; MAX_CODE_LEN as usize + 1],

	/// # Symbols in Code Order.
	symbols: Vec<u16>,
}

impl HuffmanDecoder {
	/// # Read Table.
	///
	/// ## Errors
	///
	/// Out-of-range or duplicate symbols, and tables with more codes than
	/// sixteen bits can hold, are rejected.
	pub(crate) fn read(r: &mut BitReader<'_>, size: usize) -> Result<Self, FormatError> {
		let mut counts = [0_u16; MAX_CODE_LEN as usize + 1];
		let mut symbols = Vec::new();
		let mut seen = vec![false; size];
		let mut kraft = 0_u64;

		for (len, count) in counts.iter_mut().enumerate().skip(1) {
			let n = read_gamma(r)? as usize - 1;
			if size < n { return Err(r.error(FormatErrorKind::InvalidTable)); }

			let mut sym = 0;
			for _ in 0..n {
				sym += read_gamma(r)? as usize;
				let s = sym - 1;
				match seen.get_mut(s) {
					Some(x) if ! *x => { *x = true; },
					_ => return Err(r.error(FormatErrorKind::InvalidTable)),
				}
				symbols.push(s as u16);
			}

			*count = n as u16;
			kraft += (n as u64) << (usize::from(MAX_CODE_LEN) - len);
		}

		if kraft <= 1 << MAX_CODE_LEN { Ok(Self { counts, symbols }) }
		else { Err(r.error(FormatErrorKind::InvalidTable)) }
	}

	/// # Decode a Symbol.
	pub(crate) fn decode(&self, r: &mut BitReader<'_>) -> Result<usize, FormatError> {
		let mut code = 0_u32;
		let mut first = 0_u32;
		let mut index = 0_usize;
		for &count in self.counts.iter().skip(1) {
			code |= r.bit()?;
			let count = u32::from(count);
			if code < first + count {
				let idx = index + (code - first) as usize;
				return self.symbols.get(idx)
					.map(|&s| usize::from(s))
					.ok_or_else(|| r.error(FormatErrorKind::InvalidCode));
			}
			index += count as usize;
			first = (first + count) << 1;
			code <<= 1;
		}

		Err(r.error(FormatErrorKind::InvalidCode))
	}
}



/// # Write Gamma.
///
/// Elias gamma code `n` (which must be non-zero), with the value bits
/// interleaved behind continuation flags.
pub(crate) fn write_gamma(out: &mut TokenBuf, mut n: u32) {
	debug_assert!(n != 0, "Gamma codes start at one.");
	let mut code = 0_u32;
	let mut bits = 1_u8;
	while 1 < n {
		code |= (2 | (n & 1)) << bits;
		n >>= 1;
		bits += 2;
	}
	out.bits(bits, code);
}

/// # Read Gamma.
pub(crate) fn read_gamma(r: &mut BitReader<'_>) -> Result<u32, FormatError> {
	let mut n = 1_u32;
	while r.bit()? == 1 {
		if 1 << 20 < n { return Err(r.error(FormatErrorKind::InvalidTable)); }
		n = (n << 1) | r.bit()?;
	}
	Ok(n)
}



#[derive(Debug, Clone, Copy)]
/// # Leaf.
struct Leaf {
	weight: u64,
	symbol: usize,
}

#[derive(Debug, Clone, Copy)]
/// # Chain Node.
///
/// Nodes live in a flat pool and point backwards to the chain in the
/// previous list.
struct Node {
	weight: u64,
	count: usize,
	tail: Option<usize>,
}

/// # Length-Limited Code Lengths.
///
/// Populate `lengths` with optimal code lengths for `counts` that do not
/// exceed `max_bits`. Zero counts get zero lengths. A lone symbol gets a
/// length of one.
fn llcl(counts: &[u32], max_bits: u8, lengths: &mut [u8]) -> Result<(), EplzError> {
	lengths.fill(0);
	let mut leaves: Vec<Leaf> = counts.iter()
		.enumerate()
		.filter_map(|(symbol, &c)|
			if c == 0 { None }
			else { Some(Leaf { weight: u64::from(c), symbol }) }
		)
		.collect();

	// Nothing to merge.
	if leaves.len() <= 2 {
		for leaf in &leaves { lengths[leaf.symbol] = 1; }
		return Ok(());
	}
	if (1_usize << max_bits) < leaves.len() { return Err(internal_error!().into()); }

	// Sort by weight, then symbol, so equal weights favor higher symbols.
	leaves.sort_unstable_by_key(|l| (l.weight, l.symbol));

	// Having fewer leaves than bits shrinks the problem.
	let max_bits = usize::from(max_bits).min(leaves.len() - 1);
	let mut pool = Vec::with_capacity(2 * leaves.len() * max_bits);
	pool.push(Node { weight: leaves[0].weight, count: 1, tail: None });
	pool.push(Node { weight: leaves[1].weight, count: 2, tail: None });
	let mut lists = vec![[0_usize, 1]; max_bits];

	// Initialization gave the last list two of the (2 * leaves - 2) chains
	// it needs; each pass adds another, with the final one special.
	for _ in 0..2 * leaves.len() - 5 {
		boundary_pm(&leaves, &mut lists, &mut pool, max_bits - 1);
	}
	boundary_pm_final(&leaves, &mut lists, &mut pool, max_bits - 1);

	// Walk the last chain to find how many leaves each list holds.
	let mut active = vec![0_usize; max_bits + 1];
	let mut end = max_bits + 1;
	let mut node = Some(lists[max_bits - 1][1]);
	while let Some(idx) = node {
		end -= 1;
		active[end] = pool[idx].count;
		node = pool[idx].tail;
	}

	let mut val = active[max_bits];
	let mut ptr = max_bits;
	let mut len = 1;
	while end <= ptr {
		while active[ptr - 1] < val {
			lengths[leaves[val - 1].symbol] = len;
			val -= 1;
		}
		ptr -= 1;
		len += 1;
	}

	Ok(())
}

/// # Boundary Package-Merge Step.
///
/// Add a chain to list `index`, either the next leaf or the package of the
/// two newest chains in the previous list (which then need replacing).
fn boundary_pm(leaves: &[Leaf], lists: &mut [[usize; 2]], pool: &mut Vec<Node>, index: usize) {
	let last_count = pool[lists[index][1]].count;
	if index == 0 && leaves.len() <= last_count { return; }

	let old = lists[index][1];
	lists[index][0] = old;
	lists[index][1] = pool.len();

	if index == 0 {
		pool.push(Node {
			weight: leaves[last_count].weight,
			count: last_count + 1,
			tail: None,
		});
		return;
	}

	let sum = pool[lists[index - 1][0]].weight + pool[lists[index - 1][1]].weight;
	if last_count < leaves.len() && leaves[last_count].weight < sum {
		let tail = pool[old].tail;
		pool.push(Node {
			weight: leaves[last_count].weight,
			count: last_count + 1,
			tail,
		});
	}
	else {
		pool.push(Node {
			weight: sum,
			count: last_count,
			tail: Some(lists[index - 1][1]),
		});
		boundary_pm(leaves, lists, pool, index - 1);
		boundary_pm(leaves, lists, pool, index - 1);
	}
}

/// # Final Boundary Package-Merge Step.
fn boundary_pm_final(leaves: &[Leaf], lists: &mut [[usize; 2]], pool: &mut Vec<Node>, index: usize) {
	let last = lists[index][1];
	let last_count = pool[last].count;
	let sum = pool[lists[index - 1][0]].weight + pool[lists[index - 1][1]].weight;
	if last_count < leaves.len() && leaves[last_count].weight < sum {
		let tail = pool[last].tail;
		lists[index][1] = pool.len();
		pool.push(Node { weight: 0, count: last_count + 1, tail });
	}
	else {
		pool[last].tail = Some(lists[index - 1][1]);
	}
}

/// # Limit Width.
///
/// The table format can't describe more than 255 symbols of any one length,
/// so bump the least frequent extras to the next length down. Returns
/// `false` if the last length overflows, in which case a tighter limit is
/// needed.
fn limit_width(counts: &[u32], lengths: &mut [u8]) -> bool {
	let mut per = [0_usize; MAX_CODE_LEN as usize + 2];
	for &l in lengths.iter() { per[usize::from(l)] += 1; }

	for len in 1..MAX_CODE_LEN {
		let idx = usize::from(len);
		while MAX_PER_LEN < per[idx] {
			let Some(sym) = lengths.iter()
				.enumerate()
				.filter(|(_, &l)| l == len)
				.min_by_key(|&(sym, _)| (counts[sym], sym))
				.map(|(sym, _)| sym)
			else { return false; };
			lengths[sym] += 1;
			per[idx] -= 1;
			per[idx + 1] += 1;
		}
	}

	per[usize::from(MAX_CODE_LEN)] <= MAX_PER_LEN
}

/// # Canonical Codes.
///
/// Codes are assigned in order of length, then symbol.
fn canonical(lengths: &[u8], codes: &mut [u16]) {
	let mut scratch = [0_u32; MAX_CODE_LEN as usize + 2];
	for &l in lengths { scratch[usize::from(l)] += 1; }

	let mut code = 0;
	scratch[0] = 0;
	for c in scratch.iter_mut().take(usize::from(MAX_CODE_LEN) + 1) {
		let next = (code + *c) << 1;
		*c = mem::replace(&mut code, next);
	}

	for (&l, s) in lengths.iter().zip(codes.iter_mut()) {
		if l == 0 { *s = 0; }
		else {
			*s = scratch[usize::from(l)] as u16;
			scratch[usize::from(l)] += 1;
		}
	}
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::bits::BitWriter;

	/// # Kraft Sum (Scaled to 2^16).
	fn kraft(lengths: &[u8]) -> u64 {
		lengths.iter()
			.filter(|&&l| l != 0)
			.map(|&l| 1_u64 << (16 - l))
			.sum()
	}

	#[test]
	fn t_kat7() {
		let counts = [252, 0, 1, 6, 9, 10, 6, 3, 2, 0, 0, 0, 0];
		let mut lengths = [0; 13];
		llcl(&counts, 7, &mut lengths).expect("LLCL failed.");
		assert_eq!(lengths, [1, 0, 6, 4, 3, 3, 3, 5, 6, 0, 0, 0, 0]);
	}

	#[test]
	fn t_kat15() {
		let counts = [
			0, 0, 0, 0, 0, 0, 18, 0, 6, 0, 12, 2, 14, 9, 27, 15,
			23, 15, 17, 8, 1, 0, 0, 0, 0, 0, 0, 0,
		];
		let mut lengths = [0; 28];
		llcl(&counts, 15, &mut lengths).expect("LLCL failed.");
		assert_eq!(lengths, [
			0, 0, 0, 0, 0, 0, 3, 0, 5, 0, 4, 6, 4, 4, 3, 4,
			3, 3, 3, 4, 6, 0, 0, 0, 0, 0, 0, 0,
		]);
	}

	#[test]
	fn t_kat_limited() {
		// Fibonacci counts want a very deep tree.
		let mut counts = [0_u32; 30];
		counts[0] = 1;
		counts[1] = 1;
		for i in 2..30 { counts[i] = counts[i - 1] + counts[i - 2]; }

		let mut lengths = [0; 30];
		llcl(&counts, 16, &mut lengths).expect("LLCL failed.");
		assert!(lengths.iter().all(|&l| 1 <= l && l <= 16));
		assert_eq!(lengths.iter().max(), Some(&16));
		assert_eq!(kraft(&lengths), 1 << 16);

		// More frequent symbols are never longer.
		for w in lengths.windows(2) { assert!(w[1] <= w[0]); }
	}

	#[test]
	fn t_small() {
		let mut lengths = [0; 5];
		llcl(&[0, 0, 0, 0, 0], 16, &mut lengths).expect("LLCL failed.");
		assert_eq!(lengths, [0; 5]);
		llcl(&[0, 0, 7, 0, 0], 16, &mut lengths).expect("LLCL failed.");
		assert_eq!(lengths, [0, 0, 1, 0, 0]);
		llcl(&[3, 0, 7, 0, 0], 16, &mut lengths).expect("LLCL failed.");
		assert_eq!(lengths, [1, 0, 1, 0, 0]);
		llcl(&[3, 0, 7, 0, 1], 16, &mut lengths).expect("LLCL failed.");
		assert_eq!(lengths, [2, 0, 1, 0, 2]);
	}

	#[test]
	fn t_width() {
		// One dominant symbol leaves exactly 256 at length nine, one too many.
		let mut table = HuffmanTable::new(324);
		for _ in 0..100_000 { table.add(0).expect("Add failed."); }
		for sym in 1..=256 { table.add(sym).expect("Add failed."); }
		table.build().expect("Build failed.");

		let lengths = table.lengths();
		assert_eq!(lengths[0], 1);
		assert_eq!(lengths.iter().filter(|&&l| l == 9).count(), 255);
		assert_eq!(lengths.iter().filter(|&&l| l == 10).count(), 1);
		assert_eq!(lengths[1], 10);
		assert!(kraft(lengths) <= 1 << 16);
	}

	#[test]
	fn t_gamma() {
		let mut tokens = TokenBuf::new();
		write_gamma(&mut tokens, 1);
		assert_eq!(tokens.size(), 1);
		write_gamma(&mut tokens, 2);
		write_gamma(&mut tokens, 6);
		write_gamma(&mut tokens, 325);
		assert_eq!(tokens.size(), 1 + 3 + 5 + 17);

		let mut w = BitWriter::default();
		w.write(&tokens).expect("Write failed.");
		w.close();
		let data = w.into_inner();
		let mut r = BitReader::new(&data, 0);
		assert_eq!(read_gamma(&mut r), Ok(1));
		assert_eq!(read_gamma(&mut r), Ok(2));
		assert_eq!(read_gamma(&mut r), Ok(6));
		assert_eq!(read_gamma(&mut r), Ok(325));
	}

	#[test]
	fn t_table() {
		let mut table = HuffmanTable::new(28);
		let msg = [3_usize, 3, 3, 3, 0, 1, 27, 3, 0, 5, 3, 3, 1];
		for &s in &msg { table.add(s).expect("Add failed."); }
		table.build().expect("Build failed.");
		assert!(table.encode(2).is_none());
		assert_eq!(table.payload_bits(), msg.iter().map(|&s| u64::from(table.lengths()[s])).sum::<u64>());
		assert_eq!(table.fixed_bits(5), 65);

		let mut tokens = TokenBuf::new();
		table.write_table(&mut tokens);
		assert_eq!(tokens.size(), table.table_bits());
		for &s in &msg {
			let (len, code) = table.encode(s).expect("Missing code.");
			tokens.bits(len, code);
		}

		let mut w = BitWriter::default();
		w.write(&tokens).expect("Write failed.");
		w.close();
		let data = w.into_inner();

		let mut r = BitReader::new(&data, 0);
		let dec = HuffmanDecoder::read(&mut r, 28).expect("Table failed.");
		for &s in &msg { assert_eq!(dec.decode(&mut r), Ok(s)); }

		// The same table is invalid for a smaller alphabet.
		let mut r = BitReader::new(&data, 0);
		assert_eq!(
			HuffmanDecoder::read(&mut r, 20).map_err(|e| e.kind()).err(),
			Some(FormatErrorKind::InvalidTable),
		);
	}
}
