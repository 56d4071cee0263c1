/*!
# Eplz: Block Splitting.

Both codecs rebuild their statistics per block, so where the blocks fall
matters. This module decides the boundaries, drives each block through its
optimization passes, and stitches the results together.
*/

use ahash::RandomState;
use crate::{
	bits::TokenBuf,
	CompressionConfig,
	config::MAX_BLOCK_SIZE,
	EplzError,
	error::internal_error,
	progress::Tracker,
};
use std::{
	collections::HashMap,
	ops::Range,
};



/// # Exhaustive Search Depth.
const EXHAUSTIVE_DEPTH: u8 = 10;

/// # Exhaustive Search Granularity.
const EXHAUSTIVE_STEP: usize = 64;



#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
/// # Block Range.
///
/// This struct exists primarily to guarantee a range is non-empty and no
/// larger than a block can be.
pub(crate) struct BlockRange {
	start: usize,
	end: usize,
}

impl BlockRange {
	/// # New.
	pub(crate) const fn new(start: usize, end: usize) -> Result<Self, EplzError> {
		if start < end && end - start <= MAX_BLOCK_SIZE {
			Ok(Self { start, end })
		}
		else { Err(EplzError::Internal(internal_error!())) }
	}

	/// # Start.
	pub(crate) const fn start(&self) -> usize { self.start }

	/// # End.
	pub(crate) const fn end(&self) -> usize { self.end }

	/// # As Range.
	pub(crate) const fn rng(&self) -> Range<usize> { self.start..self.end }

	/// # Length.
	pub(crate) const fn len(&self) -> usize { self.end - self.start }
}



/// # Block Coder.
///
/// The codec-specific half of compression: turn one block into tokens.
pub(crate) trait BlockCoder {
	/// # Split Depth Bias.
	///
	/// Merging starts from `2^(depth - SPLIT_BIAS)` blocks.
	const SPLIT_BIAS: u8 = 0;

	/// # Optimization Passes Per Block.
	///
	/// Fast mode must not depend on the configured iteration count, or a
	/// higher count could settle on worse block boundaries.
	fn passes(&self, fast: bool) -> usize;

	/// # Encode Block.
	///
	/// The result must be complete, block header and end marker included, so
	/// its size can be compared directly against other candidates. Fast mode
	/// may trade quality for speed; it is only used for size estimates.
	fn encode_block(
		&mut self,
		rng: BlockRange,
		last: bool,
		fast: bool,
		tracker: &mut Tracker<'_>,
	) -> Result<TokenBuf, EplzError>;
}



/// # Compress Blocks.
///
/// Split `0..len`, then encode each block for real, flagging the final one
/// as last if `last` is set.
pub(crate) fn compress_blocks<C: BlockCoder>(
	coder: &mut C,
	len: usize,
	config: &CompressionConfig,
	last: bool,
	tracker: &mut Tracker<'_>,
) -> Result<TokenBuf, EplzError> {
	let blocks = plan(coder, len, config, tracker)?;
	tracker.expect((len * coder.passes(false)) as u64);

	let mut out = TokenBuf::new();
	let total = blocks.len();
	for (idx, rng) in blocks.into_iter().enumerate() {
		let tokens = coder.encode_block(rng, last && idx + 1 == total, false, tracker)?;
		out.append(&tokens);
	}
	Ok(out)
}

/// # Plan Blocks.
pub(crate) fn plan<C: BlockCoder>(
	coder: &mut C,
	len: usize,
	config: &CompressionConfig,
	tracker: &mut Tracker<'_>,
) -> Result<Vec<BlockRange>, EplzError> {
	let forced = config.block_size() as usize;
	if forced != 0 { return fixed(len, forced); }

	let depth = config.split_depth();
	let mut sizes = SizeCache::new(coder);
	if EXHAUSTIVE_DEPTH <= depth { exhaustive(&mut sizes, len, tracker) }
	else { merge(&mut sizes, len, depth, tracker) }
}

/// # Fixed Blocks.
fn fixed(len: usize, size: usize) -> Result<Vec<BlockRange>, EplzError> {
	(0..len).step_by(size)
		.map(|start| BlockRange::new(start, len.min(start + size)))
		.collect()
}

/// # Even Blocks.
///
/// Split `len` into `count` blocks whose sizes differ by at most one.
fn even(len: usize, count: usize) -> Result<Vec<BlockRange>, EplzError> {
	let mut out = Vec::with_capacity(count);
	let mut acc = 0;
	let mut start = 0;
	while start < len {
		acc += len;
		let size = acc / count;
		acc %= count;
		out.push(BlockRange::new(start, start + size)?);
		start += size;
	}
	Ok(out)
}

#[expect(clippy::cast_possible_wrap, reason = "Sizes are far below i64::MAX.")]
/// # Merge Blocks.
///
/// Start from `2^depth` even blocks, less the coder's bias (more if needed
/// to respect the block size cap), then repeatedly merge whichever neighbors save the most,
/// stopping once every merge would cost bits.
fn merge<C: BlockCoder>(
	sizes: &mut SizeCache<'_, C>,
	len: usize,
	depth: u8,
	tracker: &mut Tracker<'_>,
) -> Result<Vec<BlockRange>, EplzError> {
	let mut count = 1_usize << depth.saturating_sub(C::SPLIT_BIAS).min(16);
	while MAX_BLOCK_SIZE < len.div_ceil(count) { count <<= 1; }
	while 1 < count && len < count { count >>= 1; }

	let mut blocks = even(len, count)?;
	if blocks.len() < 2 { return Ok(blocks); }

	let passes = sizes.coder.passes(true);
	tracker.expect((3 * len * passes) as u64);

	loop {
		let mut best: Option<(usize, i64)> = None;
		for (idx, pair) in blocks.windows(2).enumerate() {
			let (a, b) = (pair[0], pair[1]);
			if MAX_BLOCK_SIZE < b.end() - a.start() { continue; }

			let merged = sizes.get(BlockRange::new(a.start(), b.end())?, tracker)?;
			let split = sizes.get(a, tracker)? + sizes.get(b, tracker)?;
			let diff = merged as i64 - split as i64;
			if best.is_none_or(|(_, d)| diff < d) { best = Some((idx, diff)); }
		}

		match best {
			Some((idx, diff)) if diff <= 0 => {
				let b = blocks.remove(idx + 1);
				blocks[idx] = BlockRange::new(blocks[idx].start(), b.end())?;
			},
			_ => break,
		}
	}

	Ok(blocks)
}

/// # Exhaustive Split.
///
/// Find the cheapest partition whose boundaries fall on multiples of 64,
/// where each block's start is aligned to its own length, except that the
/// final block may stop short at the end of the input. This is very slow.
fn exhaustive<C: BlockCoder>(
	sizes: &mut SizeCache<'_, C>,
	len: usize,
	tracker: &mut Tracker<'_>,
) -> Result<Vec<BlockRange>, EplzError> {
	let units = len.div_ceil(EXHAUSTIVE_STEP);
	let passes = sizes.coder.passes(true);
	tracker.expect((len * passes * (MAX_BLOCK_SIZE / EXHAUSTIVE_STEP / 8)) as u64);

	// Best cost and block length from each unit to the end.
	let mut cost = vec![0_u64; units + 1];
	let mut span = vec![0_usize; units + 1];
	for unit in (0..units).rev() {
		let start = unit * EXHAUSTIVE_STEP;
		let mut best: Option<(u64, usize)> = None;
		let mut size = EXHAUSTIVE_STEP;
		while size <= MAX_BLOCK_SIZE {
			if start % size == 0 {
				let end = len.min(start + size);
				let next = if end == len { units } else { unit + size / EXHAUSTIVE_STEP };
				let total = sizes.get(BlockRange::new(start, end)?, tracker)? + cost[next];
				if best.is_none_or(|(c, _)| total <= c) { best = Some((total, end - start)); }
				if end == len { break; }
			}
			size += EXHAUSTIVE_STEP;
		}

		let (c, s) = best.ok_or(internal_error!())?;
		cost[unit] = c;
		span[unit] = s;
	}

	let mut out = Vec::new();
	let mut start = 0;
	while start < len {
		let size = span[start / EXHAUSTIVE_STEP];
		out.push(BlockRange::new(start, start + size)?);
		start += size;
	}
	Ok(out)
}



/// # Size Cache.
///
/// Fast-mode block sizes, memoized by range.
struct SizeCache<'c, C: BlockCoder> {
	coder: &'c mut C,
	memo: HashMap<BlockRange, u64, RandomState>,
}

impl<'c, C: BlockCoder> SizeCache<'c, C> {
	/// # New.
	fn new(coder: &'c mut C) -> Self {
		Self {
			coder,
			memo: HashMap::with_hasher(RandomState::with_seeds(
				0x243F_6A88_85A3_08D3,
				0x1319_8A2E_0370_7344,
				0xA409_3822_299F_31D0,
				0x082E_FA98_EC4E_6C89,
			)),
		}
	}

	/// # Size (in Bits).
	fn get(&mut self, rng: BlockRange, tracker: &mut Tracker<'_>) -> Result<u64, EplzError> {
		if let Some(&size) = self.memo.get(&rng) { return Ok(size); }
		let size = self.coder.encode_block(rng, false, true, tracker)?.size();
		self.memo.insert(rng, size);
		Ok(size)
	}
}



/// # Converge.
///
/// Run up to `passes` optimization passes over a block, keeping the
/// smallest result. A pass may return `None` if it only gathers statistics.
/// Once a pass reproduces an earlier result exactly, the rest are skipped,
/// though they are still counted for progress purposes.
pub(crate) fn converge<F>(
	passes: usize,
	units: usize,
	tracker: &mut Tracker<'_>,
	mut pass: F,
) -> Result<TokenBuf, EplzError>
where F: FnMut(usize) -> Result<Option<TokenBuf>, EplzError> {
	let mut best: Option<TokenBuf> = None;
	let mut seen: Vec<u64> = Vec::with_capacity(passes);
	let mut done = false;

	for idx in 0..passes {
		tracker.step(units as u64)?;
		if done { continue; }

		let Some(tokens) = pass(idx)? else { continue; };
		let hash = tokens.fingerprint();
		if seen.contains(&hash) { done = true; }
		else { seen.push(hash); }
		if best.as_ref().is_none_or(|b| tokens.size() < b.size()) { best = Some(tokens); }
	}

	best.ok_or(EplzError::Internal(internal_error!()))
}
