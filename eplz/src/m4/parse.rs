/*!
# Eplz: M4 Optimal Parsers.

Both parsers work backwards from the end of the block, recording for each
position the cheapest way to reach the end. The first pass has no tables to
consult and uses rough fixed sizes; later passes price everything with the
real tables, breaking ties in favor of smaller total distances.
*/

use super::{
	MAX_DP_LEN,
	RUN_MAX,
	RUN_MIN,
};
use crate::{
	search::SearchTable,
	slots::SlotTable,
	split::BlockRange,
};



/// # Starting Cost.
const NONE: u64 = 0x7FFF_FFFF;

/// # Cost of a Disallowed Length.
const DISALLOWED: u64 = 16_383;

/// # Fixed Match Sizes (One, Two, Three or More Bytes).
const FIXED1: u64 = 4;
const FIXED2: u64 = 6;
const FIXED3: u64 = 8;



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
/// # Parse Step.
///
/// A zero distance means literals: one at a time, or as a run if the length
/// allows.
pub(super) struct Step {
	pub(super) dist: usize,
	pub(super) len: usize,
}



/// # Parser.
pub(super) struct Parser<'a> {
	pub(super) table: &'a SearchTable,
	pub(super) min_len: usize,
	pub(super) length: &'a SlotTable,
	pub(super) offs1: &'a SlotTable,
	pub(super) offs2: &'a SlotTable,
	pub(super) offs3: &'a SlotTable,
}

impl Parser<'_> {
	/// # Match Size.
	fn match_bits(&self, dist: usize, len: usize) -> u64 {
		let offs = match len {
			1 => self.offs1,
			2 => self.offs2,
			_ => self.offs3,
		};
		u64::from(self.length.symbol_size(len as u32 - 1)) + 1 +
		u64::from(offs.symbol_size(dist as u32 - 1))
	}

	/// # Optimize (Fixed Sizes).
	///
	/// Matches of three or more cost a flat eight bits, shorter ones a
	/// little less or more depending on distance. Each candidate only covers
	/// the lengths the next-closer candidate can't reach.
	pub(super) fn optimize_fixed(&self, rng: BlockRange) -> Vec<Step> {
		let n = rng.len();
		let mut bits = vec![0_u64; n + 1];
		let mut steps = vec![Step::default(); n];

		for i in (0..n).rev() {
			let remaining = n - i;
			let list = self.table.matches(rng.start() + i);
			let mut best = NONE;
			let mut step = Step { dist: 0, len: 1 };

			// Very long matches are taken whole if they repeat a single byte.
			if let Some(first) = list.first() {
				let len = (first.len as usize).min(remaining);
				if MAX_DP_LEN < len {
					if first.dist == 1 {
						steps[i] = Step { dist: 1, len };
						bits[i] = bits[i + len] + FIXED3;
						continue;
					}
					best = bits[i + len] + FIXED3;
					step = Step { dist: first.dist as usize, len };
				}
			}

			for (k, m) in list.iter().enumerate() {
				let dist = m.dist as usize;
				let mut len = (m.len as usize).min(remaining).min(MAX_DP_LEN);
				let next = match list.get(k + 1) {
					Some(x) if self.min_len <= x.len as usize => x.len as usize,
					_ => self.min_len - 1,
				};
				if len <= next { continue; }

				if 3 <= len {
					let floor = next.max(2);
					for l in (floor + 1..=len).rev() {
						let nbits = bits[i + l] + FIXED3;
						if nbits <= best {
							best = nbits;
							step = Step { dist, len: l };
						}
					}
					if 2 <= next { continue; }
					len = 2;
				}

				if len == 2 {
					if dist <= super::MAX_DIST2 {
						let nbits = bits[i + 2] + FIXED2 + (u64::from(1024 < dist) << 1);
						if nbits <= best {
							best = nbits;
							step = Step { dist, len: 2 };
						}
					}
					if 1 <= next { continue; }
				}

				if dist <= super::MAX_DIST1 {
					let nbits = bits[i + 1] + FIXED1 +
						((u64::from(16 < dist) + u64::from(64 < dist)) << 1);
					if nbits <= best {
						best = nbits;
						step = Step { dist, len: 1 };
					}
				}
			}

			// Literals.
			if bits[i + 1] + 8 <= best {
				let nbits = bits[i + 1] + 9;
				if nbits <= best {
					best = nbits;
					step = Step { dist: 0, len: 1 };
				}
				for k in RUN_MIN..=RUN_MAX.min(remaining) {
					let nbits = bits[i + k] + run_bits(k);
					if best + RUN_MIN as u64 - 1 < nbits { break; }
					if nbits <= best {
						best = nbits;
						step = Step { dist: 0, len: k };
					}
				}
			}

			bits[i] = best;
			steps[i] = step;
		}

		steps
	}

	/// # Optimize.
	///
	/// Price every candidate with the current tables. Among equal sizes the
	/// parse with the smaller sum of distances wins, which tends to keep the
	/// offset statistics tight.
	pub(super) fn optimize(&self, rng: BlockRange) -> Vec<Step> {
		let n = rng.len();
		let mut bits = vec![0_u64; n + 1];
		let mut sums = vec![0_u64; n + 1];
		let mut steps = vec![Step::default(); n];

		let len1 =
			if self.min_len < 2 { u64::from(self.length.symbol_size(0)) + 1 }
			else { DISALLOWED };
		let len2 =
			if self.min_len < 3 { u64::from(self.length.symbol_size(1)) + 1 }
			else { DISALLOWED };
		let enc1 = self.offs1.encoded() as usize;
		let enc2 = self.offs2.encoded() as usize;
		let floor = self.min_len.max(3);

		for i in (0..n).rev() {
			let remaining = n - i;
			let list = self.table.matches(rng.start() + i);
			let mut best = NONE;
			let mut best_sum = u64::MAX;
			let mut step = Step { dist: 0, len: 1 };

			// Very long matches.
			if let Some(first) = list.first() {
				let len = (first.len as usize).min(remaining);
				if MAX_DP_LEN < len {
					let dist = first.dist as usize;
					let nbits = bits[i + len] + self.match_bits(dist, len);
					if dist == 1 {
						steps[i] = Step { dist, len };
						bits[i] = nbits;
						sums[i] = sums[i + len] + 1;
						continue;
					}
					best = nbits;
					best_sum = sums[i + len] + dist as u64;
					step = Step { dist, len };
				}
			}

			for m in list {
				let dist = m.dist as usize;
				let d = dist as u64;
				let len = (m.len as usize).min(remaining).min(MAX_DP_LEN);

				if 3 <= len {
					let base = u64::from(self.offs3.symbol_size(dist as u32 - 1)) + 1;
					for l in (floor..=len).rev() {
						let nbits = u64::from(self.length.symbol_size(l as u32 - 1)) + base + bits[i + l];
						if nbits < best || (nbits == best && sums[i + l] + d <= best_sum) {
							best = nbits;
							best_sum = sums[i + l] + d;
							step = Step { dist, len: l };
						}
					}
				}

				if 2 <= len && dist <= enc2 {
					let nbits = len2 + u64::from(self.offs2.symbol_size(dist as u32 - 1)) + bits[i + 2];
					if nbits < best || (nbits == best && sums[i + 2] + d <= best_sum) {
						best = nbits;
						best_sum = sums[i + 2] + d;
						step = Step { dist, len: 2 };
					}
				}

				if dist <= enc1 {
					let nbits = len1 + u64::from(self.offs1.symbol_size(dist as u32 - 1)) + bits[i + 1];
					if nbits < best || (nbits == best && sums[i + 1] + d <= best_sum) {
						best = nbits;
						best_sum = sums[i + 1] + d;
						step = Step { dist, len: 1 };
					}
				}
			}

			// Literals.
			if bits[i + 1] + 8 <= best {
				let nbits = bits[i + 1] + 9;
				if nbits < best || (nbits == best && sums[i + 1] <= best_sum) {
					best = nbits;
					best_sum = sums[i + 1];
					step = Step { dist: 0, len: 1 };
				}

				if RUN_MIN <= remaining && bits[i + RUN_MIN] + RUN_MIN as u64 * 8 <= best {
					for k in RUN_MIN..=RUN_MAX.min(remaining) {
						let nbits = bits[i + k] + run_bits(k);
						if best < nbits {
							if best + RUN_MIN as u64 - 1 < nbits { break; }
							continue;
						}
						if nbits == best && sums[i + step.len] + (step.dist as u64) < sums[i + k] {
							continue;
						}
						best = nbits;
						step = Step { dist: 0, len: k };
					}
					best_sum = sums[i + step.len] + (step.dist as u64);
				}
			}

			bits[i] = best;
			sums[i] = best_sum;
			steps[i] = step;
		}

		steps
	}
}



/// # Literal Run Size.
const fn run_bits(len: usize) -> u64 { (len * 8 + RUN_MIN - 1) as u64 }
