/*!
# Eplz: M0 Optimal Parser.
*/

use super::{
	CostModel,
	SYM_CACHED,
	SYM_SEQUENCE,
};
use crate::{
	search::SearchTable,
	split::BlockRange,
};



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
/// # Parse Step.
///
/// A length below two means a literal. A non-zero delta marks a sequence,
/// in which case `dist` is one through four.
pub(super) struct Step {
	pub(super) dist: usize,
	pub(super) len: usize,
	pub(super) delta: u8,
}



#[derive(Debug, Clone, Copy)]
/// # Tie-Break Randomizer.
///
/// A 31-bit linear feedback shift register. It is reseeded at the start of
/// each block so a block's passes always see the same bits, and carried
/// between passes so they don't all see the same ones.
pub(super) struct Lfsr(u32);

impl Default for Lfsr {
	fn default() -> Self { Self(0x1234_5678) }
}

impl Lfsr {
	/// # Next Bit.
	const fn bit(&mut self) -> u64 {
		let b = ((self.0 >> 30) ^ (self.0 >> 27)) & 1;
		self.0 = (self.0 << 1) | b;
		b as u64
	}
}



/// # Parser.
pub(super) struct Parser<'a> {
	pub(super) src: &'a [u8],
	pub(super) table: &'a SearchTable,
	pub(super) model: &'a CostModel,
	pub(super) min_len: usize,
	pub(super) max_dist: usize,
}

impl Parser<'_> {
	/// # Optimize.
	///
	/// Find the cheapest parse of the block under the current cost model,
	/// working backwards from the end. Each position also carries a guess of
	/// the recent-distance list a decoder would hold there, borrowed from the
	/// position its best step lands on.
	///
	/// Among equal costs, nearer distances win (and literals beat matches),
	/// unless a randomizer is supplied, in which case it decides.
	pub(super) fn optimize(&self, rng: BlockRange, mut lfsr: Option<&mut Lfsr>) -> Vec<Step> {
		let n = rng.len();
		let mut bits = vec![0_u64; n + 1];
		let mut recent = vec![[0_usize; 4]; n + 1];
		let mut steps = vec![Step::default(); n];

		for i in (0..n).rev() {
			let pos = rng.start() + i;
			let remaining = n - i;

			let mut best = bits[i + 1] + u64::from(self.model.primary[usize::from(self.src[pos])]);
			let mut best_dist = 0;
			let mut step = Step { dist: 0, len: 1, delta: 0 };
			let mut memo = recent[i + 1];

			// Matches.
			for m in self.table.matches(pos) {
				let dist = m.dist as usize;
				let explicit = u64::from(self.model.distance(dist));
				for len in (self.min_len..=(m.len as usize).min(remaining)).rev() {
					let next = &recent[i + len];
					let slot =
						if 8 < dist { next.iter().position(|&d| d == dist) }
						else { None };
					let (dcost, cached) = match slot {
						Some(idx) if u64::from(self.model.primary[SYM_CACHED + idx]) < explicit =>
							(u64::from(self.model.primary[SYM_CACHED + idx]), true),
						_ => (explicit, false),
					};

					let nbits = bits[i + len] + dcost + u64::from(self.model.length(len));
					if better(nbits, dist, best, best_dist, lfsr.as_deref_mut()) {
						best = nbits;
						best_dist = dist;
						step = Step { dist, len, delta: 0 };
						memo = *next;
						if 8 < dist && ! cached { super::remember(&mut memo, dist); }
					}
				}
			}

			// Delta sequences.
			for dist in 1..=4.min(self.max_dist) {
				let Some(seq) = self.table.sequence(pos, dist) else { continue; };
				let head = u64::from(self.model.primary[SYM_SEQUENCE + dist]) + 7;
				for len in (self.min_len..=usize::from(seq.len).min(remaining)).rev() {
					let nbits = bits[i + len] + head + u64::from(self.model.length(len));
					if better(nbits, dist, best, best_dist, lfsr.as_deref_mut()) {
						best = nbits;
						best_dist = dist;
						step = Step { dist, len, delta: seq.delta };
						memo = recent[i + len];
					}
				}
			}

			bits[i] = best;
			recent[i] = memo;
			steps[i] = step;
		}

		steps
	}
}



/// # Better?
///
/// Ties go to the nearer distance, literals counting as distance zero.
fn better(nbits: u64, dist: usize, best: u64, best_dist: usize, lfsr: Option<&mut Lfsr>) -> bool {
	let penalty = match lfsr {
		Some(l) => l.bit(),
		None => u64::from(best_dist <= dist),
	};
	nbits + penalty <= best
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::search::SearchLimits;

	const LIMITS: SearchLimits = SearchLimits {
		min_len: 2,
		max_len: 256,
		long_len: 256,
		max_dist1: 0,
		max_dist2: 65_536,
		max_dist: 65_536,
		max_seq: 256,
	};

	fn parse(src: &[u8]) -> Vec<Step> {
		let table = SearchTable::new(src, &LIMITS);
		let model = CostModel::fixed();
		let parser = Parser {
			src,
			table: &table,
			model: &model,
			min_len: 2,
			max_dist: 65_536,
		};
		let rng = BlockRange::new(0, src.len()).expect("Bad range.");
		parser.optimize(rng, None)
	}

	/// # Walk the Parse.
	fn walk(steps: &[Step]) -> Vec<Step> {
		let mut out = Vec::new();
		let mut pos = 0;
		while pos < steps.len() {
			out.push(steps[pos]);
			pos += steps[pos].len.max(1);
		}
		out
	}

	#[test]
	fn t_zeros() {
		let steps = walk(&parse(&[0_u8; 100]));
		assert_eq!(steps.len(), 2);
		assert_eq!(steps[0].len, 1);
		assert_eq!(steps[1], Step { dist: 1, len: 99, delta: 0 });
	}

	#[test]
	fn t_sequence() {
		let src: Vec<u8> = (0..64_u8).map(|v| v.wrapping_mul(5)).collect();
		let steps = walk(&parse(&src));
		assert_eq!(steps.len(), 2);
		assert_eq!(steps[1], Step { dist: 1, len: 63, delta: 5 });
	}

	#[test]
	fn t_ramp() {
		// A wrapping ramp is one long delta run before anything repeats.
		let src: Vec<u8> = (0..600_u32).map(|v| v as u8).collect();
		let steps = walk(&parse(&src));
		assert_eq!(steps[0].len, 1);
		assert!(steps[1].delta != 0 && (1..=4).contains(&steps[1].dist));
		assert!(200 <= steps[1].len);
		assert_eq!(steps.iter().map(|s| s.len.max(1)).sum::<usize>(), 600);
	}

	#[test]
	fn t_literals() {
		let src = b"The quick brown fox.";
		let steps = walk(&parse(src));
		assert_eq!(steps.len(), src.len());
		assert!(steps.iter().all(|s| s.len == 1));
	}

	#[test]
	fn t_random() {
		let src = b"abcabcabcabc-abcabcabcabc-0123456789-abcabc".repeat(4);
		let table = SearchTable::new(&src, &LIMITS);
		let model = CostModel::fixed();
		let parser = Parser {
			src: &src,
			table: &table,
			model: &model,
			min_len: 2,
			max_dist: 65_536,
		};
		let rng = BlockRange::new(0, src.len()).expect("Bad range.");

		// The same seed gives the same parse.
		let mut a = Lfsr::default();
		let mut b = Lfsr::default();
		let one = parser.optimize(rng, Some(&mut a));
		assert_eq!(one, parser.optimize(rng, Some(&mut b)));

		// And it has to reproduce the source.
		let mut out: Vec<u8> = Vec::with_capacity(src.len());
		for s in walk(&one) {
			let pos = out.len();
			if s.len < 2 { out.push(src[pos]); }
			else if s.delta == 0 {
				for _ in 0..s.len { out.push(out[out.len() - s.dist]); }
			}
			else {
				for _ in 0..s.len { out.push(out[out.len() - s.dist].wrapping_add(s.delta)); }
			}
		}
		assert_eq!(out, src);
	}

	#[test]
	fn t_lfsr() {
		let mut a = Lfsr::default();
		let mut b = Lfsr::default();
		let bits: Vec<u64> = (0..64).map(|_| a.bit()).collect();
		assert!(bits.contains(&0));
		assert!(bits.contains(&1));
		assert!(bits.iter().all(|&x| x == b.bit()));
	}
}
