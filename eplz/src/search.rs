/*!
# Eplz: Match Search.

This module builds the per-position candidate lists consumed by the parsers.
For every input position it records the Pareto frontier of back-references:
each entry is the closest distance at which its length is available, and
nothing closer matches as long. Entries are stored longest-first in one flat
vector with a per-position index, since the parsers walk them many times
over.
*/

use std::ops::Range;



/// # Most Chain Positions Tried Per Position.
const MAX_CHAIN_HITS: usize = 1024;

/// # No Position.
const NIL: u32 = u32::MAX;



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Match.
pub(crate) struct Match {
	/// # Distance (One-Based).
	pub(crate) dist: u32,

	/// # Length.
	pub(crate) len: u32,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
/// # Sequence.
///
/// A run where each byte equals the byte `dist` positions back plus a
/// constant `delta`. A zero length means "none".
pub(crate) struct Sequence {
	/// # Length.
	pub(crate) len: u16,

	/// # Per-Byte Difference.
	pub(crate) delta: u8,
}



#[derive(Debug, Clone, Copy)]
/// # Search Limits.
pub(crate) struct SearchLimits {
	/// # Shortest Reported Length.
	pub(crate) min_len: usize,

	/// # Cap for Regular Searching.
	pub(crate) max_len: usize,

	/// # Cap for Extending the Closest Capped Match.
	pub(crate) long_len: usize,

	/// # Farthest Distance for One-Byte Matches.
	pub(crate) max_dist1: usize,

	/// # Farthest Distance for Two-Byte Matches.
	pub(crate) max_dist2: usize,

	/// # Farthest Distance Overall.
	pub(crate) max_dist: usize,

	/// # Longest Sequence (Zero to Disable).
	pub(crate) max_seq: usize,
}



#[derive(Debug, Clone)]
/// # Search Table.
pub(crate) struct SearchTable {
	/// # Entry Index (Per Position, Plus One).
	index: Vec<u32>,

	/// # Entries.
	matches: Vec<Match>,

	/// # Sequences (Four Per Position, If Enabled).
	sequences: Vec<[Sequence; 4]>,
}

impl SearchTable {
	#[expect(clippy::cast_possible_truncation, reason = "Inputs are capped well below 4GiB.")]
	/// # New.
	///
	/// Search the entirety of `src`. Matches may point anywhere before their
	/// position, so block boundaries do not matter here.
	pub(crate) fn new(src: &[u8], limits: &SearchLimits) -> Self {
		let len = src.len();
		let mut index = Vec::with_capacity(len + 1);
		let mut matches = Vec::new();

		let mut head = vec![NIL; 65_536];
		let mut prev = vec![NIL; len];
		let mut last_seen = [NIL; 256];
		let mut frontier: Vec<Match> = Vec::new();
		let mut long: Option<Match> = None;

		index.push(0);
		for pos in 0..len {
			frontier.truncate(0);
			let cap = limits.max_len.min(len - pos);

			// Regular matches of two bytes or more.
			if pos + 1 < len {
				let key = pair(src, pos);
				let mut best = 1;
				let mut next = head[key];
				let mut hits = 0;
				while next != NIL && best < cap {
					let prior = next as usize;
					let dist = pos - prior;
					if limits.max_dist < dist { break; }
					hits += 1;
					if MAX_CHAIN_HITS < hits { break; }

					// Only worth a full comparison if it could beat the best.
					if src[prior + best] == src[pos + best] {
						let n = common(src, prior, pos, 2, cap);
						if best < n && (2 < n || dist <= limits.max_dist2) {
							best = n;
							if limits.min_len <= n {
								frontier.push(Match { dist: dist as u32, len: n as u32 });
							}
						}
					}
					next = prev[prior];
				}

				// Link this position in.
				prev[pos] = head[key];
				head[key] = pos as u32;
			}

			// Keep going with the closest match that hit the cap, if the
			// cap was artificial. A long match from the previous position is
			// known to continue here, minus one byte.
			match frontier.last_mut() {
				Some(last) if
					last.len as usize == cap &&
					cap == limits.max_len &&
					cap < limits.long_len
				=> {
					let end = limits.long_len.min(len - pos);
					let from = match long {
						Some(m) if m.dist == last.dist => (m.len as usize - 1).max(cap),
						_ => cap,
					};
					last.len = common(src, pos - last.dist as usize, pos, from, end) as u32;
					long = Some(*last);
				},
				_ => { long = None; },
			}

			// One-byte matches.
			if limits.min_len == 1 && limits.max_dist1 != 0 {
				let seen = last_seen[usize::from(src[pos])];
				if seen != NIL {
					let dist = pos - seen as usize;
					if dist <= limits.max_dist1 && frontier.first().is_none_or(|m| dist < m.dist as usize) {
						frontier.insert(0, Match { dist: dist as u32, len: 1 });
					}
				}
				last_seen[usize::from(src[pos])] = pos as u32;
			}

			matches.extend(frontier.iter().rev());
			index.push(matches.len() as u32);
		}

		let sequences =
			if limits.max_seq < 2 { Vec::new() }
			else { find_sequences(src, limits.max_seq.min(limits.max_len)) };

		Self { index, matches, sequences }
	}

	/// # Matches.
	///
	/// Return the candidates for `pos`, longest (and farthest) first.
	pub(crate) fn matches(&self, pos: usize) -> &[Match] {
		self.range(pos)
			.and_then(|rng| self.matches.get(rng))
			.unwrap_or(&[])
	}

	/// # Sequence.
	///
	/// Return the delta run at `pos` relative to `dist` (one through four),
	/// if any.
	pub(crate) fn sequence(&self, pos: usize, dist: usize) -> Option<Sequence> {
		let seq = self.sequences.get(pos)?.get(dist.checked_sub(1)?)?;
		if seq.len == 0 { None }
		else { Some(*seq) }
	}

	/// # Entry Range.
	fn range(&self, pos: usize) -> Option<Range<usize>> {
		let start = *self.index.get(pos)? as usize;
		let end = *self.index.get(pos + 1)? as usize;
		Some(start..end)
	}
}



/// # Pair Key.
const fn pair(src: &[u8], pos: usize) -> usize {
	((src[pos] as usize) << 8) | src[pos + 1] as usize
}

/// # Common Length.
///
/// Count matching bytes between `prior` and `pos`, starting from `from`
/// (which the caller has already checked) and stopping at `cap`.
fn common(src: &[u8], prior: usize, pos: usize, from: usize, cap: usize) -> usize {
	let mut n = from;
	while n < cap && src[prior + n] == src[pos + n] { n += 1; }
	n
}

#[expect(clippy::cast_possible_truncation, reason = "Lengths are capped at 256.")]
/// # Find Sequences.
///
/// Only deltas within `0x40` of zero (in either direction) are considered.
fn find_sequences(src: &[u8], max_len: usize) -> Vec<[Sequence; 4]> {
	let len = src.len();
	let mut out = vec![[Sequence::default(); 4]; len];
	for pos in 1..len.saturating_sub(1) {
		for dist in 1..=4.min(pos) {
			let delta = src[pos].wrapping_sub(src[pos - dist]);
			if delta == 0 || (0x40 < delta && delta < 0xC0) { continue; }

			let end = len.min(pos + max_len);
			let mut k = pos + 1;
			while k < end && src[k] == src[k - dist].wrapping_add(delta) { k += 1; }
			if 2 <= k - pos {
				out[pos][dist - 1] = Sequence { len: (k - pos) as u16, delta };
			}
		}
	}
	out
}



#[cfg(test)]
mod test {
	use super::*;

	const LIMITS: SearchLimits = SearchLimits {
		min_len: 1,
		max_len: 512,
		long_len: 65_535,
		max_dist1: 256,
		max_dist2: 4096,
		max_dist: 65_535,
		max_seq: 0,
	};

	#[test]
	fn t_frontier() {
		let src = b"abcXabcdYabcdZab";
		let table = SearchTable::new(src, &LIMITS);

		// Position 9 ("abcdZab"): "abcd" at distance 5, "abc" closer doesn't
		// exist, one-byte 'a' at distance 5 is dominated.
		assert_eq!(table.matches(9), &[Match { dist: 5, len: 4 }]);

		// Position 14 ("ab"): "ab" at 5; 'a' at 5 is no closer.
		assert_eq!(table.matches(14), &[Match { dist: 5, len: 2 }]);

		// Position 4 ("abcdY…"): "abc" at 4.
		assert_eq!(table.matches(4), &[Match { dist: 4, len: 3 }]);

		// Nothing before the first repeat.
		for pos in 0..4 { assert!(table.matches(pos).is_empty()); }
	}

	#[test]
	fn t_pareto() {
		// "aXb" repeated with growing context: closer short matches, farther
		// long ones.
		let src = b"abcdefQQabcdRRabcdefSSab";
		let table = SearchTable::new(src, &LIMITS);
		let list = table.matches(14);
		assert_eq!(list, &[
			Match { dist: 14, len: 6 },
			Match { dist: 6, len: 4 },
		]);

		// Longest first, distances strictly decreasing.
		for pos in 0..src.len() {
			let list = table.matches(pos);
			assert!(list.windows(2).all(|w| w[0].len > w[1].len && w[0].dist > w[1].dist));
		}
	}

	#[test]
	fn t_min_len() {
		let limits = SearchLimits { min_len: 3, ..LIMITS };
		let src = b"abXabYabcZabc";
		let table = SearchTable::new(src, &limits);
		for pos in 0..src.len() {
			assert!(table.matches(pos).iter().all(|m| 3 <= m.len));
		}
		assert_eq!(table.matches(10), &[Match { dist: 4, len: 3 }]);
	}

	#[test]
	fn t_long() {
		let src = vec![7_u8; 2000];
		let limits = SearchLimits { max_len: 100, long_len: 1500, ..LIMITS };
		let table = SearchTable::new(&src, &limits);
		assert_eq!(table.matches(1), &[Match { dist: 1, len: 1500 }]);
		assert_eq!(table.matches(600), &[Match { dist: 1, len: 1400 }]);
		assert_eq!(table.matches(1950), &[Match { dist: 1, len: 50 }]);

		// Without extension, the cap holds.
		let limits = SearchLimits { max_len: 100, long_len: 100, ..LIMITS };
		let table = SearchTable::new(&src, &limits);
		assert_eq!(table.matches(1), &[Match { dist: 1, len: 100 }]);
	}

	#[test]
	fn t_sequences() {
		let src: Vec<u8> = (0..40_u8).map(|v| v.wrapping_mul(3)).collect();
		let limits = SearchLimits { max_seq: 256, ..LIMITS };
		let table = SearchTable::new(&src, &limits);

		let seq = table.sequence(1, 1).expect("Missing sequence.");
		assert_eq!(seq, Sequence { len: 39, delta: 3 });
		let seq = table.sequence(4, 2).expect("Missing sequence.");
		assert_eq!(seq, Sequence { len: 36, delta: 6 });
		assert!(table.sequence(0, 1).is_none());
		assert!(table.sequence(4, 5).is_none());

		// Flat data has no sequences.
		let src = [9_u8; 32];
		let table = SearchTable::new(&src, &limits);
		for pos in 0..32 { assert!(table.sequence(pos, 1).is_none()); }
	}
}
