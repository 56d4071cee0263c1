/*!
# Eplz: Slot Tables.

M4 codes match lengths and offsets as a slot prefix followed by raw extra
bits. Slot `k` covers the next `2^size[k]` values after slot `k - 1`, so the
whole table is described by a handful of four-bit sizes.

Sizes are fit to the counted values by coordinate descent, with values left
uncovered charged the caller-supplied "unencoded" cost instead (usually the
price of spelling the match out as literals).
*/

use crate::{
	bits::{
		BitReader,
		TokenBuf,
	},
	EplzError,
	error::internal_error,
	FormatError,
};



/// # Largest Slot Size.
const MAX_SLOT_SIZE: u8 = 15;

/// # Default Unencoded Size.
pub(crate) const UNENCODED_SIZE: u32 = 8192;



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Prefix Kind.
pub(crate) enum Prefix {
	/// # Unary (`k` Ones Then a Zero).
	Unary(u8),

	/// # Fixed Width (`2^bits` Slots).
	Fixed(u8),

	/// # Fixed Width, Chosen From a Range.
	Variable(u8, u8),
}



#[derive(Debug, Clone)]
/// # Slot Table.
pub(crate) struct SlotTable {
	/// # Prefix Kind.
	prefix: Prefix,

	/// # Current Prefix Width (Fixed/Variable).
	bits: u8,

	/// # Counts (Per Value).
	counts: Vec<u32>,

	/// # Unencoded Cost Hints (Per Value).
	costs: Vec<u64>,

	/// # Slot Sizes.
	sizes: Vec<u8>,

	/// # Slot Bases.
	bases: Vec<u32>,

	/// # Slot Index (Per Covered Value).
	slot_of: Vec<u8>,

	/// # Unencoded Size.
	unencoded: u32,
}

impl SlotTable {
	/// # New.
	///
	/// Values run from zero to `max_value`, inclusive.
	pub(crate) fn new(prefix: Prefix, max_value: u32) -> Self {
		let bits = match prefix {
			Prefix::Unary(_) => 0,
			Prefix::Fixed(b) | Prefix::Variable(b, _) => b,
		};
		let mut out = Self {
			prefix,
			bits,
			counts: vec![0; max_value as usize + 1],
			costs: vec![0; max_value as usize + 1],
			sizes: Vec::new(),
			bases: Vec::new(),
			slot_of: Vec::new(),
			unencoded: UNENCODED_SIZE,
		};
		out.clear();
		out
	}

	/// # Reset.
	///
	/// Clear the counts and return to an all-zero layout.
	pub(crate) fn clear(&mut self) {
		if let Prefix::Variable(lo, _) = self.prefix { self.bits = lo; }
		self.counts.fill(0);
		self.costs.fill(0);
		let slots = self.slot_count_for(self.bits);
		self.set_sizes(vec![0; slots]);
	}

	/// # Count a Value.
	pub(crate) fn add(&mut self, value: u32, unencoded_cost: u64) {
		if let Some(c) = self.counts.get_mut(value as usize) {
			*c += 1;
			self.costs[value as usize] += unencoded_cost;
		}
	}

	/// # Set Unencoded Size.
	pub(crate) const fn set_unencoded_size(&mut self, size: u32) {
		self.unencoded = size;
	}

	/// # Update.
	///
	/// Fit the slot sizes (and for variable tables, the prefix width) to the
	/// counts collected since the last update, then clear them. Fast mode
	/// keeps the current prefix width and does less descending.
	pub(crate) fn update(&mut self, fast: bool) {
		let used = self.counts.iter().rposition(|&c| c != 0).map_or(0, |p| p + 1);
		let mut cnt_sum = Vec::with_capacity(used + 1);
		let mut cost_sum = Vec::with_capacity(used + 1);
		let (mut a, mut b) = (0_u64, 0_u64);
		cnt_sum.push(0);
		cost_sum.push(0);
		for (c, u) in self.counts.iter().zip(&self.costs).take(used) {
			a += u64::from(*c);
			b += *u;
			cnt_sum.push(a);
			cost_sum.push(b);
		}
		let fit = Fit { cnt_sum: &cnt_sum, cost_sum: &cost_sum, used };

		let (lo, hi) = match self.prefix {
			Prefix::Variable(lo, hi) if ! fast => (lo, hi),
			_ => (self.bits, self.bits),
		};
		let passes = if fast { 2 } else { 8 };

		let mut best: Option<(u64, u8, Vec<u8>)> = None;
		for bits in lo..=hi {
			let slots = self.slot_count_for(bits);
			let (cost, sizes) = fit.descend(slots, |k| self.prefix_len(bits, k), passes);
			let cost = cost + 4 * slots as u64;
			if best.as_ref().is_none_or(|(c, _, _)| cost < *c) {
				best = Some((cost, bits, sizes));
			}
		}

		if let Some((_, bits, sizes)) = best {
			self.bits = bits;
			self.set_sizes(sizes);
		}
		self.counts.fill(0);
		self.costs.fill(0);
	}

	/// # Apply Sizes.
	fn set_sizes(&mut self, sizes: Vec<u8>) {
		let limit = self.counts.len();
		self.bases.truncate(0);
		self.slot_of.truncate(0);
		let mut base = 0_u32;
		for (k, &s) in sizes.iter().enumerate() {
			self.bases.push(base);
			let span = 1_u32 << s;
			let end = (base as usize + span as usize).min(limit);
			if self.slot_of.len() < end {
				self.slot_of.resize(end, k as u8);
			}
			base += span;
		}
		self.sizes = sizes;
	}

	/// # Slot Count (for Width).
	const fn slot_count_for(&self, bits: u8) -> usize {
		match self.prefix {
			Prefix::Unary(n) => n as usize,
			_ => 1 << bits,
		}
	}

	/// # Prefix Length (for Width and Slot).
	const fn prefix_len(&self, bits: u8, slot: usize) -> u8 {
		match self.prefix {
			Prefix::Unary(_) => slot as u8 + 1,
			_ => bits,
		}
	}
}

impl SlotTable {
	/// # Symbol Size.
	///
	/// Prefix plus extra bits for a value, or the unencoded size if no slot
	/// covers it.
	pub(crate) fn symbol_size(&self, value: u32) -> u32 {
		match self.slot_of.get(value as usize) {
			Some(&k) => {
				let k = usize::from(k);
				u32::from(self.prefix_len(self.bits, k) + self.sizes[k])
			},
			None => self.unencoded,
		}
	}

	/// # Values Covered.
	pub(crate) fn encoded(&self) -> u32 {
		self.sizes.iter().map(|&s| 1_u32 << s).sum()
	}

	/// # Prefix Width.
	pub(crate) const fn prefix_bits(&self) -> u8 { self.bits }

	/// # Slot Sizes.
	pub(crate) fn sizes(&self) -> &[u8] { &self.sizes }

	/// # Encode a Value.
	pub(crate) fn encode(&self, value: u32, out: &mut TokenBuf) -> Result<(), EplzError> {
		let k = usize::from(*self.slot_of.get(value as usize).ok_or(internal_error!())?);
		let len = self.prefix_len(self.bits, k);
		let code = match self.prefix {
			Prefix::Unary(_) => (1_u32 << len) - 2,
			_ => k as u32,
		};
		out.bits(len, code);
		out.bits(self.sizes[k], value - self.bases[k]);
		Ok(())
	}

	/// # Write Sizes.
	pub(crate) fn write_sizes(&self, out: &mut TokenBuf) {
		for &s in &self.sizes { out.bits(4, u32::from(s)); }
	}
}



/// # Fitting Helper.
///
/// Prefix sums of the counts and unencoded costs for values below `used`.
struct Fit<'a> {
	cnt_sum: &'a [u64],
	cost_sum: &'a [u64],
	used: usize,
}

impl Fit<'_> {
	/// # Cost.
	fn cost<F: Fn(usize) -> u8>(&self, sizes: &[u8], prefix: &F) -> u64 {
		let mut total = 0;
		let mut base = 0_usize;
		for (k, &s) in sizes.iter().enumerate() {
			if self.used <= base { return total; }
			let end = (base + (1 << s)).min(self.used);
			total += (self.cnt_sum[end] - self.cnt_sum[base]) * u64::from(prefix(k) + s);
			base = end;
		}
		if base < self.used {
			total += self.cost_sum[self.used] - self.cost_sum[base];
		}
		total
	}

	/// # Coordinate Descent.
	///
	/// Starting from both an empty layout and an even spread, adjust one
	/// slot at a time until nothing improves (or the passes run out).
	fn descend<F: Fn(usize) -> u8>(&self, slots: usize, prefix: F, passes: usize)
	-> (u64, Vec<u8>) {
		let spread = {
			let per = self.used.div_ceil(slots.max(1)).max(1);
			let s = usize::BITS - (per - 1).leading_zeros();
			vec![(s as u8).min(MAX_SLOT_SIZE); slots]
		};

		let mut best: Option<(u64, Vec<u8>)> = None;
		for mut sizes in [vec![0; slots], spread] {
			let mut cost = self.cost(&sizes, &prefix);
			for _ in 0..passes {
				let mut improved = false;
				for k in 0..slots {
					let keep = sizes[k];
					let mut pick = keep;
					for s in 0..=MAX_SLOT_SIZE {
						if s == keep { continue; }
						sizes[k] = s;
						let c = self.cost(&sizes, &prefix);
						if c < cost {
							cost = c;
							pick = s;
							improved = true;
						}
					}
					sizes[k] = pick;
				}
				if ! improved { break; }
			}

			if best.as_ref().is_none_or(|(c, _)| cost < *c) { best = Some((cost, sizes)); }
		}

		best.unwrap_or_else(|| (0, vec![0; slots]))
	}
}



#[derive(Debug, Clone)]
/// # Slot Decoder.
pub(crate) struct SlotDecoder {
	/// # Slot Sizes.
	sizes: Vec<u8>,

	/// # Slot Bases.
	bases: Vec<u32>,
}

impl SlotDecoder {
	/// # Read Sizes.
	pub(crate) fn read(r: &mut BitReader<'_>, slots: usize) -> Result<Self, FormatError> {
		let mut sizes = Vec::with_capacity(slots);
		let mut bases = Vec::with_capacity(slots);
		let mut base = 0_u32;
		for _ in 0..slots {
			let s = r.bits(4)? as u8;
			sizes.push(s);
			bases.push(base);
			base += 1 << s;
		}
		Ok(Self { sizes, bases })
	}

	/// # Read a Value.
	pub(crate) fn value(&self, r: &mut BitReader<'_>, slot: usize) -> Result<u32, FormatError> {
		match (self.sizes.get(slot), self.bases.get(slot)) {
			(Some(&s), Some(&base)) => Ok(base + r.bits(s)?),
			_ => Err(r.error(crate::FormatErrorKind::InvalidCode)),
		}
	}
}
