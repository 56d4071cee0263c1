/*!
# Eplz: Progress.
*/

use crate::EplzError;



/// # Progress Sink.
///
/// Long-running compression jobs report their progress through this trait.
/// Returning `false` from [`Progress::percentage`] asks the job to stop, in
/// which case it will return [`EplzError::Cancelled`] at the next
/// checkpoint.
///
/// Plain closures taking a percentage work too.
///
/// ## Examples
///
/// ```
/// use eplz::{Codec, CompressionConfig, Compressor};
///
/// let mut last = 0_u8;
/// let mut sink = |pct: u8| { last = pct; true };
/// let mut enc = Compressor::new(Codec::M4, CompressionConfig::default()).unwrap();
/// enc.compress_data(b"Hello Hello Hello!", None, true, Some(&mut sink)).unwrap();
/// assert_eq!(last, 100);
/// ```
pub trait Progress {
	/// # Percentage.
	///
	/// Report a completion percentage between `0` and `100`. Return `false`
	/// to cancel.
	fn percentage(&mut self, pct: u8) -> bool;

	/// # Message.
	///
	/// Report a status message. An empty message clears it.
	fn message(&mut self, _msg: &str) {}
}

impl<F> Progress for F
where F: FnMut(u8) -> bool {
	#[inline]
	fn percentage(&mut self, pct: u8) -> bool { self(pct) }
}



/// # Progress Tracker.
///
/// This wraps an optional sink, converting work units into monotonic
/// percentages. The total is an estimate, so it grows as needed; nothing
/// short of [`Tracker::finish`] reports one hundred.
pub(crate) struct Tracker<'a> {
	/// # Sink.
	sink: Option<&'a mut dyn Progress>,

	/// # Units Done.
	done: u64,

	/// # Units Expected.
	total: u64,

	/// # Last Reported Percentage.
	last: u8,
}

impl<'a> Tracker<'a> {
	/// # New.
	pub(crate) fn new(sink: Option<&'a mut dyn Progress>) -> Self {
		Self { sink, done: 0, total: 0, last: 0 }
	}

	/// # Expect More Work.
	pub(crate) const fn expect(&mut self, units: u64) {
		self.total = self.total.saturating_add(units);
	}

	/// # Step.
	///
	/// Report the current position, then account for `units` more work.
	///
	/// ## Errors
	///
	/// Returns [`EplzError::Cancelled`] if the sink says so.
	pub(crate) fn step(&mut self, units: u64) -> Result<(), EplzError> {
		if let Some(sink) = self.sink.as_mut() {
			let pct =
				if self.total == 0 { 0 }
				else {
					u8::try_from((self.done.saturating_mul(100) / self.total).min(99))
						.unwrap_or(99)
				}
				.max(self.last);
			self.last = pct;
			if ! sink.percentage(pct) { return Err(EplzError::Cancelled); }
		}

		self.done = self.done.saturating_add(units);
		if self.total < self.done { self.total = self.done; }
		Ok(())
	}

	/// # Message.
	pub(crate) fn message(&mut self, msg: &str) {
		if let Some(sink) = self.sink.as_mut() { sink.message(msg); }
	}

	/// # Finish.
	///
	/// Report completion and clear the message. Cancellation is moot at this
	/// point so the return value is ignored.
	pub(crate) fn finish(&mut self) {
		if let Some(sink) = self.sink.as_mut() {
			self.last = 100;
			let _res = sink.percentage(100);
			sink.message("");
		}
	}
}
