/*!
# Epcompress: Batch Runner.

Files are fed through a bounded channel to a small pool of scoped worker
threads. Each worker hands the codec a [`Watch`], which relays its progress
to the shared bar (if any) and turns a CTRL+C into a cancellation.
*/

use crate::{
	EpcError,
	Job,
	JobError,
};
use crossbeam_channel::Receiver;
use dactyl::{
	NiceElapsed,
	NicePercent,
	NiceU64,
	traits::NiceInflection,
};
use eplz::{
	EplzError,
	Progress,
};
use fyi_msg::{
	BeforeAfter,
	Msg,
	MsgKind,
	Progless,
};
use std::{
	num::NonZeroUsize,
	path::{
		Path,
		PathBuf,
	},
	sync::{
		Arc,
		atomic::{
			AtomicBool,
			AtomicU64,
			Ordering::{
				Acquire,
				Relaxed,
				SeqCst,
			},
		},
	},
	thread,
};



/// # Bar Units Per File.
const UNITS: u8 = 100;



#[derive(Debug, Default)]
/// # Running Totals.
struct Tally {
	/// # Files Skipped or Cancelled.
	skipped: AtomicU64,

	/// # Input Bytes (Successes Only).
	before: AtomicU64,

	/// # Output Bytes (Successes Only).
	after: AtomicU64,
}

impl Tally {
	/// # Record a Success.
	fn done(&self, before: u64, after: u64) {
		self.before.fetch_add(before, Relaxed);
		self.after.fetch_add(after, Relaxed);
	}

	/// # Record a Skip.
	fn skip(&self) { self.skipped.fetch_add(1, Relaxed); }

	/// # Summarize.
	fn summary(&self, bar: &Progless, total: NonZeroUsize) -> Msg {
		let elapsed = bar.finish();
		let skipped = self.skipped.load(Acquire);
		let msg =
			if skipped == 0 { bar.summary(MsgKind::Crunched, "file", "files") }
			else {
				Msg::crunched(format!(
					"{}\x1b[2m/\x1b[0m{} in {}.",
					NiceU64::from((total.get() as u64).saturating_sub(skipped)),
					total.nice_inflect("file", "files"),
					NiceElapsed::from(elapsed),
				))
			};

		msg.with_bytes_saved(BeforeAfter::from((
			self.before.load(Acquire),
			self.after.load(Acquire),
		)))
	}
}



/// # File Watch.
///
/// The progress sink handed to the codec for a single file.
struct Watch<'a> {
	/// # Killswitch.
	killed: &'a AtomicBool,

	/// # Shared Bar.
	bar: Option<&'a Progless>,

	/// # Units Reported So Far.
	last: u8,
}

impl Progress for Watch<'_> {
	fn percentage(&mut self, pct: u8) -> bool {
		let pct = pct.min(UNITS);
		if self.last < pct {
			if let Some(bar) = self.bar { bar.increment_n(u32::from(pct - self.last)); }
			self.last = pct;
		}
		! self.killed.load(Acquire)
	}
}

impl<'a> Watch<'a> {
	/// # New.
	const fn new(killed: &'a AtomicBool, bar: Option<&'a Progless>) -> Self {
		Self { killed, bar, last: 0 }
	}

	/// # Finish.
	///
	/// Top the bar up to a full file's worth, whatever happened. Decompression
	/// and failures never report on their own.
	fn finish(mut self) { let _res = self.percentage(UNITS); }
}



#[inline(never)]
/// # Process Everything!
///
/// Run `job` against each file in `files` using up to `threads` threads. With
/// `pretty` set, a progress bar is shown while working, each file's result
/// is printed above it, and a summary follows.
///
/// ## Errors
///
/// Returns an error if there are no files, the bar can't be built, or the
/// user interrupted the run. Individual file failures are not errors.
pub(super) fn exec(threads: NonZeroUsize, job: Job, files: &[PathBuf], pretty: bool)
-> Result<(), EpcError> {
	let total = NonZeroUsize::new(files.len()).ok_or(EpcError::NoFiles)?;
	let threads = threads.min(total);

	let bar =
		if pretty {
			Some(
				Progless::try_from(total.get().saturating_mul(usize::from(UNITS)))?
					.with_reticulating_splines("Epcompress")
			)
		}
		else { None };

	let killed = Arc::new(AtomicBool::new(false));
	sigint(Arc::clone(&killed), bar.clone());

	let tally = Tally::default();
	let (tx, rx) = crossbeam_channel::bounded::<&Path>(threads.get());
	thread::scope(|s| {
		let (rx, killed, tally, bar) = (&rx, &*killed, &tally, bar.as_ref());
		let workers: Vec<_> = (0..threads.get())
			.map(|_| s.spawn(move || work(rx, job, killed, tally, bar)))
			.collect();

		for file in files {
			if killed.load(Acquire) || tx.send(file).is_err() { break; }
		}
		drop(tx);

		for worker in workers { let _res = worker.join(); }
	});
	drop(rx);

	if let Some(bar) = bar { tally.summary(&bar, total).eprint(); }

	if killed.load(Acquire) { Err(EpcError::Killed) }
	else { Ok(()) }
}

/// # Worker.
///
/// Process files as they come in until the channel closes.
fn work(
	rx: &Receiver<&Path>,
	job: Job,
	killed: &AtomicBool,
	tally: &Tally,
	bar: Option<&Progless>,
) {
	while let Ok(file) = rx.recv() {
		let mut watch = Watch::new(killed, bar);
		let res = job.run(file, &mut watch);
		watch.finish();

		match res {
			Ok((before, after)) => {
				tally.done(before, after);
				if let Some(bar) = bar { bar.push_msg(report(file, job, before, after), true); }
			},
			Err(e) => {
				tally.skip();
				if matches!(e, JobError::Eplz(EplzError::Cancelled)) { continue; }
				if let Some(bar) = bar { bar.push_msg(skipped(file, e), true); }
			},
		}
	}
}



#[inline(never)]
/// # Hook Up CTRL+C.
///
/// Once stops queueing new files and cancels in-flight compressions at their
/// next checkpoint. Twice forces immediate shutdown.
fn sigint(killed: Arc<AtomicBool>, bar: Option<Progless>) {
	let _res = ctrlc::set_handler(move ||
		if killed.compare_exchange(false, true, SeqCst, Relaxed).is_ok() {
			if let Some(p) = &bar { p.sigint(); }
		}
		else { std::process::exit(1); }
	);
}

/// # Result Line.
///
/// Name the file, the codec, the sizes, and the packed-to-raw ratio.
fn report(file: &Path, job: Job, before: u64, after: u64) -> Msg {
	let (packed, raw) = if job.packs() { (after, before) } else { (before, after) };
	let ratio = NicePercent::try_from((packed, raw))
		.map_or_else(|()| String::from("no gain"), |p| p.as_str().to_owned());

	Msg::custom(job.verb(), 199, &format!(
		"{} \x1b[2m[{}] {} \u{2192} {} bytes, {}\x1b[0m",
		file.to_string_lossy(),
		job.codec().extension(),
		NiceU64::from(before),
		NiceU64::from(after),
		ratio,
	))
}

#[cold]
/// # Skip Line.
fn skipped(file: &Path, err: JobError) -> Msg {
	Msg::custom("Skipped", 11, &format!(
		"{} \x1b[2m({})\x1b[0m",
		file.to_string_lossy(),
		err.as_str(),
	))
}
