/*!
# Eplz: Stream Tests.
*/

use eplz::{
	Codec,
	CompressionConfig,
	Compressor,
	Decompressor,
	EplzError,
	FormatErrorKind,
};



/// # Sample Text.
///
/// Pseudo-random words, so there's plenty to match but not trivially.
fn sample(len: usize) -> Vec<u8> { sample_seeded(len, 0x2545_F491) }

/// # Sample Text (Seeded).
fn sample_seeded(len: usize, mut seed: u32) -> Vec<u8> {
	const WORDS: [&[u8]; 12] = [
		b"Enterprise ", b"memory ", b"segment ", b"page ", b"Z80 ", b"BASIC ",
		b"load ", b"video ", b"Nick ", b"Dave ", b"EXOS ", b"tape ",
	];

	let mut out = Vec::with_capacity(len + 16);
	while out.len() < len {
		seed ^= seed << 13;
		seed ^= seed >> 17;
		seed ^= seed << 5;
		if seed % 7 == 0 { out.push((seed >> 8) as u8); }
		else { out.extend_from_slice(WORDS[(seed >> 4) as usize % WORDS.len()]); }
	}
	out.truncate(len);
	out
}

/// # M0 Checksum.
fn checksum(data: &[u8]) -> u8 {
	let mut chk = 0_u8;
	for &b in data.iter().rev() {
		let t = chk ^ b;
		chk = (t << 1).wrapping_add((t & 0x80) >> 7).wrapping_add(0xC4);
	}
	chk ^ 0x5E
}



#[test]
fn t_zeros() {
	let src = [0_u8; 100];
	for codec in [Codec::M0, Codec::M4] {
		let packed = eplz::compress(codec, &src, &CompressionConfig::default())
			.expect("Compression failed.");
		assert!(packed.len() < 24, "{codec} packed 100 zeros into {} bytes.", packed.len());
		assert_eq!(eplz::decompress(codec, &packed).expect("Decompression failed."), src);
	}
}

#[test]
fn t_tiny() {
	for codec in [Codec::M0, Codec::M4] {
		for src in [&b"A"[..], b"AB", b"ABA"] {
			let packed = eplz::compress(codec, src, &CompressionConfig::default())
				.expect("Compression failed.");
			assert_eq!(eplz::decompress(codec, &packed).expect("Decompression failed."), src);
		}
	}
}

#[test]
fn t_ramp() {
	let src: Vec<u8> = (0..1024_u32).map(|v| v as u8).collect();
	let packed = eplz::compress(Codec::M0, &src, &CompressionConfig::default())
		.expect("Compression failed.");
	assert!(packed.len() < 64);
	assert_eq!(eplz::decompress(Codec::M0, &packed).expect("Decompression failed."), src);
}

#[test]
fn t_checksum() {
	let src = sample(5000);
	let packed = eplz::compress(Codec::M0, &src, &CompressionConfig::default())
		.expect("Compression failed.");
	assert_eq!(packed[0], checksum(&packed[1..]));

	// Damage is noticed.
	let mut bad = packed;
	let last = bad.len() - 1;
	bad[last] ^= 0x10;
	match eplz::decompress(Codec::M0, &bad) {
		Err(EplzError::Format(e)) => assert_eq!(e.kind(), FormatErrorKind::Checksum),
		_ => panic!("Corruption went unnoticed."),
	}
}

#[test]
fn t_large() {
	let src = sample(200 * 1024);
	let config = CompressionConfig::from_level(1).expect("Bad level.");
	for codec in [Codec::M0, Codec::M4] {
		let packed = eplz::compress(codec, &src, &config).expect("Compression failed.");
		assert!(packed.len() < src.len() / 2);

		let blocks = Decompressor::new(codec).decompress_blocks(&packed)
			.expect("Decompression failed.");
		assert!(4 <= blocks.len());
		assert!(blocks.iter().all(|b| ! b.data().is_empty() && b.data().len() <= 65_536));

		let joined: Vec<u8> = blocks.iter().flat_map(|b| b.data().iter().copied()).collect();
		assert_eq!(joined, src);
	}
}

#[test]
fn t_iterations() {
	// One block, so more passes can only help.
	let src = sample(20_000);
	for codec in [Codec::M0, Codec::M4] {
		let mut last = usize::MAX;
		for iters in 1..=6 {
			let config = CompressionConfig::default()
				.with_split_depth(0)
				.with_optimize_iterations(iters);
			let len = eplz::compress(codec, &src, &config).expect("Compression failed.").len();
			assert!(len <= last, "{codec} grew from {last} to {len} at {iters} passes.");
			last = len;
		}
	}
}

#[test]
fn t_iterations_split() {
	// Block boundaries can't depend on the pass count, so more passes still
	// never hurt once splitting is in play.
	for seed in 1..=12_u32 {
		let src = sample_seeded(1500 + seed as usize * 211, seed.wrapping_mul(0x9E37_79B9) | 1);
		for codec in [Codec::M0, Codec::M4] {
			let mut last = usize::MAX;
			for iters in 1..=6 {
				let config = CompressionConfig::default().with_optimize_iterations(iters);
				let len = eplz::compress(codec, &src, &config).expect("Compression failed.").len();
				assert!(len <= last, "{codec} grew from {last} to {len} at {iters} passes (seed {seed}).");
				last = len;
			}
		}
	}

	// Randomized tie-breaks too.
	let src = sample_seeded(2000, 0xDEAD_BEEF);
	let mut last = usize::MAX;
	for iters in 1..=4 {
		let config = CompressionConfig::default()
			.with_split_depth(9)
			.with_optimize_iterations(iters);
		let len = eplz::compress(Codec::M0, &src, &config).expect("Compression failed.").len();
		assert!(len <= last, "M0 grew from {last} to {len} at {iters} passes.");
		last = len;
	}
}

#[test]
fn t_levels() {
	let src = sample(3000);
	for codec in [Codec::M0, Codec::M4] {
		for level in 1..=9 {
			let config = CompressionConfig::from_level(level).expect("Bad level.");
			let packed = eplz::compress(codec, &src, &config).expect("Compression failed.");
			assert_eq!(eplz::decompress(codec, &packed).expect("Decompression failed."), src);
		}
	}
}

#[test]
fn t_exhaustive() {
	let src = sample(700);
	let config = CompressionConfig::default().with_split_depth(10);
	for codec in [Codec::M0, Codec::M4] {
		let packed = eplz::compress(codec, &src, &config).expect("Compression failed.");
		assert_eq!(eplz::decompress(codec, &packed).expect("Decompression failed."), src);
	}
}

#[test]
fn t_progress() {
	let src = sample(4000);
	for codec in [Codec::M0, Codec::M4] {
		let mut seen = Vec::new();
		let mut sink = |pct: u8| { seen.push(pct); true };
		let mut enc = Compressor::new(codec, CompressionConfig::default())
			.expect("Compressor failed.");
		enc.compress_data(&src, None, true, Some(&mut sink)).expect("Compression failed.");

		assert!(seen.windows(2).all(|w| w[0] <= w[1]));
		assert_eq!(seen.last(), Some(&100));
		assert_eq!(seen.iter().filter(|&&p| p == 100).count(), 1);
	}
}

#[test]
fn t_cancel() {
	let src = sample(4000);
	for codec in [Codec::M0, Codec::M4] {
		let mut calls = 0;
		let mut sink = |_: u8| { calls += 1; calls < 3 };
		let mut enc = Compressor::new(codec, CompressionConfig::default())
			.expect("Compressor failed.");
		assert!(matches!(
			enc.compress_data(&src, None, true, Some(&mut sink)),
			Err(EplzError::Cancelled),
		));

		// Nothing was written, and the stream is still usable.
		assert!(enc.as_bytes().is_empty());
		assert!(! enc.is_closed());
		enc.compress_data(&src, None, true, None).expect("Compression failed.");
		assert_eq!(eplz::decompress(codec, enc.as_bytes()).expect("Decompression failed."), src);
	}
}

#[test]
fn t_truncated() {
	let src = sample(3000);
	let config = CompressionConfig::default().with_split_depth(0);
	let packed = eplz::compress(Codec::M4, &src, &config).expect("Compression failed.");
	for cut in [1, packed.len() / 2, packed.len() - 1] {
		let res = eplz::decompress(Codec::M4, &packed[..cut]);
		assert!(
			matches!(res, Err(EplzError::Format(_))),
			"Truncation at {cut} went unnoticed.",
		);
	}
}
