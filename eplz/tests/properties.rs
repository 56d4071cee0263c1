/*!
# Eplz: Property Tests.
*/

use eplz::{
	Codec,
	CompressionConfig,
	Compressor,
	Decompressor,
};
use proptest::prelude::*;



/// # Codecs.
fn codec_strategy() -> impl Strategy<Value = Codec> {
	prop_oneof![Just(Codec::M0), Just(Codec::M4)]
}

/// # Inputs.
///
/// Random bytes on their own don't exercise much, so mix in repeats of
/// earlier material and runs of a single byte.
fn data_strategy() -> impl Strategy<Value = Vec<u8>> {
	prop::collection::vec(
		prop_oneof![
			prop::collection::vec(any::<u8>(), 1..24),
			(any::<u8>(), 2_usize..300).prop_map(|(b, n)| vec![b; n]),
			prop::collection::vec(0_u8..4, 1..64),
		],
		0..24,
	)
	.prop_map(|parts| {
		let mut out: Vec<u8> = Vec::new();
		for (idx, part) in parts.into_iter().enumerate() {
			// Every third part repeats something already seen.
			if idx % 3 == 2 && 8 <= out.len() {
				let start = usize::from(part[0]) % (out.len() - 4);
				let end = (start + part.len() * 3).min(out.len());
				out.extend_from_within(start..end);
			}
			else { out.extend_from_slice(&part); }
		}
		out
	})
}

/// # Configurations.
fn config_strategy() -> impl Strategy<Value = CompressionConfig> {
	(1_u32..5, 0_u32..3, 1_u8..5, 0_u8..4, prop_oneof![Just(0_u32), Just(100), Just(1000)])
		.prop_map(|(min, extra, iters, depth, block)| {
			CompressionConfig::default()
				.with_min_length(min)
				.with_max_length(if extra == 0 { 65_535 } else { min + extra * 40 })
				.with_max_offset(if extra == 1 { 300 } else { 65_535 })
				.with_optimize_iterations(iters)
				.with_split_depth(depth)
				.with_block_size(block)
		})
}

proptest! {
	#![proptest_config(ProptestConfig {
		cases: 64,
		max_shrink_iters: 200,
		..ProptestConfig::default()
	})]

	#[test]
	/// # Round Trip.
	fn t_round_trip(
		codec in codec_strategy(),
		src in data_strategy(),
		config in config_strategy(),
	) {
		let packed = eplz::compress(codec, &src, &config).expect("Compression failed.");
		let unpacked = eplz::decompress(codec, &packed).expect("Decompression failed.");
		prop_assert_eq!(unpacked, src);
	}

	#[test]
	/// # Determinism.
	fn t_deterministic(
		codec in codec_strategy(),
		src in data_strategy(),
		config in config_strategy(),
	) {
		let a = eplz::compress(codec, &src, &config).expect("Compression failed.");
		let b = eplz::compress(codec, &src, &config).expect("Compression failed.");
		prop_assert_eq!(a, b);
	}

	#[test]
	/// # Split Calls.
	///
	/// A buffer fed in pieces decodes to the whole.
	fn t_split_calls(
		codec in codec_strategy(),
		src in data_strategy(),
		cut in any::<prop::sample::Index>(),
	) {
		let cut = if src.is_empty() { 0 } else { cut.index(src.len()) };
		let mut enc = Compressor::new(codec, CompressionConfig::default())
			.expect("Compressor failed.");
		enc.compress_data(&src[..cut], Some(0x100), false, None).expect("Compression failed.");
		enc.compress_data(&src[cut..], Some(0x100), true, None).expect("Compression failed.");

		let dec = Decompressor::new(codec).with_start_address(true);
		let unpacked = dec.decompress(enc.as_bytes()).expect("Decompression failed.");
		prop_assert_eq!(unpacked, src);
	}
}
