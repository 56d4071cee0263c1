/*!
# Eplz

This library implements the M0 and M4 LZ compression formats used to pack
programs and data for the Enterprise 128.

Both formats are built the same way: a hash-chained match search feeds an
optimal (backwards dynamic-programming) parser, whose output is used to
refit the code tables, which feed back into the parser, and so on until the
result stops changing. The input is split into blocks of up to 64 KiB, with
boundaries chosen by test-compressing candidate layouts.

M0 streams are checksummed, may carry a load address per block, and code
symbols with canonical Huffman tables. M4 streams drop all that for
byte-aligned literals and cheap-to-decode slot codes.

## Examples

```
use eplz::{Codec, CompressionConfig};

let src = b"Enterprise Enterprise Enterprise Enterprise".repeat(20);
let config = CompressionConfig::from_level(3).unwrap();
for codec in [Codec::M0, Codec::M4] {
    let packed = eplz::compress(codec, &src, &config).unwrap();
    assert!(packed.len() < src.len());
    assert_eq!(eplz::decompress(codec, &packed).unwrap(), src);
}
```
*/

#![deny(unsafe_code)]

#![warn(
	clippy::filetype_is_file,
	clippy::integer_division,
	clippy::needless_borrow,
	clippy::nursery,
	clippy::pedantic,
	clippy::perf,
	clippy::suboptimal_flops,
	clippy::unneeded_field_pattern,
	macro_use_extern_crate,
	missing_copy_implementations,
	missing_debug_implementations,
	missing_docs,
	non_ascii_idents,
	trivial_casts,
	trivial_numeric_casts,
	unreachable_pub,
	unused_crate_dependencies,
	unused_extern_crates,
	unused_import_braces,
)]

#![allow(
	clippy::module_name_repetitions,
	clippy::redundant_pub_crate,
)]

mod bits;
mod config;
mod error;
mod huffman;
mod m0;
mod m4;
mod progress;
mod search;
mod slots;
mod split;
mod stream;

pub use config::CompressionConfig;
pub use error::{
	ConfigError,
	EplzError,
	FormatError,
	FormatErrorKind,
	InternalError,
};
pub use progress::Progress;
pub use stream::{
	Block,
	Codec,
	compress,
	Compressor,
	decompress,
	Decompressor,
};

#[cfg(test)] use proptest as _;
