/*!
# Eplz: Configuration.
*/

use crate::ConfigError;



/// # Largest Block.
pub(crate) const MAX_BLOCK_SIZE: usize = 65_536;

/// # Most Optimization Passes.
const MAX_ITERATIONS: u8 = 16;

/// # Level Presets.
///
/// Optimization iterations and split depth for levels one through nine.
const LEVELS: [(u8, u8); 9] = [
	(1, 0),
	(2, 1),
	(2, 2),
	(3, 3),
	(3, 4),
	(4, 5),
	(5, 6),
	(6, 7),
	(8, 8),
];



#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
/// # Compression Configuration.
///
/// Tuning knobs shared by both codecs. Settings are clamped to each codec's
/// own limits at compression time, so the same configuration can be reused
/// for either format.
///
/// ## Examples
///
/// ```
/// use eplz::CompressionConfig;
///
/// let config = CompressionConfig::default()
///     .with_optimize_iterations(5)
///     .with_split_depth(2);
/// assert!(config.validate().is_ok());
/// ```
pub struct CompressionConfig {
	/// # Minimum Match Length.
	min_length: u32,

	/// # Maximum Match Length.
	max_length: u32,

	/// # Maximum Offset.
	max_offset: u32,

	/// # Optimization Iterations.
	optimize_iterations: u8,

	/// # Forced Block Size (Zero for Auto).
	block_size: u32,

	/// # Split Optimization Depth.
	split_depth: u8,
}

impl Default for CompressionConfig {
	#[inline]
	fn default() -> Self { Self::new() }
}

impl CompressionConfig {
	/// # From Level.
	///
	/// Return a preset configuration for a compression level between `1`
	/// (fastest) and `9` (smallest).
	///
	/// ## Errors
	///
	/// Returns an error if the level is out of range.
	pub const fn from_level(level: u8) -> Result<Self, ConfigError> {
		if level == 0 || 9 < level { return Err(ConfigError::Level); }
		let (optimize_iterations, split_depth) = LEVELS[level as usize - 1];
		let mut out = Self::new();
		out.optimize_iterations = optimize_iterations;
		out.split_depth = split_depth;
		Ok(out)
	}

	#[must_use]
	/// # New (Default).
	pub const fn new() -> Self {
		Self {
			min_length: 1,
			max_length: 65_535,
			max_offset: 65_535,
			optimize_iterations: 3,
			block_size: 0,
			split_depth: 4,
		}
	}

	#[must_use]
	/// # With Minimum Match Length.
	pub const fn with_min_length(mut self, min_length: u32) -> Self {
		self.min_length = min_length;
		self
	}

	#[must_use]
	/// # With Maximum Match Length.
	pub const fn with_max_length(mut self, max_length: u32) -> Self {
		self.max_length = max_length;
		self
	}

	#[must_use]
	/// # With Maximum Offset.
	pub const fn with_max_offset(mut self, max_offset: u32) -> Self {
		self.max_offset = max_offset;
		self
	}

	#[must_use]
	/// # With Optimization Iterations.
	///
	/// Values above sixteen are accepted but treated as sixteen.
	pub const fn with_optimize_iterations(mut self, iterations: u8) -> Self {
		self.optimize_iterations = iterations;
		self
	}

	#[must_use]
	/// # With Forced Block Size.
	///
	/// Use zero to let the splitter decide.
	pub const fn with_block_size(mut self, block_size: u32) -> Self {
		self.block_size = block_size;
		self
	}

	#[must_use]
	/// # With Split Depth.
	///
	/// Depths below ten start from `2^depth` equal blocks (M4 uses half as
	/// many) and greedily merge neighbors; ten or more runs an exhaustive search over 64-byte
	/// boundaries, which is very slow. For M0, nine or more also randomizes
	/// parse tie-breaks.
	pub const fn with_split_depth(mut self, depth: u8) -> Self {
		self.split_depth = depth;
		self
	}

	/// # Validate.
	///
	/// ## Errors
	///
	/// Returns the first problem found, if any.
	pub const fn validate(&self) -> Result<(), ConfigError> {
		if self.min_length == 0 { Err(ConfigError::MinLength) }
		else if self.max_length < self.min_length { Err(ConfigError::LengthRange) }
		else if self.max_offset == 0 { Err(ConfigError::MaxOffset) }
		else if self.optimize_iterations == 0 { Err(ConfigError::Iterations) }
		else if MAX_BLOCK_SIZE < self.block_size as usize { Err(ConfigError::BlockSize) }
		else { Ok(()) }
	}
}

impl CompressionConfig {
	#[must_use]
	/// # Minimum Match Length.
	pub const fn min_length(&self) -> u32 { self.min_length }

	#[must_use]
	/// # Maximum Match Length.
	pub const fn max_length(&self) -> u32 { self.max_length }

	#[must_use]
	/// # Maximum Offset.
	pub const fn max_offset(&self) -> u32 { self.max_offset }

	#[must_use]
	/// # Optimization Iterations.
	///
	/// This returns the effective value, between one and sixteen.
	pub const fn optimize_iterations(&self) -> u8 {
		if self.optimize_iterations == 0 { 1 }
		else if MAX_ITERATIONS < self.optimize_iterations { MAX_ITERATIONS }
		else { self.optimize_iterations }
	}

	#[must_use]
	/// # Forced Block Size.
	pub const fn block_size(&self) -> u32 { self.block_size }

	#[must_use]
	/// # Split Depth.
	pub const fn split_depth(&self) -> u8 { self.split_depth }
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_levels() {
		assert_eq!(CompressionConfig::from_level(0), Err(ConfigError::Level));
		assert_eq!(CompressionConfig::from_level(10), Err(ConfigError::Level));

		let mut last = 0;
		for level in 1..=9 {
			let config = CompressionConfig::from_level(level).expect("Level failed.");
			assert!(config.validate().is_ok());
			assert!(last <= config.optimize_iterations());
			last = config.optimize_iterations();
		}
	}

	#[test]
	fn t_validate() {
		let config = CompressionConfig::default();
		assert_eq!(config, CompressionConfig::new());
		assert!(config.validate().is_ok());

		assert_eq!(config.with_min_length(0).validate(), Err(ConfigError::MinLength));
		assert_eq!(
			config.with_min_length(10).with_max_length(9).validate(),
			Err(ConfigError::LengthRange),
		);
		assert_eq!(config.with_max_offset(0).validate(), Err(ConfigError::MaxOffset));
		assert_eq!(config.with_optimize_iterations(0).validate(), Err(ConfigError::Iterations));
		assert_eq!(config.with_block_size(65_537).validate(), Err(ConfigError::BlockSize));
		assert!(config.with_block_size(65_536).validate().is_ok());
	}

	#[test]
	fn t_iterations_clamp() {
		let config = CompressionConfig::default().with_optimize_iterations(200);
		assert_eq!(config.optimize_iterations(), 16);
	}
}
