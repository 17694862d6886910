//! Segmentation Configuration and Builder
//!
//! This module provides the tunable thresholds of a deterministic segmentation pass.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmentationError};

/// Configuration for a deterministic segmentation pass
///
/// The same configuration over the same grid always produces the same
/// partition, region ids included.
///
/// # Example
///
/// ```rust
/// use biome_regions::*;
///
/// let config = SegmentationConfigBuilder::new()
///     .random_seed(42)
///     .min_region_area(8)
///     .max_region_length(25)
///     .unwrap()
///     .build()
///     .unwrap();
///
/// # #[cfg(feature = "serde")]
/// # {
/// let json = serde_json::to_string(&config).unwrap();
/// let restored: SegmentationConfig = serde_json::from_str(&json).unwrap();
/// assert_eq!(config, restored);
/// # }
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentationConfig {
    /// Seed for the per-cell random service
    ///
    /// Only used when the caller lets the segmenter build its own
    /// `SeededCellRandom`; it decides which member of each partition tile
    /// becomes that tile's expansion seed.
    pub random_seed: u64,

    /// Regions and enclosed pockets at or below this many cells are undersized
    ///
    /// - Enclosed pockets up to this size are merged into the surrounding region
    /// - Regions up to this size try to absorb neighbouring patches
    pub min_region_area: usize,

    /// Longest allowed side (in cells) of a region's bounding rectangle
    ///
    /// Regions with a longer side are subdivided by weighted expansion.
    pub max_region_length: u32,

    /// Number of absorption attempts made for an undersized region
    pub absorption_attempts: usize,

    /// Ignore water biomes when computing a cell's locally dominant biome
    ///
    /// Cells whose neighbourhood holds nothing but water fall back to
    /// including water biomes.
    pub ignore_water_dominance: bool,

    /// Keep open-sea cells out of enclosed pockets
    pub exclude_sea_from_enclosed: bool,

    /// Fill ratio (members / rectangle area) at which a bisection tile is well-shaped
    pub acceptable_fill_ratio: f32,

    /// Aspect ratio (long side / short side) at which a bisection tile is well-shaped
    pub max_aspect_ratio: f32,

    /// Added to a cell's accessibility before inverting it into an edge cost
    pub accessibility_epsilon: f32,

    /// Edge cost multiplier per unit of altitude difference
    pub altitude_penalty: f32,
}

impl Default for SegmentationConfig {
    /// Default thresholds with a fixed random seed of 0
    fn default() -> Self {
        Self {
            random_seed: 0,
            min_region_area: DEFAULT_MIN_REGION_AREA,
            max_region_length: DEFAULT_MAX_REGION_LENGTH,
            absorption_attempts: DEFAULT_ABSORPTION_ATTEMPTS,
            ignore_water_dominance: true,
            exclude_sea_from_enclosed: true,
            acceptable_fill_ratio: DEFAULT_FILL_RATIO,
            max_aspect_ratio: DEFAULT_ASPECT_RATIO,
            accessibility_epsilon: DEFAULT_ACCESSIBILITY_EPSILON,
            altitude_penalty: DEFAULT_ALTITUDE_PENALTY,
        }
    }
}

const DEFAULT_MIN_REGION_AREA: usize = 8;
const DEFAULT_MAX_REGION_LENGTH: u32 = 25;
const DEFAULT_ABSORPTION_ATTEMPTS: usize = 2;
const DEFAULT_FILL_RATIO: f32 = 0.6;
const DEFAULT_ASPECT_RATIO: f32 = 2.0;
const DEFAULT_ACCESSIBILITY_EPSILON: f32 = 0.01;
const DEFAULT_ALTITUDE_PENALTY: f32 = 0.001;

/// Builder for creating SegmentationConfig with validation
///
/// # Example
///
/// ```rust
/// use biome_regions::*;
///
/// let config = SegmentationConfigBuilder::new()
///     .random_seed(7)
///     .absorption_attempts(3)
///     .altitude_penalty(0.002)
///     .unwrap()
///     .build()
///     .unwrap();
/// assert_eq!(config.absorption_attempts, 3);
/// ```
#[derive(Debug, Clone)]
pub struct SegmentationConfigBuilder {
    random_seed: Option<u64>,
    min_region_area: usize,
    max_region_length: u32,
    absorption_attempts: usize,
    ignore_water_dominance: bool,
    exclude_sea_from_enclosed: bool,
    acceptable_fill_ratio: f32,
    max_aspect_ratio: f32,
    accessibility_epsilon: f32,
    altitude_penalty: f32,
}

impl SegmentationConfigBuilder {
    /// Create a new builder with default values
    ///
    /// Defaults:
    /// - random_seed: Random (generated from thread_rng)
    /// - min_region_area: 8 cells
    /// - max_region_length: 25 cells
    /// - absorption_attempts: 2
    /// - ignore_water_dominance / exclude_sea_from_enclosed: true
    /// - acceptable_fill_ratio: 0.6, max_aspect_ratio: 2.0
    /// - accessibility_epsilon: 0.01, altitude_penalty: 0.001
    pub fn new() -> Self {
        Self {
            random_seed: None,
            min_region_area: DEFAULT_MIN_REGION_AREA,
            max_region_length: DEFAULT_MAX_REGION_LENGTH,
            absorption_attempts: DEFAULT_ABSORPTION_ATTEMPTS,
            ignore_water_dominance: true,
            exclude_sea_from_enclosed: true,
            acceptable_fill_ratio: DEFAULT_FILL_RATIO,
            max_aspect_ratio: DEFAULT_ASPECT_RATIO,
            accessibility_epsilon: DEFAULT_ACCESSIBILITY_EPSILON,
            altitude_penalty: DEFAULT_ALTITUDE_PENALTY,
        }
    }

    /// Set the seed of the per-cell random service
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Set the undersized-area threshold
    pub fn min_region_area(mut self, area: usize) -> Self {
        self.min_region_area = area;
        self
    }

    /// Set the longest allowed rectangle side before subdivision
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if length is 0
    pub fn max_region_length(mut self, length: u32) -> Result<Self> {
        if length == 0 {
            return Err(SegmentationError::InvalidConfig(
                "max region length must be positive".to_string(),
            ));
        }
        self.max_region_length = length;
        Ok(self)
    }

    /// Set how many absorption attempts an undersized region gets
    pub fn absorption_attempts(mut self, attempts: usize) -> Self {
        self.absorption_attempts = attempts;
        self
    }

    /// Choose whether water biomes count towards local dominance
    pub fn ignore_water_dominance(mut self, ignore: bool) -> Self {
        self.ignore_water_dominance = ignore;
        self
    }

    /// Choose whether open sea may belong to an enclosed pocket
    pub fn exclude_sea_from_enclosed(mut self, exclude: bool) -> Self {
        self.exclude_sea_from_enclosed = exclude;
        self
    }

    /// Set the acceptable tile shape used to stop bisection early
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if fill ratio is outside (0, 1] or aspect ratio < 1
    pub fn acceptable_shape(mut self, fill_ratio: f32, aspect_ratio: f32) -> Result<Self> {
        if !(fill_ratio > 0.0 && fill_ratio <= 1.0) {
            return Err(SegmentationError::InvalidConfig(format!(
                "fill ratio must be in (0, 1] (got {})",
                fill_ratio
            )));
        }
        if !(aspect_ratio >= 1.0) {
            return Err(SegmentationError::InvalidConfig(format!(
                "aspect ratio must be >= 1 (got {})",
                aspect_ratio
            )));
        }
        self.acceptable_fill_ratio = fill_ratio;
        self.max_aspect_ratio = aspect_ratio;
        Ok(self)
    }

    /// Set the epsilon added to accessibility in edge costs
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if epsilon <= 0
    pub fn accessibility_epsilon(mut self, epsilon: f32) -> Result<Self> {
        if !(epsilon > 0.0) {
            return Err(SegmentationError::InvalidConfig(format!(
                "accessibility epsilon must be positive (got {})",
                epsilon
            )));
        }
        self.accessibility_epsilon = epsilon;
        Ok(self)
    }

    /// Set the per-altitude-unit edge cost penalty
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if penalty is negative
    pub fn altitude_penalty(mut self, penalty: f32) -> Result<Self> {
        if !(penalty >= 0.0) {
            return Err(SegmentationError::InvalidConfig(format!(
                "altitude penalty must be >= 0 (got {})",
                penalty
            )));
        }
        self.altitude_penalty = penalty;
        Ok(self)
    }

    /// Build the configuration
    ///
    /// If no seed was provided, generates a random seed using thread_rng.
    pub fn build(self) -> Result<SegmentationConfig> {
        let random_seed = self.random_seed.unwrap_or_else(rand::random);

        Ok(SegmentationConfig {
            random_seed,
            min_region_area: self.min_region_area,
            max_region_length: self.max_region_length,
            absorption_attempts: self.absorption_attempts,
            ignore_water_dominance: self.ignore_water_dominance,
            exclude_sea_from_enclosed: self.exclude_sea_from_enclosed,
            acceptable_fill_ratio: self.acceptable_fill_ratio,
            max_aspect_ratio: self.max_aspect_ratio,
            accessibility_epsilon: self.accessibility_epsilon,
            altitude_penalty: self.altitude_penalty,
        })
    }
}

impl Default for SegmentationConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = SegmentationConfigBuilder::new().build().unwrap();
        assert_eq!(config.min_region_area, 8);
        assert_eq!(config.max_region_length, 25);
        assert_eq!(config.absorption_attempts, 2);
        assert!(config.ignore_water_dominance);
        assert!(config.exclude_sea_from_enclosed);
    }

    #[test]
    fn test_default_is_seeded() {
        let config = SegmentationConfig::default();
        assert_eq!(config.random_seed, 0);
        assert_eq!(config.min_region_area, 8);
    }

    #[test]
    fn test_builder_custom() {
        let config = SegmentationConfigBuilder::new()
            .random_seed(99)
            .min_region_area(4)
            .max_region_length(10)
            .unwrap()
            .acceptable_shape(0.8, 1.5)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.random_seed, 99);
        assert_eq!(config.min_region_area, 4);
        assert_eq!(config.max_region_length, 10);
        assert_eq!(config.acceptable_fill_ratio, 0.8);
        assert_eq!(config.max_aspect_ratio, 1.5);
    }

    #[test]
    fn test_builder_rejects_zero_length() {
        assert!(SegmentationConfigBuilder::new().max_region_length(0).is_err());
    }

    #[test]
    fn test_builder_rejects_bad_shape() {
        assert!(SegmentationConfigBuilder::new().acceptable_shape(0.0, 2.0).is_err());
        assert!(SegmentationConfigBuilder::new().acceptable_shape(1.5, 2.0).is_err());
        assert!(SegmentationConfigBuilder::new().acceptable_shape(0.5, 0.5).is_err());
    }

    #[test]
    fn test_builder_rejects_bad_costs() {
        assert!(SegmentationConfigBuilder::new().accessibility_epsilon(0.0).is_err());
        assert!(SegmentationConfigBuilder::new().altitude_penalty(-1.0).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_serialization() {
        let config = SegmentationConfigBuilder::new()
            .random_seed(12345)
            .build()
            .unwrap();

        let json = serde_json::to_string(&config).unwrap();
        let restored: SegmentationConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config, restored);
    }
}
