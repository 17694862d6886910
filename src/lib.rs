//! Biome-homogeneous region segmentation
//!
//! Partitions a longitude-wrapping terrain grid into contiguous regions that
//! each share a locally dominant biome. Small enclosed pockets are folded into
//! the region around them, large ones become sibling regions, undersized
//! regions absorb their neighbours and oversized ones are split by a weighted
//! Voronoi expansion.
//!
//! # Quick Start
//!
//! ```rust
//! use biome_regions::*;
//!
//! // Synthesize a terrain grid
//! let mut grid = TerrainGrid::generate(96, 48, &PerlinCellSampler::new(42)).unwrap();
//!
//! // Segment it
//! let config = SegmentationConfigBuilder::new()
//!     .random_seed(42)
//!     .max_region_length(16).unwrap()
//!     .build().unwrap();
//! let map = segment(&mut grid, config).unwrap();
//!
//! println!("{} leaf regions", map.leaves().len());
//! ```
//!
//! # Features
//!
//! - `spatial-index` (default): KD-tree lookups for region centers
//! - `serde`: serialization support for configuration, cells and statistics

// Modules
pub mod error;
pub mod config;
pub mod biome;
pub mod cell;
pub mod grid;
pub mod rng;
pub mod spatial;
pub mod collection;
pub mod border;
pub mod queue;
pub mod region;
pub mod grower;
pub mod partition;
pub mod segmentation;
pub mod terrain;

#[cfg(test)]
mod testing;

// Re-export core types for convenience
pub use error::{SegmentationError, Result};
pub use config::{SegmentationConfig, SegmentationConfigBuilder};
pub use biome::{Biome, BiomeId, BiomeTable};
pub use cell::{CellId, CellTerrain, Direction, GridCell};
pub use grid::TerrainGrid;
pub use rng::{CellRandom, SeededCellRandom};
pub use spatial::{grid_point, SpatialIndex};
pub use collection::BoundedCellSet;
pub use border::Border;
pub use queue::PriorityQueue;
pub use region::{Region, RegionId, RegionNode, RegionStats, SuperRegion};
pub use grower::{PassContext, RegionGrower};
pub use segmentation::{segment, RegionMap, Segmenter};
pub use terrain::{default_biomes, CellSampler, FractalNoise, PerlinCellSampler, PerlinConfig};

// Re-export glam vector types for convenience
pub use glam::{DVec2, Vec2};
