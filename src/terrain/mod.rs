//! Synthetic terrain for segmentation
//!
//! The segmentation engine only consumes classified cells. This module
//! supplies them for demos and tests: a [`CellSampler`] turns a grid position
//! into a [`CellTerrain`], and [`PerlinCellSampler`] does so from seeded
//! fractal noise wrapped around a cylinder, so the field is seamless across
//! the longitude seam.

mod perlin;

pub use perlin::{FractalNoise, PerlinConfig};

use std::f32::consts::{PI, TAU};

use glam::Vec3;

use crate::biome::{BiomeId, BiomeTable};
use crate::cell::CellTerrain;
use crate::error::Result;
use crate::grid::TerrainGrid;

pub const OCEAN: BiomeId = BiomeId(0);
pub const ICE: BiomeId = BiomeId(1);
pub const TUNDRA: BiomeId = BiomeId(2);
pub const TAIGA: BiomeId = BiomeId(3);
pub const GRASSLAND: BiomeId = BiomeId(4);
pub const FOREST: BiomeId = BiomeId(5);
pub const DESERT: BiomeId = BiomeId(6);
pub const RAINFOREST: BiomeId = BiomeId(7);
pub const MARSH: BiomeId = BiomeId(8);

/// Biome table matching the constants above
pub fn default_biomes() -> BiomeTable {
    let mut table = BiomeTable::new();
    for (name, is_water) in [
        ("ocean", true),
        ("ice", false),
        ("tundra", false),
        ("taiga", false),
        ("grassland", false),
        ("forest", false),
        ("desert", false),
        ("rainforest", false),
        ("marsh", false),
    ] {
        table.add(name, is_water);
    }
    table
}

/// Produces the terrain record of a grid position
pub trait CellSampler {
    /// The table that sampled presence vectors are indexed against
    fn biomes(&self) -> BiomeTable;

    /// Terrain of the cell at `(longitude, latitude)` on a `width` x `height` grid
    fn sample(&self, longitude: u32, latitude: u32, width: u32, height: u32) -> CellTerrain;
}

impl TerrainGrid {
    /// Build a grid by sampling every cell
    ///
    /// # Example
    ///
    /// ```
    /// use biome_regions::*;
    ///
    /// let sampler = PerlinCellSampler::new(42);
    /// let grid = TerrainGrid::generate(48, 24, &sampler).unwrap();
    /// assert_eq!(grid.cell_count(), 48 * 24);
    /// ```
    pub fn generate<S: CellSampler + ?Sized>(width: u32, height: u32, sampler: &S) -> Result<Self> {
        TerrainGrid::from_fn(width, height, sampler.biomes(), |lon, lat| {
            sampler.sample(lon, lat, width, height)
        })
    }
}

/// Noise-driven terrain with a latitude climate
#[derive(Debug, Clone)]
pub struct PerlinCellSampler {
    pub seed: u32,
    /// Elevation (in `[0, 1]`) below which a cell is open sea (default: 0.48)
    pub sea_level: f32,
    /// Normalized distance from the equator beyond which land is ice (default: 0.88)
    pub ice_latitude: f32,
    /// Altitude of the highest possible peak, in metres (default: 4000)
    pub peak_altitude: f32,
    pub config: PerlinConfig,
}

impl Default for PerlinCellSampler {
    fn default() -> Self {
        Self {
            seed: 0,
            sea_level: 0.48,
            ice_latitude: 0.88,
            peak_altitude: 4000.0,
            config: PerlinConfig::default(),
        }
    }
}

impl PerlinCellSampler {
    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    pub fn with_config(seed: u32, config: PerlinConfig) -> Self {
        Self {
            seed,
            config,
            ..Default::default()
        }
    }

    /// Point on a unit cylinder for a fractional grid position
    ///
    /// Longitude goes around the cylinder, latitude along its axis with the
    /// same scale as one turn covers in width, so features stay round.
    pub fn cylinder_point(longitude: f32, latitude: f32, width: u32, height: u32) -> Vec3 {
        let angle = longitude / width as f32 * TAU;
        let axis = (latitude / height as f32 - 0.5) * PI;
        Vec3::new(angle.cos(), axis, angle.sin())
    }

    /// Elevation in `[0, 1]` at a fractional grid position
    pub fn elevation(&self, longitude: f32, latitude: f32, width: u32, height: u32) -> f32 {
        let p = Self::cylinder_point(longitude, latitude, width, height);
        FractalNoise::new(self.seed, self.config).sample(p)
    }

    fn classify(&self, polar: f32, temperature: f32, rainfall: f32) -> BiomeId {
        if polar > self.ice_latitude || temperature < -12.0 {
            ICE
        } else if temperature < 0.0 {
            TUNDRA
        } else if temperature < 8.0 {
            TAIGA
        } else if temperature < 20.0 {
            match rainfall {
                r if r < 400.0 => GRASSLAND,
                r if r < 1300.0 => FOREST,
                _ => MARSH,
            }
        } else {
            match rainfall {
                r if r < 300.0 => DESERT,
                r if r < 1100.0 => GRASSLAND,
                _ => RAINFOREST,
            }
        }
    }
}

impl CellSampler for PerlinCellSampler {
    fn biomes(&self) -> BiomeTable {
        default_biomes()
    }

    fn sample(&self, longitude: u32, latitude: u32, width: u32, height: u32) -> CellTerrain {
        let (lon, lat) = (longitude as f32 + 0.5, latitude as f32 + 0.5);
        let p = Self::cylinder_point(lon, lat, width, height);
        let elevation = FractalNoise::new(self.seed, self.config).sample(p);
        let moisture = FractalNoise::new(self.seed.wrapping_add(1), self.config).sample(p);
        let warmth = FractalNoise::new(self.seed.wrapping_add(2), self.config).sample_signed(p);

        let mut presences = vec![0.0; default_biomes().len()];
        let altitude = (elevation - self.sea_level) / (1.0 - self.sea_level) * self.peak_altitude;
        if elevation < self.sea_level {
            presences[OCEAN.index()] = 1.0;
            return CellTerrain {
                biome_presences: presences,
                altitude: (elevation - self.sea_level) / self.sea_level * self.peak_altitude,
                rainfall: moisture * 2500.0,
                temperature: 0.0,
                accessibility: 0.0,
                arability: 0.0,
                submerged: true,
            };
        }

        // 0 at the equator, 1 at either pole
        let polar = (lat / height as f32 - 0.5).abs() * 2.0;
        let temperature = 30.0 - 45.0 * polar - altitude * 0.0065 + warmth * 4.0;
        let rainfall = moisture * 2500.0 * (1.0 - 0.4 * polar);

        // Blend towards the biome a wetter year would bring
        let primary = self.classify(polar, temperature, rainfall);
        let wetter = self.classify(polar, temperature, rainfall * 1.3);
        presences[primary.index()] += 0.75;
        presences[wetter.index()] += 0.25;

        let ruggedness = (altitude / self.peak_altitude).clamp(0.0, 1.0);
        let arability = if (5.0..30.0).contains(&temperature) {
            (rainfall / 1500.0).min(1.0) * (1.0 - ruggedness)
        } else {
            0.0
        };

        CellTerrain {
            biome_presences: presences,
            altitude,
            rainfall,
            temperature,
            accessibility: (1.0 - 0.85 * ruggedness).max(0.05),
            arability,
            submerged: false,
        }
    }
}
