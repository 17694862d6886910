//! Grid Cell Structure
//!
//! Represents an individual cell of the terrain grid with its terrain inputs,
//! neighbours and geometry.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::biome::BiomeId;

/// Identifier of a cell: its row-major index in the grid (`latitude * width + longitude`)
pub type CellId = usize;

/// The eight neighbour directions of a grid cell
///
/// Latitude grows southwards: row 0 is the northern edge of the grid.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    /// All directions, clockwise from north
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// The four cardinal directions
    pub const CARDINAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Offset as `(longitude delta, latitude delta)`
    #[inline]
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }

    /// Check if this is a diagonal direction
    #[inline]
    pub fn is_diagonal(self) -> bool {
        let (dx, dy) = self.offset();
        dx != 0 && dy != 0
    }

    /// Slot of this direction in per-cell neighbour arrays
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Terrain inputs of one cell, produced by an external classifier
///
/// The segmentation engine only reads these values.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellTerrain {
    /// Presence of each biome of the grid's table, indexed by [`BiomeId::index`]
    pub biome_presences: Vec<f32>,
    /// Altitude in metres (negative below sea level)
    pub altitude: f32,
    /// Yearly rainfall
    pub rainfall: f32,
    /// Mean temperature
    pub temperature: f32,
    /// Ease of moving through the cell, in [0, 1]
    pub accessibility: f32,
    /// Fraction of the cell suitable for farming, in [0, 1]
    pub arability: f32,
    /// Fully submerged open water
    pub submerged: bool,
}

impl CellTerrain {
    /// Presence of a biome in this cell (0 for biomes beyond the vector)
    #[inline]
    pub fn presence(&self, biome: BiomeId) -> f32 {
        self.biome_presences.get(biome.index()).copied().unwrap_or(0.0)
    }
}

/// A single cell of the terrain grid
///
/// Cells are created by [`TerrainGrid`](crate::grid::TerrainGrid) and never
/// move; the region owning a cell lives in the grid's claim table rather than
/// on the cell itself.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct GridCell {
    /// Row-major index of this cell
    pub id: CellId,

    /// Column, in `0..width`; wraps around
    pub longitude: u32,

    /// Row, in `0..height`; clamped at the poles
    pub latitude: u32,

    /// Terrain inputs used for dominance, costs and statistics
    pub terrain: CellTerrain,

    /// Neighbour ids by [`Direction::index`]; `None` past a pole
    pub neighbors: [Option<CellId>; 8],

    /// Distance to each neighbour by [`Direction::index`]
    ///
    /// East/west steps shrink with `cos(latitude)`, so cells near the poles are
    /// cheaper to cross horizontally.
    pub neighbor_distances: [f32; 8],

    /// Relative surface area of the cell, used to weight statistics
    pub area: f32,
}

impl GridCell {
    /// Neighbour in a direction, if there is one
    #[inline]
    pub fn neighbor(&self, direction: Direction) -> Option<CellId> {
        self.neighbors[direction.index()]
    }

    /// Iterate over all existing neighbours with their directions
    pub fn neighbors(&self) -> impl Iterator<Item = (Direction, CellId)> + '_ {
        Direction::ALL
            .iter()
            .filter_map(move |&d| self.neighbor(d).map(|n| (d, n)))
    }

    /// Iterate over the existing cardinal neighbours
    pub fn cardinal_neighbors(&self) -> impl Iterator<Item = CellId> + '_ {
        Direction::CARDINAL.iter().filter_map(move |&d| self.neighbor(d))
    }

    /// Distance to the neighbour in a direction
    #[inline]
    pub fn distance_to_neighbor(&self, direction: Direction) -> f32 {
        self.neighbor_distances[direction.index()]
    }

    /// Check if this cell is fully submerged open sea
    #[inline]
    pub fn is_sea(&self) -> bool {
        self.terrain.submerged
    }

    /// Presence of a biome in this cell
    #[inline]
    pub fn biome_presence(&self, biome: BiomeId) -> f32 {
        self.terrain.presence(biome)
    }
}
