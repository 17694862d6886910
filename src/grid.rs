//! Longitude-wrapping terrain grid
//!
//! Columns wrap around (longitude), rows stop at the poles (latitude). The
//! grid owns its cells and the claim table recording which region holds each
//! cell once a segmentation pass has accepted it.

use std::f32::consts::PI;

use crate::biome::{BiomeId, BiomeTable};
use crate::cell::{CellId, CellTerrain, Direction, GridCell};
use crate::error::{Result, SegmentationError};
use crate::region::RegionId;

/// Smallest east/west distance scale, reached next to the poles
const MIN_LONGITUDE_SCALE: f32 = 0.05;

/// A longitude-wrapping grid of terrain cells
///
/// # Example
///
/// ```
/// use biome_regions::*;
///
/// let mut biomes = BiomeTable::new();
/// let plains = biomes.add("plains", false);
///
/// let grid = TerrainGrid::from_fn(8, 4, biomes, |_, _| CellTerrain {
///     biome_presences: vec![1.0],
///     accessibility: 1.0,
///     ..Default::default()
/// })
/// .unwrap();
///
/// assert_eq!(grid.cell_count(), 32);
/// // Column 0 and column 7 are neighbours across the seam
/// let west = grid.cell(grid.id_of(0, 1)).neighbor(Direction::West);
/// assert_eq!(west, Some(grid.id_of(7, 1)));
/// assert_eq!(grid.dominant_biome(0, true), Some(plains));
/// ```
#[derive(Debug, Clone)]
pub struct TerrainGrid {
    width: u32,
    height: u32,
    biomes: BiomeTable,
    cells: Vec<GridCell>,
    owners: Vec<Option<RegionId>>,
}

impl TerrainGrid {
    /// Build a grid from row-major terrain records
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrid` if a dimension is zero, the record count does not
    /// match `width * height`, or a record's presence vector does not have one
    /// entry per biome.
    pub fn from_cells(
        width: u32,
        height: u32,
        biomes: BiomeTable,
        terrain: Vec<CellTerrain>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SegmentationError::InvalidGrid(format!(
                "grid dimensions must be positive (got {}x{})",
                width, height
            )));
        }
        let expected = width as usize * height as usize;
        if terrain.len() != expected {
            return Err(SegmentationError::InvalidGrid(format!(
                "expected {} cells for a {}x{} grid (got {})",
                expected,
                width,
                height,
                terrain.len()
            )));
        }
        if let Some((id, t)) = terrain
            .iter()
            .enumerate()
            .find(|(_, t)| t.biome_presences.len() != biomes.len())
        {
            return Err(SegmentationError::InvalidGrid(format!(
                "cell {} has {} biome presences, table has {} biomes",
                id,
                t.biome_presences.len(),
                biomes.len()
            )));
        }

        let cells = terrain
            .into_iter()
            .enumerate()
            .map(|(id, terrain)| {
                let longitude = (id % width as usize) as u32;
                let latitude = (id / width as usize) as u32;
                build_cell(id, longitude, latitude, width, height, terrain)
            })
            .collect();

        Ok(Self {
            width,
            height,
            biomes,
            cells,
            owners: vec![None; expected],
        })
    }

    /// Build a grid by sampling a closure at every `(longitude, latitude)`
    pub fn from_fn<F>(width: u32, height: u32, biomes: BiomeTable, mut sample: F) -> Result<Self>
    where
        F: FnMut(u32, u32) -> CellTerrain,
    {
        let mut terrain = Vec::with_capacity(width as usize * height as usize);
        for latitude in 0..height {
            for longitude in 0..width {
                terrain.push(sample(longitude, latitude));
            }
        }
        Self::from_cells(width, height, biomes, terrain)
    }

    /// Number of columns (longitude, wraps)
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows (latitude, clamped)
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// The biome table presences are indexed against
    #[inline]
    pub fn biomes(&self) -> &BiomeTable {
        &self.biomes
    }

    /// Get a cell by id
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range; use [`get_cell`](Self::get_cell) for
    /// untrusted ids.
    #[inline]
    pub fn cell(&self, id: CellId) -> &GridCell {
        &self.cells[id]
    }

    /// Get a cell by id, `None` if out of range
    #[inline]
    pub fn get_cell(&self, id: CellId) -> Option<&GridCell> {
        self.cells.get(id)
    }

    /// All cells, indexed by id
    #[inline]
    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    /// Id of the cell at a column and row (column is wrapped, row must be in range)
    #[inline]
    pub fn id_of(&self, longitude: u32, latitude: u32) -> CellId {
        latitude as usize * self.width as usize + (longitude % self.width) as usize
    }

    /// Id of the cell at signed coordinates, wrapping longitude
    ///
    /// Returns `None` past either pole.
    pub fn wrapped_id(&self, longitude: i64, latitude: i64) -> Option<CellId> {
        if latitude < 0 || latitude >= self.height as i64 {
            return None;
        }
        let lon = longitude.rem_euclid(self.width as i64) as u32;
        Some(self.id_of(lon, latitude as u32))
    }

    /// Eastward column distance from `from` to `to`, in `0..width`
    #[inline]
    pub fn longitude_offset(&self, from: u32, to: u32) -> u32 {
        (to + self.width - from % self.width) % self.width
    }

    /// Check if a cell is land with at least one open-sea neighbour
    pub fn is_coastal(&self, id: CellId) -> bool {
        let cell = self.cell(id);
        !cell.is_sea() && cell.neighbors().any(|(_, n)| self.cell(n).is_sea())
    }

    /// The biome with the greatest presence summed over a cell and its neighbours
    ///
    /// With `ignore_water`, water biomes are skipped unless nothing else is
    /// present. Ties go to the lower biome id. Returns `None` when no biome is
    /// present at all.
    pub fn dominant_biome(&self, id: CellId, ignore_water: bool) -> Option<BiomeId> {
        let cell = self.cell(id);
        let mut totals = vec![0.0f32; self.biomes.len()];
        let members = std::iter::once(id).chain(cell.neighbors().map(|(_, n)| n));
        for member in members {
            for (slot, presence) in totals
                .iter_mut()
                .zip(&self.cell(member).terrain.biome_presences)
            {
                *slot += presence;
            }
        }

        let pick = |skip_water: bool| {
            let mut best: Option<(BiomeId, f32)> = None;
            for (i, &total) in totals.iter().enumerate() {
                let biome = BiomeId(i as u16);
                if total <= 0.0 || (skip_water && self.biomes.is_water(biome)) {
                    continue;
                }
                if best.map_or(true, |(_, b)| total > b) {
                    best = Some((biome, total));
                }
            }
            best.map(|(biome, _)| biome)
        };

        match pick(ignore_water) {
            Some(biome) => Some(biome),
            None if ignore_water => pick(false),
            None => None,
        }
    }

    /// Region currently holding a cell
    #[inline]
    pub fn owner(&self, id: CellId) -> Option<RegionId> {
        self.owners[id]
    }

    /// Check if a cell has been claimed by a region
    #[inline]
    pub fn is_claimed(&self, id: CellId) -> bool {
        self.owners[id].is_some()
    }

    /// Record that a region holds a cell
    ///
    /// # Errors
    ///
    /// Returns `CellNotFound` for an out-of-range id and `CellAlreadyClaimed`
    /// if the cell already belongs to a region; claims are permanent for the
    /// rest of the pass.
    pub fn claim(&mut self, id: CellId, region: RegionId) -> Result<()> {
        let slot = self
            .owners
            .get_mut(id)
            .ok_or(SegmentationError::CellNotFound(id))?;
        if let Some(owner) = *slot {
            return Err(SegmentationError::CellAlreadyClaimed { cell: id, owner });
        }
        *slot = Some(region);
        Ok(())
    }

    /// Forget every claim so the grid can be segmented again
    pub fn clear_claims(&mut self) {
        self.owners.iter_mut().for_each(|o| *o = None);
    }

    /// Snapshot of the claim table, indexed by cell id
    pub fn claims(&self) -> &[Option<RegionId>] {
        &self.owners
    }
}

/// East/west distance scale of a row: `cos(latitude)`, floored near the poles
fn longitude_scale(latitude: u32, height: u32) -> f32 {
    let angle = ((latitude as f32 + 0.5) / height as f32 - 0.5) * PI;
    angle.cos().max(MIN_LONGITUDE_SCALE)
}

fn build_cell(
    id: CellId,
    longitude: u32,
    latitude: u32,
    width: u32,
    height: u32,
    terrain: CellTerrain,
) -> GridCell {
    let scale = longitude_scale(latitude, height);
    let mut neighbors = [None; 8];
    let mut neighbor_distances = [0.0f32; 8];

    for direction in Direction::ALL {
        let (dx, dy) = direction.offset();
        let lat = latitude as i64 + dy as i64;
        if lat < 0 || lat >= height as i64 {
            continue;
        }
        let lon = (longitude as i64 + dx as i64).rem_euclid(width as i64) as usize;
        let neighbor = lat as usize * width as usize + lon;
        if neighbor == id {
            continue;
        }
        neighbors[direction.index()] = Some(neighbor);
        neighbor_distances[direction.index()] = match (dx, dy) {
            (0, _) => 1.0,
            (_, 0) => scale,
            _ => (scale * scale + 1.0).sqrt(),
        };
    }

    GridCell {
        id,
        longitude,
        latitude,
        terrain,
        neighbors,
        neighbor_distances,
        area: scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pocket_grid, uniform_grid};

    #[test]
    fn test_rejects_bad_dimensions() {
        let biomes = BiomeTable::new();
        assert!(TerrainGrid::from_cells(0, 4, biomes.clone(), vec![]).is_err());
        assert!(TerrainGrid::from_cells(2, 2, biomes, vec![CellTerrain::default(); 3]).is_err());
    }

    #[test]
    fn test_rejects_presence_mismatch() {
        let mut biomes = BiomeTable::new();
        biomes.add("plains", false);
        let result = TerrainGrid::from_fn(2, 2, biomes, |_, _| CellTerrain::default());
        assert!(matches!(result, Err(SegmentationError::InvalidGrid(_))));
    }

    #[test]
    fn test_longitude_wraps_latitude_clamps() {
        let grid = uniform_grid(10, 6);

        let corner = grid.cell(grid.id_of(0, 0));
        assert_eq!(corner.neighbor(Direction::West), Some(grid.id_of(9, 0)));
        assert_eq!(corner.neighbor(Direction::North), None);
        assert_eq!(corner.neighbor(Direction::NorthEast), None);
        assert_eq!(corner.neighbors().count(), 5);

        let inner = grid.cell(grid.id_of(4, 3));
        assert_eq!(inner.neighbors().count(), 8);
        assert_eq!(grid.wrapped_id(-1, 3), Some(grid.id_of(9, 3)));
        assert_eq!(grid.wrapped_id(10, 3), Some(grid.id_of(0, 3)));
        assert_eq!(grid.wrapped_id(0, 6), None);
    }

    #[test]
    fn test_longitude_offset() {
        let grid = uniform_grid(10, 2);
        assert_eq!(grid.longitude_offset(8, 1), 3);
        assert_eq!(grid.longitude_offset(1, 8), 7);
        assert_eq!(grid.longitude_offset(4, 4), 0);
    }

    #[test]
    fn test_neighbor_distances_shrink_towards_poles() {
        let grid = uniform_grid(10, 10);
        let equator = grid.cell(grid.id_of(0, 5));
        let polar = grid.cell(grid.id_of(0, 0));

        assert_eq!(equator.distance_to_neighbor(Direction::North), 1.0);
        assert!(polar.distance_to_neighbor(Direction::East) < equator.distance_to_neighbor(Direction::East));
        assert!(equator.distance_to_neighbor(Direction::NorthEast) > equator.distance_to_neighbor(Direction::East));
        assert!(polar.area < equator.area);
    }

    #[test]
    fn test_dominant_biome_uses_neighbourhood() {
        let grid = pocket_grid(10, 6, 4, 2, 1, 1, false);
        let plains = grid.biomes().find("plains").unwrap();

        // A lone marsh cell is outvoted by its plains neighbours
        let pocket = grid.id_of(4, 2);
        assert!(grid.cell(pocket).biome_presence(plains) == 0.0);
        assert_eq!(grid.dominant_biome(pocket, true), Some(plains));
    }

    #[test]
    fn test_dominant_biome_water_fallback() {
        let mut biomes = BiomeTable::new();
        let ocean = biomes.add("ocean", true);
        let grid = TerrainGrid::from_fn(4, 4, biomes, |_, _| CellTerrain {
            biome_presences: vec![1.0],
            submerged: true,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(grid.dominant_biome(5, true), Some(ocean));
        assert_eq!(grid.dominant_biome(5, false), Some(ocean));
    }

    #[test]
    fn test_claims_are_exclusive() {
        let mut grid = uniform_grid(4, 4);
        assert!(!grid.is_claimed(3));
        grid.claim(3, RegionId(1)).unwrap();
        assert_eq!(grid.owner(3), Some(RegionId(1)));

        let second = grid.claim(3, RegionId(2));
        assert_eq!(
            second,
            Err(SegmentationError::CellAlreadyClaimed {
                cell: 3,
                owner: RegionId(1)
            })
        );
        assert!(matches!(grid.claim(99, RegionId(1)), Err(SegmentationError::CellNotFound(99))));

        grid.clear_claims();
        assert!(!grid.is_claimed(3));
    }

    #[test]
    fn test_coastal_cells() {
        let mut biomes = BiomeTable::new();
        biomes.add("ocean", true);
        biomes.add("plains", false);
        let grid = TerrainGrid::from_fn(6, 3, biomes, |lon, _| {
            let sea = lon < 2;
            CellTerrain {
                biome_presences: if sea { vec![1.0, 0.0] } else { vec![0.0, 1.0] },
                submerged: sea,
                ..Default::default()
            }
        })
        .unwrap();

        assert!(!grid.is_coastal(grid.id_of(0, 1)));
        assert!(grid.is_coastal(grid.id_of(2, 1)));
        assert!(!grid.is_coastal(grid.id_of(3, 1)));
        // Column 5 touches column 0 across the seam
        assert!(grid.is_coastal(grid.id_of(5, 1)));
    }
}
