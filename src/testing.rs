//! Grid fixtures shared by the unit tests

use crate::biome::BiomeTable;
use crate::cell::CellTerrain;
use crate::grid::TerrainGrid;

/// Route `log` output through the test harness; safe to call repeatedly
pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn land(presences: Vec<f32>) -> CellTerrain {
    CellTerrain {
        biome_presences: presences,
        altitude: 100.0,
        rainfall: 500.0,
        temperature: 15.0,
        accessibility: 1.0,
        arability: 0.5,
        submerged: false,
    }
}

/// Single-biome grid of plains
pub(crate) fn uniform_grid(width: u32, height: u32) -> TerrainGrid {
    let mut biomes = BiomeTable::new();
    biomes.add("plains", false);
    TerrainGrid::from_fn(width, height, biomes, |_, _| land(vec![1.0])).unwrap()
}

fn in_block(lon: u32, lat: u32, x: u32, y: u32, w: u32, h: u32) -> bool {
    lon >= x && lon < x + w && lat >= y && lat < y + h
}

/// Plains grid with a rectangular pocket of marsh
///
/// Biome 0 is plains, biome 1 is marsh. With `halo`, the ring of cells around
/// the pocket is a plains/marsh mix, which keeps every pocket cell
/// marsh-dominant even at the pocket's corners.
pub(crate) fn pocket_grid(
    width: u32,
    height: u32,
    lon: u32,
    lat: u32,
    pocket_width: u32,
    pocket_height: u32,
    halo: bool,
) -> TerrainGrid {
    let mut biomes = BiomeTable::new();
    biomes.add("plains", false);
    biomes.add("marsh", false);
    TerrainGrid::from_fn(width, height, biomes, |x, y| {
        if in_block(x, y, lon, lat, pocket_width, pocket_height) {
            land(vec![0.0, 1.0])
        } else if halo && in_block(x + 1, y + 1, lon, lat, pocket_width + 2, pocket_height + 2) {
            land(vec![0.6, 0.4])
        } else {
            land(vec![1.0, 0.0])
        }
    })
    .unwrap()
}

/// Plains grid with a rectangular lake of open sea
pub(crate) fn lake_grid(
    width: u32,
    height: u32,
    lon: u32,
    lat: u32,
    lake_width: u32,
    lake_height: u32,
) -> TerrainGrid {
    let mut biomes = BiomeTable::new();
    biomes.add("plains", false);
    biomes.add("ocean", true);
    TerrainGrid::from_fn(width, height, biomes, |x, y| {
        if in_block(x, y, lon, lat, lake_width, lake_height) {
            CellTerrain {
                biome_presences: vec![0.0, 1.0],
                altitude: -50.0,
                accessibility: 0.0,
                submerged: true,
                ..Default::default()
            }
        } else {
            land(vec![1.0, 0.0])
        }
    })
    .unwrap()
}
