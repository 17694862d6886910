//! Subdivision of oversized regions
//!
//! The region's rectangle is bisected until every tile is short enough, one
//! member of each tile is drawn as a seed, and a multi-source weighted
//! shortest-path expansion from those seeds assigns every member to the seed
//! that reaches it most cheaply: a weighted Voronoi partition of the region.

use std::collections::{BTreeSet, HashMap};

use log::debug;

use crate::cell::CellId;
use crate::collection::BoundedCellSet;
use crate::config::SegmentationConfig;
use crate::error::{Result, SegmentationError};
use crate::grid::TerrainGrid;
use crate::grower::PassContext;
use crate::queue::PriorityQueue;
use crate::rng::CellRandom;

/// Frontier entry of the weighted expansion
#[derive(Debug, Clone, Copy)]
struct Frontier {
    cost: f32,
    /// Index into the parent's member list
    local: usize,
    /// Tile whose seed this path started from
    tile: usize,
}

/// Split a region into the cell sets of its sub-regions
///
/// The returned sets cover `cells` exactly and are pairwise disjoint; each
/// contains the seed drawn for its tile.
pub fn partition<R: CellRandom + ?Sized>(
    grid: &TerrainGrid,
    config: &SegmentationConfig,
    rng: &R,
    ctx: &mut PassContext,
    cells: &BoundedCellSet,
    seed: CellId,
) -> Result<Vec<BTreeSet<CellId>>> {
    let tiles = bisect(grid, config, cells);
    let seeds = pick_seeds(grid, rng, ctx, &tiles);
    let parts = expand(grid, config, cells, &seeds, seed)?;
    if parts.is_empty() && !cells.is_empty() {
        return Err(SegmentationError::EmptyPartition {
            seed,
            cells: cells.len(),
        });
    }
    debug!(
        "region seeded at {} ({} cells, {}x{}) split into {} parts",
        seed,
        cells.len(),
        cells.rectangle_width(),
        cells.rectangle_height(),
        parts.len()
    );
    Ok(parts)
}

/// Recursively halve a set along its longer axis
///
/// A tile stops splitting once its longer side is within
/// `max_region_length`, or, below the top level, once it is filled and
/// compact enough.
pub fn bisect(grid: &TerrainGrid, config: &SegmentationConfig, cells: &BoundedCellSet) -> Vec<BoundedCellSet> {
    let mut tiles = Vec::new();
    bisect_into(grid, config, cells.clone(), 0, &mut tiles);
    tiles
}

fn bisect_into(
    grid: &TerrainGrid,
    config: &SegmentationConfig,
    tile: BoundedCellSet,
    depth: u32,
    tiles: &mut Vec<BoundedCellSet>,
) {
    if tile.is_empty() {
        return;
    }
    let width = tile.rectangle_width();
    let height = tile.rectangle_height();
    let longest = width.max(height);
    if longest <= config.max_region_length || (depth > 0 && has_acceptable_shape(config, &tile)) {
        tiles.push(tile);
        return;
    }

    let (Some(left_lon), Some(top_lat)) = (tile.left_longitude(), tile.top_latitude()) else {
        return;
    };
    let (first, second): (Vec<CellId>, Vec<CellId>) = if width >= height {
        tile.iter()
            .partition(|&id| grid.longitude_offset(left_lon, grid.cell(id).longitude) < width / 2)
    } else {
        tile.iter()
            .partition(|&id| grid.cell(id).latitude < top_lat + height / 2)
    };

    for half in [first, second] {
        let half = BoundedCellSet::from_cells(grid, half);
        bisect_into(grid, config, half, depth + 1, tiles);
    }
}

fn has_acceptable_shape(config: &SegmentationConfig, tile: &BoundedCellSet) -> bool {
    let area = tile.rectangle_area();
    let shortest = tile.rectangle_width().min(tile.rectangle_height());
    if area == 0 || shortest == 0 {
        return false;
    }
    let fill = tile.member_count() as f32 / area as f32;
    let aspect = tile.longest_side() as f32 / shortest as f32;
    fill >= config.acceptable_fill_ratio && aspect <= config.max_aspect_ratio
}

/// Draw one member of each tile, advancing the pass's random offset per tile
pub fn pick_seeds<R: CellRandom + ?Sized>(
    grid: &TerrainGrid,
    rng: &R,
    ctx: &mut PassContext,
    tiles: &[BoundedCellSet],
) -> Vec<CellId> {
    tiles
        .iter()
        .filter_map(|tile| {
            let anchor = grid.cell(tile.top()?);
            let index = rng.next_random_int(anchor, ctx.next_rng_offset(), tile.len() as u32);
            tile.iter().nth(index as usize)
        })
        .collect()
}

/// Multi-source weighted expansion over `cells` from `seeds`
///
/// Moving from a cell to its neighbour costs the neighbour distance, raised
/// by the altitude difference and divided by the neighbour's accessibility.
/// Every member ends up with the seed of least total cost; equal costs go to
/// the path settled first, ordered by cell id and then seed position.
///
/// # Errors
///
/// - `NonPositiveInfluence` if `accessibility_epsilon + accessibility` of a
///   reached cell is not positive
/// - `UnreachedCells` if some members cannot be reached from any seed
pub fn expand(
    grid: &TerrainGrid,
    config: &SegmentationConfig,
    cells: &BoundedCellSet,
    seeds: &[CellId],
    region_seed: CellId,
) -> Result<Vec<BTreeSet<CellId>>> {
    let members: Vec<CellId> = cells.iter().collect();
    let local: HashMap<CellId, usize> = members.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    // Scratch tables for this call only, indexed like `members`
    let mut distance = vec![f32::INFINITY; members.len()];
    let mut owner: Vec<Option<usize>> = vec![None; members.len()];
    let mut settled = vec![false; members.len()];

    let mut queue = PriorityQueue::with_capacity(members.len(), |a: &Frontier, b: &Frontier| {
        a.cost
            .total_cmp(&b.cost)
            .then_with(|| members[a.local].cmp(&members[b.local]))
            .then_with(|| a.tile.cmp(&b.tile))
    });

    for (tile, seed) in seeds.iter().enumerate() {
        let Some(&index) = local.get(seed) else {
            continue;
        };
        if owner[index].is_some() {
            continue;
        }
        distance[index] = 0.0;
        owner[index] = Some(tile);
        queue.insert(Frontier {
            cost: 0.0,
            local: index,
            tile,
        });
    }

    while let Some(entry) = queue.extract_top(false) {
        if settled[entry.local] || entry.cost > distance[entry.local] {
            continue;
        }
        settled[entry.local] = true;

        let from = grid.cell(members[entry.local]);
        for (direction, next) in from.neighbors() {
            let Some(&index) = local.get(&next) else {
                continue;
            };
            if settled[index] {
                continue;
            }
            let to = grid.cell(next);
            let influence = config.accessibility_epsilon + to.terrain.accessibility;
            if influence <= 0.0 {
                return Err(SegmentationError::NonPositiveInfluence { cell: next });
            }
            let climb = (to.terrain.altitude - from.terrain.altitude).abs();
            let step = from.distance_to_neighbor(direction) * (1.0 + config.altitude_penalty * climb) / influence;
            let cost = entry.cost + step;
            if cost < distance[index] {
                distance[index] = cost;
                owner[index] = Some(entry.tile);
                queue.insert(Frontier {
                    cost,
                    local: index,
                    tile: entry.tile,
                });
            }
        }
    }

    let unreached = owner.iter().filter(|o| o.is_none()).count();
    if unreached > 0 {
        return Err(SegmentationError::UnreachedCells {
            seed: region_seed,
            count: unreached,
        });
    }

    let mut parts = vec![BTreeSet::new(); seeds.len()];
    for (index, tile) in owner.iter().enumerate() {
        if let Some(tile) = tile {
            parts[*tile].insert(members[index]);
        }
    }
    parts.retain(|part| !part.is_empty());
    Ok(parts)
}
